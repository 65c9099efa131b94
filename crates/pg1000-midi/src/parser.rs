//! Inbound byte-stream framing.
//!
//! Two states. `Idle` frames channel-voice messages (with running status) and waits for
//! an exclusive start byte; `Accumulating` appends every byte to a bounded buffer until
//! the terminator arrives. Real-time bytes pass straight through in either state.

use tracing::trace;

use crate::error::{Error, Result};
use crate::sysex::{SysExMessage, SYSEX_END, SYSEX_START, TIMING_CLOCK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    Accumulating,
}

/// A complete inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Clock, start, stop, active sensing and friends.
    RealTime(u8),
    /// Channel-voice message; `data2` is `None` for program change and channel pressure.
    Channel { status: u8, data1: u8, data2: Option<u8> },
    SysEx(SysExMessage),
}

impl InboundEvent {
    /// 1-based channel for channel-voice events.
    pub fn channel(&self) -> Option<u8> {
        match self {
            InboundEvent::Channel { status, .. } => Some((status & 0x0F) + 1),
            _ => None,
        }
    }
}

/// Number of data bytes that follow a channel-voice status.
fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

pub struct InboundParser {
    state: ParserState,
    buffer: Vec<u8>,
    max_len: usize,
    running_status: Option<u8>,
    pending: Option<u8>,
}

impl InboundParser {
    /// `max_len` bounds an exclusive message including `F0` and `F7`.
    pub fn new(max_len: usize) -> Self {
        Self {
            state: ParserState::Idle,
            buffer: Vec::with_capacity(max_len),
            max_len,
            running_status: None,
            pending: None,
        }
    }

    #[inline]
    pub fn state(&self) -> ParserState {
        self.state
    }

    #[inline]
    pub fn is_accumulating(&self) -> bool {
        self.state == ParserState::Accumulating
    }

    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.buffer.clear();
        self.running_status = None;
        self.pending = None;
    }

    /// Feed one byte.
    ///
    /// `Ok(None)` means the byte was consumed without completing a message. Errors mean a
    /// message was dropped and the parser is back in `Idle`; nothing needs to be undone.
    pub fn process_byte(&mut self, byte: u8) -> Result<Option<InboundEvent>> {
        if byte >= TIMING_CLOCK {
            return Ok(Some(InboundEvent::RealTime(byte)));
        }

        match self.state {
            ParserState::Accumulating => self.accumulate(byte),
            ParserState::Idle => Ok(self.frame_idle(byte)),
        }
    }

    fn accumulate(&mut self, byte: u8) -> Result<Option<InboundEvent>> {
        self.buffer.push(byte);

        if byte == SYSEX_END {
            self.state = ParserState::Idle;
            let parsed = SysExMessage::parse(&self.buffer);
            self.buffer.clear();
            return parsed.map(|message| Some(InboundEvent::SysEx(message)));
        }

        if self.buffer.len() >= self.max_len {
            trace!(max = self.max_len, "Exclusive buffer full, dropping");
            self.state = ParserState::Idle;
            self.buffer.clear();
            return Err(Error::BufferOverflow { max: self.max_len });
        }

        Ok(None)
    }

    fn frame_idle(&mut self, byte: u8) -> Option<InboundEvent> {
        match byte {
            SYSEX_START => {
                self.state = ParserState::Accumulating;
                self.buffer.clear();
                self.buffer.push(byte);
                self.running_status = None;
                self.pending = None;
                None
            }
            0x80..=0xEF => {
                self.running_status = Some(byte);
                self.pending = None;
                None
            }
            // System common (and stray terminators) cancel running status
            0xF1..=0xF7 => {
                self.running_status = None;
                self.pending = None;
                None
            }
            _ => self.channel_data(byte),
        }
    }

    fn channel_data(&mut self, byte: u8) -> Option<InboundEvent> {
        let status = self.running_status?;

        if data_len(status) == 1 {
            return Some(InboundEvent::Channel {
                status,
                data1: byte,
                data2: None,
            });
        }

        match self.pending.take() {
            None => {
                self.pending = Some(byte);
                None
            }
            Some(data1) => Some(InboundEvent::Channel {
                status,
                data1,
                data2: Some(byte),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysex::SysExBody;
    use pg1000_params::SysExAddress;

    const DT1: [u8; 11] = [
        0xF0, 0x41, 0x00, 0x14, 0x12, 0x00, 0x01, 0x40, 0x40, 0x6D, 0xF7,
    ];

    fn feed(parser: &mut InboundParser, bytes: &[u8]) -> Vec<Result<Option<InboundEvent>>> {
        bytes.iter().map(|b| parser.process_byte(*b)).collect()
    }

    #[test]
    fn test_frames_data_set() {
        let mut parser = InboundParser::new(64);
        let results = feed(&mut parser, &DT1);

        assert!(results[..10].iter().all(|r| matches!(r, Ok(None))));
        match &results[10] {
            Ok(Some(InboundEvent::SysEx(message))) => assert_eq!(
                message.body,
                SysExBody::DataSet {
                    address: SysExAddress::new(0x00, 0x01, 0x40),
                    data: vec![0x40],
                }
            ),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parser.state(), ParserState::Idle);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_real_time_does_not_disturb_accumulation() {
        let mut parser = InboundParser::new(64);
        feed(&mut parser, &DT1[..6]);

        assert_eq!(
            parser.process_byte(0xF8).unwrap(),
            Some(InboundEvent::RealTime(0xF8))
        );
        assert!(parser.is_accumulating());
        assert_eq!(parser.buffered(), 6);

        let results = feed(&mut parser, &DT1[6..]);
        assert!(matches!(
            results.last(),
            Some(Ok(Some(InboundEvent::SysEx(_))))
        ));
    }

    #[test]
    fn test_checksum_failure_resets() {
        let mut parser = InboundParser::new(64);
        let mut bytes = DT1;
        bytes[8] = 0x41;

        let results = feed(&mut parser, &bytes);
        assert!(matches!(results[10], Err(Error::Checksum { .. })));
        assert_eq!(parser.state(), ParserState::Idle);

        // Next message parses cleanly
        let results = feed(&mut parser, &DT1);
        assert!(matches!(results[10], Ok(Some(InboundEvent::SysEx(_)))));
    }

    #[test]
    fn test_overflow_drops_message() {
        let mut parser = InboundParser::new(12);
        parser.process_byte(0xF0).unwrap();
        for _ in 0..10 {
            assert_eq!(parser.process_byte(0x01), Ok(None));
        }
        assert_eq!(
            parser.process_byte(0x01),
            Err(Error::BufferOverflow { max: 12 })
        );
        assert_eq!(parser.state(), ParserState::Idle);

        // Trailing bytes of the dropped message are ignored in Idle
        assert_eq!(parser.process_byte(0x02), Ok(None));
        assert_eq!(parser.process_byte(0xF7), Ok(None));
    }

    #[test]
    fn test_terminator_at_bound_completes() {
        let mut parser = InboundParser::new(DT1.len());
        let results = feed(&mut parser, &DT1);
        assert!(matches!(results[10], Ok(Some(InboundEvent::SysEx(_)))));
    }

    #[test]
    fn test_channel_messages_with_running_status() {
        let mut parser = InboundParser::new(64);
        let results = feed(&mut parser, &[0xB0, 7, 100, 10, 64]);

        assert_eq!(
            results[2],
            Ok(Some(InboundEvent::Channel {
                status: 0xB0,
                data1: 7,
                data2: Some(100)
            }))
        );
        assert_eq!(
            results[4],
            Ok(Some(InboundEvent::Channel {
                status: 0xB0,
                data1: 10,
                data2: Some(64)
            }))
        );
    }

    #[test]
    fn test_program_change_single_data_byte() {
        let mut parser = InboundParser::new(64);
        let results = feed(&mut parser, &[0xC3, 12]);
        let event = results[1].clone().unwrap().unwrap();
        assert_eq!(event.channel(), Some(4));
        assert_eq!(
            event,
            InboundEvent::Channel {
                status: 0xC3,
                data1: 12,
                data2: None
            }
        );
    }

    #[test]
    fn test_orphan_data_is_ignored() {
        let mut parser = InboundParser::new(64);
        assert_eq!(parser.process_byte(0x40), Ok(None));
        parser.process_byte(0xB0).unwrap();
        parser.process_byte(0xF6).unwrap();
        assert_eq!(parser.process_byte(0x40), Ok(None));
    }

    #[test]
    fn test_foreign_exclusive_is_malformed() {
        let mut parser = InboundParser::new(64);
        let results = feed(&mut parser, &[0xF0, 0x43, 0x10, 0x01, 0xF7]);
        assert!(matches!(results[4], Err(Error::Malformed(_))));
    }
}
