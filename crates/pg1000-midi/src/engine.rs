//! Protocol engine: outbound sends with rate limiting, inbound framing and dispatch.

use std::time::{Duration, Instant};

use pg1000_params::{Parameter, ParameterRegistry, SysExAddress, ValueSource};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::message::{channel_nibble, ExclusiveTarget, OutboundMessage};
use crate::parser::{InboundEvent, InboundParser};
use crate::queue::InboundConsumer;
use crate::rate_limit::RateLimiter;
use crate::sysex::{
    SysExBody, SysExMessage, D50_MODEL_ID, MAX_DT1_LEN, PATCH_DUMP_SIZE, PATCH_WRITE_ADDRESS,
    ROLAND_ID, RQ1_LEN,
};
use crate::transport::{ByteSink, ByteSource};

/// How inbound bytes reach the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiveMode {
    /// The loop reads the transport directly.
    #[default]
    Poll,
    /// An interrupt fills an [`InboundConsumer`] queue that the loop drains.
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// 1-based MIDI channel; also the exclusive device id (`channel - 1`).
    pub channel: u8,
    pub manufacturer_id: u8,
    pub model_id: u8,
    /// Minimum interval between sends of the same parameter.
    pub rate_limit_ms: u64,
    /// Bound on an inbound exclusive message, `F0` and `F7` included. The default fits
    /// one full dump chunk.
    pub max_sysex_len: usize,
    pub sysex_enabled: bool,
    pub cc_enabled: bool,
    pub receive: ReceiveMode,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            channel: 1,
            manufacturer_id: ROLAND_ID,
            model_id: D50_MODEL_ID,
            rate_limit_ms: 10,
            max_sysex_len: MAX_DT1_LEN,
            sysex_enabled: true,
            cc_enabled: true,
            receive: ReceiveMode::Poll,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<()> {
        channel_nibble(self.channel)?;
        if self.manufacturer_id > 0x7F || self.model_id > 0x7F {
            return Err(Error::InvalidConfig(
                "manufacturer and model ids must be 7-bit".to_string(),
            ));
        }
        if self.max_sysex_len < RQ1_LEN {
            return Err(Error::InvalidConfig(format!(
                "max_sysex_len {} cannot hold a {RQ1_LEN}-byte request",
                self.max_sysex_len
            )));
        }
        Ok(())
    }
}

/// Running counters. Dropped inbound messages are only visible here and in the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolStats {
    pub messages_sent: u64,
    pub sends_suppressed: u64,
    pub inbound_accepted: u64,
    pub inbound_dropped: u64,
}

pub struct ProtocolEngine {
    config: ProtocolConfig,
    parser: InboundParser,
    limiter: RateLimiter,
    stats: ProtocolStats,
}

impl ProtocolEngine {
    /// `slots` is the number of rate-limited parameter indices.
    pub fn new(config: ProtocolConfig, slots: usize) -> Result<Self> {
        config.validate()?;
        let limiter = RateLimiter::new(Duration::from_millis(config.rate_limit_ms), slots);
        let parser = InboundParser::new(config.max_sysex_len);
        Ok(Self {
            config,
            parser,
            limiter,
            stats: ProtocolStats::default(),
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn stats(&self) -> &ProtocolStats {
        &self.stats
    }

    pub fn parser(&self) -> &InboundParser {
        &self.parser
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    pub fn set_channel(&mut self, channel: u8) -> Result<()> {
        channel_nibble(channel)?;
        if channel != self.config.channel {
            debug!(from = self.config.channel, to = channel, "MIDI channel changed");
            self.config.channel = channel;
        }
        Ok(())
    }

    #[inline]
    pub fn sysex_enabled(&self) -> bool {
        self.config.sysex_enabled
    }

    pub fn set_sysex_enabled(&mut self, enabled: bool) {
        self.config.sysex_enabled = enabled;
    }

    #[inline]
    pub fn cc_enabled(&self) -> bool {
        self.config.cc_enabled
    }

    pub fn set_cc_enabled(&mut self, enabled: bool) {
        self.config.cc_enabled = enabled;
    }

    pub fn target(&self) -> ExclusiveTarget {
        ExclusiveTarget {
            manufacturer_id: self.config.manufacturer_id,
            model_id: self.config.model_id,
            channel: self.config.channel,
        }
    }

    fn transmit<S: ByteSink + ?Sized>(&mut self, tx: &mut S, message: &OutboundMessage) {
        tx.send_bytes(message.as_bytes());
        self.stats.messages_sent += 1;
    }

    fn claim(&mut self, param_index: usize, now: Instant) -> Result<bool> {
        let allowed = self.limiter.check(param_index, now)?;
        if !allowed {
            trace!(param_index, "Send suppressed by rate limit");
            self.stats.sends_suppressed += 1;
        }
        Ok(allowed)
    }

    /// Send a Control Change on behalf of `param_index`.
    ///
    /// Returns `Ok(false)` when CC output is disabled or the send was rate limited.
    pub fn send_cc<S: ByteSink + ?Sized>(
        &mut self,
        tx: &mut S,
        param_index: usize,
        cc: u8,
        value: u8,
        now: Instant,
    ) -> Result<bool> {
        for field in [cc, value] {
            if field > 0x7F {
                return Err(Error::ValueOutOfRange {
                    value: u16::from(field),
                    max: 0x7F,
                });
            }
        }
        if !self.config.cc_enabled || !self.claim(param_index, now)? {
            return Ok(false);
        }
        let message = OutboundMessage::control_change(self.config.channel, cc, value)?;
        self.transmit(tx, &message);
        Ok(true)
    }

    pub fn send_program_change<S: ByteSink + ?Sized>(&mut self, tx: &mut S, program: u8) -> Result<()> {
        if program > 0x7F {
            return Err(Error::ValueOutOfRange {
                value: u16::from(program),
                max: 0x7F,
            });
        }
        let message = OutboundMessage::program_change(self.config.channel, program)?;
        self.transmit(tx, &message);
        Ok(())
    }

    /// Whether [`send_parameter`](Self::send_parameter) puts anything on the wire for `param`.
    pub fn transmits(&self, param: &Parameter) -> bool {
        self.config.sysex_enabled || (self.config.cc_enabled && param.cc.is_some())
    }

    /// Transmit a parameter's committed value: DT1 when exclusive output is on, plus a
    /// CC when the parameter has one and CC output is on. One rate-limit slot covers both.
    ///
    /// Returns whether anything was sent.
    pub fn send_parameter<S: ByteSink + ?Sized>(
        &mut self,
        tx: &mut S,
        registry: &ParameterRegistry,
        index: usize,
        now: Instant,
    ) -> Result<bool> {
        let param = registry.get(index).ok_or(Error::InvalidParameter(index))?;
        if !self.transmits(param) {
            return Ok(false);
        }
        if !self.claim(index, now)? {
            return Ok(false);
        }

        let mut messages: SmallVec<[OutboundMessage; 2]> = SmallVec::new();
        if self.config.sysex_enabled {
            messages.push(OutboundMessage::data_set(self.target(), param.address, &[param.value()])?);
        }
        if let Some(cc) = param.cc.filter(|_| self.config.cc_enabled) {
            messages.push(OutboundMessage::control_change(self.config.channel, cc, param.cc_value())?);
        }
        for message in &messages {
            self.transmit(tx, message);
        }
        trace!(name = param.name, value = param.value(), "Parameter sent");
        Ok(true)
    }

    /// Update through the registry and transmit if the committed value changed.
    pub fn update_and_send<S: ByteSink + ?Sized>(
        &mut self,
        tx: &mut S,
        registry: &mut ParameterRegistry,
        index: usize,
        source: ValueSource,
        now: Instant,
    ) -> Result<bool> {
        if !registry.update_value(index, source)? {
            return Ok(false);
        }
        self.send_parameter(tx, registry, index, now)
    }

    /// RQ1 for an arbitrary range.
    pub fn send_data_request<S: ByteSink + ?Sized>(
        &mut self,
        tx: &mut S,
        address: SysExAddress,
        size: SysExAddress,
    ) -> Result<()> {
        let message = OutboundMessage::data_request(self.target(), address, size)?;
        self.transmit(tx, &message);
        Ok(())
    }

    /// RQ1 for a single parameter.
    pub fn request_parameter<S: ByteSink + ?Sized>(
        &mut self,
        tx: &mut S,
        registry: &ParameterRegistry,
        index: usize,
    ) -> Result<()> {
        let param = registry.get(index).ok_or(Error::InvalidParameter(index))?;
        self.send_data_request(tx, param.address, SysExAddress::new(0, 0, 1))
    }

    /// RQ1 for the whole edit buffer.
    pub fn request_patch_dump<S: ByteSink + ?Sized>(&mut self, tx: &mut S) -> Result<()> {
        debug!("Requesting patch dump");
        self.send_data_request(tx, SysExAddress::ZERO, PATCH_DUMP_SIZE)
    }

    /// DT1 to the write address, storing the edit buffer.
    pub fn send_patch_write<S: ByteSink + ?Sized>(&mut self, tx: &mut S) -> Result<()> {
        debug!("Writing patch");
        let message = OutboundMessage::data_set(self.target(), PATCH_WRITE_ADDRESS, &[0x00, 0x00])?;
        self.transmit(tx, &message);
        Ok(())
    }

    fn is_ours(&self, message: &SysExMessage) -> bool {
        let header = &message.header;
        header.manufacturer == self.config.manufacturer_id
            && header.model == self.config.model_id
            && Some(header.device) == channel_nibble(self.config.channel).ok()
    }

    /// Feed one inbound byte. Dropped messages are logged and counted, never returned.
    pub fn process_byte(&mut self, byte: u8) -> Option<InboundEvent> {
        match self.parser.process_byte(byte) {
            Ok(Some(InboundEvent::SysEx(message))) if !self.is_ours(&message) => {
                debug!(header = ?message.header, "Dropping exclusive message for another device");
                self.stats.inbound_dropped += 1;
                None
            }
            Ok(Some(event)) => {
                if matches!(event, InboundEvent::SysEx(_)) {
                    self.stats.inbound_accepted += 1;
                }
                Some(event)
            }
            Ok(None) => None,
            Err(error) => {
                debug!(%error, "Dropping inbound message");
                self.stats.inbound_dropped += 1;
                None
            }
        }
    }

    /// Read every byte the transport has ready.
    pub fn poll_transport<S: ByteSource + ?Sized>(&mut self, rx: &mut S) -> Vec<InboundEvent> {
        let mut events = Vec::new();
        while rx.is_readable() {
            let byte = rx.receive_byte();
            events.extend(self.process_byte(byte));
        }
        events
    }

    /// Drain bytes queued by the receive interrupt.
    pub fn drain_queue(&mut self, queue: &mut InboundConsumer) -> Vec<InboundEvent> {
        let mut events = Vec::new();
        while let Some(byte) = queue.pop() {
            events.extend(self.process_byte(byte));
        }
        events
    }

    /// Apply a received DT1: byte `i` of `data` lands on the parameter at `address + i`.
    ///
    /// Unknown addresses and out-of-range values are skipped. Returns the indices whose
    /// value changed. Nothing is echoed back.
    pub fn apply_data_set(
        &self,
        registry: &mut ParameterRegistry,
        address: SysExAddress,
        data: &[u8],
    ) -> Vec<usize> {
        let mut applied = Vec::new();
        for (offset, &value) in data.iter().enumerate() {
            let Some(target) = address.offset(offset as u32) else {
                debug!(%address, offset, "Data set runs past the address map");
                break;
            };
            let Some(index) = registry.find_by_address(target) else {
                trace!(address = %target, "No parameter at received address");
                continue;
            };
            match registry.update_value(index, ValueSource::Received(value)) {
                Ok(true) => applied.push(index),
                Ok(false) => {}
                Err(error) => debug!(address = %target, %error, "Skipping received value"),
            }
        }
        applied
    }

    /// Apply every DT1 in `events`, returning the changed indices in arrival order.
    pub fn apply_events(&self, registry: &mut ParameterRegistry, events: &[InboundEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|event| match event {
                InboundEvent::SysEx(SysExMessage {
                    body: SysExBody::DataSet { address, data },
                    ..
                }) => Some(self.apply_data_set(registry, *address, data)),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysex::checksum;
    use pg1000_params::{ParamGroup, RegistryConfig};
    use std::collections::VecDeque;

    fn setup() -> (ProtocolEngine, ParameterRegistry) {
        let registry = ParameterRegistry::d50(RegistryConfig::default()).unwrap();
        let engine = ProtocolEngine::new(ProtocolConfig::default(), registry.len()).unwrap();
        (engine, registry)
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    }

    fn dt1(device: u8, address: [u8; 3], data: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xF0, 0x41, device, 0x14, 0x12];
        bytes.extend_from_slice(&address);
        bytes.extend_from_slice(data);
        bytes.push(checksum(&bytes[4..]));
        bytes.push(0xF7);
        bytes
    }

    #[test]
    fn test_config_validation() {
        assert!(ProtocolConfig::default().validate().is_ok());
        let config = ProtocolConfig {
            channel: 0,
            ..ProtocolConfig::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidChannel(0)));
        let config = ProtocolConfig {
            max_sysex_len: 8,
            ..ProtocolConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_send_cc_rate_limited() {
        let t0 = Instant::now();
        let (mut engine, _) = setup();
        let mut tx = Vec::new();

        assert!(engine.send_cc(&mut tx, 3, 7, 100, t0).unwrap());
        assert!(!engine
            .send_cc(&mut tx, 3, 7, 101, t0 + Duration::from_millis(5))
            .unwrap());

        assert_eq!(tx, vec![0xB0, 7, 100]);
        assert_eq!(engine.stats().messages_sent, 1);
        assert_eq!(engine.stats().sends_suppressed, 1);
    }

    #[test]
    fn test_send_cc_errors() {
        let (mut engine, _) = setup();
        let mut tx = Vec::new();
        let now = Instant::now();

        assert_eq!(
            engine.send_cc(&mut tx, 0, 7, 128, now),
            Err(Error::ValueOutOfRange { value: 128, max: 127 })
        );
        assert_eq!(
            engine.send_cc(&mut tx, 100_000, 7, 1, now),
            Err(Error::InvalidParameter(100_000))
        );
        assert!(tx.is_empty());
    }

    #[test]
    fn test_cc_disabled() {
        let (mut engine, _) = setup();
        engine.set_cc_enabled(false);
        let mut tx = Vec::new();
        assert!(!engine.send_cc(&mut tx, 0, 7, 1, Instant::now()).unwrap());
        assert!(tx.is_empty());
    }

    #[test]
    fn test_program_change_follows_channel() {
        let (mut engine, _) = setup();
        let mut tx = Vec::new();
        engine.set_channel(10).unwrap();
        engine.send_program_change(&mut tx, 33).unwrap();
        assert_eq!(tx, vec![0xC9, 33]);
        assert_eq!(engine.set_channel(17), Err(Error::InvalidChannel(17)));
        assert_eq!(engine.channel(), 10);
    }

    #[test]
    fn test_send_parameter_dt1_and_cc() {
        let now = Instant::now();
        let (mut engine, mut registry) = setup();
        let index = registry.find_by_name(ParamGroup::Patch, "Total Volume").unwrap();
        let mut tx = Vec::new();

        assert!(engine
            .update_and_send(&mut tx, &mut registry, index, ValueSource::Direct(100), now)
            .unwrap());

        let mut expected = dt1(0x00, [0x00, 0x03, 0x20], &[100]);
        expected.extend_from_slice(&[0xB0, 7, 127]);
        assert_eq!(tx, expected);
        assert_eq!(engine.stats().messages_sent, 2);
    }

    #[test]
    fn test_send_parameter_respects_switches() {
        let now = Instant::now();
        let (mut engine, registry) = setup();
        let coarse = registry
            .find_by_address(SysExAddress::new(0x00, 0x01, 0x40))
            .unwrap();
        let mut tx = Vec::new();

        engine.set_sysex_enabled(false);
        assert!(!engine.send_parameter(&mut tx, &registry, coarse, now).unwrap());
        assert!(tx.is_empty());
        // No slot was claimed, so a later send is not suppressed
        engine.set_sysex_enabled(true);
        assert!(engine.send_parameter(&mut tx, &registry, coarse, now).unwrap());
        assert_eq!(tx.len(), 11);
    }

    #[test]
    fn test_unchanged_value_is_not_sent() {
        let now = Instant::now();
        let (mut engine, mut registry) = setup();
        let index = registry.find_by_name(ParamGroup::Patch, "Chase Time").unwrap();
        let mut tx = Vec::new();

        assert!(!engine
            .update_and_send(&mut tx, &mut registry, index, ValueSource::Direct(0), now)
            .unwrap());
        assert!(tx.is_empty());
    }

    #[test]
    fn test_requests() {
        let (mut engine, registry) = setup();
        let mut tx = Vec::new();

        engine.request_patch_dump(&mut tx).unwrap();
        assert_eq!(
            &tx[..11],
            &[0xF0, 0x41, 0x00, 0x14, 0x11, 0x00, 0x00, 0x00, 0x00, 0x03, 0x25]
        );
        assert_eq!(tx.len(), RQ1_LEN);

        tx.clear();
        let index = registry.find_by_name(ParamGroup::Patch, "Key Mode").unwrap();
        engine.request_parameter(&mut tx, &registry, index).unwrap();
        assert_eq!(&tx[5..11], &[0x00, 0x03, 0x12, 0x00, 0x00, 0x01]);

        tx.clear();
        engine.send_patch_write(&mut tx).unwrap();
        assert_eq!(tx, dt1(0x00, [0x00, 0x20, 0x00], &[0x00, 0x00]));
    }

    #[test]
    fn test_inbound_data_set_applied() {
        let (mut engine, mut registry) = setup();
        let mut rx: VecDeque<u8> = dt1(0x00, [0x00, 0x01, 0x40], &[0x40, 55]).into();

        let events = engine.poll_transport(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(engine.stats().inbound_accepted, 1);

        let changed = engine.apply_events(&mut registry, &events);
        let coarse = registry
            .find_by_address(SysExAddress::new(0x00, 0x01, 0x40))
            .unwrap();
        let fine = registry
            .find_by_address(SysExAddress::new(0x00, 0x01, 0x41))
            .unwrap();
        assert_eq!(changed, vec![coarse, fine]);
        assert_eq!(registry.get(coarse).unwrap().value(), 64);
        assert_eq!(registry.get(fine).unwrap().value(), 55);
        assert!(registry.get(fine).unwrap().is_changed());
    }

    #[test]
    fn test_full_dump_chunk_fits_default_buffer() {
        let (mut engine, mut registry) = setup();
        let data: Vec<u8> = (0..crate::sysex::DUMP_CHUNK_LEN)
            .map(|i| {
                SysExAddress::ZERO
                    .offset(i as u32)
                    .and_then(|address| registry.find_by_address(address))
                    .map_or(0, |index| registry.get(index).unwrap().max)
            })
            .collect();
        let bytes = dt1(0x00, [0x00, 0x00, 0x00], &data);
        assert_eq!(bytes.len(), ProtocolConfig::default().max_sysex_len);
        let mut rx: VecDeque<u8> = bytes.into();

        let events = engine.poll_transport(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(engine.stats().inbound_dropped, 0);

        assert!(!engine.apply_events(&mut registry, &events).is_empty());
        let covered = (0..registry.len())
            .filter_map(|index| registry.get(index))
            .filter(|param| (param.address.to_linear() as usize) < data.len());
        for param in covered {
            assert_eq!(param.value(), param.max, "{}", param.name);
        }
    }

    #[test]
    fn test_inbound_skips_out_of_range_and_unknown() {
        init_tracing();
        let (engine, mut registry) = setup();
        // Coarse tops out at 72; offset 0x36 has no parameter
        let coarse = registry
            .find_by_address(SysExAddress::new(0x00, 0x01, 0x40))
            .unwrap();
        let changed = engine.apply_data_set(&mut registry, SysExAddress::new(0x00, 0x01, 0x40), &[100]);
        assert!(changed.is_empty());
        assert_eq!(registry.get(coarse).unwrap().value(), 0);

        let changed =
            engine.apply_data_set(&mut registry, SysExAddress::new(0x00, 0x01, 0x76), &[1, 2]);
        assert!(changed.is_empty());

        // Only framing drops are counted
        assert_eq!(engine.stats().inbound_dropped, 0);
    }

    #[test]
    fn test_foreign_device_is_dropped() {
        init_tracing();
        let (mut engine, _) = setup();
        let mut rx: VecDeque<u8> = dt1(0x05, [0x00, 0x01, 0x40], &[1]).into();

        assert!(engine.poll_transport(&mut rx).is_empty());
        assert_eq!(engine.stats().inbound_dropped, 1);
    }

    #[test]
    fn test_bad_checksum_counted_not_returned() {
        init_tracing();
        let (mut engine, _) = setup();
        let mut bytes = dt1(0x00, [0x00, 0x01, 0x40], &[1]);
        bytes[8] = 2;
        let mut rx: VecDeque<u8> = bytes.into();

        assert!(engine.poll_transport(&mut rx).is_empty());
        assert_eq!(engine.stats().inbound_dropped, 1);
        assert_eq!(engine.stats().inbound_accepted, 0);
    }

    #[test]
    fn test_drain_queue() {
        let (mut engine, _) = setup();
        let (mut producer, mut consumer) = crate::inbound_queue(32);
        let mut port: VecDeque<u8> = [0xF8, 0xB0, 1, 2].into_iter().collect();
        producer.service(&mut port);

        let events = engine.drain_queue(&mut consumer);
        assert_eq!(
            events,
            vec![
                InboundEvent::RealTime(0xF8),
                InboundEvent::Channel {
                    status: 0xB0,
                    data1: 1,
                    data2: Some(2)
                }
            ]
        );
    }
}
