//! Test collaborators and fixtures for controller integration tests.
//!
//! Every hardware seam is replaced by an in-memory double that records what the
//! controller did, so a test drives time and input explicitly and inspects the result.

#![allow(dead_code)]

use std::collections::VecDeque;

use pg1000::input::{registers, AnalogConfig};
use pg1000::prelude::*;

/// Analog front end returning one fixed sample per channel.
pub struct ScriptedAdc {
    channels_per_chip: u8,
    samples: Vec<u16>,
}

impl ScriptedAdc {
    pub fn new(config: &AnalogConfig) -> Self {
        Self {
            channels_per_chip: config.channels_per_chip,
            samples: vec![0; config.channel_count()],
        }
    }

    pub fn set(&mut self, pot: usize, raw: u16) {
        self.samples[pot] = raw;
    }
}

impl AnalogTransfer for ScriptedAdc {
    fn transfer(&mut self, chip: u8, channel: u8) -> u16 {
        let pot = usize::from(chip) * usize::from(self.channels_per_chip) + usize::from(channel);
        self.samples[pot]
    }
}

/// Port expander with active-low inputs. Output latch writes are recorded, not looped back.
#[derive(Default)]
pub struct Expander {
    pressed: u16,
    pub writes: Vec<(u8, u8)>,
}

impl Expander {
    pub fn press(&mut self, bit: u8) {
        self.pressed |= 1 << bit;
    }

    pub fn release(&mut self, bit: u8) {
        self.pressed &= !(1 << bit);
    }

    /// Most recent byte written to the port B output latch.
    pub fn led_latch(&self) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(reg, _)| *reg == registers::GPIOB)
            .map(|&(_, value)| value)
    }
}

impl RegisterIo for Expander {
    fn write_register(&mut self, reg: u8, value: u8) {
        self.writes.push((reg, value));
    }

    fn read_register(&mut self, reg: u8) -> u8 {
        let [low, high] = (!self.pressed).to_le_bytes();
        match reg {
            registers::GPIOA => low,
            registers::GPIOB => high,
            _ => 0,
        }
    }
}

/// Serial port: bytes sent are collected, bytes injected are received in order.
#[derive(Default)]
pub struct Loopback {
    pub sent: Vec<u8>,
    pub inbound: VecDeque<u8>,
}

impl Loopback {
    pub fn inject(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }
}

impl ByteSink for Loopback {
    fn send_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }
}

impl ByteSource for Loopback {
    fn is_readable(&mut self) -> bool {
        !self.inbound.is_empty()
    }

    fn receive_byte(&mut self) -> u8 {
        self.inbound.pop_front().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<(String, String)>,
}

impl RecordingDisplay {
    pub fn last(&self) -> Option<(&str, &str)> {
        self.frames
            .last()
            .map(|(line1, line2)| (line1.as_str(), line2.as_str()))
    }
}

impl TextDisplay for RecordingDisplay {
    fn show(&mut self, line1: &str, line2: &str) {
        self.frames.push((line1.to_string(), line2.to_string()));
    }
}

pub type TestController = Controller<ScriptedAdc, Expander, Loopback, RecordingDisplay>;

/// Defaults with instant debounce so a single poll registers a press.
pub fn test_config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.digital.debounce_ms = 0;
    config
}

pub fn test_controller_with(config: ControllerConfig) -> TestController {
    Controller::builder()
        .adc(ScriptedAdc::new(&config.analog))
        .io(Expander::default())
        .transport(Loopback::default())
        .display(RecordingDisplay::default())
        .config(config)
        .build()
        .expect("Failed to build test controller")
}

pub fn test_controller() -> TestController {
    test_controller_with(test_config())
}

/// Install a subscriber that prints through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn at(t0: Instant, ms: u64) -> Instant {
    t0 + Duration::from_millis(ms)
}

/// Every exclusive message in `bytes`, each `F0 .. F7` inclusive.
pub fn exclusive_messages(bytes: &[u8]) -> Vec<&[u8]> {
    let mut messages = Vec::new();
    let mut start = None;
    for (i, &byte) in bytes.iter().enumerate() {
        match byte {
            0xF0 => start = Some(i),
            0xF7 => {
                if let Some(s) = start.take() {
                    messages.push(&bytes[s..=i]);
                }
            }
            _ => {}
        }
    }
    messages
}
