//! Debounced buttons and time-driven LEDs on a register-addressed I/O expander.
//!
//! The expander exposes two 8-bit ports. Port A carries buttons only; port B carries
//! LED outputs in its low bits and further buttons in its high bits. Buttons are wired
//! active-low against pull-ups, so the raw port word is inverted before debouncing.
//!
//! LED patterns are a pure function of the time elapsed since the LED's state was last
//! set, so re-driving at any cadence produces the same output.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Raw register access on the I/O expander.
pub trait RegisterIo {
    fn write_register(&mut self, reg: u8, value: u8);
    fn read_register(&mut self, reg: u8) -> u8;
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn write_register(&mut self, reg: u8, value: u8) {
        (**self).write_register(reg, value)
    }

    fn read_register(&mut self, reg: u8) -> u8 {
        (**self).read_register(reg)
    }
}

/// Register map (bank 0 addressing).
pub mod registers {
    pub const IODIRA: u8 = 0x00;
    pub const IODIRB: u8 = 0x01;
    pub const GPPUA: u8 = 0x0C;
    pub const GPPUB: u8 = 0x0D;
    pub const GPIOA: u8 = 0x12;
    pub const GPIOB: u8 = 0x13;
}

/// Indices into [`PANEL_BUTTONS`].
pub mod button {
    pub const UPPER: usize = 0;
    pub const LOWER: usize = 1;
    pub const PARTIAL: usize = 2;
    pub const WRITE: usize = 3;
    pub const MODE: usize = 4;
    pub const INC: usize = 5;
    pub const DEC: usize = 6;
    pub const ENTER: usize = 7;
    pub const EXIT: usize = 8;
    pub const MENU: usize = 9;
}

/// Indices into [`PANEL_LEDS`].
pub mod led {
    pub const UPPER: usize = 0;
    pub const LOWER: usize = 1;
    pub const PARTIAL: usize = 2;
    pub const MIDI: usize = 3;
    pub const WRITE: usize = 4;
    pub const ERROR: usize = 5;
}

/// A button's position in the 16-bit input word (port A = bits 0..7, port B = bits 8..15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonSpec {
    pub bit: u8,
    pub name: &'static str,
}

/// An LED's bit on port B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSpec {
    pub bit: u8,
    pub name: &'static str,
}

pub const PANEL_BUTTONS: [ButtonSpec; 10] = [
    ButtonSpec { bit: 0, name: "UPPER" },
    ButtonSpec { bit: 1, name: "LOWER" },
    ButtonSpec { bit: 2, name: "PARTIAL" },
    ButtonSpec { bit: 3, name: "WRITE" },
    ButtonSpec { bit: 4, name: "MODE" },
    ButtonSpec { bit: 5, name: "INC" },
    ButtonSpec { bit: 6, name: "DEC" },
    ButtonSpec { bit: 7, name: "ENTER" },
    ButtonSpec { bit: 14, name: "EXIT" },
    ButtonSpec { bit: 15, name: "MENU" },
];

pub const PANEL_LEDS: [LedSpec; 6] = [
    LedSpec { bit: 0, name: "UPPER" },
    LedSpec { bit: 1, name: "LOWER" },
    LedSpec { bit: 2, name: "PARTIAL" },
    LedSpec { bit: 3, name: "MIDI" },
    LedSpec { bit: 4, name: "WRITE" },
    LedSpec { bit: 5, name: "ERROR" },
];

/// Timing for the digital engine, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitalConfig {
    pub debounce_ms: u64,
    pub slow_blink_ms: u64,
    pub fast_blink_ms: u64,
}

impl Default for DigitalConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 5,
            slow_blink_ms: 500,
            fast_blink_ms: 100,
        }
    }
}

impl DigitalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slow_blink_ms == 0 || self.fast_blink_ms == 0 {
            return Err(Error::InvalidConfig(
                "blink periods must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// LED indication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedState {
    #[default]
    Off,
    On,
    BlinkSlow,
    BlinkFast,
}

impl LedState {
    /// Whether an LED in this state is lit `elapsed` after the state was set.
    ///
    /// Blinking LEDs are dark for the first period and lit for the second.
    pub fn is_lit(self, elapsed: Duration, config: &DigitalConfig) -> bool {
        let period_ms = match self {
            LedState::Off => return false,
            LedState::On => return true,
            LedState::BlinkSlow => config.slow_blink_ms,
            LedState::BlinkFast => config.fast_blink_ms,
        };
        (elapsed.as_millis() / u128::from(period_ms.max(1))) % 2 == 1
    }
}

/// A debounce edge, carrying the button index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed(usize),
    Released(usize),
}

impl Edge {
    pub fn button(&self) -> usize {
        match *self {
            Edge::Pressed(index) | Edge::Released(index) => index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Button {
    pub bit: u8,
    pub name: &'static str,
    state: bool,
    prev_state: bool,
    last_change: Option<Instant>,
    pressed_at: Option<Instant>,
}

impl Button {
    fn new(spec: ButtonSpec) -> Self {
        Self {
            bit: spec.bit,
            name: spec.name,
            state: false,
            prev_state: false,
            last_change: None,
            pressed_at: None,
        }
    }

    /// Debounced level.
    #[inline]
    pub fn state(&self) -> bool {
        self.state
    }

    #[inline]
    pub fn prev_state(&self) -> bool {
        self.prev_state
    }

    /// Start of the pending (not yet accepted) transition, if any.
    #[inline]
    pub fn last_change(&self) -> Option<Instant> {
        self.last_change
    }

    fn debounce(&mut self, raw: bool, now: Instant, interval: Duration) -> Option<bool> {
        self.prev_state = self.state;

        if raw == self.state {
            self.last_change = None;
            return None;
        }

        let since = *self.last_change.get_or_insert(now);
        if now.saturating_duration_since(since) < interval {
            return None;
        }

        self.state = raw;
        self.last_change = None;
        self.pressed_at = raw.then_some(now);
        Some(raw)
    }
}

#[derive(Debug, Clone)]
pub struct Led {
    pub bit: u8,
    pub name: &'static str,
    state: LedState,
    since: Option<Instant>,
}

impl Led {
    fn new(spec: LedSpec) -> Self {
        Self {
            bit: spec.bit,
            name: spec.name,
            state: LedState::Off,
            since: None,
        }
    }

    #[inline]
    pub fn state(&self) -> LedState {
        self.state
    }

    /// When the current state was set.
    #[inline]
    pub fn since(&self) -> Option<Instant> {
        self.since
    }

    fn is_lit(&self, now: Instant, config: &DigitalConfig) -> bool {
        let elapsed = self
            .since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        self.state.is_lit(elapsed, config)
    }
}

/// Button debounce and LED drive for one expander.
pub struct DigitalEngine {
    config: DigitalConfig,
    buttons: Vec<Button>,
    leds: Vec<Led>,
}

impl DigitalEngine {
    /// Engine with the standard panel layout.
    pub fn new(config: DigitalConfig) -> Result<Self> {
        Self::with_layout(config, &PANEL_BUTTONS, &PANEL_LEDS)
    }

    pub fn with_layout(
        config: DigitalConfig,
        buttons: &[ButtonSpec],
        leds: &[LedSpec],
    ) -> Result<Self> {
        config.validate()?;

        let mut used: u16 = 0;
        for spec in buttons {
            if spec.bit >= 16 {
                return Err(Error::InvalidConfig(format!(
                    "button {} on bit {} is outside the input word",
                    spec.name, spec.bit
                )));
            }
            let mask = 1u16 << spec.bit;
            if used & mask != 0 {
                return Err(Error::InvalidConfig(format!(
                    "bit {} is assigned twice",
                    spec.bit
                )));
            }
            used |= mask;
        }
        for spec in leds {
            if spec.bit >= 8 {
                return Err(Error::InvalidConfig(format!(
                    "LED {} on bit {} is outside port B",
                    spec.name, spec.bit
                )));
            }
            let mask = 1u16 << (spec.bit + 8);
            if used & mask != 0 {
                return Err(Error::InvalidConfig(format!(
                    "port B bit {} is assigned twice",
                    spec.bit
                )));
            }
            used |= mask;
        }

        Ok(Self {
            config,
            buttons: buttons.iter().copied().map(Button::new).collect(),
            leds: leds.iter().copied().map(Led::new).collect(),
        })
    }

    pub fn config(&self) -> &DigitalConfig {
        &self.config
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn leds(&self) -> &[Led] {
        &self.leds
    }

    fn led_bits(&self) -> u8 {
        self.leds.iter().fold(0u8, |mask, led| mask | (1 << led.bit))
    }

    /// Program port directions and pull-ups, and switch every LED off.
    pub fn init<I: RegisterIo + ?Sized>(&mut self, io: &mut I) {
        let led_bits = self.led_bits();
        io.write_register(registers::IODIRA, 0xFF);
        io.write_register(registers::GPPUA, 0xFF);
        io.write_register(registers::IODIRB, !led_bits);
        io.write_register(registers::GPPUB, !led_bits);
        io.write_register(registers::GPIOB, 0x00);

        for led in &mut self.leds {
            led.state = LedState::Off;
            led.since = None;
        }
        debug!(
            buttons = self.buttons.len(),
            leds = self.leds.len(),
            "Digital I/O initialized"
        );
    }

    /// Read both ports and return the active-high 16-bit input word.
    pub fn read_inputs<I: RegisterIo + ?Sized>(&self, io: &mut I) -> u16 {
        let port_a = u16::from(io.read_register(registers::GPIOA));
        let port_b = u16::from(io.read_register(registers::GPIOB));
        !(port_a | (port_b << 8))
    }

    /// Run one debounce step against an already-inverted input word.
    pub fn debounce(&mut self, raw: u16, now: Instant) -> SmallVec<[Edge; 4]> {
        let interval = self.config.debounce();
        let mut edges = SmallVec::new();

        for (index, button) in self.buttons.iter_mut().enumerate() {
            let level = (raw >> button.bit) & 1 == 1;
            if let Some(pressed) = button.debounce(level, now, interval) {
                trace!(button = button.name, pressed, "Button edge");
                edges.push(if pressed {
                    Edge::Pressed(index)
                } else {
                    Edge::Released(index)
                });
            }
        }

        edges
    }

    pub fn poll_buttons<I: RegisterIo + ?Sized>(
        &mut self,
        io: &mut I,
        now: Instant,
    ) -> SmallVec<[Edge; 4]> {
        let raw = self.read_inputs(io);
        self.debounce(raw, now)
    }

    fn button(&self, index: usize) -> Result<&Button> {
        self.buttons.get(index).ok_or(Error::InvalidButton(index))
    }

    /// True only on the poll where the debounced state went false -> true.
    pub fn get_pressed(&self, index: usize) -> Result<bool> {
        let button = self.button(index)?;
        Ok(button.state && !button.prev_state)
    }

    /// True only on the poll where the debounced state went true -> false.
    pub fn get_released(&self, index: usize) -> Result<bool> {
        let button = self.button(index)?;
        Ok(!button.state && button.prev_state)
    }

    pub fn is_held(&self, index: usize) -> Result<bool> {
        Ok(self.button(index)?.state)
    }

    /// How long the button has been held, or `None` if it is up.
    pub fn held_for(&self, index: usize, now: Instant) -> Result<Option<Duration>> {
        let button = self.button(index)?;
        Ok(button
            .state
            .then(|| button.pressed_at.map(|at| now.saturating_duration_since(at)))
            .flatten())
    }

    pub fn led_state(&self, index: usize) -> Result<LedState> {
        self.leds
            .get(index)
            .map(Led::state)
            .ok_or(Error::InvalidLed(index))
    }

    /// Change an LED's indication. Setting the current state again keeps its blink phase.
    pub fn set_led(&mut self, index: usize, state: LedState, now: Instant) -> Result<()> {
        let led = self.leds.get_mut(index).ok_or(Error::InvalidLed(index))?;
        if led.state != state {
            led.state = state;
            led.since = Some(now);
        }
        Ok(())
    }

    /// Port B output byte for this instant.
    pub fn led_mask(&self, now: Instant) -> u8 {
        self.leds
            .iter()
            .filter(|led| led.is_lit(now, &self.config))
            .fold(0u8, |mask, led| mask | (1 << led.bit))
    }

    pub fn drive_leds<I: RegisterIo + ?Sized>(&self, io: &mut I, now: Instant) {
        io.write_register(registers::GPIOB, self.led_mask(now));
    }

    /// Debounce the inputs, then drive the LEDs.
    pub fn poll<I: RegisterIo + ?Sized>(&mut self, io: &mut I, now: Instant) -> SmallVec<[Edge; 4]> {
        let edges = self.poll_buttons(io, now);
        self.drive_leds(io, now);
        edges
    }
}
