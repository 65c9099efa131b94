//! Analog conditioning over banks of multiplexed ADC chips.
//!
//! Each (chip, channel) pair owns a [`ValueSmoother`], a [`CalibrationRange`], and a
//! cached value with a change flag. The read path is:
//!
//! raw sample -> moving average -> calibration rescale -> hysteresis -> cache
//!
//! The change flag is delivered at most once: [`AnalogEngine::has_changed`] clears it.
//! There must be a single consumer of change notifications; two readers would race
//! for the same flag.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::smoother::{
    apply_hysteresis, ValueSmoother, DEFAULT_HYSTERESIS, DEFAULT_WINDOW, MAX_WINDOW,
};

/// Full-scale raw sample for a 10-bit converter.
pub const MAX_RAW: u16 = 1023;

/// Raw analog transfer collaborator.
///
/// Returns one sample in `0..=MAX_RAW` for the given chip and channel. Synchronous.
pub trait AnalogTransfer {
    fn transfer(&mut self, chip: u8, channel: u8) -> u16;
}

impl<T: AnalogTransfer + ?Sized> AnalogTransfer for &mut T {
    fn transfer(&mut self, chip: u8, channel: u8) -> u16 {
        (**self).transfer(chip, channel)
    }
}

/// Configuration for the analog engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalogConfig {
    /// Number of ADC chips on the bus.
    pub chips: u8,
    /// Channels multiplexed per chip.
    pub channels_per_chip: u8,
    /// Moving-average window, in samples.
    pub window: usize,
    /// Hysteresis threshold on the normalized value.
    pub hysteresis: u16,
    /// Raw samples taken per channel by [`AnalogEngine::calibrate`].
    pub calibration_samples: usize,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            chips: 7,
            channels_per_chip: 8,
            window: DEFAULT_WINDOW,
            hysteresis: DEFAULT_HYSTERESIS,
            calibration_samples: 100,
        }
    }
}

impl AnalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chips == 0 || self.channels_per_chip == 0 {
            return Err(Error::InvalidConfig(format!(
                "analog layout {}x{} has no channels",
                self.chips, self.channels_per_chip
            )));
        }
        if self.window == 0 {
            return Err(Error::InvalidConfig(
                "smoothing window must be at least 1".to_string(),
            ));
        }
        if self.window > MAX_WINDOW {
            return Err(Error::InvalidConfig(format!(
                "smoothing window {} exceeds {MAX_WINDOW}",
                self.window
            )));
        }
        if self.calibration_samples == 0 {
            return Err(Error::InvalidConfig(
                "calibration needs at least one sample".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        usize::from(self.chips) * usize::from(self.channels_per_chip)
    }
}

/// Observed raw bounds for one channel.
///
/// Starts inverted (`min_seen = MAX_RAW`, `max_seen = 0`) so the first calibration pass
/// widens correctly. Until `min_seen < max_seen`, normalization is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub min_seen: u16,
    pub max_seen: u16,
}

impl CalibrationRange {
    pub const UNCALIBRATED: Self = Self {
        min_seen: MAX_RAW,
        max_seen: 0,
    };

    pub fn new(min_seen: u16, max_seen: u16) -> Self {
        Self { min_seen, max_seen }
    }

    #[inline]
    pub fn observe(&mut self, raw: u16) {
        self.min_seen = self.min_seen.min(raw);
        self.max_seen = self.max_seen.max(raw);
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.min_seen < self.max_seen
    }

    /// Rescale `value` from the observed range onto `0..=MAX_RAW`.
    #[inline]
    pub fn normalize(&self, value: u16) -> u16 {
        if !self.is_calibrated() {
            return value;
        }
        if value <= self.min_seen {
            return 0;
        }
        if value >= self.max_seen {
            return MAX_RAW;
        }
        let span = u32::from(self.max_seen - self.min_seen);
        (u32::from(value - self.min_seen) * u32::from(MAX_RAW) / span) as u16
    }
}

impl Default for CalibrationRange {
    fn default() -> Self {
        Self::UNCALIBRATED
    }
}

#[derive(Debug, Clone)]
struct ChannelState {
    smoother: ValueSmoother,
    calibration: CalibrationRange,
    value: u16,
    changed: bool,
}

impl ChannelState {
    fn new(window: usize) -> Self {
        Self {
            smoother: ValueSmoother::new(window),
            calibration: CalibrationRange::UNCALIBRATED,
            value: 0,
            changed: false,
        }
    }
}

/// Per-channel conditioning for every pot on the bus.
///
/// Channels are indexed linearly as `chip * channels_per_chip + channel`; that index is
/// the pot number used by the parameter registry.
pub struct AnalogEngine {
    config: AnalogConfig,
    channels: Vec<ChannelState>,
}

impl AnalogEngine {
    pub fn new(config: AnalogConfig) -> Result<Self> {
        config.validate()?;
        let channels = (0..config.channel_count())
            .map(|_| ChannelState::new(config.window))
            .collect();
        Ok(Self { config, channels })
    }

    pub fn config(&self) -> &AnalogConfig {
        &self.config
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Linear pot index for a (chip, channel) pair.
    pub fn pot_index(&self, chip: u8, channel: u8) -> Result<usize> {
        if chip >= self.config.chips || channel >= self.config.channels_per_chip {
            return Err(Error::InvalidChannel { chip, channel });
        }
        Ok(usize::from(chip) * usize::from(self.config.channels_per_chip) + usize::from(channel))
    }

    fn chip_channel(&self, pot: usize) -> (u8, u8) {
        let per_chip = usize::from(self.config.channels_per_chip);
        ((pot / per_chip) as u8, (pot % per_chip) as u8)
    }

    /// Pull one sample, condition it, and update the cache.
    ///
    /// Returns the cached (hysteresis-accepted) value after the update.
    pub fn read_channel<A>(&mut self, adc: &mut A, chip: u8, channel: u8) -> Result<u16>
    where
        A: AnalogTransfer + ?Sized,
    {
        let index = self.pot_index(chip, channel)?;
        let raw = adc.transfer(chip, channel).min(MAX_RAW);
        let threshold = self.config.hysteresis;

        let state = &mut self.channels[index];
        let smoothed = state.smoother.update(raw);
        let normalized = state.calibration.normalize(smoothed);
        let accepted = apply_hysteresis(normalized, state.value, threshold);

        if accepted != state.value {
            state.value = accepted;
            state.changed = true;
        }

        Ok(state.value)
    }

    /// Read every channel once. Returns how many channels now carry a pending change.
    pub fn read_all<A>(&mut self, adc: &mut A) -> usize
    where
        A: AnalogTransfer + ?Sized,
    {
        for pot in 0..self.channels.len() {
            let (chip, channel) = self.chip_channel(pot);
            // Indices come from our own layout, so the read cannot fail.
            let _ = self.read_channel(adc, chip, channel);
        }
        self.channels.iter().filter(|state| state.changed).count()
    }

    pub fn get_value(&self, chip: u8, channel: u8) -> Result<u16> {
        let index = self.pot_index(chip, channel)?;
        Ok(self.channels[index].value)
    }

    /// Report and clear the channel's change flag.
    pub fn has_changed(&mut self, chip: u8, channel: u8) -> Result<bool> {
        let index = self.pot_index(chip, channel)?;
        Ok(std::mem::take(&mut self.channels[index].changed))
    }

    /// Drain every pending change as `(pot, value)`, in pot order.
    pub fn take_changes(&mut self) -> Vec<(usize, u16)> {
        self.channels
            .iter_mut()
            .enumerate()
            .filter_map(|(pot, state)| std::mem::take(&mut state.changed).then_some((pot, state.value)))
            .collect()
    }

    pub fn calibration(&self, chip: u8, channel: u8) -> Result<CalibrationRange> {
        let index = self.pot_index(chip, channel)?;
        Ok(self.channels[index].calibration)
    }

    pub fn set_calibration(&mut self, chip: u8, channel: u8, range: CalibrationRange) -> Result<()> {
        let index = self.pot_index(chip, channel)?;
        self.channels[index].calibration = range;
        Ok(())
    }

    /// Blocking calibration pass.
    ///
    /// Takes `calibration_samples` unsmoothed readings per channel, widens each channel's
    /// range to cover them, then resets every smoother. Operator-invoked; not part of the
    /// steady-state loop.
    pub fn calibrate<A>(&mut self, adc: &mut A)
    where
        A: AnalogTransfer + ?Sized,
    {
        info!(
            channels = self.channels.len(),
            samples = self.config.calibration_samples,
            "Calibrating analog inputs"
        );

        for pot in 0..self.channels.len() {
            let (chip, channel) = self.chip_channel(pot);
            for _ in 0..self.config.calibration_samples {
                let raw = adc.transfer(chip, channel).min(MAX_RAW);
                self.channels[pot].calibration.observe(raw);
            }
            let range = self.channels[pot].calibration;
            if !range.is_calibrated() {
                debug!(chip, channel, "Channel saw no travel; normalization stays identity");
            }
        }

        for state in &mut self.channels {
            state.smoother.reset();
        }

        info!("Calibration complete");
    }
}
