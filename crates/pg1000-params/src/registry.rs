//! The parameter table and its single value-update entry point.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::address::SysExAddress;
use crate::error::{Error, Result};
use crate::filter::ExponentialFilter;
use crate::parameter::{ParamGroup, Parameter};
use crate::selection::SelectionGate;
use crate::table::{self, Entry};

/// Value-space smoothing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Exponential filter coefficient, `0 < alpha <= 1`.
    pub alpha: f32,
    /// A filtered value must move further than this from the committed value to commit.
    pub deadband: f32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            deadband: 0.6,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.alpha.is_nan() || self.alpha <= 0.0 || self.alpha > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "filter alpha {} outside (0, 1]",
                self.alpha
            )));
        }
        if self.deadband.is_nan() || self.deadband < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "deadband {} must be non-negative",
                self.deadband
            )));
        }
        Ok(())
    }
}

/// Where a new value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Scaled pot reading; filtered and deadbanded.
    Pot(u8),
    /// Increment/decrement edit; committed immediately.
    Direct(u8),
    /// Value reported by the instrument; committed immediately.
    Received(u8),
}

impl ValueSource {
    #[inline]
    pub fn value(self) -> u8 {
        match self {
            ValueSource::Pot(v) | ValueSource::Direct(v) | ValueSource::Received(v) => v,
        }
    }
}

/// Fixed parameter table with co-indexed filter state.
///
/// Lookups are linear scans over the table.
pub struct ParameterRegistry {
    config: RegistryConfig,
    params: Vec<Parameter>,
    filters: Vec<ExponentialFilter>,
}

impl ParameterRegistry {
    pub fn new(params: Vec<Parameter>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        for (index, param) in params.iter().enumerate() {
            if param.min > param.max || !param.contains(param.value) {
                return Err(Error::InvalidConfig(format!(
                    "{} has an empty or inconsistent range",
                    param.name
                )));
            }
            if params[..index].iter().any(|other| other.address == param.address) {
                return Err(Error::InvalidConfig(format!(
                    "address {} is used twice",
                    param.address
                )));
            }
        }

        let filters = params
            .iter()
            .map(|param| ExponentialFilter::new(config.alpha, f32::from(param.value)))
            .collect();

        Ok(Self {
            config,
            params,
            filters,
        })
    }

    /// The full D-50 map: four partials, two commons, and the patch block.
    pub fn d50(config: RegistryConfig) -> Result<Self> {
        let mut params = Vec::new();

        let blocks: [(ParamGroup, &[Entry]); 6] = [
            (ParamGroup::UpperPartial1, table::PARTIAL),
            (ParamGroup::UpperPartial2, table::PARTIAL),
            (ParamGroup::UpperCommon, table::COMMON),
            (ParamGroup::LowerPartial1, table::PARTIAL),
            (ParamGroup::LowerPartial2, table::PARTIAL),
            (ParamGroup::LowerCommon, table::COMMON),
        ];
        for (group, entries) in blocks {
            for entry in entries {
                params.push(build(entry, group)?);
            }
        }
        for entry in table::PATCH {
            let group = if entry.shared {
                ParamGroup::Shared
            } else {
                ParamGroup::Patch
            };
            params.push(build(entry, group)?);
        }

        debug!(count = params.len(), "Built D-50 parameter table");
        Self::new(params, config)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn find_by_address(&self, address: SysExAddress) -> Option<usize> {
        self.params.iter().position(|p| p.address == address)
    }

    /// First parameter owned by `pot`.
    pub fn find_by_pot(&self, pot: u8) -> Option<usize> {
        self.params.iter().position(|p| p.pot == Some(pot))
    }

    /// Every parameter owned by `pot`, in table order.
    pub fn params_for_pot(&self, pot: u8) -> impl Iterator<Item = usize> + '_ {
        self.params
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.pot == Some(pot))
            .map(|(index, _)| index)
    }

    pub fn find_by_name(&self, group: ParamGroup, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|p| p.group == group && p.name == name)
    }

    /// Filtered (uncommitted) value.
    pub fn filtered_value(&self, index: usize) -> Option<f32> {
        self.filters.get(index).map(ExponentialFilter::current)
    }

    /// Refresh every parameter's `active` flag from the gate.
    pub fn apply_gate(&mut self, gate: &SelectionGate) {
        for param in &mut self.params {
            param.active = gate.can_edit(param.group);
        }
    }

    /// The single mutator of `value` / `prev_value`.
    ///
    /// Returns whether the committed value changed.
    pub fn update_value(&mut self, index: usize, source: ValueSource) -> Result<bool> {
        let param = self.params.get(index).ok_or(Error::InvalidIndex(index))?;
        let input = source.value();
        if !param.contains(input) {
            return Err(Error::ValueOutOfRange {
                value: input,
                min: param.min,
                max: param.max,
            });
        }

        let filter = &mut self.filters[index];
        match source {
            ValueSource::Pot(_) => {
                let filtered = filter.step(f32::from(input));
                Ok(self.commit_filtered(index, filtered))
            }
            ValueSource::Direct(_) | ValueSource::Received(_) => {
                filter.snap(f32::from(input));
                Ok(self.commit(index, input))
            }
        }
    }

    /// Advance every unsettled filter one step and commit those that cross the deadband.
    ///
    /// Parameters rejected by `allow` keep their filter state untouched. Returns the
    /// indices whose committed value changed.
    pub fn settle<F>(&mut self, mut allow: F) -> Vec<usize>
    where
        F: FnMut(&Parameter) -> bool,
    {
        let mut committed = Vec::new();
        for index in 0..self.params.len() {
            if self.filters[index].target().is_none() || !allow(&self.params[index]) {
                continue;
            }
            if let Some(filtered) = self.filters[index].settle() {
                if self.commit_filtered(index, filtered) {
                    committed.push(index);
                }
            }
        }
        committed
    }

    /// Indices whose change flag was set, clearing the flags.
    pub fn take_changed(&mut self) -> Vec<usize> {
        self.params
            .iter_mut()
            .enumerate()
            .filter_map(|(index, p)| std::mem::take(&mut p.changed).then_some(index))
            .collect()
    }

    fn commit_filtered(&mut self, index: usize, filtered: f32) -> bool {
        let param = &self.params[index];
        let settled = self.filters[index].target().is_none();
        let moved = (filtered - f32::from(param.value)).abs() > self.config.deadband;
        if !(moved || settled) {
            return false;
        }
        let rounded = filtered.round().clamp(f32::from(param.min), f32::from(param.max)) as u8;
        self.commit(index, rounded)
    }

    fn commit(&mut self, index: usize, value: u8) -> bool {
        let param = &mut self.params[index];
        if param.value == value {
            return false;
        }
        trace!(name = param.name, group = %param.group, from = param.value, to = value, "Commit");
        param.prev_value = param.value;
        param.value = value;
        param.changed = true;
        true
    }
}

fn build(entry: &Entry, group: ParamGroup) -> Result<Parameter> {
    let address = group
        .base_address()
        .offset(u32::from(entry.offset))
        .ok_or_else(|| Error::InvalidConfig(format!("{} overflows the address map", entry.name)))?;

    let mut param = Parameter::new(entry.name, address, entry.kind, group).with_range(0, entry.max);
    if let Some(pot) = entry.pot {
        param = param.with_pot(pot);
    }
    if let Some(cc) = entry.cc {
        param = param.with_cc(cc);
    }
    Ok(param)
}
