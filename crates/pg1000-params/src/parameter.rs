//! Parameter identity, grouping and value types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::SysExAddress;

/// Keyfollow rate steps, in wire order.
pub const KEYFOLLOW_LABELS: [&str; 17] = [
    "-1", "-1/2", "-1/4", "0", "1/8", "1/4", "3/8", "1/2", "5/8", "3/4", "7/8", "1", "5/4",
    "3/2", "2", "s1", "s2",
];

/// Keyboard section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Upper,
    Lower,
}

/// Which block of the memory map a parameter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamGroup {
    UpperPartial1,
    UpperPartial2,
    UpperCommon,
    LowerPartial1,
    LowerPartial2,
    LowerCommon,
    Patch,
    /// Patch-block parameters that act on both sections (hold, portamento, bender).
    Shared,
}

impl ParamGroup {
    pub const ALL: [ParamGroup; 8] = [
        ParamGroup::UpperPartial1,
        ParamGroup::UpperPartial2,
        ParamGroup::UpperCommon,
        ParamGroup::LowerPartial1,
        ParamGroup::LowerPartial2,
        ParamGroup::LowerCommon,
        ParamGroup::Patch,
        ParamGroup::Shared,
    ];

    /// Start of the group's block.
    pub const fn base_address(self) -> SysExAddress {
        match self {
            ParamGroup::UpperPartial1 => SysExAddress::new(0x00, 0x00, 0x00),
            ParamGroup::UpperPartial2 => SysExAddress::new(0x00, 0x00, 0x40),
            ParamGroup::UpperCommon => SysExAddress::new(0x00, 0x01, 0x00),
            ParamGroup::LowerPartial1 => SysExAddress::new(0x00, 0x01, 0x40),
            ParamGroup::LowerPartial2 => SysExAddress::new(0x00, 0x02, 0x00),
            ParamGroup::LowerCommon => SysExAddress::new(0x00, 0x02, 0x40),
            ParamGroup::Patch | ParamGroup::Shared => SysExAddress::new(0x00, 0x03, 0x00),
        }
    }

    /// Two-character display tag.
    pub const fn label(self) -> &'static str {
        match self {
            ParamGroup::UpperPartial1 => "U1",
            ParamGroup::UpperPartial2 => "U2",
            ParamGroup::UpperCommon => "UC",
            ParamGroup::LowerPartial1 => "L1",
            ParamGroup::LowerPartial2 => "L2",
            ParamGroup::LowerCommon => "LC",
            ParamGroup::Patch => "PT",
            ParamGroup::Shared => "SH",
        }
    }

    pub const fn section(self) -> Option<Section> {
        match self {
            ParamGroup::UpperPartial1 | ParamGroup::UpperPartial2 | ParamGroup::UpperCommon => {
                Some(Section::Upper)
            }
            ParamGroup::LowerPartial1 | ParamGroup::LowerPartial2 | ParamGroup::LowerCommon => {
                Some(Section::Lower)
            }
            ParamGroup::Patch | ParamGroup::Shared => None,
        }
    }

    /// Partial number within the section (0 or 1) for partial-scoped groups.
    pub const fn partial(self) -> Option<usize> {
        match self {
            ParamGroup::UpperPartial1 | ParamGroup::LowerPartial1 => Some(0),
            ParamGroup::UpperPartial2 | ParamGroup::LowerPartial2 => Some(1),
            _ => None,
        }
    }

    pub const fn is_common(self) -> bool {
        matches!(self, ParamGroup::UpperCommon | ParamGroup::LowerCommon)
    }
}

impl fmt::Display for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a parameter's raw value is interpreted and shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Plain level, 0..=100 unless the table narrows it.
    Continuous100,
    /// Envelope time, 0..=50.
    Continuous50,
    /// Signed value stored with a fixed offset (`raw - offset`).
    Bipolar { offset: u8 },
    /// One of a fixed set of labelled choices.
    Enumerated { labels: &'static [&'static str] },
    /// One of the [`KEYFOLLOW_LABELS`] steps.
    KeyfollowRate,
}

impl ParamType {
    /// Largest raw value the type can express.
    pub const fn natural_max(self) -> u8 {
        match self {
            ParamType::Continuous100 => 100,
            ParamType::Continuous50 => 50,
            ParamType::Bipolar { offset } => offset.saturating_mul(2),
            ParamType::Enumerated { labels } => labels.len().saturating_sub(1) as u8,
            ParamType::KeyfollowRate => (KEYFOLLOW_LABELS.len() - 1) as u8,
        }
    }

    /// Raw value a freshly built parameter starts at.
    pub const fn initial(self) -> u8 {
        match self {
            ParamType::Bipolar { offset } => offset,
            _ => 0,
        }
    }

    pub fn format(self, value: u8) -> String {
        match self {
            ParamType::Continuous100 | ParamType::Continuous50 => value.to_string(),
            ParamType::Bipolar { offset } => {
                let signed = i16::from(value) - i16::from(offset);
                if signed > 0 {
                    format!("+{signed}")
                } else {
                    signed.to_string()
                }
            }
            ParamType::Enumerated { labels } => labels
                .get(usize::from(value))
                .map_or_else(|| value.to_string(), |label| (*label).to_string()),
            ParamType::KeyfollowRate => KEYFOLLOW_LABELS
                .get(usize::from(value))
                .map_or_else(|| value.to_string(), |label| (*label).to_string()),
        }
    }
}

/// One addressable synthesizer parameter.
///
/// Static identity is public; `value`, `prev_value` and the change flag are only moved by
/// [`ParameterRegistry::update_value`](crate::ParameterRegistry::update_value).
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: &'static str,
    pub address: SysExAddress,
    pub kind: ParamType,
    pub min: u8,
    pub max: u8,
    /// Owning potentiometer, if the parameter has a dedicated slider.
    pub pot: Option<u8>,
    pub cc: Option<u8>,
    pub group: ParamGroup,
    /// Whether the selection gate currently lets the parameter be edited.
    pub active: bool,
    pub(crate) value: u8,
    pub(crate) prev_value: u8,
    pub(crate) changed: bool,
}

impl Parameter {
    pub fn new(name: &'static str, address: SysExAddress, kind: ParamType, group: ParamGroup) -> Self {
        let initial = kind.initial();
        Self {
            name,
            address,
            kind,
            min: 0,
            max: kind.natural_max(),
            pot: None,
            cc: None,
            group,
            active: false,
            value: initial,
            prev_value: initial,
            changed: false,
        }
    }

    pub fn with_range(mut self, min: u8, max: u8) -> Self {
        self.min = min;
        self.max = max;
        self.value = self.value.clamp(min, max);
        self.prev_value = self.value;
        self
    }

    pub fn with_pot(mut self, pot: u8) -> Self {
        self.pot = Some(pot);
        self
    }

    pub fn with_cc(mut self, cc: u8) -> Self {
        self.cc = Some(cc);
        self
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    pub fn prev_value(&self) -> u8 {
        self.prev_value
    }

    #[inline]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Map a conditioned pot reading (0..=1023) linearly onto `min..=max`.
    pub fn scale_pot(&self, raw: u16) -> u8 {
        let raw = u32::from(raw.min(1023));
        let span = u32::from(self.max - self.min);
        self.min + ((raw * span + 511) / 1023) as u8
    }

    /// The value mapped onto the 0..=127 CC range.
    pub fn cc_value(&self) -> u8 {
        let span = u32::from(self.max - self.min);
        if span == 0 {
            return 0;
        }
        (u32::from(self.value - self.min) * 127 / span) as u8
    }

    pub fn display_value(&self) -> String {
        self.kind.format(self.value)
    }
}
