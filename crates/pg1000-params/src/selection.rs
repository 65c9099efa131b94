//! Which sections and partials the operator has made editable.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::parameter::{ParamGroup, Section};

/// One independent selection toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateToggle {
    Upper,
    Lower,
    UpperPartial1,
    UpperPartial2,
    LowerPartial1,
    LowerPartial2,
}

impl GateToggle {
    pub const fn partial(section: Section, partial: usize) -> Self {
        match (section, partial) {
            (Section::Upper, 0) => GateToggle::UpperPartial1,
            (Section::Upper, _) => GateToggle::UpperPartial2,
            (Section::Lower, 0) => GateToggle::LowerPartial1,
            (Section::Lower, _) => GateToggle::LowerPartial2,
        }
    }

    pub const fn common(section: Section) -> Self {
        match section {
            Section::Upper => GateToggle::Upper,
            Section::Lower => GateToggle::Lower,
        }
    }

    /// The toggle that owns `group`, or `None` for groups that are always editable.
    pub const fn owning(group: ParamGroup) -> Option<Self> {
        match group {
            ParamGroup::UpperCommon => Some(GateToggle::Upper),
            ParamGroup::LowerCommon => Some(GateToggle::Lower),
            ParamGroup::UpperPartial1 => Some(GateToggle::UpperPartial1),
            ParamGroup::UpperPartial2 => Some(GateToggle::UpperPartial2),
            ParamGroup::LowerPartial1 => Some(GateToggle::LowerPartial1),
            ParamGroup::LowerPartial2 => Some(GateToggle::LowerPartial2),
            ParamGroup::Patch | ParamGroup::Shared => None,
        }
    }
}

/// Section and partial toggles. Everything starts deselected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionGate {
    pub upper: bool,
    pub lower: bool,
    pub upper_partials: [bool; 2],
    pub lower_partials: [bool; 2],
}

impl SelectionGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, toggle: GateToggle) -> &mut bool {
        match toggle {
            GateToggle::Upper => &mut self.upper,
            GateToggle::Lower => &mut self.lower,
            GateToggle::UpperPartial1 => &mut self.upper_partials[0],
            GateToggle::UpperPartial2 => &mut self.upper_partials[1],
            GateToggle::LowerPartial1 => &mut self.lower_partials[0],
            GateToggle::LowerPartial2 => &mut self.lower_partials[1],
        }
    }

    pub fn is_active(&self, toggle: GateToggle) -> bool {
        match toggle {
            GateToggle::Upper => self.upper,
            GateToggle::Lower => self.lower,
            GateToggle::UpperPartial1 => self.upper_partials[0],
            GateToggle::UpperPartial2 => self.upper_partials[1],
            GateToggle::LowerPartial1 => self.lower_partials[0],
            GateToggle::LowerPartial2 => self.lower_partials[1],
        }
    }

    pub fn set(&mut self, toggle: GateToggle, active: bool) {
        *self.slot(toggle) = active;
    }

    /// Flip a toggle and return its new state.
    pub fn toggle(&mut self, toggle: GateToggle) -> bool {
        let slot = self.slot(toggle);
        *slot = !*slot;
        *slot
    }

    /// Step a section's partial pair through P1, P2, both, none.
    pub fn cycle_partials(&mut self, section: Section) -> [bool; 2] {
        let pair = match section {
            Section::Upper => &mut self.upper_partials,
            Section::Lower => &mut self.lower_partials,
        };
        *pair = match *pair {
            [false, false] => [true, false],
            [true, false] => [false, true],
            [false, true] => [true, true],
            [true, true] => [false, false],
        };
        *pair
    }

    pub fn any_partial(&self) -> bool {
        self.upper_partials.iter().chain(&self.lower_partials).any(|on| *on)
    }

    /// Whether parameters in `group` may be written right now.
    pub fn can_edit(&self, group: ParamGroup) -> bool {
        let allowed = GateToggle::owning(group).map_or(true, |toggle| self.is_active(toggle));
        if !allowed {
            trace!(%group, "Selection gate closed");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_only_patch_editable() {
        let gate = SelectionGate::new();
        assert!(gate.can_edit(ParamGroup::Patch));
        assert!(gate.can_edit(ParamGroup::Shared));
        assert!(!gate.can_edit(ParamGroup::UpperCommon));
        assert!(!gate.can_edit(ParamGroup::LowerPartial2));
    }

    #[test]
    fn test_common_toggles_gate_their_section() {
        let mut gate = SelectionGate::new();
        assert!(gate.toggle(GateToggle::Upper));
        assert!(gate.can_edit(ParamGroup::UpperCommon));
        assert!(!gate.can_edit(ParamGroup::LowerCommon));
        // Section toggle does not open partials
        assert!(!gate.can_edit(ParamGroup::UpperPartial1));

        assert!(!gate.toggle(GateToggle::Upper));
        assert!(!gate.can_edit(ParamGroup::UpperCommon));
    }

    #[test]
    fn test_partial_cycle() {
        let mut gate = SelectionGate::new();
        assert_eq!(gate.cycle_partials(Section::Lower), [true, false]);
        assert!(gate.can_edit(ParamGroup::LowerPartial1));
        assert_eq!(gate.cycle_partials(Section::Lower), [false, true]);
        assert!(!gate.can_edit(ParamGroup::LowerPartial1));
        assert!(gate.can_edit(ParamGroup::LowerPartial2));
        assert_eq!(gate.cycle_partials(Section::Lower), [true, true]);
        assert!(gate.any_partial());
        assert_eq!(gate.cycle_partials(Section::Lower), [false, false]);
        assert!(!gate.any_partial());
        assert_eq!(gate.upper_partials, [false, false]);
    }

    #[test]
    fn test_toggle_lookup() {
        assert_eq!(
            GateToggle::partial(Section::Upper, 1),
            GateToggle::UpperPartial2
        );
        assert_eq!(GateToggle::common(Section::Lower), GateToggle::Lower);
        assert_eq!(GateToggle::owning(ParamGroup::Shared), None);

        let mut gate = SelectionGate::new();
        gate.set(GateToggle::LowerPartial2, true);
        assert!(gate.is_active(GateToggle::LowerPartial2));
    }
}
