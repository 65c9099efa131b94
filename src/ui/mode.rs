//! Operator modes and their LED indications.

use pg1000_input::LedState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Normal,
    Menu,
    ParameterEdit,
    SystemConfig,
    ChannelSelect,
}

impl Mode {
    /// `(MIDI, WRITE)` LED states shown while in this mode.
    pub const fn indication(self) -> (LedState, LedState) {
        match self {
            Mode::Normal => (LedState::On, LedState::Off),
            Mode::Menu => (LedState::BlinkSlow, LedState::BlinkSlow),
            Mode::ParameterEdit => (LedState::On, LedState::BlinkFast),
            Mode::SystemConfig => (LedState::BlinkFast, LedState::Off),
            Mode::ChannelSelect => (LedState::BlinkSlow, LedState::Off),
        }
    }

    /// Whether pot movement edits parameters.
    pub const fn accepts_pots(self) -> bool {
        matches!(self, Mode::Normal | Mode::ParameterEdit)
    }
}
