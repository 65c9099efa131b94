//! Menu items.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MenuItem {
    #[default]
    MidiChannel,
    Transmit,
    Calibrate,
    RequestDump,
}

impl MenuItem {
    pub const ALL: [MenuItem; 4] = [
        MenuItem::MidiChannel,
        MenuItem::Transmit,
        MenuItem::Calibrate,
        MenuItem::RequestDump,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            MenuItem::MidiChannel => "MIDI Channel",
            MenuItem::Transmit => "Transmit",
            MenuItem::Calibrate => "Calibrate",
            MenuItem::RequestDump => "Request Dump",
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|item| *item == self).unwrap_or(0)
    }

    /// Next item, wrapping.
    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    /// Previous item, wrapping.
    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}
