//! D-50 parameter blocks.
//!
//! Each block lists offsets relative to its group's base address. Partial entries are
//! instantiated for all four partials and common entries for both sections, so pot
//! numbers in those blocks are shared by every instance.

use crate::parameter::ParamType;

pub(crate) struct Entry {
    pub offset: u8,
    pub name: &'static str,
    pub kind: ParamType,
    pub max: u8,
    pub pot: Option<u8>,
    pub cc: Option<u8>,
    pub shared: bool,
}

const fn entry(offset: u8, name: &'static str, kind: ParamType) -> Entry {
    Entry {
        offset,
        name,
        kind,
        max: kind.natural_max(),
        pot: None,
        cc: None,
        shared: false,
    }
}

impl Entry {
    const fn max(mut self, max: u8) -> Self {
        self.max = max;
        self
    }

    const fn pot(mut self, pot: u8) -> Self {
        self.pot = Some(pot);
        self
    }

    const fn cc(mut self, cc: u8) -> Self {
        self.cc = Some(cc);
        self
    }

    const fn shared(mut self) -> Self {
        self.shared = true;
        self
    }
}

use ParamType::{Bipolar, Continuous100 as Level, Continuous50 as Time, Enumerated, KeyfollowRate};

const LFO_MODE: &[&str] = &["OFF", "(+)", "(-)", "A&L"];
const ENV_MODE: &[&str] = &["OFF", "(+)", "(-)"];
const BENDER_MODE: &[&str] = &["OFF", "KF", "NORM"];
const WAVEFORM: &[&str] = &["SQU", "SAW"];
const LFO_SELECT: &[&str] = &["+1", "-1", "+2", "-2", "+3", "-3"];
const ENV_KEYFOLLOW: &[&str] = &["0", "1/4", "1/2", "1", "2"];
const END_LEVEL: &[&str] = &["0", "SUS"];
const STRUCTURE: &[&str] = &["1", "2", "3", "4", "5", "6", "7"];
const LFO_WAVE: &[&str] = &["TRI", "SAW", "SQU", "RND"];
const LFO_SYNC: &[&str] = &["OFF", "ON", "KEY"];
const CHORUS: &[&str] = &["CH1", "CH2", "CH3", "CH4", "CH5", "CH6", "CH7", "CH8"];
const PARTIAL_MUTE: &[&str] = &["--", "1-", "-2", "12"];
const KEY_MODE: &[&str] = &[
    "WHOLE", "DUAL", "SPLIT", "SEP", "WHOLE-S", "DUAL-S", "SPLIT-US", "SPLIT-LS", "SEP-S",
];
const SECTION_MODE: &[&str] = &["U", "L", "UL"];
const OUTPUT_MODE: &[&str] = &["1", "2", "3", "4"];
const CHASE_MODE: &[&str] = &["U-L", "U-L-L", "U-L-U"];

pub(crate) const PARTIAL: &[Entry] = &[
    entry(0, "WG Pitch Coarse", Level).max(72).pot(0),
    entry(1, "WG Pitch Fine", Bipolar { offset: 50 }).pot(1),
    entry(2, "WG Pitch KF", KeyfollowRate).pot(2),
    entry(3, "WG LFO Mode", Enumerated { labels: LFO_MODE }),
    entry(4, "WG P-ENV Mode", Enumerated { labels: ENV_MODE }),
    entry(5, "WG Bender Mode", Enumerated { labels: BENDER_MODE }),
    entry(6, "WG Waveform", Enumerated { labels: WAVEFORM }),
    entry(7, "WG PCM Wave", Level).max(99).pot(3),
    entry(8, "WG Pulse Width", Level).pot(4),
    entry(9, "WG PW Velocity", Bipolar { offset: 7 }).pot(5),
    entry(10, "WG PW LFO Sel", Enumerated { labels: LFO_SELECT }),
    entry(11, "WG PW LFO Depth", Level).pot(6),
    entry(12, "WG PW Aftertch", Bipolar { offset: 7 }).pot(7),
    entry(13, "TVF Cutoff", Level).pot(8),
    entry(14, "TVF Resonance", Level).max(30).pot(9),
    entry(15, "TVF Keyfollow", Level).max(14).pot(10),
    entry(16, "TVF Bias Point", Level).max(127),
    entry(17, "TVF Bias Level", Bipolar { offset: 7 }).pot(11),
    entry(18, "TVF ENV Depth", Level).pot(12),
    entry(19, "TVF ENV Velo", Level).pot(13),
    entry(20, "TVF ENV Dep KF", Enumerated { labels: ENV_KEYFOLLOW }),
    entry(21, "TVF ENV Time KF", Enumerated { labels: ENV_KEYFOLLOW }),
    entry(22, "TVF ENV T1", Level).pot(14),
    entry(23, "TVF ENV T2", Level).pot(15),
    entry(24, "TVF ENV T3", Level).pot(16),
    entry(25, "TVF ENV T4", Level).pot(17),
    entry(26, "TVF ENV T5", Level).pot(18),
    entry(27, "TVF ENV L1", Level).pot(19),
    entry(28, "TVF ENV L2", Level).pot(20),
    entry(29, "TVF ENV L3", Level).pot(21),
    entry(30, "TVF ENV Sus L", Level).pot(22),
    entry(31, "TVF ENV End L", Enumerated { labels: END_LEVEL }),
    entry(32, "TVF LFO Select", Enumerated { labels: LFO_SELECT }),
    entry(33, "TVF LFO Depth", Level).pot(23),
    entry(34, "TVF Aftertouch", Bipolar { offset: 7 }),
    entry(35, "TVA Level", Level).pot(24),
    entry(36, "TVA Velocity", Bipolar { offset: 50 }).pot(25),
    entry(37, "TVA Bias Point", Level).max(127),
    entry(38, "TVA Bias Level", Level).max(12),
    entry(39, "TVA ENV T1", Level).pot(26),
    entry(40, "TVA ENV T2", Level).pot(27),
    entry(41, "TVA ENV T3", Level).pot(28),
    entry(42, "TVA ENV T4", Level).pot(29),
    entry(43, "TVA ENV T5", Level).pot(30),
    entry(44, "TVA ENV L1", Level).pot(31),
    entry(45, "TVA ENV L2", Level).pot(32),
    entry(46, "TVA ENV L3", Level).pot(33),
    entry(47, "TVA ENV Sus L", Level).pot(34),
    entry(48, "TVA ENV End L", Enumerated { labels: END_LEVEL }),
    entry(49, "TVA ENV Velo KF", Enumerated { labels: ENV_KEYFOLLOW }),
    entry(50, "TVA ENV Time KF", Enumerated { labels: ENV_KEYFOLLOW }),
    entry(51, "TVA LFO Select", Enumerated { labels: LFO_SELECT }),
    entry(52, "TVA LFO Depth", Level).pot(35),
    entry(53, "TVA Aftertouch", Bipolar { offset: 7 }),
];

pub(crate) const COMMON: &[Entry] = &[
    entry(10, "Structure", Enumerated { labels: STRUCTURE }),
    entry(11, "P-ENV Velocity", Level).max(2),
    entry(12, "P-ENV Time KF", Enumerated { labels: ENV_KEYFOLLOW }),
    entry(13, "P-ENV T1", Time).pot(36),
    entry(14, "P-ENV T2", Time).pot(37),
    entry(15, "P-ENV T3", Time).pot(38),
    entry(16, "P-ENV T4", Time).pot(39),
    entry(17, "P-ENV L0", Bipolar { offset: 50 }).pot(40),
    entry(18, "P-ENV L1", Bipolar { offset: 50 }).pot(41),
    entry(19, "P-ENV L2", Bipolar { offset: 50 }).pot(42),
    entry(20, "P-ENV Sus L", Bipolar { offset: 50 }),
    entry(21, "P-ENV End L", Bipolar { offset: 50 }),
    entry(22, "Pitch LFO Depth", Level).pot(43),
    entry(23, "Pitch Lever Mod", Level),
    entry(24, "Pitch Aftertch", Level),
    entry(25, "LFO-1 Waveform", Enumerated { labels: LFO_WAVE }),
    entry(26, "LFO-1 Rate", Level).pot(44),
    entry(27, "LFO-1 Delay", Level).pot(45),
    entry(28, "LFO-1 Sync", Enumerated { labels: LFO_SYNC }),
    entry(29, "LFO-2 Waveform", Enumerated { labels: LFO_WAVE }),
    entry(30, "LFO-2 Rate", Level).pot(46),
    entry(31, "LFO-2 Delay", Level),
    entry(32, "LFO-2 Sync", Enumerated { labels: &["OFF", "ON"] }),
    entry(33, "LFO-3 Waveform", Enumerated { labels: LFO_WAVE }),
    entry(34, "LFO-3 Rate", Level).pot(47),
    entry(35, "LFO-3 Delay", Level),
    entry(36, "LFO-3 Sync", Enumerated { labels: &["OFF", "ON"] }),
    entry(37, "Low EQ Freq", Level).max(15),
    entry(38, "Low EQ Gain", Bipolar { offset: 12 }),
    entry(39, "High EQ Freq", Level).max(21),
    entry(40, "High EQ Q", Level).max(8),
    entry(41, "High EQ Gain", Bipolar { offset: 12 }),
    entry(42, "Chorus Type", Enumerated { labels: CHORUS }),
    entry(43, "Chorus Rate", Level).pot(48),
    entry(44, "Chorus Depth", Level).pot(49),
    entry(45, "Chorus Balance", Level).pot(50),
    entry(46, "Partial Mute", Enumerated { labels: PARTIAL_MUTE }),
    entry(47, "Partial Balance", Level).pot(51),
];

pub(crate) const PATCH: &[Entry] = &[
    entry(18, "Key Mode", Enumerated { labels: KEY_MODE }),
    entry(19, "Split Point", Level).max(60),
    entry(20, "Portamento Mode", Enumerated { labels: SECTION_MODE }).shared(),
    entry(21, "Hold Mode", Enumerated { labels: SECTION_MODE }).shared(),
    entry(22, "U Key Shift", Bipolar { offset: 24 }),
    entry(23, "L Key Shift", Bipolar { offset: 24 }),
    entry(24, "U Fine Tune", Bipolar { offset: 50 }),
    entry(25, "L Fine Tune", Bipolar { offset: 50 }),
    entry(26, "Bender Range", Level).max(12).shared(),
    entry(27, "AT Bend Range", Bipolar { offset: 12 }).shared(),
    entry(28, "Portamento Time", Level).pot(52).cc(5),
    entry(29, "Output Mode", Enumerated { labels: OUTPUT_MODE }),
    entry(30, "Reverb Type", Level).max(31),
    entry(31, "Reverb Balance", Level).pot(53).cc(91),
    entry(32, "Total Volume", Level).pot(54).cc(7),
    entry(33, "Tone Balance", Level).pot(55).cc(8),
    entry(34, "Chase Mode", Enumerated { labels: CHASE_MODE }),
    entry(35, "Chase Level", Level),
    entry(36, "Chase Time", Level),
];
