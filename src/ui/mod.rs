//! Operator-facing mode state machine.
//!
//! Consumes debounced button edges and conditioned pot changes, enforces the selection
//! gate on every parameter write, and issues protocol traffic through a [`UiContext`].
//! It never touches hardware itself: LED states and screen content are handed back to
//! the controller.

mod menu;
mod mode;

pub use menu::MenuItem;
pub use mode::Mode;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use pg1000_input::{button, led, DigitalEngine, Edge, LedState};
use pg1000_midi::{ByteSink, ProtocolEngine};
use pg1000_params::{GateToggle, ParameterRegistry, Section, SelectionGate, ValueSource};
use tracing::debug;

use crate::config::UiConfig;
use crate::display::{parameter_screen, Screen};
use crate::error::Result;

/// Mutable state a mode transition may act on, borrowed for one poll step.
pub struct UiContext<'a> {
    pub registry: &'a mut ParameterRegistry,
    pub protocol: &'a mut ProtocolEngine,
    pub tx: &'a mut dyn ByteSink,
    pub now: Instant,
}

/// Work the controller performs on the mode machine's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiRequest {
    /// Run the blocking analog calibration pass.
    Calibrate,
}

pub struct ModeMachine {
    config: UiConfig,
    mode: Mode,
    selected: Option<usize>,
    menu_item: MenuItem,
    gate: SelectionGate,
    program: u8,
    dirty: bool,
    menu_hold_used: bool,
    /// Committed values whose send was rate limited.
    unsent: BTreeSet<usize>,
}

impl ModeMachine {
    pub fn new(config: UiConfig, registry: &ParameterRegistry) -> Self {
        Self {
            config,
            mode: Mode::Normal,
            selected: (!registry.is_empty()).then_some(0),
            menu_item: MenuItem::default(),
            gate: SelectionGate::default(),
            program: 0,
            dirty: true,
            menu_hold_used: false,
            unsent: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[inline]
    pub fn menu_item(&self) -> MenuItem {
        self.menu_item
    }

    #[inline]
    pub fn gate(&self) -> &SelectionGate {
        &self.gate
    }

    #[inline]
    pub fn program(&self) -> u8 {
        self.program
    }

    /// Parameters waiting to be re-sent after a rate-limited attempt.
    pub fn pending_sends(&self) -> impl Iterator<Item = usize> + '_ {
        self.unsent.iter().copied()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Report and clear the display-refresh flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            debug!(from = ?self.mode, to = ?mode, "Mode transition");
            self.mode = mode;
            self.dirty = true;
        }
    }

    pub fn select(&mut self, index: Option<usize>) {
        if index != self.selected {
            self.selected = index;
            self.dirty = true;
        }
    }

    /// Long-press detection. Opens the menu once per MENU hold, and only from Normal.
    pub fn tick(&mut self, digital: &DigitalEngine, now: Instant) -> Result<()> {
        let long_press = Duration::from_millis(self.config.long_press_ms);
        match digital.held_for(button::MENU, now)? {
            Some(held) if held >= long_press => {
                if !self.menu_hold_used {
                    self.menu_hold_used = true;
                    if self.mode == Mode::Normal {
                        self.set_mode(Mode::Menu);
                    }
                }
            }
            Some(_) => {}
            None => self.menu_hold_used = false,
        }
        Ok(())
    }

    /// React to one debounced edge. Only presses act; releases end long-press tracking
    /// via [`tick`](Self::tick).
    pub fn handle_edge(
        &mut self,
        edge: Edge,
        digital: &DigitalEngine,
        ctx: &mut UiContext<'_>,
    ) -> Result<Option<UiRequest>> {
        let Edge::Pressed(button) = edge else {
            return Ok(None);
        };

        match self.mode {
            Mode::Normal => self.normal_button(button, digital, ctx).map(|()| None),
            Mode::Menu => self.menu_button(button, ctx),
            Mode::ParameterEdit => self.edit_button(button, ctx).map(|()| None),
            Mode::SystemConfig => {
                self.system_button(button, ctx);
                Ok(None)
            }
            Mode::ChannelSelect => self.channel_button(button, ctx).map(|()| None),
        }
    }

    fn normal_button(
        &mut self,
        pressed: usize,
        digital: &DigitalEngine,
        ctx: &mut UiContext<'_>,
    ) -> Result<()> {
        match pressed {
            button::UPPER | button::LOWER => {
                let section = if pressed == button::UPPER {
                    Section::Upper
                } else {
                    Section::Lower
                };
                if digital.is_held(button::PARTIAL)? {
                    self.gate.cycle_partials(section);
                } else {
                    self.gate.toggle(GateToggle::common(section));
                }
                ctx.registry.apply_gate(&self.gate);
                debug!(gate = ?self.gate, "Selection changed");
                self.dirty = true;
            }
            button::INC | button::DEC => {
                let up = pressed == button::INC;
                if digital.is_held(button::MODE)? {
                    self.program = if up {
                        self.program.saturating_add(1).min(0x7F)
                    } else {
                        self.program.saturating_sub(1)
                    };
                    ctx.protocol.send_program_change(&mut *ctx.tx, self.program)?;
                } else {
                    self.step_selection(up, ctx.registry.len());
                }
            }
            button::ENTER => {
                if self.selected.is_some() {
                    self.set_mode(Mode::ParameterEdit);
                }
            }
            button::WRITE => ctx.protocol.send_patch_write(&mut *ctx.tx)?,
            _ => {}
        }
        Ok(())
    }

    fn step_selection(&mut self, up: bool, len: usize) {
        if len == 0 {
            return;
        }
        let next = match self.selected {
            Some(index) if up => (index + 1) % len,
            Some(index) => (index + len - 1) % len,
            None if up => 0,
            None => len - 1,
        };
        self.select(Some(next));
    }

    fn menu_button(&mut self, pressed: usize, ctx: &mut UiContext<'_>) -> Result<Option<UiRequest>> {
        match pressed {
            button::INC => {
                self.menu_item = self.menu_item.next();
                self.dirty = true;
            }
            button::DEC => {
                self.menu_item = self.menu_item.prev();
                self.dirty = true;
            }
            button::ENTER => return self.execute_menu_item(ctx),
            button::EXIT => self.set_mode(Mode::Normal),
            _ => {}
        }
        Ok(None)
    }

    fn execute_menu_item(&mut self, ctx: &mut UiContext<'_>) -> Result<Option<UiRequest>> {
        debug!(item = ?self.menu_item, "Menu item selected");
        match self.menu_item {
            MenuItem::MidiChannel => self.set_mode(Mode::ChannelSelect),
            MenuItem::Transmit => self.set_mode(Mode::SystemConfig),
            MenuItem::Calibrate => {
                self.set_mode(Mode::Normal);
                return Ok(Some(UiRequest::Calibrate));
            }
            MenuItem::RequestDump => {
                ctx.protocol.request_patch_dump(&mut *ctx.tx)?;
                self.set_mode(Mode::Normal);
            }
        }
        Ok(None)
    }

    fn edit_button(&mut self, pressed: usize, ctx: &mut UiContext<'_>) -> Result<()> {
        match pressed {
            button::INC | button::DEC => {
                let Some(index) = self.selected else {
                    return Ok(());
                };
                let param = ctx
                    .registry
                    .get(index)
                    .ok_or(pg1000_params::Error::InvalidIndex(index))?;
                let value = if pressed == button::INC {
                    param.value().saturating_add(1).min(param.max)
                } else {
                    param.value().saturating_sub(1).max(param.min)
                };
                self.write_parameter(ctx, index, ValueSource::Direct(value))?;
            }
            button::EXIT => self.set_mode(Mode::Normal),
            _ => {}
        }
        Ok(())
    }

    fn system_button(&mut self, pressed: usize, ctx: &mut UiContext<'_>) {
        match pressed {
            button::INC => {
                let enabled = !ctx.protocol.sysex_enabled();
                ctx.protocol.set_sysex_enabled(enabled);
                self.dirty = true;
            }
            button::DEC => {
                let enabled = !ctx.protocol.cc_enabled();
                ctx.protocol.set_cc_enabled(enabled);
                self.dirty = true;
            }
            button::EXIT => self.set_mode(Mode::Normal),
            _ => {}
        }
    }

    fn channel_button(&mut self, pressed: usize, ctx: &mut UiContext<'_>) -> Result<()> {
        let channel = ctx.protocol.channel();
        match pressed {
            button::INC => ctx.protocol.set_channel((channel + 1).min(16))?,
            button::DEC => ctx.protocol.set_channel(channel.saturating_sub(1).max(1))?,
            button::ENTER | button::EXIT => self.set_mode(Mode::Normal),
            _ => {}
        }
        if ctx.protocol.channel() != channel {
            self.dirty = true;
        }
        Ok(())
    }

    /// Fan a conditioned pot change out to every parameter the pot owns.
    ///
    /// Returns how many parameters committed a new value. The last of them becomes
    /// the selected parameter.
    pub fn handle_pot(&mut self, pot: usize, raw: u16, ctx: &mut UiContext<'_>) -> Result<usize> {
        if !self.mode.accepts_pots() {
            return Ok(0);
        }
        let Ok(pot) = u8::try_from(pot) else {
            return Ok(0);
        };

        let owned: Vec<usize> = ctx.registry.params_for_pot(pot).collect();
        let mut changed = 0;
        for index in owned {
            let Some(param) = ctx.registry.get(index) else {
                continue;
            };
            let value = param.scale_pot(raw);
            if self.write_parameter(ctx, index, ValueSource::Pot(value))? {
                changed += 1;
                self.select(Some(index));
            }
        }
        Ok(changed)
    }

    /// The gated write path shared by pots and increment/decrement edits.
    ///
    /// A closed gate leaves the value untouched and sends nothing. Returns whether the
    /// committed value changed.
    pub fn write_parameter(
        &mut self,
        ctx: &mut UiContext<'_>,
        index: usize,
        source: ValueSource,
    ) -> Result<bool> {
        let group = ctx
            .registry
            .get(index)
            .ok_or(pg1000_params::Error::InvalidIndex(index))?
            .group;
        if !self.gate.can_edit(group) {
            return Ok(false);
        }
        if !ctx.registry.update_value(index, source)? {
            return Ok(false);
        }
        self.transmit(ctx, index)?;
        if self.selected == Some(index) {
            self.dirty = true;
        }
        Ok(true)
    }

    fn transmit(&mut self, ctx: &mut UiContext<'_>, index: usize) -> Result<()> {
        let sent = ctx
            .protocol
            .send_parameter(&mut *ctx.tx, ctx.registry, index, ctx.now)?;
        let pending = !sent
            && ctx
                .registry
                .get(index)
                .is_some_and(|param| ctx.protocol.transmits(param));
        if pending {
            self.unsent.insert(index);
        } else {
            self.unsent.remove(&index);
        }
        Ok(())
    }

    /// Advance settling filters, send what they commit, and retry rate-limited sends.
    ///
    /// Only runs in modes that accept pots. Elsewhere filters and pending re-sends are
    /// held and resume on return to an editing mode. Returns how many parameters settled
    /// onto a new value.
    pub fn settle(&mut self, ctx: &mut UiContext<'_>) -> Result<usize> {
        if !self.mode.accepts_pots() {
            return Ok(0);
        }
        let gate = self.gate;
        let committed = ctx.registry.settle(|param| gate.can_edit(param.group));

        for &index in &committed {
            self.transmit(ctx, index)?;
            if self.selected == Some(index) {
                self.dirty = true;
            }
        }

        let retry: Vec<usize> = self
            .unsent
            .iter()
            .copied()
            .filter(|index| !committed.contains(index))
            .collect();
        for index in retry {
            let open = ctx
                .registry
                .get(index)
                .is_some_and(|param| gate.can_edit(param.group));
            if open {
                self.transmit(ctx, index)?;
            } else {
                self.unsent.remove(&index);
            }
        }

        Ok(committed.len())
    }

    /// Values written by the instrument: drop pending re-sends and refresh the screen.
    pub fn note_received(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        for index in indices {
            self.unsent.remove(index);
        }
        self.dirty = true;
    }

    /// LED states for the current mode and selection.
    pub fn led_states(&self) -> [(usize, LedState); 5] {
        let (midi, write) = self.mode.indication();
        let lit = |on: bool| if on { LedState::On } else { LedState::Off };
        [
            (led::MIDI, midi),
            (led::WRITE, write),
            (led::UPPER, lit(self.gate.upper)),
            (led::LOWER, lit(self.gate.lower)),
            (led::PARTIAL, lit(self.gate.any_partial())),
        ]
    }

    pub fn apply_leds(&self, digital: &mut DigitalEngine, now: Instant) -> Result<()> {
        for (index, state) in self.led_states() {
            digital.set_led(index, state, now)?;
        }
        Ok(())
    }

    pub fn screen(&self, registry: &ParameterRegistry, protocol: &ProtocolEngine) -> Screen {
        let selected = self.selected.and_then(|index| registry.get(index));
        match self.mode {
            Mode::Normal => selected.map_or_else(
                || Screen::new("PG-1000", "No parameters"),
                parameter_screen,
            ),
            Mode::Menu => Screen::new("MENU", self.menu_item.label()),
            Mode::ParameterEdit => selected.map_or_else(
                || Screen::new("PG-1000", ""),
                |param| Screen::new(param.name, format!("Value: {}", param.display_value())),
            ),
            Mode::SystemConfig => Screen::new(
                "System Config",
                format!(
                    "SysEx:{} CC:{}",
                    on_off(protocol.sysex_enabled()),
                    on_off(protocol.cc_enabled())
                ),
            ),
            Mode::ChannelSelect => {
                Screen::new("MIDI Channel", format!("Ch {}", protocol.channel()))
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
