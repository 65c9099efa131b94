//! The cooperative controller loop.

use std::time::Instant;

use pg1000_input::{AnalogEngine, AnalogTransfer, DigitalEngine, RegisterIo};
use pg1000_midi::{ByteTransport, InboundConsumer, ProtocolEngine};
use pg1000_params::ParameterRegistry;
use tracing::{info, trace, warn};

use crate::builder::ControllerBuilder;
use crate::config::ControllerConfig;
use crate::display::TextDisplay;
use crate::error::{Error, Result};
use crate::ui::{ModeMachine, UiContext, UiRequest};

/// What one [`Controller::poll`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Debounced button edges.
    pub edges: usize,
    /// Analog channels whose conditioned value moved.
    pub pot_changes: usize,
    /// Parameters written by inbound Data-Set messages.
    pub received: usize,
    /// Parameters that committed a new value from the panel.
    pub committed: usize,
    pub refreshed: bool,
}

/// Owns the engines and the four hardware collaborators.
///
/// # Example
///
/// ```ignore
/// let mut controller = Controller::builder()
///     .adc(adc)
///     .io(expander)
///     .transport(uart)
///     .display(lcd)
///     .build()?;
///
/// loop {
///     controller.poll(Instant::now())?;
/// }
/// ```
pub struct Controller<A, I, T, D> {
    pub(crate) config: ControllerConfig,
    pub(crate) analog: AnalogEngine,
    pub(crate) digital: DigitalEngine,
    pub(crate) registry: ParameterRegistry,
    pub(crate) protocol: ProtocolEngine,
    pub(crate) ui: ModeMachine,
    pub(crate) adc: A,
    pub(crate) io: I,
    pub(crate) transport: T,
    pub(crate) display: D,
    pub(crate) queue: Option<InboundConsumer>,
}

impl<A, I, T, D> Controller<A, I, T, D>
where
    A: AnalogTransfer,
    I: RegisterIo,
    T: ByteTransport,
    D: TextDisplay,
{
    pub fn builder() -> ControllerBuilder<A, I, T, D> {
        ControllerBuilder::default()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn analog(&self) -> &AnalogEngine {
        &self.analog
    }

    pub fn digital(&self) -> &DigitalEngine {
        &self.digital
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn protocol(&self) -> &ProtocolEngine {
        &self.protocol
    }

    pub fn ui(&self) -> &ModeMachine {
        &self.ui
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }

    pub fn io_mut(&mut self) -> &mut I {
        &mut self.io
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Blocking analog calibration pass.
    pub fn calibrate(&mut self) {
        self.analog.calibrate(&mut self.adc);
        self.ui.mark_dirty();
        info!("Calibration complete");
    }

    /// One pass of the cooperative loop.
    ///
    /// Order: button debounce, analog read, inbound drain and Data-Set application, mode
    /// machine (long press, then edges in button order), pot fan-out, filter settling,
    /// display refresh, LED drive. No step blocks except an operator-requested calibration.
    ///
    /// A failing step does not cut the pass short. Every later step still runs and the
    /// first error is returned once the LEDs have been driven.
    pub fn poll(&mut self, now: Instant) -> Result<PollSummary> {
        let mut summary = PollSummary::default();

        let edges = self.digital.poll_buttons(&mut self.io, now);
        summary.edges = edges.len();

        self.analog.read_all(&mut self.adc);
        let pot_changes = self.analog.take_changes();
        summary.pot_changes = pot_changes.len();

        let events = match self.queue.as_mut() {
            Some(queue) => self.protocol.drain_queue(queue),
            None => self.protocol.poll_transport(&mut self.transport),
        };
        let received = self.protocol.apply_events(&mut self.registry, &events);
        summary.received = received.len();
        self.ui.note_received(&received);

        let mut failure = None;
        let mut calibrate = false;
        {
            let Self {
                registry,
                protocol,
                transport,
                ui,
                digital,
                ..
            } = self;
            let mut ctx = UiContext {
                registry,
                protocol,
                tx: transport,
                now,
            };

            keep_first(&mut failure, ui.tick(digital, now));
            for edge in edges {
                let request = keep_first(&mut failure, ui.handle_edge(edge, digital, &mut ctx));
                if request.flatten() == Some(UiRequest::Calibrate) {
                    calibrate = true;
                }
            }
            for (pot, raw) in pot_changes {
                summary.committed +=
                    keep_first(&mut failure, ui.handle_pot(pot, raw, &mut ctx)).unwrap_or(0);
            }
            summary.committed += keep_first(&mut failure, ui.settle(&mut ctx)).unwrap_or(0);
        }

        if calibrate {
            self.calibrate();
        }

        if self.ui.take_dirty() || summary.committed > 0 || summary.received > 0 {
            let screen = self.ui.screen(&self.registry, &self.protocol);
            screen.show_on(&mut self.display);
            summary.refreshed = true;
        }

        keep_first(&mut failure, self.ui.apply_leds(&mut self.digital, now));
        self.digital.drive_leds(&mut self.io, now);

        trace!(?summary, "Poll complete");
        match failure {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }
}

/// Record the first failing step of a poll; later steps still run.
fn keep_first<T>(failure: &mut Option<Error>, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(%error, "Poll step failed");
            failure.get_or_insert(error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg1000_input::{registers, DigitalConfig, PANEL_BUTTONS, PANEL_LEDS};
    use pg1000_midi::{ByteSink, ByteSource};
    use pg1000_params::ParamGroup;
    use std::time::Duration;

    const TOTAL_VOLUME_POT: usize = 54;

    struct ConstantAdc(Vec<u16>);

    impl AnalogTransfer for ConstantAdc {
        fn transfer(&mut self, chip: u8, channel: u8) -> u16 {
            self.0[usize::from(chip) * 8 + usize::from(channel)]
        }
    }

    #[derive(Default)]
    struct Latch {
        writes: Vec<(u8, u8)>,
    }

    impl RegisterIo for Latch {
        fn write_register(&mut self, reg: u8, value: u8) {
            self.writes.push((reg, value));
        }

        fn read_register(&mut self, _reg: u8) -> u8 {
            0xFF
        }
    }

    #[derive(Default)]
    struct Wire {
        sent: Vec<u8>,
    }

    impl ByteSink for Wire {
        fn send_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }
    }

    impl ByteSource for Wire {
        fn is_readable(&mut self) -> bool {
            false
        }

        fn receive_byte(&mut self) -> u8 {
            0
        }
    }

    #[derive(Default)]
    struct Frames(Vec<String>);

    impl TextDisplay for Frames {
        fn show(&mut self, line1: &str, _line2: &str) {
            self.0.push(line1.to_string());
        }
    }

    fn controller() -> Controller<ConstantAdc, Latch, Wire, Frames> {
        let mut config = ControllerConfig::default();
        config.digital.debounce_ms = 0;
        Controller::builder()
            .adc(ConstantAdc(vec![0; config.analog.channel_count()]))
            .io(Latch::default())
            .transport(Wire::default())
            .display(Frames::default())
            .config(config)
            .build()
            .unwrap()
    }

    fn gpiob_writes(io: &Latch) -> usize {
        io.writes.iter().filter(|(reg, _)| *reg == registers::GPIOB).count()
    }

    #[test]
    fn test_failed_step_does_not_drop_pot_moves() {
        let mut controller = controller();
        // A panel without the menu button makes the long-press check fail every poll
        controller.digital = DigitalEngine::with_layout(
            DigitalConfig::default(),
            &PANEL_BUTTONS[..PANEL_BUTTONS.len() - 1],
            &PANEL_LEDS,
        )
        .unwrap();
        let volume = controller
            .registry()
            .find_by_name(ParamGroup::Patch, "Total Volume")
            .unwrap();
        let before = gpiob_writes(&controller.io);
        let t0 = Instant::now();

        controller.adc_mut().0[TOTAL_VOLUME_POT] = 1023;
        for step in 0..60 {
            let result = controller.poll(t0 + Duration::from_millis(step * 20));
            assert!(matches!(
                result,
                Err(Error::Input(pg1000_input::Error::InvalidButton(_)))
            ));
        }

        assert_eq!(controller.registry().get(volume).unwrap().value(), 100);
        assert!(!controller.transport.sent.is_empty());
        assert_eq!(controller.display.0.last().unwrap(), "PT Total Volume");
        assert_eq!(gpiob_writes(&controller.io), before + 60);
    }

    #[test]
    fn test_failed_led_update_still_drives_latch() {
        let mut controller = controller();
        controller.digital = DigitalEngine::with_layout(
            DigitalConfig::default(),
            &PANEL_BUTTONS,
            &PANEL_LEDS[..1],
        )
        .unwrap();
        let before = gpiob_writes(&controller.io);

        let result = controller.poll(Instant::now());
        assert!(matches!(
            result,
            Err(Error::Input(pg1000_input::Error::InvalidLed(_)))
        ));
        assert_eq!(gpiob_writes(&controller.io), before + 1);
        assert!(!controller.display.0.is_empty());
    }
}
