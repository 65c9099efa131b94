//! Builder for assembling a [`Controller`] from its configuration and collaborators.

use pg1000_input::{AnalogEngine, AnalogTransfer, DigitalEngine, RegisterIo};
use pg1000_midi::{ByteTransport, InboundConsumer, ProtocolEngine, ReceiveMode};
use pg1000_params::ParameterRegistry;
use tracing::{info, warn};

use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::display::TextDisplay;
use crate::error::{Error, Result};
use crate::ui::ModeMachine;

/// The four collaborators are required. Configuration defaults to
/// [`ControllerConfig::default`] and the registry to the built-in D-50 table.
///
/// `ReceiveMode::Interrupt` additionally needs the consumer half of an
/// [`inbound_queue`](pg1000_midi::inbound_queue); the producer half belongs to the
/// receive interrupt.
pub struct ControllerBuilder<A, I, T, D> {
    config: Option<ControllerConfig>,
    registry: Option<ParameterRegistry>,
    adc: Option<A>,
    io: Option<I>,
    transport: Option<T>,
    display: Option<D>,
    queue: Option<InboundConsumer>,
}

impl<A, I, T, D> Default for ControllerBuilder<A, I, T, D> {
    fn default() -> Self {
        Self {
            config: None,
            registry: None,
            adc: None,
            io: None,
            transport: None,
            display: None,
            queue: None,
        }
    }
}

fn missing(collaborator: &str) -> Error {
    Error::InvalidConfig(format!("controller needs a {collaborator}"))
}

impl<A, I, T, D> ControllerBuilder<A, I, T, D>
where
    A: AnalogTransfer,
    I: RegisterIo,
    T: ByteTransport,
    D: TextDisplay,
{
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the built-in parameter table.
    pub fn registry(mut self, registry: ParameterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn adc(mut self, adc: A) -> Self {
        self.adc = Some(adc);
        self
    }

    pub fn io(mut self, io: I) -> Self {
        self.io = Some(io);
        self
    }

    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn display(mut self, display: D) -> Self {
        self.display = Some(display);
        self
    }

    pub fn interrupt_queue(mut self, queue: InboundConsumer) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn build(self) -> Result<Controller<A, I, T, D>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let adc = self.adc.ok_or_else(|| missing("analog transfer"))?;
        let mut io = self.io.ok_or_else(|| missing("register io"))?;
        let transport = self.transport.ok_or_else(|| missing("byte transport"))?;
        let display = self.display.ok_or_else(|| missing("text display"))?;

        let queue = match (config.protocol.receive, self.queue) {
            (ReceiveMode::Interrupt, Some(queue)) => Some(queue),
            (ReceiveMode::Interrupt, None) => return Err(missing("inbound queue in interrupt mode")),
            (ReceiveMode::Poll, queue) => {
                if queue.is_some() {
                    warn!("Inbound queue ignored in poll mode");
                }
                None
            }
        };

        let mut registry = match self.registry {
            Some(registry) => registry,
            None => ParameterRegistry::d50(config.registry.clone())?,
        };
        let analog = AnalogEngine::new(config.analog.clone())?;
        let mut digital = DigitalEngine::new(config.digital.clone())?;
        let protocol = ProtocolEngine::new(config.protocol.clone(), registry.len())?;
        let ui = ModeMachine::new(config.ui.clone(), &registry);

        digital.init(&mut io);
        registry.apply_gate(ui.gate());

        info!(
            params = registry.len(),
            pots = analog.channel_count(),
            channel = protocol.channel(),
            receive = ?config.protocol.receive,
            "Controller ready"
        );

        Ok(Controller {
            config,
            analog,
            digital,
            registry,
            protocol,
            ui,
            adc,
            io,
            transport,
            display,
            queue,
        })
    }
}
