/*!
# Launchpad device

A [`Device`] owns the input and output connection to one Launchpad. Every LED operation maps to
exactly one MIDI message (unless noted otherwise), and every read returns whatever button
actions are pending without waiting for new ones.

```no_run
use gridpad::{Button, Color, Device, DeviceConfig, Mode};

let device = Device::open(&DeviceConfig::default())?;
device.change_led(Button::grid(3, 4)?, Color::AMBER, Mode::Normal)?;

for action in device.read_pending_actions()? {
    println!("{:?} {}", action.state, action.button);
}
# Ok::<(), gridpad::Error>(())
```
*/

mod input;
pub use input::*;

mod output;
pub use output::*;

use parking_lot::Mutex;

use crate::midi_io::{guess_port, Direction, InputPort, MidirTransport, OutputPort, PortInfo, Transport};
use crate::Error;

/// Selects which sides of a device get opened, and which MIDI endpoints they connect to
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Open the input side, needed for reading button actions
    pub input: bool,
    /// Open the output side, needed for changing LEDs
    pub output: bool,
    /// Name of the MIDI endpoints, used for each side without an explicit id
    pub device_name: String,
    /// Explicit transport id of the input endpoint
    pub input_id: Option<usize>,
    /// Explicit transport id of the output endpoint
    pub output_id: Option<usize>,
}

impl DeviceConfig {
    pub const DEFAULT_DEVICE_NAME: &'static str = "Launchpad";

    pub fn input(mut self, input: bool) -> Self {
        self.input = input;
        self
    }

    pub fn output(mut self, output: bool) -> Self {
        self.output = output;
        self
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn input_id(mut self, id: usize) -> Self {
        self.input_id = Some(id);
        self
    }

    pub fn output_id(mut self, id: usize) -> Self {
        self.output_id = Some(id);
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            input: true,
            output: true,
            device_name: Self::DEFAULT_DEVICE_NAME.to_owned(),
            input_id: None,
            output_id: None,
        }
    }
}

fn resolve_port(
    ports: &[PortInfo],
    direction: Direction,
    id: Option<usize>,
    name: &str,
) -> Result<usize, Error> {
    let port = match id {
        Some(id) => ports.iter().find(|port| port.id == id),
        None => guess_port(ports, name),
    };

    match port {
        Some(port) => {
            log::debug!("using {} port {} ({:?})", direction, port.id, port.name);
            Ok(port.id)
        }
        None => Err(Error::NoSuchDevice {
            direction,
            name: id.map_or_else(|| name.to_owned(), |id| format!("#{}", id)),
        }),
    }
}

/// A connection to a Launchpad. Both sides are optional; operations on a missing side fail with
/// [`NoInputAllowed`](Error::NoInputAllowed) or [`NoOutputAllowed`](Error::NoOutputAllowed).
///
/// All methods take `&self`, so a device can be shared between threads. Each side is guarded by
/// its own lock, which also keeps multi-message operations from being interleaved.
pub struct Device {
    input: Mutex<Option<Box<dyn InputPort>>>,
    output: Mutex<Option<Box<dyn OutputPort>>>,
}

impl Device {
    /// Opens the sides requested by `config` on the system MIDI stack.
    pub fn open(config: &DeviceConfig) -> Result<Self, Error> {
        Self::open_with(&MidirTransport::default(), config)
    }

    /// Opens the sides requested by `config` on the given transport. If output is enabled, the
    /// device is [reset](Device::reset) right away.
    pub fn open_with(transport: &dyn Transport, config: &DeviceConfig) -> Result<Self, Error> {
        let mut input = None;
        if config.input {
            let ports = transport.input_ports()?;
            let id = resolve_port(&ports, Direction::Input, config.input_id, &config.device_name)?;
            let port = transport
                .open_input(id)
                .map_err(|source| Error::DeviceBusy {
                    direction: Direction::Input,
                    source,
                })?;
            input = Some(port);
        }

        let mut output = None;
        if config.output {
            let ports = transport.output_ports()?;
            let id = resolve_port(&ports, Direction::Output, config.output_id, &config.device_name)?;
            let port = transport
                .open_output(id)
                .map_err(|source| Error::DeviceBusy {
                    direction: Direction::Output,
                    source,
                })?;
            output = Some(port);
        }

        let device = Self::from_ports(input, output);
        if config.output {
            device.reset()?;
        }

        log::info!(
            "opened {:?} (input: {}, output: {})",
            config.device_name,
            config.input,
            config.output
        );
        Ok(device)
    }

    /// Wraps already opened ports. Nothing is sent to the device.
    pub fn from_ports(
        input: Option<Box<dyn InputPort>>,
        output: Option<Box<dyn OutputPort>>,
    ) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn has_input(&self) -> bool {
        self.input.lock().is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.lock().is_some()
    }

    /// Closes both sides. Closing an already closed device does nothing.
    pub fn close(&self) {
        let input = self.input.lock().take();
        let output = self.output.lock().take();
        if input.is_some() || output.is_some() {
            log::info!("closed device");
        }
    }

    /// Whether neither side is open
    pub fn closed(&self) -> bool {
        !self.has_input() && !self.has_output()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("input", &self.has_input())
            .field("output", &self.has_output())
            .finish()
    }
}
