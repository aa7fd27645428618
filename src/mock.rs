//! An in-memory [`Transport`] for exercising a [`Device`](crate::Device) or an
//! [`Interaction`](crate::Interaction) without hardware.
//!
//! ```
//! use gridpad::mock::MockTransport;
//! use gridpad::{Button, ButtonState, Device, DeviceConfig};
//!
//! let transport = MockTransport::new();
//! let device = Device::open_with(&transport, &DeviceConfig::default())?;
//!
//! transport.push_action(Button::MIXER, ButtonState::Down);
//! let actions = device.read_pending_actions()?;
//! assert_eq!(actions[0].button, Button::MIXER);
//! # Ok::<(), gridpad::Error>(())
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::midi_io::{Direction, InputPort, OutputPort, PortInfo, RawMessage, Transport};
use crate::protocols::{status, Button, PRESS_VELOCITY};
use crate::{ButtonState, TransportError};

/// The message a Launchpad sends when `button` changes to `state`
pub fn action_message(button: Button, state: ButtonState) -> RawMessage {
    let velocity = match state {
        ButtonState::Down => PRESS_VELOCITY,
        ButtonState::Up => 0,
    };
    match button {
        Button::Control(button) => RawMessage::new(status::CC, button.note(), velocity),
        Button::Scene(button) => RawMessage::new(status::ON, button.note(), velocity),
        Button::Grid(pos) => RawMessage::new(status::ON, pos.note(), velocity),
    }
}

#[derive(Default)]
struct MockState {
    input_ports: Vec<PortInfo>,
    output_ports: Vec<PortInfo>,
    pending: VecDeque<RawMessage>,
    written: Vec<RawMessage>,
    open_inputs: usize,
    open_outputs: usize,
    busy: Vec<Direction>,
    failing_reads: bool,
    failing_writes: bool,
}

fn port_infos(names: &[&str]) -> Vec<PortInfo> {
    names
        .iter()
        .enumerate()
        .map(|(id, name)| PortInfo {
            id,
            name: name.to_string(),
        })
        .collect()
}

/// A scriptable transport. Clones share their state, so a test can keep one clone around to
/// inspect what a device wrote or to feed it input.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A transport with a single input and a single output port, both called "Launchpad"
    pub fn new() -> Self {
        Self::with_ports(&["Launchpad"], &["Launchpad"])
    }

    pub fn with_ports(inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                input_ports: port_infos(inputs),
                output_ports: port_infos(outputs),
                ..MockState::default()
            })),
        }
    }

    /// Queues up messages for the input side
    pub fn push_input(&self, messages: impl IntoIterator<Item = RawMessage>) {
        self.state.lock().pending.extend(messages);
    }

    /// Queues up the message for a single button action
    pub fn push_action(&self, button: impl Into<Button>, state: ButtonState) {
        self.push_input([action_message(button.into(), state)]);
    }

    /// Number of queued messages that haven't been read yet
    pub fn pending_input(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Everything written so far, in order
    pub fn written(&self) -> Vec<RawMessage> {
        self.state.lock().written.clone()
    }

    /// Like [`MockTransport::written`], but clears the log
    pub fn take_written(&self) -> Vec<RawMessage> {
        std::mem::take(&mut self.state.lock().written)
    }

    /// Makes opening ports of `direction` fail, as if another program held them
    pub fn set_busy(&self, direction: Direction, busy: bool) {
        let mut state = self.state.lock();
        state.busy.retain(|&d| d != direction);
        if busy {
            state.busy.push(direction);
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().failing_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().failing_writes = fail;
    }

    /// Number of input ports currently open
    pub fn open_inputs(&self) -> usize {
        self.state.lock().open_inputs
    }

    /// Number of output ports currently open
    pub fn open_outputs(&self) -> usize {
        self.state.lock().open_outputs
    }

    fn check_open(&self, direction: Direction, id: usize) -> Result<(), TransportError> {
        let state = self.state.lock();
        let ports = match direction {
            Direction::Input => &state.input_ports,
            Direction::Output => &state.output_ports,
        };
        if !ports.iter().any(|port| port.id == id) {
            return Err(TransportError::Connect {
                id,
                reason: "no such port".to_owned(),
            });
        }
        if state.busy.contains(&direction) {
            return Err(TransportError::Connect {
                id,
                reason: "port is busy".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockTransport")
            .field("input_ports", &state.input_ports)
            .field("output_ports", &state.output_ports)
            .field("pending", &state.pending.len())
            .field("written", &state.written.len())
            .finish()
    }
}

impl Transport for MockTransport {
    fn input_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        Ok(self.state.lock().input_ports.clone())
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        Ok(self.state.lock().output_ports.clone())
    }

    fn open_input(&self, id: usize) -> Result<Box<dyn InputPort>, TransportError> {
        self.check_open(Direction::Input, id)?;
        self.state.lock().open_inputs += 1;
        Ok(Box::new(MockInput {
            state: Arc::clone(&self.state),
        }))
    }

    fn open_output(&self, id: usize) -> Result<Box<dyn OutputPort>, TransportError> {
        self.check_open(Direction::Output, id)?;
        self.state.lock().open_outputs += 1;
        Ok(Box::new(MockOutput {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockInput {
    state: Arc<Mutex<MockState>>,
}

impl InputPort for MockInput {
    fn read(&mut self, max_count: usize) -> Result<Vec<RawMessage>, TransportError> {
        let mut state = self.state.lock();
        if state.failing_reads {
            return Err(TransportError::Other("scripted read failure".to_owned()));
        }
        let count = max_count.min(state.pending.len());
        let messages = state.pending.drain(..count).collect();
        Ok(messages)
    }
}

impl Drop for MockInput {
    fn drop(&mut self) {
        self.state.lock().open_inputs -= 1;
    }
}

struct MockOutput {
    state: Arc<Mutex<MockState>>,
}

impl OutputPort for MockOutput {
    fn write(&mut self, messages: &[RawMessage]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.failing_writes {
            return Err(TransportError::Other("scripted write failure".to_owned()));
        }
        state.written.extend_from_slice(messages);
        Ok(())
    }
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        self.state.lock().open_outputs -= 1;
    }
}
