use std::fmt;
use std::sync::mpsc;

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::util::ok_or_continue;
use crate::TransportError;

/// A single three-byte MIDI message as exchanged with the transport, together with the time it
/// was received at. Outgoing messages carry a timestamp of zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub timestamp: u64,
}

impl RawMessage {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
            timestamp: 0,
        }
    }

    /// Returns a copy of this message stamped with `timestamp`
    pub const fn at(self, timestamp: u64) -> Self {
        Self { timestamp, ..self }
    }

    /// Builds a message out of a raw byte slice. Anything that isn't exactly three bytes long
    /// (sysex for example) yields `None`.
    pub fn from_bytes(timestamp: u64, data: &[u8]) -> Option<Self> {
        match *data {
            [status, data1, data2] => Some(Self::new(status, data1, data2).at(timestamp)),
            _ => None,
        }
    }

    pub fn bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#04X}, {:#04X}, {:#04X}]",
            self.status, self.data1, self.data2
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Input => "input",
            Direction::Output => "output",
        })
    }
}

/// An entry of a transport's device listing
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PortInfo {
    pub id: usize,
    pub name: String,
}

/// The receiving side of an opened MIDI endpoint. Dropping the port closes it.
pub trait InputPort: Send {
    /// Returns up to `max_count` pending messages, oldest first. Never blocks: if nothing is
    /// pending, an empty `Vec` is returned.
    fn read(&mut self, max_count: usize) -> Result<Vec<RawMessage>, TransportError>;
}

/// The sending side of an opened MIDI endpoint. Dropping the port closes it.
pub trait OutputPort: Send {
    /// Sends all `messages` in order. A single call is never interleaved with another one.
    fn write(&mut self, messages: &[RawMessage]) -> Result<(), TransportError>;
}

/// A MIDI subsystem that can list and open endpoints. [`MidirTransport`] is the real thing,
/// [`MockTransport`](crate::mock::MockTransport) is an in-memory stand-in.
pub trait Transport {
    fn input_ports(&self) -> Result<Vec<PortInfo>, TransportError>;

    fn output_ports(&self) -> Result<Vec<PortInfo>, TransportError>;

    fn open_input(&self, id: usize) -> Result<Box<dyn InputPort>, TransportError>;

    fn open_output(&self, id: usize) -> Result<Box<dyn OutputPort>, TransportError>;
}

/// Choose the port called `name`. If there's no port with exactly that name, the first port whose
/// name contains `name` is chosen instead, because most MIDI backends decorate the product name
/// with client and port numbers.
pub(crate) fn guess_port<'a>(ports: &'a [PortInfo], name: &str) -> Option<&'a PortInfo> {
    ports
        .iter()
        .find(|port| port.name == name)
        .or_else(|| ports.iter().find(|port| port.name.contains(name)))
}

fn list_ports<T: midir::MidiIO>(midi_io: &T) -> Vec<PortInfo> {
    let mut infos = Vec::new();
    for (id, port) in midi_io.ports().iter().enumerate() {
        let name = ok_or_continue!(midi_io.port_name(port));
        infos.push(PortInfo { id, name });
    }
    infos
}

/// The [`Transport`] backed by the system MIDI stack, via midir.
#[derive(Debug, Clone)]
pub struct MidirTransport {
    client_name: String,
}

impl MidirTransport {
    const INPUT_CONNECTION_NAME: &'static str = "Gridpad input";
    const OUTPUT_CONNECTION_NAME: &'static str = "Gridpad output";

    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

impl Default for MidirTransport {
    fn default() -> Self {
        Self::new(crate::APPLICATION_NAME)
    }
}

impl Transport for MidirTransport {
    fn input_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        Ok(list_ports(&MidiInput::new(&self.client_name)?))
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        Ok(list_ports(&MidiOutput::new(&self.client_name)?))
    }

    fn open_input(&self, id: usize) -> Result<Box<dyn InputPort>, TransportError> {
        let midi_input = MidiInput::new(&self.client_name)?;
        let port = midi_input
            .ports()
            .into_iter()
            .nth(id)
            .ok_or_else(|| TransportError::Connect {
                id,
                reason: "port vanished".to_owned(),
            })?;

        // midir only hands out messages through a callback, so they're queued up here until the
        // next read
        let (sender, receiver) = mpsc::channel();
        let midir_callback = move |timestamp: u64, data: &[u8], _: &mut ()| {
            if let Some(msg) = RawMessage::from_bytes(timestamp, data) {
                // the receiver only goes away together with the connection
                let _ = sender.send(msg);
            }
        };

        let connection = midi_input
            .connect(&port, Self::INPUT_CONNECTION_NAME, midir_callback, ())
            .map_err(|e| TransportError::Connect {
                id,
                reason: e.to_string(),
            })?;

        Ok(Box::new(MidirInput {
            _connection: connection,
            receiver,
        }))
    }

    fn open_output(&self, id: usize) -> Result<Box<dyn OutputPort>, TransportError> {
        let midi_output = MidiOutput::new(&self.client_name)?;
        let port = midi_output
            .ports()
            .into_iter()
            .nth(id)
            .ok_or_else(|| TransportError::Connect {
                id,
                reason: "port vanished".to_owned(),
            })?;

        let connection = midi_output
            .connect(&port, Self::OUTPUT_CONNECTION_NAME)
            .map_err(|e| TransportError::Connect {
                id,
                reason: e.to_string(),
            })?;

        Ok(Box::new(MidirOutput { connection }))
    }
}

struct MidirInput {
    // never used explicitly, but it needs to stay alive for the callback to keep firing
    _connection: MidiInputConnection<()>,
    receiver: mpsc::Receiver<RawMessage>,
}

impl InputPort for MidirInput {
    fn read(&mut self, max_count: usize) -> Result<Vec<RawMessage>, TransportError> {
        let mut messages = Vec::new();
        while messages.len() < max_count {
            match self.receiver.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return Err(TransportError::Disconnected),
            }
        }

        for msg in &messages {
            log::trace!("read {} at {}", msg, msg.timestamp);
        }

        Ok(messages)
    }
}

struct MidirOutput {
    connection: MidiOutputConnection,
}

impl OutputPort for MidirOutput {
    fn write(&mut self, messages: &[RawMessage]) -> Result<(), TransportError> {
        for msg in messages {
            log::trace!("write {}", msg);
            self.connection.send(&msg.bytes())?;
        }
        Ok(())
    }
}
