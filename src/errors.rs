use crate::midi_io::{Direction, RawMessage};

/// Failures reported by the MIDI transport underneath a [`Device`](crate::Device).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MIDI context initialization failed")]
    Init(#[from] midir::InitError),

    #[error("MIDI port retrieval failed")]
    PortInfo(#[from] midir::PortInfoError),

    #[error("connecting to MIDI port {id} failed: {reason}")]
    Connect { id: usize, reason: String },

    #[error("sending MIDI message failed")]
    Send(#[from] midir::SendError),

    #[error("MIDI port has been disconnected")]
    Disconnected,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{direction} device {name:?} doesn't exist")]
    NoSuchDevice { direction: Direction, name: String },

    #[error("{direction} device is busy")]
    DeviceBusy {
        direction: Direction,
        #[source]
        source: TransportError,
    },

    #[error("device has been opened without input")]
    NoInputAllowed,

    #[error("device has been opened without output")]
    NoOutputAllowed,

    #[error("you need to specify valid coordinates (x/y, 0-7, from top left), got ({x}, {y})")]
    InvalidCoordinates { x: u8, y: u8 },

    #[error("invalid brightness {0}, use 0-3, off/low/medium/high or lo/med/hi")]
    InvalidBrightness(String),

    #[error("unrecognized MIDI message {0}")]
    UnrecognizedMessage(RawMessage),

    #[error("communicating with the device failed")]
    Communication(#[from] TransportError),

    #[error("interaction has been closed")]
    Closed,
}
