use crate::midi_io::RawMessage;
use crate::protocols::{status, Button, ControlButton, GridPos, SceneButton, PRESS_VELOCITY};
use crate::{Device, Error};

/// Whether a button went down or came back up
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ButtonState {
    Down,
    Up,
}

/// A button press or release, as read from the device
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    /// Transport timestamp of the underlying message
    pub timestamp: u64,
    pub state: ButtonState,
    pub button: Button,
}

impl Action {
    pub fn new(button: Button, state: ButtonState) -> Self {
        Self {
            timestamp: 0,
            state,
            button,
        }
    }

    pub fn is_press(&self) -> bool {
        self.state == ButtonState::Down
    }

    pub fn is_release(&self) -> bool {
        self.state == ButtonState::Up
    }
}

/// Decodes a single message received from the Launchpad.
///
/// Control buttons arrive as controller changes, scene and grid buttons as note-ons. The Launchpad
/// never sends note-off messages; a release is a note-on with zero velocity.
pub fn decode_message(msg: RawMessage) -> Result<Action, Error> {
    let button = match msg.status {
        status::CC => ControlButton::from_note(msg.data1).map(Button::Control),
        status::ON => Some(match SceneButton::from_note(msg.data1) {
            Some(scene) => Button::Scene(scene),
            None => Button::Grid(
                GridPos::new(msg.data1 % 16, msg.data1 / 16)
                    .map_err(|_| Error::UnrecognizedMessage(msg))?,
            ),
        }),
        _ => None,
    };
    let button = button.ok_or(Error::UnrecognizedMessage(msg))?;

    let state = if msg.data2 == PRESS_VELOCITY {
        ButtonState::Down
    } else {
        ButtonState::Up
    };

    Ok(Action {
        timestamp: msg.timestamp,
        state,
        button,
    })
}

impl Device {
    /// How many messages a single read takes from the transport
    pub const READ_BATCH_SIZE: usize = 16;

    /// Reads the button actions that arrived since the last call. Returns immediately, with an
    /// empty `Vec` if there's nothing pending.
    ///
    /// Messages that aren't button actions are skipped.
    pub fn read_pending_actions(&self) -> Result<Vec<Action>, Error> {
        let messages = {
            let mut input = self.input.lock();
            let input = input.as_mut().ok_or(Error::NoInputAllowed)?;
            input.read(Self::READ_BATCH_SIZE)?
        };

        let mut actions = Vec::with_capacity(messages.len());
        for msg in messages {
            match decode_message(msg) {
                Ok(action) => actions.push(action),
                Err(e) => log::warn!("ignoring message: {}", e),
            }
        }
        Ok(actions)
    }
}
