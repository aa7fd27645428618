use std::fmt;

pub(crate) mod double_buffering;

/// MIDI status bytes understood by the Launchpad
pub(crate) mod status {
    pub const NIL: u8 = 0x00;
    pub const ON: u8 = 0x90;
    pub const MULTI: u8 = 0x92;
    pub const CC: u8 = 0xB0;
}

/// Second data bytes of the `CC 0x00 ...` control messages
pub(crate) mod control {
    pub const RESET: u8 = 0x00;
    pub const GRID_LAYOUT_XY: u8 = 0x01;
    pub const FLASHING_ON: u8 = 0x20;
    pub const FLASHING_OFF: u8 = 0x21;
    pub const FLASHING_AUTO: u8 = 0x28;
    pub const TEST_LEDS: u8 = 0x7C;
}

/// Velocity the Launchpad sends along with a button press. Anything else is a release.
pub(crate) const PRESS_VELOCITY: u8 = 127;

/// One of the eight round buttons above the grid. They are addressed with controller change
/// messages.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlButton {
    Up,
    Down,
    Left,
    Right,
    Session,
    User1,
    User2,
    Mixer,
}

impl ControlButton {
    /// All control buttons, left to right
    pub const ALL: [ControlButton; 8] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::Session,
        Self::User1,
        Self::User2,
        Self::Mixer,
    ];

    /// Position from the left, 0-7
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub(crate) fn note(self) -> u8 {
        0x68 + self.index()
    }

    pub(crate) fn from_note(note: u8) -> Option<Self> {
        Self::from_index(note.checked_sub(0x68)?)
    }
}

/// One of the eight round buttons right of the grid, numbered 1-8 from the top. They share the
/// note-on message type with the grid, using note numbers the grid never produces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SceneButton {
    Scene1,
    Scene2,
    Scene3,
    Scene4,
    Scene5,
    Scene6,
    Scene7,
    Scene8,
}

impl SceneButton {
    /// All scene buttons, top to bottom
    pub const ALL: [SceneButton; 8] = [
        Self::Scene1,
        Self::Scene2,
        Self::Scene3,
        Self::Scene4,
        Self::Scene5,
        Self::Scene6,
        Self::Scene7,
        Self::Scene8,
    ];

    /// Creates a scene button from its 1-based number as printed in the manual
    pub fn new(number: u8) -> Option<Self> {
        Self::ALL.get((number as usize).checked_sub(1)?).copied()
    }

    /// 1-based number, top to bottom
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub(crate) fn note(self) -> u8 {
        16 * (self as u8) + 8
    }

    pub(crate) fn from_note(note: u8) -> Option<Self> {
        if note % 16 != 8 {
            return None;
        }
        Self::ALL.get((note / 16) as usize).copied()
    }
}

/// A validated position on the 8x8 grid. x is the column, y the row, both counted from the top
/// left starting at zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "(u8, u8)", into = "(u8, u8)"))]
pub struct GridPos {
    x: u8,
    y: u8,
}

impl GridPos {
    pub const SIZE: u8 = 8;

    pub fn new(x: u8, y: u8) -> Result<Self, crate::Error> {
        if x >= Self::SIZE || y >= Self::SIZE {
            return Err(crate::Error::InvalidCoordinates { x, y });
        }
        Ok(Self { x, y })
    }

    pub fn x(self) -> u8 {
        self.x
    }

    pub fn y(self) -> u8 {
        self.y
    }

    pub(crate) fn note(self) -> u8 {
        16 * self.y + self.x
    }
}

impl TryFrom<(u8, u8)> for GridPos {
    type Error = crate::Error;

    fn try_from((x, y): (u8, u8)) -> Result<Self, Self::Error> {
        Self::new(x, y)
    }
}

impl From<GridPos> for (u8, u8) {
    fn from(pos: GridPos) -> Self {
        (pos.x, pos.y)
    }
}

/// Any physical button of the Launchpad
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Button {
    Grid(GridPos),
    Control(ControlButton),
    Scene(SceneButton),
}

impl Button {
    pub const UP: Self = Button::Control(ControlButton::Up);
    pub const DOWN: Self = Button::Control(ControlButton::Down);
    pub const LEFT: Self = Button::Control(ControlButton::Left);
    pub const RIGHT: Self = Button::Control(ControlButton::Right);
    pub const SESSION: Self = Button::Control(ControlButton::Session);
    pub const USER_1: Self = Button::Control(ControlButton::User1);
    pub const USER_2: Self = Button::Control(ControlButton::User2);
    pub const MIXER: Self = Button::Control(ControlButton::Mixer);

    /// Creates a new grid button, failing with [`InvalidCoordinates`](crate::Error::InvalidCoordinates)
    /// if `x` or `y` lie outside of 0-7
    pub fn grid(x: u8, y: u8) -> Result<Self, crate::Error> {
        Ok(Button::Grid(GridPos::new(x, y)?))
    }

    /// Creates a scene button from its 1-based number
    pub fn scene(number: u8) -> Option<Self> {
        SceneButton::new(number).map(Button::Scene)
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, Button::Grid(_))
    }

    /// Grid position, if this is a grid button
    pub fn pos(&self) -> Option<GridPos> {
        match *self {
            Button::Grid(pos) => Some(pos),
            _ => None,
        }
    }
}

impl From<GridPos> for Button {
    fn from(pos: GridPos) -> Self {
        Button::Grid(pos)
    }
}

impl From<ControlButton> for Button {
    fn from(button: ControlButton) -> Self {
        Button::Control(button)
    }
}

impl From<SceneButton> for Button {
    fn from(button: SceneButton) -> Self {
        Button::Scene(button)
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Grid(pos) => write!(f, "grid ({}, {})", pos.x(), pos.y()),
            Button::Control(button) => write!(f, "{:?}", button),
            Button::Scene(button) => write!(f, "scene {}", button.number()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_notes_are_contiguous() {
        let notes: Vec<u8> = ControlButton::ALL.iter().map(|b| b.note()).collect();
        assert_eq!(notes, (0x68..=0x6F).collect::<Vec<u8>>());
        assert_eq!(ControlButton::from_note(0x6F), Some(ControlButton::Mixer));
        assert_eq!(ControlButton::from_note(0x67), None);
        assert_eq!(ControlButton::from_note(0x70), None);
    }

    #[test]
    fn scene_notes_sit_right_of_the_grid() {
        let notes: Vec<u8> = SceneButton::ALL.iter().map(|b| b.note()).collect();
        assert_eq!(notes, [0x08, 0x18, 0x28, 0x38, 0x48, 0x58, 0x68, 0x78]);
        assert_eq!(SceneButton::from_note(0x78), Some(SceneButton::Scene8));
        assert_eq!(SceneButton::from_note(0x07), None);
        assert_eq!(SceneButton::from_note(0x88), None);
    }

    #[test]
    fn scene_numbers_are_one_based() {
        assert_eq!(SceneButton::new(0), None);
        assert_eq!(SceneButton::new(1), Some(SceneButton::Scene1));
        assert_eq!(SceneButton::new(8).map(SceneButton::number), Some(8));
        assert_eq!(SceneButton::new(9), None);
    }

    #[test]
    fn grid_positions_are_validated() {
        assert!(GridPos::new(7, 7).is_ok());
        assert!(matches!(
            GridPos::new(8, 1),
            Err(crate::Error::InvalidCoordinates { x: 8, y: 1 })
        ));
        assert!(matches!(
            Button::grid(1, 8),
            Err(crate::Error::InvalidCoordinates { x: 1, y: 8 })
        ));
    }
}
