use std::str::FromStr;

use crate::Error;

/// One of the four brightness levels of a single LED color component
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Brightness {
    #[default]
    Off = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Brightness {
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Brightness {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self, Error> {
        match level {
            0 => Ok(Self::Off),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(Error::InvalidBrightness(other.to_string())),
        }
    }
}

impl TryFrom<i32> for Brightness {
    type Error = Error;

    fn try_from(level: i32) -> Result<Self, Error> {
        u8::try_from(level)
            .map_err(|_| Error::InvalidBrightness(level.to_string()))
            .and_then(Self::try_from)
    }
}

/// Parses `off`, `low`/`lo`, `medium`/`med` and `high`/`hi`, as well as the digits 0-3.
/// Case-sensitive.
impl FromStr for Brightness {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "0" | "off" => Ok(Self::Off),
            "1" | "low" | "lo" => Ok(Self::Low),
            "2" | "medium" | "med" => Ok(Self::Medium),
            "3" | "high" | "hi" => Ok(Self::High),
            other => Err(Error::InvalidBrightness(format!("{:?}", other))),
        }
    }
}

/// A 2-bit color, with only red and green components
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    red: Brightness,
    green: Brightness,
}

impl Color {
    pub const BLACK: Color = Color::new(Brightness::Off, Brightness::Off);
    pub const RED: Color = Color::new(Brightness::High, Brightness::Off);
    pub const GREEN: Color = Color::new(Brightness::Off, Brightness::High);
    pub const YELLOW: Color = Color::new(Brightness::High, Brightness::High);
    pub const AMBER: Color = Color::new(Brightness::High, Brightness::Medium);

    pub const fn new(red: Brightness, green: Brightness) -> Color {
        Color { red, green }
    }

    /// Create a new color from anything that canonicalizes to a [`Brightness`]: numeric levels
    /// 0-3 or their names.
    ///
    /// ```
    /// # use gridpad::Color;
    /// let amber = Color::try_new(3, "med")?;
    /// assert_eq!(amber, Color::AMBER);
    /// # Ok::<(), gridpad::Error>(())
    /// ```
    pub fn try_new<R, G>(red: R, green: G) -> Result<Color, Error>
    where
        R: TryIntoBrightness,
        G: TryIntoBrightness,
    {
        Ok(Color::new(
            red.try_into_brightness()?,
            green.try_into_brightness()?,
        ))
    }

    pub fn red(&self) -> Brightness {
        self.red
    }

    pub fn green(&self) -> Brightness {
        self.green
    }

    /// `16 * green + red`, the color part of an LED velocity
    pub fn code(&self) -> u8 {
        (self.green.level() << 4) | self.red.level()
    }
}

/// Conversion into a [`Brightness`] that fails with
/// [`InvalidBrightness`](Error::InvalidBrightness).
pub trait TryIntoBrightness {
    fn try_into_brightness(self) -> Result<Brightness, Error>;
}

impl TryIntoBrightness for Brightness {
    fn try_into_brightness(self) -> Result<Brightness, Error> {
        Ok(self)
    }
}

impl TryIntoBrightness for u8 {
    fn try_into_brightness(self) -> Result<Brightness, Error> {
        Brightness::try_from(self)
    }
}

impl TryIntoBrightness for i32 {
    fn try_into_brightness(self) -> Result<Brightness, Error> {
        Brightness::try_from(self)
    }
}

impl TryIntoBrightness for &str {
    fn try_into_brightness(self) -> Result<Brightness, Error> {
        self.parse()
    }
}

/// How a single LED update interacts with the two display buffers
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Write to both buffers, the change is visible immediately
    #[default]
    Normal,
    /// Write to the updated buffer and clear the other buffer's copy, so the LED flashes when
    /// flashing is on
    Flashing,
    /// Only write to the currently updated buffer
    Buffering,
}

impl Mode {
    // Bit 3 - Clear - If 1: clear the other buffer's copy of this LED.
    // Bit 2 - Copy - If 1: write this LED data to both buffers.
    const CLEAR: u8 = 0b1000;
    const COPY: u8 = 0b0100;

    pub(crate) fn flags(self) -> u8 {
        match self {
            Mode::Normal => Self::CLEAR | Self::COPY,
            Mode::Flashing => Self::CLEAR,
            Mode::Buffering => 0,
        }
    }
}

/// Computes the velocity byte of an LED update: `16 * green + red + mode flags`
pub(crate) fn make_velocity(color_code: u8, mode: Mode) -> u8 {
    // Bit 6 - Must be 0
    // Bit 5..4 - Green LED brightness
    // Bit 3..2 - Mode flags
    // Bit 1..0 - Red LED brightness
    color_code + mode.flags()
}

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Buffer {
    #[default]
    Buffer0 = 0,
    Buffer1 = 1,
}

/// Specifies a double buffering mode change
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferingMode {
    /// The buffer that is being displayed
    pub display_buffer: Buffer,
    /// The buffer that LED updates are written to
    pub update_buffer: Buffer,
    /// If true, copy the contents from the new displayed buffer to the new updated buffer
    pub copy: bool,
    /// If true, continually flip displayed buffers to make a flashing effect
    pub flashing: bool,
}

impl BufferingMode {
    pub fn display(mut self, buffer: Buffer) -> Self {
        self.display_buffer = buffer;
        self
    }

    pub fn update(mut self, buffer: Buffer) -> Self {
        self.update_buffer = buffer;
        self
    }

    pub fn copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    pub fn flashing(mut self, flashing: bool) -> Self {
        self.flashing = flashing;
        self
    }

    pub(crate) fn control_byte(&self) -> u8 {
        0b0010_0000
            | ((self.copy as u8) << 4)
            | ((self.flashing as u8) << 3)
            | ((self.update_buffer as u8) << 2)
            | self.display_buffer as u8
    }
}
