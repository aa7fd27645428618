use crate::midi_io::RawMessage;
use crate::protocols::double_buffering::make_velocity;
use crate::protocols::{control, status, Button};
use crate::{Brightness, BufferingMode, Color, Device, Error, Mode};

/// A value for one LED in a [batch update](Device::change_all_leds)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LedValue {
    Color(Color),
    /// A precomputed `16 * green + red` code, both components 0-3
    Raw(u8),
}

impl LedValue {
    /// Largest valid raw code, green and red at full brightness
    pub const MAX_RAW: u8 = 0x33;

    // bits 2-3 carry the mode flags, bits 6-7 must stay clear
    const NON_COLOR_BITS: u8 = 0b1100_1100;

    fn code(self) -> Result<u8, Error> {
        match self {
            LedValue::Color(color) => Ok(color.code()),
            LedValue::Raw(code) if code & Self::NON_COLOR_BITS == 0 => Ok(code),
            LedValue::Raw(code) => Err(Error::InvalidBrightness(format!("{:#04X}", code))),
        }
    }
}

impl Default for LedValue {
    fn default() -> Self {
        LedValue::Raw(0)
    }
}

impl From<Color> for LedValue {
    fn from(color: Color) -> Self {
        LedValue::Color(color)
    }
}

impl From<u8> for LedValue {
    fn from(code: u8) -> Self {
        LedValue::Raw(code)
    }
}

/// Encodes an LED update for a single button.
///
/// Control buttons are addressed with controller change messages, grid and scene buttons with
/// note-ons. The velocity carries the color and the buffer behavior.
pub fn encode_change(button: Button, color: Color, mode: Mode) -> RawMessage {
    let (status, note) = match button {
        Button::Control(button) => (status::CC, button.note()),
        Button::Scene(button) => (status::ON, button.note()),
        Button::Grid(pos) => (status::ON, pos.note()),
    };
    RawMessage::new(status, note, make_velocity(color.code(), mode))
}

/// Encodes a rapid update of all 80 LEDs.
///
/// `values` fills the 8x8 grid in left-to-right, top-to-bottom order, then the eight scene
/// buttons top to bottom, and finally the eight control buttons left to right. Missing values are
/// filled up with black, surplus values are dropped.
///
/// The result is one message switching to the X-Y layout, followed by 40 messages each carrying
/// two LEDs.
pub fn encode_all<I>(values: I) -> Result<Vec<RawMessage>, Error>
where
    I: IntoIterator,
    I::Item: Into<LedValue>,
{
    let mut codes = values
        .into_iter()
        .take(Device::LED_COUNT)
        .map(|value| value.into().code())
        .collect::<Result<Vec<u8>, Error>>()?;
    codes.resize(Device::LED_COUNT, 0);

    let mut messages = Vec::with_capacity(Device::LED_COUNT / 2 + 1);
    messages.push(RawMessage::new(
        status::CC,
        status::NIL,
        control::GRID_LAYOUT_XY,
    ));
    messages.extend(codes.chunks_exact(2).map(|pair| {
        RawMessage::new(
            status::MULTI,
            make_velocity(pair[0], Mode::Normal),
            make_velocity(pair[1], Mode::Normal),
        )
    }));
    Ok(messages)
}

/// ## Double buffering
/// The Launchpad keeps two sets of LED data, buffer 0 and buffer 1. By default, the buffer that
/// incoming updates are written to is also the one on display, so every update shows up
/// immediately. The buffers can also be set up so that updates go to the hidden buffer and are
/// swapped in all at once, or so that the displayed buffer alternates automatically, which makes
/// LEDs written in [flashing mode](Mode::Flashing) blink.
impl Device {
    /// Number of LEDs addressed by a [batch update](Device::change_all_leds)
    pub const LED_COUNT: usize = 80;

    fn send(&self, messages: &[RawMessage]) -> Result<(), Error> {
        let mut output = self.output.lock();
        let output = output.as_mut().ok_or(Error::NoOutputAllowed)?;
        output.write(messages)?;
        Ok(())
    }

    fn send_control(&self, value: u8) -> Result<(), Error> {
        self.send(&[RawMessage::new(status::CC, status::NIL, value)])
    }

    /// All LEDs are turned off, and the mapping mode, buffer settings, and duty cycle are reset to
    /// their default values.
    pub fn reset(&self) -> Result<(), Error> {
        self.send_control(control::RESET)
    }

    /// Turns on all LEDs at the given brightness, or resets the device for
    /// [`Brightness::Off`]. Meant as a diagnostics tool to check that the device responds.
    pub fn test_leds(&self, brightness: Brightness) -> Result<(), Error> {
        match brightness {
            Brightness::Off => self.reset(),
            brightness => self.send_control(control::TEST_LEDS + brightness.level()),
        }
    }

    /// Set a `button` to a certain `color`.
    ///
    /// For example to set the mixer button to red, and a grid button to blinking green:
    /// ```no_run
    /// # use gridpad::{Button, Color, Mode};
    /// # let device: gridpad::Device = unimplemented!();
    /// device.change_led(Button::MIXER, Color::RED, Mode::Normal)?;
    /// device.change_led(Button::grid(2, 5)?, Color::GREEN, Mode::Flashing)?;
    /// # Ok::<(), gridpad::Error>(())
    /// ```
    pub fn change_led(
        &self,
        button: impl Into<Button>,
        color: Color,
        mode: Mode,
    ) -> Result<(), Error> {
        self.send(&[encode_change(button.into(), color, mode)])
    }

    /// Shorthand for [`change_led`](Device::change_led) on a grid button. Fails with
    /// [`InvalidCoordinates`](Error::InvalidCoordinates) if `x` or `y` exceed 7.
    pub fn change_grid(&self, x: u8, y: u8, color: Color, mode: Mode) -> Result<(), Error> {
        self.change_led(Button::grid(x, y)?, color, mode)
    }

    /// Updates all 80 LEDs at once, using the rapid update mode which lights two LEDs per
    /// message. See [`encode_all`] for the order in which `values` are applied.
    ///
    /// The 41 messages are sent in one go, so concurrent LED updates can't end up in the middle
    /// of the rapid update.
    pub fn change_all_leds<I>(&self, values: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: Into<LedValue>,
    {
        self.send(&encode_all(values)?)
    }

    /// Shows the LEDs marked as flashing (when driving the flashing with a custom timer)
    pub fn flashing_on(&self) -> Result<(), Error> {
        self.send_control(control::FLASHING_ON)
    }

    /// Hides the LEDs marked as flashing (when driving the flashing with a custom timer)
    pub fn flashing_off(&self) -> Result<(), Error> {
        self.send_control(control::FLASHING_OFF)
    }

    /// Lets the device flash the LEDs marked as flashing on its own
    pub fn flashing_auto(&self) -> Result<(), Error> {
        self.send_control(control::FLASHING_AUTO)
    }

    /// Controls the double buffering mode. See the [impl-level documentation](#double-buffering)
    /// for an explanation.
    ///
    /// The default state is no flashing, with buffer 0 being both the updated and the displayed
    /// buffer. Sending this message also resets the flash timer.
    pub fn buffering_mode(&self, mode: BufferingMode) -> Result<(), Error> {
        self.send_control(mode.control_byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Brightness::*, ControlButton, SceneButton};

    #[test]
    fn control_buttons_use_controller_change() {
        for button in ControlButton::ALL {
            let msg = encode_change(button.into(), Color::BLACK, Mode::Normal);
            assert_eq!(msg.bytes(), [0xB0, 0x68 + button.index(), 12]);
        }
    }

    #[test]
    fn scene_buttons_use_note_on() {
        let msg = encode_change(SceneButton::Scene3.into(), Color::BLACK, Mode::Normal);
        assert_eq!(msg.bytes(), [0x90, 0x28, 12]);
    }

    #[test]
    fn grid_note_is_row_major_with_stride_16() {
        let msg = encode_change(
            Button::grid(5, 2).unwrap(),
            Color::new(Low, High),
            Mode::Flashing,
        );
        assert_eq!(msg.bytes(), [0x90, 2 * 16 + 5, 16 * 3 + 1 + 8]);
    }

    #[test]
    fn batch_update_pads_with_black() {
        let messages = encode_all(vec![0x11u8; 40]).unwrap();
        assert_eq!(messages.len(), 41);
        assert_eq!(messages[0].bytes(), [0xB0, 0x00, 0x01]);
        assert!(messages[1..21].iter().all(|m| m.bytes() == [0x92, 29, 29]));
        assert!(messages[21..].iter().all(|m| m.bytes() == [0x92, 12, 12]));
    }

    #[test]
    fn batch_update_truncates_surplus() {
        let messages = encode_all(vec![Color::RED; 100]).unwrap();
        assert_eq!(messages.len(), 41);
        assert!(messages[1..].iter().all(|m| m.bytes() == [0x92, 15, 15]));
    }

    #[test]
    fn batch_update_rejects_oversized_codes() {
        assert!(matches!(
            encode_all([0u8, 0x40]),
            Err(Error::InvalidBrightness(_))
        ));
    }

    #[test]
    fn batch_update_rejects_codes_overlapping_mode_bits() {
        // red 7 and a code with both mode flags set
        for code in [0x07u8, 0x3C, 0x04, 0x08] {
            assert!(
                matches!(encode_all([code]), Err(Error::InvalidBrightness(_))),
                "{:#04X}",
                code
            );
        }
    }

    #[test]
    fn every_valid_raw_code_keeps_bit_6_clear() {
        for red in 0..4u8 {
            for green in 0..4u8 {
                let code = 16 * green + red;
                let messages = encode_all([code, LedValue::MAX_RAW]).unwrap();
                assert_eq!(messages[1].bytes(), [0x92, code + 12, 0x33 + 12]);
                assert!(messages[1].data1 < 0x40 && messages[1].data2 < 0x40);
            }
        }
    }
}
