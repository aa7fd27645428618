/*!
A driver for the original Novation Launchpad (and the Launchpad S/Mini, which speak the same
protocol), together with an event-dispatch engine for building interactive programs on top of it.

# Low-level access through the Device

A [`Device`] owns the MIDI connections to one Launchpad. Every LED operation corresponds to
exactly one MIDI message (unless noted otherwise in the documentation), so you keep fine control
over what's actually being sent.

```no_run
use gridpad::{Brightness, Button, Color, Device, DeviceConfig, Mode};

let device = Device::open(&DeviceConfig::default())?;

device.change_led(Button::grid(0, 0)?, Color::RED, Mode::Normal)?;
device.change_led(Button::MIXER, Color::try_new(Brightness::Low, "hi")?, Mode::Flashing)?;
device.flashing_auto()?;
# Ok::<(), gridpad::Error>(())
```

## Using double buffering to light the whole pad at once

```no_run
use gridpad::{Buffer, BufferingMode, Color, Device, DeviceConfig, LedValue};

let device = Device::open(&DeviceConfig::default().input(false))?;

// show buffer 0 while buffer 1 is being written to
device.buffering_mode(BufferingMode::default().display(Buffer::Buffer0).update(Buffer::Buffer1))?;
// 80 LEDs in 41 messages
device.change_all_leds(vec![LedValue::from(Color::GREEN); Device::LED_COUNT])?;
// and flip
device.buffering_mode(BufferingMode::default().display(Buffer::Buffer1).update(Buffer::Buffer1))?;
# Ok::<(), gridpad::Error>(())
```

# High-level access through the Interaction

An [`Interaction`] polls the device in the background and calls responders registered for
buttons, grid regions or everything at once. See the [`Interaction`] docs.

```no_run
use gridpad::prelude::*;

let interaction = Interaction::new(InteractionConfig::default());
interaction.response_to([Target::grid()], StateFilter::Both, false, |interaction, action| {
    let color = if action.is_press() { Color::AMBER } else { Color::BLACK };
    interaction.device()?.change_led(action.button, color, Mode::Normal)?;
    Ok(())
})?;
interaction.start(true)?;
# Ok::<(), gridpad::Error>(())
```
*/

mod util;

mod protocols;
pub use protocols::double_buffering::{
    Brightness, Buffer, BufferingMode, Color, Mode, TryIntoBrightness,
};
pub use protocols::{Button, ControlButton, GridPos, SceneButton};

mod midi_io;
pub use midi_io::*;

mod errors;
pub use errors::*;

mod launchpad;
pub use launchpad::*;

mod interaction;
pub use interaction::*;

pub mod mock;

pub mod prelude {
    pub use crate::interaction::{Interaction, InteractionConfig, StateFilter, Target};
    pub use crate::launchpad::{Action, ButtonState, Device, DeviceConfig};
    pub use crate::protocols::double_buffering::{Brightness, Color, Mode};
    pub use crate::protocols::Button;
}

/// Identifier used for e.g. the midi client and connection names
const APPLICATION_NAME: &str = "Gridpad";
