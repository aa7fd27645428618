//! Color picker for the original Launchpad
//!
//! Up, down and left show every color the pad can display, in different arrangements. Right
//! switches to a picker where scene buttons 1-4 choose the red and 5-8 the green brightness. Any
//! other button blanks the pad, and releasing mixer quits.
use std::sync::Arc;

use gridpad::{
    Action, Brightness, Button, ButtonState, Color, Interaction, InteractionConfig, Mode,
    SceneButton, StateFilter, Target,
};
use parking_lot::Mutex;

const LEVELS: [Brightness; 4] = [
    Brightness::High,
    Brightness::Medium,
    Brightness::Low,
    Brightness::Off,
];

/// Full LED data: the grid as given by `grid`, dark scene buttons, and the first four control
/// buttons lit dim green, or bright green for the `selected` one.
fn view(grid: impl Fn(u8, u8) -> u8, selected: Option<usize>) -> Vec<u8> {
    let mut values = Vec::with_capacity(gridpad::Device::LED_COUNT);
    for y in 0..8 {
        for x in 0..8 {
            values.push(grid(x, y));
        }
    }
    values.extend([0; 8]);
    values.extend((0..4).map(|i| if Some(i) == selected { 48 } else { 16 }));
    values
}

fn mute(interaction: &Interaction, _: &Action) -> anyhow::Result<()> {
    interaction.device()?.change_all_leds(view(|_, _| 0, None))?;
    Ok(())
}

fn show(
    values: Vec<u8>,
) -> impl Fn(&Interaction, &Action) -> anyhow::Result<()> + Send + Sync + 'static {
    move |interaction, _| {
        interaction.device()?.change_all_leds(values.iter().copied())?;
        // scene buttons only pick colors in the picker
        interaction.response_to(SceneButton::ALL, StateFilter::Down, true, mute)?;
        Ok(())
    }
}

fn picker_view(color: Color) -> Vec<u8> {
    let mut values = vec![color.code(); 64];
    values.extend(LEVELS.iter().map(|&l| if color.red() == l { 51 } else { l.level() }));
    values.extend(LEVELS.iter().map(|&l| if color.green() == l { 51 } else { 16 * l.level() }));
    values.extend([16, 16, 16, 48]);
    values
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let interaction = Interaction::new(InteractionConfig::default());

    let single = view(|x, y| if x < 4 && y < 4 { 16 * y + x } else { 0 }, Some(0));
    let double = view(|x, y| 16 * (y / 2) + x / 2, Some(1));
    let mirrored = view(
        |x, y| 16 * if y < 4 { y } else { 7 - y } + if x < 4 { x } else { 7 - x },
        Some(2),
    );
    interaction.response_to([Button::UP], StateFilter::Down, false, show(single))?;
    interaction.response_to([Button::DOWN], StateFilter::Down, false, show(double))?;
    interaction.response_to([Button::LEFT], StateFilter::Down, false, show(mirrored))?;

    let picked = Arc::new(Mutex::new(Color::BLACK));
    interaction.response_to([Button::RIGHT], StateFilter::Down, false, move |interaction, _| {
        *picked.lock() = Color::BLACK;
        for (i, scene) in SceneButton::ALL.into_iter().enumerate() {
            let (level, picks_red) = (LEVELS[i % 4], i < 4);
            let picked = Arc::clone(&picked);
            interaction.response_to([scene], StateFilter::Down, true, move |interaction, _| {
                let mut color = picked.lock();
                let updated = if picks_red {
                    Color::new(level, color.green())
                } else {
                    Color::new(color.red(), level)
                };
                *color = updated;
                interaction.device()?.change_all_leds(picker_view(updated))?;
                Ok(())
            })?;
        }
        interaction.respond_to(SceneButton::Scene8, ButtonState::Down)?;
        Ok(())
    })?;

    interaction.response_to([Button::MIXER], StateFilter::Both, false, |interaction, action| {
        let color = if action.is_press() { Color::RED } else { Color::BLACK };
        interaction.device()?.change_led(Button::MIXER, color, Mode::Normal)?;
        if action.is_release() {
            interaction.stop()?;
        }
        Ok(())
    })?;

    let others = vec![
        Target::from(Button::SESSION),
        Target::from(Button::USER_1),
        Target::from(Button::USER_2),
        Target::grid(),
    ];
    interaction.response_to(others, StateFilter::Down, false, mute)?;

    interaction.respond_to(Button::SESSION, ButtonState::Down)?;
    interaction.start(false)?;
    interaction.close()?;
    Ok(())
}
