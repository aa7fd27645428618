use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Interaction;
use crate::protocols::{Button, ControlButton, GridPos, SceneButton};
use crate::{Action, ButtonState, Error};

/// A registered callback. It gets a handle to the interaction it was registered on, so it can
/// change LEDs, register further responders or stop the interaction.
pub type Responder = Arc<dyn Fn(&Interaction, &Action) -> anyhow::Result<()> + Send + Sync>;

/// Which button transitions a responder reacts to
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum StateFilter {
    Down,
    Up,
    #[default]
    Both,
}

impl StateFilter {
    fn states(self) -> &'static [ButtonState] {
        match self {
            StateFilter::Down => &[ButtonState::Down],
            StateFilter::Up => &[ButtonState::Up],
            StateFilter::Both => &[ButtonState::Down, ButtonState::Up],
        }
    }
}

/// A part of the 8x8 grid, given as sets of columns and rows. Leaving out the rows means every
/// row of the given columns and vice versa; leaving out both means the whole grid.
///
/// ```
/// # use gridpad::{GridRegion, Target};
/// // the left half of the two bottom rows
/// let region = GridRegion::default().columns(0..4).rows([6, 7]);
/// let target = Target::from(region);
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct GridRegion {
    columns: Vec<u8>,
    rows: Vec<u8>,
}

impl GridRegion {
    pub fn columns(mut self, xs: impl IntoIterator<Item = u8>) -> Self {
        self.columns.extend(xs);
        self
    }

    pub fn rows(mut self, ys: impl IntoIterator<Item = u8>) -> Self {
        self.rows.extend(ys);
        self
    }

    fn keys(&self) -> Result<Vec<ResponderKey>, Error> {
        let invalid = |x: u8, y: u8| Error::InvalidCoordinates { x, y };
        if let Some(&x) = self.columns.iter().find(|&&x| x >= GridPos::SIZE) {
            return Err(invalid(x, self.rows.first().copied().unwrap_or(0)));
        }
        if let Some(&y) = self.rows.iter().find(|&&y| y >= GridPos::SIZE) {
            return Err(invalid(self.columns.first().copied().unwrap_or(0), y));
        }

        let keys = match (self.columns.is_empty(), self.rows.is_empty()) {
            (true, true) => vec![ResponderKey::Grid],
            (false, true) => self.columns.iter().map(|&x| ResponderKey::Column(x)).collect(),
            (true, false) => self.rows.iter().map(|&y| ResponderKey::Row(y)).collect(),
            (false, false) => self
                .columns
                .iter()
                .flat_map(|&x| self.rows.iter().map(move |&y| ResponderKey::Cell(x, y)))
                .collect(),
        };
        Ok(keys)
    }
}

/// What a responder is registered for
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Target {
    /// Every button
    All,
    Grid(GridRegion),
    Control(ControlButton),
    Scene(SceneButton),
}

impl Target {
    /// The whole grid
    pub fn grid() -> Self {
        Target::Grid(GridRegion::default())
    }

    /// Every button in column `x`
    pub fn column(x: u8) -> Self {
        Target::Grid(GridRegion::default().columns([x]))
    }

    /// Every button in row `y`
    pub fn row(y: u8) -> Self {
        Target::Grid(GridRegion::default().rows([y]))
    }

    /// The single grid button at `x`, `y`
    pub fn cell(x: u8, y: u8) -> Self {
        Target::Grid(GridRegion::default().columns([x]).rows([y]))
    }

    fn keys(&self) -> Result<Vec<ResponderKey>, Error> {
        match self {
            Target::All => Ok(vec![ResponderKey::All]),
            Target::Grid(region) => region.keys(),
            Target::Control(button) => Ok(vec![ResponderKey::Control(*button)]),
            Target::Scene(button) => Ok(vec![ResponderKey::Scene(*button)]),
        }
    }
}

impl From<GridRegion> for Target {
    fn from(region: GridRegion) -> Self {
        Target::Grid(region)
    }
}

impl From<ControlButton> for Target {
    fn from(button: ControlButton) -> Self {
        Target::Control(button)
    }
}

impl From<SceneButton> for Target {
    fn from(button: SceneButton) -> Self {
        Target::Scene(button)
    }
}

impl From<Button> for Target {
    fn from(button: Button) -> Self {
        match button {
            Button::Grid(pos) => Target::cell(pos.x(), pos.y()),
            Button::Control(button) => Target::Control(button),
            Button::Scene(button) => Target::Scene(button),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
enum ResponderKey {
    All,
    Grid,
    Column(u8),
    Row(u8),
    Cell(u8, u8),
    Control(ControlButton),
    Scene(SceneButton),
}

impl ResponderKey {
    /// Keys consulted for an action, in calling order
    fn lookup_order(button: Button) -> Vec<ResponderKey> {
        match button {
            Button::Grid(pos) => vec![
                ResponderKey::Cell(pos.x(), pos.y()),
                ResponderKey::Column(pos.x()),
                ResponderKey::Row(pos.y()),
                ResponderKey::Grid,
                ResponderKey::All,
            ],
            Button::Control(button) => vec![ResponderKey::Control(button), ResponderKey::All],
            Button::Scene(button) => vec![ResponderKey::Scene(button), ResponderKey::All],
        }
    }
}

#[derive(Default)]
struct Responders {
    down: Vec<Responder>,
    up: Vec<Responder>,
}

impl Responders {
    fn get(&self, state: ButtonState) -> &[Responder] {
        match state {
            ButtonState::Down => &self.down,
            ButtonState::Up => &self.up,
        }
    }

    fn get_mut(&mut self, state: ButtonState) -> &mut Vec<Responder> {
        match state {
            ButtonState::Down => &mut self.down,
            ButtonState::Up => &mut self.up,
        }
    }

    fn is_empty(&self) -> bool {
        self.down.is_empty() && self.up.is_empty()
    }
}

/// Responders by button, each with one list per button state. Calling order within a list is
/// registration order.
#[derive(Default)]
pub(crate) struct ResponderTable {
    map: RwLock<HashMap<ResponderKey, Responders>>,
}

fn keys_of<'a>(targets: impl IntoIterator<Item = &'a Target>) -> Result<Vec<ResponderKey>, Error> {
    let mut keys = Vec::new();
    for target in targets {
        keys.extend(target.keys()?);
    }
    Ok(keys)
}

fn clear_keys(map: &mut HashMap<ResponderKey, Responders>, keys: &[ResponderKey], filter: StateFilter) {
    for key in keys {
        if let Some(responders) = map.get_mut(key) {
            for &state in filter.states() {
                responders.get_mut(state).clear();
            }
            if responders.is_empty() {
                map.remove(key);
            }
        }
    }
}

impl ResponderTable {
    pub(crate) fn register(
        &self,
        targets: &[Target],
        filter: StateFilter,
        exclusive: bool,
        responder: Responder,
    ) -> Result<(), Error> {
        let keys = keys_of(targets)?;

        let mut map = self.map.write();
        if exclusive {
            clear_keys(&mut map, &keys, filter);
        }
        for &state in filter.states() {
            for key in &keys {
                map.entry(*key)
                    .or_default()
                    .get_mut(state)
                    .push(Arc::clone(&responder));
            }
        }
        Ok(())
    }

    pub(crate) fn clear(&self, targets: &[Target], filter: StateFilter) -> Result<(), Error> {
        let keys = keys_of(targets)?;
        clear_keys(&mut self.map.write(), &keys, filter);
        Ok(())
    }

    pub(crate) fn clear_all(&self) {
        self.map.write().clear();
    }

    /// Collects the responders for `action`, most specific key first and [`Target::All`] last.
    /// The table isn't locked anymore once this returns, so responders are free to register.
    pub(crate) fn lookup(&self, action: &Action) -> Vec<Responder> {
        let map = self.map.read();
        let responders = ResponderKey::lookup_order(action.button)
            .into_iter()
            .filter_map(|key| map.get(&key))
            .flat_map(|responders| responders.get(action.state).iter().cloned())
            .collect();
        responders
    }
}
