/*!
# Event-driven interaction

An [`Interaction`] polls a [`Device`] in the background and hands every button action to the
responders registered for it. Each action is dispatched on its own thread, so a slow responder
doesn't hold up the ones for the next action.

```no_run
use gridpad::{Button, Color, Interaction, InteractionConfig, Mode, StateFilter, Target};

let interaction = Interaction::new(InteractionConfig::default());
interaction.response_to([Target::grid()], StateFilter::Down, false, |interaction, action| {
    let device = interaction.device()?;
    device.change_led(action.button, Color::GREEN, Mode::Normal)?;
    Ok(())
})?;
interaction.response_to([Button::MIXER], StateFilter::Down, false, |interaction, _| {
    interaction.stop()?;
    Ok(())
})?;

// blocks until the mixer button is pressed
interaction.start(false)?;
interaction.close()?;
# Ok::<(), gridpad::Error>(())
```
*/

mod responders;
pub use responders::{GridRegion, Responder, StateFilter, Target};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::midi_io::{MidirTransport, Transport};
use crate::{Action, Button, ButtonState, Device, DeviceConfig, Error};
use responders::ResponderTable;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractionConfig {
    /// Pause between two polls of the device
    pub latency: Duration,
    /// Used when the interaction has to open a device itself. Input and output are always
    /// enabled in that case.
    pub device: DeviceConfig,
}

impl InteractionConfig {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1);

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the latency in seconds. Negative values are taken by their magnitude, NaN counts as
    /// zero and anything too large for a [`Duration`] saturates.
    pub fn latency_secs(mut self, secs: f64) -> Self {
        let secs = secs.abs();
        self.latency = if secs.is_nan() {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        };
        self
    }

    pub fn device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            latency: Self::DEFAULT_LATENCY,
            device: DeviceConfig::default(),
        }
    }
}

/// Why a responder didn't complete
#[derive(Debug)]
pub enum ResponderFailure {
    /// The responder returned an error
    Error(anyhow::Error),
    /// The responder panicked, with the panic message if there was one
    Panic(String),
}

impl std::fmt::Display for ResponderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponderFailure::Error(e) => write!(f, "responder failed: {:#}", e),
            ResponderFailure::Panic(msg) => write!(f, "responder panicked: {}", msg),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

type FailureObserver = Arc<dyn Fn(&Action, &ResponderFailure) + Send + Sync>;

fn log_failure(action: &Action, failure: &ResponderFailure) {
    log::error!("{} ({:?} {})", failure, action.state, action.button);
}

struct Poller {
    thread: Thread,
    /// `None` while a blocking [`Interaction::start`] is joining the poller itself
    handle: Option<JoinHandle<Result<(), Error>>>,
}

fn join_poller(handle: JoinHandle<Result<(), Error>>) -> Result<(), Error> {
    match handle.join() {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

struct Shared {
    config: InteractionConfig,
    transport: Box<dyn Transport + Send + Sync>,
    device: Mutex<Option<Arc<Device>>>,
    responders: ResponderTable,
    active: AtomicBool,
    closed: AtomicBool,
    poller: Mutex<Option<Poller>>,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
    observer: RwLock<FailureObserver>,
}

/// Reads button actions from a device and dispatches them to responders.
///
/// This is a cheap handle: clones refer to the same interaction. Responders get one passed in,
/// so they can stop the interaction or change the responder table from inside a callback.
///
/// The poller and dispatch threads keep the interaction alive, so call [`Interaction::stop`] or
/// [`Interaction::close`] when you're done with it.
#[derive(Clone)]
pub struct Interaction {
    shared: Arc<Shared>,
}

impl Interaction {
    /// Creates an interaction that opens a device on the system MIDI stack once it's needed.
    pub fn new(config: InteractionConfig) -> Self {
        Self::with_transport(MidirTransport::default(), config)
    }

    /// Creates an interaction that opens its device on `transport` once it's needed.
    pub fn with_transport(
        transport: impl Transport + Send + Sync + 'static,
        config: InteractionConfig,
    ) -> Self {
        Self::build(Box::new(transport), None, config)
    }

    /// Creates an interaction on an already opened device. `config.device` is ignored.
    pub fn with_device(device: Device, config: InteractionConfig) -> Self {
        Self::build(
            Box::new(MidirTransport::default()),
            Some(Arc::new(device)),
            config,
        )
    }

    fn build(
        transport: Box<dyn Transport + Send + Sync>,
        device: Option<Arc<Device>>,
        config: InteractionConfig,
    ) -> Self {
        let observer: FailureObserver = Arc::new(log_failure);
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                device: Mutex::new(device),
                responders: ResponderTable::default(),
                active: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                poller: Mutex::new(None),
                dispatchers: Mutex::new(Vec::new()),
                observer: RwLock::new(observer),
            }),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.shared.config
    }

    /// The device this interaction talks to, opening it first if necessary. Fails with
    /// [`Error::Closed`] once the interaction is closed.
    pub fn device(&self) -> Result<Arc<Device>, Error> {
        if self.closed() {
            return Err(Error::Closed);
        }
        let mut device = self.shared.device.lock();
        if let Some(device) = &*device {
            return Ok(Arc::clone(device));
        }

        let config = self.shared.config.device.clone().input(true).output(true);
        let opened = Arc::new(Device::open_with(&*self.shared.transport, &config)?);
        *device = Some(Arc::clone(&opened));
        Ok(opened)
    }

    /// Whether the poll loop is running
    pub fn active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Starts polling the device and dispatching actions.
    ///
    /// With `detached` set, this returns right away and the loop runs in the background; an error
    /// that ends it is returned by the next [`Interaction::stop`] or `start`. Otherwise this blocks until the
    /// loop ends, either by a call to `stop` (from a responder, say) or by an error, and waits for
    /// the remaining responders to finish.
    ///
    /// If a detached loop already ended because of an error that no `stop` collected, that error
    /// is returned instead and nothing is started; the next call starts afresh.
    ///
    /// Starting an interaction that's already active does nothing.
    pub fn start(&self, detached: bool) -> Result<(), Error> {
        if self.closed() {
            return Err(Error::Closed);
        }
        let device = self.device()?;
        if !device.has_input() {
            return Err(Error::NoInputAllowed);
        }

        let mut poller = self.shared.poller.lock();
        if self.active() {
            log::debug!("interaction is already active");
            return Ok(());
        }
        // a previous detached loop that ended on its own; its error is reported here once
        if let Some(Poller {
            handle: Some(handle),
            ..
        }) = poller.take()
        {
            join_poller(handle)?;
        }

        self.shared.active.store(true, Ordering::SeqCst);
        let interaction = self.clone();
        let handle = thread::spawn(move || interaction.poll(&device));
        let thread = handle.thread().clone();

        if detached {
            *poller = Some(Poller {
                thread,
                handle: Some(handle),
            });
            return Ok(());
        }

        let poller_id = thread.id();
        *poller = Some(Poller {
            thread,
            handle: None,
        });
        drop(poller);

        let result = join_poller(handle);
        {
            let mut poller = self.shared.poller.lock();
            if poller.as_ref().map(|p| p.thread.id()) == Some(poller_id) {
                *poller = None;
            }
        }
        self.join_dispatchers();
        result
    }

    /// Ends the poll loop and waits for it, as well as for every responder still running (except
    /// the calling one, so responders may call this). The device is reset once the loop is over.
    ///
    /// Returns the error that ended a detached loop, if any. Stopping an inactive interaction
    /// does nothing.
    pub fn stop(&self) -> Result<(), Error> {
        self.shared.active.store(false, Ordering::SeqCst);

        let mut result = Ok(());
        let poller = self.shared.poller.lock().take();
        if let Some(poller) = poller {
            poller.thread.unpark();
            if let Some(handle) = poller.handle {
                result = join_poller(handle);
            }
        }

        self.join_dispatchers();
        result
    }

    /// Stops the interaction and closes its device. A closed interaction can't be started again.
    pub fn close(&self) -> Result<(), Error> {
        let result = self.stop();
        self.shared.closed.store(true, Ordering::SeqCst);
        if let Some(device) = &*self.shared.device.lock() {
            device.close();
        }
        log::debug!("interaction closed");
        result
    }

    /// Registers `responder` for every button in `targets`, for the states in `filter`. With
    /// `exclusive` set, responders registered earlier for the same buttons and states are removed
    /// first.
    ///
    /// ```no_run
    /// # use gridpad::{GridRegion, Interaction, InteractionConfig, StateFilter, Target};
    /// # let interaction = Interaction::new(InteractionConfig::default());
    /// let left_half = GridRegion::default().columns(0..4);
    /// interaction.response_to([Target::from(left_half)], StateFilter::Both, false, |_, action| {
    ///     println!("{:?} on the left: {}", action.state, action.button);
    ///     Ok(())
    /// })?;
    /// # Ok::<(), gridpad::Error>(())
    /// ```
    pub fn response_to<T, F>(
        &self,
        targets: T,
        filter: StateFilter,
        exclusive: bool,
        responder: F,
    ) -> Result<(), Error>
    where
        T: IntoIterator,
        T::Item: Into<Target>,
        F: Fn(&Interaction, &Action) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.closed() {
            return Err(Error::Closed);
        }
        let targets: Vec<Target> = targets.into_iter().map(Into::into).collect();
        self.shared
            .responders
            .register(&targets, filter, exclusive, Arc::new(responder))
    }

    /// Removes the responders for `targets` and the states in `filter`. Only responders
    /// registered for exactly these targets are affected: clearing [`Target::grid`] keeps the
    /// responders of single cells, clearing [`Target::All`] keeps everything else.
    pub fn clear_responses<T>(&self, targets: T, filter: StateFilter) -> Result<(), Error>
    where
        T: IntoIterator,
        T::Item: Into<Target>,
    {
        if self.closed() {
            return Err(Error::Closed);
        }
        let targets: Vec<Target> = targets.into_iter().map(Into::into).collect();
        self.shared.responders.clear(&targets, filter)
    }

    pub fn clear_all_responses(&self) -> Result<(), Error> {
        if self.closed() {
            return Err(Error::Closed);
        }
        self.shared.responders.clear_all();
        Ok(())
    }

    /// Runs the responders for a synthetic action, synchronously on the calling thread. Nothing
    /// runs once the interaction is closed.
    pub fn respond_to(&self, button: impl Into<Button>, state: ButtonState) -> Result<(), Error> {
        if self.closed() {
            return Err(Error::Closed);
        }
        self.dispatch(&Action::new(button.into(), state));
        Ok(())
    }

    /// Runs every responder registered for `action`, in order. A failing responder doesn't keep
    /// the others from running; its failure goes to the observer set by
    /// [`Interaction::on_responder_failure`].
    pub fn dispatch(&self, action: &Action) {
        for responder in self.shared.responders.lookup(action) {
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| responder(self, action))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => ResponderFailure::Error(e),
                Err(payload) => ResponderFailure::Panic(panic_message(payload)),
            };
            let observer = Arc::clone(&*self.shared.observer.read());
            observer(action, &failure);
        }
    }

    /// Replaces the handler for failed responders. By default, failures are logged at error
    /// level.
    pub fn on_responder_failure(
        &self,
        observer: impl Fn(&Action, &ResponderFailure) + Send + Sync + 'static,
    ) {
        *self.shared.observer.write() = Arc::new(observer);
    }

    fn poll(&self, device: &Device) -> Result<(), Error> {
        log::info!("interaction started");
        let result = self.poll_until_stopped(device);
        self.shared.active.store(false, Ordering::SeqCst);

        if let Err(e) = device.reset() {
            log::warn!("couldn't reset device after interaction: {}", e);
        }
        match &result {
            Ok(()) => log::info!("interaction stopped"),
            Err(e) => log::error!("interaction aborted: {}", e),
        }
        result
    }

    fn poll_until_stopped(&self, device: &Device) -> Result<(), Error> {
        let latency = self.shared.config.latency;
        while self.active() {
            let actions = device.read_pending_actions()?;
            if !actions.is_empty() {
                log::debug!("dispatching {} actions", actions.len());
            }
            for action in actions {
                self.spawn_dispatch(action);
            }

            if !latency.is_zero() {
                thread::park_timeout(latency);
            }
        }
        Ok(())
    }

    fn spawn_dispatch(&self, action: Action) {
        let interaction = self.clone();
        let handle = thread::spawn(move || interaction.dispatch(&action));

        let mut dispatchers = self.shared.dispatchers.lock();
        dispatchers.retain(|handle| !handle.is_finished());
        dispatchers.push(handle);
    }

    fn join_dispatchers(&self) {
        let current = thread::current().id();
        let handles = std::mem::take(&mut *self.shared.dispatchers.lock());
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            // responder panics are caught in dispatch, only a panicking observer gets here
            if handle.join().is_err() {
                log::warn!("a dispatch thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("config", &self.shared.config)
            .field("active", &self.active())
            .field("closed", &self.closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_secs_takes_magnitude() {
        let config = InteractionConfig::default().latency_secs(-0.25);
        assert_eq!(config.latency, Duration::from_millis(250));
        assert_eq!(InteractionConfig::default().latency, Duration::from_millis(1));
    }

    #[test]
    fn latency_secs_never_panics() {
        let config = InteractionConfig::default();
        assert_eq!(config.clone().latency_secs(f64::NAN).latency, Duration::ZERO);
        assert_eq!(config.clone().latency_secs(f64::INFINITY).latency, Duration::MAX);
        assert_eq!(config.clone().latency_secs(f64::NEG_INFINITY).latency, Duration::MAX);
        assert_eq!(config.latency_secs(1e300).latency, Duration::MAX);
    }

    #[test]
    fn failures_display_their_cause() {
        let failure = ResponderFailure::Error(anyhow::anyhow!("boom"));
        assert_eq!(failure.to_string(), "responder failed: boom");
        let failure = ResponderFailure::Panic("oops".to_owned());
        assert_eq!(failure.to_string(), "responder panicked: oops");
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload), "static");
        let payload = panic::catch_unwind(|| panic!("formatted {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload), "formatted 1");
    }
}
