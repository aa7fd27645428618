use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gridpad::mock::MockTransport;
use gridpad::{
    Button, ButtonState, ControlButton, Device, DeviceConfig, Error, GridRegion, Interaction,
    InteractionConfig, RawMessage, ResponderFailure, SceneButton, StateFilter, Target,
};

const RESET: RawMessage = RawMessage::new(0xB0, 0x00, 0x00);

fn interaction() -> (MockTransport, Interaction) {
    let _ = env_logger::builder().is_test(true).try_init();
    let transport = MockTransport::new();
    let interaction = Interaction::with_transport(transport.clone(), InteractionConfig::default());
    (transport, interaction)
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// A responder that appends `name` to `log`
fn record(
    log: &Arc<Mutex<Vec<&'static str>>>,
    name: &'static str,
) -> impl Fn(&Interaction, &gridpad::Action) -> anyhow::Result<()> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_, _| {
        log.lock().unwrap().push(name);
        Ok(())
    }
}

#[test]
fn responders_are_called_most_specific_first() {
    let (_, interaction) = interaction();
    let log = Arc::new(Mutex::new(Vec::new()));

    interaction.response_to([Target::All], StateFilter::Both, false, record(&log, "all")).unwrap();
    interaction.response_to([Target::grid()], StateFilter::Both, false, record(&log, "grid")).unwrap();
    interaction.response_to([Target::row(1)], StateFilter::Both, false, record(&log, "row")).unwrap();
    interaction.response_to([Target::cell(0, 1)], StateFilter::Both, false, record(&log, "cell")).unwrap();
    interaction
        .response_to([Target::Control(ControlButton::Up)], StateFilter::Both, false, record(&log, "up"))
        .unwrap();

    interaction.respond_to(Button::grid(0, 1).unwrap(), ButtonState::Down).unwrap();
    assert_eq!(*log.lock().unwrap(), ["cell", "row", "grid", "all"]);

    log.lock().unwrap().clear();
    interaction.respond_to(Button::UP, ButtonState::Up).unwrap();
    assert_eq!(*log.lock().unwrap(), ["up", "all"]);

    log.lock().unwrap().clear();
    interaction.respond_to(SceneButton::Scene3, ButtonState::Down).unwrap();
    assert_eq!(*log.lock().unwrap(), ["all"]);
}

#[test]
fn state_filter_is_honored() {
    let (_, interaction) = interaction();
    let log = Arc::new(Mutex::new(Vec::new()));
    interaction
        .response_to([Button::MIXER], StateFilter::Down, false, record(&log, "down"))
        .unwrap();
    interaction
        .response_to([Button::MIXER], StateFilter::Up, false, record(&log, "up"))
        .unwrap();

    interaction.respond_to(Button::MIXER, ButtonState::Up).unwrap();
    interaction.respond_to(Button::MIXER, ButtonState::Down).unwrap();
    assert_eq!(*log.lock().unwrap(), ["up", "down"]);
}

#[test]
fn targets_can_be_combined() {
    let (_, interaction) = interaction();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    interaction
        .response_to(
            [
                Target::from(GridRegion::default().columns(6..8)),
                Target::Scene(SceneButton::Scene1),
            ],
            StateFilter::Down,
            false,
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();

    interaction.respond_to(Button::grid(6, 0).unwrap(), ButtonState::Down).unwrap();
    interaction.respond_to(Button::grid(7, 5).unwrap(), ButtonState::Down).unwrap();
    interaction.respond_to(Button::grid(5, 5).unwrap(), ButtonState::Down).unwrap();
    interaction.respond_to(SceneButton::Scene1, ButtonState::Down).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn invalid_regions_are_rejected() {
    let (_, interaction) = interaction();
    let result = interaction.response_to([Target::row(8)], StateFilter::Both, false, |_, _| Ok(()));
    assert!(matches!(result, Err(Error::InvalidCoordinates { y: 8, .. })));
}

#[test]
fn exclusive_registration_replaces_earlier_responders() {
    let (_, interaction) = interaction();
    let log = Arc::new(Mutex::new(Vec::new()));
    interaction.response_to([Button::UP], StateFilter::Both, false, record(&log, "first")).unwrap();
    interaction.response_to([Button::UP], StateFilter::Both, false, record(&log, "second")).unwrap();
    interaction.response_to([Button::UP], StateFilter::Down, true, record(&log, "only")).unwrap();

    interaction.respond_to(Button::UP, ButtonState::Down).unwrap();
    interaction.respond_to(Button::UP, ButtonState::Up).unwrap();
    assert_eq!(*log.lock().unwrap(), ["only", "first", "second"]);
}

#[test]
fn clearing_responses() {
    let (_, interaction) = interaction();
    let log = Arc::new(Mutex::new(Vec::new()));
    interaction.response_to([Button::DOWN], StateFilter::Both, false, record(&log, "down")).unwrap();
    interaction.response_to([Target::All], StateFilter::Both, false, record(&log, "all")).unwrap();

    interaction.clear_responses([Button::DOWN], StateFilter::Down).unwrap();
    interaction.respond_to(Button::DOWN, ButtonState::Down).unwrap();
    interaction.respond_to(Button::DOWN, ButtonState::Up).unwrap();
    assert_eq!(*log.lock().unwrap(), ["all", "down", "all"]);

    log.lock().unwrap().clear();
    interaction.clear_all_responses().unwrap();
    interaction.respond_to(Button::DOWN, ButtonState::Up).unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn device_is_opened_lazily_with_both_sides() {
    let transport = MockTransport::new();
    let config =
        InteractionConfig::default().device(DeviceConfig::default().input(false).output(false));
    let interaction = Interaction::with_transport(transport.clone(), config);
    assert_eq!(transport.open_outputs(), 0);

    let device = interaction.device().unwrap();
    assert!(device.has_input() && device.has_output());
    assert!(Arc::ptr_eq(&device, &interaction.device().unwrap()));
    assert_eq!((transport.open_inputs(), transport.open_outputs()), (1, 1));
}

#[test]
fn detached_interaction_dispatches_until_stopped() {
    let (transport, interaction) = interaction();
    let pressed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&pressed);
    interaction
        .response_to([Button::MIXER], StateFilter::Down, false, move |_, _| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    interaction.start(true).unwrap();
    assert!(interaction.active());
    // starting again is a no-op
    interaction.start(true).unwrap();

    transport.take_written();
    transport.push_action(Button::MIXER, ButtonState::Down);
    assert!(wait_until(|| pressed.load(Ordering::SeqCst)));

    interaction.stop().unwrap();
    assert!(!interaction.active());
    assert_eq!(transport.written().last(), Some(&RESET));
    // stopping again does nothing
    interaction.stop().unwrap();
}

#[test]
fn stop_from_a_responder_ends_a_blocking_start() {
    let (transport, interaction) = interaction();
    interaction
        .response_to([Button::MIXER], StateFilter::Down, false, |interaction, _| {
            interaction.stop()?;
            Ok(())
        })
        .unwrap();

    transport.push_action(Button::grid(2, 2).unwrap(), ButtonState::Down);
    transport.push_action(Button::MIXER, ButtonState::Down);
    interaction.start(false).unwrap();

    assert!(!interaction.active());
    assert_eq!(transport.written().last(), Some(&RESET));
}

#[test]
fn stop_waits_for_running_responders() {
    let (transport, interaction) = interaction();
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (started_flag, finished_flag) = (Arc::clone(&started), Arc::clone(&finished));
    interaction
        .response_to([Target::All], StateFilter::Down, false, move |_, _| {
            started_flag.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            finished_flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    interaction.start(true).unwrap();
    transport.push_action(Button::RIGHT, ButtonState::Down);
    assert!(wait_until(|| started.load(Ordering::SeqCst)));

    interaction.stop().unwrap();
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn read_failure_ends_a_blocking_start() {
    let (transport, interaction) = interaction();
    interaction.device().unwrap();
    transport.take_written();
    transport.fail_reads(true);

    assert!(matches!(interaction.start(false), Err(Error::Communication(_))));
    assert!(!interaction.active());
    // the device is still reset on the way out
    assert_eq!(transport.written(), [RESET]);
}

#[test]
fn read_failure_of_a_detached_loop_is_returned_by_stop() {
    let (transport, interaction) = interaction();
    interaction.start(true).unwrap();
    transport.fail_reads(true);

    assert!(wait_until(|| !interaction.active()));
    assert!(matches!(interaction.stop(), Err(Error::Communication(_))));

    // the interaction can be started again once the transport recovers
    transport.fail_reads(false);
    interaction.start(true).unwrap();
    interaction.stop().unwrap();
}

#[test]
fn read_failure_of_a_detached_loop_is_returned_by_the_next_start() {
    let (transport, interaction) = interaction();
    interaction.start(true).unwrap();
    transport.fail_reads(true);
    assert!(wait_until(|| !interaction.active()));

    transport.fail_reads(false);
    assert!(matches!(interaction.start(true), Err(Error::Communication(_))));
    assert!(!interaction.active());

    // reported once, the next start goes ahead
    interaction.start(true).unwrap();
    assert!(interaction.active());
    interaction.stop().unwrap();
}

#[test]
fn device_without_input_cannot_start() {
    let transport = MockTransport::new();
    let device = Device::open_with(&transport, &DeviceConfig::default().input(false)).unwrap();
    let interaction = Interaction::with_device(device, InteractionConfig::default());

    assert!(matches!(interaction.start(true), Err(Error::NoInputAllowed)));
    assert!(!interaction.active());
}

#[test]
fn closing_closes_the_device() {
    let (transport, interaction) = interaction();
    interaction.start(true).unwrap();
    interaction.close().unwrap();

    assert!(interaction.closed());
    assert!(!interaction.active());
    assert_eq!((transport.open_inputs(), transport.open_outputs()), (0, 0));
    assert!(matches!(interaction.start(true), Err(Error::Closed)));
}

#[test]
fn closed_interaction_refuses_everything() {
    let (transport, interaction) = interaction();
    let log = Arc::new(Mutex::new(Vec::new()));
    interaction
        .response_to([Button::MIXER], StateFilter::Both, false, record(&log, "mixer"))
        .unwrap();
    interaction.device().unwrap();
    interaction.close().unwrap();

    assert!(matches!(interaction.device(), Err(Error::Closed)));
    assert!(matches!(
        interaction.response_to([Button::UP], StateFilter::Down, false, record(&log, "up")),
        Err(Error::Closed)
    ));
    assert!(matches!(
        interaction.clear_responses([Button::MIXER], StateFilter::Both),
        Err(Error::Closed)
    ));
    assert!(matches!(interaction.clear_all_responses(), Err(Error::Closed)));
    assert!(matches!(
        interaction.respond_to(Button::MIXER, ButtonState::Down),
        Err(Error::Closed)
    ));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!((transport.open_inputs(), transport.open_outputs()), (0, 0));
}

#[test]
fn failing_responders_are_reported_and_isolated() {
    let (_, interaction) = interaction();
    let failures = Arc::new(Mutex::new(Vec::new()));
    let reported = Arc::clone(&failures);
    interaction.on_responder_failure(move |action, failure| {
        let kind = match failure {
            ResponderFailure::Error(_) => "error",
            ResponderFailure::Panic(_) => "panic",
        };
        reported.lock().unwrap().push((action.button, kind));
    });

    let log = Arc::new(Mutex::new(Vec::new()));
    interaction
        .response_to([Button::USER_1], StateFilter::Down, false, |_, _| {
            anyhow::bail!("no luck")
        })
        .unwrap();
    interaction
        .response_to([Button::USER_1], StateFilter::Down, false, |_, _| panic!("oh no"))
        .unwrap();
    interaction
        .response_to([Button::USER_1], StateFilter::Down, false, record(&log, "survivor"))
        .unwrap();

    interaction.respond_to(Button::USER_1, ButtonState::Down).unwrap();
    assert_eq!(*log.lock().unwrap(), ["survivor"]);
    assert_eq!(
        *failures.lock().unwrap(),
        [(Button::USER_1, "error"), (Button::USER_1, "panic")]
    );
}

#[test]
fn responders_may_register_responders() {
    let (_, interaction) = interaction();
    let log = Arc::new(Mutex::new(Vec::new()));
    let inner_log = Arc::clone(&log);
    interaction
        .response_to([Button::LEFT], StateFilter::Down, true, move |interaction, _| {
            interaction.response_to(
                [Button::LEFT],
                StateFilter::Down,
                true,
                record(&inner_log, "replaced"),
            )?;
            Ok(())
        })
        .unwrap();

    interaction.respond_to(Button::LEFT, ButtonState::Down).unwrap();
    interaction.respond_to(Button::LEFT, ButtonState::Down).unwrap();
    assert_eq!(*log.lock().unwrap(), ["replaced"]);
}
