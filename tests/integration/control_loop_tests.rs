//! Integration tests for the sample → policy → actuator → display → telemetry
//! pipeline, run against the simulated board with a paused clock.

use std::time::Duration;

use tokio::time::{Instant, advance};

use ventguard::app::events::AppEvent;
use ventguard::app::ports::Edge;
use ventguard::control::actuator::{Angle, Source};
use ventguard::control::cycle::Actuation;
use ventguard::control::policy::VentReason;
use ventguard::display::DisplayMode;

use crate::mock_hw::{Rig, rig};

const SEC: Duration = Duration::from_secs(1);

async fn started() -> Rig {
    let mut r = rig();
    let cancel = r.cancel.clone();
    r.control.startup(&cancel).await;
    r
}

#[tokio::test(start_paused = true)]
async fn startup_homes_servo_and_arms_gas_events() {
    let r = started().await;
    assert_eq!(r.board.servo_angle(), Some(Angle::CENTER));
    assert!(!r.board.servo_pulsing(), "pulse stopped after settle");
    assert_eq!(r.board.gas_subscription(), Some(Edge::Both));
    assert_eq!(
        r.sink.events().first(),
        Some(&AppEvent::Started {
            angle: Angle::CENTER
        })
    );
}

#[tokio::test(start_paused = true)]
async fn startup_shows_splash_first() {
    let mut r = rig();
    let cancel = r.cancel.clone();
    r.control.startup(&cancel).await;
    assert_eq!(r.board.display_lines()[0].trim_end(), "Smart Air System");
}

#[tokio::test(start_paused = true)]
async fn high_temperature_opens_vent() {
    let mut r = started().await;
    r.board.set_temperature_humidity(30.0, 40.0);
    r.board.set_motion(true);

    let report = r.control.tick(Instant::now()).await;
    assert_eq!(
        report.actuation,
        Actuation::Moved {
            from: Angle::CENTER,
            to: Angle::MAX
        }
    );
    assert!(matches!(
        report.decision.map(|d| d.reason),
        Some(VentReason::HighTemperature(_))
    ));
    assert_eq!(r.board.servo_angle(), Some(Angle::MAX));

    let state = r.actuator.state();
    assert_eq!(state.source, Source::Policy);
    assert!(state.reason.starts_with("high temp"));
    assert!(r.sink.events().iter().any(|e| matches!(
        e,
        AppEvent::VentChanged {
            to: Angle::MAX,
            source: Source::Policy,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn policy_moves_at_most_once_per_window() {
    let mut r = started().await;
    r.board.set_temperature_humidity(30.0, 40.0);
    r.board.set_motion(true);
    let first = r.control.tick(Instant::now()).await;
    assert!(matches!(first.actuation, Actuation::Moved { .. }));

    r.board.set_temperature_humidity(15.0, 40.0);
    for _ in 0..9 {
        advance(SEC).await;
        let report = r.control.tick(Instant::now()).await;
        assert_eq!(report.actuation, Actuation::RateLimited);
    }
    assert_eq!(r.board.servo_angle(), Some(Angle::MAX));

    advance(SEC).await;
    let report = r.control.tick(Instant::now()).await;
    assert_eq!(
        report.actuation,
        Actuation::Moved {
            from: Angle::MAX,
            to: Angle::MIN
        }
    );
}

#[tokio::test(start_paused = true)]
async fn unchanged_decision_does_not_touch_servo() {
    let mut r = started().await;
    r.board.set_motion(true);
    let writes_before = r.board.servo_writes().len();
    let report = r.control.tick(Instant::now()).await;
    assert_eq!(report.actuation, Actuation::Unchanged);
    assert_eq!(r.board.servo_writes().len(), writes_before);
}

#[tokio::test(start_paused = true)]
async fn invalid_reads_skip_actuation_then_degrade() {
    let mut r = started().await;
    r.clock.set_second(0);
    r.control.tick(Instant::now()).await;
    let normal = r.board.display_lines();

    r.board.set_climate(None);
    for _ in 0..5 {
        advance(SEC).await;
        let report = r.control.tick(Instant::now()).await;
        assert_eq!(report.actuation, Actuation::SkippedInvalid);
        assert!(!report.degraded);
        assert!(!report.telemetry_sent);
    }
    assert_eq!(r.board.display_lines(), normal, "display left alone until degraded");

    advance(SEC).await;
    let report = r.control.tick(Instant::now()).await;
    assert!(report.degraded);
    assert_eq!(r.board.display_lines()[0].trim_end(), "Sensor Error!");
    assert_eq!(r.board.display_lines()[1].trim_end(), "Check Connection");
    assert!(r.sink.events().contains(&AppEvent::SensorDegraded {
        consecutive_failures: 6
    }));
    assert_eq!(r.board.servo_angle(), Some(Angle::CENTER));

    r.board.set_temperature_humidity(22.0, 45.0);
    advance(SEC).await;
    let report = r.control.tick(Instant::now()).await;
    assert!(!report.degraded);
    assert!(r.sink.events().contains(&AppEvent::SensorRecovered));
}

#[tokio::test(start_paused = true)]
async fn telemetry_is_sent_every_five_seconds() {
    let mut r = started().await;
    let mut sent = 0;
    for _ in 0..10 {
        if r.control.tick(Instant::now()).await.telemetry_sent {
            sent += 1;
        }
        advance(SEC).await;
    }
    assert_eq!(sent, 2);

    tokio::task::yield_now().await;
    let published = r.telemetry.sent.lock().unwrap();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].0, "smart-vent");
    assert_eq!(published[0].1.vent_angle, Angle::CENTER);
}

#[tokio::test(start_paused = true)]
async fn gas_event_raises_alarm_and_overrides_cold_close() {
    let mut r = started().await;
    r.board.set_temperature_humidity(15.0, 40.0);
    r.board.set_motion(true);
    let report = r.control.tick(Instant::now()).await;
    assert_eq!(r.board.servo_angle(), Some(Angle::MIN), "{report:?}");

    r.board.set_gas(true);
    assert!(r.board.alarm_on(), "alarm driven from the edge callback");
    assert!(r.gas.current_state());

    advance(Duration::from_secs(10)).await;
    let report = r.control.tick(Instant::now()).await;
    assert_eq!(report.decision.map(|d| d.reason), Some(VentReason::Gas));
    assert_eq!(r.board.servo_angle(), Some(Angle::MAX));
    assert!(report.snapshot.gas);
}

#[tokio::test(start_paused = true)]
async fn display_follows_wall_clock() {
    let mut r = started().await;
    r.board.set_motion(true);

    r.clock.set_second(7);
    let report = r.control.tick(Instant::now()).await;
    assert_eq!(report.display, Some(DisplayMode::Motion));
    assert_eq!(r.board.display_lines()[1].trim_end(), "Status: ACTIVE");

    r.clock.set_second(12);
    advance(SEC).await;
    r.control.tick(Instant::now()).await;
    assert_eq!(r.board.display_lines()[0].trim_end(), "Vent: 50%");

    r.clock.set_second(17);
    advance(SEC).await;
    r.control.tick(Instant::now()).await;
    assert_eq!(r.board.display_lines()[1].trim_end(), "Status: Normal");
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_performs_shutdown_sequence() {
    let mut r = started().await;
    r.board.set_gas(true);
    assert!(r.board.alarm_on());

    r.cancel.cancel();
    let cancel = r.cancel.clone();
    r.control.run(cancel).await;

    let lines = r.board.display_lines();
    assert_eq!(lines[0].trim_end(), "System Shutdown");
    assert_eq!(lines[1].trim_end(), "Goodbye!");
    assert!(r.board.servo_released());
    assert!(!r.board.alarm_on());
    assert_eq!(r.board.gas_subscription(), None);
    assert_eq!(r.sink.events().last(), Some(&AppEvent::Shutdown));

    // A second shutdown is a no-op.
    r.control.shutdown().await;
    assert_eq!(
        r.sink
            .events()
            .iter()
            .filter(|e| **e == AppEvent::Shutdown)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn servo_fault_keeps_state_and_retries_next_tick() {
    let mut r = started().await;
    r.board.set_temperature_humidity(30.0, 40.0);
    r.board.set_motion(true);
    r.board.set_servo_fault(true);
    let before = r.actuator.state();

    let report = r.control.tick(Instant::now()).await;
    assert!(matches!(report.actuation, Actuation::Failed(_)), "{report:?}");
    assert_eq!(r.actuator.state(), before);
    assert_eq!(r.board.servo_angle(), Some(Angle::CENTER));
    assert!(r.sink.events().iter().any(|e| matches!(
        e,
        AppEvent::VentChangeFailed { to: Angle::MAX, .. }
    )));

    // A failed move does not consume the policy window.
    r.board.set_servo_fault(false);
    advance(SEC).await;
    let report = r.control.tick(Instant::now()).await;
    assert_eq!(
        report.actuation,
        Actuation::Moved {
            from: Angle::CENTER,
            to: Angle::MAX
        }
    );
    assert_eq!(r.board.servo_angle(), Some(Angle::MAX));
}

#[tokio::test(start_paused = true)]
async fn motion_fault_holds_last_level_without_skipping_tick() {
    let mut r = started().await;
    r.board.set_motion(true);
    let report = r.control.tick(Instant::now()).await;
    assert!(report.snapshot.motion);

    r.board.set_motion(false);
    r.board.set_motion_fault(true);
    advance(SEC).await;
    let report = r.control.tick(Instant::now()).await;
    assert!(report.snapshot.valid);
    assert!(report.snapshot.motion, "faulted PIR keeps the previous level");
    assert_ne!(report.actuation, Actuation::SkippedInvalid);

    r.board.set_motion_fault(false);
    advance(SEC).await;
    let report = r.control.tick(Instant::now()).await;
    assert!(!report.snapshot.motion);
}
