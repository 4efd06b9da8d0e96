//! Integration tests for the control loop: phase ordering, failure policy,
//! fail-safe closing and shutdown.

use std::time::Duration;

use rs_bollard::hal::{MockActuator, MockDecisionSource, MockSignal, MockSourceError, ScriptedStream};
use rs_bollard::policy::{ExponentialBackoff, NoRetry};
use rs_bollard::{
    AccessEvent, BollardController, BollardState, Config, ControlError, ControlLoop, CycleReport,
    LoopSettings, OverrideEvent, Phase, PhaseEnd, RetryPolicy,
};

fn control<P: RetryPolicy>(
    source: MockDecisionSource,
    settings: LoopSettings,
    policy: P,
) -> ControlLoop<MockDecisionSource, MockActuator, MockSignal, P> {
    let controller = BollardController::new(MockActuator::new(), MockSignal::new());
    ControlLoop::new(source, controller, settings, policy)
}

// ============================================================================
// Phase Ordering
// ============================================================================

#[tokio::test]
async fn cycle_runs_override_then_automatic() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::open(), OverrideEvent::ResumeAutomatic])
        .with_access_session([AccessEvent::Allow, AccessEvent::Deny, AccessEvent::Allow]);
    let mut control = control(source, LoopSettings::default(), NoRetry);

    let report = control.run_cycle().await.unwrap();

    assert_eq!(
        report,
        CycleReport {
            override_end: PhaseEnd::Handoff,
            automatic_end: PhaseEnd::StreamEnded,
        }
    );
    // open (override), close (handoff), open, close, open (automatic)
    assert_eq!(control.controller().signal().sent_bytes(), b"ococo".to_vec());
    assert_eq!(control.controller().phase(), Phase::Automatic);
    assert_eq!(control.source().override_opens(), 1);
    assert_eq!(control.source().access_opens(), 1);
}

#[tokio::test]
async fn override_stream_end_moves_on_to_automatic() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::open()])
        .with_access_session([AccessEvent::Allow]);
    let mut control = control(source, LoopSettings::default(), NoRetry);

    let report = control.run_cycle().await.unwrap();

    assert_eq!(report.override_end, PhaseEnd::StreamEnded);
    // still open at the start of the automatic phase, so Allow is a no-op
    assert_eq!(control.controller().signal().sent_bytes(), b"o".to_vec());
    assert_eq!(control.controller().state(), BollardState::Open);
}

// ============================================================================
// Failure Policy
// ============================================================================

#[tokio::test]
async fn no_retry_stops_on_open_failure() {
    let source = MockDecisionSource::new().with_override_open_error("unavailable");
    let mut control = control(source, LoopSettings::default(), NoRetry);

    let err = control.run().await.unwrap_err();

    assert!(matches!(
        err,
        ControlError::Open {
            phase: Phase::Override,
            ..
        }
    ));
    assert_eq!(err.transport(), &MockSourceError::Open("unavailable".into()));
    assert_eq!(control.source().access_opens(), 0);
}

#[tokio::test]
async fn receive_failure_leaves_bollard_open_by_default() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_stream(ScriptedStream::from_events([AccessEvent::Allow]).then_fail("reset"));
    let mut control = control(source, LoopSettings::default(), NoRetry);

    let err = control.run().await.unwrap_err();

    assert_eq!(err.phase(), Phase::Automatic);
    assert!(matches!(err, ControlError::Receive { .. }));
    assert_eq!(control.controller().state(), BollardState::Open);
    assert_eq!(control.cycles(), 0);
}

#[tokio::test]
async fn fail_safe_closes_on_stream_failure() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_stream(ScriptedStream::from_events([AccessEvent::Allow]).then_fail("reset"));
    let settings = LoopSettings {
        fail_safe_on_error: true,
        ..LoopSettings::default()
    };
    let mut control = control(source, settings, NoRetry);

    assert!(control.run().await.is_err());

    assert_eq!(control.controller().state(), BollardState::Closed);
    assert_eq!(control.controller().signal().sent_bytes(), b"oc".to_vec());
}

#[tokio::test(start_paused = true)]
async fn backoff_retries_from_override_phase() {
    let source = MockDecisionSource::new()
        .with_override_open_error("unavailable")
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_session([AccessEvent::Allow]);
    let policy = ExponentialBackoff::new(3, Duration::from_millis(100), Duration::from_secs(1));
    let mut control = control(source, LoopSettings::default(), policy);

    let start = tokio::time::Instant::now();
    let err = control.run().await.unwrap_err();

    // one failure, one clean cycle, then the source runs dry:
    // attempts 0..=2 are retried and attempt 3 gives up
    assert_eq!(err.transport(), &MockSourceError::Exhausted);
    assert_eq!(control.cycles(), 1);
    assert_eq!(control.source().override_opens(), 6);
    assert_eq!(control.source().access_opens(), 1);
    assert!(start.elapsed() >= Duration::from_millis(100 + 100 + 200 + 400));
    assert_eq!(control.controller().state(), BollardState::Open);
}

#[tokio::test]
async fn exhausted_source_is_an_open_error() {
    let mut control = control(MockDecisionSource::new(), LoopSettings::default(), NoRetry);

    let err = control.run().await.unwrap_err();

    assert_eq!(err.phase(), Phase::Override);
    assert_eq!(
        err.to_string(),
        "failed to open override stream: mock source has no more scripted sessions"
    );
}

// ============================================================================
// Receive Timeout
// ============================================================================

#[tokio::test(start_paused = true)]
async fn silent_access_stream_times_out_and_closes() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_stream(ScriptedStream::from_events([AccessEvent::Allow]).then_stall());
    let settings = LoopSettings {
        recv_timeout: Some(Duration::from_secs(2)),
        ..LoopSettings::default()
    };
    let mut control = control(source, settings, NoRetry);

    let report = control.run_cycle().await.unwrap();

    assert_eq!(report.automatic_end, PhaseEnd::TimedOut);
    assert_eq!(control.controller().state(), BollardState::Closed);
    assert_eq!(control.controller().signal().sent_bytes(), b"oc".to_vec());
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn shutdown_leaves_position_by_default() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_stream(ScriptedStream::from_events([AccessEvent::Allow]).then_stall());
    let mut control = control(source, LoopSettings::default(), NoRetry);

    control
        .run_until(tokio::time::sleep(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(control.controller().state(), BollardState::Open);
}

#[tokio::test(start_paused = true)]
async fn close_on_shutdown_closes() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_stream(ScriptedStream::from_events([AccessEvent::Allow]).then_stall());
    let settings = LoopSettings {
        close_on_shutdown: true,
        ..LoopSettings::default()
    };
    let mut control = control(source, settings, NoRetry);

    control
        .run_until(tokio::time::sleep(Duration::from_secs(5)))
        .await
        .unwrap();

    let controller = control.into_controller();
    assert_eq!(controller.state(), BollardState::Closed);
    assert_eq!(controller.signal().sent_bytes(), b"oc".to_vec());
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_settle_still_closes() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::ResumeAutomatic])
        .with_access_stream(ScriptedStream::from_events([AccessEvent::Allow]).then_stall());
    let settings = LoopSettings {
        close_on_shutdown: true,
        ..LoopSettings::default()
    };
    let controller = BollardController::new(
        MockActuator::new().with_settle(Duration::from_secs(1)),
        MockSignal::new(),
    );
    let mut control = ControlLoop::new(source, controller, settings, NoRetry);

    // Allow has gone out on both ports but the actuator is still settling
    control
        .run_until(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    let controller = control.into_controller();
    assert_eq!(controller.actuator().position(), Some(BollardState::Closed));
    assert_eq!(controller.actuator().moves(), &[BollardState::Open, BollardState::Closed]);
    assert_eq!(controller.signal().sent_bytes(), b"oc".to_vec());
    assert_eq!(controller.state(), BollardState::Closed);
    assert_eq!(controller.in_flight(), None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_settle_reports_in_flight() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::open()]);
    let controller = BollardController::new(
        MockActuator::new().with_settle(Duration::from_secs(1)),
        MockSignal::new(),
    );
    let mut control = ControlLoop::new(source, controller, LoopSettings::default(), NoRetry);

    control
        .run_until(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    assert_eq!(control.controller().state(), BollardState::Closed);
    assert_eq!(control.controller().in_flight(), Some(BollardState::Open));
    assert_eq!(control.controller().snapshot().in_flight, Some(BollardState::Open));
}

#[tokio::test]
async fn close_on_shutdown_also_applies_to_fatal_errors() {
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::open()])
        .with_access_open_error("unavailable");
    let settings = LoopSettings {
        close_on_shutdown: true,
        ..LoopSettings::default()
    };
    let mut control = control(source, settings, NoRetry);

    let err = control
        .run_until(std::future::pending::<()>())
        .await
        .unwrap_err();

    assert_eq!(err.phase(), Phase::Automatic);
    assert_eq!(control.controller().state(), BollardState::Closed);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test(start_paused = true)]
async fn loop_built_from_config() {
    let config = Config::from_toml_str(
        r#"
[control]
on_error = "retry"
retry_max_attempts = 1
retry_base_delay_ms = 50
fail_safe_on_error = true
"#,
    )
    .unwrap();
    let source = MockDecisionSource::new()
        .with_override_session([OverrideEvent::open()])
        .with_access_open_error("unavailable");
    let mut control = control(
        source,
        LoopSettings::from(&config.control),
        config.control.policy(),
    );

    let err = control.run().await.unwrap_err();

    // first failure retried once, second (exhausted) gives up
    assert_eq!(err.transport(), &MockSourceError::Exhausted);
    assert_eq!(control.source().override_opens(), 2);
    assert_eq!(control.controller().state(), BollardState::Closed);
}
