//! Ordering tests for the slot ring
//!
//! These tests drive a `SlotRing` over recording units and verify the exact
//! order in which requests are issued and joined.

use std::sync::Arc;
use std::time::Duration;

use ringflight::input::RandomInput;
use ringflight::{
    run_with_loader,
    Deadline,
    ExecutableUnit,
    Metrics,
    Phase,
    PipelineConfig,
    RingConfig,
    RingflightError,
    SlotRing,
    SlotState,
    StatusCode,
    WorkSlot,
};
use ringflight_test_support::recording::{ INPUT_NAME, OUTPUT_NAME };
use ringflight_test_support::{ Event, EventKind, EventLog, FaultPlan, RecordingLoader, RecordingUnit, RingChecker };

fn config(in_flight: usize) -> RingConfig {
    RingConfig::new(in_flight, INPUT_NAME).with_frame(4, 4, 3).with_seed(3)
}

fn ring(
    in_flight: usize,
    units: usize,
    faults: FaultPlan
) -> (SlotRing<RecordingUnit>, Arc<EventLog>) {
    let log = EventLog::new();
    let units = RecordingUnit::many(units, &log, faults);
    let ring = SlotRing::new(&units, &config(in_flight)).unwrap();
    (ring, log)
}

/// Compact trace: "S0" for a submit on handle 0, "W0" for a wait
fn trace(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|e| {
            match e.kind {
                EventKind::Submit => format!("S{}", e.handle),
                EventKind::Wait(_) => format!("W{}", e.handle),
            }
        })
        .collect()
}

#[test]
fn test_four_slot_trace() {
    let (mut ring, log) = ring(4, 1, FaultPlan::none());
    let report = ring.run(Deadline::Cycles(6)).unwrap();

    let expected = [
        "S0", "W0", // prime
        "S0", "S1", "S2", "S3", "W0", // window fills
        "S0", "W1",
        "S1", "W2",
        "W3", "W0", "W1", // drain
    ];
    assert_eq!(trace(&log.events()), expected);
    assert_eq!((report.submitted, report.completed), (7, 7));
    assert_eq!(report.per_slot, vec![3, 2, 1, 1]);

    let events = log.events();
    RingChecker::new(&events, 4).check_all().unwrap();
}

#[test]
fn test_single_slot_is_synchronous() {
    let (mut ring, log) = ring(1, 1, FaultPlan::none());
    let report = ring.run(Deadline::Cycles(5)).unwrap();
    assert_eq!(report.completed, 6);

    let events = log.events();
    assert!(events.chunks(2).all(|pair| pair[0].is_submit() && pair[1].is_wait()));
    assert_eq!(RingChecker::new(&events, 1).max_outstanding(), 1);
}

#[test]
fn test_slots_routed_round_robin() {
    let (mut ring, log) = ring(4, 2, FaultPlan::none());
    ring.run(Deadline::Cycles(8)).unwrap();

    for event in log.events() {
        assert_eq!(event.unit, event.handle % 2, "handle {} ran on unit {}", event.handle, event.unit);
    }
    let units: Vec<usize> = ring
        .slots()
        .iter()
        .map(|s| s.unit().id())
        .collect();
    assert_eq!(units, vec![0, 1, 0, 1]);
}

#[test]
fn test_wait_failure_halts_ring() {
    let (mut ring, log) = ring(4, 1, FaultPlan::fail_wait_at(3));
    let err = ring.run(Deadline::Cycles(50)).unwrap_err();

    assert!(
        matches!(err, RingflightError::WaitFailed { slot: 1, status: StatusCode::GeneralError }),
        "unexpected error: {err}"
    );
    assert_eq!(ring.phase(), Phase::Aborted);
    assert_eq!(ring.slot(1).unwrap().state(), SlotState::Idle);

    // nothing new is issued; the three still-outstanding slots are joined
    let events = log.events();
    let checker = RingChecker::new(&events, 4);
    let (index, failed) = checker.first_failure().unwrap();
    assert_eq!(failed.handle, 1);
    assert_eq!(trace(&events[index + 1..]), ["W2", "W3", "W0"]);
    assert_eq!(checker.submits(), 6);
    checker.check_all().unwrap();
    assert_eq!(ring.cursor().pending(), 0);
    assert!(ring.slots().iter().all(|s| s.state() != SlotState::Submitted));

    let snapshot = ring.metrics().snapshot();
    assert_eq!((snapshot.completed, snapshot.failed), (2, 1));
}

#[test]
fn test_issue_failure_reports_slot() {
    let (mut ring, log) = ring(3, 1, FaultPlan::fail_issue_at(2));
    let err = ring.run(Deadline::Cycles(10)).unwrap_err();

    assert!(matches!(err, RingflightError::Submit { slot: 0, .. }), "unexpected error: {err}");
    assert_eq!(err.slot(), Some(0));
    assert_eq!(trace(&log.events()), ["S0", "W0"]);
    assert!(ring.run(Deadline::Cycles(1)).is_err());
}

#[test]
fn test_wall_clock_run_balances() {
    let (mut ring, log) = ring(3, 2, FaultPlan::none());
    let report = ring.run(Deadline::After(Duration::from_millis(5))).unwrap();

    assert!(report.elapsed >= Duration::from_millis(5));
    assert_eq!(report.submitted, report.completed);
    assert_eq!(report.submitted, 1 + report.steady_cycles);

    let events = log.events();
    RingChecker::new(&events, 3).check_all().unwrap();
}

#[test]
fn test_deadline_before_window_fills() {
    let (mut ring, log) = ring(8, 1, FaultPlan::none());
    let report = ring.run(Deadline::Cycles(3)).unwrap();

    assert_eq!((report.submitted, report.completed), (4, 4));
    assert_eq!(trace(&log.events()), ["S0", "W0", "S0", "S1", "S2", "W0", "W1", "W2"]);
    assert_eq!(ring.cursor().pending(), 0);
}

#[test]
fn test_slot_rejects_double_submit() {
    let log = EventLog::new();
    let unit = Arc::new(RecordingUnit::new(0, log.clone()));
    let source = Box::new(RandomInput::with_seed(4, 4, 3, 0).unwrap());
    let metrics = Arc::new(Metrics::new().unwrap());
    let mut slot = WorkSlot::new(0, 0, unit, INPUT_NAME, source, metrics).unwrap();

    assert!(matches!(slot.fetch_result(OUTPUT_NAME), Err(RingflightError::NoResult { slot: 0 })));
    assert!(matches!(slot.await_completion(), Err(RingflightError::SlotState { .. })));

    slot.submit().unwrap();
    let err = slot.submit().unwrap_err();
    assert!(
        matches!(err, RingflightError::SlotState {
            slot: 0,
            expected: SlotState::Completed,
            actual: SlotState::Submitted,
        })
    );

    slot.await_completion().unwrap();
    assert_eq!(slot.fetch_result(OUTPUT_NAME).unwrap().as_slice(), &[0.0, 1.0]);
    assert_eq!(log.submits(), 1);

    slot.infer().unwrap();
    assert_eq!(slot.fetch_result(OUTPUT_NAME).unwrap().as_slice(), &[0.0, 2.0]);
    assert_eq!((slot.submissions(), slot.completions()), (2, 2));
}

#[test]
fn test_unknown_input_name() {
    let log = EventLog::new();
    let units = RecordingUnit::many(1, &log, FaultPlan::none());
    assert!(units[0].create_handle("pixels").is_err());
    assert!(SlotRing::new(&units, &RingConfig::new(2, "pixels")).is_err());
}

#[test]
fn test_run_with_loader() {
    let log = EventLog::new();
    let loader = RecordingLoader::new(log.clone());
    let config = PipelineConfig::new("model.json").with_model_instances(2).with_in_flight(3).with_workers(1);

    let report = run_with_loader(&loader, &config, Deadline::Cycles(5)).unwrap();
    assert_eq!(loader.loaded(), 2);
    assert_eq!(report.units, 2);
    assert_eq!(report.completed, 6);

    let events = log.events();
    RingChecker::new(&events, 3).check_all().unwrap();
}

#[test]
fn test_run_with_loader_propagates_load_error() {
    let log = EventLog::new();
    let loader = RecordingLoader::new(log.clone()).rejecting("bad.json");
    let config = PipelineConfig::new("bad.json").with_workers(1);

    let err = run_with_loader(&loader, &config, Deadline::Cycles(5)).unwrap_err();
    assert!(matches!(err, RingflightError::Load { .. }));
    assert_eq!(log.handles(), 0);
    assert!(log.events().is_empty());
}
