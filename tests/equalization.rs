// Integration tests for equalization-time measurement through the controller.

use std::sync::Arc;

use tokio::sync::mpsc;

use fermasense_rs::clock::ManualClock;
use fermasense_rs::control::{ActuatorState, ControlParams};
use fermasense_rs::controller::Controller;
use fermasense_rs::display::CapturingDisplay;
use fermasense_rs::simulator::{
    SharedVessel, SimulatedOutputs, SimulatedProbe, VesselModel, shared_vessel,
};

type TestController = Controller<SimulatedProbe, SimulatedOutputs, CapturingDisplay>;

struct Harness {
    controller: TestController,
    lines: mpsc::UnboundedReceiver<String>,
    clock: ManualClock,
    vessel: SharedVessel,
}

async fn harness(start_temp: f64, params: ControlParams) -> Harness {
    let clock = ManualClock::new();
    let vessel = shared_vessel(VesselModel::new(start_temp, 18.0));
    let probe = SimulatedProbe::new(vessel.clone(), Arc::new(clock.clone()), 0, 0.0);
    let outputs = SimulatedOutputs::new(vessel.clone());
    let (line_tx, lines) = mpsc::unbounded_channel();

    let mut controller = Controller::new(
        params,
        probe,
        outputs,
        CapturingDisplay::new(),
        Arc::new(clock.clone()),
        line_tx,
    );
    controller.initialize().await.unwrap();

    Harness {
        controller,
        lines,
        clock,
        vessel,
    }
}

fn drain(lines: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(line) = lines.try_recv() {
        out.push(line);
    }
    out
}

fn tick_at(h: &mut Harness, temp: f64, advance_ms: u64) {
    h.vessel.lock().unwrap().temperature_c = temp;
    h.clock.advance(advance_ms);
    h.controller.tick().unwrap();
}

#[tokio::test]
async fn equalization_measures_settle_time_exactly_once() {
    // vessel sits at 30C, in band for the boot range
    let mut h = harness(30.0, ControlParams::new(29.0, 31.0, 0.25, 5_000)).await;

    h.clock.advance(10_000);
    h.controller.handle_line("SET_TEMP_RANGE=24,26").unwrap();
    assert!(h.controller.equalization_active());
    assert_eq!(h.controller.state(), ActuatorState::Cooling);
    drain(&mut h.lines);

    // vessel cools over the next ticks; dead zone keeps the cooler running
    tick_at(&mut h, 28.0, 10_000);
    tick_at(&mut h, 26.2, 10_000);
    assert_eq!(h.controller.state(), ActuatorState::Cooling);
    assert!(h.controller.equalization_active());
    assert!(!drain(&mut h.lines).iter().any(|l| l.starts_with("EQUALIZED")));

    // back inside the band and idle: episode completes
    tick_at(&mut h, 25.8, 10_000);
    assert_eq!(h.controller.state(), ActuatorState::Idle);
    assert!(!h.controller.equalization_active());

    let lines = drain(&mut h.lines);
    let equalized: Vec<&String> = lines.iter().filter(|l| l.starts_with("EQUALIZED")).collect();
    assert_eq!(equalized.len(), 1);
    // range set at t=10s, settled at t=40s
    assert_eq!(equalized[0], "EQUALIZED,24.00,26.00,30.00");

    // no further records from later ticks
    tick_at(&mut h, 25.5, 10_000);
    assert!(!drain(&mut h.lines).iter().any(|l| l.starts_with("EQUALIZED")));
}

#[tokio::test]
async fn entering_manual_cancels_tracking_silently() {
    let mut h = harness(30.0, ControlParams::new(29.0, 31.0, 0.25, 5_000)).await;

    h.controller.handle_line("SET_TEMP_RANGE=24,26").unwrap();
    assert!(h.controller.equalization_active());

    h.controller.handle_line("MODE_MANUAL").unwrap();
    assert!(!h.controller.equalization_active());
    drain(&mut h.lines);

    // even once the vessel settles, no record is emitted for that episode
    h.controller.handle_line("MANUAL_IDLE").unwrap();
    tick_at(&mut h, 25.0, 5_000);
    tick_at(&mut h, 25.0, 5_000);
    assert!(!drain(&mut h.lines).iter().any(|l| l.starts_with("EQUALIZED")));
}

#[tokio::test]
async fn resuming_auto_out_of_band_restarts_timing() {
    let mut h = harness(25.0, ControlParams::new(24.0, 26.0, 0.25, 5_000)).await;

    h.controller.handle_line("MODE_MANUAL").unwrap();
    // operator lets the vessel drift way off target
    tick_at(&mut h, 30.0, 5_000);
    drain(&mut h.lines);

    h.clock.advance(5_000);
    h.controller.handle_line("MODE_AUTO").unwrap();
    assert!(h.controller.equalization_active());
    assert_eq!(h.controller.state(), ActuatorState::Cooling);

    tick_at(&mut h, 25.5, 20_000);
    let lines = drain(&mut h.lines);
    let equalized: Vec<&String> = lines.iter().filter(|l| l.starts_with("EQUALIZED")).collect();
    assert_eq!(equalized.len(), 1);
    assert_eq!(equalized[0], "EQUALIZED,24.00,26.00,20.00");
}

#[tokio::test]
async fn resuming_auto_in_band_does_not_track() {
    let mut h = harness(25.0, ControlParams::new(24.0, 26.0, 0.25, 5_000)).await;

    h.controller.handle_line("MODE_MANUAL").unwrap();
    h.controller.handle_line("MODE_AUTO").unwrap();
    assert!(!h.controller.equalization_active());
}

#[tokio::test]
async fn status_reports_tracking_flag_and_start_time() {
    let mut h = harness(30.0, ControlParams::new(29.0, 31.0, 0.25, 5_000)).await;

    h.clock.advance(10_000);
    h.controller.handle_line("SET_TEMP_RANGE=24,26").unwrap();
    drain(&mut h.lines);

    h.controller.handle_line("GET_STATUS").unwrap();
    let lines = drain(&mut h.lines);
    let status = lines
        .iter()
        .find(|l| l.starts_with("STATUS,"))
        .expect("no STATUS line");
    assert!(status.contains("TIMING_EQ,10.00"), "unexpected status: {status}");
}

#[tokio::test]
async fn range_change_in_manual_mode_does_not_track() {
    let mut h = harness(30.0, ControlParams::new(29.0, 31.0, 0.25, 5_000)).await;

    h.controller.handle_line("MODE_MANUAL").unwrap();
    h.controller.handle_line("SET_TEMP_RANGE=24,26").unwrap();
    assert!(!h.controller.equalization_active());
    assert_eq!(h.controller.params().target_min, 24.0);
}
