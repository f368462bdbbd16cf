//! Motion profile executor tests: trajectory shape, timing and exclusivity

use parking_lot::Mutex;
use realtime_servo_monitor::{
    ActuatorPort, CommandError, DeviceError, MotionCommand, MotionProfileExecutor, StopSignal, SweepConfig,
    SweepError, TimingMetrics,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Actuator that records every accepted angle.
#[derive(Clone)]
struct RecordingActuator {
    commands: Arc<Mutex<Vec<f64>>>,
    // Refuse the next write of exactly this angle, once.
    reject_once: Arc<Mutex<Option<f64>>>,
    limits: (f64, f64),
}

impl RecordingActuator {
    fn new() -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            reject_once: Arc::new(Mutex::new(None)),
            limits: (0.0, 180.0),
        }
    }

    fn reject_once_at(&self, angle: f64) {
        *self.reject_once.lock() = Some(angle);
    }

    fn commands(&self) -> Vec<f64> {
        self.commands.lock().clone()
    }

    fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl ActuatorPort for RecordingActuator {
    fn set_position(&mut self, angle: f64) -> Result<(), DeviceError> {
        let angle = self.clamp(angle);
        let mut reject = self.reject_once.lock();
        if *reject == Some(angle) {
            *reject = None;
            return Err(DeviceError::Write { device: "recording", reason: "transient".to_string() });
        }
        self.commands.lock().push(angle);
        Ok(())
    }

    fn limits(&self) -> (f64, f64) {
        self.limits
    }
}

fn executor_at(initial: f64) -> (MotionProfileExecutor<RecordingActuator>, RecordingActuator) {
    let actuator = RecordingActuator::new();
    let executor = MotionProfileExecutor::new(actuator.clone(), SweepConfig::default(), initial).unwrap();
    actuator.clear();
    (executor, actuator)
}

fn assert_sweep_shape(commands: &[f64], target: f64) {
    assert!(!commands.is_empty());
    assert_eq!(*commands.last().unwrap(), target, "sweep must end exactly on target");
    let body = &commands[..commands.len() - 1];
    for pair in body.windows(2) {
        assert!(
            (pair[1] - pair[0]).abs() >= 0.2,
            "step {} -> {} is below the minimum step",
            pair[0],
            pair[1]
        );
    }
}

// ============================================================================
// TRAJECTORY SHAPE
// ============================================================================

#[test]
fn test_full_sweep_is_strictly_increasing_and_ends_on_target() {
    let (executor, actuator) = executor_at(0.0);

    let started = Instant::now();
    let report = executor.sweep(MotionCommand::new(180.0, 2.0)).unwrap();
    let elapsed = started.elapsed();

    let commands = actuator.commands();
    assert_sweep_shape(&commands, 180.0);
    for pair in commands.windows(2) {
        assert!(pair[1] > pair[0], "angles must strictly increase: {} -> {}", pair[0], pair[1]);
    }

    assert_eq!(report.final_angle, 180.0);
    assert_eq!(report.commands_emitted, commands.len());
    assert_eq!(executor.position(), 180.0);
    assert!(elapsed >= Duration::from_secs(2), "finished early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2300), "finished late: {:?}", elapsed);
    // ~400 ticks at 200 Hz; allow for a loaded test machine
    assert!(report.ticks > 200, "only {} ticks", report.ticks);
}

#[test]
fn test_downward_sweep_ends_on_target() {
    let (executor, actuator) = executor_at(150.0);
    executor.sweep(MotionCommand::new(30.0, 0.5)).unwrap();

    let commands = actuator.commands();
    assert_sweep_shape(&commands, 30.0);
    for pair in commands.windows(2) {
        assert!(pair[1] < pair[0]);
    }
    assert_eq!(executor.position(), 30.0);
}

#[test]
fn test_sweeps_end_exactly_on_clamped_target() {
    let (executor, actuator) = executor_at(0.0);
    for (target, expected) in [(37.0, 37.0), (179.5, 179.5), (250.0, 180.0), (-30.0, 0.0), (90.0, 90.0)] {
        actuator.clear();
        let report = executor.sweep(MotionCommand::new(target, 0.5)).unwrap();
        assert_eq!(report.final_angle, expected);
        assert_eq!(*actuator.commands().last().unwrap(), expected);
        assert_eq!(executor.position(), expected);
    }
}

#[test]
fn test_sweep_starts_slowly() {
    let (executor, actuator) = executor_at(0.0);
    executor.sweep(MotionCommand::new(180.0, 1.0)).unwrap();

    // With a raised-cosine ease the first 10% of the time covers ~2.4% of the distance.
    let commands = actuator.commands();
    let early = commands.iter().take_while(|angle| **angle < 180.0 * 0.05).count();
    let late = commands.iter().filter(|angle| **angle > 180.0 * 0.95).count();
    assert!(early > 0 && late > 0);
    assert!(commands[0] < 1.0, "first step {} should be small", commands[0]);
}

// ============================================================================
// DEGENERATE COMMANDS
// ============================================================================

#[test]
fn test_zero_duration_sets_immediately() {
    let (executor, actuator) = executor_at(0.0);

    let started = Instant::now();
    let report = executor.sweep(MotionCommand::new(120.0, 0.0)).unwrap();
    assert!(started.elapsed() < Duration::from_millis(50));

    assert_eq!(actuator.commands(), vec![120.0]);
    assert_eq!(report.commands_emitted, 1);
    assert_eq!(report.ticks, 0);
    assert_eq!(executor.position(), 120.0);
}

#[test]
fn test_negative_duration_sets_immediately() {
    let (executor, actuator) = executor_at(10.0);
    executor.sweep(MotionCommand::new(200.0, -1.0)).unwrap();
    assert_eq!(actuator.commands(), vec![180.0]);
}

#[test]
fn test_target_equal_to_current_issues_single_command() {
    let (executor, actuator) = executor_at(90.0);

    let started = Instant::now();
    let report = executor.sweep(MotionCommand::new(90.0, 5.0)).unwrap();
    assert!(started.elapsed() < Duration::from_millis(50));

    assert_eq!(actuator.commands(), vec![90.0]);
    assert_eq!(report.commands_emitted, 1);
}

#[test]
fn test_initial_angle_is_clamped_and_applied() {
    let actuator = RecordingActuator::new();
    let executor = MotionProfileExecutor::new(actuator.clone(), SweepConfig::default(), 500.0).unwrap();
    assert_eq!(actuator.commands(), vec![180.0]);
    assert_eq!(executor.position(), 180.0);
}

#[test]
fn test_non_finite_commands_are_rejected() {
    let (executor, actuator) = executor_at(45.0);

    for target in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert_eq!(
            executor.sweep(MotionCommand::new(target, 1.0)),
            Err(SweepError::Invalid(CommandError::NonFinite("target angle")))
        );
    }
    for duration in [f64::NAN, f64::INFINITY] {
        assert_eq!(
            executor.sweep(MotionCommand::new(90.0, duration)),
            Err(SweepError::Invalid(CommandError::NonFinite("duration")))
        );
    }
    assert_eq!(executor.set_angle(f64::NAN), Err(SweepError::Invalid(CommandError::NonFinite("target angle"))));

    assert!(actuator.commands().is_empty());
    assert_eq!(executor.position(), 45.0);
    assert!(!executor.is_sweeping());
}

// ============================================================================
// DEVICE FAULTS ON THE FINAL COMMAND
// ============================================================================

#[test]
fn test_final_command_is_retried_after_transient_failure() {
    let (executor, actuator) = executor_at(0.0);
    actuator.reject_once_at(90.0);

    let report = executor.sweep(MotionCommand::new(90.0, 0.5)).unwrap();

    assert_eq!(report.final_angle, 90.0);
    assert_eq!(executor.position(), 90.0);
    assert_sweep_shape(&actuator.commands(), 90.0);
    assert_eq!(actuator.commands().iter().filter(|angle| **angle == 90.0).count(), 1);
}

#[test]
fn test_immediate_set_is_retried_after_transient_failure() {
    let (executor, actuator) = executor_at(0.0);
    actuator.reject_once_at(120.0);

    let report = executor.set_angle(120.0).unwrap();
    assert_eq!(report.final_angle, 120.0);
    assert_eq!(actuator.commands(), vec![120.0]);
    assert_eq!(executor.position(), 120.0);
}

// ============================================================================
// EXCLUSIVITY AND CANCELLATION
// ============================================================================

#[test]
fn test_overlapping_sweep_is_rejected() {
    let (executor, _actuator) = executor_at(0.0);
    let executor = Arc::new(executor);

    let runner = {
        let executor = Arc::clone(&executor);
        thread::spawn(move || executor.sweep(MotionCommand::new(180.0, 0.6)))
    };
    let deadline = Instant::now() + Duration::from_millis(500);
    while !executor.is_sweeping() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(executor.sweep(MotionCommand::new(10.0, 0.5)), Err(SweepError::Busy));
    assert_eq!(executor.set_angle(10.0), Err(SweepError::Busy));

    let report = runner.join().unwrap().unwrap();
    assert_eq!(report.final_angle, 180.0);
    assert!(!executor.is_sweeping());
}

#[test]
fn test_stop_signal_interrupts_sweep_between_ticks() {
    let (executor, actuator) = executor_at(0.0);
    let (signal, token) = StopSignal::new();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        signal.trigger();
        Instant::now()
    });
    let result = executor.sweep_until(MotionCommand::new(180.0, 3.0), &token);
    let returned_at = Instant::now();
    let triggered_at = stopper.join().unwrap();

    let Err(SweepError::Cancelled { at_angle }) = result else {
        panic!("expected cancellation, got {:?}", result);
    };
    assert!(returned_at.duration_since(triggered_at) < Duration::from_millis(50));
    assert!(at_angle < 180.0);
    assert_eq!(executor.position(), at_angle);
    assert_eq!(actuator.commands().last().copied(), Some(at_angle));
}

#[test]
fn test_sweep_records_tick_metrics() {
    let metrics = TimingMetrics::new();
    let actuator = RecordingActuator::new();
    let executor = MotionProfileExecutor::new(actuator, SweepConfig::default(), 0.0)
        .unwrap()
        .with_metrics(metrics.clone());

    let report = executor.sweep(MotionCommand::new(60.0, 0.3)).unwrap();
    let summary = metrics.report();
    assert_eq!(summary.sweeps, 1);
    assert_eq!(summary.ticks, report.ticks);
}

#[test]
fn test_lower_update_rate_emits_fewer_commands() {
    let actuator = RecordingActuator::new();
    let config = SweepConfig { update_hz: 20.0, ..SweepConfig::default() };
    let executor = MotionProfileExecutor::new(actuator.clone(), config, 0.0).unwrap();
    actuator.clear();

    let report = executor.sweep(MotionCommand::new(180.0, 0.5)).unwrap();
    assert!(report.ticks <= 12, "{} ticks at 20 Hz over 0.5 s", report.ticks);
    assert_sweep_shape(&actuator.commands(), 180.0);
}
