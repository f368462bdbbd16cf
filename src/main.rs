use std::error::Error;

use realtime_servo_monitor::config::DEFAULT_CONFIG_PATH;
use realtime_servo_monitor::{
    load_config, AngularServo, DistanceMonitor, MotionCommand, MotionProfileExecutor, SimulatedEcho,
    SimulatedPwm, SweepController, SweepError, SystemConfig, TimingMetrics, UltrasonicSensor,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// (angle, sweep time) pairs as they would arrive from the request layer
const DEMO_REQUESTS: [(i64, f64); 3] = [(180, 2.0), (90, 1.0), (0, 1.5)];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    println!("===========================================");
    println!("Starting Servo Sweep + Distance Monitor");
    println!("===========================================\n");

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!(%path, error = %err, "falling back to default config");
            SystemConfig::default()
        }
    };

    if let Err(err) = run(config) {
        error!(error = %err, "run aborted");
        std::process::exit(1);
    }
}

fn run(config: SystemConfig) -> Result<(), Box<dyn Error>> {
    let metrics = TimingMetrics::new();

    let ranger = UltrasonicSensor::new(SimulatedEcho::new(42), config.ranger.clone());
    let monitor = DistanceMonitor::new(ranger, &config.monitor, metrics.clone())?;

    let servo = AngularServo::new(SimulatedPwm::new(), config.servo.clone());
    let executor = MotionProfileExecutor::new(servo, config.sweep.clone(), config.servo.initial_angle)?
        .with_metrics(metrics.clone());
    let sweeps = SweepController::new(executor, config.scheduler.host_scheduler())?;

    monitor.start()?;
    sweeps.start()?;

    for (angle, sweep_time) in DEMO_REQUESTS {
        let command = MotionCommand::from_request(angle, sweep_time)?;
        let handle = sweeps.submit(command)?;

        // Anything arriving while that sweep is in flight is turned away.
        if let Ok(Err(SweepError::Busy)) = sweeps.submit(MotionCommand::from_request(45, 0.5)?)?.wait() {
            info!("overlapping sweep request rejected");
        }

        match handle.wait()? {
            Ok(report) => info!(
                target_angle = report.target_angle,
                commands = report.commands_emitted,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "sweep finished"
            ),
            Err(err) => warn!(error = %err, "sweep failed"),
        }

        if let Some(sample) = monitor.latest() {
            info!(
                distance_cm = sample.distance_cm,
                smoothed_cm = sample.smoothed_cm,
                "latest distance sample"
            );
        }
    }

    println!("\n===========================================");
    println!("Demo completed - initiating shutdown");
    let sweep_stop = sweeps.stop();
    let monitor_stop = monitor.stop();

    let report = metrics.report();
    println!("===========================================");
    println!("FINAL RESULTS");
    println!("===========================================");
    println!("Servo position: {:.2} deg", sweeps.position());
    println!("Sweeps: {} (p50 {:?})", report.sweeps, report.sweep_p50);
    println!(
        "Tick lateness P50: {:?}, P99: {:?}, max: {:?} over {} ticks",
        report.tick_lateness_p50, report.tick_lateness_p99, report.tick_lateness_max, report.ticks
    );
    println!(
        "Samples: {} ({} failed), read P50: {:?}, P99: {:?}",
        report.samples, report.sample_failures, report.sample_p50, report.sample_p99
    );
    println!("Shutdown: sweep context {:?}, monitor context {:?}", sweep_stop, monitor_stop);
    println!("===========================================\n");

    Ok(())
}
