pub mod actuator;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod sensor;

pub use actuator::{
    ease, ActuatorPort, AngularServo, MotionCommand, MotionProfileExecutor, PwmChannel, ServoSpec,
    SimulatedPwm, SweepConfig, SweepController, SweepReport, Trajectory,
};
pub use config::{load_config, SystemConfig};
pub use error::{CommandError, ConfigError, DeviceError, SchedulerError, SweepError};
pub use metrics::{MetricsReport, TimingMetrics};
pub use scheduler::{
    SchedulerConfig, StopOutcome, StopSignal, StopToken, TaskScheduler, Work, WorkHandle, WorkUnit, WorkerState,
};
pub use sensor::{
    DistanceMonitor, DistanceSample, EchoTimer, MonitorConfig, MovingAverage, SensorPort, SimulatedEcho,
    UltrasonicSensor, UltrasonicSpec,
};
