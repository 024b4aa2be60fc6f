pub mod compensation;
pub mod config;
pub mod control;
pub mod control_loop;
pub mod display;
pub mod error;
pub mod input;
pub mod pwm;
pub mod timer;
pub mod types;

pub use compensation::{
    apply_sensor_reading, compensate_humidity, compensate_temperature, sensor_read_due,
};
pub use config::{Calibration, ControllerConfig, HeaterPolicy, PersistedTargets};
pub use control::{calculate_fan_duty, calculate_heater_duty, calculate_humidifier_on};
pub use control_loop::{
    ActuatorSink, ControlLoop, DisplaySink, InputSource, Peripherals, SensorSource, TargetStore,
};
pub use display::StatusScreen;
pub use error::{ConfigError, StoreError};
pub use input::{EncoderCounter, InputEffect, InputEvents};
pub use pwm::PwmChannel;
pub use timer::{CountdownTimer, TimerPhase};
pub use types::{
    clamp_values, ControlState, MenuSelection, OutputChannel, OutputSnapshot, SensorReading,
};
