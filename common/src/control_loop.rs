//! One control tick over injected collaborators.
//!
//! Every transition in a tick is derived from the single `now_ms` passed in.
//! Hardware writes happen last, followed by the display.

use tracing::{debug, info, warn};

use crate::{
    compensation::{apply_sensor_reading, sensor_read_due},
    config::{ControllerConfig, PersistedTargets, TEMP_MAX, TEMP_MIN},
    control::{calculate_fan_duty, calculate_heater_duty, calculate_humidifier_on},
    error::StoreError,
    input::{reduce_input, InputEffect, InputEvents},
    pwm::PwmChannel,
    types::{clamp_values, ControlState, OutputChannel, OutputSnapshot, SensorReading},
};

pub trait SensorSource {
    fn read(&mut self) -> SensorReading;
}

pub trait InputSource {
    /// Rotation and clicks accumulated since the previous call.
    fn take_events(&mut self) -> InputEvents;
    fn configure(&mut self, min: i32, max: i32, value: i32);
}

pub trait ActuatorSink {
    fn set_output(&mut self, channel: OutputChannel, on: bool);
}

pub trait DisplaySink {
    /// `now_ms` is the timestamp of the tick that produced this frame.
    fn render(&mut self, state: &ControlState, outputs: &OutputSnapshot, now_ms: u64);
}

pub trait TargetStore {
    fn load_targets(&mut self) -> Result<PersistedTargets, StoreError>;
    fn save_temperature_target(&mut self, value: i32) -> Result<(), StoreError>;
    fn save_humidity_target(&mut self, value: i32) -> Result<(), StoreError>;
}

pub struct Peripherals<S, I, A, D, P> {
    pub sensor: S,
    pub input: I,
    pub actuators: A,
    pub display: D,
    pub store: P,
}

pub struct ControlLoop<S, I, A, D, P> {
    config: ControllerConfig,
    state: ControlState,
    fan: PwmChannel,
    heater: PwmChannel,
    humidifier_on: bool,
    io: Peripherals<S, I, A, D, P>,
}

impl<S, I, A, D, P> ControlLoop<S, I, A, D, P>
where
    S: SensorSource,
    I: InputSource,
    A: ActuatorSink,
    D: DisplaySink,
    P: TargetStore,
{
    pub fn new(config: ControllerConfig, mut io: Peripherals<S, I, A, D, P>, now_ms: u64) -> Self {
        let mut targets = io.store.load_targets().unwrap_or_else(|err| {
            warn!("failed to load stored targets: {err}");
            PersistedTargets::default()
        });
        targets.sanitize();

        let state = ControlState::new(targets);
        io.input.configure(TEMP_MIN, TEMP_MAX, state.target_temperature);

        info!(
            target_temperature = targets.temperature,
            target_humidity = targets.humidity,
            heater_policy = config.heater_policy.as_str(),
            humidifier = config.humidifier_installed,
            "control loop ready"
        );

        Self {
            config,
            state,
            fan: PwmChannel::fan(now_ms),
            heater: PwmChannel::heater(now_ms),
            humidifier_on: false,
            io,
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn fan_channel(&self) -> &PwmChannel {
        &self.fan
    }

    pub fn peripherals(&self) -> &Peripherals<S, I, A, D, P> {
        &self.io
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<S, I, A, D, P> {
        &mut self.io
    }

    pub fn tick(&mut self, now_ms: u64) -> OutputSnapshot {
        let mut state = self.state;

        if sensor_read_due(&state, now_ms) {
            let reading = self.io.sensor.read();
            let was_valid = state.sensor_valid;
            let first_read = state.last_sensor_read_ms.is_none();
            state = apply_sensor_reading(&state, reading, &self.config.calibration, now_ms);

            if state.sensor_valid && !was_valid {
                info!(
                    temperature = state.temperature,
                    humidity = state.humidity,
                    "sensor readings valid"
                );
            } else if !state.sensor_valid && (was_valid || first_read) {
                warn!("sensor read failed, outputs held at safe defaults");
            }
        }

        let previous_menu = state.menu;
        let (reduced, effects) = reduce_input(&state, self.io.input.take_events(), now_ms);
        state = reduced;
        if state.menu != previous_menu {
            debug!(menu = state.menu.as_str(), "menu selection changed");
        }
        self.apply_effects(effects);

        state = clamp_values(&state);

        let timer_was_running = state.timer.running;
        state.timer = state.timer.update(now_ms);
        if timer_was_running && !state.timer.running {
            info!(
                duration_secs = state.timer.original_secs,
                "countdown timer finished"
            );
        }

        let humidifier = self
            .config
            .humidifier_installed
            .then_some(self.humidifier_on);
        let fan_duty = calculate_fan_duty(&state, humidifier, true);
        let heater_duty = calculate_heater_duty(&state, self.config.heater_policy);
        let humidifier_on = humidifier.map(|previous| calculate_humidifier_on(&state, previous));

        self.fan = self.fan.advance(fan_duty, now_ms);
        self.heater = self.heater.advance(heater_duty, now_ms);
        if let Some(on) = humidifier_on {
            if on != self.humidifier_on {
                debug!(on, "humidifier switched");
            }
            self.humidifier_on = on;
        }
        self.state = state;

        let outputs = OutputSnapshot {
            fan_duty,
            heater_duty,
            humidifier_on,
            fan_on: self.fan.output_on(),
            heater_on: self.heater.output_on(),
        };

        self.io
            .actuators
            .set_output(OutputChannel::Fan, outputs.fan_on);
        self.io
            .actuators
            .set_output(OutputChannel::Heater, outputs.heater_on);
        if let Some(on) = outputs.humidifier_on {
            self.io.actuators.set_output(OutputChannel::Humidifier, on);
        }

        self.io.display.render(&self.state, &outputs, now_ms);
        outputs
    }

    fn apply_effects(&mut self, effects: Vec<InputEffect>) {
        for effect in effects {
            match effect {
                InputEffect::SaveTemperatureTarget(value) => {
                    if let Err(err) = self.io.store.save_temperature_target(value) {
                        warn!("failed to persist temperature target {value}: {err}");
                    }
                }
                InputEffect::SaveHumidityTarget(value) => {
                    if let Err(err) = self.io.store.save_humidity_target(value) {
                        warn!("failed to persist humidity target {value}: {err}");
                    }
                }
                InputEffect::ConfigureEncoder { min, max, value } => {
                    self.io.input.configure(min, max, value);
                }
            }
        }
    }
}
