use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// Policy constants. These shape the control behavior and are not meant to be
// tuned per sensor batch; see `Calibration` for that.

/// Lowest settable target temperature in °C.
pub const TEMP_MIN: i32 = 0;
/// Highest settable target temperature in °C.
pub const TEMP_MAX: i32 = 40;
/// Lowest settable target humidity in %RH.
pub const HUM_MIN: i32 = 0;
/// Highest settable target humidity in %RH.
pub const HUM_MAX: i32 = 100;
/// Longest countdown in seconds (about 11.5 days).
pub const TIMER_MAX_SECS: u32 = 999_999;
/// One encoder detent in the timer menu.
pub const TIMER_STEP_SECS: u32 = 300;

/// Software PWM frequency shared by the fan and heater channels.
pub const SOFT_PWM_FREQ_HZ: u64 = 250;
/// Lowest duty that reliably keeps the fan spinning. The fan never idles below this.
pub const FAN_PWM_MIN: u8 = 10;
pub const FAN_PWM_MAX: u8 = 255;
/// Duty substituted while the fan motor is kick-started from standstill.
pub const FAN_PWM_START: u8 = 180;
pub const FAN_KICK_START_DURATION_MS: u64 = 500;
/// Temperature excess (°C) at which the fan reaches full speed.
pub const FAN_TEMP_SATURATION_C: f32 = 10.0;
/// Humidity excess (%RH) at which the fan reaches full speed.
pub const FAN_HUMIDITY_SATURATION: f32 = 50.0;
/// Flat duty added to drying while the humidifier is idle.
pub const FAN_DRYING_BOOST: u8 = 50;
/// Humidity excess (%RH) above which the drying boost applies.
pub const FAN_DRYING_BOOST_THRESHOLD: f32 = 2.0;

pub const HEATER_PWM_MIN: u8 = 0;
pub const HEATER_PWM_MAX: u8 = 255;
/// Degrees below target before the heater engages, and before the fan is held at idle.
pub const TEMP_THRESHOLD_LOW: f32 = 1.0;
/// Temperature deficit (°C) at which the heater reaches `HEATER_PWM_MAX`.
///
/// Profiles in the field used anything from 2 to 10 °C; 5 °C is the one this
/// controller ships with.
pub const HEATER_SATURATION_DELTA_C: f32 = 5.0;

/// Width of the humidifier dead-band on either side of the target, in %RH.
pub const HUMIDIFIER_DEADBAND: f32 = 2.0;

pub const SENSOR_READ_INTERVAL_MS: u64 = 500;
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

/// Period of one software PWM cycle derived from `SOFT_PWM_FREQ_HZ`.
pub const fn soft_pwm_period_ms() -> u64 {
    1_000 / SOFT_PWM_FREQ_HZ
}

/// Empirical correction for a humidity/temperature sensor running below its
/// nominal supply voltage. This is the only calibration surface of the
/// controller; the values are specific to a sensor batch and wiring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Multiplier applied to raw humidity (raw reads high at low supply voltage).
    pub humidity_factor: f32,
    /// Raw humidity above which the saturation correction kicks in.
    pub humidity_knee: f32,
    /// Fraction of the corrected value removed per %RH above the knee.
    pub humidity_saturation_per_point: f32,
    pub temperature_offset_c: f32,
    pub supply_voltage: f32,
    pub nominal_voltage: f32,
    /// °C added per unit of `(1 - supply / nominal)`.
    pub voltage_ratio_gain_c: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            humidity_factor: 0.85,
            humidity_knee: 60.0,
            humidity_saturation_per_point: 0.01,
            temperature_offset_c: -1.5,
            supply_voltage: 3.0,
            nominal_voltage: 3.3,
            voltage_ratio_gain_c: 2.0,
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("humidity_factor", self.humidity_factor),
            ("humidity_knee", self.humidity_knee),
            (
                "humidity_saturation_per_point",
                self.humidity_saturation_per_point,
            ),
            ("temperature_offset_c", self.temperature_offset_c),
            ("supply_voltage", self.supply_voltage),
            ("nominal_voltage", self.nominal_voltage),
            ("voltage_ratio_gain_c", self.voltage_ratio_gain_c),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite(name));
            }
        }

        if self.humidity_factor <= 0.0 || self.humidity_factor > 2.0 {
            return Err(ConfigError::HumidityFactor(self.humidity_factor));
        }
        if self.supply_voltage <= 0.0 {
            return Err(ConfigError::Voltage("supply_voltage", self.supply_voltage));
        }
        if self.nominal_voltage <= 0.0 {
            return Err(ConfigError::Voltage(
                "nominal_voltage",
                self.nominal_voltage,
            ));
        }
        Ok(())
    }
}

/// Which conditions may drive the heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaterPolicy {
    /// Heat only when the chamber is at least `TEMP_THRESHOLD_LOW` below target.
    #[default]
    TooColdOnly,
    /// Additionally run the heater at full power whenever the chamber is too
    /// humid and not above target, drying the air by warming it.
    HumidityAssist,
}

impl HeaterPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooColdOnly => "TOO_COLD_ONLY",
            Self::HumidityAssist => "HUMIDITY_ASSIST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub calibration: Calibration,
    pub humidifier_installed: bool,
    pub heater_policy: HeaterPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            calibration: Calibration::default(),
            humidifier_installed: true,
            heater_policy: HeaterPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTargets {
    pub temperature: i32,
    pub humidity: i32,
}

impl Default for PersistedTargets {
    fn default() -> Self {
        Self {
            temperature: 10,
            humidity: 50,
        }
    }
}

impl PersistedTargets {
    pub fn sanitize(&mut self) {
        self.temperature = self.temperature.clamp(TEMP_MIN, TEMP_MAX);
        self.humidity = self.humidity.clamp(HUM_MIN, HUM_MAX);
    }
}
