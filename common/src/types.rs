use serde::{Deserialize, Serialize};

use crate::{
    config::{PersistedTargets, HUM_MAX, HUM_MIN, TEMP_MAX, TEMP_MIN, TIMER_MAX_SECS},
    timer::CountdownTimer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MenuSelection {
    #[default]
    Temperature,
    Humidity,
    Timer,
}

impl MenuSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "TEMPERATURE",
            Self::Humidity => "HUMIDITY",
            Self::Timer => "TIMER",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Temperature => Self::Humidity,
            Self::Humidity => Self::Timer,
            Self::Timer => Self::Temperature,
        }
    }

    /// Row of this item on the status screen.
    pub fn index(self) -> usize {
        match self {
            Self::Temperature => 0,
            Self::Humidity => 1,
            Self::Timer => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputChannel {
    Fan,
    Heater,
    Humidifier,
}

impl OutputChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fan => "FAN",
            Self::Heater => "HEATER",
            Self::Humidifier => "HUMIDIFIER",
        }
    }
}

/// One sample from the sensor source. `None` marks a failed read of that quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

/// Everything the control tick knows about the chamber and the user's intent.
///
/// `temperature` and `humidity` hold the last good compensated reading and are
/// only trustworthy while `sensor_valid` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub target_temperature: i32,
    pub target_humidity: i32,
    pub menu: MenuSelection,

    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub sensor_valid: bool,

    pub last_sensor_read_ms: Option<u64>,
    pub last_input_event_ms: Option<u64>,

    pub timer: CountdownTimer,
}

impl ControlState {
    pub fn new(targets: PersistedTargets) -> Self {
        Self {
            target_temperature: targets.temperature,
            target_humidity: targets.humidity,
            menu: MenuSelection::Temperature,
            temperature: None,
            humidity: None,
            sensor_valid: false,
            last_sensor_read_ms: None,
            last_input_event_ms: None,
            timer: CountdownTimer::default(),
        }
    }

    /// Current `(temperature, humidity)` if the latest read succeeded.
    pub fn readings(&self) -> Option<(f32, f32)> {
        if !self.sensor_valid {
            return None;
        }
        Some((self.temperature?, self.humidity?))
    }

    pub fn targets(&self) -> PersistedTargets {
        PersistedTargets {
            temperature: self.target_temperature,
            humidity: self.target_humidity,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(PersistedTargets::default())
    }
}

/// What one tick decided for the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputSnapshot {
    pub fan_duty: u8,
    pub heater_duty: u8,
    /// `None` when no humidifier is installed.
    pub humidifier_on: Option<bool>,
    pub fan_on: bool,
    pub heater_on: bool,
}

/// Pull user-controlled values back into their legal ranges.
#[must_use]
pub fn clamp_values(state: &ControlState) -> ControlState {
    let mut next = *state;
    next.target_temperature = next.target_temperature.clamp(TEMP_MIN, TEMP_MAX);
    next.target_humidity = next.target_humidity.clamp(HUM_MIN, HUM_MAX);
    next.timer.remaining_secs = next.timer.remaining_secs.min(TIMER_MAX_SECS);
    next.timer.original_secs = next.timer.original_secs.min(TIMER_MAX_SECS);
    next
}
