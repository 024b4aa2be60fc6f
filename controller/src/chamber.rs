use std::{cell::RefCell, rc::Rc};

use fermenter_common::{ActuatorSink, OutputChannel, SensorReading, SensorSource};

const AMBIENT_TEMPERATURE_C: f32 = 16.0;
const AMBIENT_HUMIDITY: f32 = 45.0;
/// Fraction of the gap to ambient closed per second through the walls.
const WALL_LEAK_PER_SEC: f32 = 0.002;
/// Extra fraction of the gap closed per second while the fan exchanges air.
const FAN_EXCHANGE_PER_SEC: f32 = 0.02;
const HEATER_C_PER_SEC: f32 = 0.05;
const HUMIDIFIER_PER_SEC: f32 = 0.4;
/// Every Nth read fails, the way a marginal sensor bus drops samples.
const SENSOR_FAILURE_EVERY: u64 = 40;
/// The sensor runs under-volted, so it reads humid and cold.
const RAW_HUMIDITY_BIAS: f32 = 1.0 / 0.85;
const RAW_TEMPERATURE_BIAS_C: f32 = 1.3;

/// First-order model of the enclosure, shared by the simulated sensor and
/// actuators.
#[derive(Debug)]
pub struct Enclosure {
    temperature: f32,
    humidity: f32,
    fan_on: bool,
    heater_on: bool,
    humidifier_on: bool,
    last_ms: Option<u64>,
}

impl Default for Enclosure {
    fn default() -> Self {
        Self {
            temperature: AMBIENT_TEMPERATURE_C,
            humidity: 70.0,
            fan_on: false,
            heater_on: false,
            humidifier_on: false,
            last_ms: None,
        }
    }
}

impl Enclosure {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn advance(&mut self, now_ms: u64) {
        let dt = match self.last_ms {
            Some(last) => now_ms.saturating_sub(last) as f32 / 1_000.0,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);

        let mut exchange = WALL_LEAK_PER_SEC;
        if self.fan_on {
            exchange += FAN_EXCHANGE_PER_SEC;
        }
        let exchange = (exchange * dt).min(1.0);

        self.temperature += (AMBIENT_TEMPERATURE_C - self.temperature) * exchange;
        self.humidity += (AMBIENT_HUMIDITY - self.humidity) * exchange;
        if self.heater_on {
            self.temperature += HEATER_C_PER_SEC * dt;
        }
        if self.humidifier_on {
            self.humidity += HUMIDIFIER_PER_SEC * dt;
        }
        self.humidity = self.humidity.clamp(0.0, 100.0);
    }
}

pub struct SimulatedSensor {
    enclosure: Rc<RefCell<Enclosure>>,
    reads: u64,
}

impl SimulatedSensor {
    pub fn new(enclosure: Rc<RefCell<Enclosure>>) -> Self {
        Self {
            enclosure,
            reads: 0,
        }
    }
}

impl SensorSource for SimulatedSensor {
    fn read(&mut self) -> SensorReading {
        self.reads = self.reads.wrapping_add(1);
        if self.reads % SENSOR_FAILURE_EVERY == 0 {
            return SensorReading::default();
        }

        let enclosure = self.enclosure.borrow();
        SensorReading {
            temperature: Some(enclosure.temperature + RAW_TEMPERATURE_BIAS_C),
            humidity: Some((enclosure.humidity * RAW_HUMIDITY_BIAS).min(100.0)),
        }
    }
}

pub struct SimulatedOutputs {
    enclosure: Rc<RefCell<Enclosure>>,
}

impl SimulatedOutputs {
    pub fn new(enclosure: Rc<RefCell<Enclosure>>) -> Self {
        Self { enclosure }
    }
}

impl ActuatorSink for SimulatedOutputs {
    fn set_output(&mut self, channel: OutputChannel, on: bool) {
        let mut enclosure = self.enclosure.borrow_mut();
        match channel {
            OutputChannel::Fan => enclosure.fan_on = on,
            OutputChannel::Heater => enclosure.heater_on = on,
            OutputChannel::Humidifier => enclosure.humidifier_on = on,
        }
    }
}
