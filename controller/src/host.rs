use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use fermenter_common::{
    ActuatorSink, ControlLoop, ControlState, ControllerConfig, DisplaySink, EncoderCounter,
    InputEvents, InputSource, OutputChannel, OutputSnapshot, Peripherals, PersistedTargets,
    StatusScreen, StoreError, TargetStore,
};

use crate::chamber::{Enclosure, SimulatedOutputs, SimulatedSensor};

const TICK_INTERVAL: Duration = Duration::from_millis(1);
const DISPLAY_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("FERMENTER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.fermenter"));

    let config = load_controller_config(&data_dir.join("config.json")).unwrap_or_else(|err| {
        warn!("failed to load controller config: {err:#}");
        ControllerConfig::default()
    });

    let encoder = Arc::new(EncoderCounter::new());
    spawn_encoder_reader(encoder.clone());

    let enclosure = Enclosure::shared();
    let peripherals = Peripherals {
        sensor: SimulatedSensor::new(enclosure.clone()),
        input: EncoderInput { counter: encoder },
        actuators: SimulatedOutputs::new(enclosure.clone()),
        display: LogDisplay::new(DISPLAY_INTERVAL),
        store: JsonTargetStore::new(data_dir.join("targets.json")),
    };
    let mut control = ControlLoop::new(config, peripherals, monotonic_ms());

    info!("chamber controller running; type +N / -N to turn the encoder, c to click");

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now_ms = monotonic_ms();
                enclosure.borrow_mut().advance(now_ms);
                control.tick(now_ms);
            }
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                break;
            }
        }
    }

    let actuators = &mut control.peripherals_mut().actuators;
    for channel in [
        OutputChannel::Fan,
        OutputChannel::Heater,
        OutputChannel::Humidifier,
    ] {
        actuators.set_output(channel, false);
    }
    info!("outputs released, exiting");
    Ok(())
}

fn load_controller_config(path: &Path) -> anyhow::Result<ControllerConfig> {
    let config = match std::fs::read(path) {
        Ok(raw) => serde_json::from_slice::<ControllerConfig>(&raw)
            .with_context(|| format!("invalid controller config at {}", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => ControllerConfig::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    config.calibration.validate()?;
    Ok(config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderCommand {
    Rotate(i32),
    Click,
}

fn parse_encoder_command(line: &str) -> Option<EncoderCommand> {
    let line = line.trim();
    match line {
        "c" | "click" => Some(EncoderCommand::Click),
        "+" => Some(EncoderCommand::Rotate(1)),
        "-" => Some(EncoderCommand::Rotate(-1)),
        _ if line.starts_with('+') || line.starts_with('-') => {
            line.parse::<i32>().ok().map(EncoderCommand::Rotate)
        }
        _ => None,
    }
}

/// Stands in for the encoder interrupt: each parsed line is a single atomic
/// update on the shared counter.
fn spawn_encoder_reader(counter: Arc<EncoderCounter>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_encoder_command(&line) {
                    Some(EncoderCommand::Rotate(delta)) => counter.record_step(delta),
                    Some(EncoderCommand::Click) => counter.record_click(),
                    None => warn!("unrecognised input `{}` (use +N, -N or c)", line.trim()),
                },
                Ok(None) => break,
                Err(err) => {
                    warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
    });
}

struct EncoderInput {
    counter: Arc<EncoderCounter>,
}

impl InputSource for EncoderInput {
    fn take_events(&mut self) -> InputEvents {
        self.counter.take()
    }

    fn configure(&mut self, min: i32, max: i32, value: i32) {
        debug!(min, max, value, "encoder re-ranged");
    }
}

struct LogDisplay {
    interval_ms: u64,
    last_frame_ms: Option<u64>,
}

impl LogDisplay {
    fn new(interval: Duration) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            last_frame_ms: None,
        }
    }

    fn frame_due(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_frame_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return false;
            }
        }
        self.last_frame_ms = Some(now_ms);
        true
    }
}

impl DisplaySink for LogDisplay {
    fn render(&mut self, state: &ControlState, outputs: &OutputSnapshot, now_ms: u64) {
        if !self.frame_due(now_ms) {
            return;
        }

        let screen = StatusScreen::render(state, outputs);
        let marker = |row: usize| if row == screen.highlighted { '>' } else { ' ' };
        info!(
            "{}{} |{}{} |{}{} | {}",
            marker(0),
            screen.rows[0],
            marker(1),
            screen.rows[1],
            marker(2),
            screen.rows[2],
            screen.status
        );
        debug!(
            fan_duty = outputs.fan_duty,
            fan_on = outputs.fan_on,
            heater_duty = outputs.heater_duty,
            heater_on = outputs.heater_on,
            humidifier = ?outputs.humidifier_on,
            temperature = ?state.temperature,
            humidity = ?state.humidity,
            target_temperature = state.target_temperature,
            target_humidity = state.target_humidity,
            timer = state.timer.phase().as_str(),
            "outputs"
        );
    }
}

struct JsonTargetStore {
    path: PathBuf,
}

impl JsonTargetStore {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, targets: &PersistedTargets) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(targets)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

impl TargetStore for JsonTargetStore {
    fn load_targets(&mut self) -> Result<PersistedTargets, StoreError> {
        match std::fs::read(&self.path) {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(PersistedTargets::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save_temperature_target(&mut self, value: i32) -> Result<(), StoreError> {
        let mut targets = self.load_targets()?;
        targets.temperature = value;
        self.write(&targets)
    }

    fn save_humidity_target(&mut self, value: i32) -> Result<(), StoreError> {
        let mut targets = self.load_targets()?;
        targets.humidity = value;
        self.write(&targets)
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
