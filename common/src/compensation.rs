//! Corrections for a humidity/temperature sensor powered below its nominal
//! supply voltage, and folding of raw samples into [`ControlState`].

use crate::{
    config::{Calibration, SENSOR_READ_INTERVAL_MS},
    types::{ControlState, SensorReading},
};

/// Undo the upward humidity bias of an under-volted sensor.
///
/// Invalid input (`None` or NaN) passes through as `None`. The result is
/// always within `0.0..=100.0`.
pub fn compensate_humidity(raw: Option<f32>, calibration: &Calibration) -> Option<f32> {
    let raw = raw.filter(|value| !value.is_nan())?;

    let mut corrected = raw * calibration.humidity_factor;
    if raw > calibration.humidity_knee {
        let points_above = raw - calibration.humidity_knee;
        corrected -= corrected * calibration.humidity_saturation_per_point * points_above;
    }
    Some(corrected.clamp(0.0, 100.0))
}

/// Apply the fixed offset and the supply-voltage ratio term. Not clamped.
pub fn compensate_temperature(raw: Option<f32>, calibration: &Calibration) -> Option<f32> {
    let raw = raw.filter(|value| !value.is_nan())?;

    let ratio = 1.0 - calibration.supply_voltage / calibration.nominal_voltage;
    Some(raw + calibration.temperature_offset_c + ratio * calibration.voltage_ratio_gain_c)
}

pub fn sensor_read_due(state: &ControlState, now_ms: u64) -> bool {
    state
        .last_sensor_read_ms
        .map(|last| now_ms.saturating_sub(last) >= SENSOR_READ_INTERVAL_MS)
        .unwrap_or(true)
}

/// Fold a raw sample into the state.
///
/// A failed read clears `sensor_valid` but keeps the last good values so they
/// are never mistaken for zero.
#[must_use]
pub fn apply_sensor_reading(
    state: &ControlState,
    reading: SensorReading,
    calibration: &Calibration,
    now_ms: u64,
) -> ControlState {
    let mut next = *state;
    next.last_sensor_read_ms = Some(now_ms);

    let temperature = compensate_temperature(reading.temperature, calibration)
        .filter(|value| value.is_finite());
    let humidity = compensate_humidity(reading.humidity, calibration);

    match (temperature, humidity) {
        (Some(temperature), Some(humidity)) => {
            next.temperature = Some(temperature);
            next.humidity = Some(humidity);
            next.sensor_valid = true;
        }
        _ => next.sensor_valid = false,
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn humidity_scaled_below_knee() {
        let corrected = compensate_humidity(Some(50.0), &Calibration::default()).unwrap();
        assert!(close(corrected, 42.5), "got {corrected}");
    }

    #[test]
    fn humidity_saturation_correction_above_knee() {
        // 80 * 0.85 = 68, then 20 points above the knee remove 20 %.
        let corrected = compensate_humidity(Some(80.0), &Calibration::default()).unwrap();
        assert!(close(corrected, 54.4), "got {corrected}");
    }

    #[test]
    fn humidity_stays_in_percent_range() {
        let calibration = Calibration::default();
        for raw in 0..=100 {
            let corrected = compensate_humidity(Some(raw as f32), &calibration).unwrap();
            assert!((0.0..=100.0).contains(&corrected), "raw {raw} -> {corrected}");
        }
        assert_eq!(compensate_humidity(Some(-4.0), &calibration), Some(0.0));
    }

    #[test]
    fn invalid_readings_pass_through() {
        let calibration = Calibration::default();
        assert_eq!(compensate_humidity(None, &calibration), None);
        assert_eq!(compensate_temperature(None, &calibration), None);
        assert_eq!(compensate_humidity(Some(f32::NAN), &calibration), None);
        assert_eq!(compensate_temperature(Some(f32::NAN), &calibration), None);
    }

    #[test]
    fn temperature_offset_and_voltage_term() {
        // -1.5 + (1 - 3.0 / 3.3) * 2.0 = -1.31818
        let corrected = compensate_temperature(Some(20.0), &Calibration::default()).unwrap();
        assert!(close(corrected, 18.6818), "got {corrected}");

        let below_zero = compensate_temperature(Some(-30.0), &Calibration::default()).unwrap();
        assert!(close(below_zero, -31.3182), "got {below_zero}");
    }

    #[test]
    fn failed_read_keeps_last_good_values() {
        let calibration = Calibration::default();
        let state = apply_sensor_reading(
            &ControlState::default(),
            SensorReading {
                temperature: Some(20.0),
                humidity: Some(50.0),
            },
            &calibration,
            1_000,
        );
        assert!(state.sensor_valid);

        let failed = apply_sensor_reading(
            &state,
            SensorReading {
                temperature: Some(20.0),
                humidity: None,
            },
            &calibration,
            1_500,
        );

        assert!(!failed.sensor_valid);
        assert_eq!(failed.temperature, state.temperature);
        assert_eq!(failed.humidity, state.humidity);
        assert_eq!(failed.last_sensor_read_ms, Some(1_500));
    }

    #[test]
    fn read_due_after_interval() {
        let mut state = ControlState::default();
        assert!(sensor_read_due(&state, 0));

        state.last_sensor_read_ms = Some(1_000);
        assert!(!sensor_read_due(&state, 1_499));
        assert!(sensor_read_due(&state, 1_500));
    }
}
