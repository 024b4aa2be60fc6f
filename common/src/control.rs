//! Duty decisions for the fan, heater and humidifier.
//!
//! Everything here is a pure function of a [`ControlState`] snapshot. Cooling
//! always wins over drying, and active heating demand keeps the fan at idle so
//! warm air is not exhausted straight away.

use crate::{
    config::{
        HeaterPolicy, FAN_DRYING_BOOST, FAN_DRYING_BOOST_THRESHOLD, FAN_HUMIDITY_SATURATION,
        FAN_PWM_MAX, FAN_PWM_MIN, FAN_TEMP_SATURATION_C, HEATER_PWM_MAX, HEATER_PWM_MIN,
        HEATER_SATURATION_DELTA_C, HUMIDIFIER_DEADBAND, TEMP_THRESHOLD_LOW,
    },
    types::ControlState,
};

/// Linear ramp from `min` at `amount == 0` to `max` at `amount >= span`.
fn ramp(min: u8, max: u8, amount: f32, span: f32) -> u8 {
    let fraction = (amount / span).clamp(0.0, 1.0);
    min + (f32::from(max - min) * fraction) as u8
}

/// Fan duty in `FAN_PWM_MIN..=FAN_PWM_MAX`.
///
/// `humidifier_on` is `None` when no humidifier is fitted. The drying boost is
/// only applied when `include_boost` is set; the status screen passes `false`
/// to show the underlying curve.
pub fn calculate_fan_duty(
    state: &ControlState,
    humidifier_on: Option<bool>,
    include_boost: bool,
) -> u8 {
    let Some((temperature, humidity)) = state.readings() else {
        return FAN_PWM_MIN;
    };

    let temp_excess = temperature - state.target_temperature as f32;
    let hum_excess = humidity - state.target_humidity as f32;
    let temp_deficit = state.target_temperature as f32 - temperature;

    if temp_excess > 0.0 {
        return ramp(FAN_PWM_MIN, FAN_PWM_MAX, temp_excess, FAN_TEMP_SATURATION_C);
    }

    if hum_excess > 0.0 {
        if temp_deficit >= TEMP_THRESHOLD_LOW {
            return FAN_PWM_MIN;
        }

        let duty = ramp(FAN_PWM_MIN, FAN_PWM_MAX, hum_excess, FAN_HUMIDITY_SATURATION);
        let humidifier_idle = humidifier_on == Some(false);
        if include_boost && humidifier_idle && hum_excess > FAN_DRYING_BOOST_THRESHOLD {
            return duty.saturating_add(FAN_DRYING_BOOST).min(FAN_PWM_MAX);
        }
        return duty;
    }

    FAN_PWM_MIN
}

/// Heater duty in `0..=HEATER_PWM_MAX`.
pub fn calculate_heater_duty(state: &ControlState, policy: HeaterPolicy) -> u8 {
    let Some((temperature, humidity)) = state.readings() else {
        return 0;
    };

    let temp_deficit = state.target_temperature as f32 - temperature;

    if policy == HeaterPolicy::HumidityAssist
        && humidity > state.target_humidity as f32
        && temperature <= state.target_temperature as f32
    {
        return HEATER_PWM_MAX;
    }

    if temp_deficit >= TEMP_THRESHOLD_LOW {
        return ramp(
            HEATER_PWM_MIN,
            HEATER_PWM_MAX,
            temp_deficit - TEMP_THRESHOLD_LOW,
            HEATER_SATURATION_DELTA_C - TEMP_THRESHOLD_LOW,
        );
    }
    0
}

/// Humidifier switch with a dead-band of `HUMIDIFIER_DEADBAND` around the target.
///
/// Holds `previous_on` inside the band and while the sensor is invalid.
pub fn calculate_humidifier_on(state: &ControlState, previous_on: bool) -> bool {
    let Some((_, humidity)) = state.readings() else {
        return previous_on;
    };

    let target = state.target_humidity as f32;
    if target - humidity > HUMIDIFIER_DEADBAND {
        true
    } else if humidity - target > HUMIDIFIER_DEADBAND {
        false
    } else {
        previous_on
    }
}
