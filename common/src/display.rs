use crate::{
    config::{FAN_PWM_MAX, FAN_PWM_MIN, HEATER_PWM_MAX},
    control::calculate_fan_duty,
    types::{ControlState, OutputSnapshot},
};

/// Text content of the 128x64 status display: one row per menu item plus a
/// status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusScreen {
    pub rows: [String; 3],
    /// Row drawn inverted for the active menu item.
    pub highlighted: usize,
    pub status: String,
}

impl StatusScreen {
    pub fn render(state: &ControlState, outputs: &OutputSnapshot) -> Self {
        let (days, hours, minutes, seconds) = state.timer.remaining_parts();
        let rows = [
            format!(
                "{} / {}C",
                state.target_temperature,
                reading_text(state.sensor_valid, state.temperature)
            ),
            format!(
                "{} / {}%",
                state.target_humidity,
                reading_text(state.sensor_valid, state.humidity)
            ),
            format!("{days:02} {hours:02}:{minutes:02}:{seconds:02}"),
        ];

        // The fan figure is the curve without the drying boost.
        let fan_estimate = calculate_fan_duty(state, None, false);
        let fan = if fan_estimate > FAN_PWM_MIN {
            format!("{}%", percent(fan_estimate, FAN_PWM_MIN, FAN_PWM_MAX))
        } else {
            "SLOW".to_string()
        };
        let heater = if outputs.heater_duty > 0 {
            format!("{}%", percent(outputs.heater_duty, 0, HEATER_PWM_MAX))
        } else {
            "OFF".to_string()
        };

        let mut status = format!("F:{fan} H:{heater}");
        if let Some(on) = outputs.humidifier_on {
            status.push_str(if on { " V:ON" } else { " V:OFF" });
        }

        Self {
            rows,
            highlighted: state.menu.index(),
            status,
        }
    }
}

fn reading_text(valid: bool, value: Option<f32>) -> String {
    match value {
        Some(value) if valid => format!("{value:.1}"),
        _ => "--".to_string(),
    }
}

fn percent(value: u8, min: u8, max: u8) -> u32 {
    u32::from(value.saturating_sub(min)) * 100 / u32::from(max - min)
}
