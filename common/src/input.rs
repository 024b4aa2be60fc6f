use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::{
    config::{
        BUTTON_DEBOUNCE_MS, HUM_MAX, HUM_MIN, TEMP_MAX, TEMP_MIN, TIMER_MAX_SECS, TIMER_STEP_SECS,
    },
    timer::CountdownTimer,
    types::{ControlState, MenuSelection},
};

/// Rotation and click accumulator shared between the encoder interrupt and the
/// control loop. Each interrupt-side call is a single atomic write; the loop
/// drains both once per tick with [`EncoderCounter::take`].
#[derive(Debug, Default)]
pub struct EncoderCounter {
    steps: AtomicI32,
    clicked: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvents {
    pub rotation: i32,
    pub clicked: bool,
}

impl EncoderCounter {
    pub const fn new() -> Self {
        Self {
            steps: AtomicI32::new(0),
            clicked: AtomicBool::new(false),
        }
    }

    pub fn record_step(&self, delta: i32) {
        self.steps.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn record_click(&self) {
        self.clicked.store(true, Ordering::Relaxed);
    }

    pub fn take(&self) -> InputEvents {
        InputEvents {
            rotation: self.steps.swap(0, Ordering::AcqRel),
            clicked: self.clicked.swap(false, Ordering::AcqRel),
        }
    }
}

/// Side effects requested by the reducer, carried out by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEffect {
    SaveTemperatureTarget(i32),
    SaveHumidityTarget(i32),
    /// Re-range the encoder so its position tracks the newly selected value.
    ConfigureEncoder { min: i32, max: i32, value: i32 },
}

const TIMER_MAX_STEPS: i64 = (TIMER_MAX_SECS / TIMER_STEP_SECS) as i64;

/// Encoder position for the timer: the configured duration while running,
/// otherwise the pending remaining time.
fn timer_steps(timer: &CountdownTimer) -> i32 {
    let secs = if timer.running {
        timer.original_secs
    } else {
        timer.remaining_secs
    };
    (secs / TIMER_STEP_SECS) as i32
}

/// Apply encoder rotation to whichever value the menu has selected.
pub fn apply_rotation(
    state: &ControlState,
    delta: i32,
    now_ms: u64,
) -> (ControlState, Vec<InputEffect>) {
    let mut next = *state;
    let mut effects = Vec::new();
    if delta == 0 {
        return (next, effects);
    }

    match next.menu {
        MenuSelection::Temperature => {
            next.target_temperature = next
                .target_temperature
                .saturating_add(delta)
                .clamp(TEMP_MIN, TEMP_MAX);
            effects.push(InputEffect::SaveTemperatureTarget(next.target_temperature));
        }
        MenuSelection::Humidity => {
            next.target_humidity = next
                .target_humidity
                .saturating_add(delta)
                .clamp(HUM_MIN, HUM_MAX);
            effects.push(InputEffect::SaveHumidityTarget(next.target_humidity));
        }
        MenuSelection::Timer => {
            let steps = (i64::from(timer_steps(&next.timer)) + i64::from(delta))
                .clamp(0, TIMER_MAX_STEPS);
            let secs = steps as u32 * TIMER_STEP_SECS;
            next.timer.remaining_secs = secs;
            next.timer.original_secs = secs;
            if next.timer.running {
                next.timer.start_ms = now_ms;
            }
        }
    }

    (next, effects)
}

/// Advance the menu on a debounced click.
pub fn apply_click(state: &ControlState, now_ms: u64) -> (ControlState, Vec<InputEffect>) {
    let mut next = *state;
    let mut effects = Vec::new();

    if let Some(last) = next.last_input_event_ms {
        if now_ms.saturating_sub(last) <= BUTTON_DEBOUNCE_MS {
            return (next, effects);
        }
    }

    next.menu = next.menu.next();
    next.last_input_event_ms = Some(now_ms);

    let encoder = match next.menu {
        MenuSelection::Temperature => InputEffect::ConfigureEncoder {
            min: TEMP_MIN,
            max: TEMP_MAX,
            value: next.target_temperature,
        },
        MenuSelection::Humidity => InputEffect::ConfigureEncoder {
            min: HUM_MIN,
            max: HUM_MAX,
            value: next.target_humidity,
        },
        MenuSelection::Timer => {
            if next.timer.remaining_secs > 0 && !next.timer.running {
                next.timer = next.timer.start(next.timer.remaining_secs, now_ms);
            }
            InputEffect::ConfigureEncoder {
                min: 0,
                max: TIMER_MAX_STEPS as i32,
                value: timer_steps(&next.timer),
            }
        }
    };
    effects.push(encoder);

    (next, effects)
}

/// Rotation first, then the click, matching the order the encoder reports them.
pub fn reduce_input(
    state: &ControlState,
    events: InputEvents,
    now_ms: u64,
) -> (ControlState, Vec<InputEffect>) {
    let (rotated, mut effects) = apply_rotation(state, events.rotation, now_ms);
    if !events.clicked {
        return (rotated, effects);
    }

    let (clicked, mut click_effects) = apply_click(&rotated, now_ms);
    effects.append(&mut click_effects);
    (clicked, effects)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn counter_drains_once() {
        let counter = EncoderCounter::new();
        counter.record_step(1);
        counter.record_step(1);
        counter.record_step(-3);
        counter.record_click();

        assert_eq!(
            counter.take(),
            InputEvents {
                rotation: -1,
                clicked: true
            }
        );
        assert_eq!(counter.take(), InputEvents::default());
    }

    #[test]
    fn rotation_adjusts_and_saves_temperature() {
        let state = ControlState::default();
        let (next, effects) = apply_rotation(&state, 3, 0);

        assert_eq!(next.target_temperature, 13);
        assert_eq!(effects, vec![InputEffect::SaveTemperatureTarget(13)]);
    }

    #[test]
    fn rotation_clamps_to_range() {
        let mut state = ControlState::default();
        state.menu = MenuSelection::Humidity;
        let (next, effects) = apply_rotation(&state, 500, 0);

        assert_eq!(next.target_humidity, HUM_MAX);
        assert_eq!(effects, vec![InputEffect::SaveHumidityTarget(HUM_MAX)]);
    }

    #[test]
    fn zero_rotation_changes_nothing() {
        let state = ControlState::default();
        let (next, effects) = apply_rotation(&state, 0, 10);

        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn timer_rotation_uses_five_minute_steps() {
        let mut state = ControlState::default();
        state.menu = MenuSelection::Timer;
        let (next, effects) = apply_rotation(&state, 2, 0);

        assert_eq!(next.timer.remaining_secs, 600);
        assert_eq!(next.timer.original_secs, 600);
        assert!(!next.timer.running);
        assert!(effects.is_empty());

        let (lower, _) = apply_rotation(&next, -5, 0);
        assert_eq!(lower.timer.remaining_secs, 0);
    }

    #[test]
    fn timer_rotation_restarts_running_timer() {
        let mut state = ControlState::default();
        state.menu = MenuSelection::Timer;
        state.timer = state.timer.start(900, 1_000);

        let (next, _) = apply_rotation(&state, 1, 50_000);
        assert_eq!(next.timer.original_secs, 1_200);
        assert_eq!(next.timer.start_ms, 50_000);
        assert!(next.timer.running);
    }

    #[test]
    fn timer_rotation_steps_from_configured_duration() {
        let mut state = ControlState::default();
        state.menu = MenuSelection::Humidity;
        state.timer.remaining_secs = 1_800;

        let (entered, effects) = apply_click(&state, 1_000);
        assert_eq!(
            effects,
            vec![InputEffect::ConfigureEncoder {
                min: 0,
                max: 3_333,
                value: 6
            }]
        );

        let mut counting = entered;
        counting.timer = counting.timer.update(602_000);
        assert_eq!(counting.timer.remaining_secs, 1_199);

        let (next, _) = apply_rotation(&counting, 1, 602_000);
        assert_eq!(next.timer.original_secs, 2_100);
        assert_eq!(next.timer.remaining_secs, 2_100);
        assert_eq!(next.timer.start_ms, 602_000);
        assert!(next.timer.running);
    }

    #[test]
    fn reentering_timer_menu_reports_configured_duration() {
        let mut state = ControlState::default();
        state.menu = MenuSelection::Humidity;
        state.timer = state.timer.start(900, 0).update(100_000);

        let (_, effects) = apply_click(&state, 100_000);
        assert_eq!(
            effects,
            vec![InputEffect::ConfigureEncoder {
                min: 0,
                max: 3_333,
                value: 3
            }]
        );
    }

    #[test]
    fn click_cycles_menu_and_reranges_encoder() {
        let state = ControlState::default();

        let (humidity, effects) = apply_click(&state, 1_000);
        assert_eq!(humidity.menu, MenuSelection::Humidity);
        assert_eq!(
            effects,
            vec![InputEffect::ConfigureEncoder {
                min: HUM_MIN,
                max: HUM_MAX,
                value: 50
            }]
        );

        let (timer, effects) = apply_click(&humidity, 2_000);
        assert_eq!(timer.menu, MenuSelection::Timer);
        assert_eq!(
            effects,
            vec![InputEffect::ConfigureEncoder {
                min: 0,
                max: 3_333,
                value: 0
            }]
        );

        let (temperature, effects) = apply_click(&timer, 3_000);
        assert_eq!(temperature.menu, MenuSelection::Temperature);
        assert_eq!(
            effects,
            vec![InputEffect::ConfigureEncoder {
                min: TEMP_MIN,
                max: TEMP_MAX,
                value: 10
            }]
        );
    }

    #[test]
    fn click_is_debounced() {
        let (first, _) = apply_click(&ControlState::default(), 1_000);
        let (bounced, effects) = apply_click(&first, 1_050);

        assert_eq!(bounced.menu, MenuSelection::Humidity);
        assert!(effects.is_empty());

        let (accepted, _) = apply_click(&first, 1_051);
        assert_eq!(accepted.menu, MenuSelection::Timer);
    }

    #[test]
    fn entering_timer_menu_starts_pending_timer() {
        let mut state = ControlState::default();
        state.menu = MenuSelection::Humidity;
        state.timer.remaining_secs = 1_800;

        let (next, _) = apply_click(&state, 7_000);
        assert!(next.timer.running);
        assert_eq!(next.timer.original_secs, 1_800);
        assert_eq!(next.timer.start_ms, 7_000);
    }

    #[test]
    fn rotation_applies_before_click() {
        let events = InputEvents {
            rotation: -2,
            clicked: true,
        };
        let (next, effects) = reduce_input(&ControlState::default(), events, 500);

        assert_eq!(next.target_temperature, 8);
        assert_eq!(next.menu, MenuSelection::Humidity);
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], InputEffect::SaveTemperatureTarget(8));
    }
}
