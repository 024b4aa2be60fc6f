//! Time-sliced software PWM.
//!
//! Each channel is level-triggered against absolute time: a late tick lands in
//! whatever cycle it falls into and at most one new cycle is started per
//! update, so missed ticks cost jitter but never a burst of catch-up cycles.

use crate::config::{soft_pwm_period_ms, FAN_KICK_START_DURATION_MS, FAN_PWM_START};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KickStart {
    motor_running: bool,
    motor_start_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmChannel {
    cycle_start_ms: u64,
    period_ms: u64,
    output_on: bool,
    effective_duty: u8,
    kick: Option<KickStart>,
}

impl PwmChannel {
    /// Plain channel, used for the heater.
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        Self {
            cycle_start_ms: now_ms,
            period_ms: period_ms.max(1),
            output_on: false,
            effective_duty: 0,
            kick: None,
        }
    }

    /// Channel driving a motor that needs `FAN_PWM_START` for
    /// `FAN_KICK_START_DURATION_MS` whenever it starts from standstill.
    pub fn with_kick_start(period_ms: u64, now_ms: u64) -> Self {
        Self {
            kick: Some(KickStart {
                motor_running: false,
                motor_start_ms: now_ms,
            }),
            ..Self::new(period_ms, now_ms)
        }
    }

    pub fn fan(now_ms: u64) -> Self {
        Self::with_kick_start(soft_pwm_period_ms(), now_ms)
    }

    pub fn heater(now_ms: u64) -> Self {
        Self::new(soft_pwm_period_ms(), now_ms)
    }

    pub fn output_on(&self) -> bool {
        self.output_on
    }

    /// Duty actually applied on the last update, after any kick-start substitution.
    pub fn effective_duty(&self) -> u8 {
        self.effective_duty
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn cycle_start_ms(&self) -> u64 {
        self.cycle_start_ms
    }

    /// Advance to `now_ms` with the requested `duty` (0..=255).
    #[must_use]
    pub fn advance(&self, duty: u8, now_ms: u64) -> Self {
        let mut next = *self;

        let mut elapsed = now_ms.saturating_sub(next.cycle_start_ms);
        if elapsed >= next.period_ms {
            next.cycle_start_ms = now_ms;
            elapsed = 0;
        }

        next.effective_duty = duty;
        if let Some(kick) = next.kick.as_mut() {
            if duty == 0 {
                kick.motor_running = false;
            } else {
                if !kick.motor_running {
                    kick.motor_running = true;
                    kick.motor_start_ms = now_ms;
                }
                if now_ms.saturating_sub(kick.motor_start_ms) < FAN_KICK_START_DURATION_MS {
                    next.effective_duty = FAN_PWM_START;
                }
            }
        }

        let on_time = u64::from(next.effective_duty) * next.period_ms / 255;
        next.output_on = elapsed < on_time;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_duty_is_on_for_half_the_period() {
        let mut channel = PwmChannel::new(100, 0);
        let mut on_samples = 0;
        for now in 0..100 {
            channel = channel.advance(128, now);
            if channel.output_on() {
                on_samples += 1;
            }
            assert_eq!(channel.cycle_start_ms(), 0);
        }
        assert!((49..=51).contains(&on_samples), "on for {on_samples}");

        channel = channel.advance(128, 100);
        assert_eq!(channel.cycle_start_ms(), 100);
        assert!(channel.output_on());
    }

    #[test]
    fn zero_and_full_duty() {
        let mut off = PwmChannel::new(100, 0);
        let mut full = PwmChannel::new(100, 0);
        for now in 0..250 {
            off = off.advance(0, now);
            full = full.advance(255, now);
            assert!(!off.output_on());
            assert!(full.output_on());
        }
    }

    #[test]
    fn late_tick_starts_exactly_one_cycle() {
        let channel = PwmChannel::new(100, 0).advance(200, 10);

        // Five periods go by without a tick.
        let late = channel.advance(200, 537);
        assert_eq!(late.cycle_start_ms(), 537);
        assert!(late.output_on());

        let next = late.advance(200, 600);
        assert_eq!(next.cycle_start_ms(), 537);
    }

    #[test]
    fn heater_channel_has_no_kick() {
        let channel = PwmChannel::new(100, 0).advance(20, 0);
        assert_eq!(channel.effective_duty(), 20);
    }

    #[test]
    fn fan_kick_starts_from_standstill() {
        let start = 1_000;
        let mut fan = PwmChannel::with_kick_start(100, 0);
        for now in 0..start {
            fan = fan.advance(0, now);
            assert_eq!(fan.effective_duty(), 0);
        }

        for now in start..start + FAN_KICK_START_DURATION_MS {
            fan = fan.advance(40, now);
            assert_eq!(fan.effective_duty(), FAN_PWM_START, "at {now}");
        }

        fan = fan.advance(40, start + FAN_KICK_START_DURATION_MS);
        assert_eq!(fan.effective_duty(), 40);
    }

    #[test]
    fn fan_kick_repeats_after_stop() {
        let fan = PwmChannel::with_kick_start(100, 0)
            .advance(60, 0)
            .advance(60, 2_000);
        assert_eq!(fan.effective_duty(), 60);

        let restarted = fan.advance(0, 2_001).advance(60, 2_002);
        assert_eq!(restarted.effective_duty(), FAN_PWM_START);
    }

    #[test]
    fn default_period_follows_frequency() {
        assert_eq!(PwmChannel::fan(0).period_ms(), 4);
        assert_eq!(PwmChannel::heater(0).period_ms(), 4);
    }
}
