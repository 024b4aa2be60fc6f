#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
        }
    }
}

/// Countdown recomputed from absolute elapsed time on every update, so uneven
/// tick spacing never accumulates into drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountdownTimer {
    pub remaining_secs: u32,
    pub original_secs: u32,
    pub running: bool,
    pub start_ms: u64,
}

impl CountdownTimer {
    pub fn phase(&self) -> TimerPhase {
        if self.running {
            TimerPhase::Running
        } else {
            TimerPhase::Idle
        }
    }

    /// Begin counting down `duration_secs` from `now_ms`.
    #[must_use]
    pub fn start(&self, duration_secs: u32, now_ms: u64) -> Self {
        Self {
            remaining_secs: duration_secs,
            original_secs: duration_secs,
            running: true,
            start_ms: now_ms,
        }
    }

    #[must_use]
    pub fn update(&self, now_ms: u64) -> Self {
        let mut next = *self;
        if !next.running {
            return next;
        }

        let elapsed_secs = now_ms.saturating_sub(next.start_ms) / 1_000;
        if elapsed_secs >= u64::from(next.original_secs) {
            next.remaining_secs = 0;
            next.running = false;
        } else if next.remaining_secs == 0 {
            // Running with nothing left means something zeroed it from outside.
            next.running = false;
        } else {
            next.remaining_secs = next.original_secs - elapsed_secs as u32;
        }
        next
    }

    /// `(days, hours, minutes, seconds)` of the remaining time.
    pub fn remaining_parts(&self) -> (u32, u32, u32, u32) {
        let total = self.remaining_secs;
        (
            total / 86_400,
            (total % 86_400) / 3_600,
            (total % 3_600) / 60,
            total % 60,
        )
    }
}
