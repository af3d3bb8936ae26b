use crate::domain::models::{TimerState, DEFAULT_BREAK_SECONDS, DEFAULT_FOCUS_SECONDS};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDurations {
    pub focus_seconds: u32,
    pub break_seconds: u32,
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self {
            focus_seconds: DEFAULT_FOCUS_SECONDS,
            break_seconds: DEFAULT_BREAK_SECONDS,
        }
    }
}

impl TimerDurations {
    pub fn for_phase(&self, phase: TimerPhase) -> u32 {
        match phase {
            TimerPhase::Focus => self.focus_seconds,
            TimerPhase::Break => self.break_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Focus,
    Break,
}

impl TimerPhase {
    pub fn other(self) -> Self {
        match self {
            Self::Focus => Self::Break,
            Self::Break => Self::Focus,
        }
    }
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickOutcome {
    /// Focus seconds to report upward, 0 or 1.
    pub focus_seconds: u32,
    /// Phase that just ran out, if any.
    pub completed: Option<TimerPhase>,
}

impl TimerState {
    pub fn phase(&self) -> TimerPhase {
        if self.is_break {
            TimerPhase::Break
        } else {
            TimerPhase::Focus
        }
    }

    /// Advances a running timer by one second. A countdown that reaches zero
    /// expires within the same tick; a running timer already at zero expires
    /// without counting a second.
    pub fn tick(&mut self, durations: &TimerDurations) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.is_running {
            return outcome;
        }

        if self.time_left > 0 {
            self.time_left -= 1;
            if !self.is_break {
                outcome.focus_seconds = 1;
            }
        }

        if self.time_left == 0 {
            outcome.completed = Some(self.expire(durations));
        }
        outcome
    }

    fn expire(&mut self, durations: &TimerDurations) -> TimerPhase {
        let finished = self.phase();
        if finished == TimerPhase::Focus {
            self.sessions_completed = self.sessions_completed.saturating_add(1);
        }
        self.enter_phase(finished.other(), durations);
        finished
    }

    fn enter_phase(&mut self, phase: TimerPhase, durations: &TimerDurations) {
        self.is_running = false;
        self.is_break = phase == TimerPhase::Break;
        self.time_left = durations.for_phase(phase);
    }

    /// Returns whether anything changed.
    pub fn start(&mut self) -> bool {
        let changed = !self.is_running;
        self.is_running = true;
        changed
    }

    pub fn pause(&mut self) {
        self.is_running = false;
    }

    pub fn reset(&mut self, durations: &TimerDurations) {
        self.is_running = false;
        self.time_left = durations.for_phase(self.phase());
    }

    /// Jumps to the other phase. Leaving a focus phase counts as a session.
    pub fn skip(&mut self, durations: &TimerDurations) -> TimerPhase {
        let skipped = self.phase();
        if skipped == TimerPhase::Focus {
            self.sessions_completed = self.sessions_completed.saturating_add(1);
        }
        self.enter_phase(skipped.other(), durations);
        skipped
    }
}
