use std::time::{Duration, Instant};

/// Progress of one anti-entropy round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    RoundStarted,
    DigestsExchanged,
    Pruned,
    BundlesBuilt,
    Merged,
}

/// Per-engine round bookkeeping: when the round started, when it must be done
/// by, and whether the last round went stale.
#[derive(Debug, Clone)]
pub struct RoundState {
    phase: RoundPhase,
    started: Option<Instant>,
    deadline: Option<Instant>,
    budget: Duration,
    stale: bool,
}

impl RoundState {
    pub fn new(budget: Duration) -> Self {
        Self {
            phase: RoundPhase::Idle,
            started: None,
            deadline: None,
            budget,
            stale: false,
        }
    }

    /// Records the start time and the deadline `budget` later.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.started = Some(now);
        self.deadline = Some(now + self.budget);
        self.stale = false;
        self.phase = RoundPhase::RoundStarted;
    }

    pub fn advance(&mut self, phase: RoundPhase) {
        tracing::trace!("Round {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// True once the deadline has passed; raises the staleness flag.
    pub fn times_up(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.stale = true;
                true
            }
            _ => false,
        }
    }

    /// Completed round: back to idle.
    pub fn finish(&mut self) {
        self.phase = RoundPhase::Idle;
    }

    /// Failed or timed out round: discard progress and flag it stale.
    pub fn abandon(&mut self) {
        self.phase = RoundPhase::Idle;
        self.stale = true;
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Time since the current or last round started.
    pub fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}
