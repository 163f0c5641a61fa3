use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ClearGrid,
    ParticleToGrid,
    GridSolve,
    GridToParticle,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::ClearGrid,
        Phase::ParticleToGrid,
        Phase::GridSolve,
        Phase::GridToParticle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Phase::ClearGrid => "clear",
            Phase::ParticleToGrid => "p2g",
            Phase::GridSolve => "grid_solve",
            Phase::GridToParticle => "g2p",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Wall-clock time accumulated per substep phase since the last reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseTimings {
    elapsed: [Duration; 4],
    substeps: u64,
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f`, charging its wall-clock time to `phase`.
    #[inline]
    pub fn measure<T>(&mut self, phase: Phase, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    #[inline]
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        self.elapsed[phase.slot()] += elapsed;
    }

    pub fn finish_substep(&mut self) {
        self.substeps += 1;
    }

    pub fn get(&self, phase: Phase) -> Duration {
        self.elapsed[phase.slot()]
    }

    pub fn total(&self) -> Duration {
        self.elapsed.iter().sum()
    }

    pub fn substeps(&self) -> u64 {
        self.substeps
    }

    /// Mean wall-clock time per substep for `phase`, or zero if nothing was recorded.
    pub fn mean(&self, phase: Phase) -> Duration {
        match u32::try_from(self.substeps) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.get(phase) / n,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn log(&self, frame: usize) {
        debug!(
            frame,
            substeps = self.substeps,
            clear_ms = as_millis(self.get(Phase::ClearGrid)),
            p2g_ms = as_millis(self.get(Phase::ParticleToGrid)),
            grid_solve_ms = as_millis(self.get(Phase::GridSolve)),
            g2p_ms = as_millis(self.get(Phase::GridToParticle)),
            "Frame phase timings."
        );
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}
