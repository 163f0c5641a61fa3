use crate::core::io::traits::FrameSink;
use crate::engine::config::SimulationConfig;
use crate::engine::diagnostics::{Diagnostics, StabilityWarning};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::simulation::Simulation;
use crate::engine::timing::Phase;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub frames: usize,
    pub substeps: u64,
    /// Simulated time in seconds.
    pub simulated_time: f64,
    pub wall_time_secs: f64,
    pub dropped_contributions: u64,
    pub phase_secs: PhaseSeconds,
    pub final_state: Diagnostics,
}

/// Wall-clock seconds spent in each substep phase over the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseSeconds {
    pub clear: f64,
    pub p2g: f64,
    pub grid_solve: f64,
    pub g2p: f64,
}

impl PhaseSeconds {
    fn add(&mut self, phase: Phase, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        match phase {
            Phase::ClearGrid => self.clear += secs,
            Phase::ParticleToGrid => self.p2g += secs,
            Phase::GridSolve => self.grid_solve += secs,
            Phase::GridToParticle => self.g2p += secs,
        }
    }
}

/// Samples the initial state from `config` and runs every configured frame.
///
/// After each frame the current particle positions are handed to `sink` under the frame's
/// zero-based index.
///
/// # Errors
///
/// Returns [`EngineError::FrameOutput`] if the sink fails; frames already written are kept.
#[instrument(skip_all, name = "simulation_workflow")]
pub fn run<S: FrameSink>(
    config: &SimulationConfig,
    sink: &mut S,
    reporter: &ProgressReporter,
) -> Result<SimulationSummary, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Initialization",
    });
    info!(
        resolution = config.grid.resolution,
        particles = config.particle_count(),
        dt = config.time.dt,
        substeps_per_frame = config.time.substeps_per_frame,
        frames = config.time.frames,
        "Initializing simulation."
    );
    let mut simulation = Simulation::new(*config);
    reporter.report(Progress::PhaseFinish);

    run_frames(&mut simulation, config.time.frames, sink, reporter)
}

/// Advances an existing simulation by `frames` frames, writing each one to `sink`.
///
/// The first frame showing each kind of [`StabilityWarning`] is also reported as a
/// [`Progress::Message`]; later frames only log it.
#[instrument(skip_all, name = "frame_loop", fields(frames = frames))]
pub fn run_frames<S: FrameSink>(
    simulation: &mut Simulation,
    frames: usize,
    sink: &mut S,
    reporter: &ProgressReporter,
) -> Result<SimulationSummary, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Simulation" });
    reporter.report(Progress::TaskStart {
        total_steps: frames as u64,
    });

    let started = Instant::now();
    let substeps_before = simulation.substeps_run();
    let dropped_before = simulation.dropped_contributions();
    let mut phase_secs = PhaseSeconds::default();
    let mut reported: Vec<StabilityWarning> = Vec::new();

    for _ in 0..frames {
        let frame = simulation.advance_frame();

        let timings = simulation.take_timings();
        timings.log(frame);
        for phase in Phase::ALL {
            phase_secs.add(phase, timings.get(phase));
        }

        let diagnostics = Diagnostics::collect(simulation.particles(), simulation.config());
        diagnostics.log_warnings(frame);
        for warning in diagnostics.warnings() {
            if !reported.contains(&warning) {
                reported.push(warning);
                reporter.report(Progress::Message(format!("frame {:04}: {}", frame, warning)));
            }
        }
        debug!(
            frame,
            max_speed = diagnostics.max_speed,
            kinetic_energy = diagnostics.kinetic_energy,
            min_volume_change = ?diagnostics.min_volume_change,
            max_volume_change = ?diagnostics.max_volume_change,
            "Frame complete."
        );

        sink.write_frame(frame, &simulation.positions())
            .map_err(|e| EngineError::FrameOutput {
                frame,
                source: Box::new(e),
            })?;

        reporter.report(Progress::FrameComplete {
            frame,
            max_speed: diagnostics.max_speed,
        });
        reporter.report(Progress::TaskIncrement);
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let summary = SimulationSummary {
        frames,
        substeps: simulation.substeps_run() - substeps_before,
        simulated_time: simulation.elapsed_time(),
        wall_time_secs: started.elapsed().as_secs_f64(),
        dropped_contributions: simulation.dropped_contributions() - dropped_before,
        phase_secs,
        final_state: Diagnostics::collect(simulation.particles(), simulation.config()),
    };

    info!(
        frames = summary.frames,
        substeps = summary.substeps,
        wall_time_secs = summary.wall_time_secs,
        "Simulation complete."
    );
    Ok(summary)
}
