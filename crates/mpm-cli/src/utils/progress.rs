use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use mpm3d::engine::config::SimulationConfig;
use mpm3d::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Converts frame events into simulated time and per-substep travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    frame_duration: f64,
    cells_per_unit_speed: f32,
}

impl FrameClock {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            frame_duration: config.time.dt as f64 * config.time.substeps_per_frame as f64,
            cells_per_unit_speed: config.time.dt * config.inv_dx(),
        }
    }

    /// Simulated time at the end of the zero-based `frame`.
    pub fn time_after(&self, frame: usize) -> f64 {
        (frame + 1) as f64 * self.frame_duration
    }

    pub fn cells_per_substep(&self, max_speed: f32) -> f32 {
        max_speed * self.cells_per_unit_speed
    }

    pub fn status(&self, frame: usize, max_speed: f32) -> String {
        format!(
            "frame {:04} | t = {:.4} s | max |v| {:.3} ({:.2} cells/substep)",
            frame,
            self.time_after(frame),
            max_speed,
            self.cells_per_substep(max_speed)
        )
    }
}

struct RunDisplay {
    bar: ProgressBar,
    clock: FrameClock,
    phase: &'static str,
    last_frame: Option<usize>,
    warnings: Vec<String>,
}

impl RunDisplay {
    fn apply(&mut self, event: Progress) {
        match event {
            Progress::PhaseStart { name } => {
                self.phase = name;
                self.bar.reset();
                self.bar.set_length(0);
                self.bar.set_style(spinner_style());
                self.bar
                    .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                self.bar.set_message(name);
            }
            Progress::TaskStart { total_steps } => {
                self.bar.disable_steady_tick();
                self.bar.reset();
                self.bar.set_length(total_steps);
                self.bar.set_style(frame_bar_style());
                self.bar.set_message("starting");
            }
            Progress::FrameComplete { frame, max_speed } => {
                self.last_frame = Some(frame);
                self.bar.set_message(self.clock.status(frame, max_speed));
            }
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => {
                if let Some(length) = self.bar.length() {
                    self.bar.set_position(length);
                }
            }
            Progress::Message(msg) => {
                self.bar.println(format!("  ⚠ {}", msg));
                self.warnings.push(msg);
            }
            Progress::PhaseFinish => {
                self.bar.disable_steady_tick();
                let summary = self.finish_message();
                self.bar.finish_with_message(summary);
            }
        }
    }

    fn finish_message(&self) -> String {
        let Some(frame) = self.last_frame else {
            return format!("✓ {}", self.phase);
        };
        let mut message = format!(
            "✓ {} frames, t = {:.4} s",
            frame + 1,
            self.clock.time_after(frame)
        );
        match self.warnings.len() {
            0 => {}
            1 => message.push_str(" (1 stability warning)"),
            n => message.push_str(&format!(" ({} stability warnings)", n)),
        }
        message
    }
}

/// Renders a simulation run: a spinner while initializing, then a bar over frames whose
/// status line tracks simulated time and particle speed. Stability warnings are printed
/// above the bar as they first occur.
#[derive(Clone)]
pub struct FrameProgress {
    display: Arc<Mutex<RunDisplay>>,
}

impl FrameProgress {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_draw_target(config, ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(config: &SimulationConfig, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        Self {
            display: Arc::new(Mutex::new(RunDisplay {
                bar,
                clock: FrameClock::new(config),
                phase: "",
                last_frame: None,
                warnings: Vec::new(),
            })),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let display = self.display.clone();
        Box::new(move |event: Progress| match display.lock() {
            Ok(mut display) => display.apply(event),
            Err(_) => warn!("Progress display mutex was poisoned; dropping update."),
        })
    }

    /// Stability warnings received so far, in order.
    pub fn warnings(&self) -> Vec<String> {
        self.display
            .lock()
            .map(|display| display.warnings.clone())
            .unwrap_or_default()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn frame_bar_style() -> ProgressStyle {
    match ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} ({fps}, eta {eta}) {msg}",
    ) {
        Ok(style) => style
            .with_key(
                "fps",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1} frames/s", state.per_sec());
                },
            )
            .progress_chars("##-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpm3d::core::io::traits::NullSink;
    use mpm3d::core::models::particle::SamplingRegion;
    use mpm3d::engine::config::SimulationConfigBuilder;
    use mpm3d::engine::progress::ProgressReporter;
    use mpm3d::workflows::simulate;
    use nalgebra::Vector3;

    fn small_config(frames: usize) -> SimulationConfig {
        SimulationConfigBuilder::reference()
            .resolution(32)
            .grid_block_size(4)
            .particle_count(64)
            .particle_block_size(16)
            .substeps_per_frame(5)
            .frames(frames)
            .sampling_region(SamplingRegion::new(
                Vector3::repeat(0.3),
                Vector3::repeat(0.7),
            ))
            .build()
            .unwrap()
    }

    fn hidden(config: &SimulationConfig) -> FrameProgress {
        FrameProgress::with_draw_target(config, ProgressDrawTarget::hidden())
    }

    #[test]
    fn clock_converts_frames_to_simulated_time() {
        let clock = FrameClock::new(&SimulationConfigBuilder::reference().build().unwrap());
        assert!((clock.time_after(0) - 2e-3).abs() < 1e-9);
        assert!((clock.time_after(999) - 2.0).abs() < 1e-6);
        assert!((clock.cells_per_substep(0.3) - 0.00384).abs() < 1e-6);
        assert_eq!(
            clock.status(4, 1.5),
            "frame 0004 | t = 0.0100 s | max |v| 1.500 (0.02 cells/substep)"
        );
    }

    #[test]
    fn bar_follows_a_real_run_to_completion() {
        let config = small_config(3);
        let progress = hidden(&config);
        let reporter = ProgressReporter::with_callback(progress.callback());

        simulate::run(&config, &mut NullSink, &reporter).unwrap();

        let display = progress.display.lock().unwrap();
        assert_eq!(display.bar.length(), Some(3));
        assert_eq!(display.bar.position(), 3);
        assert!(display.bar.is_finished());
        assert_eq!(display.last_frame, Some(2));
        assert_eq!(display.bar.message(), "✓ 3 frames, t = 0.0015 s");
        assert!(progress.warnings().is_empty());
    }

    #[test]
    fn frame_status_replaces_the_bar_message() {
        let config = small_config(10);
        let progress = hidden(&config);
        let callback = progress.callback();

        callback(Progress::PhaseStart { name: "Simulation" });
        callback(Progress::TaskStart { total_steps: 10 });
        callback(Progress::FrameComplete {
            frame: 0,
            max_speed: 0.3,
        });
        callback(Progress::TaskIncrement);

        let display = progress.display.lock().unwrap();
        assert_eq!(display.bar.position(), 1);
        assert!(display.bar.message().starts_with("frame 0000 | t = 0.0005 s"));
        assert!(!display.bar.is_finished());
    }

    #[test]
    fn stability_warnings_are_collected_and_counted() {
        let config = small_config(2);
        let progress = hidden(&config);
        let callback = progress.callback();

        callback(Progress::PhaseStart { name: "Simulation" });
        callback(Progress::TaskStart { total_steps: 2 });
        callback(Progress::Message("frame 0000: non-finite particle state".into()));
        callback(Progress::FrameComplete {
            frame: 0,
            max_speed: 0.0,
        });
        callback(Progress::Message("frame 0001: particles move more than one cell".into()));
        callback(Progress::FrameComplete {
            frame: 1,
            max_speed: 0.0,
        });
        callback(Progress::TaskFinish);
        callback(Progress::PhaseFinish);

        assert_eq!(progress.warnings().len(), 2);
        let display = progress.display.lock().unwrap();
        assert_eq!(
            display.bar.message(),
            "✓ 2 frames, t = 0.0010 s (2 stability warnings)"
        );
    }

    #[test]
    fn phase_without_frames_finishes_with_its_name() {
        let config = small_config(1);
        let progress = hidden(&config);
        let callback = progress.callback();

        callback(Progress::PhaseStart {
            name: "Initialization",
        });
        callback(Progress::PhaseFinish);

        let display = progress.display.lock().unwrap();
        assert!(display.bar.is_finished());
        assert_eq!(display.bar.message(), "✓ Initialization");
    }
}
