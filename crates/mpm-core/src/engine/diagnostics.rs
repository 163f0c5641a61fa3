use crate::core::models::particle::ParticleSet;
use crate::engine::config::SimulationConfig;
use nalgebra::Vector3;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// A kind of numerical trouble visible in [`Diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StabilityWarning {
    NonFinite,
    CflExceeded,
    VolumeCollapse,
}

impl fmt::Display for StabilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NonFinite => "non-finite particle state; the simulation has diverged",
            Self::CflExceeded => "particles move more than one cell per substep",
            Self::VolumeCollapse => "particle volume ratio is no longer positive",
        };
        f.write_str(text)
    }
}

/// Aggregate particle state, used to watch for conservation drift and numerical blow-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    pub particle_count: usize,
    pub total_momentum: Vector3<f64>,
    pub kinetic_energy: f64,
    pub max_speed: f32,
    /// Range of `J` over finite particles; `None` when no particle is finite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_volume_change: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_volume_change: Option<f32>,
    /// Particles with a NaN or infinite component anywhere in their state.
    pub non_finite: usize,
    /// Largest distance a particle travels in one substep, in cells.
    pub max_cells_per_substep: f32,
}

impl Diagnostics {
    /// Scans every particle. Non-finite particles are counted but left out of the sums.
    pub fn collect(particles: &ParticleSet, config: &SimulationConfig) -> Self {
        let mass = config.material.particle_mass as f64;
        let mut total_momentum = Vector3::<f64>::zeros();
        let mut kinetic_energy = 0.0;
        let mut max_speed = 0.0f32;
        let mut volume_range: Option<(f32, f32)> = None;
        let mut non_finite = 0;

        for particle in particles.iter() {
            if !particle.is_finite() {
                non_finite += 1;
                continue;
            }
            let velocity = particle.velocity.cast::<f64>();
            total_momentum += velocity * mass;
            kinetic_energy += 0.5 * mass * velocity.norm_squared();
            max_speed = max_speed.max(particle.velocity.norm());
            let j = particle.volume_change;
            volume_range = Some(match volume_range {
                Some((lo, hi)) => (lo.min(j), hi.max(j)),
                None => (j, j),
            });
        }

        Self {
            particle_count: particles.len(),
            total_momentum,
            kinetic_energy,
            max_speed,
            min_volume_change: volume_range.map(|(lo, _)| lo),
            max_volume_change: volume_range.map(|(_, hi)| hi),
            non_finite,
            max_cells_per_substep: max_speed * config.time.dt * config.inv_dx(),
        }
    }

    /// True if some particle crosses more than one cell per substep.
    pub fn exceeds_cfl(&self) -> bool {
        self.max_cells_per_substep > 1.0
    }

    pub fn is_healthy(&self) -> bool {
        self.non_finite == 0 && !self.exceeds_cfl()
    }

    /// Every stability problem present in this snapshot.
    pub fn warnings(&self) -> Vec<StabilityWarning> {
        let mut warnings = Vec::new();
        if self.non_finite > 0 {
            warnings.push(StabilityWarning::NonFinite);
        }
        if self.exceeds_cfl() {
            warnings.push(StabilityWarning::CflExceeded);
        }
        if self.min_volume_change.is_some_and(|j| j <= 0.0) {
            warnings.push(StabilityWarning::VolumeCollapse);
        }
        warnings
    }

    pub fn log_warnings(&self, frame: usize) {
        for warning in self.warnings() {
            match warning {
                StabilityWarning::NonFinite => warn!(
                    frame,
                    non_finite = self.non_finite,
                    particles = self.particle_count,
                    "Non-finite particle state detected; the simulation has diverged."
                ),
                StabilityWarning::CflExceeded => warn!(
                    frame,
                    max_speed = self.max_speed,
                    cells_per_substep = self.max_cells_per_substep,
                    "Particles move more than one cell per substep; reduce dt or stiffness."
                ),
                StabilityWarning::VolumeCollapse => warn!(
                    frame,
                    min_volume_change = ?self.min_volume_change,
                    "Particle volume ratio is no longer positive."
                ),
            }
        }
    }
}
