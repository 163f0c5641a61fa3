use nalgebra::{Matrix3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// State carried by one material point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// World position; nominally inside the unit cube, never clamped.
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    /// APIC affine velocity matrix `C`, rebuilt by every grid-to-particle transfer.
    pub affine_velocity: Matrix3<f32>,
    /// Ratio of current to rest volume (`J`). Multiplicatively updated, not guarded.
    pub volume_change: f32,
}

impl Particle {
    pub fn new(position: Vector3<f32>, velocity: Vector3<f32>) -> Self {
        Self {
            position,
            velocity,
            affine_velocity: Matrix3::zeros(),
            volume_change: 1.0,
        }
    }

    pub fn at_rest(position: Vector3<f32>) -> Self {
        Self::new(position, Vector3::zeros())
    }

    /// Whether every component of the particle's state is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.velocity.iter().all(|c| c.is_finite())
            && self.affine_velocity.iter().all(|c| c.is_finite())
            && self.volume_change.is_finite()
    }
}

/// Axis-aligned box from which initial particle positions are drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingRegion {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl SamplingRegion {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(self.max.iter()).any(|(lo, hi)| lo >= hi)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Whether the box lies inside `[lower, upper]` on every axis.
    pub fn is_within(&self, lower: f32, upper: f32) -> bool {
        self.min.iter().all(|&c| c >= lower) && self.max.iter().all(|&c| c <= upper)
    }
}

/// Recipe for the particle set's starting state, replayed on every restart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialDistribution {
    pub count: usize,
    pub region: SamplingRegion,
    pub velocity: Vector3<f32>,
    pub seed: u64,
}

/// Fixed-size collection of particles. Particles are never created or destroyed after
/// construction; [`ParticleSet::reset`] rewrites all of them in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    pub fn sample(distribution: &InitialDistribution) -> Self {
        let mut set = Self {
            particles: vec![Particle::at_rest(Vector3::zeros()); distribution.count],
        };
        set.reset(distribution);
        set
    }

    /// Restores every particle to the initial distribution.
    ///
    /// The generator is re-seeded from `distribution.seed`, so repeated resets reproduce the
    /// same positions. The particle count is left unchanged.
    pub fn reset(&mut self, distribution: &InitialDistribution) {
        let mut rng = StdRng::seed_from_u64(distribution.seed);
        let region = distribution.region;
        let extent = region.extent();

        for particle in &mut self.particles {
            let u = Vector3::new(
                rng.gen_range(0.0..1.0f32),
                rng.gen_range(0.0..1.0f32),
                rng.gen_range(0.0..1.0f32),
            );
            *particle = Particle::new(region.min + extent.component_mul(&u), distribution.velocity);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Copies out the current positions as points, in particle index order.
    pub fn positions(&self) -> Vec<Point3<f32>> {
        self.particles.iter().map(|p| Point3::from(p.position)).collect()
    }
}
