//! Wipe feedback particles and brush trail
//!
//! Purely cosmetic. Particles live in a fixed-capacity slot arena with a free
//! list, so the live count has a hard bound and spawning never reallocates.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;

/// Particle kinds, each with its own physics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Soap foam: drifts, shrinks and fades
    Foam,
    /// Water streak: falls and accelerates
    Water,
    /// Glint: stays put and fades fast
    Sparkle,
    /// Dirt flake (Grime preset): falls under gravity
    Grime,
}

impl ParticleKind {
    /// Life lost per frame
    pub fn decay(&self) -> f32 {
        match self {
            ParticleKind::Foam => 0.02,
            ParticleKind::Water => 0.015,
            ParticleKind::Sparkle => 0.05,
            ParticleKind::Grime => 0.012,
        }
    }
}

/// A single particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    /// Pixels per frame
    pub vel: Vec2,
    /// Remaining life, 0 < life <= max_life while alive
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    pub kind: ParticleKind,
    pub color: Option<[u8; 3]>,
}

impl Particle {
    /// Remaining life as a fraction (drives opacity)
    pub fn opacity(&self) -> f32 {
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Advance one frame. Returns false once the particle should be removed.
    fn step(&mut self, viewport_height: f32) -> bool {
        self.pos += self.vel;
        match self.kind {
            ParticleKind::Foam => self.size *= 0.98,
            ParticleKind::Water => self.vel.y *= 1.05,
            ParticleKind::Sparkle => {}
            ParticleKind::Grime => self.vel.y += 0.15,
        }
        self.life -= self.kind.decay();

        let off_bottom = self.pos.y - self.size > viewport_height;
        let off_top = self.pos.y + self.size < 0.0;
        self.life > 0.0 && !off_bottom && !off_top
    }
}

/// Stable reference to an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    particle: Option<Particle>,
}

/// Fixed-capacity particle storage with generation-checked handles
#[derive(Debug, Clone)]
pub struct ParticleArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ParticleArena {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                particle: None,
            })
            .collect();
        // Pop order hands out low indices first
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Store a particle; `None` when the arena is full
    pub fn insert(&mut self, particle: Particle) -> Option<ParticleHandle> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.particle = Some(particle);
        self.live += 1;
        Some(ParticleHandle {
            index,
            generation: slot.generation,
        })
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.particle.as_ref()
    }

    pub fn remove(&mut self, handle: ParticleHandle) -> Option<Particle> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let particle = slot.particle.take()?;
        self.release(handle.index);
        Some(particle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().filter_map(|s| s.particle.as_ref())
    }

    /// Keep only particles for which `keep` returns true
    pub fn retain_mut(&mut self, mut keep: impl FnMut(&mut Particle) -> bool) {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            let Some(particle) = slot.particle.as_mut() else {
                continue;
            };
            if !keep(particle) {
                slot.particle = None;
                self.release(index as u32);
            }
        }
    }

    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].particle.take().is_some() {
                self.release(index as u32);
            }
        }
    }

    fn release(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
    }
}

/// Soft glow left behind the brush
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub pos: Vec2,
    /// 1.0 when fresh, removed at 0
    pub age: f32,
    pub size: f32,
}

/// Trail age lost per frame
pub const TRAIL_DECAY: f32 = 0.03;

/// Particles, trail and the RNG that drives spawning
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    arena: ParticleArena,
    trail: Vec<TrailPoint>,
    trail_capacity: usize,
    rng: Pcg32,
    /// Shed dirt flakes as well as foam/water/sparkle
    pub grime: bool,
}

impl ParticleSystem {
    pub fn new(max_particles: usize, seed: u64) -> Self {
        let max_particles = max_particles.min(MAX_PARTICLES);
        Self {
            arena: ParticleArena::with_capacity(max_particles),
            trail: Vec::with_capacity(MAX_TRAIL_POINTS),
            trail_capacity: MAX_TRAIL_POINTS,
            rng: Pcg32::seed_from_u64(seed),
            grime: false,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.arena.iter()
    }

    pub fn trail(&self) -> &[TrailPoint] {
        &self.trail
    }

    /// Spawn intensity for a cursor that travelled `travel` pixels this frame
    pub fn intensity_for_travel(travel: f32) -> f32 {
        (travel / 10.0).clamp(0.0, MAX_SPAWN_INTENSITY)
    }

    /// Scatter wipe particles around `pos`.
    ///
    /// `intensity` scales the foam count and is clamped to `MAX_SPAWN_INTENSITY`.
    /// Spawns stop silently once the arena is full. Returns how many were created.
    pub fn spawn(&mut self, pos: Vec2, intensity: f32, brush_size: f32) -> usize {
        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, MAX_SPAWN_INTENSITY)
        } else {
            0.0
        };
        let mut spawned = 0;

        if self.rng.random::<f32>() > 0.4 {
            let p = Particle {
                pos: pos + self.jitter(brush_size * 0.8),
                vel: Vec2::new(0.0, self.rng.random_range(2.0..5.0)),
                life: 1.0,
                max_life: 1.0,
                size: self.rng.random_range(2.0..5.0),
                kind: ParticleKind::Water,
                color: None,
            };
            spawned += self.push(p);
        }

        let foam = intensity.ceil() as usize;
        for _ in 0..foam {
            let p = Particle {
                pos: pos + self.jitter(brush_size),
                vel: Vec2::new(
                    (self.rng.random::<f32>() - 0.5) * 0.5,
                    (self.rng.random::<f32>() - 0.5) * 0.5 - 0.2,
                ),
                life: 1.0,
                max_life: 1.0,
                size: self.rng.random_range(2.0..12.0),
                kind: ParticleKind::Foam,
                color: None,
            };
            spawned += self.push(p);
        }

        if self.rng.random::<f32>() > 0.9 {
            let p = Particle {
                pos: pos + self.jitter(brush_size * 0.5),
                vel: Vec2::ZERO,
                life: 0.8,
                max_life: 0.8,
                size: self.rng.random_range(3.0..9.0),
                kind: ParticleKind::Sparkle,
                color: None,
            };
            spawned += self.push(p);
        }

        if self.grime && self.rng.random::<f32>() > 0.5 {
            let shade = self.rng.random_range(60u8..110);
            let p = Particle {
                pos: pos + self.jitter(brush_size * 0.7),
                vel: Vec2::new((self.rng.random::<f32>() - 0.5) * 1.5, self.rng.random_range(0.5..1.5)),
                life: 1.0,
                max_life: 1.0,
                size: self.rng.random_range(1.5..4.0),
                kind: ParticleKind::Grime,
                color: Some([shade + 40, shade + 20, shade]),
            };
            spawned += self.push(p);
        }

        spawned
    }

    /// Maybe drop a trail glow at `pos` (half the time)
    pub fn spawn_trail(&mut self, pos: Vec2, size: f32) {
        if self.rng.random::<f32>() <= 0.5 {
            return;
        }
        if self.trail.len() >= self.trail_capacity {
            self.trail.remove(0);
        }
        self.trail.push(TrailPoint {
            pos,
            age: 1.0,
            size,
        });
    }

    /// Advance one frame: integrate, apply per-kind physics, cull the dead and
    /// anything that left the viewport vertically.
    pub fn update(&mut self, viewport_height: f32) {
        for t in self.trail.iter_mut() {
            t.age -= TRAIL_DECAY;
        }
        self.trail.retain(|t| t.age > 0.0);

        self.arena.retain_mut(|p| p.step(viewport_height));
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.trail.clear();
    }

    fn push(&mut self, particle: Particle) -> usize {
        self.arena.insert(particle).map_or(0, |_| 1)
    }

    /// Uniform offset in a `spread`-wide square
    fn jitter(&mut self, spread: f32) -> Vec2 {
        Vec2::new(
            (self.rng.random::<f32>() - 0.5) * spread,
            (self.rng.random::<f32>() - 0.5) * spread,
        )
    }
}
