//! `Propagator`: the hybrid Gillespie/Langevin time-stepping engine
//! (spec §4.6). Ported from
//! `original_source/include/filament-sliding/Propagator.hpp` and
//! `src/Propagator.cpp`.
//!
//! Each fixed macro step of length `time_step` runs:
//! 1. Recompute every reaction's `current_rate` from the live
//!    `SystemState`.
//! 2. Accumulate each reaction's `action += current_rate * time_step`.
//! 3. If the summed action has crossed the current
//!    `reaction_rate_threshold`, select which reaction fired
//!    (`reaction_to_happen`, a categorical draw over the 18 current
//!    rates) and `perform` it; otherwise no reaction occurs this step.
//! 4. Either way, advance the mobile filament deterministically plus a
//!    reflected Gaussian kick (`move_microtubule`), clamped strictly
//!    inside the `movement_borders` so no `Full` connection's
//!    extension can cross `max_stretch` (spec §4.1, §4.6).
//! 5. Refresh `force_microtubule`/`energy`, check for a barrier
//!    crossing, and record basin-of-attraction residency.

use crate::error::{FilamentSlidingError, Result};
use crate::math::{clamp_strictly_inside, next_after};
use crate::random::RandomGenerator;
use crate::reaction::Reaction;
use crate::system_state::SystemState;

/// Hard cap on the reflected-walk loop inside `move_microtubule`
/// (Open Question decision, `DESIGN.md`): exceeding it means the
/// Gaussian kick is absurdly large relative to the movement borders
/// and signals a misconfigured `time_step`/`diffusion_coefficient`,
/// not a transient fluke worth silently truncating.
pub const MAX_REFLECTIONS: u32 = 1000;

/// Half-width of the basin of attraction around each lattice position,
/// in units of the lattice spacing `delta` (spec §4.6).
pub const BASIN_HALF_WIDTH_FACTOR: f64 = 0.3;

/// One (head/tail) basin-of-attraction residency observation, handed
/// to a `TransitionPathRecorder` by the caller driving `Propagator`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasinCrossing {
    pub time: f64,
    pub entered_basin: bool,
}

pub struct Propagator {
    reactions: Vec<Box<dyn Reaction>>,
    diffusion_coefficient: f64,
    time_step: f64,
    time: f64,
    reaction_rate_threshold: f64,
    boundary_clamp_count: u64,
    reflection_count_last_step: u32,
}

impl Propagator {
    pub fn new(
        reactions: Vec<Box<dyn Reaction>>,
        diffusion_coefficient: f64,
        time_step: f64,
    ) -> Result<Self> {
        if reactions.len() != 18 {
            return Err(FilamentSlidingError::precondition(format!(
                "Propagator requires exactly 18 reaction instances (6 kinds x 3 types), got {}",
                reactions.len()
            )));
        }
        if time_step <= 0.0 {
            return Err(FilamentSlidingError::numeric(
                "time_step must be strictly positive",
            ));
        }
        Ok(Propagator {
            reactions,
            diffusion_coefficient,
            time_step,
            time: 0.0,
            reaction_rate_threshold: 0.0,
            boundary_clamp_count: 0,
            reflection_count_last_step: 0,
        })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn boundary_clamp_count(&self) -> u64 {
        self.boundary_clamp_count
    }

    /// `setNewReactionRateThreshold`: draw a fresh exponential waiting
    /// time for the next reaction, `-ln(U) / time_step`, and reset
    /// every reaction's accumulated action.
    fn set_new_reaction_rate_threshold(&mut self, rng: &mut RandomGenerator) {
        let u = rng.probability();
        self.reaction_rate_threshold = -u.ln() / self.time_step;
        for r in &mut self.reactions {
            r.reset_action();
        }
    }

    /// Recomputes every reaction's `current_rate` from `state`.
    fn update_rates(&mut self, state: &SystemState) -> Result<()> {
        for r in &mut self.reactions {
            r.set_current_rate(state)?;
        }
        Ok(())
    }

    fn total_action(&self) -> f64 {
        self.reactions.iter().map(|r| r.action()).sum()
    }

    /// `getReactionToHappen`: categorical selection over the 18
    /// current rates, strict `>` comparison (spec §4.6) so a zero-rate
    /// reaction is never selected by the final fallback bucket.
    fn reaction_to_happen(&self, rng: &mut RandomGenerator) -> Result<usize> {
        let total: f64 = self.reactions.iter().map(|r| r.current_rate()).sum();
        if total <= 0.0 {
            return Err(FilamentSlidingError::invariant(
                "reaction_to_happen called with no positive-rate reaction available",
            ));
        }
        let mut threshold = rng.uniform(0.0, total);
        for (i, r) in self.reactions.iter().enumerate() {
            if threshold < r.current_rate() {
                return Ok(i);
            }
            threshold -= r.current_rate();
        }
        // Floating-point edge case: the loop above should always find a
        // match before exhausting the list; fall back to the last
        // reaction with a positive rate.
        self.reactions
            .iter()
            .rposition(|r| r.current_rate() > 0.0)
            .ok_or_else(|| {
                FilamentSlidingError::invariant("reaction_to_happen found no positive-rate reaction")
            })
    }

    /// Deterministic drift plus a reflected Gaussian kick, clamped
    /// strictly inside `movement_borders` (spec §4.6). Ports
    /// `original_source/src/Propagator.cpp::moveMicrotubule`: the
    /// deterministic term is the exact solution of
    /// `dc/dt = -k * D * (E0 + N*c)` over one `time_step`, branching on
    /// whether any `Full` linker exists (`N`).
    fn move_microtubule(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<f64> {
        let (lower, upper) = state.movement_borders();
        let n_full = state.n_full_linkers();
        let external_force = state.external_force.force_at(state.mobile.x);
        let drift = if n_full > 0 {
            let n = n_full as f64;
            ((state.total_extension / n) - external_force / (n * state.spring_constant))
                * (-n * state.spring_constant * self.diffusion_coefficient * self.time_step)
                    .exp_m1()
        } else {
            external_force * self.diffusion_coefficient * self.time_step
        };
        let std_dev = (2.0 * self.diffusion_coefficient * self.time_step).sqrt();

        let kick = rng.gaussian(0.0, std_dev);
        let mut candidate = drift + kick;
        // Reflect off whichever border was overshot until the
        // candidate lands inside (lower, upper), or give up after
        // MAX_REFLECTIONS and report numeric instability.
        let mut reflect_iterations = 0u32;
        while !(candidate > lower && candidate < upper) {
            if candidate >= upper {
                candidate = 2.0 * upper - candidate;
            } else {
                candidate = 2.0 * lower - candidate;
            }
            reflect_iterations += 1;
            if reflect_iterations > MAX_REFLECTIONS {
                return Err(FilamentSlidingError::numeric(
                    "move_microtubule exceeded MAX_REFLECTIONS while reflecting the Gaussian kick",
                ));
            }
        }
        let delta_x = candidate;
        self.reflection_count_last_step = reflect_iterations;

        let (clamped, was_clamped) = clamp_strictly_inside(delta_x, lower, upper);
        if was_clamped {
            self.boundary_clamp_count += 1;
        }
        let delta_x = if clamped.is_finite() {
            clamped
        } else {
            next_after(0.0, delta_x.signum())
        };

        state.update_mobile_position(delta_x)?;
        Ok(delta_x)
    }

    /// Runs exactly one macro time step of length `time_step` against
    /// `state`, returning whether a reaction fired this step and the
    /// mobile filament's displacement.
    pub fn step(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<StepOutcome> {
        if self.reaction_rate_threshold == 0.0 && self.total_action() == 0.0 {
            self.set_new_reaction_rate_threshold(rng);
        }

        self.update_rates(state)?;
        for r in &mut self.reactions {
            r.accumulate_action();
        }

        let mut fired = None;
        if self.total_action() > self.reaction_rate_threshold {
            let idx = self.reaction_to_happen(rng)?;
            self.reactions[idx].perform(state, rng)?;
            fired = Some(self.reactions[idx].id());
            self.set_new_reaction_rate_threshold(rng);
        }

        let delta_x = self.move_microtubule(state, rng)?;
        state.update_force_and_energy()?;
        let barrier_delta = state.barrier_crossed();

        self.time += self.time_step;
        Ok(StepOutcome {
            fired,
            delta_x,
            barrier_delta,
            reflections: self.reflection_count_last_step,
        })
    }

    /// Runs `n_steps` macro steps with no observation recording —
    /// `block()`'s equilibration phase (spec §4.6).
    pub fn equilibrate(
        &mut self,
        state: &mut SystemState,
        rng: &mut RandomGenerator,
        n_steps: u64,
    ) -> Result<()> {
        for _ in 0..n_steps {
            self.step(state, rng)?;
        }
        Ok(())
    }

    /// Runs `n_steps` macro steps, invoking `on_step` after each one so
    /// the caller can feed `Statistics`/`Histogram`/`TransitionPathRecorder`.
    pub fn run<F>(
        &mut self,
        state: &mut SystemState,
        rng: &mut RandomGenerator,
        n_steps: u64,
        mut on_step: F,
    ) -> Result<()>
    where
        F: FnMut(&SystemState, &StepOutcome) -> Result<()>,
    {
        for _ in 0..n_steps {
            let outcome = self.step(state, rng)?;
            on_step(state, &outcome)?;
        }
        Ok(())
    }

    /// Whether `x_mobile` currently sits within the basin of attraction
    /// of its nearest lattice position (spec §4.6).
    pub fn in_basin_of_attraction(state: &SystemState) -> bool {
        let delta = state.fixed.lattice_spacing;
        let nearest = (state.mobile.x / delta).round() * delta;
        (state.mobile.x - nearest).abs() <= BASIN_HALF_WIDTH_FACTOR * delta
    }
}

/// Observations produced by one `Propagator::step` call, consumed by
/// the block driver to feed the statistics layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub fired: Option<crate::reaction::ReactionId>,
    pub delta_x: f64,
    pub barrier_delta: i64,
    pub reflections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filament::{Filament, FilamentKind};
    use crate::linker::LinkerType;
    use crate::reaction::{BindFree, KineticParams};
    use crate::system_state::{ExternalForceType, SystemState};

    fn params() -> KineticParams {
        KineticParams {
            k_bind_tip: 0.0,
            k_bind_blocked: 0.0,
            k_bind_partial: 0.0,
            k_off_partial: 0.0,
            k_off_full: 0.0,
            spring_constant: 4.0,
            delta_e_head: 0.0,
            hop_base_head: 1.0,
            hop_base_tail: 1.0,
            delta_e_direction: 0.0,
            delta_e_cooperativity: 0.0,
        }
    }

    fn all_zero_reactions() -> Vec<Box<dyn Reaction>> {
        let mut v: Vec<Box<dyn Reaction>> = Vec::new();
        for &kind in &LinkerType::ALL {
            v.push(Box::new(BindFree::new(kind, params())));
            v.push(Box::new(crate::reaction::BindPartial::new(kind, params())));
            v.push(Box::new(crate::reaction::UnbindPartial::new(kind, params())));
            v.push(Box::new(crate::reaction::UnbindFull::new(kind, params())));
            v.push(Box::new(crate::reaction::HopPartial::new(kind, params())));
            v.push(Box::new(crate::reaction::HopFull::new(kind, params())));
        }
        v
    }

    fn small_state() -> SystemState {
        let fixed = Filament::new(FilamentKind::Fixed, 20, 1.0);
        let mobile = Filament::new(FilamentKind::Mobile, 20, 1.0);
        SystemState::new(fixed, mobile, 0, 0, 0, 1.4, 4.0, ExternalForceType::BarrierFree).unwrap()
    }

    #[test]
    fn construction_requires_exactly_eighteen_reactions() {
        let result = Propagator::new(Vec::new(), 1.0, 0.01);
        assert!(result.is_err());
        let ok = Propagator::new(all_zero_reactions(), 1.0, 0.01);
        assert!(ok.is_ok());
    }

    #[test]
    fn zero_rate_system_never_fires_a_reaction() {
        let mut state = small_state();
        let mut rng = RandomGenerator::from_seed_str("propagator-test");
        let mut propagator = Propagator::new(all_zero_reactions(), 0.0, 0.01).unwrap();
        for _ in 0..10 {
            let outcome = propagator.step(&mut state, &mut rng).unwrap();
            assert!(outcome.fired.is_none());
            assert_eq!(outcome.delta_x, 0.0);
        }
    }

    #[test]
    fn time_advances_by_time_step_each_call() {
        let mut state = small_state();
        let mut rng = RandomGenerator::from_seed_str("propagator-time");
        let mut propagator = Propagator::new(all_zero_reactions(), 0.0, 0.01).unwrap();
        propagator.step(&mut state, &mut rng).unwrap();
        assert!((propagator.time() - 0.01).abs() < 1e-12);
        propagator.step(&mut state, &mut rng).unwrap();
        assert!((propagator.time() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn in_basin_of_attraction_detects_proximity_to_lattice_site() {
        let mut state = small_state();
        state.mobile.x = 0.05;
        assert!(Propagator::in_basin_of_attraction(&state));
        state.mobile.x = 0.5;
        assert!(!Propagator::in_basin_of_attraction(&state));
    }
}
