//! A stochastic, event-driven simulator of cross-linker-mediated
//! sliding between a fixed and a mobile cytoskeletal filament.
//!
//! The physical picture (spec §1-§3): a `Fixed` filament and a
//! `Mobile` filament lie side by side, connected by up to three
//! species of cross-linker (`Passive`, `Dual`, `Active`). Each linker
//! is `Free`, `Partial` (bound to one filament), or `Full` (bound to
//! both, under an elastic extension). A [`SystemState`] is the sole
//! mutator of this picture; a [`Propagator`] advances it in fixed
//! macro time steps, alternating a Gillespie-style reaction draw
//! (`reaction`) with a reflected Langevin kick to the mobile
//! filament's position.
//!
//! ```
//! use filament_sliding::filament::{Filament, FilamentKind};
//! use filament_sliding::system_state::{ExternalForceType, SystemState};
//! use filament_sliding::linker::{LinkerType, Terminus};
//!
//! let fixed = Filament::new(FilamentKind::Fixed, 50, 0.008);
//! let mobile = Filament::new(FilamentKind::Mobile, 50, 0.008);
//! let mut state = SystemState::new(
//!     fixed, mobile, 4, 0, 0, 1.4, 40.0, ExternalForceType::BarrierFree,
//! ).unwrap();
//!
//! let id = state
//!     .connect_free_linker(LinkerType::Passive, Terminus::Tail, FilamentKind::Fixed, 10)
//!     .unwrap();
//! state
//!     .connect_partial_linker(LinkerType::Passive, id, Terminus::Head, FilamentKind::Mobile, 10)
//!     .unwrap();
//! assert!(state.check_consistency().is_ok());
//! ```

pub mod container;
pub mod error;
pub mod filament;
pub mod linker;
pub mod math;
pub mod output;
pub mod params;
pub mod propagator;
pub mod random;
pub mod reaction;
pub mod site;
pub mod statistics;
pub mod system_state;

pub use error::{FilamentSlidingError, Result};
pub use propagator::Propagator;
pub use system_state::SystemState;

/// The crate's semantic version, exposed for run-log provenance
/// (spec §6's log file records which build produced a run).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use crate::filament::{Filament, FilamentKind};
    use crate::linker::{LinkerType, Terminus};
    use crate::params::Parameters;
    use crate::propagator::Propagator;
    use crate::random::RandomGenerator;
    use crate::reaction::{
        BindFree, BindPartial, HopFull, HopPartial, KineticParams, Reaction, UnbindFull,
        UnbindPartial,
    };
    use crate::system_state::{ExternalForceType, SystemState};

    fn uniform_kinetic_params() -> KineticParams {
        KineticParams {
            k_bind_tip: 0.2,
            k_bind_blocked: 0.05,
            k_bind_partial: 0.3,
            k_off_partial: 0.1,
            k_off_full: 0.1,
            spring_constant: 40.0,
            delta_e_head: 0.0,
            hop_base_head: 0.5,
            hop_base_tail: 0.5,
            delta_e_direction: 0.0,
            delta_e_cooperativity: 0.0,
        }
    }

    fn all_reactions() -> Vec<Box<dyn Reaction>> {
        let mut reactions: Vec<Box<dyn Reaction>> = Vec::new();
        for &kind in &LinkerType::ALL {
            let p = uniform_kinetic_params();
            reactions.push(Box::new(BindFree::new(kind, p)));
            reactions.push(Box::new(BindPartial::new(kind, p)));
            reactions.push(Box::new(UnbindPartial::new(kind, p)));
            reactions.push(Box::new(UnbindFull::new(kind, p)));
            reactions.push(Box::new(HopPartial::new(kind, p)));
            reactions.push(Box::new(HopFull::new(kind, p)));
        }
        reactions
    }

    #[test]
    fn a_full_run_of_macro_steps_preserves_every_invariant() {
        let fixed = Filament::new(FilamentKind::Fixed, 80, 0.008);
        let mobile = Filament::new(FilamentKind::Mobile, 80, 0.008);
        let mut state = SystemState::new(
            fixed,
            mobile,
            6,
            2,
            2,
            1.4,
            40.0,
            ExternalForceType::BarrierFree,
        )
        .unwrap();

        let mut propagator =
            Propagator::new(all_reactions(), 2.0, 1e-4).unwrap();
        let mut rng = RandomGenerator::from_seed_str("integration-smoke-test");

        for _ in 0..200 {
            propagator.step(&mut state, &mut rng).unwrap();
            state.check_consistency().unwrap();
        }
    }

    #[test]
    fn defaults_round_trip_through_the_parameter_file_format() {
        let defaults = Parameters::defaults();
        let mut buf = Vec::new();
        defaults.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let parsed = Parameters::parse(&text).unwrap();
        assert_eq!(parsed, defaults);
    }

    #[test]
    fn crate_version_is_non_empty() {
        assert!(!crate::VERSION.is_empty());
    }
}
