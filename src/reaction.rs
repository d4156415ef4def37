//! The `Reaction` family (spec §4.5): `BindFree`, `BindPartial`,
//! `UnbindPartial`, `UnbindFull`, `HopPartial`, `HopFull`, each
//! instantiated once per linker type — 18 reactions total, matching
//! the 18 string-keyed instances built by
//! `original_source/src/Propagator.cpp`'s constructor. We key them by
//! a typed `ReactionId` instead of a string (spec §9's re-architecture
//! note against stringly-typed dispatch).
//!
//! Rate formulas for `BindFree`/`BindPartial` are grounded directly on
//! `original_source/BindFreeCrosslinker.cpp` and
//! `BindPartialCrosslinker.cpp`; `UnbindPartial`/`UnbindFull`/
//! `HopPartial`/`HopFull` follow spec §4.5's formulas literally since
//! the retrieved `UnbindPartialCrosslinker.cpp` is an unweighted stub.

use crate::error::{FilamentSlidingError, Result};
use crate::linker::{Direction, LinkerType, Terminus};
use crate::random::RandomGenerator;
use crate::site::SiteType;
use crate::system_state::SystemState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    BindFree,
    BindPartial,
    UnbindPartial,
    UnbindFull,
    HopPartial,
    HopFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactionId {
    pub kind: ReactionKind,
    pub linker_type: LinkerType,
}

/// Logistic weight used throughout §4.5's head/tail and direction
/// biases: `1 / (1 + exp(-delta_e))`.
fn logistic(delta_e: f64) -> f64 {
    1.0 / (1.0 + (-delta_e).exp())
}

/// Common rate-kinetics parameters shared by every reaction instance
/// of a given linker type.
#[derive(Debug, Clone, Copy)]
pub struct KineticParams {
    pub k_bind_tip: f64,
    pub k_bind_blocked: f64,
    pub k_bind_partial: f64,
    pub k_off_partial: f64,
    pub k_off_full: f64,
    pub spring_constant: f64,
    pub delta_e_head: f64,
    pub hop_base_head: f64,
    pub hop_base_tail: f64,
    pub delta_e_direction: f64,
    pub delta_e_cooperativity: f64,
}

pub trait Reaction: Send {
    fn id(&self) -> ReactionId;
    fn current_rate(&self) -> f64;
    fn action(&self) -> f64;

    /// Recomputes `current_rate` from the current `SystemState`
    /// (spec §4.5).
    fn set_current_rate(&mut self, state: &SystemState) -> Result<()>;

    /// `r.action += r.current_rate` (spec §4.6, step 2).
    fn accumulate_action(&mut self) {
        self.add_action(self.current_rate());
    }

    fn add_action(&mut self, amount: f64);
    fn reset_action(&mut self);

    /// Applies the reaction, consuming randomness for selection among
    /// weighted candidates.
    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()>;
}

macro_rules! rate_action_fields {
    () => {
        fn current_rate(&self) -> f64 {
            self.current_rate
        }
        fn action(&self) -> f64 {
            self.action
        }
        fn add_action(&mut self, amount: f64) {
            self.action += amount;
        }
        fn reset_action(&mut self) {
            self.action = 0.0;
        }
    };
}

pub struct BindFree {
    linker_type: LinkerType,
    params: KineticParams,
    current_rate: f64,
    action: f64,
}

impl BindFree {
    pub fn new(linker_type: LinkerType, params: KineticParams) -> Self {
        BindFree {
            linker_type,
            params,
            current_rate: 0.0,
            action: 0.0,
        }
    }
}

impl Reaction for BindFree {
    fn id(&self) -> ReactionId {
        ReactionId {
            kind: ReactionKind::BindFree,
            linker_type: self.linker_type,
        }
    }

    rate_action_fields!();

    fn set_current_rate(&mut self, state: &SystemState) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        let available = container.n_free() > 0;
        let n_free_tip = state.fixed.free_tip.len() + state.mobile.free_tip.len();
        let n_free_blocked = state.fixed.free_blocked.len() + state.mobile.free_blocked.len();
        self.current_rate = if available {
            self.params.k_bind_tip * n_free_tip as f64
                + self.params.k_bind_blocked * n_free_blocked as f64
        } else {
            0.0
        };
        Ok(())
    }

    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()> {
        if state.containers()[self.linker_type.index()].n_free() == 0 {
            return Err(FilamentSlidingError::precondition(format!(
                "BindFree fired for {:?} with no Free linker remaining",
                self.linker_type
            )));
        }
        let n_free_tip = state.fixed.free_tip.len() + state.mobile.free_tip.len();
        let n_free_blocked = state.fixed.free_blocked.len() + state.mobile.free_blocked.len();
        let total = n_free_tip + n_free_blocked;
        if total == 0 {
            return Err(FilamentSlidingError::precondition(
                "BindFree fired with no free site available",
            ));
        }
        let on_tip = rng.bernoulli(n_free_tip as f64 / total as f64);
        let site_type = if on_tip { SiteType::Tip } else { SiteType::Blocked };

        let n_fixed_of_type = match site_type {
            SiteType::Tip => state.fixed.free_tip.len(),
            SiteType::Blocked => state.fixed.free_blocked.len(),
        };
        let n_mobile_of_type = match site_type {
            SiteType::Tip => state.mobile.free_tip.len(),
            SiteType::Blocked => state.mobile.free_blocked.len(),
        };
        let n_of_type = n_fixed_of_type + n_mobile_of_type;
        let k = rng.uniform_integer(0, n_of_type);
        let (filament, local_index) = if k < n_fixed_of_type {
            (crate::filament::FilamentKind::Fixed, k)
        } else {
            (crate::filament::FilamentKind::Mobile, k - n_fixed_of_type)
        };
        let position = match filament {
            crate::filament::FilamentKind::Fixed => state.fixed.free_site_position(site_type, local_index)?,
            crate::filament::FilamentKind::Mobile => state.mobile.free_site_position(site_type, local_index)?,
        };

        let terminus = if rng.bernoulli(logistic(self.params.delta_e_head)) {
            Terminus::Head
        } else {
            Terminus::Tail
        };
        state.connect_free_linker(self.linker_type, terminus, filament, position)?;
        Ok(())
    }
}

pub struct BindPartial {
    linker_type: LinkerType,
    params: KineticParams,
    current_rate: f64,
    action: f64,
    candidates: Vec<(crate::linker::LinkerId, crate::filament::FilamentKind, usize, f64)>,
}

impl BindPartial {
    pub fn new(linker_type: LinkerType, params: KineticParams) -> Self {
        BindPartial {
            linker_type,
            params,
            current_rate: 0.0,
            action: 0.0,
            candidates: Vec::new(),
        }
    }
}

impl Reaction for BindPartial {
    fn id(&self) -> ReactionId {
        ReactionId {
            kind: ReactionKind::BindPartial,
            linker_type: self.linker_type,
        }
    }

    rate_action_fields!();

    fn set_current_rate(&mut self, state: &SystemState) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        self.candidates.clear();
        let mut total = 0.0;
        for c in &container.possible_full_connections {
            let weight = self.params.k_bind_partial
                * (-self.params.spring_constant * c.signed_extension * c.signed_extension * 0.25)
                    .exp();
            total += weight;
            self.candidates
                .push((c.partial, c.site_location.0, c.site_location.1, weight));
        }
        self.current_rate = total;
        Ok(())
    }

    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(FilamentSlidingError::invariant(
                "BindPartial selected but no possible_full_connections candidate exists",
            ));
        }
        let total: f64 = self.candidates.iter().map(|c| c.3).sum();
        if total <= 0.0 {
            return Err(FilamentSlidingError::invariant(
                "BindPartial selected with a zero categorical sum",
            ));
        }
        let mut threshold = rng.uniform(0.0, total);
        let mut chosen = self.candidates[0];
        for &candidate in &self.candidates {
            if threshold < candidate.3 {
                chosen = candidate;
                break;
            }
            threshold -= candidate.3;
        }
        let (linker, filament, position, _) = chosen;
        let terminus = {
            let container = &state.containers()[self.linker_type.index()];
            container
                .linker(linker)?
                .connected_terminus()
                .ok_or_else(|| FilamentSlidingError::invariant("selected linker is not Partial"))?
                .opposite()
        };
        state.connect_partial_linker(self.linker_type, linker, terminus, filament, position)?;
        Ok(())
    }
}

pub struct UnbindPartial {
    linker_type: LinkerType,
    params: KineticParams,
    current_rate: f64,
    action: f64,
}

impl UnbindPartial {
    pub fn new(linker_type: LinkerType, params: KineticParams) -> Self {
        UnbindPartial {
            linker_type,
            params,
            current_rate: 0.0,
            action: 0.0,
        }
    }

    fn head_weight(&self) -> f64 {
        2.0 / (1.0 + self.params.delta_e_head.exp())
    }
}

impl Reaction for UnbindPartial {
    fn id(&self) -> ReactionId {
        ReactionId {
            kind: ReactionKind::UnbindPartial,
            linker_type: self.linker_type,
        }
    }

    rate_action_fields!();

    fn set_current_rate(&mut self, state: &SystemState) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        let f_head = self.head_weight();
        let f_tail = 2.0 - f_head;
        let mut n_head = 0usize;
        let mut n_tail = 0usize;
        for id in container.partial_ids() {
            match container.linker(id)?.connected_terminus() {
                Some(Terminus::Head) => n_head += 1,
                Some(Terminus::Tail) => n_tail += 1,
                None => {}
            }
        }
        self.current_rate =
            self.params.k_off_partial * (n_head as f64 * f_head + n_tail as f64 * f_tail);
        Ok(())
    }

    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        let f_head = self.head_weight();
        let f_tail = 2.0 - f_head;
        let mut head_ids = Vec::new();
        let mut tail_ids = Vec::new();
        for id in container.partial_ids() {
            match container.linker(id)?.connected_terminus() {
                Some(Terminus::Head) => head_ids.push(id),
                Some(Terminus::Tail) => tail_ids.push(id),
                None => {}
            }
        }
        let head_weight = head_ids.len() as f64 * f_head;
        let tail_weight = tail_ids.len() as f64 * f_tail;
        let total = head_weight + tail_weight;
        if total <= 0.0 {
            return Err(FilamentSlidingError::invariant(
                "UnbindPartial selected with no partial linkers weighted",
            ));
        }
        let pick_head = rng.uniform(0.0, total) < head_weight;
        let pool = if pick_head { &head_ids } else { &tail_ids };
        if pool.is_empty() {
            return Err(FilamentSlidingError::invariant(
                "UnbindPartial chose an empty head/tail pool",
            ));
        }
        let idx = rng.uniform_integer(0, pool.len());
        let chosen = pool[idx];
        state.disconnect_partial_linker(self.linker_type, chosen)?;
        Ok(())
    }
}

pub struct UnbindFull {
    linker_type: LinkerType,
    params: KineticParams,
    current_rate: f64,
    action: f64,
    candidates: Vec<(crate::linker::LinkerId, f64)>,
}

impl UnbindFull {
    pub fn new(linker_type: LinkerType, params: KineticParams) -> Self {
        UnbindFull {
            linker_type,
            params,
            current_rate: 0.0,
            action: 0.0,
            candidates: Vec::new(),
        }
    }
}

impl Reaction for UnbindFull {
    fn id(&self) -> ReactionId {
        ReactionId {
            kind: ReactionKind::UnbindFull,
            linker_type: self.linker_type,
        }
    }

    rate_action_fields!();

    fn set_current_rate(&mut self, state: &SystemState) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        self.candidates.clear();
        let mut total = 0.0;
        for row in &container.full_connections {
            let rate = self.params.k_off_full
                * (self.params.spring_constant * row.signed_extension * row.signed_extension
                    * 0.25)
                    .exp();
            total += rate;
            self.candidates.push((row.full, rate));
        }
        self.current_rate = total;
        Ok(())
    }

    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(FilamentSlidingError::invariant(
                "UnbindFull selected but full_connections is empty",
            ));
        }
        let total: f64 = self.candidates.iter().map(|c| c.1).sum();
        if total <= 0.0 {
            return Err(FilamentSlidingError::invariant(
                "UnbindFull selected with a zero categorical sum",
            ));
        }
        let mut threshold = rng.uniform(0.0, total);
        let mut chosen = self.candidates[0].0;
        for &(id, rate) in &self.candidates {
            if threshold < rate {
                chosen = id;
                break;
            }
            threshold -= rate;
        }
        let terminus = if rng.bernoulli(logistic(self.params.delta_e_head)) {
            Terminus::Head
        } else {
            Terminus::Tail
        };
        state.disconnect_full_linker_terminus(self.linker_type, chosen, terminus)?;
        Ok(())
    }
}

fn hop_direction_weight(params: &KineticParams, terminus: Terminus, direction: Direction) -> f64 {
    let base = match terminus {
        Terminus::Head => params.hop_base_head,
        Terminus::Tail => params.hop_base_tail,
    };
    let sign = match direction {
        Direction::Plus => 1.0,
        Direction::Minus => -1.0,
    };
    base * (sign * params.delta_e_direction * 0.5).exp()
}

pub struct HopPartial {
    linker_type: LinkerType,
    params: KineticParams,
    current_rate: f64,
    action: f64,
    candidates: Vec<(crate::linker::LinkerId, Terminus, usize, f64)>,
}

impl HopPartial {
    pub fn new(linker_type: LinkerType, params: KineticParams) -> Self {
        HopPartial {
            linker_type,
            params,
            current_rate: 0.0,
            action: 0.0,
            candidates: Vec::new(),
        }
    }
}

impl Reaction for HopPartial {
    fn id(&self) -> ReactionId {
        ReactionId {
            kind: ReactionKind::HopPartial,
            linker_type: self.linker_type,
        }
    }

    rate_action_fields!();

    fn set_current_rate(&mut self, state: &SystemState) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        self.candidates.clear();
        let mut total = 0.0;
        for h in &container.possible_partial_hops {
            let mut rate = hop_direction_weight(&self.params, h.terminus, h.direction);
            if h.away_from_neighbour {
                rate *= (-self.params.delta_e_cooperativity).exp();
            }
            total += rate;
            self.candidates
                .push((h.partial, h.terminus, h.target_location, rate));
        }
        self.current_rate = total;
        Ok(())
    }

    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(FilamentSlidingError::invariant(
                "HopPartial selected but possible_partial_hops is empty",
            ));
        }
        let total: f64 = self.candidates.iter().map(|c| c.3).sum();
        if total <= 0.0 {
            return Err(FilamentSlidingError::invariant(
                "HopPartial selected with a zero categorical sum",
            ));
        }
        let mut threshold = rng.uniform(0.0, total);
        let mut chosen = self.candidates[0];
        for &candidate in &self.candidates {
            if threshold < candidate.3 {
                chosen = candidate;
                break;
            }
            threshold -= candidate.3;
        }
        let (linker, terminus, target, _) = chosen;
        state.hop_partial_linker(self.linker_type, linker, terminus, target)?;
        Ok(())
    }
}

pub struct HopFull {
    linker_type: LinkerType,
    params: KineticParams,
    current_rate: f64,
    action: f64,
    candidates: Vec<(crate::linker::LinkerId, Terminus, usize, f64)>,
}

impl HopFull {
    pub fn new(linker_type: LinkerType, params: KineticParams) -> Self {
        HopFull {
            linker_type,
            params,
            current_rate: 0.0,
            action: 0.0,
            candidates: Vec::new(),
        }
    }
}

impl Reaction for HopFull {
    fn id(&self) -> ReactionId {
        ReactionId {
            kind: ReactionKind::HopFull,
            linker_type: self.linker_type,
        }
    }

    rate_action_fields!();

    fn set_current_rate(&mut self, state: &SystemState) -> Result<()> {
        let container = &state.containers()[self.linker_type.index()];
        self.candidates.clear();
        let mut total = 0.0;
        for h in &container.possible_full_hops {
            let mut rate = hop_direction_weight(&self.params, h.terminus, h.direction);
            if h.away_from_neighbour {
                rate *= (-self.params.delta_e_cooperativity).exp();
            }
            rate *= (self.params.spring_constant * 0.25
                * (h.old_ext * h.old_ext - h.new_ext * h.new_ext))
                .exp();
            total += rate;
            self.candidates
                .push((h.full, h.terminus, h.target_location, rate));
        }
        self.current_rate = total;
        Ok(())
    }

    fn perform(&mut self, state: &mut SystemState, rng: &mut RandomGenerator) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(FilamentSlidingError::invariant(
                "HopFull selected but possible_full_hops is empty",
            ));
        }
        let total: f64 = self.candidates.iter().map(|c| c.3).sum();
        if total <= 0.0 {
            return Err(FilamentSlidingError::invariant(
                "HopFull selected with a zero categorical sum",
            ));
        }
        let mut threshold = rng.uniform(0.0, total);
        let mut chosen = self.candidates[0];
        for &candidate in &self.candidates {
            if threshold < candidate.3 {
                chosen = candidate;
                break;
            }
            threshold -= candidate.3;
        }
        let (linker, terminus, target, _) = chosen;
        state.hop_full_linker(self.linker_type, linker, terminus, target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KineticParams {
        KineticParams {
            k_bind_tip: 2.0,
            k_bind_blocked: 0.5,
            k_bind_partial: 1.0,
            k_off_partial: 1.0,
            k_off_full: 1.0,
            spring_constant: 4.0,
            delta_e_head: 0.0,
            hop_base_head: 1.0,
            hop_base_tail: 1.0,
            delta_e_direction: 0.0,
            delta_e_cooperativity: 0.0,
        }
    }

    #[test]
    fn scenario_s3_bind_free_rate_matches_literal_value() {
        use crate::filament::{Filament, FilamentKind};
        use crate::system_state::{ExternalForceType, SystemState};

        let fixed = Filament::new(FilamentKind::Fixed, 17, 1.0);
        let mobile = Filament::new(FilamentKind::Mobile, 0, 1.0);
        let state = SystemState::new(
            fixed,
            mobile,
            1,
            0,
            0,
            1.4,
            1.0,
            ExternalForceType::BarrierFree,
        )
        .unwrap();

        let mut p = params();
        p.k_bind_tip = 2.0;
        p.k_bind_blocked = 2.0;
        let mut r = BindFree::new(LinkerType::Passive, p);
        r.set_current_rate(&state).unwrap();
        approx::assert_relative_eq!(r.current_rate(), 34.0, epsilon = 1e-9);
        approx::assert_relative_eq!(logistic(0.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn scenario_s4_bind_partial_weight_matches_literal_value() {
        let weight = (-4.0f64 * 0.5 * 0.5 * 0.25).exp();
        approx::assert_relative_eq!(weight, 0.778_800_783, epsilon = 1e-6);
    }

    #[test]
    fn bind_free_and_unbind_full_favor_head_when_delta_e_head_is_positive() {
        // spec's p_head = 1/(1+exp(-delta_e_head)): positive delta_e_head
        // must push the head probability above one half, not below it.
        let p_head = logistic(2.0);
        assert!(p_head > 0.5, "p_head = {p_head} should favor Head for positive delta_e_head");
        let p_head_negative = logistic(-2.0);
        assert!(
            p_head_negative < 0.5,
            "p_head = {p_head_negative} should favor Tail for negative delta_e_head"
        );
    }
}
