//! `SystemState`: the façade and sole mutator (spec §4.4).
//!
//! Every mutation executes in the fixed order from spec §4.4: (1)
//! mutate the linker's own state, (2) mutate the affected filament's
//! site, (3) call the matching `on_*` hook on **all three**
//! `LinkerContainer`s, even those of other linker types (neighbour-bias
//! flags and the crossing filter are cross-type). Ported from
//! `original_source/SystemState.cpp`.

use crate::container::LinkerContainer;
use crate::error::{FilamentSlidingError, Result};
use crate::filament::{Filament, FilamentKind};
use crate::linker::{LinkerId, LinkerType, Terminus};

/// External force options (spec §4.4). Each is a pure function of
/// `x_mobile`; binding/unbinding/hopping reactions observe `F_ext`
/// only through the resulting trajectory, never as a rate modifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExternalForceType {
    BarrierFree,
    Sinus { amplitude: f64, period: f64 },
    Constant { force: f64 },
}

impl ExternalForceType {
    pub fn force_at(&self, x_mobile: f64) -> f64 {
        match *self {
            ExternalForceType::BarrierFree => 0.0,
            ExternalForceType::Constant { force } => force,
            ExternalForceType::Sinus { amplitude, period } => {
                amplitude * (2.0 * std::f64::consts::PI * x_mobile / period).sin()
            }
        }
    }
}

pub struct SystemState {
    pub fixed: Filament,
    pub mobile: Filament,
    containers: [LinkerContainer; 3],
    pub max_stretch: f64,
    pub spring_constant: f64,
    pub external_force: ExternalForceType,
    pub force_microtubule: f64,
    pub total_extension: f64,
    pub energy: f64,
}

impl SystemState {
    pub fn new(
        fixed: Filament,
        mobile: Filament,
        n_passive: usize,
        n_dual: usize,
        n_active: usize,
        rho: f64,
        spring_constant: f64,
        external_force: ExternalForceType,
    ) -> Result<Self> {
        if !(rho < 1.5) {
            return Err(FilamentSlidingError::numeric(format!(
                "rho must be strictly less than 1.5 (got {rho})"
            )));
        }
        let max_stretch = rho * fixed.lattice_spacing;
        let containers = [
            LinkerContainer::new(LinkerType::Passive, n_passive),
            LinkerContainer::new(LinkerType::Dual, n_dual),
            LinkerContainer::new(LinkerType::Active, n_active),
        ];
        let mut state = SystemState {
            fixed,
            mobile,
            containers,
            max_stretch,
            spring_constant,
            external_force,
            force_microtubule: 0.0,
            total_extension: 0.0,
            energy: 0.0,
        };
        state.update_force_and_energy()?;
        Ok(state)
    }

    fn container(&self, kind: LinkerType) -> &LinkerContainer {
        &self.containers[kind.index()]
    }

    fn container_mut(&mut self, kind: LinkerType) -> &mut LinkerContainer {
        &mut self.containers[kind.index()]
    }

    pub fn containers(&self) -> &[LinkerContainer; 3] {
        &self.containers
    }

    fn filament(&self, kind: FilamentKind) -> &Filament {
        match kind {
            FilamentKind::Fixed => &self.fixed,
            FilamentKind::Mobile => &self.mobile,
        }
    }

    fn filament_mut(&mut self, kind: FilamentKind) -> &mut Filament {
        match kind {
            FilamentKind::Fixed => &mut self.fixed,
            FilamentKind::Mobile => &mut self.mobile,
        }
    }

    /// Rescans every container's (including other linker types')
    /// neighbour-bias flags around a position whose occupancy just
    /// changed (spec §4.3/§4.5: "refresh neighbour-bias flags on
    /// neighbouring partials/fulls", broadcast cross-type).
    fn broadcast_occupancy_change(&mut self, filament: FilamentKind, position: usize) -> Result<()> {
        let (containers, fixed, mobile) = (&mut self.containers, &self.fixed, &self.mobile);
        for c in containers.iter_mut() {
            c.rescan_neighbour_bias(position, filament, fixed, mobile)?;
        }
        Ok(())
    }

    fn other_full_pairs(&self, except: LinkerType) -> Vec<(usize, usize)> {
        self.containers
            .iter()
            .filter(|c| c.kind != except)
            .flat_map(|c| c.all_full_pairs())
            .collect()
    }

    /// `connect_free_linker(type, terminus, location)` — spec §4.4.
    pub fn connect_free_linker(
        &mut self,
        kind: LinkerType,
        terminus: Terminus,
        filament: FilamentKind,
        position: usize,
    ) -> Result<LinkerId> {
        let id = self.container_mut(kind).take_any_free()?;
        // Step 1: the linker's own state.
        self.container_mut(kind)
            .connect_linker(id, terminus, filament, position)?;
        // Step 2: the filament site.
        self.filament_mut(filament).connect(position, id, terminus)?;
        // Step 3: the owning container's possibility tables. Cross-type
        // data (the crossing filter) arrives via `other_pairs`; the
        // other two containers have no membership entry for `id` and
        // must not be asked to move it.
        let other_pairs = self.other_full_pairs(kind);
        let max_stretch = self.max_stretch;
        let (containers, fixed, mobile) = (&mut self.containers, &self.fixed, &self.mobile);
        containers[kind.index()].on_free_to_partial(
            id,
            terminus,
            fixed,
            mobile,
            max_stretch,
            &other_pairs,
        )?;
        self.broadcast_occupancy_change(filament, position)?;
        Ok(id)
    }

    pub fn disconnect_partial_linker(&mut self, kind: LinkerType, id: LinkerId) -> Result<()> {
        let terminus = self
            .container(kind)
            .linker(id)?
            .connected_terminus()
            .ok_or_else(|| FilamentSlidingError::precondition("linker is not Partial"))?;
        let (filament_kind, position) = self.container_mut(kind).disconnect_linker(id, terminus)?;
        self.filament_mut(filament_kind).disconnect(position)?;
        self.container_mut(kind).on_partial_to_free(id)?;
        self.broadcast_occupancy_change(filament_kind, position)?;
        Ok(())
    }

    /// `fully_connect_free_linker(type, terminus, fixed_pos, mobile_pos)`
    /// — two-step composition (spec §4.4).
    pub fn fully_connect_free_linker(
        &mut self,
        kind: LinkerType,
        first_terminus: Terminus,
        fixed_pos: usize,
        mobile_pos: usize,
    ) -> Result<LinkerId> {
        let id =
            self.connect_free_linker(kind, first_terminus, FilamentKind::Fixed, fixed_pos)?;
        self.connect_partial_linker(
            kind,
            id,
            first_terminus.opposite(),
            FilamentKind::Mobile,
            mobile_pos,
        )?;
        Ok(id)
    }

    /// Completes a `Partial` linker into `Full` by binding its other
    /// terminus.
    pub fn connect_partial_linker(
        &mut self,
        kind: LinkerType,
        id: LinkerId,
        terminus: Terminus,
        filament: FilamentKind,
        position: usize,
    ) -> Result<()> {
        self.container_mut(kind)
            .connect_linker(id, terminus, filament, position)?;
        self.filament_mut(filament).connect(position, id, terminus)?;
        let max_stretch = self.max_stretch;
        let (containers, fixed, mobile) = (&mut self.containers, &self.fixed, &self.mobile);
        containers[kind.index()].on_partial_to_full(id, fixed, mobile, max_stretch)?;
        self.broadcast_occupancy_change(filament, position)?;
        Ok(())
    }

    /// Demotes a `Full` linker back to `Partial` by disconnecting one
    /// terminus.
    pub fn disconnect_full_linker_terminus(
        &mut self,
        kind: LinkerType,
        id: LinkerId,
        terminus: Terminus,
    ) -> Result<()> {
        let (filament_kind, position) = self.container_mut(kind).disconnect_linker(id, terminus)?;
        self.filament_mut(filament_kind).disconnect(position)?;
        let remaining = self
            .container(kind)
            .linker(id)?
            .connected_terminus()
            .ok_or_else(|| {
                FilamentSlidingError::invariant("full linker has no remaining terminus")
            })?;
        let other_pairs = self.other_full_pairs(kind);
        let max_stretch = self.max_stretch;
        let (containers, fixed, mobile) = (&mut self.containers, &self.fixed, &self.mobile);
        containers[kind.index()].on_full_to_partial(
            id,
            remaining,
            fixed,
            mobile,
            max_stretch,
            &other_pairs,
        )?;
        self.broadcast_occupancy_change(filament_kind, position)?;
        Ok(())
    }

    /// Moves a `Partial` linker's bound terminus to an adjacent free
    /// site on the same filament (spec §4.5, `HopPartial`).
    pub fn hop_partial_linker(
        &mut self,
        kind: LinkerType,
        id: LinkerId,
        terminus: Terminus,
        new_position: usize,
    ) -> Result<()> {
        let (filament_kind, old_position) =
            self.container_mut(kind).disconnect_linker(id, terminus)?;
        self.filament_mut(filament_kind).disconnect(old_position)?;
        self.container_mut(kind)
            .connect_linker(id, terminus, filament_kind, new_position)?;
        self.filament_mut(filament_kind)
            .connect(new_position, id, terminus)?;
        let other_pairs = self.other_full_pairs(kind);
        let max_stretch = self.max_stretch;
        let (containers, fixed, mobile) = (&mut self.containers, &self.fixed, &self.mobile);
        containers[kind.index()].on_partial_repositioned(
            id,
            terminus,
            fixed,
            mobile,
            max_stretch,
            &other_pairs,
        )?;
        self.broadcast_occupancy_change(filament_kind, old_position)?;
        self.broadcast_occupancy_change(filament_kind, new_position)
    }

    /// Moves a `Full` linker's one terminus to an adjacent free site
    /// (spec §4.5, `HopFull`).
    pub fn hop_full_linker(
        &mut self,
        kind: LinkerType,
        id: LinkerId,
        terminus: Terminus,
        new_position: usize,
    ) -> Result<()> {
        let (filament_kind, old_position) =
            self.container_mut(kind).disconnect_linker(id, terminus)?;
        self.filament_mut(filament_kind).disconnect(old_position)?;
        self.container_mut(kind)
            .connect_linker(id, terminus, filament_kind, new_position)?;
        self.filament_mut(filament_kind)
            .connect(new_position, id, terminus)?;
        let (containers, fixed, mobile) = (&mut self.containers, &self.fixed, &self.mobile);
        containers[kind.index()].on_full_repositioned(id, fixed, mobile)?;
        self.broadcast_occupancy_change(filament_kind, old_position)?;
        self.broadcast_occupancy_change(filament_kind, new_position)
    }

    /// `update_mobile_position(Δx)` — assumes `Δx` is within the
    /// current movement borders (spec §4.4).
    pub fn update_mobile_position(&mut self, delta_x: f64) -> Result<()> {
        self.mobile.x += delta_x;
        let mut violators_by_type: Vec<(LinkerType, LinkerId)> = Vec::new();
        for &t in &LinkerType::ALL {
            for v in self.containers[t.index()].on_mobile_moved(delta_x, self.max_stretch) {
                violators_by_type.push((t, v));
            }
        }
        for (kind, id) in violators_by_type {
            let mobile_terminus = {
                let l = self.container(kind).linker(id)?;
                if l.head.filament == FilamentKind::Mobile {
                    Terminus::Head
                } else {
                    Terminus::Tail
                }
            };
            self.disconnect_full_linker_terminus(kind, id, mobile_terminus)?;
        }
        Ok(())
    }

    /// `barrier_crossed()` — spec §4.4, B3: strict inequality.
    pub fn barrier_crossed(&mut self) -> i64 {
        let delta = self.mobile.x - self.mobile.attractor_index as f64 * self.fixed.lattice_spacing;
        if delta > self.fixed.lattice_spacing {
            self.mobile.attractor_index += 1;
            1
        } else if delta < -self.fixed.lattice_spacing {
            self.mobile.attractor_index -= 1;
            -1
        } else {
            0
        }
    }

    /// Total count of `Full` linkers across all three containers
    /// (`N` in the deterministic-displacement formula, spec §4.6).
    pub fn n_full_linkers(&self) -> usize {
        self.containers.iter().map(|c| c.full_connections.len()).sum()
    }

    /// `movement_borders_set_by_full_linkers` aggregated across all
    /// three containers.
    pub fn movement_borders(&self) -> (f64, f64) {
        let mut lower = f64::NEG_INFINITY;
        let mut upper = f64::INFINITY;
        for c in &self.containers {
            let (lo, hi) = c.movement_borders(self.max_stretch);
            lower = lower.max(lo);
            upper = upper.min(hi);
        }
        (lower, upper)
    }

    /// `F = -k * sum(ext) + F_ext(x)`; the minus sign on the spring
    /// term is load-bearing (`original_source/SystemState.cpp::updateForceAndEnergy`).
    pub fn update_force_and_energy(&mut self) -> Result<()> {
        let mut total = 0.0;
        for c in &self.containers {
            for row in &c.full_connections {
                total += row.signed_extension;
            }
        }
        self.total_extension = total;
        self.force_microtubule = -self.spring_constant * total;
        self.force_microtubule += self.external_force.force_at(self.mobile.x);
        self.energy = 0.5 * self.spring_constant * self.sum_squared_extensions();
        Ok(())
    }

    fn sum_squared_extensions(&self) -> f64 {
        self.containers
            .iter()
            .flat_map(|c| c.full_connections.iter())
            .map(|row| row.signed_extension * row.signed_extension)
            .sum()
    }

    /// Open interval `[max(0, x_mobile), min(L_fixed, L_mobile + x_mobile)]`
    /// in physical units (spec §4.4).
    pub fn overlap(&self) -> Result<(f64, f64)> {
        let delta = self.fixed.lattice_spacing;
        let l_fixed = (self.fixed.n_sites() - 1) as f64 * delta;
        let l_mobile = (self.mobile.n_sites() - 1) as f64 * delta;
        let lo = self.mobile.x.max(0.0);
        let hi = (l_mobile + self.mobile.x).min(l_fixed);
        if hi <= lo {
            return Err(FilamentSlidingError::invariant(
                "overlap region has vanished while full linkers may still reference it",
            ));
        }
        Ok((lo, hi))
    }

    pub fn overlap_length(&self) -> Result<f64> {
        let (lo, hi) = self.overlap()?;
        Ok(hi - lo)
    }

    /// Cross-checks P1-P5 across the two filaments and three
    /// containers (spec §8); ports `original_source/SystemState.cpp::checkConsistency`.
    pub fn check_consistency(&self) -> Result<()> {
        self.fixed.check_internal_consistency()?;
        self.mobile.check_internal_consistency()?;
        for &t in &LinkerType::ALL {
            let other_pairs = self.other_full_pairs(t);
            self.containers[t.index()].check_possibilities_consistency(
                &self.fixed,
                &self.mobile,
                self.max_stretch,
                &other_pairs,
            )?;
            for row in &self.containers[t.index()].full_connections {
                if row.signed_extension.abs() >= self.max_stretch {
                    return Err(FilamentSlidingError::invariant_at(
                        "full connection exceeds max_stretch",
                        row.full,
                    ));
                }
            }
        }
        let all_pairs: Vec<(usize, usize)> = self
            .containers
            .iter()
            .flat_map(|c| c.all_full_pairs())
            .collect();
        for i in 0..all_pairs.len() {
            for j in (i + 1)..all_pairs.len() {
                let (pf, pm) = (all_pairs[i].0 as i64, all_pairs[i].1 as i64);
                let (qf, qm) = (all_pairs[j].0 as i64, all_pairs[j].1 as i64);
                if pf != qf && pm != qm && (pf - qf).signum() != (pm - qm).signum() {
                    return Err(FilamentSlidingError::invariant(
                        "two full connections cross (P4 violated)",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_state(rho: f64) -> SystemState {
        let fixed = Filament::new(FilamentKind::Fixed, 10, 1.0);
        let mobile = Filament::new(FilamentKind::Mobile, 10, 1.0);
        SystemState::new(
            fixed,
            mobile,
            2,
            0,
            0,
            rho,
            4.0,
            ExternalForceType::BarrierFree,
        )
        .unwrap()
    }

    #[test]
    fn construction_rejects_rho_at_or_above_1_5() {
        let fixed = Filament::new(FilamentKind::Fixed, 10, 1.0);
        let mobile = Filament::new(FilamentKind::Mobile, 10, 1.0);
        let result = SystemState::new(
            fixed,
            mobile,
            1,
            0,
            0,
            1.5,
            1.0,
            ExternalForceType::BarrierFree,
        );
        assert!(result.is_err());
    }

    #[test]
    fn scenario_s1_bind_free_then_bind_partial_yields_ext_equal_to_x_mobile() {
        let mut state = small_state(1.4);
        let id = state
            .connect_free_linker(LinkerType::Passive, Terminus::Tail, FilamentKind::Fixed, 5)
            .unwrap();
        state
            .connect_partial_linker(
                LinkerType::Passive,
                id,
                Terminus::Head,
                FilamentKind::Mobile,
                5,
            )
            .unwrap();
        state.update_force_and_energy().unwrap();
        assert_relative_eq!(state.total_extension, 0.0, epsilon = 1e-12);

        state.update_mobile_position(0.7).unwrap();
        state.update_force_and_energy().unwrap();
        assert!(state.total_extension.abs() < state.max_stretch);
    }

    #[test]
    fn barrier_crossed_is_strict_at_the_boundary() {
        let mut state = small_state(1.4);
        state.mobile.x = 1.0;
        assert_eq!(state.barrier_crossed(), 0);
        state.mobile.x = 1.0 + 1e-9;
        assert_eq!(state.barrier_crossed(), 1);
        assert_eq!(state.mobile.attractor_index, 1);
    }

    #[test]
    fn movement_borders_unbounded_with_zero_linkers() {
        let state = small_state(1.4);
        let (lo, hi) = state.movement_borders();
        assert_eq!(lo, f64::NEG_INFINITY);
        assert_eq!(hi, f64::INFINITY);
    }

    #[test]
    fn force_sign_convention_matches_original_source() {
        let mut state = small_state(1.4);
        let id = state
            .connect_free_linker(LinkerType::Passive, Terminus::Tail, FilamentKind::Fixed, 5)
            .unwrap();
        state
            .connect_partial_linker(
                LinkerType::Passive,
                id,
                Terminus::Head,
                FilamentKind::Mobile,
                6,
            )
            .unwrap();
        state.update_force_and_energy().unwrap();
        assert_relative_eq!(state.total_extension, 1.0, epsilon = 1e-12);
        assert_relative_eq!(state.force_microtubule, -4.0, epsilon = 1e-12);
    }

    #[test]
    fn check_consistency_passes_on_a_fresh_state() {
        let state = small_state(1.4);
        assert!(state.check_consistency().is_ok());
    }
}
