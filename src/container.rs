//! `LinkerContainer`: owns all linkers of one type and the per-type
//! event tables (spec §4.3).
//!
//! The exact incremental-maintenance algorithm is not recoverable from
//! the retrieved `original_source` snapshot (`CrosslinkerContainer.cpp`
//! there only implements basic free/partial/full list bookkeeping, not
//! the possibility tables) — this module implements spec §4.3's
//! contract directly: `on_*` hooks rescan only the locally affected
//! window (`first_pos_close_to`/`last_pos_close_to`), not the whole
//! system, and the crossing filter (spec §3) is applied whenever a new
//! `PossibleFullConnection` candidate is proposed.

use crate::error::{FilamentSlidingError, Result};
use crate::filament::{Filament, FilamentKind};
use crate::linker::{Direction, Linker, LinkerId, LinkerType, Terminus};

/// A partial linker's opposite-filament free site that, if bound,
/// would complete a `Full` connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PossibleFullConnection {
    pub partial: LinkerId,
    pub site_location: (FilamentKind, usize),
    pub signed_extension: f64,
}

/// A partial linker's bound terminus hopping to an adjacent free site
/// on the same filament.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PossiblePartialHop {
    pub partial: LinkerId,
    pub terminus: Terminus,
    pub target_location: usize,
    pub direction: Direction,
    pub away_from_neighbour: bool,
}

/// A full linker's one terminus hopping to an adjacent free site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PossibleFullHop {
    pub full: LinkerId,
    pub terminus: Terminus,
    pub target_location: usize,
    pub direction: Direction,
    pub old_ext: f64,
    pub new_ext: f64,
    pub away_from_neighbour: bool,
}

/// A currently realized `Full` connection and its signed extension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullConnectionRow {
    pub full: LinkerId,
    pub signed_extension: f64,
}

/// Signed extension, spec §3: `ext = p_m*delta + x_mobile - p_f*delta`.
pub fn signed_extension(fixed_pos: usize, mobile_pos: usize, mobile_x: f64, delta: f64) -> f64 {
    mobile_pos as f64 * delta + mobile_x - fixed_pos as f64 * delta
}

/// Order-insensitive equality: the incremental tables and a from-scratch
/// recompute are not guaranteed to enumerate rows in the same order
/// (spec §8, P5).
fn same_multiset<T: PartialEq + Copy>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut remaining: Vec<T> = b.to_vec();
    for item in a {
        match remaining.iter().position(|r| r == item) {
            Some(pos) => {
                remaining.swap_remove(pos);
            }
            None => return false,
        }
    }
    true
}

fn plus_step(kind: FilamentKind) -> i64 {
    match kind {
        FilamentKind::Fixed => 1,
        FilamentKind::Mobile => -1,
    }
}

fn step_for(kind: FilamentKind, direction: Direction) -> i64 {
    let plus = plus_step(kind);
    match direction {
        Direction::Plus => plus,
        Direction::Minus => -plus,
    }
}

pub struct LinkerContainer {
    pub kind: LinkerType,
    linkers: Vec<Linker>,
    free: Vec<u32>,
    partial: Vec<u32>,
    full: Vec<u32>,
    pub possible_full_connections: Vec<PossibleFullConnection>,
    pub possible_partial_hops: Vec<PossiblePartialHop>,
    pub possible_full_hops: Vec<PossibleFullHop>,
    pub full_connections: Vec<FullConnectionRow>,
}

impl LinkerContainer {
    pub fn new(kind: LinkerType, n_linkers: usize) -> Self {
        let linkers: Vec<Linker> = (0..n_linkers).map(|_| Linker::new_free(kind)).collect();
        let free = (0..n_linkers as u32).collect();
        LinkerContainer {
            kind,
            linkers,
            free,
            partial: Vec::new(),
            full: Vec::new(),
            possible_full_connections: Vec::new(),
            possible_partial_hops: Vec::new(),
            possible_full_hops: Vec::new(),
            full_connections: Vec::new(),
        }
    }

    pub fn n_linkers(&self) -> usize {
        self.linkers.len()
    }

    pub fn linker(&self, id: LinkerId) -> Result<&Linker> {
        self.linkers.get(id.index as usize).ok_or_else(|| {
            FilamentSlidingError::invariant_at("linker id out of range for this container", id)
        })
    }

    fn linker_mut(&mut self, id: LinkerId) -> Result<&mut Linker> {
        if (id.index as usize) >= self.linkers.len() {
            return Err(FilamentSlidingError::invariant_at(
                "linker id out of range for this container",
                id,
            ));
        }
        Ok(&mut self.linkers[id.index as usize])
    }

    /// Mutates the linker's own state (step 1 of `SystemState`'s fixed
    /// three-step order, spec §4.4); callers then mutate the filament
    /// site and broadcast the matching `on_*` hook.
    pub fn connect_linker(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
        filament: FilamentKind,
        position: usize,
    ) -> Result<()> {
        self.linker_mut(id)?.connect(terminus, filament, position)
    }

    pub fn disconnect_linker(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
    ) -> Result<(FilamentKind, usize)> {
        self.linker_mut(id)?.disconnect(terminus)
    }

    pub fn free_ids(&self) -> impl Iterator<Item = LinkerId> + '_ {
        self.free.iter().map(move |&i| LinkerId {
            kind: self.kind,
            index: i,
        })
    }

    pub fn partial_ids(&self) -> impl Iterator<Item = LinkerId> + '_ {
        self.partial.iter().map(move |&i| LinkerId {
            kind: self.kind,
            index: i,
        })
    }

    pub fn full_ids(&self) -> impl Iterator<Item = LinkerId> + '_ {
        self.full.iter().map(move |&i| LinkerId {
            kind: self.kind,
            index: i,
        })
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    pub fn take_any_free(&mut self) -> Result<LinkerId> {
        let idx = self
            .free
            .pop()
            .ok_or_else(|| FilamentSlidingError::precondition("no Free linker of this type"))?;
        Ok(LinkerId {
            kind: self.kind,
            index: idx,
        })
    }

    /// `(fixed_pos, mobile_pos)` for a `Full` linker, read directly off
    /// its two extremities rather than duplicated storage.
    pub fn full_pair(&self, id: LinkerId) -> Result<(usize, usize)> {
        let l = self.linker(id)?;
        if l.head.filament == FilamentKind::Fixed {
            Ok((l.head.position, l.tail.position))
        } else {
            Ok((l.tail.position, l.head.position))
        }
    }

    pub fn all_full_pairs(&self) -> Vec<(usize, usize)> {
        self.full
            .iter()
            .filter_map(|&i| {
                self.full_pair(LinkerId {
                    kind: self.kind,
                    index: i,
                })
                .ok()
            })
            .collect()
    }

    fn move_membership(list_from: &mut Vec<u32>, list_to: &mut Vec<u32>, idx: u32) -> Result<()> {
        let pos = list_from
            .iter()
            .position(|&v| v == idx)
            .ok_or_else(|| FilamentSlidingError::invariant("membership list desync"))?;
        list_from.swap_remove(pos);
        list_to.push(idx);
        Ok(())
    }

    /// Crossing rule (spec §3): candidate `(p_f, p_m)` crosses an
    /// existing full `(q_f, q_m)` iff `sign(p_f - q_f) != sign(p_m - q_m)`.
    fn crosses_any(candidate: (usize, usize), existing: &[(usize, usize)]) -> bool {
        let (pf, pm) = (candidate.0 as i64, candidate.1 as i64);
        existing.iter().any(|&(qf, qm)| {
            let (qf, qm) = (qf as i64, qm as i64);
            if pf == qf || pm == qm {
                return false;
            }
            (pf - qf).signum() != (pm - qm).signum()
        })
    }

    /// Rescans the opposite filament's window around a newly-partial
    /// linker's anchor, adding `PossibleFullConnection` rows for every
    /// free site that would not create a crossing, and one
    /// `PossiblePartialHop` per free adjacent site.
    pub fn on_free_to_partial(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
        fixed: &Filament,
        mobile: &Filament,
        max_stretch: f64,
        other_full_pairs: &[(usize, usize)],
    ) -> Result<()> {
        {
            let idx = id.index;
            Self::move_membership(&mut self.free, &mut self.partial, idx)?;
        }
        self.recompute_possibilities_for_partial(
            id,
            terminus,
            fixed,
            mobile,
            max_stretch,
            other_full_pairs,
        )
    }

    fn recompute_possibilities_for_partial(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
        fixed: &Filament,
        mobile: &Filament,
        max_stretch: f64,
        other_full_pairs: &[(usize, usize)],
    ) -> Result<()> {
        let ext = *self.linker(id)?.extremity(terminus);
        let (anchor_filament, opposite, anchor_kind) = match ext.filament {
            FilamentKind::Fixed => (fixed, mobile, FilamentKind::Fixed),
            FilamentKind::Mobile => (mobile, fixed, FilamentKind::Mobile),
        };
        let anchor_pos = ext.position;
        let p_anchor = anchor_filament.physical_position(anchor_pos);
        let lo = opposite.first_pos_close_to(p_anchor, max_stretch);
        let hi = opposite.last_pos_close_to(p_anchor, max_stretch);

        let mut own_full_pairs = self.all_full_pairs();
        own_full_pairs.extend_from_slice(other_full_pairs);

        for opp_pos in lo..=hi {
            if opp_pos >= opposite.n_sites() || !opposite.sites[opp_pos].is_free() {
                continue;
            }
            let (p_f, p_m) = match anchor_kind {
                FilamentKind::Fixed => (anchor_pos, opp_pos),
                FilamentKind::Mobile => (opp_pos, anchor_pos),
            };
            if Self::crosses_any((p_f, p_m), &own_full_pairs) {
                continue;
            }
            let ext_val = signed_extension(p_f, p_m, mobile.x, fixed.lattice_spacing);
            if ext_val.abs() >= max_stretch {
                continue;
            }
            self.possible_full_connections.push(PossibleFullConnection {
                partial: id,
                site_location: (opposite.kind, opp_pos),
                signed_extension: ext_val,
            });
        }

        self.refresh_partial_hops_for(id, terminus, anchor_filament)?;
        Ok(())
    }

    fn refresh_partial_hops_for(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
        anchor_filament: &Filament,
    ) -> Result<()> {
        self.possible_partial_hops
            .retain(|h| !(h.partial == id && h.terminus == terminus));
        let anchor_pos = self.linker(id)?.extremity(terminus).position;
        for &direction in &[Direction::Plus, Direction::Minus] {
            let step = step_for(anchor_filament.kind, direction);
            let target = anchor_pos as i64 + step;
            if target < 0 || target as usize >= anchor_filament.n_sites() {
                continue;
            }
            let target = target as usize;
            if !anchor_filament.sites[target].is_free() {
                continue;
            }
            let away_from_neighbour =
                self.is_away_from_neighbour(anchor_filament, target, direction);
            self.possible_partial_hops.push(PossiblePartialHop {
                partial: id,
                terminus,
                target_location: target,
                direction,
                away_from_neighbour,
            });
        }
        Ok(())
    }

    fn is_away_from_neighbour(
        &self,
        filament: &Filament,
        target_pos: usize,
        direction: Direction,
    ) -> bool {
        let step = step_for(filament.kind, direction);
        let next = target_pos as i64 + step;
        if next < 0 || next as usize >= filament.n_sites() {
            return true;
        }
        match filament.sites[next as usize].bound {
            Some((lid, _)) => lid.kind != self.kind,
            None => true,
        }
    }

    /// Removes all event-table rows keyed by `id` (spec §4.3:
    /// "remove all rows keyed by this linker").
    pub fn on_partial_to_free(&mut self, id: LinkerId) -> Result<()> {
        Self::move_membership(&mut self.partial, &mut self.free, id.index)?;
        self.possible_full_connections.retain(|c| c.partial != id);
        self.possible_partial_hops.retain(|h| h.partial != id);
        Ok(())
    }

    /// The partial completed into a `Full` connection at `terminus`
    /// connecting to the opposite filament at `new_location`.
    pub fn on_partial_to_full(
        &mut self,
        id: LinkerId,
        fixed: &Filament,
        mobile: &Filament,
        max_stretch: f64,
    ) -> Result<()> {
        Self::move_membership(&mut self.partial, &mut self.full, id.index)?;
        self.possible_full_connections.retain(|c| c.partial != id);
        self.possible_partial_hops.retain(|h| h.partial != id);

        let (p_f, p_m) = self.full_pair(id)?;
        let ext = signed_extension(p_f, p_m, mobile.x, fixed.lattice_spacing);
        self.full_connections.push(FullConnectionRow {
            full: id,
            signed_extension: ext,
        });

        for &terminus in &[Terminus::Head, Terminus::Tail] {
            self.refresh_full_hops_for(id, terminus, fixed, mobile)?;
        }
        Ok(())
    }

    fn refresh_full_hops_for(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
        fixed: &Filament,
        mobile: &Filament,
    ) -> Result<()> {
        self.possible_full_hops
            .retain(|h| !(h.full == id && h.terminus == terminus));
        let ext = *self.linker(id)?.extremity(terminus);
        let anchor_filament = match ext.filament {
            FilamentKind::Fixed => fixed,
            FilamentKind::Mobile => mobile,
        };
        let (p_f, p_m) = self.full_pair(id)?;
        let old_ext = signed_extension(p_f, p_m, mobile.x, fixed.lattice_spacing);

        for &direction in &[Direction::Plus, Direction::Minus] {
            let step = step_for(anchor_filament.kind, direction);
            let target = ext.position as i64 + step;
            if target < 0 || target as usize >= anchor_filament.n_sites() {
                continue;
            }
            let target = target as usize;
            if !anchor_filament.sites[target].is_free() {
                continue;
            }
            let (new_pf, new_pm) = match ext.filament {
                FilamentKind::Fixed => (target, p_m),
                FilamentKind::Mobile => (p_f, target),
            };
            let new_ext = signed_extension(new_pf, new_pm, mobile.x, fixed.lattice_spacing);
            let away_from_neighbour =
                self.is_away_from_neighbour(anchor_filament, target, direction);
            self.possible_full_hops.push(PossibleFullHop {
                full: id,
                terminus,
                target_location: target,
                direction,
                old_ext,
                new_ext,
                away_from_neighbour,
            });
        }
        Ok(())
    }

    /// Inverse of `on_partial_to_full`: the full connection lost one
    /// terminus and is partial again, still bound at `remaining_terminus`.
    pub fn on_full_to_partial(
        &mut self,
        id: LinkerId,
        remaining_terminus: Terminus,
        fixed: &Filament,
        mobile: &Filament,
        max_stretch: f64,
        other_full_pairs: &[(usize, usize)],
    ) -> Result<()> {
        Self::move_membership(&mut self.full, &mut self.partial, id.index)?;
        self.full_connections.retain(|r| r.full != id);
        self.possible_full_hops.retain(|h| h.full != id);
        self.recompute_possibilities_for_partial(
            id,
            remaining_terminus,
            fixed,
            mobile,
            max_stretch,
            other_full_pairs,
        )
    }

    /// A partial linker's bound terminus hopped to an adjacent site on
    /// the same filament (spec §4.5, `HopPartial`): membership is
    /// unchanged, only the possibility tables keyed by `id` are stale.
    pub fn on_partial_repositioned(
        &mut self,
        id: LinkerId,
        terminus: Terminus,
        fixed: &Filament,
        mobile: &Filament,
        max_stretch: f64,
        other_full_pairs: &[(usize, usize)],
    ) -> Result<()> {
        self.possible_full_connections.retain(|c| c.partial != id);
        self.recompute_possibilities_for_partial(
            id,
            terminus,
            fixed,
            mobile,
            max_stretch,
            other_full_pairs,
        )
    }

    /// A full linker's one terminus hopped to an adjacent site (spec
    /// §4.5, `HopFull`): refreshes its `FullConnectionRow` and both
    /// termini's `possible_full_hops`.
    pub fn on_full_repositioned(
        &mut self,
        id: LinkerId,
        fixed: &Filament,
        mobile: &Filament,
    ) -> Result<()> {
        self.full_connections.retain(|r| r.full != id);
        let (p_f, p_m) = self.full_pair(id)?;
        let ext = signed_extension(p_f, p_m, mobile.x, fixed.lattice_spacing);
        self.full_connections
            .push(FullConnectionRow { full: id, signed_extension: ext });
        for &t in &[Terminus::Head, Terminus::Tail] {
            self.refresh_full_hops_for(id, t, fixed, mobile)?;
        }
        Ok(())
    }

    /// A free or blocked site changed classification; rescan the
    /// affected position's adjacent hop candidates (spec §4.3).
    pub fn on_block(&mut self, pos: usize, filament: &Filament) -> Result<()> {
        self.rescan_window(pos, pos, filament)
    }

    pub fn on_grow(&mut self, new_pos: usize, filament: &Filament) -> Result<()> {
        self.rescan_window(new_pos.saturating_sub(1), new_pos, filament)
    }

    fn rescan_window(&mut self, lo: usize, hi: usize, filament: &Filament) -> Result<()> {
        let affected: Vec<(LinkerId, Terminus)> = self
            .partial
            .iter()
            .filter_map(|&idx| {
                let id = LinkerId {
                    kind: self.kind,
                    index: idx,
                };
                let linker = &self.linkers[idx as usize];
                let terminus = linker.connected_terminus()?;
                let ext = linker.extremity(terminus);
                if ext.filament == filament.kind && ext.position >= lo && ext.position <= hi {
                    Some((id, terminus))
                } else {
                    None
                }
            })
            .collect();
        for (id, terminus) in affected {
            self.refresh_partial_hops_for(id, terminus, filament)?;
        }
        Ok(())
    }

    /// Refreshes `away_from_neighbour` flags on this container's
    /// partial and full linkers anchored within two sites of `pos` on
    /// `changed_filament` (spec §4.3/§4.5: a site's occupancy change
    /// can flip the bias flag of a hop target one site beyond it, so a
    /// window of two sites in either direction covers every candidate
    /// whose flag depends on `pos`). Called on every container,
    /// including those of other linker types, since neighbour-bias
    /// flags read any bound linker regardless of type (spec §4.3/§4.5).
    pub fn rescan_neighbour_bias(
        &mut self,
        pos: usize,
        changed_filament: FilamentKind,
        fixed: &Filament,
        mobile: &Filament,
    ) -> Result<()> {
        let anchor_filament = match changed_filament {
            FilamentKind::Fixed => fixed,
            FilamentKind::Mobile => mobile,
        };
        let lo = pos.saturating_sub(2);
        let hi = pos + 2;

        let affected_partials: Vec<(LinkerId, Terminus)> = self
            .partial
            .iter()
            .filter_map(|&idx| {
                let id = LinkerId {
                    kind: self.kind,
                    index: idx,
                };
                let linker = &self.linkers[idx as usize];
                let terminus = linker.connected_terminus()?;
                let ext = linker.extremity(terminus);
                if ext.filament == changed_filament && ext.position >= lo && ext.position <= hi {
                    Some((id, terminus))
                } else {
                    None
                }
            })
            .collect();
        for (id, terminus) in affected_partials {
            self.refresh_partial_hops_for(id, terminus, anchor_filament)?;
        }

        let affected_fulls: Vec<LinkerId> = self
            .full
            .iter()
            .filter_map(|&idx| {
                let id = LinkerId {
                    kind: self.kind,
                    index: idx,
                };
                let linker = &self.linkers[idx as usize];
                let on_changed_filament = [linker.head, linker.tail].iter().any(|ext| {
                    ext.filament == changed_filament && ext.position >= lo && ext.position <= hi
                });
                on_changed_filament.then_some(id)
            })
            .collect();
        for id in affected_fulls {
            for &terminus in &[Terminus::Head, Terminus::Tail] {
                self.refresh_full_hops_for(id, terminus, fixed, mobile)?;
            }
        }
        Ok(())
    }

    /// Shifts every stored signed extension by `delta_x` and evicts
    /// rows that would exceed `max_stretch`, returning the full
    /// linkers whose connection must now be demoted by `SystemState`.
    pub fn on_mobile_moved(&mut self, delta_x: f64, max_stretch: f64) -> Vec<LinkerId> {
        for c in &mut self.possible_full_connections {
            c.signed_extension += delta_x;
        }
        for h in &mut self.possible_full_hops {
            h.old_ext += delta_x;
            h.new_ext += delta_x;
        }
        let mut violators = Vec::new();
        self.full_connections.retain_mut(|row| {
            row.signed_extension += delta_x;
            if row.signed_extension.abs() >= max_stretch {
                violators.push(row.full);
                false
            } else {
                true
            }
        });
        violators
    }

    /// `(max lower, min upper)` displacement keeping every `Full`
    /// connection strictly within `|ext| < max_stretch` (spec §4.3).
    pub fn movement_borders(&self, max_stretch: f64) -> (f64, f64) {
        let mut lower = f64::NEG_INFINITY;
        let mut upper = f64::INFINITY;
        for row in &self.full_connections {
            let e = row.signed_extension;
            lower = lower.max(-max_stretch - e);
            upper = upper.min(max_stretch - e);
        }
        (lower, upper)
    }

    /// Recomputes every event table from scratch and checks it equals
    /// the incrementally maintained state (spec §8, P5).
    pub fn check_possibilities_consistency(
        &self,
        fixed: &Filament,
        mobile: &Filament,
        max_stretch: f64,
        other_full_pairs: &[(usize, usize)],
    ) -> Result<()> {
        let mut scratch = LinkerContainer {
            kind: self.kind,
            linkers: self.linkers.clone(),
            free: Vec::new(),
            partial: self.partial.clone(),
            full: self.full.clone(),
            possible_full_connections: Vec::new(),
            possible_partial_hops: Vec::new(),
            possible_full_hops: Vec::new(),
            full_connections: Vec::new(),
        };
        for &idx in &self.partial.clone() {
            let id = LinkerId {
                kind: self.kind,
                index: idx,
            };
            let terminus = scratch
                .linker(id)?
                .connected_terminus()
                .ok_or_else(|| FilamentSlidingError::invariant("partial linker has no terminus"))?;
            scratch.recompute_possibilities_for_partial(
                id,
                terminus,
                fixed,
                mobile,
                max_stretch,
                other_full_pairs,
            )?;
        }
        for &idx in &self.full.clone() {
            let id = LinkerId {
                kind: self.kind,
                index: idx,
            };
            let (p_f, p_m) = scratch.full_pair(id)?;
            let ext = signed_extension(p_f, p_m, mobile.x, fixed.lattice_spacing);
            scratch
                .full_connections
                .push(FullConnectionRow { full: id, signed_extension: ext });
            for &terminus in &[Terminus::Head, Terminus::Tail] {
                scratch.refresh_full_hops_for(id, terminus, fixed, mobile)?;
            }
        }

        if !same_multiset(&scratch.full_connections, &self.full_connections) {
            return Err(FilamentSlidingError::invariant(format!(
                "{:?}: full_connections desync (incremental {} vs recomputed {})",
                self.kind,
                self.full_connections.len(),
                scratch.full_connections.len()
            )));
        }
        if !same_multiset(&scratch.possible_full_connections, &self.possible_full_connections) {
            return Err(FilamentSlidingError::invariant(format!(
                "{:?}: possible_full_connections desync (incremental {} vs recomputed {})",
                self.kind,
                self.possible_full_connections.len(),
                scratch.possible_full_connections.len()
            )));
        }
        if !same_multiset(&scratch.possible_partial_hops, &self.possible_partial_hops) {
            return Err(FilamentSlidingError::invariant(format!(
                "{:?}: possible_partial_hops desync (incremental {} vs recomputed {})",
                self.kind,
                self.possible_partial_hops.len(),
                scratch.possible_partial_hops.len()
            )));
        }
        if !same_multiset(&scratch.possible_full_hops, &self.possible_full_hops) {
            return Err(FilamentSlidingError::invariant(format!(
                "{:?}: possible_full_hops desync (incremental {} vs recomputed {})",
                self.kind,
                self.possible_full_hops.len(),
                scratch.possible_full_hops.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filament::Filament;

    fn setup() -> (LinkerContainer, Filament, Filament) {
        let container = LinkerContainer::new(LinkerType::Passive, 4);
        let fixed = Filament::new(FilamentKind::Fixed, 10, 1.0);
        let mobile = Filament::new(FilamentKind::Mobile, 10, 1.0);
        (container, fixed, mobile)
    }

    #[test]
    fn new_container_has_all_linkers_free() {
        let (c, _, _) = setup();
        assert_eq!(c.n_free(), 4);
        assert_eq!(c.partial_ids().count(), 0);
        assert_eq!(c.full_ids().count(), 0);
    }

    #[test]
    fn free_to_partial_populates_full_connection_candidates() {
        let (mut c, mut fixed, mobile) = setup();
        let id = c.take_any_free().unwrap();
        c.linker_mut(id)
            .unwrap()
            .connect(Terminus::Tail, FilamentKind::Fixed, 5)
            .unwrap();
        fixed.connect(5, id, Terminus::Tail).unwrap();
        c.on_free_to_partial(id, Terminus::Tail, &fixed, &mobile, 1.4, &[])
            .unwrap();
        assert!(!c.possible_full_connections.is_empty());
        assert_eq!(c.partial_ids().count(), 1);
    }

    #[test]
    fn partial_to_full_populates_full_connection_row() {
        let (mut c, mut fixed, mut mobile) = setup();
        let id = c.take_any_free().unwrap();
        c.linker_mut(id)
            .unwrap()
            .connect(Terminus::Tail, FilamentKind::Fixed, 5)
            .unwrap();
        fixed.connect(5, id, Terminus::Tail).unwrap();
        c.on_free_to_partial(id, Terminus::Tail, &fixed, &mobile, 1.4, &[])
            .unwrap();

        c.linker_mut(id)
            .unwrap()
            .connect(Terminus::Head, FilamentKind::Mobile, 5)
            .unwrap();
        mobile.connect(5, id, Terminus::Head).unwrap();
        c.on_partial_to_full(id, &fixed, &mobile, 1.4).unwrap();

        assert_eq!(c.full_connections.len(), 1);
        assert_eq!(c.full_connections[0].signed_extension, 0.0);
        assert_eq!(c.full_ids().count(), 1);
    }

    #[test]
    fn crossing_candidate_is_filtered_out() {
        let (mut c, _fixed, _mobile) = setup();
        let existing = vec![(5usize, 5usize)];
        assert!(LinkerContainer::crosses_any((4, 6), &existing));
        assert!(!LinkerContainer::crosses_any((4, 4), &existing));
        let _ = &mut c;
    }

    #[test]
    fn movement_borders_default_to_unbounded_with_no_fulls() {
        let (c, _, _) = setup();
        let (lo, hi) = c.movement_borders(1.4);
        assert_eq!(lo, f64::NEG_INFINITY);
        assert_eq!(hi, f64::INFINITY);
    }

    #[test]
    fn movement_borders_tighten_with_a_full_connection() {
        let (mut c, _, _) = setup();
        c.full_connections.push(FullConnectionRow {
            full: LinkerId {
                kind: LinkerType::Passive,
                index: 0,
            },
            signed_extension: 0.5,
        });
        let (lo, hi) = c.movement_borders(1.4);
        assert!((lo - (-1.9)).abs() < 1e-12);
        assert!((hi - 0.9).abs() < 1e-12);
    }

    #[test]
    fn on_mobile_moved_shifts_and_evicts() {
        let (mut c, _, _) = setup();
        c.full_connections.push(FullConnectionRow {
            full: LinkerId {
                kind: LinkerType::Passive,
                index: 0,
            },
            signed_extension: 1.3,
        });
        let violators = c.on_mobile_moved(0.2, 1.4);
        assert_eq!(violators.len(), 1);
        assert!(c.full_connections.is_empty());
    }
}
