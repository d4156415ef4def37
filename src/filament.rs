//! `Filament`: an ordered lattice of sites with a plus end.
//!
//! Ported from `original_source/Microtubule.hpp` and
//! `MobileMicrotubule.hpp`. The same type covers both the `Fixed` and
//! `Mobile` variants named in spec §3; `x` and `attractor_index` are
//! only meaningful when `kind == Mobile`, mirroring the original's
//! plain (non-`Option`) fields that are simply unused on the fixed
//! side.
//!
//! Partition convention (spec §3, P1): every site position belongs to
//! exactly one of three deques — `free_tip`, `free_blocked`, or
//! `bound_tip`. A site that becomes bound is always removed from
//! whichever free deque held it and pushed onto `bound_tip`,
//! regardless of its `blocked` flag; `blocked` only matters while the
//! site is free. This matches the three-way partition spec.md names
//! (not four-way) — bound-and-blocked is not tracked as a distinct
//! bucket.

use crate::error::{FilamentSlidingError, Result};
use crate::linker::{LinkerId, Terminus};
use crate::site::{Site, SiteType};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilamentKind {
    Fixed,
    Mobile,
}

#[derive(Debug, Clone)]
pub struct Filament {
    pub kind: FilamentKind,
    pub lattice_spacing: f64,
    pub sites: Vec<Site>,
    pub free_tip: VecDeque<usize>,
    pub free_blocked: VecDeque<usize>,
    pub bound_tip: VecDeque<usize>,
    /// Real-valued displacement; meaningful only when `kind == Mobile`.
    pub x: f64,
    /// Count of unblocked tip sites at the plus end.
    pub tip_size: usize,
    /// Barrier-crossing bookkeeping; meaningful only when `kind == Mobile`.
    pub attractor_index: i64,
}

impl Filament {
    pub fn new(kind: FilamentKind, n_sites: usize, lattice_spacing: f64) -> Self {
        let sites = vec![Site::new_free_unblocked(); n_sites];
        let free_tip: VecDeque<usize> = (0..n_sites).collect();
        Filament {
            kind,
            lattice_spacing,
            sites,
            free_tip,
            free_blocked: VecDeque::new(),
            bound_tip: VecDeque::new(),
            x: 0.0,
            tip_size: n_sites,
            attractor_index: 0,
        }
    }

    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    fn require_in_range(&self, pos: usize) -> Result<()> {
        if pos >= self.sites.len() {
            return Err(FilamentSlidingError::invariant(format!(
                "site position {pos} out of range (n_sites = {})",
                self.sites.len()
            )));
        }
        Ok(())
    }

    /// Binds `pos` to `(linker, terminus)`. Precondition: site free.
    pub fn connect(&mut self, pos: usize, linker: LinkerId, terminus: Terminus) -> Result<()> {
        self.require_in_range(pos)?;
        let site = &mut self.sites[pos];
        if !site.is_free() {
            return Err(FilamentSlidingError::precondition(format!(
                "connect on already-bound site {pos}"
            )));
        }
        let deque = if site.blocked {
            &mut self.free_blocked
        } else {
            &mut self.free_tip
        };
        remove_first(deque, pos).ok_or_else(|| {
            FilamentSlidingError::invariant(format!(
                "free site {pos} missing from its free deque"
            ))
        })?;
        site.bound = Some((linker, terminus));
        self.bound_tip.push_back(pos);
        Ok(())
    }

    /// Inverse of `connect`. Fails if the site is free.
    pub fn disconnect(&mut self, pos: usize) -> Result<(LinkerId, Terminus)> {
        self.require_in_range(pos)?;
        let site = &mut self.sites[pos];
        let bound = site.bound.take().ok_or_else(|| {
            FilamentSlidingError::precondition(format!("disconnect on already-free site {pos}"))
        })?;
        remove_first(&mut self.bound_tip, pos).ok_or_else(|| {
            FilamentSlidingError::invariant(format!(
                "bound site {pos} missing from bound_tip deque"
            ))
        })?;
        let deque = if site.blocked {
            &mut self.free_blocked
        } else {
            &mut self.free_tip
        };
        deque.push_back(pos);
        Ok(bound)
    }

    /// Flips `blocked`. Only legal while the site is free: reassigns
    /// the position between the free-tip and free-blocked partitions.
    pub fn block(&mut self, pos: usize) -> Result<()> {
        self.require_in_range(pos)?;
        let site = &mut self.sites[pos];
        if !site.is_free() {
            return Err(FilamentSlidingError::precondition(format!(
                "block on bound site {pos}"
            )));
        }
        if site.blocked {
            return Err(FilamentSlidingError::precondition(format!(
                "block on already-blocked site {pos}"
            )));
        }
        site.blocked = true;
        remove_first(&mut self.free_tip, pos).ok_or_else(|| {
            FilamentSlidingError::invariant(format!("free-tip site {pos} missing from deque"))
        })?;
        self.free_blocked.push_back(pos);
        Ok(())
    }

    pub fn unblock(&mut self, pos: usize) -> Result<()> {
        self.require_in_range(pos)?;
        let site = &mut self.sites[pos];
        if !site.is_free() {
            return Err(FilamentSlidingError::precondition(format!(
                "unblock on bound site {pos}"
            )));
        }
        if !site.blocked {
            return Err(FilamentSlidingError::precondition(format!(
                "unblock on already-unblocked site {pos}"
            )));
        }
        site.blocked = false;
        remove_first(&mut self.free_blocked, pos).ok_or_else(|| {
            FilamentSlidingError::invariant(format!("free-blocked site {pos} missing from deque"))
        })?;
        self.free_tip.push_back(pos);
        Ok(())
    }

    /// Appends a free, unblocked site at the plus end. Only legal on
    /// `Fixed` filaments (spec §4.1).
    pub fn grow_one_site(&mut self) -> Result<usize> {
        if self.kind != FilamentKind::Fixed {
            return Err(FilamentSlidingError::precondition(
                "grow_one_site called on a non-Fixed filament",
            ));
        }
        let new_pos = self.sites.len();
        self.sites.push(Site::new_free_unblocked());
        self.free_tip.push_back(new_pos);
        self.tip_size += 1;
        Ok(new_pos)
    }

    /// The `k`-th entry of the free-tip or free-blocked deque.
    pub fn free_site_position(&self, site_type: SiteType, k: usize) -> Result<usize> {
        let deque = match site_type {
            SiteType::Tip => &self.free_tip,
            SiteType::Blocked => &self.free_blocked,
        };
        deque.get(k).copied().ok_or_else(|| {
            FilamentSlidingError::precondition(format!(
                "no {site_type:?} free site at index {k} (only {} available)",
                deque.len()
            ))
        })
    }

    /// Windowed index range (inclusive) within `max_stretch` of a
    /// physical position `p`, clamped to `[0, n_sites-1]`. Localizes
    /// the possibility-table rescans (spec §4.1, §4.3).
    pub fn first_pos_close_to(&self, p: f64, max_stretch: f64) -> usize {
        let idx = crate::math::int_floor((p - max_stretch) / self.lattice_spacing);
        idx.max(0) as usize
    }

    pub fn last_pos_close_to(&self, p: f64, max_stretch: f64) -> usize {
        let idx = crate::math::int_ceil((p + max_stretch) / self.lattice_spacing);
        let max_index = self.n_sites().saturating_sub(1) as i64;
        idx.clamp(0, max_index) as usize
    }

    /// Physical position of site `pos`, including the mobile offset
    /// `x` when `kind == Mobile`.
    pub fn physical_position(&self, pos: usize) -> f64 {
        pos as f64 * self.lattice_spacing + self.x
    }

    /// Re-derives the three-way partition from `sites` and checks it
    /// against the stored deques (spec §8, P1).
    pub fn check_internal_consistency(&self) -> Result<()> {
        let mut seen = vec![false; self.sites.len()];
        for &pos in &self.free_tip {
            self.require_in_range(pos)?;
            let site = self.sites[pos];
            if site.blocked || !site.is_free() {
                return Err(FilamentSlidingError::invariant(format!(
                    "free_tip contains non-free-unblocked site {pos}"
                )));
            }
            if std::mem::replace(&mut seen[pos], true) {
                return Err(FilamentSlidingError::invariant(format!(
                    "site {pos} present in more than one partition"
                )));
            }
        }
        for &pos in &self.free_blocked {
            self.require_in_range(pos)?;
            let site = self.sites[pos];
            if !site.blocked || !site.is_free() {
                return Err(FilamentSlidingError::invariant(format!(
                    "free_blocked contains non-free-blocked site {pos}"
                )));
            }
            if std::mem::replace(&mut seen[pos], true) {
                return Err(FilamentSlidingError::invariant(format!(
                    "site {pos} present in more than one partition"
                )));
            }
        }
        for &pos in &self.bound_tip {
            self.require_in_range(pos)?;
            if self.sites[pos].is_free() {
                return Err(FilamentSlidingError::invariant(format!(
                    "bound_tip contains free site {pos}"
                )));
            }
            if std::mem::replace(&mut seen[pos], true) {
                return Err(FilamentSlidingError::invariant(format!(
                    "site {pos} present in more than one partition"
                )));
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(FilamentSlidingError::invariant(
                "some site is not covered by any of the three partitions",
            ));
        }
        Ok(())
    }
}

fn remove_first(deque: &mut VecDeque<usize>, value: usize) -> Option<usize> {
    let idx = deque.iter().position(|&v| v == value)?;
    deque.remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::LinkerType;

    fn linker_id() -> LinkerId {
        LinkerId {
            kind: LinkerType::Passive,
            index: 0,
        }
    }

    #[test]
    fn fresh_filament_partitions_p1() {
        let f = Filament::new(FilamentKind::Fixed, 10, 1.0);
        assert!(f.check_internal_consistency().is_ok());
        assert_eq!(f.free_tip.len(), 10);
    }

    #[test]
    fn connect_then_disconnect_restores_partition() {
        let mut f = Filament::new(FilamentKind::Mobile, 10, 1.0);
        f.connect(5, linker_id(), Terminus::Head).unwrap();
        assert!(f.sites[5].bound.is_some());
        assert!(f.check_internal_consistency().is_ok());
        f.disconnect(5).unwrap();
        assert!(f.sites[5].bound.is_none());
        assert!(f.check_internal_consistency().is_ok());
    }

    #[test]
    fn connect_on_bound_site_fails() {
        let mut f = Filament::new(FilamentKind::Fixed, 4, 1.0);
        f.connect(0, linker_id(), Terminus::Head).unwrap();
        assert!(f.connect(0, linker_id(), Terminus::Tail).is_err());
    }

    #[test]
    fn block_and_unblock_round_trip() {
        let mut f = Filament::new(FilamentKind::Fixed, 4, 1.0);
        f.block(2).unwrap();
        assert!(f.sites[2].blocked);
        assert!(f.check_internal_consistency().is_ok());
        f.unblock(2).unwrap();
        assert!(!f.sites[2].blocked);
        assert!(f.check_internal_consistency().is_ok());
    }

    #[test]
    fn block_on_bound_site_fails() {
        let mut f = Filament::new(FilamentKind::Fixed, 4, 1.0);
        f.connect(1, linker_id(), Terminus::Head).unwrap();
        assert!(f.block(1).is_err());
    }

    #[test]
    fn grow_only_allowed_on_fixed() {
        let mut fixed = Filament::new(FilamentKind::Fixed, 4, 1.0);
        assert_eq!(fixed.grow_one_site().unwrap(), 4);
        assert_eq!(fixed.n_sites(), 5);

        let mut mobile = Filament::new(FilamentKind::Mobile, 4, 1.0);
        assert!(mobile.grow_one_site().is_err());
    }

    #[test]
    fn windowed_range_clamps_to_bounds() {
        let f = Filament::new(FilamentKind::Fixed, 10, 1.0);
        assert_eq!(f.first_pos_close_to(-5.0, 1.4), 0);
        assert_eq!(f.last_pos_close_to(500.0, 1.4), 9);
    }

    #[test]
    fn out_of_range_position_is_fatal() {
        let mut f = Filament::new(FilamentKind::Fixed, 4, 1.0);
        assert!(f.connect(99, linker_id(), Terminus::Head).is_err());
        assert!(f.disconnect(99).is_err());
    }
}
