//! Linker (cross-linker) and its two extremities.
//!
//! Ported from `original_source/include/filament-sliding/Crosslinker.hpp`
//! and `Extremity.hpp`. A `Linker` mutates only its own two
//! extremities; the derived-state invariants from spec §3 (`Free` /
//! `Partial` / `Full`) follow directly from their `connected` flags.
//! `SystemState` is the only caller permitted to invoke these methods
//! (spec §4.4): a `Linker` never talks to a `Filament` or a
//! `LinkerContainer` directly.

use crate::error::{FilamentSlidingError, Result};
use crate::filament::FilamentKind;
use std::fmt;

/// The three cross-linker species. Each reaction kind is instantiated
/// once per type (6 kinds x 3 types = 18 reactions, spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkerType {
    Passive,
    Dual,
    Active,
}

impl LinkerType {
    pub const ALL: [LinkerType; 3] = [LinkerType::Passive, LinkerType::Dual, LinkerType::Active];

    pub fn index(self) -> usize {
        match self {
            LinkerType::Passive => 0,
            LinkerType::Dual => 1,
            LinkerType::Active => 2,
        }
    }
}

impl fmt::Display for LinkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkerType::Passive => "passive",
            LinkerType::Dual => "dual",
            LinkerType::Active => "active",
        };
        write!(f, "{name}")
    }
}

/// Which end of a linker: distinguished because binding/unbinding
/// rates are weighted differently per terminus (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminus {
    Head,
    Tail,
}

impl Terminus {
    pub fn opposite(self) -> Terminus {
        match self {
            Terminus::Head => Terminus::Tail,
            Terminus::Tail => Terminus::Head,
        }
    }
}

/// Plus-directed means toward the filament's plus end: for `Fixed`
/// that is increasing index, for `Mobile` that is decreasing index
/// (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Plus,
    Minus,
}

/// A stable, typed handle into a `LinkerContainer`'s arena. Replaces
/// the raw-pointer identity used by the original source (spec §9's
/// re-architecture note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkerId {
    pub kind: LinkerType,
    pub index: u32,
}

/// One end of a linker. `filament`/`position` are only meaningful
/// while `connected` is true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremity {
    pub connected: bool,
    pub filament: FilamentKind,
    pub position: usize,
}

impl Extremity {
    pub fn disconnected() -> Self {
        Extremity {
            connected: false,
            filament: FilamentKind::Fixed,
            position: 0,
        }
    }
}

impl Default for Extremity {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Derived connection state of a `Linker` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerState {
    Free,
    Partial,
    Full,
}

/// A cross-linker with an immutable type and two mutable extremities.
#[derive(Debug, Clone)]
pub struct Linker {
    pub kind: LinkerType,
    pub head: Extremity,
    pub tail: Extremity,
}

impl Linker {
    pub fn new_free(kind: LinkerType) -> Self {
        Linker {
            kind,
            head: Extremity::disconnected(),
            tail: Extremity::disconnected(),
        }
    }

    pub fn extremity(&self, terminus: Terminus) -> &Extremity {
        match terminus {
            Terminus::Head => &self.head,
            Terminus::Tail => &self.tail,
        }
    }

    fn extremity_mut(&mut self, terminus: Terminus) -> &mut Extremity {
        match terminus {
            Terminus::Head => &mut self.head,
            Terminus::Tail => &mut self.tail,
        }
    }

    /// Derived state from the two extremities' `connected` flags. A
    /// `Full` linker connected twice to the *same* filament is an
    /// invariant violation that `SystemState` must never allow to
    /// occur; `Linker` itself has no filament-identity check because
    /// it does not know about crossing rules (spec §4.2: "pure
    /// methods that mutate only its own two extremities").
    pub fn state(&self) -> LinkerState {
        match (self.head.connected, self.tail.connected) {
            (false, false) => LinkerState::Free,
            (true, true) => LinkerState::Full,
            _ => LinkerState::Partial,
        }
    }

    pub fn connect(
        &mut self,
        terminus: Terminus,
        filament: FilamentKind,
        position: usize,
    ) -> Result<()> {
        let ext = self.extremity_mut(terminus);
        if ext.connected {
            return Err(FilamentSlidingError::precondition(format!(
                "connect on an already-connected {terminus:?} extremity"
            )));
        }
        ext.connected = true;
        ext.filament = filament;
        ext.position = position;
        Ok(())
    }

    pub fn disconnect(&mut self, terminus: Terminus) -> Result<(FilamentKind, usize)> {
        let ext = self.extremity_mut(terminus);
        if !ext.connected {
            return Err(FilamentSlidingError::precondition(format!(
                "disconnect on an already-free {terminus:?} extremity"
            )));
        }
        let old = (ext.filament, ext.position);
        *ext = Extremity::disconnected();
        Ok(old)
    }

    /// The single connected terminus of a `Partial` linker, if any.
    pub fn connected_terminus(&self) -> Option<Terminus> {
        match (self.head.connected, self.tail.connected) {
            (true, false) => Some(Terminus::Head),
            (false, true) => Some(Terminus::Tail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_linker_is_free() {
        let l = Linker::new_free(LinkerType::Passive);
        assert_eq!(l.state(), LinkerState::Free);
    }

    #[test]
    fn connect_one_terminus_makes_it_partial() {
        let mut l = Linker::new_free(LinkerType::Active);
        l.connect(Terminus::Head, FilamentKind::Fixed, 5).unwrap();
        assert_eq!(l.state(), LinkerState::Partial);
        assert_eq!(l.connected_terminus(), Some(Terminus::Head));
    }

    #[test]
    fn connect_both_termini_makes_it_full() {
        let mut l = Linker::new_free(LinkerType::Dual);
        l.connect(Terminus::Head, FilamentKind::Fixed, 5).unwrap();
        l.connect(Terminus::Tail, FilamentKind::Mobile, 5).unwrap();
        assert_eq!(l.state(), LinkerState::Full);
    }

    #[test]
    fn double_connect_same_terminus_fails() {
        let mut l = Linker::new_free(LinkerType::Passive);
        l.connect(Terminus::Head, FilamentKind::Fixed, 0).unwrap();
        assert!(l.connect(Terminus::Head, FilamentKind::Fixed, 1).is_err());
    }

    #[test]
    fn disconnect_restores_free_extremity() {
        let mut l = Linker::new_free(LinkerType::Passive);
        l.connect(Terminus::Tail, FilamentKind::Mobile, 3).unwrap();
        let (filament, pos) = l.disconnect(Terminus::Tail).unwrap();
        assert_eq!(filament, FilamentKind::Mobile);
        assert_eq!(pos, 3);
        assert_eq!(l.state(), LinkerState::Free);
    }

    #[test]
    fn disconnect_free_extremity_fails() {
        let mut l = Linker::new_free(LinkerType::Passive);
        assert!(l.disconnect(Terminus::Head).is_err());
    }
}
