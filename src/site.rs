//! A single lattice site on a `Filament`.
//!
//! Ported from `original_source/Site.hpp` / `src/Site.cpp`. A site's
//! `blocked` and `bound` attributes are orthogonal (spec §3): a free
//! site may be blocked or not; once bound it is tracked in the
//! filament's `bound_tip` deque regardless of its `blocked` flag (see
//! `filament.rs` module docs for the partition convention).

use crate::linker::{LinkerId, Terminus};

/// Secondary classification of a free site, used to weight binding
/// rates differently for tip vs. interior-blocked sites (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteType {
    Tip,
    Blocked,
}

/// One lattice position on a `Filament`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub blocked: bool,
    pub bound: Option<(LinkerId, Terminus)>,
}

impl Site {
    pub fn new_free_unblocked() -> Self {
        Site {
            blocked: false,
            bound: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.bound.is_none()
    }

    pub fn site_type(&self) -> SiteType {
        if self.blocked {
            SiteType::Blocked
        } else {
            SiteType::Tip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_site_is_free_and_unblocked() {
        let s = Site::new_free_unblocked();
        assert!(s.is_free());
        assert_eq!(s.site_type(), SiteType::Tip);
    }
}
