//! Write access to the shared record positions.
//!
//! Exactly one visual mode may write `x`/`y` at a time. Handing positions to
//! a new mode is an explicit release by the old owner followed by a claim.

use std::fmt;

use log::debug;

use crate::error::StoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionOwner {
    #[default]
    None,
    Simulation,
    MapOverlay,
    BarStack,
    TileGrid,
}

impl fmt::Display for PositionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PositionOwner::None => "nobody",
            PositionOwner::Simulation => "force simulation",
            PositionOwner::MapOverlay => "map overlay",
            PositionOwner::BarStack => "bar stack",
            PositionOwner::TileGrid => "tile grid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OwnershipLedger {
    holder: PositionOwner,
    transfers: usize,
}

impl OwnershipLedger {
    pub fn holder(&self) -> PositionOwner {
        self.holder
    }

    /// Number of successful claims so far.
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Claiming positions you already hold is a no-op.
    pub fn claim(&mut self, owner: PositionOwner) -> Result<(), StoryError> {
        if self.holder == owner {
            return Ok(());
        }
        if self.holder != PositionOwner::None {
            return Err(StoryError::OwnershipConflict {
                held: self.holder,
                requested: owner,
            });
        }
        debug!("positions claimed by {owner}");
        self.holder = owner;
        self.transfers += 1;
        Ok(())
    }

    /// Release if `owner` holds the positions. Returns whether it did.
    pub fn release(&mut self, owner: PositionOwner) -> bool {
        if self.holder != owner || owner == PositionOwner::None {
            return false;
        }
        debug!("positions released by {owner}");
        self.holder = PositionOwner::None;
        true
    }

    /// Release whatever holds the positions, then claim them for `owner`.
    pub fn transfer(&mut self, owner: PositionOwner) -> Result<(), StoryError> {
        let held = self.holder;
        self.release(held);
        self.claim(owner)
    }

    pub fn is_held_by(&self, owner: PositionOwner) -> bool {
        self.holder == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_owner_must_wait_for_release() {
        let mut ledger = OwnershipLedger::default();
        ledger.claim(PositionOwner::Simulation).unwrap();
        let err = ledger.claim(PositionOwner::MapOverlay).unwrap_err();
        assert!(matches!(
            err,
            StoryError::OwnershipConflict {
                held: PositionOwner::Simulation,
                requested: PositionOwner::MapOverlay
            }
        ));
        assert!(!ledger.release(PositionOwner::MapOverlay));
        assert!(ledger.release(PositionOwner::Simulation));
        ledger.claim(PositionOwner::MapOverlay).unwrap();
        assert_eq!(ledger.holder(), PositionOwner::MapOverlay);
        assert_eq!(ledger.transfers(), 2);
    }

    #[test]
    fn reclaim_is_idempotent() {
        let mut ledger = OwnershipLedger::default();
        ledger.claim(PositionOwner::TileGrid).unwrap();
        ledger.claim(PositionOwner::TileGrid).unwrap();
        assert_eq!(ledger.transfers(), 1);
        ledger.transfer(PositionOwner::BarStack).unwrap();
        assert!(ledger.is_held_by(PositionOwner::BarStack));
    }
}
