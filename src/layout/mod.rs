//! Layout: where things go.
//!
//! Scales, the force simulation, the map projection and the static layouts
//! (tile grid, bar stack), plus the ledger deciding which of them may write
//! record positions.

pub mod force;
pub mod grid;
pub mod ownership;
pub mod projection;
pub mod scale;
pub mod stack;

pub use force::{Collide, ForceLayout, ForceSpace, Forces};
pub use grid::GridLayout;
pub use ownership::{OwnershipLedger, PositionOwner};
pub use projection::MapView;
pub use scale::{BandScale, LinearScale};
pub use stack::{BarStack, StackSlot};
