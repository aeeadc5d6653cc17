//! Orders, positions and the two-slot position manager
//!
//! Every strategy runner owns exactly one [`PositionManager`]; nothing in
//! this module is shared between analyzers, so none of it needs locking.

mod fees;
mod manager;
mod order;
#[allow(clippy::module_inception)]
mod position;
mod sink;

pub use fees::{FeeSchedule, FEE_RATE};
pub use manager::PositionManager;
pub use order::{Order, OrderRequest};
pub use position::{ExitReason, Position, PositionSnapshot};
pub use sink::SimulatedOrderSink;
