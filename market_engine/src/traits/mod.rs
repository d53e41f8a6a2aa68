//! Backend capability traits for the market engine.
//!
//! A storage backend implements these traits to drive the engine. The traits are split per
//! concern so that a thin boundary layer can depend on exactly the capabilities it exposes.
//! [`MarketplaceDatabase`] is the transaction boundary: every operation it defines either
//! commits in full or leaves the database untouched.

mod cart_management;
mod inventory_management;
mod marketplace_database;
mod order_management;
mod rewards_management;

pub use cart_management::CartManagement;
pub use inventory_management::InventoryManagement;
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use order_management::OrderManagement;
pub use rewards_management::RewardsManagement;
