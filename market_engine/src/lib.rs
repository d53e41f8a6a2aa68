//! Market Engine
//!
//! The market engine is the transactional core of a local-delivery marketplace: buyers
//! assemble a cart against one seller at a time, check out into an order, and sellers confirm
//! and fulfil it. A per-seller loyalty program awards points per order, and a manual
//! bank-transfer flow lets sellers approve or reject buyer-submitted payment proof.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`] behind the `sqlite` feature). You should
//!    never need to access the database directly; use the public API instead. The exception is
//!    the data types used in the database, defined in the `db_types` module, which are public.
//! 2. The engine public API ([`mod@mke_api`]). Backends implement the traits in [`mod@traits`]
//!    to drive it; the APIs themselves are generic over those traits.
//!
//! The engine also provides a set of events that can be subscribed to. These are emitted after
//! the owning transaction commits — for example, when a seller approves a bank transfer, a
//! `PaymentApprovedEvent` fires. A simple actor-ish hook system lets you react to these
//! without ever being able to roll the committed transaction back.
mod mke_api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use mke_api::{cart_api::CartApi, order_flow_api::OrderFlowApi, order_objects, rewards_api::RewardsApi};
pub use traits::{
    CartManagement,
    InventoryManagement,
    MarketplaceDatabase,
    MarketplaceError,
    OrderManagement,
    RewardsManagement,
};
