//! # Market engine public API
//!
//! The `mke_api` module exposes the programmatic API for the market engine.
//! The API is modular, so that clients can pick and choose the functionality they need; a
//! buyer-facing surface only needs the cart and order-flow APIs, while a seller dashboard
//! might only mount the rewards API.
//!
//! * [`cart_api`] maintains the buyer's per-seller carts.
//! * [`order_flow_api`] is the primary API for checkout, the payment-receipt review flow, and
//!   the order lifecycle.
//! * [`rewards_api`] manages seller loyalty policies and answers balance queries.
//!
//! The other submodules in this module are support and utility types.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a
//! database backend that implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use market_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements MarketplaceDatabase
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let summary = api.checkout(request).await?;
//! ```

pub mod cart_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod rewards_api;
