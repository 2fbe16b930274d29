//! UniBites storefront interaction layer.
//!
//! Keeps the cart, the product search panel and transient feedback (the
//! loading indicator and toast notifications) in sync with the server
//! without reloading the page. [`Storefront`] wires the components for one
//! hydrated page; each component is also usable on its own.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod guard;
pub mod notify;
pub mod orders;
pub mod page;
pub mod remote;
pub mod search;
pub mod sequence;
pub mod state;
pub mod validation;
pub mod view;

pub use error::{Result, StorefrontError};
pub use events::{ClickTarget, EventOutcome, UiEvent};
pub use state::Storefront;
