//! UniBites Core - Shared types library.
//!
//! This crate provides common types used across all UniBites components:
//! - `storefront` - Client-side interaction layer for the storefront page
//! - `cli` - Command-line driver for the storefront interaction layer
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no timers. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, order
//!   statuses and notification severities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
