//! Core types for UniBites.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod severity;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price, format_amount};
pub use severity::Severity;
pub use status::{OrderStatus, ParseStatusError};
