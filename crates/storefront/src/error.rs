//! Crate-level error type.
//!
//! Only setup can fail with an `Err`: loading configuration, hydrating the
//! page and building the transport. Failures of user actions never surface
//! here; they become notifications and outcome values instead.

use thiserror::Error;

use crate::config::ConfigError;
use crate::page::MarkupError;
use crate::remote::TransportError;

/// Errors raised while wiring up the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server-rendered markup could not be hydrated.
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    /// The HTTP transport could not be built.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result alias for storefront setup.
pub type Result<T, E = StorefrontError> = std::result::Result<T, E>;
