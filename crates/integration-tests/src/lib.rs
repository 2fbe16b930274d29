//! End-to-end tests for the UniBites storefront interaction layer.
//!
//! Every test starts a `mockito` server standing in for the storefront
//! backend and drives the real `reqwest` transport against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p unibites-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - quantity changes, removal, add and count refresh
//! - `search_flow` - debounced and submitted searches
//! - `order_flow` - order status updates

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use mockito::ServerGuard;
use unibites_storefront::Storefront;
use unibites_storefront::config::StorefrontConfig;
use url::Url;

/// Anti-forgery token embedded in [`CART_PAGE`].
pub const CSRF_TOKEN: &str = "csrf-3f9a";

/// A cart page as the server renders it: two lines, total, badge, loader,
/// search panel and a validated checkout form.
pub const CART_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="csrf-token" content="csrf-3f9a">
    <title>Cart - UniBites</title>
</head>
<body>
    <div id="page-loader" style="display: none;"></div>
    <nav>
        <form id="search-form"><input id="search-input" type="search"></form>
        <span id="cart-count" class="badge">3</span>
    </nav>
    <div id="search-results"></div>
    <div class="cart-item" id="cart-item-101" data-price="120.00">
        <button class="quantity-btn" data-action="decrease" data-product-id="101">-</button>
        <input class="quantity-input" id="quantity-101" type="number" value="1">
        <button class="quantity-btn" data-action="increase" data-product-id="101">+</button>
        <button class="remove-item" data-product-id="101">Remove</button>
    </div>
    <div class="cart-item" id="cart-item-205" data-price="45.50">
        <input class="quantity-input" id="quantity-205" type="number" value="2">
    </div>
    <strong id="cart-total">₹211.00</strong>
    <form class="needs-validation" id="checkout-form" novalidate>
        <input name="phone" required minlength="10" maxlength="10">
        <input name="email" type="email">
    </form>
</body>
</html>"#;

/// Configuration pointing at a mock server.
///
/// # Panics
///
/// Panics if the mock server URL is not a valid URL.
#[must_use]
pub fn config_for(server: &ServerGuard) -> StorefrontConfig {
    #[allow(clippy::expect_used)]
    let base_url = Url::parse(&server.url()).expect("mock server URL is valid");
    let mut config = StorefrontConfig::new(base_url);
    config.request_timeout = Duration::from_secs(5);
    config
}

/// Hydrate `html` against `server`, answering every confirmation with `confirm`.
///
/// # Panics
///
/// Panics if the page cannot be hydrated.
#[must_use]
pub fn storefront(config: StorefrontConfig, html: &str, confirm: bool) -> Storefront {
    #[allow(clippy::expect_used)]
    Storefront::from_markup(config, html, Arc::new(move |_: &str| confirm))
        .expect("failed to hydrate test page")
}

/// Messages of the notifications currently shown.
#[must_use]
pub fn messages(shop: &Storefront) -> Vec<String> {
    shop.notifications()
        .visible()
        .into_iter()
        .map(|n| n.message)
        .collect()
}
