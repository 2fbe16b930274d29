//! UniBites CLI - drive storefront actions against a running server.
//!
//! # Usage
//!
//! ```bash
//! # Search the menu
//! ub-cli search paneer
//!
//! # Cart actions
//! ub-cli cart add 12 -q 2
//! ub-cli --page cart.html cart update 12 3
//! ub-cli --page cart.html cart remove 12
//! ub-cli cart count
//!
//! # Move an order along
//! ub-cli order status 42 out_for_delivery
//! ```
//!
//! # Environment Variables
//!
//! - `UNIBITES_BASE_URL` - Server origin (required)
//! - `UNIBITES_SESSION_COOKIE` - Session cookie of a logged-in user
//! - `SENTRY_DSN` - Error tracking (optional)
//!
//! Notifications raised while a command runs are printed when it finishes.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unibites_core::{OrderId, OrderStatus, ProductId};
use unibites_storefront::config::StorefrontConfig;

mod commands;

#[derive(Parser)]
#[command(name = "ub-cli")]
#[command(author, version, about = "UniBites storefront CLI")]
struct Cli {
    /// Saved page markup to hydrate (token, cart lines)
    #[arg(long, global = true)]
    page: Option<PathBuf>,

    /// Anti-forgery token to send instead of the page's
    #[arg(long, global = true)]
    csrf_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search products
    Search {
        /// Search text (at least the configured minimum length)
        query: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product to the cart
    Add {
        product_id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Update {
        product_id: ProductId,
        quantity: String,
    },
    /// Remove a line
    Remove {
        product_id: ProductId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the number of items in the cart
    Count,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Update an order's status
    Status {
        order_id: OrderId,

        /// `pending`, `confirmed`, `preparing`, `out_for_delivery`, `delivered` or `cancelled`
        status: OrderStatus,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "unibites_storefront=info,unibites_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration first: Sentry must be initialized before tracing
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let assume_yes = matches!(
        cli.command,
        Commands::Cart {
            action: CartAction::Remove { yes: true, .. }
        }
    );
    let shop = commands::open(
        config,
        cli.page.as_deref(),
        cli.csrf_token.as_deref(),
        assume_yes,
    )
    .await?;

    let outcome = match cli.command {
        Commands::Search { query } => commands::search::run(&shop, &query).await,
        Commands::Cart { action } => match action {
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&shop, &product_id, quantity).await,
            CartAction::Update {
                product_id,
                quantity,
            } => commands::cart::update(&shop, &product_id, &quantity).await,
            CartAction::Remove { product_id, .. } => {
                commands::cart::remove(&shop, &product_id).await
            }
            CartAction::Count => commands::cart::count(&shop).await,
        },
        Commands::Order { action } => match action {
            OrderAction::Status { order_id, status } => {
                commands::order::status(&shop, &order_id, status).await
            }
        },
    };

    commands::print_notifications(&shop);
    Ok(outcome?)
}
