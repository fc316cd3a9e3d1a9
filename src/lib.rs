//! # tavern-core
//!
//! Request throttling and shopping cart state for a small storefront.
//!
//! The crate has two independent parts:
//!
//! - a **fixed-window rate limiter** keyed by `ratelimit:{action}:{subject}`,
//!   used to throttle logins, registrations, checkouts, exports and API calls
//!   per client;
//! - a **cart aggregate** that owns the session's line items, persists them
//!   to a local key-value store after every change and reports additions
//!   through a notification port.
//!
//! ## Quick Start
//!
//! ```rust
//! use tavern_core::{RateLimitConfig, RateLimitService};
//! use tavern_core::infrastructure::headers::client_origin;
//! use std::collections::HashMap;
//!
//! let limiter = RateLimitService::builder().build().unwrap();
//!
//! let headers = HashMap::from([(
//!     "x-forwarded-for".to_string(),
//!     "203.0.113.4, 10.0.0.1".to_string(),
//! )]);
//! let origin = client_origin(&headers);
//!
//! let result = limiter
//!     .check_action("login", &origin, &RateLimitConfig::login())
//!     .unwrap();
//! if !result.success {
//!     eprintln!("{}", result.error_message.unwrap_or_default());
//! }
//! ```
//!
//! ## Rate Limiting
//!
//! Each key holds a counter and the instant its window ends. The first
//! attempt in a window starts it; attempts are admitted until the count
//! reaches `max_attempts`; the window restarts on the first attempt after
//! its reset time. Denials are ordinary results, never errors:
//!
//! ```rust
//! use tavern_core::{RateLimitConfig, RateLimitService};
//!
//! let service = RateLimitService::builder().build().unwrap();
//! let config = RateLimitConfig::new(2, 60)
//!     .unwrap()
//!     .with_error_message("Slow down.");
//!
//! assert!(service.check("ratelimit:contact:alice", &config).success);
//! assert!(service.check("ratelimit:contact:alice", &config).success);
//!
//! let denied = service.check("ratelimit:contact:alice", &config);
//! assert!(!denied.success);
//! assert_eq!(denied.remaining, 0);
//! assert_eq!(denied.error_message.as_deref(), Some("Slow down."));
//! ```
//!
//! Presets cover the storefront's actions: [`RateLimitConfig::login`],
//! [`RateLimitConfig::register`], [`RateLimitConfig::password_reset`],
//! [`RateLimitConfig::checkout`], [`RateLimitConfig::pdf_export`],
//! [`RateLimitConfig::contact`] and [`RateLimitConfig::api`].
//!
//! Expired windows are replaced lazily on the next check. To bound memory,
//! call [`RateLimitService::cleanup`] or enable the background sweeper
//! (requires the `async` feature and a tokio runtime):
//!
//! ```rust,no_run
//! # use tavern_core::RateLimitService;
//! # use std::time::Duration;
//! # async fn example() {
//! let service = RateLimitService::builder()
//!     .with_sweep_interval(Duration::from_secs(600))
//!     .with_active_sweeping(true)
//!     .build()
//!     .unwrap();
//!
//! // Use the service...
//!
//! // Stop the sweeper before dropping
//! service.shutdown().await.expect("shutdown failed");
//! # }
//! ```
//!
//! ## Shopping Cart
//!
//! ```rust
//! use tavern_core::{Product, ShoppingCart};
//! use tavern_core::infrastructure::{local_store::MemoryStore, notify::TracingNotifier};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let cart = ShoppingCart::hydrate(store.clone(), Arc::new(TracingNotifier::new()));
//!
//! cart.add_item(Product {
//!     id: "d20".to_string(),
//!     name: "Crystal d20".to_string(),
//!     description: None,
//!     price: Decimal::new(450, 2),
//!     image_url: None,
//!     category: Some("dice".to_string()),
//!     stock: 12,
//!     active: true,
//! });
//! cart.update_quantity("d20", 2);
//!
//! assert_eq!(cart.item_count(), 3);
//! assert_eq!(cart.total(), Decimal::new(1350, 2));
//! assert!(cart.is_open());
//!
//! // A new session over the same store sees the same items.
//! let restored = ShoppingCart::hydrate(store, Arc::new(TracingNotifier::new()));
//! assert_eq!(restored.item_count(), 3);
//! ```
//!
//! ## Observability
//!
//! The crate logs through `tracing` and never installs a subscriber.
//! Limiter counters are available through [`Metrics`]:
//!
//! ```rust
//! # use tavern_core::{RateLimitConfig, RateLimitService};
//! # let service = RateLimitService::builder().build().unwrap();
//! # service.check("ratelimit:api:10.0.0.1", &RateLimitConfig::api());
//! let snapshot = service.metrics().snapshot();
//! println!("Denial rate: {:.2}%", snapshot.denial_rate() * 100.0);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    cart::{CartAction, CartContents, CartLineItem, Product},
    key::{KeyError, RateLimitKey},
    window::{ConfigError, RateLimitConfig, RateLimitResult, WindowEntry, DEFAULT_DENIAL_MESSAGE},
};

pub use application::{
    cart::{CartError, ShoppingCart},
    limiter::RateLimiter,
    metrics::{Metrics, MetricsSnapshot},
    ports::{
        Clock, HeaderSource, KeyValueStore, Notifier, Placement, ProductCatalog, Storage,
        StoreError,
    },
    registry::WindowRegistry,
    sweeper::{CleanupSweeper, SweeperConfig, SweeperConfigError},
};

#[cfg(feature = "async")]
pub use application::sweeper::{ShutdownError, SweeperHandle};

pub use infrastructure::{
    catalog::InMemoryCatalog,
    clock::SystemClock,
    headers::client_origin,
    local_store::{FileStore, MemoryStore},
    notify::TracingNotifier,
    service::{BuildError, RateLimitService, RateLimitServiceBuilder},
    storage::ShardedStorage,
};
