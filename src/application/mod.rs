//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages runtime behavior:
//! - Window registry (storage of attempt windows)
//! - Rate limiter (decision making)
//! - Cleanup sweeper (periodic removal of expired windows)
//! - Shopping cart (session state, persistence, notifications)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cart;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod sweeper;
