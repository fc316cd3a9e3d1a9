//! Domain layer - pure business logic with no I/O.
//!
//! This layer contains the core concepts and invariants:
//! - Fixed-window attempt counters and their configs
//! - Rate limit key composition
//! - Shopping cart contents and transitions
//!
//! All types in this layer are pure and easily testable.

pub mod cart;
pub mod key;
pub mod window;
