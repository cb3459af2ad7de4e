//! Core request types.
//!
//! These types enforce their invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod base_url;

pub use base_url::BaseUrl;
