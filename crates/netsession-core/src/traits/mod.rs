//! Core traits for the authenticator and transport seams.

mod authenticator;
mod transport;

pub use authenticator::{AuthErrorPolicy, Authenticator};
pub use transport::Transport;
