//! netsession-http - Token-authenticated HTTP sessions over reqwest.
//!
//! [`Session`] sends requests described by [`netsession_core::Route`]s,
//! attaches the bearer credential to protected ones and, when the server
//! rejects it, refreshes the credential once for all requests that failed
//! together before retrying each of them exactly once.

pub mod auth_interceptor;
pub mod authenticator;
pub mod events;
pub mod session;
pub mod transport;

pub use auth_interceptor::AuthInterceptor;
pub use authenticator::{DEFAULT_REFRESH_PATH, OAuthAuthenticator};
pub use events::{DEFAULT_EVENT_CAPACITY, SessionEvent};
pub use session::{RequestHandle, Session, SessionConfig};
pub use transport::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ReqwestTransport};
