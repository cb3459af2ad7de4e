//! Session events for host applications.
//!
//! Hosts subscribe with [`Session::subscribe`](crate::Session::subscribe) to
//! drive activity indicators, persist refreshed credentials, or force a
//! logout. Events are best effort: with no subscriber they are dropped, and
//! a lagging subscriber misses the oldest ones.

use url::Url;
use uuid::Uuid;

use netsession_core::{Credential, Method, RefreshError};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A request was handed to the session.
    RequestStarted {
        id: Uuid,
        method: Method,
        url: Url,
    },

    /// A request produced its final outcome. `status` is `None` when no HTTP
    /// response was obtained.
    RequestFinished { id: Uuid, status: Option<u16> },

    /// A refresh succeeded; `credential` replaces the previous one.
    CredentialRefreshed { credential: Credential },

    /// A refresh failed terminally and the credential was cleared.
    LoggedOut { reason: RefreshError },
}
