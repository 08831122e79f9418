//! The optimistic-concurrency rule applied to every remote write.

use crate::token::ChangeTimestamp;

/// Decision taken by the remote store for an incoming write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    /// Store the write; `new_token` becomes the stored timestamp.
    Accept {
        /// Timestamp to store and return to the client.
        new_token: ChangeTimestamp,
    },
    /// Refuse the write; the client's token is older than `stored`.
    Reject {
        /// Timestamp currently stored by the remote.
        stored: ChangeTimestamp,
    },
}

/// Decides whether a write carrying `client` may replace a value stamped
/// `stored`, with `now` read from the remote's clock.
///
/// - `client >= stored`: accepted, new token is `max(client, now)`.
/// - `client < stored`: rejected.
/// - no client token: accepted as a plain last-writer-wins write, new token
///   is `max(stored, now)`.
///
/// The returned token is never below `stored`.
pub fn decide_write(
    client: Option<ChangeTimestamp>,
    stored: ChangeTimestamp,
    now: ChangeTimestamp,
) -> WriteDecision {
    match client {
        Some(client) if client < stored => WriteDecision::Reject { stored },
        Some(client) => WriteDecision::Accept {
            new_token: client.max(now),
        },
        None => WriteDecision::Accept {
            new_token: stored.max(now),
        },
    }
}
