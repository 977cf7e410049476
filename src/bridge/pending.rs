//! Requests awaiting a response, kept for replay after a reconnect.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::identifiers::RequestId;

use super::config::PendingPolicy;

// ============================================================================
// PendingRequests
// ============================================================================

/// Unacknowledged request envelopes, in submission order.
///
/// Under [`PendingPolicy::Latest`] at most one envelope is held and any
/// acknowledgement clears it. Under [`PendingPolicy::ById`] every envelope
/// is held until the response carrying its id arrives.
#[derive(Debug, Clone)]
pub struct PendingRequests {
    policy: PendingPolicy,
    entries: Vec<(Option<RequestId>, Value)>,
}

impl PendingRequests {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub fn new(policy: PendingPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    /// Returns the replay policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    /// Number of envelopes held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an envelope with `id` is held.
    #[must_use]
    pub fn contains(&self, id: &RequestId) -> bool {
        self.entries.iter().any(|(held, _)| held.as_ref() == Some(id))
    }

    /// Records an envelope the page just issued.
    ///
    /// `Latest` takes any envelope. `ById` needs a string `id` to match the
    /// response against and returns `false` without holding the envelope
    /// when there is none. A repeated id keeps its original position.
    pub fn record(&mut self, envelope: Value) -> bool {
        let id = RequestId::from_envelope(&envelope);

        match self.policy {
            PendingPolicy::Latest => {
                self.entries.clear();
                self.entries.push((id, envelope));
            }
            PendingPolicy::ById => {
                let Some(id) = id else {
                    return false;
                };

                let held = self
                    .entries
                    .iter_mut()
                    .find(|(held, _)| held.as_ref() == Some(&id));
                match held {
                    Some(entry) => entry.1 = envelope,
                    None => self.entries.push((Some(id), envelope)),
                }
            }
        }

        true
    }

    /// Applies a message received from the hub.
    ///
    /// Returns the number of envelopes released.
    pub fn acknowledge(&mut self, response: &Value) -> usize {
        let before = self.entries.len();

        match self.policy {
            PendingPolicy::Latest => self.entries.clear(),
            PendingPolicy::ById => {
                if let Some(id) = RequestId::from_response(response) {
                    self.entries.retain(|(held, _)| held.as_ref() != Some(&id));
                }
            }
        }

        before - self.entries.len()
    }

    /// Envelopes to resend on a new channel, oldest first.
    pub fn replay(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, envelope)| envelope)
    }

    /// Drops everything held.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
