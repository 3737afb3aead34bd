//! Opt-in duplicate-decision guard.
//!
//! Without it, two clicks on the same notification both run the outcome
//! pipeline. With it, the first decision per message wins for `ttl`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::slack::types::MessageRef;

pub struct DecisionGuard {
    ttl: Duration,
    claimed: Mutex<HashMap<MessageRef, Instant>>,
}

impl DecisionGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            claimed: Mutex::new(HashMap::new()),
        }
    }

    /// Claim a message for a decision. Returns `false` if it was claimed within the TTL.
    pub async fn try_claim(&self, message: &MessageRef) -> bool {
        let now = Instant::now();
        let mut claimed = self.claimed.lock().await;

        claimed.retain(|_, at| now.duration_since(*at) < self.ttl);

        if claimed.contains_key(message) {
            return false;
        }
        claimed.insert(message.clone(), now);
        true
    }

    /// Drop a claim so the next decision on `message` goes through.
    pub async fn release(&self, message: &MessageRef) {
        self.claimed.lock().await.remove(message);
    }

    /// Number of live claims.
    pub async fn len(&self) -> usize {
        self.claimed.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
