use crate::model::MemberKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineMarker {
    pub joined_at: DateTime<Utc>,
}

/// Snapshot of the members currently tracked on a room topic.
///
/// Replaced wholesale on every presence sync; only used to detect that
/// someone else joined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceSet {
    members: HashMap<MemberKey, OnlineMarker>,
}

impl PresenceSet {
    pub fn insert(&mut self, key: MemberKey, marker: OnlineMarker) {
        self.members.insert(key, marker);
    }

    pub fn contains(&self, key: &MemberKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member keys other than the local one.
    pub fn others(&self, local: &MemberKey) -> Vec<MemberKey> {
        self.members
            .keys()
            .filter(|key| *key != local)
            .cloned()
            .collect()
    }
}
