//! Per-session preference history
//!
//! Bounded queue of preferences for one session, oldest first.

use crate::models::Preference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Preferences kept per session before the oldest is dropped
pub const MAX_PREFERENCES_PER_SESSION: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceHistory {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    entries: VecDeque<Preference>,
}

impl PreferenceHistory {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            entries: VecDeque::new(),
        }
    }

    /// Append a preference. Repeating the latest entry verbatim is a no-op.
    pub fn push(&mut self, content: &str) -> Preference {
        if let Some(last) = self.entries.back() {
            if last.content == content {
                return last.clone();
            }
        }

        let preference = Preference {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        self.entries.push_back(preference.clone());
        while self.entries.len() > MAX_PREFERENCES_PER_SESSION {
            self.entries.pop_front();
        }
        self.updated_at = Utc::now();

        preference
    }

    pub fn entries(&self) -> impl Iterator<Item = &Preference> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_records_session() {
        let session = Uuid::new_v4();
        let mut history = PreferenceHistory::new(session);

        let pref = history.push("Prefers dividend stocks");
        assert_eq!(pref.session_id, session);
        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
    }

    #[test]
    fn test_consecutive_duplicate_is_ignored() {
        let mut history = PreferenceHistory::new(Uuid::new_v4());

        let first = history.push("Interested in EVs");
        let second = history.push("Interested in EVs");
        assert_eq!(first.id, second.id);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_oldest_dropped_at_capacity() {
        let mut history = PreferenceHistory::new(Uuid::new_v4());
        for i in 0..MAX_PREFERENCES_PER_SESSION + 3 {
            history.push(&format!("preference {}", i));
        }

        assert_eq!(history.len(), MAX_PREFERENCES_PER_SESSION);
        assert_eq!(history.entries().next().unwrap().content, "preference 3");
    }
}
