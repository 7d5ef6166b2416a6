//! Preference memory
//!
//! Remembers user-stated preferences across turns, keyed by session.
//! In-process only; nothing here survives a restart.

pub mod store;

pub use store::{PreferenceHistory, MAX_PREFERENCES_PER_SESSION};

use crate::error::AssistantError;
use crate::models::Preference;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait PreferenceMemory: Send + Sync {
    async fn store(&self, session_id: Uuid, content: &str) -> Result<Preference>;

    /// Oldest first
    async fn list(&self, session_id: Uuid) -> Result<Vec<Preference>>;
}

/// Bullet list for planner and synthesis prompts
pub fn format_preferences(preferences: &[Preference]) -> String {
    if preferences.is_empty() {
        return "(none)".to_string();
    }

    preferences
        .iter()
        .map(|p| format!("- {}", p.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Default)]
pub struct InMemoryPreferenceMemory {
    sessions: Arc<RwLock<HashMap<Uuid, PreferenceHistory>>>,
}

impl InMemoryPreferenceMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceMemory for InMemoryPreferenceMemory {
    async fn store(&self, session_id: Uuid, content: &str) -> Result<Preference> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AssistantError::InvalidInput(
                "preference content is empty".to_string(),
            ));
        }

        let mut sessions = self.sessions.write().await;
        let history = sessions
            .entry(session_id)
            .or_insert_with(|| PreferenceHistory::new(session_id));

        let preference = history.push(content);
        debug!(session = %session_id, count = history.len(), "Preference stored");
        Ok(preference)
    }

    async fn list(&self, session_id: Uuid) -> Result<Vec<Preference>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|h| h.entries().cloned().collect())
            .unwrap_or_default())
    }
}
