//! Chat session list.
//!
//! Only summaries are kept (title, count, last message), newest first.
//! Full transcripts are not persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PREVIEW_MAX_CHARS: usize = 80;

/// Summary of one chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionSummary {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub message_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

impl ChatSessionSummary {
    pub fn new(title: impl Into<String>, message_count: usize, last_message: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            timestamp: Utc::now(),
            message_count,
            last_message: last_message.map(truncate_preview),
        }
    }
}

/// Partial update applied by [`ChatHistory::update`]
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub message_count: Option<usize>,
    pub last_message: Option<String>,
}

/// Ordered list of sessions, most recent first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    sessions: Vec<ChatSessionSummary>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a new session and return its id
    pub fn add(&mut self, title: &str, message_count: usize, last_message: Option<&str>) -> String {
        let session = ChatSessionSummary::new(title, message_count, last_message);
        let id = session.id.clone();
        self.sessions.insert(0, session);
        id
    }

    /// Apply a partial update. Returns false when the id is unknown.
    pub fn update(&mut self, id: &str, update: SessionUpdate) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if let Some(title) = update.title {
            session.title = title;
        }
        if let Some(count) = update.message_count {
            session.message_count = count;
        }
        if let Some(last) = update.last_message {
            session.last_message = Some(truncate_preview(&last));
        }
        session.timestamp = Utc::now();
        true
    }

    pub fn delete(&mut self, id: &str) {
        self.sessions.retain(|s| s.id != id);
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn get(&self, id: &str) -> Option<&ChatSessionSummary> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[ChatSessionSummary] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn truncate_preview(message: &str) -> String {
    if message.chars().count() <= PREVIEW_MAX_CHARS {
        message.to_string()
    } else {
        let cut: String = message.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_prepends() {
        let mut history = ChatHistory::new();
        let first = history.add("First", 1, None);
        let second = history.add("Second", 2, Some("hello"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.sessions()[0].id, second);
        assert_eq!(history.sessions()[1].id, first);
    }

    #[test]
    fn test_update_and_delete() {
        let mut history = ChatHistory::new();
        let id = history.add("Snake game", 1, None);

        assert!(history.update(
            &id,
            SessionUpdate {
                message_count: Some(4),
                last_message: Some("done".into()),
                ..Default::default()
            }
        ));
        let session = history.get(&id).unwrap();
        assert_eq!(session.message_count, 4);
        assert_eq!(session.last_message.as_deref(), Some("done"));
        assert_eq!(session.title, "Snake game");

        assert!(!history.update("missing", SessionUpdate::default()));

        history.delete(&id);
        assert!(history.is_empty());
    }

    #[test]
    fn test_long_last_message_is_truncated_on_char_boundary() {
        let long = "ü".repeat(200);
        let session = ChatSessionSummary::new("t", 1, Some(&long));
        let preview = session.last_message.unwrap();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 3);
    }

    #[test]
    fn test_history_serializes_as_plain_list() {
        let mut history = ChatHistory::new();
        history.add("One", 1, None);
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["messageCount"], 1);
    }
}
