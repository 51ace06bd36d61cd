use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit as seen by callers: who, when, why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub change_id: String,
    pub user: String,
    pub time: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn from_commit(commit: &git2::Commit) -> Self {
        let author = commit.author();
        let time = DateTime::from_timestamp(author.when().seconds(), 0).unwrap_or_default();
        LogEntry {
            change_id: commit.id().to_string(),
            user: author.name().unwrap_or("Unknown").to_string(),
            time,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        }
    }
}

/// Newest-first commits touching a single document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub entries: Vec<LogEntry>,
}

/// The single artifact a commit is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum ChangedArtifact {
    Page(String),
    Config(String),
    File(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentChange {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub change: Option<ChangedArtifact>,
}

/// A page of document history plus the cursor for the following page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryPage {
    pub entries: Vec<LogEntry>,
    pub next: Option<String>,
}

/// A page of recent changes plus the cursor for the following page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangesPage {
    pub changes: Vec<RecentChange>,
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_artifact_serializes_tagged() {
        let json = serde_json::to_string(&ChangedArtifact::Page("home".into())).unwrap();
        assert_eq!(json, r#"{"kind":"page","name":"home"}"#);
    }
}
