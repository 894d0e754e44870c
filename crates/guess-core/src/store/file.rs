use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{KnowledgeStore, Suggestion, SuggestionSink};
use crate::error::StoreError;
use crate::game::serialization::KnowledgeSnapshot;
use crate::model::KnowledgeBase;

/// Knowledge base kept as a pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeStore for JsonFileStore {
    fn load(&self) -> Result<KnowledgeBase, StoreError> {
        let json = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            context: "reading knowledge file",
            path: self.path.clone(),
            source,
        })?;
        let snapshot = KnowledgeSnapshot::from_json(&json)?;
        Ok(snapshot.restore()?)
    }

    /// Writes to a sibling temporary file, then renames it over the target.
    fn persist(&self, knowledge: &KnowledgeBase) -> Result<(), StoreError> {
        let json = KnowledgeSnapshot::to_json(knowledge)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|source| StoreError::Io {
            context: "writing knowledge file",
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Io {
            context: "replacing knowledge file",
            path: self.path.clone(),
            source,
        })
    }
}

/// Append-only JSON-lines archive of suggestions.
#[derive(Debug)]
pub struct JsonlSuggestionLog {
    path: PathBuf,
    append: Mutex<()>,
}

impl JsonlSuggestionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: Mutex::new(()),
        }
    }
}

impl SuggestionSink for JsonlSuggestionLog {
    fn record(&self, suggestion: &Suggestion) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(suggestion)?;
        line.push('\n');

        let _append = self.append.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::Io {
                context: "opening suggestion log",
                path: self.path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|source| StoreError::Io {
                context: "appending suggestion",
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::LearningUpdater;
    use crate::model::Answer;

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase::new(
            vec!["Chat".into(), "Chien".into()],
            vec![1, 1],
            vec!["Miaule-t-il ?".into()],
            vec![vec![0.9, 0.1]],
        )
        .unwrap()
    }

    #[test]
    fn persisted_knowledge_loads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path().join("knowledge.json"));
        let mut kb = knowledge();
        LearningUpdater::default().apply(&mut kb, 0, &[(0, Answer::Yes)]);
        store.persist(&kb).expect("persist");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.expected(0, 0), 0.91);
        assert_eq!(loaded.appearances(), &[2, 1]);
        assert!(!dir.path().join("knowledge.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let store = JsonFileStore::new("does/not/exist.json");
        assert!(matches!(store.load(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("knowledge.json");
        fs::write(&path, r#"{"candidates": [], "appearances": [], "questions": ["q"], "matrix": [[]]}"#)
            .unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn suggestions_append_one_line_each() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("suggestions.jsonl");
        let log = JsonlSuggestionLog::new(&path);
        for name in ["Lapin", "Tortue"] {
            log.record(&Suggestion {
                session: "s".into(),
                candidate: name.into(),
                question: "A-t-il une carapace ?".into(),
            })
            .expect("record");
        }
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("Tortue"));
    }
}
