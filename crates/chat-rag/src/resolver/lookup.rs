//! Static Q&A table matched by substring

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::chat::ChatTurnHistory;
use crate::error::{Error, Result};

use super::{Answer, AnswerResolver, Resolution};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaEntry {
    /// Matched when it occurs anywhere in the question
    pub trigger: String,
    pub answer: String,
}

/// Ordered list of Q&A entries; the first matching entry wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QnaTable {
    entries: Vec<QnaEntry>,
}

impl QnaTable {
    /// Build a table, rejecting entries whose trigger is empty
    pub fn new(entries: Vec<QnaEntry>) -> Result<Self> {
        if let Some(pos) = entries.iter().position(|e| e.trigger.is_empty()) {
            return Err(Error::Config(format!(
                "Q&A entry {} has an empty trigger",
                pos + 1
            )));
        }
        Ok(Self { entries })
    }

    /// Build from `(trigger, answer)` pairs
    pub fn from_pairs<T, A>(pairs: impl IntoIterator<Item = (T, A)>) -> Result<Self>
    where
        T: Into<String>,
        A: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(trigger, answer)| QnaEntry {
                    trigger: trigger.into(),
                    answer: answer.into(),
                })
                .collect(),
        )
    }

    /// Load a TOML table of `[[entries]]` with `trigger` and `answer` keys
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read Q&A table {}: {}", path.display(), e))
        })?;
        let table: QnaTable = toml::from_str(&content)?;
        let table = Self::new(table.entries)?;
        tracing::info!("Loaded {} Q&A entries from {}", table.len(), path.display());
        Ok(table)
    }

    /// Table used when no file is configured
    pub fn builtin() -> Self {
        let entries = [
            ("xin chào", "Xin chào! Bạn muốn tìm áo màu gì và cỡ nào?"),
            ("cỡ", "Shop có đủ cỡ S, M, L và XL."),
            ("màu", "Áo có màu trắng, đen và xanh navy."),
            ("cảm ơn", "Cảm ơn bạn đã ghé shop!"),
            ("hello", "Hi there"),
            ("bye", "Goodbye"),
        ];
        Self {
            entries: entries
                .iter()
                .map(|(trigger, answer)| QnaEntry {
                    trigger: trigger.to_string(),
                    answer: answer.to_string(),
                })
                .collect(),
        }
    }

    /// Answer of the first entry whose trigger occurs in `input`
    pub fn find(&self, input: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| input.contains(entry.trigger.as_str()))
            .map(|entry| entry.answer.as_str())
    }

    pub fn entries(&self) -> &[QnaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct LookupResolver {
    table: QnaTable,
}

impl LookupResolver {
    pub fn new(table: QnaTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &QnaTable {
        &self.table
    }
}

#[async_trait]
impl AnswerResolver for LookupResolver {
    async fn resolve(&self, question: &str, _turns: &ChatTurnHistory) -> Result<Resolution> {
        Ok(match self.table.find(question) {
            Some(answer) => Resolution::Found(Answer::new(answer)),
            None => {
                tracing::debug!("No Q&A entry matches \"{}\"", question);
                Resolution::NotFound
            }
        })
    }

    fn name(&self) -> &str {
        "lookup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table() -> QnaTable {
        QnaTable::from_pairs([("hello", "Hi there"), ("bye", "Goodbye")]).unwrap()
    }

    #[test]
    fn test_trigger_anywhere_in_input() {
        let table = table();
        assert_eq!(table.find("hello, how are you"), Some("Hi there"));
        assert_eq!(table.find("well hello"), Some("Hi there"));
        assert_eq!(table.find("ok bye now"), Some("Goodbye"));
        assert_eq!(table.find("Hello"), None);
        assert_eq!(table.find("good morning"), None);
    }

    #[test]
    fn test_first_entry_wins() {
        let table = table();
        assert_eq!(table.find("bye, hello"), Some("Hi there"));
    }

    #[test]
    fn test_empty_trigger_rejected() {
        let err = QnaTable::from_pairs([("hi", "Hello"), ("", "anything")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("entry 2")));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[entries]]
trigger = "size"
answer = "S, M, L"

[[entries]]
trigger = "color"
answer = "White"
"#
        )
        .unwrap();

        let table = QnaTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.find("which color?"), Some("White"));
        assert_eq!(table.entries()[0].trigger, "size");
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let builtin = QnaTable::builtin();
        assert!(QnaTable::new(builtin.entries().to_vec()).is_ok());
        assert_eq!(builtin.find("hello, how are you"), Some("Hi there"));
    }

    #[tokio::test]
    async fn test_resolver_is_total() {
        let resolver = LookupResolver::new(table());
        let turns = ChatTurnHistory::new();

        match resolver.resolve("hello, how are you", &turns).await.unwrap() {
            Resolution::Found(answer) => {
                assert_eq!(answer.text, "Hi there");
                assert!(answer.sources.is_empty());
            }
            Resolution::NotFound => panic!("expected a match"),
        }
        assert!(!resolver.resolve("xyz", &turns).await.unwrap().is_found());
        assert!(resolver.resolve_live("hello", &turns).await.unwrap().is_none());
    }
}
