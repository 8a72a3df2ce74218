use std::collections::HashMap;

use serde::Deserialize;

use crate::media::AssetLocation;
use crate::{Error, Result};

pub type ClassId = i64;

/// Class id -> human readable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: HashMap<ClassId, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabels {
    List(Vec<Option<RawLabel>>),
    Table(HashMap<String, RawLabel>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Name(String),
    Entry {
        #[serde(alias = "displayName")]
        name: String,
    },
}

impl RawLabel {
    fn into_name(self) -> String {
        match self {
            RawLabel::Name(name) => name,
            RawLabel::Entry { name } => name,
        }
    }
}

impl LabelMap {
    /// Accepts `["cat", "dog"]`, `{"0": "cat"}` or `{"1": {"name": "person"}}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let raw: RawLabels = serde_json::from_slice(bytes)?;
        let mut labels = HashMap::new();
        match raw {
            RawLabels::List(entries) => {
                for (id, entry) in entries.into_iter().enumerate() {
                    if let Some(entry) = entry {
                        labels.insert(id as ClassId, entry.into_name());
                    }
                }
            }
            RawLabels::Table(entries) => {
                for (key, entry) in entries {
                    let id = key
                        .trim()
                        .parse::<ClassId>()
                        .map_err(|_| Error::Labels(format!("class id `{}` is not an integer", key)))?;
                    labels.insert(id, entry.into_name());
                }
            }
        }
        Ok(Self { labels })
    }

    /// One label per line, either `"<id> <name>"` or just `"<name>"` (the
    /// line index is the id then).
    pub fn from_text(text: &str) -> Result<Self> {
        let mut labels = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (id, name) = match line.split_once(char::is_whitespace) {
                Some((first, rest)) => match first.parse::<ClassId>() {
                    Ok(id) => (id, rest.trim()),
                    Err(_) => (index as ClassId, line),
                },
                None => (index as ClassId, line),
            };
            labels.insert(id, name.to_string());
        }
        if labels.is_empty() {
            return Err(Error::Labels("label file is empty".to_string()));
        }
        Ok(Self { labels })
    }

    pub fn from_location_bytes(location: &AssetLocation, bytes: &[u8]) -> Result<Self> {
        match location.extension().as_deref() {
            Some("txt") => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| Error::Labels(err.to_string()))?;
                Self::from_text(text)
            }
            _ => Self::from_json(bytes),
        }
    }

    pub fn lookup(&self, class_id: ClassId) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(ClassId, String)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (ClassId, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
