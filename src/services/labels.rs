use crate::error::{Result, SorterError};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Class index to label, aligned with the oracle's output channels.
///
/// Cloning is cheap; every clone shares the same immutable storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Arc<[String]>,
}

impl LabelTable {
    /// Load labels from a JSON file.
    ///
    /// Two layouts are accepted: a flat object whose values, in file order, are the
    /// labels, or a model `config.json` carrying an `id2label` object keyed by index.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SorterError::Config(format!(
                "Failed to read label file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content).map_err(|e| match e {
            SorterError::Config(msg) => {
                SorterError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(content)
            .map_err(|e| SorterError::Config(format!("Failed to parse label JSON: {}", e)))?;

        let object = document
            .as_object()
            .ok_or_else(|| SorterError::Config("Label file must be a JSON object".to_string()))?;

        let labels = match object.get("id2label").and_then(Value::as_object) {
            Some(id2label) => indexed_labels(id2label)?,
            None => ordered_labels(object)?,
        };

        Self::from_labels(labels)
    }

    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(SorterError::Config("Label table is empty".to_string()));
        }
        Ok(Self {
            labels: labels.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

fn ordered_labels(object: &Map<String, Value>) -> Result<Vec<String>> {
    object
        .iter()
        .map(|(key, value)| {
            value.as_str().map(str::to_string).ok_or_else(|| {
                SorterError::Config(format!("Label for key \"{}\" is not a string", key))
            })
        })
        .collect()
}

fn indexed_labels(id2label: &Map<String, Value>) -> Result<Vec<String>> {
    let mut labels: Vec<(usize, String)> = id2label
        .iter()
        .map(|(key, value)| {
            let index = key.parse::<usize>().map_err(|_| {
                SorterError::Config(format!("id2label key \"{}\" is not an index", key))
            })?;
            let label = value.as_str().ok_or_else(|| {
                SorterError::Config(format!("Label for index {} is not a string", index))
            })?;
            Ok((index, label.to_string()))
        })
        .collect::<Result<_>>()?;
    labels.sort_by_key(|(index, _)| *index);
    Ok(labels.into_iter().map(|(_, label)| label).collect())
}
