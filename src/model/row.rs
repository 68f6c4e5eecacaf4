//! Persistent row identities and their per-import snapshots.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The durable identity of one logical record across imports.
///
/// Keyed by the trimmed string value of the detected primary-key column.
/// Rows created by attaching a note to an unseen identifier have no import
/// association and start out orphaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentRow {
    pub id: i64,
    pub primary_key_value: String,
    pub first_import_id: Option<i64>,
    pub last_seen_import_id: Option<i64>,
    pub is_orphaned: bool,
}

/// Immutable capture of a row's field values as they appeared in one import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub id: i64,
    pub row_id: i64,
    pub import_id: i64,
    pub data: RowData,
}

/// Ordered column → value mapping for a snapshot.
///
/// Serialized as a JSON object whose key order follows the import's
/// column order, so heterogeneous schemas round-trip without a fixed struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowData(Vec<(String, String)>);

impl RowData {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a column; a column name already present is ignored.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        if self.get(&column).is_none() {
            self.0.push((column, value.into()));
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RowData {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (column, value) in iter {
            data.push(column, value);
        }
        data
    }
}

impl Serialize for RowData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in &self.0 {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RowData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowDataVisitor;

        impl<'de> Visitor<'de> for RowDataVisitor {
            type Value = RowData;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RowData, A::Error> {
                let mut data = RowData::new();
                while let Some((column, value)) = access.next_entry::<String, Option<String>>()? {
                    data.push(column, value.unwrap_or_default());
                }
                Ok(data)
            }
        }

        deserializer.deserialize_map(RowDataVisitor)
    }
}

/// How a caller names a persistent row.
///
/// Raw identifiers that parse as integers are tried as internal ids first
/// and fall back to a primary-key match on the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIdentifier {
    ByInternalId { id: i64, raw: String },
    ByPrimaryKeyValue(String),
}

impl RowIdentifier {
    /// Classify a raw identifier. Surrounding whitespace is ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => Self::ByInternalId {
                id,
                raw: trimmed.to_string(),
            },
            Err(_) => Self::ByPrimaryKeyValue(trimmed.to_string()),
        }
    }

    /// The primary-key text to match (or create) when no internal id hits.
    #[must_use]
    pub fn primary_key_value(&self) -> &str {
        match self {
            Self::ByInternalId { raw, .. } => raw,
            Self::ByPrimaryKeyValue(value) => value,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary_key_value().is_empty()
    }
}

impl fmt::Display for RowIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary_key_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_data_preserves_column_order() {
        let data: RowData = [
            ("Name".to_string(), "A".to_string()),
            ("ID".to_string(), "1".to_string()),
            ("Email".to_string(), "a@x".to_string()),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"Name":"A","ID":"1","Email":"a@x"}"#);

        let back: RowData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.columns().collect::<Vec<_>>(), vec!["Name", "ID", "Email"]);
    }

    #[test]
    fn test_row_data_null_reads_as_empty() {
        let data: RowData = serde_json::from_str(r#"{"b":null,"a":"x"}"#).unwrap();
        assert_eq!(data.get("b"), Some(""));
        assert_eq!(data.columns().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_row_identifier_parse() {
        assert_eq!(
            RowIdentifier::parse(" 42 "),
            RowIdentifier::ByInternalId { id: 42, raw: "42".to_string() }
        );
        assert_eq!(
            RowIdentifier::parse("unseen-key"),
            RowIdentifier::ByPrimaryKeyValue("unseen-key".to_string())
        );
        assert_eq!(RowIdentifier::parse("007").primary_key_value(), "007");
        assert!(RowIdentifier::parse("   ").is_empty());
    }
}
