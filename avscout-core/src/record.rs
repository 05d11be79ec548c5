//! The per-movie metadata record filled in by data sources.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Source name recorded for fields computed by the post-processing step.
pub const DERIVED_SOURCE: &str = "derived";

/// Every named field a record can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    OriginalTitle,
    Plot,
    Cover,
    BigCover,
    Actress,
    Genre,
    GenreId,
    GenreNorm,
    Director,
    Duration,
    PublishDate,
    Producer,
    Publisher,
    Serial,
    Score,
    Url,
    PreviewPics,
    PreviewVideo,
    Magnet,
    Uncensored,
}

/// Value shape a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    List,
    Flag,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Text => "text",
            FieldKind::List => "list",
            FieldKind::Flag => "flag",
        })
    }
}

impl Field {
    pub const ALL: [Field; 21] = [
        Field::Title,
        Field::OriginalTitle,
        Field::Plot,
        Field::Cover,
        Field::BigCover,
        Field::Actress,
        Field::Genre,
        Field::GenreId,
        Field::GenreNorm,
        Field::Director,
        Field::Duration,
        Field::PublishDate,
        Field::Producer,
        Field::Publisher,
        Field::Serial,
        Field::Score,
        Field::Url,
        Field::PreviewPics,
        Field::PreviewVideo,
        Field::Magnet,
        Field::Uncensored,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::OriginalTitle => "original_title",
            Field::Plot => "plot",
            Field::Cover => "cover",
            Field::BigCover => "big_cover",
            Field::Actress => "actress",
            Field::Genre => "genre",
            Field::GenreId => "genre_id",
            Field::GenreNorm => "genre_norm",
            Field::Director => "director",
            Field::Duration => "duration",
            Field::PublishDate => "publish_date",
            Field::Producer => "producer",
            Field::Publisher => "publisher",
            Field::Serial => "serial",
            Field::Score => "score",
            Field::Url => "url",
            Field::PreviewPics => "preview_pics",
            Field::PreviewVideo => "preview_video",
            Field::Magnet => "magnet",
            Field::Uncensored => "uncensored",
        }
    }

    /// Look a field up by its snake_case name.
    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Filled by post-processing after aggregation, never by a connector.
    pub fn is_derived(self) -> bool {
        matches!(self, Field::GenreNorm | Field::Uncensored)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Actress
            | Field::Genre
            | Field::GenreId
            | Field::GenreNorm
            | Field::PreviewPics
            | Field::Magnet => FieldKind::List,
            Field::Uncensored => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Flag(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::List(_) => FieldKind::List,
            FieldValue::Flag(_) => FieldKind::Flag,
        }
    }

    /// Empty strings and empty lists count as unset. Flags are always set.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
            FieldValue::Flag(_) => false,
        }
    }
}

/// Named optional fields for one movie, plus which source supplied each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    values: BTreeMap<Field, FieldValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    sources: BTreeMap<Field, String>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a field, replacing any earlier value. Empty values clear the field.
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<(), RecordError> {
        if value.kind() != field.kind() {
            return Err(RecordError::KindMismatch {
                field,
                expected: field.kind(),
            });
        }
        if value.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
        self.sources.remove(&field);
        Ok(())
    }

    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> Result<(), RecordError> {
        self.set(field, FieldValue::Text(value.into()))
    }

    pub fn set_list<I, S>(&mut self, field: Field, values: I) -> Result<(), RecordError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = values
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.trim().is_empty())
            .collect();
        self.set(field, FieldValue::List(items))
    }

    pub fn set_flag(&mut self, field: Field, value: bool) -> Result<(), RecordError> {
        self.set(field, FieldValue::Flag(value))
    }

    /// Overwrite a field computed from other fields and mark it as derived.
    pub fn set_derived(&mut self, field: Field, value: FieldValue) -> Result<(), RecordError> {
        self.set(field, value)?;
        if self.values.contains_key(&field) {
            self.sources.insert(field, DERIVED_SOURCE.to_string());
        }
        Ok(())
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field)? {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn list(&self, field: Field) -> Option<&[String]> {
        match self.values.get(&field)? {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn flag(&self, field: Field) -> Option<bool> {
        match self.values.get(&field)? {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields currently holding a value, in field order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.keys().copied()
    }

    /// Name of the source that supplied `field`, if recorded.
    pub fn source_of(&self, field: Field) -> Option<&str> {
        self.sources.get(&field).map(String::as_str)
    }

    /// Copy every field of `other` that is still blank here, attributing it to `source`.
    ///
    /// Fields already set are left alone regardless of what `other` holds. Returns the
    /// fields that were filled.
    pub fn merge_blanks(&mut self, other: MetadataRecord, source: &str) -> Vec<Field> {
        let mut filled = Vec::new();
        for (field, value) in other.values {
            if self.values.contains_key(&field) {
                continue;
            }
            self.values.insert(field, value);
            self.sources.insert(field, source.to_string());
            filled.push(field);
        }
        filled
    }

    /// Members of `required` that are still unset.
    pub fn missing(&self, required: &BTreeSet<Field>) -> Vec<Field> {
        required
            .iter()
            .filter(|f| !self.is_set(**f))
            .copied()
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
