//! Core registration types for regbook.
//!
//! This module defines the three registration collections, the ephemeral
//! form-submission contract, and the persisted row representation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One persisted registration record: a fixed-width ordered list of
/// string fields, positionally aligned to its collection's header row.
pub type Row = Vec<String>;

/// File name of the combined all-collections workbook.
pub const COMBINED_WORKBOOK_FILE: &str = "ShikshaSathi_All_Registrations.xlsx";

/// Storage key for the combined snapshot written by the mirror.
pub const SNAPSHOT_KEY: &str = "snapshot";

/// Storage key for the last-sync timestamp written alongside the snapshot.
pub const SNAPSHOT_UPDATED_KEY: &str = "snapshot/updated_at";

/// Storage key for the cached combined workbook bytes.
pub const WORKBOOK_ALL_KEY: &str = "workbook/all";

/// One of the three named registration collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Tutor registrations.
    Tutor,
    /// Partner-school registrations.
    School,
    /// Parent/student registrations.
    ParentStudent,
}

impl Collection {
    /// All collections, in their canonical order.
    pub const ALL: [Self; 3] = [Self::Tutor, Self::School, Self::ParentStudent];

    /// Short identifier used in storage keys and logs.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Tutor => "tutor",
            Self::School => "school",
            Self::ParentStudent => "parent_student",
        }
    }

    /// Storage key holding this collection's JSON-encoded row sequence.
    #[must_use]
    pub fn rows_key(self) -> String {
        format!("registrations/{}", self.id())
    }

    /// Storage key holding this collection's last-update timestamp (RFC 3339).
    #[must_use]
    pub fn updated_key(self) -> String {
        format!("registrations/{}/updated_at", self.id())
    }

    /// Storage key holding this collection's data-row count.
    #[must_use]
    pub fn count_key(self) -> String {
        format!("registrations/{}/count", self.id())
    }

    /// Storage key holding this collection's cached workbook bytes.
    #[must_use]
    pub fn workbook_key(self) -> String {
        format!("workbook/{}", self.id())
    }

    /// Base name for exported files, without extension.
    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Tutor => "Tutor_Registrations",
            Self::School => "Partner_Schools",
            Self::ParentStudent => "Parent_Student_Registrations",
        }
    }

    /// Sheet name used for this collection in the combined workbook.
    #[must_use]
    pub fn sheet_name(self) -> &'static str {
        self.file_stem()
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A single submitted field value: plain text, or an ordered list from a
/// multi-select control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A single text value.
    Text(String),
    /// An ordered multi-select value.
    List(Vec<String>),
}

impl FieldValue {
    /// Render this value into its single-cell form.
    ///
    /// Lists join with `", "` preserving order, without de-duplication.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::List(values) => values.join(", "),
        }
    }
}

/// An ephemeral form submission: field name to value, consumed once by
/// the codec and not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(BTreeMap<String, FieldValue>);

impl Submission {
    /// Create an empty submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field, returning the submission for chaining.
    #[must_use]
    pub fn text(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), FieldValue::Text(value.into()));
        self
    }

    /// Add a multi-select field, returning the submission for chaining.
    #[must_use]
    pub fn list<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(
            field.into(),
            FieldValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Render the named field, defaulting absent fields to `""`.
    #[must_use]
    pub fn render(&self, field: &str) -> String {
        self.0.get(field).map(FieldValue::render).unwrap_or_default()
    }

    /// Number of supplied fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no fields were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
