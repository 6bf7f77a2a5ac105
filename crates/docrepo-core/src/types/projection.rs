//! Field projection for read operations.

use serde_json::Value;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::document::{Document, KEY_FIELD};

/// Whether a projection lists the fields to keep or the fields to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Keep only the listed fields (plus `_id` unless excluded).
    Include,
    /// Keep everything except the listed fields.
    Exclude,
}

/// A parsed field selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    mode: ProjectionMode,
    fields: Vec<String>,
    exclude_key: bool,
}

impl Projection {
    /// Keep only the given fields.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: ProjectionMode::Include,
            fields: fields.into_iter().map(Into::into).collect(),
            exclude_key: false,
        }
    }

    /// Drop the given fields.
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: ProjectionMode::Exclude,
            fields: fields.into_iter().map(Into::into).collect(),
            exclude_key: false,
        }
    }

    /// Parse a space-joined selection string (`"name email"`, `"-secret"`).
    ///
    /// Returns `Ok(None)` for an empty selection, meaning "all fields".
    /// `-_id` may be combined with an inclusion list; any other mix of
    /// included and excluded fields is rejected.
    pub fn parse(selection: &str) -> AppResult<Option<Self>> {
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut exclude_key = false;

        for token in selection.split_whitespace() {
            match token.strip_prefix('-') {
                Some(KEY_FIELD) => exclude_key = true,
                Some(field) if !field.is_empty() => excluded.push(field.to_string()),
                Some(_) => {}
                None => included.push(token.to_string()),
            }
        }

        if !included.is_empty() && !excluded.is_empty() {
            return Err(AppError::validation(format!(
                "Projection cannot mix inclusion and exclusion: '{selection}'"
            )));
        }

        if !included.is_empty() {
            return Ok(Some(Self {
                mode: ProjectionMode::Include,
                fields: included,
                exclude_key,
            }));
        }

        if !excluded.is_empty() || exclude_key {
            if exclude_key {
                excluded.push(KEY_FIELD.to_string());
            }
            return Ok(Some(Self {
                mode: ProjectionMode::Exclude,
                fields: excluded,
                exclude_key: false,
            }));
        }

        Ok(None)
    }

    /// Projection mode.
    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Listed fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether `_id` is dropped from an inclusion projection.
    pub fn excludes_key(&self) -> bool {
        self.exclude_key
    }

    /// Store-native projection document (`{"name": 1, "_id": 0}`).
    pub fn to_document(&self) -> Document {
        let flag = match self.mode {
            ProjectionMode::Include => 1,
            ProjectionMode::Exclude => 0,
        };
        let mut doc: Document = self
            .fields
            .iter()
            .map(|f| (f.clone(), Value::from(flag)))
            .collect();
        if self.exclude_key {
            doc.insert(KEY_FIELD.to_string(), Value::from(0));
        }
        doc
    }
}
