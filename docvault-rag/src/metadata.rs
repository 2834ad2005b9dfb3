//! Document metadata assembly and validation.
//!
//! Callers submit a free-form JSON object. Known domain keys are validated
//! here, publisher organisations are fanned out into fixed positional slots,
//! and the reserved identity keys are injected last so that every stored
//! chunk can always be traced back to its document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::{Metadata, MetadataValue};
use crate::error::{RagError, Result};

/// Reserved key holding the document name.
pub const DOCUMENT_NAME_KEY: &str = "document_name";
/// Reserved key holding the document id.
pub const DOCUMENT_ID_KEY: &str = "document_id";
/// Metadata key for [`Category`].
pub const CATEGORY_KEY: &str = "category";
/// Metadata key for [`DocType`].
pub const TYPE_KEY: &str = "type";
/// Metadata key for the source file name.
pub const FILE_NAME_KEY: &str = "file_name";
/// Metadata key for the law name.
pub const LAW_NAME_KEY: &str = "law_name";
/// Metadata key for the source file checksum.
pub const MD5_KEY: &str = "md5";
/// Metadata key for the document group.
pub const DOC_GROUP_KEY: &str = "doc_group";
/// Request key carrying the publisher organisation list.
pub const PUBLISHERS_KEY: &str = "publishers";

/// Number of positional publisher organisation slots.
pub const PUBLISHER_SLOTS: usize = 10;
/// Value stored in unused publisher slots.
pub const PUBLISHER_NONE: &str = "none";

/// Metadata key of the 1-based publisher slot `slot`.
pub fn publisher_slot_key(slot: usize) -> String {
    format!("publisher_org_{slot}")
}

/// Document category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Regulation,
    Standard,
    InternalPolicy,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Regulation, Self::Standard, Self::InternalPolicy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regulation => "regulation",
            Self::Standard => "standard",
            Self::InternalPolicy => "internal-policy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s).ok_or_else(|| {
            RagError::invalid(format!(
                "invalid category '{s}', expected one of: {}",
                join_names(Self::ALL.iter().map(Category::as_str))
            ))
        })
    }
}

/// Whether a document is the main text or an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    MainText,
    Attachment,
}

impl DocType {
    pub const ALL: [DocType; 2] = [Self::MainText, Self::Attachment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainText => "main-text",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| {
            RagError::invalid(format!(
                "invalid type '{s}', expected one of: {}",
                join_names(Self::ALL.iter().map(DocType::as_str))
            ))
        })
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// Validated caller metadata for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub category: Option<Category>,
    pub doc_type: Option<DocType>,
    pub file_name: Option<String>,
    pub law_name: Option<String>,
    pub md5: Option<String>,
    pub doc_group: Option<String>,
    /// Publisher organisations, at most [`PUBLISHER_SLOTS`].
    pub publishers: Vec<String>,
    /// Any other scalar keys, copied through verbatim.
    pub extra: Metadata,
}

impl DocumentMetadata {
    /// Parse and validate the free-form metadata object of an ingestion request.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if the value is not an object, an
    /// enumerated key has an unknown value, a string key has a non-string value,
    /// more than [`PUBLISHER_SLOTS`] publishers are given, or any value is not
    /// a scalar.
    pub fn from_json(value: Option<serde_json::Value>) -> Result<Self> {
        let object = match value {
            None | Some(serde_json::Value::Null) => return Ok(Self::default()),
            Some(serde_json::Value::Object(object)) => object,
            Some(_) => return Err(RagError::invalid("metadata must be a JSON object")),
        };

        let mut meta = Self::default();
        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                CATEGORY_KEY => meta.category = Some(expect_str(&key, &value)?.parse()?),
                TYPE_KEY => meta.doc_type = Some(expect_str(&key, &value)?.parse()?),
                FILE_NAME_KEY => meta.file_name = Some(expect_str(&key, &value)?.to_string()),
                LAW_NAME_KEY => meta.law_name = Some(expect_str(&key, &value)?.to_string()),
                MD5_KEY => meta.md5 = Some(expect_str(&key, &value)?.to_string()),
                DOC_GROUP_KEY => meta.doc_group = Some(expect_str(&key, &value)?.to_string()),
                PUBLISHERS_KEY => meta.publishers = parse_publishers(&value)?,
                _ => {
                    let scalar = MetadataValue::from_json(&value).ok_or_else(|| {
                        RagError::invalid(format!("metadata field '{key}' must be a scalar value"))
                    })?;
                    meta.extra.insert(key, scalar);
                }
            }
        }

        if meta.publishers.len() > PUBLISHER_SLOTS {
            return Err(RagError::invalid(format!(
                "at most {PUBLISHER_SLOTS} publishers are supported, got {}",
                meta.publishers.len()
            )));
        }
        Ok(meta)
    }

    /// Build the flat record stored on every chunk of the document.
    ///
    /// Order of precedence, lowest first: extra keys, domain keys, publisher
    /// slots, identity keys.
    pub fn into_record(self, document_name: &str, document_id: &str) -> Metadata {
        let mut record = self.extra;

        let domain = [
            (CATEGORY_KEY, self.category.map(|c| c.as_str().to_string())),
            (TYPE_KEY, self.doc_type.map(|t| t.as_str().to_string())),
            (FILE_NAME_KEY, self.file_name),
            (LAW_NAME_KEY, self.law_name),
            (MD5_KEY, self.md5),
            (DOC_GROUP_KEY, self.doc_group),
        ];
        for (key, value) in domain {
            if let Some(value) = value {
                record.insert(key.to_string(), MetadataValue::Str(value));
            }
        }

        for slot in 1..=PUBLISHER_SLOTS {
            record.remove(&publisher_slot_key(slot));
        }
        for (slot, publisher) in (1..=PUBLISHER_SLOTS).zip(self.publishers) {
            record.insert(publisher_slot_key(slot), MetadataValue::Str(publisher));
        }

        stamp_record(&mut record, document_name, document_id);
        record
    }
}

/// Complete a metadata record before it is written: unused publisher slots
/// are set to [`PUBLISHER_NONE`] and the identity keys are (re)written,
/// replacing any caller-supplied value.
pub fn stamp_record(record: &mut Metadata, document_name: &str, document_id: &str) {
    for slot in 1..=PUBLISHER_SLOTS {
        record
            .entry(publisher_slot_key(slot))
            .or_insert_with(|| MetadataValue::Str(PUBLISHER_NONE.to_string()));
    }

    for (key, value) in [(DOCUMENT_NAME_KEY, document_name), (DOCUMENT_ID_KEY, document_id)] {
        if let Some(previous) = record.get(key) {
            if previous.as_str() != Some(value) {
                warn!(key, previous = %previous, value, "overriding reserved metadata key");
            }
        }
        record.insert(key.to_string(), MetadataValue::Str(value.to_string()));
    }
}

fn expect_str<'a>(key: &str, value: &'a serde_json::Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| RagError::invalid(format!("metadata field '{key}' must be a string")))
}

fn parse_publishers(value: &serde_json::Value) -> Result<Vec<String>> {
    let items = value.as_array().ok_or_else(|| {
        RagError::invalid(format!("metadata field '{PUBLISHERS_KEY}' must be an array of strings"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                RagError::invalid(format!("entries of '{PUBLISHERS_KEY}' must be strings"))
            })
        })
        .collect()
}
