//! Metadata predicates used to restrict get, delete and search operations.

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, MetadataValue};
use crate::error::{RagError, Result};
use crate::metadata::{
    CATEGORY_KEY, Category, DOC_GROUP_KEY, DOCUMENT_ID_KEY, DOCUMENT_NAME_KEY, DocType,
    FILE_NAME_KEY, LAW_NAME_KEY, MD5_KEY, PUBLISHER_SLOTS, TYPE_KEY, publisher_slot_key,
};

/// A predicate over a chunk's metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFilter {
    /// `metadata[key] == value`.
    Eq { key: String, value: MetadataValue },
    /// `metadata[key]` is one of `values`.
    In { key: String, values: Vec<String> },
    /// Every clause matches.
    And(Vec<MetadataFilter>),
    /// At least one clause matches.
    Or(Vec<MetadataFilter>),
}

impl MetadataFilter {
    /// Equality on a single key.
    pub fn equals(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Eq { key: key.into(), value: value.into() }
    }

    /// Evaluate the predicate against a metadata record.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::Eq { key, value } => metadata.get(key) == Some(value),
            Self::In { key, values } => metadata
                .get(key)
                .and_then(MetadataValue::as_str)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Self::And(clauses) => clauses.iter().all(|c| c.matches(metadata)),
            Self::Or(clauses) => clauses.iter().any(|c| c.matches(metadata)),
        }
    }

    /// Combine equality clauses: none yields no filter, one is returned
    /// unwrapped, more are joined with `And`.
    pub fn all_of(mut clauses: Vec<MetadataFilter>) -> Option<Self> {
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(Self::And(clauses)),
        }
    }
}

/// Selects the chunks of one document, by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSelector {
    Id(String),
    Name(String),
}

impl DocumentSelector {
    /// Build a selector from the two mutually exclusive request parameters.
    /// Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if neither or both are supplied.
    pub fn new(document_id: Option<String>, document_name: Option<String>) -> Result<Self> {
        let document_id = document_id.filter(|s| !s.trim().is_empty());
        let document_name = document_name.filter(|s| !s.trim().is_empty());
        match (document_id, document_name) {
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(name)) => Ok(Self::Name(name)),
            (None, None) => Err(RagError::invalid(
                "at least one of document_id and document_name is required",
            )),
            (Some(_), Some(_)) => Err(RagError::invalid(
                "at most one of document_id and document_name may be given",
            )),
        }
    }

    /// The equality filter matching this document's chunks.
    pub fn to_filter(&self) -> MetadataFilter {
        match self {
            Self::Id(id) => MetadataFilter::equals(DOCUMENT_ID_KEY, id.as_str()),
            Self::Name(name) => MetadataFilter::equals(DOCUMENT_NAME_KEY, name.as_str()),
        }
    }
}

/// Optional filter fields of a search request.
///
/// Two modes are supported and they are mutually exclusive: publisher
/// membership, or a conjunction of scalar equalities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub publishers: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub law_name: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub doc_group: Option<String>,
}

impl SearchFilter {
    /// Translate the request fields into a store predicate.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] when both modes are requested, or
    /// when `category` / `type` is not a known value.
    pub fn to_filter(&self) -> Result<Option<MetadataFilter>> {
        let mut clauses = Vec::new();
        if let Some(category) = &self.category {
            let category: Category = category.parse()?;
            clauses.push(MetadataFilter::equals(CATEGORY_KEY, category.as_str()));
        }
        if let Some(doc_type) = &self.doc_type {
            let doc_type: DocType = doc_type.parse()?;
            clauses.push(MetadataFilter::equals(TYPE_KEY, doc_type.as_str()));
        }
        let scalars = [
            (FILE_NAME_KEY, &self.file_name),
            (LAW_NAME_KEY, &self.law_name),
            (MD5_KEY, &self.md5),
            (DOC_GROUP_KEY, &self.doc_group),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                clauses.push(MetadataFilter::equals(key, value.as_str()));
            }
        }

        let publishers = self.publishers.as_deref().filter(|p| !p.is_empty());
        match publishers {
            Some(_) if !clauses.is_empty() => Err(RagError::invalid(
                "publishers cannot be combined with other filter fields",
            )),
            Some(publishers) => Ok(Some(MetadataFilter::Or(
                (1..=PUBLISHER_SLOTS)
                    .map(|slot| MetadataFilter::In {
                        key: publisher_slot_key(slot),
                        values: publishers.to_vec(),
                    })
                    .collect(),
            ))),
            None => Ok(MetadataFilter::all_of(clauses)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DocumentMetadata;

    fn record(json: serde_json::Value) -> Metadata {
        DocumentMetadata::from_json(Some(json)).unwrap().into_record("民法典", "doc-1")
    }

    #[test]
    fn selector_requires_exactly_one_field() {
        assert!(DocumentSelector::new(None, None).unwrap_err().to_string().contains("at least"));
        assert!(
            DocumentSelector::new(Some("a".into()), Some("b".into()))
                .unwrap_err()
                .to_string()
                .contains("at most")
        );
        assert_eq!(
            DocumentSelector::new(Some("doc-1".into()), Some("  ".into())).unwrap(),
            DocumentSelector::Id("doc-1".into())
        );
    }

    #[test]
    fn empty_search_filter_is_unrestricted() {
        assert_eq!(SearchFilter::default().to_filter().unwrap(), None);
        let empty_publishers = SearchFilter { publishers: Some(vec![]), ..Default::default() };
        assert_eq!(empty_publishers.to_filter().unwrap(), None);
    }

    #[test]
    fn single_field_is_unwrapped() {
        let filter = SearchFilter { md5: Some("abc".into()), ..Default::default() };
        assert_eq!(filter.to_filter().unwrap(), Some(MetadataFilter::equals(MD5_KEY, "abc")));
    }

    #[test]
    fn multiple_fields_are_conjunctive() {
        let filter = SearchFilter {
            category: Some("standard".into()),
            doc_group: Some("g1".into()),
            ..Default::default()
        };
        let predicate = filter.to_filter().unwrap().unwrap();
        assert!(matches!(&predicate, MetadataFilter::And(c) if c.len() == 2));

        assert!(predicate.matches(&record(serde_json::json!({
            "category": "standard", "doc_group": "g1"
        }))));
        assert!(!predicate.matches(&record(serde_json::json!({
            "category": "standard", "doc_group": "g2"
        }))));
    }

    #[test]
    fn publisher_filter_matches_any_slot() {
        let filter = SearchFilter {
            publishers: Some(vec!["司法部".into(), "财政部".into()]),
            ..Default::default()
        };
        let predicate = filter.to_filter().unwrap().unwrap();

        let third_slot = record(serde_json::json!({ "publishers": ["国务院", "人大", "财政部"] }));
        assert!(predicate.matches(&third_slot));
        let none = record(serde_json::json!({ "publishers": ["国务院"] }));
        assert!(!predicate.matches(&none));
    }

    #[test]
    fn publisher_mode_excludes_scalar_mode() {
        let filter = SearchFilter {
            publishers: Some(vec!["司法部".into()]),
            law_name: Some("民法典".into()),
            ..Default::default()
        };
        assert!(filter.to_filter().is_err());
    }

    #[test]
    fn invalid_enumeration_is_rejected() {
        let filter = SearchFilter { doc_type: Some("appendix".into()), ..Default::default() };
        assert!(filter.to_filter().unwrap_err().to_string().contains("appendix"));
    }
}
