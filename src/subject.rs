//! Subject records: the product being interviewed and, eventually, scored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::deserializers::{de_attributes_forgiving, de_option_score_forgiving};
use crate::error::{LensError, Result};

/// Question text mapped to answer text.
pub type Attributes = BTreeMap<String, String>;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

const EXCELLENT_THRESHOLD: f64 = 75.0;
const MODERATE_THRESHOLD: f64 = 50.0;

/// Product categories offered at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Other,
    Food,
    Cosmetics,
    Apparel,
    Electronics,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Other,
        Category::Food,
        Category::Cosmetics,
        Category::Apparel,
        Category::Electronics,
    ];

    /// Wire value sent to the registry and generator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Other => "Other",
            Category::Food => "Food",
            Category::Cosmetics => "Cosmetics",
            Category::Apparel => "Apparel",
            Category::Electronics => "Electronics",
        }
    }

    /// Human-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Other => "Other",
            Category::Food => "Food & Beverage",
            Category::Cosmetics => "Cosmetics & Skincare",
            Category::Apparel => "Apparel & Textile",
            Category::Electronics => "Electronics",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| {
                let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                LensError::validation(format!(
                    "unknown category '{}'; expected one of {}",
                    needle,
                    valid.join(", ")
                ))
            })
    }
}

/// Payload for creating a subject in the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectDraft {
    pub name: String,
    pub category: Category,
    pub attributes: Attributes,
}

impl SubjectDraft {
    /// Builds a draft with an empty attribute map. Rejects blank names.
    pub fn new(name: &str, category: Category) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LensError::validation("product name must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            category,
            attributes: Attributes::new(),
        })
    }
}

/// A registered product as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, deserialize_with = "de_attributes_forgiving")]
    pub attributes: Attributes,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(
        rename = "transparencyScore",
        default,
        deserialize_with = "de_option_score_forgiving",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
}

impl SubjectRecord {
    /// Tier for the record's score, if it has been scored.
    pub fn tier(&self) -> Option<ScoreTier> {
        self.score.map(ScoreTier::classify)
    }

    pub fn report_file_name(&self) -> String {
        report_file_name(&self.name)
    }
}

/// Scorer response: `{product, score}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredSubject {
    pub product: SubjectRecord,
    #[serde(default, deserialize_with = "de_option_score_forgiving")]
    pub score: Option<f64>,
}

impl ScoredSubject {
    /// The authoritative record, with its score in range.
    ///
    /// The product's own score wins; the top-level score fills it when absent.
    pub fn into_record(self) -> Result<SubjectRecord> {
        let mut record = self.product;
        if record.score.is_none() {
            record.score = self.score;
        }
        match record.score {
            Some(score) if (SCORE_MIN..=SCORE_MAX).contains(&score) => Ok(record),
            Some(score) => Err(LensError::Serialization {
                message: format!("scorer returned out-of-range score {}", score),
            }),
            None => Err(LensError::Serialization {
                message: "scorer response carried no score".into(),
            }),
        }
    }
}

/// Coarse classification of a transparency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreTier {
    Excellent,
    Moderate,
    Limited,
}

impl ScoreTier {
    pub fn classify(score: f64) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            ScoreTier::Excellent
        } else if score >= MODERATE_THRESHOLD {
            ScoreTier::Moderate
        } else {
            ScoreTier::Limited
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScoreTier::Excellent => "Excellent transparency practices",
            ScoreTier::Moderate => "Moderate transparency",
            ScoreTier::Limited => "Limited transparency disclosure",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Opaque report bytes plus the name they should be saved under.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub subject_id: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

pub fn report_file_name(subject_name: &str) -> String {
    format!("{}_transparency_report.pdf", subject_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(ScoreTier::classify(82.0), ScoreTier::Excellent);
        assert_eq!(ScoreTier::classify(75.0), ScoreTier::Excellent);
        assert_eq!(ScoreTier::classify(60.0), ScoreTier::Moderate);
        assert_eq!(ScoreTier::classify(50.0), ScoreTier::Moderate);
        assert_eq!(ScoreTier::classify(30.0), ScoreTier::Limited);
        assert_eq!(
            ScoreTier::classify(82.0).description(),
            "Excellent transparency practices"
        );
        assert_eq!(ScoreTier::classify(60.0).to_string(), "Moderate transparency");
        assert_eq!(
            ScoreTier::classify(30.0).to_string(),
            "Limited transparency disclosure"
        );
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("cosmetics".parse::<Category>().unwrap(), Category::Cosmetics);
        assert_eq!(" Food ".parse::<Category>().unwrap(), Category::Food);
        let err = "Toys".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("Electronics"));
    }

    #[test]
    fn draft_rejects_blank_name() {
        assert!(matches!(
            SubjectDraft::new("   ", Category::Other),
            Err(LensError::Validation { .. })
        ));
        let draft = SubjectDraft::new(" Soap ", Category::Cosmetics).unwrap();
        assert_eq!(draft.name, "Soap");
        assert!(draft.attributes.is_empty());
    }

    #[test]
    fn draft_serializes_wire_shape() {
        let draft = SubjectDraft::new("Soap", Category::Cosmetics).unwrap();
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({ "name": "Soap", "category": "Cosmetics", "attributes": {} })
        );
    }

    #[test]
    fn record_reads_registry_field_names() {
        let record: SubjectRecord = serde_json::from_value(json!({
            "_id": "665f1c",
            "name": "Soap",
            "category": "Cosmetics",
            "questions": [],
            "attributes": {},
            "transparencyScore": 82
        }))
        .unwrap();
        assert_eq!(record.id, "665f1c");
        assert_eq!(record.score, Some(82.0));
        assert_eq!(record.tier(), Some(ScoreTier::Excellent));
        assert_eq!(record.report_file_name(), "Soap_transparency_report.pdf");
    }

    #[test]
    fn scored_subject_falls_back_to_top_level_score() {
        let scored: ScoredSubject = serde_json::from_value(json!({
            "product": { "_id": "1", "name": "Soap", "category": "Cosmetics" },
            "score": 60
        }))
        .unwrap();
        let record = scored.into_record().unwrap();
        assert_eq!(record.score, Some(60.0));
    }

    #[test]
    fn scored_subject_rejects_out_of_range() {
        let scored: ScoredSubject = serde_json::from_value(json!({
            "product": { "_id": "1", "name": "Soap", "transparencyScore": 140 }
        }))
        .unwrap();
        assert!(matches!(
            scored.into_record(),
            Err(LensError::Serialization { .. })
        ));
    }
}
