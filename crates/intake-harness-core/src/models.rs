//! Data model shared by the extractors, the aggregator and the API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::text::truncate_chars;

/// One labeled block of recovered text, bounded by a per-source budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub source_label: String,
    pub text: String,
    /// Whether the budget cut anything off.
    pub truncated: bool,
}

impl ExtractedText {
    pub fn bounded(source_label: impl Into<String>, text: &str, max_chars: usize) -> Self {
        let (text, truncated) = truncate_chars(text, max_chars);
        Self {
            source_label: source_label.into(),
            text,
            truncated,
        }
    }
}

/// A source the aggregator can attempt, in canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    Website,
    Instagram,
    Linkedin,
    Documents,
}

impl SourceName {
    pub const ALL: [SourceName; 4] = [
        SourceName::Website,
        SourceName::Instagram,
        SourceName::Linkedin,
        SourceName::Documents,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceName::Website => "website",
            SourceName::Instagram => "instagram",
            SourceName::Linkedin => "linkedin",
            SourceName::Documents => "documents",
        }
    }

    /// Header used when the block is rendered into prompt context.
    pub fn label(self) -> &'static str {
        match self {
            SourceName::Website => "SITE WEB",
            SourceName::Instagram => "INSTAGRAM",
            SourceName::Linkedin => "LINKEDIN",
            SourceName::Documents => "DOCUMENTS",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "website" => Ok(SourceName::Website),
            "instagram" => Ok(SourceName::Instagram),
            "linkedin" => Ok(SourceName::Linkedin),
            "documents" => Ok(SourceName::Documents),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Used,
    Failed,
}

/// Why a source ended up failed. A category for the caller, not a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum FailureReason {
    Network,
    HttpStatus(u16),
    Empty,
    Cancelled,
    Extraction,
    NotConfigured,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Network => f.write_str("network error"),
            FailureReason::HttpStatus(code) => write!(f, "HTTP {code}"),
            FailureReason::Empty => f.write_str("nothing extractable"),
            FailureReason::Cancelled => f.write_str("deadline reached"),
            FailureReason::Extraction => f.write_str("extraction failed"),
            FailureReason::NotConfigured => f.write_str("not configured"),
        }
    }
}

/// Terminal state of one attempted source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source_name: SourceName,
    pub status: SourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl SourceOutcome {
    /// Blank text is not a success: it resolves as failed with `Empty`.
    pub fn used(source_name: SourceName, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return Self::failed(source_name, FailureReason::Empty);
        }
        Self {
            source_name,
            status: SourceStatus::Used,
            text: Some(text),
            reason: None,
        }
    }

    pub fn failed(source_name: SourceName, reason: FailureReason) -> Self {
        Self {
            source_name,
            status: SourceStatus::Failed,
            text: None,
            reason: Some(reason),
        }
    }

    pub fn is_used(&self) -> bool {
        self.status == SourceStatus::Used
    }
}

/// Metadata row for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_id: String,
    pub file_name: String,
    pub storage_ref: String,
    #[serde(default)]
    pub declared_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// A proposed value for one field of a prefill entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefillField {
    pub field_name: String,
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
}

impl PrefillField {
    pub fn new(field_name: &str, value: &str, confidence: Confidence) -> Self {
        Self {
            field_name: field_name.to_string(),
            value: Some(value.to_string()),
            confidence,
        }
    }
}

/// The record a set of prefill proposals targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefillEntity {
    Profile,
    Persona,
    Offers,
    Story,
}

impl PrefillEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            PrefillEntity::Profile => "profile",
            PrefillEntity::Persona => "persona",
            PrefillEntity::Offers => "offers",
            PrefillEntity::Story => "story",
        }
    }
}

impl fmt::Display for PrefillEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrefillEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(PrefillEntity::Profile),
            "persona" => Ok(PrefillEntity::Persona),
            "offers" => Ok(PrefillEntity::Offers),
            "story" => Ok(PrefillEntity::Story),
            other => Err(format!(
                "unknown entity '{other}' (expected profile, persona, offers or story)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_not_used() {
        let o = SourceOutcome::used(SourceName::Website, "  \n ");
        assert_eq!(o.status, SourceStatus::Failed);
        assert_eq!(o.reason, Some(FailureReason::Empty));
        assert!(o.text.is_none());
    }

    #[test]
    fn bounded_marks_truncation() {
        let t = ExtractedText::bounded("website", "abcdef", 4);
        assert_eq!(t.text, "abcd");
        assert!(t.truncated);
        assert!(!ExtractedText::bounded("website", "abc", 4).truncated);
    }

    #[test]
    fn source_names_serialize_lowercase() {
        let json = serde_json::to_string(&SourceName::ALL).unwrap();
        assert_eq!(json, r#"["website","instagram","linkedin","documents"]"#);
        assert_eq!("LinkedIn".parse::<SourceName>().unwrap(), SourceName::Linkedin);
        assert!("tiktok".parse::<SourceName>().is_err());
    }

    #[test]
    fn failure_reason_shape() {
        let json = serde_json::to_string(&FailureReason::HttpStatus(404)).unwrap();
        assert_eq!(json, r#"{"kind":"http_status","status":404}"#);
        let json = serde_json::to_string(&FailureReason::Cancelled).unwrap();
        assert_eq!(json, r#"{"kind":"cancelled"}"#);
    }

    #[test]
    fn prefill_field_confidence_defaults() {
        let f: PrefillField =
            serde_json::from_str(r#"{"field_name":"city","value":"Lyon"}"#).unwrap();
        assert_eq!(f.confidence, Confidence::Medium);
        assert_eq!("Offers".parse::<PrefillEntity>().unwrap(), PrefillEntity::Offers);
    }
}
