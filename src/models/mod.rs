// Data model shared by the classification, retrieval and response stages


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::DeskError;

/// The closed set of request categories a help desk request can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PasswordReset,
    SoftwareInstallation,
    HardwareFailure,
    NetworkConnectivity,
    EmailConfiguration,
    SecurityIncident,
    PolicyQuestion,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::PasswordReset,
        Self::SoftwareInstallation,
        Self::HardwareFailure,
        Self::NetworkConnectivity,
        Self::EmailConfiguration,
        Self::SecurityIncident,
        Self::PolicyQuestion,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PasswordReset => "password_reset",
            Self::SoftwareInstallation => "software_installation",
            Self::HardwareFailure => "hardware_failure",
            Self::NetworkConnectivity => "network_connectivity",
            Self::EmailConfiguration => "email_configuration",
            Self::SecurityIncident => "security_incident",
            Self::PolicyQuestion => "policy_question",
        }
    }
}

impl fmt::Display for Category {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DeskError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| DeskError::InvalidCategory(s.to_string()))
    }
}

/// Coarse category attached to a knowledge record.
///
/// Records that match none of the request categories are tagged `general`.
/// Unknown labels read back from disk are normalized to `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordCategory {
    Request(Category),
    General,
}

impl RecordCategory {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request(category) => category.as_str(),
            Self::General => "general",
        }
    }
}

impl From<Category> for RecordCategory {
    #[inline]
    fn from(category: Category) -> Self {
        Self::Request(category)
    }
}

impl From<String> for RecordCategory {
    #[inline]
    fn from(label: String) -> Self {
        label
            .parse::<Category>()
            .map_or(Self::General, Self::Request)
    }
}

impl From<RecordCategory> for String {
    #[inline]
    fn from(category: RecordCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for RecordCategory {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single retrievable unit of knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    #[serde(rename = "content")]
    pub text: String,
    #[serde(rename = "source")]
    pub source_label: String,
    pub category: RecordCategory,
    /// Similarity to the last query this record was returned for
    #[serde(rename = "relevance_score")]
    pub score: f32,
}

impl KnowledgeRecord {
    #[inline]
    pub fn new(
        text: impl Into<String>,
        source_label: impl Into<String>,
        category: RecordCategory,
    ) -> Self {
        Self {
            text: text.into(),
            source_label: source_label.into(),
            category,
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub category: Category,
    pub reasoning: String,
    #[serde(rename = "escalation_required")]
    pub escalate: bool,
    #[serde(rename = "escalation_reason", default)]
    pub escalate_reason: Option<String>,
}

/// Incoming help desk request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelpDeskRequest {
    #[serde(default)]
    pub request_id: Option<String>,
    pub user_message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HelpDeskRequest {
    #[inline]
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpDeskResponse {
    pub request_id: String,
    pub classification: ClassificationOutcome,
    pub response_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub timestamp: String,
}

/// Outcome of replaying one scripted request through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: String,
    pub expected_category: String,
    pub predicted_category: String,
    pub correct_classification: bool,
    pub expected_elements: Vec<String>,
    pub found_elements: Vec<String>,
    pub escalation_correct: bool,
    pub response_quality_score: f32,
}
