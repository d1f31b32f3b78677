//! Response generation
//!
//! Turns the classification and the retrieved records into the reply sent
//! back to the user. A failed completion call falls back to a fixed template
//! for the category.


use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ResponderConfig;
use crate::knowledge::CategoryCatalog;
use crate::llm::{CompletionRequest, CompletionService};
use crate::models::{Category, ClassificationOutcome, KnowledgeRecord};

pub const SYSTEM_PROMPT: &str = "You are a helpful IT support specialist. Provide clear, actionable solutions based on the provided knowledge base.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 800;
/// Records beyond this many are left out of the prompt
const MAX_CONTEXT_RECORDS: usize = 5;

pub const NO_INFORMATION_MESSAGE: &str = "No specific knowledge base information available.";
pub const GENERAL_CONTACT: &str = "it-support@techcorp.com";
pub const GENERIC_FALLBACK: &str = "Thank you for contacting IT support. We're working on your request and will get back to you soon.";
const NO_CATEGORY_INFORMATION: &str = "Category information not available";

const ESCALATION_CONTACTS: [(Category, &str); 7] = [
    (Category::SecurityIncident, "security@techcorp.com"),
    (Category::HardwareFailure, "hardware-support@techcorp.com"),
    (Category::NetworkConnectivity, "network-support@techcorp.com"),
    (Category::EmailConfiguration, "email-support@techcorp.com"),
    (Category::SoftwareInstallation, "software-support@techcorp.com"),
    (Category::PasswordReset, GENERAL_CONTACT),
    (Category::PolicyQuestion, GENERAL_CONTACT),
];

const FALLBACK_TEMPLATES: [(Category, &str); 7] = [
    (
        Category::PasswordReset,
        "I understand you're having password issues. Please visit our password reset portal at company.com/reset. If you continue to have problems, please contact IT support.",
    ),
    (
        Category::SoftwareInstallation,
        "For software installation issues, please ensure you have administrator privileges and download from approved vendors. Contact your manager for approval of new software.",
    ),
    (
        Category::HardwareFailure,
        "I'm sorry to hear about your hardware issue. Please backup your data and contact hardware support immediately for assistance.",
    ),
    (
        Category::NetworkConnectivity,
        "For network connectivity issues, please check your physical connections and try restarting your network adapter. Contact network support if the issue persists.",
    ),
    (
        Category::EmailConfiguration,
        "For email configuration issues, please check your internet connection and verify your email settings. Contact email support if needed.",
    ),
    (
        Category::SecurityIncident,
        "This appears to be a security incident. Please do not attempt to fix this yourself. Contact the security team immediately at security@techcorp.com.",
    ),
    (
        Category::PolicyQuestion,
        "For policy questions, please refer to our company IT policies. Contact IT support if you need clarification.",
    ),
];

/// Who a request of `category` is escalated to
#[inline]
pub fn escalation_contact(category: Category) -> &'static str {
    ESCALATION_CONTACTS
        .iter()
        .find(|(mapped, _)| *mapped == category)
        .map_or(GENERAL_CONTACT, |&(_, contact)| contact)
}

/// Canned reply used when the completion service is unavailable
#[inline]
pub fn fallback_response(category: Category) -> &'static str {
    FALLBACK_TEMPLATES
        .iter()
        .find(|(mapped, _)| *mapped == category)
        .map_or(GENERIC_FALLBACK, |&(_, template)| template)
}

pub struct Responder {
    completion: Arc<dyn CompletionService>,
    catalog: Arc<CategoryCatalog>,
    max_response_length: usize,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("max_response_length", &self.max_response_length)
            .finish_non_exhaustive()
    }
}

impl Responder {
    #[inline]
    pub fn new(
        completion: Arc<dyn CompletionService>,
        catalog: Arc<CategoryCatalog>,
        config: &ResponderConfig,
    ) -> Self {
        Self {
            completion,
            catalog,
            max_response_length: config.max_response_length,
        }
    }

    /// Reply text for one request. Never fails.
    #[inline]
    pub fn respond(
        &self,
        message: &str,
        classification: &ClassificationOutcome,
        records: &[KnowledgeRecord],
        request_id: &str,
    ) -> String {
        if records.is_empty() {
            debug!("[{}] No knowledge records, skipping generation", request_id);
            return NO_INFORMATION_MESSAGE.to_string();
        }

        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: self.create_response_prompt(message, classification, records),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        match self.completion.complete(&request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[{}] Response generation error: {}", request_id, e);
                fallback_response(classification.category).to_string()
            }
        }
    }

    #[inline]
    pub fn create_response_prompt(
        &self,
        message: &str,
        classification: &ClassificationOutcome,
        records: &[KnowledgeRecord],
    ) -> String {
        let knowledge_context = records
            .iter()
            .take(MAX_CONTEXT_RECORDS)
            .enumerate()
            .map(|(i, record)| format!("{}. {} (Source: {})", i + 1, record.text, record.source_label))
            .join("\n");

        let category_info = self.catalog.get(classification.category).map_or_else(
            || NO_CATEGORY_INFORMATION.to_string(),
            |info| {
                format!(
                    "Description: {}\nTypical Resolution Time: {}",
                    info.description,
                    info.typical_resolution_time.as_deref().unwrap_or("N/A")
                )
            },
        );

        let escalation_info = if classification.escalate {
            format!(
                "\nESCALATION: This request will be escalated to {}",
                escalation_contact(classification.category)
            )
        } else {
            String::new()
        };

        format!(
            r#"You are an IT support specialist responding to a help desk request.

USER REQUEST: "{message}"

CLASSIFICATION: {category}
REASONING: {reasoning}
ESCALATION REQUIRED: {escalate}
ESCALATION REASON: {reason}{escalation_info}

CATEGORY INFORMATION:
{category_info}

RELEVANT KNOWLEDGE BASE INFORMATION:
{knowledge_context}

Please provide a helpful response that:
1. Acknowledges the user's issue
2. Provides clear, step-by-step solutions based on the knowledge base
3. Mentions escalation if required
4. Is professional and empathetic
5. Includes specific contact information if needed
6. Is well structured text rather than an email

Format your response as a natural, helpful message. Keep it under {max_length} characters."#,
            category = classification.category,
            reasoning = classification.reasoning,
            escalate = classification.escalate,
            reason = classification.escalate_reason.as_deref().unwrap_or("None"),
            max_length = self.max_response_length,
        )
    }
}
