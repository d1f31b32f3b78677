//! Request classification
//!
//! Asks the completion service to route a message into one of the request
//! categories and decide whether a human needs to look at it. Every failure
//! mode produces a usable [`ClassificationOutcome`].

#[cfg(test)]
mod tests;

use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::knowledge::CategoryCatalog;
use crate::llm::{CompletionRequest, CompletionService};
use crate::models::{Category, ClassificationOutcome};

pub const SYSTEM_PROMPT: &str = "You are an expert IT help desk classifier. Your job is to categorize user requests accurately and determine if escalation to a human is needed.";
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 300;

/// Label used when the model reply carries no category
pub const DEFAULT_CATEGORY_LABEL: &str = "general";
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
const NO_REASONING: &str = "No reasoning provided";
const LLM_FAILURE_REASON: &str = "LLM unavailable or error";

/// Loosely typed fields read from the model reply, before category validation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedClassification {
    pub category: String,
    pub confidence: f32,
    pub reasoning: String,
    pub escalate: bool,
    pub escalation_reason: Option<String>,
}

impl ParsedClassification {
    fn fallback(reasoning: String) -> Self {
        Self {
            category: DEFAULT_CATEGORY_LABEL.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            reasoning,
            escalate: false,
            escalation_reason: None,
        }
    }
}

pub struct Classifier {
    completion: Arc<dyn CompletionService>,
    catalog: Arc<CategoryCatalog>,
    confidence_threshold: f32,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("categories", &self.catalog.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    #[inline]
    pub fn new(
        completion: Arc<dyn CompletionService>,
        catalog: Arc<CategoryCatalog>,
        config: &ClassifierConfig,
    ) -> Self {
        Self {
            completion,
            catalog,
            confidence_threshold: config.confidence_threshold,
        }
    }

    #[inline]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Classify `message`. Never fails: service errors and unusable replies map to a safe default.
    #[inline]
    pub fn classify(&self, message: &str) -> ClassificationOutcome {
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: self.create_classification_prompt(message),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let reply = match self.completion.complete(&request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Classification error: {}", e);
                return service_failure(&e);
            }
        };

        let mut parsed = parse_classification(&reply);
        if parsed.confidence < self.confidence_threshold {
            parsed.escalate = true;
            parsed.escalation_reason = Some(format!(
                "Low classification confidence ({:.2}) - manual review required",
                parsed.confidence
            ));
        }

        match parsed.category.parse::<Category>() {
            Ok(category) => {
                debug!(
                    "Classified request as {} (confidence {:.2}, escalate {})",
                    category, parsed.confidence, parsed.escalate
                );
                ClassificationOutcome {
                    category,
                    reasoning: parsed.reasoning,
                    escalate: parsed.escalate,
                    escalate_reason: parsed.escalation_reason,
                }
            }
            Err(e) => {
                warn!("Classification reply used an unknown category: {}", e);
                service_failure(&e)
            }
        }
    }

    /// Prompt listing every category with its description and escalation triggers
    #[inline]
    pub fn create_classification_prompt(&self, message: &str) -> String {
        let mut categories = String::new();
        for category in Category::ALL {
            let _ = write!(categories, "- {}", category);
            if let Some(info) = self.catalog.get(category) {
                let _ = write!(categories, ": {}", info.description);
                if !info.escalation_triggers.is_empty() {
                    let _ = write!(
                        categories,
                        " (Escalation triggers: {})",
                        info.escalation_triggers.join(", ")
                    );
                }
            }
            categories.push('\n');
        }

        format!(
            r#"Please classify the following IT help desk request into one of these categories:

{categories}
User Request: "{message}"

Please respond in the following JSON format:
{{
    "category": "category_name",
    "confidence": 0.95,
    "reasoning": "Brief explanation of why this category was chosen",
    "escalate": true/false,
    "escalation_reason": "If escalation is needed, explain why; otherwise null or empty"
}}

Only use the exact category names listed above. Confidence should be between 0.0 and 1.0."#
        )
    }
}

fn service_failure(error: &dyn std::fmt::Display) -> ClassificationOutcome {
    ClassificationOutcome {
        category: Category::PolicyQuestion,
        reasoning: format!("LLM error: {}", error),
        escalate: false,
        escalate_reason: Some(LLM_FAILURE_REASON.to_string()),
    }
}

/// Read the classification fields out of free-form model output.
///
/// Uses the first balanced `{...}` span. A missing span or invalid JSON
/// yields the defaults: category `general`, confidence 0.5, no escalation.
#[inline]
pub fn parse_classification(reply: &str) -> ParsedClassification {
    let Some(span) = extract_json_span(reply) else {
        return ParsedClassification::fallback(
            "Error parsing response: No JSON found in response".to_string(),
        );
    };

    let data: Value = match serde_json::from_str(span) {
        Ok(data @ Value::Object(_)) => data,
        Ok(_) => {
            return ParsedClassification::fallback(
                "Error parsing response: JSON is not an object".to_string(),
            );
        }
        Err(e) => {
            return ParsedClassification::fallback(format!("Error parsing response: {}", e));
        }
    };

    let confidence = match data.get("confidence") {
        None | Some(Value::Null) => Some(f64::from(DEFAULT_CONFIDENCE)),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let Some(confidence) = confidence.filter(|c| c.is_finite()) else {
        return ParsedClassification::fallback(
            "Error parsing response: confidence is not a number".to_string(),
        );
    };

    let Some(escalate) = data.get("escalate").map_or(Some(false), coerce_bool) else {
        return ParsedClassification::fallback(
            "Error parsing response: escalate is not a boolean".to_string(),
        );
    };

    ParsedClassification {
        category: data
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CATEGORY_LABEL)
            .trim()
            .to_string(),
        confidence: confidence as f32,
        reasoning: data
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or(NO_REASONING)
            .to_string(),
        escalate,
        escalation_reason: data
            .get("escalation_reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string),
    }
}

/// Booleans may arrive as JSON bools, 0/1, or words like "true", "yes", "off"
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Null => Some(false),
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// First balanced `{...}` span in `text`, skipping braces inside JSON strings
#[inline]
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.get(start..)?.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return text.get(start..=start + offset);
                }
            }
            _ => {}
        }
    }

    None
}
