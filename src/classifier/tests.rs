use super::*;
use crate::knowledge::CategoryInfo;
use crate::llm::fakes::ScriptedCompletion;

fn catalog() -> Arc<CategoryCatalog> {
    let mut catalog = CategoryCatalog::default();
    catalog.insert(
        Category::PasswordReset,
        CategoryInfo {
            description: "Password resets and account lockouts".to_string(),
            escalation_triggers: Vec::new(),
            typical_resolution_time: Some("5 minutes".to_string()),
        },
    );
    catalog.insert(
        Category::SecurityIncident,
        CategoryInfo {
            description: "Suspected breaches, malware or phishing".to_string(),
            escalation_triggers: vec!["malware".to_string(), "data breach".to_string()],
            typical_resolution_time: None,
        },
    );
    Arc::new(catalog)
}

fn classifier(completion: Arc<ScriptedCompletion>) -> Classifier {
    Classifier::new(completion, catalog(), &ClassifierConfig::default())
}

#[test]
fn prompt_lists_every_category_and_the_request() {
    let classifier = classifier(Arc::new(ScriptedCompletion::new([])));
    let prompt = classifier.create_classification_prompt("I forgot my password");

    assert!(prompt.contains("- password_reset: Password resets and account lockouts\n"));
    assert!(prompt.contains(
        "- security_incident: Suspected breaches, malware or phishing (Escalation triggers: malware, data breach)\n"
    ));
    assert!(prompt.contains("- hardware_failure\n"));
    for category in Category::ALL {
        assert!(prompt.contains(category.as_str()));
    }
    assert!(prompt.contains("User Request: \"I forgot my password\""));
    assert!(prompt.ends_with("Confidence should be between 0.0 and 1.0."));
}

#[test]
fn confident_reply_is_used_as_is() {
    let completion = Arc::new(ScriptedCompletion::replying(
        r#"Sure! Here is the classification:
{"category": "password_reset", "confidence": 0.95, "reasoning": "User cannot log in", "escalate": false, "escalation_reason": null}
Let me know if you need anything else."#,
    ));
    let outcome = classifier(completion.clone()).classify("I forgot my password");

    assert_eq!(
        outcome,
        ClassificationOutcome {
            category: Category::PasswordReset,
            reasoning: "User cannot log in".to_string(),
            escalate: false,
            escalate_reason: None,
        }
    );

    let requests = completion.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system, SYSTEM_PROMPT);
    assert_eq!(requests[0].max_tokens, 300);
    assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
}

#[test]
fn model_requested_escalation_is_kept() {
    let completion = Arc::new(ScriptedCompletion::replying(
        r#"{"category": "security_incident", "confidence": 0.9, "reasoning": "Phishing", "escalate": true, "escalation_reason": "Possible credential theft"}"#,
    ));
    let outcome = classifier(completion).classify("I clicked a weird link");

    assert_eq!(outcome.category, Category::SecurityIncident);
    assert!(outcome.escalate);
    assert_eq!(
        outcome.escalate_reason.as_deref(),
        Some("Possible credential theft")
    );
}

#[test]
fn low_confidence_always_escalates() {
    let completion = Arc::new(ScriptedCompletion::replying(
        r#"{"category": "hardware_failure", "confidence": 0.42, "reasoning": "Maybe a laptop issue", "escalate": false}"#,
    ));
    let outcome = classifier(completion).classify("My thing is broken");

    assert_eq!(outcome.category, Category::HardwareFailure);
    assert!(outcome.escalate);
    assert_eq!(
        outcome.escalate_reason.as_deref(),
        Some("Low classification confidence (0.42) - manual review required")
    );
}

#[test]
fn confidence_at_threshold_is_not_forced() {
    let completion = Arc::new(ScriptedCompletion::replying(
        r#"{"category": "network_connectivity", "confidence": 0.8, "reasoning": "Wifi", "escalate": false}"#,
    ));
    let outcome = classifier(completion).classify("Wifi keeps dropping");

    assert_eq!(outcome.category, Category::NetworkConnectivity);
    assert!(!outcome.escalate);
}

#[test]
fn nonsense_reply_falls_back_without_escalation() {
    let parsed = parse_classification("nonsense");
    assert_eq!(parsed.category, DEFAULT_CATEGORY_LABEL);
    assert!((parsed.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
    assert!(!parsed.escalate);

    let completion = Arc::new(ScriptedCompletion::replying("nonsense"));
    let outcome = classifier(completion).classify("help");

    assert_eq!(outcome.category, Category::PolicyQuestion);
    assert!(!outcome.escalate);
    assert!(outcome.reasoning.starts_with("LLM error:"));
}

#[test]
fn unknown_category_fails_closed() {
    let completion = Arc::new(ScriptedCompletion::replying(
        r#"{"category": "printer_jam", "confidence": 0.99, "reasoning": "Printer", "escalate": true}"#,
    ));
    let outcome = classifier(completion).classify("The printer is jammed");

    assert_eq!(outcome.category, Category::PolicyQuestion);
    assert!(!outcome.escalate);
    assert!(outcome.reasoning.contains("printer_jam"));
}

#[test]
fn service_failure_returns_safe_default() {
    let completion = Arc::new(ScriptedCompletion::failing());
    let outcome = classifier(completion).classify("My laptop will not boot");

    assert_eq!(outcome.category, Category::PolicyQuestion);
    assert!(!outcome.escalate);
    assert_eq!(
        outcome.reasoning,
        "LLM error: Completion service error: connection timed out"
    );
    assert_eq!(
        outcome.escalate_reason.as_deref(),
        Some("LLM unavailable or error")
    );
}

#[test]
fn parse_defaults_missing_fields() {
    let parsed = parse_classification(r#"{"category": "email_configuration"}"#);
    assert_eq!(parsed.category, "email_configuration");
    assert!((parsed.confidence - 0.5).abs() < f32::EPSILON);
    assert_eq!(parsed.reasoning, "No reasoning provided");
    assert!(!parsed.escalate);
    assert_eq!(parsed.escalation_reason, None);
}

#[test]
fn parse_accepts_string_confidence_and_ignores_blank_reason() {
    let parsed = parse_classification(
        r#"{"category": "policy_question", "confidence": "0.9", "escalate": false, "escalation_reason": "  "}"#,
    );
    assert!((parsed.confidence - 0.9).abs() < 1e-6);
    assert_eq!(parsed.escalation_reason, None);
}

#[test]
fn parse_coerces_boolean_like_escalate() {
    for (raw, expected) in [
        (r#""true""#, true),
        (r#""False""#, false),
        (r#""yes""#, true),
        ("1", true),
        ("0", false),
        ("null", false),
    ] {
        let parsed = parse_classification(&format!(
            r#"{{"category": "hardware_failure", "confidence": 0.9, "escalate": {}}}"#,
            raw
        ));
        assert_eq!(parsed.category, "hardware_failure", "escalate = {}", raw);
        assert_eq!(parsed.escalate, expected, "escalate = {}", raw);
    }

    let parsed = parse_classification(
        r#"{"category": "hardware_failure", "confidence": 0.9, "escalate": "maybe"}"#,
    );
    assert_eq!(parsed.category, DEFAULT_CATEGORY_LABEL);
    assert_eq!(
        parsed.reasoning,
        "Error parsing response: escalate is not a boolean"
    );
}

#[test]
fn string_escalate_from_the_model_is_honoured() {
    let completion = Arc::new(ScriptedCompletion::replying(
        r#"{"category": "hardware_failure", "confidence": 0.95, "reasoning": "Smoke from the laptop", "escalate": "true", "escalation_reason": "Fire risk"}"#,
    ));
    let outcome = classifier(completion).classify("My laptop is smoking");

    assert_eq!(outcome.category, Category::HardwareFailure);
    assert!(outcome.escalate);
    assert_eq!(outcome.escalate_reason.as_deref(), Some("Fire risk"));
}

#[test]
fn parse_rejects_invalid_json() {
    let parsed = parse_classification(r#"{"category": "password_reset", "confidence": }"#);
    assert_eq!(parsed.category, DEFAULT_CATEGORY_LABEL);
    assert!(parsed.reasoning.starts_with("Error parsing response:"));

    let parsed = parse_classification(r#"{"category": "password_reset", "confidence": [1]}"#);
    assert_eq!(parsed.category, DEFAULT_CATEGORY_LABEL);
}

#[test]
fn json_span_is_the_first_balanced_object() {
    assert_eq!(extract_json_span("no braces"), None);
    assert_eq!(extract_json_span("open { never closed"), None);
    assert_eq!(extract_json_span("a {\"x\": 1} b {\"y\": 2}"), Some("{\"x\": 1}"));
    assert_eq!(
        extract_json_span("pre {\"a\": {\"b\": [1, {}]}} post"),
        Some("{\"a\": {\"b\": [1, {}]}}")
    );
    assert_eq!(
        extract_json_span(r#"{"reasoning": "uses } and { and \" inside"} tail"#),
        Some(r#"{"reasoning": "uses } and { and \" inside"}"#)
    );
    assert_eq!(extract_json_span("émoji ✓ {\"k\": \"v\"}"), Some("{\"k\": \"v\"}"));
}
