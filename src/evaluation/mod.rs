//! Replays scripted requests from `test_requests.json` through the pipeline
//! and scores classification, escalation and response content.


use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::desk::HelpDesk;
use crate::models::{HelpDeskRequest, HelpDeskResponse, TestResult};
use crate::{DeskError, Result};

/// One scripted request with its expected outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub request: String,
    pub expected_classification: String,
    #[serde(default)]
    pub expected_elements: Vec<String>,
    #[serde(default)]
    pub escalate: bool,
}

#[derive(Debug, Deserialize)]
struct TestCaseFile {
    test_requests: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub correct_classifications: usize,
    pub correct_escalations: usize,
    pub average_quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub results: Vec<TestResult>,
    pub summary: EvaluationSummary,
}

#[inline]
pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let json = fs::read_to_string(path).map_err(|e| {
        DeskError::Config(format!(
            "Failed to read test requests {}: {}",
            path.display(),
            e
        ))
    })?;
    let file: TestCaseFile = serde_json::from_str(&json)?;
    debug!("Loaded {} test requests from {}", file.test_requests.len(), path.display());
    Ok(file.test_requests)
}

/// Compare one pipeline response against its expectations.
///
/// Expected elements match case-insensitively anywhere in the response text.
#[inline]
pub fn score_response(case: &TestCase, response: &HelpDeskResponse) -> TestResult {
    let predicted = response.classification.category.as_str();
    let message = response.response_message.to_lowercase();

    let found_elements: Vec<String> = case
        .expected_elements
        .iter()
        .filter(|element| message.contains(&element.to_lowercase()))
        .cloned()
        .collect();

    let response_quality_score = if case.expected_elements.is_empty() {
        1.0
    } else {
        found_elements.len() as f32 / case.expected_elements.len() as f32
    };

    TestResult {
        test_id: case.id.clone(),
        expected_category: case.expected_classification.clone(),
        predicted_category: predicted.to_string(),
        correct_classification: predicted == case.expected_classification.trim(),
        expected_elements: case.expected_elements.clone(),
        found_elements,
        escalation_correct: response.classification.escalate == case.escalate,
        response_quality_score,
    }
}

#[inline]
pub fn summarize(results: &[TestResult]) -> EvaluationSummary {
    let total = results.len();
    let average_quality = if total == 0 {
        0.0
    } else {
        results
            .iter()
            .map(|result| result.response_quality_score)
            .sum::<f32>()
            / total as f32
    };

    EvaluationSummary {
        total,
        correct_classifications: results.iter().filter(|r| r.correct_classification).count(),
        correct_escalations: results.iter().filter(|r| r.escalation_correct).count(),
        average_quality,
    }
}

/// Run every case through `desk`, one at a time
#[inline]
pub async fn run_evaluation(desk: &HelpDesk, cases: &[TestCase]) -> EvaluationReport {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        let response = desk
            .process_request(HelpDeskRequest {
                request_id: Some(case.id.clone()),
                ..HelpDeskRequest::new(case.request.as_str())
            })
            .await;
        let result = score_response(case, &response);
        info!(
            "{}: expected {}, predicted {}, quality {:.2}",
            result.test_id,
            result.expected_category,
            result.predicted_category,
            result.response_quality_score
        );
        results.push(result);
    }

    let summary = summarize(&results);
    EvaluationReport { results, summary }
}
