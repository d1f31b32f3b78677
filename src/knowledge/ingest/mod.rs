//! Document ingestion
//!
//! Flattens the help desk source documents into [`KnowledgeRecord`]s:
//! one record per markdown bullet, per troubleshooting step group or
//! escalation trigger, and per installation step group or known issue.


use fancy_regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{Category, KnowledgeRecord, RecordCategory};
use crate::{DeskError, Result};

pub const KNOWLEDGE_BASE_SOURCE: &str = "Knowledge Base";
pub const POLICIES_SOURCE: &str = "Company Policies";

static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s+").expect("valid regex"));

/// Heading keywords in priority order; the first substring hit decides the category
const HEADING_CATEGORY_RULES: [(&str, Category); 7] = [
    ("password", Category::PasswordReset),
    ("software", Category::SoftwareInstallation),
    ("hardware", Category::HardwareFailure),
    ("network", Category::NetworkConnectivity),
    ("email", Category::EmailConfiguration),
    ("security", Category::SecurityIncident),
    ("policy", Category::PolicyQuestion),
];

/// Infer a record category from a section heading
#[inline]
pub fn category_from_heading(heading: &str) -> RecordCategory {
    let heading = heading.to_lowercase();
    HEADING_CATEGORY_RULES
        .iter()
        .find(|(keyword, _)| heading.contains(keyword))
        .map_or(RecordCategory::General, |&(_, category)| {
            RecordCategory::Request(category)
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TroubleshootingEntry {
    pub category: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub escalation_trigger: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KnownIssue {
    pub issue: String,
    pub solution: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstallationGuide {
    pub title: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub common_issues: Vec<KnownIssue>,
}

#[derive(Debug, Deserialize)]
struct TroubleshootingFile {
    troubleshooting_steps: BTreeMap<String, TroubleshootingEntry>,
}

#[derive(Debug, Deserialize)]
struct InstallationGuidesFile {
    software_guides: BTreeMap<String, InstallationGuide>,
}

/// Raw contents of every knowledge source, read once at ingestion time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocuments {
    pub knowledge_base_md: String,
    pub policies_md: String,
    pub troubleshooting: BTreeMap<String, TroubleshootingEntry>,
    pub installation_guides: BTreeMap<String, InstallationGuide>,
}

impl SourceDocuments {
    #[inline]
    pub fn load(config: &Config) -> Result<Self> {
        let troubleshooting: TroubleshootingFile =
            serde_json::from_str(&read_source(&config.troubleshooting_path())?)?;
        let guides: InstallationGuidesFile =
            serde_json::from_str(&read_source(&config.installation_guides_path())?)?;

        Ok(Self {
            knowledge_base_md: read_source(&config.knowledge_base_path())?,
            policies_md: read_source(&config.policies_path())?,
            troubleshooting: troubleshooting.troubleshooting_steps,
            installation_guides: guides.software_guides,
        })
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        DeskError::Ingest(format!(
            "Failed to read source document {}: {}",
            path.display(),
            e
        ))
    })
}

/// Flatten all sources into records, in a fixed source order
#[inline]
pub fn ingest(sources: &SourceDocuments) -> Result<Vec<KnowledgeRecord>> {
    let mut records = markdown_records(&sources.knowledge_base_md, KNOWLEDGE_BASE_SOURCE)?;
    records.extend(markdown_records(&sources.policies_md, POLICIES_SOURCE)?);
    records.extend(troubleshooting_records(&sources.troubleshooting));
    records.extend(installation_records(&sources.installation_guides));

    info!("Ingested {} knowledge records", records.len());
    Ok(records)
}

/// One record per non-empty `-` bullet under each `## ` section.
///
/// Text before the first heading is never ingested.
#[inline]
pub fn markdown_records(content: &str, source_prefix: &str) -> Result<Vec<KnowledgeRecord>> {
    let mut bounds = Vec::new();
    for heading in SECTION_HEADING.find_iter(content) {
        let heading = heading
            .map_err(|e| DeskError::Ingest(format!("Failed to scan section headings: {}", e)))?;
        bounds.push((heading.start(), heading.end()));
    }

    let mut records = Vec::new();
    for (position, &(_, body_start)) in bounds.iter().enumerate() {
        let body_end = bounds
            .get(position + 1)
            .map_or(content.len(), |&(next_start, _)| next_start);
        let section = content.get(body_start..body_end).unwrap_or_default().trim();

        let mut lines = section.lines();
        let title = lines.next().unwrap_or_default().trim();
        let category = category_from_heading(title);
        let source = format!("{} - {}", source_prefix, title);

        for line in lines {
            let Some(bullet) = line.trim().strip_prefix('-') else {
                continue;
            };
            let text = bullet.trim();
            if text.is_empty() {
                continue;
            }
            records.push(KnowledgeRecord::new(text, source.as_str(), category));
        }
    }

    debug!(
        "Parsed {} bullet records from {} sections of {}",
        records.len(),
        bounds.len(),
        source_prefix
    );
    Ok(records)
}

#[inline]
pub fn troubleshooting_records(
    entries: &BTreeMap<String, TroubleshootingEntry>,
) -> Vec<KnowledgeRecord> {
    let mut records = Vec::new();

    for (issue, entry) in entries {
        let category = match entry.category.parse::<Category>() {
            Ok(category) => RecordCategory::Request(category),
            Err(_) => match category_from_heading(&entry.category) {
                RecordCategory::General => category_from_heading(issue),
                inferred => inferred,
            },
        };
        let source = format!("Troubleshooting Database - {}", entry.category);

        if let Some(steps) = join_steps(&entry.steps) {
            records.push(KnowledgeRecord::new(
                format!("Troubleshooting steps for {}: {}", issue, steps),
                source.as_str(),
                category,
            ));
        }

        if let Some(trigger) = entry
            .escalation_trigger
            .as_deref()
            .map(str::trim)
            .filter(|trigger| !trigger.is_empty())
        {
            records.push(KnowledgeRecord::new(
                format!("Escalation trigger for {}: {}", issue, trigger),
                source.as_str(),
                category,
            ));
        }
    }

    records
}

#[inline]
pub fn installation_records(guides: &BTreeMap<String, InstallationGuide>) -> Vec<KnowledgeRecord> {
    let category = RecordCategory::Request(Category::SoftwareInstallation);
    let mut records = Vec::new();

    for (software, guide) in guides {
        let source = format!("Installation Guide - {}", guide.title);

        if let Some(steps) = join_steps(&guide.steps) {
            records.push(KnowledgeRecord::new(
                format!("Installation steps for {}: {}", software, steps),
                source.as_str(),
                category,
            ));
        }

        for known in &guide.common_issues {
            records.push(KnowledgeRecord::new(
                format!(
                    "Common issue with {}: {} - Solution: {}",
                    software, known.issue, known.solution
                ),
                source.as_str(),
                category,
            ));
        }
    }

    records
}

fn join_steps(steps: &[String]) -> Option<String> {
    let steps: Vec<&str> = steps
        .iter()
        .map(|step| step.trim())
        .filter(|step| !step.is_empty())
        .collect();
    (!steps.is_empty()).then(|| steps.join("; "))
}
