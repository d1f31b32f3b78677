use super::*;
use tempfile::TempDir;

const CATEGORIES_JSON: &str = r#"{
    "categories": {
        "password_reset": {
            "description": "Password resets and account lockouts",
            "escalation_triggers": ["account locked after 5 attempts"],
            "typical_resolution_time": "5 minutes"
        },
        "security_incident": {
            "description": "Suspected phishing, malware or data exposure",
            "escalation_triggers": ["malware detected", "data breach"],
            "typical_resolution_time": "Immediate"
        },
        "printer_problems": {
            "description": "Not one of the routed categories"
        }
    }
}"#;

#[test]
fn parses_known_categories_and_skips_unknown() {
    let catalog = CategoryCatalog::from_json(CATEGORIES_JSON).expect("catalog should parse");

    assert_eq!(catalog.len(), 2);
    let security = catalog
        .get(Category::SecurityIncident)
        .expect("security entry should exist");
    assert_eq!(security.escalation_triggers.len(), 2);
    assert_eq!(security.typical_resolution_time.as_deref(), Some("Immediate"));
    assert!(catalog.get(Category::HardwareFailure).is_none());
}

#[test]
fn missing_fields_default() {
    let catalog = CategoryCatalog::from_json(
        r#"{"categories": {"policy_question": {"description": "Policies"}}}"#,
    )
    .expect("catalog should parse");

    let info = catalog
        .get(Category::PolicyQuestion)
        .expect("policy entry should exist");
    assert!(info.escalation_triggers.is_empty());
    assert_eq!(info.typical_resolution_time, None);
}

#[test]
fn load_or_empty_tolerates_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = CategoryCatalog::load_or_empty(&temp_dir.path().join("categories.json"));
    assert!(catalog.is_empty());
}

#[test]
fn load_reads_file_from_disk() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("categories.json");
    fs::write(&path, CATEGORIES_JSON).expect("should write catalog");

    let catalog = CategoryCatalog::load(&path).expect("catalog should load");
    assert_eq!(catalog.len(), 2);

    fs::write(&path, "{ not json").expect("should overwrite catalog");
    assert!(CategoryCatalog::load(&path).is_err());
}
