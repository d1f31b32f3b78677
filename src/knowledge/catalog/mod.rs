#[cfg(test)]
mod tests;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::models::Category;
use crate::{DeskError, Result};

/// Description of one request category from `categories.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryInfo {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub escalation_triggers: Vec<String>,
    #[serde(default)]
    pub typical_resolution_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoriesFile {
    categories: BTreeMap<String, CategoryInfo>,
}

/// Category definitions used to enrich classification and response prompts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCatalog {
    entries: BTreeMap<Category, CategoryInfo>,
}

impl CategoryCatalog {
    #[inline]
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CategoriesFile = serde_json::from_str(json)?;

        let mut entries = BTreeMap::new();
        for (name, info) in file.categories {
            match name.parse::<Category>() {
                Ok(category) => {
                    entries.insert(category, info);
                }
                Err(_) => warn!("Ignoring unknown category '{}' in category catalog", name),
            }
        }

        Ok(Self { entries })
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            DeskError::Config(format!(
                "Failed to read category catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_json(&json)?;
        debug!(
            "Loaded {} category definitions from {}",
            catalog.entries.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Load the catalog, or fall back to an empty one so prompts degrade to placeholders
    #[inline]
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Category catalog unavailable, continuing without it: {}", e);
            Self::default()
        })
    }

    #[inline]
    pub fn insert(&mut self, category: Category, info: CategoryInfo) {
        self.entries.insert(category, info);
    }

    #[inline]
    pub fn get(&self, category: Category) -> Option<&CategoryInfo> {
        self.entries.get(&category)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
