//! Unit templates and the template registry.
//!
//! A template is everything the spawner needs to create a unit: its cost,
//! its per-template spawn cooldown and the stats the unit starts with.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::UnitStats;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for unit templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

/// Spawnable unit definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Unique template ID.
    pub id: TemplateId,
    /// Stable string key used by data files and external callers.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Money deducted on a successful spawn.
    pub cost: i32,
    /// Minimum simulated seconds between two spawns of this template.
    #[serde(with = "fixed_serde")]
    pub spawn_cooldown: Fixed,
    /// Stats every unit of this template starts with.
    pub stats: UnitStats,
}

/// Registry of all unit templates available in a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, UnitTemplate>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of templates.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate id or key.
    pub fn from_templates(templates: impl IntoIterator<Item = UnitTemplate>) -> Result<Self> {
        let mut registry = Self::new();
        for template in templates {
            registry.register(template)?;
        }
        Ok(registry)
    }

    /// Register a template.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the id or key is taken.
    pub fn register(&mut self, template: UnitTemplate) -> Result<()> {
        if self.templates.contains_key(&template.id) {
            return Err(GameError::InvalidConfig(format!(
                "duplicate template id {}",
                template.id.0
            )));
        }
        if self.find_by_key(&template.key).is_some() {
            return Err(GameError::InvalidConfig(format!(
                "duplicate template key '{}'",
                template.key
            )));
        }
        self.templates.insert(template.id, template);
        Ok(())
    }

    /// Get a template by ID.
    #[must_use]
    pub fn get(&self, id: TemplateId) -> Option<&UnitTemplate> {
        self.templates.get(&id)
    }

    /// Get a template by ID, failing for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`].
    pub fn require(&self, id: TemplateId) -> Result<&UnitTemplate> {
        self.get(id)
            .ok_or_else(|| GameError::UnknownTemplate(format!("#{}", id.0)))
    }

    /// Look a template up by its string key.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<&UnitTemplate> {
        self.templates.values().find(|template| template.key == key)
    }

    /// All templates ordered by id.
    #[must_use]
    pub fn sorted(&self) -> Vec<&UnitTemplate> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_unstable_by_key(|template| template.id);
        all
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
