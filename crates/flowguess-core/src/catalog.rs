//! Read-only view of the integrations ("pieces") a flow may reference.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A catalog-registered connector and the operations it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(alias = "pieceName")]
    pub id: String,
    #[serde(default, alias = "triggers")]
    pub trigger_ids: Vec<String>,
    #[serde(default, alias = "actions")]
    pub action_ids: Vec<String>,
}

impl Integration {
    pub fn new(
        id: impl Into<String>,
        trigger_ids: impl IntoIterator<Item = impl Into<String>>,
        action_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            trigger_ids: trigger_ids.into_iter().map(Into::into).collect(),
            action_ids: action_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn supports_action(&self, action_id: &str) -> bool {
        self.action_ids.iter().any(|a| a == action_id)
    }
}

/// A resolved (integration, operation) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub integration_id: String,
    pub action_id: String,
}

/// Catalog lookups used while synthesizing flows.
///
/// Implementations are shared across concurrent requests without locking, so
/// they must not mutate on read.
pub trait Catalog: Send + Sync {
    fn integrations(&self) -> &[Integration];

    fn find_integration(&self, id: &str) -> Option<&Integration> {
        self.integrations().iter().find(|i| i.id == id)
    }

    fn find_action(&self, integration: &Integration, action_id: &str) -> Option<ActionDescriptor> {
        integration
            .supports_action(action_id)
            .then(|| ActionDescriptor {
                integration_id: integration.id.clone(),
                action_id: action_id.to_string(),
            })
    }
}

/// In-memory catalog, optionally loaded from a JSON array of integrations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    integrations: Vec<Integration>,
}

impl StaticCatalog {
    pub fn new(integrations: Vec<Integration>) -> Self {
        Self { integrations }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse catalog JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let catalog = Self::from_json_str(&content)
            .with_context(|| format!("Invalid catalog file: {}", path.display()))?;
        debug!(
            path = %path.display(),
            integrations = catalog.integrations.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.integrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn integrations(&self) -> &[Integration] {
        &self.integrations
    }
}
