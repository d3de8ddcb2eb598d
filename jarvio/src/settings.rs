//! Dependency-injected settings and tracked metrics
//!
//! One `SettingsService` is constructed in `main` and handed to the
//! components that need configuration or counters. Each component works
//! through a named `SettingsScope`, so nothing reads or writes another
//! component's state and there is no ambient global to reach for.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct SettingsState {
    /// scope -> key -> value
    values: HashMap<String, HashMap<String, String>>,
    /// scope -> metric -> count
    metrics: HashMap<String, HashMap<String, u64>>,
}

/// Shared settings handle; clone freely
#[derive(Clone, Default)]
pub struct SettingsService {
    state: Arc<RwLock<SettingsState>>,
}

/// Accessor bound to one component's scope
#[derive(Clone)]
pub struct SettingsScope {
    name: String,
    state: Arc<RwLock<SettingsState>>,
}

impl SettingsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accessor scoped to one component
    pub fn scope(&self, name: &str) -> SettingsScope {
        SettingsScope {
            name: name.to_string(),
            state: self.state.clone(),
        }
    }

    /// Snapshot of every tracked metric across scopes
    pub async fn metrics_snapshot(&self) -> HashMap<String, HashMap<String, u64>> {
        self.state.read().await.metrics.clone()
    }
}

impl SettingsScope {
    pub async fn get(&self, key: &str) -> Option<String> {
        self.state
            .read()
            .await
            .values
            .get(&self.name)
            .and_then(|scope| scope.get(key).cloned())
    }

    pub async fn set(&self, key: &str, value: &str) {
        self.state
            .write()
            .await
            .values
            .entry(self.name.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Bump a tracked counter and return the new count
    pub async fn increment(&self, metric: &str) -> u64 {
        let mut state = self.state.write().await;
        let count = state
            .metrics
            .entry(self.name.clone())
            .or_default()
            .entry(metric.to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    pub async fn metric(&self, metric: &str) -> u64 {
        self.state
            .read()
            .await
            .metrics
            .get(&self.name)
            .and_then(|scope| scope.get(metric).copied())
            .unwrap_or(0)
    }
}
