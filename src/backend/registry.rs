//! Registry mapping backend names to their implementations

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::github::GithubServer;
use crate::backend::slack::SlackServer;
use crate::backend::traits::ContextServer;
use crate::config::Settings;
use crate::error::Result;

/// Name-keyed table of context backends.
///
/// Passed around behind an `Arc` rather than living in a global, so tests can
/// build isolated registries. Writes take the lock, so registering after
/// startup is safe.
#[derive(Default)]
pub struct ServerRegistry {
    servers: RwLock<HashMap<String, Arc<dyn ContextServer>>>,
}

impl ServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in Slack and GitHub backends
    pub fn with_builtin(settings: &Settings) -> Result<Self> {
        let registry = Self::new();
        registry.register(Arc::new(SlackServer::new(&settings.slack, &settings.receive)?));
        registry.register(Arc::new(GithubServer::new(&settings.github, &settings.receive)?));
        info!(servers = ?registry.names(), "Registered built-in backends");
        Ok(registry)
    }

    /// Register a backend under its own name, replacing any previous entry
    pub fn register(&self, server: Arc<dyn ContextServer>) {
        let name = server.name().to_string();
        let replaced = self.servers.write().insert(name.clone(), server).is_some();
        debug!(server = %name, replaced, "Registered backend");
    }

    /// Look up a backend by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ContextServer>> {
        self.servers.read().get(name).cloned()
    }

    /// Names of all registered backends, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.servers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }
}
