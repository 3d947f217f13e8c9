//! Single dispatch point from a backend name to a ready backend

use std::sync::Arc;
use tracing::debug;

use crate::backend::registry::ServerRegistry;
use crate::backend::traits::{ConnectConfig, ContextServer};
use crate::error::{AppError, Result};

/// Resolves backends by name and connects them for a front-end request
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ServerRegistry>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(registry: Arc<ServerRegistry>) -> Self {
        Self { registry }
    }

    /// Look up a backend, failing with `UnknownServer` when it is not registered
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ContextServer>> {
        let server = self
            .registry
            .get(name)
            .ok_or_else(|| AppError::UnknownServer(name.to_string()))?;

        debug!(server = %name, "Resolved backend");
        Ok(server)
    }

    /// Connect with an empty configuration, so credentials come from the environment
    pub async fn connect(&self, server: &Arc<dyn ContextServer>) -> Result<()> {
        server.connect(&ConnectConfig::new()).await
    }

    /// Names of all registered backends
    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }
}
