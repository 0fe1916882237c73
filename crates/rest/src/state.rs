//! Application state for the FHIR REST API.
//!
//! Everything here is built once before the listener accepts connections and
//! is read-only afterwards. Handlers share it through cheap `Arc` clones.

use std::sync::Arc;

use crate::capability::CachedCapabilities;
use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::registry::ResourceRegistry;

/// Shared application state for the REST API.
///
/// # Example
///
/// ```rust
/// use fhird_rest::{AppState, ResourceRegistry, ServerConfig};
///
/// let state = AppState::new(ServerConfig::default(), ResourceRegistry::us_core()).unwrap();
/// assert!(state.registry().validate("Patient"));
/// assert!(!state.capabilities().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    config: Arc<ServerConfig>,

    /// Resource types the server answers for.
    registry: Arc<ResourceRegistry>,

    /// Serialized CapabilityStatement.
    capabilities: Arc<CachedCapabilities>,
}

impl AppState {
    /// Creates the state, building and caching the capability document.
    ///
    /// Fails when the capability template cannot be loaded or does not agree
    /// with the registry.
    pub fn new(config: ServerConfig, registry: ResourceRegistry) -> Result<Self, ConfigError> {
        let capabilities = CachedCapabilities::build(&config, &registry)?;
        Ok(Self::with_capabilities(config, registry, capabilities))
    }

    /// Creates the state around an already built capability cache.
    pub fn with_capabilities(
        config: ServerConfig,
        registry: ResourceRegistry,
        capabilities: CachedCapabilities,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            capabilities: Arc::new(capabilities),
        }
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Returns the cached capability document.
    pub fn capabilities(&self) -> &CachedCapabilities {
        &self.capabilities
    }

    /// Returns the base URL for the server.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}
