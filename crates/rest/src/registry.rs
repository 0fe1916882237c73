//! Resource-capability registry.
//!
//! The registry maps a resource type name to the interactions the server
//! declares for it and to the handler that serves it. It is assembled once at
//! startup through [`RegistryBuilder`] and is read-only afterwards, so it can
//! be shared between request tasks behind an `Arc` without locking.
//!
//! # Example
//!
//! ```rust
//! use fhird_rest::registry::{Interaction, ResourceRegistry};
//!
//! let registry = ResourceRegistry::us_core();
//! assert!(registry.validate("Patient"));
//! assert!(!registry.validate("Unknown"));
//!
//! let patient = registry.lookup("Patient").unwrap();
//! assert!(patient.supports(Interaction::Read));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::response::Response;
use serde::Serialize;

use crate::error::{ConfigError, RestError, RestResult};
use crate::fhir_types::US_CORE_RESOURCE_TYPES;
use crate::handlers::PlaceholderHandler;
use crate::middleware::RequestContext;

/// A RESTful interaction a server may support on a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    /// `GET [base]/[type]/[id]`
    Read,
    /// `GET [base]/[type]/[id]/_history/[vid]`
    Vread,
    /// `PUT [base]/[type]/[id]`
    Update,
    /// `DELETE [base]/[type]/[id]`
    Delete,
    /// `POST [base]/[type]`
    Create,
}

impl Interaction {
    /// Interactions declared for every US Core resource type by default.
    pub const DECLARED_BY_DEFAULT: [Interaction; 4] = [
        Interaction::Read,
        Interaction::Vread,
        Interaction::Update,
        Interaction::Delete,
    ];

    /// Returns the FHIR interaction code.
    pub fn code(&self) -> &'static str {
        match self {
            Interaction::Read => "read",
            Interaction::Vread => "vread",
            Interaction::Update => "update",
            Interaction::Delete => "delete",
            Interaction::Create => "create",
        }
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What a routed request asks of a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAction {
    /// `GET [base]/[type]`, always available for a registered type.
    SearchType,
    /// Read the current version of an instance.
    Read {
        /// Logical id.
        id: String,
    },
    /// Read a specific version of an instance.
    Vread {
        /// Logical id.
        id: String,
        /// Version id.
        version_id: String,
    },
    /// Replace an instance.
    Update {
        /// Logical id.
        id: String,
    },
    /// Delete an instance.
    Delete {
        /// Logical id.
        id: String,
    },
    /// Create a new instance.
    Create,
}

impl ResourceAction {
    /// Returns the interaction this action requires, if any.
    ///
    /// Type-level search is not gated by the declared interaction set.
    pub fn interaction(&self) -> Option<Interaction> {
        match self {
            ResourceAction::SearchType => None,
            ResourceAction::Read { .. } => Some(Interaction::Read),
            ResourceAction::Vread { .. } => Some(Interaction::Vread),
            ResourceAction::Update { .. } => Some(Interaction::Update),
            ResourceAction::Delete { .. } => Some(Interaction::Delete),
            ResourceAction::Create => Some(Interaction::Create),
        }
    }

    /// Returns the code used in logs and placeholder bodies.
    pub fn code(&self) -> &'static str {
        match self.interaction() {
            Some(interaction) => interaction.code(),
            None => "search-type",
        }
    }
}

/// A validated request handed to a resource handler.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    /// The registered resource type.
    pub resource_type: String,
    /// The requested action.
    pub action: ResourceAction,
    /// Per-request context built by the pipeline.
    pub context: RequestContext,
    /// Raw request body (empty for reads).
    pub body: Bytes,
}

/// Serves requests for one resource type.
///
/// Handlers are invoked inside the timeout guard. When the deadline passes,
/// the handler future is dropped; handlers that call out to storage must not
/// rely on running to completion.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Handles a validated request.
    async fn handle(&self, request: ResourceRequest) -> RestResult<Response>;
}

/// A registered resource type.
#[derive(Clone)]
pub struct ResourceRegistryEntry {
    name: String,
    interactions: BTreeSet<Interaction>,
    handler: Arc<dyn ResourceHandler>,
}

impl ResourceRegistryEntry {
    /// Returns the resource type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared interactions in a stable order.
    pub fn interactions(&self) -> impl Iterator<Item = Interaction> + '_ {
        self.interactions.iter().copied()
    }

    /// Checks whether the interaction is declared for this resource type.
    pub fn supports(&self, interaction: Interaction) -> bool {
        self.interactions.contains(&interaction)
    }

    /// Returns the handler for this resource type.
    pub fn handler(&self) -> &Arc<dyn ResourceHandler> {
        &self.handler
    }
}

impl fmt::Debug for ResourceRegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistryEntry")
            .field("name", &self.name)
            .field("interactions", &self.interactions)
            .finish_non_exhaustive()
    }
}

/// Immutable map from resource type name to its registry entry.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    entries: BTreeMap<String, ResourceRegistryEntry>,
}

impl ResourceRegistry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Creates the default registry: every US Core resource type, declaring
    /// read, vread, update and delete, served by placeholder handlers.
    pub fn us_core() -> Self {
        let handler: Arc<dyn ResourceHandler> = Arc::new(PlaceholderHandler);
        let entries = US_CORE_RESOURCE_TYPES
            .iter()
            .map(|name| {
                let entry = ResourceRegistryEntry {
                    name: (*name).to_string(),
                    interactions: Interaction::DECLARED_BY_DEFAULT.into_iter().collect(),
                    handler: Arc::clone(&handler),
                };
                ((*name).to_string(), entry)
            })
            .collect();
        Self { entries }
    }

    /// Looks up a resource type by exact, case-sensitive name.
    pub fn lookup(&self, resource_type: &str) -> RestResult<&ResourceRegistryEntry> {
        self.entries
            .get(resource_type)
            .ok_or_else(|| RestError::UnknownResource {
                resource_type: resource_type.to_string(),
            })
    }

    /// Checks whether a resource type is registered.
    pub fn validate(&self, resource_type: &str) -> bool {
        self.entries.contains_key(resource_type)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &ResourceRegistryEntry> {
        self.entries.values()
    }

    /// Returns the number of registered resource types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no resource type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::us_core()
    }
}

/// Collects registrations and validates them into a [`ResourceRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, ResourceRegistryEntry>,
    errors: Vec<ConfigError>,
}

impl RegistryBuilder {
    /// Registers a resource type with its declared interactions and handler.
    pub fn register<I>(
        mut self,
        name: impl Into<String>,
        interactions: I,
        handler: Arc<dyn ResourceHandler>,
    ) -> Self
    where
        I: IntoIterator<Item = Interaction>,
    {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            self.errors.push(ConfigError::InvalidResourceName(name));
            return self;
        }
        if self.entries.contains_key(&name) {
            self.errors.push(ConfigError::DuplicateResource(name));
            return self;
        }

        let entry = ResourceRegistryEntry {
            name: name.clone(),
            interactions: interactions.into_iter().collect(),
            handler,
        };
        self.entries.insert(name, entry);
        self
    }

    /// Registers every US Core resource type with the default interactions
    /// and the placeholder handler.
    pub fn register_us_core(mut self) -> Self {
        let handler: Arc<dyn ResourceHandler> = Arc::new(PlaceholderHandler);
        for name in US_CORE_RESOURCE_TYPES {
            self = self.register(
                *name,
                Interaction::DECLARED_BY_DEFAULT,
                Arc::clone(&handler),
            );
        }
        self
    }

    /// Finishes the registry, failing on the first invalid registration.
    pub fn build(mut self) -> Result<ResourceRegistry, ConfigError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        Ok(ResourceRegistry {
            entries: self.entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_core_registry() {
        let registry = ResourceRegistry::us_core();
        assert_eq!(registry.len(), US_CORE_RESOURCE_TYPES.len());
        for name in US_CORE_RESOURCE_TYPES {
            assert!(registry.validate(name), "{name} should be registered");
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = ResourceRegistry::us_core();
        assert!(registry.lookup("Patient").is_ok());

        let err = registry.lookup("patient").unwrap_err();
        assert_eq!(
            err,
            RestError::UnknownResource {
                resource_type: "patient".to_string()
            }
        );
    }

    #[test]
    fn test_default_interactions() {
        let registry = ResourceRegistry::us_core();
        let patient = registry.lookup("Patient").unwrap();
        let declared: Vec<_> = patient.interactions().collect();
        assert_eq!(
            declared,
            vec![
                Interaction::Read,
                Interaction::Vread,
                Interaction::Update,
                Interaction::Delete
            ]
        );
        assert!(!patient.supports(Interaction::Create));
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = ResourceRegistry::us_core();
        let names: Vec<_> = registry.names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let handler: Arc<dyn ResourceHandler> = Arc::new(PlaceholderHandler);
        let result = ResourceRegistry::builder()
            .register("Patient", [Interaction::Read], Arc::clone(&handler))
            .register("Patient", [Interaction::Delete], handler)
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateResource(name)) if name == "Patient"));
    }

    #[test]
    fn test_builder_rejects_invalid_names() {
        let handler: Arc<dyn ResourceHandler> = Arc::new(PlaceholderHandler);
        let result = ResourceRegistry::builder()
            .register("Patient/123", [Interaction::Read], handler)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidResourceName(_))));
    }

    #[test]
    fn test_builder_us_core_matches_default() {
        let built = ResourceRegistry::builder()
            .register_us_core()
            .build()
            .unwrap();
        let default = ResourceRegistry::us_core();
        assert!(built.names().eq(default.names()));
    }

    #[test]
    fn test_action_interactions() {
        assert_eq!(ResourceAction::SearchType.interaction(), None);
        assert_eq!(ResourceAction::SearchType.code(), "search-type");
        assert_eq!(
            ResourceAction::Vread {
                id: "1".into(),
                version_id: "2".into()
            }
            .interaction(),
            Some(Interaction::Vread)
        );
        assert_eq!(ResourceAction::Create.code(), "create");
    }

    #[test]
    fn test_interaction_serializes_as_code() {
        let json = serde_json::to_value(Interaction::Vread).unwrap();
        assert_eq!(json, "vread");
    }
}
