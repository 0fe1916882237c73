//! CapabilityStatement construction.
//!
//! The capability document is built once at startup from a JSON template
//! holding the server metadata and from the [`ResourceRegistry`]. Its
//! serialized bytes are cached in [`CachedCapabilities`] and served as-is by
//! `GET /metadata` and `GET /CapabilityStatement`.
//!
//! The template is either a file named by configuration or the embedded
//! default. A template that cannot be read or parsed is a fatal
//! [`ConfigError`].
//!
//! See: <https://hl7.org/fhir/R4/capabilitystatement.html>

use std::collections::BTreeSet;
use std::path::Path;

use axum::body::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::fhir_types::FHIR_VERSION;
use crate::registry::{Interaction, ResourceRegistry};

const EMBEDDED_TEMPLATE: &str = include_str!("../templates/capability_statement.json");
const EMBEDDED_ORIGIN: &str = "<embedded>";

const STATUS_CODES: &[&str] = &["draft", "active", "retired", "unknown"];
const KIND_CODES: &[&str] = &["instance", "capability", "requirements"];

/// Software block of the CapabilityStatement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    /// Software name.
    pub name: String,
    /// Software version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Static server metadata taken from the capability template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    /// Computer-friendly name.
    pub name: String,
    /// Human-friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Why the server exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Publisher name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Copyright statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    /// Business version of the statement.
    pub version: String,
    /// FHIR version the server implements.
    pub fhir_version: String,
    /// Publication status code.
    pub status: String,
    /// Statement kind code.
    pub kind: String,
    /// Whether the server is for testing purposes.
    #[serde(default)]
    pub experimental: bool,
    /// Software description.
    pub software: Software,
}

/// Parsed capability template: metadata plus advertised formats.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityTemplate {
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(flatten)]
    metadata: ServerMetadata,
    #[serde(default)]
    format: Vec<String>,
}

impl CapabilityTemplate {
    /// Returns the template compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(EMBEDDED_ORIGIN, EMBEDDED_TEMPLATE)
    }

    /// Reads a template file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&path.display().to_string(), &raw)
    }

    /// Loads the configured template, falling back to the embedded one.
    pub fn load(config: &ServerConfig) -> Result<Self, ConfigError> {
        match &config.capability_template {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    /// Parses and validates template JSON. `origin` names the source in errors.
    pub fn from_json(origin: &str, raw: &str) -> Result<Self, ConfigError> {
        let template: Self =
            serde_json::from_str(raw).map_err(|source| ConfigError::TemplateParse {
                origin: origin.to_string(),
                source,
            })?;
        template.check(origin)?;
        Ok(template)
    }

    fn check(&self, origin: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::TemplateInvalid {
            origin: origin.to_string(),
            message,
        };

        if let Some(rt) = &self.resource_type {
            if rt != "CapabilityStatement" {
                return Err(invalid(format!(
                    "resourceType must be CapabilityStatement, got {rt}"
                )));
            }
        }
        if self.metadata.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if self.metadata.fhir_version != FHIR_VERSION {
            return Err(invalid(format!(
                "fhirVersion {} is not supported, expected {}",
                self.metadata.fhir_version, FHIR_VERSION
            )));
        }
        if !STATUS_CODES.contains(&self.metadata.status.as_str()) {
            return Err(invalid(format!("unknown status {}", self.metadata.status)));
        }
        if !KIND_CODES.contains(&self.metadata.kind.as_str()) {
            return Err(invalid(format!("unknown kind {}", self.metadata.kind)));
        }
        if self.format.is_empty() {
            return Err(invalid("format must list at least one media type".to_string()));
        }
        Ok(())
    }

    /// Returns the server metadata.
    pub fn metadata(&self) -> &ServerMetadata {
        &self.metadata
    }

    /// Returns the advertised formats in template order.
    pub fn formats(&self) -> &[String] {
        &self.format
    }
}

/// One `rest` block of the CapabilityStatement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestEntry {
    /// Always `server`.
    pub mode: &'static str,
    /// One entry per registered resource type.
    pub resource: Vec<RestResource>,
}

/// Capability entry for a single resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestResource {
    /// Resource type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Declared interactions.
    pub interaction: Vec<InteractionEntry>,
}

/// A declared interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionEntry {
    /// Interaction code.
    pub code: Interaction,
}

/// The CapabilityStatement served by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDocument {
    resource_type: &'static str,
    url: String,
    #[serde(flatten)]
    metadata: ServerMetadata,
    date: String,
    format: Vec<String>,
    rest: Vec<RestEntry>,
}

impl CapabilityDocument {
    /// Renders a template and the registry into a document.
    ///
    /// Deterministic apart from `date`, which records the build time.
    pub fn from_template(
        template: &CapabilityTemplate,
        base_url: &str,
        registry: &ResourceRegistry,
    ) -> Self {
        let resource = registry
            .entries()
            .map(|entry| RestResource {
                resource_type: entry.name().to_string(),
                interaction: entry
                    .interactions()
                    .map(|code| InteractionEntry { code })
                    .collect(),
            })
            .collect();

        Self {
            resource_type: "CapabilityStatement",
            url: base_url.to_string(),
            metadata: template.metadata.clone(),
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            format: template.format.clone(),
            rest: vec![RestEntry {
                mode: "server",
                resource,
            }],
        }
    }

    /// Returns the server metadata.
    pub fn metadata(&self) -> &ServerMetadata {
        &self.metadata
    }

    /// Returns the advertised formats.
    pub fn formats(&self) -> &[String] {
        &self.format
    }

    /// Returns the `rest` entries.
    pub fn rest(&self) -> &[RestEntry] {
        &self.rest
    }

    /// Returns the build timestamp.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns every resource type named in `rest[].resource[].type`.
    pub fn resource_types(&self) -> BTreeSet<&str> {
        self.rest
            .iter()
            .flat_map(|rest| rest.resource.iter())
            .map(|r| r.resource_type.as_str())
            .collect()
    }

    /// Checks that the document names exactly the registered resource types.
    pub fn check_consistency(&self, registry: &ResourceRegistry) -> Result<(), ConfigError> {
        let declared = self.resource_types();
        let registered: BTreeSet<&str> = registry.names().collect();

        if declared == registered {
            return Ok(());
        }

        let missing: Vec<&str> = registered.difference(&declared).copied().collect();
        let extra: Vec<&str> = declared.difference(&registered).copied().collect();
        Err(ConfigError::RegistryMismatch(format!(
            "registered but not declared: [{}]; declared but not registered: [{}]",
            missing.join(", "),
            extra.join(", ")
        )))
    }
}

/// Builds the capability document for a configuration and registry.
pub fn build(
    config: &ServerConfig,
    registry: &ResourceRegistry,
) -> Result<CapabilityDocument, ConfigError> {
    let template = CapabilityTemplate::load(config)?;
    let document = CapabilityDocument::from_template(&template, &config.base_url, registry);
    document.check_consistency(registry)?;

    debug!(
        resources = registry.len(),
        formats = ?document.formats(),
        "Capability document built"
    );
    Ok(document)
}

/// Serialized capability document, built once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct CachedCapabilities {
    bytes: Bytes,
}

impl CachedCapabilities {
    /// Builds, checks and serializes the capability document.
    pub fn build(config: &ServerConfig, registry: &ResourceRegistry) -> Result<Self, ConfigError> {
        let document = build(config, registry)?;
        let cached = Self::from_document(&document)?;
        info!(
            resources = registry.len(),
            bytes = cached.bytes.len(),
            template = config
                .capability_template
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| EMBEDDED_ORIGIN.to_string()),
            "CapabilityStatement cached"
        );
        Ok(cached)
    }

    /// Serializes a document.
    pub fn from_document(document: &CapabilityDocument) -> Result<Self, ConfigError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(ConfigError::Serialize)?;
        Ok(Self {
            bytes: Bytes::from(bytes),
        })
    }

    /// A cache with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the serialized document.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns true when nothing has been cached.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
