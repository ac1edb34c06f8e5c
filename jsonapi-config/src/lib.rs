//! Shared configuration loader for the JSON:API codec.
//!
//! `defaults/jsonapi.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`CodecConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, ValueKind};
use jsonapi_codec::{CodecOptions, PathLinkBuilder, ValueHandling};
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/jsonapi.default.toml");
const ENV_PREFIX: &str = "JSONAPI";

/// Top-level configuration consumed by codec hosts.
#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfig {
    pub serialization: SerializationConfig,
    pub deserialization: DeserializationConfig,
    pub atomic: AtomicConfig,
    pub links: LinksConfig,
}

/// How response documents are written.
#[derive(Debug, Clone, Deserialize)]
pub struct SerializationConfig {
    pub include_jsonapi_version: bool,
    pub null_values: ValueHandling,
    pub default_values: ValueHandling,
}

/// How request bodies are read.
#[derive(Debug, Clone, Deserialize)]
pub struct DeserializationConfig {
    pub allow_client_generated_ids: bool,
    pub allow_unknown_fields: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtomicConfig {
    /// `0` disables the limit.
    pub max_operations_per_request: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    pub base_url: String,
    pub top_level: bool,
    pub resources: bool,
    pub relationships: bool,
}

impl From<&CodecConfig> for CodecOptions {
    fn from(config: &CodecConfig) -> Self {
        CodecOptions {
            include_jsonapi_version: config.serialization.include_jsonapi_version,
            null_values: config.serialization.null_values,
            default_values: config.serialization.default_values,
            allow_client_generated_ids: config.deserialization.allow_client_generated_ids,
            allow_unknown_fields: config.deserialization.allow_unknown_fields,
            max_operations_per_request: match config.atomic.max_operations_per_request {
                0 => None,
                limit => Some(limit),
            },
        }
    }
}

impl From<&LinksConfig> for PathLinkBuilder {
    fn from(config: &LinksConfig) -> Self {
        PathLinkBuilder {
            top_level: config.top_level,
            resources: config.resources,
            relationships: config.relationships,
            ..PathLinkBuilder::new(config.base_url.as_str())
        }
    }
}

impl CodecConfig {
    pub fn codec_options(&self) -> CodecOptions {
        self.into()
    }

    pub fn link_builder(&self) -> PathLinkBuilder {
        (&self.links).into()
    }
}

/// Layers configuration sources over the embedded defaults.
///
/// Later sources win: defaults, then files in the order they were added, then
/// environment variables, then explicit overrides.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let defaults = File::from_str(DEFAULT_TOML, FileFormat::Toml);
        Self {
            builder: Config::builder().add_source(defaults),
        }
    }

    /// Add a TOML file that must exist.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path.as_ref(), true)
    }

    /// Add a TOML file that is skipped when absent, such as `./jsonapi.toml`.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path.as_ref(), false)
    }

    fn with_toml(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Read `JSONAPI_<SECTION>__<KEY>` variables, e.g. `JSONAPI_LINKS__BASE_URL`.
    pub fn with_environment(mut self) -> Self {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Set one dotted key, e.g. `links.base_url`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<CodecConfig, ConfigError> {
        let config: CodecConfig = self.builder.build()?.try_deserialize()?;
        tracing::debug!(?config, "loaded codec configuration");
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<CodecConfig, ConfigError> {
    Loader::new().build()
}
