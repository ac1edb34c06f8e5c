//! Codec options.

use serde::Deserialize;

/// Whether attribute values of a certain kind are written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueHandling {
    #[default]
    Include,
    Omit,
}

/// Behavior switches for both converters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// Emit the top-level `jsonapi` object.
    pub include_jsonapi_version: bool,
    /// Attributes whose value is `null`.
    pub null_values: ValueHandling,
    /// Attributes holding their type's default (`0`, `0.0`, `false`).
    pub default_values: ValueHandling,
    pub allow_client_generated_ids: bool,
    /// Ignore attribute and relationship keys the resource type does not declare.
    pub allow_unknown_fields: bool,
    /// Upper bound on the size of an atomic batch; `None` disables the check.
    pub max_operations_per_request: Option<usize>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            include_jsonapi_version: false,
            null_values: ValueHandling::Include,
            default_values: ValueHandling::Include,
            allow_client_generated_ids: false,
            allow_unknown_fields: true,
            max_operations_per_request: Some(10),
        }
    }
}
