//! Structured verdict parsing.
//!
//! Judges are asked to answer with JSON. [`StructuredParser`] extracts the
//! payload from the raw response, validates it against a schema generated
//! from the target type with `schemars`, and deserializes it.

use std::marker::PhantomData;

use deckforge_core::extract::extract_json;
use jsonschema::Validator;
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Error, Result};

/// Parser for JSON payloads of type `T` embedded in model responses.
pub struct StructuredParser<T> {
    validator: Validator,
    schema: Value,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for StructuredParser<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredParser")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredParser<T> {
    /// Creates a parser for `T`.
    pub fn new() -> Result<Self> {
        let mut generator = SchemaSettings::draft07().into_generator();
        let schema = serde_json::to_value(generator.root_schema_for::<T>())?;
        let validator = Validator::new(&schema)
            .map_err(|e| Error::config(format!("invalid schema: {e}")))?;

        Ok(Self {
            validator,
            schema,
            _marker: PhantomData,
        })
    }

    /// Returns the JSON schema, for embedding in prompts.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Returns the schema pretty-printed.
    pub fn schema_text(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_default()
    }

    /// Extracts, validates and deserializes a response.
    pub fn parse(&self, response: &str) -> Result<T> {
        let payload = extract_json(response);
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| Error::parse(format!("invalid JSON: {e}")))?;

        let errors: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(Error::SchemaViolation(errors));
        }

        serde_json::from_value(value).map_err(|e| Error::parse(format!("unexpected shape: {e}")))
    }
}
