//! Schema declaration and the field registry.
//!
//! A [`Schema`] is an ordered, immutable set of [`FieldDescriptor`]s plus
//! the passthrough accessor names. It is assembled with a
//! [`SchemaBuilder`], either in code or from a YAML/JSON [`SchemaConfig`],
//! and every configuration mistake is reported by
//! [`build`](SchemaBuilder::build).
//!
//! # Example
//!
//! ```
//! use rowsift::{FieldOptions, SchemaBuilder, Value};
//!
//! let schema = SchemaBuilder::new()
//!     .register_field("names", FieldOptions::new().field("name"))
//!     .register_field("sizes", FieldOptions::new().field("size"))
//!     .register_field(
//!         "owners",
//!         FieldOptions::new().field("owner").lazy(|_, _, _| Value::from("root")),
//!     )
//!     .register_passthrough("entries")
//!     .build()
//!     .unwrap();
//!
//! assert!(schema.is_lazy("owner"));
//! assert_eq!(schema.field("sizes").unwrap().source(), "size");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::accessor::Outcome;
use crate::error::{Result, SiftError};
use crate::table::RecordTable;
use crate::value::{Record, Value};

/// Table methods that a passthrough accessor may name.
pub const TABLE_METHODS: &[&str] = &["where", "entries", "raw_data", "count", "exists"];

/// Value handed to a lazy resolver alongside the record.
///
/// The engine attaches no meaning to it beyond forwarding it.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Population was requested without a specific criterion.
    ShowAll,
    /// Population was triggered by a `where` comparing against this value.
    Expected(Value),
}

/// Computes a lazy field for one record.
pub type Resolver = Rc<dyn Fn(&Record, &Criterion, &RecordTable) -> Value>;

/// Replaces the generated accessor body for a field.
pub type Handler = Rc<dyn Fn(&RecordTable, Option<&Value>) -> Result<Outcome>>;

/// How a field projects its values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Values are returned as stored, one per record.
    #[default]
    Default,
    /// Nested lists are flattened, duplicates and nulls dropped.
    Simple,
}

/// One queryable field.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    source: String,
    lazy: Option<Resolver>,
    style: Style,
    handler: Option<Handler>,
}

impl FieldDescriptor {
    /// The accessor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record key this field reads.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy.is_some()
    }

    pub(crate) fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("lazy", &self.lazy.is_some())
            .field("style", &self.style)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Options accepted by [`SchemaBuilder::register_field`].
#[derive(Clone, Default)]
pub struct FieldOptions {
    field: Option<String>,
    lazy: Option<Resolver>,
    style: Style,
    handler: Option<Handler>,
}

impl FieldOptions {
    pub fn new() -> Self {
        FieldOptions::default()
    }

    /// Reads this record key instead of the accessor name.
    pub fn field(mut self, source: impl Into<String>) -> Self {
        self.field = Some(source.into());
        self
    }

    /// Computes the field on demand with `resolver`.
    pub fn lazy<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Record, &Criterion, &RecordTable) -> Value + 'static,
    {
        self.lazy = Some(Rc::new(resolver));
        self
    }

    /// Uses the [`Style::Simple`] projection.
    pub fn simple(self) -> Self {
        self.style(Style::Simple)
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Replaces the generated accessor with `handler`.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RecordTable, Option<&Value>) -> Result<Outcome> + 'static,
    {
        self.handler = Some(Rc::new(handler));
        self
    }
}

/// Declarative schema document.
///
/// ```yaml
/// fields:
///   - name: names
///     field: name
///   - name: tags
///     style: simple
///   - name: owners
///     field: owner
///     lazy: true
/// passthrough: [entries, count]
/// ```
///
/// Fields marked `lazy` need a resolver attached with
/// [`SchemaBuilder::resolver`] before building.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub passthrough: Vec<String>,
}

/// One field entry of a [`SchemaConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub lazy: bool,
}

/// Immutable field registry.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
    passthrough: Vec<String>,
}

impl Schema {
    /// Looks up a field by accessor name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field by accessor name or record key.
    pub fn resolve(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field(name)
            .or_else(|| self.fields.iter().find(|f| f.source == name))
    }

    /// Returns the lazy resolver for a record key, if any.
    pub fn resolver(&self, source: &str) -> Option<&Resolver> {
        self.fields
            .iter()
            .filter(|f| f.source == source)
            .find_map(|f| f.lazy.as_ref())
    }

    /// Returns `true` if the record key is computed lazily.
    pub fn is_lazy(&self, source: &str) -> bool {
        self.resolver(source).is_some()
    }

    /// Returns `true` if `name` is a registered passthrough accessor.
    pub fn is_passthrough(&self, name: &str) -> bool {
        self.passthrough.iter().any(|p| p == name)
    }

    /// Fields in registration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }
}

/// Fluent builder for a [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
    passthrough: Vec<String>,
    needs_resolver: Vec<String>,
    resolvers: Vec<(String, Resolver)>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Starts from a parsed schema document.
    pub fn from_config(config: SchemaConfig) -> Self {
        let mut builder = SchemaBuilder::new();
        for field in config.fields {
            if field.lazy {
                builder.needs_resolver.push(field.name.clone());
            }
            let mut options = FieldOptions::new().style(field.style);
            if let Some(source) = field.field {
                options = options.field(source);
            }
            builder = builder.register_field(field.name, options);
        }
        for name in config.passthrough {
            builder = builder.register_passthrough(name);
        }
        builder
    }

    /// Parses a YAML schema document.
    pub fn from_yaml(doc: &str) -> Result<Self> {
        let config: SchemaConfig = serde_yaml::from_str(doc)?;
        Ok(Self::from_config(config))
    }

    /// Parses a JSON schema document.
    pub fn from_json(doc: &str) -> Result<Self> {
        let config: SchemaConfig = serde_json::from_str(doc)?;
        Ok(Self::from_config(config))
    }

    /// Registers a queryable field.
    ///
    /// Registering the same name twice is reported by [`build`](Self::build).
    pub fn register_field(mut self, name: impl Into<String>, options: FieldOptions) -> Self {
        let name = name.into();
        self.fields.push(FieldDescriptor {
            source: options.field.unwrap_or_else(|| name.clone()),
            name,
            lazy: options.lazy,
            style: options.style,
            handler: options.handler,
        });
        self
    }

    /// Registers an accessor that forwards to a built-in table method.
    pub fn register_passthrough(mut self, name: impl Into<String>) -> Self {
        self.passthrough.push(name.into());
        self
    }

    /// Attaches a lazy resolver to an already registered field.
    pub fn resolver<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&Record, &Criterion, &RecordTable) -> Value + 'static,
    {
        self.resolvers.push((name.into(), Rc::new(resolver)));
        self
    }

    /// Validates the registrations and freezes the schema.
    pub fn build(mut self) -> Result<Schema> {
        for (name, resolver) in std::mem::take(&mut self.resolvers) {
            let field = self
                .fields
                .iter_mut()
                .find(|f| f.name == name)
                .ok_or_else(|| {
                    SiftError::config(format!("resolver attached to unknown field '{}'", name))
                })?;
            field.lazy = Some(resolver);
        }

        let mut seen = HashSet::new();
        let names = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.passthrough.iter().map(String::as_str));
        for name in names {
            if name.is_empty() {
                return Err(SiftError::config("accessor name must not be empty"));
            }
            if !seen.insert(name) {
                return Err(SiftError::config(format!("accessor '{}' registered twice", name)));
            }
        }

        for field in &self.fields {
            if field.source.is_empty() {
                return Err(SiftError::config(format!(
                    "field '{}' reads an empty record key",
                    field.name
                )));
            }
            if TABLE_METHODS.contains(&field.name.as_str()) {
                return Err(SiftError::config(format!(
                    "field '{}' shadows a table method",
                    field.name
                )));
            }
        }

        for name in &self.passthrough {
            if !TABLE_METHODS.contains(&name.as_str()) {
                return Err(SiftError::config(format!(
                    "passthrough accessor '{}' does not name a table method",
                    name
                )));
            }
        }

        for name in &self.needs_resolver {
            let resolved = self.fields.iter().any(|f| &f.name == name && f.lazy.is_some());
            if !resolved {
                return Err(SiftError::config(format!("lazy field '{}' has no resolver", name)));
            }
        }

        let mut lazy_sources = HashSet::new();
        for field in self.fields.iter().filter(|f| f.lazy.is_some()) {
            if !lazy_sources.insert(field.source.as_str()) {
                return Err(SiftError::config(format!(
                    "record key '{}' has more than one lazy resolver",
                    field.source
                )));
            }
        }

        Ok(Schema {
            fields: self.fields,
            passthrough: self.passthrough,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(_: &Record, _: &Criterion, _: &RecordTable) -> Value {
        Value::from("root")
    }

    #[test]
    fn source_defaults_to_name() {
        let schema = SchemaBuilder::new()
            .register_field("name", FieldOptions::new())
            .build()
            .unwrap();
        assert_eq!(schema.field("name").unwrap().source(), "name");
        assert_eq!(schema.field("name").unwrap().style(), Style::Default);
    }

    #[test]
    fn resolve_by_name_or_source() {
        let schema = SchemaBuilder::new()
            .register_field("names", FieldOptions::new().field("name"))
            .build()
            .unwrap();
        assert_eq!(schema.resolve("names").unwrap().name(), "names");
        assert_eq!(schema.resolve("name").unwrap().name(), "names");
        assert!(schema.resolve("size").is_none());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let err = SchemaBuilder::new()
            .register_field("name", FieldOptions::new())
            .register_field("name", FieldOptions::new().simple())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn passthrough_clashing_with_field_is_rejected() {
        let result = SchemaBuilder::new()
            .register_field("count", FieldOptions::new())
            .register_passthrough("count")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn unknown_passthrough_is_rejected() {
        let err = SchemaBuilder::new()
            .register_passthrough("frobnicate")
            .build()
            .unwrap_err();
        assert!(matches!(err, SiftError::Config(_)));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(SchemaBuilder::new()
            .register_field("", FieldOptions::new())
            .build()
            .is_err());
    }

    #[test]
    fn field_shadowing_table_method_is_rejected() {
        assert!(SchemaBuilder::new()
            .register_field("where", FieldOptions::new())
            .build()
            .is_err());
    }

    #[test]
    fn resolver_for_unknown_field_is_rejected() {
        assert!(SchemaBuilder::new().resolver("ghost", owner).build().is_err());
    }

    #[test]
    fn conflicting_lazy_resolvers_are_rejected() {
        let result = SchemaBuilder::new()
            .register_field("owner", FieldOptions::new().lazy(owner))
            .register_field("owners", FieldOptions::new().field("owner").lazy(owner))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn yaml_schema() {
        let doc = r#"
fields:
  - name: names
    field: name
  - name: tags
    style: simple
  - name: owners
    field: owner
    lazy: true
passthrough: [entries, count]
"#;
        let schema = SchemaBuilder::from_yaml(doc)
            .unwrap()
            .resolver("owners", owner)
            .build()
            .unwrap();

        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.field("tags").unwrap().style(), Style::Simple);
        assert!(schema.is_lazy("owner"));
        assert!(schema.is_passthrough("count"));
        assert!(!schema.is_passthrough("names"));
    }

    #[test]
    fn yaml_lazy_field_without_resolver_fails() {
        let doc = "fields:\n  - name: owners\n    lazy: true\n";
        let err = SchemaBuilder::from_yaml(doc).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("has no resolver"));
    }

    #[test]
    fn json_schema() {
        let doc = r#"{"fields": [{"name": "sizes", "field": "size"}], "passthrough": ["where"]}"#;
        let schema = SchemaBuilder::from_json(doc).unwrap().build().unwrap();
        assert_eq!(schema.field("sizes").unwrap().source(), "size");
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(
            SchemaBuilder::from_yaml("fields: [{nme: x}]"),
            Err(SiftError::InvalidYaml(_))
        ));
        assert!(matches!(
            SchemaBuilder::from_json("{"),
            Err(SiftError::InvalidJson(_))
        ));
    }
}
