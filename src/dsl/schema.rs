//! Field schemas: which fields an entity can be filtered on, and their types.

use std::collections::BTreeMap;

use super::value::Coercer;

pub const TRACKING: &str = "tracking";
pub const USER: &str = "user";

/// Filterable fields of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: BTreeMap<String, Coercer>,
}

impl Schema {
    pub fn new<I, K>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Coercer)>,
        K: Into<String>,
    {
        Schema {
            name: name.into(),
            fields: fields.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        }
    }

    /// Activity records.
    pub fn tracking() -> Self {
        Schema::new(
            TRACKING,
            [
                ("date", Coercer::Timestamp),
                ("time", Coercer::Duration),
                ("distance", Coercer::Float32),
                ("location.longitude", Coercer::Float64),
                ("location.latitude", Coercer::Float64),
                ("weather.temperature", Coercer::Float32),
                ("weather.temperature_min", Coercer::Float32),
                ("weather.temperature_max", Coercer::Float32),
                ("weather.snowdepth", Coercer::Float32),
                ("weather.winddirection", Coercer::Float32),
                ("weather.windspeed", Coercer::Float32),
                ("weather.pressure", Coercer::Float32),
            ],
        )
    }

    /// User accounts.
    pub fn user() -> Self {
        Schema::new(USER, [("email", Coercer::Email)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coercer(&self, field: &str) -> Option<Coercer> {
        self.fields.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Coercer)> {
        self.fields.iter().map(|(k, c)| (k.as_str(), *c))
    }
}

/// Schemas selectable by name.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut registry = SchemaRegistry {
            schemas: BTreeMap::new(),
        };
        registry.insert(Schema::tracking());
        registry.insert(Schema::user());
        registry
    }
}

impl SchemaRegistry {
    /// Add a schema, replacing any existing one with the same name.
    pub fn insert(&mut self, schema: Schema) -> Option<Schema> {
        self.schemas.insert(schema.name.clone(), schema)
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
