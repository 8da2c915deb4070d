use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::dsl::{Coercer, Schema, SchemaRegistry, TRACKING};

#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default = "default_true")]
    pub pretty: bool,
    /// Extra schemas by name; a name shared with a built-in replaces it.
    #[serde(default)]
    pub schemas: BTreeMap<String, BTreeMap<String, Coercer>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_schema: None,
            format: None,
            pretty: true,
            schemas: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Built-in schemas plus the ones declared in this config.
    pub fn registry(&self) -> SchemaRegistry {
        let mut registry = SchemaRegistry::default();
        for (name, fields) in &self.schemas {
            let schema = Schema::new(name.clone(), fields.iter().map(|(f, c)| (f.clone(), *c)));
            if registry.insert(schema).is_some() {
                tracing::info!("Config: schema '{}' overrides the built-in", name);
            }
        }
        registry
    }

    pub fn schema_name(&self) -> &str {
        self.default_schema.as_deref().unwrap_or(TRACKING)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Query document as JSON
    #[default]
    Json,
    /// Query document as YAML
    Yaml,
    /// Canonical, fully parenthesized query text
    Query,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.schema_name(), "tracking");
        assert!(config.pretty);
        assert!(config.registry().get("user").is_some());
    }

    #[test]
    fn test_load_custom_schemas() {
        let file = write_config(
            "default_schema: route\nformat: yaml\nschemas:\n  route:\n    laps: int32\n    name: text\n",
        );
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.schema_name(), "route");
        assert_eq!(config.format, Some(OutputFormat::Yaml));
        assert!(config.pretty);

        let registry = config.registry();
        let route = registry.get("route").unwrap();
        assert_eq!(route.coercer("laps"), Some(Coercer::Int32));
        assert_eq!(route.coercer("name"), Some(Coercer::Text));
        assert!(registry.get("tracking").is_some());
    }

    #[test]
    fn test_rejects_unknown_coercer() {
        let file = write_config("schemas:\n  route:\n    laps: integer\n");
        assert!(AppConfig::load(file.path()).is_err());
    }
}
