//! Schema registry
//!
//! Maps a caller-supplied file type tag to the tabular schema an upload must
//! satisfy. The registry is filled at start-up and read-only afterwards, so it
//! is shared as `Arc<SchemaRegistry>` without locking.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use dmi_core::{AppError, DatabaseRouter, Store, DATA_DOMAIN};

use crate::error::IntakeError;
use crate::headers::normalize_header;

/// Statically defined description of one accepted tabular format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularSchema {
    pub tag: String,
    /// Routing domain of records produced from this schema
    pub domain: String,
    /// Required columns, already normalized
    pub expected_fields: BTreeSet<String>,
    pub description: String,
}

impl TabularSchema {
    pub fn new<I, S>(tag: &str, expected_fields: I, description: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: tag.to_string(),
            domain: DATA_DOMAIN.to_string(),
            expected_fields: expected_fields.into_iter().map(Into::into).collect(),
            description: description.to_string(),
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }
}

/// A schema resolved for one request, with its store already decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSchema {
    pub file_type: String,
    pub expected_fields: BTreeSet<String>,
    pub domain: String,
    pub target_store: Store,
}

/// Registry of known tabular schemas keyed by normalized tag
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    router: DatabaseRouter,
    schemas: BTreeMap<String, TabularSchema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin(DatabaseRouter::default())
    }
}

fn tag_key(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new(router: DatabaseRouter) -> Self {
        Self {
            router,
            schemas: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the platform's intake schemas
    pub fn builtin(router: DatabaseRouter) -> Self {
        let mut registry = Self::new(router);
        for schema in builtin_schemas() {
            // Built-in tags are distinct and their fields normalized.
            if let Err(e) = registry.register(schema) {
                tracing::error!(error = %e, "Invalid built-in schema");
            }
        }
        registry
    }

    /// Add a schema. Duplicate tags and non-normalized field names are rejected.
    pub fn register(&mut self, schema: TabularSchema) -> Result<(), AppError> {
        let key = tag_key(&schema.tag);
        if key.is_empty() {
            return Err(AppError::InvalidInput(
                "Schema tag must not be empty".to_string(),
            ));
        }
        if self.schemas.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Schema '{}' is already registered",
                key
            )));
        }
        if let Some(field) = schema
            .expected_fields
            .iter()
            .find(|f| f.is_empty() || normalize_header(f) != **f)
        {
            return Err(AppError::InvalidInput(format!(
                "Expected field '{}' of schema '{}' is not a normalized header name",
                field, key
            )));
        }

        tracing::debug!(
            file_type = %key,
            domain = %schema.domain,
            fields = schema.expected_fields.len(),
            "Registered tabular schema"
        );
        self.schemas.insert(key, schema);
        Ok(())
    }

    /// Find a schema by tag (trimmed, ASCII case-insensitive)
    pub fn lookup(&self, tag: &str) -> Option<&TabularSchema> {
        self.schemas.get(&tag_key(tag))
    }

    /// Resolve `file_type` into a schema with its target store
    pub fn resolve(&self, file_type: &str) -> Result<ResolvedSchema, IntakeError> {
        let schema = self
            .lookup(file_type)
            .ok_or_else(|| IntakeError::UnknownFileType(file_type.trim().to_string()))?;

        Ok(ResolvedSchema {
            file_type: tag_key(&schema.tag),
            expected_fields: schema.expected_fields.clone(),
            domain: schema.domain.clone(),
            target_store: self.router.route_for_write(&schema.domain),
        })
    }

    pub fn router(&self) -> &DatabaseRouter {
        &self.router
    }

    /// Registered schemas ordered by tag
    pub fn iter(&self) -> impl Iterator<Item = &TabularSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn builtin_schemas() -> Vec<TabularSchema> {
    vec![
        TabularSchema::new(
            "farmer_registry",
            [
                "farmer_name",
                "phone_number",
                "gender",
                "state",
                "lga",
                "ward",
                "farm_size",
            ],
            "Registered smallholder farmers",
        ),
        TabularSchema::new(
            "partner_registry",
            ["reg_no", "organisation_name", "partner_type", "state", "email"],
            "Partner organisations operating in a state",
        ),
        TabularSchema::new(
            "agent_registry",
            ["agent_name", "phone_number", "state", "lga", "partner_reg_no"],
            "Extension agents and the partner they report to",
        ),
        TabularSchema::new(
            "crop_production",
            [
                "state",
                "lga",
                "season",
                "year",
                "crop",
                "area_planted_ha",
                "yield_tonnes",
            ],
            "Seasonal crop output by local government area",
        ),
        TabularSchema::new(
            "livestock_census",
            ["state", "lga", "year", "species", "head_count"],
            "Livestock head counts by species",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeErrorKind;

    #[test]
    fn test_builtin_schemas_registered() {
        let registry = SchemaRegistry::default();
        let tags: Vec<&str> = registry.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "agent_registry",
                "crop_production",
                "farmer_registry",
                "livestock_census",
                "partner_registry",
            ]
        );
    }

    #[test]
    fn test_builtin_schemas_route_to_analytical_store() {
        let registry = SchemaRegistry::default();
        for schema in registry.iter() {
            let resolved = registry.resolve(&schema.tag).unwrap();
            assert_eq!(resolved.target_store, Store::Analytical);
            assert!(!resolved.expected_fields.is_empty());
        }
    }

    #[test]
    fn test_lookup_ignores_case_and_padding() {
        let registry = SchemaRegistry::default();
        assert!(registry.lookup(" Farmer_Registry ").is_some());
        let resolved = registry.resolve("CROP_PRODUCTION").unwrap();
        assert_eq!(resolved.file_type, "crop_production");
    }

    #[test]
    fn test_unknown_tag_fails() {
        let registry = SchemaRegistry::default();
        for tag in ["", "fisheries", "farmer registry"] {
            let err = registry.resolve(tag).unwrap_err();
            assert_eq!(err.kind(), IntakeErrorKind::UnknownFileType);
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::default();
        let err = registry
            .register(TabularSchema::new("Farmer_Registry", ["state"], "again"))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_non_normalized_fields_rejected() {
        let mut registry = SchemaRegistry::new(DatabaseRouter::default());
        let err = registry
            .register(TabularSchema::new("survey", ["Farmer Name"], ""))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_custom_domain_uses_router() {
        let mut registry = SchemaRegistry::new(DatabaseRouter::default());
        registry
            .register(TabularSchema::new("staff_import", ["email"], "").with_domain("users"))
            .unwrap();
        assert_eq!(
            registry.resolve("staff_import").unwrap().target_store,
            Store::Operational
        );
    }
}
