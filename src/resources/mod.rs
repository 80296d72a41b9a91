//! Resource and data source implementations.
//!
//! Each managed object type implements [`Resource`]; each read-only lookup
//! implements [`DataSource`]. The provider dispatches host calls to them by
//! type name through a [`Registry`].

pub mod data_sources;
pub mod invitation;
pub mod team;
pub mod workspace;
pub mod workspace_group;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::ManagementClient;
use crate::error::ProviderError;
use crate::marshal::parse_uuid;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

/// A managed object with a full create/read/update/delete lifecycle.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The type name used in configuration, e.g. `singlestoredb_team`.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Domain checks beyond the schema (email syntax, UUIDs, ...).
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Create the object and return its state as re-read from the API.
    async fn create(&self, client: &ManagementClient, planned: &Value)
        -> Result<Value, ProviderError>;

    /// Refresh state. Returns `Value::Null` when the object no longer exists.
    async fn read(&self, client: &ManagementClient, state: &Value) -> Result<Value, ProviderError>;

    /// Apply an in-place update and return the re-read state.
    async fn update(
        &self,
        client: &ManagementClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the object. Deleting an object that is already gone succeeds.
    async fn delete(&self, client: &ManagementClient, state: &Value) -> Result<(), ProviderError>;

    /// Import an existing object by its UUID.
    async fn import(&self, client: &ManagementClient, id: &str) -> Result<Value, ProviderError> {
        let id = parse_uuid("id", id)?;
        let state = self.read(client, &json!({ "id": id.to_string() })).await?;
        if state.is_null() {
            return Err(ProviderError::NotFound(format!(
                "{} {} does not exist",
                self.type_name(),
                id
            )));
        }
        Ok(state)
    }
}

/// A read-only lookup against the Management API.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The type name used in configuration, e.g. `singlestoredb_teams`.
    fn type_name(&self) -> &'static str;

    /// The data source schema.
    fn schema(&self) -> Schema;

    /// Domain checks beyond the schema.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Fetch the data and return `config` with the computed attributes filled in.
    async fn read(&self, client: &ManagementClient, config: &Value)
        -> Result<Value, ProviderError>;
}

/// Resources and data sources by type name.
#[derive(Clone, Default)]
pub struct Registry {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every SingleStore resource and data source.
    pub fn singlestore() -> Self {
        Self::new()
            .with_resource(team::TeamResource)
            .with_resource(invitation::InvitationResource)
            .with_resource(workspace_group::WorkspaceGroupResource)
            .with_resource(workspace::WorkspaceResource)
            .with_data_source(data_sources::TeamDataSource)
            .with_data_source(data_sources::TeamsDataSource)
            .with_data_source(data_sources::InvitationDataSource)
            .with_data_source(data_sources::InvitationsDataSource)
            .with_data_source(data_sources::WorkspaceGroupDataSource)
            .with_data_source(data_sources::WorkspaceGroupsDataSource)
            .with_data_source(data_sources::WorkspaceDataSource)
            .with_data_source(data_sources::WorkspacesDataSource)
            .with_data_source(data_sources::RegionsDataSource)
    }

    /// Register a resource.
    pub fn with_resource<R: Resource + 'static>(mut self, resource: R) -> Self {
        self.resources.insert(resource.type_name(), Arc::new(resource));
        self
    }

    /// Register a data source.
    pub fn with_data_source<D: DataSource + 'static>(mut self, data_source: D) -> Self {
        self.data_sources
            .insert(data_source.type_name(), Arc::new(data_source));
        self
    }

    /// Look up a resource by type name.
    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Look up a data source by type name.
    pub fn data_source(&self, type_name: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(format!("data source {}", type_name)))
    }

    /// All resources, sorted by type name.
    pub fn resources(&self) -> impl Iterator<Item = &Arc<dyn Resource>> {
        self.resources.values()
    }

    /// All data sources, sorted by type name.
    pub fn data_sources(&self) -> impl Iterator<Item = &Arc<dyn DataSource>> {
        self.data_sources.values()
    }
}

/// Collect the first error of each fallible check into diagnostics.
pub(crate) fn diagnostics_of<I>(checks: I) -> Vec<Diagnostic>
where
    I: IntoIterator<Item = Result<(), ProviderError>>,
{
    checks
        .into_iter()
        .filter_map(Result::err)
        .map(|e| e.to_diagnostic())
        .collect()
}

/// Derive a lookup-by-id data source schema from a resource schema.
///
/// `id` becomes required; every other non-sensitive attribute becomes computed.
pub(crate) fn lookup_schema(resource: &Schema, description: &str) -> Schema {
    let mut schema = Schema::v0().with_description(description).with_attribute(
        "id",
        Attribute::required_string().with_description("UUID of the object to look up"),
    );
    for (name, attr) in &resource.block.attributes {
        if name == "id" || attr.flags.sensitive {
            continue;
        }
        let mut computed = Attribute::new(attr.attr_type.clone(), AttributeFlags::computed());
        computed.description = attr.description.clone();
        schema = schema.with_attribute(name.clone(), computed);
    }
    schema
}

/// The object type of one element of a list data source.
pub(crate) fn element_type(resource: &Schema) -> AttributeType {
    AttributeType::object(
        resource
            .block
            .attributes
            .iter()
            .filter(|(_, attr)| !attr.flags.sensitive)
            .map(|(name, attr)| (name.clone(), attr.attr_type.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_everything_sorted() {
        let registry = Registry::singlestore();
        let resources: Vec<_> = registry.resources().map(|r| r.type_name()).collect();
        assert_eq!(
            resources,
            vec![
                "singlestoredb_invitation",
                "singlestoredb_team",
                "singlestoredb_workspace",
                "singlestoredb_workspace_group",
            ]
        );
        assert_eq!(registry.data_sources().count(), 9);
    }

    #[test]
    fn test_registry_unknown_type() {
        let registry = Registry::singlestore();
        let err = registry.resource("singlestoredb_cluster").err().unwrap();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        assert!(registry.data_source("singlestoredb_team").is_ok());
    }

    #[test]
    fn test_lookup_schema_drops_sensitive() {
        let resource = Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("admin_password", Attribute::optional_string().sensitive());

        let lookup = lookup_schema(&resource, "Look up a thing");
        assert!(lookup.attribute("id").unwrap().flags.required);
        assert!(lookup.attribute("name").unwrap().flags.is_computed_only());
        assert!(lookup.attribute("admin_password").is_none());

        let AttributeType::Object(fields) = element_type(&resource) else {
            panic!("expected object type");
        };
        assert!(fields.contains_key("name"));
        assert!(!fields.contains_key("admin_password"));
    }
}
