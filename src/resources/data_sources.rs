//! Read-only lookups.
//!
//! Single-object lookups reuse the resource schema (see [`lookup_schema`]) and
//! the resource state renderers, so a data source and its resource always
//! agree on attribute names and formats.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::invitation::{invitation_schema, invitation_state};
use super::team::{team_schema, team_state};
use super::workspace::{workspace_schema, workspace_state};
use super::workspace_group::{workspace_group_schema, workspace_group_state};
use super::{diagnostics_of, element_type, lookup_schema, DataSource};
use crate::client::ManagementClient;
use crate::error::ProviderError;
use crate::marshal::{parse_uuid, StateReader};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Keep only the attributes `schema` declares, copying the config inputs over.
fn project(schema: &Schema, config: &Value, fetched: Value) -> Value {
    let mut out = config.as_object().cloned().unwrap_or_default();
    let fetched = match fetched {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (name, value) in fetched {
        if schema.block.attributes.contains_key(&name) {
            out.insert(name, value);
        }
    }
    Value::Object(out)
}

/// Strip attributes an element type does not declare (sensitive ones).
fn element(ty: &AttributeType, value: Value) -> Value {
    match (ty, value) {
        (AttributeType::Object(fields), Value::Object(map)) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| fields.contains_key(k))
                .collect(),
        ),
        (_, value) => value,
    }
}

fn validate_uuid_input(config: &Value, attribute: &str) -> Vec<Diagnostic> {
    let reader = StateReader::new(config);
    diagnostics_of([reader.opt_string(attribute).and_then(|v| match v {
        Some(v) => parse_uuid(attribute, &v).map(|_| ()),
        None => Ok(()),
    })])
}

fn with_list(config: &Value, attribute: &str, items: Vec<Value>) -> Value {
    let mut out = config.as_object().cloned().unwrap_or_default();
    out.insert(attribute.to_string(), Value::Array(items));
    Value::Object(out)
}

// =============================================================================
// Teams
// =============================================================================

/// `singlestoredb_team`
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamDataSource;

#[async_trait]
impl DataSource for TeamDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_team"
    }

    fn schema(&self) -> Schema {
        lookup_schema(&team_schema(), "Look up a team by id")
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_uuid_input(config, "id")
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(config).uuid("id")?;
        let team = client.get_team(id).await?;
        Ok(project(&self.schema(), config, team_state(&team)))
    }
}

/// `singlestoredb_teams`
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamsDataSource;

#[async_trait]
impl DataSource for TeamsDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_teams"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("All teams in the organization")
            .with_attribute(
                "teams",
                Attribute::computed_object_list(element_type(&team_schema())),
            )
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let ty = element_type(&team_schema());
        let teams = client
            .list_teams()
            .await?
            .iter()
            .map(|t| element(&ty, team_state(t)))
            .collect();
        Ok(with_list(config, "teams", teams))
    }
}

// =============================================================================
// Invitations
// =============================================================================

/// `singlestoredb_invitation`
#[derive(Debug, Clone, Copy, Default)]
pub struct InvitationDataSource;

#[async_trait]
impl DataSource for InvitationDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_invitation"
    }

    fn schema(&self) -> Schema {
        lookup_schema(&invitation_schema(), "Look up an invitation by id")
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_uuid_input(config, "id")
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(config).uuid("id")?;
        let invitation = client.get_invitation(id).await?;
        Ok(project(&self.schema(), config, invitation_state(&invitation)))
    }
}

/// `singlestoredb_invitations`
#[derive(Debug, Clone, Copy, Default)]
pub struct InvitationsDataSource;

#[async_trait]
impl DataSource for InvitationsDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_invitations"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("All invitations of the organization")
            .with_attribute(
                "invitations",
                Attribute::computed_object_list(element_type(&invitation_schema())),
            )
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let invitations = client
            .list_invitations()
            .await?
            .iter()
            .map(invitation_state)
            .collect();
        Ok(with_list(config, "invitations", invitations))
    }
}

// =============================================================================
// Workspace groups
// =============================================================================

/// `singlestoredb_workspace_group`
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceGroupDataSource;

#[async_trait]
impl DataSource for WorkspaceGroupDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_workspace_group"
    }

    fn schema(&self) -> Schema {
        lookup_schema(&workspace_group_schema(), "Look up a workspace group by id")
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_uuid_input(config, "id")
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(config).uuid("id")?;
        let group = client.get_workspace_group(id).await?;
        Ok(project(
            &self.schema(),
            config,
            workspace_group_state(&group, None),
        ))
    }
}

/// `singlestoredb_workspace_groups`
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceGroupsDataSource;

#[async_trait]
impl DataSource for WorkspaceGroupsDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_workspace_groups"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("All workspace groups of the organization")
            .with_attribute(
                "workspace_groups",
                Attribute::computed_object_list(element_type(&workspace_group_schema())),
            )
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let ty = element_type(&workspace_group_schema());
        let groups = client
            .list_workspace_groups()
            .await?
            .iter()
            .map(|g| element(&ty, workspace_group_state(g, None)))
            .collect();
        Ok(with_list(config, "workspace_groups", groups))
    }
}

// =============================================================================
// Workspaces
// =============================================================================

/// `singlestoredb_workspace`
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceDataSource;

#[async_trait]
impl DataSource for WorkspaceDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_workspace"
    }

    fn schema(&self) -> Schema {
        lookup_schema(&workspace_schema(), "Look up a workspace by id")
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_uuid_input(config, "id")
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(config).uuid("id")?;
        let workspace = client.get_workspace(id).await?;
        Ok(project(&self.schema(), config, workspace_state(&workspace)))
    }
}

/// `singlestoredb_workspaces`: the workspaces of one group.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspacesDataSource;

#[async_trait]
impl DataSource for WorkspacesDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_workspaces"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Workspaces of a workspace group")
            .with_attribute(
                "workspace_group_id",
                Attribute::required_string().with_description("UUID of the workspace group"),
            )
            .with_attribute(
                "workspaces",
                Attribute::computed_object_list(element_type(&workspace_schema())),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_uuid_input(config, "workspace_group_id")
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let group_id = StateReader::new(config).uuid("workspace_group_id")?;
        let workspaces = client
            .list_workspaces(group_id)
            .await?
            .iter()
            .map(workspace_state)
            .collect();
        Ok(with_list(config, "workspaces", workspaces))
    }
}

// =============================================================================
// Regions
// =============================================================================

/// `singlestoredb_regions`
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionsDataSource;

fn region_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::String),
        ("region", AttributeType::String),
        ("provider", AttributeType::String),
    ])
}

#[async_trait]
impl DataSource for RegionsDataSource {
    fn type_name(&self) -> &'static str {
        "singlestoredb_regions"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Regions available for workspace groups")
            .with_attribute("regions", Attribute::computed_object_list(region_type()))
    }

    async fn read(&self, client: &ManagementClient, config: &Value) -> Result<Value, ProviderError> {
        let regions = client
            .list_regions()
            .await?
            .into_iter()
            .map(|r| {
                json!({
                    "id": r.region_id.to_string(),
                    "region": r.region,
                    "provider": r.provider,
                })
            })
            .collect();
        Ok(with_list(config, "regions", regions))
    }
}
