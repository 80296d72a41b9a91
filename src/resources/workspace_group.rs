//! `singlestoredb_workspace_group`: a group of workspaces in one region.

use std::net::IpAddr;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{diagnostics_of, Resource};
use crate::client::models::{states, WorkspaceGroup, WorkspaceGroupCreate, WorkspaceGroupUpdate};
use crate::client::wait::{wait_for_state, WaitFor};
use crate::client::ManagementClient;
use crate::error::ProviderError;
use crate::marshal::{opt_string_value, parse_uuid, StateReader};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Type name of the workspace group resource.
pub const TYPE_NAME: &str = "singlestoredb_workspace_group";

const ADMIN_PASSWORD: &str = "admin_password";

/// The workspace group resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceGroupResource;

/// Schema shared by the resource and the workspace group data sources.
pub fn workspace_group_schema() -> Schema {
    Schema::v0()
        .with_description("A SingleStore workspace group")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::required_string())
        .with_attribute(
            "region_id",
            Attribute::required_string()
                .with_force_new()
                .with_description("UUID of the region hosting the group"),
        )
        .with_attribute(
            "firewall_ranges",
            Attribute::optional_string_list()
                .with_description("CIDR ranges allowed to reach the group's workspaces"),
        )
        .with_attribute(
            ADMIN_PASSWORD,
            Attribute::optional_string()
                .sensitive()
                .with_description("Admin password; never read back from the API"),
        )
        .with_attribute("expires_at", Attribute::optional_string())
        .with_attribute("state", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
}

/// Render a workspace group as state. `admin_password` is carried over
/// from the caller since the API never returns it.
pub fn workspace_group_state(group: &WorkspaceGroup, admin_password: Option<&str>) -> Value {
    json!({
        "id": group.workspace_group_id.to_string(),
        "name": group.name,
        "region_id": group.region_id.to_string(),
        "firewall_ranges": group.firewall_ranges,
        ADMIN_PASSWORD: opt_string_value(admin_password),
        "expires_at": opt_string_value(group.expires_at.as_deref()),
        "state": group.state,
        "created_at": opt_string_value(group.created_at.as_deref()),
    })
}

/// Check that `value` looks like `address/prefix`.
fn validate_cidr(attribute: &str, value: &str) -> Result<(), ProviderError> {
    let invalid = || {
        ProviderError::invalid_attribute(attribute, format!("'{}' is not a valid CIDR range", value))
    };
    let (addr, prefix) = value.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid());
    }
    Ok(())
}

fn validate_cidrs(attribute: &str, values: &[String]) -> Result<(), ProviderError> {
    for (i, value) in values.iter().enumerate() {
        validate_cidr(&format!("{}.{}", attribute, i), value)?;
    }
    Ok(())
}

fn create_body(planned: &Value) -> Result<WorkspaceGroupCreate, ProviderError> {
    let reader = StateReader::new(planned);
    let firewall_ranges = reader.string_list("firewall_ranges")?;
    validate_cidrs("firewall_ranges", &firewall_ranges)?;
    Ok(WorkspaceGroupCreate {
        name: reader.string("name")?,
        region_id: reader.uuid("region_id")?,
        firewall_ranges,
        admin_password: reader.opt_string(ADMIN_PASSWORD)?,
        expires_at: reader.opt_string("expires_at")?,
    })
}

/// Build the PATCH body from the attributes that changed.
fn build_update(prior: &Value, planned: &Value) -> Result<WorkspaceGroupUpdate, ProviderError> {
    let before = StateReader::new(prior);
    let after = StateReader::new(planned);

    let name = after.string("name")?;
    let ranges = after.string_list("firewall_ranges")?;
    validate_cidrs("firewall_ranges", &ranges)?;
    let password = after.opt_string(ADMIN_PASSWORD)?;
    let expires_at = after.opt_string("expires_at")?;

    // Unsetting an optional value is not expressible in the PATCH body, so
    // only new values are sent.
    Ok(WorkspaceGroupUpdate {
        name: (before.string("name")? != name).then_some(name),
        firewall_ranges: (before.string_list("firewall_ranges")? != ranges).then_some(ranges),
        admin_password: (before.opt_string(ADMIN_PASSWORD)? != password)
            .then_some(password)
            .flatten(),
        expires_at: (before.opt_string("expires_at")? != expires_at)
            .then_some(expires_at)
            .flatten(),
    })
}

async fn wait_for(
    client: &ManagementClient,
    id: Uuid,
    spec: WaitFor<'_>,
) -> Result<(), ProviderError> {
    wait_for_state(spec, client.poll_interval(), client.wait_timeout(), || async move {
        client.get_workspace_group(id).await.map(|g| g.state)
    })
    .await
}

#[async_trait]
impl Resource for WorkspaceGroupResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        workspace_group_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let reader = StateReader::new(config);
        diagnostics_of([
            reader.opt_string("region_id").and_then(|id| match id {
                Some(id) => parse_uuid("region_id", &id).map(|_| ()),
                None => Ok(()),
            }),
            reader
                .string_list("firewall_ranges")
                .and_then(|ranges| validate_cidrs("firewall_ranges", &ranges)),
        ])
    }

    async fn create(
        &self,
        client: &ManagementClient,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let body = create_body(planned)?;
        let id = client.create_workspace_group(&body).await?;
        info!(workspace_group_id = %id, "Workspace group created; waiting for it to become active");

        wait_for(client, id, WaitFor::state("workspace group", states::ACTIVE)).await?;

        let group = client.get_workspace_group(id).await?;
        Ok(workspace_group_state(&group, body.admin_password.as_deref()))
    }

    async fn read(&self, client: &ManagementClient, state: &Value) -> Result<Value, ProviderError> {
        let reader = StateReader::new(state);
        let id = reader.uuid("id")?;
        match client.get_workspace_group(id).await {
            Ok(group) if group.state.eq_ignore_ascii_case(states::TERMINATED) => {
                warn!(workspace_group_id = %id, "Workspace group is terminated; removing from state");
                Ok(Value::Null)
            },
            Ok(group) => Ok(workspace_group_state(
                &group,
                reader.opt_string(ADMIN_PASSWORD)?.as_deref(),
            )),
            Err(e) if e.is_not_found() => {
                warn!(workspace_group_id = %id, "Workspace group no longer exists; removing from state");
                Ok(Value::Null)
            },
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        client: &ManagementClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = StateReader::new(prior).uuid("id")?;
        let patch = build_update(prior, planned)?;

        if patch.is_empty() {
            debug!(workspace_group_id = %id, "No workspace group changes; skipping update");
        } else {
            client.update_workspace_group(id, &patch).await?;
        }

        let group = client.get_workspace_group(id).await?;
        let password = StateReader::new(planned).opt_string(ADMIN_PASSWORD)?;
        Ok(workspace_group_state(&group, password.as_deref()))
    }

    async fn delete(&self, client: &ManagementClient, state: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.delete_workspace_group(id).await {
            Err(e) if e.is_not_found() => return Ok(()),
            other => other?,
        }
        wait_for(client, id, WaitFor::terminated("workspace group")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: &str = "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f";

    fn state(name: &str, ranges: &[&str], password: Option<&str>) -> Value {
        json!({
            "id": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
            "name": name,
            "region_id": REGION,
            "firewall_ranges": ranges,
            "admin_password": password,
            "expires_at": null,
            "state": "ACTIVE",
            "created_at": "2024-01-01T00:00:00Z",
        })
    }

    #[test]
    fn test_cidr_validation() {
        assert!(validate_cidr("r", "10.0.0.0/8").is_ok());
        assert!(validate_cidr("r", "0.0.0.0/0").is_ok());
        assert!(validate_cidr("r", "2001:db8::/32").is_ok());
        assert!(validate_cidr("r", "10.0.0.0").is_err());
        assert!(validate_cidr("r", "10.0.0.0/33").is_err());
        assert!(validate_cidr("r", "example.com/24").is_err());

        let err = validate_cidrs("firewall_ranges", &["10.0.0.0/8".into(), "bad".into()])
            .unwrap_err();
        assert_eq!(err.attribute(), Some("firewall_ranges.1"));
    }

    #[test]
    fn test_update_only_sends_changes() {
        let prior = state("g", &["10.0.0.0/8"], Some("secret"));
        assert!(build_update(&prior, &prior).unwrap().is_empty());

        let planned = state("g2", &["10.0.0.0/8", "192.168.0.0/16"], Some("secret"));
        let patch = build_update(&prior, &planned).unwrap();
        assert_eq!(patch.name.as_deref(), Some("g2"));
        assert_eq!(patch.firewall_ranges.unwrap().len(), 2);
        assert_eq!(patch.admin_password, None);

        let planned = state("g", &["10.0.0.0/8"], Some("rotated"));
        let patch = build_update(&prior, &planned).unwrap();
        assert_eq!(patch.admin_password.as_deref(), Some("rotated"));
    }

    #[test]
    fn test_create_body() {
        let body = create_body(&json!({
            "name": "g",
            "region_id": REGION,
            "firewall_ranges": ["0.0.0.0/0"],
        }))
        .unwrap();
        assert_eq!(body.region_id.to_string(), REGION);
        assert_eq!(body.admin_password, None);

        let err = create_body(&json!({"name": "g", "region_id": "us-east-1"})).unwrap_err();
        assert_eq!(err.attribute(), Some("region_id"));
    }

    #[test]
    fn test_state_keeps_password_out_of_api() {
        let group: WorkspaceGroup = serde_json::from_value(json!({
            "workspaceGroupID": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
            "name": "g",
            "regionID": REGION,
            "state": "ACTIVE",
        }))
        .unwrap();
        let s = workspace_group_state(&group, Some("pw"));
        assert_eq!(s["admin_password"], "pw");
        assert_eq!(s["firewall_ranges"], json!([]));
        assert_eq!(s["expires_at"], Value::Null);
    }
}
