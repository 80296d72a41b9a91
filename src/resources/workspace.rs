//! `singlestoredb_workspace`: a compute workspace inside a workspace group.
//!
//! `suspended` is reconciled through the suspend and resume endpoints rather
//! than the PATCH body. A suspended workspace cannot be resized, so the order
//! of operations depends on the direction of the suspend change.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::{diagnostics_of, Resource};
use crate::client::models::{states, Workspace, WorkspaceCreate, WorkspaceUpdate};
use crate::client::wait::{wait_for_state, WaitFor};
use crate::client::ManagementClient;
use crate::error::ProviderError;
use crate::marshal::{opt_string_value, parse_uuid, StateReader};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Type name of the workspace resource.
pub const TYPE_NAME: &str = "singlestoredb_workspace";

/// The workspace resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceResource;

/// Schema shared by the resource and the workspace data sources.
pub fn workspace_schema() -> Schema {
    Schema::v0()
        .with_description("A SingleStore workspace")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "workspace_group_id",
            Attribute::required_string()
                .with_force_new()
                .with_description("UUID of the owning workspace group"),
        )
        .with_attribute("name", Attribute::required_string().with_force_new())
        .with_attribute(
            "size",
            Attribute::required_string().with_description("Workspace size, e.g. S-00"),
        )
        .with_attribute(
            "suspended",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Whether the workspace is suspended"),
        )
        .with_attribute("state", Attribute::computed_string())
        .with_attribute(
            "endpoint",
            Attribute::computed_string().with_description("Hostname for SQL connections"),
        )
        .with_attribute("created_at", Attribute::computed_string())
}

/// Render a workspace as resource state.
pub fn workspace_state(workspace: &Workspace) -> Value {
    json!({
        "id": workspace.workspace_id.to_string(),
        "workspace_group_id": workspace.workspace_group_id.to_string(),
        "name": workspace.name,
        "size": workspace.size,
        "suspended": workspace.state.eq_ignore_ascii_case(states::SUSPENDED),
        "state": workspace.state,
        "endpoint": opt_string_value(workspace.endpoint.as_deref()),
        "created_at": opt_string_value(workspace.created_at.as_deref()),
    })
}

/// One step of a workspace update, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Resize(String),
    Suspend,
    Resume,
}

/// Order the calls needed to move from `prior` to `planned`.
fn update_steps(prior: &Value, planned: &Value) -> Result<Vec<Step>, ProviderError> {
    let before = StateReader::new(prior);
    let after = StateReader::new(planned);

    let size = after.string("size")?;
    let resize = (before.string("size")? != size).then_some(Step::Resize(size));
    let was_suspended = before.opt_bool("suspended")?.unwrap_or(false);
    let suspend = after.opt_bool("suspended")?.unwrap_or(false);

    let steps = match (was_suspended, suspend, resize) {
        (true, true, Some(_)) => {
            return Err(ProviderError::invalid_attribute(
                "size",
                "a suspended workspace cannot be resized; set suspended = false to resize",
            ));
        },
        (true, false, resize) => std::iter::once(Step::Resume).chain(resize).collect(),
        (false, true, resize) => resize.into_iter().chain(std::iter::once(Step::Suspend)).collect(),
        (_, _, resize) => resize.into_iter().collect(),
    };
    Ok(steps)
}

async fn wait_for(
    client: &ManagementClient,
    id: Uuid,
    spec: WaitFor<'_>,
) -> Result<(), ProviderError> {
    wait_for_state(spec, client.poll_interval(), client.wait_timeout(), || async move {
        client.get_workspace(id).await.map(|w| w.state)
    })
    .await
}

async fn run_step(client: &ManagementClient, id: Uuid, step: Step) -> Result<(), ProviderError> {
    match step {
        Step::Resize(size) => {
            info!(workspace_id = %id, size = %size, "Resizing workspace");
            client.update_workspace(id, &WorkspaceUpdate { size }).await?;
            wait_for(client, id, WaitFor::state("workspace", states::ACTIVE)).await
        },
        Step::Suspend => {
            info!(workspace_id = %id, "Suspending workspace");
            client.suspend_workspace(id).await?;
            wait_for(client, id, WaitFor::state("workspace", states::SUSPENDED)).await
        },
        Step::Resume => {
            info!(workspace_id = %id, "Resuming workspace");
            client.resume_workspace(id).await?;
            wait_for(client, id, WaitFor::state("workspace", states::ACTIVE)).await
        },
    }
}

#[async_trait]
impl Resource for WorkspaceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        workspace_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let reader = StateReader::new(config);
        diagnostics_of([reader
            .opt_string("workspace_group_id")
            .and_then(|id| match id {
                Some(id) => parse_uuid("workspace_group_id", &id).map(|_| ()),
                None => Ok(()),
            })])
    }

    async fn create(
        &self,
        client: &ManagementClient,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let reader = StateReader::new(planned);
        let body = WorkspaceCreate {
            name: reader.string("name")?,
            workspace_group_id: reader.uuid("workspace_group_id")?,
            size: reader.string("size")?,
        };
        let id = client.create_workspace(&body).await?;
        info!(workspace_id = %id, "Workspace created; waiting for it to become active");
        wait_for(client, id, WaitFor::state("workspace", states::ACTIVE)).await?;

        if reader.opt_bool("suspended")?.unwrap_or(false) {
            run_step(client, id, Step::Suspend).await?;
        }

        Ok(workspace_state(&client.get_workspace(id).await?))
    }

    async fn read(&self, client: &ManagementClient, state: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.get_workspace(id).await {
            Ok(ws) if ws.state.eq_ignore_ascii_case(states::TERMINATED) => {
                warn!(workspace_id = %id, "Workspace is terminated; removing from state");
                Ok(Value::Null)
            },
            Ok(ws) => Ok(workspace_state(&ws)),
            Err(e) if e.is_not_found() => {
                warn!(workspace_id = %id, "Workspace no longer exists; removing from state");
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
        for step in update_steps(prior, planned)? {
            run_step(client, id, step).await?;
        }
        Ok(workspace_state(&client.get_workspace(id).await?))
    }

    async fn delete(&self, client: &ManagementClient, state: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.delete_workspace(id).await {
            Err(e) if e.is_not_found() => return Ok(()),
            other => other?,
        }
        wait_for(client, id, WaitFor::terminated("workspace")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(size: &str, suspended: bool) -> Value {
        json!({
            "id": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
            "workspace_group_id": "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f",
            "name": "w",
            "size": size,
            "suspended": suspended,
        })
    }

    #[test]
    fn test_update_steps_ordering() {
        assert!(update_steps(&ws("S-00", false), &ws("S-00", false))
            .unwrap()
            .is_empty());
        assert_eq!(
            update_steps(&ws("S-00", false), &ws("S-1", false)).unwrap(),
            vec![Step::Resize("S-1".to_string())]
        );
        assert_eq!(
            update_steps(&ws("S-00", true), &ws("S-1", false)).unwrap(),
            vec![Step::Resume, Step::Resize("S-1".to_string())]
        );
        assert_eq!(
            update_steps(&ws("S-00", false), &ws("S-1", true)).unwrap(),
            vec![Step::Resize("S-1".to_string()), Step::Suspend]
        );
        assert_eq!(
            update_steps(&ws("S-00", true), &ws("S-00", false)).unwrap(),
            vec![Step::Resume]
        );
    }

    #[test]
    fn test_resize_while_suspended_rejected() {
        let err = update_steps(&ws("S-00", true), &ws("S-1", true)).unwrap_err();
        assert_eq!(err.attribute(), Some("size"));
    }

    #[test]
    fn test_state_derives_suspended() {
        let w: Workspace = serde_json::from_value(json!({
            "workspaceID": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
            "workspaceGroupID": "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f",
            "name": "w",
            "state": "SUSPENDED",
            "size": "S-00",
        }))
        .unwrap();
        let s = workspace_state(&w);
        assert_eq!(s["suspended"], true);
        assert_eq!(s["endpoint"], Value::Null);
    }

    #[test]
    fn test_validate_group_id() {
        let d = WorkspaceResource.validate(&json!({"workspace_group_id": "nope"}));
        assert_eq!(d.len(), 1);
        assert!(WorkspaceResource.validate(&ws("S-00", false)).is_empty());
    }
}
