//! `singlestoredb_invitation`: an invitation for a user to join the organization.
//!
//! Invitations cannot be edited; every configurable attribute forces
//! replacement. A revoked invitation is treated as deleted.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{diagnostics_of, Resource};
use crate::client::models::{Invitation, InvitationCreate, InvitationState};
use crate::client::ManagementClient;
use crate::error::ProviderError;
use crate::marshal::{opt_string_value, parse_uuids, uuids_to_strings, validate_email, StateReader};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Type name of the invitation resource.
pub const TYPE_NAME: &str = "singlestoredb_invitation";

/// The invitation resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvitationResource;

/// Schema shared by the resource and the invitation data sources.
pub fn invitation_schema() -> Schema {
    Schema::v0()
        .with_description("An invitation to join the SingleStore organization")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("UUID of the invitation"),
        )
        .with_attribute(
            "email",
            Attribute::required_string()
                .with_force_new()
                .with_description("Email address of the invitee"),
        )
        .with_attribute(
            "team_ids",
            Attribute::optional_string_set()
                .with_force_new()
                .with_description("Teams the invitee joins on acceptance"),
        )
        .with_attribute(
            "state",
            Attribute::computed_string()
                .with_description("Pending, Accepted, Refused or Revoked"),
        )
        .with_attribute(
            "created_at",
            Attribute::computed_string().with_description("Creation timestamp"),
        )
}

/// Render an invitation as resource state.
pub fn invitation_state(invitation: &Invitation) -> Value {
    let mut team_ids = uuids_to_strings(&invitation.team_ids);
    team_ids.sort();
    json!({
        "id": invitation.invitation_id.to_string(),
        "email": invitation.email,
        "team_ids": team_ids,
        "state": invitation.state.as_str(),
        "created_at": opt_string_value(invitation.created_at.as_deref()),
    })
}

fn create_body(planned: &Value) -> Result<InvitationCreate, ProviderError> {
    let reader = StateReader::new(planned);
    let email = reader.string("email")?;
    validate_email("email", &email)?;
    let team_ids = parse_uuids("team_ids", &reader.string_list("team_ids")?)?;
    Ok(InvitationCreate { email, team_ids })
}

#[async_trait]
impl Resource for InvitationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        invitation_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let reader = StateReader::new(config);
        diagnostics_of([
            reader.opt_string("email").and_then(|email| match email {
                Some(email) => validate_email("email", &email),
                None => Ok(()),
            }),
            reader
                .string_list("team_ids")
                .and_then(|ids| parse_uuids("team_ids", &ids).map(|_| ())),
        ])
    }

    async fn create(
        &self,
        client: &ManagementClient,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let body = create_body(planned)?;
        let id = client.create_invitation(&body).await?;
        info!(invitation_id = %id, "Invitation sent");
        Ok(invitation_state(&client.get_invitation(id).await?))
    }

    async fn read(&self, client: &ManagementClient, state: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.get_invitation(id).await {
            Ok(inv) if inv.state == InvitationState::Revoked => {
                warn!(invitation_id = %id, "Invitation was revoked; removing from state");
                Ok(Value::Null)
            },
            Ok(inv) => Ok(invitation_state(&inv)),
            Err(e) if e.is_not_found() => {
                warn!(invitation_id = %id, "Invitation no longer exists; removing from state");
                Ok(Value::Null)
            },
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        client: &ManagementClient,
        prior: &Value,
        _planned: &Value,
    ) -> Result<Value, ProviderError> {
        // Every configurable attribute forces replacement, so an update can
        // only ever refresh computed values.
        let state = self.read(client, prior).await?;
        if state.is_null() {
            return Err(ProviderError::NotFound(
                "invitation was revoked or deleted".to_string(),
            ));
        }
        Ok(state)
    }

    async fn delete(&self, client: &ManagementClient, state: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.revoke_invitation(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_validates() {
        let body = create_body(&json!({
            "email": "new@example.com",
            "team_ids": ["6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d"],
        }))
        .unwrap();
        assert_eq!(body.team_ids.len(), 1);

        let err = create_body(&json!({"email": "nope"})).unwrap_err();
        assert_eq!(err.attribute(), Some("email"));

        let err = create_body(&json!({"email": "a@example.com", "team_ids": ["x"]})).unwrap_err();
        assert_eq!(err.attribute(), Some("team_ids.0"));
    }

    #[test]
    fn test_validate_skips_unset_email() {
        assert!(InvitationResource.validate(&json!({})).is_empty());
        assert_eq!(
            InvitationResource
                .validate(&json!({"email": "bad"}))
                .len(),
            1
        );
    }

    #[test]
    fn test_schema_forces_replacement() {
        let schema = invitation_schema();
        assert!(schema.attribute("email").unwrap().force_new);
        assert!(schema.attribute("team_ids").unwrap().force_new);
    }
}
