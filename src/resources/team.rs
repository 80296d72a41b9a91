//! `singlestoredb_team`: a team with member users and member teams.
//!
//! Updates reconcile membership incrementally: the remembered member lists are
//! diffed against the planned ones and only the additions and removals are
//! sent, in a single PATCH, and only when something actually changed. The
//! state persisted afterwards is always the team as re-read from the API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{diagnostics_of, Resource};
use crate::client::models::{Team, TeamCreate, TeamUpdate};
use crate::client::ManagementClient;
use crate::error::ProviderError;
use crate::marshal::{opt_string_value, parse_uuids, validate_emails, StateReader};
use crate::membership;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Type name of the team resource.
pub const TYPE_NAME: &str = "singlestoredb_team";

const MEMBER_USERS: &str = "member_users";
const MEMBER_TEAMS: &str = "member_teams";

/// The team resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamResource;

/// Schema shared by the resource and the team data sources.
pub fn team_schema() -> Schema {
    Schema::v0()
        .with_description("A team in the SingleStore organization")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("UUID of the team"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Name of the team"),
        )
        .with_attribute(
            "description",
            Attribute::optional_string().with_description("Description of the team"),
        )
        .with_attribute(
            MEMBER_USERS,
            Attribute::optional_string_set().with_description("Emails of the member users"),
        )
        .with_attribute(
            MEMBER_TEAMS,
            Attribute::optional_string_set().with_description("UUIDs of the member teams"),
        )
        .with_attribute(
            "created_at",
            Attribute::computed_string().with_description("Creation timestamp"),
        )
}

/// Render a team as resource state. Member lists are sorted so refreshes are
/// stable regardless of API ordering.
pub fn team_state(team: &Team) -> Value {
    let mut users: Vec<String> = team.member_users.iter().map(|u| u.email.clone()).collect();
    users.sort();
    let mut teams: Vec<String> = team
        .member_teams
        .iter()
        .map(|t| t.team_id.to_string())
        .collect();
    teams.sort();

    json!({
        "id": team.team_id.to_string(),
        "name": team.name,
        "description": opt_string_value(team.description.as_deref().filter(|d| !d.is_empty())),
        MEMBER_USERS: users,
        MEMBER_TEAMS: teams,
        "created_at": opt_string_value(team.created_at.as_deref()),
    })
}

/// Membership lists read from one state object.
struct Members {
    users: Vec<String>,
    teams: Vec<Uuid>,
}

impl Members {
    /// Lists the user wrote; every email must be well formed.
    fn desired(planned: &Value) -> Result<Self, ProviderError> {
        let members = Self::current(planned)?;
        validate_emails(MEMBER_USERS, &members.users)?;
        Ok(members)
    }

    /// Lists as last read from the API. Emails are kept verbatim.
    fn current(state: &Value) -> Result<Self, ProviderError> {
        let reader = StateReader::new(state);
        let users = reader.string_list(MEMBER_USERS)?;
        let teams = parse_uuids(MEMBER_TEAMS, &reader.string_list(MEMBER_TEAMS)?)?;
        Ok(Self { users, teams })
    }
}

/// Compute the PATCH body that moves a team from `prior` to `planned`.
///
/// The planned lists are validated before anything is diffed, so a bad
/// email or team UUID aborts the update without touching the API. Prior
/// emails are whatever the API returned and are only compared. An empty
/// result means there is nothing to send.
pub fn build_team_update(prior: &Value, planned: &Value) -> Result<TeamUpdate, ProviderError> {
    let prior_reader = StateReader::new(prior);
    let planned_reader = StateReader::new(planned);

    let current = Members::current(prior)?;
    let desired = Members::desired(planned)?;

    let name = planned_reader.string("name")?;
    let name_changed = prior_reader.opt_string("name")?.as_deref() != Some(name.as_str());

    let prior_description = prior_reader
        .opt_string("description")?
        .filter(|d| !d.is_empty());
    let planned_description = planned_reader
        .opt_string("description")?
        .filter(|d| !d.is_empty());
    // Clearing a description is sent as an empty string.
    let description = (prior_description != planned_description)
        .then(|| planned_description.unwrap_or_default());

    let users = membership::diff(&current.users, &desired.users);
    let teams = membership::diff(&current.teams, &desired.teams);

    Ok(TeamUpdate {
        name: name_changed.then_some(name),
        description,
        add_member_user_emails: users.added_or_none(),
        remove_member_user_emails: users.removed_or_none(),
        add_member_team_ids: teams.added_or_none(),
        remove_member_team_ids: teams.removed_or_none(),
    })
}

#[async_trait]
impl Resource for TeamResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        team_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let reader = StateReader::new(config);
        diagnostics_of([
            reader
                .string_list(MEMBER_USERS)
                .and_then(|users| validate_emails(MEMBER_USERS, &users)),
            reader
                .string_list(MEMBER_TEAMS)
                .and_then(|teams| parse_uuids(MEMBER_TEAMS, &teams).map(|_| ())),
        ])
    }

    async fn create(
        &self,
        client: &ManagementClient,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let reader = StateReader::new(planned);
        let body = TeamCreate {
            name: reader.string("name")?,
            description: reader.opt_string("description")?,
        };
        // Validate members up front so a bad entry never leaves a half-made team.
        let members = Members::desired(planned)?;

        let id = client.create_team(&body).await?;
        info!(team_id = %id, "Team created");

        if !members.users.is_empty() || !members.teams.is_empty() {
            let patch = TeamUpdate {
                add_member_user_emails: (!members.users.is_empty()).then_some(members.users),
                add_member_team_ids: (!members.teams.is_empty()).then_some(members.teams),
                ..Default::default()
            };
            client.update_team(id, &patch).await?;
        }

        Ok(team_state(&client.get_team(id).await?))
    }

    async fn read(&self, client: &ManagementClient, state: &Value) -> Result<Value, ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.get_team(id).await {
            Ok(team) => Ok(team_state(&team)),
            Err(e) if e.is_not_found() => {
                warn!(team_id = %id, "Team no longer exists; removing from state");
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
        let patch = build_team_update(prior, planned)?;

        if patch.is_empty() {
            debug!(team_id = %id, "No team changes to send");
        } else {
            info!(
                team_id = %id,
                users_added = patch.add_member_user_emails.as_ref().map_or(0, Vec::len),
                users_removed = patch.remove_member_user_emails.as_ref().map_or(0, Vec::len),
                teams_added = patch.add_member_team_ids.as_ref().map_or(0, Vec::len),
                teams_removed = patch.remove_member_team_ids.as_ref().map_or(0, Vec::len),
                "Updating team"
            );
            client.update_team(id, &patch).await?;
        }

        Ok(team_state(&client.get_team(id).await?))
    }

    async fn delete(&self, client: &ManagementClient, state: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(state).uuid("id")?;
        match client.delete_team(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::{TeamInfo, UserInfo};
    use std::collections::HashSet;

    const T1: &str = "11111111-1111-4111-8111-111111111111";
    const T2: &str = "22222222-2222-4222-8222-222222222222";
    const T3: &str = "33333333-3333-4333-8333-333333333333";

    fn state(users: &[&str], teams: &[&str]) -> Value {
        json!({
            "id": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
            "name": "admins",
            "description": "Admins",
            "member_users": users,
            "member_teams": teams,
        })
    }

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_update_sends_only_deltas() {
        let prior = state(&["a@x.io", "b@x.io"], &[T1, T2]);
        let planned = state(&["b@x.io", "c@x.io"], &[T2, T3]);

        let patch = build_team_update(&prior, &planned).unwrap();
        assert_eq!(patch.name, None);
        assert_eq!(patch.description, None);
        assert_eq!(patch.add_member_user_emails, Some(vec!["c@x.io".to_string()]));
        assert_eq!(patch.remove_member_user_emails, Some(vec!["a@x.io".to_string()]));
        assert_eq!(patch.add_member_team_ids, Some(vec![uuid(T3)]));
        assert_eq!(patch.remove_member_team_ids, Some(vec![uuid(T1)]));
    }

    #[test]
    fn test_update_reordered_members_is_empty() {
        let prior = state(&["a@x.io", "b@x.io"], &[T1, T2]);
        let upper = T1.to_uppercase();
        let planned = state(&["b@x.io", "a@x.io"], &[T2, upper.as_str()]);

        let patch = build_team_update(&prior, &planned).unwrap();
        assert!(patch.is_empty(), "unexpected patch {:?}", patch);
    }

    #[test]
    fn test_update_scalars_only() {
        let prior = state(&["a@x.io"], &[]);
        let mut planned = prior.clone();
        planned["name"] = json!("operators");
        planned["description"] = Value::Null;

        let patch = build_team_update(&prior, &planned).unwrap();
        assert_eq!(patch.name.as_deref(), Some("operators"));
        assert_eq!(patch.description.as_deref(), Some(""));
        assert_eq!(patch.add_member_user_emails, None);
        assert_eq!(patch.remove_member_user_emails, None);
    }

    #[test]
    fn test_update_rejects_bad_email() {
        let prior = state(&["a@x.io"], &[]);
        let planned = state(&["a@x.io", "not-an-email"], &[]);

        let err = build_team_update(&prior, &planned).unwrap_err();
        assert_eq!(err.attribute(), Some("member_users.1"));
    }

    #[test]
    fn test_update_removes_member_email_the_api_returned() {
        // The API may hold addresses that are not accepted in configuration.
        let prior = state(&["a@x.io", "ops@localhost"], &[]);
        let planned = state(&["a@x.io"], &[]);

        let patch = build_team_update(&prior, &planned).unwrap();
        assert_eq!(patch.remove_member_user_emails, Some(vec!["ops@localhost".to_string()]));
        assert_eq!(patch.add_member_user_emails, None);
    }

    #[test]
    fn test_update_rejects_bad_team_id() {
        let prior = state(&[], &[T1]);
        let planned = state(&[], &[T1, "team-two"]);

        let err = build_team_update(&prior, &planned).unwrap_err();
        assert_eq!(err.attribute(), Some("member_teams.1"));
    }

    #[test]
    fn test_update_applies_to_plan_as_sets() {
        let lists: [&[&str]; 4] = [&[], &["a@x.io"], &["a@x.io", "b@x.io"], &["c@x.io", "b@x.io"]];
        for current in lists {
            for desired in lists {
                let patch =
                    build_team_update(&state(current, &[]), &state(desired, &[])).unwrap();
                let added = patch.add_member_user_emails.unwrap_or_default();
                let removed = patch.remove_member_user_emails.unwrap_or_default();

                let mut result: HashSet<String> = current.iter().map(|s| s.to_string()).collect();
                result.extend(added.iter().cloned());
                for r in &removed {
                    result.remove(r);
                }
                let want: HashSet<String> = desired.iter().map(|s| s.to_string()).collect();
                assert_eq!(result, want);
                assert!(added.iter().all(|a| !removed.contains(a)));
            }
        }
    }

    #[test]
    fn test_validate_reports_each_list() {
        let diagnostics = TeamResource.validate(&json!({
            "name": "x",
            "member_users": ["bad"],
            "member_teams": ["also-bad"],
        }));
        let attrs: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attrs, vec!["member_users.0", "member_teams.0"]);
    }

    #[test]
    fn test_team_state_sorts_members() {
        let team = Team {
            team_id: uuid(T1),
            name: "admins".to_string(),
            description: Some(String::new()),
            member_users: vec![
                UserInfo {
                    user_id: uuid(T2),
                    email: "z@x.io".to_string(),
                    first_name: None,
                    last_name: None,
                },
                UserInfo {
                    user_id: uuid(T3),
                    email: "a@x.io".to_string(),
                    first_name: None,
                    last_name: None,
                },
            ],
            member_teams: vec![
                TeamInfo {
                    team_id: uuid(T3),
                    name: "c".to_string(),
                    description: None,
                },
                TeamInfo {
                    team_id: uuid(T2),
                    name: "b".to_string(),
                    description: None,
                },
            ],
            created_at: None,
        };

        let state = team_state(&team);
        assert_eq!(state["member_users"], json!(["a@x.io", "z@x.io"]));
        assert_eq!(state["member_teams"], json!([T2, T3]));
        assert_eq!(state["description"], Value::Null);
    }
}
