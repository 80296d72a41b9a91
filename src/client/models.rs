//! Management API request and response bodies.
//!
//! Field names follow the API's camelCase JSON; identifiers are UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member user of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A member team of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    #[serde(rename = "teamID")]
    pub team_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A team as returned by `GET /v1/teams/{teamID}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "teamID")]
    pub team_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_users: Vec<UserInfo>,
    #[serde(default)]
    pub member_teams: Vec<TeamInfo>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /v1/teams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `PATCH /v1/teams/{teamID}`.
///
/// Absent fields mean "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_member_user_emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_member_user_emails: Option<Vec<String>>,
    #[serde(rename = "addMemberTeamIDs", skip_serializing_if = "Option::is_none")]
    pub add_member_team_ids: Option<Vec<Uuid>>,
    #[serde(rename = "removeMemberTeamIDs", skip_serializing_if = "Option::is_none")]
    pub remove_member_team_ids: Option<Vec<Uuid>>,
}

impl TeamUpdate {
    /// Whether the patch would change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Response of create endpoints that only echo the new identifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TeamCreated {
    #[serde(rename = "teamID")]
    pub team_id: Uuid,
}

/// Invitation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationState {
    Pending,
    Accepted,
    Refused,
    Revoked,
}

impl InvitationState {
    /// The API spelling of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Refused => "Refused",
            Self::Revoked => "Revoked",
        }
    }
}

/// An invitation to join the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    #[serde(rename = "invitationID")]
    pub invitation_id: Uuid,
    pub email: String,
    pub state: InvitationState,
    #[serde(rename = "teamIDs", default)]
    pub team_ids: Vec<Uuid>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub acted_at: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /v1/invitations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationCreate {
    pub email: String,
    #[serde(rename = "teamIDs", skip_serializing_if = "Vec::is_empty")]
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvitationCreated {
    #[serde(rename = "invitationID")]
    pub invitation_id: Uuid,
}

/// A cloud region workspace groups can be placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(rename = "regionID")]
    pub region_id: Uuid,
    pub region: String,
    pub provider: String,
}

/// A workspace group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceGroup {
    #[serde(rename = "workspaceGroupID")]
    pub workspace_group_id: Uuid,
    pub name: String,
    #[serde(rename = "regionID")]
    pub region_id: Uuid,
    pub state: String,
    #[serde(default)]
    pub firewall_ranges: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub terminated_at: Option<String>,
}

/// Body of `POST /v1/workspaceGroups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceGroupCreate {
    pub name: String,
    #[serde(rename = "regionID")]
    pub region_id: Uuid,
    pub firewall_ranges: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Body of `PATCH /v1/workspaceGroups/{workspaceGroupID}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceGroupUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl WorkspaceGroupUpdate {
    /// Whether the patch would change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceGroupCreated {
    #[serde(rename = "workspaceGroupID")]
    pub workspace_group_id: Uuid,
}

/// A workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(rename = "workspaceID")]
    pub workspace_id: Uuid,
    #[serde(rename = "workspaceGroupID")]
    pub workspace_group_id: Uuid,
    pub name: String,
    pub state: String,
    pub size: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /v1/workspaces`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceCreate {
    pub name: String,
    #[serde(rename = "workspaceGroupID")]
    pub workspace_group_id: Uuid,
    pub size: String,
}

/// Body of `PATCH /v1/workspaces/{workspaceID}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceUpdate {
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceCreated {
    #[serde(rename = "workspaceID")]
    pub workspace_id: Uuid,
}

/// Remote states of workspaces and workspace groups.
pub mod states {
    pub const ACTIVE: &str = "ACTIVE";
    pub const SUSPENDED: &str = "SUSPENDED";
    pub const TERMINATED: &str = "TERMINATED";
    pub const FAILED: &str = "FAILED";
}
