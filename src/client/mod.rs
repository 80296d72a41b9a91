//! Typed client for the SingleStore Management API.
//!
//! A thin layer over `reqwest`: every call is one HTTP request, non-2xx
//! responses become [`ProviderError::from_status`], and bodies are decoded into
//! the structs in [`models`]. State-transition waits live in [`wait`].

#[allow(missing_docs)]
pub mod models;
pub mod wait;

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use models::{
    Invitation, InvitationCreate, InvitationCreated, Region, Team, TeamCreate, TeamCreated,
    TeamUpdate, Workspace, WorkspaceCreate, WorkspaceCreated, WorkspaceGroup,
    WorkspaceGroupCreate, WorkspaceGroupCreated, WorkspaceGroupUpdate, WorkspaceUpdate,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client for the Management API `v1` endpoints.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: Client,
    base_url: Url,
    api_key: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl ManagementClient {
    /// Build a client from resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_service_url.clone(),
            api_key: config.api_key.clone(),
            poll_interval: config.poll_interval,
            wait_timeout: config.wait_timeout,
        })
    }

    /// Delay between polls while waiting on a state transition.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Upper bound on a single state-transition wait.
    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/v1/{}", base, path.trim_start_matches('/')))
            .map_err(|e| ProviderError::Internal(format!("invalid request URL: {}", e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ProviderError> {
        Ok(self
            .http
            .request(method, self.url(path)?)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json"))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error response".to_string());
        debug!(status = status.as_u16(), "Management API returned an error");
        Err(ProviderError::from_status(status, &body))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.json().await?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(method, path)?.json(body)).await?;
        Ok(response.json().await?)
    }

    async fn send_json_discard<B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), ProviderError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.request(method, path)?.json(body)).await?;
        Ok(())
    }

    async fn delete_path(&self, path: &str) -> Result<(), ProviderError> {
        self.send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    // =========================================================================
    // Teams
    // =========================================================================

    /// `GET /v1/teams`
    #[instrument(skip(self))]
    pub async fn list_teams(&self) -> Result<Vec<Team>, ProviderError> {
        self.get("teams").await
    }

    /// `GET /v1/teams/{teamID}`
    #[instrument(skip(self))]
    pub async fn get_team(&self, id: Uuid) -> Result<Team, ProviderError> {
        self.get(&format!("teams/{}", id)).await
    }

    /// `POST /v1/teams`
    #[instrument(skip(self, body), fields(name = %body.name))]
    pub async fn create_team(&self, body: &TeamCreate) -> Result<Uuid, ProviderError> {
        let created: TeamCreated = self.send_json(Method::POST, "teams", body).await?;
        Ok(created.team_id)
    }

    /// `PATCH /v1/teams/{teamID}`
    #[instrument(skip(self, body))]
    pub async fn update_team(&self, id: Uuid, body: &TeamUpdate) -> Result<(), ProviderError> {
        self.send_json_discard(Method::PATCH, &format!("teams/{}", id), body)
            .await
    }

    /// `DELETE /v1/teams/{teamID}`
    #[instrument(skip(self))]
    pub async fn delete_team(&self, id: Uuid) -> Result<(), ProviderError> {
        self.delete_path(&format!("teams/{}", id)).await
    }

    // =========================================================================
    // Invitations
    // =========================================================================

    /// `GET /v1/invitations`
    #[instrument(skip(self))]
    pub async fn list_invitations(&self) -> Result<Vec<Invitation>, ProviderError> {
        self.get("invitations").await
    }

    /// `GET /v1/invitations/{invitationID}`
    #[instrument(skip(self))]
    pub async fn get_invitation(&self, id: Uuid) -> Result<Invitation, ProviderError> {
        self.get(&format!("invitations/{}", id)).await
    }

    /// `POST /v1/invitations`
    #[instrument(skip(self, body))]
    pub async fn create_invitation(&self, body: &InvitationCreate) -> Result<Uuid, ProviderError> {
        let created: InvitationCreated = self.send_json(Method::POST, "invitations", body).await?;
        Ok(created.invitation_id)
    }

    /// `DELETE /v1/invitations/{invitationID}` (revokes the invitation)
    #[instrument(skip(self))]
    pub async fn revoke_invitation(&self, id: Uuid) -> Result<(), ProviderError> {
        self.delete_path(&format!("invitations/{}", id)).await
    }

    // =========================================================================
    // Regions
    // =========================================================================

    /// `GET /v1/regions`
    #[instrument(skip(self))]
    pub async fn list_regions(&self) -> Result<Vec<Region>, ProviderError> {
        self.get("regions").await
    }

    // =========================================================================
    // Workspace groups
    // =========================================================================

    /// `GET /v1/workspaceGroups`
    #[instrument(skip(self))]
    pub async fn list_workspace_groups(&self) -> Result<Vec<WorkspaceGroup>, ProviderError> {
        self.get("workspaceGroups").await
    }

    /// `GET /v1/workspaceGroups/{workspaceGroupID}`
    #[instrument(skip(self))]
    pub async fn get_workspace_group(&self, id: Uuid) -> Result<WorkspaceGroup, ProviderError> {
        self.get(&format!("workspaceGroups/{}", id)).await
    }

    /// `POST /v1/workspaceGroups`
    #[instrument(skip(self, body), fields(name = %body.name))]
    pub async fn create_workspace_group(
        &self,
        body: &WorkspaceGroupCreate,
    ) -> Result<Uuid, ProviderError> {
        let created: WorkspaceGroupCreated =
            self.send_json(Method::POST, "workspaceGroups", body).await?;
        Ok(created.workspace_group_id)
    }

    /// `PATCH /v1/workspaceGroups/{workspaceGroupID}`
    #[instrument(skip(self, body))]
    pub async fn update_workspace_group(
        &self,
        id: Uuid,
        body: &WorkspaceGroupUpdate,
    ) -> Result<(), ProviderError> {
        self.send_json_discard(Method::PATCH, &format!("workspaceGroups/{}", id), body)
            .await
    }

    /// `DELETE /v1/workspaceGroups/{workspaceGroupID}`
    #[instrument(skip(self))]
    pub async fn delete_workspace_group(&self, id: Uuid) -> Result<(), ProviderError> {
        self.delete_path(&format!("workspaceGroups/{}", id)).await
    }

    // =========================================================================
    // Workspaces
    // =========================================================================

    /// `GET /v1/workspaces?workspaceGroupID=`
    #[instrument(skip(self))]
    pub async fn list_workspaces(&self, group_id: Uuid) -> Result<Vec<Workspace>, ProviderError> {
        self.get(&format!("workspaces?workspaceGroupID={}", group_id))
            .await
    }

    /// `GET /v1/workspaces/{workspaceID}`
    #[instrument(skip(self))]
    pub async fn get_workspace(&self, id: Uuid) -> Result<Workspace, ProviderError> {
        self.get(&format!("workspaces/{}", id)).await
    }

    /// `POST /v1/workspaces`
    #[instrument(skip(self, body), fields(name = %body.name))]
    pub async fn create_workspace(&self, body: &WorkspaceCreate) -> Result<Uuid, ProviderError> {
        let created: WorkspaceCreated = self.send_json(Method::POST, "workspaces", body).await?;
        Ok(created.workspace_id)
    }

    /// `PATCH /v1/workspaces/{workspaceID}`
    #[instrument(skip(self, body))]
    pub async fn update_workspace(
        &self,
        id: Uuid,
        body: &WorkspaceUpdate,
    ) -> Result<(), ProviderError> {
        self.send_json_discard(Method::PATCH, &format!("workspaces/{}", id), body)
            .await
    }

    /// `POST /v1/workspaces/{workspaceID}/suspend`
    #[instrument(skip(self))]
    pub async fn suspend_workspace(&self, id: Uuid) -> Result<(), ProviderError> {
        self.send(self.request(Method::POST, &format!("workspaces/{}/suspend", id))?)
            .await?;
        Ok(())
    }

    /// `POST /v1/workspaces/{workspaceID}/resume`
    #[instrument(skip(self))]
    pub async fn resume_workspace(&self, id: Uuid) -> Result<(), ProviderError> {
        self.send(self.request(Method::POST, &format!("workspaces/{}/resume", id))?)
            .await?;
        Ok(())
    }

    /// `DELETE /v1/workspaces/{workspaceID}`
    #[instrument(skip(self))]
    pub async fn delete_workspace(&self, id: Uuid) -> Result<(), ProviderError> {
        self.delete_path(&format!("workspaces/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ManagementClient {
        let config = ProviderConfig::new("key", Url::parse(base).unwrap());
        ManagementClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_v1_prefix() {
        let c = client("https://api.example.com/");
        assert_eq!(
            c.url("teams").unwrap().as_str(),
            "https://api.example.com/v1/teams"
        );

        let c = client("http://127.0.0.1:9000/proxy");
        assert_eq!(
            c.url("/workspaces?workspaceGroupID=abc").unwrap().as_str(),
            "http://127.0.0.1:9000/proxy/v1/workspaces?workspaceGroupID=abc"
        );
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(USER_AGENT.starts_with("hemmer-provider-singlestore/"));
    }
}
