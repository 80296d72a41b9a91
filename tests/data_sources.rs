//! Invitations and read-only lookups against a mock Management API.

use hemmer_provider_singlestore::testing::ProviderTester;
use hemmer_provider_singlestore::SingleStoreProvider;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{any, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INVITATION: &str = "3c2b1a09-8f7e-4d6c-9b5a-4f3e2d1c0b9a";
const TEAM: &str = "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d";
const GROUP: &str = "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f";
const REGION: &str = "7d6c5b4a-3f2e-4d1c-8b0a-9f8e7d6c5b4a";

async fn setup() -> (MockServer, ProviderTester<SingleStoreProvider>) {
    let server = MockServer::start().await;
    let tester = assert_ok!(ProviderTester::against(&server.uri()).await);
    (server, tester)
}

fn api_invitation(state: &str) -> Value {
    json!({
        "invitationID": INVITATION,
        "email": "new@example.com",
        "state": state,
        "teamIDs": [TEAM],
        "createdAt": "2024-05-01T10:00:00Z",
    })
}

#[tokio::test]
async fn test_invitation_lifecycle() {
    let (server, tester) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/invitations"))
        .and(body_json(json!({"email": "new@example.com", "teamIDs": [TEAM]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"invitationID": INVITATION})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/invitations/{}", INVITATION)))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_invitation("Pending")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/invitations/{}", INVITATION)))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_invitation("Revoked")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v1/invitations/{}", INVITATION)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let state = assert_ok!(
        tester
            .apply(
                "singlestoredb_invitation",
                None,
                json!({"email": "new@example.com", "team_ids": [TEAM]}),
            )
            .await
    );
    assert_eq!(state["id"], INVITATION);
    assert_eq!(state["state"], "Pending");
    assert_eq!(state["team_ids"], json!([TEAM]));

    // Revoked outside of Hemmer: the invitation is gone.
    let refreshed = assert_ok!(tester.read("singlestoredb_invitation", state.clone()).await);
    assert_eq!(refreshed, Value::Null);

    assert_ok!(tester.delete("singlestoredb_invitation", state).await);
}

#[tokio::test]
async fn test_invalid_invitation_is_rejected_before_any_call() {
    let (server, tester) = setup().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = assert_err!(
        tester
            .apply(
                "singlestoredb_invitation",
                None,
                json!({"email": "new@example.com", "team_ids": ["admins"]}),
            )
            .await
    );
    assert_eq!(err.attributes(), vec!["team_ids.0".to_string()]);
}

#[tokio::test]
async fn test_team_lookup() {
    let (server, tester) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/teams/{}", TEAM)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "teamID": TEAM,
            "name": "admins",
            "description": "",
            "memberUsers": [
                {"userID": "00000000-0000-4000-8000-000000000001", "email": "b@example.com"},
                {"userID": "00000000-0000-4000-8000-000000000002", "email": "a@example.com"},
            ],
            "memberTeams": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let team = assert_ok!(
        tester
            .read_data_source("singlestoredb_team", json!({"id": TEAM}))
            .await
    );
    assert_eq!(team["name"], "admins");
    assert_eq!(team["description"], Value::Null);
    assert_eq!(team["member_users"], json!(["a@example.com", "b@example.com"]));
}

#[tokio::test]
async fn test_lookup_with_bad_id_makes_no_call() {
    let (server, tester) = setup().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = assert_err!(
        tester
            .read_data_source("singlestoredb_workspace_group", json!({"id": "analytics"}))
            .await
    );
    assert_eq!(err.attributes(), vec!["id".to_string()]);

    let err = assert_err!(
        tester
            .read_data_source(
                "singlestoredb_workspaces",
                json!({"workspace_group_id": "analytics"}),
            )
            .await
    );
    assert_eq!(err.attributes(), vec!["workspace_group_id".to_string()]);
}

#[tokio::test]
async fn test_lookup_of_missing_object_fails() {
    let (server, tester) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = assert_err!(
        tester
            .read_data_source("singlestoredb_workspace", json!({"id": TEAM}))
            .await
    );
    assert!(err.to_string().to_lowercase().contains("not found"), "{}", err);
}

#[tokio::test]
async fn test_workspace_groups_list_omits_password() {
    let (server, tester) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/workspaceGroups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "workspaceGroupID": GROUP,
            "name": "analytics",
            "regionID": REGION,
            "state": "ACTIVE",
            "firewallRanges": ["0.0.0.0/0"],
        }])))
        .mount(&server)
        .await;

    let out = assert_ok!(
        tester
            .read_data_source("singlestoredb_workspace_groups", json!({}))
            .await
    );
    let groups = out["workspace_groups"].as_array().cloned().unwrap_or_default();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["id"], GROUP);
    assert_eq!(groups[0]["firewall_ranges"], json!(["0.0.0.0/0"]));
    assert!(groups[0].get("admin_password").is_none());
}

#[tokio::test]
async fn test_workspaces_list_filters_by_group() {
    let (server, tester) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/workspaces"))
        .and(query_param("workspaceGroupID", GROUP))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "workspaceID": TEAM,
            "workspaceGroupID": GROUP,
            "name": "etl",
            "state": "SUSPENDED",
            "size": "S-00",
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let out = assert_ok!(
        tester
            .read_data_source(
                "singlestoredb_workspaces",
                json!({"workspace_group_id": GROUP}),
            )
            .await
    );
    assert_eq!(out["workspace_group_id"], GROUP);
    assert_eq!(out["workspaces"][0]["name"], "etl");
    assert_eq!(out["workspaces"][0]["suspended"], true);
}

#[tokio::test]
async fn test_regions() {
    let (server, tester) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"regionID": REGION, "region": "US East 1 (N. Virginia)", "provider": "AWS"},
        ])))
        .mount(&server)
        .await;

    let out = assert_ok!(
        tester
            .read_data_source("singlestoredb_regions", json!({}))
            .await
    );
    assert_eq!(
        out["regions"],
        json!([{"id": REGION, "region": "US East 1 (N. Virginia)", "provider": "AWS"}])
    );
}
