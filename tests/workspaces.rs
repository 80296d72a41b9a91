//! Workspace group and workspace lifecycles, including state polling.

use hemmer_provider_singlestore::testing::ProviderTester;
use hemmer_provider_singlestore::SingleStoreProvider;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP: &str = "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d";
const REGION: &str = "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f";
const WORKSPACE: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

async fn setup() -> (MockServer, ProviderTester<SingleStoreProvider>) {
    let server = MockServer::start().await;
    let tester = assert_ok!(ProviderTester::against(&server.uri()).await);
    (server, tester)
}

fn api_group(state: &str) -> Value {
    json!({
        "workspaceGroupID": GROUP,
        "name": "analytics",
        "regionID": REGION,
        "state": state,
        "firewallRanges": ["10.0.0.0/8"],
        "createdAt": "2024-05-01T10:00:00Z",
    })
}

fn api_workspace(state: &str, size: &str) -> Value {
    json!({
        "workspaceID": WORKSPACE,
        "workspaceGroupID": GROUP,
        "name": "etl",
        "state": state,
        "size": size,
        "endpoint": "svc-etl.example.singlestore.com",
        "createdAt": "2024-05-01T11:00:00Z",
    })
}

fn workspace_state(size: &str, suspended: bool) -> Value {
    json!({
        "id": WORKSPACE,
        "workspace_group_id": GROUP,
        "name": "etl",
        "size": size,
        "suspended": suspended,
        "state": if suspended { "SUSPENDED" } else { "ACTIVE" },
        "endpoint": "svc-etl.example.singlestore.com",
        "created_at": "2024-05-01T11:00:00Z",
    })
}

/// Serve `first` for the next `times` GETs of `url`, then `then` forever.
async fn mount_states(server: &MockServer, url: &str, first: Value, times: u64, then: Value) {
    Mock::given(method("GET"))
        .and(path(url))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .up_to_n_times(times)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(url))
        .respond_with(ResponseTemplate::new(200).set_body_json(then))
        .mount(server)
        .await;
}

async fn non_get_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() != "GET")
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

#[tokio::test]
async fn test_workspace_group_create_waits_for_active() {
    let (server, tester) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/workspaceGroups"))
        .and(body_json(json!({
            "name": "analytics",
            "regionID": REGION,
            "firewallRanges": ["10.0.0.0/8"],
            "adminPassword": "s3cret!",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"workspaceGroupID": GROUP})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_states(
        &server,
        &format!("/v1/workspaceGroups/{}", GROUP),
        api_group("PENDING"),
        2,
        api_group("ACTIVE"),
    )
    .await;

    let state = assert_ok!(
        tester
            .apply(
                "singlestoredb_workspace_group",
                None,
                json!({
                    "name": "analytics",
                    "region_id": REGION,
                    "firewall_ranges": ["10.0.0.0/8"],
                    "admin_password": "s3cret!",
                }),
            )
            .await
    );

    assert_eq!(state["state"], "ACTIVE");
    assert_eq!(state["admin_password"], "s3cret!");
    assert_eq!(state["expires_at"], Value::Null);
}

#[tokio::test]
async fn test_workspace_group_failed_state_aborts() {
    let (server, tester) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/workspaceGroups"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"workspaceGroupID": GROUP})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/workspaceGroups/{}", GROUP)))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_group("FAILED")))
        .mount(&server)
        .await;

    let err = assert_err!(
        tester
            .apply(
                "singlestoredb_workspace_group",
                None,
                json!({"name": "analytics", "region_id": REGION}),
            )
            .await
    );
    assert!(err.to_string().contains("FAILED"), "{}", err);
}

#[tokio::test]
async fn test_workspace_group_delete_waits_for_termination() {
    let (server, tester) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v1/workspaceGroups/{}", GROUP)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_states(
        &server,
        &format!("/v1/workspaceGroups/{}", GROUP),
        api_group("TERMINATING"),
        1,
        api_group("TERMINATED"),
    )
    .await;

    let state = json!({"id": GROUP, "name": "analytics", "region_id": REGION});
    assert_ok!(tester.delete("singlestoredb_workspace_group", state.clone()).await);

    // A terminated group reads as gone.
    let refreshed = assert_ok!(tester.read("singlestoredb_workspace_group", state).await);
    assert_eq!(refreshed, Value::Null);
}

#[tokio::test]
async fn test_workspace_create_suspended() {
    let (server, tester) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/workspaces"))
        .and(body_json(json!({
            "name": "etl",
            "workspaceGroupID": GROUP,
            "size": "S-00",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"workspaceID": WORKSPACE})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/workspaces/{}/suspend", WORKSPACE)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_states(
        &server,
        &format!("/v1/workspaces/{}", WORKSPACE),
        api_workspace("ACTIVE", "S-00"),
        1,
        api_workspace("SUSPENDED", "S-00"),
    )
    .await;

    let state = assert_ok!(
        tester
            .apply(
                "singlestoredb_workspace",
                None,
                json!({
                    "workspace_group_id": GROUP,
                    "name": "etl",
                    "size": "S-00",
                    "suspended": true,
                }),
            )
            .await
    );
    assert_eq!(state["suspended"], true);
    assert_eq!(state["state"], "SUSPENDED");
}

#[tokio::test]
async fn test_workspace_resume_then_resize() {
    let (server, tester) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/workspaces/{}/resume", WORKSPACE)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/v1/workspaces/{}", WORKSPACE)))
        .and(body_json(json!({"size": "S-1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/workspaces/{}", WORKSPACE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_workspace("ACTIVE", "S-1")))
        .mount(&server)
        .await;

    let state = assert_ok!(
        tester
            .apply(
                "singlestoredb_workspace",
                Some(workspace_state("S-00", true)),
                json!({
                    "workspace_group_id": GROUP,
                    "name": "etl",
                    "size": "S-1",
                    "suspended": false,
                }),
            )
            .await
    );
    assert_eq!(state["size"], "S-1");
    assert_eq!(state["suspended"], false);

    assert_eq!(
        non_get_paths(&server).await,
        vec![
            format!("POST /v1/workspaces/{}/resume", WORKSPACE),
            format!("PATCH /v1/workspaces/{}", WORKSPACE),
        ]
    );
}

#[tokio::test]
async fn test_workspace_resize_while_suspended_is_rejected() {
    let (server, tester) = setup().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = assert_err!(
        tester
            .update(
                "singlestoredb_workspace",
                workspace_state("S-00", true),
                workspace_state("S-1", true),
            )
            .await
    );
    assert_eq!(err.attributes(), vec!["size".to_string()]);
}

#[tokio::test]
async fn test_workspace_name_change_replaces() {
    let (_server, tester) = setup().await;

    let plan = assert_ok!(
        tester
            .plan(
                "singlestoredb_workspace",
                Some(workspace_state("S-00", false)),
                json!({"workspace_group_id": GROUP, "name": "etl-v2", "size": "S-00"}),
            )
            .await
    );
    hemmer_provider_singlestore::testing::assert_plan_replaces(&plan);
    assert_eq!(plan.planned_state["id"], Value::Null);
}
