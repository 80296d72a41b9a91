//! End-to-end gRPC round trips through an in-process server.

use std::net::SocketAddr;
use std::sync::Arc;

use hemmer_provider_singlestore::generated::diagnostic::Severity;
use hemmer_provider_singlestore::generated::provider_client::ProviderClient;
use hemmer_provider_singlestore::generated::{
    CreateRequest, GetMetadataRequest, GetSchemaRequest, PlanRequest,
    ValidateResourceConfigRequest,
};
use hemmer_provider_singlestore::server::provider_server;
use hemmer_provider_singlestore::SingleStoreProvider;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};

async fn start() -> ProviderClient<Channel> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let service = provider_server(Arc::new(SingleStoreProvider::new()));
    tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    ProviderClient::connect(format!("http://{}", addr))
        .await
        .unwrap()
}

fn bytes(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

#[tokio::test]
async fn test_metadata_and_schema() {
    let mut client = start().await;

    let metadata = client
        .get_metadata(GetMetadataRequest {})
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        metadata.resources,
        vec![
            "singlestoredb_invitation",
            "singlestoredb_team",
            "singlestoredb_workspace",
            "singlestoredb_workspace_group",
        ]
    );
    assert!(metadata
        .data_sources
        .contains(&"singlestoredb_regions".to_string()));

    let schema = client
        .get_schema(GetSchemaRequest {})
        .await
        .unwrap()
        .into_inner();
    let provider = schema.provider.unwrap().block.unwrap();
    let api_key = provider
        .attributes
        .iter()
        .find(|a| a.name == "api_key")
        .unwrap();
    assert!(api_key.sensitive);

    let group = schema.resources["singlestoredb_workspace_group"]
        .block
        .clone()
        .unwrap();
    let password = group
        .attributes
        .iter()
        .find(|a| a.name == "admin_password")
        .unwrap();
    assert!(password.sensitive);
}

#[tokio::test]
async fn test_validation_diagnostics_carry_attribute_paths() {
    let mut client = start().await;

    let response = client
        .validate_resource_config(ValidateResourceConfigRequest {
            resource_type: "singlestoredb_team".to_string(),
            config: bytes(json!({
                "name": "admins",
                "member_users": ["alice@example.com", "bob"],
            })),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].severity, Severity::Error as i32);
    assert_eq!(response.diagnostics[0].attribute, "member_users.1");
}

#[tokio::test]
async fn test_malformed_payload_is_a_diagnostic() {
    let mut client = start().await;

    let response = client
        .validate_resource_config(ValidateResourceConfigRequest {
            resource_type: "singlestoredb_team".to_string(),
            config: b"{not json".to_vec(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.contains("config"));
}

#[tokio::test]
async fn test_plan_over_the_wire() {
    let mut client = start().await;

    let prior = json!({
        "id": "6b1d2c3e-4f50-4a1b-8c2d-3e4f5a6b7c8d",
        "email": "alice@example.com",
        "team_ids": [],
        "state": "Pending",
        "created_at": "2024-01-01T00:00:00Z",
    });
    let proposed = json!({"email": "bob@example.com"});
    let response = client
        .plan(PlanRequest {
            resource_type: "singlestoredb_invitation".to_string(),
            prior_state: bytes(prior),
            proposed_state: bytes(proposed.clone()),
            config: bytes(proposed),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics.is_empty());
    assert!(response.requires_replace);
    assert!(response.changes.iter().any(|c| c.path == "email"));
}

#[tokio::test]
async fn test_unconfigured_create_reports_error() {
    let mut client = start().await;

    let response = client
        .create(CreateRequest {
            resource_type: "singlestoredb_team".to_string(),
            planned_state: bytes(json!({"name": "admins"})),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(response.state.is_empty() || response.state == b"null");
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].severity, Severity::Error as i32);
}
