//! Console client against a stub `/ajax` backend

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use europa_client::{ClientError, ConsoleClient};
use europa_core::domain::component::ComponentKind;
use europa_core::domain::pipeline::Pipeline;
use europa_core::dto::pipeline::{
    AddComponent, MoveComponent, NewComponent, NewStage, PromoteStage,
};
use europa_core::dto::repo::{CreateLocalRepo, CreateRepoMirror, ListRepoEvents, ListRepoManifests};
use serde_json::{Value, json};

/// One request received by the stub
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    params: HashMap<String, String>,
    body: String,
}

type StubState = Arc<Mutex<Vec<Recorded>>>;

fn pipeline_json() -> Value {
    json!({
        "domain": "d0",
        "id": "d0:p1",
        "name": "release",
        "containerRepoId": "r0",
        "components": [
            { "id": "G" },
            { "id": "A", "destinationContainerRepoDomain": "d0", "destinationContainerRepoId": "r1", "tag": null },
        ],
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": { "code": "BadRequest", "message": message } }))).into_response()
}

async fn ajax(
    State(state): State<StubState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    state.lock().unwrap().push(Recorded {
        method: method.clone(),
        params: params.clone(),
        body,
    });

    match params.get("op").map(String::as_str) {
        Some("ListPipelines") => Json(json!([pipeline_json()])).into_response(),
        Some("GetPipeline") => match params.get("pipelineId").map(String::as_str) {
            Some("d0:p1") => Json(pipeline_json()).into_response(),
            _ => error(StatusCode::NOT_FOUND, "The specified Pipeline was not found"),
        },
        Some("RemovePipeline") => StatusCode::OK.into_response(),
        Some("AddPipelineComponent") | Some("MovePipelineComponent") => {
            Json(pipeline_json()).into_response()
        }
        Some("RunPipelineManualPromotion") => {
            if params.get("destinationTag").map(String::as_str) == Some("latest") {
                error(StatusCode::BAD_REQUEST, "The specified destination tag is not valid")
            } else {
                Json(pipeline_json()).into_response()
            }
        }
        Some("RemovePipelineComponent") => match params.get("pipelineComponentId").map(String::as_str) {
            Some("locked") => error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save pipeline"),
            _ => Json(pipeline_json()).into_response(),
        },
        Some("GetContainerRepo") => match params.get("id").map(String::as_str) {
            Some("r1") => Json(json!({ "id": "r1", "domain": "d0", "name": "app-prod", "local": true }))
                .into_response(),
            _ => error(StatusCode::BAD_REQUEST, "The specified Repository was not found"),
        },
        Some("CreateLocalRepo") | Some("CreateRepoMirror") => Json(json!({
            "id": "r9",
            "domain": "d0",
            "name": params.get("repoName").cloned().unwrap_or_default(),
            "provider": "EUROPA",
            "local": true,
            "mirror": params.contains_key("sourceRepoId"),
        }))
        .into_response(),
        Some("DeleteContainerRepo") => Json(json!({ "success": true })).into_response(),
        Some("ListRepoManifests") => Json(json!({
            "list": [
                { "manifestId": "sha256:abc", "containerRepoId": "r1", "tags": ["v1"],
                  "pushTime": 1500000000000i64, "virtualSize": 1024 },
            ],
            "prev": "m0",
        }))
        .into_response(),
        Some("ListContainerRepos") => Json(json!([
            { "id": "r0", "domain": "d0", "name": "app", "provider": "ECR", "local": false },
            { "id": "r1", "domain": "d0", "name": "app-prod", "provider": "EUROPA", "local": true },
        ]))
        .into_response(),
        Some("ListRepoEvents") => Json(json!({
            "events": [
                { "id": "e1", "repoId": "r0", "eventTime": 1500000000000i64, "eventType": "PUSH",
                  "imageTags": ["v1"], "imageSha": "sha256:abc" },
                { "id": "e2", "repoId": "r0", "eventTime": 1500000001000i64, "eventType": "DELETE" },
            ],
            "nextMarker": "m2",
        }))
        .into_response(),
        _ => error(StatusCode::BAD_REQUEST, "Unsupported operation"),
    }
}

async fn spawn_stub() -> (ConsoleClient, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/ajax", get(ajax).post(ajax))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (ConsoleClient::new(format!("http://{addr}/")), state)
}

fn last(state: &StubState) -> Recorded {
    state.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn test_list_pipelines_classifies_components() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    let pipelines = client.list_pipelines().await?;
    assert_eq!(pipelines.len(), 1);
    let kinds: Vec<_> = pipelines[0].components.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![ComponentKind::ManualPromotionGate, ComponentKind::CopyToRepository]
    );

    let request = last(&state);
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.params["op"], "ListPipelines");
    Ok(())
}

#[tokio::test]
async fn test_missing_pipeline_is_not_found() {
    let (client, _) = spawn_stub().await;

    let err = client.get_pipeline("d0:nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.user_message(), "The specified Pipeline was not found");
}

#[tokio::test]
async fn test_add_component_sends_content_body() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    client
        .add_component(AddComponent {
            pipeline_id: "d0:p1".to_string(),
            component: NewComponent::CopyToRepository(NewStage {
                destination_container_repo_domain: Some("d0".to_string()),
                destination_container_repo_id: Some("r1".to_string()),
                tag: None,
            }),
            before_component_id: Some("A".to_string()),
        })
        .await?;

    let request = last(&state);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.params["type"], "CopyToRepository");
    assert_eq!(request.params["beforeComponentId"], "A");
    let body: Value = serde_json::from_str(&request.body)?;
    assert_eq!(body["destinationContainerRepoId"], "r1");
    assert!(body.as_object().unwrap().contains_key("tag"));
    Ok(())
}

#[tokio::test]
async fn test_move_component_params() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    client
        .move_component(MoveComponent {
            pipeline_id: "d0:p1".to_string(),
            pipeline_component_id: "A".to_string(),
            target_index: 0,
        })
        .await?;

    let request = last(&state);
    assert_eq!(request.params["op"], "MovePipelineComponent");
    assert_eq!(request.params["pipelineComponentId"], "A");
    assert_eq!(request.params["targetIndex"], "0");
    Ok(())
}

#[tokio::test]
async fn test_manual_promotion_rejection_message() {
    let (client, state) = spawn_stub().await;

    let err = client
        .run_manual_promotion(PromoteStage {
            pipeline_id: "d0:p1".to_string(),
            component_id: "A".to_string(),
            source_repo_id: "r0".to_string(),
            source_tag: "sha256:abc".to_string(),
            destination_tag: "latest".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(err.user_message(), "The specified destination tag is not valid");
    assert_eq!(last(&state).params["sourceRepoId"], "r0");
}

#[tokio::test]
async fn test_list_repo_events_paging() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    let page = client.list_repo_events(ListRepoEvents::first_page("r0")).await?;
    assert_eq!(page.events.len(), 2);
    assert!(page.events[0].is_push());
    assert!(!page.events[1].is_push());
    assert_eq!(page.next_marker.as_deref(), Some("m2"));
    assert!(!last(&state).params.contains_key("backward"));

    client
        .list_repo_events(ListRepoEvents {
            repo_id: "r0".to_string(),
            marker: Some("m2".to_string()),
            backward: true,
        })
        .await?;
    let request = last(&state);
    assert_eq!(request.params["marker"], "m2");
    assert_eq!(request.params["backward"], "true");
    Ok(())
}

#[tokio::test]
async fn test_remove_pipeline_and_list_repos() -> anyhow::Result<()> {
    let (client, _) = spawn_stub().await;

    client.remove_pipeline("d0:p1").await?;
    let repos = client.list_repos().await?;
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[1].name, "app-prod");
    Ok(())
}

#[tokio::test]
async fn test_list_repos_uses_container_repo_op() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    client.list_repos().await?;
    let request = last(&state);
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.params["op"], "ListContainerRepos");
    Ok(())
}

#[tokio::test]
async fn test_get_repo() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    let repo = client.get_repo("r1").await?;
    assert_eq!(repo.name, "app-prod");
    assert_eq!(last(&state).params["op"], "GetContainerRepo");

    let err = client.get_repo("r7").await.unwrap_err();
    assert_eq!(err.user_message(), "The specified Repository was not found");
    Ok(())
}

#[tokio::test]
async fn test_create_local_repo_and_mirror() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    let repo = client
        .create_local_repo(CreateLocalRepo {
            repo_name: "app-dev".to_string(),
        })
        .await?;
    assert_eq!(repo.name, "app-dev");
    let request = last(&state);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.params["repoName"], "app-dev");

    let mirror = client
        .create_repo_mirror(CreateRepoMirror {
            repo_name: "app-copy".to_string(),
            source_repo_id: "r0".to_string(),
        })
        .await?;
    assert!(mirror.mirror);
    let request = last(&state);
    assert_eq!(request.params["op"], "CreateRepoMirror");
    assert_eq!(request.params["sourceRepoId"], "r0");
    Ok(())
}

#[tokio::test]
async fn test_invalid_repo_name_is_rejected_locally() {
    let (client, state) = spawn_stub().await;

    let err = client
        .create_local_repo(CreateLocalRepo {
            repo_name: "team/app".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert!(state.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_repo_and_list_manifests() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    client.delete_repo("r1").await?;
    assert_eq!(last(&state).params["id"], "r1");

    let page = client
        .list_repo_manifests(ListRepoManifests {
            repo_id: "r1".to_string(),
            marker: None,
            backward: false,
        })
        .await?;
    assert_eq!(page.manifests.len(), 1);
    assert_eq!(page.manifests[0].tags, vec!["v1"]);
    assert_eq!(page.prev_marker.as_deref(), Some("m0"));
    assert_eq!(page.next_marker, None);
    assert_eq!(last(&state).params["op"], "ListRepoManifests");
    Ok(())
}

fn gated_pipeline(stage_id: &str) -> Pipeline {
    serde_json::from_value(json!({
        "id": "d0:p1",
        "name": "release",
        "containerRepoId": "r0",
        "components": [
            { "id": "G" },
            { "id": stage_id, "destinationContainerRepoId": "r1" },
        ],
    }))
    .unwrap()
}

fn ops(state: &StubState) -> Vec<(String, Option<String>)> {
    state
        .lock()
        .unwrap()
        .iter()
        .map(|r| {
            let target = r
                .params
                .get("pipelineComponentId")
                .or_else(|| r.params.get("beforeComponentId"))
                .cloned();
            (r.params["op"].clone(), target)
        })
        .collect()
}

#[tokio::test]
async fn test_remove_stage_removes_gate_first() -> anyhow::Result<()> {
    let (client, state) = spawn_stub().await;

    client.remove_stage(&gated_pipeline("A"), "A").await?;
    assert_eq!(
        ops(&state),
        vec![
            ("RemovePipelineComponent".to_string(), Some("G".to_string())),
            ("RemovePipelineComponent".to_string(), Some("A".to_string())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_stage_removal_restores_gate() {
    let (client, state) = spawn_stub().await;

    let err = client
        .remove_stage(&gated_pipeline("locked"), "locked")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Failed to save pipeline");
    assert!(err.is_server_error());

    assert_eq!(
        ops(&state),
        vec![
            ("RemovePipelineComponent".to_string(), Some("G".to_string())),
            ("RemovePipelineComponent".to_string(), Some("locked".to_string())),
            ("AddPipelineComponent".to_string(), Some("locked".to_string())),
        ]
    );
    assert_eq!(last(&state).params["type"], "ManualPromotionGate");
}
