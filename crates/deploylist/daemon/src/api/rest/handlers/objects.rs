//! Declared object handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use deploylist_types::{ListGithubDeployments, ObjectKey};
use serde::Serialize;

/// List all objects
pub async fn list_objects(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ListGithubDeployments>>> {
    let objects = state.store.list().await?;
    Ok(Json(objects))
}

/// Get a specific object
pub async fn get_object(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<ListGithubDeployments>> {
    let key = ObjectKey::new(namespace, name);
    let object = state
        .store
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Object {} not found", key)))?;

    Ok(Json(object))
}

/// Create or update an object and reconcile it right away
pub async fn apply_object(
    State(state): State<AppState>,
    Json(object): Json<ListGithubDeployments>,
) -> ApiResult<Json<ListGithubDeployments>> {
    let kind = ListGithubDeployments::object_kind();
    if !kind.matches(&object.api_version, &object.kind) {
        return Err(ApiError::BadRequest(format!(
            "Expected {}, got {}/{}",
            kind, object.api_version, object.kind
        )));
    }
    if object.metadata.name.is_empty() || object.metadata.namespace.is_empty() {
        return Err(ApiError::BadRequest(
            "metadata.name and metadata.namespace are required".to_string(),
        ));
    }

    let stored = state.store.apply(object).await?;
    let key = stored.key();
    state.scheduler.trigger(&key).await;

    tracing::info!(
        object = %key,
        generation = stored.metadata.generation,
        "Applied object"
    );

    Ok(Json(stored))
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Delete an object and stop its worker
pub async fn delete_object(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let key = ObjectKey::new(namespace, name);
    let deleted = state.store.delete(&key).await?;
    state.scheduler.forget(&key).await;

    if deleted {
        tracing::info!(object = %key, "Deleted object");
    }

    Ok(Json(DeleteResponse { deleted }))
}

/// Trigger response
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub triggered: bool,
}

/// Schedule an immediate reconcile of an object
pub async fn trigger_reconcile(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    let key = ObjectKey::new(namespace, name);
    if state.store.get(&key).await?.is_none() {
        return Err(ApiError::NotFound(format!("Object {} not found", key)));
    }

    let triggered = state.scheduler.trigger(&key).await;
    Ok((StatusCode::ACCEPTED, Json(TriggerResponse { triggered })))
}

#[cfg(test)]
mod tests {
    use crate::api::rest::{create_router, AppState};
    use crate::config::SchedulerConfig;
    use crate::scheduler::Scheduler;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use deploylist_controller::testing::{deployment, ScriptedLister, StaticListerFactory};
    use deploylist_controller::{InMemoryObjectStore, InMemorySecrets, ObjectStore, Reconciler};
    use deploylist_types::ListGithubDeployments;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<InMemoryObjectStore>, Arc<ScriptedLister>) {
        let store = Arc::new(InMemoryObjectStore::new());
        let lister = Arc::new(ScriptedLister::new((1..=2).map(deployment).collect()));
        let reconciler = Arc::new(Reconciler::new(
            ListGithubDeployments::object_kind(),
            store.clone(),
            Arc::new(InMemorySecrets::new()),
            Arc::new(StaticListerFactory::new(lister.clone())),
        ));
        let scheduler = Scheduler::new(SchedulerConfig::default(), reconciler);
        let state = AppState::new(store.clone(), scheduler);
        (create_router(state, true), store, lister)
    }

    fn manifest(name: &str) -> Value {
        json!({
            "apiVersion": "templates.deploylist.dev/v1alpha1",
            "kind": "ListGithubDeployments",
            "metadata": {"name": name, "namespace": "ci"},
            "spec": {"owner": "acme", "repo": name, "interval": "1h"}
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _) = app();
        let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["workers"], 0);
    }

    #[tokio::test]
    async fn test_apply_get_and_list() {
        let (app, store, lister) = app();

        let (status, body) = send(&app, Method::POST, "/api/v1/objects", Some(manifest("shop"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["generation"], 1);

        // The applied object is reconciled in the background
        let key = deploylist_types::ObjectKey::new("ci", "shop");
        for _ in 0..200 {
            if store.get(&key).await.unwrap().is_some_and(|o| o.status.ready().is_some()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(lister.call_count(), 1);

        let (status, body) = send(&app, Method::GET, "/api/v1/objects/ci/shop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["status"]["conditions"][0]["type"], "Ready");

        let (status, body) = send(&app, Method::GET, "/api/v1/objects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let (app, _, _) = app();
        let (status, body) = send(&app, Method::GET, "/api/v1/objects/ci/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_apply_rejects_invalid_objects() {
        let (app, _, _) = app();

        let mut wrong_kind = manifest("shop");
        wrong_kind["kind"] = json!("ListGithubReleases");
        let (status, _) = send(&app, Method::POST, "/api/v1/objects", Some(wrong_kind)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut empty_owner = manifest("shop");
        empty_owner["spec"]["owner"] = json!("");
        let (status, body) = send(&app, Method::POST, "/api/v1/objects", Some(empty_owner)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_trigger_and_delete() {
        let (app, store, _) = app();
        store
            .apply(serde_json::from_value(manifest("shop")).unwrap())
            .await
            .unwrap();

        let (status, body) = send(&app, Method::POST, "/api/v1/objects/ci/shop/reconcile", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["triggered"], true);

        let (status, _) = send(&app, Method::POST, "/api/v1/objects/ci/ghost/reconcile", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::DELETE, "/api/v1/objects/ci/shop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);

        let (_, body) = send(&app, Method::DELETE, "/api/v1/objects/ci/shop", None).await;
        assert_eq!(body["deleted"], false);
    }
}
