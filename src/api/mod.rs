// REST endpoints for the lifecycle console

use axum::{
    Extension, Router,
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use http::{HeaderValue, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::auth::{AUTH_REALM, AuthExtractor, ConsoleUser};
use crate::error::LifecycleError;
use crate::operate::JobOperateApi;
use crate::registry::SharedRegistry;
use crate::statistics::{
    JobBriefInfo, JobStatisticsApi, ServerBriefInfo, ServerStatisticsApi, ShardingInfo,
    ShardingStatisticsApi,
};

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Everything the console handlers need.
#[derive(Clone)]
pub struct ConsoleState {
    pub operator: JobOperateApi,
    pub jobs: JobStatisticsApi,
    pub sharding: ShardingStatisticsApi,
    pub servers: ServerStatisticsApi,
    pub auth: Arc<AuthExtractor>,
}

impl ConsoleState {
    pub fn new(registry: SharedRegistry, auth: AuthExtractor) -> Self {
        Self {
            operator: JobOperateApi::new(registry.clone()),
            jobs: JobStatisticsApi::new(registry.clone()),
            sharding: ShardingStatisticsApi::new(registry.clone()),
            servers: ServerStatisticsApi::new(registry),
            auth: Arc::new(auth),
        }
    }
}

pub fn create_console_router(state: ConsoleState) -> Router {
    let servers = Router::new()
        .route("/api/servers/count", get(get_servers_total_count))
        .route("/api/servers", get(get_all_servers_brief_info))
        .route("/api/servers/{server_ip}", delete(remove_server))
        .route(
            "/api/servers/{server_ip}/disable",
            post(disable_server).delete(enable_server),
        )
        .route("/api/servers/{server_ip}/shutdown", post(shutdown_server))
        .route("/api/servers/{server_ip}/jobs", get(get_server_jobs))
        .route(
            "/api/servers/{server_ip}/jobs/{job_name}",
            delete(remove_server_job),
        )
        .route(
            "/api/servers/{server_ip}/jobs/{job_name}/disable",
            post(disable_server_job).delete(enable_server_job),
        )
        .route(
            "/api/servers/{server_ip}/jobs/{job_name}/shutdown",
            post(shutdown_server_job),
        );

    let jobs = Router::new()
        .route("/api/jobs/count", get(get_jobs_total_count))
        .route("/api/jobs", get(get_all_jobs_brief_info))
        .route("/api/jobs/{job_name}", get(get_job_brief_info).delete(remove_job))
        .route("/api/jobs/{job_name}/sharding", get(get_sharding_info))
        .route("/api/jobs/{job_name}/trigger", post(trigger_job))
        .route("/api/jobs/{job_name}/disable", post(disable_job).delete(enable_job))
        .route("/api/jobs/{job_name}/shutdown", post(shutdown_job));

    let protected = servers
        .merge(jobs)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn require_auth(State(state): State<ConsoleState>, mut request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.auth.authenticate(authorization) {
        Ok(user) => {
            let identify = HeaderValue::from_str(user.username()).ok();
            request.extensions_mut().insert(user);
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(header::PRAGMA, HeaderValue::from_static("No-cache"));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert(header::EXPIRES, HeaderValue::from_static(EXPIRED));
            if let Some(identify) = identify {
                headers.insert("identify", identify);
            }
            response
        }
        Err(e) => {
            debug!("Rejected console request: {}", e);
            let challenge = format!("Basic realm=\"{}\"", AUTH_REALM);
            let mut response = StatusCode::UNAUTHORIZED.into_response();
            let headers = response.headers_mut();
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert(header::EXPIRES, HeaderValue::from_static(EXPIRED));
            if let Ok(challenge) = HeaderValue::from_str(&challenge) {
                headers.insert(header::WWW_AUTHENTICATE, challenge);
            }
            response
        }
    }
}

fn to_status(e: LifecycleError) -> StatusCode {
    if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!("Console request failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

// A user with an empty name gets empty answers and no-op mutations.

async fn get_servers_total_count(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
) -> Result<Json<usize>, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(Json(0));
    };
    let count = state
        .servers
        .get_servers_total_count(Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(Json(count))
}

async fn get_all_servers_brief_info(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
) -> Result<Json<Vec<ServerBriefInfo>>, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(Json(Vec::new()));
    };
    let infos = state
        .servers
        .get_all_servers_brief_info(Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(Json(infos))
}

async fn get_server_jobs(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(server_ip): Path<String>,
) -> Result<Json<Vec<JobBriefInfo>>, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(Json(Vec::new()));
    };
    let infos = state
        .jobs
        .get_jobs_brief_info(&server_ip, Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(Json(infos))
}

/// Fan-out mutation requested through the console.
#[derive(Debug, Clone, Copy)]
enum Operation {
    Disable,
    Enable,
    Shutdown,
    Remove,
}

async fn operate(
    state: &ConsoleState,
    user: &ConsoleUser,
    operation: Operation,
    job: Option<&str>,
    server: Option<&str>,
) -> Result<StatusCode, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(StatusCode::NO_CONTENT);
    };
    let operator = &state.operator;
    let tenant = Some(tenant);
    match operation {
        Operation::Disable => operator.disable(job, server, tenant).await,
        Operation::Enable => operator.enable(job, server, tenant).await,
        Operation::Shutdown => operator.shutdown(job, server, tenant).await,
        Operation::Remove => operator.remove(job, server, tenant).await,
    }
    .map_err(to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn disable_server(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(server_ip): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Disable, None, Some(&server_ip)).await
}

async fn enable_server(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(server_ip): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Enable, None, Some(&server_ip)).await
}

async fn shutdown_server(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(server_ip): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Shutdown, None, Some(&server_ip)).await
}

async fn remove_server(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(server_ip): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Remove, None, Some(&server_ip)).await
}

async fn disable_server_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path((server_ip, job_name)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Disable, Some(&job_name), Some(&server_ip)).await
}

async fn enable_server_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path((server_ip, job_name)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Enable, Some(&job_name), Some(&server_ip)).await
}

async fn shutdown_server_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path((server_ip, job_name)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Shutdown, Some(&job_name), Some(&server_ip)).await
}

async fn remove_server_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path((server_ip, job_name)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Remove, Some(&job_name), Some(&server_ip)).await
}

async fn get_jobs_total_count(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
) -> Result<Json<usize>, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(Json(0));
    };
    let count = state
        .jobs
        .get_jobs_total_count(Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(Json(count))
}

async fn get_all_jobs_brief_info(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
) -> Result<Json<Vec<JobBriefInfo>>, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(Json(Vec::new()));
    };
    let infos = state
        .jobs
        .get_all_jobs_brief_info(Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(Json(infos))
}

async fn get_job_brief_info(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<Json<JobBriefInfo>, StatusCode> {
    let tenant = user.tenant().ok_or(StatusCode::NOT_FOUND)?;
    state
        .jobs
        .get_job_brief_info(&job_name, Some(tenant))
        .await
        .map_err(to_status)?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_sharding_info(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<Json<Vec<ShardingInfo>>, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(Json(Vec::new()));
    };
    let infos = state
        .sharding
        .get_sharding_info(&job_name, Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(Json(infos))
}

async fn trigger_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let Some(tenant) = user.tenant() else {
        return Ok(StatusCode::NO_CONTENT);
    };
    state
        .operator
        .trigger(&job_name, Some(tenant))
        .await
        .map_err(to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn disable_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Disable, Some(&job_name), None).await
}

async fn enable_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Enable, Some(&job_name), None).await
}

async fn shutdown_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Shutdown, Some(&job_name), None).await
}

async fn remove_job(
    State(state): State<ConsoleState>,
    Extension(user): Extension<ConsoleUser>,
    Path(job_name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    operate(&state, &user, Operation::Remove, Some(&job_name), None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use tower::ServiceExt;

    use crate::auth::{Account, AuthConfig};
    use crate::registry::{MemoryRegistry, RegistryCenter};
    use crate::testing::{add_instance, add_job, add_server, shared};

    fn router(registry: &MemoryRegistry) -> Router {
        let config = AuthConfig {
            accounts: vec![Account::new("alice", "pw")],
            ..Default::default()
        };
        create_console_router(ConsoleState::new(shared(registry), AuthExtractor::new(&config)))
    }

    fn request(method: &str, uri: &str, credentials: Option<&str>) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(credentials) = credentials {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(credentials)),
            );
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let registry = MemoryRegistry::new();
        let response = router(&registry)
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unauthenticated_request_is_challenged() {
        let registry = MemoryRegistry::new();
        let response = router(&registry)
            .oneshot(request("GET", "/api/jobs", Some("alice:wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"Job Lifecycle Console\""
        );
    }

    #[tokio::test]
    async fn test_jobs_are_scoped_to_user() {
        let registry = MemoryRegistry::new();
        add_job(&registry, Some("alice"), "mine").await;
        add_job(&registry, Some("root"), "theirs").await;

        let response = router(&registry)
            .oneshot(request("GET", "/api/jobs", Some("alice:pw")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["identify"], "alice");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let body = json_body(response).await;
        let jobs = body.as_array().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0]["jobName"], "mine");
        assert_eq!(jobs[0]["status"], "CRASHED");
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let registry = MemoryRegistry::new();
        let response = router(&registry)
            .oneshot(request("GET", "/api/jobs/ghost", Some("alice:pw")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_disable_server_job_and_list() {
        let registry = MemoryRegistry::new();
        add_job(&registry, Some("alice"), "a").await;
        add_server(&registry, Some("alice"), "a", "10.0.0.1", "").await;
        add_instance(&registry, Some("alice"), "a", "10.0.0.1@-@7").await;

        let response = router(&registry)
            .oneshot(request(
                "POST",
                "/api/servers/10.0.0.1/jobs/a/disable",
                Some("alice:pw"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            registry.get("/alice/a/servers/10.0.0.1").await.unwrap(),
            Some("DISABLED".to_string())
        );

        let response = router(&registry)
            .oneshot(request("GET", "/api/servers/10.0.0.1/jobs", Some("alice:pw")))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body[0]["status"], "DISABLED");
        assert_eq!(body[0]["instanceCount"], 1);
    }

    #[tokio::test]
    async fn test_remove_server() {
        let registry = MemoryRegistry::new();
        add_server(&registry, Some("alice"), "a", "10.0.0.1", "").await;
        add_instance(&registry, Some("alice"), "a", "10.0.0.1@-@7").await;

        let response = router(&registry)
            .oneshot(request("DELETE", "/api/servers/10.0.0.1", Some("alice:pw")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!registry.is_existed("/alice/a/servers/10.0.0.1").await.unwrap());
        assert!(!registry.is_existed("/alice/a/instances/10.0.0.1@-@7").await.unwrap());
    }

    #[tokio::test]
    async fn test_server_count() {
        let registry = MemoryRegistry::new();
        add_server(&registry, Some("alice"), "a", "10.0.0.1", "").await;
        add_server(&registry, Some("alice"), "b", "10.0.0.2", "").await;

        let response = router(&registry)
            .oneshot(request("GET", "/api/servers/count", Some("alice:pw")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_trigger_job() {
        let registry = MemoryRegistry::new();
        add_instance(&registry, Some("alice"), "a", "10.0.0.1@-@7").await;

        let response = router(&registry)
            .oneshot(request("POST", "/api/jobs/a/trigger", Some("alice:pw")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            registry.get("/alice/a/instances/10.0.0.1@-@7").await.unwrap(),
            Some("TRIGGER".to_string())
        );
    }
}
