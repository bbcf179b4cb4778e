use crate::error::{failure, success, ApiError};
use crate::gateway::credentials;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header::ALLOW;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use log::debug;
use serde_json::json;
use std::sync::Arc;
use team_stats::api::{AccessGateway, RegisterDeveloperRequest, Store, ValidationError};
use team_stats::{HandlerError, TeamDevelopersHandler};

const LIST_FAILED: &str = "Failed to fetch team developers";
const REGISTER_FAILED: &str = "Failed to register team developer";

type SharedHandler<STORE, GATEWAY> = Arc<TeamDevelopersHandler<STORE, GATEWAY>>;

pub fn router<STORE, GATEWAY>(handler: TeamDevelopersHandler<STORE, GATEWAY>) -> Router
where
    STORE: 'static + Store,
    GATEWAY: 'static + AccessGateway,
{
    Router::new()
        .route("/health", get(health).fallback(|| async { method_not_allowed("GET") }))
        .route(
            "/team-developers",
            get(list_developers::<STORE, GATEWAY>)
                .post(register_developer::<STORE, GATEWAY>)
                .fallback(|| async { method_not_allowed("GET, POST") }),
        )
        .fallback(not_found)
        .with_state(Arc::new(handler))
}

type QueryPairs = Vec<(String, String)>;

/// Stats are on unless some `include_stats` value is literally `false`.
fn include_stats(params: &[(String, String)]) -> bool {
    !params
        .iter()
        .any(|(name, value)| name == "include_stats" && value == "false")
}

async fn health() -> Response {
    success(StatusCode::OK, json!({ "status": "ok" }))
}

async fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
}

fn method_not_allowed(allow: &'static str) -> Response {
    let mut response = failure(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        "Method not allowed",
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

async fn list_developers<STORE, GATEWAY>(
    State(handler): State<SharedHandler<STORE, GATEWAY>>,
    headers: HeaderMap,
    params: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Response, ApiError>
where
    STORE: 'static + Store,
    GATEWAY: 'static + AccessGateway,
{
    let credentials = credentials(&headers);
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            handler
                .admit(&credentials)
                .await
                .map_err(|err| ApiError::new(err, LIST_FAILED))?;
            debug!("Rejecting query string: {}", rejection.body_text());
            return Err(ApiError::new(
                HandlerError::Validation(ValidationError::MalformedQuery(rejection.body_text())),
                LIST_FAILED,
            ));
        }
    };
    let developers = handler
        .list(&credentials, include_stats(&params))
        .await
        .map_err(|err| ApiError::new(err, LIST_FAILED))?;
    Ok(success(StatusCode::OK, developers))
}

async fn register_developer<STORE, GATEWAY>(
    State(handler): State<SharedHandler<STORE, GATEWAY>>,
    headers: HeaderMap,
    body: Result<Json<RegisterDeveloperRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    STORE: 'static + Store,
    GATEWAY: 'static + AccessGateway,
{
    let credentials = credentials(&headers);
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            // Authentication still takes precedence over a malformed body.
            handler
                .admit(&credentials)
                .await
                .map_err(|err| ApiError::new(err, REGISTER_FAILED))?;
            debug!("Rejecting registration body: {}", rejection.body_text());
            return Err(ApiError::new(
                HandlerError::Validation(ValidationError::MalformedBody(rejection.body_text())),
                REGISTER_FAILED,
            ));
        }
    };
    let developer = handler
        .register(&credentials, request)
        .await
        .map_err(|err| ApiError::new(err, REGISTER_FAILED))?;
    Ok(success(StatusCode::CREATED, developer))
}

#[test]
fn include_stats_test() {
    let params = |pairs: &[(&str, &str)]| -> QueryPairs {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    };
    assert!(include_stats(&params(&[])));
    assert!(include_stats(&params(&[("include_stats", "true")])));
    assert!(include_stats(&params(&[("include_stats", "FALSE")])));
    assert!(include_stats(&params(&[("include_stats", "0")])));
    assert!(include_stats(&params(&[("other", "false")])));
    assert!(!include_stats(&params(&[("include_stats", "false")])));
    assert!(!include_stats(&params(&[("include_stats", "false"), ("include_stats", "true")])));
}
