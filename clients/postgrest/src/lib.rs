//! [`Store`] backed by a PostgREST endpoint (`<store_url>/rest/v1/<table>`).

mod builder;
mod payload;

use async_trait::async_trait;
use derive_more::Constructor;
use log::debug;
use payload::{Contribution, ErrorBody};
use reqwest::{Request, Response, StatusCode};
use std::sync::Arc;
use team_stats::api::{ContributionRecord, NewTeamDeveloper, Store, StoreError, StoreResult, TeamDeveloper};
use thiserror::Error;
use tokio::sync::Mutex;
use tower::util::BoxCloneService;
use tower::ServiceExt;
use url::Url;

pub use builder::PostgrestClientBuilder;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Error(&'static str),
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid store URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Names of the relations the service reads and writes.
#[derive(Clone, Debug, PartialEq, Constructor)]
pub struct Tables {
    pub developers: String,
    pub contributions: String,
    pub repositories: String,
}

impl Default for Tables {
    fn default() -> Self {
        Tables {
            developers: "team_developers".to_string(),
            contributions: "developer_contributions".to_string(),
            repositories: "repositories".to_string(),
        }
    }
}

pub struct PostgrestClient {
    client: reqwest::Client,
    service: Arc<Mutex<BoxCloneService<Request, Response, reqwest::Error>>>,
    base_url: Url,
    tables: Tables,
}

impl PostgrestClient {
    fn table_url(&self, table: &str) -> StoreResult<Url> {
        self.base_url
            .join(table)
            .map_err(|err| StoreError::Other(format!("Invalid table name {}: {}", table, err)))
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> StoreResult<Response> {
        let request = request.build().map_err(|err| StoreError::Other(err.to_string()))?;
        debug!("{} {}", request.method(), request.url());
        let service = self.service.lock().await.clone();
        let response = service.oneshot(request).await.map_err(transport_error)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.json::<ErrorBody>().await.ok();
            Err(classify(status, body))
        }
    }
}

#[async_trait]
impl Store for PostgrestClient {
    async fn list_developers(&self) -> StoreResult<Vec<TeamDeveloper>> {
        let url = self.table_url(&self.tables.developers)?;
        let request = self
            .client
            .get(url)
            .query(&[("select", "*"), ("order", "github_login.asc")]);
        let response = self.execute(request).await?;
        response.json::<Vec<TeamDeveloper>>().await.map_err(decode_error)
    }

    async fn insert_developer(&self, developer: &NewTeamDeveloper) -> StoreResult<TeamDeveloper> {
        let url = self.table_url(&self.tables.developers)?;
        let request = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(developer);
        let response = self.execute(request).await?;
        response
            .json::<Vec<TeamDeveloper>>()
            .await
            .map_err(decode_error)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Other("Insert returned no row".to_string()))
    }

    async fn tracked_contributions(&self, logins: &[String]) -> StoreResult<Vec<ContributionRecord>> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.table_url(&self.tables.contributions)?;
        let select = format!(
            "github_login,repository_id,total_commits,total_additions,total_deletions,\
             first_commit_at,last_commit_at,repository:{}!inner(is_tracked)",
            self.tables.repositories
        );
        let request = self.client.get(url).query(&[
            ("select", select),
            ("github_login", in_filter(logins)),
            ("repository.is_tracked", "eq.true".to_string()),
        ]);
        let response = self.execute(request).await?;
        let contributions = response.json::<Vec<Contribution>>().await.map_err(decode_error)?;
        Ok(contributions.into_iter().map(ContributionRecord::from).collect())
    }
}

/// PostgREST `in` filter with every value double-quoted.
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Other(err.to_string())
    }
}

fn decode_error(err: reqwest::Error) -> StoreError {
    StoreError::Other(format!("Malformed store response: {}", err))
}

/// Maps a failed response onto [`StoreError`] using the Postgres/PostgREST error code when present.
fn classify(status: StatusCode, body: Option<ErrorBody>) -> StoreError {
    let body = body.unwrap_or_default();
    let mut message = body.message.unwrap_or_else(|| status.to_string());
    if let Some(details) = body.details.or(body.hint) {
        message = format!("{} ({})", message, details);
    }
    match body.code.as_deref() {
        // undefined_table, or relation missing from the schema cache
        Some("42P01") | Some("PGRST205") => StoreError::NotFound(message),
        // unique_violation
        Some("23505") => StoreError::ConstraintViolation(message),
        _ => match status {
            StatusCode::CONFLICT => StoreError::ConstraintViolation(message),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                StoreError::Unavailable(message)
            }
            _ => StoreError::Other(format!("{}: {}", status, message)),
        },
    }
}
