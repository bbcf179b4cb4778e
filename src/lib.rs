mod args;
mod error;
mod gateway;
mod routes;

use async_trait::async_trait;
use log::{info, warn};
use postgrest_client::{PostgrestClient, PostgrestClientBuilder, Tables};
use std::time::Duration;
use team_stats::api::{ContributionRecord, NewTeamDeveloper, Store, StoreError, StoreResult, TeamDeveloper};
use team_stats::TeamDevelopersHandler;
use tokio::net::TcpListener;

pub use args::Args;
pub use error::{AppError, Envelope, ErrorBody};
pub use gateway::{credentials, AdminGateway};
pub use routes::router;

/// Store selected from configuration.
pub enum Backend {
    Postgrest(PostgrestClient),
    /// No store URL or API key configured; requests are answered with 503 before reaching it.
    Unconfigured,
}

impl Backend {
    pub fn from_args(args: &Args) -> Result<Backend, AppError> {
        let (url, api_key) = match (&args.store_url, &args.store_api_key) {
            (Some(url), Some(api_key)) => (url, api_key),
            _ => {
                warn!("STORE_URL or STORE_API_KEY not set. Team developer endpoints will answer 503.");
                return Ok(Backend::Unconfigured);
            }
        };
        let tables = Tables::new(
            args.developers_table.clone(),
            args.contributions_table.clone(),
            args.repositories_table.clone(),
        );
        let client = PostgrestClientBuilder::default()
            .with_store_url(url)
            .try_with_api_key(api_key)?
            .with_tables(tables)
            .with_max_requests(args.max_store_req as usize)
            .with_timeout(Duration::from_secs(args.store_timeout_secs))
            .build()?;
        Ok(Backend::Postgrest(client))
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Backend::Postgrest(_))
    }
}

#[async_trait]
impl Store for Backend {
    async fn list_developers(&self) -> StoreResult<Vec<TeamDeveloper>> {
        match self {
            Backend::Postgrest(client) => client.list_developers().await,
            Backend::Unconfigured => Err(unconfigured()),
        }
    }

    async fn insert_developer(&self, developer: &NewTeamDeveloper) -> StoreResult<TeamDeveloper> {
        match self {
            Backend::Postgrest(client) => client.insert_developer(developer).await,
            Backend::Unconfigured => Err(unconfigured()),
        }
    }

    async fn tracked_contributions(&self, logins: &[String]) -> StoreResult<Vec<ContributionRecord>> {
        match self {
            Backend::Postgrest(client) => client.tracked_contributions(logins).await,
            Backend::Unconfigured => Err(unconfigured()),
        }
    }
}

fn unconfigured() -> StoreError {
    StoreError::Unavailable("Store is not configured".to_string())
}

pub fn team_developers_handler(args: Args) -> Result<TeamDevelopersHandler<Backend, AdminGateway>, AppError> {
    let backend = Backend::from_args(&args)?;
    if args.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set. Every team developer request will be rejected as unauthenticated.");
    }
    let gateway = AdminGateway::new(args.admin_token, backend.is_configured());
    Ok(TeamDevelopersHandler::new(backend, gateway))
}

pub async fn serve(args: Args) -> Result<(), AppError> {
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    serve_on(listener, args).await
}

/// Serves on an already bound listener until the process stops.
pub async fn serve_on(listener: TcpListener, args: Args) -> Result<(), AppError> {
    let app = router(team_developers_handler(args)?);
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
