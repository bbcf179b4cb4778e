//! Per-request pipeline for the team developers resource.
//!
//! Read: auth check, store readiness check, roster fetch, then optionally stats fetch and aggregation.
//! A failing stats fetch degrades the response to the bare roster instead of failing it.
//!
//! Write: auth check, store readiness check, validation, registration.

use crate::aggregator::aggregate;
use crate::api::{
    AccessGateway, Credentials, RegisterDeveloperRequest, Store, TeamDeveloper, TeamDeveloperWithStats,
    ValidationError,
};
use crate::roster::{RosterError, RosterManager};
use log::{debug, error, warn};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("Admin authentication required")]
    Unauthorized,
    #[error("Storage is not configured")]
    StorageUnavailable,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Developer {0} is already registered")]
    DuplicateRegistration(String),
    #[error("Unexpected failure: {0}")]
    UnexpectedFailure(String),
}

/// Caller-facing classification of a [`HandlerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    StorageUnavailable,
    ValidationError,
    DuplicateRegistration,
    UnexpectedFailure,
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::Unauthorized => ErrorKind::Unauthorized,
            HandlerError::StorageUnavailable => ErrorKind::StorageUnavailable,
            HandlerError::Validation(_) => ErrorKind::ValidationError,
            HandlerError::DuplicateRegistration(_) => ErrorKind::DuplicateRegistration,
            HandlerError::UnexpectedFailure(_) => ErrorKind::UnexpectedFailure,
        }
    }
}

impl From<RosterError> for HandlerError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Validation(err) => HandlerError::Validation(err),
            RosterError::DuplicateRegistration(login) => HandlerError::DuplicateRegistration(login),
            RosterError::Store(err) => HandlerError::UnexpectedFailure(err.to_string()),
        }
    }
}

pub struct TeamDevelopersHandler<STORE, GATEWAY>
where
    STORE: Store,
    GATEWAY: AccessGateway,
{
    store: STORE,
    gateway: GATEWAY,
}

impl<STORE, GATEWAY> TeamDevelopersHandler<STORE, GATEWAY>
where
    STORE: Store,
    GATEWAY: AccessGateway,
{
    pub fn new(store: STORE, gateway: GATEWAY) -> Self {
        TeamDevelopersHandler { store, gateway }
    }

    /// Roster entries, ranked by net lines when `include_stats` is set, otherwise ordered by login.
    pub async fn list(
        &self,
        credentials: &Credentials,
        include_stats: bool,
    ) -> Result<Vec<TeamDeveloperWithStats>, HandlerError> {
        self.admit(credentials).await?;

        let roster = RosterManager::new(&self.store).list().await.map_err(|err| {
            error!("Failed to fetch team developers: {}", err);
            HandlerError::from(err)
        })?;

        if !include_stats || roster.is_empty() {
            return Ok(roster.into_iter().map(TeamDeveloperWithStats::without_stats).collect());
        }

        let logins: Vec<String> = roster.iter().map(|developer| developer.github_login.clone()).collect();
        match self.store.tracked_contributions(&logins).await {
            Ok(records) => {
                debug!("Aggregating {} contribution rows for {} developers", records.len(), logins.len());
                Ok(aggregate(roster, &records))
            }
            Err(err) => {
                warn!("Contribution stats unavailable, returning roster without stats: {}", err);
                Ok(roster.into_iter().map(TeamDeveloperWithStats::without_stats).collect())
            }
        }
    }

    pub async fn register(
        &self,
        credentials: &Credentials,
        request: RegisterDeveloperRequest,
    ) -> Result<TeamDeveloper, HandlerError> {
        self.admit(credentials).await?;

        RosterManager::new(&self.store)
            .register(request)
            .await
            .map_err(|err| {
                if let RosterError::Store(err) = &err {
                    error!("Failed to register team developer: {}", err);
                }
                HandlerError::from(err)
            })
    }

    /// Auth and store readiness checks every operation starts with.
    pub async fn admit(&self, credentials: &Credentials) -> Result<(), HandlerError> {
        if !self.gateway.is_admin_authenticated(credentials).await {
            debug!("Rejecting unauthenticated request");
            return Err(HandlerError::Unauthorized);
        }
        if !self.gateway.is_store_configured().await {
            warn!("Rejecting request, store is not configured");
            return Err(HandlerError::StorageUnavailable);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ContributionRecord, StoreError};
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use derive_more::Constructor;

    const TOKEN: &str = "admin-token";

    #[derive(Constructor)]
    struct FixedGateway {
        store_configured: bool,
    }

    #[async_trait]
    impl AccessGateway for FixedGateway {
        async fn is_admin_authenticated(&self, credentials: &Credentials) -> bool {
            credentials.bearer_token() == Some(TOKEN)
        }

        async fn is_store_configured(&self) -> bool {
            self.store_configured
        }
    }

    fn admin() -> Credentials {
        Credentials::bearer(TOKEN)
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::default();
        for login in ["alice", "bob"] {
            store
                .add_developer(RegisterDeveloperRequest::new(login, "1").validate().unwrap().into())
                .await;
        }
        store
            .add_contribution(ContributionRecord::new("bob".into(), "repoA".into(), 4, 30, 5, None, None, true))
            .await;
        store
    }

    fn handler(store: MemoryStore) -> TeamDevelopersHandler<MemoryStore, FixedGateway> {
        TeamDevelopersHandler::new(store, FixedGateway::new(true))
    }

    #[tokio::test]
    async fn ranks_by_net_lines() {
        let ranked = handler(seeded_store().await).list(&admin(), true).await.unwrap();
        let logins: Vec<&str> = ranked.iter().map(|e| e.developer.github_login.as_str()).collect();
        assert_eq!(logins, vec!["bob", "alice"]);
        assert_eq!(ranked[0].net_lines(), 25);
        assert!(ranked.iter().all(|entry| entry.stats.is_some()));
    }

    #[tokio::test]
    async fn skips_stats_on_request() {
        let roster = handler(seeded_store().await).list(&admin(), false).await.unwrap();
        let logins: Vec<&str> = roster.iter().map(|e| e.developer.github_login.as_str()).collect();
        assert_eq!(logins, vec!["alice", "bob"]);
        assert!(roster.iter().all(|entry| entry.stats.is_none()));
    }

    #[tokio::test]
    async fn degrades_when_stats_fail() {
        let store = seeded_store().await;
        store
            .fail_contributions(StoreError::Other("statement timeout".to_string()))
            .await;
        let roster = handler(store).list(&admin(), true).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.iter().all(|entry| entry.stats.is_none()));
    }

    #[tokio::test]
    async fn rejects_unauthenticated_before_store() {
        let store = MemoryStore::default();
        store.fail_developers(StoreError::Other("must not be reached".into())).await;
        let err = handler(store).list(&Credentials::anonymous(), true).await.unwrap_err();
        assert_eq!(err, HandlerError::Unauthorized);
        assert_eq!(err.kind().to_string(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn rejects_when_store_unconfigured() {
        let handler = TeamDevelopersHandler::new(MemoryStore::default(), FixedGateway::new(false));
        let err = handler
            .register(&admin(), RegisterDeveloperRequest::new("alice", "1"))
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::StorageUnavailable);
        assert_eq!(err.kind().as_ref(), "STORAGE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn missing_schema_reads_empty() {
        let roster = handler(MemoryStore::uninitialized()).list(&admin(), true).await.unwrap();
        assert!(roster.is_empty());
    }

    #[tokio::test]
    async fn roster_failure_is_unexpected() {
        let store = MemoryStore::default();
        store.fail_developers(StoreError::Other("permission denied".into())).await;
        let err = handler(store).list(&admin(), true).await.unwrap_err();
        assert_eq!(err, HandlerError::UnexpectedFailure("Store error: permission denied".to_string()));
    }

    #[tokio::test]
    async fn register_reports_validation_and_conflict() {
        let store = MemoryStore::default();
        let handler = handler(store.clone());

        let err = handler
            .register(&admin(), RegisterDeveloperRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        handler
            .register(&admin(), RegisterDeveloperRequest::new("alice", "1"))
            .await
            .unwrap();
        let err = handler
            .register(&admin(), RegisterDeveloperRequest::new("alice", "1"))
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::DuplicateRegistration("alice".to_string()));
        assert_eq!(store.developers().await.len(), 1);
    }
}
