//! In-memory [`Store`] with failure injection, used as a test double and for local runs.

use crate::api::{ContributionRecord, NewTeamDeveloper, Store, StoreError, StoreResult, TeamDeveloper};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const DEVELOPERS_RELATION: &str = "team_developers";

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    /// `None` until the roster relation exists.
    developers: Option<BTreeMap<String, TeamDeveloper>>,
    contributions: Vec<ContributionRecord>,
    developers_failure: Option<StoreError>,
    contributions_failure: Option<StoreError>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let tables = Tables {
            developers: Some(BTreeMap::new()),
            ..Default::default()
        };
        MemoryStore {
            inner: Arc::new(RwLock::new(tables)),
        }
    }
}

impl MemoryStore {
    /// Store whose roster relation has not been created.
    pub fn uninitialized() -> Self {
        MemoryStore {
            inner: Arc::new(RwLock::new(Tables::default())),
        }
    }

    pub async fn add_developer(&self, developer: TeamDeveloper) {
        let mut tables = self.inner.write().await;
        tables
            .developers
            .get_or_insert_with(BTreeMap::new)
            .insert(developer.github_login.clone(), developer);
    }

    pub async fn add_contribution(&self, record: ContributionRecord) {
        self.inner.write().await.contributions.push(record);
    }

    /// Every roster read and write fails with `error` from now on.
    pub async fn fail_developers(&self, error: StoreError) {
        self.inner.write().await.developers_failure = Some(error);
    }

    /// Every contribution read fails with `error` from now on.
    pub async fn fail_contributions(&self, error: StoreError) {
        self.inner.write().await.contributions_failure = Some(error);
    }

    pub async fn developers(&self) -> Vec<TeamDeveloper> {
        let tables = self.inner.read().await;
        tables
            .developers
            .as_ref()
            .map(|developers| developers.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_developers(&self) -> StoreResult<Vec<TeamDeveloper>> {
        let tables = self.inner.read().await;
        if let Some(err) = &tables.developers_failure {
            return Err(err.clone());
        }
        tables
            .developers
            .as_ref()
            .map(|developers| developers.values().cloned().collect())
            .ok_or_else(|| StoreError::NotFound(DEVELOPERS_RELATION.to_string()))
    }

    async fn insert_developer(&self, developer: &NewTeamDeveloper) -> StoreResult<TeamDeveloper> {
        let mut tables = self.inner.write().await;
        if let Some(err) = &tables.developers_failure {
            return Err(err.clone());
        }
        let developers = tables
            .developers
            .as_mut()
            .ok_or_else(|| StoreError::NotFound(DEVELOPERS_RELATION.to_string()))?;
        if developers.contains_key(developer.github_login()) {
            return Err(StoreError::ConstraintViolation(format!(
                "duplicate key value violates unique constraint \"{}_github_login_key\"",
                DEVELOPERS_RELATION
            )));
        }
        let created = TeamDeveloper::from(developer.clone());
        developers.insert(created.github_login.clone(), created.clone());
        Ok(created)
    }

    async fn tracked_contributions(&self, logins: &[String]) -> StoreResult<Vec<ContributionRecord>> {
        let tables = self.inner.read().await;
        if let Some(err) = &tables.contributions_failure {
            return Err(err.clone());
        }
        Ok(tables
            .contributions
            .iter()
            .filter(|record| record.is_tracked && logins.contains(&record.github_login))
            .cloned()
            .collect())
    }
}
