use crate::api::{RegisterDeveloperRequest, Store, StoreError, TeamDeveloper, ValidationError};
use log::{debug, info};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RosterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Developer {0} is already registered")]
    DuplicateRegistration(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reads and registers roster entries.
pub struct RosterManager<'a, STORE: Store> {
    store: &'a STORE,
}

impl<'a, STORE: Store> RosterManager<'a, STORE> {
    pub fn new(store: &'a STORE) -> Self {
        RosterManager { store }
    }

    /// Roster ordered by `github_login`. A roster table that does not exist yet reads as empty.
    pub async fn list(&self) -> Result<Vec<TeamDeveloper>, RosterError> {
        match self.store.list_developers().await {
            Ok(mut developers) => {
                developers.sort_by(|a, b| a.github_login.cmp(&b.github_login));
                debug!("Fetched {} team developers", developers.len());
                Ok(developers)
            }
            Err(StoreError::NotFound(relation)) => {
                debug!("Roster relation {} not initialized. Returning empty roster.", relation);
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Uniqueness is left to the store constraint; there is no existence pre-check.
    pub async fn register(&self, request: RegisterDeveloperRequest) -> Result<TeamDeveloper, RosterError> {
        let developer = request.validate()?;
        match self.store.insert_developer(&developer).await {
            Ok(created) => {
                info!("Registered team developer {}", created.github_login);
                Ok(created)
            }
            Err(StoreError::ConstraintViolation(_)) => Err(RosterError::DuplicateRegistration(
                developer.github_login().to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }
}
