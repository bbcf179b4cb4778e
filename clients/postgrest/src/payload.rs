use chrono::{DateTime, Utc};
use serde::Deserialize;
use team_stats::api::ContributionRecord;

/// Error body PostgREST sends with non-2xx responses.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Contribution {
    pub github_login: String,
    pub repository_id: RepositoryId,
    #[serde(default)]
    pub total_commits: Option<u64>,
    #[serde(default)]
    pub total_additions: Option<u64>,
    #[serde(default)]
    pub total_deletions: Option<u64>,
    #[serde(default)]
    pub first_commit_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_commit_at: Option<DateTime<Utc>>,
    pub repository: Repository,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RepositoryId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize, Debug)]
pub struct Repository {
    pub is_tracked: bool,
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        match id {
            RepositoryId::Text(id) => id,
            RepositoryId::Number(id) => id.to_string(),
        }
    }
}

impl From<Contribution> for ContributionRecord {
    fn from(contribution: Contribution) -> Self {
        ContributionRecord {
            github_login: contribution.github_login,
            repository_id: contribution.repository_id.into(),
            total_commits: contribution.total_commits.unwrap_or_default(),
            total_additions: contribution.total_additions.unwrap_or_default(),
            total_deletions: contribution.total_deletions.unwrap_or_default(),
            first_commit_at: contribution.first_commit_at,
            last_commit_at: contribution.last_commit_at,
            is_tracked: contribution.repository.is_tracked,
        }
    }
}
