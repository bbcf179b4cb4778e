use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Failure reported by a [`Store`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Relation (table) does not exist yet.
    #[error("Relation not found: {0}")]
    NotFound(String),
    /// Unique constraint rejected the write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("Malformed query string: {0}")]
    MalformedQuery(String),
}

/// Roster entry as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDeveloper {
    pub github_login: String,
    #[serde(deserialize_with = "string_or_number")]
    pub github_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, rename = "user_profile_id")]
    pub linked_profile_id: Option<String>,
    #[serde(default)]
    pub designated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert contract for the roster table.
///
/// Only obtainable through [`RegisterDeveloperRequest::validate`], so `github_login` and `github_id` are never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTeamDeveloper {
    github_login: String,
    github_id: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    #[serde(rename = "user_profile_id")]
    linked_profile_id: Option<String>,
    designated_by: Option<String>,
}

impl NewTeamDeveloper {
    pub fn github_login(&self) -> &str {
        &self.github_login
    }

    pub fn github_id(&self) -> &str {
        &self.github_id
    }
}

impl From<NewTeamDeveloper> for TeamDeveloper {
    fn from(developer: NewTeamDeveloper) -> Self {
        TeamDeveloper {
            github_login: developer.github_login,
            github_id: developer.github_id,
            display_name: developer.display_name,
            avatar_url: developer.avatar_url,
            linked_profile_id: developer.linked_profile_id,
            designated_by: developer.designated_by,
            created_at: None,
        }
    }
}

/// Registration payload as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegisterDeveloperRequest {
    #[serde(default)]
    pub github_login: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub github_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub user_profile_id: Option<String>,
    #[serde(default)]
    pub designated_by: Option<String>,
}

impl RegisterDeveloperRequest {
    pub fn new(github_login: impl Into<String>, github_id: impl Into<String>) -> Self {
        RegisterDeveloperRequest {
            github_login: Some(github_login.into()),
            github_id: Some(github_id.into()),
            ..Default::default()
        }
    }

    pub fn validate(self) -> Result<NewTeamDeveloper, ValidationError> {
        let github_login = non_blank(self.github_login);
        let github_id = non_blank(self.github_id);
        match (github_login, github_id) {
            (Some(github_login), Some(github_id)) => Ok(NewTeamDeveloper {
                github_login,
                github_id,
                display_name: non_blank(self.display_name),
                avatar_url: non_blank(self.avatar_url),
                linked_profile_id: non_blank(self.user_profile_id),
                designated_by: non_blank(self.designated_by),
            }),
            (github_login, github_id) => {
                let mut missing = Vec::new();
                if github_login.is_none() {
                    missing.push("github_login");
                }
                if github_id.is_none() {
                    missing.push("github_id");
                }
                Err(ValidationError::MissingFields(missing))
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Contribution of one developer to one repository.
#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct ContributionRecord {
    pub github_login: String,
    pub repository_id: String,
    pub total_commits: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub first_commit_at: Option<DateTime<Utc>>,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub is_tracked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedDeveloperStats {
    pub total_commits: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub net_lines: i64,
    pub repositories_count: u64,
    pub first_commit_at: Option<DateTime<Utc>>,
    pub last_commit_at: Option<DateTime<Utc>>,
}

/// Roster entry with its derived stats flattened in; stats fields are absent when not computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamDeveloperWithStats {
    #[serde(flatten)]
    pub developer: TeamDeveloper,
    #[serde(flatten)]
    pub stats: Option<AggregatedDeveloperStats>,
}

impl TeamDeveloperWithStats {
    pub fn without_stats(developer: TeamDeveloper) -> Self {
        TeamDeveloperWithStats { developer, stats: None }
    }

    pub fn net_lines(&self) -> i64 {
        self.stats.as_ref().map(|stats| stats.net_lines).unwrap_or_default()
    }
}

/// What a caller presented to prove who they are.
#[derive(Clone)]
pub struct Credentials {
    bearer_token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Credentials { bearer_token: None }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials {
            bearer_token: Some(token.into()),
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = self.bearer_token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Credentials").field("bearer_token", &token).finish()
    }
}

/// Persistent store holding the roster and contribution rows.
#[async_trait]
pub trait Store: Send + Sync {
    /// All roster rows, ordered by `github_login` ascending.
    async fn list_developers(&self) -> StoreResult<Vec<TeamDeveloper>>;

    /// Inserts a roster row. A second row for the same login fails with [`StoreError::ConstraintViolation`].
    async fn insert_developer(&self, developer: &NewTeamDeveloper) -> StoreResult<TeamDeveloper>;

    /// Contribution rows of the given logins in tracked repositories.
    async fn tracked_contributions(&self, logins: &[String]) -> StoreResult<Vec<ContributionRecord>>;
}

#[async_trait]
pub trait AccessGateway: Send + Sync {
    async fn is_admin_authenticated(&self, credentials: &Credentials) -> bool;

    async fn is_store_configured(&self) -> bool;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(value) => value,
            StringOrNumber::Signed(value) => value.to_string(),
            StringOrNumber::Unsigned(value) => value.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|value| value.map(String::from))
}

#[test]
fn validate_trims_and_drops_blank_optionals() {
    let request = RegisterDeveloperRequest {
        github_login: Some("  alice ".to_string()),
        github_id: Some("42".to_string()),
        display_name: Some("   ".to_string()),
        avatar_url: Some("https://avatars.example/alice".to_string()),
        ..Default::default()
    };
    let developer = request.validate().unwrap();
    assert_eq!(developer.github_login(), "alice");
    assert_eq!(developer.github_id(), "42");
    assert_eq!(developer.display_name, None);
    assert_eq!(developer.avatar_url.as_deref(), Some("https://avatars.example/alice"));
}

#[test]
fn validate_reports_every_missing_field() {
    let err = RegisterDeveloperRequest {
        github_login: Some("".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!(err, ValidationError::MissingFields(vec!["github_login", "github_id"]));
    assert_eq!(err.to_string(), "Missing required fields: github_login, github_id");
}

#[test]
fn github_id_accepts_numbers() {
    let request: RegisterDeveloperRequest =
        serde_json::from_str(r#"{ "github_login": "bob", "github_id": 583231 }"#).unwrap();
    assert_eq!(request.github_id.as_deref(), Some("583231"));

    let developer: TeamDeveloper = serde_json::from_str(r#"{ "github_login": "bob", "github_id": 583231 }"#).unwrap();
    assert_eq!(developer.github_id, "583231");
    assert_eq!(developer.linked_profile_id, None);
}

#[test]
fn stats_fields_absent_without_stats() {
    let developer = RegisterDeveloperRequest::new("carol", "7").validate().unwrap();
    let entry = TeamDeveloperWithStats::without_stats(developer.into());
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["github_login"], "carol");
    assert_eq!(json["user_profile_id"], serde_json::Value::Null);
    assert!(json.get("net_lines").is_none());
    assert!(json.get("total_commits").is_none());
}

#[test]
fn credentials_debug_hides_token() {
    let credentials = Credentials::bearer("s3cr3t");
    assert!(!format!("{:?}", credentials).contains("s3cr3t"));
}
