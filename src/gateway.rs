use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use team_stats::api::{AccessGateway, Credentials};

/// Admits callers presenting the configured admin token as a bearer token.
pub struct AdminGateway {
    admin_token: Option<SecretString>,
    store_configured: bool,
}

impl AdminGateway {
    /// A missing or blank `admin_token` rejects every caller.
    pub fn new(admin_token: Option<SecretString>, store_configured: bool) -> Self {
        let admin_token = admin_token.filter(|token| !token.expose_secret().trim().is_empty());
        AdminGateway {
            admin_token,
            store_configured,
        }
    }
}

#[async_trait]
impl AccessGateway for AdminGateway {
    async fn is_admin_authenticated(&self, credentials: &Credentials) -> bool {
        match (&self.admin_token, credentials.bearer_token()) {
            (Some(expected), Some(presented)) => {
                constant_time_eq(expected.expose_secret().as_bytes(), presented.as_bytes())
            }
            _ => false,
        }
    }

    async fn is_store_configured(&self) -> bool {
        self.store_configured
    }
}

/// Reads `Authorization: Bearer <token>`; any other scheme yields anonymous credentials.
pub fn credentials(headers: &HeaderMap) -> Credentials {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| Credentials::bearer(token.trim()))
        .unwrap_or_else(Credentials::anonymous)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
