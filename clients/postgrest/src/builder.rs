use crate::{Error, PostgrestClient, Result, Tables};
use log::debug;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::util::BoxCloneService;
use tower::{service_fn, ServiceBuilder};
use url::Url;

pub struct PostgrestClientBuilder {
    client_builder: ClientBuilder,
    store_url: Option<String>,
    headers: HeaderMap,
    tables: Tables,
    max_requests: usize,
    timeout: Duration,
}

impl Default for PostgrestClientBuilder {
    fn default() -> Self {
        let mut headers = HeaderMap::default();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            client_builder: ClientBuilder::default(),
            store_url: None,
            headers,
            tables: Tables::default(),
            max_requests: 10,
            timeout: Duration::from_secs(10),
        }
    }
}

impl PostgrestClientBuilder {
    /// Service key sent both as `apikey` and as bearer token.
    pub fn try_with_api_key(self, api_key: &SecretString) -> Result<PostgrestClientBuilder> {
        let bearer = format!("Bearer {}", api_key.expose_secret());
        Ok(self
            .try_with_header(HeaderName::from_static("apikey"), api_key.expose_secret())?
            .try_with_header(header::AUTHORIZATION, bearer)?)
    }

    pub fn with_store_url<STR: AsRef<str>>(mut self, url: STR) -> PostgrestClientBuilder {
        self.store_url = Some(url.as_ref().to_string());
        self
    }

    pub fn with_tables(mut self, tables: Tables) -> PostgrestClientBuilder {
        self.tables = tables;
        self
    }

    /// Maximal number of store requests in flight at once.
    pub fn with_max_requests(mut self, max_requests: usize) -> PostgrestClientBuilder {
        self.max_requests = max_requests;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> PostgrestClientBuilder {
        self.timeout = timeout;
        self
    }

    fn try_with_header(mut self, key: HeaderName, val: impl AsRef<str>) -> anyhow::Result<PostgrestClientBuilder> {
        let mut val = HeaderValue::from_str(val.as_ref())?;
        val.set_sensitive(true);
        self.headers.insert(key, val);
        Ok(self)
    }

    pub fn build(self) -> Result<PostgrestClient> {
        let mut store_url = self.store_url.ok_or(Error::Error("Store URL not set."))?;
        if self.max_requests == 0 {
            return Err(Error::Error("Store request limit must be positive."));
        }
        // Relative joins must append to the path, not replace its last segment.
        if !store_url.ends_with('/') {
            store_url.push('/');
        }
        let base_url = Url::parse(&store_url)?.join("rest/v1/")?;
        let client = self
            .client_builder
            .default_headers(self.headers)
            .timeout(self.timeout)
            .build()?;
        debug!("Store client for {} limited to {} parallel requests", base_url, self.max_requests);
        let service = limited_service(client.clone(), self.max_requests);
        Ok(PostgrestClient {
            client,
            service: Arc::new(Mutex::new(service)),
            base_url,
            tables: self.tables,
        })
    }
}

fn limited_service(
    client: reqwest::Client,
    max_requests: usize,
) -> BoxCloneService<reqwest::Request, reqwest::Response, reqwest::Error> {
    let service = ServiceBuilder::new()
        .concurrency_limit(max_requests)
        .service(service_fn(move |request: reqwest::Request| {
            let client = client.clone();
            async move { client.execute(request).await }
        }));
    BoxCloneService::new(service)
}
