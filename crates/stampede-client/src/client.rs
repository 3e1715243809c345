// HTTP client for the target service.
//
// One shared reqwest::Client carries every simulated client's traffic so
// connections are reused under load. Every request has a bounded timeout;
// latency is measured from send to fully-read body, which is what the
// latency registers want.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::types::{ApiEnvelope, Health, Meta, NewPost, NewUser, Post, User};

/// A successful call: the payload plus what the metrics layer wants to know
#[derive(Debug, Clone)]
pub struct ApiResult<T> {
    pub value: T,
    pub meta: Option<Meta>,
    pub latency: Duration,
    pub bytes: u64,
}

impl<T> ApiResult<T> {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1_000.0
    }
}

/// The target's documented contract, as a seam.
///
/// Scenarios and the scheduler depend on this trait, not on TargetClient,
/// so tests can substitute a scripted in-memory fake.
#[async_trait]
pub trait TargetApi: Send + Sync {
    async fn health(&self) -> ClientResult<ApiResult<Health>>;
    async fn list_posts(
        &self,
        page: u32,
        page_size: u32,
        sort_by: Option<&str>,
    ) -> ClientResult<ApiResult<Vec<Post>>>;
    async fn get_post(&self, id: &str) -> ClientResult<ApiResult<Post>>;
    async fn create_post(&self, new_post: &NewPost) -> ClientResult<ApiResult<Post>>;
    async fn view_post(&self, id: &str) -> ClientResult<ApiResult<()>>;
    async fn like_post(&self, id: &str) -> ClientResult<ApiResult<()>>;
    async fn list_users(&self, search: Option<&str>) -> ClientResult<ApiResult<Vec<User>>>;
    async fn create_user(&self, new_user: &NewUser) -> ClientResult<ApiResult<User>>;
}

/// Options for connecting to a target
#[derive(Debug, Clone)]
pub struct TargetOptions {
    pub base_url: String,
    /// Per-request timeout; scenario-local, never run-global
    pub timeout: Duration,
    /// Optional Authorization header value (e.g. "Bearer <token>")
    pub auth_header: Option<String>,
}

impl TargetOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        TargetOptions {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            auth_header: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.auth_header = Some(value.into());
        self
    }
}

/// reqwest-backed implementation of TargetApi
pub struct TargetClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TargetClient {
    pub fn new(options: TargetOptions) -> ClientResult<Self> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let raw = if options.base_url.ends_with('/') {
            options.base_url.clone()
        } else {
            format!("{}/", options.base_url)
        };
        let base_url: Url = raw
            .parse()
            .map_err(|e| ClientError::config(format!("invalid base url {raw:?}: {e}")))?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(auth) = &options.auth_header {
            let value = reqwest::header::HeaderValue::from_str(auth)
                .map_err(|_| ClientError::config("auth header contains invalid characters"))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()?;

        Ok(TargetClient { http, base_url })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::config(format!("invalid path {path:?}: {e}")))
    }

    /// Send a request expecting the standard envelope with a data payload
    async fn expect_data<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> ClientResult<ApiResult<T>> {
        let (body, meta, latency, bytes) = self.envelope(req).await?;
        let value = body.ok_or_else(|| ClientError::envelope("success envelope without data"))?;
        Ok(ApiResult {
            value,
            meta,
            latency,
            bytes,
        })
    }

    /// Send a request where only the success flag matters (view/like)
    async fn expect_ack(&self, req: reqwest::RequestBuilder) -> ClientResult<ApiResult<()>> {
        let (_, meta, latency, bytes) = self
            .envelope::<serde_json::Value>(req)
            .await?;
        Ok(ApiResult {
            value: (),
            meta,
            latency,
            bytes,
        })
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> ClientResult<(Option<T>, Option<Meta>, Duration, u64)> {
        let started = Instant::now();
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let latency = started.elapsed();
        let bytes = body.len() as u64;

        if !status.is_success() {
            // Failure envelopes carry {success: false, error}; fall back to
            // the raw body for anything else.
            let message = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "non-success response");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)
            .map_err(|e| ClientError::envelope(format!("malformed envelope: {e}")))?;
        if !envelope.success {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "envelope flagged failure".to_string()),
            });
        }
        Ok((envelope.data, envelope.meta, latency, bytes))
    }
}

/// Parse a /health body. Some target renditions serve it bare, others wrap
/// it in the standard envelope; accept both.
fn parse_health(body: &[u8]) -> ClientResult<Health> {
    if let Ok(health) = serde_json::from_slice::<Health>(body) {
        return Ok(health);
    }
    let envelope: ApiEnvelope<Health> = serde_json::from_slice(body)
        .map_err(|e| ClientError::envelope(format!("malformed health body: {e}")))?;
    if !envelope.success {
        return Err(ClientError::envelope(
            envelope
                .error
                .unwrap_or_else(|| "health envelope flagged failure".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| ClientError::envelope("health envelope without data"))
}

#[async_trait]
impl TargetApi for TargetClient {
    async fn health(&self) -> ClientResult<ApiResult<Health>> {
        let started = Instant::now();
        let response = self.http.get(self.url("health")?).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let latency = started.elapsed();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        let value = parse_health(&body)?;
        Ok(ApiResult {
            value,
            meta: None,
            latency,
            bytes: body.len() as u64,
        })
    }

    async fn list_posts(
        &self,
        page: u32,
        page_size: u32,
        sort_by: Option<&str>,
    ) -> ClientResult<ApiResult<Vec<Post>>> {
        let mut url = self.url("posts")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            query.append_pair("pageSize", &page_size.to_string());
            if let Some(sort) = sort_by {
                query.append_pair("sortBy", sort);
            }
        }
        self.expect_data(self.http.get(url)).await
    }

    async fn get_post(&self, id: &str) -> ClientResult<ApiResult<Post>> {
        self.expect_data(self.http.get(self.url(&format!("posts/{id}"))?))
            .await
    }

    async fn create_post(&self, new_post: &NewPost) -> ClientResult<ApiResult<Post>> {
        self.expect_data(self.http.post(self.url("posts")?).json(new_post))
            .await
    }

    async fn view_post(&self, id: &str) -> ClientResult<ApiResult<()>> {
        self.expect_ack(self.http.post(self.url(&format!("posts/{id}/view"))?))
            .await
    }

    async fn like_post(&self, id: &str) -> ClientResult<ApiResult<()>> {
        self.expect_ack(self.http.post(self.url(&format!("posts/{id}/like"))?))
            .await
    }

    async fn list_users(&self, search: Option<&str>) -> ClientResult<ApiResult<Vec<User>>> {
        let mut url = self.url("users")?;
        if let Some(search) = search {
            url.query_pairs_mut().append_pair("search", search);
        }
        self.expect_data(self.http.get(url)).await
    }

    async fn create_user(&self, new_user: &NewUser) -> ClientResult<ApiResult<User>> {
        self.expect_data(self.http.post(self.url("users")?).json(new_user))
            .await
    }
}
