// Scripted in-memory target for tests and examples.
//
// Implements TargetApi without a network: configurable latency, forced
// failures, corrupted reads, and an adjustable heap figure. Latency is
// reported as configured rather than measured, which keeps assertions
// deterministic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stampede_client::{
    ApiResult, ClientError, ClientResult, Health, MemoryInfo, NewPost, NewUser, Post, TargetApi,
    User,
};

#[derive(Debug)]
struct Inner {
    latency_micros: AtomicU64,
    fail_all: AtomicBool,
    corrupt_reads: AtomicBool,
    heap_used_bytes: AtomicU64,
    posts: Mutex<HashMap<String, Post>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Fake target service. Cloning shares the same underlying state, so tests
/// can keep a handle for mid-run adjustments.
#[derive(Debug, Clone)]
pub struct FakeTarget {
    inner: Arc<Inner>,
}

impl Default for FakeTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTarget {
    pub fn new() -> Self {
        FakeTarget {
            inner: Arc::new(Inner {
                latency_micros: AtomicU64::new(2_000),
                fail_all: AtomicBool::new(false),
                corrupt_reads: AtomicBool::new(false),
                heap_used_bytes: AtomicU64::new(64 * 1024 * 1024),
                posts: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner
            .latency_micros
            .store(latency.as_micros() as u64, Ordering::Relaxed);
        self
    }

    pub fn with_all_requests_failing(self) -> Self {
        self.inner.fail_all.store(true, Ordering::Relaxed);
        self
    }

    pub fn with_corrupt_reads(self) -> Self {
        self.inner.corrupt_reads.store(true, Ordering::Relaxed);
        self
    }

    pub fn with_heap_used_mb(self, mb: f64) -> Self {
        self.set_heap_used_mb(mb);
        self
    }

    /// A second handle onto the same state
    pub fn handle(&self) -> FakeTarget {
        self.clone()
    }

    pub fn set_heap_used_mb(&self, mb: f64) {
        self.inner
            .heap_used_bytes
            .store((mb * 1024.0 * 1024.0) as u64, Ordering::Relaxed);
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.fail_all.store(failing, Ordering::Relaxed);
    }

    /// Highest number of requests ever simultaneously in flight
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::Relaxed)
    }

    fn latency(&self) -> Duration {
        Duration::from_micros(self.inner.latency_micros.load(Ordering::Relaxed))
    }

    /// Simulate request transit: track in-flight peak, wait the configured
    /// latency, then fail if the fake is scripted to fail.
    async fn transit(&self) -> ClientResult<()> {
        let current = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .peak_in_flight
            .fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.latency()).await;
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.inner.fail_all.load(Ordering::Relaxed) {
            return Err(ClientError::Status {
                status: 500,
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn ok<T: serde::Serialize>(&self, value: T) -> ApiResult<T> {
        let bytes = serde_json::to_vec(&value).map(|v| v.len() as u64).unwrap_or(0);
        ApiResult {
            value,
            meta: None,
            latency: self.latency(),
            bytes,
        }
    }

    fn seed_post(n: u64) -> Post {
        Post {
            id: format!("seed-{n}"),
            title: format!("Seed post {n}"),
            content: "Pre-existing content".to_string(),
            author_id: Some("1".to_string()),
            views: Some(0),
            likes: Some(0),
        }
    }
}

#[async_trait]
impl TargetApi for FakeTarget {
    async fn health(&self) -> ClientResult<ApiResult<Health>> {
        self.transit().await?;
        Ok(self.ok(Health {
            status: "ok".to_string(),
            memory: Some(MemoryInfo {
                heap_used: self.inner.heap_used_bytes.load(Ordering::Relaxed),
            }),
        }))
    }

    async fn list_posts(
        &self,
        _page: u32,
        page_size: u32,
        _sort_by: Option<&str>,
    ) -> ClientResult<ApiResult<Vec<Post>>> {
        self.transit().await?;
        let stored: Vec<Post> = {
            let posts = self.inner.posts.lock().expect("posts lock poisoned");
            posts.values().take(page_size as usize).cloned().collect()
        };
        let value = if stored.is_empty() {
            (1..=page_size.min(10) as u64).map(Self::seed_post).collect()
        } else {
            stored
        };
        Ok(self.ok(value))
    }

    async fn get_post(&self, id: &str) -> ClientResult<ApiResult<Post>> {
        self.transit().await?;
        let stored = {
            let posts = self.inner.posts.lock().expect("posts lock poisoned");
            posts.get(id).cloned()
        };
        let mut post = match stored {
            Some(post) => post,
            None if id.starts_with("seed-") => Self::seed_post(
                id.trim_start_matches("seed-").parse().unwrap_or(1),
            ),
            None => {
                return Err(ClientError::Status {
                    status: 404,
                    message: format!("post {id} not found"),
                })
            }
        };
        if self.inner.corrupt_reads.load(Ordering::Relaxed) {
            post.title.push_str(" [stale]");
        }
        Ok(self.ok(post))
    }

    async fn create_post(&self, new_post: &NewPost) -> ClientResult<ApiResult<Post>> {
        self.transit().await?;
        let id = format!("p{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let post = Post {
            id: id.clone(),
            title: new_post.title.clone(),
            content: new_post.content.clone(),
            author_id: Some(new_post.author_id.to_string()),
            views: Some(0),
            likes: Some(0),
        };
        self.inner
            .posts
            .lock()
            .expect("posts lock poisoned")
            .insert(id, post.clone());
        Ok(self.ok(post))
    }

    async fn view_post(&self, _id: &str) -> ClientResult<ApiResult<()>> {
        self.transit().await?;
        Ok(ApiResult {
            value: (),
            meta: None,
            latency: self.latency(),
            bytes: 16,
        })
    }

    async fn like_post(&self, _id: &str) -> ClientResult<ApiResult<()>> {
        self.transit().await?;
        Ok(ApiResult {
            value: (),
            meta: None,
            latency: self.latency(),
            bytes: 16,
        })
    }

    async fn list_users(&self, _search: Option<&str>) -> ClientResult<ApiResult<Vec<User>>> {
        self.transit().await?;
        Ok(self.ok(vec![User {
            id: "1".to_string(),
            name: "Seed User".to_string(),
            email: Some("seed@example.test".to_string()),
        }]))
    }

    async fn create_user(&self, new_user: &NewUser) -> ClientResult<ApiResult<User>> {
        self.transit().await?;
        Ok(self.ok(User {
            id: format!("u{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed)),
            name: new_user.name.clone(),
            email: Some(new_user.email.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_round_trips_created_posts() {
        let fake = FakeTarget::new();
        let created = fake
            .create_post(&NewPost {
                title: "t".into(),
                content: "c".into(),
                author_id: 1,
            })
            .await
            .unwrap();
        let fetched = fake.get_post(&created.value.id).await.unwrap();
        assert_eq!(fetched.value.title, "t");
    }

    #[tokio::test]
    async fn test_fake_failure_mode() {
        let fake = FakeTarget::new().with_all_requests_failing();
        assert!(fake.health().await.is_err());
        fake.set_failing(false);
        assert!(fake.health().await.is_ok());
    }

    #[tokio::test]
    async fn test_fake_missing_post_is_404() {
        let fake = FakeTarget::new();
        let err = fake.get_post("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
    }
}
