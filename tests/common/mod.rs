use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use dump_cache::api::{AppState, create_router};
use dump_cache::cache::{
    ArtifactStore, CacheEntry, CacheError, CacheResult, RefreshCoordinator, RetentionPolicy,
};
use dump_cache::generator::DumpGenerator;
use http_body_util::BodyExt;
use secrecy::SecretString;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";
pub const DUMP_BYTES: &[u8] = b"fake pg_dump output";
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Stands in for `pg_dump`: writes a small file, can fail or be held back.
#[derive(Default)]
pub struct FakeGenerator {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub gate: Option<Arc<Notify>>,
}

impl FakeGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DumpGenerator for FakeGenerator {
    async fn generate(&self, store: &ArtifactStore) -> CacheResult<CacheEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Generation {
                status: "exit status: 1".into(),
                stderr: "pg_dump: error: connection to server failed".into(),
            });
        }

        store.ensure_dir().await?;
        let mut created_at = ArtifactStore::timestamp_now();
        while store.artifact_path(created_at).exists() {
            created_at += chrono::Duration::milliseconds(1);
        }
        let path = store.artifact_path(created_at);
        tokio::fs::write(&path, DUMP_BYTES)
            .await
            .map_err(|e| CacheError::store_io(&path, e))?;
        Ok(CacheEntry::new(path, created_at))
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub generator: Arc<FakeGenerator>,
    pub coordinator: RefreshCoordinator,
    pub router: Router,
}

impl TestApp {
    pub fn new(keep: usize) -> Self {
        Self::with_generator(keep, FakeGenerator::default())
    }

    pub fn gated(keep: usize, gate: Arc<Notify>) -> Self {
        Self::with_generator(
            keep,
            FakeGenerator {
                gate: Some(gate),
                ..Default::default()
            },
        )
    }

    fn with_generator(keep: usize, generator: FakeGenerator) -> Self {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(generator);
        let coordinator = RefreshCoordinator::new(
            ArtifactStore::new(dir.path()),
            generator.clone(),
            RetentionPolicy::new(NonZeroUsize::new(keep).unwrap()),
        );
        let router = create_router(AppState::new(
            coordinator.clone(),
            DEFAULT_TTL,
            SecretString::from(TOKEN),
        ));

        Self {
            dir,
            generator,
            coordinator,
            router,
        }
    }

    pub async fn request(&self, method: Method, uri: &str) -> TestResponse {
        self.request_with_token(method, uri, Some(TOKEN)).await
    }

    pub async fn request_with_token(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub fn dump_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .to_str()
            .unwrap()
    }
}
