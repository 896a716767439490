//! In-memory [`Api`] used by unit tests.

// Local crates
use crate::sqlmesh::api::{Api, ApiError};

// External crates
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16, String),
    Unreachable,
}

/// Serves canned bodies keyed by resource path (`/api/models/foo`). Unknown
/// paths answer 404. `/health` succeeds unless [`FakeApi::healthy_after`]
/// says otherwise.
#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    responses: HashMap<String, Canned>,
    failing_health_checks: u32,
    silent_health: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_body(mut self, path: &str, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), Canned::Body(body.to_string()));
        self
    }

    pub(crate) fn with_status(mut self, path: &str, code: u16, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), Canned::Status(code, body.to_string()));
        self
    }

    pub(crate) fn unreachable(mut self, path: &str) -> Self {
        self.responses.insert(path.to_string(), Canned::Unreachable);
        self
    }

    pub(crate) fn healthy_after(mut self, failures: u32) -> Self {
        self.failing_health_checks = failures;
        self
    }

    /// `/health` never answers.
    pub(crate) fn silent_health(mut self) -> Self {
        self.silent_health = true;
        self
    }

    /// Every requested path, in request order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> u32 {
        self.calls.lock().unwrap().iter().filter(|c| *c == path).count() as u32
    }

    fn respond(&self, path: String) -> Result<Bytes, ApiError> {
        let url = format!("http://fake{path}");
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|c| **c == path).count() as u32;
            calls.push(path.clone());
            previous
        };

        if path == "/health" {
            return if previous < self.failing_health_checks {
                Err(ApiError::Status {
                    url,
                    code: 503,
                    message: "starting".into(),
                })
            } else {
                Ok(Bytes::from_static(b"{\"status\":\"ok\"}"))
            };
        }

        match self.responses.get(&path) {
            Some(Canned::Body(body)) => Ok(Bytes::from(body.clone())),
            Some(Canned::Status(code, body)) => Err(ApiError::Status {
                url,
                code: *code,
                message: body.clone(),
            }),
            Some(Canned::Unreachable) => Err(ApiError::Timeout {
                url,
                timeout: Duration::from_secs(60),
            }),
            None => Err(ApiError::Status {
                url,
                code: 404,
                message: "Not Found".into(),
            }),
        }
    }
}

impl Api for FakeApi {
    async fn health(&self) -> Result<Bytes, ApiError> {
        if self.silent_health {
            self.calls.lock().unwrap().push("/health".into());
            return std::future::pending().await;
        }
        self.respond("/health".into())
    }

    async fn meta(&self) -> Result<Bytes, ApiError> {
        self.respond("/api/meta".into())
    }

    async fn models(&self) -> Result<Bytes, ApiError> {
        self.respond("/api/models".into())
    }

    async fn model(&self, name: &str) -> Result<Bytes, ApiError> {
        self.respond(format!("/api/models/{name}"))
    }

    async fn lineage(&self, name: &str) -> Result<Bytes, ApiError> {
        self.respond(format!("/api/lineage/{name}"))
    }

    async fn environments(&self) -> Result<Bytes, ApiError> {
        self.respond("/api/environments".into())
    }

    async fn files(&self) -> Result<Bytes, ApiError> {
        self.respond("/api/files".into())
    }

    async fn file_content(&self, path: &str) -> Result<Bytes, ApiError> {
        self.respond(format!("/api/files/{path}"))
    }
}
