//! Runs the collector over real HTTP against an in-process fake SQLMesh UI.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    body::Incoming,
    header::CONTENT_TYPE,
    http::{Method, Request, Response, StatusCode},
    service::service_fn,
};
use hyper_util::{rt::TokioExecutor, server::conn::auto::Builder as HyperServerBuilder};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use synq_sqlmesh::{
    git::git::NoGitContext,
    helpers::load_config::Config,
    process::health::{PollPolicy, wait_until_ready},
    runtime::runtime::collect_to_file,
    sqlmesh::{
        api::ApiClient, collector::collect_metadata, glob_filter::GlobFilter, models::Uploader,
    },
};
use tokio::net::TcpListener;
use url::Url;

const FILES: &str = r#"{
    "name": "", "path": "",
    "files": [{"name": "config.yaml", "path": "config.yaml", "extension": ".yaml"}],
    "directories": [
        {"name": "models", "path": "models",
         "files": [
            {"name": "orders.sql", "path": "models/orders.sql", "extension": ".sql"},
            {"name": "orders.log", "path": "models/orders.log", "extension": ".log"}
         ],
         "directories": [
            {"name": "staging", "path": "models/staging", "directories": [],
             "files": [{"name": "items.sql", "path": "models/staging/items.sql", "extension": ".sql"}]}
         ]},
        {"name": "audits", "path": "audits", "directories": [],
         "files": [{"name": "assert.sql", "path": "audits/assert.sql", "extension": ".sql"}]}
    ]
}"#;

struct FakeUi {
    routes: HashMap<String, (StatusCode, String)>,
    failing_health_checks: u32,
    health_checks: AtomicU32,
}

impl FakeUi {
    fn sushi() -> Self {
        let mut routes = HashMap::new();
        let mut ok = |path: &str, body: &str| {
            routes.insert(path.to_string(), (StatusCode::OK, body.to_string()));
        };
        ok("/api/meta", r#"{"version":"0.100.0","has_running_task":false}"#);
        ok(
            "/api/models",
            r#"[{"name":"sushi.orders"},{"name":" sushi.items "},{"name":""}]"#,
        );
        ok("/api/models/sushi.orders", r#"{"name":"sushi.orders","kind":"FULL"}"#);
        ok("/api/lineage/sushi.orders", r#"{"sushi.orders":{}}"#);
        ok("/api/lineage/sushi.items", r#"{"sushi.items":{}}"#);
        ok("/api/files", FILES);
        ok("/api/files/models/orders.sql", r#"{"path":"models/orders.sql","content":"SELECT 1"}"#);
        ok(
            "/api/files/models/staging/items.sql",
            r#"{"path":"models/staging/items.sql","content":"SELECT 2"}"#,
        );
        ok("/api/environments", r#"{"environments":{"prod":{}}}"#);
        routes.insert(
            "/api/models/sushi.items".to_string(),
            (StatusCode::INTERNAL_SERVER_ERROR, "model failed to render".to_string()),
        );

        Self {
            routes,
            failing_health_checks: 2,
            health_checks: AtomicU32::new(0),
        }
    }

    fn respond(&self, req: &Request<Incoming>) -> Response<Full<Bytes>> {
        let path = req.uri().path();
        let (status, body) = if req.method() != Method::GET {
            (StatusCode::METHOD_NOT_ALLOWED, String::new())
        } else if path == "/health" {
            let seen = self.health_checks.fetch_add(1, Ordering::SeqCst);
            if seen < self.failing_health_checks {
                (StatusCode::SERVICE_UNAVAILABLE, "starting".to_string())
            } else {
                (StatusCode::OK, r#"{"status":"ok"}"#.to_string())
            }
        } else {
            self.routes
                .get(path)
                .cloned()
                .unwrap_or((StatusCode::NOT_FOUND, "Not Found".to_string()))
        };

        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }
}

async fn serve(ui: FakeUi) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ui = Arc::new(ui);

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = hyper_util::rt::TokioIo::new(stream);
            let ui = Arc::clone(&ui);
            let service = service_fn(move |req: Request<Incoming>| {
                let response = ui.respond(&req);
                async move { Ok::<_, Infallible>(response) }
            });

            tokio::spawn(async move {
                let _ = HyperServerBuilder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    addr
}

fn client(addr: SocketAddr) -> ApiClient {
    ApiClient::with_timeout(
        Url::parse(&format!("http://{addr}")).unwrap(),
        Duration::from_secs(5),
    )
}

fn uploader() -> Uploader {
    Uploader {
        version: "synq-sqlmesh/test".into(),
        build_time: "".into(),
    }
}

#[tokio::test]
async fn waits_for_health_then_crawls_everything() {
    let addr = serve(FakeUi::sushi()).await;
    let api = client(addr);
    let policy = PollPolicy {
        interval: Duration::from_millis(20),
        deadline: Duration::from_secs(5),
    };

    wait_until_ready(&api, policy).await.unwrap();
    let filter = GlobFilter::new("models/**.sql", "*.log");
    let res = collect_metadata(&api, &filter, &uploader()).await.unwrap();

    assert!(res.api_meta.is_some());
    assert!(res.environments.is_some());
    assert_eq!(
        res.model_details.keys().collect::<Vec<_>>(),
        vec!["sushi.orders"]
    );
    assert_eq!(
        res.model_lineage.keys().collect::<Vec<_>>(),
        vec!["sushi.items", "sushi.orders"]
    );
    assert_eq!(
        res.file_content.keys().collect::<Vec<_>>(),
        vec!["models/orders.sql", "models/staging/items.sql"]
    );

    assert_eq!(res.errors.len(), 1);
    let error = serde_json::to_value(&res.errors[0]).unwrap();
    assert_eq!(
        error,
        json!({
            "path": format!("http://{addr}/api/models/sushi.items"),
            "code": 500,
            "message": "model failed to render",
        })
    );
}

#[tokio::test]
async fn health_wait_ends_at_deadline_when_ui_never_answers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let api = ApiClient::with_timeout(
        Url::parse(&format!("http://{addr}")).unwrap(),
        Duration::from_secs(6),
    );
    let policy = PollPolicy {
        interval: Duration::from_millis(100),
        deadline: Duration::from_secs(1),
    };
    let started = std::time::Instant::now();

    let res = wait_until_ready(&api, policy).await;

    assert!(res.is_err());
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "health wait took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn unreachable_ui_records_every_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let res = collect_metadata(&client(addr), &GlobFilter::exclude_everything(), &uploader())
        .await
        .unwrap();

    // meta, models, files and environments
    assert_eq!(res.errors.len(), 4);
    assert!(res.errors.iter().all(|e| !e.is_structured()));
    assert!(res.model_details.is_empty());
}

#[tokio::test]
async fn collect_command_writes_metadata_file() {
    let addr = serve(FakeUi::sushi()).await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("metadata.json");

    let mut config = Config::default();
    config.sqlmesh.ui_start = false;
    config.sqlmesh.ui_host = addr.ip().to_string();
    config.sqlmesh.ui_port = addr.port();
    config.sqlmesh.project_dir = dir.path().to_path_buf();

    collect_to_file(&config, &NoGitContext, &output).await.unwrap();

    let written: Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(written["api_meta"]["version"], "0.100.0");
    assert_eq!(written["environments"]["environments"], json!({"prod": {}}));
    assert!(written.get("file_content").is_none());
    assert_eq!(written["errors"].as_array().map(Vec::len), Some(1));
    assert!(written["uploader_version"].as_str().unwrap().starts_with("synq-sqlmesh/"));
}
