use std::net::SocketAddr;
use std::path::PathBuf;

use configs::AppConfig;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

use server::startup::{build_app, build_state, serve};

struct TestApp {
    base_url: String,
    record: PathBuf,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestApp {
    async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await??;
        Ok(())
    }
}

async fn start_server(record: PathBuf) -> anyhow::Result<TestApp> {
    let mut cfg = AppConfig::default();
    cfg.storage.path = record.clone();

    let state = build_state(&cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(serve(listener, build_app(state), async move {
        let _ = rx.await;
    }));

    Ok(TestApp { base_url, record, stop: Some(tx), handle })
}

fn record_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("server_e2e_{}", Uuid::new_v4()))
        .join("data")
        .join("visitors.json")
}

async fn count_of(c: &reqwest::Client, url: String) -> anyhow::Result<u64> {
    let res = c.get(url).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    Ok(body["count"].as_u64().expect("count field"))
}

#[tokio::test]
async fn e2e_startup_creates_record_and_counts() -> anyhow::Result<()> {
    let record = record_path();
    let app = start_server(record.clone()).await?;
    let c = reqwest::Client::new();

    assert_eq!(tokio::fs::read_to_string(&app.record).await?, r#"{"count":0}"#);
    assert_eq!(count_of(&c, format!("{}/visit", app.base_url)).await?, 1);
    assert_eq!(count_of(&c, format!("{}/visit", app.base_url)).await?, 2);
    assert_eq!(count_of(&c, format!("{}/count", app.base_url)).await?, 2);

    let res = c.get(format!("{}/metrics", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert!(res.text().await?.contains("visit_counter_visits_total"));

    app.shutdown().await?;
    let _ = tokio::fs::remove_dir_all(record.parent().unwrap().parent().unwrap()).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_concurrent_visits_and_restart() -> anyhow::Result<()> {
    let record = record_path();
    let app = start_server(record.clone()).await?;
    let c = reqwest::Client::new();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let c = c.clone();
        let url = format!("{}/visit", app.base_url);
        handles.push(tokio::spawn(async move { count_of(&c, url).await }));
    }
    for h in handles {
        h.await??;
    }
    assert_eq!(count_of(&c, format!("{}/count", app.base_url)).await?, 50);
    app.shutdown().await?;

    // same record, new server instance
    let restarted = start_server(record.clone()).await?;
    assert_eq!(count_of(&c, format!("{}/count", restarted.base_url)).await?, 50);
    assert_eq!(count_of(&c, format!("{}/visit", restarted.base_url)).await?, 51);
    restarted.shutdown().await?;

    let _ = tokio::fs::remove_dir_all(record.parent().unwrap().parent().unwrap()).await;
    Ok(())
}

#[tokio::test]
async fn e2e_malformed_record_blocks_startup() -> anyhow::Result<()> {
    let record = record_path();
    tokio::fs::create_dir_all(record.parent().unwrap()).await?;
    tokio::fs::write(&record, b"{\"count\":\"many\"}").await?;

    assert!(start_server(record.clone()).await.is_err());
    assert_eq!(tokio::fs::read(&record).await?, b"{\"count\":\"many\"}");

    let _ = tokio::fs::remove_dir_all(record.parent().unwrap().parent().unwrap()).await;
    Ok(())
}
