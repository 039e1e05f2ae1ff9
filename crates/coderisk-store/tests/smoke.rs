use coderisk_store::{KgClient, KgConfig, RsClient};
use std::time::Duration;

fn env(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn incident_history_smoke() {
    let kg_uri = env("CODERISK_TEST_KG_URI", "");
    let rs_dsn = env("CODERISK_TEST_RS_DSN", "");
    if kg_uri.is_empty() || rs_dsn.is_empty() {
        eprintln!("[skip] CODERISK_TEST_KG_URI/CODERISK_TEST_RS_DSN not set");
        return;
    }

    let kg = KgClient::connect(KgConfig {
        connection: kg_uri,
        namespace: env("CODERISK_TEST_KG_NS", "coderisk"),
        database: env("CODERISK_TEST_KG_DB", "graph"),
        username: std::env::var("CODERISK_TEST_KG_USER").ok(),
        password: std::env::var("CODERISK_TEST_KG_PASS").ok(),
    })
    .await
    .expect("kg connect");
    let rs = RsClient::connect(&rs_dsn).await.expect("rs connect");
    let queries = coderisk_store::HybridQueries::new(kg, rs);

    let incidents = queries
        .get_incident_history_for(&["src/auth/login.py".to_string()], 180, Duration::from_secs(5))
        .await
        .expect("query should not throw on empty results");
    assert!(incidents.len() <= 50);
}
