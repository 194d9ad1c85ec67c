mod common;

use std::time::Duration;

use cam_recon::analyze::classifier::{classify_hosts, page_file, ClassifierSettings};
use cam_recon::analyze::signatures::SignatureSet;
use cam_recon::config::ScanConfig;
use cam_recon::context::RunContext;
use cam_recon::probe::live::LiveHost;
use cam_recon::probe::throttle::Throttle;
use common::{clients_resolving, TestServer};

#[tokio::test]
async fn unreachable_host_is_skipped_and_the_rest_classified() {
    let server = TestServer::start(vec![(
        "/",
        200,
        b"<html><title>Lobby</title><img src=\"/cgi/video.mjpeg\"></html>".to_vec(),
    )])
    .await;
    let clients = clients_resolving(&["cam.example.org"], server.addr);

    let closed = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let down = LiveHost::new("http", "127.0.0.1", closed);
    let up = LiveHost::new("http", "cam.example.org", server.port());

    let tmp = tempfile::tempdir().unwrap();
    let ctx = RunContext::create(tmp.path(), "example.org").unwrap();
    let signatures = SignatureSet::new(&ScanConfig::default().signatures).unwrap();
    let throttle = Throttle::new(1, 1, Duration::ZERO);
    let settings = ClassifierSettings { timeout: Duration::from_secs(3), page_cap: 2 * 1024 * 1024, workers: 1 };

    let out = classify_hosts(&ctx, &[down.clone(), up.clone()], &signatures, &clients.fetch, &throttle, &settings)
        .await
        .unwrap();

    assert_eq!(out.failed, 1);
    assert_eq!(out.pages.len(), 1);
    assert_eq!(out.hits.len(), 1);
    assert_eq!(out.hits[0].url, up.url);
    assert!(out.hits[0].signatures.contains(&"mjpeg".to_string()));
    assert_eq!(out.pages[0].title.as_deref(), Some("Lobby"));

    let stored: Vec<_> = std::fs::read_dir(ctx.raw_pages_dir()).unwrap().flatten().map(|e| e.path()).collect();
    assert_eq!(stored, vec![page_file(&ctx, &up.url)]);
    assert!(!page_file(&ctx, &down.url).exists());

    let hits = std::fs::read_to_string(ctx.media_hits_path()).unwrap();
    assert_eq!(hits.lines().count(), 1);
}
