//! Tests of the fragment and combine modes

use crate::common::*;
use honeycomb_sitemap::pipeline::{run_combine, Coordinator};
use honeycomb_sitemap::sitemap::COMBINED_FOOTER;
use honeycomb_sitemap::SitemapError;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::MockServer;

#[tokio::test]
async fn test_partials_then_combine() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nDisallow: /9/hidden").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([
            collection_json(&server, "7", "acme"),
            collection_json(&server, "8", "beta"),
            collection_json(&server, "9", "hidden")
        ]),
    )
    .await;
    mount_empty_listings(&server, "7", "acme").await;
    mount_json(
        &server,
        "/v1/collections/8/pages",
        json!({"id": "8", "slug": "beta", "pages": [{"id": "p1", "slug": "intro"}]}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/8/showcases",
        json!({"id": "8", "slug": "beta", "showcases": []}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/8/items",
        json!({"id": "8", "slug": "beta", "items": []}),
    )
    .await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate_partials().await.unwrap();

    assert_eq!(summary.skipped, vec!["hidden"]);
    assert_eq!(summary.total_entries, 3);

    // Fragment names count completed collections, whatever their order
    let mut written = summary.written.clone();
    written.sort();
    assert_eq!(written, vec!["sitemap-0.xml", "sitemap-1.xml"]);

    let partials = Path::new(&config.output.partials_directory);
    let fragment = std::fs::read_to_string(partials.join("sitemap-0.xml")).unwrap();
    assert!(fragment.starts_with("  <url>"));
    assert!(!fragment.contains("<urlset"));

    let combined = run_combine(&config).await.unwrap();
    assert_eq!(combined.fragments.len(), 2);

    let content = std::fs::read_to_string(&config.output.combined_path).unwrap();
    assert!(content.ends_with(COMBINED_FOOTER));

    let parsed = parse_xml(&content);
    assert_eq!(parsed.url_count, 3);
    assert!(parsed.locs.contains(&format!("{}7/acme", SITE)));
    assert!(parsed.locs.contains(&format!("{}8/beta", SITE)));
    assert!(parsed.locs.contains(&format!("{}8/beta/pages/p1/intro", SITE)));
    assert!(!parsed.locs.iter().any(|loc| loc.contains("hidden")));
}

#[tokio::test]
async fn test_combine_skips_junk_files() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    let partials = Path::new(&config.output.partials_directory);
    std::fs::create_dir_all(partials).unwrap();
    std::fs::write(
        partials.join("sitemap-0.xml"),
        "  <url>\r\n    <loc>https://collections.example.edu/1/a</loc>\r\n  </url>\r\n",
    )
    .unwrap();
    std::fs::write(partials.join(".DS_Store"), "binary").unwrap();
    std::fs::write(partials.join("sitemap-0.xml~"), "backup").unwrap();
    std::fs::write(partials.join("Thumbs.db"), "binary").unwrap();

    let combined = run_combine(&config).await.unwrap();
    assert_eq!(combined.fragments, vec![partials.join("sitemap-0.xml")]);

    let content = std::fs::read_to_string(&config.output.combined_path).unwrap();
    let parsed = parse_xml(&content);
    assert_eq!(parsed.locs, vec![format!("{}1/a", SITE)]);
}

#[tokio::test]
async fn test_combine_empty_directory() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);
    std::fs::create_dir_all(&config.output.partials_directory).unwrap();

    let combined = run_combine(&config).await.unwrap();
    assert!(combined.fragments.is_empty());

    let content = std::fs::read_to_string(&config.output.combined_path).unwrap();
    assert_eq!(parse_xml(&content).url_count, 0);
}

#[tokio::test]
async fn test_combine_missing_directory_writes_nothing() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    let result = run_combine(&config).await;

    assert!(matches!(result, Err(SitemapError::Io { .. })));
    assert!(!Path::new(&config.output.combined_path).exists());
}
