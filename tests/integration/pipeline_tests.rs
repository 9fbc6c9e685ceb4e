//! End-to-end tests of the sitemap pipeline
//!
//! These tests use wiremock to stand in for the collections API and the
//! robots.txt host, and write into temporary directories.

use crate::common::*;
use chrono::{TimeZone, Utc};
use honeycomb_sitemap::pipeline::Coordinator;
use honeycomb_sitemap::sitemap::{INDEX_FILE_NAME, MISC_FILE_NAME, URLSET_FOOTER};
use honeycomb_sitemap::SitemapError;
use serde_json::json;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_item_without_media_yields_two_entries() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([collection_json(&server, "7", "acme")]),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/pages",
        json!({"id": "7", "slug": "acme", "pages": []}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/showcases",
        json!({"id": "7", "slug": "acme", "showcases": []}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/items",
        json!({"id": "7", "slug": "acme", "items": [{"id": "item1"}]}),
    )
    .await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.expect("run failed");

    assert!(summary.is_complete());
    assert_eq!(summary.written, vec!["sitemap-acme.xml"]);
    assert_eq!(summary.total_entries, 2);

    let parsed = parse_xml(&read_output(&config, "sitemap-acme.xml"));
    assert_eq!(parsed.url_count, 2);
    assert_eq!(parsed.image_count, 0);
    assert_eq!(
        parsed.locs,
        vec![
            format!("{}7/acme", SITE),
            format!("{}7/acme/items/item1", SITE)
        ]
    );

    let index = parse_xml(&read_output(&config, INDEX_FILE_NAME));
    assert_eq!(index.sitemap_count, 1);
    assert_eq!(index.locs, vec![format!("{}sitemap/sitemap-acme.xml", SITE)]);

    let misc = parse_xml(&read_output(&config, MISC_FILE_NAME));
    assert_eq!(misc.locs, vec![SITE.to_string()]);
}

#[tokio::test]
async fn test_robots_disallowed_collection_is_skipped() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nDisallow: /7/acme").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([
            collection_json(&server, "7", "acme"),
            collection_json(&server, "8", "beta")
        ]),
    )
    .await;
    mount_empty_listings(&server, "7", "acme").await;
    mount_empty_listings(&server, "8", "beta").await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert_eq!(summary.skipped, vec!["acme"]);
    assert_eq!(summary.written, vec!["sitemap-beta.xml"]);
    assert!(!output_path(&config, "sitemap-acme.xml").exists());
    assert!(output_path(&config, "sitemap-beta.xml").exists());

    let index = read_output(&config, INDEX_FILE_NAME);
    assert!(!index.contains("sitemap-acme.xml"));
    assert_eq!(parse_xml(&index).sitemap_count, 1);

    // The skipped collection's API was never asked for its records
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.path().starts_with("/v1/collections/7/")));
}

#[tokio::test]
async fn test_failed_sub_resource_is_tolerated() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([collection_json(&server, "7", "acme")]),
    )
    .await;
    mount_status(&server, "/v1/collections/7/pages", 500).await;
    mount_json(
        &server,
        "/v1/collections/7/showcases",
        json!({"id": "7", "slug": "acme", "showcases": []}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/items",
        json!({"id": "7", "slug": "acme", "items": [{"id": "a"}, {"id": "b"}]}),
    )
    .await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.failed_fetches.len(), 1);
    assert!(summary.failed_fetches[0].url.ends_with("/v1/collections/7/pages"));
    assert_eq!(summary.failed_fetches[0].collection, "acme");

    let content = read_output(&config, "sitemap-acme.xml");
    assert!(content.ends_with(URLSET_FOOTER));
    assert!(!content.contains("/pages/"));

    let parsed = parse_xml(&content);
    assert_eq!(parsed.url_count, 3);
    assert_eq!(
        parsed.locs[1..],
        [
            format!("{}7/acme/items/a", SITE),
            format!("{}7/acme/items/b", SITE)
        ]
    );

    assert_eq!(parse_xml(&read_output(&config, INDEX_FILE_NAME)).sitemap_count, 1);
}

#[tokio::test]
async fn test_malformed_listing_is_tolerated() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([collection_json(&server, "7", "acme")]),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/pages",
        json!({"id": "7", "slug": "acme", "pages": []}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/items",
        json!({"id": "7", "slug": "acme", "items": []}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v1/collections/7/showcases"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert_eq!(summary.written, vec!["sitemap-acme.xml"]);
    assert_eq!(summary.failed_fetches.len(), 1);
    assert!(summary.failed_fetches[0].url.ends_with("/showcases"));
    assert_eq!(parse_xml(&read_output(&config, "sitemap-acme.xml")).url_count, 1);
}

#[tokio::test]
async fn test_pages_showcases_config_and_images() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;

    let mut collection = collection_json(&server, "7", "acme");
    collection["hasPart/metadataConfiguration"] =
        json!(format!("{}/v1/collections/7/config", server.uri()));
    mount_json(&server, "/v1/collections", json!([collection])).await;

    mount_json(
        &server,
        "/v1/collections/7/config",
        json!({"hasAboutPage": true, "enableBrowse": true}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/pages",
        json!({"id": "7", "slug": "acme", "pages": [{"id": "p1", "slug": "intro"}]}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/showcases",
        json!({"id": "7", "slug": "acme", "showcases": [{"id": "s1", "slug": "tour"}]}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/items",
        json!({"id": "7", "slug": "acme", "items": [
            {"id": "i1", "media": {"@id": "https://img.example.edu/a b&c.jpg", "@type": "ImageObject"}},
            {"id": "i2", "media": {"@id": "https://img.example.edu/clip.mp3", "@type": "AudioObject"}}
        ]}),
    )
    .await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();
    assert!(summary.failed_fetches.is_empty());

    let content = read_output(&config, "sitemap-acme.xml");
    let parsed = parse_xml(&content);

    assert_eq!(
        parsed.locs,
        vec![
            format!("{}7/acme", SITE),
            format!("{}7/acme/about", SITE),
            format!("{}7/acme/search", SITE),
            format!("{}7/acme/pages/p1/intro", SITE),
            format!("{}7/acme/showcases/s1/tour", SITE),
            format!("{}7/acme/items/i1", SITE),
            format!("{}7/acme/items/i2", SITE),
        ]
    );
    assert!(parsed.locs.iter().all(|loc| loc.starts_with(SITE)));

    assert_eq!(parsed.image_count, 1);
    assert_eq!(
        parsed.image_locs,
        vec!["https://img.example.edu/a%20b&c.jpg".to_string()]
    );
    assert!(content.contains("<image:loc>https://img.example.edu/a%20b&amp;c.jpg</image:loc>"));

    assert!(content.contains("<priority>0.9</priority>"));
    assert!(content.contains("<priority>0.8</priority>"));
}

#[tokio::test]
async fn test_collection_list_failure_is_fatal() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_status(&server, "/v1/collections", 503).await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let result = coordinator.generate().await;

    assert!(matches!(
        result,
        Err(SitemapError::Status { status: 503, .. })
    ));
    assert!(!output_path(&config, INDEX_FILE_NAME).exists());
}

#[tokio::test]
async fn test_malformed_collection_list_is_fatal() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(&server, "/v1/collections", json!({"not": "an array"})).await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let result = coordinator.generate().await;

    assert!(matches!(result, Err(SitemapError::Parse { .. })));
}

#[tokio::test]
async fn test_unavailable_robots_allows_everything() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_status(&server, "/robots.txt", 404).await;
    mount_json(
        &server,
        "/v1/collections",
        json!([collection_json(&server, "7", "acme")]),
    )
    .await;
    mount_empty_listings(&server, "7", "acme").await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert!(summary.robots_unavailable);
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.written, vec!["sitemap-acme.xml"]);
}

#[tokio::test]
async fn test_output_directory_is_recreated() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    std::fs::create_dir_all(&config.output.directory).unwrap();
    std::fs::write(output_path(&config, "sitemap-stale.xml"), "old").unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(&server, "/v1/collections", json!([])).await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert_eq!(summary.total_collections(), 0);
    assert!(!output_path(&config, "sitemap-stale.xml").exists());
    assert!(output_path(&config, MISC_FILE_NAME).exists());
    assert_eq!(parse_xml(&read_output(&config, INDEX_FILE_NAME)).sitemap_count, 0);
}

#[tokio::test]
async fn test_many_collections_all_indexed() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;

    let ids: Vec<String> = (1..=6).map(|i| i.to_string()).collect();
    let collections: Vec<_> = ids
        .iter()
        .map(|id| collection_json(&server, id, &format!("c{}", id)))
        .collect();
    mount_json(&server, "/v1/collections", json!(collections)).await;
    for id in &ids {
        mount_empty_listings(&server, id, &format!("c{}", id)).await;
    }

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert_eq!(summary.written.len(), 6);

    let index = parse_xml(&read_output(&config, INDEX_FILE_NAME));
    assert_eq!(index.sitemap_count, 6);
    for id in &ids {
        let file = format!("sitemap-c{}.xml", id);
        assert!(output_path(&config, &file).exists());
        assert!(index.locs.contains(&format!("{}sitemap/{}", SITE, file)));
    }

    // No in-progress files are left behind
    let leftovers = std::fs::read_dir(&config.output.directory)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_runs_are_idempotent() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &root);
    config.crawler.max_concurrent_collections = 1;

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([
            collection_json(&server, "7", "acme"),
            collection_json(&server, "8", "beta")
        ]),
    )
    .await;
    mount_empty_listings(&server, "7", "acme").await;
    mount_empty_listings(&server, "8", "beta").await;

    let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    let first = Coordinator::with_timestamp(config.clone(), stamp).await.unwrap();
    first.generate().await.unwrap();
    let snapshot: Vec<String> = [INDEX_FILE_NAME, MISC_FILE_NAME, "sitemap-acme.xml", "sitemap-beta.xml"]
        .iter()
        .map(|name| read_output(&config, name))
        .collect();

    let second = Coordinator::with_timestamp(config.clone(), stamp).await.unwrap();
    second.generate().await.unwrap();
    let again: Vec<String> = [INDEX_FILE_NAME, MISC_FILE_NAME, "sitemap-acme.xml", "sitemap-beta.xml"]
        .iter()
        .map(|name| read_output(&config, name))
        .collect();

    assert_eq!(snapshot, again);
    assert!(snapshot[2].contains("<lastmod>2024-03-01T12:00:00.000Z</lastmod>"));
}

#[tokio::test]
async fn test_undecodable_record_keeps_its_siblings() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([collection_json(&server, "7", "acme")]),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/pages",
        json!({"id": "7", "slug": "acme", "pages": [{"id": "p1", "slug": 5}, {"id": "p2"}]}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/showcases",
        json!({"id": "7", "slug": "acme", "showcases": []}),
    )
    .await;
    mount_json(
        &server,
        "/v1/collections/7/items",
        json!({"id": "7", "slug": "acme", "items": [
            {"id": "good1"},
            {"id": "good2"},
            {"id": null}
        ]}),
    )
    .await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert!(summary.failed_fetches.is_empty());

    let parsed = parse_xml(&read_output(&config, "sitemap-acme.xml"));
    assert_eq!(
        parsed.locs,
        vec![
            format!("{}7/acme", SITE),
            format!("{}7/acme/pages/p2", SITE),
            format!("{}7/acme/items/good1", SITE),
            format!("{}7/acme/items/good2", SITE),
        ]
    );
}

#[tokio::test]
async fn test_undecodable_collection_is_reported_not_fatal() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([
            collection_json(&server, "7", "acme"),
            {"id": "8", "slug": null, "@id": format!("{}/v1/collections/8", server.uri())}
        ]),
    )
    .await;
    mount_empty_listings(&server, "7", "acme").await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    assert_eq!(summary.written, vec!["sitemap-acme.xml"]);
    assert_eq!(summary.invalid_collections.len(), 1);
    assert_eq!(summary.invalid_collections[0].index, 1);
    assert!(summary.invalid_collections[0].url.ends_with("/v1/collections"));
    assert_eq!(summary.total_collections(), 2);
    assert!(summary.to_string().contains("Invalid: 1"));

    assert!(output_path(&config, "sitemap-acme.xml").exists());
    assert_eq!(parse_xml(&read_output(&config, INDEX_FILE_NAME)).sitemap_count, 1);
}

#[tokio::test]
async fn test_slugs_keep_their_own_file_names() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let config = create_test_config(&server, &root);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([
            collection_json(&server, "1", "a.b"),
            collection_json(&server, "2", "a-b"),
            collection_json(&server, "3", "a/b")
        ]),
    )
    .await;
    mount_empty_listings(&server, "1", "a.b").await;
    mount_empty_listings(&server, "2", "a-b").await;
    mount_empty_listings(&server, "3", "a/b").await;

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let summary = coordinator.generate().await.unwrap();

    let mut written = summary.written.clone();
    written.sort();
    assert_eq!(written, vec!["sitemap-a-b.xml", "sitemap-a.b.xml"]);

    // "a/b" maps onto the file "a-b" already claimed
    assert!(!summary.is_complete());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].collection, "a/b");

    let dotted = parse_xml(&read_output(&config, "sitemap-a.b.xml"));
    assert_eq!(dotted.locs, vec![format!("{}1/a.b", SITE)]);
    let dashed = parse_xml(&read_output(&config, "sitemap-a-b.xml"));
    assert_eq!(dashed.locs, vec![format!("{}2/a-b", SITE)]);

    let index = parse_xml(&read_output(&config, INDEX_FILE_NAME));
    assert_eq!(index.sitemap_count, 2);

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.path().starts_with("/v1/collections/3/")));
}

#[tokio::test]
async fn test_concurrency_limit_serializes_collections() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &root);
    config.crawler.max_concurrent_collections = 1;

    let delay = Duration::from_millis(400);

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_json(
        &server,
        "/v1/collections",
        json!([
            collection_json(&server, "7", "acme"),
            collection_json(&server, "8", "beta")
        ]),
    )
    .await;
    for (id, slug) in [("7", "acme"), ("8", "beta")] {
        for kind in ["pages", "showcases", "items"] {
            Mock::given(method("GET"))
                .and(path(format!("/v1/collections/{}/{}", id, kind)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "id": id, "slug": slug, kind: [] }))
                        .set_delay(delay),
                )
                .mount(&server)
                .await;
        }
    }

    let coordinator = Coordinator::new(config.clone()).await.unwrap();
    let started = Instant::now();
    let summary = coordinator.generate().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.written.len(), 2);
    // One collection at a time: its three fetches overlap, the two
    // collections do not
    assert!(
        elapsed >= delay * 2,
        "collections overlapped: finished in {:?}",
        elapsed
    );
}
