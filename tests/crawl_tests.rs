//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock listing servers and exercise the
//! HTTP fetcher and the full crawl cycle end-to-end.

use num_bigint::BigInt;
use std::io::Write;
use std::time::Duration;
use tempfile::{tempdir, NamedTempFile};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use wrapscan::config::{load_config, OutputConfig, UserAgentConfig};
use wrapscan::crawler::{
    build_http_client, CrawlDriver, CrawlSettings, CrawlStatus, HttpPageFetcher, ItemExtractor,
    ListingEndpoint, PageFetcher, RetryPolicy,
};
use wrapscan::state::{FailureKind, ItemId, PageClassification, PageOutcome};
use wrapscan::storage::{read_manifest, CheckpointStore, OutputLayout};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// A fetcher for the mock server with no request spacing and short backoff
fn test_fetcher(server: &MockServer) -> HttpPageFetcher {
    let base = Url::parse(&format!("{}/files", server.uri())).unwrap();
    HttpPageFetcher::new(
        build_http_client(&user_agent(), Duration::from_secs(5)).unwrap(),
        ListingEndpoint::new(base, "page"),
        ItemExtractor::new("EFTA", ".pdf").unwrap(),
        RetryPolicy::new(3, Duration::from_millis(10)),
        Duration::ZERO,
    )
}

fn listing(ids: &[u32]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<li><a href="/files/EFTA{:08}.pdf">EFTA{:08}.pdf</a></li>"#, id, id))
        .collect();
    format!(
        "<html><head><title>Data Set 9</title></head><body><ul>{}</ul></body></html>",
        links
    )
}

/// Serves a listing that repeats itself every `period` pages and ends
/// after `last_page`
struct WrappingListing {
    period: i64,
    last_page: i64,
}

impl Respond for WrappingListing {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse::<i64>().ok());

        match page {
            Some(page) if (0..=self.last_page).contains(&page) => {
                let slot = (page % self.period) as u32;
                ResponseTemplate::new(200).set_body_string(listing(&[slot * 3, slot * 3 + 1, slot * 3 + 2]))
            }
            _ => ResponseTemplate::new(404),
        }
    }
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_extracts_items() {
    let server = MockServer::start().await;
    mount_page(&server, "3", listing(&[39025, 39024])).await;

    let result = test_fetcher(&server).fetch(&BigInt::from(3)).await;
    match result.outcome() {
        PageOutcome::Success(items) => {
            let ids: Vec<&str> = items.iter().map(|i| i.as_str()).collect();
            assert_eq!(ids, vec!["EFTA00039024", "EFTA00039025"]);
        }
        other => panic!("expected items, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[1])))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch(&BigInt::from(0)).await;
    assert!(result.outcome().is_working());
}

#[tokio::test]
async fn test_fetch_empty_listing() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "0",
        "<html><body><p>No files.</p></body></html>".to_string(),
    )
    .await;

    let result = test_fetcher(&server).fetch(&BigInt::from(0)).await;
    assert_eq!(result.outcome(), &PageOutcome::EmptySuccess);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch(&BigInt::from(7)).await;
    assert_eq!(
        result.outcome(),
        &PageOutcome::Failure(FailureKind::NotFound)
    );
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[5])))
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch(&BigInt::from(1)).await;
    assert!(result.outcome().is_working());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_server_error_gives_up_after_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch(&BigInt::from(1)).await;
    assert_eq!(
        result.outcome(),
        &PageOutcome::Failure(FailureKind::HttpStatus(500))
    );
}

#[tokio::test]
async fn test_error_page_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Error</title></head><body>Something went wrong</body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch(&BigInt::from(2)).await;
    assert_eq!(
        result.outcome(),
        &PageOutcome::Failure(FailureKind::ErrorPage)
    );
}

#[tokio::test]
async fn test_reference_scenario_over_http() {
    let server = MockServer::start().await;
    mount_page(&server, "0", listing(&[1, 2])).await;
    mount_page(&server, "1", listing(&[2, 3])).await;
    mount_page(&server, "2", listing(&[2, 1])).await;

    let dir = tempdir().unwrap();
    let layout = OutputLayout::new(dir.path(), &OutputConfig::default());
    let driver = CrawlDriver::new(test_fetcher(&server), CrawlSettings::default(), layout.clone());

    let report = driver.run_crawl(0, 2, false).await.unwrap();
    assert_eq!(report.status, CrawlStatus::Completed);
    assert_eq!(report.total_items, 3);

    let state = CheckpointStore::new(layout.checkpoint.clone())
        .load()
        .unwrap()
        .unwrap();
    let classes: Vec<_> = state
        .page_records()
        .values()
        .map(|r| r.classification.clone())
        .collect();
    assert_eq!(
        classes,
        vec![
            PageClassification::New { count: 2 },
            PageClassification::New { count: 1 },
            PageClassification::TrueWrap { origin: 0 },
        ]
    );

    assert_eq!(
        std::fs::read_to_string(&layout.manifest).unwrap(),
        "EFTA00000001.pdf\nEFTA00000002.pdf\nEFTA00000003.pdf\n"
    );
}

#[tokio::test]
async fn test_full_crawl_detects_wraps_and_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(WrappingListing {
            period: 10,
            last_page: 24,
        })
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let layout = OutputLayout::new(dir.path(), &OutputConfig::default());
    let settings = CrawlSettings {
        checkpoint_interval: 7,
        max_retry_rounds: 1,
        ..CrawlSettings::default()
    };
    let driver = CrawlDriver::new(test_fetcher(&server), settings, layout.clone());

    let report = driver.run_crawl(0, 27, false).await.unwrap();
    assert_eq!(report.total_items, 30);
    assert_eq!(report.still_failed, vec![25, 26, 27]);

    let state = CheckpointStore::new(layout.checkpoint.clone())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(
        state.record(13).unwrap().classification,
        PageClassification::TrueWrap { origin: 3 }
    );
    assert_eq!(state.true_wraps().len(), 15);

    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&layout.index).unwrap()).unwrap();
    assert_eq!(index["summary"]["true_wraps"].as_array().unwrap().len(), 15);
    assert_eq!(index["summary"]["failed_pages"].as_array().unwrap().len(), 3);
    assert_eq!(index["metadata"]["total_unique_items"], 30);
}

#[tokio::test]
async fn test_resume_is_exact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(WrappingListing {
            period: 37,
            last_page: 100,
        })
        .mount(&server)
        .await;

    let settings = CrawlSettings {
        checkpoint_interval: 10,
        ..CrawlSettings::default()
    };

    let single = tempdir().unwrap();
    let single_layout = OutputLayout::new(single.path(), &OutputConfig::default());
    CrawlDriver::new(test_fetcher(&server), settings.clone(), single_layout.clone())
        .run_crawl(0, 100, false)
        .await
        .unwrap();

    let split = tempdir().unwrap();
    let split_layout = OutputLayout::new(split.path(), &OutputConfig::default());
    CrawlDriver::new(test_fetcher(&server), settings.clone(), split_layout.clone())
        .run_crawl(0, 50, false)
        .await
        .unwrap();
    let report = CrawlDriver::new(test_fetcher(&server), settings, split_layout.clone())
        .run_crawl(0, 100, true)
        .await
        .unwrap();
    assert!(report.resumed);
    assert_eq!(report.pages_fetched, 50);

    let single_manifest = read_manifest(&single_layout.manifest, ".pdf").unwrap();
    let split_manifest = read_manifest(&split_layout.manifest, ".pdf").unwrap();
    assert_eq!(single_manifest.len(), 37 * 3);
    assert_eq!(single_manifest, split_manifest);

    let single_state = CheckpointStore::new(single_layout.checkpoint.clone())
        .load()
        .unwrap()
        .unwrap();
    let split_state = CheckpointStore::new(split_layout.checkpoint.clone())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(single_state.seen_items(), split_state.seen_items());
    assert_eq!(single_state.cursor(), split_state.cursor());
    assert_eq!(single_state.true_wraps(), split_state.true_wraps());
}

#[tokio::test]
async fn test_malformed_checkpoint_is_fatal_on_resume() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let layout = OutputLayout::new(dir.path(), &OutputConfig::default());
    std::fs::write(&layout.checkpoint, "{ not json").unwrap();

    let driver = CrawlDriver::new(test_fetcher(&server), CrawlSettings::default(), layout);
    assert!(driver.run_crawl(0, 10, true).await.is_err());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetcher_from_config_file() {
    let server = MockServer::start().await;
    mount_page(&server, "4", listing(&[44])).await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[service]
base-url = "{}/files"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[crawl]
end-page = 10
request-delay-ms = 100
"#,
        server.uri()
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let fetcher = HttpPageFetcher::from_config(&config).unwrap();
    let result = fetcher.fetch(&BigInt::from(4)).await;
    assert_eq!(
        result.outcome(),
        &PageOutcome::from_items([ItemId::new("EFTA00000044")])
    );
}
