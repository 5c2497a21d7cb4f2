//! Integration tests for boundary search and probes against a mock listing

use num_bigint::BigInt;
use std::time::Duration;
use tempfile::tempdir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use wrapscan::config::{OutputConfig, UserAgentConfig};
use wrapscan::crawler::{
    build_http_client, probe_pages, BoundaryLocator, BoundaryOutcome, BoundaryReport,
    CrawlDriver, CrawlSettings, Direction, HttpPageFetcher, ItemExtractor, ListingEndpoint,
    RetryPolicy,
};
use wrapscan::output::write_boundary_report;
use wrapscan::state::{CrawlState, PageClassification};
use wrapscan::storage::{CheckpointStore, OutputLayout};

fn test_fetcher(server: &MockServer) -> HttpPageFetcher {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    HttpPageFetcher::new(
        build_http_client(&user_agent, Duration::from_secs(5)).unwrap(),
        ListingEndpoint::new(Url::parse(&format!("{}/files", server.uri())).unwrap(), "page"),
        ItemExtractor::new("EFTA", ".pdf").unwrap(),
        RetryPolicy::no_retry(),
        Duration::ZERO,
    )
}

/// Answers pages in `[low, high]`, 404 elsewhere; pages past `empty_from`
/// answer with an empty listing
struct RangeListing {
    low: BigInt,
    high: BigInt,
    empty_from: Option<BigInt>,
}

impl RangeListing {
    fn new(low: i64, high: impl Into<BigInt>) -> Self {
        Self {
            low: BigInt::from(low),
            high: high.into(),
            empty_from: None,
        }
    }
}

impl Respond for RangeListing {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse::<BigInt>().ok());

        match page {
            Some(page) if page >= self.low && page <= self.high => {
                if self.empty_from.as_ref().is_some_and(|from| &page >= from) {
                    return ResponseTemplate::new(200)
                        .set_body_string("<html><body>No files.</body></html>");
                }
                let id = (&page % BigInt::from(1000)).to_string();
                ResponseTemplate::new(200).set_body_string(format!(
                    r#"<html><body><a href="/files/EFTA{:0>8}.pdf">file</a></body></html>"#,
                    id.trim_start_matches('-')
                ))
            }
            _ => ResponseTemplate::new(404),
        }
    }
}

async fn mount(server: &MockServer, listing: RangeListing) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(listing)
        .mount(server)
        .await;
}

fn pair(report: &BoundaryReport) -> (BigInt, BigInt) {
    match &report.outcome {
        BoundaryOutcome::Found {
            last_working,
            first_failing,
            confirmation,
        } => {
            assert!(confirmation.is_stable());
            (last_working.clone(), first_failing.clone())
        }
        other => panic!("expected a boundary, got {:?}", other),
    }
}

#[tokio::test]
async fn test_finds_upper_boundary() {
    let server = MockServer::start().await;
    mount(&server, RangeListing::new(0, 184_467)).await;
    let fetcher = test_fetcher(&server);

    let report = BoundaryLocator::new(&fetcher)
        .locate(BigInt::from(13_000), Direction::Up)
        .await
        .unwrap();

    assert_eq!(
        pair(&report),
        (BigInt::from(184_467), BigInt::from(184_468))
    );
}

#[tokio::test]
async fn test_finds_lower_boundary() {
    let server = MockServer::start().await;
    mount(&server, RangeListing::new(-3, 500)).await;
    let fetcher = test_fetcher(&server);

    let report = BoundaryLocator::new(&fetcher)
        .locate(BigInt::from(10), Direction::Down)
        .await
        .unwrap();

    assert_eq!(pair(&report), (BigInt::from(-3), BigInt::from(-4)));
}

#[tokio::test]
async fn test_empty_pages_count_as_working() {
    let server = MockServer::start().await;
    let mut listing = RangeListing::new(0, 300);
    listing.empty_from = Some(BigInt::from(200));
    mount(&server, listing).await;
    let fetcher = test_fetcher(&server);

    let report = BoundaryLocator::new(&fetcher)
        .locate(BigInt::from(1), Direction::Up)
        .await
        .unwrap();

    assert_eq!(pair(&report), (BigInt::from(300), BigInt::from(301)));
}

#[tokio::test]
async fn test_huge_boundary_and_report_file() {
    let server = MockServer::start().await;
    let high: BigInt = "98765432109876543210".parse().unwrap();
    mount(&server, RangeListing::new(0, high.clone())).await;
    let fetcher = test_fetcher(&server);

    let report = BoundaryLocator::new(&fetcher)
        .locate(BigInt::from(1), Direction::Up)
        .await
        .unwrap();
    assert_eq!(pair(&report), (high.clone(), &high + 1));

    let dir = tempdir().unwrap();
    let path = dir.path().join("pagination_boundary.json");
    write_boundary_report(&path, &report).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["outcome"]["last_working"], "98765432109876543210");
    assert_eq!(json["outcome"]["kind"], "found");
    assert_eq!(
        json["probes"].as_array().unwrap().len(),
        report.request_count()
    );
}

#[tokio::test]
async fn test_probe_against_finished_crawl() {
    let server = MockServer::start().await;
    mount(&server, RangeListing::new(0, 5000)).await;
    let fetcher = test_fetcher(&server);

    let dir = tempdir().unwrap();
    let layout = OutputLayout::new(dir.path(), &OutputConfig::default());
    CrawlDriver::new(test_fetcher(&server), CrawlSettings::default(), layout.clone())
        .run_crawl(0, 9, false)
        .await
        .unwrap();

    let state: CrawlState = CheckpointStore::new(layout.checkpoint.clone())
        .load()
        .unwrap()
        .unwrap();
    let baseline = state.snapshot();

    // 1003 lists the same file as page 3; 1020 lists a new one; 9000 is gone
    let pages: Vec<BigInt> = [1003, 1020, 9000].into_iter().map(BigInt::from).collect();
    let summary = probe_pages(&fetcher, &baseline, &pages).await;

    assert_eq!(
        summary.reports[0].classification,
        PageClassification::TrueWrap { origin: 3 }
    );
    assert_eq!(
        summary.reports[1].classification,
        PageClassification::New { count: 1 }
    );
    assert!(summary.reports[2].classification.is_failed());
    assert_eq!(summary.new_items.len(), 1);
    assert_eq!(baseline.item_count(), 10);
}
