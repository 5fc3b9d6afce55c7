//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against an in-memory store.

use scraper::{Html, Selector};
use staticator::config::{CrawlerConfig, HeadLinkMode};
use staticator::crawler::crawl;
use staticator::storage::{MemoryStore, Store, StoreError, StoreResult};
use staticator::{Resource, StaticatorError};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server
fn create_test_config(base_url: &str, limit: usize, parallel: usize) -> CrawlerConfig {
    let mut config = CrawlerConfig::new(Url::parse(&format!("{}/", base_url)).unwrap());
    config.fetch_limit = limit;
    config.max_parallel = parallel;
    config.user_agent = "TestBot/1.0".to_string();
    config
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

/// Mounts a GET mock expected to be hit exactly `times` times
async fn mount(server: &MockServer, route: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn stored_html(store: &MemoryStore, key: &str) -> String {
    let resource = store
        .get(key)
        .unwrap_or_else(|| panic!("nothing stored under {}", key));
    String::from_utf8(resource.content().expect("page content").to_vec()).unwrap()
}

fn hrefs(document: &str, selector: &str, attr: &str) -> Vec<String> {
    let selector = Selector::parse(selector).unwrap();
    Html::parse_document(document)
        .select(&selector)
        .filter_map(|el| el.value().attr(attr).map(|v| v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(format!(
            r#"<html><head><title>Home</title>
            <link rel="stylesheet" href="{base}/wp-content/themes/site/style.css">
            </head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <img src="{base}/images/logo.png" srcset="{base}/images/logo.png 1x, https://cdn.example.net/logo@2x.png 2x">
            </body></html>"#,
            base = base_url
        )),
        1,
    )
    .await;

    mount(
        &mock_server,
        "/page1",
        html(format!(
            r#"<html><body><a href="{}/">Home</a><a href="/page2">Page 2</a></body></html>"#,
            base_url
        )),
        1,
    )
    .await;

    mount(
        &mock_server,
        "/page2",
        html(r#"<html><body><a href="/page1">Page 1</a></body></html>"#.to_string()),
        1,
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 10, 2), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(store.keys(), vec!["/", "/page1", "/page2"]);
    assert_eq!(report.pages, 3);
    assert_eq!(report.redirects, 0);
    assert_eq!(report.failures, 0);
    assert_eq!(report.fetches, 3);
    assert!(report.overflow.is_empty());

    let home = stored_html(&store, "/");
    assert_eq!(hrefs(&home, "a", "href"), vec!["/page1", "/page2"]);
    assert_eq!(
        hrefs(&home, "link", "href"),
        vec!["/wp-content/themes/site/style.css"]
    );
    assert_eq!(hrefs(&home, "img", "src"), vec!["/images/logo.png"]);
    assert_eq!(
        hrefs(&home, "img", "srcset"),
        vec!["/images/logo.png 1x, https://cdn.example.net/logo@2x.png 2x"]
    );
    assert!(!home.contains(&base_url));
    assert!(home.contains("<title>Home</title>"));

    assert_eq!(
        store.get("/page1").unwrap().content_type(),
        Some("text/html; charset=utf-8")
    );
}

#[tokio::test]
async fn test_each_page_fetched_once_under_concurrency() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let pages = ["/", "/p1", "/p2", "/p3", "/p4"];
    let links: String = pages
        .iter()
        .map(|p| {
            format!(
                r#"<a href="{base}{p}">abs</a><a href="{p}">rel</a><a href="{p}#section">frag</a>"#,
                base = base_url,
                p = p
            )
        })
        .collect();

    for page in pages {
        mount(
            &mock_server,
            page,
            html(format!("<html><body>{}</body></html>", links)),
            1,
        )
        .await;
    }

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 100, 4), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages, 5);
    assert_eq!(report.fetches, 5);
    assert_eq!(store.len(), 5);
    assert_eq!(report.visited.len(), 5);
}

#[tokio::test]
async fn test_fetch_limit_records_overflow() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#.to_string()),
        1,
    )
    .await;
    mount(&mock_server, "/a", html("<p>a</p>".to_string()), 1).await;
    mount(&mock_server, "/b", html("<p>b</p>".to_string()), 0).await;
    mount(&mock_server, "/c", html("<p>c</p>".to_string()), 0).await;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 2, 1), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(report.fetches, 2);
    assert_eq!(store.keys(), vec!["/", "/a"]);
    assert_eq!(
        report.overflow,
        vec![format!("{}/b", base_url), format!("{}/c", base_url)]
    );
}

#[tokio::test]
async fn test_single_fetch_default_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/next">Next</a>"#.to_string()),
        1,
    )
    .await;
    mount(&mock_server, "/next", html("<p>next</p>".to_string()), 0).await;

    let config = CrawlerConfig::new(Url::parse(&format!("{}/", base_url)).unwrap());
    let store = Arc::new(MemoryStore::new());
    let report = crawl(config, store.clone()).await.expect("Crawl failed");

    assert_eq!(report.pages, 1);
    assert_eq!(store.keys(), vec!["/"]);
}

#[tokio::test]
async fn test_redirects_are_recorded_not_followed_by_client() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(
            r#"<a href="/old-path">Old</a><a href="/moved">Moved</a><a href="/away">Away</a>"#
                .to_string(),
        ),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/old-path",
        ResponseTemplate::new(302).insert_header("Location", "/new-path"),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/moved",
        ResponseTemplate::new(301)
            .insert_header("Location", format!("{}/landing", base_url).as_str()),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/away",
        ResponseTemplate::new(307).insert_header("Location", "https://elsewhere.example/x"),
        1,
    )
    .await;
    mount(&mock_server, "/new-path", html("<p>new</p>".to_string()), 1).await;
    mount(&mock_server, "/landing", html("<p>landing</p>".to_string()), 1).await;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 20, 2), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(store.get("/old-path"), Some(Resource::redirect("/new-path")));
    assert_eq!(store.get("/moved"), Some(Resource::redirect("/landing")));
    assert_eq!(
        store.get("/away"),
        Some(Resource::redirect("https://elsewhere.example/x"))
    );
    assert_eq!(report.redirects, 3);
    assert_eq!(report.pages, 3);
    assert!(store.get("/new-path").is_some());
    assert!(store.get("/landing").is_some());
}

#[tokio::test]
async fn test_fragment_asset_and_offsite_links_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(format!(
            r##"<html><body>
            <a href="#top">Top</a>
            <a href="{base}/files/report.pdf">Report</a>
            <a href="https://elsewhere.example/page">Elsewhere</a>
            <a href="mailto:someone@example.com">Mail</a>
            <form action="{base}/search"><input name="s"></form>
            </body></html>"##,
            base = base_url
        )),
        1,
    )
    .await;
    mount(&mock_server, "/files/report.pdf", ResponseTemplate::new(200), 0).await;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 10, 1), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(report.fetches, 1);
    assert_eq!(store.keys(), vec!["/"]);

    let home = stored_html(&store, "/");
    assert_eq!(
        hrefs(&home, "a", "href"),
        vec![
            "#top",
            "/files/report.pdf",
            "https://elsewhere.example/page",
            "mailto:someone@example.com"
        ]
    );
    assert_eq!(hrefs(&home, "form", "action"), vec!["#"]);
}

#[tokio::test]
async fn test_alias_hosts_are_relativized() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(
            r#"<a href="http://old.example.org/uploads/photo.jpg">Photo</a>
            <!-- moved from https://old.example.org/ -->"#
                .to_string(),
        ),
        1,
    )
    .await;

    let mut config = create_test_config(&base_url, 10, 1);
    config.aliases = vec!["old.example.org".to_string()];

    let store = Arc::new(MemoryStore::new());
    crawl(config, store.clone()).await.expect("Crawl failed");

    let home = stored_html(&store, "/");
    assert_eq!(hrefs(&home, "a", "href"), vec!["/uploads/photo.jpg"]);
    assert!(home.contains("<!-- moved from / -->"));
}

#[tokio::test]
async fn test_error_pages_are_archived() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/missing">Gone</a><a href="/ok">Ok</a>"#.to_string()),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/missing",
        ResponseTemplate::new(404).set_body_raw(
            format!(r#"<h1>Not found</h1><a href="{}/ok">Home</a>"#, base_url),
            "text/html",
        ),
        1,
    )
    .await;
    mount(&mock_server, "/ok", html("<p>ok</p>".to_string()), 1).await;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 10, 2), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(report.failures, 0);
    assert_eq!(report.pages, 3);

    let missing = stored_html(&store, "/missing");
    assert!(missing.contains("<h1>Not found</h1>"));
    assert_eq!(hrefs(&missing, "a", "href"), vec!["/ok"]);
}

#[tokio::test]
async fn test_http_errors_are_not_fatal_when_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/missing">Gone</a><a href="/ok">Ok</a>"#.to_string()),
        1,
    )
    .await;
    mount(&mock_server, "/missing", ResponseTemplate::new(404), 1).await;
    mount(&mock_server, "/ok", html("<p>ok</p>".to_string()), 1).await;

    let mut config = create_test_config(&base_url, 10, 2);
    config.store_error_pages = false;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(config, store.clone()).await.expect("Crawl failed");

    assert_eq!(report.failures, 1);
    assert_eq!(report.pages, 2);
    assert!(store.get("/missing").is_none());
}

#[tokio::test]
async fn test_query_order_variants_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/one">One</a><a href="/two">Two</a>"#.to_string()),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/one",
        html(r#"<a href="/tag?b=2&a=1&a=0">Tag</a>"#.to_string()),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/two",
        html(format!(r#"<a href="{}/tag?a=0&a=1&b=2">Tag</a>"#, base_url)),
        1,
    )
    .await;
    mount(&mock_server, "/tag", html("<p>tag</p>".to_string()), 1).await;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(create_test_config(&base_url, 10, 2), store.clone())
        .await
        .expect("Crawl failed");

    assert_eq!(report.fetches, 4);
    let tags: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|key| key.starts_with("/tag"))
        .collect();
    assert_eq!(tags, vec!["/tag?a=0&a=1&b=2"]);
}

#[tokio::test]
async fn test_non_html_kept_raw() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let json = format!(r#"{{"home":"{}/page"}}"#, base_url);
    mount(
        &mock_server,
        "/",
        ResponseTemplate::new(200).set_body_raw(json.clone(), "application/json"),
        1,
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    crawl(create_test_config(&base_url, 10, 1), store.clone())
        .await
        .expect("Crawl failed");

    let stored = store.get("/").unwrap();
    assert_eq!(stored.content(), Some(json.as_bytes()));
    assert_eq!(stored.content_type(), Some("application/json"));
}

#[tokio::test]
async fn test_capture_mode_saves_feeds_raw() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(format!(
            r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="{}/feed">
            </head><body>Home</body></html>"#,
            base_url
        )),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/feed",
        ResponseTemplate::new(301).insert_header("Location", "/feed/"),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/feed/",
        ResponseTemplate::new(200).set_body_raw("<rss/>", "application/rss+xml"),
        1,
    )
    .await;

    let mut config = create_test_config(&base_url, 10, 1);
    config.head_links = HeadLinkMode::Capture;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(config, store.clone()).await.expect("Crawl failed");

    assert_eq!(report.captures, 1);
    assert_eq!(report.fetches, 3);
    assert_eq!(store.get("/feed"), Some(Resource::redirect("/feed/")));
    assert_eq!(
        store.get("/feed/"),
        Some(Resource::page("<rss/>", "application/rss+xml"))
    );

    let home = stored_html(&store, "/");
    assert_eq!(hrefs(&home, "link", "href"), vec!["/feed"]);
}

#[tokio::test]
async fn test_captured_feed_not_crawled_again() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount(
        &mock_server,
        "/",
        html(
            r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/feed/">
            </head><body><a href="/feed/">Feed</a></body></html>"#
                .to_string(),
        ),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/feed/",
        ResponseTemplate::new(200).set_body_raw("<rss/>", "application/rss+xml"),
        1,
    )
    .await;

    let mut config = create_test_config(&base_url, 10, 1);
    config.head_links = HeadLinkMode::Capture;

    let store = Arc::new(MemoryStore::new());
    let report = crawl(config, store.clone()).await.expect("Crawl failed");

    assert_eq!(report.fetches, 2);
    assert_eq!(store.keys(), vec!["/", "/feed/"]);
    assert_eq!(
        store.get("/feed/"),
        Some(Resource::page("<rss/>", "application/rss+xml"))
    );
}

#[tokio::test]
async fn test_skip_mode_leaves_head_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let canonical = format!("{}/canonical", base_url);
    mount(
        &mock_server,
        "/",
        html(format!(
            r#"<html><head><link rel="canonical" href="{}"></head><body></body></html>"#,
            canonical
        )),
        1,
    )
    .await;

    let mut config = create_test_config(&base_url, 10, 1);
    config.head_links = HeadLinkMode::Skip;

    let store = Arc::new(MemoryStore::new());
    crawl(config, store.clone()).await.expect("Crawl failed");

    let home = stored_html(&store, "/");
    assert_eq!(hrefs(&home, "link", "href"), vec![canonical]);
}

/// Store whose every write fails
struct FailingStore;

impl Store for FailingStore {
    fn write(&self, _key: &str, _resource: &Resource) -> StoreResult<()> {
        Err(StoreError::Database("disk full".to_string()))
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_store_failure_aborts_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/next">Next</a>"#.to_string()))
        .mount(&mock_server)
        .await;

    let result = crawl(create_test_config(&base_url, 10, 1), Arc::new(FailingStore)).await;

    match result {
        Err(e) => {
            assert!(e.is_fatal());
            assert!(matches!(e, StaticatorError::Store(_)));
        }
        Ok(_) => panic!("crawl should fail when the store does"),
    }
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let config = create_test_config("http://127.0.0.1:9", 0, 1);
    let result = crawl(config, Arc::new(MemoryStore::new())).await;
    assert!(matches!(result, Err(StaticatorError::Config(_))));
}
