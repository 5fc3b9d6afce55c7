//! Integration tests for redirect-chain resolution and raw capture

use staticator::config::CrawlerConfig;
use staticator::crawler::{build_http_client, RedirectResolver, Resolution, MAX_REDIRECTS};
use staticator::storage::MemoryStore;
use staticator::url::LocalHosts;
use staticator::Resource;
use std::collections::HashSet;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    client: reqwest::Client,
    hosts: LocalHosts,
    store: MemoryStore,
}

impl Fixture {
    fn new(base_url: &str) -> Self {
        let seed = Url::parse(&format!("{}/", base_url)).unwrap();
        let client = build_http_client(&CrawlerConfig::new(seed.clone())).unwrap();
        let hosts = LocalHosts::from_seed(&seed, &[]).unwrap();
        Self {
            client,
            hosts,
            store: MemoryStore::new(),
        }
    }

    fn resolver(&self) -> RedirectResolver<'_> {
        RedirectResolver::new(&self.client, &self.hosts, &self.store)
    }
}

fn url(base_url: &str, route: &str) -> Url {
    Url::parse(&format!("{}{}", base_url, route)).unwrap()
}

async fn redirect(server: &MockServer, from: &str, to: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(from))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", to))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_chain_follows_and_records_every_hop() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    redirect(&mock_server, "/start", "/middle", 1).await;
    redirect(&mock_server, "/middle", "/end?b=2&a=1", 1).await;
    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fixture = Fixture::new(&base_url);
    let mut admitted = Vec::new();
    let resolution = fixture
        .resolver()
        .resolve(&url(&base_url, "/start"), |hop| {
            admitted.push(hop.path().to_string());
            true
        })
        .await
        .unwrap();

    match resolution {
        Some(Resolution::Landed { url, response }) => {
            assert_eq!(url.query(), Some("a=1&b=2"));
            assert_eq!(response.status().as_u16(), 200);
        }
        other => panic!("expected a landing, got {:?}", other),
    }

    assert_eq!(admitted, vec!["/start", "/middle", "/end"]);
    assert_eq!(
        fixture.store.get("/start"),
        Some(Resource::redirect("/middle"))
    );
    assert_eq!(
        fixture.store.get("/middle"),
        Some(Resource::redirect("/end?b=2&a=1"))
    );
    assert_eq!(fixture.store.len(), 2);
}

#[tokio::test]
async fn test_chain_gives_up_after_redirect_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for hop in 0..=MAX_REDIRECTS {
        redirect(
            &mock_server,
            &format!("/r{}", hop),
            &format!("/r{}", hop + 1),
            1,
        )
        .await;
    }
    redirect(
        &mock_server,
        &format!("/r{}", MAX_REDIRECTS + 1),
        "/never",
        0,
    )
    .await;

    let fixture = Fixture::new(&base_url);
    let resolution = fixture
        .resolver()
        .resolve(&url(&base_url, "/r0"), |_| true)
        .await
        .unwrap();

    assert!(resolution.is_none());
    assert_eq!(fixture.store.len(), MAX_REDIRECTS);
    assert_eq!(fixture.store.get("/r0"), Some(Resource::redirect("/r1")));
    assert!(fixture
        .store
        .get(&format!("/r{}", MAX_REDIRECTS))
        .is_none());
}

#[tokio::test]
async fn test_chain_stops_leaving_the_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    redirect(&mock_server, "/out", "https://elsewhere.example/landing", 1).await;

    let fixture = Fixture::new(&base_url);
    let resolution = fixture
        .resolver()
        .resolve(&url(&base_url, "/out"), |_| true)
        .await
        .unwrap();

    match resolution {
        Some(Resolution::OffSite(target)) => {
            assert_eq!(target.as_str(), "https://elsewhere.example/landing")
        }
        other => panic!("expected an off-site target, got {:?}", other),
    }
    assert_eq!(
        fixture.store.get("/out"),
        Some(Resource::redirect("https://elsewhere.example/landing"))
    );
}

#[tokio::test]
async fn test_chain_abandoned_at_seen_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    redirect(&mock_server, "/a", "/b", 1).await;
    redirect(&mock_server, "/b", "/c", 0).await;

    let fixture = Fixture::new(&base_url);
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(url(&base_url, "/b").to_string());

    let resolution = fixture
        .resolver()
        .resolve(&url(&base_url, "/a"), |hop| seen.insert(hop.to_string()))
        .await
        .unwrap();

    assert!(resolution.is_none());
    assert_eq!(fixture.store.keys(), vec!["/a"]);
}

#[tokio::test]
async fn test_chain_abandoned_on_relative_location() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    redirect(&mock_server, "/bad", "relative/path", 1).await;

    let fixture = Fixture::new(&base_url);
    let resolution = fixture
        .resolver()
        .resolve(&url(&base_url, "/bad"), |_| true)
        .await
        .unwrap();

    assert!(resolution.is_none());
    assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn test_save_raw_stores_body_as_served() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    redirect(&mock_server, "/feed", "/feed/", 1).await;
    Mock::given(method("GET"))
        .and(path("/feed/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<rss version=\"2.0\"/>", "application/rss+xml"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fixture = Fixture::new(&base_url);
    let saved = fixture
        .resolver()
        .save_raw(&url(&base_url, "/feed"), |_| true)
        .await
        .unwrap();

    assert!(saved);
    assert_eq!(fixture.store.get("/feed"), Some(Resource::redirect("/feed/")));
    assert_eq!(
        fixture.store.get("/feed/"),
        Some(Resource::page(
            "<rss version=\"2.0\"/>",
            "application/rss+xml"
        ))
    );
}

#[tokio::test]
async fn test_save_raw_skips_html_and_errors() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>hi</p>", "text/html"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fixture = Fixture::new(&base_url);
    let resolver = fixture.resolver();

    assert!(!resolver
        .save_raw(&url(&base_url, "/page"), |_| true)
        .await
        .unwrap());
    assert!(!resolver
        .save_raw(&url(&base_url, "/gone"), |_| true)
        .await
        .unwrap());
    assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn test_network_failure_is_not_fatal() {
    let fixture = Fixture::new("http://127.0.0.1:9");
    let result = fixture
        .resolver()
        .resolve(&Url::parse("http://127.0.0.1:9/unreachable").unwrap(), |_| true)
        .await;

    match result {
        Err(e) => assert!(!e.is_fatal()),
        Ok(_) => panic!("request to a closed port should fail"),
    }
}
