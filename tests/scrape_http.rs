// tests/scrape_http.rs
use std::time::Duration;

use business_news_digest::article::ArticleBody;
use business_news_digest::scrape::navigator::{HttpNavigator, Navigator};
use business_news_digest::scrape::{ContentResolver, ResolverOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html><body>
<header><p>Top stories from around the business world today</p></header>
<article>
<p>Reliance Industries shares climbed 3 per cent after the company announced a new energy unit.</p>
<p>short</p>
<p>The conglomerate plans to invest Rs 75,000 crore over the next three years, it said.</p>
</article>
<footer><p>Copyright 2025. All rights reserved by the publisher.</p></footer>
</body></html>"#;

fn opts(redirect_host: &str) -> ResolverOptions {
    ResolverOptions {
        redirect_hosts: vec![redirect_host.to_string()],
        resolve_timeout: Duration::from_secs(5),
        scrape_timeout: Duration::from_secs(5),
        settle_delay: Duration::ZERO,
        request_delay: Duration::ZERO,
        min_paragraph_chars: 30,
    }
}

#[tokio::test]
async fn navigator_follows_http_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/articles/abc"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/story/reliance", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/story/reliance"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let nav = HttpNavigator::new("test-agent").unwrap();
    let page = nav
        .goto(&format!("{}/rss/articles/abc", server.uri()), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(page.url, format!("{}/story/reliance", server.uri()));
    assert!(page.html.contains("Reliance Industries"));
}

#[tokio::test]
async fn scrape_keeps_only_content_paragraphs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story/reliance"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let r = ContentResolver::new(HttpNavigator::new("test-agent").unwrap(), opts("news.google.com"));
    match r.scrape(&format!("{}/story/reliance", server.uri())).await {
        ArticleBody::Text(t) => {
            assert!(t.starts_with("Reliance Industries shares climbed"));
            assert!(t.ends_with("it said."));
            assert!(!t.contains("short"));
            assert!(!t.contains("Top stories"));
            assert!(!t.contains("Copyright"));
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_becomes_failure_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let r = ContentResolver::new(HttpNavigator::new("test-agent").unwrap(), opts("news.google.com"));
    match r.scrape(&server.uri()).await {
        ArticleBody::Failed(msg) => assert!(msg.contains("403")),
        other => panic!("expected failure, got {other:?}"),
    }
}
