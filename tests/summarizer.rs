// tests/summarizer.rs
use std::sync::Arc;

use business_news_digest::analyze::llm::{DisabledClient, DynLlmClient, MockClient};
use business_news_digest::analyze::summarize::Summarizer;
use business_news_digest::article::{ArticleBody, ScrapedArticle};
use business_news_digest::ingest::types::FeedItem;

fn article(body: ArticleBody) -> ScrapedArticle {
    let item = FeedItem {
        title: "Infosys Q1 results".into(),
        link: "https://news.google.com/rss/articles/x".into(),
        source: "Mint".into(),
        pub_date: None,
        published_at: None,
    };
    let mut a = ScrapedArticle::new(item, "https://www.livemint.com/x".into(), "livemint.com".into(), body, 1);
    a.company_name = Some("Infosys".into());
    a
}

fn long_text() -> String {
    "Infosys reported revenue of Rs 40,986 crore, up 7.5 per cent year on year. ".repeat(5)
}

fn summarizer(mock: &Arc<MockClient>) -> Summarizer {
    let llm: DynLlmClient = mock.clone();
    Summarizer::new(llm, 4000, 200)
}

#[tokio::test]
async fn short_or_sentinel_articles_make_no_call() {
    let mock = Arc::new(MockClient::new());
    let s = summarizer(&mock);
    assert!(s.summarize_article(&article(ArticleBody::Text("too short".into()))).await.is_none());
    assert!(s.summarize_article(&article(ArticleBody::NoContent)).await.is_none());
    assert!(s.summarize_article(&article(ArticleBody::Failed("timeout".into()))).await.is_none());
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn parses_model_reply() {
    let mock = Arc::new(MockClient::new().reply(
        r#"Here you go: {"summary": "Infosys grew revenue 7.5%.", "numeric_data": ["Revenue: Rs 40,986 crore", "Growth: 7.5%"], "source": "Company filing", "sentiment": "positive"}"#,
    ));
    let s = summarizer(&mock)
        .summarize_article(&article(ArticleBody::Text(long_text())))
        .await
        .expect("summarized");
    assert_eq!(s.summary, "Infosys grew revenue 7.5%.");
    assert_eq!(s.numeric_data.len(), 2);
    assert_eq!(s.source, "Company filing");
    assert_eq!(s.sentiment.as_deref(), Some("positive"));
    assert!(mock.prompts()[0].contains("about Infosys"));
}

#[tokio::test]
async fn malformed_reply_gives_placeholder() {
    let mock = Arc::new(MockClient::new().reply("not json at all"));
    let s = summarizer(&mock)
        .summarize_text(&long_text(), "t", Some("Infosys"))
        .await;
    assert_eq!(s.summary, "Error processing article");
    assert!(s.numeric_data.is_empty());
}

#[tokio::test]
async fn disabled_llm_gives_key_placeholder() {
    let s = Summarizer::new(Arc::new(DisabledClient), 4000, 200)
        .summarize_text(&long_text(), "t", None)
        .await;
    assert_eq!(s.summary, "API key not configured");
}

#[tokio::test]
async fn summarize_all_keeps_only_summarized() {
    let mock = Arc::new(MockClient::new().reply(r#"{"summary": "ok", "numeric_data": [], "source": "Report"}"#));
    let out = summarizer(&mock)
        .summarize_all(vec![
            article(ArticleBody::Text(long_text())),
            article(ArticleBody::NoContent),
        ])
        .await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].summary.as_ref().map(|s| s.summary.as_str()), Some("ok"));
    assert_eq!(mock.calls(), 1);
}
