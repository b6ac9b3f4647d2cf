//! Runs the company extractor and summarizer on a built-in sample article and
//! the matcher on a sample name. Needs the LLM key for the first two.

use anyhow::{Context, Result};

use business_news_digest::analyze::{build_llm_client, EntityExtractor, Summarizer};
use business_news_digest::config;
use business_news_digest::matcher::IdentifierMatcher;

const SAMPLE_TITLE: &str = "Tata Motors Q2 results: Net profit jumps 75% to Rs 3,764 crore";
const SAMPLE_TEXT: &str = "Tata Motors reported a 75 per cent jump in consolidated net profit \
to Rs 3,764 crore for the quarter ended September, driven by strong demand at Jaguar Land Rover \
and improved margins in the commercial vehicle business. Revenue from operations rose 32 per cent \
to Rs 1,05,128 crore compared with the year-ago period, the company said in a regulatory filing. \
JLR revenue grew 30 per cent to GBP 6.9 billion while EBIT margin improved to 8.9 per cent. \
The domestic passenger vehicle business posted volumes of 1.38 lakh units.";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    business_news_digest::init_tracing();

    let cfg = config::load_default().context("loading pipeline config")?;
    let llm = build_llm_client(&cfg.ai)?;

    let extractor = EntityExtractor::from_config(llm.clone(), &cfg);
    let company = extractor.extract(SAMPLE_TEXT, SAMPLE_TITLE).await;
    println!("company: {}", company.as_deref().unwrap_or("<none>"));

    let summarizer = Summarizer::from_config(llm, &cfg);
    let summary = summarizer
        .summarize_text(SAMPLE_TEXT, SAMPLE_TITLE, company.as_deref())
        .await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let name = std::env::args().nth(1).unwrap_or_else(|| "Infosys".to_string());
    let matcher = IdentifierMatcher::from_config(&cfg);
    let matches = matcher.lookup(&name);
    println!(
        "matches for {name:?} in {}:\n{}",
        matcher.path().display(),
        serde_json::to_string_pretty(&matches)?
    );
    Ok(())
}
