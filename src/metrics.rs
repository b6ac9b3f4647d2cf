use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder once. No HTTP listener; the snapshot is
/// rendered into the log instead. A second call (or a recorder installed
/// elsewhere) is a no-op.
pub fn init() {
    HANDLE.get_or_init(|| {
        let handle = match PrometheusBuilder::new().install_recorder() {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(target: "metrics", error = %e, "metrics recorder not installed");
                // Recorder-less handle so rendering still works.
                PrometheusBuilder::new().build_recorder().handle()
            }
        };
        describe_counter!("scrape_articles_total", "Articles scraped (any outcome).");
        describe_counter!("scrape_failures_total", "Navigation or read failures.");
        describe_counter!("scrape_no_content_total", "Pages with no qualifying paragraphs.");
        describe_counter!("llm_calls_total", "LLM completions requested, by provider.");
        describe_counter!("matcher_lookups_total", "Reference table lookups.");
        describe_counter!("matcher_table_errors_total", "Reference table load failures.");
        describe_counter!("notify_sent_total", "Digest messages delivered.");
        describe_counter!("notify_failed_total", "Digest messages that failed after retries.");
        describe_gauge!("processed_keys", "Identity keys in the processed set.");
        handle
    });
}

/// Rendered exposition text, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

pub fn log_snapshot() {
    if let Some(text) = render() {
        tracing::debug!(target: "metrics", "metrics snapshot:\n{text}");
    }
}
