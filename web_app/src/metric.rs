use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("whatsapp_transcriber_statds")
        .with_description("WhatsApp transcriber webhook statistics")
        .with_unit("event")
        .build()
});

fn incr_statds(metric: String, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

/// Counts how each incoming webhook event ended up being handled
pub fn incr_webhook_event_statds(outcome: &str) {
    incr_statds("webhook_event".to_string(), outcome.into())
}

/// Counts transcriptions by result ("sent", "empty")
pub fn incr_transcription_statds(result: &str) {
    incr_statds("transcription".to_string(), result.into())
}
