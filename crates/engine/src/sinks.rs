use tracing::info;

use procura_core::events::{EventEnvelope, EventSink};

/// Writes every domain event to the log. Stands in for the notification and
/// export consumers that live outside the engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, envelope: EventEnvelope) {
        info!(
            event_name = "procurement.event.published",
            correlation_id = %envelope.correlation_id,
            event_id = %envelope.event_id,
            request_id = %envelope.event.request_id(),
            domain_event = envelope.event.name(),
            actor = %envelope.actor,
            payload = %envelope.payload_json(),
            "domain event published"
        );
    }
}

/// Forwards each event to every inner sink in order.
#[derive(Default)]
pub struct FanoutEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, envelope: EventEnvelope) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(envelope.clone());
            }
            last.emit(envelope);
        }
    }
}
