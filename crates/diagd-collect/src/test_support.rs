//! Fakes shared by the unit tests of this crate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diagd_core::domain::Event;
use diagd_core::ports::{MetricsConnection, MetricsSink, SinkError, SubmitStatus};
use diagd_telemetry::{MetricsLogger, MetricsLoggerConfig};

/// Sink accepting every event and remembering it
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn metric_ids(&self) -> Vec<u32> {
        self.events().iter().map(Event::metric_id).collect()
    }
}

#[async_trait]
impl MetricsConnection for RecordingSink {
    async fn submit(&self, event: &Event) -> Result<SubmitStatus, SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(SubmitStatus::Ok)
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn connect(&self) -> Result<Arc<dyn MetricsConnection>, SinkError> {
        Ok(Arc::new(self.clone()))
    }
}

pub fn recording_logger() -> (Arc<MetricsLogger>, RecordingSink) {
    let sink = RecordingSink::default();
    let logger = MetricsLogger::new(Arc::new(sink.clone()), MetricsLoggerConfig::default());
    (Arc::new(logger), sink)
}
