//! Submission pipeline — payload building, the relay call, and the
//! in-flight state that guards against duplicate submits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::SubmissionError;

use super::model::FormRecord;

/// Sent for `percentage` when no qualification (and so no percentage) was given.
pub const NOT_APPLICABLE: &str = "N/A";

/// Shown to the user when a submission fails for any reason.
pub const FAILURE_NOTICE: &str = "There was an error submitting the form. Please try again.";

/// Form-encoded body posted to the relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub qualification: String,
    pub percentage: String,
    pub study_field: String,
    pub want_to_study: String,
    /// Client-side ISO-8601 timestamp.
    pub timestamp: String,
}

impl SubmissionPayload {
    pub fn from_record(record: &FormRecord, now: DateTime<Utc>) -> Self {
        Self {
            name: record.name.trim().to_string(),
            phone: record.phone.trim().to_string(),
            email: record.email.trim().to_string(),
            qualification: record
                .qualification
                .map(|q| q.as_str().to_string())
                .unwrap_or_default(),
            percentage: record
                .effective_percentage()
                .map(|p| p.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            study_field: record
                .study_field
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            want_to_study: record
                .want_to_study
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Opaque sink that accepts a finished submission.
#[async_trait]
pub trait RelaySink: Send + Sync {
    /// Deliver the payload once. Any 2xx is success; no retries.
    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), SubmissionError>;
}

/// Relay that POSTs the payload form-encoded to a fixed URL.
pub struct HttpRelay {
    url: String,
    client: reqwest::Client,
}

impl HttpRelay {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RelaySink for HttpRelay {
    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), SubmissionError> {
        let resp = self
            .client
            .post(&self.url)
            .form(payload)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SubmissionError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Lifecycle of the submission attempt: Idle → Pending → Succeeded | Failed.
/// A failed attempt may start over; a pending one blocks new attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Pending,
    Succeeded {
        /// Local, human-readable time of the successful submission.
        submitted_at: String,
    },
    Failed {
        notice: String,
    },
}

impl SubmissionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Move to `Pending`, refusing if an attempt is already in flight.
    pub fn begin(&mut self) -> Result<(), SubmissionError> {
        if self.is_pending() {
            return Err(SubmissionError::InFlight);
        }
        *self = Self::Pending;
        Ok(())
    }

    /// Settle a pending attempt.
    pub fn settle(&mut self, outcome: &Result<String, SubmissionError>) {
        *self = match outcome {
            Ok(submitted_at) => Self::Succeeded {
                submitted_at: submitted_at.clone(),
            },
            Err(_) => Self::Failed {
                notice: FAILURE_NOTICE.to_string(),
            },
        };
    }

    pub fn submitted_at(&self) -> Option<&str> {
        match self {
            Self::Succeeded { submitted_at } => Some(submitted_at),
            _ => None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            Self::Failed { notice } => Some(notice),
            _ => None,
        }
    }
}

/// Local time in the style shown on the confirmation screen, e.g.
/// "Monday, 19 October 2026, 03:04 PM".
pub fn display_timestamp(at: DateTime<Local>) -> String {
    at.format("%A, %-d %B %Y, %I:%M %p").to_string()
}

/// Builds payloads and performs the single, time-bounded relay call.
#[derive(Clone)]
pub struct SubmissionPipeline {
    sink: Arc<dyn RelaySink>,
    timeout: Duration,
}

impl SubmissionPipeline {
    pub fn new(sink: Arc<dyn RelaySink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Send `record` to the relay. On success returns the display timestamp.
    pub async fn submit(&self, record: &FormRecord) -> Result<String, SubmissionError> {
        let payload = SubmissionPayload::from_record(record, Utc::now());
        match tokio::time::timeout(self.timeout, self.sink.deliver(&payload)).await {
            Ok(Ok(())) => Ok(display_timestamp(Local::now())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SubmissionError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::wizard::model::{Program, Qualification, StudyField};

    struct RecordingSink {
        result: Result<(), SubmissionError>,
        seen: Mutex<Vec<SubmissionPayload>>,
    }

    #[async_trait]
    impl RelaySink for RecordingSink {
        async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), SubmissionError> {
            self.seen.lock().unwrap().push(payload.clone());
            self.result.clone()
        }
    }

    struct HangingSink;

    #[async_trait]
    impl RelaySink for HangingSink {
        async fn deliver(&self, _payload: &SubmissionPayload) -> Result<(), SubmissionError> {
            std::future::pending().await
        }
    }

    fn record() -> FormRecord {
        FormRecord {
            name: "Meera Nair".into(),
            phone: "7012345678".into(),
            email: "meera@example.in".into(),
            qualification: Some(Qualification::TwelfthStandard),
            percentage: Some(dec!(88.50)),
            study_field: Some(StudyField::Medical),
            want_to_study: Some(Program::BPharm),
        }
    }

    #[test]
    fn payload_uses_wire_values() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 10, 30, 0).unwrap();
        let payload = SubmissionPayload::from_record(&record(), now);
        assert_eq!(payload.qualification, "12th");
        assert_eq!(payload.percentage, "88.50");
        assert_eq!(payload.study_field, "Medical");
        assert_eq!(payload.want_to_study, "B.Pharm");
        assert_eq!(payload.timestamp, "2025-08-01T10:30:00.000Z");
    }

    #[test]
    fn payload_substitutes_not_applicable() {
        let mut record = record();
        record.qualification = None;
        let payload = SubmissionPayload::from_record(&record, Utc::now());
        assert_eq!(payload.percentage, NOT_APPLICABLE);
        assert_eq!(payload.qualification, "");
    }

    #[test]
    fn payload_serializes_camel_case() {
        let payload = SubmissionPayload::from_record(&record(), Utc::now());
        let json = serde_json::to_value(&payload).unwrap();
        for key in [
            "name",
            "phone",
            "email",
            "qualification",
            "percentage",
            "studyField",
            "wantToStudy",
            "timestamp",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn status_blocks_duplicate_begin() {
        let mut status = SubmissionStatus::default();
        status.begin().unwrap();
        assert!(matches!(status.begin(), Err(SubmissionError::InFlight)));

        status.settle(&Err(SubmissionError::Status { status: 500 }));
        assert_eq!(status.notice(), Some(FAILURE_NOTICE));
        assert!(status.begin().is_ok(), "a failed attempt may be retried");

        status.settle(&Ok("Friday, 1 August 2025, 04:00 PM".into()));
        assert_eq!(status.submitted_at(), Some("Friday, 1 August 2025, 04:00 PM"));
    }

    #[test]
    fn display_timestamp_format() {
        let at = Local.with_ymd_and_hms(2025, 8, 1, 16, 5, 0).unwrap();
        assert_eq!(display_timestamp(at), "Friday, 1 August 2025, 04:05 PM");
    }

    #[tokio::test]
    async fn pipeline_reports_sink_failure() {
        let sink = Arc::new(RecordingSink {
            result: Err(SubmissionError::Status { status: 503 }),
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = SubmissionPipeline::new(sink.clone(), Duration::from_secs(1));
        let err = pipeline.submit(&record()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Status { status: 503 }));
        assert_eq!(sink.seen.lock().unwrap().len(), 1, "no automatic retry");
    }

    #[tokio::test]
    async fn pipeline_returns_timestamp_on_success() {
        let sink = Arc::new(RecordingSink {
            result: Ok(()),
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = SubmissionPipeline::new(sink.clone(), Duration::from_secs(1));
        let submitted_at = pipeline.submit(&record()).await.unwrap();
        assert!(!submitted_at.is_empty());
        assert_eq!(sink.seen.lock().unwrap()[0].name, "Meera Nair");
    }

    #[tokio::test]
    async fn pipeline_times_out_hung_relay() {
        let pipeline = SubmissionPipeline::new(Arc::new(HangingSink), Duration::from_millis(20));
        let err = pipeline.submit(&record()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Timeout(_)));
    }
}
