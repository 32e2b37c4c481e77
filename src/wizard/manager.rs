//! WizardOrchestrator — coordinates the draft, step navigation, submission,
//! and the countdown for one mounted wizard.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::{StepError, SubmissionError};

use super::countdown::{Countdown, ScopedTask, TimeRemaining};
use super::model::{Field, FormRecord};
use super::state::{Step, StepController};
use super::submission::{RelaySink, SubmissionPipeline, SubmissionStatus};
use super::validator::{self, ValidationState};

/// Mutable state of one wizard, replaced wholesale on dismissal.
#[derive(Debug, Default)]
struct Session {
    open: bool,
    steps: StepController,
    record: FormRecord,
    errors: ValidationState,
    submission: SubmissionStatus,
    /// Bumped on every reset so late relay results can be recognised.
    generation: u64,
}

impl Session {
    fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}

/// Result of a submit intent. Failures are reported here rather than raised.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Relay accepted the record; the wizard is now on the terminal step.
    Submitted { submitted_at: String },
    /// Relay call failed; the draft is intact and may be resubmitted.
    Failed(SubmissionError),
    /// The record did not pass full validation; nothing was sent.
    Invalid(ValidationState),
    /// Another submission is still in flight.
    InFlight,
    /// Submitting is only possible from the preferences step.
    NotReady(Step),
    /// The wizard was dismissed while the relay call was running.
    Dismissed,
}

/// Everything the rendering layer reads.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub id: Uuid,
    pub open: bool,
    pub step: Step,
    pub step_number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    pub submitting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub record: FormRecord,
    pub errors: ValidationState,
    pub time_remaining: TimeRemaining,
}

/// One mounted wizard. Dropping it cancels the countdown and the delayed
/// show.
pub struct WizardOrchestrator {
    id: Uuid,
    pipeline: SubmissionPipeline,
    session: Arc<RwLock<Session>>,
    countdown: Countdown,
    _show: Option<ScopedTask>,
}

impl WizardOrchestrator {
    /// Mount a wizard: start the countdown and schedule the wizard to open
    /// after `config.show_delay`. Must be called inside a Tokio runtime.
    pub fn mount(config: &WizardConfig, sink: Arc<dyn RelaySink>) -> Self {
        let id = Uuid::new_v4();
        let session = Arc::new(RwLock::new(Session {
            open: config.show_delay.is_zero(),
            ..Session::default()
        }));

        let show = (!config.show_delay.is_zero()).then(|| {
            let session = Arc::clone(&session);
            let delay = config.show_delay;
            ScopedTask::spawn(async move {
                tokio::time::sleep(delay).await;
                session.write().await.open = true;
                tracing::debug!(session = %id, "Wizard opened after delay");
            })
        });

        tracing::info!(session = %id, deadline = %config.deadline, "Wizard mounted");

        Self {
            id,
            pipeline: SubmissionPipeline::new(sink, config.submit_timeout),
            session,
            countdown: Countdown::start(config.deadline, config.tick_interval),
            _show: show,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn is_open(&self) -> bool {
        self.session.read().await.open
    }

    pub async fn open(&self) {
        self.session.write().await.open = true;
    }

    /// Close the wizard and throw away everything entered. From the
    /// terminal step this is the way back to a fresh wizard.
    pub async fn dismiss(&self) {
        let mut session = self.session.write().await;
        let step = session.steps.current();
        session.reset();
        tracing::info!(session = %self.id, %step, "Wizard dismissed");
    }

    pub async fn current_step(&self) -> Step {
        self.session.read().await.steps.current()
    }

    pub async fn record(&self) -> FormRecord {
        self.session.read().await.record.clone()
    }

    pub async fn errors(&self) -> ValidationState {
        self.session.read().await.errors.clone()
    }

    pub async fn is_submitting(&self) -> bool {
        self.session.read().await.submission.is_pending()
    }

    /// Store a raw input and re-validate the field. Returns the field's
    /// error, if any. Ignored on the terminal step.
    pub async fn set_field(&self, field: Field, raw: &str) -> Option<&'static str> {
        let mut session = self.session.write().await;
        if session.steps.current().is_terminal() {
            tracing::debug!(session = %self.id, %field, "Edit ignored on terminal step");
            return None;
        }

        let Session { record, errors, .. } = &mut *session;
        let result = match record.set_raw(field, raw) {
            Ok(()) => validator::validate_field(field, record),
            Err(failure) => Err(failure.message),
        };

        match result {
            Ok(()) => errors.clear_field(field),
            Err(message) => errors.set(field, message),
        }
        if field == Field::Qualification && record.qualification.is_none() {
            errors.clear_field(Field::Percentage);
        }
        errors.get(field)
    }

    /// Validate the current step and move forward.
    pub async fn advance(&self) -> Result<Step, StepError> {
        let mut session = self.session.write().await;
        let Session {
            steps,
            record,
            errors,
            ..
        } = &mut *session;

        let fields = validator::required_fields(steps.current(), record);
        let result = steps.advance(record);
        match &result {
            Ok(step) => {
                errors.apply(&fields, &ValidationState::default());
                tracing::debug!(session = %self.id, %step, "Advanced");
            }
            Err(StepError::Invalid(failed)) => errors.apply(&fields, failed),
            Err(StepError::NoForwardTransition(_)) => {}
        }
        result
    }

    /// Move back one step without validation.
    pub async fn retreat(&self) -> Step {
        self.session.write().await.steps.retreat()
    }

    /// Validate the whole record and relay it.
    ///
    /// The session lock is released while the relay call runs, so other
    /// intents stay responsive; a second submit in that window gets
    /// [`SubmitOutcome::InFlight`].
    pub async fn submit(&self) -> SubmitOutcome {
        let (record, generation) = {
            let mut session = self.session.write().await;
            if session.submission.is_pending() {
                return SubmitOutcome::InFlight;
            }
            let step = session.steps.current();
            if step != Step::Preferences {
                return SubmitOutcome::NotReady(step);
            }

            let fields = validator::submission_fields(&session.record);
            let failed = validator::validate_fields(&fields, &session.record);
            session.errors.apply(&fields, &failed);
            if !failed.is_valid() {
                return SubmitOutcome::Invalid(failed);
            }

            if session.submission.begin().is_err() {
                return SubmitOutcome::InFlight;
            }
            (session.record.clone(), session.generation)
        };

        let result = self.pipeline.submit(&record).await;

        let mut session = self.session.write().await;
        if session.generation != generation {
            tracing::debug!(session = %self.id, "Discarding submission result after dismissal");
            return SubmitOutcome::Dismissed;
        }
        session.submission.settle(&result);

        match result {
            Ok(submitted_at) => {
                if let Err(e) = session.steps.complete() {
                    tracing::warn!(session = %self.id, "Failed to enter submitted step: {}", e);
                }
                session.record = FormRecord::default();
                session.errors.clear();
                tracing::info!(session = %self.id, %submitted_at, "Submission accepted");
                SubmitOutcome::Submitted { submitted_at }
            }
            Err(e) => {
                tracing::warn!(session = %self.id, "Submission failed: {}", e);
                SubmitOutcome::Failed(e)
            }
        }
    }

    pub fn time_remaining(&self) -> TimeRemaining {
        self.countdown.current()
    }

    pub fn subscribe_countdown(&self) -> watch::Receiver<TimeRemaining> {
        self.countdown.subscribe()
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        let session = self.session.read().await;
        let step = session.steps.current();
        WizardSnapshot {
            id: self.id,
            open: session.open,
            step,
            step_number: step.number(),
            progress_percent: step.progress_percent(),
            submitting: session.submission.is_pending(),
            submitted_at: session.submission.submitted_at().map(String::from),
            notice: session.submission.notice().map(String::from),
            record: session.record.clone(),
            errors: session.errors.clone(),
            time_remaining: self.countdown.current(),
        }
    }
}
