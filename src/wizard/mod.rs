//! Lead-capture wizard — a three-step form with conditional validation,
//! a single relay submission, and an offer countdown.
//!
//! The wizard collects personal, education, and preference details over
//! three steps. Each forward move validates only the fields its step gates;
//! the final submit re-validates everything and relays the record. A fourth,
//! terminal step confirms success and is left only by dismissing the wizard.

pub mod countdown;
pub mod manager;
pub mod model;
pub mod routes;
pub mod state;
pub mod submission;
pub mod validator;

pub use countdown::{Countdown, TimeRemaining, tick};
pub use manager::{SubmitOutcome, WizardOrchestrator, WizardSnapshot};
pub use model::{Field, FormRecord, Program, Qualification, StudyField};
pub use routes::{WizardRouteState, spawn_expiry_task, wizard_routes};
pub use state::{Step, StepController};
pub use submission::{HttpRelay, RelaySink, SubmissionPayload, SubmissionPipeline, SubmissionStatus};
pub use validator::ValidationState;
