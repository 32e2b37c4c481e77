//! Step state machine.

use serde::{Deserialize, Serialize};

use crate::error::StepError;

use super::model::FormRecord;
use super::validator::{self, ValidationState};

/// Screens of the wizard.
///
/// PersonalInfo ⇄ Education ⇄ Preferences → Submitted. The last hop only
/// happens through a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PersonalInfo,
    Education,
    Preferences,
    Submitted,
}

impl Step {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Step) -> bool {
        use Step::*;
        matches!(
            (self, target),
            (PersonalInfo, Education)
                | (Education, Preferences)
                | (Preferences, Submitted)
                | (Education, PersonalInfo)
                | (Preferences, Education)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }

    /// Target of a validated forward move. Preferences has none: it submits.
    pub fn forward(&self) -> Option<Step> {
        match self {
            Self::PersonalInfo => Some(Self::Education),
            Self::Education => Some(Self::Preferences),
            Self::Preferences | Self::Submitted => None,
        }
    }

    pub fn backward(&self) -> Option<Step> {
        match self {
            Self::Education => Some(Self::PersonalInfo),
            Self::Preferences => Some(Self::Education),
            Self::PersonalInfo | Self::Submitted => None,
        }
    }

    /// 1-based position, as shown to the user.
    pub fn number(&self) -> u8 {
        match self {
            Self::PersonalInfo => 1,
            Self::Education => 2,
            Self::Preferences => 3,
            Self::Submitted => 4,
        }
    }

    /// Progress bar fill for the form steps; `None` once submitted.
    pub fn progress_percent(&self) -> Option<u8> {
        if self.is_terminal() {
            None
        } else {
            Some((u16::from(self.number()) * 100 / 3) as u8)
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::PersonalInfo
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::Education => "education",
            Self::Preferences => "preferences",
            Self::Submitted => "submitted",
        };
        write!(f, "{s}")
    }
}

/// Owns the current step and gates forward moves on validation.
#[derive(Debug, Clone, Default)]
pub struct StepController {
    step: Step,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Step {
        self.step
    }

    /// Validate the current step's required fields and move forward if they
    /// all pass. On failure the step is unchanged and every failing field is
    /// reported.
    pub fn advance(&mut self, record: &FormRecord) -> Result<Step, StepError> {
        let next = self
            .step
            .forward()
            .ok_or(StepError::NoForwardTransition(self.step))?;

        let fields = validator::required_fields(self.step, record);
        let errors = validator::validate_fields(&fields, record);
        if !errors.is_valid() {
            return Err(StepError::Invalid(errors));
        }

        self.transition(next)
    }

    /// Move back one step. No validation; a no-op on the first and terminal
    /// steps.
    pub fn retreat(&mut self) -> Step {
        if let Some(previous) = self.step.backward() {
            self.step = previous;
        }
        self.step
    }

    /// Enter the terminal step. Only the submission success path calls this.
    /// Navigation stays live while a relay call runs, so any form step may be
    /// current when the record is accepted.
    pub(crate) fn complete(&mut self) -> Result<Step, StepError> {
        if self.step.is_terminal() {
            return Err(StepError::NoForwardTransition(self.step));
        }
        tracing::debug!(from = %self.step, to = %Step::Submitted, "Step transition");
        self.step = Step::Submitted;
        Ok(self.step)
    }

    pub fn reset(&mut self) {
        self.step = Step::default();
    }

    fn transition(&mut self, target: Step) -> Result<Step, StepError> {
        if !self.step.can_transition_to(target) {
            return Err(StepError::NoForwardTransition(self.step));
        }
        tracing::debug!(from = %self.step, to = %target, "Step transition");
        self.step = target;
        Ok(target)
    }
}

/// Field failures carried by a step error; empty for any other error.
pub fn errors_of(err: &StepError) -> ValidationState {
    match err {
        StepError::Invalid(errors) => errors.clone(),
        StepError::NoForwardTransition(_) => ValidationState::default(),
    }
}
