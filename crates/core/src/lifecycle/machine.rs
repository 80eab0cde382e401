use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::RequestStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Submit,
    Approve,
    Reject,
    Award,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Award => "award",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub action: LifecycleAction,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleTransitionError {
    #[error("request is terminal in {state:?}; {action:?} is not permitted")]
    Terminal { state: RequestStatus, action: LifecycleAction },
    #[error("invalid transition from {state:?} using {action:?}")]
    InvalidTransition { state: RequestStatus, action: LifecycleAction },
}

/// The complete request graph:
///
/// ```text
/// draft --submit--> submitted --approve--> approved --award--> ordered
///                             \--reject--> rejected
/// ```
pub fn next_status(
    current: RequestStatus,
    action: LifecycleAction,
) -> Result<RequestStatus, LifecycleTransitionError> {
    use LifecycleAction::{Approve, Award, Reject, Submit};
    use RequestStatus::{Approved, Draft, Ordered, Rejected, Submitted};

    if current.is_terminal() {
        return Err(LifecycleTransitionError::Terminal { state: current, action });
    }

    match (current, action) {
        (Draft, Submit) => Ok(Submitted),
        (Submitted, Approve) => Ok(Approved),
        (Submitted, Reject) => Ok(Rejected),
        (Approved, Award) => Ok(Ordered),
        _ => Err(LifecycleTransitionError::InvalidTransition { state: current, action }),
    }
}
