use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::status::SectionStatus;

/// Which moves between statuses of one section are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPolicy {
    /// Any status of the set may follow any other.
    #[default]
    Permissive,
    /// A terminal status is final. Re-applying the same status is still
    /// allowed so a new message can be attached.
    ForwardOnly,
}

impl TransitionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionPolicy::Permissive => "permissive",
            TransitionPolicy::ForwardOnly => "forward-only",
        }
    }

    /// Check a move from `from` to `to`. Both must belong to the same section.
    pub fn check(self, from: SectionStatus, to: SectionStatus) -> Result<(), ValidationError> {
        debug_assert_eq!(from.section(), to.section());
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::ForwardOnly if from.is_terminal() && from != to => {
                Err(ValidationError::ForbiddenTransition {
                    section: from.section(),
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                })
            }
            TransitionPolicy::ForwardOnly => Ok(()),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "forward-only" => Ok(TransitionPolicy::ForwardOnly),
            other => Err(ValidationError::UnknownPolicy(other.to_string())),
        }
    }
}
