use crate::kind::RecordKind;
use crate::status::SectionName;

/// Malformed input to an allocation or transition call.
///
/// These are surfaced to the caller as-is and never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Not one of `application`, `agent`, `ticket`.
    #[error("unknown category '{0}' (expected application, agent or ticket)")]
    UnknownCategory(String),

    /// Not one of the known record kinds.
    #[error("unknown record kind '{0}' (expected application, agent, student or ticket)")]
    UnknownKind(String),

    /// Not a section name at all.
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    /// A real section name, but the record kind does not carry it.
    #[error("section '{section}' is not part of a {kind} record")]
    InvalidSection {
        section: SectionName,
        kind: RecordKind,
    },

    /// The status is not a member of the section's status set.
    #[error("status '{status}' is not valid for section '{section}'")]
    InvalidStatus {
        section: SectionName,
        status: String,
    },

    /// Rejected by the configured transition policy.
    #[error("section '{section}' may not move from '{from}' to '{to}'")]
    ForbiddenTransition {
        section: SectionName,
        from: String,
        to: String,
    },

    #[error("unknown role '{0}' (expected admin, agent or student)")]
    UnknownRole(String),

    #[error("unknown transition policy '{0}' (expected permissive or forward-only)")]
    UnknownPolicy(String),

    /// Does not match `^(AP|AG|TK)-\d{6}\d{2}$`.
    #[error("malformed identifier '{0}'")]
    MalformedIdentifier(String),
}
