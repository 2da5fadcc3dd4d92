use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::kind::RecordKind;
use crate::status::SectionName;

/// The three actor roles of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Agent, Role::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Student => "student",
        }
    }

    /// Whether this role may create a record of `kind`.
    pub fn can_create(self, kind: RecordKind) -> bool {
        match (self, kind) {
            (Role::Admin, RecordKind::Ticket) => false,
            (Role::Admin, _) => true,
            (Role::Agent, _) => true,
            (Role::Student, RecordKind::Agent) => false,
            (Role::Student, _) => true,
        }
    }

    /// Whether this role may apply transitions to `section`. Only admins
    /// review and decide.
    pub fn can_transition(self, _section: SectionName) -> bool {
        matches!(self, Role::Admin)
    }

    /// Admins see every record; other roles only records they own or are
    /// linked to as agent.
    pub fn sees_all_records(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_cannot_register_agents() {
        assert!(!Role::Student.can_create(RecordKind::Agent));
        assert!(Role::Student.can_create(RecordKind::Application));
        assert!(Role::Student.can_create(RecordKind::Ticket));
        assert!(Role::Agent.can_create(RecordKind::Agent));
    }

    #[test]
    fn admins_do_not_raise_tickets() {
        assert!(!Role::Admin.can_create(RecordKind::Ticket));
        assert!(Role::Admin.can_create(RecordKind::Application));
    }

    #[test]
    fn only_admins_transition() {
        for section in SectionName::ALL {
            assert!(Role::Admin.can_transition(section));
            assert!(!Role::Agent.can_transition(section));
            assert!(!Role::Student.can_transition(section));
        }
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!("agent".parse::<Role>(), Ok(Role::Agent));
        assert_eq!(
            "Admin".parse::<Role>(),
            Err(ValidationError::UnknownRole("Admin".to_string()))
        );
    }
}
