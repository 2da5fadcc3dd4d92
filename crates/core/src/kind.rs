use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::Category;
use crate::status::SectionName;

/// The kinds of workflow record the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// An application to an institution (offer letter + GIC).
    Application,
    /// An agent's company profile.
    Agent,
    /// A student's information profile.
    Student,
    /// A support ticket or withdrawal request.
    Ticket,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Application,
        RecordKind::Agent,
        RecordKind::Student,
        RecordKind::Ticket,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Application => "application",
            RecordKind::Agent => "agent",
            RecordKind::Student => "student",
            RecordKind::Ticket => "ticket",
        }
    }

    /// Identifier category, or `None` for kinds created without one.
    pub fn category(self) -> Option<Category> {
        match self {
            RecordKind::Application => Some(Category::Application),
            RecordKind::Agent => Some(Category::Agent),
            RecordKind::Student => None,
            RecordKind::Ticket => Some(Category::Ticket),
        }
    }

    pub fn sections(self) -> &'static [SectionName] {
        match self {
            RecordKind::Application => &[SectionName::OfferLetter, SectionName::Gic],
            RecordKind::Agent | RecordKind::Student => &[SectionName::PageStatus],
            RecordKind::Ticket => &[SectionName::Ticket],
        }
    }

    pub fn has_section(self, name: SectionName) -> bool {
        self.sections().contains(&name)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKind(s.to_string()))
    }
}
