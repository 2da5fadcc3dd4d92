//! Section names and their closed status sets.
//!
//! | Section       | Statuses                                                  |
//! |---------------|-----------------------------------------------------------|
//! | `offerLetter` | `under review`, `approved`, `rejected`                    |
//! | `gic`         | `under review`, `success`, `reject`                       |
//! | `pageStatus`  | `registering`, `inProgress`, `completed`, `pending`, `rejected` |
//! | `ticket`      | `under review`, `approved`, `reject`                      |
//!
//! The offer letter set also accepts `success` and `reject` on input, the
//! older spellings of `approved` and `rejected`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// Declares a status enum with its wire spelling, input aliases and whether
/// the status is terminal.
macro_rules! status_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident = $wire:literal $(| $alias:literal)* , terminal = $terminal:literal ; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }

            pub fn is_terminal(self) -> bool {
                match self {
                    $( $name::$variant => $terminal, )+
                }
            }

            pub fn parse(raw: &str) -> Option<Self> {
                match raw {
                    $( $wire $( | $alias )* => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_set! {
    /// Offer letter decision.
    OfferLetterStatus {
        UnderReview = "under review", terminal = false;
        Approved = "approved" | "success", terminal = true;
        Rejected = "rejected" | "reject", terminal = true;
    }
}

status_set! {
    /// Guaranteed Investment Certificate verification.
    GicStatus {
        UnderReview = "under review", terminal = false;
        Success = "success", terminal = true;
        Reject = "reject", terminal = true;
    }
}

status_set! {
    /// Registration progress of a student or agent profile.
    PageStatus {
        Registering = "registering", terminal = false;
        InProgress = "inProgress", terminal = false;
        Pending = "pending", terminal = false;
        Completed = "completed", terminal = true;
        Rejected = "rejected", terminal = true;
    }
}

status_set! {
    /// Support ticket / withdrawal request review.
    TicketStatus {
        UnderReview = "under review", terminal = false;
        Approved = "approved", terminal = true;
        Reject = "reject", terminal = true;
    }
}

/// A named status-bearing sub-document of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionName {
    #[serde(rename = "offerLetter")]
    OfferLetter,
    #[serde(rename = "gic")]
    Gic,
    #[serde(rename = "pageStatus")]
    PageStatus,
    #[serde(rename = "ticket")]
    Ticket,
}

impl SectionName {
    pub const ALL: [SectionName; 4] = [
        SectionName::OfferLetter,
        SectionName::Gic,
        SectionName::PageStatus,
        SectionName::Ticket,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::OfferLetter => "offerLetter",
            SectionName::Gic => "gic",
            SectionName::PageStatus => "pageStatus",
            SectionName::Ticket => "ticket",
        }
    }

    /// Fixed descriptive tag stored alongside the status (`type` on the wire).
    pub fn type_tag(self) -> &'static str {
        match self {
            SectionName::OfferLetter => "Offer Letter",
            SectionName::Gic => "GIC",
            SectionName::PageStatus => "Page Status",
            SectionName::Ticket => "Ticket",
        }
    }

    /// Status a freshly created section starts in.
    pub fn initial_status(self) -> SectionStatus {
        match self {
            SectionName::OfferLetter => SectionStatus::OfferLetter(OfferLetterStatus::UnderReview),
            SectionName::Gic => SectionStatus::Gic(GicStatus::UnderReview),
            SectionName::PageStatus => SectionStatus::Page(PageStatus::Registering),
            SectionName::Ticket => SectionStatus::Ticket(TicketStatus::UnderReview),
        }
    }

    /// Every status of this section's set, in declaration order.
    pub fn statuses(self) -> Vec<SectionStatus> {
        match self {
            SectionName::OfferLetter => OfferLetterStatus::ALL
                .iter()
                .map(|s| SectionStatus::OfferLetter(*s))
                .collect(),
            SectionName::Gic => GicStatus::ALL.iter().map(|s| SectionStatus::Gic(*s)).collect(),
            SectionName::PageStatus => PageStatus::ALL
                .iter()
                .map(|s| SectionStatus::Page(*s))
                .collect(),
            SectionName::Ticket => TicketStatus::ALL
                .iter()
                .map(|s| SectionStatus::Ticket(*s))
                .collect(),
        }
    }

    /// Validate a raw status string against this section's set.
    pub fn parse_status(self, raw: &str) -> Result<SectionStatus, ValidationError> {
        let parsed = match self {
            SectionName::OfferLetter => OfferLetterStatus::parse(raw).map(SectionStatus::OfferLetter),
            SectionName::Gic => GicStatus::parse(raw).map(SectionStatus::Gic),
            SectionName::PageStatus => PageStatus::parse(raw).map(SectionStatus::Page),
            SectionName::Ticket => TicketStatus::parse(raw).map(SectionStatus::Ticket),
        };
        parsed.ok_or_else(|| ValidationError::InvalidStatus {
            section: self,
            status: raw.to_string(),
        })
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownSection(s.to_string()))
    }
}

/// A status that is known to belong to a particular section's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionStatus {
    OfferLetter(OfferLetterStatus),
    Gic(GicStatus),
    Page(PageStatus),
    Ticket(TicketStatus),
}

impl SectionStatus {
    pub fn section(self) -> SectionName {
        match self {
            SectionStatus::OfferLetter(_) => SectionName::OfferLetter,
            SectionStatus::Gic(_) => SectionName::Gic,
            SectionStatus::Page(_) => SectionName::PageStatus,
            SectionStatus::Ticket(_) => SectionName::Ticket,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionStatus::OfferLetter(s) => s.as_str(),
            SectionStatus::Gic(s) => s.as_str(),
            SectionStatus::Page(s) => s.as_str(),
            SectionStatus::Ticket(s) => s.as_str(),
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            SectionStatus::OfferLetter(s) => s.is_terminal(),
            SectionStatus::Gic(s) => s.is_terminal(),
            SectionStatus::Page(s) => s.is_terminal(),
            SectionStatus::Ticket(s) => s.is_terminal(),
        }
    }
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SectionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
