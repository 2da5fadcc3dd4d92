//! visaflow-core: shared vocabulary for the visaflow workflow backend.
//!
//! Everything in this crate is pure data and validation. It defines the
//! closed sets the rest of the workspace relies on, so that raw strings from
//! the HTTP boundary are parsed exactly once:
//!
//! - [`Category`], [`DateStamp`], [`SequenceKey`], [`Identifier`] -- the
//!   `AP-YYMMDD##` identifier family
//! - [`SectionName`], [`SectionStatus`] and the per-section status enums
//! - [`Section`], [`Sections`] -- the status-bearing sub-documents of a record
//! - [`RecordKind`] -- which sections and identifier category a record has
//! - [`Role`] -- admin / agent / student
//! - [`TransitionPolicy`] -- permissive or forward-only transitions
//! - [`ValidationError`] -- everything that can go wrong while parsing

/// Crate version reported by the HTTP health endpoint and the CLI.
pub const VISAFLOW_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod ids;
pub mod kind;
pub mod policy;
pub mod role;
pub mod section;
pub mod status;

pub use error::ValidationError;
pub use ids::{Category, DateStamp, Identifier, SequenceKey, MAX_SEQUENCE};
pub use kind::RecordKind;
pub use policy::TransitionPolicy;
pub use role::Role;
pub use section::{Section, Sections};
pub use status::{
    GicStatus, OfferLetterStatus, PageStatus, SectionName, SectionStatus, TicketStatus,
};
