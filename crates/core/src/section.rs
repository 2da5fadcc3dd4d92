use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::kind::RecordKind;
use crate::status::{SectionName, SectionStatus};

/// One status-bearing sub-document.
///
/// The message is only ever set by a transition and survives later
/// transitions that do not supply one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub status: SectionStatus,
    pub message: Option<String>,
}

impl Section {
    pub fn new(status: SectionStatus) -> Self {
        Section {
            status,
            message: None,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.status.section().type_tag()
    }
}

/// Wire form of a section: `{"type": ..., "status": ..., "message": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSection {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// The sections of a record, keyed by name.
///
/// Deserialization validates every status against its section, so a
/// `Sections` value never holds a status from the wrong set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<SectionName, RawSection>",
    into = "BTreeMap<SectionName, RawSection>"
)]
pub struct Sections(BTreeMap<SectionName, Section>);

impl Sections {
    /// All sections of `kind`, each at its initial status.
    pub fn initial_for(kind: RecordKind) -> Self {
        Sections(
            kind.sections()
                .iter()
                .map(|name| (*name, Section::new(name.initial_status())))
                .collect(),
        )
    }

    pub fn get(&self, name: SectionName) -> Option<&Section> {
        self.0.get(&name)
    }

    pub fn get_mut(&mut self, name: SectionName) -> Option<&mut Section> {
        self.0.get_mut(&name)
    }

    pub fn contains(&self, name: SectionName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionName, &Section)> {
        self.0.iter().map(|(name, section)| (*name, section))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<SectionName, RawSection>> for Sections {
    type Error = ValidationError;

    fn try_from(raw: BTreeMap<SectionName, RawSection>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(name, section)| {
                let status = name.parse_status(&section.status)?;
                Ok((
                    name,
                    Section {
                        status,
                        message: section.message,
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, ValidationError>>()
            .map(Sections)
    }
}

impl From<Sections> for BTreeMap<SectionName, RawSection> {
    fn from(sections: Sections) -> Self {
        sections
            .0
            .into_iter()
            .map(|(name, section)| {
                (
                    name,
                    RawSection {
                        kind: Some(name.type_tag().to_string()),
                        status: section.status.as_str().to_string(),
                        message: section.message,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{GicStatus, OfferLetterStatus};

    #[test]
    fn application_sections_start_under_review() {
        let sections = Sections::initial_for(RecordKind::Application);
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections.get(SectionName::OfferLetter).map(|s| s.status),
            Some(SectionStatus::OfferLetter(OfferLetterStatus::UnderReview))
        );
        assert_eq!(
            sections.get(SectionName::Gic).map(|s| s.status),
            Some(SectionStatus::Gic(GicStatus::UnderReview))
        );
        assert!(!sections.contains(SectionName::Ticket));
    }

    #[test]
    fn serializes_with_type_tag() {
        let mut sections = Sections::initial_for(RecordKind::Application);
        if let Some(gic) = sections.get_mut(SectionName::Gic) {
            gic.status = SectionStatus::Gic(GicStatus::Reject);
            gic.message = Some("missing documents".to_string());
        }
        let json = serde_json::to_value(&sections).expect("serialize");
        assert_eq!(json["gic"]["type"], "GIC");
        assert_eq!(json["gic"]["status"], "reject");
        assert_eq!(json["gic"]["message"], "missing documents");
        assert_eq!(json["offerLetter"]["type"], "Offer Letter");
        assert_eq!(json["offerLetter"]["message"], serde_json::Value::Null);

        let back: Sections = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, sections);
    }

    #[test]
    fn deserialization_rejects_status_from_wrong_set() {
        let json = serde_json::json!({
            "gic": { "type": "GIC", "status": "completed", "message": null }
        });
        let err = serde_json::from_value::<Sections>(json).unwrap_err();
        assert!(err.to_string().contains("completed"), "{err}");
    }

    #[test]
    fn deserialization_rejects_unknown_section_names() {
        let json = serde_json::json!({ "visa": { "status": "under review" } });
        assert!(serde_json::from_value::<Sections>(json).is_err());
    }
}
