use visaflow_core::SectionStatus;
use visaflow_storage::{Party, WorkflowRecord};

use super::Notification;

/// Offer letter decision notice for `party`, about `record` reaching `status`.
pub fn offer_letter_decision(
    record: &WorkflowRecord,
    party: &Party,
    status: SectionStatus,
) -> Notification {
    let reference = record
        .identifier
        .map(|id| id.to_string())
        .unwrap_or_else(|| record.id.clone());
    let institution = record
        .details
        .get("institution")
        .and_then(|v| v.as_str())
        .unwrap_or("your institution");
    let message = record
        .section(status.section())
        .and_then(|s| s.message.as_deref());

    let mut html_body = format!(
        "<p>Dear {name},</p>\n\
         <p>The offer letter for application <strong>{reference}</strong> \
         ({institution}) has been <strong>{status}</strong>.</p>\n",
        name = escape_html(&party.name),
        reference = escape_html(&reference),
        institution = escape_html(institution),
        status = escape_html(status.as_str()),
    );
    if let Some(message) = message {
        html_body.push_str(&format!("<p>{}</p>\n", escape_html(message)));
    }
    html_body.push_str("<p>Regards,<br>Admissions team</p>\n");

    Notification {
        to: party.email.clone(),
        subject: format!("Offer letter {status} for {reference}"),
        html_body,
    }
}

/// Escape the five characters that are significant in HTML text and
/// attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use visaflow_core::{Identifier, OfferLetterStatus, RecordKind, SectionName};
    use visaflow_storage::NewRecord;

    fn record() -> WorkflowRecord {
        let student = Party {
            id: "student-1".into(),
            name: "Ana <Admin>".into(),
            email: "ana@example.com".into(),
        };
        let id: Identifier = "AP-24092601".parse().expect("identifier");
        let mut record = WorkflowRecord::new(
            "rec-1".into(),
            Some(id),
            NewRecord {
                kind: RecordKind::Application,
                owner: student,
                agent: None,
                details: serde_json::json!({ "institution": "Maple & Co College" }),
            },
            "2024-09-26T10:00:00Z".into(),
        );
        if let Some(section) = record.sections.get_mut(SectionName::OfferLetter) {
            section.status = SectionStatus::OfferLetter(OfferLetterStatus::Approved);
            section.message = Some("Welcome aboard!".into());
        }
        record
    }

    #[test]
    fn decision_mentions_identifier_and_message() {
        let record = record();
        let n = offer_letter_decision(
            &record,
            &record.owner,
            SectionStatus::OfferLetter(OfferLetterStatus::Approved),
        );
        assert_eq!(n.to, "ana@example.com");
        assert_eq!(n.subject, "Offer letter approved for AP-24092601");
        assert!(n.html_body.contains("AP-24092601"));
        assert!(n.html_body.contains("Welcome aboard!"));
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let record = record();
        let n = offer_letter_decision(
            &record,
            &record.owner,
            SectionStatus::OfferLetter(OfferLetterStatus::Approved),
        );
        assert!(n.html_body.contains("Ana &lt;Admin&gt;"));
        assert!(n.html_body.contains("Maple &amp; Co College"));
        assert!(!n.html_body.contains("<Admin>"));
    }

    #[test]
    fn escape_covers_quotes() {
        assert_eq!(escape_html(r#"a"b'c"#), "a&quot;b&#39;c");
    }
}
