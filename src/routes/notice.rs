use serde::{Deserialize, Serialize};

use crate::certificate::DeliveryReport;
use crate::error::CertificateError;

/// Outcome shown on the setup page after a redirect, carried in the query
/// string instead of a session flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum NoticeKind {
    TemplateSaved,
    AllSent,
    PartiallySent,
    MissingBase,
    MalformedImage,
    Failed,
}

impl NoticeKind {
    pub const ALL: [NoticeKind; 6] = [
        Self::TemplateSaved,
        Self::AllSent,
        Self::PartiallySent,
        Self::MissingBase,
        Self::MalformedImage,
        Self::Failed,
    ];

    /// Query-string token; also the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemplateSaved => "template-saved",
            Self::AllSent => "all-sent",
            Self::PartiallySent => "partially-sent",
            Self::MissingBase => "missing-base",
            Self::MalformedImage => "malformed-image",
            Self::Failed => "failed",
        }
    }
}

impl From<NoticeKind> for &'static str {
    fn from(kind: NoticeKind) -> Self {
        kind.as_str()
    }
}

impl TryFrom<String> for NoticeKind {
    type Error = String;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == token)
            .ok_or_else(|| format!("unknown notice: {}", token))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<NoticeKind>,
    pub sent: Option<usize>,
    pub attempted: Option<usize>,
}

impl NoticeQuery {
    pub fn message(&self) -> Option<String> {
        let kind = self.notice?;
        Some(match kind {
            NoticeKind::TemplateSaved => "Certificate template saved.".to_string(),
            NoticeKind::AllSent => "All certificates sent!".to_string(),
            NoticeKind::PartiallySent => format!(
                "Sent {} of {} certificates. Some students could not be reached.",
                self.sent.unwrap_or(0),
                self.attempted.unwrap_or(0)
            ),
            NoticeKind::MissingBase => "First, import a template and signature!".to_string(),
            NoticeKind::MalformedImage => {
                "Form has errors! Upload a valid background and signature image.".to_string()
            }
            NoticeKind::Failed => "Something went wrong. Please try again.".to_string(),
        })
    }
}

pub fn notice_for_error(err: &CertificateError) -> NoticeKind {
    match err {
        CertificateError::MissingBaseImage(_) => NoticeKind::MissingBase,
        CertificateError::MalformedImageInput { .. } => NoticeKind::MalformedImage,
        _ => NoticeKind::Failed,
    }
}

pub fn setup_url(class_id: i32, kind: NoticeKind) -> String {
    format!("/classes/{}/certificate?notice={}", class_id, kind.as_str())
}

pub fn delivery_url(report: &DeliveryReport) -> String {
    if report.is_complete() {
        return setup_url(report.class_id, NoticeKind::AllSent);
    }
    format!(
        "{}&sent={}&attempted={}",
        setup_url(report.class_id, NoticeKind::PartiallySent),
        report.sent.len(),
        report.attempted()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::pipeline::DeliveryFailure;
    use std::path::PathBuf;

    fn parse(url: &str) -> NoticeQuery {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        let params: std::collections::HashMap<&str, &str> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();
        NoticeQuery {
            notice: params
                .get("notice")
                .map(|n| serde_json::from_value(serde_json::json!(n)).unwrap()),
            sent: params.get("sent").map(|s| s.parse().unwrap()),
            attempted: params.get("attempted").map(|s| s.parse().unwrap()),
        }
    }

    #[test]
    fn missing_base_redirects_with_setup_prompt() {
        let err = CertificateError::MissingBaseImage(PathBuf::from("x.jpeg"));
        let url = setup_url(3, notice_for_error(&err));
        assert_eq!(url, "/classes/3/certificate?notice=missing-base");
        assert_eq!(
            parse(&url).message().unwrap(),
            "First, import a template and signature!"
        );
    }

    #[test]
    fn complete_delivery_reports_all_sent() {
        let report = DeliveryReport {
            class_id: 5,
            sent: vec![1, 2],
            failures: vec![],
        };
        assert_eq!(
            parse(&delivery_url(&report)).message().unwrap(),
            "All certificates sent!"
        );
    }

    #[test]
    fn partial_delivery_carries_counts() {
        let report = DeliveryReport {
            class_id: 5,
            sent: vec![1],
            failures: vec![DeliveryFailure {
                student_id: 2,
                email: "grace@example.org".to_string(),
                reason: "mailbox unavailable".to_string(),
            }],
        };
        let url = delivery_url(&report);
        assert_eq!(
            url,
            "/classes/5/certificate?notice=partially-sent&sent=1&attempted=2"
        );
        assert!(parse(&url).message().unwrap().starts_with("Sent 1 of 2 certificates"));
    }

    #[test]
    fn every_notice_survives_the_redirect() {
        for kind in NoticeKind::ALL {
            let url = setup_url(7, kind);
            assert_eq!(parse(&url).notice, Some(kind), "{url}");
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
        assert!(serde_json::from_value::<NoticeKind>(serde_json::json!("sent-all")).is_err());
    }

    #[test]
    fn no_notice_means_no_message() {
        assert!(NoticeQuery::default().message().is_none());
    }
}
