use std::fmt::Write as _;

use serde::Serialize;

use crate::matching::{FeatureErrors, MatchOutcome, MatchedSubject};

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// Console report: total errors, min/median/max error, then the three ids.
pub fn render_text(outcome: &MatchOutcome) -> String {
    let mut out = String::new();
    let totals: Vec<String> = outcome.totals.iter().map(|v| format_error(*v)).collect();
    let _ = writeln!(out, "[{}]", totals.join(", "));
    let _ = writeln!(
        out,
        "{} {} {}",
        format_error(outcome.best.error),
        format_error(outcome.median.error),
        format_error(outcome.worst.error)
    );
    let _ = writeln!(out, "{} {} {}", outcome.best.id, outcome.median.id, outcome.worst.id);

    for (label, m) in [("best", &outcome.best), ("median", &outcome.median), ("worst", &outcome.worst)] {
        if let Some(url) = m.id.hrtf_url() {
            let _ = writeln!(out, "{label:>6}: {url}");
        }
    }
    out
}

/// Totals are sums of 3-decimal values; print them at that precision.
fn format_error(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        let s = format!("{v:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MatchReport<'a> {
    pub best: ReportedMatch,
    pub median: ReportedMatch,
    pub worst: ReportedMatch,
    pub totals: &'a [f64],
    pub features: &'a [FeatureErrors],
}

#[derive(Debug, Serialize)]
pub struct ReportedMatch {
    #[serde(flatten)]
    pub subject: MatchedSubject,
    pub hrtf_url: Option<String>,
}

impl From<MatchedSubject> for ReportedMatch {
    fn from(subject: MatchedSubject) -> Self {
        ReportedMatch { hrtf_url: subject.id.hrtf_url(), subject }
    }
}

pub fn render_json(outcome: &MatchOutcome) -> serde_json::Result<String> {
    let report = MatchReport {
        best: outcome.best.into(),
        median: outcome.median.into(),
        worst: outcome.worst.into(),
        totals: &outcome.totals,
        features: &outcome.features,
    };
    serde_json::to_string_pretty(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SubjectId;

    fn outcome() -> MatchOutcome {
        let m = |index, id, error| MatchedSubject { index, id: SubjectId(id), error };
        MatchOutcome {
            features: Vec::new(),
            totals: vec![1.5, 0.25, 2.0],
            best: m(1, 3002, 0.25),
            median: m(0, 3001, 1.5),
            worst: m(2, 3003, 2.0),
        }
    }

    #[test]
    fn text_lists_totals_then_ids() {
        let text = render_text(&outcome());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[1.5, 0.25, 2]");
        assert_eq!(lines[1], "0.25 1.5 2");
        assert_eq!(lines[2], "3002 3001 3003");
        assert!(lines[3].ends_with("hrtf_nh2.sofa"));
    }

    #[test]
    fn json_carries_urls() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&outcome()).unwrap()).unwrap();
        assert_eq!(json["best"]["id"], 3002);
        assert_eq!(
            json["best"]["hrtf_url"],
            "https://sofacoustics.org/data/database/ari/hrtf_nh2.sofa"
        );
        assert_eq!(json["totals"].as_array().unwrap().len(), 3);
    }
}
