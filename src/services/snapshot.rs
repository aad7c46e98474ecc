use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::models::{Applicant, ApplicantRow, RoundReport};

/// Errors that can occur while reading applicants or writing a report
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Applicant #{index} ({handle}) failed validation: {source}")]
    Validation {
        index: usize,
        handle: String,
        #[source]
        source: validator::ValidationErrors,
    },
}

/// Parse a JSON array of applicant rows
///
/// Unknown grade or location codes and unparseable timezones fail here.
pub fn parse_snapshot(json: &str) -> Result<Vec<ApplicantRow>, SnapshotError> {
    Ok(serde_json::from_str(json)?)
}

pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Vec<ApplicantRow>, SnapshotError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let rows = parse_snapshot(&json)?;
    info!("Loaded {} applicant rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Keep eligible rows and turn them into applicants
///
/// Withdrawn, excluded, unpaid and non-matchable grades are dropped. Every
/// kept row must pass validation; one bad row fails the whole snapshot.
pub fn filter_eligible(rows: Vec<ApplicantRow>) -> Result<Vec<Applicant>, SnapshotError> {
    let total = rows.len();
    let mut applicants = Vec::with_capacity(total);

    for (index, row) in rows.into_iter().enumerate() {
        if !row.is_eligible() {
            continue;
        }
        row.validate().map_err(|source| SnapshotError::Validation {
            index,
            handle: row.handle.clone(),
            source,
        })?;
        applicants.push(row.into_applicant());
    }

    let dropped = total - applicants.len();
    if dropped > 0 {
        warn!("Dropped {} ineligible applicants", dropped);
    }
    info!("{} of {} applicants are eligible", applicants.len(), total);

    Ok(applicants)
}

pub async fn write_report(path: impl AsRef<Path>, report: &RoundReport) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;

    info!("Wrote {} pairs to {}", report.pair_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(handle: &str, grade: &str, paid: bool, quitted: bool) -> serde_json::Value {
        json!({
            "id": uuid::Uuid::new_v4(),
            "handle": handle,
            "sex": "M",
            "preferred_sex": "F",
            "grade": grade,
            "school": "CUHK",
            "timezone": 8,
            "location": "SZ",
            "mbti_ei": 50, "mbti_sn": 50, "mbti_tf": 50, "mbti_jp": 50,
            "preferred_mbti_ei": "x",
            "preferred_mbti_sn": "x",
            "preferred_mbti_tf": "x",
            "preferred_mbti_jp": "x",
            "acceptable_grades": ["UG1", "UG2"],
            "acceptable_schools": ["CUHK"],
            "max_time_difference": 2,
            "reply_frequency": 3,
            "quitted": quitted,
            "payment_id": if paid { json!("p") } else { json!(null) }
        })
    }

    #[test]
    fn test_filter_eligible_drops_ineligible_rows() {
        let snapshot = json!([
            row("keep", "UG1", true, false),
            row("unpaid", "UG1", false, false),
            row("quit", "UG1", true, true),
            row("grad", "GRAD", true, false),
        ])
        .to_string();

        let rows = parse_snapshot(&snapshot).unwrap();
        let applicants = filter_eligible(rows).unwrap();

        assert_eq!(applicants.len(), 1);
        assert_eq!(applicants[0].handle, "keep");
    }

    #[test]
    fn test_invalid_eligible_row_fails_the_snapshot() {
        let mut bad = row("bad", "UG1", true, false);
        bad["mbti_ei"] = json!(140);
        let snapshot = json!([row("ok", "UG1", true, false), bad]).to_string();

        let rows = parse_snapshot(&snapshot).unwrap();
        match filter_eligible(rows) {
            Err(SnapshotError::Validation { index, handle, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(handle, "bad");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(parse_snapshot("[{"), Err(SnapshotError::Json(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = tokio_test::block_on(load_snapshot("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/snapshot.json"));
    }
}
