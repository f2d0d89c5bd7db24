use chrono::Local;
use log::{debug, info, warn};

use crate::columns::{ColumnMapping, Field};
use crate::error::Result;
use crate::sheet::SheetStore;
use crate::student::StudentRecord;

/// Upper bound on operator comments.
pub const MAX_COMMENT_LEN: usize = 200;

/// Upper bound on a scanned payload; anything longer is rejected upstream.
pub const MAX_QR_LEN: usize = 512;

/// Check-in status chosen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Checked,
    Problematic,
    Suspicious,
    Absent,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Checked" => Some(Status::Checked),
            "Problematic" => Some(Status::Problematic),
            "Suspicious" => Some(Status::Suspicious),
            "Absent" => Some(Status::Absent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Checked => "Checked",
            Status::Problematic => "Problematic",
            Status::Suspicious => "Suspicious",
            Status::Absent => "Absent",
        }
    }
}

/// One QR matching strategy: a label for the log and a predicate over the
/// (trimmed) sheet code and scanned code.
struct Matcher {
    label: &'static str,
    matches: fn(&str, &str) -> bool,
}

/// Matching cascade, evaluated top to bottom; first success wins.
const MATCHERS: [Matcher; 3] = [
    Matcher {
        label: "exact",
        matches: match_exact,
    },
    Matcher {
        label: "case-insensitive",
        matches: match_case_insensitive,
    },
    Matcher {
        label: "whitespace-insensitive",
        matches: match_whitespace_insensitive,
    },
];

fn match_exact(sheet: &str, scanned: &str) -> bool {
    sheet == scanned
}

fn match_case_insensitive(sheet: &str, scanned: &str) -> bool {
    sheet.eq_ignore_ascii_case(scanned)
}

fn match_whitespace_insensitive(sheet: &str, scanned: &str) -> bool {
    strip_whitespace(sheet) == strip_whitespace(scanned)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Locate the record matching a scanned code
///
/// Scans the fetched data rows in physical order and returns the first row
/// whose QR cell satisfies the cascade, together with its physical 1-based
/// sheet row. Rows with an empty QR cell are skipped. A match is returned
/// regardless of the Used flag; branching on consumption state is the
/// caller's job.
pub fn locate(
    rows: &[Vec<String>],
    mapping: &ColumnMapping,
    scanned: &str,
) -> Option<(StudentRecord, u32)> {
    let scanned = scanned.trim();
    debug!("Searching {} rows for scanned code '{}'", rows.len(), scanned);

    for (offset, row) in rows.iter().enumerate() {
        let sheet_row = mapping.data_start_row() + offset as u32;
        let sheet_code = mapping.value(row, Field::QrCode).trim();
        if sheet_code.is_empty() {
            continue;
        }

        for matcher in &MATCHERS {
            if (matcher.matches)(sheet_code, scanned) {
                let record = StudentRecord::from_row(row, mapping);
                info!(
                    "{} match at row {}: {}",
                    matcher.label, sheet_row, record.student_name
                );
                return Some((record, sheet_row));
            }
        }

        // Containment either way is a near miss worth logging, never a match.
        if sheet_code.contains(scanned) || scanned.contains(sheet_code) {
            debug!(
                "Near miss at row {}: sheet='{}' scanned='{}'",
                sheet_row, sheet_code, scanned
            );
        }
    }

    warn!(
        "Scanned code '{}' not found after checking {} rows",
        scanned,
        rows.len()
    );
    None
}

/// Build the cell writes for a check-in
///
/// Status, Comment and Coordinator come from the caller; Used is forced to
/// "Yes" and LastCheckedTime to the supplied timestamp. Fields whose column
/// did not resolve are omitted; a partial write is acceptable.
fn build_write_plan(
    mapping: &ColumnMapping,
    status: Status,
    comment: &str,
    coordinator: &str,
    timestamp: &str,
) -> Vec<(u32, String)> {
    let mut plan = Vec::new();

    let mut put = |field: Field, value: String| {
        if let Some(col) = mapping.column(field) {
            plan.push((col, value));
        } else {
            debug!("Column for {} unresolved; omitted from update", field.name());
        }
    };

    put(Field::Status, status.as_str().to_string());
    put(Field::Comment, comment.to_string());
    put(Field::Coordinator, coordinator.to_string());
    put(Field::Used, "Yes".to_string());
    put(Field::LastCheckedTime, timestamp.to_string());

    plan
}

/// Mark a row as used with the coordinator's verdict
///
/// Issues one batched multi-cell write; the row is not read back, so success
/// means only that the write call did not fail. Input validation (status,
/// comment length, row index) happens at the request boundary before this is
/// reached.
pub async fn update(
    store: &dyn SheetStore,
    mapping: &ColumnMapping,
    row_index: u32,
    status: Status,
    comment: &str,
    coordinator: &str,
) -> Result<()> {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let plan = build_write_plan(mapping, status, comment, coordinator, &timestamp);

    store.write_cells(row_index, &plan).await?;
    info!(
        "Updated row {}: status={}, coordinator={}",
        row_index,
        status.as_str(),
        coordinator
    );
    Ok(())
}
