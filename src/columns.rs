use std::collections::HashMap;

use log::{debug, info, warn};

use crate::error::Result;
use crate::sheet::SheetStore;

/// Logical fields of a student record
///
/// The order here is the canonical sheet order; the fixed no-header layout
/// and `ensure_columns` both derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    StudentId,
    StudentName,
    ClassRollNo,
    AdmissionDate,
    Section,
    Group,
    Email,
    Mobile,
    FatherName,
    FoodPreference,
    Photo,
    QrCode,
    Status,
    Comment,
    LastCheckedTime,
    Coordinator,
    Used,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::StudentId,
        Field::StudentName,
        Field::ClassRollNo,
        Field::AdmissionDate,
        Field::Section,
        Field::Group,
        Field::Email,
        Field::Mobile,
        Field::FatherName,
        Field::FoodPreference,
        Field::Photo,
        Field::QrCode,
        Field::Status,
        Field::Comment,
        Field::LastCheckedTime,
        Field::Coordinator,
        Field::Used,
    ];

    /// Canonical header spelling for this field.
    pub fn name(&self) -> &'static str {
        match self {
            Field::StudentId => "StudentID",
            Field::StudentName => "StudentName",
            Field::ClassRollNo => "ClassRollNo",
            Field::AdmissionDate => "AdmissionDate",
            Field::Section => "Section",
            Field::Group => "Group",
            Field::Email => "Email",
            Field::Mobile => "Mobile",
            Field::FatherName => "FatherName",
            Field::FoodPreference => "FoodPreference",
            Field::Photo => "Photo",
            Field::QrCode => "QRCode",
            Field::Status => "Status",
            Field::Comment => "Comment",
            Field::LastCheckedTime => "LastCheckedTime",
            Field::Coordinator => "Coordinator",
            Field::Used => "Used",
        }
    }

    /// Accepted alternate header spellings seen across deployed sheets.
    pub fn variants(&self) -> &'static [&'static str] {
        match self {
            Field::StudentId => &["Student ID", "ID"],
            Field::StudentName => &["Student Name", "Name"],
            Field::QrCode => &["QR Code", "QR", "QR String", "QRValue"],
            Field::Used => &["Scanned", "Checked"],
            Field::Coordinator => &["Checked By", "Verified By"],
            Field::LastCheckedTime => &["Last Checked Time", "Timestamp", "Checked Time"],
            _ => &[],
        }
    }

    fn matches_header(&self, header: &str) -> bool {
        let header = header.trim();
        if header == self.name() {
            return true;
        }
        match self {
            // QR headers vary the most in the wild, so the variant check is a
            // case-insensitive substring match rather than strict equality.
            Field::QrCode => {
                let lowered = header.to_lowercase();
                self.variants()
                    .iter()
                    .any(|v| lowered.contains(&v.to_lowercase()))
            }
            _ => {
                header.eq_ignore_ascii_case(self.name())
                    || self
                        .variants()
                        .iter()
                        .any(|v| header.eq_ignore_ascii_case(v))
            }
        }
    }
}

/// Static column layout for sheets without a header row.
#[derive(Debug, Clone)]
pub struct FixedLayout {
    columns: HashMap<Field, u32>,
}

impl FixedLayout {
    /// The canonical layout: fields in declaration order, columns 1..=17,
    /// data starting at physical row 1.
    pub fn canonical() -> Self {
        let columns = Field::ALL
            .iter()
            .enumerate()
            .map(|(i, f)| (*f, i as u32 + 1))
            .collect();
        Self { columns }
    }
}

/// Resolved correspondence between logical fields and physical columns
///
/// Fields that could not be resolved are simply absent: reads come back
/// empty and writes for them are skipped, never raised.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    columns: HashMap<Field, u32>,
    data_start_row: u32,
}

impl ColumnMapping {
    /// Resolve a mapping from a header row, or take a fixed layout verbatim.
    ///
    /// With a fixed layout the sheet has no header and data begins at row 1;
    /// with headers the first data row is physical row 2. Row indices handed
    /// to callers are physical sheet rows either way.
    pub fn resolve(header_row: Option<&[String]>, fixed: Option<&FixedLayout>) -> Self {
        if let Some(layout) = fixed {
            return Self {
                columns: layout.columns.clone(),
                data_start_row: 1,
            };
        }

        let headers = header_row.unwrap_or(&[]);
        let mut columns = HashMap::new();

        for field in Field::ALL {
            let hit = headers
                .iter()
                .position(|h| h.trim() == field.name())
                .or_else(|| headers.iter().position(|h| field.matches_header(h)));

            match hit {
                Some(idx) => {
                    columns.insert(field, idx as u32 + 1);
                }
                None => {
                    debug!("Column for {} not found in headers; field skipped", field.name());
                }
            }
        }

        Self {
            columns,
            data_start_row: 2,
        }
    }

    /// 1-based column index for a field, if it resolved.
    pub fn column(&self, field: Field) -> Option<u32> {
        self.columns.get(&field).copied()
    }

    /// Physical sheet row of the first data row.
    pub fn data_start_row(&self) -> u32 {
        self.data_start_row
    }

    /// Value of a field within an already-fetched data row ("" if the field
    /// is unresolved or the row is short).
    pub fn value<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        self.column(field)
            .and_then(|c| row.get(c as usize - 1))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Ensure all canonical columns exist in the header row
///
/// Maintenance operation for header-mode sheets, run once at startup. A
/// header that matches a field exactly or by variant counts as present.
/// Idempotent given stable headers.
pub async fn ensure_columns(store: &dyn SheetStore) -> Result<()> {
    let headers = store.read_header_row().await?;

    if headers.is_empty() {
        info!("Sheet is empty, writing full canonical header row");
        let all: Vec<String> = Field::ALL.iter().map(|f| f.name().to_string()).collect();
        return store.write_header_row(&all).await;
    }

    let missing: Vec<&'static str> = Field::ALL
        .iter()
        .filter(|f| !headers.iter().any(|h| f.matches_header(h)))
        .map(|f| f.name())
        .collect();

    if missing.is_empty() {
        info!("All expected columns are present");
        return Ok(());
    }

    warn!("Adding missing columns: {:?}", missing);
    let mut updated = headers;
    updated.extend(missing.iter().map(|m| m.to_string()));
    store.write_header_row(&updated).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_exact_headers_in_order() {
        let h = headers(&["StudentID", "StudentName", "QRCode", "Used"]);
        let mapping = ColumnMapping::resolve(Some(&h), None);

        assert_eq!(mapping.column(Field::StudentId), Some(1));
        assert_eq!(mapping.column(Field::StudentName), Some(2));
        assert_eq!(mapping.column(Field::QrCode), Some(3));
        assert_eq!(mapping.column(Field::Used), Some(4));
        assert_eq!(mapping.data_start_row(), 2);
    }

    #[test]
    fn exact_header_beats_variant() {
        // "QR Code" is a QRCode variant, but the exact spelling later in the
        // row must win.
        let h = headers(&["QR Code", "QRCode"]);
        let mapping = ColumnMapping::resolve(Some(&h), None);
        assert_eq!(mapping.column(Field::QrCode), Some(2));
    }

    #[test]
    fn qr_variant_matches_substring_case_insensitive() {
        let h = headers(&["Name", "student qr code value"]);
        let mapping = ColumnMapping::resolve(Some(&h), None);
        assert_eq!(mapping.column(Field::QrCode), Some(2));
    }

    #[test]
    fn variant_equality_for_other_fields() {
        let h = headers(&["checked by", "timestamp", "scanned"]);
        let mapping = ColumnMapping::resolve(Some(&h), None);
        assert_eq!(mapping.column(Field::Coordinator), Some(1));
        assert_eq!(mapping.column(Field::LastCheckedTime), Some(2));
        assert_eq!(mapping.column(Field::Used), Some(3));
    }

    #[test]
    fn unresolved_field_is_absent() {
        let h = headers(&["StudentName"]);
        let mapping = ColumnMapping::resolve(Some(&h), None);
        assert_eq!(mapping.column(Field::QrCode), None);
        assert_eq!(mapping.value(&headers(&["Alice"]), Field::QrCode), "");
    }

    #[test]
    fn fixed_layout_taken_verbatim() {
        let mapping = ColumnMapping::resolve(None, Some(&FixedLayout::canonical()));
        assert_eq!(mapping.column(Field::StudentId), Some(1));
        assert_eq!(mapping.column(Field::QrCode), Some(12));
        assert_eq!(mapping.column(Field::Used), Some(17));
        assert_eq!(mapping.data_start_row(), 1);
    }

    #[test]
    fn value_handles_short_rows() {
        let h = headers(&["StudentName", "QRCode"]);
        let mapping = ColumnMapping::resolve(Some(&h), None);
        let row = headers(&["Alice"]);
        assert_eq!(mapping.value(&row, Field::StudentName), "Alice");
        assert_eq!(mapping.value(&row, Field::QrCode), "");
    }
}
