use serde::Serialize;

use crate::columns::{ColumnMapping, Field};

/// One student's data, extracted from a sheet row
///
/// Every value is a string; spreadsheet cells carry no native typing. The
/// `used` flag is the literal "Yes" / "" convention from the sheet.
#[derive(Debug, Clone, Default)]
pub struct StudentRecord {
    pub student_id: String,
    pub student_name: String,
    pub class_roll_no: String,
    pub admission_date: String,
    pub section: String,
    pub group: String,
    pub email: String,
    pub mobile: String,
    pub father_name: String,
    pub food_preference: String,
    pub photo: String,
    pub qr_code: String,
    pub status: String,
    pub comment: String,
    pub last_checked_time: String,
    pub coordinator: String,
    pub used: String,
}

impl StudentRecord {
    /// Build a record from a fetched data row using the resolved mapping.
    /// Unresolved fields come back empty.
    pub fn from_row(row: &[String], mapping: &ColumnMapping) -> Self {
        let get = |f: Field| mapping.value(row, f).trim().to_string();

        Self {
            student_id: get(Field::StudentId),
            student_name: get(Field::StudentName),
            class_roll_no: get(Field::ClassRollNo),
            admission_date: get(Field::AdmissionDate),
            section: get(Field::Section),
            group: get(Field::Group),
            email: get(Field::Email),
            mobile: get(Field::Mobile),
            father_name: get(Field::FatherName),
            food_preference: get(Field::FoodPreference),
            photo: get(Field::Photo),
            qr_code: get(Field::QrCode),
            status: get(Field::Status),
            comment: get(Field::Comment),
            last_checked_time: get(Field::LastCheckedTime),
            coordinator: get(Field::Coordinator),
            used: get(Field::Used),
        }
    }

    /// Whether this code has already been consumed by a check-in.
    pub fn is_used(&self) -> bool {
        self.used.eq_ignore_ascii_case("yes")
    }

    /// The subset of fields the scan UI displays.
    pub fn display(&self) -> StudentDisplay {
        StudentDisplay {
            student_id: self.student_id.clone(),
            student_name: self.student_name.clone(),
            class_roll_no: self.class_roll_no.clone(),
            section: self.section.clone(),
            group: self.group.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
            food_preference: self.food_preference.clone(),
            photo: self.photo.clone(),
            status: self.status.clone(),
            comment: self.comment.clone(),
        }
    }
}

/// Display projection returned by `/fetch` (sheet-header field names on the
/// wire, matching what the front end expects).
#[derive(Debug, Clone, Serialize)]
pub struct StudentDisplay {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "StudentName")]
    pub student_name: String,
    #[serde(rename = "ClassRollNo")]
    pub class_roll_no: String,
    #[serde(rename = "Section")]
    pub section: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Mobile")]
    pub mobile: String,
    #[serde(rename = "FoodPreference")]
    pub food_preference: String,
    #[serde(rename = "Photo")]
    pub photo: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Comment")]
    pub comment: String,
}
