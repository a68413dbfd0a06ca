// 🎓 Student Records - immutable candidate input
// Core fields mirror the registrar export; nothing here is mutated by a run.

use crate::error::{FieldError, Result, ScholarshipError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 4;
pub const MAX_GPA: f64 = 4.5;

// ============================================================================
// ACADEMIC STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AcademicStatus {
    /// Currently attending (재학)
    #[serde(rename = "enrolled", alias = "재학", alias = "Enrolled")]
    Enrolled,

    /// On leave of absence (휴학)
    #[serde(rename = "leave", alias = "휴학", alias = "Leave")]
    Leave,

    /// Removed from the register (제적)
    #[serde(rename = "expelled", alias = "제적", alias = "Expelled")]
    Expelled,
}

impl AcademicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicStatus::Enrolled => "enrolled",
            AcademicStatus::Leave => "leave",
            AcademicStatus::Expelled => "expelled",
        }
    }
}

impl fmt::Display for AcademicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// STUDENT RECORD
// ============================================================================

/// One candidate as exported by the registrar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "student_id", alias = "id")]
    pub id: String,

    pub name: String,

    pub college: String,

    pub department: String,

    /// Class year, 1-4
    pub grade: u8,

    pub academic_status: AcademicStatus,

    pub admission_category: String,

    /// Previous-semester grade point average (0.0 - 4.5)
    #[serde(rename = "prev_semester_gpa", alias = "gpa")]
    pub gpa: f64,

    /// Previous-semester credits earned
    #[serde(rename = "prev_semester_credits", alias = "earned_credits")]
    pub earned_credits: u32,

    /// Previous-semester major credits earned
    #[serde(rename = "prev_semester_major_credits", alias = "major_credits")]
    pub major_credits: u32,
}

impl StudentRecord {
    /// Ranking group (and assignment cell) this record competes in
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.college, &self.department, self.grade)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let locator = if self.id.trim().is_empty() {
            format!("<unnamed:{}>", self.name)
        } else {
            self.id.clone()
        };

        let required = [
            ("student_id", &self.id),
            ("name", &self.name),
            ("college", &self.college),
            ("department", &self.department),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(&locator, field, "Required field is empty"));
            }
        }

        if !(MIN_GRADE..=MAX_GRADE).contains(&self.grade) {
            errors.push(FieldError::new(
                &locator,
                "grade",
                format!("Grade {} outside {}-{}", self.grade, MIN_GRADE, MAX_GRADE),
            ));
        }

        if !self.gpa.is_finite() || self.gpa < 0.0 || self.gpa > MAX_GPA {
            errors.push(FieldError::new(
                &locator,
                "prev_semester_gpa",
                format!("GPA {} outside 0.0-{}", self.gpa, MAX_GPA),
            ));
        }

        errors
    }
}

/// Validate a whole record set; any error rejects the set
pub fn validate_records(records: &[StudentRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(ScholarshipError::Validation(vec![FieldError::new(
            "<input>",
            "records",
            "Record set is empty",
        )]));
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for record in records {
        errors.extend(record.validate());

        if !record.id.trim().is_empty() && !seen.insert(record.id.as_str()) {
            errors.push(FieldError::new(&record.id, "student_id", "Duplicate student id"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ScholarshipError::Validation(errors))
    }
}

// ============================================================================
// GROUP KEY
// ============================================================================

/// (college, department, grade): the unit of ranking and of slot assignment.
/// Same-named departments in different colleges are distinct groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub college: String,
    pub department: String,
    pub grade: u8,
}

impl GroupKey {
    pub fn new(college: &str, department: &str, grade: u8) -> Self {
        GroupKey {
            college: college.to_string(),
            department: department.to_string(),
            grade,
        }
    }

    /// Department-grade label as shown on award notices
    pub fn label(&self) -> String {
        format!("{}-{}", self.department, self.grade)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.college, self.department, self.grade)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Enrolled, regular-admission student with the given academic keys
    pub fn student(
        id: &str,
        college: &str,
        department: &str,
        grade: u8,
        gpa: f64,
        earned_credits: u32,
        major_credits: u32,
    ) -> StudentRecord {
        StudentRecord {
            id: id.to_string(),
            name: format!("Student {}", id),
            college: college.to_string(),
            department: department.to_string(),
            grade,
            academic_status: AcademicStatus::Enrolled,
            admission_category: "신입학".to_string(),
            gpa,
            earned_credits,
            major_credits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::student;
    use super::*;

    #[test]
    fn test_valid_record_has_no_errors() {
        let record = student("2021001", "Engineering", "CS", 2, 3.75, 18, 12);
        assert!(record.validate().is_empty());
    }

    #[test]
    fn test_out_of_range_fields() {
        let mut record = student("2021001", "Engineering", "", 5, 4.8, 18, 12);
        record.name = " ".to_string();

        let fields: Vec<String> = record.validate().into_iter().map(|e| e.field).collect();

        assert_eq!(fields, vec!["name", "department", "grade", "prev_semester_gpa"]);
    }

    #[test]
    fn test_nan_gpa_rejected() {
        let record = student("x", "Engineering", "CS", 1, f64::NAN, 18, 12);
        assert_eq!(record.validate().len(), 1);
    }

    #[test]
    fn test_duplicate_ids_reject_set() {
        let records = vec![
            student("a", "Engineering", "CS", 1, 3.0, 18, 12),
            student("a", "Business", "Accounting", 1, 3.0, 18, 12),
        ];

        match validate_records(&records) {
            Err(ScholarshipError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].message, "Duplicate student id");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(validate_records(&[]).unwrap_err().is_validation());
    }

    #[test]
    fn test_status_accepts_korean_labels() {
        let status: AcademicStatus = serde_json::from_str("\"휴학\"").unwrap();
        assert_eq!(status, AcademicStatus::Leave);
        assert_eq!(serde_json::to_string(&AcademicStatus::Enrolled).unwrap(), "\"enrolled\"");
    }

    #[test]
    fn test_group_key_display() {
        let key = GroupKey::new("Engineering", "CS", 2);
        assert_eq!(key.to_string(), "Engineering/CS-2");
        assert_eq!(key.label(), "CS-2");
    }
}
