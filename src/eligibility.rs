// ✅ Eligibility Filter - criteria as data
// Partitions the candidate pool into eligible / ineligible, keeping the reasons.

use crate::error::{Result, ScholarshipError};
use crate::student::{AcademicStatus, StudentRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

// ============================================================================
// CRITERIA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    /// Minimum previous-semester GPA (inclusive)
    #[serde(default = "default_min_gpa")]
    pub min_gpa: f64,

    /// Minimum previous-semester credits (inclusive)
    #[serde(default = "default_min_credits")]
    pub min_credits: u32,

    /// Admission categories that never qualify
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: BTreeSet<String>,

    /// Academic statuses that qualify
    #[serde(default = "default_allowed_statuses")]
    pub allowed_statuses: BTreeSet<AcademicStatus>,
}

fn default_min_gpa() -> f64 {
    2.0
}

fn default_min_credits() -> u32 {
    12
}

fn default_excluded_categories() -> BTreeSet<String> {
    ["교환학생", "시간제학생", "방문학생"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_allowed_statuses() -> BTreeSet<AcademicStatus> {
    BTreeSet::from([AcademicStatus::Enrolled])
}

impl Default for EligibilityCriteria {
    fn default() -> Self {
        EligibilityCriteria {
            min_gpa: default_min_gpa(),
            min_credits: default_min_credits(),
            excluded_categories: default_excluded_categories(),
            allowed_statuses: default_allowed_statuses(),
        }
    }
}

impl EligibilityCriteria {
    /// A threshold no GPA can be compared against rejects the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.min_gpa.is_finite() {
            return Err(ScholarshipError::configuration(format!(
                "Minimum GPA must be a finite number, got {}",
                self.min_gpa
            )));
        }
        if self.min_gpa < 0.0 {
            return Err(ScholarshipError::configuration(format!(
                "Minimum GPA must not be negative, got {}",
                self.min_gpa
            )));
        }
        Ok(())
    }

    /// Every criterion the record fails; empty means eligible
    pub fn check(&self, record: &StudentRecord) -> Vec<IneligibilityReason> {
        let mut reasons = Vec::new();

        if record.gpa < self.min_gpa {
            reasons.push(IneligibilityReason::GpaBelowMinimum {
                gpa: record.gpa,
                min_gpa: self.min_gpa,
            });
        }

        if record.earned_credits < self.min_credits {
            reasons.push(IneligibilityReason::CreditsBelowMinimum {
                credits: record.earned_credits,
                min_credits: self.min_credits,
            });
        }

        if !self.allowed_statuses.contains(&record.academic_status) {
            reasons.push(IneligibilityReason::StatusNotAllowed {
                status: record.academic_status,
            });
        }

        if self.excluded_categories.contains(&record.admission_category) {
            reasons.push(IneligibilityReason::ExcludedCategory {
                category: record.admission_category.clone(),
            });
        }

        reasons
    }

    pub fn is_eligible(&self, record: &StudentRecord) -> bool {
        self.check(record).is_empty()
    }
}

// ============================================================================
// PARTITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IneligibilityReason {
    GpaBelowMinimum { gpa: f64, min_gpa: f64 },
    CreditsBelowMinimum { credits: u32, min_credits: u32 },
    StatusNotAllowed { status: AcademicStatus },
    ExcludedCategory { category: String },
}

impl IneligibilityReason {
    pub fn describe(&self) -> String {
        match self {
            IneligibilityReason::GpaBelowMinimum { gpa, min_gpa } => {
                format!("GPA {:.2} below {:.2}", gpa, min_gpa)
            }
            IneligibilityReason::CreditsBelowMinimum { credits, min_credits } => {
                format!("Credits {} below {}", credits, min_credits)
            }
            IneligibilityReason::StatusNotAllowed { status } => {
                format!("Status {} not allowed", status)
            }
            IneligibilityReason::ExcludedCategory { category } => {
                format!("Admission category {} excluded", category)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IneligibleRecord {
    pub record: StudentRecord,
    pub reasons: Vec<IneligibilityReason>,
}

/// Disjoint split of the input; both sides keep input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPartition {
    pub eligible: Vec<StudentRecord>,
    pub ineligible: Vec<IneligibleRecord>,
}

impl EligibilityPartition {
    /// No eligible candidates; later stages have nothing to rank
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }

    pub fn total(&self) -> usize {
        self.eligible.len() + self.ineligible.len()
    }
}

/// Split records into eligible and ineligible per `criteria`
pub fn filter(records: &[StudentRecord], criteria: &EligibilityCriteria) -> EligibilityPartition {
    let mut partition = EligibilityPartition::default();

    for record in records {
        let reasons = criteria.check(record);
        if reasons.is_empty() {
            partition.eligible.push(record.clone());
        } else {
            debug!(student_id = %record.id, reasons = reasons.len(), "ineligible");
            partition.ineligible.push(IneligibleRecord {
                record: record.clone(),
                reasons,
            });
        }
    }

    info!(
        eligible = partition.eligible.len(),
        ineligible = partition.ineligible.len(),
        "eligibility filter complete"
    );

    partition
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::fixtures::student;

    fn pool() -> Vec<StudentRecord> {
        let mut on_leave = student("s3", "Engineering", "CS", 2, 3.9, 18, 12);
        on_leave.academic_status = AcademicStatus::Leave;

        let mut exchange = student("s4", "Engineering", "CS", 2, 4.1, 18, 12);
        exchange.admission_category = "교환학생".to_string();

        vec![
            student("s1", "Engineering", "CS", 2, 3.5, 18, 12),
            student("s2", "Engineering", "CS", 2, 1.9, 18, 12),
            on_leave,
            exchange,
            student("s5", "Engineering", "CS", 2, 3.0, 11, 6),
        ]
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let records = pool();
        let partition = filter(&records, &EligibilityCriteria::default());

        assert_eq!(partition.total(), records.len());
        let eligible: Vec<&str> = partition.eligible.iter().map(|r| r.id.as_str()).collect();
        let ineligible: Vec<&str> = partition.ineligible.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(eligible, vec!["s1"]);
        assert_eq!(ineligible, vec!["s2", "s3", "s4", "s5"]);
    }

    #[test]
    fn test_reasons_recorded() {
        let partition = filter(&pool(), &EligibilityCriteria::default());

        let reasons = |id: &str| {
            partition
                .ineligible
                .iter()
                .find(|r| r.record.id == id)
                .map(|r| r.reasons.clone())
                .unwrap()
        };

        assert!(matches!(reasons("s2")[0], IneligibilityReason::GpaBelowMinimum { .. }));
        assert_eq!(
            reasons("s3"),
            vec![IneligibilityReason::StatusNotAllowed {
                status: AcademicStatus::Leave
            }]
        );
        assert_eq!(
            reasons("s4"),
            vec![IneligibilityReason::ExcludedCategory {
                category: "교환학생".to_string()
            }]
        );
        assert!(matches!(reasons("s5")[0], IneligibilityReason::CreditsBelowMinimum { .. }));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let criteria = EligibilityCriteria {
            min_gpa: 3.5,
            min_credits: 18,
            ..EligibilityCriteria::default()
        };
        let record = student("s1", "Engineering", "CS", 2, 3.5, 18, 12);

        assert!(criteria.is_eligible(&record));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let criteria = EligibilityCriteria::default();
        let first = filter(&pool(), &criteria);
        let second = filter(&first.eligible, &criteria);

        assert_eq!(second.eligible, first.eligible);
        assert!(second.ineligible.is_empty());
    }

    #[test]
    fn test_min_gpa_above_everyone_is_empty() {
        let criteria = EligibilityCriteria {
            min_gpa: 4.5,
            ..EligibilityCriteria::default()
        };
        let partition = filter(&pool(), &criteria);

        assert!(partition.is_empty());
        assert_eq!(partition.ineligible.len(), 5);
    }

    #[test]
    fn test_reasons_serialize_with_kind_tag() {
        let partition = filter(&pool(), &EligibilityCriteria::default());
        let json = serde_json::to_value(&partition).unwrap();

        let s3 = &json["ineligible"][1]["reasons"][0];
        assert_eq!(s3["kind"], "status_not_allowed");
        assert_eq!(s3["status"], "leave");
    }

    #[test]
    fn test_criteria_defaults_from_empty_json() {
        let criteria: EligibilityCriteria = serde_json::from_str("{}").unwrap();
        assert_eq!(criteria, EligibilityCriteria::default());
    }

    #[test]
    fn test_validate_rejects_unusable_min_gpa() {
        assert!(EligibilityCriteria::default().validate().is_ok());

        for min_gpa in [f64::NAN, f64::INFINITY, -0.5] {
            let criteria = EligibilityCriteria {
                min_gpa,
                ..EligibilityCriteria::default()
            };
            assert!(criteria.validate().unwrap_err().is_configuration());
        }

        // Above the scale is legal: it simply leaves nobody eligible
        let strict = EligibilityCriteria {
            min_gpa: 4.6,
            ..EligibilityCriteria::default()
        };
        assert!(strict.validate().is_ok());
    }
}
