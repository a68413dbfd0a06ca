// 🏫 Enrollment Census - headcounts feeding the budget allocator
// Counts are per college and per department; the allocator never sees records.

use crate::error::{Result, ScholarshipError};
use crate::student::{AcademicStatus, StudentRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollegeEnrollment {
    pub total: u64,

    /// Optional breakdown; may be empty when only college totals are known
    #[serde(default)]
    pub departments: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    colleges: BTreeMap<String, CollegeEnrollment>,
}

impl Enrollment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count records whose status is in `statuses`
    pub fn from_records(records: &[StudentRecord], statuses: &BTreeSet<AcademicStatus>) -> Self {
        let mut enrollment = Enrollment::new();
        for record in records {
            if statuses.contains(&record.academic_status) {
                // One per record: bounded by the slice length, never near u64::MAX
                let entry = enrollment.colleges.entry(record.college.clone()).or_default();
                entry.total += 1;
                *entry.departments.entry(record.department.clone()).or_insert(0) += 1;
            }
        }
        enrollment
    }

    /// College-level counts without a department breakdown
    pub fn from_college_counts<I, S>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut enrollment = Enrollment::new();
        for (college, count) in counts {
            let college = college.into();
            let entry = enrollment.colleges.entry(college.clone()).or_default();
            entry.total = checked_count(entry.total, count, &college)?;
        }
        Ok(enrollment)
    }

    pub fn add(&mut self, college: &str, department: &str, count: u64) -> Result<()> {
        let entry = self.colleges.entry(college.to_string()).or_default();
        let total = checked_count(entry.total, count, college)?;
        let department_count = entry.departments.get(department).copied().unwrap_or(0);
        let department_count = checked_count(department_count, count, college)?;

        entry.total = total;
        entry.departments.insert(department.to_string(), department_count);
        Ok(())
    }

    pub fn colleges(&self) -> impl Iterator<Item = (&str, &CollegeEnrollment)> {
        self.colleges.iter().map(|(name, college)| (name.as_str(), college))
    }

    pub fn college_total(&self, college: &str) -> u64 {
        self.colleges.get(college).map(|c| c.total).unwrap_or(0)
    }

    /// College headcounts in name order
    pub fn college_totals(&self) -> BTreeMap<String, u64> {
        self.colleges
            .iter()
            .map(|(name, college)| (name.clone(), college.total))
            .collect()
    }

    /// Department headcounts for one college, in name order
    pub fn departments(&self, college: &str) -> Vec<(String, u64)> {
        self.colleges
            .get(college)
            .map(|c| {
                c.departments
                    .iter()
                    .map(|(department, count)| (department.clone(), *count))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Headcount across all colleges
    pub fn total(&self) -> Result<u64> {
        self.colleges
            .values()
            .try_fold(0u64, |sum, c| sum.checked_add(c.total))
            .ok_or_else(|| ScholarshipError::configuration("Total enrollment overflows u64"))
    }

    pub fn college_count(&self) -> usize {
        self.colleges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }
}

fn checked_count(current: u64, count: u64, college: &str) -> Result<u64> {
    current.checked_add(count).ok_or_else(|| {
        ScholarshipError::configuration(format!("Enrollment count for {} overflows u64", college))
    })
}
