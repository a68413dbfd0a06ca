// 📤 CSV Export - flat tables for every stage result
// One row per entity; nested keys are spread into columns.

use crate::allocation::AllocationTable;
use crate::assignment::ScholarshipAssignment;
use crate::eligibility::EligibilityPartition;
use crate::ranking::RankedGroups;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io;

#[derive(Serialize)]
struct RankingRow<'a> {
    college: &'a str,
    department: &'a str,
    grade: u8,
    rank: u32,
    student_id: &'a str,
    prev_semester_gpa: f64,
    prev_semester_credits: u32,
    prev_semester_major_credits: u32,
}

#[derive(Serialize)]
struct AssignmentRow<'a> {
    student_id: &'a str,
    college: &'a str,
    department: &'a str,
    grade: u8,
    rank: u32,
    tier: &'a str,
    amount: u64,
}

#[derive(Serialize)]
struct PartitionRow<'a> {
    student_id: &'a str,
    name: &'a str,
    college: &'a str,
    department: &'a str,
    grade: u8,
    academic_status: &'a str,
    admission_category: &'a str,
    prev_semester_gpa: f64,
    prev_semester_credits: u32,
    prev_semester_major_credits: u32,
    eligible: bool,
    reasons: String,
}

pub fn write_rankings<W: io::Write>(writer: W, ranking: &RankedGroups) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for entry in ranking.entries() {
        wtr.serialize(RankingRow {
            college: &entry.group_key.college,
            department: &entry.group_key.department,
            grade: entry.group_key.grade,
            rank: entry.rank,
            student_id: &entry.student_id,
            prev_semester_gpa: entry.gpa,
            prev_semester_credits: entry.earned_credits,
            prev_semester_major_credits: entry.major_credits,
        })
        .context("Failed to write ranking row")?;
    }

    wtr.flush().context("Failed to flush rankings")?;
    Ok(())
}

pub fn write_assignments<W: io::Write>(
    writer: W,
    assignments: &[ScholarshipAssignment],
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for a in assignments {
        wtr.serialize(AssignmentRow {
            student_id: &a.student_id,
            college: &a.group_key.college,
            department: &a.group_key.department,
            grade: a.group_key.grade,
            rank: a.rank,
            tier: &a.tier,
            amount: a.amount,
        })
        .context("Failed to write assignment row")?;
    }

    wtr.flush().context("Failed to flush assignments")?;
    Ok(())
}

pub fn write_partition<W: io::Write>(writer: W, partition: &EligibilityPartition) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let eligible = partition.eligible.iter().map(|r| (r, None));
    let ineligible = partition
        .ineligible
        .iter()
        .map(|i| (&i.record, Some(&i.reasons)));

    for (r, reasons) in eligible.chain(ineligible) {
        wtr.serialize(PartitionRow {
            student_id: &r.id,
            name: &r.name,
            college: &r.college,
            department: &r.department,
            grade: r.grade,
            academic_status: r.academic_status.as_str(),
            admission_category: &r.admission_category,
            prev_semester_gpa: r.gpa,
            prev_semester_credits: r.earned_credits,
            prev_semester_major_credits: r.major_credits,
            eligible: reasons.is_none(),
            reasons: reasons
                .map(|list| {
                    list.iter()
                        .map(|reason| reason.describe())
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default(),
        })
        .context("Failed to write partition row")?;
    }

    wtr.flush().context("Failed to flush partition")?;
    Ok(())
}

/// College table: one column per tier quota, in tier priority order
pub fn write_allocations<W: io::Write>(writer: W, table: &AllocationTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        "college".to_string(),
        "enrollment".to_string(),
        "budget_share".to_string(),
        "allocated_budget".to_string(),
        "remaining_budget".to_string(),
    ];
    header.extend(table.tiers.iter().map(|t| format!("{}_quota", t.name)));
    header.push("total_quota".to_string());
    wtr.write_record(&header).context("Failed to write allocation header")?;

    for college in &table.colleges {
        let mut row = vec![
            college.college.clone(),
            college.enrollment_count.to_string(),
            college.budget_share.to_string(),
            college.allocated_budget.to_string(),
            college.remaining_budget.to_string(),
        ];
        row.extend(
            table
                .tiers
                .iter()
                .map(|t| college.quota(&t.name).unwrap_or(0).to_string()),
        );
        row.push(college.total_quota().to_string());
        wtr.write_record(&row).context("Failed to write allocation row")?;
    }

    wtr.flush().context("Failed to flush allocations")?;
    Ok(())
}

/// Department table: the reporting sub-allocation under each college
pub fn write_department_allocations<W: io::Write>(
    writer: W,
    table: &AllocationTable,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["college".to_string(), "department".to_string(), "enrollment".to_string()];
    header.extend(table.tiers.iter().map(|t| format!("{}_quota", t.name)));
    header.push("total_quota".to_string());
    wtr.write_record(&header).context("Failed to write department header")?;

    for college in &table.colleges {
        for department in &college.departments {
            let mut row = vec![
                college.college.clone(),
                department.department.clone(),
                department.enrollment_count.to_string(),
            ];
            row.extend(department.quotas.iter().map(|q| q.quota.to_string()));
            row.push(department.total_quota().to_string());
            wtr.write_record(&row).context("Failed to write department row")?;
        }
    }

    wtr.flush().context("Failed to flush department allocations")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{allocate, Tier, TierPriceList};
    use crate::assignment::{assign, AssignmentOptions};
    use crate::eligibility::{filter, EligibilityCriteria};
    use crate::enrollment::Enrollment;
    use crate::ranking::rank;
    use crate::student::fixtures::student;

    fn to_string(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_rankings_and_assignments_csv() {
        let records = vec![
            student("a", "Engineering", "CS", 2, 3.9, 18, 12),
            student("b", "Engineering", "CS", 2, 3.5, 15, 10),
        ];
        let ranking = rank(&records);
        let mut enrollment = Enrollment::new();
        enrollment.add("Engineering", "CS", 2).unwrap();
        let tiers = TierPriceList::new(vec![Tier::new("Gold", 1_000)]).unwrap();
        let table = allocate(10_000, &enrollment, &tiers).unwrap();
        let assignments = assign(&ranking, &table, &AssignmentOptions::default()).unwrap();

        let mut buffer = Vec::new();
        write_rankings(&mut buffer, &ranking).unwrap();
        let csv = to_string(buffer);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "college,department,grade,rank,student_id,prev_semester_gpa,prev_semester_credits,prev_semester_major_credits"
        );
        assert_eq!(lines[1], "Engineering,CS,2,1,a,3.9,18,12");

        let mut buffer = Vec::new();
        write_assignments(&mut buffer, &assignments).unwrap();
        let csv = to_string(buffer);
        // 10,000 × 0.3 / 1,000 = 3 Gold slots, two students
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("a,Engineering,CS,2,1,Gold,1000"));

        let mut buffer = Vec::new();
        write_allocations(&mut buffer, &table).unwrap();
        let csv = to_string(buffer);
        assert!(csv.starts_with("college,enrollment,budget_share,allocated_budget,remaining_budget,Gold_quota,total_quota"));
        assert!(csv.contains("Engineering,2,1,10000,7000,3,3"));

        let mut buffer = Vec::new();
        write_department_allocations(&mut buffer, &table).unwrap();
        assert!(to_string(buffer).contains("Engineering,CS,2,3,3"));
    }

    #[test]
    fn test_partition_csv_lists_reasons() {
        let records = vec![
            student("ok", "Engineering", "CS", 2, 3.9, 18, 12),
            student("low", "Engineering", "CS", 2, 1.5, 18, 12),
        ];
        let partition = filter(&records, &EligibilityCriteria::default());

        let mut buffer = Vec::new();
        write_partition(&mut buffer, &partition).unwrap();
        let csv = to_string(buffer);

        assert!(csv.contains("ok,Student ok,Engineering,CS,2,enrolled,신입학,3.9,18,12,true,"));
        assert!(csv.contains("low,Student low,Engineering,CS,2,enrolled,신입학,1.5,18,12,false,GPA 1.50 below 2.00"));
    }
}
