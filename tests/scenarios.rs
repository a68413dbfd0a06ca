// End-to-end scenarios over the public API: CSV in, stage results out.

use merit_scholarship::{
    allocate, assign, filter, rank, read_students, run, AcademicStatus, AssignmentOptions,
    EligibilityCriteria, Enrollment, GroupKey, RankedGroups, RunConfig, ScholarshipRun,
    StudentRecord, Tier, TierPriceList,
};

fn student(id: &str, college: &str, department: &str, grade: u8, gpa: f64, credits: u32) -> StudentRecord {
    StudentRecord {
        id: id.to_string(),
        name: format!("Student {}", id),
        college: college.to_string(),
        department: department.to_string(),
        grade,
        academic_status: AcademicStatus::Enrolled,
        admission_category: "신입학".to_string(),
        gpa,
        earned_credits: credits,
        major_credits: 12,
    }
}

fn single_tier(price: u64) -> TierPriceList {
    TierPriceList::new(vec![Tier::new("Gold", price)]).unwrap()
}

#[test]
fn scenario_gpa_tie_ordered_by_credits() {
    let records = vec![
        student("s1", "Engineering", "CS", 2, 3.9, 16),
        student("s2", "Engineering", "CS", 2, 3.5, 15),
        student("s3", "Engineering", "CS", 2, 3.9, 18),
    ];

    let ranking = rank(&filter(&records, &EligibilityCriteria::default()).eligible);
    let group = ranking.get(&GroupKey::new("Engineering", "CS", 2)).unwrap();

    let order: Vec<(&str, u32)> = group.iter().map(|e| (e.student_id.as_str(), e.rank)).collect();
    assert_eq!(order, vec![("s3", 1), ("s1", 2), ("s2", 3)]);
}

#[test]
fn scenario_proportional_college_quotas() {
    let enrollment = Enrollment::from_college_counts([("College A", 60), ("College B", 40)]).unwrap();

    let table = allocate(100_000, &enrollment, &single_tier(1_000)).unwrap();

    assert_eq!(table.get("College A").unwrap().quota("Gold"), Some(18));
    assert_eq!(table.get("College B").unwrap().quota("Gold"), Some(12));
    assert!((table.total_allocated() - 100_000.0).abs() < 1e-6);
}

#[test]
fn scenario_nobody_eligible_blocks_assignment() {
    let records = vec![
        student("s1", "Engineering", "CS", 2, 3.9, 18),
        student("s2", "Business", "Accounting", 3, 3.1, 18),
    ];
    let criteria = EligibilityCriteria {
        min_gpa: 4.2,
        ..EligibilityCriteria::default()
    };

    let partition = filter(&records, &criteria);
    assert!(partition.eligible.is_empty());
    assert_eq!(partition.ineligible.len(), 2);

    let ranking = rank(&partition.eligible);
    assert!(ranking.is_empty());

    let enrollment = Enrollment::from_records(&records, &[AcademicStatus::Enrolled].into());
    let table = allocate(100_000, &enrollment, &single_tier(1_000)).unwrap();
    let err = assign(&ranking, &table, &AssignmentOptions::default()).unwrap_err();
    assert!(err.is_precondition());

    // The same condition surfaces through the stepwise run
    let mut config = RunConfig::default();
    config.criteria = criteria;
    let mut run = ScholarshipRun::new(records, config).unwrap();
    run.filter();
    run.rank().unwrap();
    run.allocate().unwrap();
    assert!(run.assign().unwrap_err().is_precondition());
}

#[test]
fn scenario_small_cells_keep_minimum_slot() {
    // One college, quota 1, split over three single-student cells: 1 × 1/3 floors to 0
    let records = vec![
        student("g1", "Arts", "Music", 1, 3.0, 18),
        student("g2", "Arts", "Music", 2, 3.0, 18),
        student("g3", "Arts", "Music", 3, 3.0, 18),
    ];
    let mut enrollment = Enrollment::new();
    enrollment.add("Arts", "Music", 3).unwrap();
    let table = allocate(1_000, &enrollment, &single_tier(1_000)).unwrap();
    assert_eq!(table.get("Arts").unwrap().quota("Gold"), Some(1));

    let assignments = assign(&rank(&records), &table, &AssignmentOptions::default()).unwrap();

    assert_eq!(assignments.len(), 3);
    assert!(assignments.iter().all(|a| a.tier == "Gold" && a.rank == 1));
}

#[test]
fn scenario_unaffordable_tier_still_gets_one() {
    let mut enrollment = Enrollment::new();
    enrollment.add("Arts", "Music", 10).unwrap();

    let table = allocate(500, &enrollment, &single_tier(1_000)).unwrap();

    let arts = table.get("Arts").unwrap();
    assert_eq!(arts.allocated_budget, 500.0);
    assert_eq!(arts.quota("Gold"), Some(1));
}

#[test]
fn same_department_name_in_two_colleges_is_not_merged() {
    let records = vec![
        student("a", "Engineering", "Design", 2, 3.9, 18),
        student("b", "Arts", "Design", 2, 3.7, 18),
    ];

    let ranking = rank(&records);

    assert_eq!(ranking.group_count(), 2);
    assert_eq!(ranking.get(&GroupKey::new("Arts", "Design", 2)).unwrap()[0].rank, 1);
    assert_eq!(ranking.get(&GroupKey::new("Engineering", "Design", 2)).unwrap()[0].rank, 1);
}

#[test]
fn csv_to_report() {
    let csv = "\
student_id,name,college,department,grade,academic_status,admission_category,prev_semester_gpa,prev_semester_credits,prev_semester_major_credits
20230001,Kim,공과대학,컴퓨터공학과,2,재학,신입학,4.10,18,12
20230002,Lee,공과대학,컴퓨터공학과,2,재학,신입학,3.80,18,9
20230003,Park,공과대학,컴퓨터공학과,2,재학,교환학생,4.40,18,12
20230004,Choi,공과대학,기계공학과,3,휴학,신입학,4.00,0,0
20230005,Jung,경영대학,경영학과,1,재학,신입학,3.20,15,6
20230006,Kang,경영대학,경영학과,1,재학,신입학,1.90,15,6
";
    let records = read_students(csv.as_bytes()).unwrap();
    assert_eq!(records.len(), 6);

    let report = run(records, RunConfig::default()).unwrap();

    let ineligible: Vec<&str> = report
        .partition
        .ineligible
        .iter()
        .map(|i| i.record.id.as_str())
        .collect();
    assert_eq!(ineligible, vec!["20230003", "20230004", "20230006"]);

    // Census counts enrolled students only: 공과대학 3, 경영대학 2
    assert_eq!(report.enrollment.college_total("공과대학"), 3);
    assert_eq!(report.enrollment.college_total("경영대학"), 2);

    // Top tier is generous enough that every ranked student receives it
    assert_eq!(report.assignments.len(), 3);
    assert!(report.assignments.iter().all(|a| a.tier == "Yulgok" && a.amount == 5_000_000));
    assert!(report.warnings.is_empty());
}

#[test]
fn empty_ranking_is_distinct_from_missing_ranking() {
    let ranking = RankedGroups::default();
    assert!(ranking.is_empty());
    assert_eq!(ranking.total_ranked(), 0);
    assert!(ranking.college_totals().is_empty());
}
