// 🔗 Run Pipeline - explicit stage results instead of session state
//
//   records ──► filter ──► rank ───────┐
//                                      ├──► assign
//   records ──► census ──► allocate ───┘
//
// The two upstream chains share nothing and run on separate threads in
// `execute`; assignment only runs once both have produced results.

use crate::allocation::{allocate, AllocationTable};
use crate::assignment::{assign, plan_cells, CellPlan, ScholarshipAssignment};
use crate::config::RunConfig;
use crate::eligibility::{filter, EligibilityPartition};
use crate::enrollment::Enrollment;
use crate::error::{EmptyResultWarning, Result, ScholarshipError, Stage};
use crate::ranking::{rank, RankedGroups};
use crate::student::{validate_records, StudentRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::thread;
use tracing::{info, info_span, warn};
use uuid::Uuid;

// ============================================================================
// RUN REPORT
// ============================================================================

/// Everything one run produced; regenerated wholesale on every run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// SHA-256 over records + config; equal inputs give equal fingerprints
    pub fingerprint: String,

    pub partition: EligibilityPartition,
    pub enrollment: Enrollment,
    pub ranking: RankedGroups,
    pub allocation: AllocationTable,
    pub cells: Vec<CellPlan>,
    pub assignments: Vec<ScholarshipAssignment>,
    pub warnings: Vec<EmptyResultWarning>,
}

impl RunReport {
    pub fn has_results(&self) -> bool {
        !self.assignments.is_empty()
    }

    pub fn total_awarded(&self) -> u64 {
        self.assignments.iter().map(|a| a.amount).sum()
    }
}

// ============================================================================
// SCHOLARSHIP RUN
// ============================================================================

/// One run over a validated record set; stages may be driven one at a time
#[derive(Debug, Clone)]
pub struct ScholarshipRun {
    run_id: Uuid,
    records: Vec<StudentRecord>,
    config: RunConfig,
    partition: Option<EligibilityPartition>,
    ranking: Option<RankedGroups>,
    enrollment: Option<Enrollment>,
    allocation: Option<AllocationTable>,
    warnings: Vec<EmptyResultWarning>,
}

impl ScholarshipRun {
    /// Validate the record set and criteria; any malformed record rejects the whole set
    pub fn new(records: Vec<StudentRecord>, config: RunConfig) -> Result<Self> {
        validate_records(&records)?;
        config.validate()?;

        Ok(ScholarshipRun {
            run_id: Uuid::new_v4(),
            records,
            config,
            partition: None,
            ranking: None,
            enrollment: None,
            allocation: None,
            warnings: Vec::new(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn warnings(&self) -> &[EmptyResultWarning] {
        &self.warnings
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.records, &self.config)
    }

    pub fn filter(&mut self) -> &EligibilityPartition {
        let partition = filter(&self.records, &self.config.criteria);
        if partition.is_empty() {
            self.warn(EmptyResultWarning::new(
                Stage::Filter,
                "no student satisfies the eligibility criteria",
            ));
        }
        self.partition.insert(partition)
    }

    pub fn rank(&mut self) -> Result<&RankedGroups> {
        let Some(partition) = self.partition.as_ref() else {
            return Err(ScholarshipError::precondition(
                "Ranking requires the eligibility filter to run first",
            ));
        };

        let ranking = rank(&partition.eligible);
        if ranking.is_empty() {
            self.warn(EmptyResultWarning::new(Stage::Ranking, "no ranked groups"));
        }
        Ok(self.ranking.insert(ranking))
    }

    pub fn allocate(&mut self) -> Result<&AllocationTable> {
        let budget = &self.config.budget;
        let enrollment = Enrollment::from_records(&self.records, &budget.enrollment_statuses);
        let table = allocate(budget.total_budget, &enrollment, &budget.tiers)?;

        self.enrollment = Some(enrollment);
        Ok(self.allocation.insert(table))
    }

    /// Join ranking and allocation; both must exist for this run
    pub fn assign(&self) -> Result<Vec<ScholarshipAssignment>> {
        let (ranking, allocation) = self.joined()?;
        assign(ranking, allocation, &self.config.assignment)
    }

    fn joined(&self) -> Result<(&RankedGroups, &AllocationTable)> {
        match (&self.ranking, &self.allocation) {
            (Some(ranking), Some(allocation)) => Ok((ranking, allocation)),
            (None, _) => Err(ScholarshipError::precondition(
                "Assignment invoked before ranking produced results",
            )),
            (_, None) => Err(ScholarshipError::precondition(
                "Assignment invoked before allocation produced results",
            )),
        }
    }

    fn warn(&mut self, warning: EmptyResultWarning) {
        warn!(stage = warning.stage.as_str(), "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Run every stage, the two upstream chains concurrently
    pub fn execute(mut self) -> Result<RunReport> {
        let span = info_span!("scholarship.run", run_id = %self.run_id);
        let _guard = span.enter();

        let records = &self.records;
        let config = &self.config;

        let (partition, ranking, allocated) = thread::scope(|scope| {
            let allocation_chain = scope.spawn(|| {
                let budget = &config.budget;
                let enrollment = Enrollment::from_records(records, &budget.enrollment_statuses);
                allocate(budget.total_budget, &enrollment, &budget.tiers)
                    .map(|table| (enrollment, table))
            });

            let partition = filter(records, &config.criteria);
            let ranking = rank(&partition.eligible);

            let allocated = allocation_chain
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            (partition, ranking, allocated)
        });
        let (enrollment, allocation) = allocated?;

        if partition.is_empty() {
            self.warn(EmptyResultWarning::new(
                Stage::Filter,
                "no student satisfies the eligibility criteria",
            ));
        }
        self.partition = Some(partition);
        self.ranking = Some(ranking);
        self.enrollment = Some(enrollment);
        self.allocation = Some(allocation);

        let (cells, assignments) = {
            let (ranking, allocation) = self.joined()?;
            if ranking.is_empty() {
                (Vec::new(), Vec::new())
            } else {
                let cells = plan_cells(ranking, allocation, &self.config.assignment)?;
                let assignments = assign(ranking, allocation, &self.config.assignment)?;
                (cells, assignments)
            }
        };

        if self.ranking.as_ref().map_or(true, |r| r.is_empty()) {
            self.warn(EmptyResultWarning::new(
                Stage::Ranking,
                "no ranked groups; assignment skipped",
            ));
        } else if assignments.is_empty() {
            self.warn(EmptyResultWarning::new(Stage::Assignment, "no awards assigned"));
        }

        let fingerprint = self.fingerprint();
        info!(
            assignments = assignments.len(),
            warnings = self.warnings.len(),
            "run complete"
        );

        Ok(RunReport {
            run_id: self.run_id,
            generated_at: Utc::now(),
            fingerprint,
            partition: self.partition.unwrap_or_default(),
            enrollment: self.enrollment.unwrap_or_default(),
            ranking: self.ranking.unwrap_or_default(),
            allocation: self.allocation.ok_or_else(|| {
                ScholarshipError::precondition("allocation missing after execution")
            })?,
            cells,
            assignments,
            warnings: self.warnings,
        })
    }
}

/// Validate, then run every stage
pub fn run(records: Vec<StudentRecord>, config: RunConfig) -> Result<RunReport> {
    ScholarshipRun::new(records, config)?.execute()
}

/// Memoization key over inputs; the crate itself keeps no cache
pub fn fingerprint(records: &[StudentRecord], config: &RunConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update((records.len() as u64).to_le_bytes());
    for r in records {
        // Every field is length-prefixed so no two records share an encoding
        for field in [
            r.id.as_str(),
            r.name.as_str(),
            r.college.as_str(),
            r.department.as_str(),
            r.admission_category.as_str(),
        ] {
            hash_field(&mut hasher, field.as_bytes());
        }
        hash_field(&mut hasher, &[r.grade]);
        hash_field(&mut hasher, r.academic_status.to_string().as_bytes());
        hash_field(&mut hasher, &r.gpa.to_bits().to_le_bytes());
        hash_field(&mut hasher, &r.earned_credits.to_le_bytes());
        hash_field(&mut hasher, &r.major_credits.to_le_bytes());
    }
    hash_field(&mut hasher, format!("{:?}", config).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

// ============================================================================
// TESTS
// ============================================================================
