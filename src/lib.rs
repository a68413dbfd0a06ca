// Merit Scholarship Engine - Core Library
// Eligibility → ranking, enrollment → allocation, joined by assignment.
// Exposes all modules for use in CLI, TUI, API server, and tests.

pub mod error;
pub mod student;
pub mod eligibility;
pub mod ranking;
pub mod enrollment;
pub mod allocation;
pub mod assignment;
pub mod pipeline;
pub mod config;
pub mod report;
pub mod import;
pub mod export;
pub mod telemetry;

// Re-export commonly used types
pub use error::{EmptyResultWarning, FieldError, ScholarshipError, Stage};
pub use student::{validate_records, AcademicStatus, GroupKey, StudentRecord};
pub use eligibility::{
    filter, EligibilityCriteria, EligibilityPartition, IneligibilityReason, IneligibleRecord,
};
pub use ranking::{compare_records, rank, RankEntry, RankedGroups};
pub use enrollment::{CollegeEnrollment, Enrollment};
pub use allocation::{
    allocate, AllocationTable, CollegeAllocation, DepartmentAllocation, Tier, TierPriceList,
    TierQuota, TierTotal,
};
pub use assignment::{assign, plan_cells, AssignmentOptions, CellPlan, ScholarshipAssignment};
pub use pipeline::{fingerprint, run, RunReport, ScholarshipRun};
pub use config::{BudgetConfig, RunConfig};
pub use report::{render_text, summarize, Correlations, Recipient, ReportScope, ResultsSummary};
pub use import::{generate_sample, load_students, read_students, write_students, write_template};
pub use telemetry::init_tracing;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
