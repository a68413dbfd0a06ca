// 📈 Result Summaries - aggregates over a finished run
// Per-college, per-tier, per-department and GPA-band views of the awards,
// the top performers, GPA correlations, and the plain-text selection report.

use crate::allocation::TierPriceList;
use crate::assignment::ScholarshipAssignment;
use crate::student::StudentRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Rows kept in `ResultsSummary::top_performers`
pub const TOP_PERFORMERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCount {
    pub tier: String,
    pub count: usize,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeSummary {
    pub college: String,
    pub recipients: usize,
    pub total_amount: u64,

    /// College × tier pivot, tier priority order
    pub by_tier: Vec<TierCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: String,
    pub count: usize,
    pub mean_gpa: f64,
    pub std_gpa: f64,
    pub min_gpa: f64,
    pub max_gpa: f64,
    pub total_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub college: String,
    pub department: String,
    pub recipients: usize,
    pub total_amount: u64,
    pub mean_amount: f64,
    pub mean_gpa: f64,
    pub min_gpa: f64,
    pub max_gpa: f64,
    pub mean_rank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpaBand {
    pub label: String,
    pub count: usize,
}

/// One awarded student joined back to their record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub student_id: String,
    pub name: String,
    pub college: String,
    pub department: String,
    pub grade: u8,
    pub rank: u32,
    pub gpa: f64,
    pub earned_credits: u32,
    pub tier: String,
    pub amount: u64,
}

/// Pearson coefficients over the recipients; `None` when fewer than two
/// recipients or one side has no variance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correlations {
    pub gpa_rank: Option<f64>,
    pub gpa_amount: Option<f64>,
    pub credits_gpa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub recipients: usize,
    pub total_amount: u64,
    pub mean_gpa: f64,
    pub college_count: usize,
    pub department_count: usize,
    pub colleges: Vec<CollegeSummary>,
    pub tiers: Vec<TierStats>,
    pub departments: Vec<DepartmentSummary>,

    /// grade → tier counts
    pub by_grade: BTreeMap<u8, Vec<TierCount>>,
    pub gpa_bands: Vec<GpaBand>,
    pub correlations: Correlations,

    /// Highest GPAs first, at most `TOP_PERFORMERS`
    pub top_performers: Vec<Recipient>,

    /// Every recipient, by college, department, grade, then rank
    pub roster: Vec<Recipient>,
}

const GPA_BANDS: [(&str, f64, f64); 4] = [
    ("<3.0", f64::NEG_INFINITY, 3.0),
    ("3.0-3.5", 3.0, 3.5),
    ("3.5-4.0", 3.5, 4.0),
    (">=4.0", 4.0, f64::INFINITY),
];

// ============================================================================
// SUMMARY
// ============================================================================

/// Build every summary view for a set of assignments.
/// `records` must contain each awarded student; assignments without one are skipped.
pub fn summarize(
    records: &[StudentRecord],
    assignments: &[ScholarshipAssignment],
    tiers: &TierPriceList,
) -> ResultsSummary {
    let by_id: HashMap<&str, &StudentRecord> =
        records.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut roster: Vec<Recipient> = assignments
        .iter()
        .filter_map(|a| {
            let record = by_id.get(a.student_id.as_str())?;
            Some(Recipient {
                student_id: a.student_id.clone(),
                name: record.name.clone(),
                college: a.group_key.college.clone(),
                department: a.group_key.department.clone(),
                grade: a.group_key.grade,
                rank: a.rank,
                gpa: record.gpa,
                earned_credits: record.earned_credits,
                tier: a.tier.clone(),
                amount: a.amount,
            })
        })
        .collect();
    roster.sort_by(|a, b| {
        (&a.college, &a.department, a.grade, a.rank).cmp(&(&b.college, &b.department, b.grade, b.rank))
    });

    let tier_names: Vec<String> = tiers.iter().map(|t| t.name.clone()).collect();
    build(roster, &tier_names)
}

impl ResultsSummary {
    /// The same views restricted to the recipients `scope` covers
    pub fn scoped(&self, scope: &ReportScope) -> ResultsSummary {
        let roster = self.roster.iter().filter(|r| scope.includes(r)).cloned().collect();
        let tier_names: Vec<String> = self.tiers.iter().map(|t| t.tier.clone()).collect();
        build(roster, &tier_names)
    }
}

fn build(roster: Vec<Recipient>, tiers: &[String]) -> ResultsSummary {
    let gpas: Vec<f64> = roster.iter().map(|r| r.gpa).collect();

    let mut by_college: BTreeMap<&str, Vec<&Recipient>> = BTreeMap::new();
    let mut by_department: BTreeMap<(&str, &str), Vec<&Recipient>> = BTreeMap::new();
    let mut by_grade: BTreeMap<u8, Vec<&Recipient>> = BTreeMap::new();
    for r in &roster {
        by_college.entry(r.college.as_str()).or_default().push(r);
        by_department
            .entry((r.college.as_str(), r.department.as_str()))
            .or_default()
            .push(r);
        by_grade.entry(r.grade).or_default().push(r);
    }

    let colleges = by_college
        .iter()
        .map(|(college, awarded)| CollegeSummary {
            college: college.to_string(),
            recipients: awarded.len(),
            total_amount: awarded.iter().map(|r| r.amount).sum(),
            by_tier: tier_counts(awarded, tiers),
        })
        .collect();

    let tier_stats = tiers
        .iter()
        .map(|tier| {
            let in_tier: Vec<&Recipient> = roster.iter().filter(|r| &r.tier == tier).collect();
            let tier_gpas: Vec<f64> = in_tier.iter().map(|r| r.gpa).collect();
            let (min_gpa, max_gpa) = min_max(&tier_gpas);
            TierStats {
                tier: tier.clone(),
                count: in_tier.len(),
                mean_gpa: mean(&tier_gpas),
                std_gpa: sample_std(&tier_gpas),
                min_gpa,
                max_gpa,
                total_amount: in_tier.iter().map(|r| r.amount).sum(),
            }
        })
        .collect();

    let departments = by_department
        .iter()
        .map(|((college, department), awarded)| {
            let dept_gpas: Vec<f64> = awarded.iter().map(|r| r.gpa).collect();
            let ranks: Vec<f64> = awarded.iter().map(|r| r.rank as f64).collect();
            let amounts: Vec<f64> = awarded.iter().map(|r| r.amount as f64).collect();
            let (min_gpa, max_gpa) = min_max(&dept_gpas);
            DepartmentSummary {
                college: college.to_string(),
                department: department.to_string(),
                recipients: awarded.len(),
                total_amount: awarded.iter().map(|r| r.amount).sum(),
                mean_amount: mean(&amounts),
                mean_gpa: mean(&dept_gpas),
                min_gpa,
                max_gpa,
                mean_rank: mean(&ranks),
            }
        })
        .collect();

    let gpa_bands = GPA_BANDS
        .iter()
        .map(|(label, low, high)| GpaBand {
            label: label.to_string(),
            count: gpas.iter().filter(|g| **g >= *low && **g < *high).count(),
        })
        .collect();

    let department_count = roster
        .iter()
        .map(|r| (&r.college, &r.department))
        .collect::<BTreeSet<_>>()
        .len();

    let ranks: Vec<f64> = roster.iter().map(|r| r.rank as f64).collect();
    let amounts: Vec<f64> = roster.iter().map(|r| r.amount as f64).collect();
    let credits: Vec<f64> = roster.iter().map(|r| r.earned_credits as f64).collect();
    let correlations = Correlations {
        gpa_rank: pearson(&gpas, &ranks),
        gpa_amount: pearson(&gpas, &amounts),
        credits_gpa: pearson(&credits, &gpas),
    };

    // Stable: equal GPAs keep roster order
    let mut top_performers = roster.clone();
    top_performers.sort_by(|a, b| b.gpa.total_cmp(&a.gpa));
    top_performers.truncate(TOP_PERFORMERS);

    ResultsSummary {
        recipients: roster.len(),
        total_amount: roster.iter().map(|r| r.amount).sum(),
        mean_gpa: mean(&gpas),
        college_count: by_college.len(),
        department_count,
        colleges,
        tiers: tier_stats,
        departments,
        by_grade: by_grade
            .iter()
            .map(|(grade, awarded)| (*grade, tier_counts(awarded, tiers)))
            .collect(),
        gpa_bands,
        correlations,
        top_performers,
        roster,
    }
}

fn tier_counts(awarded: &[&Recipient], tiers: &[String]) -> Vec<TierCount> {
    tiers
        .iter()
        .map(|tier| {
            let matching = awarded.iter().filter(|r| &r.tier == tier);
            TierCount {
                tier: tier.clone(),
                count: matching.clone().count(),
                amount: matching.map(|r| r.amount).sum(),
            }
        })
        .collect()
}

// ============================================================================
// TEXT REPORT
// ============================================================================

/// Which recipients a text report covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportScope {
    #[default]
    Institution,
    College { college: String },
    Tier { tier: String },
    Department { college: String, department: String },
}

impl ReportScope {
    pub fn includes(&self, recipient: &Recipient) -> bool {
        match self {
            ReportScope::Institution => true,
            ReportScope::College { college } => &recipient.college == college,
            ReportScope::Tier { tier } => &recipient.tier == tier,
            ReportScope::Department { college, department } => {
                &recipient.college == college && &recipient.department == department
            }
        }
    }
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportScope::Institution => write!(f, "Institution"),
            ReportScope::College { college } => write!(f, "College: {}", college),
            ReportScope::Tier { tier } => write!(f, "Tier: {}", tier),
            ReportScope::Department { college, department } => {
                write!(f, "Department: {} / {}", college, department)
            }
        }
    }
}

/// `institution`, `college:NAME`, `tier:NAME` or `department:COLLEGE/DEPARTMENT`
impl FromStr for ReportScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("institution") {
            return Ok(ReportScope::Institution);
        }

        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("Unknown report scope: {}", s))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("Report scope {} needs a name", kind));
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "college" => Ok(ReportScope::College {
                college: value.to_string(),
            }),
            "tier" => Ok(ReportScope::Tier {
                tier: value.to_string(),
            }),
            "department" => {
                let (college, department) = value
                    .split_once('/')
                    .ok_or_else(|| format!("Department scope must be COLLEGE/DEPARTMENT, got {}", value))?;
                Ok(ReportScope::Department {
                    college: college.trim().to_string(),
                    department: department.trim().to_string(),
                })
            }
            other => Err(format!("Unknown report scope: {}", other)),
        }
    }
}

const RULE: &str = "============================================================";

/// Plain-text selection report over `scope`, optionally listing every recipient
pub fn render_text(summary: &ResultsSummary, scope: &ReportScope, include_individual: bool) -> String {
    let view = summary.scoped(scope);
    let mut lines = vec![
        RULE.to_string(),
        "Merit Scholarship Selection Report".to_string(),
        format!("Scope: {}", scope),
        RULE.to_string(),
        String::new(),
        "📊 Overview".to_string(),
        format!("  Recipients: {}", view.recipients),
        format!("  Total amount: {}", with_commas(view.total_amount)),
        format!("  Colleges: {}", view.college_count),
        format!("  Departments: {}", view.department_count),
        format!("  Mean GPA: {:.2}", view.mean_gpa),
        String::new(),
        "🏆 By tier".to_string(),
    ];

    for tier in view.tiers.iter().filter(|t| t.count > 0) {
        lines.push(format!(
            "  {}: {} recipients, {} total, mean GPA {:.2}",
            tier.tier,
            tier.count,
            with_commas(tier.total_amount),
            tier.mean_gpa
        ));
    }

    lines.push(String::new());
    lines.push("🏫 By college".to_string());
    for college in &view.colleges {
        lines.push(format!(
            "  {}: {} recipients, {} total",
            college.college,
            college.recipients,
            with_commas(college.total_amount)
        ));
        for count in college.by_tier.iter().filter(|c| c.count > 0) {
            lines.push(format!("    └ {}: {}", count.tier, count.count));
        }
    }

    lines.push(String::new());
    lines.push("📈 Correlations".to_string());
    lines.push(format!("  GPA vs rank: {}", coefficient(view.correlations.gpa_rank)));
    lines.push(format!("  GPA vs amount: {}", coefficient(view.correlations.gpa_amount)));
    lines.push(format!("  Credits vs GPA: {}", coefficient(view.correlations.credits_gpa)));

    if include_individual && !view.roster.is_empty() {
        lines.push(String::new());
        lines.push("👥 Recipients".to_string());
        let mut current_college: Option<&str> = None;
        for r in &view.roster {
            if current_college != Some(r.college.as_str()) {
                lines.push(format!("  [{}]", r.college));
                current_college = Some(r.college.as_str());
            }
            lines.push(format!(
                "    • {} {} ({} grade {}, rank {}) - {} (GPA: {:.2})",
                r.student_id, r.name, r.department, r.grade, r.rank, r.tier, r.gpa
            ));
        }
    }

    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.join("\n") + "\n"
}

fn coefficient(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "n/a".to_string())
}

fn with_commas(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// STATISTICS
// ============================================================================

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        covariance += (x - mx) * (y - my);
        var_x += (x - mx).powi(2);
        var_y += (y - my).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(covariance / (var_x * var_y).sqrt())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}
