// 🏆 Assignment Engine - ranked cells × college quotas → awards
// Each (college, department, grade) cell gets a slice of its college's quota
// proportional to its ranked headcount, never less than the per-cell minimum.
// Slots are consumed in tier priority order down the rank list.

use crate::allocation::{AllocationTable, CollegeAllocation, TierPriceList, TierQuota};
use crate::error::{Result, ScholarshipError};
use crate::ranking::{RankEntry, RankedGroups};
use crate::student::GroupKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOptions {
    /// Minimum slots per tier in every cell
    #[serde(default = "default_min_per_dept_grade")]
    pub min_per_dept_grade: u32,

    /// Accepted for compatibility; a student never receives more than one tier
    #[serde(default)]
    pub allow_duplicate: bool,
}

fn default_min_per_dept_grade() -> u32 {
    1
}

impl Default for AssignmentOptions {
    fn default() -> Self {
        AssignmentOptions {
            min_per_dept_grade: default_min_per_dept_grade(),
            allow_duplicate: false,
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarshipAssignment {
    pub student_id: String,
    pub tier: String,
    pub amount: u64,
    pub rank: u32,
    pub group_key: GroupKey,
}

/// Slots computed for one cell before students are walked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellPlan {
    pub group_key: GroupKey,
    pub cell_size: usize,

    /// Ranked headcount of the enclosing college
    pub college_size: usize,

    /// In tier priority order
    pub slots: Vec<TierQuota>,
}

impl CellPlan {
    pub fn total_slots(&self) -> u64 {
        self.slots.iter().map(|s| u64::from(s.quota)).sum()
    }

    /// How many students in the cell receive an award
    pub fn award_count(&self) -> usize {
        if self.total_slots() >= self.cell_size as u64 {
            self.cell_size
        } else {
            self.total_slots() as usize
        }
    }

    /// Tier for the `index`-th award (0-based) in rank order
    pub fn tier_for(&self, index: usize) -> Option<&str> {
        let mut upper = 0u64;
        for slot in &self.slots {
            upper += u64::from(slot.quota);
            if (index as u64) < upper {
                return Some(slot.tier.as_str());
            }
        }
        None
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Compute per-cell slots for every ranked group with an allocation row
pub fn plan_cells(
    ranked: &RankedGroups,
    allocation: &AllocationTable,
    options: &AssignmentOptions,
) -> Result<Vec<CellPlan>> {
    check_preconditions(ranked, allocation)?;

    let college_totals = ranked.college_totals();
    let mut plans = Vec::with_capacity(ranked.group_count());

    for (college, college_size) in &college_totals {
        let Some(college_allocation) = allocation.get(college) else {
            warn!(college = %college, "no allocation for ranked college; cells skipped");
            continue;
        };

        for (key, entries) in ranked.college_groups(college) {
            plans.push(plan_cell(
                key,
                entries.len(),
                *college_size,
                college_allocation,
                &allocation.tiers,
                options.min_per_dept_grade,
            )?);
        }
    }

    Ok(plans)
}

fn plan_cell(
    key: &GroupKey,
    cell_size: usize,
    college_size: usize,
    college_allocation: &CollegeAllocation,
    tiers: &TierPriceList,
    min_per_cell: u32,
) -> Result<CellPlan> {
    let slots = tiers
        .iter()
        .map(|tier| {
            let quota = college_allocation.quota(&tier.name).unwrap_or(0) as u128;
            let proportional = quota * cell_size as u128 / college_size.max(1) as u128;
            let proportional = u32::try_from(proportional).map_err(|_| {
                ScholarshipError::configuration(format!(
                    "Cell {} needs {} {} slots, more than a quota can hold",
                    key, proportional, tier.name
                ))
            })?;
            Ok(TierQuota {
                tier: tier.name.clone(),
                quota: proportional.max(min_per_cell),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CellPlan {
        group_key: key.clone(),
        cell_size,
        college_size,
        slots,
    })
}

/// Assign tiers to the top-ranked students of every cell
pub fn assign(
    ranked: &RankedGroups,
    allocation: &AllocationTable,
    options: &AssignmentOptions,
) -> Result<Vec<ScholarshipAssignment>> {
    if options.allow_duplicate {
        debug!("allow_duplicate is set; assignments remain one tier per student");
    }

    let plans = plan_cells(ranked, allocation, options)?;
    let mut assignments = Vec::new();

    for plan in &plans {
        let Some(entries) = ranked.get(&plan.group_key) else {
            continue;
        };
        let awarded = assign_cell(plan, entries, &allocation.tiers);
        debug!(
            cell = %plan.group_key,
            slots = plan.total_slots(),
            awarded = awarded.len(),
            "cell assigned"
        );
        assignments.extend(awarded);
    }

    info!(assignments = assignments.len(), cells = plans.len(), "assignment complete");

    Ok(assignments)
}

fn assign_cell(
    plan: &CellPlan,
    entries: &[RankEntry],
    tiers: &TierPriceList,
) -> Vec<ScholarshipAssignment> {
    entries
        .iter()
        .take(plan.award_count())
        .enumerate()
        .filter_map(|(index, entry)| {
            let tier = tiers.get(plan.tier_for(index)?)?;
            Some(ScholarshipAssignment {
                student_id: entry.student_id.clone(),
                tier: tier.name.clone(),
                amount: tier.amount,
                rank: entry.rank,
                group_key: entry.group_key.clone(),
            })
        })
        .collect()
}

fn check_preconditions(ranked: &RankedGroups, allocation: &AllocationTable) -> Result<()> {
    if ranked.is_empty() {
        return Err(ScholarshipError::precondition(
            "Assignment requires a non-empty ranking",
        ));
    }
    if allocation.is_empty() {
        return Err(ScholarshipError::precondition(
            "Assignment requires a budget allocation",
        ));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
