// 💰 Budget Allocator - total budget → per-college quotas per tier
//
// Step 1: college budget = total × (college enrollment / total enrollment)
// Step 2: per tier, most valuable first:
//           remaining ≥ price → quota = max(1, ⌊remaining × 0.3 / price⌋),
//                               remaining -= quota × price
//           otherwise         → quota = 1
// Step 3: department quota = max(1, ⌊college quota × dept / college⌋)
//
// Every college gets at least one slot per tier even when it cannot afford it,
// so total committed value can exceed the proportional share.
//
// All money math is exact: a college's budget is kept as a numerator over the
// total enrollment, and only quotas are floored.

use crate::enrollment::Enrollment;
use crate::error::{Result, ScholarshipError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Share of the remaining budget each tier may claim: 3/10
const TIER_BUDGET_NUMERATOR: u128 = 3;
const TIER_BUDGET_DENOMINATOR: u128 = 10;

// ============================================================================
// TIERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,

    /// Award amount in whole currency units
    pub amount: u64,
}

impl Tier {
    pub fn new(name: &str, amount: u64) -> Self {
        Tier {
            name: name.to_string(),
            amount,
        }
    }
}

/// Ordered tier list; position is priority, most valuable first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierPriceList {
    tiers: Vec<Tier>,
}

impl TierPriceList {
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        let list = TierPriceList { tiers };
        list.validate()?;
        Ok(list)
    }

    /// Yulgok / Dasan / Woncheon at the registrar's standing amounts
    pub fn standard() -> Self {
        TierPriceList {
            tiers: vec![
                Tier::new("Yulgok", 5_000_000),
                Tier::new("Dasan", 3_000_000),
                Tier::new("Woncheon", 2_000_000),
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(ScholarshipError::configuration("Tier price list is empty"));
        }

        let mut names = HashSet::new();
        for tier in &self.tiers {
            if tier.name.trim().is_empty() {
                return Err(ScholarshipError::configuration("Tier name is empty"));
            }
            if tier.amount == 0 {
                return Err(ScholarshipError::configuration(format!(
                    "Tier {} has non-positive price",
                    tier.name
                )));
            }
            if !names.insert(tier.name.as_str()) {
                return Err(ScholarshipError::configuration(format!(
                    "Tier {} listed twice",
                    tier.name
                )));
            }
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl Default for TierPriceList {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// ALLOCATION RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierQuota {
    pub tier: String,
    pub quota: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentAllocation {
    pub department: String,
    pub enrollment_count: u64,
    pub quotas: Vec<TierQuota>,
}

impl DepartmentAllocation {
    pub fn total_quota(&self) -> u64 {
        self.quotas.iter().map(|q| u64::from(q.quota)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeAllocation {
    pub college: String,
    pub enrollment_count: u64,

    /// college enrollment / total enrollment
    pub budget_share: f64,

    pub allocated_budget: f64,

    /// Budget left after step 2 (never negative)
    pub remaining_budget: f64,

    /// In tier priority order
    pub quotas: Vec<TierQuota>,

    /// Reporting refinement only; empty without a department breakdown
    #[serde(default)]
    pub departments: Vec<DepartmentAllocation>,
}

impl CollegeAllocation {
    pub fn quota(&self, tier: &str) -> Option<u32> {
        self.quotas.iter().find(|q| q.tier == tier).map(|q| q.quota)
    }

    /// Sum over tiers; u64 so any number of u32 quotas fits
    pub fn total_quota(&self) -> u64 {
        self.quotas.iter().map(|q| u64::from(q.quota)).sum()
    }
}

/// Institution-wide quota for one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTotal {
    pub tier: String,
    pub quota: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationTable {
    pub total_budget: u64,
    pub tiers: TierPriceList,

    /// In college name order
    pub colleges: Vec<CollegeAllocation>,
}

impl AllocationTable {
    pub fn get(&self, college: &str) -> Option<&CollegeAllocation> {
        self.colleges.iter().find(|c| c.college == college)
    }

    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }

    pub fn total_allocated(&self) -> f64 {
        self.colleges.iter().map(|c| c.allocated_budget).sum()
    }

    /// Institution-wide quota per tier
    pub fn tier_totals(&self) -> Vec<TierTotal> {
        self.tiers
            .iter()
            .map(|tier| TierTotal {
                tier: tier.name.clone(),
                quota: self
                    .colleges
                    .iter()
                    .filter_map(|c| c.quota(&tier.name))
                    .map(u64::from)
                    .sum(),
            })
            .collect()
    }
}

// ============================================================================
// ALLOCATOR
// ============================================================================

/// Convert a budget and enrollment census into per-college tier quotas
pub fn allocate(
    total_budget: u64,
    enrollment: &Enrollment,
    tiers: &TierPriceList,
) -> Result<AllocationTable> {
    if total_budget == 0 {
        return Err(ScholarshipError::configuration("Total budget must be positive"));
    }
    tiers.validate()?;

    let total_enrollment = enrollment.total()?;
    if total_enrollment == 0 {
        return Err(ScholarshipError::configuration(
            "Total enrollment across colleges is zero",
        ));
    }

    let denominator = total_enrollment as u128;
    let mut colleges = Vec::with_capacity(enrollment.college_count());

    for (college, census) in enrollment.colleges() {
        // Budget amounts below are numerators over `denominator`
        let allocated = total_budget as u128 * census.total as u128;
        let mut remaining = allocated;
        let mut quotas = Vec::with_capacity(tiers.len());

        for tier in tiers.iter() {
            let price = tier.amount as u128 * denominator;
            let quota = if remaining >= price {
                let affordable = remaining * TIER_BUDGET_NUMERATOR / (TIER_BUDGET_DENOMINATOR * price);
                let quota = affordable.max(1);
                remaining -= quota * price;
                quota
            } else {
                1
            };

            quotas.push(TierQuota {
                tier: tier.name.clone(),
                quota: checked_quota(quota, college, &tier.name)?,
            });
        }

        let departments =
            allocate_departments(college, &quotas, census.total, &enrollment.departments(college))?;

        debug!(
            college = %college,
            enrollment = census.total,
            total_quota = quotas.iter().map(|q| u64::from(q.quota)).sum::<u64>(),
            "college allocated"
        );

        colleges.push(CollegeAllocation {
            college: college.to_string(),
            enrollment_count: census.total,
            budget_share: census.total as f64 / total_enrollment as f64,
            allocated_budget: to_currency(allocated, denominator),
            remaining_budget: to_currency(remaining, denominator),
            quotas,
            departments,
        });
    }

    info!(
        colleges = colleges.len(),
        total_budget = total_budget,
        "budget allocation complete"
    );

    Ok(AllocationTable {
        total_budget,
        tiers: tiers.clone(),
        colleges,
    })
}

fn allocate_departments(
    college: &str,
    college_quotas: &[TierQuota],
    college_enrollment: u64,
    departments: &[(String, u64)],
) -> Result<Vec<DepartmentAllocation>> {
    if college_enrollment == 0 {
        return Ok(Vec::new());
    }

    departments
        .iter()
        .map(|(department, count)| {
            let quotas = college_quotas
                .iter()
                .map(|q| {
                    let share = q.quota as u128 * *count as u128 / college_enrollment as u128;
                    Ok(TierQuota {
                        tier: q.tier.clone(),
                        quota: checked_quota(share.max(1), college, &q.tier)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(DepartmentAllocation {
                department: department.clone(),
                enrollment_count: *count,
                quotas,
            })
        })
        .collect()
}

/// Quotas are stored as u32; a budget that buys more slots is rejected
fn checked_quota(quota: u128, college: &str, tier: &str) -> Result<u32> {
    u32::try_from(quota).map_err(|_| {
        ScholarshipError::configuration(format!(
            "Quota {} for tier {} in college {} exceeds {} slots; budget is out of range for the tier prices",
            quota,
            tier,
            college,
            u32::MAX
        ))
    })
}

fn to_currency(numerator: u128, denominator: u128) -> f64 {
    let whole = numerator / denominator;
    let fraction = numerator % denominator;
    whole as f64 + fraction as f64 / denominator as f64
}

// ============================================================================
// TESTS
// ============================================================================
