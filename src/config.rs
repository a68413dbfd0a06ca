// ⚙️ Run Configuration - criteria, budget and assignment options as data
// Every field has a default, so `{}` is a complete configuration.

use crate::allocation::TierPriceList;
use crate::assignment::AssignmentOptions;
use crate::eligibility::EligibilityCriteria;
use crate::student::AcademicStatus;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Total scholarship budget in whole currency units
    #[serde(default = "default_total_budget")]
    pub total_budget: u64,

    #[serde(default)]
    pub tiers: TierPriceList,

    /// Statuses counted toward college enrollment
    #[serde(default = "default_enrollment_statuses")]
    pub enrollment_statuses: BTreeSet<AcademicStatus>,
}

fn default_total_budget() -> u64 {
    500_000_000
}

fn default_enrollment_statuses() -> BTreeSet<AcademicStatus> {
    BTreeSet::from([AcademicStatus::Enrolled])
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            total_budget: default_total_budget(),
            tiers: TierPriceList::default(),
            enrollment_statuses: default_enrollment_statuses(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub criteria: EligibilityCriteria,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub assignment: AssignmentOptions,
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: RunConfig =
            serde_json::from_str(content).context("Failed to parse run config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that hold regardless of the records; budget checks stay with the allocator
    pub fn validate(&self) -> crate::error::Result<()> {
        self.criteria.validate()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize run config")
    }
}
