// 📊 Ranking Engine - positional ranks within (college, department, grade)
// Sort keys, all descending: GPA, earned credits, major credits.
// Full ties keep input order, so identical reruns give identical ranks.

use crate::student::{GroupKey, StudentRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

// ============================================================================
// RANK ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub student_id: String,
    pub group_key: GroupKey,

    /// 1-based, contiguous, unique within the group
    pub rank: u32,

    // Sort keys carried along so exports need no join back to the records
    pub gpa: f64,
    pub earned_credits: u32,
    pub major_credits: u32,
}

/// Descending by GPA, then earned credits, then major credits
pub fn compare_records(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    b.gpa
        .total_cmp(&a.gpa)
        .then_with(|| b.earned_credits.cmp(&a.earned_credits))
        .then_with(|| b.major_credits.cmp(&a.major_credits))
}

// ============================================================================
// RANKED GROUPS
// ============================================================================

/// Ranked lists keyed by group, iterated in key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedGroups {
    groups: BTreeMap<GroupKey, Vec<RankEntry>>,
}

impl RankedGroups {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&[RankEntry]> {
        self.groups.get(key).map(|entries| entries.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[RankEntry])> {
        self.groups.iter().map(|(key, entries)| (key, entries.as_slice()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &RankEntry> {
        self.groups.values().flatten()
    }

    pub fn total_ranked(&self) -> usize {
        self.groups.values().map(|entries| entries.len()).sum()
    }

    /// Ranked headcount per college, the denominator for cell ratios
    pub fn college_totals(&self) -> BTreeMap<String, usize> {
        let mut totals = BTreeMap::new();
        for (key, entries) in &self.groups {
            *totals.entry(key.college.clone()).or_insert(0) += entries.len();
        }
        totals
    }

    /// Groups belonging to one college
    pub fn college_groups<'a>(
        &'a self,
        college: &'a str,
    ) -> impl Iterator<Item = (&'a GroupKey, &'a [RankEntry])> + 'a {
        self.iter().filter(move |(key, _)| key.college == college)
    }
}

/// Rank eligible records within their groups
pub fn rank(eligible: &[StudentRecord]) -> RankedGroups {
    let mut buckets: BTreeMap<GroupKey, Vec<&StudentRecord>> = BTreeMap::new();
    for record in eligible {
        buckets.entry(record.group_key()).or_default().push(record);
    }

    let mut groups = BTreeMap::new();
    for (key, mut members) in buckets {
        // sort_by is stable: equal keys stay in input order
        members.sort_by(|a, b| compare_records(a, b));

        let entries: Vec<RankEntry> = members
            .iter()
            .enumerate()
            .map(|(position, record)| RankEntry {
                student_id: record.id.clone(),
                group_key: key.clone(),
                rank: position as u32 + 1,
                gpa: record.gpa,
                earned_credits: record.earned_credits,
                major_credits: record.major_credits,
            })
            .collect();

        debug!(group = %key, size = entries.len(), "group ranked");
        groups.insert(key, entries);
    }

    info!(groups = groups.len(), "ranking complete");

    RankedGroups { groups }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::fixtures::student;

    fn ids(entries: &[RankEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.student_id.as_str()).collect()
    }

    #[test]
    fn test_gpa_tie_broken_by_credits() {
        let records = vec![
            student("b", "Engineering", "CS", 2, 3.9, 16, 10),
            student("c", "Engineering", "CS", 2, 3.5, 15, 10),
            student("a", "Engineering", "CS", 2, 3.9, 18, 10),
        ];

        let ranked = rank(&records);
        let group = ranked.get(&GroupKey::new("Engineering", "CS", 2)).unwrap();

        assert_eq!(ids(group), vec!["a", "b", "c"]);
        let ranks: Vec<u32> = group.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_major_credits_third_key() {
        let records = vec![
            student("low", "Engineering", "CS", 1, 4.0, 18, 9),
            student("high", "Engineering", "CS", 1, 4.0, 18, 12),
        ];

        let ranked = rank(&records);
        let group = ranked.get(&GroupKey::new("Engineering", "CS", 1)).unwrap();

        assert_eq!(ids(group), vec!["high", "low"]);
    }

    #[test]
    fn test_full_tie_keeps_input_order_with_distinct_ranks() {
        let records = vec![
            student("first", "Engineering", "CS", 3, 3.7, 18, 12),
            student("second", "Engineering", "CS", 3, 3.7, 18, 12),
            student("third", "Engineering", "CS", 3, 3.7, 18, 12),
        ];

        let ranked = rank(&records);
        let group = ranked.get(&GroupKey::new("Engineering", "CS", 3)).unwrap();

        assert_eq!(ids(group), vec!["first", "second", "third"]);
        assert_eq!(group[2].rank, 3);
        assert_eq!(rank(&records), ranked);
    }

    #[test]
    fn test_groups_split_by_grade_and_college() {
        let records = vec![
            student("e1", "Engineering", "Design", 1, 3.0, 18, 12),
            student("e2", "Engineering", "Design", 2, 3.0, 18, 12),
            student("a1", "Arts", "Design", 1, 3.9, 18, 12),
        ];

        let ranked = rank(&records);

        assert_eq!(ranked.group_count(), 3);
        for (_, entries) in ranked.iter() {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].rank, 1);
        }
        let totals = ranked.college_totals();
        assert_eq!(totals["Engineering"], 2);
        assert_eq!(totals["Arts"], 1);
        assert_eq!(ranked.college_groups("Engineering").count(), 2);
    }

    #[test]
    fn test_empty_input_empty_map() {
        let ranked = rank(&[]);
        assert!(ranked.is_empty());
        assert_eq!(ranked.total_ranked(), 0);
    }
}
