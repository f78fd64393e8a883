// ============================================================
// Layer 3 — Fold Split
// ============================================================
// Partitions the sample identifiers into training and validation.
//
//   validation = ids[0], ids[10], ids[20], ...   (every 10th, in order)
//   training   = every id that is not in the validation list
//
// The split is never shuffled; the same id list always gives
// the same fold. Membership is by value, so a duplicated id
// that lands in validation is excluded from training entirely.

use std::collections::HashSet;

/// Every `VALID_STRIDE`-th identifier goes to validation.
pub const VALID_STRIDE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train: Vec<String>,
    pub valid: Vec<String>,
}

impl FoldSplit {
    pub fn every_nth(ids: &[String], stride: usize) -> Self {
        let stride = stride.max(1);
        let valid: Vec<String> = ids.iter().step_by(stride).cloned().collect();

        let held_out: HashSet<&str> = valid.iter().map(String::as_str).collect();
        let train = ids
            .iter()
            .filter(|id| !held_out.contains(id.as_str()))
            .cloned()
            .collect();

        Self { train, valid }
    }
}

impl From<&[String]> for FoldSplit {
    fn from(ids: &[String]) -> Self {
        Self::every_nth(ids, VALID_STRIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id{i}")).collect()
    }

    #[test]
    fn test_every_tenth_goes_to_validation() {
        let split = FoldSplit::from(ids(25).as_slice());
        assert_eq!(split.valid, vec!["id0", "id10", "id20"]);
        assert_eq!(split.train.len(), 22);
        assert_eq!(split.train[0], "id1");
        assert_eq!(split.train[8], "id9");
        assert_eq!(split.train[9], "id11");
    }

    #[test]
    fn test_split_is_deterministic_and_disjoint() {
        let all = ids(103);
        let a = FoldSplit::from(all.as_slice());
        let b = FoldSplit::from(all.as_slice());
        assert_eq!(a, b);
        assert!(a.valid.iter().all(|v| !a.train.contains(v)));
        assert_eq!(a.train.len() + a.valid.len(), 103);
    }

    #[test]
    fn test_duplicate_of_validation_id_is_excluded_from_training() {
        let all: Vec<String> = ["a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let split = FoldSplit::every_nth(&all, 10);
        assert_eq!(split.valid, vec!["a"]);
        assert_eq!(split.train, vec!["b", "c"]);
    }

    #[test]
    fn test_empty_list() {
        let split = FoldSplit::from(Vec::<String>::new().as_slice());
        assert!(split.train.is_empty());
        assert!(split.valid.is_empty());
    }
}
