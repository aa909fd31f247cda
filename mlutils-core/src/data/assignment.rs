//! Split assignments: the frozen nested train/validation/test index lists.

use crate::error::{MlError, SplitError};
use crate::persistence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The three partitions of a split assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Training,
    Validation,
    Test,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Training, Partition::Validation, Partition::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Training => "training",
            Partition::Validation => "validation",
            Partition::Test => "test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training" => Ok(Partition::Training),
            "validation" => Ok(Partition::Validation),
            "test" => Ok(Partition::Test),
            other => Err(SplitError::UnknownPartition(other.to_string())),
        }
    }
}

/// Index lists per outer fold, then per inner fold.
pub type FoldLists = Vec<Vec<Vec<usize>>>;

/// `partition -> outer fold -> inner fold -> indices`.
///
/// `test` holds exactly one inner entry per outer fold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAssignment {
    pub training: FoldLists,
    pub validation: FoldLists,
    pub test: FoldLists,
}

impl SplitAssignment {
    pub fn partition(&self, partition: Partition) -> &FoldLists {
        match partition {
            Partition::Training => &self.training,
            Partition::Validation => &self.validation,
            Partition::Test => &self.test,
        }
    }

    pub fn outer_folds(&self) -> usize {
        self.test.len()
    }

    pub fn inner_folds(&self) -> usize {
        self.training.first().map_or(0, Vec::len)
    }

    /// Check the shape of the assignment: every partition non-empty, one test
    /// list per outer fold, and matching training/validation fold counts.
    pub fn validate(&self) -> Result<(), SplitError> {
        for partition in Partition::ALL {
            if self.partition(partition).is_empty() {
                return Err(SplitError::invalid_format(format!(
                    "'{partition}' has no outer folds"
                )));
            }
        }

        let outer = self.test.len();
        if self.training.len() != outer || self.validation.len() != outer {
            return Err(SplitError::invalid_format(format!(
                "outer fold counts differ: training {}, validation {}, test {}",
                self.training.len(),
                self.validation.len(),
                outer
            )));
        }

        if let Some(o) = self.test.iter().position(|inner| inner.len() != 1) {
            return Err(SplitError::invalid_format(format!(
                "test outer fold {o} must hold exactly one index list"
            )));
        }

        let inner = self.inner_folds();
        for o in 0..outer {
            let (train, val) = (&self.training[o], &self.validation[o]);
            if train.is_empty() {
                return Err(SplitError::invalid_format(format!(
                    "training outer fold {o} has no inner folds"
                )));
            }
            if train.len() != inner || val.len() != inner {
                return Err(SplitError::invalid_format(format!(
                    "outer fold {o} has {} training and {} validation inner folds, expected {inner}",
                    train.len(),
                    val.len()
                )));
            }
        }
        Ok(())
    }

    /// Verify the partition invariants: test folds pairwise disjoint, and at
    /// every (outer, inner) cell training, validation and test disjoint.
    pub fn check_invariants(&self) -> Result<(), SplitError> {
        self.validate()?;

        let mut seen_in_test = BTreeSet::new();
        for (o, test) in self.test.iter().enumerate() {
            let test: BTreeSet<usize> = test[0].iter().copied().collect();
            if let Some(&dup) = test.iter().find(|i| seen_in_test.contains(*i)) {
                return Err(SplitError::invalid_format(format!(
                    "index {dup} appears in more than one test fold (again at outer fold {o})"
                )));
            }
            seen_in_test.extend(test.iter().copied());

            for i in 0..self.inner_folds() {
                let train: BTreeSet<usize> = self.training[o][i].iter().copied().collect();
                let val: BTreeSet<usize> = self.validation[o][i].iter().copied().collect();
                if let Some(x) = train.intersection(&val).next() {
                    return Err(SplitError::invalid_format(format!(
                        "index {x} is both training and validation at ({o}, {i})"
                    )));
                }
                if let Some(x) = train.union(&val).find(|x| test.contains(*x)) {
                    return Err(SplitError::invalid_format(format!(
                        "index {x} leaks from test into training/validation at ({o}, {i})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the assignment (YAML, or JSON for `.json` paths).
    pub fn save(&self, path: &Path) -> Result<(), MlError> {
        persistence::save_document(path, self)
    }

    /// Read and validate a persisted assignment.
    pub fn load(path: &Path) -> Result<Self, MlError> {
        let assignment: Self = match persistence::load_document(path) {
            Ok(a) => a,
            Err(MlError::Yaml(e)) => return Err(SplitError::invalid_format(e.to_string()).into()),
            Err(MlError::Serde(e)) => return Err(SplitError::invalid_format(e.to_string()).into()),
            Err(e) => return Err(e),
        };
        assignment.validate()?;
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn two_fold() -> SplitAssignment {
        SplitAssignment {
            training: vec![vec![vec![2, 3], vec![3, 4]], vec![vec![0, 1], vec![1, 3]]],
            validation: vec![vec![vec![4], vec![2]], vec![vec![3], vec![0]]],
            test: vec![vec![vec![0, 1]], vec![vec![2, 4]]],
        }
    }

    #[test]
    fn test_partition_names() {
        for partition in Partition::ALL {
            assert_eq!(partition.as_str().parse::<Partition>().unwrap(), partition);
        }
        assert_eq!(
            "train".parse::<Partition>().unwrap_err(),
            SplitError::UnknownPartition("train".into())
        );
    }

    #[test]
    fn test_counts() {
        let a = two_fold();
        assert_eq!(a.outer_folds(), 2);
        assert_eq!(a.inner_folds(), 2);
        assert!(a.validate().is_ok());
        assert!(a.check_invariants().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_partition() {
        let mut a = two_fold();
        a.validation.clear();
        assert!(matches!(a.validate(), Err(SplitError::InvalidSplitFormat(_))));
    }

    #[test]
    fn test_validate_rejects_nested_test() {
        let mut a = two_fold();
        a.test[1].push(vec![9]);
        assert!(matches!(a.validate(), Err(SplitError::InvalidSplitFormat(_))));
    }

    #[test]
    fn test_validate_rejects_ragged_inner_folds() {
        let mut a = two_fold();
        a.validation[0].pop();
        assert!(matches!(a.validate(), Err(SplitError::InvalidSplitFormat(_))));
    }

    #[test]
    fn test_check_invariants_detects_leak() {
        let mut a = two_fold();
        a.training[0][1].push(0);
        assert!(a.check_invariants().is_err());

        let mut a = two_fold();
        a.test[1][0].push(1);
        assert!(a.check_invariants().is_err());
    }

    #[test]
    fn test_yaml_layout() {
        let yaml = serde_yaml::to_string(&two_fold()).unwrap();
        assert!(yaml.starts_with("training:"));
        assert!(yaml.contains("validation:"));
        assert!(yaml.contains("test:"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        for name in ["splits.yaml", "splits.json"] {
            let path = dir.path().join(name);
            two_fold().save(&path).unwrap();
            assert_eq!(SplitAssignment::load(&path).unwrap(), two_fold());
        }
    }

    #[test]
    fn test_load_missing_key_is_invalid_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "training: [[[1]]]\nvalidation: [[[2]]]\n").unwrap();
        let err = SplitAssignment::load(&path).unwrap_err();
        assert!(matches!(err, MlError::Split(SplitError::InvalidSplitFormat(_))));
    }

    #[test]
    fn test_load_non_sequence_is_invalid_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"training": 3, "validation": [[[2]]], "test": [[[1]]]}"#,
        )
        .unwrap();
        let err = SplitAssignment::load(&path).unwrap_err();
        assert!(matches!(err, MlError::Split(SplitError::InvalidSplitFormat(_))));
    }
}
