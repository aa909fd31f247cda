//! Nested train/validation/test splitting.
//!
//! A [`Splitter`] nests two [`FoldStrategy`] levels: the outer level carves
//! test folds out of the caller's indices, the inner level carves
//! training/validation folds out of each outer-training remainder. The result
//! is computed once, frozen, and can be persisted and reloaded verbatim.

use crate::config::SplitterConfig;
use crate::data::assignment::{Partition, SplitAssignment};
use crate::data::folds::{
    Fold, FoldStrategy, KFold, ShuffleSplit, StratifiedKFold, StratifiedShuffleSplit,
};
use crate::error::{MlError, SplitError};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug)]
enum SplitterState {
    Uninitialized {
        outer: Box<dyn FoldStrategy>,
        inner: Box<dyn FoldStrategy>,
    },
    Initialized(SplitAssignment),
}

/// Two-level splitter. Uninitialized until [`Splitter::split`] runs or an
/// assignment is supplied; initialized splitters only answer queries.
#[derive(Debug)]
pub struct Splitter {
    stratified: bool,
    outer_k: usize,
    inner_k: usize,
    state: SplitterState,
}

fn holdout_strategy(test_size: f64, stratified: bool, seed: u64) -> Box<dyn FoldStrategy> {
    if stratified {
        Box::new(StratifiedShuffleSplit::new(test_size, seed))
    } else {
        Box::new(ShuffleSplit::new(test_size, seed))
    }
}

fn kfold_strategy(k: usize, stratified: bool, shuffle: bool, seed: u64) -> Box<dyn FoldStrategy> {
    match (stratified, shuffle) {
        (true, true) => Box::new(StratifiedKFold::shuffled(k, seed)),
        (true, false) => Box::new(StratifiedKFold::new(k)),
        (false, true) => Box::new(KFold::shuffled(k, seed)),
        (false, false) => Box::new(KFold::new(k)),
    }
}

/// Seed for the inner level, kept distinct from the outer one.
fn inner_seed(seed: u64) -> u64 {
    seed.wrapping_add(1)
}

/// Run one level and hold its output to the declared fold count and to `0..n`.
fn run_level(
    strategy: &dyn FoldStrategy,
    level: &'static str,
    expected: usize,
    n: usize,
    classes: Option<&[usize]>,
) -> Result<Vec<Fold>, SplitError> {
    let folds = strategy.folds(n, classes)?;
    if folds.len() != expected {
        return Err(SplitError::invalid_config(format!(
            "{level} strategy declares {expected} folds but produced {}",
            folds.len()
        )));
    }
    let mut positions = folds.iter().flat_map(|f| f.train.iter().chain(&f.holdout));
    if let Some(&index) = positions.find(|&&p| p >= n) {
        return Err(SplitError::IndexOutOfRange {
            what: level,
            index,
            len: n,
        });
    }
    Ok(folds)
}

/// Translate positions into the values they point at.
fn to_global(values: &[usize], positions: &[usize]) -> Vec<usize> {
    positions.iter().map(|&p| values[p]).collect()
}

/// Dense class ids in sorted label order.
fn encode_labels<L: Ord>(labels: &[L]) -> Vec<usize> {
    let mut classes: Vec<&L> = labels.iter().collect();
    classes.sort();
    classes.dedup();
    labels
        .iter()
        .map(|label| classes.binary_search(&label).unwrap_or_default())
        .collect()
}

impl Splitter {
    /// Build a splitter from its two levels. Stratified when either level is.
    pub fn new(outer: Box<dyn FoldStrategy>, inner: Box<dyn FoldStrategy>) -> Self {
        Self {
            stratified: outer.is_stratified() || inner.is_stratified(),
            outer_k: outer.n_splits(),
            inner_k: inner.n_splits(),
            state: SplitterState::Uninitialized { outer, inner },
        }
    }

    /// Holdout test set, holdout validation set.
    pub fn holdout(test_size: f64, stratified: bool, seed: u64) -> Self {
        Self::new(
            holdout_strategy(test_size, stratified, seed),
            holdout_strategy(test_size, stratified, inner_seed(seed)),
        )
    }

    /// Holdout test set, `inner_folds`-fold inner cross-validation.
    pub fn cv_holdout(test_size: f64, inner_folds: usize, stratified: bool, seed: u64) -> Self {
        Self::new(
            holdout_strategy(test_size, stratified, seed),
            kfold_strategy(inner_folds, stratified, false, inner_seed(seed)),
        )
    }

    /// `outer_folds` test folds, holdout validation set inside each.
    pub fn nested_holdout(outer_folds: usize, test_size: f64, stratified: bool, seed: u64) -> Self {
        Self::new(
            kfold_strategy(outer_folds, stratified, false, seed),
            holdout_strategy(test_size, stratified, inner_seed(seed)),
        )
    }

    /// `outer_folds` test folds, `inner_folds`-fold cross-validation inside each.
    pub fn nested_cv(outer_folds: usize, inner_folds: usize, stratified: bool) -> Self {
        Self::new(
            kfold_strategy(outer_folds, stratified, false, 0),
            kfold_strategy(inner_folds, stratified, false, 0),
        )
    }

    /// Build the splitter a configuration describes.
    pub fn from_config(config: &SplitterConfig) -> Result<Self, SplitError> {
        config.validate()?;
        let seed = config.seed;
        let outer = if config.kind.outer_is_kfold() {
            kfold_strategy(
                config.resolved_outer_folds(),
                config.stratified,
                config.shuffle,
                seed,
            )
        } else {
            holdout_strategy(config.test_size, config.stratified, seed)
        };
        let inner = if config.kind.inner_is_kfold() {
            kfold_strategy(
                config.resolved_inner_folds(),
                config.stratified,
                config.shuffle,
                inner_seed(seed),
            )
        } else {
            holdout_strategy(config.test_size, config.stratified, inner_seed(seed))
        };
        debug!(kind = %config.kind, stratified = config.stratified, "Built splitter from config");
        Ok(Self::new(outer, inner))
    }

    /// An initialized splitter over an existing assignment.
    pub fn from_assignment(assignment: SplitAssignment) -> Result<Self, SplitError> {
        assignment.validate()?;
        Ok(Self {
            stratified: false,
            outer_k: assignment.outer_folds(),
            inner_k: assignment.inner_folds(),
            state: SplitterState::Initialized(assignment),
        })
    }

    /// Initialize this configured splitter with an existing assignment whose
    /// fold counts must match the configuration.
    pub fn with_assignment(mut self, assignment: SplitAssignment) -> Result<Self, SplitError> {
        if self.is_initialized() {
            return Err(SplitError::AlreadySplit);
        }
        assignment.validate()?;
        if assignment.outer_folds() != self.outer_k || assignment.inner_folds() != self.inner_k {
            return Err(SplitError::invalid_format(format!(
                "assignment has {}x{} folds, splitter is configured for {}x{}",
                assignment.outer_folds(),
                assignment.inner_folds(),
                self.outer_k,
                self.inner_k
            )));
        }
        self.state = SplitterState::Initialized(assignment);
        Ok(self)
    }

    /// Load a persisted assignment into an initialized splitter.
    pub fn from_file(path: &Path) -> Result<Self, MlError> {
        let assignment = SplitAssignment::load(path)?;
        info!(path = %path.display(), "Loaded splits");
        Ok(Self::from_assignment(assignment)?)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SplitterState::Initialized(_))
    }

    pub fn is_stratified(&self) -> bool {
        self.stratified
    }

    pub fn outer_folds(&self) -> usize {
        self.outer_k
    }

    pub fn inner_folds(&self) -> usize {
        self.inner_k
    }

    pub fn assignment(&self) -> Option<&SplitAssignment> {
        match &self.state {
            SplitterState::Initialized(a) => Some(a),
            SplitterState::Uninitialized { .. } => None,
        }
    }

    /// Compute and freeze the nested assignment for `indices`.
    ///
    /// `stratification` holds one label per index and is required when the
    /// splitter is stratified; it is ignored otherwise. On error the splitter
    /// stays uninitialized.
    pub fn split<L: Ord>(
        &mut self,
        indices: &[usize],
        stratification: Option<&[L]>,
    ) -> Result<(), SplitError> {
        let (outer, inner) = match &self.state {
            SplitterState::Initialized(_) => return Err(SplitError::AlreadySplit),
            SplitterState::Uninitialized { outer, inner } => (outer, inner),
        };

        let classes = if self.stratified {
            match stratification {
                Some(labels) if labels.len() == indices.len() => Some(encode_labels(labels)),
                _ => return Err(SplitError::MissingStratification),
            }
        } else {
            None
        };

        let mut seen = HashSet::with_capacity(indices.len());
        if let Some(&dup) = indices.iter().find(|&&i| !seen.insert(i)) {
            return Err(SplitError::DuplicateIndex(dup));
        }

        let mut assignment = SplitAssignment::default();
        let outer_folds = run_level(
            outer.as_ref(),
            "outer",
            self.outer_k,
            indices.len(),
            classes.as_deref(),
        )?;
        for (o, outer_fold) in outer_folds.into_iter().enumerate() {
            assignment
                .test
                .push(vec![to_global(indices, &outer_fold.holdout)]);

            let outer_train = to_global(indices, &outer_fold.train);
            let inner_classes = classes
                .as_deref()
                .map(|c| to_global(c, &outer_fold.train));

            let inner_folds = run_level(
                inner.as_ref(),
                "inner",
                self.inner_k,
                outer_train.len(),
                inner_classes.as_deref(),
            )?;
            let (training, validation): (Vec<_>, Vec<_>) = inner_folds
                .into_iter()
                .map(|fold| {
                    (
                        to_global(&outer_train, &fold.train),
                        to_global(&outer_train, &fold.holdout),
                    )
                })
                .unzip();

            debug!(
                outer_fold = o,
                test = outer_fold.holdout.len(),
                outer_train = outer_train.len(),
                inner_folds = training.len(),
                "Computed outer fold"
            );
            assignment.training.push(training);
            assignment.validation.push(validation);
        }

        assignment.check_invariants()?;

        info!(
            items = indices.len(),
            outer_folds = assignment.outer_folds(),
            inner_folds = assignment.inner_folds(),
            stratified = self.stratified,
            "Split computed"
        );
        self.state = SplitterState::Initialized(assignment);
        Ok(())
    }

    /// Indices of one (partition, outer fold, inner fold) cell.
    ///
    /// Test folds are not nested, so only inner fold 0 exists for `Test`.
    pub fn get_split(
        &self,
        partition: Partition,
        outer_fold: usize,
        inner_fold: usize,
    ) -> Result<&[usize], SplitError> {
        let assignment = self.assignment().ok_or(SplitError::NotInitialized)?;
        if outer_fold >= self.outer_k {
            return Err(SplitError::IndexOutOfRange {
                what: "outer_fold",
                index: outer_fold,
                len: self.outer_k,
            });
        }
        let inner_len = match partition {
            Partition::Test => 1,
            Partition::Training | Partition::Validation => self.inner_k,
        };
        if inner_fold >= inner_len {
            return Err(SplitError::IndexOutOfRange {
                what: "inner_fold",
                index: inner_fold,
                len: inner_len,
            });
        }
        Ok(&assignment.partition(partition)[outer_fold][inner_fold])
    }

    /// [`Splitter::get_split`] with the partition given by name.
    pub fn get_split_by_name(
        &self,
        partition: &str,
        outer_fold: usize,
        inner_fold: usize,
    ) -> Result<&[usize], SplitError> {
        if !self.is_initialized() {
            return Err(SplitError::NotInitialized);
        }
        self.get_split(partition.parse()?, outer_fold, inner_fold)
    }

    /// Persist the frozen assignment (YAML, or JSON for `.json` paths).
    pub fn save(&self, path: &Path) -> Result<(), MlError> {
        let assignment = self.assignment().ok_or(SplitError::NotInitialized)?;
        assignment.save(path)?;
        info!(path = %path.display(), "Saved splits");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitterKind;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    const NO_LABELS: Option<&[u32]> = None;

    fn set(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    fn all_cells(splitter: &Splitter) -> Vec<(Partition, usize, usize)> {
        let mut cells = Vec::new();
        for o in 0..splitter.outer_folds() {
            for i in 0..splitter.inner_folds() {
                cells.push((Partition::Training, o, i));
                cells.push((Partition::Validation, o, i));
            }
            cells.push((Partition::Test, o, 0));
        }
        cells
    }

    #[test]
    fn test_holdout_scenario() {
        let indices: Vec<usize> = (0..10).collect();
        let mut splitter = Splitter::holdout(0.2, false, 42);
        splitter.split(&indices, NO_LABELS).unwrap();

        let test = set(splitter.get_split(Partition::Test, 0, 0).unwrap());
        let train = set(splitter.get_split(Partition::Training, 0, 0).unwrap());
        let val = set(splitter.get_split(Partition::Validation, 0, 0).unwrap());
        assert_eq!(test.len(), 2);
        assert_eq!(val.len(), 2);
        assert_eq!(train.len(), 6);
        assert!(test.is_disjoint(&train) && test.is_disjoint(&val) && train.is_disjoint(&val));
        let union: BTreeSet<usize> = test.iter().chain(&train).chain(&val).copied().collect();
        assert_eq!(union, set(&indices));
    }

    #[test]
    fn test_nested_cv_scenario() {
        let indices: Vec<usize> = (0..15).collect();
        let mut splitter = Splitter::nested_cv(5, 3, false);
        splitter.split(&indices, NO_LABELS).unwrap();

        let mut covered = BTreeSet::new();
        for o in 0..5 {
            let test = set(splitter.get_split(Partition::Test, o, 0).unwrap());
            assert_eq!(test.len(), 3);
            assert!(covered.is_disjoint(&test));
            covered.extend(test.iter().copied());
            for i in 0..3 {
                let train = splitter.get_split(Partition::Training, o, i).unwrap();
                let val = splitter.get_split(Partition::Validation, o, i).unwrap();
                assert_eq!(train.len(), 8);
                assert_eq!(val.len(), 4);
                assert!(set(train).is_disjoint(&test));
                assert!(set(val).is_disjoint(&test));
                assert!(set(train).is_disjoint(&set(val)));
            }
        }
        assert_eq!(covered, set(&indices));
    }

    #[test]
    fn test_global_indices_are_mapped_at_both_levels() {
        // Non-contiguous caller indices: every output must come from this set.
        let indices: Vec<usize> = (0..12).map(|i| 100 + i * 7).collect();
        let mut splitter = Splitter::nested_cv(3, 2, false);
        splitter.split(&indices, NO_LABELS).unwrap();

        assert_eq!(
            splitter.get_split(Partition::Test, 0, 0).unwrap(),
            &[100, 107, 114, 121]
        );
        // Outer-train of fold 0 is indices[4..12]; inner fold 0 holds its first half out.
        assert_eq!(
            splitter.get_split(Partition::Validation, 0, 0).unwrap(),
            &[128, 135, 142, 149]
        );
        assert_eq!(
            splitter.get_split(Partition::Training, 0, 0).unwrap(),
            &[156, 163, 170, 177]
        );
        let allowed = set(&indices);
        for (p, o, i) in all_cells(&splitter) {
            assert!(set(splitter.get_split(p, o, i).unwrap()).is_subset(&allowed));
        }
    }

    #[test]
    fn test_split_twice_fails() {
        let indices: Vec<usize> = (0..10).collect();
        let mut splitter = Splitter::holdout(0.2, false, 0);
        splitter.split(&indices, NO_LABELS).unwrap();
        let before = splitter.assignment().cloned();
        assert_eq!(
            splitter.split(&indices, NO_LABELS),
            Err(SplitError::AlreadySplit)
        );
        assert_eq!(splitter.assignment().cloned(), before);
    }

    #[test]
    fn test_stratified_without_labels_fails() {
        let indices: Vec<usize> = (0..10).collect();
        let mut splitter = Splitter::holdout(0.2, true, 0);
        assert_eq!(
            splitter.split(&indices, NO_LABELS),
            Err(SplitError::MissingStratification)
        );
        assert_eq!(
            splitter.split(&indices, Some(&[0u32, 1, 0][..])),
            Err(SplitError::MissingStratification)
        );
        assert!(!splitter.is_initialized());
    }

    #[test]
    fn test_failed_split_leaves_splitter_uninitialized() {
        let mut splitter = Splitter::nested_cv(5, 3, false);
        let err = splitter.split(&[0, 1, 2], NO_LABELS).unwrap_err();
        assert!(matches!(err, SplitError::TooFewSamples(_)));
        assert!(!splitter.is_initialized());
        splitter.split(&(0..15).collect::<Vec<_>>(), NO_LABELS).unwrap();
        assert!(splitter.is_initialized());
    }

    #[test]
    fn test_duplicate_indices_rejected() {
        let mut splitter = Splitter::holdout(0.2, false, 0);
        assert_eq!(
            splitter.split(&[1, 2, 3, 2, 5], NO_LABELS),
            Err(SplitError::DuplicateIndex(2))
        );
    }

    #[test]
    fn test_stratified_nested_cv_keeps_class_balance() {
        let indices: Vec<usize> = (0..30).collect();
        let labels: Vec<&str> = indices
            .iter()
            .map(|i| if i % 3 == 0 { "cat" } else { "dog" })
            .collect();
        let mut splitter = Splitter::nested_cv(5, 2, true);
        splitter.split(&indices, Some(labels.as_slice())).unwrap();

        for o in 0..5 {
            let test = splitter.get_split(Partition::Test, o, 0).unwrap();
            let cats = test.iter().filter(|&&i| labels[i] == "cat").count();
            assert_eq!(test.len(), 6);
            assert_eq!(cats, 2);
        }
        assert!(splitter.assignment().unwrap().check_invariants().is_ok());
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let indices: Vec<usize> = (0..40).collect();
        let labels: Vec<u8> = indices.iter().map(|i| (i % 4) as u8).collect();
        let run = |seed| {
            let mut s = Splitter::cv_holdout(0.25, 3, true, seed);
            s.split(&indices, Some(labels.as_slice())).unwrap();
            s.assignment().cloned().unwrap()
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn test_get_split_preconditions() {
        let splitter = Splitter::nested_cv(5, 3, false);
        assert_eq!(
            splitter.get_split(Partition::Test, 0, 0),
            Err(SplitError::NotInitialized)
        );
        assert_eq!(
            splitter.get_split_by_name("test", 0, 0),
            Err(SplitError::NotInitialized)
        );

        let mut splitter = Splitter::nested_cv(5, 3, false);
        splitter.split(&(0..15).collect::<Vec<_>>(), NO_LABELS).unwrap();
        assert!(matches!(
            splitter.get_split(Partition::Test, 5, 0),
            Err(SplitError::IndexOutOfRange { what: "outer_fold", .. })
        ));
        assert!(matches!(
            splitter.get_split(Partition::Training, 0, 3),
            Err(SplitError::IndexOutOfRange { what: "inner_fold", .. })
        ));
        assert!(matches!(
            splitter.get_split(Partition::Test, 0, 1),
            Err(SplitError::IndexOutOfRange { what: "inner_fold", .. })
        ));
        assert_eq!(
            splitter.get_split_by_name("holdout", 0, 0),
            Err(SplitError::UnknownPartition("holdout".into()))
        );
        assert_eq!(
            splitter.get_split_by_name("validation", 1, 2).unwrap(),
            splitter.get_split(Partition::Validation, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_save_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let indices: Vec<usize> = (0..25).collect();
        let mut splitter = Splitter::nested_holdout(5, 0.25, false, 3);
        splitter.split(&indices, NO_LABELS).unwrap();

        for name in ["splits.yaml", "splits.json"] {
            let path = dir.path().join(name);
            splitter.save(&path).unwrap();
            let reloaded = Splitter::from_file(&path).unwrap();
            assert!(reloaded.is_initialized());
            assert_eq!(reloaded.outer_folds(), 5);
            assert_eq!(reloaded.inner_folds(), 1);
            for (p, o, i) in all_cells(&splitter) {
                assert_eq!(
                    reloaded.get_split(p, o, i).unwrap(),
                    splitter.get_split(p, o, i).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_save_before_split_fails() {
        let dir = TempDir::new().unwrap();
        let splitter = Splitter::holdout(0.2, false, 0);
        let err = splitter.save(&dir.path().join("splits.yaml")).unwrap_err();
        assert!(matches!(err, MlError::Split(SplitError::NotInitialized)));
    }

    #[test]
    fn test_with_assignment_checks_fold_counts() {
        let mut source = Splitter::nested_cv(3, 2, false);
        source.split(&(0..12).collect::<Vec<_>>(), NO_LABELS).unwrap();
        let assignment = source.assignment().cloned().unwrap();

        let mut preloaded = Splitter::nested_cv(3, 2, false)
            .with_assignment(assignment.clone())
            .unwrap();
        assert!(preloaded.is_initialized());
        assert_eq!(
            preloaded.split(&[0, 1], NO_LABELS),
            Err(SplitError::AlreadySplit)
        );

        let err = Splitter::nested_cv(4, 2, false)
            .with_assignment(assignment)
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidSplitFormat(_)));

        let err = Splitter::from_assignment(SplitAssignment::default()).unwrap_err();
        assert!(matches!(err, SplitError::InvalidSplitFormat(_)));
    }

    #[test]
    fn test_from_config_builds_each_kind() {
        let indices: Vec<usize> = (0..30).collect();
        for (kind, outer, inner) in [
            (SplitterKind::Holdout, 1, 1),
            (SplitterKind::CvHoldout, 1, 5),
            (SplitterKind::NestedHoldout, 5, 1),
            (SplitterKind::NestedCv, 5, 3),
        ] {
            let mut splitter = Splitter::from_config(&SplitterConfig::new(kind)).unwrap();
            assert_eq!((splitter.outer_folds(), splitter.inner_folds()), (outer, inner));
            splitter.split(&indices, NO_LABELS).unwrap();
            let assignment = splitter.assignment().unwrap();
            assert_eq!(assignment.outer_folds(), outer);
            assert_eq!(assignment.inner_folds(), inner);
            assert!(assignment.check_invariants().is_ok());
        }
    }

    /// Declares five folds but produces three.
    #[derive(Debug)]
    struct MiscountedKFold;

    impl FoldStrategy for MiscountedKFold {
        fn n_splits(&self) -> usize {
            5
        }

        fn folds(&self, n: usize, classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError> {
            KFold::new(3).folds(n, classes)
        }
    }

    /// Holds out a position one past the end.
    #[derive(Debug)]
    struct PastTheEnd;

    impl FoldStrategy for PastTheEnd {
        fn n_splits(&self) -> usize {
            1
        }

        fn folds(&self, n: usize, _classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError> {
            Ok(vec![Fold {
                train: (0..n).collect(),
                holdout: vec![n],
            }])
        }
    }

    #[test]
    fn test_fold_count_mismatch_is_rejected() {
        let indices: Vec<usize> = (0..12).collect();

        let mut splitter = Splitter::new(Box::new(MiscountedKFold), Box::new(KFold::new(2)));
        assert_eq!(splitter.outer_folds(), 5);
        let err = splitter.split(&indices, NO_LABELS).unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
        assert!(!splitter.is_initialized());
        assert_eq!(
            splitter.get_split(Partition::Test, 4, 0),
            Err(SplitError::NotInitialized)
        );

        let mut splitter = Splitter::new(Box::new(KFold::new(3)), Box::new(MiscountedKFold));
        let err = splitter.split(&indices, NO_LABELS).unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
        assert!(!splitter.is_initialized());
    }

    #[test]
    fn test_out_of_range_fold_position_is_rejected() {
        let indices: Vec<usize> = (0..12).collect();
        let mut splitter = Splitter::new(Box::new(KFold::new(3)), Box::new(PastTheEnd));
        assert_eq!(
            splitter.split(&indices, NO_LABELS),
            Err(SplitError::IndexOutOfRange {
                what: "inner",
                index: 8,
                len: 8,
            })
        );

        let mut splitter = Splitter::new(Box::new(PastTheEnd), Box::new(KFold::new(2)));
        assert!(matches!(
            splitter.split(&indices, NO_LABELS),
            Err(SplitError::IndexOutOfRange { what: "outer", .. })
        ));
        assert!(!splitter.is_initialized());
    }

    #[test]
    fn test_from_config_stratified_shuffled_nested_cv() {
        let indices: Vec<usize> = (0..30).collect();
        let labels: Vec<&str> = indices
            .iter()
            .map(|i| if i % 3 == 0 { "cat" } else { "dog" })
            .collect();
        let config = |seed, shuffle| SplitterConfig {
            stratified: true,
            shuffle,
            seed,
            ..SplitterConfig::new(SplitterKind::NestedCv)
        };
        let run = |config: SplitterConfig| {
            let mut splitter = Splitter::from_config(&config).unwrap();
            assert!(splitter.is_stratified());
            splitter.split(&indices, Some(labels.as_slice())).unwrap();
            splitter.assignment().cloned().unwrap()
        };

        let shuffled = run(config(11, true));
        assert_eq!(shuffled, run(config(11, true)));
        assert_ne!(shuffled, run(config(12, true)));
        assert_ne!(shuffled, run(config(11, false)));

        assert!(shuffled.check_invariants().is_ok());
        for test in &shuffled.test {
            let cats = test[0].iter().filter(|&&i| labels[i] == "cat").count();
            assert_eq!(test[0].len(), 6);
            assert_eq!(cats, 2);
        }
    }

    #[test]
    fn test_encode_labels_sorted() {
        assert_eq!(encode_labels(&["b", "a", "c", "a"]), vec![1, 0, 2, 0]);
    }
}
