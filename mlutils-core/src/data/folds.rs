//! Fold strategies: the single-level partitioners a splitter nests.
//!
//! Every strategy works on local positions `0..n`. Mapping positions back to
//! caller index values is the splitter's job.

use crate::error::SplitError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::fmt;

/// One (train, holdout) partition of the positions `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// A single-level partitioner.
pub trait FoldStrategy: fmt::Debug + Send + Sync {
    /// Number of folds produced per call.
    fn n_splits(&self) -> usize;

    /// Whether class ids are required.
    fn is_stratified(&self) -> bool {
        false
    }

    /// Partition `0..n`. `classes`, when given, holds one dense class id per position.
    fn folds(&self, n: usize, classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError>;
}

/// Number of (train, holdout) items for a holdout fraction.
///
/// The holdout side is rounded up, the way scikit-learn sizes its shuffle splits.
/// The epsilon keeps products like `0.1 * 30` from rounding up to 4.
fn holdout_sizes(n: usize, test_size: f64) -> Result<(usize, usize), SplitError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SplitError::invalid_config(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n_holdout = ((test_size * n as f64) - 1e-9).ceil().max(0.0) as usize;
    let n_holdout = n_holdout.min(n);
    let n_train = n - n_holdout;
    if n_holdout == 0 || n_train == 0 {
        return Err(SplitError::too_few(format!(
            "test_size {test_size} over {n} samples leaves {n_train} training and {n_holdout} holdout samples"
        )));
    }
    Ok((n_train, n_holdout))
}

/// Positions grouped by class id, in ascending id order. Ids need not be dense.
/// Fails unless there is one id per position.
fn class_groups(n: usize, classes: Option<&[usize]>) -> Result<Vec<Vec<usize>>, SplitError> {
    let classes = match classes {
        Some(c) if c.len() == n => c,
        _ => return Err(SplitError::MissingStratification),
    };
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (pos, &class) in classes.iter().enumerate() {
        groups.entry(class).or_default().push(pos);
    }
    Ok(groups.into_values().collect())
}

fn check_kfold(k: usize, n: usize) -> Result<(), SplitError> {
    if k < 2 {
        return Err(SplitError::invalid_config(format!(
            "k-fold needs at least 2 folds, got {k}"
        )));
    }
    if n < k {
        return Err(SplitError::too_few(format!(
            "cannot make {k} folds out of {n} samples"
        )));
    }
    Ok(())
}

/// Turn a fold id per position into ordered folds.
fn folds_from_assignment(fold_of: &[usize], k: usize) -> Vec<Fold> {
    (0..k)
        .map(|f| {
            let (holdout, train): (Vec<usize>, Vec<usize>) =
                (0..fold_of.len()).partition(|&pos| fold_of[pos] == f);
            Fold { train, holdout }
        })
        .collect()
}

/// A single seeded random holdout split.
#[derive(Debug, Clone)]
pub struct ShuffleSplit {
    pub test_size: f64,
    pub seed: u64,
}

impl ShuffleSplit {
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }
}

impl FoldStrategy for ShuffleSplit {
    fn n_splits(&self) -> usize {
        1
    }

    fn folds(&self, n: usize, _classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError> {
        let (_, n_holdout) = holdout_sizes(n, self.test_size)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut permutation: Vec<usize> = (0..n).collect();
        permutation.shuffle(&mut rng);
        let train = permutation.split_off(n_holdout);
        Ok(vec![Fold {
            train,
            holdout: permutation,
        }])
    }
}

/// A single seeded holdout split preserving class proportions.
#[derive(Debug, Clone)]
pub struct StratifiedShuffleSplit {
    pub test_size: f64,
    pub seed: u64,
}

impl StratifiedShuffleSplit {
    pub fn new(test_size: f64, seed: u64) -> Self {
        Self { test_size, seed }
    }
}

/// Share `total` holdout slots among classes proportionally to their sizes.
///
/// Floors first, then hands out the remaining slots by largest fractional
/// remainder (lower class id wins ties), never exceeding a class's size.
fn allocate_holdout(total: usize, counts: &[usize]) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return vec![0; counts.len()];
    }
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| total as f64 * c as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact
        .iter()
        .zip(counts)
        .map(|(e, &c)| (e.floor() as usize).min(c))
        .collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut remaining = total.saturating_sub(alloc.iter().sum());
    while remaining > 0 {
        let mut progressed = false;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if alloc[class] < counts[class] {
                alloc[class] += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    alloc
}

impl FoldStrategy for StratifiedShuffleSplit {
    fn n_splits(&self) -> usize {
        1
    }

    fn is_stratified(&self) -> bool {
        true
    }

    fn folds(&self, n: usize, classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError> {
        let groups = class_groups(n, classes)?;
        let (n_train, n_holdout) = holdout_sizes(n, self.test_size)?;

        if groups.iter().any(|g| g.len() < 2) {
            return Err(SplitError::too_few(
                "the least populated class has only 1 member, at least 2 are needed",
            ));
        }
        if n_train < groups.len() || n_holdout < groups.len() {
            return Err(SplitError::too_few(format!(
                "{n_train} training and {n_holdout} holdout samples cannot cover {} classes",
                groups.len()
            )));
        }

        let counts: Vec<usize> = groups.iter().map(Vec::len).collect();
        let alloc = allocate_holdout(n_holdout, &counts);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(n - n_holdout);
        let mut holdout = Vec::with_capacity(n_holdout);
        for (mut members, take) in groups.into_iter().zip(alloc) {
            members.shuffle(&mut rng);
            let rest = members.split_off(take);
            holdout.extend(members);
            train.extend(rest);
        }
        holdout.shuffle(&mut rng);
        train.shuffle(&mut rng);

        Ok(vec![Fold { train, holdout }])
    }
}

/// Exhaustive k-way partition into contiguous runs.
#[derive(Debug, Clone)]
pub struct KFold {
    pub k: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl KFold {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            shuffle: false,
            seed: 0,
        }
    }

    pub fn shuffled(k: usize, seed: u64) -> Self {
        Self {
            k,
            shuffle: true,
            seed,
        }
    }
}

impl FoldStrategy for KFold {
    fn n_splits(&self) -> usize {
        self.k
    }

    fn folds(&self, n: usize, _classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError> {
        check_kfold(self.k, n)?;

        let mut order: Vec<usize> = (0..n).collect();
        if self.shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(self.seed));
        }

        let mut folds = Vec::with_capacity(self.k);
        let mut start = 0;
        for f in 0..self.k {
            let size = n / self.k + usize::from(f < n % self.k);
            let holdout = order[start..start + size].to_vec();
            let mut in_holdout = vec![false; n];
            for &pos in &holdout {
                in_holdout[pos] = true;
            }
            let train = (0..n).filter(|&pos| !in_holdout[pos]).collect();
            folds.push(Fold { train, holdout });
            start += size;
        }
        Ok(folds)
    }
}

/// K-fold partition preserving class proportions in every fold.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    pub k: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl StratifiedKFold {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            shuffle: false,
            seed: 0,
        }
    }

    pub fn shuffled(k: usize, seed: u64) -> Self {
        Self {
            k,
            shuffle: true,
            seed,
        }
    }
}

impl FoldStrategy for StratifiedKFold {
    fn n_splits(&self) -> usize {
        self.k
    }

    fn is_stratified(&self) -> bool {
        true
    }

    fn folds(&self, n: usize, classes: Option<&[usize]>) -> Result<Vec<Fold>, SplitError> {
        check_kfold(self.k, n)?;
        let groups = class_groups(n, classes)?;

        // Relabel classes by first appearance so allocation follows input order.
        let mut groups = groups;
        groups.sort_by_key(|g| g[0]);

        let largest = groups.iter().map(Vec::len).max().unwrap_or(0);
        if self.k > largest {
            return Err(SplitError::too_few(format!(
                "no class has at least {} members",
                self.k
            )));
        }
        if groups.iter().any(|g| g.len() < self.k) {
            tracing::warn!(
                folds = self.k,
                "The least populated class has fewer members than folds"
            );
        }

        // Deal the class-sorted positions round-robin to get per-fold class counts.
        let mut allocation = vec![vec![0usize; groups.len()]; self.k];
        let mut dealt = 0;
        for (class, members) in groups.iter().enumerate() {
            for _ in members {
                allocation[dealt % self.k][class] += 1;
                dealt += 1;
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_of = vec![0usize; n];
        for (class, members) in groups.iter().enumerate() {
            let mut fold_ids: Vec<usize> = (0..self.k)
                .flat_map(|f| std::iter::repeat_n(f, allocation[f][class]))
                .collect();
            if self.shuffle {
                fold_ids.shuffle(&mut rng);
            }
            for (&pos, fold) in members.iter().zip(fold_ids) {
                fold_of[pos] = fold;
            }
        }

        Ok(folds_from_assignment(&fold_of, self.k))
    }
}
