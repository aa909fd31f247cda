//! Data provider: turns a persisted split assignment into batch loaders.

use crate::config::DataConfig;
use crate::data::assignment::{Partition, SplitAssignment};
use crate::data::splitter::Splitter;
use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;

/// An indexable collection of items.
pub trait Dataset {
    type Item: Clone;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<Self::Item>;

    /// Number of input features, when the dataset declares it.
    fn dim_features(&self) -> Option<usize> {
        None
    }

    /// Number of target dimensions, when the dataset declares it.
    fn dim_target(&self) -> Option<usize> {
        None
    }
}

impl<T: Clone> Dataset for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        <[T]>::get(self, index).cloned()
    }
}

/// A view of a dataset restricted to an index list.
#[derive(Debug)]
pub struct Subset<'a, D: Dataset> {
    dataset: &'a D,
    indices: &'a [usize],
}

impl<'a, D: Dataset> Subset<'a, D> {
    /// Fails when an index is outside the dataset.
    pub fn new(dataset: &'a D, indices: &'a [usize]) -> Result<Self, MlError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= dataset.len()) {
            return Err(MlError::dataset(format!(
                "index {bad} is out of range for a dataset of {} items",
                dataset.len()
            )));
        }
        Ok(Self { dataset, indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        self.indices
    }

    /// Item at `position` within the subset.
    pub fn get(&self, position: usize) -> Option<D::Item> {
        self.indices
            .get(position)
            .and_then(|&i| self.dataset.get(i))
    }
}

/// How a [`BatchLoader`] walks a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    pub drop_last: bool,
    pub seed: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig::from(&DataConfig::default())
    }
}

impl From<&DataConfig> for LoaderConfig {
    fn from(config: &DataConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            drop_last: config.drop_last,
            seed: config.seed,
        }
    }
}

/// Iterator over batches of subset items.
///
/// A batch is an error when the dataset returns no item for one of its
/// in-range indices. Iteration continues with the next batch.
#[derive(Debug)]
pub struct BatchLoader<'a, D: Dataset> {
    subset: Subset<'a, D>,
    order: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    drop_last: bool,
}

impl<'a, D: Dataset> BatchLoader<'a, D> {
    pub fn new(subset: Subset<'a, D>, config: &LoaderConfig) -> Self {
        let mut order: Vec<usize> = (0..subset.len()).collect();
        if config.shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(config.seed));
        }
        Self {
            subset,
            order,
            cursor: 0,
            batch_size: config.batch_size.max(1),
            drop_last: config.drop_last,
        }
    }

    pub fn subset(&self) -> &Subset<'a, D> {
        &self.subset
    }

    /// Number of batches a full pass yields.
    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }
}

impl<D: Dataset> Iterator for BatchLoader<'_, D> {
    type Item = Result<Vec<D::Item>, MlError>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.order.len() - self.cursor;
        if remaining == 0 || (self.drop_last && remaining < self.batch_size) {
            return None;
        }
        let end = self.cursor + remaining.min(self.batch_size);
        let batch = self.order[self.cursor..end]
            .iter()
            .map(|&pos| {
                self.subset.get(pos).ok_or_else(|| {
                    MlError::dataset(format!(
                        "dataset returned no item for index {}",
                        self.subset.indices[pos]
                    ))
                })
            })
            .collect();
        self.cursor = end;
        Some(batch)
    }
}

/// One loader yielded while walking the folds of a provider.
#[derive(Debug)]
pub struct FoldLoader<'a, D: Dataset> {
    pub partition: Partition,
    pub outer_fold: usize,
    pub inner_fold: usize,
    pub loader: BatchLoader<'a, D>,
}

/// Serves loaders for every cell of a split assignment over one dataset.
#[derive(Debug)]
pub struct DataProvider<D: Dataset> {
    dataset: D,
    splitter: Splitter,
    loader: LoaderConfig,
}

impl<D: Dataset> DataProvider<D> {
    /// Fails when the assignment is malformed or references items the dataset lacks.
    pub fn new(dataset: D, splits: SplitAssignment, loader: LoaderConfig) -> Result<Self, MlError> {
        let len = dataset.len();
        for partition in Partition::ALL {
            let out_of_range = splits
                .partition(partition)
                .iter()
                .flatten()
                .flatten()
                .find(|&&i| i >= len);
            if let Some(bad) = out_of_range {
                return Err(MlError::dataset(format!(
                    "{partition} split references index {bad}, dataset has {len} items"
                )));
            }
        }
        Ok(Self {
            dataset,
            splitter: Splitter::from_assignment(splits)?,
            loader,
        })
    }

    /// Load the splits file at `splits_path`.
    pub fn from_path(dataset: D, splits_path: &Path, loader: LoaderConfig) -> Result<Self, MlError> {
        Self::new(dataset, SplitAssignment::load(splits_path)?, loader)
    }

    /// Load the splits file and loader settings named by `config`.
    pub fn from_config(dataset: D, config: &DataConfig) -> Result<Self, MlError> {
        Self::from_path(dataset, &config.splits_path, LoaderConfig::from(config))
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn num_outer_folds(&self) -> usize {
        self.splitter.outer_folds()
    }

    pub fn num_inner_folds(&self) -> usize {
        self.splitter.inner_folds()
    }

    pub fn dim_features(&self) -> Result<usize, MlError> {
        self.dataset
            .dim_features()
            .ok_or_else(|| MlError::dataset("dataset does not declare dim_features"))
    }

    pub fn dim_target(&self) -> Result<usize, MlError> {
        self.dataset
            .dim_target()
            .ok_or_else(|| MlError::dataset("dataset does not declare dim_target"))
    }

    pub fn get_subset(
        &self,
        partition: Partition,
        outer_fold: usize,
        inner_fold: usize,
    ) -> Result<Subset<'_, D>, MlError> {
        let indices = self.splitter.get_split(partition, outer_fold, inner_fold)?;
        Subset::new(&self.dataset, indices)
    }

    pub fn get_loader(
        &self,
        partition: Partition,
        outer_fold: usize,
        inner_fold: usize,
    ) -> Result<BatchLoader<'_, D>, MlError> {
        let subset = self.get_subset(partition, outer_fold, inner_fold)?;
        Ok(BatchLoader::new(subset, &self.loader))
    }

    /// Every loader in model-selection order: for each outer fold, training
    /// then validation for each inner fold, then the outer fold's test set.
    pub fn folds(&self) -> impl Iterator<Item = FoldLoader<'_, D>> + '_ {
        self.splitter
            .assignment()
            .into_iter()
            .flat_map(|a| {
                (0..a.outer_folds()).flat_map(move |o| {
                    (0..a.training[o].len())
                        .flat_map(move |i| {
                            [
                                (Partition::Training, o, i, a.training[o][i].as_slice()),
                                (Partition::Validation, o, i, a.validation[o][i].as_slice()),
                            ]
                        })
                        .chain(std::iter::once((Partition::Test, o, 0, a.test[o][0].as_slice())))
                })
            })
            .map(move |(partition, outer_fold, inner_fold, indices)| FoldLoader {
                partition,
                outer_fold,
                inner_fold,
                // Indices were range-checked in `new`.
                loader: BatchLoader::new(
                    Subset {
                        dataset: &self.dataset,
                        indices,
                    },
                    &self.loader,
                ),
            })
    }
}
