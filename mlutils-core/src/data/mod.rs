//! Data splitting and loading: fold strategies, nested splitters, split files, loaders.

pub mod assignment;
pub mod folds;
pub mod provider;
pub mod splitter;

pub use assignment::{Partition, SplitAssignment};
pub use folds::{Fold, FoldStrategy, KFold, ShuffleSplit, StratifiedKFold, StratifiedShuffleSplit};
pub use provider::{BatchLoader, DataProvider, Dataset, FoldLoader, LoaderConfig, Subset};
pub use splitter::Splitter;
