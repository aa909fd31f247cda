//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::SplitArgs;
use anyhow::Context;
use mlutils_core::config::{MlConfig, SplitterConfig, load_config, workspace_config_path};
use mlutils_core::persistence::atomic_write;
use mlutils_core::{Partition, SplitAssignment, Splitter};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Split(args) => handle_split(args, workspace, config_file),
        Commands::Show { file, json } => handle_show(&file, json),
        Commands::Check { file } => handle_check(&file),
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<MlConfig> {
    load_config(Some(workspace), config_file)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

/// Command-line options win over configured values.
fn apply_overrides(config: &mut SplitterConfig, args: &SplitArgs) {
    if let Some(kind) = args.strategy {
        config.kind = kind;
    }
    if args.outer_folds.is_some() {
        config.outer_folds = args.outer_folds;
    }
    if args.inner_folds.is_some() {
        config.inner_folds = args.inner_folds;
    }
    if let Some(test_size) = args.test_size {
        config.test_size = test_size;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.stratified |= args.stratified;
    config.shuffle |= args.shuffle;
}

/// Non-empty, non-comment lines of a text file.
fn read_lines(path: &Path) -> anyhow::Result<Vec<(usize, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| (n, line.to_string()))
        .collect())
}

fn read_indices(path: &Path) -> anyhow::Result<Vec<usize>> {
    read_lines(path)?
        .into_iter()
        .map(|(n, line)| {
            line.parse::<usize>()
                .with_context(|| format!("{}:{}: '{}' is not an index", path.display(), n, line))
        })
        .collect()
}

fn read_labels(path: &Path) -> anyhow::Result<Vec<String>> {
    Ok(read_lines(path)?.into_iter().map(|(_, line)| line).collect())
}

fn handle_split(
    args: SplitArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load(workspace, config_file)?;
    let mut splitter_config = config.splitter.clone();
    apply_overrides(&mut splitter_config, &args);

    let indices: Vec<usize> = match (args.num_items, &args.indices) {
        (Some(n), _) => (0..n).collect(),
        (None, Some(path)) => read_indices(path)?,
        (None, None) => anyhow::bail!("Either --num-items or --indices is required"),
    };
    let labels = args.labels.as_deref().map(read_labels).transpose()?;
    if labels.is_some() && !splitter_config.stratified {
        warn!("Labels supplied without --stratified; they will be ignored");
    }

    let mut splitter = Splitter::from_config(&splitter_config)?;
    splitter.split(&indices, labels.as_deref())?;

    let output = args
        .output
        .unwrap_or_else(|| resolve(workspace, &config.data.splits_path));
    splitter.save(&output)?;
    info!(path = %output.display(), kind = %splitter_config.kind, "Split file written");
    println!(
        "Wrote {} split of {} items ({} outer x {} inner) to: {}",
        splitter_config.kind,
        indices.len(),
        splitter.outer_folds(),
        splitter.inner_folds(),
        output.display()
    );
    Ok(())
}

/// Relative configured paths live under the workspace.
fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct SplitSummary {
    outer_folds: usize,
    inner_folds: usize,
    items: usize,
    folds: Vec<OuterSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct OuterSummary {
    test: usize,
    inner: Vec<InnerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct InnerSummary {
    training: usize,
    validation: usize,
}

fn summarize(assignment: &SplitAssignment) -> SplitSummary {
    let mut items = BTreeSet::new();
    for partition in Partition::ALL {
        for lists in assignment.partition(partition) {
            for list in lists {
                items.extend(list.iter().copied());
            }
        }
    }

    let folds = (0..assignment.outer_folds())
        .map(|o| OuterSummary {
            test: assignment.test[o][0].len(),
            inner: assignment.training[o]
                .iter()
                .zip(&assignment.validation[o])
                .map(|(train, val)| InnerSummary {
                    training: train.len(),
                    validation: val.len(),
                })
                .collect(),
        })
        .collect();

    SplitSummary {
        outer_folds: assignment.outer_folds(),
        inner_folds: assignment.inner_folds(),
        items: items.len(),
        folds,
    }
}

fn handle_show(file: &Path, json: bool) -> anyhow::Result<()> {
    let assignment = SplitAssignment::load(file)?;
    let summary = summarize(&assignment);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Split file: {}", file.display());
    println!(
        "  {} items, {} outer x {} inner folds",
        summary.items, summary.outer_folds, summary.inner_folds
    );
    for (o, fold) in summary.folds.iter().enumerate() {
        println!("  outer {o}: test={}", fold.test);
        for (i, inner) in fold.inner.iter().enumerate() {
            println!(
                "    inner {i}: training={} validation={}",
                inner.training, inner.validation
            );
        }
    }
    Ok(())
}

fn handle_check(file: &Path) -> anyhow::Result<()> {
    let assignment = SplitAssignment::load(file)?;
    assignment
        .check_invariants()
        .with_context(|| format!("{} failed verification", file.display()))?;
    println!(
        "OK: {} ({} outer x {} inner folds, no overlap between partitions)",
        file.display(),
        assignment.outer_folds(),
        assignment.inner_folds()
    );
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = workspace_config_path(workspace);
            if path.exists() {
                println!("Configuration file already exists at: {}", path.display());
                return Ok(());
            }
            atomic_write(&path, render_config(&MlConfig::default())?.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Default configuration written");
            println!("Created default configuration at: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", render_config(&load(workspace, config_file)?)?);
            Ok(())
        }
    }
}

fn render_config(config: &MlConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).context("serializing configuration")
}
