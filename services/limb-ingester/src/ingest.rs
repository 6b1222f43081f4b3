//! Batch processing of OMPS limb profile granules.

use anyhow::{anyhow, bail, Context, Result};
use limb_dataset::{DatasetSummary, LabeledDataset};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, instrument};

use omps_limb_parser::{build_dataset, read_raw_fields};

use crate::config::IngesterConfig;

/// File extensions picked up when an input directory is walked.
pub const HDF5_EXTENSIONS: &[&str] = &["h5", "he5", "hdf5"];

/// Expand input paths into a sorted, de-duplicated list of granule files.
///
/// Files are taken as given; directories are walked recursively for HDF5
/// files. A path that does not exist is an error.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path) {
                let entry = entry
                    .with_context(|| format!("Failed to walk directory: {}", path.display()))?;
                if entry.file_type().is_file() && has_hdf5_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            bail!("Input not found: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    debug!(count = files.len(), "Collected input granules");
    Ok(files)
}

fn has_hdf5_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            HDF5_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
        })
}

// Reads (hdf5-metno) and writes (netcdf) take separate library locks, so all
// HDF5 file access in this process is serialized here.
static HDF5_ACCESS: Mutex<()> = Mutex::new(());

/// Hold exclusive HDF5 file access for the lifetime of the guard.
pub fn hdf5_access() -> MutexGuard<'static, ()> {
    // The guarded value is `()`, so a poisoned lock carries no broken state
    HDF5_ACCESS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Read a granule, holding the file lock only while fields are read.
pub fn load_granule(path: &Path) -> Result<LabeledDataset> {
    let raw = {
        let _guard = hdf5_access();
        read_raw_fields(path)?
    };
    let dataset = build_dataset(&raw)?;
    debug!(scans = raw.scans(), levels = raw.levels(), "Built dataset");
    Ok(dataset)
}

/// Output of `inspect` for one granule.
#[derive(Debug, Clone, Serialize)]
pub struct InspectRecord {
    pub path: PathBuf,
    pub summary: DatasetSummary,
}

/// Result of processing one input file.
#[derive(Debug)]
pub struct FileOutcome<T> {
    pub path: PathBuf,
    pub result: Result<T>,
}

/// Outcomes of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<FileOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Parallel ingestion pipeline.
pub struct IngestionPipeline {
    config: IngesterConfig,
    pool: rayon::ThreadPool,
}

impl IngestionPipeline {
    /// Create a pipeline with a worker pool sized by `config.jobs`.
    pub fn new(config: &IngesterConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .thread_name(|i| format!("limb-worker-{}", i))
            .build()
            .map_err(|e| anyhow!("Failed to build worker pool: {}", e))?;

        info!(threads = pool.current_num_threads(), "Created ingestion pipeline");

        Ok(Self {
            config: config.clone(),
            pool,
        })
    }

    pub fn config(&self) -> &IngesterConfig {
        &self.config
    }

    /// Read each granule and summarize its contents.
    pub fn inspect(&self, files: &[PathBuf]) -> BatchReport<InspectRecord> {
        self.run(files, inspect_file)
    }

    /// Read each granule and write it as NetCDF into the output directory.
    pub fn convert(&self, files: &[PathBuf]) -> Result<BatchReport<PathBuf>> {
        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        let shared = shared_targets(files, output_dir);
        let overwrite = self.config.overwrite;
        Ok(self.run(files, |path| {
            if let Some(target) = output_path(path, output_dir)
                .ok()
                .filter(|t| shared.contains_key(t))
            {
                bail!(
                    "Output {} would be written by {} inputs; rename or convert them separately",
                    target.display(),
                    shared[&target]
                );
            }
            convert_file(path, output_dir, overwrite)
        }))
    }

    fn run<T, F>(&self, files: &[PathBuf], process: F) -> BatchReport<T>
    where
        T: Send,
        F: Fn(&Path) -> Result<T> + Sync,
    {
        let outcomes: Vec<FileOutcome<T>> = self.pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let result = process(path.as_path());
                    if let Err(e) = &result {
                        error!(path = %path.display(), error = %format!("{:#}", e), "Granule processing failed");
                    }
                    FileOutcome {
                        path: path.clone(),
                        result,
                    }
                })
                .collect()
        });

        let report = BatchReport { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch completed"
        );
        report
    }
}

/// Read one granule and summarize it.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn inspect_file(path: &Path) -> Result<InspectRecord> {
    let dataset = load_granule(path)?;
    Ok(InspectRecord {
        path: path.to_path_buf(),
        summary: dataset.summary(),
    })
}

/// Path of the NetCDF file written for `input`.
pub fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("Input has no file name: {}", input.display()))?;
    let mut name = stem.to_os_string();
    name.push(".nc");
    Ok(output_dir.join(name))
}

/// Output paths claimed by more than one input, with the number of claimants.
fn shared_targets(files: &[PathBuf], output_dir: &Path) -> HashMap<PathBuf, usize> {
    let mut counts: HashMap<PathBuf, usize> = HashMap::new();
    for target in files.iter().filter_map(|f| output_path(f, output_dir).ok()) {
        *counts.entry(target).or_default() += 1;
    }
    counts.retain(|_, n| *n > 1);
    counts
}

/// Read one granule and export it to `output_dir/<stem>.nc`.
///
/// The granule is read before the output is touched, and the file is
/// written under a temporary name and moved into place only once complete.
/// An existing output therefore survives any failure, and without
/// `overwrite` it is never replaced.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn convert_file(path: &Path, output_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let target = output_path(path, output_dir)?;
    if !overwrite && target.exists() {
        bail!("Output exists (use --overwrite): {}", target.display());
    }

    let dataset = load_granule(path)?;

    {
        let _guard = hdf5_access();
        let staged = tempfile::Builder::new()
            .prefix(".limb-")
            .suffix(".nc.tmp")
            .tempfile_in(output_dir)
            .with_context(|| format!("Failed to stage output in {}", output_dir.display()))?;

        dataset
            .write_netcdf(staged.path())
            .with_context(|| format!("Failed to write {}", target.display()))?;

        let persisted = if overwrite {
            staged.persist(&target)
        } else {
            staged.persist_noclobber(&target)
        };
        persisted.map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                anyhow!("Output exists (use --overwrite): {}", target.display())
            } else {
                anyhow!("Failed to move output into {}: {}", target.display(), e.error)
            }
        })?;
    }

    info!(output = %target.display(), "Wrote NetCDF file");
    Ok(target)
}

/// Plain-text rendering of an inspect record.
pub fn format_record(record: &InspectRecord) -> String {
    let summary = &record.summary;
    let mut out = format!("{}\n", record.path.display());

    let dims: Vec<String> = summary
        .dims
        .iter()
        .map(|(name, len)| format!("{}={}", name, len))
        .collect();
    out.push_str(&format!("  dims: {}\n", dims.join(", ")));

    if let (Some(start), Some(end)) = (summary.time_start, summary.time_end) {
        out.push_str(&format!("  time: {} .. {}\n", start.to_rfc3339(), end.to_rfc3339()));
    }

    for (name, var) in &summary.variables {
        let range = match (var.min, var.max) {
            (Some(min), Some(max)) => format!("[{:.4e}, {:.4e}]", min, max),
            _ => "-".to_string(),
        };
        out.push_str(&format!(
            "  {:<14} valid {:>7} / {:<7} range {}\n",
            name, var.valid, var.total, range
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hdf5_extensions() {
        assert!(has_hdf5_extension(Path::new("a/OMPS.h5")));
        assert!(has_hdf5_extension(Path::new("OMPS.HE5")));
        assert!(has_hdf5_extension(Path::new("OMPS.hdf5")));
        assert!(!has_hdf5_extension(Path::new("OMPS.nc")));
        assert!(!has_hdf5_extension(Path::new("h5")));
    }

    #[test]
    fn test_output_path() {
        let out = output_path(Path::new("/in/OMPS-LP_2020m0615.h5"), Path::new("/out")).unwrap();
        assert_eq!(out, PathBuf::from("/out/OMPS-LP_2020m0615.nc"));
    }

    #[test]
    fn test_output_path_keeps_dotted_stem() {
        let out = output_path(Path::new("OMPS-NPP_LP-L2-O3-DAILY_v2.5_2020m0615.h5"), Path::new("nc"))
            .unwrap();
        assert_eq!(out, PathBuf::from("nc/OMPS-NPP_LP-L2-O3-DAILY_v2.5_2020m0615.nc"));
    }

    #[test]
    fn test_shared_targets() {
        let files = vec![
            PathBuf::from("in/2020/g.h5"),
            PathBuf::from("in/2021/g.h5"),
            PathBuf::from("in/g.he5"),
            PathBuf::from("in/h.h5"),
        ];
        let shared = shared_targets(&files, Path::new("out"));
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[&PathBuf::from("out/g.nc")], 3);
    }

    #[test]
    fn test_collect_inputs_walks_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2020");
        std::fs::create_dir_all(&nested).unwrap();
        for name in ["b.h5", "a.he5", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::write(nested.join("c.hdf5"), b"").unwrap();

        let explicit = dir.path().join("b.h5");
        let files = collect_inputs(&[dir.path().to_path_buf(), explicit]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("2020/c.hdf5"),
                PathBuf::from("a.he5"),
                PathBuf::from("b.h5"),
            ]
        );
    }

    #[test]
    fn test_collect_inputs_missing_path() {
        let err = collect_inputs(&[PathBuf::from("/nonexistent/granules")]).unwrap_err();
        assert!(err.to_string().contains("Input not found"));
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport {
            outcomes: vec![
                FileOutcome {
                    path: PathBuf::from("a.h5"),
                    result: Ok(()),
                },
                FileOutcome {
                    path: PathBuf::from("b.h5"),
                    result: Err(anyhow!("boom")),
                },
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
    }
}
