use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use mdtree_parser::Converter;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// A markdown file to convert and where its node tree goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Expands files and directories into conversion jobs. Directories are searched recursively for
/// markdown files. With `out_dir`, outputs keep their path relative to the directory given on the
/// command line, otherwise they are written next to the input.
pub fn collect_jobs(paths: &[PathBuf], out_dir: Option<&Path>) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("could not walk {}", path.display()))?;
                if entry.file_type().is_file() && is_markdown(entry.path()) {
                    let relative = entry.path().strip_prefix(path)?.to_path_buf();
                    jobs.push(job(entry.path().to_path_buf(), &relative, out_dir));
                }
            }
        } else if path.is_file() {
            let relative = PathBuf::from(path.file_name().unwrap_or(path.as_os_str()));
            jobs.push(job(path.clone(), &relative, out_dir));
        } else {
            anyhow::bail!("no such file or directory: {}", path.display());
        }
    }

    Ok(jobs)
}

fn job(input: PathBuf, relative: &Path, out_dir: Option<&Path>) -> Job {
    let output = match out_dir {
        Some(dir) => dir.join(relative).with_extension("json"),
        None => input.with_extension("json"),
    };
    Job { input, output }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| MARKDOWN_EXTENSIONS.contains(&ext))
}

/// Converts all jobs in parallel. Returns the number of converted files and the errors of the
/// ones that failed.
pub fn convert_all(converter: &Converter, jobs: &[Job], pretty: bool) -> (usize, Vec<anyhow::Error>) {
    let bar = ProgressStyle::with_template("{prefix:.bold.dim} {bar:30} {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(bar);

    let results: Vec<Result<()>> = jobs
        .par_iter()
        .map(|job| {
            pb.set_message(format!("{}", job.input.display()));
            let res = convert_one(converter, job, pretty).with_context(|| {
                format!(
                    "Failed to convert document – {}",
                    style(job.input.display()).italic()
                )
            });
            pb.inc(1);
            res
        })
        .collect();

    pb.finish_and_clear();

    let mut converted = 0;
    let mut errs = Vec::new();
    for res in results {
        match res {
            Ok(()) => converted += 1,
            Err(e) => errs.push(e),
        }
    }
    info!(converted, failed = errs.len(), "batch finished");
    (converted, errs)
}

fn convert_one(converter: &Converter, job: &Job, pretty: bool) -> Result<()> {
    let text = fs::read_to_string(&job.input)?;
    let serialized = crate::render(converter, &text, pretty)?;

    if let Some(parent) = job.output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&job.output, serialized)
        .with_context(|| format!("could not write {}", job.output.display()))?;

    debug!(input = %job.input.display(), output = %job.output.display(), "converted");
    Ok(())
}
