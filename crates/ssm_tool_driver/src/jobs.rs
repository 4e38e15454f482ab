use std::fs;
use std::path::{Path, PathBuf};

use ssm_tool_core::contract::JobDocument;
use ssm_tool_core::tool::Tool;
use tracing::{debug, info};

use crate::driver::NamedJob;
use crate::error::{DriverError, Result};

/// Loads a single job file, or every `*.json` file of a folder in file-name order.
/// The first invalid file fails the whole load so a bad batch never starts.
pub fn load_jobs(tool: Tool, path: &Path) -> Result<Vec<NamedJob>> {
    let metadata = fs::metadata(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let files = if metadata.is_dir() {
        job_files_in(path)?
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        return Err(DriverError::Config(format!(
            "no .json job files found in {}",
            path.display()
        )));
    }

    let mut jobs = Vec::with_capacity(files.len());
    for file in files {
        let job = load_job(tool, &file)?;
        debug!(label = %job.label, job = %job.document.summary(), "job loaded");
        jobs.push(job);
    }

    info!(tool = %tool, count = jobs.len(), path = %path.display(), "jobs loaded");
    Ok(jobs)
}

pub fn load_job(tool: Tool, path: &Path) -> Result<NamedJob> {
    let label = job_label(path);
    let text = fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = JobDocument::from_json(tool, &text)
        .map_err(|source| DriverError::InvalidJob {
            label: label.clone(),
            source,
        })?;

    Ok(NamedJob { label, document })
}

fn job_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| DriverError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DriverError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && has_json_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn job_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "job".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("job file should be written");
        path
    }

    #[test]
    fn loads_folder_in_file_name_order_and_skips_other_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(
            dir.path(),
            "02_remove.json",
            r#"{"action":"init","job_action":"remove","args":{"names":["old"]}}"#,
        );
        write(
            dir.path(),
            "01_create.json",
            r#"{"action":"init","job_action":"create","args":{"names_values":{"p":"v"}}}"#,
        );
        write(dir.path(), "README.md", "not a job");

        let jobs = load_jobs(Tool::Parameter, dir.path()).expect("jobs should load");

        let labels: Vec<&str> = jobs.iter().map(|job| job.label.as_str()).collect();
        assert_eq!(labels, vec!["01_create", "02_remove"]);
    }

    #[test]
    fn loads_single_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            dir.path(),
            "install.json",
            r#"{"action":"init","args":{"document":"CrowdStrikeFalconInstall-ubuntu"}}"#,
        );

        let jobs = load_jobs(Tool::RunDocument, &path).expect("job should load");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].label, "install");
    }

    #[test]
    fn invalid_file_fails_the_whole_batch() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(
            dir.path(),
            "a.json",
            r#"{"action":"init","job_action":"create","args":{"names_values":{"p":"v"}}}"#,
        );
        write(
            dir.path(),
            "b.json",
            r#"{"action":"init","job_action":"purge","args":{"names":["p"]}}"#,
        );

        let error = load_jobs(Tool::Parameter, dir.path()).expect_err("batch should fail");
        match error {
            DriverError::InvalidJob { label, source } => {
                assert_eq!(label, "b");
                assert!(source.message().contains("Unsupported job_action 'purge'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_folder_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_jobs(Tool::Parameter, dir.path()).expect_err("empty folder should fail");
        assert!(matches!(error, DriverError::Config(_)));
    }

    #[test]
    fn missing_path_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_jobs(Tool::Parameter, &dir.path().join("missing"))
            .expect_err("missing path should fail");
        assert!(matches!(error, DriverError::Io { .. }));
    }
}
