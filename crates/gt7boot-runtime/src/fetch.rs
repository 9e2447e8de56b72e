//! Reference data fetch: run the downloader, then check the dataset landed.

use std::path::PathBuf;

use gt7boot_core::config::BootstrapPaths;

use crate::env_root::RuntimeTools;
use crate::error::FetchError;
use crate::process::{CommandSpec, ProcessRunner};

/// Downloader script shipped with the dashboard, relative to the working directory.
pub const DEFAULT_DOWNLOADER: &str = "helper/download_cars_csv.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub dataset: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    pub command: CommandSpec,
    pub dataset: PathBuf,
}

impl Fetcher {
    /// `python helper/download_cars_csv.py`, unless `override_cmd` replaces it.
    pub fn new(paths: &BootstrapPaths, tools: &RuntimeTools, override_cmd: Option<&[String]>) -> Self {
        let command = override_cmd
            .and_then(|tokens| CommandSpec::from_tokens(tokens, &paths.workdir))
            .unwrap_or_else(|| {
                CommandSpec::new(&tools.python, &paths.workdir).arg(DEFAULT_DOWNLOADER)
            });
        Self {
            command,
            dataset: paths.dataset.clone(),
        }
    }

    pub fn fetch(&self, runner: &dyn ProcessRunner) -> Result<FetchOutcome, FetchError> {
        tracing::info!(cmd = %self.command, "Fetching reference data");
        let status = runner.run(&self.command).map_err(|source| FetchError::Spawn {
            program: self.command.program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(FetchError::Failed { status });
        }

        match std::fs::metadata(&self.dataset) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(FetchOutcome {
                dataset: self.dataset.clone(),
                bytes: meta.len(),
            }),
            Ok(meta) if meta.is_file() => Err(FetchError::EmptyDataset(self.dataset.clone())),
            _ => Err(FetchError::MissingDataset(self.dataset.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessExit;
    use crate::testing::ScriptedRunner;
    use std::path::Path;

    fn fetcher(dir: &Path) -> Fetcher {
        Fetcher {
            command: CommandSpec::new("python3", dir).arg(DEFAULT_DOWNLOADER),
            dataset: dir.join("db").join("cars.csv"),
        }
    }

    fn write_dataset(dataset: PathBuf, content: &'static str) -> ScriptedRunner {
        ScriptedRunner::new(move |_| {
            std::fs::create_dir_all(dataset.parent().unwrap())?;
            std::fs::write(&dataset, content)?;
            Ok(ProcessExit::Code(0))
        })
    }

    #[test]
    fn test_fetch_reports_dataset_size() {
        let dir = tempfile::tempdir().unwrap();
        let f = fetcher(dir.path());
        let runner = write_dataset(f.dataset.clone(), "ID,ShortName,Maker\n1,Car,Maker\n");
        let out = f.fetch(&runner).unwrap();
        assert_eq!(out.dataset, f.dataset);
        assert!(out.bytes > 0);
    }

    #[test]
    fn test_rerun_overwrites_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let f = fetcher(dir.path());
        f.fetch(&write_dataset(f.dataset.clone(), "ID\n1\n2\n3\n")).unwrap();
        let out = f.fetch(&write_dataset(f.dataset.clone(), "ID\n1\n")).unwrap();
        assert_eq!(out.bytes, 5);
    }

    #[test]
    fn test_downloader_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_| Ok(ProcessExit::Code(2)));
        let err = fetcher(dir.path()).fetch(&runner).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Failed {
                status: ProcessExit::Code(2)
            }
        ));
    }

    #[test]
    fn test_success_without_dataset_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher(dir.path())
            .fetch(&ScriptedRunner::succeeding())
            .unwrap_err();
        assert!(matches!(err, FetchError::MissingDataset(_)));
    }

    #[test]
    fn test_empty_dataset_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let f = fetcher(dir.path());
        let err = f.fetch(&write_dataset(f.dataset.clone(), "")).unwrap_err();
        assert!(matches!(err, FetchError::EmptyDataset(_)));
    }

    #[test]
    fn test_override_command() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BootstrapPaths {
            workdir: dir.path().to_path_buf(),
            env_root: None,
            manifest: dir.path().join("requirements.txt"),
            dataset: dir.path().join("db/cars.csv"),
            state_dir: dir.path().join(".gt7boot"),
        };
        let tools = RuntimeTools {
            root: None,
            python: PathBuf::from("python3"),
        };
        let tokens = vec!["curl".to_string(), "-fsSLo".to_string(), "db/cars.csv".to_string()];
        let f = Fetcher::new(&paths, &tools, Some(tokens.as_slice()));
        assert_eq!(f.command.program, PathBuf::from("curl"));
        assert_eq!(f.command.args, ["-fsSLo", "db/cars.csv"]);

        let f = Fetcher::new(&paths, &tools, None);
        assert_eq!(f.command.argv(), ["python3", DEFAULT_DOWNLOADER]);
    }
}
