//! Dependency provisioning: install the manifest into the environment root.
//!
//! Single attempt, no retries. A successful install leaves a stamp in the
//! state directory so an unchanged manifest is not reinstalled on the next run.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use gt7boot_core::config::BootstrapPaths;
use gt7boot_core::manifest::Manifest;

use crate::env_root::RuntimeTools;
use crate::error::{BootstrapError, InstallError};
use crate::process::{CommandSpec, ProcessRunner};

pub const STAMP_FILE: &str = "provision.sha256";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Installed { packages: usize },
    /// Manifest and interpreter unchanged since the last successful install
    UpToDate,
    /// Manifest lists no packages
    NothingToInstall,
}

impl ProvisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed { .. } => "installed",
            Self::UpToDate => "up_to_date",
            Self::NothingToInstall => "nothing_to_install",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Provisioner {
    pub manifest: PathBuf,
    pub python: PathBuf,
    pub workdir: PathBuf,
    pub state_dir: PathBuf,
    /// Ignore the stamp and always run the installer
    pub force: bool,
}

impl Provisioner {
    pub fn new(paths: &BootstrapPaths, tools: &RuntimeTools, force: bool) -> Self {
        Self {
            manifest: paths.manifest.clone(),
            python: tools.python.clone(),
            workdir: paths.workdir.clone(),
            state_dir: paths.state_dir.clone(),
            force,
        }
    }

    /// `python -m pip install <requirements...>`, never prompting.
    pub fn install_command(&self, manifest: &Manifest) -> CommandSpec {
        CommandSpec::new(&self.python, &self.workdir)
            .args(["-m", "pip", "install", "--no-input", "--disable-pip-version-check"])
            .args(manifest.requirements.iter().map(|r| r.to_string()))
    }

    pub fn provision(&self, runner: &dyn ProcessRunner) -> Result<ProvisionOutcome, BootstrapError> {
        let manifest = Manifest::load(&self.manifest)?;
        let stamp = self.stamp_value(&manifest);

        if !self.force && self.read_stamp().as_deref() == Some(stamp.as_str()) {
            tracing::info!(
                manifest = %self.manifest.display(),
                "Dependencies up to date, skipping install"
            );
            return Ok(ProvisionOutcome::UpToDate);
        }

        if manifest.is_empty() {
            tracing::info!(manifest = %self.manifest.display(), "Manifest lists no packages");
            return Ok(ProvisionOutcome::NothingToInstall);
        }

        let spec = self.install_command(&manifest);
        tracing::info!(packages = manifest.len(), python = %self.python.display(), "Installing dependencies");
        let status = runner.run(&spec).map_err(|source| InstallError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        if !status.success() {
            self.clear_stamp();
            return Err(InstallError::Failed { status }.into());
        }

        self.write_stamp(&stamp);
        Ok(ProvisionOutcome::Installed {
            packages: manifest.len(),
        })
    }

    fn stamp_path(&self) -> PathBuf {
        self.state_dir.join(STAMP_FILE)
    }

    /// Changes when the requirement list or the target interpreter changes,
    /// including an environment recreated at the same path.
    fn stamp_value(&self, manifest: &Manifest) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(manifest.fingerprint().as_bytes());
        hasher.update(self.python.to_string_lossy().as_bytes());
        hasher.update(interpreter_identity(&self.python).as_bytes());
        hex::encode(hasher.finalize())
    }

    fn read_stamp(&self) -> Option<String> {
        std::fs::read_to_string(self.stamp_path())
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn write_stamp(&self, stamp: &str) {
        let path = self.stamp_path();
        if let Err(e) = write_file(&path, stamp) {
            tracing::warn!(path = %path.display(), "Could not record provision stamp: {}", e);
        }
    }

    fn clear_stamp(&self) {
        let _ = std::fs::remove_file(self.stamp_path());
    }
}

/// Identity of the interpreter entry itself (a venv's `bin/python` symlink, not
/// its target): device, inode and modification time.
fn interpreter_identity(python: &Path) -> String {
    let Ok(meta) = std::fs::symlink_metadata(python) else {
        return "missing".to_string();
    };
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    #[cfg(unix)]
    let identity = {
        use std::os::unix::fs::MetadataExt;
        format!("{}:{}:{}", meta.dev(), meta.ino(), modified)
    };
    #[cfg(not(unix))]
    let identity = format!("{}:{}", meta.len(), modified);
    identity
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessExit;
    use crate::testing::ScriptedRunner;
    use gt7boot_core::error::ManifestError;
    use std::io;

    fn provisioner(dir: &Path) -> Provisioner {
        Provisioner {
            manifest: dir.join("requirements.txt"),
            python: PathBuf::from("/opt/env/bin/python"),
            workdir: dir.to_path_buf(),
            state_dir: dir.join(".gt7boot"),
            force: false,
        }
    }

    #[test]
    fn test_install_command_lists_requirements() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "bokeh==3.4.1\npandas\n").unwrap();
        let p = provisioner(dir.path());
        let manifest = Manifest::load(&p.manifest).unwrap();
        let spec = p.install_command(&manifest);
        assert_eq!(spec.program, PathBuf::from("/opt/env/bin/python"));
        assert_eq!(
            spec.args,
            [
                "-m",
                "pip",
                "install",
                "--no-input",
                "--disable-pip-version-check",
                "bokeh==3.4.1",
                "pandas"
            ]
        );
        assert_eq!(spec.cwd, dir.path());
    }

    #[test]
    fn test_second_run_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "bokeh\n").unwrap();
        let p = provisioner(dir.path());
        let runner = ScriptedRunner::succeeding();

        assert_eq!(
            p.provision(&runner).unwrap(),
            ProvisionOutcome::Installed { packages: 1 }
        );
        assert_eq!(p.provision(&runner).unwrap(), ProvisionOutcome::UpToDate);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_changed_manifest_reinstalls() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        std::fs::write(&manifest, "bokeh\n").unwrap();
        let p = provisioner(dir.path());
        let runner = ScriptedRunner::succeeding();
        p.provision(&runner).unwrap();
        std::fs::write(&manifest, "bokeh\nscipy\n").unwrap();
        assert_eq!(
            p.provision(&runner).unwrap(),
            ProvisionOutcome::Installed { packages: 2 }
        );
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_recreated_environment_reinstalls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "bokeh\n").unwrap();
        let venv = dir.path().join("venv");
        let python = venv.join("bin").join("python");
        std::fs::create_dir_all(python.parent().unwrap()).unwrap();
        std::fs::write(&python, "").unwrap();
        let p = Provisioner {
            python: python.clone(),
            ..provisioner(dir.path())
        };
        let runner = ScriptedRunner::succeeding();
        p.provision(&runner).unwrap();
        assert_eq!(p.provision(&runner).unwrap(), ProvisionOutcome::UpToDate);

        std::fs::remove_dir_all(&venv).unwrap();
        std::fs::create_dir_all(python.parent().unwrap()).unwrap();
        let recreated = std::fs::File::create(&python).unwrap();
        recreated
            .set_modified(UNIX_EPOCH + std::time::Duration::from_secs(86_400))
            .unwrap();
        drop(recreated);

        assert_eq!(
            p.provision(&runner).unwrap(),
            ProvisionOutcome::Installed { packages: 1 }
        );
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_force_ignores_stamp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "bokeh\n").unwrap();
        let mut p = provisioner(dir.path());
        let runner = ScriptedRunner::succeeding();
        p.provision(&runner).unwrap();
        p.force = true;
        assert!(matches!(
            p.provision(&runner).unwrap(),
            ProvisionOutcome::Installed { .. }
        ));
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_missing_manifest_never_invokes_installer() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::succeeding();
        let err = provisioner(dir.path()).provision(&runner).unwrap_err();
        assert!(matches!(err, BootstrapError::Manifest(ManifestError::Missing(_))));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_invalid_manifest_never_invokes_installer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "bokeh\n--index-url http://x\n").unwrap();
        let runner = ScriptedRunner::succeeding();
        let err = provisioner(dir.path()).provision(&runner).unwrap_err();
        assert!(matches!(err, BootstrapError::Manifest(ManifestError::Invalid { .. })));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_failed_install_clears_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        std::fs::write(&manifest, "bokeh\n").unwrap();
        let p = provisioner(dir.path());
        p.provision(&ScriptedRunner::succeeding()).unwrap();
        assert!(p.stamp_path().exists());

        std::fs::write(&manifest, "bokeh\nno-such-package\n").unwrap();
        let failing = ScriptedRunner::new(|_| Ok(ProcessExit::Code(1)));
        let err = p.provision(&failing).unwrap_err();
        assert!(matches!(err, BootstrapError::Install(InstallError::Failed { .. })));
        assert!(!p.stamp_path().exists());
    }

    #[test]
    fn test_installer_spawn_failure_is_install_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "bokeh\n").unwrap();
        let runner = ScriptedRunner::new(|_| Err(io::Error::from(io::ErrorKind::NotFound)));
        let err = provisioner(dir.path()).provision(&runner).unwrap_err();
        assert!(matches!(err, BootstrapError::Install(InstallError::Spawn { .. })));
    }

    #[test]
    fn test_empty_manifest_succeeds_without_installer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "# nothing\n").unwrap();
        let runner = ScriptedRunner::succeeding();
        assert_eq!(
            provisioner(dir.path()).provision(&runner).unwrap(),
            ProvisionOutcome::NothingToInstall
        );
        assert!(runner.calls().is_empty());
    }
}
