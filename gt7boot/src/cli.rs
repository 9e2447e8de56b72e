use std::path::PathBuf;

use clap::Parser;

/// gt7boot - provision, fetch reference data, and serve the GT7 telemetry dashboard
///
/// Runtime settings come from the environment (or a `.env` file in the working
/// directory): LOG_LEVEL / GT7_LOG_LEVEL and DEVICE_IP / GT7_PLAYSTATION_IP.
#[derive(Parser, Debug)]
#[command(name = "gt7boot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Environment root holding the Python interpreter (default: GT7BOOT_ENV_ROOT,
    /// VIRTUAL_ENV or CONDA_PREFIX, else the interpreter on PATH)
    #[arg(long, value_name = "DIR")]
    pub env_root: Option<PathBuf>,

    /// Dependency manifest (default: requirements.txt in the working directory)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Dashboard checkout to run from (default: current directory)
    #[arg(long, short = 'C', value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Reinstall dependencies even if the manifest is unchanged
    #[arg(long, default_value = "false")]
    pub force_provision: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_valid() {
        let cli = Cli::try_parse_from(["gt7boot"]).unwrap();
        assert!(cli.env_root.is_none() && cli.manifest.is_none() && cli.workdir.is_none());
        assert!(!cli.force_provision);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "gt7boot",
            "--env-root",
            "/opt/conda/envs/gt7",
            "--manifest",
            "deps.txt",
            "-C",
            "/srv/gt7dashboard",
            "--force-provision",
        ])
        .unwrap();
        assert_eq!(cli.env_root, Some(PathBuf::from("/opt/conda/envs/gt7")));
        assert_eq!(cli.manifest, Some(PathBuf::from("deps.txt")));
        assert_eq!(cli.workdir, Some(PathBuf::from("/srv/gt7dashboard")));
        assert!(cli.force_provision);
    }

    #[test]
    fn test_positional_arguments_rejected() {
        assert!(Cli::try_parse_from(["gt7boot", "serve"]).is_err());
    }
}
