use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use crate::campaign::Campaign;
use crate::payload::Payload;

mod campaign;
mod condor;
mod external;
mod payload;
mod submission;

#[derive(Parser, Debug)]
#[command(name = "gridpack-submit")]
#[command(version)]
#[command(about = "Prepare an event-generation job and submit it to HTCondor", long_about = None)]
struct Cli {
    /// Path to the LHE file or gridpack to generate events from
    payload: PathBuf,

    /// Data-taking campaign the worker simulates pileup for
    #[arg(value_enum)]
    year: Campaign,

    /// Number of jobs to queue
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    njobs: u32,
}

/// Directories and identity a submission is built with, resolved once at startup
pub struct Workspace {
    pub base_dir: PathBuf,
    pub log_dir: PathBuf,
    pub work_dir: PathBuf,
    pub user: String,
    pub year: Campaign,
}

impl Workspace {
    /// Create logs/ and submissions/ under the base directory and a fresh
    /// working directory for this process name
    pub fn prepare(
        base_dir: PathBuf,
        user: String,
        year: Campaign,
        process: &str,
    ) -> Result<Workspace> {
        let log_dir = base_dir.join("logs");
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Can't create {}", log_dir.display()))?;

        let work_dir = base_dir.join("submissions").join(format!("submit_{process}"));
        info!("Preparing working directory {}", work_dir.display());
        if work_dir.exists() {
            warn!("Working directory already exists, files will be overwritten");
            fs::remove_dir_all(&work_dir)
                .with_context(|| format!("Can't delete {}", work_dir.display()))?;
        }
        fs::create_dir_all(&work_dir)
            .with_context(|| format!("Can't create {}", work_dir.display()))?;

        Ok(Workspace { base_dir, log_dir, work_dir, user, year })
    }
}

/// Invoking user, used for the notification address and accounting tags
fn current_user() -> Result<String> {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .context("Can't determine the invoking user, USER and LOGNAME are unset")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    info!("gridpack-submit starting up");

    let payload = Payload::new(cli.payload).context("Payload path has no file name")?;
    let process = payload.process();
    info!("Process name: {process}");

    let base_dir = env::current_dir().context("Can't read the invocation directory")?;
    let user = current_user()?;
    let workspace = Workspace::prepare(base_dir, user, cli.year, &process)?;

    let staged = submission::stage::stage(&payload, &workspace)?;
    let script = submission::exec::write_exec_script(&payload, &workspace)
        .context("Can't write the worker-entry script")?;
    let job = condor::job::create(&process, &script, &staged, &workspace, cli.njobs)
        .context("Can't write the job description")?;
    condor::job::submit(&job)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn unsupported_years_are_usage_errors() {
        let result =
            Cli::try_parse_from(["gridpack-submit", "signal_v1_2016_gridpack.tar.xz", "2016"]);
        assert!(result.is_err());
    }

    #[test]
    fn njobs_defaults_to_one() {
        let cli =
            Cli::try_parse_from(["gridpack-submit", "signal_v1_2018_gridpack.tar.xz", "2018"])
                .unwrap();
        assert_eq!(cli.year, Campaign::Y2018);
        assert_eq!(cli.njobs, 1);
    }

    #[test]
    fn njobs_must_be_a_positive_integer() {
        assert!(Cli::try_parse_from(["gridpack-submit", "a.lhe", "2018", "many"]).is_err());
        assert!(Cli::try_parse_from(["gridpack-submit", "a.lhe", "2018", "0"]).is_err());

        let cli = Cli::try_parse_from(["gridpack-submit", "a.lhe", "2018", "8"]).unwrap();
        assert_eq!(cli.njobs, 8);
    }

    #[test]
    fn preparing_twice_resets_the_working_directory() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_path_buf();

        let first = Workspace::prepare(
            base.clone(),
            "ava".to_string(),
            Campaign::Y2018,
            "signal_v1_2018_gridpack",
        )
        .unwrap();
        fs::write(first.work_dir.join("stale.txt"), b"left over").unwrap();

        let second = Workspace::prepare(
            base,
            "ava".to_string(),
            Campaign::Y2018,
            "signal_v1_2018_gridpack",
        )
        .unwrap();

        assert_eq!(first.work_dir, second.work_dir);
        assert!(!second.work_dir.join("stale.txt").exists());
        assert!(second.log_dir.is_dir());
    }
}
