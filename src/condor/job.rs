use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use chrono::Utc;
use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::external::{self, CommandError};
use crate::submission::exec::ExecScript;
use crate::submission::stage::StagedSubmission;
use crate::Workspace;

/// A JobPath is the path to a job description that's submitted to HTCondor via condor_submit
pub struct JobPath {
    pub path: PathBuf,
}

/// Rendering context for the job description
#[derive(Serialize)]
struct JdlContext {
    generated_at: String,
    executable: String,
    archive: String,
    log_dir: String,
    user: String,
    njobs: u32,
}

/// Render the job description using TinyTemplate
///
/// The executable is the generated worker-entry script and the archive is the
/// sole transferred input. Output, error and log files land in the log
/// directory under scheduler-assigned cluster and process numbers.
pub fn render_jdl(
    generated_at: &str,
    script: &ExecScript,
    submission: &StagedSubmission,
    workspace: &Workspace,
    njobs: u32,
) -> String {
    /// included job description template
    static JDL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/jdl.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("jdl", JDL).expect("Template");

    let context = JdlContext {
        generated_at: generated_at.to_string(),
        executable: script.path.display().to_string(),
        archive: submission.archive.display().to_string(),
        log_dir: workspace.log_dir.display().to_string(),
        user: workspace.user.clone(),
        njobs,
    };
    tt.render("jdl", &context).expect("Rendered job description")
}

/// Write the job description for a staged submission to the log directory
pub fn create(
    process: &str,
    script: &ExecScript,
    submission: &StagedSubmission,
    workspace: &Workspace,
    njobs: u32,
) -> Result<JobPath, io::Error> {
    let content = render_jdl(&Utc::now().to_string(), script, submission, workspace, njobs);
    let path = workspace.log_dir.join(format!("condor_{process}.jdl"));
    info!("Writing job description to {}", path.display());
    fs::write(&path, content)?;
    Ok(JobPath { path })
}

/// Submit the job description to the scheduler and log its response
pub fn submit(job: &JobPath) -> Result<(), CommandError> {
    let mut condor_submit = Command::new("condor_submit");
    condor_submit.arg(&job.path);
    let output = external::run(&mut condor_submit)?;
    let response = String::from_utf8_lossy(&output.stdout);
    info!("Scheduler response: {}", response.trim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::campaign::Campaign;

    use super::*;

    fn fixture() -> (ExecScript, StagedSubmission, Workspace) {
        let work_dir = PathBuf::from("/work/submissions/submit_signal_v1_2018_gridpack");
        let script = ExecScript { path: work_dir.join("exec.sh") };
        let submission = StagedSubmission { archive: work_dir.join("submit.tgz") };
        let workspace = Workspace {
            base_dir: PathBuf::from("/work"),
            log_dir: PathBuf::from("/work/logs"),
            work_dir,
            user: "ava".to_string(),
            year: Campaign::Y2018,
        };
        (script, submission, workspace)
    }

    #[test]
    fn job_description_matches_the_scheduler_contract() {
        let (script, submission, workspace) = fixture();
        let jdl = render_jdl("2018-06-01 12:00:00 UTC", &script, &submission, &workspace, 1);
        let expected = r#"# written by gridpack-submit at 2018-06-01 12:00:00 UTC
universe = vanilla
executable = /work/submissions/submit_signal_v1_2018_gridpack/exec.sh
should_transfer_files = YES
when_to_transfer_output = ON_EXIT
transfer_input_files = /work/submissions/submit_signal_v1_2018_gridpack/submit.tgz
transfer_output_files = ""
input = /dev/null
output = /work/logs/$(Cluster)_$(Process).out
error = /work/logs/$(Cluster)_$(Process).err
log = /work/logs/$(Cluster)_$(Process).log
rank = Mips
request_memory = 8000
arguments = $(Process)
#on_exit_hold = (ExitBySignal == True) || (ExitCode != 0)
notify_user = ava@cornell.edu
+AccountingGroup = "analysis.ava"
+AcctGroup = "analysis"
+ProjectName = "DarkMatterSimulation"
queue 1
"#;
        assert_eq!(jdl, expected);
    }

    #[test]
    fn executable_and_transfer_paths_point_at_the_generated_files() {
        let (script, submission, workspace) = fixture();
        let jdl = render_jdl("now", &script, &submission, &workspace, 4);
        assert!(jdl.contains(&format!("executable = {}", script.path.display())));
        assert!(jdl.contains(&format!(
            "transfer_input_files = {}",
            submission.archive.display()
        )));
        assert!(jdl.contains("queue 4\n"));
    }

    #[test]
    fn job_descriptions_are_named_after_the_process() {
        let dir = TempDir::new().unwrap();
        let (script, submission, mut workspace) = fixture();
        workspace.log_dir = dir.path().to_path_buf();

        let job = create("signal_v1_2018_gridpack", &script, &submission, &workspace, 2).unwrap();

        assert!(job.path.ends_with("condor_signal_v1_2018_gridpack.jdl"));
        let written = fs::read_to_string(&job.path).unwrap();
        assert!(written.contains("queue 2"));
    }
}
