use std::fs;
use std::io;
use std::path::PathBuf;

use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::campaign::Campaign;
use crate::payload::Payload;
use crate::Workspace;

/// Path of the generated worker-entry script, the "executable" the scheduler runs
pub struct ExecScript {
    pub path: PathBuf,
}

/// Rendering context for the worker-entry script
#[derive(Serialize)]
struct ExecContext {
    helper: String,
    payload: String,
}

/// Render the worker-entry script using TinyTemplate
///
/// The script unpacks the transferred archive, runs the campaign helper against
/// the payload and cleans up after itself, ending with an explicit `exit 0` so
/// late cleanup can't be mistaken for job failure.
pub fn render_exec(payload: &Payload, year: Campaign) -> String {
    /// included worker-entry template
    static EXEC: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/exec.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("exec", EXEC).expect("Template");

    let context = ExecContext {
        helper: year.helper_script(),
        payload: payload.file_name.clone(),
    };
    tt.render("exec", &context).expect("Rendered exec script")
}

/// Write exec.sh to the working directory
pub fn write_exec_script(payload: &Payload, workspace: &Workspace) -> Result<ExecScript, io::Error> {
    let out_path = workspace.work_dir.join("exec.sh");
    info!("Writing worker-entry script to {}", out_path.display());
    fs::write(&out_path, render_exec(payload, workspace.year))?;
    Ok(ExecScript { path: out_path })
}
