use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;
use serde::Serialize;
use thiserror::Error;
use tinytemplate::TinyTemplate;

use crate::external::{self, CommandError};
use crate::payload::Payload;
use crate::Workspace;

/// Remote storage path the worker uploads generated LHE files to
static REMOTE_STORE: &str = "/store/group/lpcmetx/iDM/LHE/2018/signal";

/// Path of the archived submission directory, the sole file transferred to a worker
#[derive(Debug)]
pub struct StagedSubmission {
    pub archive: PathBuf,
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("{} probably doesn't exist!\n{listings}", .payload.display())]
    MissingPayload {
        payload: PathBuf,
        listings: String,
        source: io::Error,
    },
    #[error("helper script {} can't be copied: {source}", .script.display())]
    MissingHelper {
        script: PathBuf,
        source: io::Error,
    },
    #[error("can't write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    Archive(#[from] CommandError),
    #[error("archive {} is empty", .archive.display())]
    EmptyArchive {
        archive: PathBuf,
    },
}

/// Stage the payload and helper script into the submission directory and archive it
///
/// Builds `<work_dir>/submit` with the payload under `gridpacks/` and the campaign
/// helper next to it, appends the stage-out loop to the copied helper, then packs
/// the tree into `submit.tgz`. The unpacked tree is left on disk next to the
/// archive for operator inspection.
pub fn stage(payload: &Payload, workspace: &Workspace) -> Result<StagedSubmission, StageError> {
    let submit_dir = workspace.work_dir.join("submit");
    let gridpack_dir = submit_dir.join("gridpacks");
    info!("Staging {} into {}", payload.path.display(), submit_dir.display());
    fs::create_dir_all(&gridpack_dir).map_err(|source| StageError::Write {
        path: gridpack_dir.clone(),
        source,
    })?;

    fs::copy(&payload.path, gridpack_dir.join(&payload.file_name)).map_err(|source| {
        StageError::MissingPayload {
            payload: payload.path.clone(),
            listings: missing_payload_listings(workspace),
            source,
        }
    })?;

    let helper = workspace.year.helper_script();
    let helper_src = workspace.base_dir.join(&helper);
    let helper_copy = submit_dir.join(&helper);
    fs::copy(&helper_src, &helper_copy).map_err(|source| StageError::MissingHelper {
        script: helper_src,
        source,
    })?;

    append_stage_out(&helper_copy, &payload.output_dir()).map_err(|source| StageError::Write {
        path: helper_copy,
        source,
    })?;

    let archive = archive_submission(workspace)?;
    Ok(StagedSubmission { archive })
}

/// Rendering context for the stage-out snippet
#[derive(Serialize)]
struct StageOutContext {
    remote_dir: String,
    output_dir: String,
}

/// Render the stage-out loop using TinyTemplate
///
/// The loop runs on the worker after event generation and uploads every LHE
/// file under the payload's output directory to the remote store.
pub fn render_stage_out(output_dir: &str) -> String {
    /// included stage-out template
    static STAGE_OUT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/stage_out.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("stage_out", STAGE_OUT).expect("Template");

    let context = StageOutContext {
        remote_dir: REMOTE_STORE.to_string(),
        output_dir: output_dir.to_string(),
    };
    tt.render("stage_out", &context).expect("Rendered stage out")
}

/// Append the stage-out loop to the copied helper so the worker uploads its output
fn append_stage_out(helper: &Path, output_dir: &str) -> Result<(), io::Error> {
    let mut file = OpenOptions::new().create(true).append(true).open(helper)?;
    file.write_all(render_stage_out(output_dir).as_bytes())
}

/// Pack the submission directory into submit.tgz
fn archive_submission(workspace: &Workspace) -> Result<PathBuf, StageError> {
    info!("Tarring up submit...");
    let mut tar = Command::new("tar");
    tar.args(["-chzf", "submit.tgz", "submit"]).current_dir(&workspace.work_dir);
    external::run(&mut tar)?;

    let archive = workspace.work_dir.join("submit.tgz");
    let metadata = fs::metadata(&archive).map_err(|source| StageError::Write {
        path: archive.clone(),
        source,
    })?;
    if metadata.len() == 0 {
        return Err(StageError::EmptyArchive { archive });
    }

    Ok(archive)
}

/// Listings of the invocation directory and its gridpacks subdirectory,
/// the places payloads usually live
fn missing_payload_listings(workspace: &Workspace) -> String {
    let mut listings = list_directory(&workspace.base_dir);
    listings.push_str(&list_directory(&workspace.base_dir.join("gridpacks")));
    listings
}

/// Directory listing included in the missing payload diagnostic
fn list_directory(dir: &Path) -> String {
    let mut listing = format!("{}:\n", dir.display());
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                listing.push_str(&format!("  {}\n", entry.file_name().to_string_lossy()));
            }
        }
        Err(_) => listing.push_str("  (unreadable)\n"),
    }
    listing
}
