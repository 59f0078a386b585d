//! Run external commands and check their exit status

use std::io;
use std::process::{Command, ExitStatus, Output};

use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{program} could not be started: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Run a command to completion and capture its output
///
/// A non-zero exit status is an error carrying the captured stderr.
pub fn run(cmd: &mut Command) -> Result<Output, CommandError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    info!("{:?}", &cmd);

    let output = cmd.output().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(output)
}
