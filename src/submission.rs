//! Build the per-job submission directory and the files a worker needs

/// Stage the payload and helper script into the submission directory and archive it
pub mod stage;

/// Write the entry script a worker node runs
pub mod exec;
