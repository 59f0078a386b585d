//! Generate the scheduler job description and hand it to condor_submit

/// Render the job description and submit it
pub mod job;
