use std::path::PathBuf;

/// A generator input file (LHE file or packed gridpack) named on the command line
pub struct Payload {
    pub path: PathBuf,
    pub file_name: String,
}

impl Payload {
    /// Returns None when the path has no file name component
    pub fn new(path: PathBuf) -> Option<Payload> {
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Payload { path, file_name })
    }

    /// Process name used to label the working directory and the job description,
    /// the file name up to its first dot
    pub fn process(&self) -> String {
        match self.file_name.split_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => self.file_name.clone(),
        }
    }

    /// Directory the generator writes LHE output under on the worker node,
    /// the first three underscore-delimited tokens of the file name
    pub fn output_dir(&self) -> String {
        let tokens: Vec<&str> = self.file_name.split('_').take(3).collect();
        tokens.join("_")
    }
}
