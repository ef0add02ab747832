//! Per-attempt temporary artifacts.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::WorkerResult;

/// Local input/output files for one processing attempt.
///
/// Each attempt gets its own directory named by owner and attempt
/// stamp, so concurrent workers never share paths. Dropping the
/// workspace removes the directory; this runs on every exit path,
/// success or failure, which bounds local storage use under sustained
/// load.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

impl JobWorkspace {
    /// Create the attempt directory and derive the artifact paths.
    pub fn create(
        work_dir: impl AsRef<Path>,
        username: &str,
        stamp_millis: i64,
        input_name: &str,
        output_name: &str,
    ) -> WorkerResult<Self> {
        let dir = work_dir
            .as_ref()
            .join(format!("{}-{}", sanitize(username), stamp_millis));
        std::fs::create_dir_all(&dir)?;

        let input = dir.join(sanitize(input_name));
        let output = dir.join(sanitize(output_name));

        debug!("Created job workspace {}", dir.display());
        Ok(Self { dir, input, output })
    }

    /// Local path for the downloaded original.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Local path for the compressed output.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove job workspace {}: {}", self.dir.display(), e);
            }
        }
    }
}

/// Strip path separators from untrusted file names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
        .collect()
}
