use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open file {0}")]
    OpenFile(PathBuf),

    #[error("failed to create parent directory {0}")]
    ParentDir(PathBuf),

    #[error("failed to write file {0}")]
    WriteFile(PathBuf),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
