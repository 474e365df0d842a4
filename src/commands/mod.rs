pub mod classify;
pub mod watch;

use crate::error::SorterError;
use std::process::ExitCode;

/// How a command finished, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
    InvalidArguments,
    BelowConfidence,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
            RunStatus::InvalidArguments => 2,
            RunStatus::BelowConfidence => 3,
        }
    }

    pub fn from_error(err: &SorterError) -> Self {
        match err {
            SorterError::InvalidArgument(_) => RunStatus::InvalidArguments,
            _ => RunStatus::Failed,
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status.code())
    }
}
