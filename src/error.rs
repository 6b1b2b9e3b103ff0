use std::io;

use thiserror::Error;

use crate::tokens::RangeError;

/// Creating the pipe set failed at `channel`; every earlier channel was closed.
#[derive(Debug, Error)]
#[error("pipe {channel}: {source}")]
pub struct AllocationError {
    pub channel: usize,
    #[source]
    pub source: io::Error,
}

/// Why a single stage did not start.
///
/// Everything except [`LaunchError::Duplication`] is local to the stage:
/// the pipeline records the stage's exit code and keeps going.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{0}")]
    Syntax(String),

    #[error("syntax error: missing command")]
    EmptyCommand,

    #[error("{target}: {source}")]
    Redirection {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("command not found: {program}")]
    NotFound { program: String },

    #[error("{program}: {source}")]
    Invocation {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program}: closing inherited pipe: {source}")]
    Close {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("fork: {0}")]
    Duplication(#[source] io::Error),
}

impl LaunchError {
    /// Shell-style status reported for a stage that never ran.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::NotFound { .. } => 127,
            LaunchError::Invocation { .. } => 126,
            LaunchError::Syntax(_) | LaunchError::EmptyCommand => 2,
            LaunchError::Redirection { .. }
            | LaunchError::Close { .. }
            | LaunchError::Duplication(_) => 1,
        }
    }
}

/// Failure of a pipeline as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("syntax error near unexpected token `|'")]
    Syntax,

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("stage {stage}: fork: {source}")]
    Duplication {
        stage: usize,
        #[source]
        source: io::Error,
    },

    #[error("closing pipes: {0}")]
    Close(#[source] io::Error),

    #[error("stage {stage}: wait: {source}")]
    Reap {
        stage: usize,
        #[source]
        source: io::Error,
    },

    #[error("stage {stage} exited with status {code}")]
    StageFailed { stage: usize, code: i32 },
}

impl PipelineError {
    /// Status the shell reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Syntax => 2,
            PipelineError::StageFailed { code, .. } => *code,
            _ => 1,
        }
    }

    /// Whether the failure was already visible on stderr through a stage.
    ///
    /// A failing stage prints its own diagnostics, so the shell stays quiet
    /// about it.
    pub fn is_stage_status(&self) -> bool {
        matches!(self, PipelineError::StageFailed { .. })
    }
}
