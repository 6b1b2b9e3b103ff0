//! Runs `a | b | c` as concurrently scheduled child processes.
//!
//! One run walks `Idle → Allocating → Spawning(0..=n) → Draining → Reaping →
//! Done`. Once any child exists the run always reaches `Reaping`, whatever
//! failed on the way, so no stage is left unreaped.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::process::Child;

use os_pipe::PipeWriter;

use crate::error::{AllocationError, LaunchError, PipelineError};
use crate::launcher;
use crate::pipe_set::PipeSet;
use crate::status;
use crate::streams::{IoStreams, OutputStream};
use crate::tokens::{PIPE, TokenSequence};

#[derive(Clone, Copy)]
enum Phase {
    Idle,
    Allocating,
    Spawning(usize),
    Draining,
    Reaping,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Allocating => f.write_str("allocating"),
            Phase::Spawning(stage) => write!(f, "spawning stage {stage}"),
            Phase::Draining => f.write_str("draining"),
            Phase::Reaping => f.write_str("reaping"),
            Phase::Done => f.write_str("done"),
        }
    }
}

/// What became of one stage.
#[derive(Debug)]
pub enum StageOutcome {
    /// The child ran and was reaped with this shell-style exit code.
    Exited { code: i32 },
    /// No process was started: bad redirection, unknown command, etc.
    NotStarted { code: i32 },
    /// The child was started but its status could not be collected.
    Lost,
}

impl StageOutcome {
    fn code(&self) -> i32 {
        match self {
            StageOutcome::Exited { code } | StageOutcome::NotStarted { code } => *code,
            StageOutcome::Lost => 1,
        }
    }
}

/// Per-stage results of one pipeline run, in stage order.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
    close_error: Option<io::Error>,
    reap_error: Option<(usize, io::Error)>,
}

impl PipelineReport {
    /// Number of stages that got a process.
    pub fn spawned(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, StageOutcome::Exited { .. } | StageOutcome::Lost))
            .count()
    }

    /// Number of processes whose exit status was collected.
    pub fn reaped(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, StageOutcome::Exited { .. }))
            .count()
    }

    /// Collapse the report to the single outcome the shell sees.
    ///
    /// A failing pipeline reports the rightmost failing stage.
    pub fn into_result(self) -> Result<(), PipelineError> {
        if let Some((stage, source)) = self.reap_error {
            return Err(PipelineError::Reap { stage, source });
        }
        if let Some(source) = self.close_error {
            return Err(PipelineError::Close(source));
        }
        match self.stages.iter().enumerate().rev().find(|(_, s)| s.code() != 0) {
            Some((stage, outcome)) => Err(PipelineError::StageFailed {
                stage,
                code: outcome.code(),
            }),
            None => Ok(()),
        }
    }
}

/// Run a pipeline on the shell's own standard streams.
pub fn run(tokens: &TokenSequence) -> Result<(), PipelineError> {
    run_with(tokens, IoStreams::inherit())
}

/// Run a pipeline whose first stage reads `io.stdin`, whose last stage
/// writes `io.stdout`, and whose stages all share `io.stderr`.
pub fn run_with(tokens: &TokenSequence, io: IoStreams) -> Result<(), PipelineError> {
    execute(tokens, io, PipeSet::allocate)?.into_result()
}

fn execute<A>(
    tokens: &TokenSequence,
    io: IoStreams,
    allocate: A,
) -> Result<PipelineReport, PipelineError>
where
    A: FnOnce(usize) -> Result<PipeSet, AllocationError>,
{
    execute_with(tokens, io, allocate, launcher::launch)
}

fn execute_with<A, L>(
    tokens: &TokenSequence,
    io: IoStreams,
    allocate: A,
    mut launch: L,
) -> Result<PipelineReport, PipelineError>
where
    A: FnOnce(usize) -> Result<PipeSet, AllocationError>,
    L: FnMut(&TokenSequence, &PipeSet, usize, usize, &IoStreams) -> Result<Child, LaunchError>,
{
    let mut phase = Phase::Idle;
    let channels = tokens.count_occurrences(PIPE);
    let total = channels + 1;

    for index in 0..total {
        if tokens.stage_range(index, PIPE)?.is_empty() {
            return Err(PipelineError::Syntax);
        }
    }

    advance(&mut phase, Phase::Allocating);
    let pipes = allocate(channels)?;

    let mut running: Vec<Result<Child, StageOutcome>> = Vec::with_capacity(total);
    let mut aborted = None;
    for index in 0..total {
        advance(&mut phase, Phase::Spawning(index));
        let stage = match tokens.stage(index, PIPE) {
            Ok(stage) => stage,
            Err(err) => {
                aborted = Some(PipelineError::from(err));
                break;
            }
        };

        match launch(&stage, &pipes, index, total, &io) {
            Ok(child) => running.push(Ok(child)),
            Err(LaunchError::Duplication(source)) => {
                aborted = Some(PipelineError::Duplication { stage: index, source });
                break;
            }
            Err(err) => {
                // The stage never ran; its neighbours see EOF or a broken pipe.
                report_stage_error(&io.stderr, &err);
                running.push(Err(StageOutcome::NotStarted { code: err.exit_code() }));
            }
        }
    }

    // Every started child holds its own copies by now.
    advance(&mut phase, Phase::Draining);
    drop(io);
    let close_error = pipes.close().err();

    advance(&mut phase, Phase::Reaping);
    let mut report = PipelineReport {
        close_error,
        ..PipelineReport::default()
    };
    for (index, stage) in running.into_iter().enumerate() {
        let outcome = match stage {
            Ok(mut child) => {
                let pid = child.id();
                match child.wait() {
                    Ok(exit) => {
                        let code = status::exit_code(exit);
                        tracing::debug!(stage = index, pid, code, "stage reaped");
                        StageOutcome::Exited { code }
                    }
                    Err(err) => {
                        tracing::warn!(stage = index, pid, error = %err, "failed to reap stage");
                        if report.reap_error.is_none() {
                            report.reap_error = Some((index, err));
                        }
                        StageOutcome::Lost
                    }
                }
            }
            Err(outcome) => outcome,
        };
        report.stages.push(outcome);
    }
    advance(&mut phase, Phase::Done);

    match aborted {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

fn advance(phase: &mut Phase, next: Phase) {
    tracing::debug!(from = %*phase, to = %next, "pipeline phase");
    *phase = next;
}

/// Print a stage's launch failure where that stage's stderr would have gone.
fn report_stage_error(stderr: &OutputStream, err: &LaunchError) {
    let message = format!("swish: {err}\n");
    let result = match stderr {
        OutputStream::Inherit => io::stderr().write_all(message.as_bytes()),
        OutputStream::Null => Ok(()),
        OutputStream::Pipe(writer) => {
            let mut writer: &PipeWriter = writer;
            writer.write_all(message.as_bytes())
        }
        OutputStream::File(file) => {
            let mut file: &File = file;
            file.write_all(message.as_bytes())
        }
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "could not report stage failure");
    }
}
