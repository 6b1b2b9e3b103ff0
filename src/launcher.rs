use std::io;
use std::process::Child;

use crate::error::LaunchError;
use crate::invoker;
use crate::pipe_set::PipeSet;
use crate::streams::{InputStream, IoStreams, OutputStream};
use crate::tokens::TokenSequence;

/// Which channels a stage is wired to. `None` means the pipeline's outer
/// endpoint (the shell's own stdin for the first stage, stdout for the last).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEnds {
    /// Channel whose read end becomes the stage's stdin.
    pub input: Option<usize>,
    /// Channel whose write end becomes the stage's stdout.
    pub output: Option<usize>,
}

impl StageEnds {
    pub fn for_stage(index: usize, total: usize) -> Self {
        Self {
            input: index.checked_sub(1),
            output: (index + 1 < total).then_some(index),
        }
    }
}

/// Start stage `index` of `total`.
///
/// The child gets its own copies of its assigned pipe ends as stdin/stdout
/// (unless its own redirections say otherwise), and every descriptor of
/// `pipes` is closed in the child before the command starts, so the only
/// pipe descriptors it keeps are the two on its standard streams.
pub fn launch(
    tokens: &TokenSequence,
    pipes: &PipeSet,
    index: usize,
    total: usize,
    outer: &IoStreams,
) -> Result<Child, LaunchError> {
    let ends = StageEnds::for_stage(index, total);

    let stdin = match ends.input {
        Some(channel) => pipes
            .channel(channel)
            .ok_or_else(|| missing_channel(channel))
            .and_then(|c| c.read_end().try_clone())
            .map(InputStream::Pipe),
        None => outer.stdin.try_clone(),
    }
    .map_err(|source| wiring_error("stdin", source))?;

    let stdout = match ends.output {
        Some(channel) => pipes
            .channel(channel)
            .ok_or_else(|| missing_channel(channel))
            .and_then(|c| c.write_end().try_clone())
            .map(OutputStream::Pipe),
        None => outer.stdout.try_clone(),
    }
    .map_err(|source| wiring_error("stdout", source))?;

    let stderr = outer.stderr.try_clone().map_err(|source| wiring_error("stderr", source))?;

    let invocation = invoker::prepare(tokens.as_slice(), IoStreams { stdin, stdout, stderr })?;
    let program = invocation.program().to_string();
    let child = invoker::spawn(invocation, &pipes.raw_fds())?;

    tracing::debug!(stage = index, pid = child.id(), %program, ?ends, "stage launched");
    Ok(child)
}

fn missing_channel(channel: usize) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("no pipe {channel} in this pipeline"))
}

fn wiring_error(stream: &str, source: io::Error) -> LaunchError {
    LaunchError::Redirection {
        target: stream.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn seq(words: &[&str]) -> TokenSequence {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn ends_for_each_position() {
        assert_eq!(StageEnds::for_stage(0, 3), StageEnds { input: None, output: Some(0) });
        assert_eq!(StageEnds::for_stage(1, 3), StageEnds { input: Some(0), output: Some(1) });
        assert_eq!(StageEnds::for_stage(2, 3), StageEnds { input: Some(1), output: None });
        assert_eq!(StageEnds::for_stage(0, 1), StageEnds { input: None, output: None });
    }

    #[test]
    fn two_stages_share_one_channel() {
        let pipes = PipeSet::allocate(1).unwrap();
        let (mut reader, writer) = os_pipe::pipe().unwrap();
        let outer = IoStreams {
            stdin: InputStream::Null,
            stdout: OutputStream::Pipe(writer),
            stderr: OutputStream::Inherit,
        };

        let mut first = launch(&seq(&["printf", "a\\nb\\n"]), &pipes, 0, 2, &outer).unwrap();
        let mut second = launch(&seq(&["cat"]), &pipes, 1, 2, &outer).unwrap();
        drop(outer);
        pipes.close().unwrap();

        assert!(first.wait().unwrap().success());
        assert!(second.wait().unwrap().success());

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn unknown_command_is_reported_not_spawned() {
        let pipes = PipeSet::allocate(1).unwrap();
        let outer = IoStreams::inherit();
        let err = launch(&seq(&["swish-no-such-command-xyz"]), &pipes, 1, 2, &outer).unwrap_err();
        assert_eq!(err.exit_code(), 127);
    }
}
