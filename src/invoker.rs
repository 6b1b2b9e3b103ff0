//! Turns one command's words into a ready-to-spawn process description.
//!
//! Redirection words are resolved here, on top of whatever streams the
//! caller assigned, so `cmd > out.txt` inside a pipeline writes to the file
//! and not to the next stage.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command};

use crate::error::LaunchError;
use crate::redirect::{self, RedirectTarget, Redirection};
use crate::streams::{InputStream, IoStreams, OutputStream};
use crate::tokens::Token;

/// A single external command with its streams fully decided.
#[derive(Debug)]
pub struct Invocation {
    program: String,
    command: Command,
}

impl Invocation {
    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Build an [`Invocation`] from `words`, starting from the streams in `io`.
pub fn prepare(words: &[Token], mut io: IoStreams) -> Result<Invocation, LaunchError> {
    let (args, redirections) =
        redirect::extract_redirections(words).map_err(LaunchError::Syntax)?;
    for redirection in &redirections {
        apply(&mut io, redirection)?;
    }

    let (program, rest) = args.split_first().ok_or(LaunchError::EmptyCommand)?;
    let mut command = Command::new(program);
    command
        .args(rest)
        .stdin(io.stdin.into_stdio())
        .stdout(io.stdout.into_stdio())
        .stderr(io.stderr.into_stdio());

    Ok(Invocation {
        program: program.clone(),
        command,
    })
}

/// Start the command. Every descriptor in `close` is closed in the child
/// after its standard streams are wired and before the program image loads.
pub fn spawn(mut invocation: Invocation, close: &[RawFd]) -> Result<Child, LaunchError> {
    // 0..=2 are the child's own streams by the time the hook runs.
    let close: Vec<RawFd> = close
        .iter()
        .copied()
        .filter(|fd| *fd > libc::STDERR_FILENO)
        .collect();
    if !close.is_empty() {
        // SAFETY: the hook only calls close(2), which is async-signal-safe,
        // and reads a vector allocated before the fork.
        unsafe {
            invocation.command.pre_exec(move || {
                for &fd in &close {
                    if libc::close(fd) == -1 {
                        return Err(io::Error::last_os_error());
                    }
                }
                Ok(())
            });
        }
    }

    invocation
        .command
        .spawn()
        .map_err(|source| classify(invocation.program, source))
}

/// Only a failed fork stops the pipeline; anything else concerns this one
/// command.
fn classify(program: String, source: io::Error) -> LaunchError {
    if source.kind() == io::ErrorKind::NotFound {
        return LaunchError::NotFound { program };
    }
    match source.raw_os_error() {
        Some(libc::EAGAIN | libc::ENOMEM) => LaunchError::Duplication(source),
        // Only the close hook can produce these.
        Some(libc::EBADF | libc::EIO) => LaunchError::Close { program, source },
        _ => LaunchError::Invocation { program, source },
    }
}

fn apply(io: &mut IoStreams, redirection: &Redirection) -> Result<(), LaunchError> {
    let output = match &redirection.target {
        RedirectTarget::FileRead(path) => {
            let file = File::open(path).map_err(|source| redirect_error(path, source))?;
            io.stdin = InputStream::File(file);
            return Ok(());
        }
        RedirectTarget::File(path) => {
            let file = File::create(path).map_err(|source| redirect_error(path, source))?;
            OutputStream::File(file)
        }
        RedirectTarget::FileAppend(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| redirect_error(path, source))?;
            OutputStream::File(file)
        }
        RedirectTarget::Fd(source_fd) => {
            let current = match source_fd {
                1 => &io.stdout,
                2 => &io.stderr,
                other => {
                    let message = format!("syntax error: bad file descriptor {other}");
                    return Err(LaunchError::Syntax(message));
                }
            };
            duplicate(current, *source_fd)
                .map_err(|source| redirect_error(&format!("&{source_fd}"), source))?
        }
    };

    match redirection.fd {
        1 => io.stdout = output,
        2 => io.stderr = output,
        other => {
            let message = format!("syntax error: cannot redirect fd {other}");
            return Err(LaunchError::Syntax(message));
        }
    }
    Ok(())
}

/// Clone `stream`, resolving `Inherit` to this process's own stream `fd` so
/// the copy stays attached to it when moved onto another fd.
fn duplicate(stream: &OutputStream, fd: i32) -> io::Result<OutputStream> {
    match stream {
        OutputStream::Inherit => {
            let owned = match fd {
                1 => io::stdout().as_fd().try_clone_to_owned()?,
                _ => io::stderr().as_fd().try_clone_to_owned()?,
            };
            Ok(OutputStream::File(File::from(owned)))
        }
        other => other.try_clone(),
    }
}

fn redirect_error(target: &str, source: io::Error) -> LaunchError {
    LaunchError::Redirection {
        target: target.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn words(list: &[&str]) -> Vec<Token> {
        list.iter().map(|w| Token::word(*w)).collect()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("swish_invoker_{}_{name}", std::process::id()))
    }

    fn captured() -> (os_pipe::PipeReader, IoStreams) {
        let (reader, writer) = os_pipe::pipe().unwrap();
        let io = IoStreams {
            stdin: InputStream::Null,
            stdout: OutputStream::Pipe(writer),
            stderr: OutputStream::Null,
        };
        (reader, io)
    }

    #[test]
    fn runs_program_with_arguments() {
        let (mut reader, io) = captured();
        let invocation = prepare(&words(&["echo", "one", "two"]), io).unwrap();
        assert_eq!(invocation.program(), "echo");

        let mut child = spawn(invocation, &[]).unwrap();
        assert!(child.wait().unwrap().success());

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "one two\n");
    }

    #[test]
    fn file_redirect_wins_over_assigned_stdout() {
        let path = temp_path("wins");
        let (mut reader, io) = captured();
        let line = words(&["echo", "to-file", ">", path.to_str().unwrap()]);

        let mut child = spawn(prepare(&line, io).unwrap(), &[]).unwrap();
        assert!(child.wait().unwrap().success());

        let mut piped = String::new();
        reader.read_to_string(&mut piped).unwrap();
        assert_eq!(piped, "");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "to-file\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stderr_follows_stdout_into_pipe() {
        let (mut reader, io) = captured();
        let line = words(&["sh", "-c", "echo oops 1>&2", "2>&1"]);

        let mut child = spawn(prepare(&line, io).unwrap(), &[]).unwrap();
        assert!(child.wait().unwrap().success());

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "oops\n");
    }

    #[test]
    fn missing_input_file_is_redirection_error() {
        let (_reader, io) = captured();
        let path = temp_path("does_not_exist");
        let line = words(&["cat", "<", path.to_str().unwrap()]);

        let err = prepare(&line, io).unwrap_err();
        assert!(matches!(err, LaunchError::Redirection { .. }), "{err:?}");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn unknown_program_is_not_found() {
        let (_reader, io) = captured();
        let invocation = prepare(&words(&["swish-no-such-command-xyz"]), io).unwrap();
        let err = spawn(invocation, &[]).unwrap_err();
        assert!(matches!(err, LaunchError::NotFound { .. }), "{err:?}");
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn redirection_only_is_empty_command() {
        let (_reader, io) = captured();
        let path = temp_path("empty");
        let err = prepare(&words(&[">", path.to_str().unwrap()]), io).unwrap_err();
        assert!(matches!(err, LaunchError::EmptyCommand));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn listed_descriptors_are_closed_in_child() {
        let (_reader, io) = captured();
        let (mut keep_reader, extra_writer) = os_pipe::pipe().unwrap();
        let extra = std::os::fd::AsRawFd::as_raw_fd(&extra_writer);
        // The child writes to `extra` only if it is still open after the hook.
        let script = format!("echo leaked >&{extra} 2>/dev/null; exit 0");
        let line = words(&["sh", "-c", &script]);

        let mut invocation = prepare(&line, io).unwrap();
        // Make the descriptor inheritable in the child only, ahead of the
        // close hook, so only the hook can close it.
        unsafe {
            invocation.command.pre_exec(move || {
                let flags = libc::fcntl(extra, libc::F_GETFD);
                if flags == -1
                    || libc::fcntl(extra, libc::F_SETFD, flags & !libc::FD_CLOEXEC) == -1
                {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
        let mut child = spawn(invocation, &[extra]).unwrap();
        assert!(child.wait().unwrap().success());
        drop(extra_writer);

        let mut out = String::new();
        keep_reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn nul_byte_in_argument_is_local_to_the_command() {
        let (_reader, io) = captured();
        let invocation = prepare(&words(&["cat", "a\0b"]), io).unwrap();
        let err = spawn(invocation, &[]).unwrap_err();
        assert!(matches!(err, LaunchError::Invocation { .. }), "{err:?}");
        assert_eq!(err.exit_code(), 126);
    }

    #[test]
    fn only_fork_errors_are_duplication_failures() {
        let program = || "prog".to_string();
        for errno in [libc::EAGAIN, libc::ENOMEM] {
            let err = classify(program(), io::Error::from_raw_os_error(errno));
            assert!(matches!(err, LaunchError::Duplication(_)), "{err:?}");
        }
        for errno in [libc::ETXTBSY, libc::EACCES, libc::ENOEXEC, libc::E2BIG] {
            let err = classify(program(), io::Error::from_raw_os_error(errno));
            assert!(matches!(err, LaunchError::Invocation { .. }), "{err:?}");
        }
        let err = classify(program(), io::Error::from_raw_os_error(libc::ENOENT));
        assert!(matches!(err, LaunchError::NotFound { .. }), "{err:?}");
        let err = classify(program(), io::Error::from_raw_os_error(libc::EBADF));
        assert!(matches!(err, LaunchError::Close { .. }), "{err:?}");
    }
}
