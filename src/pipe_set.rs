//! Pipe channels shared by the stages of one pipeline.
//!
//! A pipeline of `n + 1` stages needs `n` channels. Channel `i` carries the
//! output of stage `i` into stage `i + 1`. Every end is an owned handle, so
//! whatever path a pipeline takes out of its run, each descriptor is
//! released exactly once: either by [`PipeSet::close`] or by drop.

use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};

use os_pipe::{PipeReader, PipeWriter};

use crate::error::AllocationError;

/// One unidirectional byte channel between two adjacent stages.
#[derive(Debug)]
pub struct Channel {
    reader: PipeReader,
    writer: PipeWriter,
}

impl Channel {
    pub fn read_end(&self) -> &PipeReader {
        &self.reader
    }

    pub fn write_end(&self) -> &PipeWriter {
        &self.writer
    }
}

/// All channels of one pipeline invocation, indexed `0..len()`.
#[derive(Debug)]
pub struct PipeSet {
    channels: Vec<Channel>,
}

impl PipeSet {
    /// Create `count` OS pipes.
    pub fn allocate(count: usize) -> Result<PipeSet, AllocationError> {
        Self::allocate_with(count, |_| os_pipe::pipe())
    }

    /// Create `count` channels using `make` for each one.
    ///
    /// If `make` fails for channel `k`, channels `0..k` are closed before the
    /// error is returned; a partially built set never escapes.
    pub fn allocate_with<F>(count: usize, mut make: F) -> Result<PipeSet, AllocationError>
    where
        F: FnMut(usize) -> io::Result<(PipeReader, PipeWriter)>,
    {
        let mut channels = Vec::with_capacity(count);
        for channel in 0..count {
            match make(channel) {
                Ok((reader, writer)) => channels.push(Channel { reader, writer }),
                Err(source) => {
                    tracing::debug!(
                        channel,
                        created = channels.len(),
                        "pipe allocation failed, rolling back"
                    );
                    drop(channels);
                    return Err(AllocationError { channel, source });
                }
            }
        }
        Ok(PipeSet { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Every descriptor number held by the set, read end before write end.
    pub fn raw_fds(&self) -> Vec<RawFd> {
        self.channels
            .iter()
            .flat_map(|c| [c.reader.as_raw_fd(), c.writer.as_raw_fd()])
            .collect()
    }

    /// Close every descriptor now, reporting the first failure.
    ///
    /// All descriptors are closed even when an earlier one fails.
    pub fn close(self) -> io::Result<()> {
        let mut first_error = None;
        let fds = self
            .channels
            .into_iter()
            .flat_map(|c| [c.reader.into_raw_fd(), c.writer.into_raw_fd()]);
        for fd in fds {
            // SAFETY: `fd` came out of an owned pipe end via `into_raw_fd`, so
            // nothing else will close it.
            if unsafe { libc::close(fd) } == -1 {
                let err = io::Error::last_os_error();
                tracing::warn!(fd, error = %err, "failed to close pipe descriptor");
                first_error = first_error.or(Some(err));
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
