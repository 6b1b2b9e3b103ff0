use std::fs::File;
use std::io;
use std::process::Stdio;

use os_pipe::{PipeReader, PipeWriter};

/// Where a stage reads its standard input from.
#[derive(Debug)]
pub enum InputStream {
    Inherit,
    Null,
    Pipe(PipeReader),
    File(File),
}

impl InputStream {
    pub fn try_clone(&self) -> io::Result<InputStream> {
        Ok(match self {
            InputStream::Inherit => InputStream::Inherit,
            InputStream::Null => InputStream::Null,
            InputStream::Pipe(r) => InputStream::Pipe(r.try_clone()?),
            InputStream::File(f) => InputStream::File(f.try_clone()?),
        })
    }

    pub fn into_stdio(self) -> Stdio {
        match self {
            InputStream::Inherit => Stdio::inherit(),
            InputStream::Null => Stdio::null(),
            InputStream::Pipe(r) => Stdio::from(r),
            InputStream::File(f) => Stdio::from(f),
        }
    }
}

/// Where a stage writes its standard output or error to.
#[derive(Debug)]
pub enum OutputStream {
    Inherit,
    Null,
    Pipe(PipeWriter),
    File(File),
}

impl OutputStream {
    pub fn try_clone(&self) -> io::Result<OutputStream> {
        Ok(match self {
            OutputStream::Inherit => OutputStream::Inherit,
            OutputStream::Null => OutputStream::Null,
            OutputStream::Pipe(w) => OutputStream::Pipe(w.try_clone()?),
            OutputStream::File(f) => OutputStream::File(f.try_clone()?),
        })
    }

    pub fn into_stdio(self) -> Stdio {
        match self {
            OutputStream::Inherit => Stdio::inherit(),
            OutputStream::Null => Stdio::null(),
            OutputStream::Pipe(w) => Stdio::from(w),
            OutputStream::File(f) => Stdio::from(f),
        }
    }
}

/// The three standard streams of a stage, or the outer endpoints of a whole
/// pipeline: the first stage's stdin, the last stage's stdout, and the stderr
/// every stage shares.
#[derive(Debug)]
pub struct IoStreams {
    pub stdin: InputStream,
    pub stdout: OutputStream,
    pub stderr: OutputStream,
}

impl IoStreams {
    pub fn inherit() -> Self {
        Self {
            stdin: InputStream::Inherit,
            stdout: OutputStream::Inherit,
            stderr: OutputStream::Inherit,
        }
    }
}

impl Default for IoStreams {
    fn default() -> Self {
        Self::inherit()
    }
}
