use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Where a choice trace is written.
#[derive(Debug)]
pub enum TraceSink {
    /// Standalone mode: the tracker owns the writer for its whole lifetime.
    Owned(OwnedSink),
    /// Report-extension mode: the publisher lends its writer for each
    /// violation section. Nothing is held between callbacks.
    Report,
}

/// What an owned sink writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    File(PathBuf),
    /// Standard output, also the fallback when the trace file can't be
    /// created.
    Stdout,
    /// A caller-supplied writer.
    Writer,
}

/// A writer exclusively owned by one tracker. Buffered; flushed after every
/// complete trace and on drop.
pub struct OwnedSink {
    target: SinkTarget,
    writer: Box<dyn Write + Send>,
}

impl OwnedSink {
    /// Create the trace file at `path`. If that fails the trace goes to
    /// standard output and the failure is reported on standard error.
    pub fn open(path: &Path) -> Self {
        match File::create(path) {
            Ok(file) => {
                debug!(path = %path.display(), "choice trace file opened");
                Self {
                    target: SinkTarget::File(path.to_path_buf()),
                    writer: Box::new(BufWriter::new(file)),
                }
            }
            Err(err) => {
                eprintln!("cannot write choice trace to file: {}", path.display());
                warn!(path = %path.display(), error = %err, "choice trace falls back to stdout");
                Self::stdout()
            }
        }
    }

    pub fn stdout() -> Self {
        Self {
            target: SinkTarget::Stdout,
            writer: Box::new(BufWriter::new(io::stdout())),
        }
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            target: SinkTarget::Writer,
            writer: Box::new(writer),
        }
    }

    pub fn target(&self) -> &SinkTarget {
        &self.target
    }
}

impl Write for OwnedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl fmt::Debug for OwnedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedSink")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
