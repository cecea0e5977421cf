//! Byte sources feeding the framed block stream.
//!
//! The stream only needs sequential reads plus, when available, random
//! access. Whether a source can seek, and whether it can be reopened from a
//! retained path when it cannot, is a property of the source itself rather
//! than a branch inside the stream.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;

use super::error::{CorsikaError, Result};

/// A positioned byte source for the framed block stream.
///
/// `read` comes from the [`Read`] supertrait and returns `Ok(0)` at end of
/// file. `seek_to` on a non-seekable source fails with
/// [`CorsikaError::NotSeekable`]; such sources may instead support
/// [`reopen`](RawSource::reopen), which restarts the source from byte zero.
pub trait RawSource: Read {
    /// Whether absolute seeks are supported.
    fn is_seekable(&self) -> bool;

    /// Move to an absolute byte offset.
    fn seek_to(&mut self, offset: u64) -> Result<()>;

    /// Current byte offset from the start of the source.
    fn tell(&mut self) -> Result<u64>;

    /// Restart the source from the beginning, if possible.
    ///
    /// Returns `Ok(false)` when no path was retained to reopen from.
    fn reopen(&mut self) -> Result<bool>;
}

/// The default source: a plain file, seekable, reopenable from its path.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    path: PathBuf,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening byte source: {}", path.display());
        Ok(Self {
            file: File::open(path)?,
            path: path.to_path_buf(),
        })
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl RawSource for FileSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn reopen(&mut self) -> Result<bool> {
        self.file = File::open(&self.path)?;
        Ok(true)
    }
}

/// A sequential-only source: pipes, fifos, or anything already streaming.
///
/// Seeks fail, but when the source was opened from a path the stream can
/// still emulate backward movement by reopening and skipping forward.
#[derive(Debug)]
pub struct SequentialSource {
    file: File,
    path: Option<PathBuf>,
    position: u64,
}

impl SequentialSource {
    /// Open with the path retained, enabling the reopen fallback.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            file: File::open(path)?,
            path: Some(path.to_path_buf()),
            position: 0,
        })
    }

    /// Wrap an already-open file without retaining a path. Backward seeks
    /// on the resulting source are impossible.
    pub fn from_file(file: File) -> Self {
        Self { file, path: None, position: 0 }
    }
}

impl Read for SequentialSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl RawSource for SequentialSource {
    fn is_seekable(&self) -> bool {
        false
    }

    fn seek_to(&mut self, _offset: u64) -> Result<()> {
        Err(CorsikaError::NotSeekable)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.position)
    }

    fn reopen(&mut self) -> Result<bool> {
        match &self.path {
            Some(path) => {
                debug!("Reopening sequential source: {}", path.display());
                self.file = File::open(path)?;
                self.position = 0;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::io::Cursor;

    /// In-memory seekable source for unit tests.
    pub struct MemorySource(pub Cursor<Vec<u8>>);

    impl Read for MemorySource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl RawSource for MemorySource {
        fn is_seekable(&self) -> bool {
            true
        }

        fn seek_to(&mut self, offset: u64) -> Result<()> {
            self.0.seek(SeekFrom::Start(offset))?;
            Ok(())
        }

        fn tell(&mut self) -> Result<u64> {
            Ok(self.0.stream_position()?)
        }

        fn reopen(&mut self) -> Result<bool> {
            self.0.set_position(0);
            Ok(true)
        }
    }
}
