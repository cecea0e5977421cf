//! The framed block stream.
//!
//! On disk the file is a sequence of fixed-size sectors, each bracketed by
//! a pair of Fortran record markers that must agree byte for byte. A sector
//! carries one or more logical sub-blocks depending on the thinning mode.
//! This layer groups sectors back into a flat stream of logical blocks and
//! supports random access by logical block index, including a degraded
//! reopen-and-skip path for sources that cannot seek.

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use super::block::{Block, BlockKind};
use super::error::{CorsikaError, Result};
use super::shape::Shape;
use super::source::{FileSource, RawSource};

/// Block-wise reader over a CORSIKA particle file.
///
/// The stream owns its byte source exclusively; particle iterators borrow
/// it for the duration of one event traversal.
pub struct RawStream {
    source: Box<dyn RawSource>,
    shape: Shape,
    current_sector: u64,
    next_in_sector: usize,
    buffer: Vec<u8>,
    buffer_valid: bool,
}

impl RawStream {
    /// Open a file, detect its shape, and pre-read the first sector.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_source(Box::new(FileSource::open(path)?))
    }

    /// Build a stream over an arbitrary source.
    ///
    /// The first eight bytes decide the shape and double as the pre-filled
    /// prefix of the first sector buffer, so nothing is read twice.
    pub fn from_source(mut source: Box<dyn RawSource>) -> Result<Self> {
        let mut first = [0u8; 8];
        read_full(source.as_mut(), &mut first)?;
        let shape = Shape::detect(first)?;
        debug!(
            "Shower file shape: {:?} {:?}, sector length {} bytes",
            shape.thinning,
            shape.word_size,
            shape.sector_len()
        );

        let mut stream = Self {
            source,
            shape,
            current_sector: 0,
            next_in_sector: 0,
            buffer: vec![0u8; shape.sector_len()],
            buffer_valid: false,
        };
        stream.buffer[..8].copy_from_slice(&first);
        let got = fill(stream.source.as_mut(), &mut stream.buffer[8..])?;
        if got < stream.buffer.len() - 8 {
            return Err(CorsikaError::Truncated {
                expected: stream.buffer.len(),
                got: got + 8,
            });
        }
        stream.check_padding()?;
        stream.buffer_valid = true;
        Ok(stream)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Logical index of the block the next `next_block` call returns.
    pub fn position(&self) -> u64 {
        self.current_sector * self.shape.sub_blocks_per_sector() as u64
            + self.next_in_sector as u64
    }

    /// Read one logical block and advance. `None` at end of file.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if !self.buffer_valid && !self.read_sector()? {
            return Ok(None);
        }

        let pad = self.shape.word_size.padding_bytes();
        let len = self.shape.bytes_per_sub_block();
        let offset = pad + self.next_in_sector * len;
        let block = Block::new(
            self.buffer[offset..offset + len].to_vec(),
            self.shape.thinning,
        );

        self.next_in_sector += 1;
        if self.next_in_sector >= self.shape.sub_blocks_per_sector() {
            self.current_sector += 1;
            self.next_in_sector = 0;
            self.buffer_valid = false;
        }
        Ok(Some(block))
    }

    /// Seek so that the next block read is `block_index`.
    ///
    /// On a seekable source this is a direct sector seek. On a sequential
    /// source, forward movement discards blocks and backward movement
    /// reopens the path and skips from the start; without a retained path
    /// the request fails with [`CorsikaError::NotSeekable`].
    pub fn seek_to(&mut self, block_index: u64) -> Result<()> {
        let per_sector = self.shape.sub_blocks_per_sector() as u64;
        let sector = block_index / per_sector;
        let within = (block_index % per_sector) as usize;
        trace!("Seeking to logical block {} (sector {})", block_index, sector);

        if self.source.is_seekable() {
            self.source.seek_to(sector * self.shape.sector_len() as u64)?;
            self.current_sector = sector;
            self.next_in_sector = within;
            self.buffer_valid = false;
            return Ok(());
        }

        if self.position() > block_index {
            if !self.source.reopen()? {
                return Err(CorsikaError::NotSeekable);
            }
            self.current_sector = 0;
            self.next_in_sector = 0;
            self.buffer_valid = false;
        }
        while self.position() < block_index {
            if self.next_block()?.is_none() {
                return Err(CorsikaError::Structural(format!(
                    "seek target {} lies past the end of the file",
                    block_index
                )));
            }
        }
        Ok(())
    }

    /// Quick structural probe: the first block must be a run header and the
    /// leading framing word must carry the sub-block size the shape was
    /// detected from. The cursor is restored before returning.
    pub fn is_valid(&mut self) -> bool {
        if !self.source.is_seekable() {
            return true;
        }
        let saved = self.position();
        let probe = self.validity_probe();
        if let Err(e) = self.seek_to(saved) {
            debug!("Failed to restore position after validity probe: {}", e);
            return false;
        }
        match probe {
            Ok(valid) => valid,
            Err(e) => {
                debug!("Validity probe failed: {}", e);
                false
            }
        }
    }

    fn validity_probe(&mut self) -> Result<bool> {
        self.seek_to(0)?;
        let block = match self.next_block()? {
            Some(block) => block,
            None => return Ok(false),
        };
        if block.kind() != BlockKind::RunHeader {
            debug!("First block is not a run header");
            return Ok(false);
        }
        // The buffer still holds sector 0 at this point.
        let padding = LittleEndian::read_u32(&self.buffer[..4]) as usize;
        if padding != self.shape.bytes_per_sub_block() {
            debug!(
                "Unexpected framing word: {} != {}",
                padding,
                self.shape.bytes_per_sub_block()
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Read exactly one sector into the buffer. `Ok(false)` at a clean end
    /// of file, `Truncated` on a partial sector.
    fn read_sector(&mut self) -> Result<bool> {
        let got = fill(self.source.as_mut(), &mut self.buffer)?;
        if got == 0 {
            return Ok(false);
        }
        if got < self.buffer.len() {
            return Err(CorsikaError::Truncated {
                expected: self.buffer.len(),
                got,
            });
        }
        self.check_padding()?;
        self.buffer_valid = true;
        Ok(true)
    }

    fn check_padding(&self) -> Result<()> {
        let pad = self.shape.word_size.padding_bytes();
        let start = &self.buffer[..pad];
        let end = &self.buffer[self.buffer.len() - pad..];
        if start != end {
            return Err(CorsikaError::Framing {
                start: LittleEndian::read_u32(&start[..4]),
                end: LittleEndian::read_u32(&end[..4]),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for RawStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawStream")
            .field("shape", &self.shape)
            .field("current_sector", &self.current_sector)
            .field("next_in_sector", &self.next_in_sector)
            .field("buffer_valid", &self.buffer_valid)
            .finish()
    }
}

/// Read until `buf` is full or the source is exhausted; returns bytes read.
fn fill(source: &mut dyn RawSource, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        let n = source.read(&mut buf[got..])?;
        if n == 0 {
            break;
        }
        got += n;
    }
    Ok(got)
}

/// Read exactly `buf.len()` bytes or fail `Truncated`.
fn read_full(source: &mut dyn RawSource, buf: &mut [u8]) -> Result<()> {
    let got = fill(source, buf)?;
    if got < buf.len() {
        return Err(CorsikaError::Truncated {
            expected: buf.len(),
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corsika::block::{EVENT_HEADER_TAG, RUN_HEADER_TAG};
    use crate::corsika::shape::Thinning;
    use crate::corsika::source::testing::MemorySource;
    use std::io::Cursor;

    const SHAPE: Shape = Shape {
        thinning: Thinning::Thinned,
        word_size: crate::corsika::shape::WordSize::Word64,
    };

    fn tagged_block(tag: &[u8; 4]) -> Vec<u8> {
        let mut data = vec![0u8; SHAPE.bytes_per_sub_block()];
        data[..4].copy_from_slice(tag);
        data
    }

    /// Thinned/64 layout: one sub-block per sector, 8-byte padding on each
    /// side carrying the sub-block length.
    fn file_bytes(blocks: &[Vec<u8>]) -> Vec<u8> {
        let padding = (SHAPE.bytes_per_sub_block() as u64).to_le_bytes();
        let mut bytes = Vec::new();
        for block in blocks {
            bytes.extend_from_slice(&padding);
            bytes.extend_from_slice(block);
            bytes.extend_from_slice(&padding);
        }
        bytes
    }

    fn memory_stream(blocks: &[Vec<u8>]) -> RawStream {
        RawStream::from_source(Box::new(MemorySource(Cursor::new(file_bytes(blocks))))).unwrap()
    }

    struct NonSeekSource(MemorySource);

    impl std::io::Read for NonSeekSource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl RawSource for NonSeekSource {
        fn is_seekable(&self) -> bool {
            false
        }
        fn seek_to(&mut self, _offset: u64) -> Result<()> {
            Err(CorsikaError::NotSeekable)
        }
        fn tell(&mut self) -> Result<u64> {
            self.0.tell()
        }
        fn reopen(&mut self) -> Result<bool> {
            self.0.reopen()
        }
    }

    #[test]
    fn iterates_blocks_in_order() {
        let mut stream = memory_stream(&[
            tagged_block(RUN_HEADER_TAG),
            tagged_block(EVENT_HEADER_TAG),
        ]);
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.next_block().unwrap().unwrap().kind(), BlockKind::RunHeader);
        assert_eq!(stream.position(), 1);
        assert_eq!(stream.next_block().unwrap().unwrap().kind(), BlockKind::EventHeader);
        assert!(stream.next_block().unwrap().is_none());
    }

    #[test]
    fn seek_to_current_position_is_a_no_op() {
        let mut stream = memory_stream(&[
            tagged_block(RUN_HEADER_TAG),
            tagged_block(EVENT_HEADER_TAG),
        ]);
        stream.next_block().unwrap().unwrap();
        let here = stream.position();
        stream.seek_to(here).unwrap();
        assert_eq!(stream.position(), here);
        assert_eq!(stream.next_block().unwrap().unwrap().kind(), BlockKind::EventHeader);
    }

    #[test]
    fn seek_back_and_reread() {
        let mut stream = memory_stream(&[
            tagged_block(RUN_HEADER_TAG),
            tagged_block(EVENT_HEADER_TAG),
        ]);
        stream.next_block().unwrap().unwrap();
        stream.next_block().unwrap().unwrap();
        stream.seek_to(0).unwrap();
        assert_eq!(stream.next_block().unwrap().unwrap().kind(), BlockKind::RunHeader);
    }

    #[test]
    fn padding_mismatch_is_a_framing_error() {
        let mut bytes = file_bytes(&[tagged_block(RUN_HEADER_TAG), tagged_block(EVENT_HEADER_TAG)]);
        // Corrupt one byte of the second sector's trailing padding.
        let sector_len = SHAPE.sector_len();
        let last = 2 * sector_len - 1;
        bytes[last] ^= 0xff;

        let mut stream =
            RawStream::from_source(Box::new(MemorySource(Cursor::new(bytes)))).unwrap();
        assert!(stream.next_block().is_ok());
        assert!(matches!(
            stream.next_block(),
            Err(CorsikaError::Framing { .. })
        ));
    }

    #[test]
    fn corrupt_first_sector_fails_at_open() {
        let mut bytes = file_bytes(&[tagged_block(RUN_HEADER_TAG)]);
        let last = SHAPE.sector_len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            RawStream::from_source(Box::new(MemorySource(Cursor::new(bytes)))),
            Err(CorsikaError::Framing { .. })
        ));
    }

    #[test]
    fn short_sector_is_truncated() {
        let mut bytes = file_bytes(&[tagged_block(RUN_HEADER_TAG), tagged_block(EVENT_HEADER_TAG)]);
        bytes.truncate(bytes.len() - 10);
        let mut stream =
            RawStream::from_source(Box::new(MemorySource(Cursor::new(bytes)))).unwrap();
        stream.next_block().unwrap().unwrap();
        assert!(matches!(
            stream.next_block(),
            Err(CorsikaError::Truncated { .. })
        ));
    }

    #[test]
    fn sequential_source_seeks_by_reopen_and_skip() {
        let bytes = file_bytes(&[
            tagged_block(RUN_HEADER_TAG),
            tagged_block(EVENT_HEADER_TAG),
            tagged_block(RUN_HEADER_TAG),
        ]);
        let source = NonSeekSource(MemorySource(Cursor::new(bytes)));
        let mut stream = RawStream::from_source(Box::new(source)).unwrap();

        stream.seek_to(2).unwrap();
        assert_eq!(stream.next_block().unwrap().unwrap().kind(), BlockKind::RunHeader);
        // Backward movement forces the reopen path.
        stream.seek_to(1).unwrap();
        assert_eq!(stream.next_block().unwrap().unwrap().kind(), BlockKind::EventHeader);
    }
}
