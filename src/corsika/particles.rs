//! Lazy iteration over one event's particle records.

use log::trace;

use super::block::{Block, BlockKind, ParticleRecord};
use super::error::{CorsikaError, Result};
use super::shape::PARTICLES_PER_SUB_BLOCK;
use super::stream::RawStream;

/// Cursor over the particle records of a single event.
///
/// The iterator borrows the block stream exclusively, so only one event can
/// be traversed at a time; the borrow ends when the iterator is dropped.
///
/// Records are read block by block starting just after the event header.
/// The first control or longitudinal block ends the particle region.
/// Zero-id slots (unused trailing entries of a partially filled block) are
/// never emitted, and emitted times carry the event's geometric time shift.
pub struct RawParticleIterator<'a> {
    stream: &'a mut RawStream,
    start: u64,
    time_shift: f64,
    /// Observation level to select, or 0 for all levels.
    observation_level: u32,
    /// Keep the extra muon production records (CORSIKA ids 75 and 76).
    keep_muon_info: bool,
    block: Option<Block>,
    cursor: usize,
    valid: bool,
}

impl<'a> RawParticleIterator<'a> {
    pub(crate) fn new(
        stream: &'a mut RawStream,
        start: u64,
        time_shift: f64,
        observation_level: u32,
        keep_muon_info: bool,
    ) -> Result<Self> {
        let mut iter = Self {
            stream,
            start,
            time_shift,
            observation_level,
            keep_muon_info,
            block: None,
            cursor: PARTICLES_PER_SUB_BLOCK,
            valid: true,
        };
        iter.rewind()?;
        Ok(iter)
    }

    /// Restart the traversal from the first particle block.
    pub fn rewind(&mut self) -> Result<()> {
        trace!("Rewinding particle cursor to block {}", self.start);
        self.stream.seek_to(self.start)?;
        self.block = None;
        self.cursor = PARTICLES_PER_SUB_BLOCK;
        self.valid = true;
        Ok(())
    }

    /// Read the next particle record.
    ///
    /// `Ok(None)` once the particle region ends; a further call fails with
    /// [`CorsikaError::IteratorExhausted`].
    pub fn next_particle(&mut self) -> Result<Option<ParticleRecord>> {
        loop {
            if self.cursor == PARTICLES_PER_SUB_BLOCK {
                if !self.valid {
                    return Err(CorsikaError::IteratorExhausted);
                }
                let block = self.stream.next_block()?.ok_or_else(|| {
                    CorsikaError::Structural(
                        "particle records ended without an event trailer".to_string(),
                    )
                })?;
                match block.kind() {
                    BlockKind::ParticleChunk => {
                        self.block = Some(block);
                        self.cursor = 0;
                    }
                    // Control or longitudinal: the particle region is over.
                    _ => {
                        self.valid = false;
                        self.block = None;
                        return Ok(None);
                    }
                }
            }

            let record = match &self.block {
                Some(block) => block.particle(self.cursor),
                None => {
                    self.cursor = PARTICLES_PER_SUB_BLOCK;
                    continue;
                }
            };
            self.cursor += 1;

            if record.description == 0 {
                continue;
            }
            if !self.keep_muon_info && matches!(record.corsika_id(), 75 | 76) {
                continue;
            }
            if self.observation_level != 0
                && record.observation_level() != self.observation_level
            {
                continue;
            }

            let mut particle = record;
            particle.time -= self.time_shift;
            return Ok(Some(particle));
        }
    }
}

/// `Iterator` adapter over [`next_particle`](RawParticleIterator::next_particle).
///
/// Exhaustion maps to `None` so `for` loops terminate cleanly; callers that
/// need the strict use-after-end contract should call `next_particle`
/// directly.
impl Iterator for RawParticleIterator<'_> {
    type Item = Result<ParticleRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_particle() {
            Ok(Some(particle)) => Some(Ok(particle)),
            Ok(None) => None,
            Err(CorsikaError::IteratorExhausted) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
