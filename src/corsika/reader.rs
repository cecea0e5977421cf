//! The shower file facade.
//!
//! Ties the framed stream, the event index, the particle cursor, and the
//! longitudinal profiles together behind a small random-access API.

use std::path::Path;

use log::{debug, info, warn};

use super::error::{CorsikaError, Result};
use super::index::{self, EventIndex};
use super::longfile::LongFile;
use super::longitudinal;
use super::particles::RawParticleIterator;
use super::shape::Thinning;
use super::shower::{self, CorsikaShower};
use super::source::RawSource;
use super::stream::RawStream;

/// Reader for CORSIKA shower files.
///
/// Opening a file detects its shape, scans it once to index every event,
/// and probes for the `.long` profile companion. Events are then available
/// by id or in file order; each carries its decoded header and trailer, its
/// longitudinal profile, and a lazy particle cursor.
///
/// # Example
/// ```no_run
/// # use corsika_reader::CorsikaShowerFile;
/// let mut file = CorsikaShowerFile::open("DAT000001")?;
/// while let Some(shower) = file.read_next_event()? {
///     println!("event {}: zenith {} rad", shower.event_id(), shower.zenith());
/// }
/// for particle in file.particles()? {
///     let particle = particle?;
///     println!("{} at ({}, {})", particle.corsika_id(), particle.x, particle.y);
/// }
/// # Ok::<(), corsika_reader::CorsikaError>(())
/// ```
pub struct CorsikaShowerFile {
    stream: RawStream,
    index: EventIndex,
    /// Slot the next `read_next_event` call reads.
    next_slot: usize,
    current: Option<CorsikaShower>,
    long_file: Option<LongFile>,
    observation_level: u32,
    keep_muon_info: bool,
}

impl CorsikaShowerFile {
    /// Open a shower file and index its events.
    ///
    /// A sibling file with the `.long` extension, when present, supplies
    /// the longitudinal profiles for events without in-stream profile
    /// blocks. A malformed sibling is downgraded to a warning and the
    /// profiles stay empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening CORSIKA shower file: {}", path.display());

        let mut stream = RawStream::open(path)?;
        let index = index::scan(&mut stream)?;

        let long_path = path.with_extension("long");
        let long_file = if long_path.is_file() {
            match LongFile::open(&long_path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(
                        "Ignoring unreadable profile file {}: {}",
                        long_path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            debug!("No profile file at {}", long_path.display());
            None
        };

        info!(
            "Shower file opened: {} events, thinning {:?}, profile file {}",
            index.n_events(),
            stream.shape().thinning,
            if long_file.is_some() { "present" } else { "absent" }
        );

        Ok(Self {
            stream,
            index,
            next_slot: 0,
            current: None,
            long_file,
            observation_level: 1,
            keep_muon_info: true,
        })
    }

    /// Build a reader over an arbitrary byte source.
    ///
    /// Sequential sources work as long as they can be reopened from a
    /// retained path; the index scan needs to return to block zero. No
    /// profile companion is probed for.
    pub fn from_source(source: Box<dyn RawSource>) -> Result<Self> {
        let mut stream = RawStream::from_source(source)?;
        let index = index::scan(&mut stream)?;
        Ok(Self {
            stream,
            index,
            next_slot: 0,
            current: None,
            long_file: None,
            observation_level: 1,
            keep_muon_info: true,
        })
    }

    /// Quick structural probe of the underlying stream; the cursor is left
    /// where it was.
    pub fn is_valid(&mut self) -> bool {
        self.stream.is_valid()
    }

    /// Number of events in the file.
    pub fn n_events(&self) -> usize {
        self.index.n_events()
    }

    /// Whether the particle records carry thinning weights.
    pub fn thinned(&self) -> bool {
        self.stream.shape().thinning == Thinning::Thinned
    }

    /// Select the observation level (1-based) that particle iteration and
    /// the time geometry use. Out-of-range levels fall back to 1 with a
    /// warning when the next event is read.
    pub fn set_observation_level(&mut self, level: u32) {
        self.observation_level = level;
    }

    /// Whether to keep the extra muon production records (CORSIKA ids 75
    /// and 76). Kept by default.
    pub fn set_keep_muon_info(&mut self, keep: bool) {
        self.keep_muon_info = keep;
    }

    /// Locate an event by id and read it.
    ///
    /// Fails with [`CorsikaError::NotFound`] when the id is absent, in
    /// which case the read cursor does not move.
    pub fn find_event(&mut self, event_id: u32) -> Result<&CorsikaShower> {
        let slot = self
            .index
            .slot_of(event_id)
            .ok_or(CorsikaError::NotFound(event_id))?;
        let shower = self.read_slot(slot)?;
        self.next_slot = slot + 1;
        Ok(self.current.insert(shower))
    }

    /// Read the next event in file order. `Ok(None)` past the last event.
    pub fn read_next_event(&mut self) -> Result<Option<&CorsikaShower>> {
        if self.next_slot >= self.index.n_events() {
            return Ok(None);
        }
        let shower = self.read_slot(self.next_slot)?;
        self.next_slot += 1;
        Ok(Some(self.current.insert(shower)))
    }

    /// The most recently read event, if any.
    pub fn current_shower(&self) -> Option<&CorsikaShower> {
        self.current.as_ref()
    }

    /// Particle cursor over the current event.
    ///
    /// The cursor borrows the reader; reading another event or opening a
    /// second cursor first requires dropping this one.
    pub fn particles(&mut self) -> Result<RawParticleIterator<'_>> {
        let (start, time_shift, level) = match &self.current {
            Some(shower) => (
                shower.particle_start,
                shower.time_shift,
                shower.observation_level,
            ),
            None => {
                return Err(CorsikaError::Structural(
                    "no current event; read or find one first".to_string(),
                ))
            }
        };
        RawParticleIterator::new(
            &mut self.stream,
            start,
            time_shift,
            level,
            self.keep_muon_info,
        )
    }

    /// Release both byte sources. Dropping the reader does the same.
    pub fn close(self) {}

    fn read_slot(&mut self, slot: usize) -> Result<CorsikaShower> {
        let header_pos = *self.index.event_headers.get(slot).ok_or_else(|| {
            CorsikaError::Structural(format!("event slot {} is not indexed", slot))
        })?;
        let trailer_pos = *self.index.event_trailers.get(slot).ok_or_else(|| {
            CorsikaError::Structural(format!("event slot {} has no trailer", slot))
        })?;

        self.stream.seek_to(header_pos)?;
        let header = self
            .stream
            .next_block()?
            .ok_or_else(|| {
                CorsikaError::Structural(format!(
                    "cannot read the event header for slot {}",
                    slot
                ))
            })?
            .as_event_header()?;

        self.stream.seek_to(trailer_pos)?;
        let trailer = self
            .stream
            .next_block()?
            .ok_or_else(|| {
                CorsikaError::Structural(format!(
                    "cannot read the event trailer for slot {}",
                    slot
                ))
            })?
            .as_event_trailer()?;

        let mut level = self.observation_level;
        if level < 1 || level > header.n_observation_levels {
            warn!(
                "Requested observation level {} does not exist (max {}), switching to level 1",
                level, header.n_observation_levels
            );
            level = 1;
            self.observation_level = 1;
        }

        let time_shift = shower::time_shift(&header, level);
        let mut shower =
            CorsikaShower::new(header, trailer, header_pos + 1, time_shift, level);

        if let Some(chain_start) = self.index.long_block(slot) {
            shower.profile = longitudinal::read_long_blocks(&mut self.stream, chain_start)?;
        } else if let Some(long_file) = &self.long_file {
            if slot < long_file.len() {
                match long_file.profile(slot) {
                    Ok(profile) => shower.profile = profile,
                    Err(e) => warn!("Dropping profile for event slot {}: {}", slot, e),
                }
            }
        }

        Ok(shower)
    }
}

impl std::fmt::Debug for CorsikaShowerFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorsikaShowerFile")
            .field("stream", &self.stream)
            .field("n_events", &self.index.n_events())
            .field("next_slot", &self.next_slot)
            .field("observation_level", &self.observation_level)
            .finish()
    }
}
