//! Logical blocks and their fixed-layout record views.
//!
//! Every sub-block is a flat array of little-endian 32-bit floats. Control
//! blocks announce themselves with a 4-byte ASCII tag in the first word;
//! anything untagged is a run of back-to-back particle records. Field
//! positions below are the 1-based word numbers of the CORSIKA record
//! layout, shifted to 0-based indices.

use byteorder::{ByteOrder, LittleEndian};

use super::error::{CorsikaError, Result};
use super::shape::{Thinning, PARTICLES_PER_SUB_BLOCK};

pub const RUN_HEADER_TAG: &[u8; 4] = b"RUNH";
pub const RUN_END_TAG: &[u8; 4] = b"RUNE";
pub const EVENT_HEADER_TAG: &[u8; 4] = b"EVTH";
pub const EVENT_TRAILER_TAG: &[u8; 4] = b"EVTE";
pub const LONGITUDINAL_TAG: &[u8; 4] = b"LONG";

/// Entries in one longitudinal block: 13 header words, then 26 rows of 10.
pub const LONG_ENTRIES_PER_BLOCK: usize = 26;
const LONG_FIRST_ENTRY_WORD: usize = 13;
const LONG_WORDS_PER_ENTRY: usize = 10;

/// Classification of a logical block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    RunHeader,
    RunEnd,
    EventHeader,
    EventTrailer,
    Longitudinal,
    ParticleChunk,
}

impl BlockKind {
    /// A control block terminates an event's particle region.
    pub fn is_control(self) -> bool {
        !matches!(self, BlockKind::ParticleChunk | BlockKind::Longitudinal)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlockKind::RunHeader => "run header",
            BlockKind::RunEnd => "run end",
            BlockKind::EventHeader => "event header",
            BlockKind::EventTrailer => "event trailer",
            BlockKind::Longitudinal => "longitudinal",
            BlockKind::ParticleChunk => "particle chunk",
        };
        f.write_str(name)
    }
}

/// One logical sub-block, owned by value.
#[derive(Debug, Clone)]
pub struct Block {
    data: Vec<u8>,
    thinning: Thinning,
}

impl Block {
    pub(crate) fn new(data: Vec<u8>, thinning: Thinning) -> Self {
        debug_assert_eq!(data.len(), thinning.bytes_per_sub_block());
        Self { data, thinning }
    }

    pub fn thinning(&self) -> Thinning {
        self.thinning
    }

    /// Classify by the leading 4-byte tag.
    pub fn kind(&self) -> BlockKind {
        match &self.data[..4] {
            t if t == RUN_HEADER_TAG => BlockKind::RunHeader,
            t if t == RUN_END_TAG => BlockKind::RunEnd,
            t if t == EVENT_HEADER_TAG => BlockKind::EventHeader,
            t if t == EVENT_TRAILER_TAG => BlockKind::EventTrailer,
            t if t == LONGITUDINAL_TAG => BlockKind::Longitudinal,
            _ => BlockKind::ParticleChunk,
        }
    }

    fn word(&self, index: usize) -> f32 {
        LittleEndian::read_f32(&self.data[4 * index..4 * index + 4])
    }

    fn expect_kind(&self, kind: BlockKind) -> Result<()> {
        if self.kind() != kind {
            return Err(CorsikaError::Structural(format!(
                "expected a {} block, found a {} block",
                kind,
                self.kind()
            )));
        }
        Ok(())
    }

    pub fn as_run_header(&self) -> Result<RunHeader> {
        self.expect_kind(BlockKind::RunHeader)?;
        Ok(RunHeader {
            run_number: self.word(1) as u32,
            date: self.word(2) as u32,
            version: self.word(3),
            n_observation_levels: self.word(4) as u32,
        })
    }

    pub fn as_run_end(&self) -> Result<RunEnd> {
        self.expect_kind(BlockKind::RunEnd)?;
        Ok(RunEnd {
            run_number: self.word(1) as u32,
            n_events: self.word(2) as u32,
        })
    }

    pub fn as_event_header(&self) -> Result<EventHeader> {
        self.expect_kind(BlockKind::EventHeader)?;
        let mut observation_height = [0.0f32; 10];
        for (i, h) in observation_height.iter_mut().enumerate() {
            *h = self.word(47 + i);
        }
        Ok(EventHeader {
            event_number: self.word(1) as u32,
            particle_id: self.word(2) as u32,
            energy: self.word(3),
            starting_altitude: self.word(4),
            z_first: self.word(6),
            theta: self.word(10),
            phi: self.word(11),
            n_observation_levels: self.word(46) as u32,
            observation_height,
            curved: self.word(78) != 0.0,
            starting_height: self.word(157),
        })
    }

    pub fn as_event_trailer(&self) -> Result<EventTrailer> {
        self.expect_kind(BlockKind::EventTrailer)?;
        Ok(EventTrailer {
            event_number: self.word(1) as u32,
            weighted_photons: self.word(2),
            weighted_electrons: self.word(3),
            weighted_hadrons: self.word(4),
            weighted_muons: self.word(5),
            particles_written: self.word(6) as u64,
        })
    }

    /// The i-th particle record of a particle chunk.
    ///
    /// Valid for `i < PARTICLES_PER_SUB_BLOCK`; the caller is expected to
    /// have classified the block first.
    pub fn particle(&self, i: usize) -> ParticleRecord {
        debug_assert!(i < PARTICLES_PER_SUB_BLOCK);
        let w = self.thinning.words_per_particle();
        let base = i * w;
        ParticleRecord {
            description: self.word(base) as u32,
            px: self.word(base + 1),
            py: self.word(base + 2),
            pz: self.word(base + 3),
            x: self.word(base + 4),
            y: self.word(base + 5),
            time: f64::from(self.word(base + 6)),
            weight: if self.thinning == Thinning::Thinned {
                self.word(base + 7)
            } else {
                1.0
            },
        }
    }

    /// Header word 5 of a longitudinal block: `steps * 100 + n_blocks`.
    pub fn steps_and_blocks(&self) -> u32 {
        self.word(4) as u32
    }

    /// The i-th longitudinal entry, `i < LONG_ENTRIES_PER_BLOCK`.
    pub fn long_entry(&self, i: usize) -> LongEntry {
        debug_assert!(i < LONG_ENTRIES_PER_BLOCK);
        let base = LONG_FIRST_ENTRY_WORD + i * LONG_WORDS_PER_ENTRY;
        LongEntry {
            depth: f64::from(self.word(base)),
            gamma: f64::from(self.word(base + 1)),
            e_plus: f64::from(self.word(base + 2)),
            e_minus: f64::from(self.word(base + 3)),
            mu_plus: f64::from(self.word(base + 4)),
            mu_minus: f64::from(self.word(base + 5)),
            hadron: f64::from(self.word(base + 6)),
            charged: f64::from(self.word(base + 7)),
            nuclei: f64::from(self.word(base + 8)),
            cherenkov: f64::from(self.word(base + 9)),
        }
    }
}

/// Decoded run header (RUNH).
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub run_number: u32,
    pub date: u32,
    pub version: f32,
    pub n_observation_levels: u32,
}

/// Decoded run end (RUNE).
#[derive(Debug, Clone)]
pub struct RunEnd {
    pub run_number: u32,
    pub n_events: u32,
}

/// Decoded event header (EVTH).
#[derive(Debug, Clone)]
pub struct EventHeader {
    pub event_number: u32,
    /// CORSIKA code of the primary particle.
    pub particle_id: u32,
    /// Primary energy, GeV.
    pub energy: f32,
    /// Starting altitude, g/cm².
    pub starting_altitude: f32,
    /// Height of the first interaction, cm. Negative when the clock starts
    /// at the margin of the atmosphere (SLANT/CURVED options).
    pub z_first: f32,
    /// Zenith angle, rad.
    pub theta: f32,
    /// Azimuth angle, rad.
    pub phi: f32,
    pub n_observation_levels: u32,
    /// Observation level heights, cm. Only the first
    /// `n_observation_levels` entries are meaningful.
    pub observation_height: [f32; 10],
    pub curved: bool,
    /// Starting height, cm; zero or negative when unset.
    pub starting_height: f32,
}

/// Decoded event trailer (EVTE).
#[derive(Debug, Clone)]
pub struct EventTrailer {
    pub event_number: u32,
    pub weighted_photons: f32,
    pub weighted_electrons: f32,
    pub weighted_hadrons: f32,
    pub weighted_muons: f32,
    pub particles_written: u64,
}

/// One particle record.
///
/// The description word is a composite id: `code * 1000 +
/// hadronic_generation * 10 + observation_level`. A zero description marks
/// unused trailing slots in a partially filled block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub description: u32,
    /// Momentum components, GeV/c.
    pub px: f32,
    pub py: f32,
    pub pz: f32,
    /// Position at the observation level, cm.
    pub x: f32,
    pub y: f32,
    /// Arrival time, ns.
    pub time: f64,
    /// Thinning weight; 1.0 in unthinned files.
    pub weight: f32,
}

impl ParticleRecord {
    /// CORSIKA particle code.
    pub fn corsika_id(&self) -> u32 {
        self.description / 1000
    }

    pub fn hadronic_generation(&self) -> u32 {
        self.description % 1000 / 10
    }

    pub fn observation_level(&self) -> u32 {
        self.description % 10
    }
}

/// One row of a longitudinal block: particle counts at a depth step.
#[derive(Debug, Clone, Copy)]
pub struct LongEntry {
    pub depth: f64,
    pub gamma: f64,
    pub e_plus: f64,
    pub e_minus: f64,
    pub mu_plus: f64,
    pub mu_minus: f64,
    pub hadron: f64,
    pub charged: f64,
    pub nuclei: f64,
    pub cherenkov: f64,
}
