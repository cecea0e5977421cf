//! Reader for binary shower files produced by the CORSIKA air-shower
//! Monte-Carlo simulator, and for the `.long` longitudinal profile files
//! written alongside them.
//!
//! The file format comes in four shapes: particle records with or without
//! thinning weights, framed by 32-bit or 64-bit Fortran record markers.
//! All four are auto-detected from the first bytes of the file.
//!
//! The usual entry point is [`CorsikaShowerFile`], which indexes every
//! event up front and exposes random access by event id plus a lazy
//! particle cursor per event. The lower layers ([`RawStream`],
//! [`LongFile`]) are public for tools that need block-level access.
//!
//! ```no_run
//! use corsika_reader::CorsikaShowerFile;
//!
//! let mut file = CorsikaShowerFile::open("DAT000001")?;
//! let shower = file.find_event(1)?;
//! println!(
//!     "primary {} at zenith {} rad, {} depth bins",
//!     shower.primary_id(),
//!     shower.zenith(),
//!     shower.profile().depth.len()
//! );
//! for particle in file.particles()? {
//!     let particle = particle?;
//!     println!("id {} t {} ns", particle.corsika_id(), particle.time);
//! }
//! # Ok::<(), corsika_reader::CorsikaError>(())
//! ```
//!
//! This crate logs through the `log` facade; install any logger
//! implementation to see the diagnostics.

pub mod corsika;

pub use corsika::{
    Block, BlockKind, CorsikaError, CorsikaShower, CorsikaShowerFile, EventHeader, EventIndex,
    EventTrailer, FileSource, GaisserHillas, LongFile, LongProfile, ParticleRecord,
    RawParticleIterator, RawSource, RawStream, Result, RunEnd, RunHeader, SequentialSource,
    Shape, Thinning, WordSize,
};
