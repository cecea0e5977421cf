//! Core CORSIKA shower file reader module.

pub mod block;
pub mod constants;
pub mod error;
mod index;
pub mod longfile;
pub mod longitudinal;
mod particles;
mod reader;
pub mod shape;
mod shower;
pub mod source;
mod stream;

pub use block::{
    Block, BlockKind, EventHeader, EventTrailer, ParticleRecord, RunEnd, RunHeader,
};
pub use error::{CorsikaError, Result};
pub use index::EventIndex;
pub use longfile::LongFile;
pub use longitudinal::{GaisserHillas, LongProfile};
pub use particles::RawParticleIterator;
pub use reader::CorsikaShowerFile;
pub use shape::{Shape, Thinning, WordSize};
pub use shower::CorsikaShower;
pub use source::{FileSource, RawSource, SequentialSource};
pub use stream::RawStream;
