//! One-pass structural scan of a shower file.
//!
//! The scan walks the block stream once, recording the logical position of
//! every event header, event trailer, and longitudinal chain start, plus an
//! event-id to slot map for random access. The stream cursor is restored to
//! its pre-scan position on completion.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::block::BlockKind;
use super::error::{CorsikaError, Result};
use super::stream::RawStream;

/// Positions of every event's structural blocks, keyed by slot.
///
/// The three position vectors are index-aligned: slot `i` holds the i-th
/// event of the file. `long_blocks[i]` is `None` when that event carries no
/// in-stream longitudinal chain; a chain is attributed to the event whose
/// header most recently preceded it.
#[derive(Debug, Default)]
pub struct EventIndex {
    pub event_headers: Vec<u64>,
    pub event_trailers: Vec<u64>,
    pub long_blocks: Vec<Option<u64>>,
    id_to_slot: HashMap<u32, usize>,
}

impl EventIndex {
    pub fn n_events(&self) -> usize {
        self.event_headers.len()
    }

    /// Slot of the event with the given id, if present.
    pub fn slot_of(&self, event_id: u32) -> Option<usize> {
        self.id_to_slot.get(&event_id).copied()
    }

    /// Start of the in-stream longitudinal chain for a slot, if any.
    pub fn long_block(&self, slot: usize) -> Option<u64> {
        self.long_blocks.get(slot).copied().flatten()
    }

    /// Number of events with an in-stream longitudinal chain.
    pub fn n_long_chains(&self) -> usize {
        self.long_blocks.iter().flatten().count()
    }
}

/// Scan the whole file and build the event index.
///
/// Only `next_block` is used for traversal; positions are the logical block
/// indices reported by the stream before each read.
pub fn scan(stream: &mut RawStream) -> Result<EventIndex> {
    let restore = stream.position();
    stream.seek_to(0)?;

    let mut index = EventIndex::default();
    let mut run_headers = 0usize;
    let mut in_long_chain = false;

    loop {
        let position = stream.position();
        let block = match stream.next_block()? {
            Some(block) => block,
            None => break,
        };

        let kind = block.kind();
        if kind != BlockKind::Longitudinal {
            in_long_chain = false;
        }
        match kind {
            BlockKind::RunHeader => run_headers += 1,
            BlockKind::EventHeader => {
                let header = block.as_event_header()?;
                let slot = index.event_headers.len();
                index.event_headers.push(position);
                index.long_blocks.push(None);
                if let Some(previous) = index.id_to_slot.insert(header.event_number, slot) {
                    return Err(CorsikaError::Structural(format!(
                        "duplicate event id {} at slots {} and {}",
                        header.event_number, previous, slot
                    )));
                }
                debug!("Event {} at block {}", header.event_number, position);
            }
            BlockKind::EventTrailer => index.event_trailers.push(position),
            BlockKind::Longitudinal => {
                // Only the first block of a chain is recorded, in the slot
                // of the event whose header most recently preceded it.
                if !in_long_chain {
                    in_long_chain = true;
                    if let Some(slot) = index.long_blocks.last_mut() {
                        if let Some(first) = *slot {
                            warn!(
                                "Second longitudinal chain at block {} for one event (first at {}); keeping the first",
                                position, first
                            );
                        } else {
                            *slot = Some(position);
                        }
                    } else {
                        warn!(
                            "Longitudinal chain at block {} before any event header",
                            position
                        );
                    }
                }
            }
            // Particle chunks and the run end carry no structure worth indexing.
            BlockKind::ParticleChunk | BlockKind::RunEnd => {}
        }
    }

    if index.event_headers.len() != index.event_trailers.len() {
        return Err(CorsikaError::Structural(format!(
            "{} event headers but {} event trailers",
            index.event_headers.len(),
            index.event_trailers.len()
        )));
    }
    if run_headers != 1 {
        warn!("Expected one run header, found {}", run_headers);
    }
    let n_chains = index.n_long_chains();
    if n_chains > 0 && n_chains != index.n_events() {
        warn!(
            "Only {} of {} events carry an in-stream longitudinal chain; the rest fall back to the profile file",
            n_chains,
            index.n_events()
        );
    }

    info!(
        "Scanned shower file: {} events, {} longitudinal chains",
        index.n_events(),
        n_chains
    );

    stream.seek_to(restore)?;
    Ok(index)
}
