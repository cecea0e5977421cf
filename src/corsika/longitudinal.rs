//! Longitudinal shower profiles and the in-stream block assembler.

use log::{trace, warn};

use super::block::{BlockKind, LONG_ENTRIES_PER_BLOCK};
use super::error::{CorsikaError, Result};
use super::stream::RawStream;

/// Parameters of the Gaisser-Hillas longitudinal profile fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaisserHillas {
    pub n_max: f64,
    pub x0: f64,
    pub x_max: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Chi squared per degree of freedom of the fit.
    pub chi2_dof: f64,
}

/// Atmospheric depth profiles of one shower.
///
/// `depth` carries the particle-count bins, `depth_de` the energy-deposit
/// bins (the two tables of a profile file use different bin centres). All
/// vectors are empty when the event carries no profile at all.
#[derive(Debug, Clone, Default)]
pub struct LongProfile {
    /// Depth axis of the particle-count profiles, g/cm².
    pub depth: Vec<f64>,
    /// Depth axis of the energy-deposit profile, g/cm².
    pub depth_de: Vec<f64>,
    /// Energy deposit per depth bin, GeV.
    pub dedx: Vec<f64>,
    pub charge_profile: Vec<f64>,
    pub gamma_profile: Vec<f64>,
    pub electron_profile: Vec<f64>,
    pub muon_profile: Vec<f64>,
    pub gaisser_hillas: Option<GaisserHillas>,
    /// Calorimetric energy, GeV; zero when unknown.
    pub calorimetric_energy: f64,
    /// Whether the depth axis is slant (along the shower axis) rather than
    /// vertical.
    pub slant_depth: bool,
}

impl LongProfile {
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty() && self.depth_de.is_empty()
    }
}

/// Assemble a profile from a chain of in-stream longitudinal blocks.
///
/// The chain's first header word encodes `steps * 100 + n_blocks`. Entries
/// are collected across `n_blocks` consecutive blocks, stopping early at
/// the first zero depth past index 0. In-stream blocks carry neither an
/// energy deposit nor a fit, so `dedx` is zeroed and no fit is attached.
pub fn read_long_blocks(stream: &mut RawStream, chain_start: u64) -> Result<LongProfile> {
    stream.seek_to(chain_start)?;
    let mut block = stream.next_block()?.ok_or_else(|| {
        CorsikaError::Structural(format!(
            "cannot read longitudinal block at position {}",
            chain_start
        ))
    })?;
    if block.kind() != BlockKind::Longitudinal {
        return Err(CorsikaError::Structural(format!(
            "block at position {} is not longitudinal",
            chain_start
        )));
    }

    let steps_and_blocks = block.steps_and_blocks();
    let n_steps = (steps_and_blocks / 100) as usize;
    let n_blocks = (steps_and_blocks % 100) as usize;
    trace!("Longitudinal chain: {} steps in {} blocks", n_steps, n_blocks);

    let mut profile = LongProfile::default();
    let mut total = 0usize;
    'chain: for chain_index in 0..n_blocks.max(1) {
        if chain_index > 0 {
            block = stream.next_block()?.ok_or_else(|| {
                CorsikaError::Structural(format!(
                    "cannot read longitudinal block {} of the chain at {}",
                    chain_index, chain_start
                ))
            })?;
            if block.kind() != BlockKind::Longitudinal {
                return Err(CorsikaError::Structural(format!(
                    "longitudinal chain at {} interrupted by a {} block",
                    chain_start,
                    block.kind()
                )));
            }
        }
        for i in 0..LONG_ENTRIES_PER_BLOCK {
            let entry = block.long_entry(i);
            if total > 0 && entry.depth == 0.0 {
                break 'chain;
            }
            profile.depth.push(entry.depth);
            profile.depth_de.push(entry.depth);
            profile.dedx.push(0.0);
            profile.charge_profile.push(entry.charged);
            profile.gamma_profile.push(entry.gamma);
            profile.electron_profile.push(entry.e_plus + entry.e_minus);
            profile.muon_profile.push(entry.mu_plus + entry.mu_minus);
            total += 1;
        }
    }

    if n_steps != 0 && total != n_steps {
        warn!(
            "Longitudinal chain at {} declared {} steps but carried {}",
            chain_start, n_steps, total
        );
    }
    Ok(profile)
}
