//! File shape: thinning mode, framing word size, and the derived layout
//! constants.
//!
//! A CORSIKA particle file comes in four variants. The per-particle record
//! either carries a statistical thinning weight or not, and the Fortran
//! record markers bracketing each disk sector are either one or two 32-bit
//! words wide. Both are discovered from the first eight bytes of the file.

use super::error::{CorsikaError, Result};

/// Particle records per logical sub-block, fixed by the record layout.
pub const PARTICLES_PER_SUB_BLOCK: usize = 39;

/// Whether per-particle records carry a thinning weight.
///
/// Thinning changes the particle record width and, through it, every
/// derived layout constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thinning {
    Thinned,
    NotThinned,
}

impl Thinning {
    /// 32-bit words per particle record (8 with weight, 7 without).
    pub const fn words_per_particle(self) -> usize {
        match self {
            Thinning::Thinned => 8,
            Thinning::NotThinned => 7,
        }
    }

    /// Byte length of one logical sub-block (1248 thinned, 1092 not).
    pub const fn bytes_per_sub_block(self) -> usize {
        PARTICLES_PER_SUB_BLOCK * self.words_per_particle() * 4
    }

    /// 32-bit words per logical sub-block.
    pub const fn words_per_sub_block(self) -> usize {
        PARTICLES_PER_SUB_BLOCK * self.words_per_particle()
    }

    /// Logical sub-blocks grouped into one disk sector.
    pub const fn sub_blocks_per_sector(self) -> usize {
        match self {
            Thinning::Thinned => 1,
            Thinning::NotThinned => 21,
        }
    }
}

/// Width of the Fortran record markers bracketing each sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSize {
    Word32,
    Word64,
}

impl WordSize {
    /// Byte width of one padding word.
    pub const fn padding_bytes(self) -> usize {
        match self {
            WordSize::Word32 => 4,
            WordSize::Word64 => 8,
        }
    }
}

/// The complete on-disk shape of a shower file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub thinning: Thinning,
    pub word_size: WordSize,
}

impl Shape {
    /// Detect the file shape from its first eight bytes.
    ///
    /// The bytes are read both as a 64-bit and (their low half) as a 32-bit
    /// little-endian integer and matched against the known sub-block sizes.
    /// 64-bit interpretations win when both match, so a 64-bit file whose
    /// high word happens to be zero is still classified correctly.
    ///
    /// The eight bytes are part of the first sector's leading padding and
    /// must be handed back to the framed stream as the pre-filled prefix of
    /// its first sector buffer.
    pub fn detect(first: [u8; 8]) -> Result<Self> {
        let len64 = u64::from_le_bytes(first);
        let len32 = u32::from_le_bytes([first[0], first[1], first[2], first[3]]);

        const THINNED: u64 = Thinning::Thinned.bytes_per_sub_block() as u64;
        const NOT_THINNED: u64 = Thinning::NotThinned.bytes_per_sub_block() as u64;

        let shape = if len64 == THINNED {
            Shape { thinning: Thinning::Thinned, word_size: WordSize::Word64 }
        } else if len64 == NOT_THINNED {
            Shape { thinning: Thinning::NotThinned, word_size: WordSize::Word64 }
        } else if u64::from(len32) == THINNED {
            Shape { thinning: Thinning::Thinned, word_size: WordSize::Word32 }
        } else if u64::from(len32) == NOT_THINNED {
            Shape { thinning: Thinning::NotThinned, word_size: WordSize::Word32 }
        } else {
            return Err(CorsikaError::UnknownShape { marker: len64 });
        };
        Ok(shape)
    }

    /// Logical sub-blocks per disk sector.
    pub const fn sub_blocks_per_sector(self) -> usize {
        self.thinning.sub_blocks_per_sector()
    }

    /// Byte length of one logical sub-block.
    pub const fn bytes_per_sub_block(self) -> usize {
        self.thinning.bytes_per_sub_block()
    }

    /// Total byte length of one disk sector, padding included.
    pub const fn sector_len(self) -> usize {
        2 * self.word_size.padding_bytes()
            + self.sub_blocks_per_sector() * self.bytes_per_sub_block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_bytes(low: u32, high: u32) -> [u8; 8] {
        let mut b = [0u8; 8];
        b[..4].copy_from_slice(&low.to_le_bytes());
        b[4..].copy_from_slice(&high.to_le_bytes());
        b
    }

    #[test]
    fn detects_thinned_64() {
        let shape = Shape::detect(first_bytes(1248, 0)).unwrap();
        assert_eq!(shape.thinning, Thinning::Thinned);
        assert_eq!(shape.word_size, WordSize::Word64);
    }

    #[test]
    fn detects_not_thinned_64() {
        let shape = Shape::detect(first_bytes(1092, 0)).unwrap();
        assert_eq!(shape.thinning, Thinning::NotThinned);
        assert_eq!(shape.word_size, WordSize::Word64);
    }

    #[test]
    fn detects_thinned_32_when_high_word_is_data() {
        // In a 32-bit file the next four bytes already belong to the first
        // sub-block, so the 64-bit interpretation cannot match.
        let shape = Shape::detect(first_bytes(1248, 0x4e55_5248)).unwrap();
        assert_eq!(shape.thinning, Thinning::Thinned);
        assert_eq!(shape.word_size, WordSize::Word32);
    }

    #[test]
    fn detects_not_thinned_32() {
        let shape = Shape::detect(first_bytes(1092, 0xdead_beef)).unwrap();
        assert_eq!(shape.thinning, Thinning::NotThinned);
        assert_eq!(shape.word_size, WordSize::Word32);
    }

    #[test]
    fn rejects_unknown_marker() {
        let err = Shape::detect(first_bytes(1000, 0)).unwrap_err();
        assert!(matches!(err, CorsikaError::UnknownShape { marker: 1000 }));
    }

    #[test]
    fn detection_is_idempotent() {
        let bytes = first_bytes(1248, 0);
        assert_eq!(Shape::detect(bytes).unwrap(), Shape::detect(bytes).unwrap());
    }

    #[test]
    fn layout_constants() {
        let thinned = Shape { thinning: Thinning::Thinned, word_size: WordSize::Word64 };
        assert_eq!(thinned.bytes_per_sub_block(), 1248);
        assert_eq!(thinned.sector_len(), 8 + 1248 + 8);

        let plain = Shape { thinning: Thinning::NotThinned, word_size: WordSize::Word32 };
        assert_eq!(plain.bytes_per_sub_block(), 1092);
        assert_eq!(plain.sector_len(), 4 + 21 * 1092 + 4);
    }
}
