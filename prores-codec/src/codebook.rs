//! Adaptive Rice/exp-Golomb codebooks
//!
//! Every ProRes symbol is coded with a hybrid code: short values use a Rice
//! code, values above the switch point escape into an exp-Golomb code. The
//! parameters of the code are chosen from small tables indexed by the
//! previously coded symbol of the same class.

/// Parameters of one hybrid Rice/exp-Golomb code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codebook {
    /// Number of suffix bits of the Rice part
    pub rice_order: u32,
    /// Order of the exp-Golomb escape
    pub exp_order: u32,
    /// Largest prefix length still coded as Rice
    pub switch_bits: u32,
    /// Bias removed from escaped values
    pub golomb_offset: i32,
    /// Escape suffix length minus the prefix length (may be negative)
    pub golomb_bits: i32,
    /// Mask of the Rice suffix
    pub rice_mask: u32,
}

impl Codebook {
    /// Build a codebook from its three primary parameters.
    pub const fn new(rice_order: u32, exp_order: u32, switch_bits: u32) -> Self {
        Codebook {
            rice_order,
            exp_order,
            switch_bits,
            golomb_offset: (1i32 << exp_order) - (((switch_bits + 1) as i32) << rice_order),
            golomb_bits: exp_order as i32 - switch_bits as i32 - 1,
            rice_mask: (1u32 << rice_order) - 1,
        }
    }

    /// Build a codebook from the packed byte form `rrreeess`.
    pub const fn from_packed(packed: u8) -> Self {
        Codebook::new(
            (packed >> 5) as u32,
            ((packed >> 2) & 7) as u32,
            (packed & 3) as u32,
        )
    }

    /// Smallest value coded through the exp-Golomb escape
    pub const fn escape_threshold(&self) -> u32 {
        (self.switch_bits + 1) << self.rice_order
    }
}

/// Symbol classes of the coefficient stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    /// DC of the first block of a slice plane
    FirstDc,
    /// DC difference of the following blocks
    DcDelta,
    /// Zero run preceding an AC level
    AcRun,
    /// AC magnitude minus one
    AcLevel,
}

/// Codebook of the first DC coefficient
pub const FIRST_DC_CODEBOOK: Codebook = Codebook::from_packed(0xB8);

/// DC difference codebooks, indexed by the previous DC code
pub const DC_CODEBOOKS: [Codebook; 7] = [
    Codebook::from_packed(0x04),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x4D),
    Codebook::from_packed(0x4D),
    Codebook::from_packed(0x70),
    Codebook::from_packed(0x70),
];

/// Run codebooks, indexed by the previous run
pub const RUN_CODEBOOKS: [Codebook; 16] = [
    Codebook::from_packed(0x06),
    Codebook::from_packed(0x06),
    Codebook::from_packed(0x05),
    Codebook::from_packed(0x05),
    Codebook::from_packed(0x04),
    Codebook::from_packed(0x29),
    Codebook::from_packed(0x29),
    Codebook::from_packed(0x29),
    Codebook::from_packed(0x29),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x4C),
];

/// Level codebooks, indexed by the previous level
pub const LEVEL_CODEBOOKS: [Codebook; 10] = [
    Codebook::from_packed(0x04),
    Codebook::from_packed(0x0A),
    Codebook::from_packed(0x05),
    Codebook::from_packed(0x06),
    Codebook::from_packed(0x04),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x28),
    Codebook::from_packed(0x4C),
];

/// Look up the codebook of a symbol class; the context is clamped to the table.
#[inline]
pub fn codebook(class: SymbolClass, context: u32) -> &'static Codebook {
    match class {
        SymbolClass::FirstDc => &FIRST_DC_CODEBOOK,
        SymbolClass::DcDelta => &DC_CODEBOOKS[(context as usize).min(DC_CODEBOOKS.len() - 1)],
        SymbolClass::AcRun => &RUN_CODEBOOKS[(context as usize).min(RUN_CODEBOOKS.len() - 1)],
        SymbolClass::AcLevel => {
            &LEVEL_CODEBOOKS[(context as usize).min(LEVEL_CODEBOOKS.len() - 1)]
        }
    }
}
