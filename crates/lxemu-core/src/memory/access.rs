//! Access-width and alignment policy helpers.

use crate::Fault;

/// Width of a single memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
}

impl AccessWidth {
    /// Number of bytes covered by this width.
    #[must_use]
    pub const fn bytes(self) -> u8 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }
}

/// Validates that `address` is a multiple of the access width.
///
/// Byte accesses are always aligned.
///
/// # Errors
///
/// Returns [`Fault::Alignment`] for an odd half-word address or a word address
/// that is not a multiple of four.
pub const fn validate_alignment(address: u32, width: AccessWidth) -> Result<(), Fault> {
    let bytes = width.bytes();
    if address % (bytes as u32) == 0 {
        Ok(())
    } else {
        Err(Fault::Alignment {
            address,
            width: bytes,
        })
    }
}
