use thiserror::Error;

/// Fault classes used for log records and run-loop policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Address range or alignment violation on a memory access.
    Memory,
    /// Fetched word did not decode to a known operation.
    Decode,
    /// Direct register accessor used an index outside `0..16`.
    Register,
    /// Firmware image could not be loaded.
    Load,
}

/// Every failure the core can raise.
///
/// Faults are plain values: they travel up through `Result` returns and the
/// run loop decides whether to absorb them (stop the run) or hand them back to
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Address lies in neither RAM nor device space.
    #[error("invalid memory address: {address:#010x}")]
    OutOfRange {
        /// Offending address.
        address: u32,
    },
    /// Bulk transfer whose first or last byte is not backed by RAM.
    #[error("invalid memory range for bulk transfer: {start:#010x} (+{len} bytes)")]
    BulkOutOfRange {
        /// First address of the transfer.
        start: u32,
        /// Requested transfer length in bytes.
        len: usize,
    },
    /// Multi-byte access at an address that is not a multiple of its width.
    #[error("unaligned {}-bit access at {address:#010x}", u32::from(*width) * 8)]
    Alignment {
        /// Offending address.
        address: u32,
        /// Access width in bytes (2 or 4).
        width: u8,
    },
    /// Opcode nibble does not select one of the eight defined operations.
    #[error("unknown instruction opcode {opcode} in word {word:#010x}")]
    UnknownOpcode {
        /// Low nibble of the fetched word.
        opcode: u8,
        /// Full fetched word.
        word: u32,
    },
    /// Register accessor index outside the 16-entry register file.
    #[error("register index out of range: {index}")]
    RegisterOutOfRange {
        /// Offending register index.
        index: u8,
    },
    /// Firmware image had zero length.
    #[error("firmware is empty")]
    EmptyInput,
}

impl Fault {
    /// Returns the class this fault belongs to.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::OutOfRange { .. } | Self::BulkOutOfRange { .. } | Self::Alignment { .. } => {
                FaultClass::Memory
            }
            Self::UnknownOpcode { .. } => FaultClass::Decode,
            Self::RegisterOutOfRange { .. } => FaultClass::Register,
            Self::EmptyInput => FaultClass::Load,
        }
    }

    /// Faults the run loop absorbs by stopping the run.
    ///
    /// Load-class faults happen before any instruction executes and are left
    /// to the caller.
    #[must_use]
    pub const fn is_step_fault(self) -> bool {
        !matches!(self.class(), FaultClass::Load)
    }
}
