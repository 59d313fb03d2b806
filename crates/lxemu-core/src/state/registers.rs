use crate::Fault;

/// Number of general-purpose address registers (`a0..a15`).
pub const GENERAL_REGISTER_COUNT: usize = 16;

/// General-purpose address register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    A0 = 0,
    A1 = 1,
    A2 = 2,
    A3 = 3,
    A4 = 4,
    A5 = 5,
    A6 = 6,
    A7 = 7,
    A8 = 8,
    A9 = 9,
    A10 = 10,
    A11 = 11,
    A12 = 12,
    A13 = 13,
    A14 = 14,
    A15 = 15,
}

impl GeneralRegister {
    /// Every register in index order.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::A0,
        Self::A1,
        Self::A2,
        Self::A3,
        Self::A4,
        Self::A5,
        Self::A6,
        Self::A7,
        Self::A8,
        Self::A9,
        Self::A10,
        Self::A11,
        Self::A12,
        Self::A13,
        Self::A14,
        Self::A15,
    ];

    /// Array index for this register (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Register named by the low four bits of `bits`.
    #[must_use]
    pub const fn from_nibble(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }
}

impl TryFrom<u8> for GeneralRegister {
    type Error = Fault;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(Fault::RegisterOutOfRange { index })
    }
}

impl std::fmt::Display for GeneralRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.index())
    }
}

/// General registers plus the program counter. Everything resets to zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    ar: [u32; GENERAL_REGISTER_COUNT],
    pc: u32,
}

impl RegisterFile {
    /// Reads a general register.
    #[must_use]
    pub const fn get(&self, reg: GeneralRegister) -> u32 {
        self.ar[reg.index()]
    }

    /// Writes a general register.
    pub const fn set(&mut self, reg: GeneralRegister, value: u32) {
        self.ar[reg.index()] = value;
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// All general registers in index order.
    #[must_use]
    pub const fn general(&self) -> &[u32; GENERAL_REGISTER_COUNT] {
        &self.ar
    }
}
