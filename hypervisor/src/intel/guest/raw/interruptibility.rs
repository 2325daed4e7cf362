use bit_field::BitField;

/// The guest interruptibility-state field.
///
/// See: Table 25-3. Format of Interruptibility State
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct InterruptibilityState(pub u32);

impl InterruptibilityState {
    pub fn blocking_by_sti(self) -> bool {
        self.0.get_bit(0)
    }

    pub fn blocking_by_mov_ss(self) -> bool {
        self.0.get_bit(1)
    }

    pub fn blocking_by_smi(self) -> bool {
        self.0.get_bit(2)
    }

    pub fn blocking_by_nmi(self) -> bool {
        self.0.get_bit(3)
    }
}

impl From<u32> for InterruptibilityState {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
