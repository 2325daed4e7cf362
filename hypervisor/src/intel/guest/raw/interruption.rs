use bit_field::BitField;
use core::fmt;

pub const DEBUG_VECTOR: u8 = 1;
pub const NMI_VECTOR: u8 = 2;
pub const BREAKPOINT_VECTOR: u8 = 3;
pub const INVALID_OPCODE_VECTOR: u8 = 6;
pub const PAGE_FAULT_VECTOR: u8 = 14;

/// Bits 10:8 of the interruption-information fields.
///
/// See: Table 25-17. Format of the VM-Entry Interruption-Information Field
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterruptionType {
    ExternalInterrupt = 0,
    Reserved = 1,
    NonMaskableInterrupt = 2,
    HardwareException = 3,
    SoftwareInterrupt = 4,
    PrivilegedSoftwareException = 5,
    SoftwareException = 6,
    OtherEvent = 7,
}

impl InterruptionType {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0 => Self::ExternalInterrupt,
            1 => Self::Reserved,
            2 => Self::NonMaskableInterrupt,
            3 => Self::HardwareException,
            4 => Self::SoftwareInterrupt,
            5 => Self::PrivilegedSoftwareException,
            6 => Self::SoftwareException,
            _ => Self::OtherEvent,
        }
    }

    /// Event types whose injection needs the VM-entry instruction length.
    ///
    /// See: 27.6.1.1 Details of Vectored-Event Injection
    pub fn needs_instruction_length(self) -> bool {
        matches!(
            self,
            Self::SoftwareInterrupt | Self::PrivilegedSoftwareException | Self::SoftwareException
        )
    }
}

/// An event captured from the VM-exit interruption-information field, or one
/// built to be written into the VM-entry interruption-information field.
///
/// The 32-bit form exists only at the VMCS boundary (`decode`/`encode`). An
/// all-zero encoding means "no event".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InterruptDescriptor {
    pub vector: u8,
    pub interruption_type: InterruptionType,
    pub error_code_valid: bool,
    /// NMI unblocking due to IRET (bit 12). Only meaningful on VM-exit; kept
    /// so that a decoded value encodes back to what the processor reported.
    pub nmi_unblocking: bool,
    pub valid: bool,
}

impl InterruptDescriptor {
    /// A valid event without an error code.
    pub const fn new(vector: u8, interruption_type: InterruptionType) -> Self {
        Self {
            vector,
            interruption_type,
            error_code_valid: false,
            nmi_unblocking: false,
            valid: true,
        }
    }

    pub const fn with_error_code(mut self) -> Self {
        self.error_code_valid = true;
        self
    }

    pub fn decode(raw: u32) -> Self {
        Self {
            vector: raw.get_bits(0..8) as u8,
            interruption_type: InterruptionType::from_bits(raw.get_bits(8..11)),
            error_code_valid: raw.get_bit(11),
            nmi_unblocking: raw.get_bit(12),
            valid: raw.get_bit(31),
        }
    }

    pub fn encode(&self) -> u32 {
        let mut raw = 0u32;
        raw.set_bits(0..8, u32::from(self.vector));
        raw.set_bits(8..11, self.interruption_type as u32);
        raw.set_bit(11, self.error_code_valid);
        raw.set_bit(12, self.nmi_unblocking);
        raw.set_bit(31, self.valid);
        raw
    }

    /// Whether this is the "no event" sentinel.
    pub fn is_empty(&self) -> bool {
        self.encode() == 0
    }

    pub fn is_external_interrupt(&self) -> bool {
        self.valid && self.interruption_type == InterruptionType::ExternalInterrupt
    }
}

impl fmt::Display for InterruptDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vector {:#04x} ({:?}", self.vector, self.interruption_type)?;
        if self.error_code_valid {
            f.write_str(", error code")?;
        }
        if !self.valid {
            f.write_str(", invalid")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_page_fault_with_error_code() {
        let trap = InterruptDescriptor::decode(0x8000_0b0e);

        assert_eq!(trap.vector, PAGE_FAULT_VECTOR);
        assert_eq!(trap.interruption_type, InterruptionType::HardwareException);
        assert!(trap.error_code_valid);
        assert!(trap.valid);
        assert!(!trap.nmi_unblocking);
    }

    #[test]
    fn encodes_external_interrupt() {
        let trap = InterruptDescriptor::new(0x30, InterruptionType::ExternalInterrupt);

        assert_eq!(trap.encode(), 0x8000_0030);
        assert!(trap.is_external_interrupt());
    }

    #[test]
    fn decoded_exit_information_encodes_back_unchanged() {
        // #BP from INT3 with NMI unblocking set.
        let raw = 0x8000_1603;
        assert_eq!(InterruptDescriptor::decode(raw).encode(), raw);
    }

    #[test]
    fn reserved_bits_are_dropped() {
        let trap = InterruptDescriptor::decode(0x8000_0030 | 0x0001_0000);
        assert_eq!(trap.encode(), 0x8000_0030);
    }

    #[test]
    fn zero_is_the_empty_sentinel() {
        assert!(InterruptDescriptor::decode(0).is_empty());
        assert!(!InterruptDescriptor::new(0, InterruptionType::HardwareException).is_empty());
    }

    #[test]
    fn invalid_event_is_not_an_external_interrupt() {
        let mut trap = InterruptDescriptor::new(0x30, InterruptionType::ExternalInterrupt);
        trap.valid = false;
        assert!(!trap.is_external_interrupt());

        let nmi = InterruptDescriptor::new(NMI_VECTOR, InterruptionType::NonMaskableInterrupt);
        assert!(!nmi.is_external_interrupt());
    }

    #[test]
    fn only_software_events_need_instruction_length() {
        assert!(InterruptionType::SoftwareException.needs_instruction_length());
        assert!(InterruptionType::PrivilegedSoftwareException.needs_instruction_length());
        assert!(InterruptionType::SoftwareInterrupt.needs_instruction_length());
        assert!(!InterruptionType::HardwareException.needs_instruction_length());
        assert!(!InterruptionType::ExternalInterrupt.needs_instruction_length());
    }

    #[test]
    fn display_names_vector_and_type() {
        let trap = InterruptDescriptor::decode(0x8000_0b0e);
        assert_eq!(
            trap.to_string(),
            "vector 0x0e (HardwareException, error code)"
        );
    }
}
