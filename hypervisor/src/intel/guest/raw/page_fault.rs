use bit_field::BitField;
use core::fmt;

/// The error code pushed by #PF.
///
/// See: Figure 4-12. Page-Fault Error Code
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct PageFaultErrorCode(pub u32);

impl PageFaultErrorCode {
    pub fn present(self) -> bool {
        self.0.get_bit(0)
    }

    pub fn write(self) -> bool {
        self.0.get_bit(1)
    }

    pub fn user(self) -> bool {
        self.0.get_bit(2)
    }

    pub fn reserved_bit(self) -> bool {
        self.0.get_bit(3)
    }

    pub fn instruction_fetch(self) -> bool {
        self.0.get_bit(4)
    }

    pub fn protection_key(self) -> bool {
        self.0.get_bit(5)
    }
}

impl From<u32> for PageFaultErrorCode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for PageFaultErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFaultErrorCode")
            .field("raw", &format_args!("{:#x}", self.0))
            .field("present", &self.present())
            .field("write", &self.write())
            .field("user", &self.user())
            .field("reserved_bit", &self.reserved_bit())
            .field("instruction_fetch", &self.instruction_fetch())
            .field("protection_key", &self.protection_key())
            .finish()
    }
}

/// A page fault about to be delivered to the guest.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageFaultContext {
    /// Faulting linear address. Lands in the guest's CR2.
    pub address: u64,
    pub error_code: PageFaultErrorCode,
}
