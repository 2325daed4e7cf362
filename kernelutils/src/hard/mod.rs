#[cfg(any(test, feature = "recording"))]
pub mod recording;

use crate::HypervisorError;

/// Field-level access to the virtual machine control structure that is
/// current on this logical processor, plus the guest control registers VMX
/// does not switch on VM-entry and VM-exit.
///
/// Every access is synchronous and core-local. Implementations are never
/// shared between processors.
pub trait ControlStructure {
    /// Reads a VMCS field. `field` is the field encoding (Appendix B, Intel SDM Vol. 3D).
    fn read_field(&self, field: u32) -> Result<u64, HypervisorError>;

    /// Writes a VMCS field.
    fn write_field(&mut self, field: u32, value: u64) -> Result<(), HypervisorError>;

    /// Reads CR2. VMX does not save or load CR2, so while handling a VM-exit
    /// this is the guest's value.
    fn read_cr2(&self) -> u64;

    fn write_cr2(&mut self, value: u64);

    /// Reads a 32-bit field. The upper half of the natural-width read is zero
    /// for these fields.
    fn read_field32(&self, field: u32) -> Result<u32, HypervisorError> {
        self.read_field(field).map(|value| value as u32)
    }
}

/// The VMCS loaded on the current processor, accessed with VMREAD/VMWRITE.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct ActiveVmcs {
    // VMREAD/VMWRITE only reach the VMCS current on this processor.
    _not_send: core::marker::PhantomData<*const ()>,
}

#[cfg(target_arch = "x86_64")]
impl ActiveVmcs {
    /// # Safety
    ///
    /// The processor must be in VMX root operation with a current VMCS, and
    /// the returned value must not outlive that VMCS being current.
    pub unsafe fn current() -> Self {
        Self {
            _not_send: core::marker::PhantomData,
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl ControlStructure for ActiveVmcs {
    fn read_field(&self, field: u32) -> Result<u64, HypervisorError> {
        // Safety: `current` requires VMX root operation with a current VMCS.
        unsafe { x86::bits64::vmx::vmread(field) }.map_err(|fail| {
            HypervisorError::VmreadFailed {
                field,
                failure: fail.into(),
            }
        })
    }

    fn write_field(&mut self, field: u32, value: u64) -> Result<(), HypervisorError> {
        // Safety: `current` requires VMX root operation with a current VMCS.
        unsafe { x86::bits64::vmx::vmwrite(field, value) }.map_err(|fail| {
            log::error!("VMWRITE {field:#06x} <= {value:#x} failed: {fail:?}");
            HypervisorError::VmwriteFailed {
                field,
                value,
                failure: fail.into(),
            }
        })
    }

    fn read_cr2(&self) -> u64 {
        unsafe { x86::controlregs::cr2() as u64 }
    }

    fn write_cr2(&mut self, value: u64) {
        unsafe { x86::controlregs::cr2_write(value) };
    }
}
