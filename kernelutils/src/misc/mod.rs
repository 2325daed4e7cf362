/// How a VMX instruction reported failure.
///
/// See: 31.2 Conventions (Intel SDM Vol. 3C)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VmInstructionFailure {
    /// VMfailValid: a current VMCS exists and holds the error number.
    Valid,
    /// VMfailInvalid: there is no current VMCS.
    Invalid,
}

#[cfg(target_arch = "x86_64")]
impl From<x86::vmx::VmFail> for VmInstructionFailure {
    fn from(fail: x86::vmx::VmFail) -> Self {
        match fail {
            x86::vmx::VmFail::VmFailValid => Self::Valid,
            x86::vmx::VmFail::VmFailInvalid => Self::Invalid,
        }
    }
}

#[derive(thiserror_no_std::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum HypervisorError {
    #[error("VMREAD of field {field:#06x} failed: {failure:?}")]
    VmreadFailed {
        field: u32,
        failure: VmInstructionFailure,
    },

    #[error("VMWRITE of {value:#x} to field {field:#06x} failed: {failure:?}")]
    VmwriteFailed {
        field: u32,
        value: u64,
        failure: VmInstructionFailure,
    },
}
