//! An in-memory control structure that remembers every write in order, so
//! VM-exit handling can be exercised and inspected without VMX hardware.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::{ControlStructure, HypervisorError, VmInstructionFailure};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldAccess {
    Write { field: u32, value: u64 },
    WriteCr2(u64),
}

#[derive(Debug, Default, Clone)]
pub struct RecordingVmcs {
    fields: BTreeMap<u32, u64>,
    cr2: u64,
    writes: Vec<FieldAccess>,
    failing_field: Option<u32>,
}

impl RecordingVmcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets a field without recording it as a write.
    pub fn with_field(mut self, field: u32, value: u64) -> Self {
        self.set_field(field, value);
        self
    }

    /// Presets CR2 without recording it as a write.
    pub fn with_cr2(mut self, value: u64) -> Self {
        self.cr2 = value;
        self
    }

    pub fn set_field(&mut self, field: u32, value: u64) {
        self.fields.insert(field, value);
    }

    /// Makes every VMREAD and VMWRITE of `field` fail with VMfailValid.
    pub fn fail_on(&mut self, field: u32) {
        self.failing_field = Some(field);
    }

    /// Current value of a field. Fields never written read as zero.
    pub fn field(&self, field: u32) -> u64 {
        self.fields.get(&field).copied().unwrap_or_default()
    }

    pub fn cr2(&self) -> u64 {
        self.cr2
    }

    /// Every write since creation (or the last `clear_writes`), oldest first.
    pub fn writes(&self) -> &[FieldAccess] {
        &self.writes
    }

    /// Values written to `field`, oldest first.
    pub fn writes_to(&self, field: u32) -> Vec<u64> {
        self.writes
            .iter()
            .filter_map(|access| match *access {
                FieldAccess::Write { field: f, value } if f == field => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl ControlStructure for RecordingVmcs {
    fn read_field(&self, field: u32) -> Result<u64, HypervisorError> {
        if self.failing_field == Some(field) {
            return Err(HypervisorError::VmreadFailed {
                field,
                failure: VmInstructionFailure::Valid,
            });
        }
        Ok(self.field(field))
    }

    fn write_field(&mut self, field: u32, value: u64) -> Result<(), HypervisorError> {
        if self.failing_field == Some(field) {
            return Err(HypervisorError::VmwriteFailed {
                field,
                value,
                failure: VmInstructionFailure::Valid,
            });
        }
        self.fields.insert(field, value);
        self.writes.push(FieldAccess::Write { field, value });
        Ok(())
    }

    fn read_cr2(&self) -> u64 {
        self.cr2
    }

    fn write_cr2(&mut self, value: u64) {
        self.cr2 = value;
        self.writes.push(FieldAccess::WriteCr2(value));
    }
}
