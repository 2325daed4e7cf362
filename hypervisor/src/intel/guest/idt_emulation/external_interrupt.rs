use kernelutils::{ControlStructure, HypervisorError};

use super::IdtEmulation;
use crate::intel::guest::events;
use crate::intel::guest::raw::InterruptDescriptor;
use crate::intel::guest::support::{is_guest_interruptible, set_interrupt_window_exiting};
use crate::intel::guest::vcpu::VirtualCpuState;

impl IdtEmulation {
    /// Handles an "external interrupt" exit.
    ///
    /// While the guest is stepped the interrupt is parked without arming the
    /// window. Otherwise it is injected if the guest can take it now, or
    /// parked until the interrupt window opens.
    pub fn handle_external_interrupt<H: ControlStructure>(
        &self,
        vcpu: &mut VirtualCpuState,
        hw: &mut H,
        trap: InterruptDescriptor,
    ) -> Result<(), HypervisorError> {
        if vcpu.is_instrumentation_stepping() {
            defer_interrupt(vcpu, trap);
            vcpu.suppress_rip_increment();
        } else if trap.is_external_interrupt() {
            if is_guest_interruptible(hw)? {
                events::reinject(hw, trap)?;
            } else {
                defer_interrupt(vcpu, trap);
                set_interrupt_window_exiting(hw, true)?;
                log::trace!("Interrupt window exiting armed on core {}", vcpu.core_id());
            }
            vcpu.suppress_rip_increment();
        } else {
            log::error!(
                "External-interrupt exit on core {} carries {trap}, which is not an external interrupt",
                vcpu.core_id()
            );
        }

        Ok(())
    }
}

/// Parks `trap` in the core's queue. A full queue drops it.
fn defer_interrupt(vcpu: &mut VirtualCpuState, trap: InterruptDescriptor) {
    let core_id = vcpu.core_id();
    match vcpu.pending_interrupts_mut().enqueue(trap) {
        Ok(slot) => log::trace!("Deferred {trap} to slot {slot} on core {core_id}"),
        Err(e) => log::warn!("Dropping {trap} on core {core_id}: {e}"),
    }
}
