use alloc::vec::Vec;

use kernelutils::ControlStructure;

use crate::config::{HypervisorConfig, MAX_PROCESSORS};
use crate::intel::guest::hooks::Hooks;
use crate::intel::guest::idt_emulation::IdtEmulation;
use crate::intel::guest::support::error::SessionError;
use crate::intel::guest::vcpu::VirtualCpuState;
use crate::intel::vmexit::VmExitReason;

/// Per-core state indexed by core id.
#[derive(Debug, Default, derive_deref::Deref, derive_deref::DerefMut)]
pub struct VcpuTable {
    data: Vec<VirtualCpuState>,
}

impl VcpuTable {
    pub fn new(processor_count: usize) -> Self {
        Self {
            data: (0..processor_count).map(VirtualCpuState::new).collect(),
        }
    }
}

/// Interrupt delivery for every processor, from virtualization start to stop.
#[derive(Debug)]
pub struct HypervisorSession {
    config: HypervisorConfig,
    emulation: IdtEmulation,
    vcpus: VcpuTable,
    running: bool,
}

impl HypervisorSession {
    pub fn start(config: HypervisorConfig, hooks: Hooks) -> Result<Self, SessionError> {
        match config.processor_count {
            0 => return Err(SessionError::NoProcessors),
            count if count > MAX_PROCESSORS => {
                return Err(SessionError::TooManyProcessors {
                    requested: count,
                    max: MAX_PROCESSORS,
                })
            }
            _ => {}
        }

        log::set_max_level(config.max_log_level);
        log::info!("Starting interrupt delivery on {} processors", config.processor_count);

        Ok(Self {
            config,
            emulation: IdtEmulation::new(hooks),
            vcpus: VcpuTable::new(config.processor_count),
            running: true,
        })
    }

    /// Drops all per-core state. Interrupts still parked are lost.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        for vcpu in self.vcpus.iter() {
            let pending = vcpu.pending_interrupts().len();
            if pending != 0 {
                log::warn!(
                    "Core {} stopped with {pending} undelivered interrupts",
                    vcpu.core_id()
                );
            }
        }
        self.vcpus.clear();
        self.running = false;
        log::info!("Stopped interrupt delivery");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &HypervisorConfig {
        &self.config
    }

    pub fn emulation(&self) -> &IdtEmulation {
        &self.emulation
    }

    pub fn vcpu(&self, core_id: usize) -> Result<&VirtualCpuState, SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        self.vcpus
            .get(core_id)
            .ok_or(SessionError::UnknownCore { core_id })
    }

    pub fn vcpu_mut(&mut self, core_id: usize) -> Result<&mut VirtualCpuState, SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        self.vcpus
            .get_mut(core_id)
            .ok_or(SessionError::UnknownCore { core_id })
    }

    /// Resets per-exit state on `core_id`. For exits handled outside
    /// [`HypervisorSession::handle_vmexit`].
    pub fn begin_exit(&mut self, core_id: usize) -> Result<(), SessionError> {
        self.vcpu_mut(core_id)?.begin_exit();
        Ok(())
    }

    /// Handles one VM-exit on `core_id` and returns whether the exit loop
    /// should advance guest RIP past the exiting instruction.
    pub fn handle_vmexit<H: ControlStructure>(
        &mut self,
        core_id: usize,
        hw: &mut H,
        reason: VmExitReason,
    ) -> Result<bool, SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        let vcpu = self
            .vcpus
            .data
            .get_mut(core_id)
            .ok_or(SessionError::UnknownCore { core_id })?;

        vcpu.begin_exit();
        self.emulation.handle_vmexit(vcpu, hw, reason)?;
        Ok(vcpu.should_increment_rip())
    }

    pub fn end_instrumentation_step<H: ControlStructure>(
        &mut self,
        core_id: usize,
        hw: &mut H,
    ) -> Result<(), SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        let vcpu = self
            .vcpus
            .data
            .get_mut(core_id)
            .ok_or(SessionError::UnknownCore { core_id })?;

        self.emulation.end_instrumentation_step(vcpu, hw)?;
        Ok(())
    }
}

impl Drop for HypervisorSession {
    fn drop(&mut self) {
        self.stop();
    }
}
