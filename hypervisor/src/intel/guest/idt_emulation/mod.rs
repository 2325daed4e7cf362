mod exception;
mod external_interrupt;
mod interrupt_window;
mod page_fault;

use crate::intel::guest::hooks::Hooks;

/// Emulates the guest's interrupt descriptor table delivery for the exits
/// caused by exceptions, NMIs and external interrupts.
///
/// Holds no per-core state. Every handler works on the `VirtualCpuState` and
/// control structure of the core that exited.
#[derive(Debug, Default)]
pub struct IdtEmulation {
    hooks: Hooks,
}

impl IdtEmulation {
    pub fn new(hooks: Hooks) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }
}
