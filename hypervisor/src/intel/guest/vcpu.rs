use crate::intel::guest::pending::PendingInterrupts;

/// Interrupt-delivery state of one logical processor.
///
/// Only ever touched from that processor's VM-exit loop.
#[derive(derivative::Derivative)]
#[derivative(Debug, Default)]
pub struct VirtualCpuState {
    core_id: usize,

    pending_external_interrupts: PendingInterrupts,

    /// The guest is being stepped with interrupts queued rather than
    /// delivered.
    pub enable_external_interrupts_on_continue: bool,

    /// Same as `enable_external_interrupts_on_continue`, for stepping with
    /// the monitor trap flag.
    pub enable_external_interrupts_on_continue_mtf: bool,

    /// A breakpoint is due on the next monitor-trap-flag exit.
    pub register_break_on_mtf: bool,

    #[derivative(Default(value = "true"))]
    increment_rip: bool,
}

impl VirtualCpuState {
    pub fn new(core_id: usize) -> Self {
        Self {
            core_id,
            ..Self::default()
        }
    }

    pub fn core_id(&self) -> usize {
        self.core_id
    }

    pub fn pending_interrupts(&self) -> &PendingInterrupts {
        &self.pending_external_interrupts
    }

    pub fn pending_interrupts_mut(&mut self) -> &mut PendingInterrupts {
        &mut self.pending_external_interrupts
    }

    /// Whether external interrupts are being held back for a step.
    pub fn is_instrumentation_stepping(&self) -> bool {
        self.enable_external_interrupts_on_continue || self.enable_external_interrupts_on_continue_mtf
    }

    /// NMIs arriving while any stepping flag is set are dropped.
    pub fn suppresses_nmi(&self) -> bool {
        self.is_instrumentation_stepping() || self.register_break_on_mtf
    }

    /// Resets per-exit state. Called by the exit loop before dispatching.
    pub fn begin_exit(&mut self) {
        self.increment_rip = true;
    }

    /// Keeps guest RIP where it is when this exit completes.
    pub fn suppress_rip_increment(&mut self) {
        self.increment_rip = false;
    }

    pub fn should_increment_rip(&self) -> bool {
        self.increment_rip
    }
}
