use core::fmt;

use crate::config::PENDING_INTERRUPTS_BUFFER_CAPACITY;
use crate::intel::guest::raw::InterruptDescriptor;

#[derive(thiserror_no_std::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PendingQueueError {
    #[error("all {capacity} pending-interrupt slots are occupied")]
    Full { capacity: usize },

    #[error("an empty interrupt descriptor cannot be queued")]
    EmptyDescriptor,
}

/// Interrupts held back until the guest can take them.
///
/// A fixed array of slots. `enqueue` fills the lowest free slot and
/// `dequeue_one` drains the lowest occupied one, so delivery order follows
/// slot index rather than arrival time once slots have been recycled.
pub struct PendingInterrupts<const N: usize = PENDING_INTERRUPTS_BUFFER_CAPACITY> {
    slots: [Option<InterruptDescriptor>; N],
}

impl<const N: usize> PendingInterrupts<N> {
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// Stores `descriptor` in the first free slot and returns its index.
    /// Leaves the queue untouched on failure.
    pub fn enqueue(&mut self, descriptor: InterruptDescriptor) -> Result<usize, PendingQueueError> {
        if descriptor.is_empty() {
            return Err(PendingQueueError::EmptyDescriptor);
        }

        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(PendingQueueError::Full { capacity: N })?;
        *slot = Some(descriptor);
        Ok(index)
    }

    /// Removes and returns the descriptor in the lowest occupied slot.
    pub fn dequeue_one(&mut self) -> Option<InterruptDescriptor> {
        self.slots.iter_mut().find_map(Option::take)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn slot(&self, index: usize) -> Option<InterruptDescriptor> {
        self.slots.get(index).copied().flatten()
    }

    pub fn clear(&mut self) {
        self.slots = [None; N];
    }
}

impl<const N: usize> Default for PendingInterrupts<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for PendingInterrupts<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .enumerate()
                    .filter_map(|(index, slot)| slot.map(|descriptor| (index, descriptor))),
            )
            .finish()
    }
}
