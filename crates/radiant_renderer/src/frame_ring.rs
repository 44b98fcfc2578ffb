use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

struct Slot<T> {
    data: T,
    /// Cleared on submit, set again once the GPU finished that submission.
    idle: Arc<AtomicBool>,
}

/// `N` copies of the per-frame-mutated GPU state, used round-robin.
///
/// A slot is only handed out once the work last submitted from it completed.
pub struct FrameRing<T> {
    slots: Vec<Slot<T>>,
    cursor: usize,
}

impl<T> FrameRing<T> {
    pub fn new(len: usize, mut make: impl FnMut(usize) -> T) -> Self {
        Self {
            slots: (0..len.max(1))
                .map(|i| Slot {
                    data: make(i),
                    idle: Arc::new(AtomicBool::new(true)),
                })
                .collect(),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    /// Whether the current slot may be written.
    pub fn is_ready(&self) -> bool {
        self.slots[self.cursor].idle.load(Ordering::Acquire)
    }

    /// The current slot, if its previous work completed.
    pub fn acquire(&self) -> Option<&T> {
        self.is_ready().then(|| &self.slots[self.cursor].data)
    }

    /// Marks the current slot in flight and moves to the next one.
    ///
    /// The returned flag must be set once the GPU finished the submission.
    pub fn submit(&mut self) -> Arc<AtomicBool> {
        let idle = Arc::clone(&self.slots[self.cursor].idle);
        idle.store(false, Ordering::Release);
        self.cursor = (self.cursor + 1) % self.slots.len();
        idle
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().map(|s| &s.data)
    }
}
