//! Lock-free accumulation of rigid reaction forces.
//!
//! During the pressure pass many fluid particles may push on the same dynamic
//! rigid particle at once. Each reaction is added into a per-particle triple of
//! atomics so the scatter needs no locks; the pass merges the buffer into the
//! acceleration arrays once every fluid task has finished.

use std::sync::atomic::{AtomicU32, Ordering};

/// Per-particle `[f32; 3]` accumulator with atomic `add`.
///
/// Floats are stored as their bit patterns in `AtomicU32` and updated with a
/// compare-exchange loop. Summation order across threads is unspecified, so
/// results are reproducible only up to floating-point reassociation.
#[derive(Debug, Default)]
pub struct ReactionAccumulator {
    slots: Vec<[AtomicU32; 3]>,
}

impl ReactionAccumulator {
    /// Create an accumulator with `n` zeroed slots.
    pub fn new(n: usize) -> Self {
        let mut acc = Self::default();
        acc.reset(n);
        acc
    }

    /// Resize to `n` slots and zero all of them.
    pub fn reset(&mut self, n: usize) {
        self.slots.resize_with(n, Default::default);
        for slot in &mut self.slots {
            for component in slot.iter_mut() {
                *component.get_mut() = 0.0_f32.to_bits();
            }
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Atomically add `value` into slot `index`.
    pub fn add(&self, index: usize, value: [f32; 3]) {
        for (component, v) in self.slots[index].iter().zip(value) {
            if v != 0.0 {
                atomic_add_f32(component, v);
            }
        }
    }

    /// Current sum stored in slot `index`.
    pub fn get(&self, index: usize) -> [f32; 3] {
        let [x, y, z] = &self.slots[index];
        [
            f32::from_bits(x.load(Ordering::Relaxed)),
            f32::from_bits(y.load(Ordering::Relaxed)),
            f32::from_bits(z.load(Ordering::Relaxed)),
        ]
    }
}

fn atomic_add_f32(cell: &AtomicU32, value: f32) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(observed) => current = observed,
        }
    }
}
