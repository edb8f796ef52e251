//! Lock-free handoff of MPC results between threads
//!
//! The solver side publishes a complete `MpcResult` with a single atomic
//! pointer swap, the control loop loads the pointer. A reader therefore sees
//! either the previous result or the new one, never a mix of the two.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use arc_swap::ArcSwapOption;

use super::MpcResult;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A published result and its sequence number.
#[derive(Debug)]
pub struct Published {
    /// Starts at 1 and increases by one for every publish.
    pub seq: u64,
    pub result: MpcResult,
}

/// Single slot holding the most recently published result.
#[derive(Debug, Default)]
pub struct ResultSlot {
    latest: ArcSwapOption<Published>,
    next_seq: AtomicU64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a result, replacing the previous one. Returns its sequence
    /// number.
    pub fn publish(&self, result: MpcResult) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.latest.store(Some(Arc::new(Published { seq, result })));
        seq
    }

    /// The most recently published result, if any.
    pub fn load(&self) -> Option<Arc<Published>> {
        self.latest.load_full()
    }

    /// Sequence number of the latest publish, 0 if nothing was published.
    pub fn latest_seq(&self) -> u64 {
        self.load().map(|p| p.seq).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpc::{MpcDims, SolverOutput};
    use nalgebra::{DMatrix, DVector};
    use std::thread;

    fn filled(dims: MpcDims, value: f64) -> MpcResult {
        MpcResult::from_output(
            dims,
            SolverOutput {
                gait: DMatrix::from_element(dims.horizon + 1, 4, 1),
                xs: vec![DVector::from_element(dims.nx, value); dims.horizon + 1],
                us: vec![DVector::from_element(dims.nu, value); dims.horizon],
                ks: vec![DMatrix::from_element(dims.nu, dims.ndx, value); dims.window_size],
                num_iters: value as u32,
            },
            value,
        )
        .unwrap()
    }

    #[test]
    fn test_publish_load() {
        let slot = ResultSlot::new();
        assert!(slot.load().is_none());
        assert_eq!(slot.latest_seq(), 0);

        let dims = MpcDims::new(3, 2, 1, 2, 3).unwrap();
        assert_eq!(slot.publish(filled(dims, 1.0)), 1);
        assert_eq!(slot.publish(filled(dims, 2.0)), 2);

        let p = slot.load().unwrap();
        assert_eq!(p.seq, 2);
        assert_eq!(p.result.num_iters(), 2);
    }

    #[test]
    fn test_reader_never_sees_mixed_fields() {
        let slot = Arc::new(ResultSlot::new());
        let dims = MpcDims::new(8, 6, 3, 6, 4).unwrap();

        let writer_slot = slot.clone();
        let writer = thread::spawn(move || {
            for i in 1..=500 {
                writer_slot.publish(filled(dims, i as f64));
            }
        });

        let mut last_seq = 0;
        while last_seq < 500 {
            if let Some(p) = slot.load() {
                assert!(p.seq >= last_seq);
                last_seq = p.seq;

                // Every field must come from the same publish
                let v = p.result.solving_duration_s();
                assert_eq!(p.result.num_iters(), v as u32);
                assert!(p.result.xs().iter().flatten().all(|&x| x == v));
                assert!(p.result.us().iter().flatten().all(|&u| u == v));
                assert!(p.result.ks().iter().flatten().all(|&k| k == v));
            }
        }

        writer.join().unwrap();
    }
}
