//! Synchronous and asynchronous MPC drivers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use log::{debug, trace, warn};
use nalgebra::{DVector, Matrix3x4};

use super::{MpcDims, MpcError, MpcResult, ResultSlot, SolverOutput};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An MPC solver.
pub trait MpcSolver: Send {
    /// Dimensions of the results this solver produces.
    fn dims(&self) -> MpcDims;

    /// Solve the problem for one input.
    fn solve(&mut self, input: &SolverInput) -> Result<SolverOutput, MpcError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Data the solver needs for one solve.
#[derive(Debug, Clone)]
pub struct SolverInput {
    /// Control tick the request was made on
    pub k: usize,

    /// Current state estimate
    pub x0: DVector<f64>,

    /// Planned footsteps.
    ///
    /// Units: meters,
    /// Frame: World
    pub footsteps_m: Matrix3x4<f64>,

    /// The previous solution, filled in by the wrapper when one exists.
    pub warm_start: Option<WarmStart>,
}

/// Previous trajectories used to initialise a solve.
#[derive(Debug, Clone)]
pub struct WarmStart {
    pub xs: Vec<DVector<f64>>,
    pub us: Vec<DVector<f64>>,
}

/// Drives a solver and hands its results to the control loop.
///
/// In asynchronous mode requests go to a worker thread and the control loop
/// never waits for the solver. `get_latest_result` then returns the previous
/// result, flagged as not new, until the worker publishes a fresh one.
pub struct MpcWrapper {
    dims: MpcDims,

    slot: Arc<ResultSlot>,

    last_available_result: MpcResult,

    /// Sequence number of `last_available_result`, 0 before any result.
    last_seq: u64,

    backend: Backend,

    num_requests: u64,
}

/// A running worker thread.
struct Worker {
    sender: Sender<WorkerSignal>,
    jh: JoinHandle<Result<(), MpcError>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// The worker should stop
    Stop,

    /// Solve for this input
    NewData(Box<SolverInput>),
}

enum Backend {
    Synchronous(Box<dyn MpcSolver>),
    Asynchronous(Worker),
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MpcWrapper {
    /// Create a new wrapper around a solver, starting the worker thread if
    /// `asynchronous` is set.
    pub fn new(solver: Box<dyn MpcSolver>, asynchronous: bool) -> Result<Self, MpcError> {
        let dims = solver.dims();
        let slot = Arc::new(ResultSlot::new());

        let backend = if asynchronous {
            let (sender, receiver) = channel();
            let worker_slot = slot.clone();

            let jh = thread::Builder::new()
                .name("mpc::worker".into())
                .spawn(move || worker_thread(solver, dims, worker_slot, receiver))
                .map_err(MpcError::WorkerSpawnError)?;

            Backend::Asynchronous(Worker { sender, jh })
        } else {
            Backend::Synchronous(solver)
        };

        debug!(
            "MpcWrapper started in {} mode with {:?}",
            if asynchronous { "asynchronous" } else { "synchronous" },
            dims
        );

        Ok(Self {
            dims,
            slot,
            last_available_result: MpcResult::zeros(dims),
            last_seq: 0,
            backend,
            num_requests: 0,
        })
    }

    /// Request a solve.
    ///
    /// Synchronous wrappers solve before returning, asynchronous ones only
    /// queue the request. The previous solution is attached as a warm start.
    pub fn solve(&mut self, mut input: SolverInput) -> Result<(), MpcError> {
        if self.last_seq > 0 {
            input.warm_start = Some(WarmStart {
                xs: self.last_available_result.xs().to_vec(),
                us: self.last_available_result.us().to_vec(),
            });
        }
        self.num_requests += 1;

        match self.backend {
            Backend::Synchronous(ref mut solver) => {
                let start = Instant::now();
                let output = solver.solve(&input)?;
                let result =
                    MpcResult::from_output(self.dims, output, start.elapsed().as_secs_f64())?;
                let seq = self.slot.publish(result);
                trace!("MPC result {} published for k = {}", seq, input.k);
                Ok(())
            }
            Backend::Asynchronous(ref worker) => worker
                .sender
                .send(WorkerSignal::NewData(Box::new(input)))
                .map_err(|_| MpcError::WorkerStopped),
            Backend::Stopped => Err(MpcError::WorkerStopped),
        }
    }

    /// Get the latest available result.
    ///
    /// If a result was published since the last call it becomes the latest
    /// available result and is flagged as new. Otherwise the previous result
    /// is returned flagged as not new.
    pub fn get_latest_result(&mut self) -> &MpcResult {
        match self.slot.load() {
            Some(p) if p.seq != self.last_seq => {
                self.last_available_result.clone_from(&p.result);
                self.last_available_result.set_new_result(true);
                self.last_seq = p.seq;
            }
            _ => self.last_available_result.set_new_result(false),
        }

        &self.last_available_result
    }

    /// Stop the worker thread, if there is one, and wait for it to exit.
    ///
    /// Further calls to `solve` will fail.
    pub fn stop(&mut self) -> Result<(), MpcError> {
        match std::mem::replace(&mut self.backend, Backend::Stopped) {
            Backend::Asynchronous(worker) => {
                // The worker may already have exited, join reports why
                let _ = worker.sender.send(WorkerSignal::Stop);
                match worker.jh.join() {
                    Ok(r) => r,
                    Err(_) => Err(MpcError::WorkerPanicked),
                }
            }
            _ => Ok(()),
        }
    }

    pub fn dims(&self) -> &MpcDims {
        &self.dims
    }

    pub fn is_asynchronous(&self) -> bool {
        matches!(self.backend, Backend::Asynchronous(_))
    }

    /// Number of solves requested.
    pub fn num_requests(&self) -> u64 {
        self.num_requests
    }

    /// Number of results published by the solver.
    pub fn num_published(&self) -> u64 {
        self.slot.latest_seq()
    }
}

impl Drop for MpcWrapper {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("MPC worker did not stop cleanly: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn worker_thread(
    mut solver: Box<dyn MpcSolver>,
    dims: MpcDims,
    slot: Arc<ResultSlot>,
    receiver: Receiver<WorkerSignal>,
) -> Result<(), MpcError> {
    // Wait for requests from the control loop
    while let Ok(signal) = receiver.recv() {
        let mut input = match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::NewData(i) => i,
        };

        // Only the most recent request is worth solving
        let mut stop = false;
        while let Ok(signal) = receiver.try_recv() {
            match signal {
                WorkerSignal::Stop => {
                    stop = true;
                    break;
                }
                WorkerSignal::NewData(i) => {
                    trace!("Dropping superseded MPC request for k = {}", input.k);
                    input = i;
                }
            }
        }
        if stop {
            break;
        }

        let start = Instant::now();
        let result = solver
            .solve(&input)
            .and_then(|o| MpcResult::from_output(dims, o, start.elapsed().as_secs_f64()));

        match result {
            Ok(r) => {
                let seq = slot.publish(r);
                trace!("MPC result {} published for k = {}", seq, input.k);
            }
            Err(e) => warn!("MPC solve for k = {} failed: {}", input.k, e),
        }
    }

    debug!("MPC worker exiting");

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        gait::{Gait, GaitType},
        mpc::HoldSolver,
    };
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    fn dims() -> MpcDims {
        MpcDims::new(4, 3, 2, 3, 2).unwrap()
    }

    fn hold() -> HoldSolver {
        let gait = Gait::from_type(GaitType::Trot, 5, 4, 0.02).unwrap();
        HoldSolver::new(dims(), gait).unwrap()
    }

    fn input(k: usize, x: f64) -> SolverInput {
        SolverInput {
            k,
            x0: DVector::from_element(3, x),
            footsteps_m: Matrix3x4::zeros(),
            warm_start: None,
        }
    }

    /// Poll until a new result arrives or give up after two seconds.
    fn wait_for_new(wrapper: &mut MpcWrapper) -> Option<MpcResult> {
        for _ in 0..2000 {
            let r = wrapper.get_latest_result();
            if r.new_result() {
                return Some(r.clone());
            }
            thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn test_sync_fresh_then_stale() {
        let mut wrapper = MpcWrapper::new(Box::new(hold()), false).unwrap();
        assert!(!wrapper.is_asynchronous());

        // Nothing solved yet, zeroed and not new
        let r = wrapper.get_latest_result();
        assert!(!r.new_result());
        assert!(r.xs()[0].iter().all(|&v| v == 0.0));

        wrapper.solve(input(0, 1.5)).unwrap();
        let fresh = wrapper.get_latest_result().clone();
        assert!(fresh.new_result());
        assert_eq!(fresh.xs()[0][0], 1.5);
        assert_eq!(fresh.num_iters(), 1);

        // Same data again, but stale
        let stale = wrapper.get_latest_result().clone();
        assert!(!stale.new_result());
        assert_eq!(stale.xs(), fresh.xs());
        assert_eq!(stale.gait(), fresh.gait());
    }

    #[test]
    fn test_async_publishes() {
        let mut wrapper = MpcWrapper::new(Box::new(hold()), true).unwrap();
        assert!(wrapper.is_asynchronous());

        wrapper.solve(input(0, 2.0)).unwrap();
        let r = wrapper_result(&mut wrapper);
        assert_eq!(r.xs()[0][0], 2.0);
        assert!(!wrapper.get_latest_result().new_result());

        wrapper.stop().unwrap();
        assert!(matches!(wrapper.solve(input(1, 0.0)), Err(MpcError::WorkerStopped)));
    }

    fn wrapper_result(wrapper: &mut MpcWrapper) -> MpcResult {
        match wait_for_new(wrapper) {
            Some(r) => r,
            None => panic!("No result published"),
        }
    }

    #[test]
    fn test_async_stale_while_solving() {
        let solver = hold().with_delay(Duration::from_millis(50));
        let mut wrapper = MpcWrapper::new(Box::new(solver), true).unwrap();

        wrapper.solve(input(0, 1.0)).unwrap();
        let first = wrapper_result(&mut wrapper);
        assert_eq!(first.xs()[0][0], 1.0);

        // Queue several requests while the worker is busy, the control loop
        // keeps getting the stale result and the last request wins
        for k in 1..=5 {
            wrapper.solve(input(k, k as f64)).unwrap();
            let r = wrapper.get_latest_result();
            if !r.new_result() {
                assert_eq!(r.xs(), first.xs());
            }
        }

        let mut latest = first;
        for _ in 0..50 {
            if latest.xs()[0][0] == 5.0 {
                break;
            }
            latest = wrapper_result(&mut wrapper);
        }
        assert_eq!(latest.xs()[0][0], 5.0);
        assert!(wrapper.num_published() < wrapper.num_requests());
    }

    /// Fails on demand and records whether a warm start was given.
    struct FlakySolver {
        inner: HoldSolver,
        fail: Arc<AtomicBool>,
        warm_started: Arc<AtomicBool>,
    }

    impl MpcSolver for FlakySolver {
        fn dims(&self) -> MpcDims {
            self.inner.dims()
        }

        fn solve(&mut self, input: &SolverInput) -> Result<SolverOutput, MpcError> {
            self.warm_started.store(input.warm_start.is_some(), Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(MpcError::SolverFailed("did not converge".into()));
            }
            self.inner.solve(input)
        }
    }

    #[test]
    fn test_sync_failure_keeps_stale_result() {
        let fail = Arc::new(AtomicBool::new(false));
        let warm_started = Arc::new(AtomicBool::new(false));
        let solver = FlakySolver {
            inner: hold(),
            fail: fail.clone(),
            warm_started: warm_started.clone(),
        };
        let mut wrapper = MpcWrapper::new(Box::new(solver), false).unwrap();

        wrapper.solve(input(0, 3.0)).unwrap();
        assert!(!warm_started.load(Ordering::SeqCst));
        assert!(wrapper.get_latest_result().new_result());

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            wrapper.solve(input(1, 4.0)),
            Err(MpcError::SolverFailed(_))
        ));
        assert!(warm_started.load(Ordering::SeqCst));

        let r = wrapper.get_latest_result();
        assert!(!r.new_result());
        assert_eq!(r.xs()[0][0], 3.0);
    }
}
