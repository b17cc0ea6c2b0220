// src/kernel/smp/runner.rs
//! Per-Core Event Loop
//!
//! Every core runs one `CoreRunner` over the shared substrate. The runner
//! drains the core's deferred work until none is left, then parks on the
//! core's doorbell until a remote core rings it.
//!
//! # States
//!
//! ```text
//! Stopped ──run()──► Running ──no work──► Idle
//!                       ▲                   │
//!                       └──── doorbell ─────┘
//! stop() ──► Stopping ──► Stopped
//! ```

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use super::substrate::Substrate;
use crate::errors::SubstrateError;
use crate::kernel::core::types::CpuId;

/// Runner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    /// Not running
    Stopped = 0,
    /// Processing deferred work
    Running = 1,
    /// Waiting on the doorbell
    Idle = 2,
    /// Stop requested
    Stopping = 3,
}

impl From<u8> for RunnerState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Idle,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Event loop of one core
pub struct CoreRunner {
    substrate: Arc<dyn Substrate>,
    cpu: CpuId,
    state: AtomicU8,
    /// Handlers run
    handled: AtomicU64,
    /// Doorbell wake-ups consumed
    wakeups: AtomicU64,
    /// Passes that found no work
    idle_passes: AtomicU64,
}

impl CoreRunner {
    /// Create the runner for `cpu`
    ///
    /// # Errors
    ///
    /// `SubstrateError::CpuOutOfRange` if the substrate has no slot for `cpu`.
    pub fn new(substrate: Arc<dyn Substrate>, cpu: CpuId) -> Result<Self, SubstrateError> {
        if cpu.index() >= substrate.cpu_count() {
            return Err(SubstrateError::CpuOutOfRange);
        }
        Ok(Self {
            substrate,
            cpu,
            state: AtomicU8::new(RunnerState::Stopped as u8),
            handled: AtomicU64::new(0),
            wakeups: AtomicU64::new(0),
            idle_passes: AtomicU64::new(0),
        })
    }

    /// CPU this runner serves
    #[inline]
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    /// Current state
    pub fn state(&self) -> RunnerState {
        RunnerState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RunnerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn stopping(&self) -> bool {
        self.state() == RunnerState::Stopping
    }

    /// Claim the loop; `false` if it must not run
    ///
    /// A stop requested before the loop started is consumed here.
    fn enter(&self) -> bool {
        match self.state.compare_exchange(
            RunnerState::Stopped as u8,
            RunnerState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(prev) => {
                if RunnerState::from(prev) == RunnerState::Stopping {
                    self.set_state(RunnerState::Stopped);
                    log::debug!("[SMP] CPU {} runner stopped before start", self.cpu);
                } else {
                    log::warn!("[SMP] CPU {} runner already active", self.cpu);
                }
                false
            }
        }
    }

    /// Run deferred work until none is pending
    ///
    /// Returns the number of handlers run.
    pub fn run_until_idle(&self) -> usize {
        if let Some(doorbell) = self.substrate.doorbell(self.cpu) {
            let rings = doorbell.check_and_clear();
            if rings > 0 {
                self.wakeups.fetch_add(u64::from(rings), Ordering::Relaxed);
            }
        }

        let mut total = 0;
        loop {
            let ran = self.substrate.process(self.cpu);
            total += ran;
            if ran == 0 && !self.substrate.has_pending(self.cpu) {
                break;
            }
        }

        if total == 0 {
            self.idle_passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.handled.fetch_add(total as u64, Ordering::Relaxed);
        }
        total
    }

    /// Loop until `stop()`, parking on the doorbell between bursts
    pub async fn run(&self) {
        if !self.enter() {
            return;
        }
        log::debug!("[SMP] CPU {} runner started", self.cpu);

        let Some(doorbell) = self.substrate.doorbell(self.cpu) else {
            self.set_state(RunnerState::Stopped);
            return;
        };

        while !self.stopping() {
            self.run_until_idle();
            if self.stopping() {
                break;
            }

            let _ = self.state.compare_exchange(
                RunnerState::Running as u8,
                RunnerState::Idle as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            let rings = doorbell.wait().await;
            self.wakeups.fetch_add(u64::from(rings), Ordering::Relaxed);
            let _ = self.state.compare_exchange(
                RunnerState::Idle as u8,
                RunnerState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        self.set_state(RunnerState::Stopped);
        log::debug!("[SMP] CPU {} runner stopped", self.cpu);
    }

    /// Busy-polling variant of `run()` for cores without a waker
    pub fn run_polling(&self) {
        if !self.enter() {
            return;
        }
        while !self.stopping() {
            if self.run_until_idle() == 0 {
                core::hint::spin_loop();
            }
        }
        // Work scheduled just before the stop request still runs
        self.run_until_idle();
        self.set_state(RunnerState::Stopped);
    }

    /// Ask the loop to exit and wake it
    pub fn stop(&self) {
        self.set_state(RunnerState::Stopping);
        self.substrate.signal(self.cpu);
    }

    /// Runner statistics
    pub fn stats(&self) -> RunnerStats {
        RunnerStats {
            state: self.state(),
            handled: self.handled.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            idle_passes: self.idle_passes.load(Ordering::Relaxed),
        }
    }
}

/// Runner statistics
#[derive(Debug, Clone, Copy)]
pub struct RunnerStats {
    /// Current state
    pub state: RunnerState,
    /// Handlers run
    pub handled: u64,
    /// Doorbell rings consumed
    pub wakeups: u64,
    /// Passes that found nothing to do
    pub idle_passes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::smp::events::EventSubstrate;
    use core::future::Future;
    use core::pin::pin;
    use core::sync::atomic::AtomicUsize;
    use core::task::{Context, Poll};
    use futures_util::task::noop_waker_ref;

    fn substrate_with_counter(cpus: usize) -> (Arc<dyn Substrate>, Arc<AtomicUsize>) {
        let substrate: Arc<dyn Substrate> = Arc::new(EventSubstrate::new(cpus));
        (substrate, Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn test_new_rejects_bad_cpu() {
        let (substrate, _) = substrate_with_counter(2);
        assert!(matches!(
            CoreRunner::new(substrate, CpuId::new(2)),
            Err(SubstrateError::CpuOutOfRange)
        ));
    }

    #[test]
    fn test_run_until_idle() {
        let (substrate, runs) = substrate_with_counter(2);
        let counter = Arc::clone(&runs);
        let sub = substrate
            .subscribe(
                CpuId::new(1),
                Arc::new(move |_: CpuId| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        let runner = CoreRunner::new(Arc::clone(&substrate), CpuId::new(1)).unwrap();

        assert_eq!(runner.run_until_idle(), 0);

        if substrate.schedule(sub) {
            substrate.signal(CpuId::new(1));
        }
        assert_eq!(runner.run_until_idle(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let stats = runner.stats();
        assert_eq!(stats.handled, 1);
        assert_eq!(stats.wakeups, 1);
        assert_eq!(stats.idle_passes, 1);
    }

    #[test]
    fn test_run_parks_and_wakes() {
        let (substrate, runs) = substrate_with_counter(1);
        let counter = Arc::clone(&runs);
        let sub = substrate
            .subscribe(
                CpuId::BSP,
                Arc::new(move |_: CpuId| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        let runner = CoreRunner::new(Arc::clone(&substrate), CpuId::BSP).unwrap();
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut run = pin!(runner.run());

        assert!(run.as_mut().poll(&mut cx).is_pending());
        assert_eq!(runner.state(), RunnerState::Idle);

        assert!(substrate.schedule(sub));
        substrate.signal(CpuId::BSP);
        assert!(run.as_mut().poll(&mut cx).is_pending());
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        runner.stop();
        assert_eq!(run.as_mut().poll(&mut cx), Poll::Ready(()));
        assert_eq!(runner.state(), RunnerState::Stopped);
    }

    #[test]
    fn test_stop_before_start() {
        let (substrate, _) = substrate_with_counter(2);
        let runner = CoreRunner::new(substrate, CpuId::new(1)).unwrap();
        let mut cx = Context::from_waker(noop_waker_ref());

        runner.stop();
        runner.run_polling();
        assert_eq!(runner.state(), RunnerState::Stopped);

        runner.stop();
        let mut run = pin!(runner.run());
        assert_eq!(run.as_mut().poll(&mut cx), Poll::Ready(()));
        assert_eq!(runner.state(), RunnerState::Stopped);
    }
}
