// src/kernel/smp/task_queue.rs
//! Per-CPU Deferred Task Queue
//!
//! Each CPU owns a task list; `add_task()` appends a closure and reports
//! whether the list was empty, so the caller knows whether the CPU must be
//! woken. The CPU's loop grabs the whole list at once and runs it in order.
//!
//! Unlike the event substrate, scheduling the same subscription twice
//! queues two runs.

use alloc::boxed::Box;
use alloc::vec::Vec;
use spin::RwLock;

use super::doorbell::Doorbell;
use super::substrate::{DeferredFn, Subscription, Substrate};
use crate::errors::SubstrateError;
use crate::kernel::core::types::CpuId;
use crate::kernel::net::batch_queue::BatchQueue;

/// One-shot task run on its target CPU
pub type Task = Box<dyn FnOnce(CpuId) + Send>;

/// Maximum registered handlers per CPU
pub const MAX_SUBSCRIPTIONS: usize = 256;

struct CoreTasks {
    tasks: BatchQueue<Task>,
    handlers: RwLock<Vec<DeferredFn>>,
    doorbell: Doorbell,
}

/// Task-queue substrate
pub struct TaskQueueSubstrate {
    cores: Box<[CoreTasks]>,
}

impl TaskQueueSubstrate {
    /// Create task lists for `cpu_count` CPUs
    pub fn new(cpu_count: usize) -> Self {
        log::debug!("[SMP] task-queue substrate for {} CPUs", cpu_count);
        Self {
            cores: (0..cpu_count)
                .map(|_| CoreTasks {
                    tasks: BatchQueue::new(),
                    handlers: RwLock::new(Vec::new()),
                    doorbell: Doorbell::new(),
                })
                .collect(),
        }
    }

    fn core(&self, cpu: CpuId) -> Option<&CoreTasks> {
        self.cores.get(cpu.index())
    }

    /// Queue a one-shot task on `cpu`
    ///
    /// Returns `true` if the CPU's task list was empty.
    pub fn add_task<F>(&self, cpu: CpuId, task: F) -> Result<bool, SubstrateError>
    where
        F: FnOnce(CpuId) + Send + 'static,
    {
        let core = self.core(cpu).ok_or(SubstrateError::CpuOutOfRange)?;
        Ok(core.tasks.enqueue(Box::new(task)))
    }

    /// Tasks waiting on `cpu`
    pub fn queued(&self, cpu: CpuId) -> usize {
        self.core(cpu).map_or(0, |core| core.tasks.len())
    }
}

impl Substrate for TaskQueueSubstrate {
    fn cpu_count(&self) -> usize {
        self.cores.len()
    }

    fn subscribe(&self, cpu: CpuId, handler: DeferredFn) -> Result<Subscription, SubstrateError> {
        let core = self.core(cpu).ok_or(SubstrateError::CpuOutOfRange)?;
        let mut handlers = core.handlers.write();
        if handlers.len() >= MAX_SUBSCRIPTIONS {
            return Err(SubstrateError::SubscriptionTableFull);
        }
        let slot = handlers.len() as u16;
        handlers.push(handler);

        log::debug!("[SMP] CPU {} registered task handler {}", cpu, slot);
        Ok(Subscription::new(cpu, slot))
    }

    fn schedule(&self, subscription: Subscription) -> bool {
        let Some(core) = self.core(subscription.cpu()) else {
            return false;
        };
        let Some(handler) = core.handlers.read().get(subscription.slot()).cloned() else {
            return false;
        };
        core.tasks.enqueue(Box::new(move |cpu| handler(cpu)))
    }

    fn process(&self, cpu: CpuId) -> usize {
        let Some(core) = self.core(cpu) else {
            return 0;
        };

        let mut ran = 0;
        loop {
            let tasks = core.tasks.grab_queue();
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                task(cpu);
                ran += 1;
            }
        }
        ran
    }

    fn has_pending(&self, cpu: CpuId) -> bool {
        self.core(cpu).is_some_and(|core| !core.tasks.is_empty())
    }

    fn doorbell(&self, cpu: CpuId) -> Option<&Doorbell> {
        self.core(cpu).map(|core| &core.doorbell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use spin::Mutex;

    #[test]
    fn test_add_task_reports_first() {
        let tasks = TaskQueueSubstrate::new(2);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            let first = tasks
                .add_task(CpuId::new(1), move |_| order.lock().push(i))
                .unwrap();
            assert_eq!(first, i == 0);
        }
        assert_eq!(tasks.queued(CpuId::new(1)), 3);

        assert_eq!(tasks.process(CpuId::new(1)), 3);
        assert_eq!(*order.lock(), [0, 1, 2]);
        assert!(!tasks.has_pending(CpuId::new(1)));
    }

    #[test]
    fn test_schedule_does_not_coalesce() {
        let tasks = TaskQueueSubstrate::new(2);
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let sub = tasks
            .subscribe(
                CpuId::new(1),
                Arc::new(move |_: CpuId| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(tasks.schedule(sub));
        assert!(!tasks.schedule(sub));
        assert_eq!(tasks.process(CpuId::new(1)), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(tasks.schedule(sub));
    }

    #[test]
    fn test_task_queued_while_processing_runs() {
        let tasks = Arc::new(TaskQueueSubstrate::new(1));
        let runs = Arc::new(AtomicUsize::new(0));

        let inner_tasks = Arc::clone(&tasks);
        let inner_runs = Arc::clone(&runs);
        tasks
            .add_task(CpuId::BSP, move |cpu| {
                let runs = Arc::clone(&inner_runs);
                inner_tasks
                    .add_task(cpu, move |_| {
                        runs.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            })
            .unwrap();

        assert_eq!(tasks.process(CpuId::BSP), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bad_cpu() {
        let tasks = TaskQueueSubstrate::new(1);
        assert_eq!(
            tasks.add_task(CpuId::new(3), |_| {}),
            Err(SubstrateError::CpuOutOfRange)
        );
        assert_eq!(tasks.process(CpuId::new(3)), 0);
        assert!(tasks.doorbell(CpuId::new(3)).is_none());
    }
}
