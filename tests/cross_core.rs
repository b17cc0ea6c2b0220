//! Dispatcher with OS threads standing in for cores

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use netsmp::kernel::net::LoopbackInterface;
use netsmp::{
    CoreRunner, CpuId, DispatcherConfig, Inet, InterfaceId, Packet, Service, ServiceConfig,
    SmpConfig, SubstrateKind,
};

const ORIGIN: CpuId = CpuId::BSP;
const WORKER: CpuId = CpuId::new(1);
const INBOUND: u32 = 20_000;
const OUTBOUND: u32 = 5_000;

fn service(kind: SubstrateKind) -> Service {
    Service::new(ServiceConfig {
        smp: SmpConfig::new(2),
        dispatcher: DispatcherConfig::new(InterfaceId::new(0), WORKER),
        substrate: kind,
    })
    .unwrap()
}

fn spawn_core(runner: &Arc<CoreRunner>) -> JoinHandle<()> {
    let runner = Arc::clone(runner);
    thread::spawn(move || runner.run_polling())
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_micros(50));
    }
}

fn seq(n: u32) -> Box<Packet> {
    Packet::new(n.to_le_bytes().to_vec())
}

fn seq_of(packet: &Packet) -> u32 {
    let mut bytes = [0; 4];
    bytes.copy_from_slice(packet.as_bytes());
    u32::from_le_bytes(bytes)
}

fn exchange_in_both_directions(kind: SubstrateKind) {
    let service = service(kind);
    let lo = Arc::new(LoopbackInterface::new(InterfaceId::new(0)));
    let dispatcher = service.start(Arc::clone(&lo) as Arc<dyn Inet>).unwrap();

    let origin = Arc::new(service.runner(ORIGIN).unwrap());
    let worker = Arc::new(service.runner(WORKER).unwrap());
    let cores = [spawn_core(&origin), spawn_core(&worker)];

    // Stack side pushing replies while the driver side floods the worker
    let stack = {
        let lo = Arc::clone(&lo);
        thread::spawn(move || {
            for n in 0..OUTBOUND {
                lo.send_from_stack(seq(n));
            }
        })
    };
    for n in 0..INBOUND {
        lo.deliver_from_wire(seq(n));
    }
    stack.join().unwrap();

    let mut received = Vec::new();
    let mut transmitted = Vec::new();
    wait_until("delivery", || {
        received.extend(lo.take_received());
        transmitted.extend(lo.take_transmitted());
        received.len() == INBOUND as usize && transmitted.len() == OUTBOUND as usize
    });

    origin.stop();
    worker.stop();
    for core in cores {
        core.join().unwrap();
    }

    let received: Vec<u32> = received.iter().map(|p| seq_of(p)).collect();
    let transmitted: Vec<u32> = transmitted.iter().map(|p| seq_of(p)).collect();
    assert_eq!(received, (0..INBOUND).collect::<Vec<_>>());
    assert_eq!(transmitted, (0..OUTBOUND).collect::<Vec<_>>());

    let stats = dispatcher.stats();
    assert_eq!(stats.inbound_delivered, u64::from(INBOUND));
    assert_eq!(stats.outbound_delivered, u64::from(OUTBOUND));
    assert_eq!(stats.in_flight(), 0);
    assert!(stats.inbound_batches >= 1 && stats.inbound_batches <= u64::from(INBOUND));
    assert!(stats.signals >= 1);
    assert!(stats.signals <= stats.schedules);
    assert_eq!(dispatcher.pending_inbound(), 0);
    assert_eq!(dispatcher.pending_outbound(), 0);
}

#[test]
fn events_exchange_in_both_directions() {
    exchange_in_both_directions(SubstrateKind::Events);
}

#[test]
fn task_queue_exchange_in_both_directions() {
    exchange_in_both_directions(SubstrateKind::TaskQueue);
}

#[test]
fn burst_before_worker_runs_is_one_drain() {
    for kind in [SubstrateKind::Events, SubstrateKind::TaskQueue] {
        let service = service(kind);
        let lo = Arc::new(LoopbackInterface::new(InterfaceId::new(0)));
        let dispatcher = service.start(Arc::clone(&lo) as Arc<dyn Inet>).unwrap();

        for n in 0..100 {
            lo.deliver_from_wire(seq(n));
        }
        let stats = dispatcher.stats();
        assert_eq!(stats.schedules, 1);
        assert_eq!(stats.signals, 1);

        let worker = service.runner(WORKER).unwrap();
        worker.run_until_idle();

        let stats = dispatcher.stats();
        assert_eq!(stats.inbound_batches, 1);
        assert_eq!(stats.inbound_delivered, 100);
        assert_eq!(worker.stats().wakeups, 1);
    }
}

#[test]
fn writeq_notifications_reach_worker_clamped() {
    for kind in [SubstrateKind::Events, SubstrateKind::TaskQueue] {
        let service = service(kind);
        let lo = Arc::new(LoopbackInterface::new(InterfaceId::new(0)));
        let dispatcher = service.start(Arc::clone(&lo) as Arc<dyn Inet>).unwrap();

        let worker = Arc::new(service.runner(WORKER).unwrap());
        let core = spawn_core(&worker);

        let mut calls = Vec::new();
        for (i, raw) in [0usize, 1, usize::MAX, 1 << 40].into_iter().enumerate() {
            lo.notify_writeq(raw);
            wait_until("write backlog run", || {
                calls.extend(lo.take_writeq_calls());
                calls.len() == i + 1
            });
        }

        worker.stop();
        core.join().unwrap();

        assert_eq!(calls, [0, 1, 0, 1 << 40]);
        assert_eq!(lo.transmitted_len(), 0);
        assert_eq!(dispatcher.stats().writeq_clamped, 1);
    }
}

#[test]
fn stop_before_core_thread_starts() {
    let service = service(SubstrateKind::Events);
    let worker = Arc::new(service.runner(WORKER).unwrap());

    worker.stop();
    let core = spawn_core(&worker);
    wait_until("core thread exit", || core.is_finished());
    core.join().unwrap();
    assert_eq!(worker.state(), netsmp::kernel::smp::RunnerState::Stopped);
}
