//! The `Router`: the struct that owns every other piece of state (the
//! interface table, routing table, ARP subsystem, and the host I/O shim)
//! and is shared between the packet-handling call site and the ARP timer
//! thread. Per `spec.md` §9's design note on global mutable state, there
//! is no process-wide singleton — callers construct one `Router` and pass
//! `Arc<Router>` to whatever needs it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use crate::arp_table::ArpTable;
use crate::host_io::HostIo;
use crate::interface::InterfaceTable;
use crate::route::RoutingTable;
use crate::time::Clock;

pub struct Router {
    pub interfaces: InterfaceTable,
    pub routes: RoutingTable,
    pub arp: ArpTable,
    pub io: Arc<dyn HostIo>,
    clock: Mutex<Clock>,
    pub(crate) shutdown: Arc<AtomicBool>,
}

impl Router {
    pub fn new(interfaces: InterfaceTable, routes: RoutingTable, io: Arc<dyn HostIo>) -> Self {
        Self::with_clock(interfaces, routes, io, Clock::live())
    }

    /// Constructs a router backed by an explicit clock. Tests use
    /// `Clock::frozen()` so ARP TTL/retransmit timing can be driven
    /// deterministically via `advance_clock` instead of real sleeps.
    pub fn with_clock(interfaces: InterfaceTable, routes: RoutingTable, io: Arc<dyn HostIo>, clock: Clock) -> Self {
        Self {
            interfaces,
            routes,
            arp: ArpTable::new(),
            io,
            clock: Mutex::new(clock),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn now(&self) -> SystemTime {
        self.clock.lock().now()
    }

    /// Advances a frozen test clock. Panics if the router was built with
    /// `Clock::live()`.
    pub fn advance_clock(&self, duration: Duration) {
        self.clock.lock().advance(duration);
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Returns the shared shutdown flag, e.g. to register with
    /// `signal_hook::flag::register` so SIGINT triggers cooperative
    /// shutdown without the caller needing its own signal plumbing.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }
}
