//! The ARP timer loop (`spec.md` §4.4): a single long-lived background
//! thread that wakes once a second, sweeps the ARP cache and pending
//! queue, and drives the retransmit state machine for whatever pending
//! requests the sweep hands back. It never touches the forwarding
//! pipeline directly — everything it does goes through
//! `Router::sweep_arp`, which shares its retransmit logic with the
//! packet path's first-probe-on-miss behavior.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::router::Router;

/// Spawns the timer thread. Cancellation is cooperative: the thread checks
/// `router.is_shutting_down()` at the top of each iteration and between
/// sweeps, so a shutdown request is observed within one sleep interval.
pub fn spawn(router: Arc<Router>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("arp-timer".to_string())
        .spawn(move || run(router))
        .expect("failed to spawn ARP timer thread")
}

fn run(router: Arc<Router>) {
    while !router.is_shutting_down() {
        thread::sleep(Duration::from_secs(1));
        if router.is_shutting_down() {
            break;
        }

        debug!("ARP timer sweep");
        router.sweep_arp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_io::ChannelHostIo;
    use crate::interface::InterfaceTable;
    use crate::route::RoutingTable;
    use crate::time::Clock;
    use std::time::Duration as StdDuration;

    #[test]
    fn Spawn_ObservesShutdownWithoutHanging() {
        let router = Arc::new(Router::with_clock(
            InterfaceTable::new(vec![]),
            RoutingTable::new(vec![]),
            Arc::new(ChannelHostIo::new()),
            Clock::live(),
        ));
        let handle = spawn(router.clone());
        router.request_shutdown();
        // The thread sleeps for up to 1s before observing shutdown; give it
        // generous headroom so this never flakes under CI load.
        thread::sleep(StdDuration::from_millis(1100));
        assert!(handle.is_finished());
        handle.join().unwrap();
    }
}
