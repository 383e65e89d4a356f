//! The ARP cache and pending-request queue (`spec.md` §4.3). Both live
//! behind a single lock, per the spec's concurrency model: every mutation
//! and lookup is serialized, but the lock is released before any I/O —
//! `insert` detaches and returns the matching pending request instead of
//! draining it under the lock, and `sweep` yields each pending request to
//! the caller outside the lock.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use crate::wire::arp::Ipv4Address;
use crate::wire::ethernet::MacAddress;

pub const ENTRY_TTL: Duration = Duration::from_secs(15);
pub const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    mac: MacAddress,
    inserted_at: SystemTime,
}

impl CacheEntry {
    fn expired(&self, now: SystemTime) -> bool {
        now.duration_since(self.inserted_at).unwrap_or(Duration::ZERO) >= ENTRY_TTL
    }
}

/// A frame held back from egress until its next hop resolves, owning an
/// exclusive copy of the bytes it should egress once resolved.
#[derive(Debug, Clone)]
pub struct ParkedFrame {
    pub frame: Vec<u8>,
    pub egress_iface: String,
}

/// A record tracking an in-flight ARP resolution for `target_ip`: its
/// retransmission state and the FIFO of frames waiting on it.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub target_ip: Ipv4Address,
    pub first_sent: SystemTime,
    pub last_sent: SystemTime,
    pub attempts: u32,
    pub parked: VecDeque<ParkedFrame>,
}

impl PendingRequest {
    fn new(target_ip: Ipv4Address, now: SystemTime) -> Self {
        Self {
            target_ip,
            first_sent: now,
            last_sent: SystemTime::UNIX_EPOCH,
            attempts: 0,
            parked: VecDeque::new(),
        }
    }
}

#[derive(Default)]
struct State {
    cache: HashMap<Ipv4Address, CacheEntry>,
    pending: HashMap<Ipv4Address, PendingRequest>,
}

/// The ARP cache and pending-request queue, guarded by a single lock.
#[derive(Default)]
pub struct ArpTable {
    state: Mutex<State>,
}

impl ArpTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the MAC for `ip` if a valid, non-expired cache
    /// entry exists.
    pub fn lookup(&self, ip: Ipv4Address, now: SystemTime) -> Option<MacAddress> {
        let state = self.state.lock();
        state
            .cache
            .get(&ip)
            .filter(|entry| !entry.expired(now))
            .map(|entry| entry.mac)
    }

    /// Establishes or refreshes the cache entry for `(ip, mac)` and
    /// atomically detaches any pending request for `ip`, returning it so
    /// the caller can drain its parked frames without holding the lock.
    pub fn insert(&self, ip: Ipv4Address, mac: MacAddress, now: SystemTime) -> Option<PendingRequest> {
        let mut state = self.state.lock();
        state.cache.insert(ip, CacheEntry { mac, inserted_at: now });
        state.pending.remove(&ip)
    }

    /// Queues `frame` for delivery to `ip` once resolved, creating a new
    /// pending request if one does not already exist. Returns a clone of
    /// the up-to-date record so the caller can decide whether to probe
    /// immediately (e.g. on first parking).
    pub fn queue_request(&self, ip: Ipv4Address, frame: Vec<u8>, egress_iface: String, now: SystemTime) -> PendingRequest {
        let mut state = self.state.lock();
        let req = state
            .pending
            .entry(ip)
            .or_insert_with(|| PendingRequest::new(ip, now));
        req.parked.push_back(ParkedFrame { frame, egress_iface });
        req.clone()
    }

    /// Removes `ip`'s pending request entirely, returning it if present.
    pub fn destroy_request(&self, ip: Ipv4Address) -> Option<PendingRequest> {
        self.state.lock().pending.remove(&ip)
    }

    /// Records that a probe was just sent for `target_ip`'s live pending
    /// request, bumping `attempts`/`last_sent` in place. A no-op if the
    /// request was resolved or destroyed concurrently (e.g. a reply raced
    /// a timer sweep between its snapshot and this call) — unlike
    /// reinserting a caller-held snapshot, this never resurrects a request
    /// `insert`/`destroy_request` already removed, which would otherwise
    /// put `target_ip` in the cache and the pending queue at once.
    pub fn record_probe_sent(&self, target_ip: Ipv4Address, now: SystemTime) {
        let mut state = self.state.lock();
        if let Some(req) = state.pending.get_mut(&target_ip) {
            req.attempts += 1;
            req.last_sent = now;
        }
    }

    /// Drops expired cache entries and returns a snapshot of every
    /// currently pending request, to be handed to the retransmit handler
    /// outside the lock.
    pub fn sweep(&self, now: SystemTime) -> Vec<PendingRequest> {
        let mut state = self.state.lock();
        state.cache.retain(|_, entry| !entry.expired(now));
        state.pending.values().cloned().collect()
    }

    /// Number of targets currently awaiting ARP resolution. Exposed for
    /// tests and for operational introspection (e.g. a `/healthz`
    /// endpoint wanting a sense of outstanding resolution pressure).
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of valid, non-expired-or-not cache entries currently held
    /// (expiry is only enforced lazily by `lookup`/`sweep`, so a stale
    /// entry counts until the next sweep removes it).
    pub fn cache_len(&self) -> usize {
        self.state.lock().cache.len()
    }
}
