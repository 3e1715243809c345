// Run-State Tracker: process-wide state shared by every simulated client
// within one run.
//
// All mutation goes through idempotent methods; maps use insert-if-absent
// semantics keyed by entity id, so concurrent clients never race on the same
// key. Created once at run setup, shared by Arc, discarded at teardown.

use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

/// Default capacity of the resource-intensive scenario's payload cache
pub const PAYLOAD_CACHE_CAPACITY: usize = 100;

/// Payload originally submitted for a created entity, kept for integrity
/// verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEntity {
    pub title: String,
    pub content: String,
}

/// First-observed measurements, set exactly once (first writer wins)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub response_ms: Option<f64>,
    pub memory_mb: Option<f64>,
}

/// Per-minute snapshot written at most once per bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub response_ms: Option<f64>,
    pub open_sessions: usize,
}

#[derive(Debug, Default)]
struct PayloadCache {
    entries: VecDeque<(String, String)>,
}

/// Shared run state. See module docs for the locking discipline.
#[derive(Debug)]
pub struct RunState {
    created: Mutex<HashMap<String, CreatedEntity>>,
    verified: Mutex<HashSet<String>>,
    open_sessions: Mutex<HashSet<Uuid>>,
    baseline: Mutex<Baseline>,
    checkpoints: Mutex<BTreeMap<u64, Checkpoint>>,
    cache: Mutex<PayloadCache>,
    cache_capacity: usize,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        RunState {
            created: Mutex::new(HashMap::new()),
            verified: Mutex::new(HashSet::new()),
            open_sessions: Mutex::new(HashSet::new()),
            baseline: Mutex::new(Baseline::default()),
            checkpoints: Mutex::new(BTreeMap::new()),
            cache: Mutex::new(PayloadCache::default()),
            cache_capacity: PAYLOAD_CACHE_CAPACITY,
        }
    }

    // --- created / verified entities ---

    /// Register a successfully created entity. Entries are never removed
    /// during the run; re-registering an id is a no-op.
    pub fn register_created(&self, id: impl Into<String>, entity: CreatedEntity) {
        self.created
            .lock()
            .expect("created lock poisoned")
            .entry(id.into())
            .or_insert(entity);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().expect("created lock poisoned").len()
    }

    /// Pick a random created entity that has not been verified yet.
    /// Already-verified ids are never returned.
    pub fn pick_unverified<R: Rng>(&self, rng: &mut R) -> Option<(String, CreatedEntity)> {
        let created = self.created.lock().expect("created lock poisoned");
        let verified = self.verified.lock().expect("verified lock poisoned");
        created
            .iter()
            .filter(|(id, _)| !verified.contains(*id))
            .choose(rng)
            .map(|(id, entity)| (id.clone(), entity.clone()))
    }

    /// Mark an entity as round-trip verified. Write-once per id: returns
    /// `false` if the id was already verified.
    pub fn mark_verified(&self, id: &str) -> bool {
        self.verified
            .lock()
            .expect("verified lock poisoned")
            .insert(id.to_string())
    }

    pub fn verified_count(&self) -> usize {
        self.verified.lock().expect("verified lock poisoned").len()
    }

    // --- open sessions ---

    pub fn open_session(&self, id: Uuid) {
        self.open_sessions
            .lock()
            .expect("sessions lock poisoned")
            .insert(id);
    }

    pub fn close_session(&self, id: Uuid) {
        self.open_sessions
            .lock()
            .expect("sessions lock poisoned")
            .remove(&id);
    }

    /// Instantaneous concurrency indicator (not a metric register)
    pub fn open_session_count(&self) -> usize {
        self.open_sessions
            .lock()
            .expect("sessions lock poisoned")
            .len()
    }

    // --- baseline ---

    /// Record the first-observed response time; later writes are ignored
    pub fn observe_first_response(&self, ms: f64) {
        let mut baseline = self.baseline.lock().expect("baseline lock poisoned");
        if baseline.response_ms.is_none() {
            baseline.response_ms = Some(ms);
        }
    }

    /// Record the first-observed memory sample; later writes are ignored
    pub fn observe_first_memory(&self, mb: f64) {
        let mut baseline = self.baseline.lock().expect("baseline lock poisoned");
        if baseline.memory_mb.is_none() {
            baseline.memory_mb = Some(mb);
        }
    }

    pub fn baseline(&self) -> Baseline {
        *self.baseline.lock().expect("baseline lock poisoned")
    }

    // --- checkpoints ---

    /// Write a checkpoint for an elapsed-minute bucket. At most one per
    /// bucket: returns `false` if the bucket was already written.
    pub fn record_checkpoint(&self, minute: u64, checkpoint: Checkpoint) -> bool {
        let mut checkpoints = self.checkpoints.lock().expect("checkpoints lock poisoned");
        if checkpoints.contains_key(&minute) {
            return false;
        }
        checkpoints.insert(minute, checkpoint);
        true
    }

    pub fn checkpoints(&self) -> Vec<(u64, Checkpoint)> {
        self.checkpoints
            .lock()
            .expect("checkpoints lock poisoned")
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect()
    }

    // --- payload cache ---

    /// Retain a response body in the bounded cache, evicting the oldest
    /// entry once capacity is exceeded. Simulates memory pressure without
    /// unbounded growth.
    pub fn cache_payload(&self, key: impl Into<String>, body: impl Into<String>) {
        let mut cache = self.cache.lock().expect("cache lock poisoned");
        cache.entries.push_back((key.into(), body.into()));
        while cache.entries.len() > self.cache_capacity {
            cache.entries.pop_front();
        }
    }

    pub fn cached_payload_count(&self) -> usize {
        self.cache.lock().expect("cache lock poisoned").entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entity(n: u32) -> CreatedEntity {
        CreatedEntity {
            title: format!("title-{n}"),
            content: format!("content-{n}"),
        }
    }

    #[test]
    fn test_register_created_is_idempotent() {
        let state = RunState::new();
        state.register_created("a", entity(1));
        state.register_created("a", entity(2));
        assert_eq!(state.created_count(), 1);
        let mut rng = StdRng::seed_from_u64(1);
        let (_, picked) = state.pick_unverified(&mut rng).unwrap();
        assert_eq!(picked, entity(1));
    }

    #[test]
    fn test_mark_verified_write_once() {
        let state = RunState::new();
        state.register_created("a", entity(1));
        assert!(state.mark_verified("a"));
        assert!(!state.mark_verified("a"));
        assert_eq!(state.verified_count(), 1);
    }

    #[test]
    fn test_pick_unverified_skips_verified_ids() {
        let state = RunState::new();
        state.register_created("a", entity(1));
        state.register_created("b", entity(2));
        state.mark_verified("a");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (id, _) = state.pick_unverified(&mut rng).unwrap();
            assert_eq!(id, "b");
        }
        state.mark_verified("b");
        assert!(state.pick_unverified(&mut rng).is_none());
    }

    #[test]
    fn test_open_sessions_track_instantaneous_concurrency() {
        let state = RunState::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        state.open_session(a);
        state.open_session(b);
        assert_eq!(state.open_session_count(), 2);
        state.close_session(a);
        assert_eq!(state.open_session_count(), 1);
    }

    #[test]
    fn test_baseline_first_writer_wins() {
        let state = RunState::new();
        state.observe_first_response(120.0);
        state.observe_first_response(999.0);
        state.observe_first_memory(100.0);
        state.observe_first_memory(500.0);
        let baseline = state.baseline();
        assert_eq!(baseline.response_ms, Some(120.0));
        assert_eq!(baseline.memory_mb, Some(100.0));
    }

    #[test]
    fn test_checkpoint_once_per_bucket() {
        let state = RunState::new();
        let cp = Checkpoint {
            response_ms: Some(50.0),
            open_sessions: 3,
        };
        assert!(state.record_checkpoint(1, cp));
        assert!(!state.record_checkpoint(
            1,
            Checkpoint {
                response_ms: Some(999.0),
                open_sessions: 9,
            }
        ));
        let checkpoints = state.checkpoints();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].1, cp);
    }

    #[test]
    fn test_payload_cache_evicts_oldest() {
        let state = RunState::new();
        for i in 0..(PAYLOAD_CACHE_CAPACITY + 25) {
            state.cache_payload(format!("k{i}"), "body");
        }
        assert_eq!(state.cached_payload_count(), PAYLOAD_CACHE_CAPACITY);
    }
}
