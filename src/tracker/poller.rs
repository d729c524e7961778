//src/tracker/poller.rs
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::one::{Ref, RefMut};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::models::{EntityKey, Snapshot};
use crate::notifications::NotificationQueue;
use crate::store::EntityStore;
use crate::traits::{EntityFetcher, SyncEventHandler};
use crate::transform::transform;

/// Schedule state of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

/// What a finished tick did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The snapshot was replaced
    Applied,
    /// The key was stopped or restarted meanwhile; the result was dropped
    Discarded,
}

/// One active recurring schedule
struct PollHandle {
    entity_key: EntityKey,
    interval: Duration,
    task: JoinHandle<()>,
}

impl PollHandle {
    fn cancel(self) {
        debug!(
            "Cancelling {:?} schedule for {}",
            self.interval, self.entity_key
        );
        self.task.abort();
    }
}

struct PollSlot {
    /// Bumped on every start/stop; ticks started under an older epoch are discarded
    epoch: u64,
    schedule: Option<PollHandle>,
    /// Serializes ticks of this key
    tick_lock: Arc<Mutex<()>>,
}

impl PollSlot {
    fn new() -> Self {
        Self {
            epoch: 0,
            schedule: None,
            tick_lock: Arc::new(Mutex::new(())),
        }
    }
}

struct PollerInner {
    fetcher: Arc<dyn EntityFetcher>,
    store: Arc<EntityStore>,
    notifications: NotificationQueue,
    slots: DashMap<EntityKey, PollSlot>,
}

impl PollerInner {
    fn slot(&self, key: &EntityKey) -> Result<Ref<'_, EntityKey, PollSlot>, SyncError> {
        self.slots
            .get(key)
            .ok_or_else(|| SyncError::UnknownEntity(key.clone()))
    }

    fn slot_mut(&self, key: &EntityKey) -> Result<RefMut<'_, EntityKey, PollSlot>, SyncError> {
        self.slots
            .get_mut(key)
            .ok_or_else(|| SyncError::UnknownEntity(key.clone()))
    }

    fn epoch(&self, key: &EntityKey) -> Result<u64, SyncError> {
        Ok(self.slot(key)?.epoch)
    }

    fn tick_lock(&self, key: &EntityKey) -> Result<Arc<Mutex<()>>, SyncError> {
        Ok(self.slot(key)?.tick_lock.clone())
    }

    /// Swap in `snapshot` if `epoch` is still current.
    ///
    /// Runs under the slot guard, so `stop` cannot slip in between the check
    /// and the swap.
    fn commit(
        &self,
        key: &EntityKey,
        epoch: u64,
        snapshot: Arc<Snapshot>,
    ) -> Result<bool, SyncError> {
        let slot = self.slot(key)?;
        if slot.epoch != epoch {
            return Ok(false);
        }
        self.store.replace(key, snapshot)?;
        Ok(true)
    }

    /// Fetch, transform and store one refresh of `key`, if `epoch` is still current
    async fn run_tick(&self, key: &EntityKey, epoch: u64) -> Result<TickOutcome, SyncError> {
        let tick_lock = self.tick_lock(key)?;
        let _guard = tick_lock.lock().await;

        if self.epoch(key)? != epoch {
            return Ok(TickOutcome::Discarded);
        }

        let started = Instant::now();
        let bundle = self.fetcher.fetch(key).await?;
        let snapshot = Arc::new(transform(&bundle));

        if !self.commit(key, epoch, snapshot.clone())? {
            debug!("Discarding stale result for {}", key);
            return Ok(TickOutcome::Discarded);
        }

        self.store.notify(key, &snapshot);
        self.notifications.notify_snapshot_update(key, snapshot);
        debug!("Tick for {} completed in {:?}", key, started.elapsed());

        Ok(TickOutcome::Applied)
    }

    /// Recurring tick loop of one schedule
    async fn run_schedule(self: Arc<Self>, key: EntityKey, interval: Duration, epoch: u64) {
        let mut last_tick: Option<Instant> = None;

        loop {
            if let Some(last) = last_tick {
                let elapsed = last.elapsed();
                if elapsed < interval {
                    tokio::time::sleep(interval - elapsed).await;
                }
            }
            last_tick = Some(Instant::now());

            match self.run_tick(&key, epoch).await {
                Ok(TickOutcome::Applied) => {}
                Ok(TickOutcome::Discarded) => {
                    debug!("Schedule for {} superseded, exiting", key);
                    break;
                }
                Err(e) => {
                    // Keep the stale snapshot and try again next interval
                    warn!("Poll tick for {} failed: {}", key, e);
                    self.notifications.notify_error(e);
                }
            }
        }
    }
}

/// Per-entity polling schedules over a fixed key set.
///
/// Must be created inside a tokio runtime. Dropping the poller cancels
/// every schedule.
pub struct Poller {
    inner: Arc<PollerInner>,
}

impl Poller {
    pub fn new(
        keys: impl IntoIterator<Item = EntityKey>,
        fetcher: Arc<dyn EntityFetcher>,
        store: Arc<EntityStore>,
        event_handler: Arc<dyn SyncEventHandler>,
    ) -> Self {
        let slots = DashMap::new();
        for key in keys {
            slots.insert(key, PollSlot::new());
        }

        Self {
            inner: Arc::new(PollerInner {
                fetcher,
                store,
                notifications: NotificationQueue::new(event_handler),
                slots,
            }),
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.inner.store
    }

    /// `Polling` only while the schedule task is alive
    pub fn state(&self, key: &EntityKey) -> Result<PollState, SyncError> {
        let slot = self.inner.slot(key)?;
        let alive = slot
            .schedule
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished());
        Ok(if alive {
            PollState::Polling
        } else {
            PollState::Idle
        })
    }

    /// Interval of the active schedule, if any
    pub fn interval(&self, key: &EntityKey) -> Option<Duration> {
        self.inner
            .slots
            .get(key)
            .and_then(|slot| slot.schedule.as_ref().map(|handle| handle.interval))
    }

    /// Number of schedules whose task is still running
    pub fn active_schedules(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|slot| {
                slot.schedule
                    .as_ref()
                    .is_some_and(|handle| !handle.task.is_finished())
            })
            .count()
    }

    /// Start polling `key` every `interval`, replacing any running schedule.
    ///
    /// The first tick runs immediately. A zero interval is rejected.
    pub fn start(&self, key: &EntityKey, interval: Duration) -> Result<(), SyncError> {
        let mut slot = self.inner.slot_mut(key)?;
        if interval.is_zero() {
            return Err(SyncError::ZeroInterval);
        }

        if let Some(previous) = slot.schedule.take() {
            previous.cancel();
        }
        slot.epoch += 1;

        let task = tokio::spawn(self.inner.clone().run_schedule(
            key.clone(),
            interval,
            slot.epoch,
        ));
        slot.schedule = Some(PollHandle {
            entity_key: key.clone(),
            interval,
            task,
        });

        info!("Polling {} every {}ms", key, interval.as_millis());
        Ok(())
    }

    /// Stop polling `key`. Stopping an idle key is a no-op.
    pub fn stop(&self, key: &EntityKey) -> Result<(), SyncError> {
        let mut slot = self.inner.slot_mut(key)?;
        slot.epoch += 1;

        if let Some(handle) = slot.schedule.take() {
            handle.cancel();
            info!("Stopped polling {}", key);
        }
        Ok(())
    }

    /// Run one out-of-band tick, leaving any schedule untouched
    pub async fn refresh_now(&self, key: &EntityKey) -> Result<TickOutcome, SyncError> {
        let epoch = self.inner.epoch(key)?;
        let outcome = self.inner.run_tick(key, epoch).await;

        if let Err(e) = &outcome {
            warn!("Refresh of {} failed: {}", key, e);
        }
        outcome
    }

    /// Cancel every schedule
    pub fn stop_all(&self) {
        for mut slot in self.inner.slots.iter_mut() {
            slot.epoch += 1;
            if let Some(handle) = slot.schedule.take() {
                handle.cancel();
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop_all();
        self.inner.notifications.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FetchError, FetchErrorKind};
    use crate::models::raw::{RawMempoolEntry, RawUtxo};
    use crate::models::{RawBundle, RawNodeStats};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{mpsc, Notify};

    fn node_bundle(height: u64) -> RawBundle {
        RawBundle::Node(RawNodeStats {
            mempool: vec![RawMempoolEntry::Txid("abcdefghijklmnopqrstuvwxyz0123".to_string())],
            utxos: vec![RawUtxo::Pair("addrA".to_string(), 1.0)],
            working_on: height,
        })
    }

    fn height(store: &EntityStore, key: &EntityKey) -> u64 {
        store.get(key).as_node().map(|n| n.current_height).unwrap_or_default()
    }

    /// Returns scripted results, then keeps answering with `fallback`
    struct ScriptedFetcher {
        script: std::sync::Mutex<VecDeque<Result<RawBundle, FetchError>>>,
        fallback: RawBundle,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<RawBundle, FetchError>>, fallback: RawBundle) -> Self {
            Self {
                script: std::sync::Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityFetcher for ScriptedFetcher {
        async fn fetch(&self, _key: &EntityKey) -> Result<RawBundle, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    /// Blocks every fetch until the gate is opened
    struct GatedFetcher {
        entered: mpsc::UnboundedSender<()>,
        gate: Notify,
    }

    #[async_trait]
    impl EntityFetcher for GatedFetcher {
        async fn fetch(&self, _key: &EntityKey) -> Result<RawBundle, FetchError> {
            let _ = self.entered.send(());
            self.gate.notified().await;
            Ok(node_bundle(99))
        }
    }

    /// Tracks how many fetches overlap
    #[derive(Default)]
    struct SlowFetcher {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntityFetcher for SlowFetcher {
        async fn fetch(&self, _key: &EntityKey) -> Result<RawBundle, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(node_bundle(1))
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        updates: AtomicUsize,
        errors: AtomicUsize,
    }

    #[async_trait]
    impl SyncEventHandler for RecordingHandler {
        async fn handle_snapshot_update(&self, _key: &EntityKey, _snapshot: &Snapshot) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        async fn handle_error(&self, _error: &SyncError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn poller_with(
        key: &EntityKey,
        fetcher: Arc<dyn EntityFetcher>,
    ) -> (Poller, Arc<EntityStore>, Arc<RecordingHandler>) {
        let store = Arc::new(EntityStore::new([key.clone()]));
        let handler = Arc::new(RecordingHandler::default());
        let poller = Poller::new([key.clone()], fetcher, store.clone(), handler.clone());
        (poller, store, handler)
    }

    fn network_error(key: &EntityKey) -> FetchError {
        FetchError::new(key, Some("node_stats"), FetchErrorKind::Network("connection reset".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_immediately_then_on_interval() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(5)));
        let (poller, store, _) = poller_with(&key, fetcher.clone());

        poller.start(&key, Duration::from_millis(100)).unwrap();
        assert_eq!(poller.state(&key).unwrap(), PollState::Polling);
        assert_eq!(poller.interval(&key), Some(Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(height(&store, &key), 5);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_one_schedule() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(1)));
        let (poller, _, _) = poller_with(&key, fetcher.clone());

        poller.start(&key, Duration::from_millis(100)).unwrap();
        poller.start(&key, Duration::from_millis(100)).unwrap();
        assert_eq!(poller.active_schedules(), 1);

        tokio::time::sleep(Duration::from_millis(1050)).await;

        // Ticks at 0, 100, ..., 1000 from a single timer
        let calls = fetcher.calls();
        assert!((10..=12).contains(&calls), "unexpected tick count {}", calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_schedule_and_is_idempotent() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(1)));
        let (poller, _, _) = poller_with(&key, fetcher.clone());

        poller.stop(&key).unwrap();
        poller.start(&key, Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let calls = fetcher.calls();

        poller.stop(&key).unwrap();
        poller.stop(&key).unwrap();
        assert_eq!(poller.state(&key).unwrap(), PollState::Idle);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fetcher.calls(), calls);
        assert_eq!(poller.active_schedules(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_schedule_and_snapshot() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(
            vec![Ok(node_bundle(7)), Err(network_error(&key))],
            node_bundle(8),
        ));
        let (poller, store, handler) = poller_with(&key, fetcher.clone());

        poller.start(&key, Duration::from_millis(100)).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(height(&store, &key), 7);
        assert_eq!(poller.state(&key).unwrap(), PollState::Polling);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(height(&store, &key), 8);
        assert_eq!(handler.errors.load(Ordering::SeqCst), 1);
        assert_eq!(handler.updates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_now_surfaces_errors() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(network_error(&key))], node_bundle(3)));
        let (poller, store, _) = poller_with(&key, fetcher);

        let err = poller.refresh_now(&key).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(height(&store, &key), 0);

        assert_eq!(poller.refresh_now(&key).await.unwrap(), TickOutcome::Applied);
        assert_eq!(height(&store, &key), 3);
        assert_eq!(poller.state(&key).unwrap(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_unknown_key_never_fetches() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(3)));
        let (poller, _, _) = poller_with(&key, fetcher.clone());
        let stranger = EntityKey::node("n6");

        assert!(matches!(poller.refresh_now(&stranger).await, Err(SyncError::UnknownEntity(_))));
        assert!(poller.start(&stranger, Duration::from_millis(10)).is_err());
        assert!(poller.stop(&stranger).is_err());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_discards_in_flight_refresh() {
        let key = EntityKey::node("n1");
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(GatedFetcher {
            entered: entered_tx,
            gate: Notify::new(),
        });
        let (poller, store, _) = poller_with(&key, fetcher.clone());
        let poller = Arc::new(poller);

        let pending = {
            let (poller, key) = (poller.clone(), key.clone());
            tokio::spawn(async move { poller.refresh_now(&key).await })
        };

        entered_rx.recv().await.unwrap();
        poller.stop(&key).unwrap();
        fetcher.gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), TickOutcome::Discarded);
        assert_eq!(*store.get(&key), Snapshot::empty(key.kind()));
        assert!(store.last_updated(&key).is_none());
    }

    #[tokio::test]
    async fn test_stop_discards_in_flight_scheduled_tick() {
        let key = EntityKey::node("n1");
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(GatedFetcher {
            entered: entered_tx,
            gate: Notify::new(),
        });
        let (poller, store, _) = poller_with(&key, fetcher.clone());

        poller.start(&key, Duration::from_secs(60)).unwrap();
        entered_rx.recv().await.unwrap();
        poller.stop(&key).unwrap();
        fetcher.gate.notify_one();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*store.get(&key), Snapshot::empty(key.kind()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_for_one_key_never_overlap() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(SlowFetcher::default());
        let (poller, _, _) = poller_with(&key, fetcher.clone());
        let poller = Arc::new(poller);

        // Interval shorter than a fetch, plus out-of-band refreshes on top
        poller.start(&key, Duration::from_millis(10)).unwrap();
        let refreshes: Vec<_> = (0..3)
            .map(|_| {
                let (poller, key) = (poller.clone(), key.clone());
                tokio::spawn(async move { poller.refresh_now(&key).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(500)).await;
        for refresh in refreshes {
            assert_eq!(refresh.await.unwrap().unwrap(), TickOutcome::Applied);
        }

        assert!(fetcher.calls.load(Ordering::SeqCst) > 3);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_schedules() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(1)));
        let (poller, _, _) = poller_with(&key, fetcher.clone());

        poller.start(&key, Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(poller);

        let calls = fetcher.calls();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fetcher.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_rejected() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(1)));
        let (poller, _, _) = poller_with(&key, fetcher.clone());

        assert!(matches!(poller.start(&key, Duration::ZERO), Err(SyncError::ZeroInterval)));
        assert_eq!(poller.state(&key).unwrap(), PollState::Idle);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls(), 0);

        // A running schedule survives a rejected restart
        poller.start(&key, Duration::from_millis(100)).unwrap();
        assert!(poller.start(&key, Duration::ZERO).is_err());
        assert_eq!(poller.interval(&key), Some(Duration::from_millis(100)));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fetcher.calls(), 3);
    }

    struct PanickingFetcher;

    #[async_trait]
    impl EntityFetcher for PanickingFetcher {
        async fn fetch(&self, _key: &EntityKey) -> Result<RawBundle, FetchError> {
            panic!("fetcher bug");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_schedule_reports_idle() {
        let key = EntityKey::node("n1");
        let (poller, _, _) = poller_with(&key, Arc::new(PanickingFetcher));

        poller.start(&key, Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(poller.state(&key).unwrap(), PollState::Idle);
        assert_eq!(poller.active_schedules(), 0);
    }

    #[tokio::test]
    async fn test_drop_flushes_and_stops_notifications() {
        let key = EntityKey::node("n1");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![], node_bundle(3)));
        let (poller, _, handler) = poller_with(&key, fetcher);

        assert_eq!(poller.refresh_now(&key).await.unwrap(), TickOutcome::Applied);
        drop(poller);

        // The processor owns the other handler reference until it exits
        for _ in 0..100 {
            if Arc::strong_count(&handler) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(Arc::strong_count(&handler), 1);
        assert_eq!(handler.updates.load(Ordering::SeqCst), 1);
    }
}
