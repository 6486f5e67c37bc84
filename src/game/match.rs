//! Match handles and the phase-tagged toss sequencer

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::RoundEvent;
use super::phase::{PhaseTimings, TossPhase};
use super::rules::{classify, FaceSource, RandomFaces, TossOutcome};
use super::scoring::{AggregateStats, MatchState, StreakState};
use super::session::SessionStats;
use super::setup::{MatchConfig, MatchSetup, SetupWarning};
use super::snapshot::MatchSnapshot;

/// Event buffer per match; a toss emits at most three events
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Mutable part of a match, guarded by one lock
struct MatchCore {
    state: MatchState,
    faces: Box<dyn FaceSource>,
    /// Bumped on reset so a phase that already woke up cannot touch the new state
    generation: u64,
    pending: Option<TossPhase>,
    sequence: Option<JoinHandle<()>>,
    closed: bool,
    last_activity: Instant,
}

struct MatchShared {
    id: Uuid,
    config: MatchConfig,
    timings: PhaseTimings,
    session: SessionStats,
    events_tx: broadcast::Sender<RoundEvent>,
    core: Mutex<MatchCore>,
}

/// Handle to a match. Clones refer to the same match.
#[derive(Clone)]
pub struct MatchHandle {
    shared: Arc<MatchShared>,
}

impl MatchHandle {
    pub fn new(
        id: Uuid,
        config: MatchConfig,
        timings: PhaseTimings,
        session: SessionStats,
        faces: Box<dyn FaceSource>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let core = MatchCore {
            state: MatchState::new(),
            faces,
            generation: 0,
            pending: None,
            sequence: None,
            closed: false,
            last_activity: Instant::now(),
        };

        info!(
            match_id = %id,
            p1 = %config.p1_name,
            p2 = %config.p2_name,
            "Match created"
        );

        Self {
            shared: Arc::new(MatchShared {
                id,
                config,
                timings,
                session,
                events_tx,
                core: Mutex::new(core),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.shared.config
    }

    /// Request a toss. Ignored while a toss is running or after the match finished.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, since an accepted toss is
    /// spawned as a task.
    pub fn request_toss(&self) {
        self.try_request_toss();
    }

    /// Request a toss, reporting whether it was accepted
    ///
    /// # Panics
    ///
    /// Same as [`MatchHandle::request_toss`].
    pub fn try_request_toss(&self) -> bool {
        let mut core = self.shared.core.lock();
        if core.closed || !core.state.begin_toss() {
            debug!(
                match_id = %self.shared.id,
                busy = core.state.busy,
                status = ?core.state.status,
                "Toss request ignored"
            );
            return false;
        }

        let generation = core.generation;
        core.last_activity = Instant::now();
        core.pending = Some(TossPhase::Announce);
        core.sequence = Some(tokio::spawn(run_sequence(
            self.shared.clone(),
            generation,
        )));

        debug!(
            match_id = %self.shared.id,
            attempt = core.state.attempts,
            round_number = core.state.round_number,
            "Toss accepted"
        );
        true
    }

    /// Current state as a read-only copy
    pub fn snapshot(&self) -> MatchSnapshot {
        let core = self.shared.core.lock();
        MatchSnapshot::build(
            self.shared.id,
            &self.shared.config,
            &core.state,
            core.pending,
            self.shared.session.streak(),
        )
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Run `listener` for each event until the match is dropped
    pub fn on_event<F>(&self, mut listener: F) -> JoinHandle<()>
    where
        F: FnMut(RoundEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let match_id = self.shared.id;
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => listener(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(match_id = %match_id, lagged = n, "Event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Drop any running toss and return the match to idle.
    /// Session streak and aggregate stats are kept.
    pub fn reset(&self) {
        let mut core = self.shared.core.lock();
        cancel_sequence(&mut core);
        core.state = MatchState::new();
        core.last_activity = Instant::now();

        info!(match_id = %self.shared.id, "Match reset");
        self.shared.emit(RoundEvent::MatchReset {
            match_id: self.shared.id,
        });
    }

    /// Drop any running toss and refuse further requests.
    /// Subscribers get a final `match_closed` event.
    pub fn close(&self) {
        let mut core = self.shared.core.lock();
        if core.closed {
            return;
        }
        cancel_sequence(&mut core);
        core.closed = true;
        info!(match_id = %self.shared.id, "Match closed");
        self.shared.emit(RoundEvent::MatchClosed {
            match_id: self.shared.id,
        });
    }

    /// No toss running, nobody subscribed and untouched for `ttl`
    pub fn is_abandoned(&self, ttl: Duration) -> bool {
        if self.shared.events_tx.receiver_count() > 0 {
            return false;
        }
        let core = self.shared.core.lock();
        !core.state.busy && core.pending.is_none() && core.last_activity.elapsed() >= ttl
    }
}

fn cancel_sequence(core: &mut MatchCore) {
    core.generation += 1;
    core.pending = None;
    if let Some(task) = core.sequence.take() {
        task.abort();
    }
}

/// One toss: sleep until each phase is due, then run it
async fn run_sequence(shared: Arc<MatchShared>, generation: u64) {
    let mut phase = TossPhase::Announce;
    loop {
        sleep(shared.timings.delay_before(phase)).await;
        match shared.run_phase(phase, generation) {
            Some(next) => phase = next,
            None => break,
        }
    }
}

impl MatchShared {
    fn emit(&self, event: RoundEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    /// Apply `phase` and return the phase to schedule next
    fn run_phase(&self, phase: TossPhase, generation: u64) -> Option<TossPhase> {
        let mut core = self.core.lock();
        if core.generation != generation {
            debug!(match_id = %self.id, phase = ?phase, "Stale toss phase dropped");
            return None;
        }
        core.last_activity = Instant::now();

        let next = match phase {
            TossPhase::Announce => {
                self.emit(RoundEvent::TossAnnounced {
                    match_id: self.id,
                    attempt: core.state.attempts,
                    round_number: core.state.round_number,
                });
                Some(TossPhase::Resolve)
            }
            TossPhase::Resolve => {
                let faces = core.faces.draw_pair();
                match classify(faces) {
                    TossOutcome::Draw => {
                        core.state.record_draw(faces);
                        debug!(
                            match_id = %self.id,
                            round_number = core.state.round_number,
                            "Round drawn"
                        );
                        self.emit(RoundEvent::RoundDrawn {
                            match_id: self.id,
                            round_number: core.state.round_number,
                            faces,
                        });
                        Some(TossPhase::SettleDraw)
                    }
                    TossOutcome::Win(winner) => {
                        core.state.award_round(winner, faces);
                        let winner_name = self.config.name(winner);
                        let streak = self.session.record_round_win(winner_name);

                        info!(
                            match_id = %self.id,
                            round_number = core.state.round_number,
                            winner = %winner,
                            p1 = core.state.scores.p1,
                            p2 = core.state.scores.p2,
                            "Round won"
                        );
                        self.emit(RoundEvent::resolved(
                            self.id,
                            core.state.round_number,
                            winner,
                            winner_name,
                            faces,
                            core.state.scores,
                            streak,
                        ));

                        if core.state.threshold_winner().is_some() {
                            Some(TossPhase::Finish)
                        } else {
                            Some(TossPhase::SettleRound)
                        }
                    }
                }
            }
            TossPhase::SettleDraw => {
                core.state.settle_draw();
                self.emit_ready(&core.state);
                None
            }
            TossPhase::SettleRound => {
                core.state.advance_round();
                self.emit_ready(&core.state);
                None
            }
            TossPhase::Finish => {
                core.state.finish();
                let summary = self.session.record_match(&core.state, &self.config);
                let winner_name = summary.winner.map(|p| self.config.name(p).to_string());

                info!(
                    match_id = %self.id,
                    winner = ?winner_name,
                    p1 = summary.scores.p1,
                    p2 = summary.scores.p2,
                    "Match ended"
                );
                self.emit(RoundEvent::MatchEnded {
                    match_id: self.id,
                    winner: summary.winner,
                    winner_name,
                    scores: summary.scores,
                    summary: summary.message,
                });
                None
            }
        };

        core.pending = next;
        if next.is_none() {
            core.sequence = None;
        }
        next
    }

    fn emit_ready(&self, state: &MatchState) {
        self.emit(RoundEvent::TossReady {
            match_id: self.id,
            round_number: state.round_number,
        });
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id(), handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    /// Ids of matches satisfying `pred`; shard locks are released on return
    pub fn ids_where<F>(&self, pred: F) -> Vec<Uuid>
    where
        F: Fn(&MatchHandle) -> bool,
    {
        self.matches
            .iter()
            .filter(|entry| pred(entry.value()))
            .map(|entry| *entry.key())
            .collect()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the registry and the session counters shared by its matches
pub struct TossEngine {
    registry: MatchRegistry,
    session: SessionStats,
    timings: PhaseTimings,
    seed: Option<u64>,
    seeded_matches: AtomicU64,
}

impl TossEngine {
    /// `seed` makes every match's faces reproducible; `None` seeds from entropy
    pub fn new(timings: PhaseTimings, seed: Option<u64>) -> Self {
        Self {
            registry: MatchRegistry::new(),
            session: SessionStats::new(),
            timings,
            seed,
            seeded_matches: AtomicU64::new(0),
        }
    }

    /// Create and register a match from setup input
    pub fn start_match(&self, setup: MatchSetup) -> (MatchHandle, Vec<SetupWarning>) {
        let (config, warnings) = MatchConfig::from_setup(setup);
        let faces: Box<dyn FaceSource> = match self.seed {
            Some(seed) => {
                let n = self.seeded_matches.fetch_add(1, Ordering::Relaxed);
                Box::new(RandomFaces::from_seed(seed.wrapping_add(n)))
            }
            None => Box::new(RandomFaces::from_entropy()),
        };
        (self.start_match_with(config, faces), warnings)
    }

    /// Create and register a match with an explicit face source
    pub fn start_match_with(&self, config: MatchConfig, faces: Box<dyn FaceSource>) -> MatchHandle {
        let handle = MatchHandle::new(
            Uuid::new_v4(),
            config,
            self.timings,
            self.session.clone(),
            faces,
        );
        self.registry.insert(handle.clone());
        handle
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.registry.get(id)
    }

    /// Close a match and forget it. Returns false for unknown ids.
    pub fn close_match(&self, id: &Uuid) -> bool {
        match self.registry.remove(id) {
            Some(handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    pub fn active_matches(&self) -> usize {
        self.registry.active_matches()
    }

    /// Close every match abandoned for at least `ttl`, returning how many went
    pub fn evict_abandoned(&self, ttl: Duration) -> usize {
        let stale = self.registry.ids_where(|handle| handle.is_abandoned(ttl));
        let evicted = stale.iter().filter(|id| self.close_match(id)).count();
        if evicted > 0 {
            info!(
                evicted,
                remaining = self.registry.active_matches(),
                "Evicted abandoned matches"
            );
        }
        evicted
    }

    /// Run [`TossEngine::evict_abandoned`] every `every` until the task is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, ttl: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.evict_abandoned(ttl);
            }
        })
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        self.session.aggregate()
    }

    pub fn streak(&self) -> StreakState {
        self.session.streak()
    }

    pub fn session(&self) -> &SessionStats {
        &self.session
    }
}
