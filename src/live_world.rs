//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The live runtime: one worker thread owns the matching engine and drives a
// deterministic tick loop; everyone else talks to it through a command queue
// and bounded read caches, all behind a single mutex.
//
// Per tick, in order: flush due phase transitions, drain queued external
// commands FIFO, step participants in insertion order, record the top of
// book. Every mutation of engine/ledger/caches happens on the worker thread
// inside the lock; enqueue and snapshot calls take the same lock briefly.
//
// | Component     | Description                                                  |
// |---------------|--------------------------------------------------------------|
// | WorldConfig   | Tick interval + realtime pacing toggle                       |
// | OrderAck      | Assigned id + admission verdict returned on enqueue          |
// | LiveSnapshot  | ts, quotes, last trade, recent trades                        |
// | BookDepth     | Cached top-N level summaries per side                        |
// | WorldStats    | Counters: steps, orders, cancels, modifies, rejects, trades  |
// | LiveWorld     | Owner of engine, ledger, caches, command queue, worker       |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::ledger::{self, Account, OrderMeta};
use crate::matching_engine::MatchingEngine;
use crate::participants::{Action, MarketView, Participant, ParticipantState};
use crate::rng::derive_stream_seed;
use crate::simulator::BookTop;
use crate::types::{
    midprice, LevelSummary, Order, OrderId, OrderStatus, OwnerId, Price, Qty, RejectReason, Side,
    Trade, Ts,
};

/// Recent trades kept for snapshot reads.
const MAX_CACHE_TRADES: usize = 50_000;
/// Depth levels kept in the read cache.
const DEPTH_CACHE_LEVELS: usize = 20;

/// Tick configuration for the worker loop.
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    /// Nanoseconds of exchange time per tick.
    pub dt_ns: Ts,
    /// Sleep `dt_ns` of wall time between ticks. Disabled for offline runs
    /// and tests; tick content is identical either way.
    pub realtime: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            dt_ns: 1_000_000,
            realtime: true,
        }
    }
}

/// Enqueue acknowledgement for a manual order submission.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderAck {
    /// The id the order will carry (assigned when submitted with id 0).
    pub id: OrderId,
    pub status: OrderStatus,
    pub reject_reason: RejectReason,
}

/// Point of the mid series.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LiveMidPoint {
    pub ts: Ts,
    pub mid: Option<Price>,
}

/// Read snapshot served to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSnapshot {
    pub ts: Ts,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub mid: Option<Price>,
    pub last_trade: Option<Price>,
    /// Newest first.
    pub recent_trades: Vec<Trade>,
}

/// Cached L2 depth, best-first on both sides.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookDepth {
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
}

/// Run counters, updated by the worker.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WorldStats {
    pub steps: u64,
    pub orders_sent: u64,
    pub cancels_sent: u64,
    pub modifies_sent: u64,
    pub rejects: u64,
    pub trades: u64,
}

/// External command queued for the worker.
enum Command {
    Submit(Order),
    Cancel(OrderId),
    ModifyQty { id: OrderId, new_qty: Qty },
}

/// Everything the single lock guards.
struct WorldState {
    engine: MatchingEngine,
    accounts: HashMap<OwnerId, Account>,
    order_meta: HashMap<OrderId, OrderMeta>,
    commands: VecDeque<Command>,
    trades: VecDeque<Trade>,
    tops: VecDeque<BookTop>,
    depth: BookDepth,
    ts: Ts,
    local_seq: u32,
    max_cache_tops: usize,
    stats: WorldStats,
}

impl WorldState {
    fn new(engine: MatchingEngine) -> Self {
        Self {
            engine,
            accounts: HashMap::new(),
            order_meta: HashMap::new(),
            commands: VecDeque::new(),
            trades: VecDeque::new(),
            tops: VecDeque::new(),
            depth: BookDepth::default(),
            ts: 0,
            local_seq: 1,
            max_cache_tops: 200_000,
            stats: WorldStats::default(),
        }
    }

    /// Owner in the high bits, shared local sequence in the low bits.
    fn make_scoped_id(&mut self, owner: OwnerId) -> OrderId {
        let hi = (owner & 0xFFFF_FFFF) << 32;
        let lo = u64::from(self.local_seq);
        self.local_seq += 1;
        hi | lo
    }

    /// Folds freshly emitted trades into the caches and the ledger.
    fn absorb_trades(&mut self, trades: &[Trade]) {
        if trades.is_empty() {
            return;
        }
        self.stats.trades += trades.len() as u64;
        for t in trades.iter().rev() {
            self.trades.push_front(*t);
        }
        while self.trades.len() > MAX_CACHE_TRADES {
            self.trades.pop_back();
        }

        let mid = midprice(self.engine.book().best_bid(), self.engine.book().best_ask());
        ledger::apply_trades(self.ts, trades, &self.order_meta, &mut self.accounts, mid);
    }

    /// Runs one order through the engine with the current tick's timestamp.
    fn process_submission(&mut self, mut order: Order) {
        order.ts = self.ts;
        if order.id == 0 {
            order.id = self.make_scoped_id(order.owner);
        }
        self.order_meta.insert(
            order.id,
            OrderMeta {
                owner: order.owner,
                side: order.side,
            },
        );

        self.stats.orders_sent += 1;
        let res = self.engine.process(order);
        if res.status == OrderStatus::Rejected {
            self.stats.rejects += 1;
        }
        self.absorb_trades(&res.trades);
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Submit(order) => self.process_submission(order),
            Action::Cancel(id) => {
                self.stats.cancels_sent += 1;
                let _ = self.engine.book_mut().cancel(id);
            }
            Action::ModifyQty { id, new_qty } => {
                self.stats.modifies_sent += 1;
                let _ = self.engine.book_mut().modify_qty(id, new_qty);
            }
        }
    }

    /// One deterministic tick: flush, drain commands, step participants,
    /// record the top of book.
    fn tick(&mut self, participants: &mut [Box<dyn Participant>]) {
        self.stats.steps += 1;

        let flushed = self.engine.flush(self.ts);
        self.absorb_trades(&flushed);

        while let Some(cmd) = self.commands.pop_front() {
            let action = match cmd {
                Command::Submit(order) => Action::Submit(order),
                Command::Cancel(id) => Action::Cancel(id),
                Command::ModifyQty { id, new_qty } => Action::ModifyQty { id, new_qty },
            };
            self.apply_action(action);
        }

        let view = MarketView {
            ts: self.ts,
            best_bid: self.engine.book().best_bid(),
            best_ask: self.engine.book().best_ask(),
            mid: midprice(self.engine.book().best_bid(), self.engine.book().best_ask()),
            last_trade: self.engine.rules().last_trade_price(),
            bid_depth: Vec::new(),
            ask_depth: Vec::new(),
        };

        let mut actions = Vec::with_capacity(8);
        for participant in participants.iter_mut() {
            let owner = participant.owner();
            let account = self.accounts.get(&owner).copied().unwrap_or_default();
            let state = ParticipantState {
                owner,
                cash_ticks: account.cash_ticks,
                position: account.position,
            };

            actions.clear();
            participant.step(self.ts, &view, &state, &mut actions);
            for action in actions.drain(..) {
                self.apply_action(action);
            }
        }

        let top = BookTop::sample(self.ts, &self.engine);
        self.tops.push_back(top);
        while self.tops.len() > self.max_cache_tops {
            self.tops.pop_front();
        }

        self.depth = BookDepth {
            bids: self.engine.book().depth(Side::Buy, DEPTH_CACHE_LEVELS),
            asks: self.engine.book().depth(Side::Sell, DEPTH_CACHE_LEVELS),
        };
    }
}

/// Single-writer live harness around a `MatchingEngine`.
///
/// The worker thread spawned by `start` is the sole mutator; readers and
/// command producers share the one mutex for O(1) enqueues and bounded
/// snapshot copies. Given a fixed seed, participant set, and tick interval,
/// two runs without external commands produce identical trade and top
/// sequences.
pub struct LiveWorld {
    state: Arc<Mutex<WorldState>>,
    participants: Mutex<Vec<Box<dyn Participant>>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LiveWorld {
    pub fn new(engine: MatchingEngine) -> Self {
        Self {
            state: Arc::new(Mutex::new(WorldState::new(engine))),
            participants: Mutex::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Registers a participant. Insertion order is the stepping order and
    /// feeds the seed derivation, so it is part of the deterministic input.
    pub fn add_participant(&self, participant: Box<dyn Participant>) {
        self.participants.lock().push(participant);
    }

    /// Starts the worker: seeds participants from the world seed, then ticks
    /// exchange time from 0 to the horizon in `dt_ns` steps.
    pub fn start(&self, seed: u64, horizon_seconds: f64, cfg: WorldConfig) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let dt = cfg.dt_ns.max(1);
        let horizon_ns = (horizon_seconds * 1e9).round() as Ts;

        let mut participants = std::mem::take(&mut *self.participants.lock());
        let mut sm_state = seed;
        for (i, p) in participants.iter_mut().enumerate() {
            p.seed(derive_stream_seed(&mut sm_state, i));
        }

        {
            let mut st = self.state.lock();
            st.max_cache_tops = (horizon_ns / dt + 1).max(1) as usize;
        }

        info!(seed, horizon_ns, dt, realtime = cfg.realtime, "live world starting");

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let handle = std::thread::spawn(move || {
            worker_loop(state, participants, running, horizon_ns, dt, cfg.realtime);
        });
        *self.worker.lock() = Some(handle);
    }

    /// Signals the worker to stop and joins it. Outstanding queued commands
    /// may be discarded.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    /// Blocks until the worker finished its horizon (offline runs).
    pub fn wait(&self) {
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    // -----------------------------------------------------------------
    // Command enqueue (thread-safe, O(1) critical sections)
    // -----------------------------------------------------------------

    /// Enqueues an order for the next tick. An id of 0 is assigned here so
    /// the caller can correlate; the verdict is a pre-validation against the
    /// current rules — the engine re-admits when the command drains.
    pub fn submit_order(&self, mut order: Order) -> OrderAck {
        let mut st = self.state.lock();
        if order.id == 0 {
            order.id = st.make_scoped_id(order.owner);
        }

        let decision = st.engine.rules().pre_accept(&order);
        if !decision.accept {
            debug!(order_id = order.id, reason = ?decision.reason, "submission pre-rejected");
            return OrderAck {
                id: order.id,
                status: OrderStatus::Rejected,
                reject_reason: decision.reason,
            };
        }

        st.commands.push_back(Command::Submit(order));
        OrderAck {
            id: order.id,
            status: OrderStatus::Accepted,
            reject_reason: RejectReason::None,
        }
    }

    /// Enqueues a cancel for the next tick.
    pub fn cancel_order(&self, id: OrderId) -> bool {
        self.state.lock().commands.push_back(Command::Cancel(id));
        true
    }

    /// Enqueues a reduce-only modify for the next tick.
    pub fn modify_qty(&self, id: OrderId, new_qty: Qty) -> bool {
        self.state
            .lock()
            .commands
            .push_back(Command::ModifyQty { id, new_qty });
        true
    }

    // -----------------------------------------------------------------
    // Read projections (bounded copies under the lock)
    // -----------------------------------------------------------------

    pub fn snapshot(&self, max_trades: usize) -> LiveSnapshot {
        let st = self.state.lock();
        let best_bid = st.engine.book().best_bid();
        let best_ask = st.engine.book().best_ask();
        LiveSnapshot {
            ts: st.ts,
            best_bid,
            best_ask,
            mid: midprice(best_bid, best_ask),
            last_trade: st.engine.rules().last_trade_price(),
            recent_trades: st.trades.iter().take(max_trades).copied().collect(),
        }
    }

    /// Mid series over the trailing `window_ns` of exchange time.
    pub fn mid_series(&self, window_ns: Ts) -> Vec<LiveMidPoint> {
        let st = self.state.lock();
        let cutoff = st.ts.saturating_sub(window_ns);
        st.tops
            .iter()
            .filter(|t| t.ts >= cutoff)
            .map(|t| LiveMidPoint { ts: t.ts, mid: t.mid })
            .collect()
    }

    /// Cached book depth, truncated to `levels` per side.
    pub fn book_depth(&self, levels: usize) -> BookDepth {
        let st = self.state.lock();
        BookDepth {
            bids: st.depth.bids.iter().take(levels).copied().collect(),
            asks: st.depth.asks.iter().take(levels).copied().collect(),
        }
    }

    /// Full top series (oldest first), for offline CSV output.
    pub fn top_series(&self) -> Vec<BookTop> {
        self.state.lock().tops.iter().copied().collect()
    }

    /// All trades currently cached, oldest first, for offline CSV output.
    pub fn trade_log(&self) -> Vec<Trade> {
        let st = self.state.lock();
        st.trades.iter().rev().copied().collect()
    }

    /// Account snapshot sorted by owner id.
    pub fn accounts_snapshot(&self) -> Vec<(OwnerId, Account)> {
        let st = self.state.lock();
        let mut out: Vec<(OwnerId, Account)> = st.accounts.iter().map(|(k, v)| (*k, *v)).collect();
        out.sort_by_key(|(owner, _)| *owner);
        out
    }

    pub fn stats(&self) -> WorldStats {
        self.state.lock().stats
    }

    pub fn current_ts(&self) -> Ts {
        self.state.lock().ts
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for LiveWorld {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The worker loop: sole mutator of the world state.
fn worker_loop(
    state: Arc<Mutex<WorldState>>,
    mut participants: Vec<Box<dyn Participant>>,
    running: Arc<AtomicBool>,
    horizon_ns: Ts,
    dt: Ts,
    realtime: bool,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        {
            let mut st = state.lock();
            if st.ts > horizon_ns {
                break;
            }
            st.tick(&mut participants);
            st.ts += dt;
        }

        if realtime {
            std::thread::sleep(Duration::from_nanos(dt as u64));
        }
    }

    running.store(false, Ordering::SeqCst);
    info!("live world worker stopped");
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                              | Description                                         |
// |-----------------------------------|-----------------------------------------------------|
// | test_manual_submit_and_match      | Commands drain FIFO and trade within one tick       |
// | test_scoped_id_assignment         | id 0 becomes (owner << 32) | seq                    |
// | test_pre_rejected_submission      | Invalid submissions are acked Rejected, not queued  |
// | test_cancel_via_queue             | Cancels drain on the next tick                      |
// | test_top_series_strictly_increasing | One top per tick, strictly increasing ts          |
// | test_ledger_tracks_manual_trades  | Buyer/seller accounts move after a cross            |
//--------------------------------------------------------------------------------------------------
