//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Synthetic order-flow generation for the offline simulator: limit, market
// and cancel events arrive as a Poisson mixture; limit prices are placed a
// few ticks away from a reference mid so the book tends to stay non-crossed.
//--------------------------------------------------------------------------------------------------

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::simulator::Event;
use crate::types::{OrderId, Price, Qty, Side, Ts};

/// Arrival intensities and placement parameters for generated flow.
#[derive(Debug, Clone, Copy)]
pub struct FlowParams {
    /// Limit order arrivals per second.
    pub lambda_limit: f64,
    /// Market order arrivals per second.
    pub lambda_market: f64,
    /// Cancel attempts per second.
    pub lambda_cancel: f64,
    /// Price placement around mid, in ticks.
    pub max_offset_ticks: i64,
    /// Quantity range (uniform).
    pub min_qty: Qty,
    pub max_qty: Qty,
    /// Reference mid the flow quotes around.
    pub ref_mid: Price,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            lambda_limit: 50.0,
            lambda_market: 5.0,
            lambda_cancel: 10.0,
            max_offset_ticks: 20,
            min_qty: 1,
            max_qty: 20,
            ref_mid: 10_000,
        }
    }
}

/// Seeded generator of timestamped replay events.
pub struct OrderFlowGenerator {
    rng: ChaCha8Rng,
    params: FlowParams,
    next_id: OrderId,
}

impl OrderFlowGenerator {
    pub fn new(seed: u64, params: FlowParams) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            params,
            next_id: 1,
        }
    }

    fn sample_side(&mut self) -> Side {
        if self.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    fn sample_qty(&mut self) -> Qty {
        let hi = self.params.max_qty.max(self.params.min_qty);
        self.rng.gen_range(self.params.min_qty..=hi)
    }

    /// Exponential inter-arrival sample for the combined intensity.
    fn sample_dt_seconds(&mut self, lambda: f64) -> f64 {
        let u: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        -u.ln() / lambda
    }

    fn limit_price_around(&mut self, mid: Price, side: Side) -> Price {
        let offset = self.rng.gen_range(1..=self.params.max_offset_ticks.max(1));
        match side {
            Side::Buy => mid - offset,
            Side::Sell => mid + offset,
        }
    }

    /// Best-effort cancel target: a uniformly drawn past id. Many will have
    /// already filled or never rested; the simulator just counts those.
    fn sample_cancel_id(&mut self) -> Option<OrderId> {
        if self.next_id <= 5 {
            return None;
        }
        Some(self.rng.gen_range(1..self.next_id))
    }

    /// Generates events in `[t0, t0 + horizon_seconds)`.
    pub fn generate(&mut self, t0_ns: Ts, horizon_seconds: f64) -> Vec<Event> {
        let mut out = Vec::new();
        let horizon_ns = horizon_seconds * 1e9;

        let lambda_total =
            self.params.lambda_limit + self.params.lambda_market + self.params.lambda_cancel;
        if lambda_total <= 0.0 {
            return out;
        }

        let mut t = 0.0f64;
        loop {
            t += self.sample_dt_seconds(lambda_total) * 1e9;
            if t >= horizon_ns {
                break;
            }
            let ts = t0_ns + t as Ts;

            // choose the event type by intensity mixture
            let u = self.rng.gen::<f64>() * lambda_total;
            if u < self.params.lambda_limit {
                let side = self.sample_side();
                let qty = self.sample_qty();
                let price = self.limit_price_around(self.params.ref_mid, side);
                let id = self.next_id;
                self.next_id += 1;
                out.push(Event::AddLimit {
                    id,
                    ts,
                    side,
                    price,
                    qty,
                    owner: 1,
                });
            } else if u < self.params.lambda_limit + self.params.lambda_market {
                let side = self.sample_side();
                let qty = self.sample_qty();
                let id = self.next_id;
                self.next_id += 1;
                out.push(Event::AddMarket {
                    id,
                    ts,
                    side,
                    qty,
                    owner: 2,
                });
            } else if let Some(id) = self.sample_cancel_id() {
                out.push(Event::Cancel { id, ts });
            }
        }

        out
    }
}
