use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::order::Side;

struct QueueState {
    /// BUY orders parked at the upper daily limit, per symbol.
    limit_up: HashMap<String, VecDeque<String>>,
    /// SELL orders parked at the lower daily limit, per symbol.
    limit_down: HashMap<String, VecDeque<String>>,
}

impl QueueState {
    fn queue_for(&mut self, side: Side, symbol: &str) -> &mut VecDeque<String> {
        let map = match side {
            Side::Buy => &mut self.limit_up,
            Side::Sell => &mut self.limit_down,
        };
        map.entry(symbol.to_string()).or_default()
    }
}

/// Per-symbol FIFO queues for orders parked at the daily price limit. Orders
/// enter only from `try_match` returning `PriceLimitParked`; they leave via
/// drain (full, on the price opening, or partial, while still stuck) or via
/// `remove_from_queue` on cancellation.
pub struct LimitQueue {
    inner: Mutex<QueueState>,
}

impl Default for LimitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LimitQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueState {
                limit_up: HashMap::new(),
                limit_down: HashMap::new(),
            }),
        }
    }

    pub fn enqueue(&self, side: Side, symbol: &str, order_id: String) {
        self.inner.lock().queue_for(side, symbol).push_back(order_id);
    }

    /// Releases queued order ids for `(side, symbol)`. If `still_at_limit` is
    /// false the price has opened: every queued order drains. Otherwise
    /// releases `max(1, queue_size / 10)` orders from the front (integer
    /// division), modeling a standing order's chance of being reached while
    /// the tape stays stuck (spec §4.4).
    pub fn drain(&self, side: Side, symbol: &str, still_at_limit: bool) -> Vec<String> {
        let mut state = self.inner.lock();
        let queue = state.queue_for(side, symbol);
        if queue.is_empty() {
            return Vec::new();
        }
        let release_count = if still_at_limit {
            (queue.len() / 10).max(1)
        } else {
            queue.len()
        };
        queue.drain(..release_count.min(queue.len())).collect()
    }

    pub fn queue_len(&self, side: Side, symbol: &str) -> usize {
        self.inner.lock().queue_for(side, symbol).len()
    }

    /// Scans both queues for `order_id`, removes the first match. Returns
    /// whether an order was found and removed.
    pub fn remove_from_queue(&self, order_id: &str) -> bool {
        let mut state = self.inner.lock();
        for queue in state.limit_up.values_mut().chain(state.limit_down.values_mut()) {
            if let Some(pos) = queue.iter().position(|id| id == order_id) {
                queue.remove(pos);
                return true;
            }
        }
        false
    }
}
