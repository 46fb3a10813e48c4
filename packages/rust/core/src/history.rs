//! Bounded conversation memory.

use std::collections::VecDeque;

use webrag_shared::Exchange;

/// Number of recent exchanges shown to the model in each prompt.
pub const PROMPT_HISTORY_LEN: usize = 2;

/// Capacity-bounded, insertion-ordered exchange log.
///
/// Recording past capacity evicts the oldest exchange.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Exchange>,
    cap: usize,
}

impl History {
    /// Create an empty history holding at most `cap` exchanges.
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Append an exchange, evicting from the front until within capacity.
    pub fn record(&mut self, exchange: Exchange) {
        self.entries.push_back(exchange);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The last `n` exchanges, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&Exchange> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(i: usize) -> Exchange {
        Exchange::new(format!("q{i}"), format!("a{i}"))
    }

    #[test]
    fn never_exceeds_cap_and_keeps_order() {
        let mut history = History::new(10);
        for i in 1..=25 {
            history.record(exchange(i));
            assert!(history.len() <= 10);
        }

        let users: Vec<&str> = history.iter().map(Exchange::user).collect();
        let expected: Vec<String> = (16..=25).map(|i| format!("q{i}")).collect();
        assert_eq!(users, expected);
    }

    #[test]
    fn recent_returns_tail_oldest_first() {
        let mut history = History::new(5);
        for i in 1..=4 {
            history.record(exchange(i));
        }
        let recent: Vec<&str> = history.recent(2).into_iter().map(Exchange::user).collect();
        assert_eq!(recent, vec!["q3", "q4"]);
    }

    #[test]
    fn recent_with_short_history() {
        let mut history = History::new(5);
        assert!(history.recent(2).is_empty());
        history.record(exchange(1));
        assert_eq!(history.recent(2).len(), 1);
    }

    #[test]
    fn clear_empties() {
        let mut history = History::new(3);
        history.record(exchange(1));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn zero_cap_keeps_nothing() {
        let mut history = History::new(0);
        history.record(exchange(1));
        assert!(history.is_empty());
    }
}
