//! Sliding window of what users did with predictions.

use std::collections::VecDeque;

/// User response to a shown prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    Accepted,
    /// The user picked a different destination
    Overridden,
    Dismissed,
}

/// Bounded FIFO of recent outcomes
#[derive(Debug, Clone)]
pub struct OutcomeWindow {
    capacity: usize,
    outcomes: VecDeque<PredictionOutcome>,
}

impl OutcomeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            outcomes: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn push(&mut self, outcome: PredictionOutcome) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    fn rate(&self, outcome: PredictionOutcome) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let hits = self.outcomes.iter().filter(|o| **o == outcome).count();
        Some(hits as f64 / self.outcomes.len() as f64)
    }

    pub fn acceptance_rate(&self) -> Option<f64> {
        self.rate(PredictionOutcome::Accepted)
    }

    pub fn override_rate(&self) -> Option<f64> {
        self.rate(PredictionOutcome::Overridden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut window = OutcomeWindow::new(100);
        assert_eq!(window.acceptance_rate(), None);

        for _ in 0..6 {
            window.push(PredictionOutcome::Accepted);
        }
        for _ in 0..3 {
            window.push(PredictionOutcome::Overridden);
        }
        window.push(PredictionOutcome::Dismissed);

        assert_eq!(window.len(), 10);
        assert_eq!(window.acceptance_rate(), Some(0.6));
        assert_eq!(window.override_rate(), Some(0.3));
    }

    #[test]
    fn test_oldest_outcomes_fall_out() {
        let mut window = OutcomeWindow::new(3);
        window.push(PredictionOutcome::Overridden);
        window.push(PredictionOutcome::Accepted);
        window.push(PredictionOutcome::Accepted);
        window.push(PredictionOutcome::Accepted);

        assert_eq!(window.len(), 3);
        assert_eq!(window.override_rate(), Some(0.0));
        assert_eq!(window.acceptance_rate(), Some(1.0));
    }
}
