// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome collection for traffic simulation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Collects outcomes during a simulation run.
#[derive(Debug, Default)]
pub struct TrafficMetrics {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    outcomes: HashMap<Outcome, usize>,
    /// Allowed requests by client
    allowed_per_client: HashMap<String, usize>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    Other,
}

impl TrafficMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, client: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome == Outcome::Allowed {
            *self.allowed_per_client.entry(client.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Most requests any single client got through.
    pub fn max_allowed_per_client(&self) -> usize {
        self.allowed_per_client.values().copied().max().unwrap_or(0)
    }

    pub fn clients_served(&self) -> usize {
        self.allowed_per_client.len()
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Ratio of blocked to total.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.count(Outcome::RateLimited) as f64 / total as f64
    }
}

impl std::fmt::Display for TrafficMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Traffic Report ===")?;
        writeln!(f, "Duration:        {} ms", self.duration().as_millis())?;
        writeln!(f, "Total Requests:  {}", self.total_requests())?;
        writeln!(f, "Allowed:         {}", self.count(Outcome::Allowed))?;
        writeln!(f, "Rate Limited:    {}", self.count(Outcome::RateLimited))?;
        writeln!(f, "Other:           {}", self.count(Outcome::Other))?;
        writeln!(f, "Block Rate:      {:.1}%", self.block_rate() * 100.0)?;
        writeln!(f, "Clients Served:  {}", self.clients_served())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_rate() {
        let mut metrics = TrafficMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1");
        }
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, "10.0.0.1");
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
        assert_eq!(metrics.max_allowed_per_client(), 3);
    }
}
