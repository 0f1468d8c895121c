//! Statistics tracking for training runs.

use serde::{Deserialize, Serialize};

/// Statistics for one evaluated epoch
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// Epoch index, from 0
    pub epoch: usize,
    /// Pool generation the scores belong to
    pub generation: u64,
    /// Best fitness this epoch
    pub best: f32,
    /// Mean fitness across the pool (NaN scores skipped)
    pub mean: f32,
    /// Genomes that scored above zero
    pub nonzero: usize,
    /// Pool size
    pub population: usize,
    /// Pool was discarded and regenerated after this epoch
    pub reinitialized: bool,
    /// Wall-clock time spent evaluating, in milliseconds
    pub elapsed_ms: u64,
}

impl EpochStats {
    /// Summarize one epoch's scores
    pub fn from_scores(epoch: usize, generation: u64, scores: &[f32]) -> Self {
        let valid: Vec<f32> = scores.iter().copied().filter(|s| !s.is_nan()).collect();
        let best = valid.iter().copied().fold(0.0f32, f32::max);
        let mean = if valid.is_empty() {
            0.0
        } else {
            valid.iter().sum::<f32>() / valid.len() as f32
        };

        Self {
            epoch,
            generation,
            best,
            mean,
            nonzero: valid.iter().filter(|&&s| s > 0.0).count(),
            population: scores.len(),
            reinitialized: false,
            elapsed_ms: 0,
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Epoch:{:4} | Gen:{:4} | Best:{:8.2} | Mean:{:8.2} | Scored:{:4}/{:<4}{}",
            self.epoch,
            self.generation,
            self.best,
            self.mean,
            self.nonzero,
            self.population,
            if self.reinitialized { " | reinit" } else { "" }
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsHistory {
    pub epochs: Vec<EpochStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: EpochStats) {
        self.epochs.push(stats);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }

    /// Best fitness over time
    pub fn best_series(&self) -> Vec<(usize, f32)> {
        self.epochs.iter().map(|s| (s.epoch, s.best)).collect()
    }

    /// Mean fitness over time
    pub fn mean_series(&self) -> Vec<(usize, f32)> {
        self.epochs.iter().map(|s| (s.epoch, s.mean)).collect()
    }

    /// Highest best-of-epoch score seen
    pub fn best_overall(&self) -> Option<&EpochStats> {
        self.epochs
            .iter()
            .max_by(|a, b| a.best.partial_cmp(&b.best).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn reinitializations(&self) -> usize {
        self.epochs.iter().filter(|s| s.reinitialized).count()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scores() {
        let stats = EpochStats::from_scores(3, 2, &[0.0, 4.0, f32::NAN, 2.0]);
        assert_eq!(stats.epoch, 3);
        assert_eq!(stats.best, 4.0);
        assert!((stats.mean - 2.0).abs() < 1e-6);
        assert_eq!(stats.nonzero, 2);
        assert_eq!(stats.population, 4);
    }

    #[test]
    fn test_empty_scores() {
        let stats = EpochStats::from_scores(0, 0, &[]);
        assert_eq!(stats.best, 0.0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new();
        for i in 0..5 {
            let mut stats = EpochStats::from_scores(i, i as u64, &[i as f32 * 2.0]);
            stats.reinitialized = i == 0;
            history.record(stats);
        }

        let series = history.best_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[4], (4, 8.0));
        assert_eq!(history.mean_series().len(), 5);
        assert_eq!(history.best_overall().unwrap().epoch, 4);
        assert_eq!(history.reinitializations(), 1);
    }

    #[test]
    fn test_history_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let path = path.to_str().unwrap();

        let mut history = StatsHistory::new();
        history.record(EpochStats::from_scores(0, 0, &[1.0, 3.0]));
        history.save(path).unwrap();

        assert_eq!(StatsHistory::load(path).unwrap(), history);
    }
}
