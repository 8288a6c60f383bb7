//! Rendering of sweep banners and final rankings.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use wt_types::ScoredResult;

const RULE: &str = "====================================================================";

/// Size of a sweep, known before any candidate is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub workers: usize,
    pub candidates: usize,
    pub repeats: usize,
}

impl SweepPlan {
    /// Collaborator invocations the sweep will make.
    pub fn invocations(&self) -> usize {
        self.candidates.saturating_mul(self.repeats)
    }

    pub fn banner(&self) -> String {
        format!(
            "Using {} workers\nTesting {} weight combinations, {} runs each...\nTotal command executions: {}\n",
            self.workers,
            self.candidates,
            self.repeats,
            self.invocations()
        )
    }
}

/// Final ranked result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Configuration names in dimension order.
    pub names: Vec<String>,
    /// Decimal places used when printing candidate values.
    pub precision: usize,
    pub top_k: usize,
    /// Every result, best first.
    pub ranked: Vec<ScoredResult>,
}

impl SweepReport {
    pub fn new(
        names: Vec<String>,
        precision: usize,
        top_k: usize,
        ranked: Vec<ScoredResult>,
    ) -> Self {
        Self {
            names,
            precision,
            top_k,
            ranked,
        }
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// The first `top_k` results, fewer if the sweep was smaller.
    pub fn top(&self) -> &[ScoredResult] {
        &self.ranked[..self.top_k.min(self.ranked.len())]
    }

    pub fn best(&self) -> Option<&ScoredResult> {
        self.ranked.first()
    }

    /// Ranked listing of the top results. Empty for an empty sweep.
    pub fn render_top(&self) -> String {
        let mut out = String::new();
        if self.is_empty() {
            return out;
        }

        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "TOP {} RESULTS:", self.top().len());
        let _ = writeln!(out, "{RULE}");
        for (rank, result) in self.top().iter().enumerate() {
            let _ = writeln!(out, "{}. Avg Score: {:.2}", rank + 1, result.mean);
            for (name, value) in self.names.iter().zip(result.candidate.values()) {
                let _ = writeln!(out, "   {}: {:.*}", name, self.precision, value);
            }
            if result.failed_runs > 0 {
                let _ = writeln!(out, "   (failed runs: {})", result.failed_runs);
            }
            out.push('\n');
        }
        out
    }

    /// Best configuration as shell `export` lines. Empty for an empty sweep.
    pub fn render_best(&self) -> String {
        let mut out = String::new();
        let Some(best) = self.best() else {
            return out;
        };

        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "BEST CONFIGURATION:");
        let _ = writeln!(out, "{RULE}");
        for (name, value) in self.names.iter().zip(best.candidate.values()) {
            let _ = writeln!(out, "export {}={:.*}", name, self.precision, value);
        }
        out
    }

    pub fn render(&self) -> String {
        format!("{}{}", self.render_top(), self.render_best())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wt_types::Candidate;

    fn report(n: usize, top_k: usize) -> SweepReport {
        let ranked = (0..n)
            .map(|i| ScoredResult {
                ordinal: i,
                candidate: Candidate::new(vec![i as f64 * 0.5, 1.0]),
                mean: (n - i) as f64,
                failed_runs: 0,
            })
            .collect();
        SweepReport::new(vec!["WEIGHT_A".into(), "WEIGHT_B".into()], 1, top_k, ranked)
    }

    #[test]
    fn banner_counts_invocations() {
        let plan = SweepPlan {
            workers: 8,
            candidates: 3125,
            repeats: 10,
        };
        assert_eq!(plan.invocations(), 31_250);
        let banner = plan.banner();
        assert!(banner.contains("Using 8 workers"));
        assert!(banner.contains("Testing 3125 weight combinations, 10 runs each..."));
        assert!(banner.contains("Total command executions: 31250"));
    }

    #[test]
    fn top_is_capped() {
        assert_eq!(report(25, 10).top().len(), 10);
        assert_eq!(report(3, 10).top().len(), 3);
    }

    #[test]
    fn render_top_lists_ranks_and_values() {
        let text = report(3, 2).render_top();
        assert!(text.contains("TOP 2 RESULTS:"));
        assert!(text.contains("1. Avg Score: 3.00"));
        assert!(text.contains("2. Avg Score: 2.00"));
        assert!(!text.contains("3. Avg Score"));
        assert!(text.contains("   WEIGHT_A: 0.5"));
    }

    #[test]
    fn header_counts_listed_results() {
        let text = report(3, 10).render_top();
        assert!(text.contains("TOP 3 RESULTS:"));
        assert!(text.contains("3. Avg Score: 1.00"));
    }

    #[test]
    fn render_best_as_exports() {
        let text = report(3, 10).render_best();
        assert!(text.contains("BEST CONFIGURATION:"));
        assert!(text.contains("export WEIGHT_A=0.0\n"));
        assert!(text.contains("export WEIGHT_B=1.0\n"));
    }

    #[test]
    fn empty_report_renders_nothing() {
        let empty = report(0, 10);
        assert!(empty.top().is_empty());
        assert!(empty.best().is_none());
        assert_eq!(empty.render(), "");
    }

    #[test]
    fn json_lists_ranked_results() {
        let json = report(4, 2).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["names"][0], "WEIGHT_A");
        assert_eq!(value["ranked"].as_array().unwrap().len(), 4);
        assert_eq!(value["ranked"][0]["mean"], 4.0);
        assert_eq!(value["ranked"][0]["candidate"][1], 1.0);
    }
}
