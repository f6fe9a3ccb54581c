//! Summaries and regression comparison over bench records.

use crate::BenchRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Records are grouped by scenario, case and stage.
type GroupKey = (String, String, String);

fn group_key(scenario: &str, case_name: &str, stage: &str) -> GroupKey {
    (scenario.to_string(), case_name.to_string(), stage.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SummaryRow {
    pub scenario: String,
    pub case_name: String,
    pub stage: String,
    pub samples: usize,
    /// Samples whose solve returned no tree.
    pub failures: usize,
    pub mean_duration_ms: f64,
    pub max_duration_ms: f64,
    pub mean_rss_delta_bytes: Option<f64>,
    pub max_rss_after_bytes: Option<u64>,
}

impl SummaryRow {
    fn key(&self) -> GroupKey {
        group_key(&self.scenario, &self.case_name, &self.stage)
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    samples: usize,
    failures: usize,
    durations_ms: Vec<f64>,
    rss_deltas: Vec<i64>,
    max_rss_after: Option<u64>,
}

impl Accumulator {
    fn push(&mut self, record: &BenchRecord) {
        self.samples += 1;
        if record.score.is_none() {
            self.failures += 1;
        }
        self.durations_ms.push(record.duration_ms);
        self.rss_deltas.extend(record.rss_delta_bytes);
        self.max_rss_after = self.max_rss_after.max(record.rss_after_bytes);
    }

    fn finish(self, (scenario, case_name, stage): GroupKey) -> SummaryRow {
        let mean_rss_delta_bytes = (!self.rss_deltas.is_empty()).then(|| {
            self.rss_deltas.iter().map(|&delta| delta as f64).sum::<f64>()
                / self.rss_deltas.len() as f64
        });
        SummaryRow {
            scenario,
            case_name,
            stage,
            samples: self.samples,
            failures: self.failures,
            mean_duration_ms: mean(&self.durations_ms),
            max_duration_ms: self.durations_ms.iter().copied().fold(0.0, f64::max),
            mean_rss_delta_bytes,
            max_rss_after_bytes: self.max_rss_after,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// One row per scenario, case and stage, ordered by that key.
pub(crate) fn summarize(records: &[BenchRecord]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for record in records {
        groups
            .entry(group_key(&record.scenario, &record.case_name, &record.stage))
            .or_default()
            .push(record);
    }
    groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompareRow {
    pub scenario: String,
    pub case_name: String,
    pub stage: String,
    pub baseline_mean_duration_ms: f64,
    pub candidate_mean_duration_ms: f64,
    pub duration_change_pct: Option<f64>,
    pub baseline_mean_rss_delta_bytes: Option<f64>,
    pub candidate_mean_rss_delta_bytes: Option<f64>,
    pub rss_change_pct: Option<f64>,
}

/// Regression limits in percent; `None` disables a check.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Thresholds {
    pub duration_pct: Option<f64>,
    pub memory_pct: Option<f64>,
}

impl CompareRow {
    pub(crate) fn regressed(&self, thresholds: Thresholds) -> bool {
        let exceeds = |limit: Option<f64>, change: Option<f64>| {
            matches!((limit, change), (Some(limit), Some(change)) if change > limit)
        };
        exceeds(thresholds.duration_pct, self.duration_change_pct)
            || exceeds(thresholds.memory_pct, self.rss_change_pct)
    }
}

/// Pair up candidate rows of `stage` with their baseline counterparts.
///
/// Groups present in only one summary are skipped.
pub(crate) fn compare(
    baseline: &[SummaryRow],
    candidate: &[SummaryRow],
    stage: &str,
) -> Vec<CompareRow> {
    let baseline: BTreeMap<GroupKey, &SummaryRow> = baseline
        .iter()
        .filter(|row| row.stage == stage)
        .map(|row| (row.key(), row))
        .collect();

    candidate
        .iter()
        .filter(|row| row.stage == stage)
        .filter_map(|cand| {
            let base = baseline.get(&cand.key())?;
            Some(CompareRow {
                scenario: cand.scenario.clone(),
                case_name: cand.case_name.clone(),
                stage: cand.stage.clone(),
                baseline_mean_duration_ms: base.mean_duration_ms,
                candidate_mean_duration_ms: cand.mean_duration_ms,
                duration_change_pct: percent_change(
                    base.mean_duration_ms,
                    cand.mean_duration_ms,
                ),
                baseline_mean_rss_delta_bytes: base.mean_rss_delta_bytes,
                candidate_mean_rss_delta_bytes: cand.mean_rss_delta_bytes,
                rss_change_pct: base
                    .mean_rss_delta_bytes
                    .zip(cand.mean_rss_delta_bytes)
                    .and_then(|(b, c)| percent_change(b, c)),
            })
        })
        .collect()
}

/// Relative change in percent, undefined for a zero baseline.
pub(crate) fn percent_change(baseline: f64, candidate: f64) -> Option<f64> {
    (baseline.abs() > f64::EPSILON).then(|| (candidate - baseline) / baseline.abs() * 100.0)
}

fn megabytes(bytes: Option<f64>) -> String {
    bytes.map_or_else(|| "-".to_string(), |b| format!("{:.3}", b / BYTES_PER_MB))
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |pct| format!("{pct:.2}"))
}

pub(crate) fn summary_table(rows: &[SummaryRow]) -> String {
    let mut out = format!(
        "{:<8} {:<12} {:<12} {:>7} {:>8} {:>12} {:>12} {:>14} {:>14}\n",
        "scenario", "case", "stage", "samples", "failures", "mean_ms", "max_ms", "mean_rss_mb",
        "max_rss_mb"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:<12} {:<12} {:>7} {:>8} {:>12.3} {:>12.3} {:>14} {:>14}",
            row.scenario,
            row.case_name,
            row.stage,
            row.samples,
            row.failures,
            row.mean_duration_ms,
            row.max_duration_ms,
            megabytes(row.mean_rss_delta_bytes),
            megabytes(row.max_rss_after_bytes.map(|b| b as f64)),
        );
    }
    out
}

pub(crate) fn compare_table(rows: &[CompareRow]) -> String {
    let mut out = format!(
        "{:<8} {:<12} {:<12} {:>12} {:>12} {:>10} {:>12} {:>12} {:>10}\n",
        "scenario", "case", "stage", "base_ms", "cand_ms", "dur_%", "base_rss_mb", "cand_rss_mb",
        "rss_%"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:<12} {:<12} {:>12.3} {:>12.3} {:>10} {:>12} {:>12} {:>10}",
            row.scenario,
            row.case_name,
            row.stage,
            row.baseline_mean_duration_ms,
            row.candidate_mean_duration_ms,
            percent(row.duration_change_pct),
            megabytes(row.baseline_mean_rss_delta_bytes),
            megabytes(row.candidate_mean_rss_delta_bytes),
            percent(row.rss_change_pct),
        );
    }
    out
}
