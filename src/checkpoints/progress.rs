//! Verification progress estimate
//!
//! Work is counted as 1.0 per transaction up to the baseline checkpoint and
//! `sigcheck_factor` per transaction after it, where signatures actually get
//! checked. Transactions not yet seen are extrapolated from the baseline's
//! daily rate.

use std::time::{SystemTime, UNIX_EPOCH};

use super::dataset::Baseline;
use crate::storage::ChainNode;

/// How many times slower transactions past the last checkpoint are expected
/// to verify. A reindex from a fast disk on a slow CPU can reach 20, a sync
/// over a slow network on a fast multicore CPU stays near 1.
pub const SIGCHECK_VERIFICATION_FACTOR: f64 = 5.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Estimate how far through verification the chain is at `node`.
///
/// Returns 0.0 for no node. The result is not clamped: clocks behind the
/// baseline can push it outside [0, 1] and callers clamp for display. With
/// an empty baseline a node with no transactions has no work on either side
/// and the result is NaN.
pub fn guess_verification_progress(
    node: Option<&ChainNode>,
    baseline: &Baseline,
    sigcheck_factor: f64,
    now: i64,
) -> f64 {
    let Some(node) = node else {
        return 0.0;
    };

    let chain_tx = node.chain_tx as f64;
    let baseline_tx = baseline.tx_count as f64;

    let (work_before, work_after) = if node.chain_tx <= baseline.tx_count {
        let cheap_before = chain_tx;
        let cheap_after = baseline_tx - chain_tx;
        let expensive_after =
            (now - baseline.timestamp) as f64 / SECONDS_PER_DAY * baseline.tx_per_day;
        (cheap_before, cheap_after + expensive_after * sigcheck_factor)
    } else {
        let cheap_before = baseline_tx;
        let expensive_before = chain_tx - baseline_tx;
        let expensive_after =
            (now - i64::from(node.time)) as f64 / SECONDS_PER_DAY * baseline.tx_per_day;
        (
            cheap_before + expensive_before * sigcheck_factor,
            expensive_after * sigcheck_factor,
        )
    };

    work_before / (work_before + work_after)
}

/// Sigcheck factor to use depending on whether signatures are verified
pub fn sigcheck_factor(sigchecks: bool) -> f64 {
    if sigchecks {
        SIGCHECK_VERIFICATION_FACTOR
    } else {
        1.0
    }
}

/// Current Unix time in seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
