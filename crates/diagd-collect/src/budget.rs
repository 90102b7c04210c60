//! Adaptive budget for the inspect export
//!
//! Predicts how many uncompressed bytes the inspect export may produce so
//! that the next snapshot archive lands near a target compressed size.
//!
//! After every archive the budget is scaled by `target / previous_total`,
//! where `previous_total` is the compressed size of the whole archive, then
//! clamped to `[min_bytes, max_bytes]`. This single-step proportional
//! controller has no memory of trend. It only converges when the budget and
//! the archive size are close to linearly related.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use diagd_core::config::BudgetConfig;
use diagd_core::domain::keys::ATTACHMENT_INSPECT;
use diagd_core::domain::metrics::INSPECT_BUDGET_METRIC_ID;
use diagd_telemetry::MetricsLogger;
use tracing::{debug, info};

/// Number of `(budget, archive size)` pairs kept for diagnostics
pub const HISTORY_LEN: usize = 10;

/// One budget decision and the archive size it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetRecord {
    pub budget_bytes: usize,
    pub previous_archive_bytes: usize,
}

/// Byte ceiling for the inspect export
pub struct InspectDataBudget {
    /// `None` iff the budget is disabled
    current_bytes: Option<usize>,
    min_bytes: usize,
    max_bytes: usize,
    target_archive_bytes: usize,
    history: VecDeque<BudgetRecord>,
    logger: Arc<MetricsLogger>,
}

impl InspectDataBudget {
    /// Creates the budget; the enabled state is fixed for its lifetime.
    pub fn new(config: &BudgetConfig, logger: Arc<MetricsLogger>) -> Self {
        let current_bytes = config.enabled.then_some(config.max_bytes);
        info!(
            enabled = config.enabled,
            min_bytes = config.min_bytes,
            max_bytes = config.max_bytes,
            target_archive_bytes = config.target_archive_bytes,
            "Inspect budget initialized"
        );

        Self {
            current_bytes,
            min_bytes: config.min_bytes,
            max_bytes: config.max_bytes,
            target_archive_bytes: config.target_archive_bytes,
            history: VecDeque::with_capacity(HISTORY_LEN),
            logger,
        }
    }

    /// Current ceiling, `None` when the budget is disabled.
    pub fn size_in_bytes(&self) -> Option<usize> {
        self.current_bytes
    }

    /// Learns from the compressed entry sizes of the last archive.
    pub fn update(&mut self, compressed_sizes: &BTreeMap<String, usize>) {
        let Some(current) = self.current_bytes else {
            return;
        };

        if !compressed_sizes.contains_key(ATTACHMENT_INSPECT) {
            debug!("Archive has no inspect entry, keeping budget");
            return;
        }

        let previous_total: usize = compressed_sizes.values().sum();
        if previous_total == 0 {
            debug!("Archive is empty, keeping budget");
            return;
        }

        let ratio = self.target_archive_bytes as f64 / previous_total as f64;
        let scaled = (current as f64 * ratio).round();
        let new_budget = if scaled >= self.max_bytes as f64 {
            self.max_bytes
        } else {
            (scaled as usize).clamp(self.min_bytes, self.max_bytes)
        };

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(BudgetRecord {
            budget_bytes: new_budget,
            previous_archive_bytes: previous_total,
        });

        info!(
            previous_budget = current,
            new_budget,
            previous_archive_bytes = previous_total,
            "Inspect budget updated"
        );
        self.current_bytes = Some(new_budget);
        self.logger
            .log_integer(INSPECT_BUDGET_METRIC_ID, vec![], new_budget as u64);
    }

    /// Past decisions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &BudgetRecord> {
        self.history.iter()
    }
}
