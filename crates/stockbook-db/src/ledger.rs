//! # Stock Ledger
//!
//! Applies stock movements to the catalog's running stock.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_movement(type, lines, created_by, notes)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. snapshot = products.snapshot(line product ids)     (one query)     │
//! │  2. plan     = core::plan_movement(type, lines, snapshot, policy)      │
//! │       │         └── any error here: nothing written                    │
//! │       ▼                                                                 │
//! │  3. for each planned product, in first-seen order:                     │
//! │       products.apply_stock_op(id, op)      (compare-and-set, retried)  │
//! │       │                                                                 │
//! │       ├── failure ──► Partial:    stop, report applied changes         │
//! │       │               Compensate: reverse applied changes, report      │
//! │       ▼                                                                 │
//! │  4. movements.insert(movement)             (append-only record)        │
//! │       ▼                                                                 │
//! │  MovementReceipt { movement_id, new_stock[], skipped[] }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each product update is atomic on its own. There is no transaction across
//! products: a movement touching three products can fail after the first
//! one was written. That exposure is reported through
//! [`LedgerError::Persistence`], never hidden.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{BatchFailureMode, LedgerConfig};
use crate::error::{DbError, LedgerError, LedgerResult};
use crate::pool::Database;
use stockbook_core::ledger::{plan_movement, MovementPlan, SkippedLine};
use stockbook_core::validation::validate_reference;
use stockbook_core::{MissingProductPolicy, MovementLine, MovementType, StockMovement, StockOp};

/// One product's stock before and after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub product_id: String,
    pub previous: Decimal,
    pub new: Decimal,
}

/// Outcome of a successfully applied movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementReceipt {
    pub movement_id: String,
    pub movement_type: MovementType,
    /// New stock per affected product, in first-seen order.
    pub new_stock: Vec<StockChange>,
    /// Lines that changed nothing because their product was not found.
    pub skipped: Vec<SkippedLine>,
}

/// The stock ledger service.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
    config: LedgerConfig,
}

impl StockLedger {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        StockLedger { db, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Applies a movement and records it.
    ///
    /// ## Errors
    /// - [`LedgerError::Core`]: rejected before any write
    /// - [`LedgerError::Persistence`]: the store was unreachable, or a write
    ///   failed mid-batch; see `applied` (empty when nothing was written)
    /// - [`LedgerError::Db`]: the catalog snapshot could not be read for any
    ///   other reason, nothing written
    pub async fn apply_movement(
        &self,
        movement_type: MovementType,
        lines: &[MovementLine],
        created_by: &str,
        notes: Option<&str>,
    ) -> LedgerResult<MovementReceipt> {
        validate_reference("created_by", created_by)?;

        let mut ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let snapshot = self
            .db
            .products()
            .snapshot(&ids)
            .await
            .map_err(LedgerError::before_write)?;
        let plan = plan_movement(
            movement_type,
            lines,
            &snapshot,
            self.config.missing_product_policy,
        )?;

        for skipped in &plan.skipped {
            warn!(
                line = skipped.line_index,
                product_id = %skipped.product_id,
                "Skipping movement line for unknown product"
            );
        }

        let (new_stock, vanished) = self.apply_plan(&plan).await?;

        let mut skipped = plan.skipped;
        skipped.extend(vanished);
        skipped.sort_by_key(|s| s.line_index);

        let now = Utc::now();
        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            movement_type,
            lines: lines.to_vec(),
            notes: notes.map(str::to_string),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };

        if let Err(source) = self.db.movements().insert(&movement).await {
            return Err(self.fail_batch(source, new_stock).await);
        }

        info!(
            movement_id = %movement.id,
            movement_type = %movement_type,
            products = new_stock.len(),
            skipped = skipped.len(),
            "Stock movement applied"
        );

        Ok(MovementReceipt {
            movement_id: movement.id,
            movement_type,
            new_stock,
            skipped,
        })
    }

    /// Writes every planned update. Products deleted since the snapshot are
    /// returned as skipped lines under the lenient policy.
    async fn apply_plan(
        &self,
        plan: &MovementPlan,
    ) -> LedgerResult<(Vec<StockChange>, Vec<SkippedLine>)> {
        let products = self.db.products();
        let mut applied = Vec::with_capacity(plan.updates.len());
        let mut vanished = Vec::new();

        for update in &plan.updates {
            match products
                .apply_stock_op(&update.product_id, update.op, self.config.max_cas_retries)
                .await
            {
                Ok(change) => applied.push(change),
                Err(DbError::NotFound { .. })
                    if self.config.missing_product_policy == MissingProductPolicy::Lenient =>
                {
                    warn!(
                        product_id = %update.product_id,
                        "Product removed during movement, skipping"
                    );
                    vanished.extend(update.line_indexes.iter().map(|&line_index| SkippedLine {
                        line_index,
                        product_id: update.product_id.clone(),
                    }));
                }
                Err(source) => return Err(self.fail_batch(source, applied).await),
            }
        }

        Ok((applied, vanished))
    }

    /// Builds the error for a batch that failed after `applied` was written,
    /// compensating first if configured to.
    async fn fail_batch(&self, source: DbError, applied: Vec<StockChange>) -> LedgerError {
        error!(
            error = %source,
            applied = applied.len(),
            "Stock movement failed part-way"
        );

        if self.config.batch_failure_mode == BatchFailureMode::Partial || applied.is_empty() {
            return LedgerError::Persistence { source, applied };
        }

        warn!(count = applied.len(), "Compensating applied stock changes");

        let products = self.db.products();
        let mut unreverted = Vec::new();

        for change in applied.into_iter().rev() {
            let Some(delta) = change.previous.checked_sub(change.new) else {
                error!(product_id = %change.product_id, "Compensation delta out of range");
                unreverted.push(change);
                continue;
            };
            let reverse = StockOp::Adjust(delta);
            match products
                .apply_stock_op(&change.product_id, reverse, self.config.max_cas_retries)
                .await
            {
                Ok(_) => debug!(product_id = %change.product_id, "Stock change reversed"),
                Err(e) => {
                    error!(product_id = %change.product_id, error = %e, "Compensation failed");
                    unreverted.push(change);
                }
            }
        }

        unreverted.reverse();
        LedgerError::Persistence {
            source,
            applied: unreverted,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
