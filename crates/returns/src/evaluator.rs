//! Returnability evaluation.
//!
//! Two independent annotation passes over order items. Each pass can only
//! clear `is_returnable`; neither ever sets it back, so the passes compose in
//! any order.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use returnflow_core::{DomainError, DomainResult};

use crate::config::ReturnsConfig;
use crate::model::OrderItem;

#[derive(Debug, Clone)]
pub struct ReturnabilityEvaluator {
    config: Arc<ReturnsConfig>,
}

impl ReturnabilityEvaluator {
    pub fn new(config: Arc<ReturnsConfig>) -> Self {
        Self { config }
    }

    /// Clear the flag on items older than the returnable window, as of now.
    pub fn expand_with_is_returnable(&self, items: Vec<OrderItem>) -> Vec<OrderItem> {
        self.expand_with_is_returnable_at(items, Utc::now())
    }

    /// Clear the flag on items whose age at `now` reached the returnable window.
    ///
    /// Items without a creation timestamp are left untouched. An age of
    /// exactly the window already counts as expired.
    pub fn expand_with_is_returnable_at(
        &self,
        mut items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Vec<OrderItem> {
        let window = i64::from(self.config.global_returnable_number_of_days);

        for item in &mut items {
            let Some(created_at) = item.created_at else {
                continue;
            };
            let elapsed_days = (now - created_at).num_days().abs();
            if elapsed_days >= window {
                item.is_returnable = false;
            }
        }

        items
    }

    /// Clear the flag on items whose state is not in the returnable allow-list.
    ///
    /// Every item must carry a named state.
    pub fn expand_with_is_returnable_by_item_state(
        &self,
        mut items: Vec<OrderItem>,
    ) -> DomainResult<Vec<OrderItem>> {
        for item in &mut items {
            let state = item
                .state
                .as_ref()
                .ok_or_else(|| DomainError::required(format!("order_item[{}].state", item.id)))?;
            let name = state
                .name
                .as_deref()
                .ok_or_else(|| {
                    DomainError::required(format!("order_item[{}].state.name", item.id))
                })?;

            if !self.config.is_returnable_state(name) {
                item.is_returnable = false;
            }
        }

        Ok(items)
    }

    /// Both passes, starting from a returnable flag reset to `true`.
    pub fn evaluate_at(
        &self,
        mut items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<OrderItem>> {
        for item in &mut items {
            item.is_returnable = true;
        }
        let items = self.expand_with_is_returnable_by_item_state(items)?;
        Ok(self.expand_with_is_returnable_at(items, now))
    }
}
