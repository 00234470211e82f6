//! Listing of a customer's currently returnable order items.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::ReturnResult;
use crate::evaluator::ReturnabilityEvaluator;
use crate::model::OrderItem;
use crate::ports::OrderItemSource;
use crate::request::{OrderItemFilter, ReturnableItemFilter};

pub struct ReturnableItemReader {
    order_items: Arc<dyn OrderItemSource>,
    evaluator: ReturnabilityEvaluator,
}

impl ReturnableItemReader {
    pub fn new(order_items: Arc<dyn OrderItemSource>, evaluator: ReturnabilityEvaluator) -> Self {
        Self {
            order_items,
            evaluator,
        }
    }

    #[instrument(skip(self))]
    pub fn get_returnable_items(
        &self,
        filter: &ReturnableItemFilter,
    ) -> ReturnResult<Vec<OrderItem>> {
        self.get_returnable_items_at(filter, Utc::now())
    }

    pub fn get_returnable_items_at(
        &self,
        filter: &ReturnableItemFilter,
        now: DateTime<Utc>,
    ) -> ReturnResult<Vec<OrderItem>> {
        let customer_reference = filter.require_customer_reference()?;
        let order_filter = OrderItemFilter {
            customer_references: vec![customer_reference.clone()],
            order_references: filter.order_references.clone(),
            ..OrderItemFilter::default()
        };

        let items = self.order_items.get_order_items(&order_filter)?;
        let candidates = items.len();
        let returnable: Vec<OrderItem> = self
            .evaluator
            .evaluate_at(items, now)?
            .into_iter()
            .filter(|item| item.is_returnable)
            .collect();

        debug!(candidates, returnable = returnable.len(), "listed returnable items");
        Ok(returnable)
    }
}

impl core::fmt::Debug for ReturnableItemReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReturnableItemReader")
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}
