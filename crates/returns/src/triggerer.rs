//! Propagates created returns into the order state machine.

use std::sync::Arc;

use tracing::{debug, warn};

use returnflow_core::OrderItemId;

use crate::config::ReturnsConfig;
use crate::error::ReturnResult;
use crate::model::Return;
use crate::ports::{OMS_EVENT_TRIGGER_RESPONSE, OmsEventTrigger, TriggerEventData};
use crate::response::Message;

pub struct OmsEventTriggerer {
    config: Arc<ReturnsConfig>,
    oms: Arc<dyn OmsEventTrigger>,
}

impl OmsEventTriggerer {
    pub fn new(config: Arc<ReturnsConfig>, oms: Arc<dyn OmsEventTrigger>) -> Self {
        Self { config, oms }
    }

    /// Fire the configured return event for every order item of the return.
    pub fn trigger_order_items_return_event(
        &self,
        sales_return: &Return,
    ) -> ReturnResult<TriggerEventData> {
        let order_item_ids = sales_return.order_item_ids();
        debug!(
            event = %self.config.return_event_name,
            items = order_item_ids.len(),
            "triggering order items return event"
        );
        Ok(self
            .oms
            .trigger_event_for_order_items(&self.config.return_event_name, &order_item_ids)?)
    }

    /// Undo a successful return event for items whose return was not persisted.
    pub fn revert_order_items_return_event(
        &self,
        order_item_ids: &[OrderItemId],
    ) -> ReturnResult<()> {
        warn!(
            event = %self.config.return_event_name,
            items = order_item_ids.len(),
            "reverting order items return event"
        );
        Ok(self
            .oms
            .revert_event_for_order_items(&self.config.return_event_name, order_item_ids)?)
    }
}

impl core::fmt::Debug for OmsEventTriggerer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OmsEventTriggerer")
            .field("event", &self.config.return_event_name)
            .finish_non_exhaustive()
    }
}

/// Failure messages carried by trigger data, or `None` when the trigger succeeded.
///
/// Only an explicit `is_successful: false` is a failure. Missing or
/// undecodable response data is logged and treated as success.
pub(crate) fn trigger_failure(data: &TriggerEventData) -> Option<Vec<Message>> {
    match data.event_trigger_response() {
        Some(Ok(response)) if !response.is_successful => Some(response.messages),
        Some(Ok(_)) => None,
        Some(Err(err)) => {
            warn!(
                key = OMS_EVENT_TRIGGER_RESPONSE,
                error = %err,
                "undecodable event trigger response, assuming success"
            );
            None
        }
        None => {
            warn!(
                key = OMS_EVENT_TRIGGER_RESPONSE,
                "event trigger returned no response, assuming success"
            );
            None
        }
    }
}
