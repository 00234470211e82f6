use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use tracing::debug;

use returnflow_core::OrderItemId;
use returnflow_returns::{
    CollaboratorError, ItemState, Message, OmsEventTrigger, OmsEventTriggerResponse, OrderItem,
    OrderItemFilter, OrderItemSource, TriggerEventData, glossary,
};

use super::{DEFAULT_RETURN_TRANSITIONS, TRANSITION_NOT_ALLOWED, TRANSITION_PARAM_EVENT};

const COLLABORATOR: &str = "in_memory_order_subsystem";

/// Order items plus a transition table `(state, event) -> state`.
///
/// A trigger either moves every requested item or none of them. Applied
/// triggers are journaled per `(item, event)` so they can be reverted.
#[derive(Debug)]
pub struct InMemoryOrderSubsystem {
    items: RwLock<BTreeMap<OrderItemId, OrderItem>>,
    transitions: HashMap<(String, String), String>,
    applied: Mutex<HashMap<(OrderItemId, String), Vec<Option<ItemState>>>>,
}

impl Default for InMemoryOrderSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderSubsystem {
    /// Empty subsystem knowing the default return transitions.
    pub fn new() -> Self {
        let mut subsystem = Self {
            items: RwLock::new(BTreeMap::new()),
            transitions: HashMap::new(),
            applied: Mutex::new(HashMap::new()),
        };
        for (from, event, to) in DEFAULT_RETURN_TRANSITIONS {
            subsystem = subsystem.with_transition(from, event, to);
        }
        subsystem
    }

    pub fn with_transition(
        mut self,
        from: impl Into<String>,
        event: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.transitions
            .insert((from.into(), event.into()), to.into());
        self
    }

    pub fn with_items(self, items: impl IntoIterator<Item = OrderItem>) -> Self {
        for item in items {
            self.insert_item(item);
        }
        self
    }

    pub fn insert_item(&self, item: OrderItem) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item.id, item);
        }
    }

    pub fn item(&self, id: OrderItemId) -> Option<OrderItem> {
        self.items.read().ok()?.get(&id).cloned()
    }

    fn target_state(&self, item: &OrderItem, event_name: &str) -> Option<&String> {
        let from = item.state_name()?;
        self.transitions
            .get(&(from.to_string(), event_name.to_string()))
    }
}

impl OrderItemSource for InMemoryOrderSubsystem {
    /// Handles (ids or uuids) match disjunctively; customer and order
    /// references narrow the result. An empty filter matches every item.
    fn get_order_items(
        &self,
        filter: &OrderItemFilter,
    ) -> Result<Vec<OrderItem>, CollaboratorError> {
        let items = self
            .items
            .read()
            .map_err(|_| CollaboratorError::new(COLLABORATOR, "lock poisoned"))?;

        let by_handle = !filter.order_item_ids.is_empty() || !filter.order_item_uuids.is_empty();
        Ok(items
            .values()
            .filter(|item| {
                let handle_matches = !by_handle
                    || filter.order_item_ids.contains(&item.id)
                    || item
                        .uuid
                        .is_some_and(|uuid| filter.order_item_uuids.contains(&uuid));
                let customer_matches = filter.customer_references.is_empty()
                    || item
                        .customer_reference
                        .as_ref()
                        .is_some_and(|c| filter.customer_references.contains(c));
                let order_matches = filter.order_references.is_empty()
                    || filter.order_references.contains(&item.order_reference);
                handle_matches && customer_matches && order_matches
            })
            .cloned()
            .collect())
    }
}

impl OmsEventTrigger for InMemoryOrderSubsystem {
    fn trigger_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<TriggerEventData, CollaboratorError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| CollaboratorError::new(COLLABORATOR, "lock poisoned"))?;

        let mut moves = Vec::with_capacity(order_item_ids.len());
        let mut messages = Vec::new();
        for id in order_item_ids {
            match items.get(id).and_then(|item| self.target_state(item, event_name)) {
                Some(to) => moves.push((*id, to.clone())),
                None => messages.push(
                    Message::new(TRANSITION_NOT_ALLOWED)
                        .with_parameter(glossary::PARAM_HANDLE, id.to_string())
                        .with_parameter(TRANSITION_PARAM_EVENT, event_name),
                ),
            }
        }

        if !messages.is_empty() {
            debug!(event = event_name, rejected = messages.len(), "event rejected");
            return response_data(false, messages);
        }

        let mut applied = self
            .applied
            .lock()
            .map_err(|_| CollaboratorError::new(COLLABORATOR, "lock poisoned"))?;
        for (id, to) in moves {
            if let Some(item) = items.get_mut(&id) {
                let previous = item.state.replace(ItemState::named(to));
                applied
                    .entry((id, event_name.to_string()))
                    .or_default()
                    .push(previous);
            }
        }
        debug!(event = event_name, items = order_item_ids.len(), "event applied");
        response_data(true, Vec::new())
    }

    fn revert_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<(), CollaboratorError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| CollaboratorError::new(COLLABORATOR, "lock poisoned"))?;
        let mut applied = self
            .applied
            .lock()
            .map_err(|_| CollaboratorError::new(COLLABORATOR, "lock poisoned"))?;

        let key = |id: &OrderItemId| (*id, event_name.to_string());
        if let Some(id) = order_item_ids
            .iter()
            .find(|id| applied.get(&key(*id)).is_none_or(Vec::is_empty))
        {
            return Err(CollaboratorError::new(
                COLLABORATOR,
                format!("event {event_name} was never applied to order item {id}"),
            ));
        }

        for id in order_item_ids {
            let previous = applied.get_mut(&key(id)).and_then(Vec::pop);
            if let (Some(item), Some(previous)) = (items.get_mut(id), previous) {
                item.state = previous;
            }
        }
        debug!(event = event_name, items = order_item_ids.len(), "event reverted");
        Ok(())
    }
}

fn response_data(
    is_successful: bool,
    messages: Vec<Message>,
) -> Result<TriggerEventData, CollaboratorError> {
    TriggerEventData::with_response(&OmsEventTriggerResponse {
        is_successful,
        messages,
    })
    .map_err(|e| CollaboratorError::new(COLLABORATOR, format!("encoding trigger response: {e}")))
}
