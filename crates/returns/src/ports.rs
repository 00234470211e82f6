//! Boundaries to the collaborators this engine consumes.
//!
//! - [`ReturnRepository`]: snapshot reads + scoped write transactions
//! - [`OrderItemSource`]: order items owned by the order subsystem
//! - [`StoreDirectory`]: store-scope rules
//! - [`OmsEventTrigger`]: the order management state machine
//!
//! All ports are synchronous and `Send + Sync`; adapters decide how they reach
//! their backends.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use returnflow_core::{CustomerReference, OrderItemId, StoreName};

use crate::error::{CollaboratorError, StorageError};
use crate::model::{OrderItem, Return, ReturnItem, ReturnReason};
use crate::request::{OrderItemFilter, ReturnFilter, ReturnItemFilter, ReturnReasonFilter};
use crate::response::Message;

/// Read access to returns as of one consistent point in time.
pub trait ReturnQuery {
    /// Returns matching the filter, without items or totals, newest first.
    fn find_returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StorageError>;

    /// Return items of the given returns, without resolved order items.
    fn find_return_items(&self, filter: &ReturnItemFilter)
    -> Result<Vec<ReturnItem>, StorageError>;

    fn find_return_reasons(
        &self,
        filter: &ReturnReasonFilter,
    ) -> Result<Vec<ReturnReason>, StorageError>;

    fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> Result<u64, StorageError>;
}

/// Scoped write transaction.
///
/// Reads through the transaction see its own uncommitted writes; nothing is
/// visible to other readers before [`ReturnTransaction::commit`]. Dropping a
/// transaction without committing rolls it back.
pub trait ReturnTransaction: ReturnQuery {
    /// Allocate the next reference sequence value for a store.
    ///
    /// Allocation is atomic at the storage layer and survives rollbacks.
    fn next_reference_sequence(&mut self, store: &StoreName) -> Result<u64, StorageError>;

    /// Persist a return and assign its identity.
    ///
    /// Fails with [`StorageError::Conflict`] when `(store, reference)` is taken.
    fn insert_return(&mut self, sales_return: Return) -> Result<Return, StorageError>;

    /// Persist a return item bound to an already inserted return.
    fn insert_return_item(&mut self, item: ReturnItem) -> Result<ReturnItem, StorageError>;

    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}

/// Return persistence.
pub trait ReturnRepository: Send + Sync {
    fn snapshot(&self) -> Result<Box<dyn ReturnQuery + '_>, StorageError>;

    fn begin(&self) -> Result<Box<dyn ReturnTransaction + '_>, StorageError>;
}

impl<R> ReturnRepository for Arc<R>
where
    R: ReturnRepository + ?Sized,
{
    fn snapshot(&self) -> Result<Box<dyn ReturnQuery + '_>, StorageError> {
        (**self).snapshot()
    }

    fn begin(&self) -> Result<Box<dyn ReturnTransaction + '_>, StorageError> {
        (**self).begin()
    }
}

/// Order items resolved through the order subsystem.
pub trait OrderItemSource: Send + Sync {
    fn get_order_items(&self, filter: &OrderItemFilter)
    -> Result<Vec<OrderItem>, CollaboratorError>;
}

impl<S> OrderItemSource for Arc<S>
where
    S: OrderItemSource + ?Sized,
{
    fn get_order_items(
        &self,
        filter: &OrderItemFilter,
    ) -> Result<Vec<OrderItem>, CollaboratorError> {
        (**self).get_order_items(filter)
    }
}

/// A store and the stores whose orders it may take returns for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub name: StoreName,
    #[serde(default)]
    pub shares_orders_with: BTreeSet<StoreName>,
}

impl Store {
    pub fn new(name: StoreName) -> Self {
        Self {
            name,
            shares_orders_with: BTreeSet::new(),
        }
    }

    pub fn sharing_with(mut self, other: StoreName) -> Self {
        self.shares_orders_with.insert(other);
        self
    }

    /// `true` when items sold in `item_store` may be returned through this store.
    pub fn accepts_items_from(&self, item_store: &StoreName) -> bool {
        self.name == *item_store || self.shares_orders_with.contains(item_store)
    }
}

/// Store-scope rules.
pub trait StoreDirectory: Send + Sync {
    fn find_store(&self, name: &StoreName) -> Result<Option<Store>, CollaboratorError>;
}

impl<S> StoreDirectory for Arc<S>
where
    S: StoreDirectory + ?Sized,
{
    fn find_store(&self, name: &StoreName) -> Result<Option<Store>, CollaboratorError> {
        (**self).find_store(name)
    }
}

/// Well-known key of the state machine's own outcome inside [`TriggerEventData`].
pub const OMS_EVENT_TRIGGER_RESPONSE: &str = "oms_event_trigger_response";

/// Outcome reported by the order state machine for a triggered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmsEventTriggerResponse {
    pub is_successful: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Structured result of an event trigger, keyed by well-known response keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerEventData(BTreeMap<String, JsonValue>);

impl TriggerEventData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data carrying only the state machine response.
    pub fn with_response(response: &OmsEventTriggerResponse) -> Result<Self, serde_json::Error> {
        let mut data = Self::new();
        data.insert(OMS_EVENT_TRIGGER_RESPONSE, serde_json::to_value(response)?);
        Ok(data)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Decode the state machine response, if one was reported.
    pub fn event_trigger_response(
        &self,
    ) -> Option<Result<OmsEventTriggerResponse, serde_json::Error>> {
        self.get(OMS_EVENT_TRIGGER_RESPONSE)
            .map(|value| serde_json::from_value(value.clone()))
    }
}

/// The order management state machine.
pub trait OmsEventTrigger: Send + Sync {
    fn trigger_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<TriggerEventData, CollaboratorError>;

    /// Undo a successful trigger of `event_name` for the same items.
    ///
    /// Called when the storage transaction the trigger belonged to does not
    /// commit. Items go back to the state they had before the trigger.
    fn revert_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<(), CollaboratorError>;
}

impl<T> OmsEventTrigger for Arc<T>
where
    T: OmsEventTrigger + ?Sized,
{
    fn trigger_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<TriggerEventData, CollaboratorError> {
        (**self).trigger_event_for_order_items(event_name, order_item_ids)
    }

    fn revert_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<(), CollaboratorError> {
        (**self).revert_event_for_order_items(event_name, order_item_ids)
    }
}
