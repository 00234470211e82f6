//! Minimal in-process fakes for unit tests of this crate.
//!
//! Full adapters live in `returnflow-infra`; these only cover what the unit
//! tests here need.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use returnflow_core::{
    CustomerReference, Money, OrderItemId, OrderItemUuid, ReturnId, ReturnItemId, StoreName,
};

use crate::error::{CollaboratorError, StorageError};
use crate::model::{ItemState, OrderItem, Return, ReturnItem, ReturnReason};
use crate::ports::{
    OmsEventTrigger, OmsEventTriggerResponse, OrderItemSource, ReturnQuery, ReturnRepository,
    ReturnTransaction, Store, StoreDirectory, TriggerEventData,
};
use crate::request::{OrderItemFilter, ReturnFilter, ReturnItemFilter, ReturnReasonFilter};
use crate::response::Message;

pub(crate) fn order_item(id: i64, store: &str, state: &str) -> OrderItem {
    OrderItem {
        id: OrderItemId::new(id),
        uuid: Some(OrderItemUuid::new()),
        order_reference: format!("{store}--1"),
        customer_reference: Some(CustomerReference::new("DE--42")),
        store: StoreName::new(store),
        sku: format!("sku-{id}"),
        created_at: Some(Utc::now()),
        state: Some(ItemState::named(state)),
        is_returnable: true,
        remuneration_amount: Some(Money::from_minor(id * 100)),
        refundable_amount: Money::from_minor(id * 100),
    }
}

pub(crate) fn created_at(mut item: OrderItem, at: DateTime<Utc>) -> OrderItem {
    item.created_at = Some(at);
    item
}

#[derive(Debug, Clone, Default)]
struct FakeState {
    returns: Vec<Return>,
    items: Vec<ReturnItem>,
    reasons: Vec<ReturnReason>,
    next_return_id: i64,
    next_item_id: i64,
}

impl ReturnQuery for FakeState {
    fn find_returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StorageError> {
        let mut rows: Vec<Return> = self
            .returns
            .iter()
            .filter(|r| {
                filter
                    .return_reference
                    .as_ref()
                    .is_none_or(|reference| r.reference.as_ref() == Some(reference))
                    && filter.store.as_ref().is_none_or(|store| r.store == *store)
                    && filter
                        .customer_reference
                        .as_ref()
                        .is_none_or(|c| r.customer_reference.as_ref() == Some(c))
                    && (filter.return_ids.is_empty()
                        || r.id.is_some_and(|id| filter.return_ids.contains(&id)))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(match filter.pagination {
            Some(pagination) => pagination.apply(rows),
            None => rows,
        })
    }

    fn find_return_items(
        &self,
        filter: &ReturnItemFilter,
    ) -> Result<Vec<ReturnItem>, StorageError> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.return_id.is_some_and(|id| filter.return_ids.contains(&id)))
            .cloned()
            .collect())
    }

    fn find_return_reasons(
        &self,
        _filter: &ReturnReasonFilter,
    ) -> Result<Vec<ReturnReason>, StorageError> {
        Ok(self.reasons.clone())
    }

    fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> Result<u64, StorageError> {
        Ok(self
            .returns
            .iter()
            .filter(|r| r.customer_reference.as_ref() == Some(customer_reference))
            .count() as u64)
    }
}

/// Repository that copies its whole state into every transaction.
#[derive(Debug, Default)]
pub(crate) struct FakeRepository {
    state: Mutex<FakeState>,
    sequences: Mutex<HashMap<StoreName, u64>>,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    rejecting_commits: AtomicBool,
}

impl FakeRepository {
    pub(crate) fn returns(&self) -> Vec<Return> {
        self.state.lock().map(|s| s.returns.clone()).unwrap_or_default()
    }

    pub(crate) fn return_items(&self) -> Vec<ReturnItem> {
        self.state.lock().map(|s| s.items.clone()).unwrap_or_default()
    }

    /// Store `sales_return` as if it had been committed earlier.
    pub(crate) fn seed_return(&self, sales_return: Return) {
        if let Ok(mut state) = self.state.lock() {
            state.returns.push(sales_return);
        }
    }

    pub(crate) fn seed_reasons(&self, reasons: Vec<ReturnReason>) {
        if let Ok(mut state) = self.state.lock() {
            state.reasons = reasons;
        }
    }

    /// Make every following commit fail with a conflict.
    pub(crate) fn reject_commits(&self) {
        self.rejecting_commits.store(true, Ordering::SeqCst);
    }

    pub(crate) fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub(crate) fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn current(&self) -> Result<FakeState, StorageError> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| StorageError::Poisoned)
    }
}

impl ReturnRepository for FakeRepository {
    fn snapshot(&self) -> Result<Box<dyn ReturnQuery + '_>, StorageError> {
        Ok(Box::new(self.current()?))
    }

    fn begin(&self) -> Result<Box<dyn ReturnTransaction + '_>, StorageError> {
        Ok(Box::new(FakeTransaction {
            repository: self,
            state: self.current()?,
        }))
    }
}

struct FakeTransaction<'a> {
    repository: &'a FakeRepository,
    state: FakeState,
}

impl ReturnQuery for FakeTransaction<'_> {
    fn find_returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StorageError> {
        self.state.find_returns(filter)
    }

    fn find_return_items(
        &self,
        filter: &ReturnItemFilter,
    ) -> Result<Vec<ReturnItem>, StorageError> {
        self.state.find_return_items(filter)
    }

    fn find_return_reasons(
        &self,
        filter: &ReturnReasonFilter,
    ) -> Result<Vec<ReturnReason>, StorageError> {
        self.state.find_return_reasons(filter)
    }

    fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> Result<u64, StorageError> {
        self.state.count_customer_returns(customer_reference)
    }
}

impl ReturnTransaction for FakeTransaction<'_> {
    fn next_reference_sequence(&mut self, store: &StoreName) -> Result<u64, StorageError> {
        let mut sequences = self
            .repository
            .sequences
            .lock()
            .map_err(|_| StorageError::Poisoned)?;
        let next = sequences.entry(store.clone()).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn insert_return(&mut self, mut sales_return: Return) -> Result<Return, StorageError> {
        let taken = self
            .state
            .returns
            .iter()
            .any(|r| r.store == sales_return.store && r.reference == sales_return.reference);
        if taken {
            return Err(StorageError::Conflict(format!(
                "return reference {:?}",
                sales_return.reference
            )));
        }
        self.state.next_return_id += 1;
        sales_return.id = Some(ReturnId::new(self.state.next_return_id));
        sales_return.created_at = Some(Utc::now());
        let stored = Return {
            items: Vec::new(),
            totals: None,
            ..sales_return.clone()
        };
        self.state.returns.push(stored);
        Ok(sales_return)
    }

    fn insert_return_item(&mut self, mut item: ReturnItem) -> Result<ReturnItem, StorageError> {
        if item.return_id.is_none() {
            return Err(StorageError::Integrity("return item is not bound".to_string()));
        }
        self.state.next_item_id += 1;
        item.id = Some(ReturnItemId::new(self.state.next_item_id));
        self.state.items.push(ReturnItem {
            order_item: None,
            ..item.clone()
        });
        Ok(item)
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        if self.repository.rejecting_commits.load(Ordering::SeqCst) {
            return Err(StorageError::Conflict("commit rejected".to_string()));
        }
        let mut state = self
            .repository
            .state
            .lock()
            .map_err(|_| StorageError::Poisoned)?;
        *state = self.state;
        self.repository.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.repository.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Order subsystem answering from a fixed item list.
///
/// Handles (ids or uuids) match disjunctively; customer and order references
/// narrow the result.
#[derive(Debug, Default)]
pub(crate) struct FakeOrderItems {
    items: Vec<OrderItem>,
    calls: AtomicUsize,
}

impl FakeOrderItems {
    pub(crate) fn new(items: Vec<OrderItem>) -> Self {
        Self {
            items,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OrderItemSource for FakeOrderItems {
    fn get_order_items(
        &self,
        filter: &OrderItemFilter,
    ) -> Result<Vec<OrderItem>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let by_handle = !filter.order_item_ids.is_empty() || !filter.order_item_uuids.is_empty();
        Ok(self
            .items
            .iter()
            .filter(|item| {
                (!by_handle
                    || filter.order_item_ids.contains(&item.id)
                    || item
                        .uuid
                        .is_some_and(|uuid| filter.order_item_uuids.contains(&uuid)))
                    && (filter.customer_references.is_empty()
                        || item
                            .customer_reference
                            .as_ref()
                            .is_some_and(|c| filter.customer_references.contains(c)))
                    && (filter.order_references.is_empty()
                        || filter.order_references.contains(&item.order_reference))
            })
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeStores {
    stores: HashMap<StoreName, Store>,
}

impl FakeStores {
    pub(crate) fn with(mut self, store: Store) -> Self {
        self.stores.insert(store.name.clone(), store);
        self
    }
}

impl StoreDirectory for FakeStores {
    fn find_store(&self, name: &StoreName) -> Result<Option<Store>, CollaboratorError> {
        Ok(self.stores.get(name).cloned())
    }
}

/// State machine that answers every trigger with the same data.
#[derive(Debug)]
pub(crate) struct FakeOms {
    data: TriggerEventData,
    triggered: Mutex<Vec<(String, Vec<OrderItemId>)>>,
    reverted: Mutex<Vec<(String, Vec<OrderItemId>)>>,
}

impl FakeOms {
    pub(crate) fn succeeding() -> Self {
        Self::answering(
            TriggerEventData::with_response(&OmsEventTriggerResponse {
                is_successful: true,
                messages: Vec::new(),
            })
            .unwrap(),
        )
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::answering(
            TriggerEventData::with_response(&OmsEventTriggerResponse {
                is_successful: false,
                messages: vec![Message::new(message)],
            })
            .unwrap(),
        )
    }

    pub(crate) fn answering(data: TriggerEventData) -> Self {
        Self {
            data,
            triggered: Mutex::new(Vec::new()),
            reverted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn triggered(&self) -> Vec<(String, Vec<OrderItemId>)> {
        self.triggered.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub(crate) fn reverted(&self) -> Vec<(String, Vec<OrderItemId>)> {
        self.reverted.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl OmsEventTrigger for FakeOms {
    fn trigger_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<TriggerEventData, CollaboratorError> {
        if let Ok(mut triggered) = self.triggered.lock() {
            triggered.push((event_name.to_string(), order_item_ids.to_vec()));
        }
        Ok(self.data.clone())
    }

    fn revert_event_for_order_items(
        &self,
        event_name: &str,
        order_item_ids: &[OrderItemId],
    ) -> Result<(), CollaboratorError> {
        if let Ok(mut reverted) = self.reverted.lock() {
            reverted.push((event_name.to_string(), order_item_ids.to_vec()));
        }
        Ok(())
    }
}
