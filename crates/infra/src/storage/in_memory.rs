use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::debug;

use returnflow_core::{CustomerReference, ReturnId, ReturnItemId, ReturnReasonId, StoreName};
use returnflow_returns::{
    Return, ReturnFilter, ReturnItem, ReturnItemFilter, ReturnQuery, ReturnReason,
    ReturnReasonFilter, ReturnRepository, ReturnTransaction, StorageError,
};

/// Committed rows. Returns are stored without items or totals.
#[derive(Debug, Clone, Default)]
struct StorageState {
    returns: BTreeMap<ReturnId, Return>,
    references: HashSet<(StoreName, String)>,
    items: BTreeMap<ReturnItemId, ReturnItem>,
    reasons: BTreeMap<ReturnReasonId, ReturnReason>,
}

/// In-memory return storage with snapshot reads and all-or-nothing commits.
///
/// Readers clone an `Arc` of the committed state and never block writers.
/// Reference sequences are allocated outside transactions and are never
/// handed out twice.
#[derive(Debug)]
pub struct InMemoryReturnStorage {
    state: RwLock<Arc<StorageState>>,
    sequences: Mutex<HashMap<StoreName, u64>>,
    next_return_id: AtomicI64,
    next_item_id: AtomicI64,
}

impl Default for InMemoryReturnStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReturnStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(StorageState::default())),
            sequences: Mutex::new(HashMap::new()),
            next_return_id: AtomicI64::new(1),
            next_item_id: AtomicI64::new(1),
        }
    }

    /// Storage pre-filled with return reasons, keyed by glossary key, ids from 1.
    pub fn with_return_reasons<I, S>(glossary_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = StorageState::default();
        for (idx, key) in glossary_keys.into_iter().enumerate() {
            let id = ReturnReasonId::new(idx as i64 + 1);
            state.reasons.insert(
                id,
                ReturnReason {
                    id,
                    glossary_key: key.into(),
                },
            );
        }
        Self {
            state: RwLock::new(Arc::new(state)),
            ..Self::new()
        }
    }

    fn committed(&self) -> Result<Arc<StorageState>, StorageError> {
        self.state
            .read()
            .map(|state| Arc::clone(&state))
            .map_err(|_| StorageError::Poisoned)
    }
}

impl ReturnRepository for InMemoryReturnStorage {
    fn snapshot(&self) -> Result<Box<dyn ReturnQuery + '_>, StorageError> {
        Ok(Box::new(InMemorySnapshot {
            state: self.committed()?,
        }))
    }

    fn begin(&self) -> Result<Box<dyn ReturnTransaction + '_>, StorageError> {
        Ok(Box::new(InMemoryTransaction {
            storage: self,
            base: self.committed()?,
            staged_returns: Vec::new(),
            staged_items: Vec::new(),
        }))
    }
}

struct InMemorySnapshot {
    state: Arc<StorageState>,
}

impl ReturnQuery for InMemorySnapshot {
    fn find_returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StorageError> {
        Ok(select_returns(self.state.returns.values(), filter))
    }

    fn find_return_items(
        &self,
        filter: &ReturnItemFilter,
    ) -> Result<Vec<ReturnItem>, StorageError> {
        Ok(select_items(self.state.items.values(), filter))
    }

    fn find_return_reasons(
        &self,
        filter: &ReturnReasonFilter,
    ) -> Result<Vec<ReturnReason>, StorageError> {
        Ok(select_reasons(&self.state, filter))
    }

    fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> Result<u64, StorageError> {
        Ok(count_for_customer(self.state.returns.values(), customer_reference))
    }
}

/// Writes staged on top of the state committed when the transaction began.
///
/// Dropping the transaction discards the staged writes.
struct InMemoryTransaction<'a> {
    storage: &'a InMemoryReturnStorage,
    base: Arc<StorageState>,
    staged_returns: Vec<Return>,
    staged_items: Vec<ReturnItem>,
}

impl InMemoryTransaction<'_> {
    fn returns(&self) -> impl Iterator<Item = &Return> {
        self.base.returns.values().chain(self.staged_returns.iter())
    }

    fn reference_taken(&self, store: &StoreName, reference: &str) -> bool {
        self.base
            .references
            .contains(&(store.clone(), reference.to_string()))
            || self
                .staged_returns
                .iter()
                .any(|r| r.store == *store && r.reference.as_deref() == Some(reference))
    }

    fn return_exists(&self, id: ReturnId) -> bool {
        self.base.returns.contains_key(&id) || self.staged_returns.iter().any(|r| r.id == Some(id))
    }
}

impl ReturnQuery for InMemoryTransaction<'_> {
    fn find_returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StorageError> {
        Ok(select_returns(self.returns(), filter))
    }

    fn find_return_items(
        &self,
        filter: &ReturnItemFilter,
    ) -> Result<Vec<ReturnItem>, StorageError> {
        Ok(select_items(
            self.base.items.values().chain(self.staged_items.iter()),
            filter,
        ))
    }

    fn find_return_reasons(
        &self,
        filter: &ReturnReasonFilter,
    ) -> Result<Vec<ReturnReason>, StorageError> {
        Ok(select_reasons(&self.base, filter))
    }

    fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> Result<u64, StorageError> {
        Ok(count_for_customer(self.returns(), customer_reference))
    }
}

impl ReturnTransaction for InMemoryTransaction<'_> {
    fn next_reference_sequence(&mut self, store: &StoreName) -> Result<u64, StorageError> {
        let mut sequences = self
            .storage
            .sequences
            .lock()
            .map_err(|_| StorageError::Poisoned)?;
        let sequence = sequences.entry(store.clone()).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    fn insert_return(&mut self, mut sales_return: Return) -> Result<Return, StorageError> {
        let reference = sales_return
            .reference
            .clone()
            .ok_or_else(|| StorageError::Integrity("return without reference".to_string()))?;
        if self.reference_taken(&sales_return.store, &reference) {
            return Err(StorageError::Conflict(format!(
                "return reference '{reference}' already exists in store {}",
                sales_return.store
            )));
        }

        let id = ReturnId::new(self.storage.next_return_id.fetch_add(1, Ordering::SeqCst));
        sales_return.id = Some(id);
        sales_return.created_at = Some(Utc::now());

        self.staged_returns.push(Return {
            items: Vec::new(),
            totals: None,
            ..sales_return.clone()
        });
        Ok(sales_return)
    }

    fn insert_return_item(&mut self, mut item: ReturnItem) -> Result<ReturnItem, StorageError> {
        let return_id = item
            .return_id
            .ok_or_else(|| StorageError::Integrity("return item is not bound".to_string()))?;
        if !self.return_exists(return_id) {
            return Err(StorageError::Integrity(format!(
                "return item references unknown return {return_id}"
            )));
        }

        item.id = Some(ReturnItemId::new(
            self.storage.next_item_id.fetch_add(1, Ordering::SeqCst),
        ));
        self.staged_items.push(ReturnItem {
            order_item: None,
            ..item.clone()
        });
        Ok(item)
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let InMemoryTransaction {
            storage,
            base,
            staged_returns,
            staged_items,
        } = *self;
        drop(base);

        let mut guard = storage.state.write().map_err(|_| StorageError::Poisoned)?;

        // Another transaction may have committed the same reference meanwhile.
        for staged in &staged_returns {
            if let Some(reference) = &staged.reference {
                if guard
                    .references
                    .contains(&(staged.store.clone(), reference.clone()))
                {
                    return Err(StorageError::Conflict(format!(
                        "return reference '{reference}' already exists in store {}",
                        staged.store
                    )));
                }
            }
        }

        let state = Arc::make_mut(&mut *guard);
        let (returns, items) = (staged_returns.len(), staged_items.len());
        for staged in staged_returns {
            if let (Some(id), Some(reference)) = (staged.id, staged.reference.clone()) {
                state.references.insert((staged.store.clone(), reference));
                state.returns.insert(id, staged);
            }
        }
        for item in staged_items {
            if let Some(id) = item.id {
                state.items.insert(id, item);
            }
        }

        debug!(returns, items, "committed return transaction");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        debug!(
            returns = self.staged_returns.len(),
            items = self.staged_items.len(),
            "rolled back return transaction"
        );
        Ok(())
    }
}

fn select_returns<'a>(
    returns: impl Iterator<Item = &'a Return>,
    filter: &ReturnFilter,
) -> Vec<Return> {
    let mut rows: Vec<Return> = returns
        .filter(|r| matches_return(r, filter))
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.id.cmp(&a.id));

    match filter.pagination {
        Some(pagination) => pagination.apply(rows),
        None => rows,
    }
}

fn matches_return(sales_return: &Return, filter: &ReturnFilter) -> bool {
    let reference = sales_return.reference.as_ref();

    filter
        .return_reference
        .as_ref()
        .is_none_or(|wanted| reference == Some(wanted))
        && (filter.return_references.is_empty()
            || reference.is_some_and(|r| filter.return_references.contains(r)))
        && (filter.return_ids.is_empty()
            || sales_return
                .id
                .is_some_and(|id| filter.return_ids.contains(&id)))
        && filter
            .store
            .as_ref()
            .is_none_or(|store| sales_return.store == *store)
        && filter
            .customer_reference
            .as_ref()
            .is_none_or(|customer| sales_return.customer_reference.as_ref() == Some(customer))
}

fn select_items<'a>(
    items: impl Iterator<Item = &'a ReturnItem>,
    filter: &ReturnItemFilter,
) -> Vec<ReturnItem> {
    let mut rows: Vec<ReturnItem> = items
        .filter(|item| {
            item.return_id
                .is_some_and(|id| filter.return_ids.contains(&id))
        })
        .cloned()
        .collect();
    rows.sort_by_key(|item| item.id);
    rows
}

fn select_reasons(state: &StorageState, filter: &ReturnReasonFilter) -> Vec<ReturnReason> {
    let rows: Vec<ReturnReason> = state
        .reasons
        .values()
        .filter(|reason| {
            filter.glossary_keys.is_empty() || filter.glossary_keys.contains(&reason.glossary_key)
        })
        .cloned()
        .collect();

    match filter.pagination {
        Some(pagination) => pagination.apply(rows),
        None => rows,
    }
}

fn count_for_customer<'a>(
    returns: impl Iterator<Item = &'a Return>,
    customer_reference: &CustomerReference,
) -> u64 {
    returns
        .filter(|r| r.customer_reference.as_ref() == Some(customer_reference))
        .count() as u64
}
