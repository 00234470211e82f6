//! Return lookups and expansion.
//!
//! Every public read takes one repository snapshot and expands all returns
//! against it, so a reader call never observes a half-committed return.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, instrument};

use returnflow_core::{CustomerReference, OrderItemId, ReturnId};

use crate::calculator::ReturnTotalCalculator;
use crate::error::ReturnResult;
use crate::extension::{ReturnCollectionExpander, ReturnExpander};
use crate::model::{OrderItem, Return, ReturnItem};
use crate::ports::{OrderItemSource, ReturnQuery, ReturnRepository};
use crate::request::{OrderItemFilter, ReturnFilter, ReturnItemFilter};
use crate::response::{Message, ReturnCollection, ReturnResponse, glossary};

pub struct ReturnReader {
    repository: Arc<dyn ReturnRepository>,
    order_items: Arc<dyn OrderItemSource>,
    total_calculator: ReturnTotalCalculator,
    return_expanders: Vec<Box<dyn ReturnExpander>>,
    collection_expanders: Vec<Box<dyn ReturnCollectionExpander>>,
}

impl ReturnReader {
    pub fn new(
        repository: Arc<dyn ReturnRepository>,
        order_items: Arc<dyn OrderItemSource>,
        return_expanders: Vec<Box<dyn ReturnExpander>>,
        collection_expanders: Vec<Box<dyn ReturnCollectionExpander>>,
    ) -> Self {
        Self {
            repository,
            order_items,
            total_calculator: ReturnTotalCalculator::new(),
            return_expanders,
            collection_expanders,
        }
    }

    /// First return matching `filter.return_reference`, fully expanded.
    #[instrument(skip(self, filter), fields(reference = ?filter.return_reference))]
    pub fn get_return(&self, filter: &ReturnFilter) -> ReturnResult<ReturnResponse> {
        let snapshot = self.repository.snapshot()?;
        self.get_return_in(snapshot.as_ref(), filter)
    }

    #[instrument(skip(self))]
    pub fn get_return_collection(&self, filter: &ReturnFilter) -> ReturnResult<ReturnCollection> {
        let snapshot = self.repository.snapshot()?;
        self.get_return_collection_in(snapshot.as_ref(), filter)
    }

    pub fn get_order_items(&self, filter: &OrderItemFilter) -> ReturnResult<Vec<OrderItem>> {
        Ok(self.order_items.get_order_items(filter)?)
    }

    pub fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> ReturnResult<u64> {
        let snapshot = self.repository.snapshot()?;
        Ok(snapshot.count_customer_returns(customer_reference)?)
    }

    /// [`Self::get_return`] against an already open view, such as a write
    /// transaction that must see its own uncommitted return.
    pub(crate) fn get_return_in<Q>(
        &self,
        query: &Q,
        filter: &ReturnFilter,
    ) -> ReturnResult<ReturnResponse>
    where
        Q: ReturnQuery + ?Sized,
    {
        let reference = filter.require_return_reference()?;
        let filter = ReturnFilter {
            return_reference: Some(reference.to_string()),
            ..filter.clone()
        };

        let collection = self.get_return_collection_in(query, &filter)?;
        Ok(match collection.returns.into_iter().next() {
            Some(sales_return) => ReturnResponse::Success(sales_return),
            None => ReturnResponse::failure(Message::new(glossary::RETURN_NOT_EXISTS)),
        })
    }

    pub(crate) fn get_return_collection_in<Q>(
        &self,
        query: &Q,
        filter: &ReturnFilter,
    ) -> ReturnResult<ReturnCollection>
    where
        Q: ReturnQuery + ?Sized,
    {
        let returns = query.find_returns(filter)?;
        let returns = self.expand_returns(query, returns)?;

        let collection = self
            .collection_expanders
            .iter()
            .fold(ReturnCollection::new(returns), |current, expander| {
                expander.expand(current)
            });
        debug!(returns = collection.len(), "expanded return collection");
        Ok(collection)
    }

    fn expand_returns<Q>(&self, query: &Q, returns: Vec<Return>) -> ReturnResult<Vec<Return>>
    where
        Q: ReturnQuery + ?Sized,
    {
        if returns.is_empty() {
            return Ok(returns);
        }

        let return_ids: Vec<ReturnId> = returns.iter().filter_map(|r| r.id).collect();
        let mut items_by_return = group_items_by_return(
            query.find_return_items(&ReturnItemFilter { return_ids })?,
        );

        let order_item_ids: BTreeSet<OrderItemId> = items_by_return
            .values()
            .flatten()
            .filter_map(|item| item.order_item_ref.id)
            .collect();
        let order_items = self.order_items_by_id(order_item_ids)?;

        let mut expanded = Vec::with_capacity(returns.len());
        for mut sales_return in returns {
            let mut items = sales_return
                .id
                .and_then(|id| items_by_return.remove(&id))
                .unwrap_or_default();
            for item in &mut items {
                item.order_item = item
                    .order_item_ref
                    .id
                    .and_then(|id| order_items.get(&id).cloned());
            }
            sales_return.items = items;
            sales_return.totals = Some(self.total_calculator.calculate_return_totals(&sales_return));

            let sales_return = self
                .return_expanders
                .iter()
                .fold(sales_return, |current, expander| expander.expand(current));
            expanded.push(sales_return);
        }
        Ok(expanded)
    }

    fn order_items_by_id(
        &self,
        order_item_ids: BTreeSet<OrderItemId>,
    ) -> ReturnResult<HashMap<OrderItemId, OrderItem>> {
        if order_item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let filter = OrderItemFilter::by_ids(order_item_ids.into_iter().collect());
        Ok(self
            .order_items
            .get_order_items(&filter)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect())
    }
}

impl core::fmt::Debug for ReturnReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReturnReader")
            .field("return_expanders", &self.return_expanders.len())
            .field("collection_expanders", &self.collection_expanders.len())
            .finish_non_exhaustive()
    }
}

fn group_items_by_return(items: Vec<ReturnItem>) -> BTreeMap<ReturnId, Vec<ReturnItem>> {
    let mut grouped: BTreeMap<ReturnId, Vec<ReturnItem>> = BTreeMap::new();
    for item in items {
        if let Some(return_id) = item.return_id {
            grouped.entry(return_id).or_default().push(item);
        }
    }
    grouped
}
