//! Requests and filters accepted by the engine.

use serde::{Deserialize, Serialize};

use returnflow_core::{
    CustomerReference, DomainResult, OrderItemId, OrderItemUuid, ReturnId, StoreName,
};
use returnflow_core::error::require;

use crate::model::ReturnItem;

/// Customer request to create a return.
///
/// `store` and `return_items` are structurally required; their absence is a
/// caller bug, not a business failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCreateRequest {
    pub store: Option<StoreName>,
    pub customer_reference: Option<CustomerReference>,
    pub return_items: Option<Vec<ReturnItem>>,
}

impl ReturnCreateRequest {
    pub fn new(store: StoreName, return_items: Vec<ReturnItem>) -> Self {
        Self {
            store: Some(store),
            customer_reference: None,
            return_items: Some(return_items),
        }
    }

    pub fn for_customer(mut self, customer_reference: CustomerReference) -> Self {
        self.customer_reference = Some(customer_reference);
        self
    }

    pub fn require_store(&self) -> DomainResult<&StoreName> {
        require(self.store.as_ref(), "return_create_request.store")
    }

    pub fn require_return_items(&self) -> DomainResult<&[ReturnItem]> {
        require(self.return_items.as_deref(), "return_create_request.return_items")
    }

    /// Return items, empty when none were declared.
    pub fn items(&self) -> &[ReturnItem] {
        self.return_items.as_deref().unwrap_or_default()
    }
}

/// Offset/limit window over an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

/// Criteria for selecting returns. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnFilter {
    pub return_reference: Option<String>,
    #[serde(default)]
    pub return_references: Vec<String>,
    #[serde(default)]
    pub return_ids: Vec<ReturnId>,
    pub store: Option<StoreName>,
    pub customer_reference: Option<CustomerReference>,
    pub pagination: Option<Pagination>,
}

impl ReturnFilter {
    pub fn by_reference(reference: impl Into<String>) -> Self {
        Self {
            return_reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn by_store(store: StoreName) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    pub fn by_customer(customer_reference: CustomerReference) -> Self {
        Self {
            customer_reference: Some(customer_reference),
            ..Self::default()
        }
    }

    pub fn require_return_reference(&self) -> DomainResult<&str> {
        require(self.return_reference.as_deref(), "return_filter.return_reference")
    }
}

/// Criteria for bulk-fetching return items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItemFilter {
    pub return_ids: Vec<ReturnId>,
}

/// Criteria for resolving order items through the order subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemFilter {
    #[serde(default)]
    pub order_item_ids: Vec<OrderItemId>,
    #[serde(default)]
    pub order_item_uuids: Vec<OrderItemUuid>,
    #[serde(default)]
    pub customer_references: Vec<CustomerReference>,
    #[serde(default)]
    pub order_references: Vec<String>,
}

impl OrderItemFilter {
    pub fn by_ids(order_item_ids: Vec<OrderItemId>) -> Self {
        Self {
            order_item_ids,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_item_ids.is_empty()
            && self.order_item_uuids.is_empty()
            && self.customer_references.is_empty()
            && self.order_references.is_empty()
    }
}

/// Criteria for return reason lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnReasonFilter {
    #[serde(default)]
    pub glossary_keys: Vec<String>,
    pub pagination: Option<Pagination>,
}

/// Criteria for listing a customer's returnable order items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnableItemFilter {
    pub customer_reference: Option<CustomerReference>,
    #[serde(default)]
    pub order_references: Vec<String>,
}

impl ReturnableItemFilter {
    pub fn require_customer_reference(&self) -> DomainResult<&CustomerReference> {
        require(
            self.customer_reference.as_ref(),
            "returnable_item_filter.customer_reference",
        )
    }
}
