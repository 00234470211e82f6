//! Return aggregate and the read-only entities it links to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use returnflow_core::{
    CustomerReference, DomainError, DomainResult, Entity, Money, OrderItemId, OrderItemUuid,
    ReturnId, ReturnItemId, ReturnItemUuid, ReturnReasonId, StoreName, ValueObject,
};

/// Current state of an order item in the order state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub name: Option<String>,
}

impl ItemState {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Order item as delivered by the order subsystem.
///
/// Owned by the order subsystem; this crate only reads it and sets the
/// transient `is_returnable` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub uuid: Option<OrderItemUuid>,
    pub order_reference: String,
    pub customer_reference: Option<CustomerReference>,
    pub store: StoreName,
    pub sku: String,
    pub created_at: Option<DateTime<Utc>>,
    pub state: Option<ItemState>,
    #[serde(default = "returnable_by_default")]
    pub is_returnable: bool,
    /// Amount refunded to the customer once the item is returned.
    pub remuneration_amount: Option<Money>,
    /// Amount still refundable for this item.
    pub refundable_amount: Money,
}

fn returnable_by_default() -> bool {
    true
}

impl OrderItem {
    pub fn state_name(&self) -> Option<&str> {
        self.state.as_ref().and_then(|s| s.name.as_deref())
    }

    /// Human-readable handle used in messages.
    pub fn handle(&self) -> String {
        match &self.uuid {
            Some(uuid) => uuid.to_string(),
            None => self.id.to_string(),
        }
    }
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> Option<&Self::Id> {
        Some(&self.id)
    }
}

/// Reference from a return item to an order item: internal id, external
/// handle, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRef {
    pub id: Option<OrderItemId>,
    pub uuid: Option<OrderItemUuid>,
}

impl OrderItemRef {
    pub fn by_id(id: OrderItemId) -> Self {
        Self {
            id: Some(id),
            uuid: None,
        }
    }

    pub fn by_uuid(uuid: OrderItemUuid) -> Self {
        Self {
            id: None,
            uuid: Some(uuid),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.id.is_some() || self.uuid.is_some()
    }

    pub fn handle(&self) -> String {
        match (&self.uuid, &self.id) {
            (Some(uuid), _) => uuid.to_string(),
            (None, Some(id)) => id.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// One line of a return, bound to exactly one order item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub id: Option<ReturnItemId>,
    pub uuid: Option<ReturnItemUuid>,
    pub return_id: Option<ReturnId>,
    pub reason: Option<String>,
    pub order_item_ref: OrderItemRef,
    /// Resolved order item; absent when it cannot be found.
    #[serde(default)]
    pub order_item: Option<OrderItem>,
}

impl ReturnItem {
    pub fn for_order_item(order_item_ref: OrderItemRef) -> Self {
        Self {
            order_item_ref,
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Entity for ReturnItem {
    type Id = ReturnItemId;

    fn id(&self) -> Option<&Self::Id> {
        self.id.as_ref()
    }
}

/// Monetary totals of a return, recomputed on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnTotals {
    pub refund_total: Money,
    pub remuneration_total: Money,
}

impl ValueObject for ReturnTotals {}

/// Aggregate root: a customer's request to send back ordered items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Return {
    pub id: Option<ReturnId>,
    pub reference: Option<String>,
    pub store: StoreName,
    pub customer_reference: Option<CustomerReference>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<ReturnItem>,
    #[serde(default)]
    pub totals: Option<ReturnTotals>,
}

impl Return {
    pub fn new(store: StoreName, customer_reference: Option<CustomerReference>) -> Self {
        Self {
            id: None,
            reference: None,
            store,
            customer_reference,
            created_at: None,
            items: Vec::new(),
            totals: None,
        }
    }

    pub fn require_id(&self) -> DomainResult<ReturnId> {
        self.id.ok_or_else(|| DomainError::required("return.id"))
    }

    pub fn require_reference(&self) -> DomainResult<&str> {
        self.reference
            .as_deref()
            .ok_or_else(|| DomainError::required("return.reference"))
    }

    /// Assign the reference; a reference is immutable once set.
    pub fn assign_reference(&mut self, reference: String) -> DomainResult<()> {
        match &self.reference {
            Some(existing) if *existing != reference => Err(DomainError::invariant(format!(
                "return reference already assigned ({existing})"
            ))),
            _ => {
                self.reference = Some(reference);
                Ok(())
            }
        }
    }

    /// Bind every item to this return's identity.
    ///
    /// Fails when the return has not been persisted yet.
    pub fn bind_items(&mut self) -> DomainResult<()> {
        let id = self.require_id()?;
        for item in &mut self.items {
            item.return_id = Some(id);
        }
        Ok(())
    }

    /// Order item ids of all items that point at a resolved or referenced order item.
    pub fn order_item_ids(&self) -> Vec<OrderItemId> {
        self.items
            .iter()
            .filter_map(|item| {
                item.order_item
                    .as_ref()
                    .map(|o| o.id)
                    .or(item.order_item_ref.id)
            })
            .collect()
    }
}

impl Entity for Return {
    type Id = ReturnId;

    fn id(&self) -> Option<&Self::Id> {
        self.id.as_ref()
    }
}

/// Reference data describing why an item is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnReason {
    pub id: ReturnReasonId,
    pub glossary_key: String,
}

impl Entity for ReturnReason {
    type Id = ReturnReasonId;

    fn id(&self) -> Option<&Self::Id> {
        Some(&self.id)
    }
}

/// Order-level totals touched by the remuneration calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub refund_total: Money,
    pub remuneration_total: Money,
}

impl ValueObject for Totals {}

/// Transient, order-scoped bag of items passed through a calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculableObject {
    pub store: Option<StoreName>,
    pub items: Vec<OrderItem>,
    pub totals: Totals,
}

impl CalculableObject {
    pub fn new(items: Vec<OrderItem>) -> Self {
        Self {
            store: None,
            items,
            totals: Totals::default(),
        }
    }
}
