//! Extension points.
//!
//! Each extension list is an ordered `Vec` injected at construction and run
//! in registration order; no registration means an empty list. Plain closures
//! implement every extension trait.

use crate::model::{OrderItem, Return};
use crate::request::ReturnCreateRequest;
use crate::response::{Message, ReturnCollection};

/// Transforms a return right before it is persisted.
pub trait ReturnPreCreateHook: Send + Sync {
    fn pre_create(&self, sales_return: Return) -> Return;
}

impl<F> ReturnPreCreateHook for F
where
    F: Fn(Return) -> Return + Send + Sync,
{
    fn pre_create(&self, sales_return: Return) -> Return {
        self(sales_return)
    }
}

/// Additional business rules over a creation request.
///
/// Runs after the built-in checks; returned messages fail the request.
pub trait ReturnCreateRequestValidator: Send + Sync {
    fn validate(&self, request: &ReturnCreateRequest, order_items: &[OrderItem]) -> Vec<Message>;
}

impl<F> ReturnCreateRequestValidator for F
where
    F: Fn(&ReturnCreateRequest, &[OrderItem]) -> Vec<Message> + Send + Sync,
{
    fn validate(&self, request: &ReturnCreateRequest, order_items: &[OrderItem]) -> Vec<Message> {
        self(request, order_items)
    }
}

/// Enriches a single expanded return.
pub trait ReturnExpander: Send + Sync {
    fn expand(&self, sales_return: Return) -> Return;
}

impl<F> ReturnExpander for F
where
    F: Fn(Return) -> Return + Send + Sync,
{
    fn expand(&self, sales_return: Return) -> Return {
        self(sales_return)
    }
}

/// Enriches a whole expanded collection.
pub trait ReturnCollectionExpander: Send + Sync {
    fn expand(&self, collection: ReturnCollection) -> ReturnCollection;
}

impl<F> ReturnCollectionExpander for F
where
    F: Fn(ReturnCollection) -> ReturnCollection + Send + Sync,
{
    fn expand(&self, collection: ReturnCollection) -> ReturnCollection {
        self(collection)
    }
}

/// Registered extensions, grouped by extension point.
#[derive(Default)]
pub struct Extensions {
    pub pre_create_hooks: Vec<Box<dyn ReturnPreCreateHook>>,
    pub request_validators: Vec<Box<dyn ReturnCreateRequestValidator>>,
    pub return_expanders: Vec<Box<dyn ReturnExpander>>,
    pub collection_expanders: Vec<Box<dyn ReturnCollectionExpander>>,
}

impl core::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Extensions")
            .field("pre_create_hooks", &self.pre_create_hooks.len())
            .field("request_validators", &self.request_validators.len())
            .field("return_expanders", &self.return_expanders.len())
            .field("collection_expanders", &self.collection_expanders.len())
            .finish()
    }
}

pub(crate) fn run_pre_create_hooks(
    hooks: &[Box<dyn ReturnPreCreateHook>],
    sales_return: Return,
) -> Return {
    hooks
        .iter()
        .fold(sales_return, |current, hook| hook.pre_create(current))
}
