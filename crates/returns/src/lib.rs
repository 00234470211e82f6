//! Return lifecycle engine.
//!
//! Decides which order items are returnable, turns a creation request into a
//! persisted [`Return`] with its items, computes refund and remuneration
//! totals, and hands the returned items to the order state machine.
//!
//! [`ReturnModule`] is the entry point; everything it needs from the outside
//! world comes in through the traits in [`ports`].

pub mod calculator;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod extension;
pub mod model;
pub mod module;
pub mod ports;
pub mod reader;
pub mod reason;
pub mod reference;
pub mod request;
pub mod response;
pub mod returnable;
pub mod transaction;
pub mod triggerer;
pub mod validator;
pub mod writer;

#[cfg(test)]
mod testing;

pub use calculator::{RemunerationTotalCalculator, ReturnTotalCalculator};
pub use config::ReturnsConfig;
pub use error::{CollaboratorError, ReturnError, ReturnResult, StorageError};
pub use evaluator::ReturnabilityEvaluator;
pub use extension::{
    ReturnCollectionExpander, ReturnCreateRequestValidator, ReturnExpander, ReturnPreCreateHook,
};
pub use model::{
    CalculableObject, ItemState, OrderItem, OrderItemRef, Return, ReturnItem, ReturnReason,
    ReturnTotals, Totals,
};
pub use module::{ReturnModule, ReturnModuleBuilder};
pub use ports::{
    OMS_EVENT_TRIGGER_RESPONSE, OmsEventTrigger, OmsEventTriggerResponse, OrderItemSource,
    ReturnQuery, ReturnRepository, ReturnTransaction, Store, StoreDirectory, TriggerEventData,
};
pub use request::{
    OrderItemFilter, Pagination, ReturnCreateRequest, ReturnFilter, ReturnItemFilter,
    ReturnReasonFilter, ReturnableItemFilter,
};
pub use response::{Message, ReturnCollection, ReturnResponse, ValidationResult, glossary};
