//! Creation request validation.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ReturnResult;
use crate::evaluator::ReturnabilityEvaluator;
use crate::extension::ReturnCreateRequestValidator;
use crate::model::OrderItem;
use crate::ports::StoreDirectory;
use crate::request::ReturnCreateRequest;
use crate::response::{Message, ValidationResult, glossary};

pub struct ReturnValidator {
    evaluator: ReturnabilityEvaluator,
    stores: Arc<dyn StoreDirectory>,
    request_validators: Vec<Box<dyn ReturnCreateRequestValidator>>,
}

impl ReturnValidator {
    pub fn new(
        evaluator: ReturnabilityEvaluator,
        stores: Arc<dyn StoreDirectory>,
        request_validators: Vec<Box<dyn ReturnCreateRequestValidator>>,
    ) -> Self {
        Self {
            evaluator,
            stores,
            request_validators,
        }
    }

    /// Check a request whose return items are already mapped to `order_items`.
    ///
    /// All rules run; every violated rule adds its message.
    pub fn validate_return_request(
        &self,
        request: &ReturnCreateRequest,
        order_items: &[OrderItem],
    ) -> ReturnResult<ValidationResult> {
        self.validate_return_request_at(request, order_items, Utc::now())
    }

    pub fn validate_return_request_at(
        &self,
        request: &ReturnCreateRequest,
        order_items: &[OrderItem],
        now: DateTime<Utc>,
    ) -> ReturnResult<ValidationResult> {
        let store_name = request.require_store()?;
        let return_items = request.items();
        let mut result = ValidationResult::new();

        if return_items.is_empty() {
            result.add(Message::new(glossary::ITEMS_EMPTY));
        }

        let store = self.stores.find_store(store_name)?;
        if store.is_none() {
            result.add(
                Message::new(glossary::STORE_NOT_FOUND)
                    .with_parameter(glossary::PARAM_STORE, store_name.as_str()),
            );
        }

        let mut resolved = Vec::with_capacity(return_items.len());
        let mut seen = BTreeSet::new();
        for return_item in return_items {
            let Some(order_item) = &return_item.order_item else {
                result.add(
                    Message::new(glossary::ITEM_NOT_FOUND)
                        .with_parameter(glossary::PARAM_HANDLE, return_item.order_item_ref.handle()),
                );
                continue;
            };

            if !seen.insert(order_item.id) {
                result.add(
                    Message::new(glossary::DUPLICATE_ITEM)
                        .with_parameter(glossary::PARAM_HANDLE, order_item.handle()),
                );
                continue;
            }

            if let Some(store) = &store {
                if !store.accepts_items_from(&order_item.store) {
                    result.add(
                        Message::new(glossary::DIFFERENT_STORE)
                            .with_parameter(glossary::PARAM_HANDLE, order_item.handle())
                            .with_parameter(glossary::PARAM_STORE, order_item.store.as_str()),
                    );
                }
            }

            resolved.push(order_item.clone());
        }

        for item in self.evaluator.evaluate_at(resolved, now)? {
            if !item.is_returnable {
                result.add(
                    Message::new(glossary::ITEMS_NOT_RETURNABLE)
                        .with_parameter(glossary::PARAM_HANDLE, item.handle()),
                );
            }
        }

        for validator in &self.request_validators {
            result.extend(validator.validate(request, order_items));
        }

        debug!(
            messages = result.messages().len(),
            "validated return create request"
        );
        Ok(result)
    }
}

impl core::fmt::Debug for ReturnValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReturnValidator")
            .field("evaluator", &self.evaluator)
            .field("request_validators", &self.request_validators.len())
            .finish_non_exhaustive()
    }
}
