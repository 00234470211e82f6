//! Return creation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use returnflow_core::{OrderItemId, OrderItemUuid, ReturnItemUuid};

use crate::config::ReturnsConfig;
use crate::error::{ReturnResult, StorageError};
use crate::extension::{ReturnPreCreateHook, run_pre_create_hooks};
use crate::model::{OrderItem, Return};
use crate::ports::{ReturnRepository, ReturnTransaction};
use crate::reader::ReturnReader;
use crate::reference::ReturnReferenceGenerator;
use crate::request::{OrderItemFilter, ReturnCreateRequest, ReturnFilter};
use crate::response::{Message, ReturnResponse, glossary};
use crate::transaction::handle_transaction;
use crate::triggerer::{OmsEventTriggerer, trigger_failure};
use crate::validator::ReturnValidator;

pub struct ReturnWriter {
    config: Arc<ReturnsConfig>,
    repository: Arc<dyn ReturnRepository>,
    reader: Arc<ReturnReader>,
    validator: ReturnValidator,
    reference_generator: ReturnReferenceGenerator,
    triggerer: OmsEventTriggerer,
    pre_create_hooks: Vec<Box<dyn ReturnPreCreateHook>>,
}

impl ReturnWriter {
    pub fn new(
        config: Arc<ReturnsConfig>,
        repository: Arc<dyn ReturnRepository>,
        reader: Arc<ReturnReader>,
        validator: ReturnValidator,
        triggerer: OmsEventTriggerer,
        pre_create_hooks: Vec<Box<dyn ReturnPreCreateHook>>,
    ) -> Self {
        Self {
            reference_generator: ReturnReferenceGenerator::new(config.clone()),
            config,
            repository,
            reader,
            validator,
            triggerer,
            pre_create_hooks,
        }
    }

    /// Validate a request and persist it as a return with all its items.
    ///
    /// Business rule violations come back as [`ReturnResponse::Failure`] and
    /// leave storage untouched. Missing `store` or `return_items` is an error.
    #[instrument(skip(self, request), fields(store = ?request.store, items = request.items().len()))]
    pub fn create_return(&self, request: ReturnCreateRequest) -> ReturnResult<ReturnResponse> {
        request.require_store()?;
        request.require_return_items()?;

        if !request
            .items()
            .iter()
            .all(|item| item.order_item_ref.is_complete())
        {
            warn!("return item without order item id or uuid");
            return Ok(ReturnResponse::failure(Message::new(
                glossary::REQUIRED_ITEM_FIELDS,
            )));
        }

        let order_items = self.resolve_order_items(&request)?;
        let request = map_return_items(request, &order_items);

        let validation = self.validator.validate_return_request(&request, &order_items)?;
        if !validation.is_successful() {
            warn!(messages = ?validation.messages(), "return create request rejected");
            return Ok(ReturnResponse::Failure(validation.into_messages()));
        }

        let mut triggered = None;
        let result = handle_transaction(self.repository.as_ref(), |tx| {
            self.create_return_in(tx, &request, &mut triggered)
        });
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if let Some(order_item_ids) = triggered {
                    self.revert_trigger(&order_item_ids);
                }
                return Err(err);
            }
        };

        match &response {
            ReturnResponse::Success(sales_return) => info!(
                reference = ?sales_return.reference,
                items = sales_return.items.len(),
                "return created"
            ),
            ReturnResponse::Failure(messages) => {
                warn!(messages = ?messages, "return creation failed")
            }
        }
        Ok(response)
    }

    fn resolve_order_items(&self, request: &ReturnCreateRequest) -> ReturnResult<Vec<OrderItem>> {
        let mut filter = OrderItemFilter::default();
        for item in request.items() {
            match (item.order_item_ref.uuid, item.order_item_ref.id) {
                (Some(uuid), _) => filter.order_item_uuids.push(uuid),
                (None, Some(id)) => filter.order_item_ids.push(id),
                (None, None) => {}
            }
        }
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(customer_reference) = &request.customer_reference {
            filter.customer_references.push(customer_reference.clone());
        }

        let order_items = self.reader.get_order_items(&filter)?;
        debug!(resolved = order_items.len(), "resolved order items");
        Ok(order_items)
    }

    fn create_return_in(
        &self,
        tx: &mut dyn ReturnTransaction,
        request: &ReturnCreateRequest,
        triggered: &mut Option<Vec<OrderItemId>>,
    ) -> ReturnResult<ReturnResponse> {
        let store = request.require_store()?.clone();

        let mut sales_return = self.insert_return(tx, request)?;
        sales_return.bind_items()?;
        for item in &mut sales_return.items {
            if let Some(order_item) = &item.order_item {
                item.order_item_ref.id = Some(order_item.id);
            }
            item.id = tx.insert_return_item(item.clone())?.id;
        }
        debug!(reference = ?sales_return.reference, "return persisted");

        let filter = ReturnFilter {
            store: Some(store),
            ..ReturnFilter::by_reference(sales_return.require_reference()?)
        };
        let persisted = match self.reader.get_return_in(&*tx, &filter)? {
            ReturnResponse::Success(persisted) => persisted,
            failure => return Ok(failure),
        };

        let trigger_data = self
            .triggerer
            .trigger_order_items_return_event(&sales_return)?;
        if let Some(messages) = trigger_failure(&trigger_data) {
            return Ok(ReturnResponse::Failure(messages));
        }
        *triggered = Some(sales_return.order_item_ids());

        Ok(ReturnResponse::Success(persisted))
    }

    /// Build, reference and insert the return for `request`.
    ///
    /// A taken reference rebuilds the return with a freshly allocated one and
    /// runs the pre-create hooks again. A reference set by a hook is kept, so
    /// its conflict is returned as an error.
    fn insert_return(
        &self,
        tx: &mut dyn ReturnTransaction,
        request: &ReturnCreateRequest,
    ) -> ReturnResult<Return> {
        let attempts = self.config.reference_allocation_attempts.max(1);
        let mut attempt = 1;
        loop {
            let mut sales_return = new_return(request)?;
            let reference = self
                .reference_generator
                .generate_return_reference(tx, &sales_return)?;
            sales_return.assign_reference(reference.clone())?;
            let sales_return = run_pre_create_hooks(&self.pre_create_hooks, sales_return);
            let generated = sales_return.reference.as_deref() == Some(reference.as_str());

            match tx.insert_return(sales_return) {
                Ok(persisted) => return Ok(persisted),
                Err(StorageError::Conflict(detail)) if generated && attempt < attempts => {
                    warn!(attempt, %detail, "return reference taken, allocating another");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn revert_trigger(&self, order_item_ids: &[OrderItemId]) {
        if let Err(err) = self.triggerer.revert_order_items_return_event(order_item_ids) {
            error!(error = %err, "order items left in their returned state");
        }
    }
}

impl core::fmt::Debug for ReturnWriter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReturnWriter")
            .field("config", &self.config)
            .field("validator", &self.validator)
            .field("pre_create_hooks", &self.pre_create_hooks.len())
            .finish_non_exhaustive()
    }
}

/// Attach the resolved order item to every return item, matching by id
/// first and uuid second. Unmatched items stay unresolved.
/// Unreferenced return carrying the request's items under fresh handles.
fn new_return(request: &ReturnCreateRequest) -> ReturnResult<Return> {
    let store = request.require_store()?.clone();
    let mut sales_return = Return::new(store, request.customer_reference.clone());
    sales_return.items = request
        .items()
        .iter()
        .cloned()
        .map(|mut item| {
            item.uuid = Some(ReturnItemUuid::new());
            item
        })
        .collect();
    Ok(sales_return)
}

fn map_return_items(
    mut request: ReturnCreateRequest,
    order_items: &[OrderItem],
) -> ReturnCreateRequest {
    let by_id: HashMap<OrderItemId, &OrderItem> =
        order_items.iter().map(|item| (item.id, item)).collect();
    let by_uuid: HashMap<OrderItemUuid, &OrderItem> = order_items
        .iter()
        .filter_map(|item| item.uuid.map(|uuid| (uuid, item)))
        .collect();

    for return_item in request.return_items.iter_mut().flatten() {
        let handle = &return_item.order_item_ref;
        let resolved = handle
            .id
            .and_then(|id| by_id.get(&id).copied())
            .or_else(|| handle.uuid.and_then(|uuid| by_uuid.get(&uuid).copied()));
        return_item.order_item = resolved.cloned();
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use returnflow_core::{CustomerReference, Money, ReturnId, StoreName};

    use crate::error::ReturnError;

    use crate::evaluator::ReturnabilityEvaluator;
    use crate::model::{OrderItemRef, ReturnItem};
    use crate::ports::Store;
    use crate::testing::{FakeOms, FakeOrderItems, FakeRepository, FakeStores, order_item};

    struct Harness {
        repository: Arc<FakeRepository>,
        oms: Arc<FakeOms>,
        writer: ReturnWriter,
    }

    fn harness(oms: FakeOms, hooks: Vec<Box<dyn ReturnPreCreateHook>>) -> Harness {
        let config = Arc::new(ReturnsConfig::default());
        let repository = Arc::new(FakeRepository::default());
        let oms = Arc::new(oms);
        let order_items = Arc::new(FakeOrderItems::new(vec![
            order_item(1, "DE", "shipped"),
            order_item(2, "DE", "delivered"),
            order_item(3, "DE", "new"),
        ]));
        let stores = Arc::new(FakeStores::default().with(Store::new(StoreName::new("DE"))));

        let reader = Arc::new(ReturnReader::new(
            repository.clone(),
            order_items,
            Vec::new(),
            Vec::new(),
        ));
        let validator = ReturnValidator::new(
            ReturnabilityEvaluator::new(config.clone()),
            stores,
            Vec::new(),
        );
        let triggerer = OmsEventTriggerer::new(config.clone(), oms.clone());
        let writer = ReturnWriter::new(
            config,
            repository.clone(),
            reader,
            validator,
            triggerer,
            hooks,
        );
        Harness {
            repository,
            oms,
            writer,
        }
    }

    fn by_id(id: i64) -> ReturnItem {
        ReturnItem::for_order_item(OrderItemRef::by_id(OrderItemId::new(id)))
    }

    fn request(items: Vec<ReturnItem>) -> ReturnCreateRequest {
        ReturnCreateRequest::new(StoreName::new("DE"), items)
            .for_customer(CustomerReference::new("DE--42"))
    }

    #[test]
    fn creates_an_expanded_return() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        let response = h
            .writer
            .create_return(request(vec![by_id(1), by_id(2).with_reason("damaged")]))
            .unwrap();

        let sales_return = response.into_return().unwrap();
        assert_eq!(sales_return.reference.as_deref(), Some("DE-R1"));
        assert_eq!(sales_return.items.len(), 2);
        assert!(sales_return.items.iter().all(|i| i.return_id == sales_return.id));
        assert!(sales_return.items.iter().all(|i| i.order_item.is_some()));
        assert_eq!(
            sales_return.totals.map(|t| t.remuneration_total),
            Some(Money::from_minor(300))
        );
        assert_eq!(h.repository.commits(), 1);
        assert_eq!(h.oms.triggered()[0].1, vec![OrderItemId::new(1), OrderItemId::new(2)]);
    }

    #[test]
    fn items_resolved_by_uuid_are_bound_by_id() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        let order_items = h
            .writer
            .reader
            .get_order_items(&OrderItemFilter::by_ids(vec![OrderItemId::new(2)]))
            .unwrap();
        let uuid = order_items[0].uuid.unwrap();

        let response = h
            .writer
            .create_return(request(vec![ReturnItem::for_order_item(OrderItemRef::by_uuid(uuid))]))
            .unwrap();

        assert!(response.is_successful(), "{:?}", response.messages());
        assert_eq!(
            h.repository.return_items()[0].order_item_ref.id,
            Some(OrderItemId::new(2))
        );
    }

    #[test]
    fn incomplete_item_handle_fails_without_a_transaction() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        let response = h
            .writer
            .create_return(request(vec![by_id(1), ReturnItem::default()]))
            .unwrap();

        assert!(response.has_message(glossary::REQUIRED_ITEM_FIELDS));
        assert_eq!(h.repository.commits() + h.repository.rollbacks(), 0);
    }

    #[test]
    fn missing_store_is_a_contract_violation() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        let err = h
            .writer
            .create_return(ReturnCreateRequest {
                return_items: Some(vec![by_id(1)]),
                ..ReturnCreateRequest::default()
            })
            .unwrap_err();

        assert!(err.is_contract_violation());
        assert!(h.repository.returns().is_empty());
    }

    #[test]
    fn validation_failure_is_returned_verbatim() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        let response = h.writer.create_return(request(vec![by_id(3)])).unwrap();

        assert_eq!(response.messages().len(), 1);
        assert!(response.has_message(glossary::ITEMS_NOT_RETURNABLE));
        assert_eq!(h.repository.commits() + h.repository.rollbacks(), 0);
    }

    #[test]
    fn trigger_failure_rolls_back() {
        let h = harness(FakeOms::failing("oms.transition.not_allowed"), Vec::new());
        let response = h.writer.create_return(request(vec![by_id(1)])).unwrap();

        assert!(response.has_message("oms.transition.not_allowed"));
        assert_eq!(h.repository.rollbacks(), 1);
        assert!(h.repository.returns().is_empty());
        assert!(h.repository.return_items().is_empty());
    }

    #[test]
    fn pre_create_hooks_see_the_generated_reference() {
        let hooks: Vec<Box<dyn ReturnPreCreateHook>> = vec![Box::new(|mut r: Return| {
            assert_eq!(r.reference.as_deref(), Some("DE-R1"));
            r.items.truncate(1);
            r
        })];
        let h = harness(FakeOms::succeeding(), hooks);
        let sales_return = h
            .writer
            .create_return(request(vec![by_id(1), by_id(2)]))
            .unwrap()
            .into_return()
            .unwrap();

        assert_eq!(sales_return.items.len(), 1);
    }

    fn existing_return(reference: &str) -> Return {
        let mut existing = Return::new(StoreName::new("DE"), None);
        existing.id = Some(ReturnId::new(99));
        existing.assign_reference(reference.to_string()).unwrap();
        existing
    }

    #[test]
    fn taken_reference_is_reallocated() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        h.repository.seed_return(existing_return("DE-R1"));

        let sales_return = h
            .writer
            .create_return(request(vec![by_id(1)]))
            .unwrap()
            .into_return()
            .unwrap();

        assert_eq!(sales_return.reference.as_deref(), Some("DE-R2"));
        assert_eq!(h.repository.returns().len(), 2);
    }

    #[test]
    fn hooks_run_again_with_the_reallocated_reference() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let hooks: Vec<Box<dyn ReturnPreCreateHook>> = vec![Box::new(move |r: Return| {
            if let Ok(mut seen) = recorded.lock() {
                seen.extend(r.reference.clone());
            }
            r
        })];
        let h = harness(FakeOms::succeeding(), hooks);
        h.repository.seed_return(existing_return("DE-R1"));

        let sales_return = h
            .writer
            .create_return(request(vec![by_id(1)]))
            .unwrap()
            .into_return()
            .unwrap();

        assert_eq!(sales_return.reference.as_deref(), Some("DE-R2"));
        assert_eq!(*seen.lock().unwrap(), vec!["DE-R1".to_string(), "DE-R2".to_string()]);
    }

    #[test]
    fn conflicting_hook_reference_is_an_error() {
        let hooks: Vec<Box<dyn ReturnPreCreateHook>> = vec![Box::new(|mut r: Return| {
            r.reference = Some("DE-CUSTOM".to_string());
            r
        })];
        let h = harness(FakeOms::succeeding(), hooks);
        h.repository.seed_return(existing_return("DE-CUSTOM"));

        let err = h.writer.create_return(request(vec![by_id(1)])).unwrap_err();

        assert!(matches!(err, ReturnError::Storage(StorageError::Conflict(_))));
        assert_eq!(h.repository.returns().len(), 1);
        assert!(h.oms.triggered().is_empty());
    }

    #[test]
    fn failed_commit_reverts_the_triggered_event() {
        let h = harness(FakeOms::succeeding(), Vec::new());
        h.repository.reject_commits();

        let err = h
            .writer
            .create_return(request(vec![by_id(1), by_id(2)]))
            .unwrap_err();

        assert!(matches!(err, ReturnError::Storage(StorageError::Conflict(_))));
        assert!(h.repository.returns().is_empty());
        assert_eq!(
            h.oms.reverted(),
            vec![("return".to_string(), vec![OrderItemId::new(1), OrderItemId::new(2)])]
        );
    }

    #[test]
    fn failed_trigger_is_not_reverted() {
        let h = harness(FakeOms::failing("oms.transition.not_allowed"), Vec::new());
        h.repository.reject_commits();

        let response = h.writer.create_return(request(vec![by_id(1)])).unwrap();

        assert!(!response.is_successful());
        assert!(h.oms.reverted().is_empty());
    }

    #[test]
    fn mapping_prefers_id_over_uuid() {
        let first = order_item(1, "DE", "shipped");
        let second = order_item(2, "DE", "shipped");
        let item = ReturnItem::for_order_item(OrderItemRef {
            id: Some(first.id),
            uuid: second.uuid,
        });

        let mapped = map_return_items(request(vec![item]), &[first.clone(), second]);
        assert_eq!(mapped.items()[0].order_item.as_ref(), Some(&first));
    }
}
