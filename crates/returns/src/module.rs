//! Wiring of the return lifecycle engine behind one facade.

use std::sync::Arc;

use returnflow_core::{CustomerReference, DomainResult};

use crate::calculator::{RemunerationTotalCalculator, ReturnTotalCalculator};
use crate::config::ReturnsConfig;
use crate::error::ReturnResult;
use crate::evaluator::ReturnabilityEvaluator;
use crate::extension::{
    Extensions, ReturnCollectionExpander, ReturnCreateRequestValidator, ReturnExpander,
    ReturnPreCreateHook,
};
use crate::model::{CalculableObject, OrderItem, Return, ReturnReason, ReturnTotals};
use crate::ports::{OmsEventTrigger, OrderItemSource, ReturnRepository, StoreDirectory};
use crate::reader::ReturnReader;
use crate::reason::ReturnReasonReader;
use crate::request::{
    OrderItemFilter, ReturnCreateRequest, ReturnFilter, ReturnReasonFilter, ReturnableItemFilter,
};
use crate::response::{ReturnCollection, ReturnResponse};
use crate::returnable::ReturnableItemReader;
use crate::triggerer::OmsEventTriggerer;
use crate::validator::ReturnValidator;
use crate::writer::ReturnWriter;

/// Entry point of the engine. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct ReturnModule {
    writer: ReturnWriter,
    reader: Arc<ReturnReader>,
    returnable_items: ReturnableItemReader,
    reasons: ReturnReasonReader,
    evaluator: ReturnabilityEvaluator,
    remuneration_calculator: RemunerationTotalCalculator,
    total_calculator: ReturnTotalCalculator,
}

impl ReturnModule {
    pub fn builder(
        config: ReturnsConfig,
        repository: Arc<dyn ReturnRepository>,
        order_items: Arc<dyn OrderItemSource>,
        stores: Arc<dyn StoreDirectory>,
        oms: Arc<dyn OmsEventTrigger>,
    ) -> ReturnModuleBuilder {
        ReturnModuleBuilder {
            config,
            repository,
            order_items,
            stores,
            oms,
            extensions: Extensions::default(),
        }
    }

    pub fn create_return(&self, request: ReturnCreateRequest) -> ReturnResult<ReturnResponse> {
        self.writer.create_return(request)
    }

    pub fn get_return(&self, filter: &ReturnFilter) -> ReturnResult<ReturnResponse> {
        self.reader.get_return(filter)
    }

    pub fn get_return_collection(&self, filter: &ReturnFilter) -> ReturnResult<ReturnCollection> {
        self.reader.get_return_collection(filter)
    }

    pub fn get_order_items(&self, filter: &OrderItemFilter) -> ReturnResult<Vec<OrderItem>> {
        self.reader.get_order_items(filter)
    }

    pub fn get_returnable_items(
        &self,
        filter: &ReturnableItemFilter,
    ) -> ReturnResult<Vec<OrderItem>> {
        self.returnable_items.get_returnable_items(filter)
    }

    pub fn get_return_reasons(&self, filter: &ReturnReasonFilter) -> ReturnResult<Vec<ReturnReason>> {
        self.reasons.get_return_reasons(filter)
    }

    pub fn count_customer_returns(
        &self,
        customer_reference: &CustomerReference,
    ) -> ReturnResult<u64> {
        self.reader.count_customer_returns(customer_reference)
    }

    pub fn expand_order_items_with_is_returnable(&self, items: Vec<OrderItem>) -> Vec<OrderItem> {
        self.evaluator.expand_with_is_returnable(items)
    }

    pub fn expand_order_items_with_is_returnable_by_item_state(
        &self,
        items: Vec<OrderItem>,
    ) -> DomainResult<Vec<OrderItem>> {
        self.evaluator.expand_with_is_returnable_by_item_state(items)
    }

    pub fn calculate_remuneration_total(&self, calculable: &mut CalculableObject) {
        self.remuneration_calculator
            .calculate_remuneration_total(calculable);
    }

    pub fn calculate_return_totals(&self, sales_return: &Return) -> ReturnTotals {
        self.total_calculator.calculate_return_totals(sales_return)
    }
}

/// Collects ports and extensions; extensions run in registration order.
pub struct ReturnModuleBuilder {
    config: ReturnsConfig,
    repository: Arc<dyn ReturnRepository>,
    order_items: Arc<dyn OrderItemSource>,
    stores: Arc<dyn StoreDirectory>,
    oms: Arc<dyn OmsEventTrigger>,
    extensions: Extensions,
}

impl core::fmt::Debug for ReturnModuleBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReturnModuleBuilder")
            .field("config", &self.config)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl ReturnModuleBuilder {
    pub fn with_pre_create_hook(mut self, hook: impl ReturnPreCreateHook + 'static) -> Self {
        self.extensions.pre_create_hooks.push(Box::new(hook));
        self
    }

    pub fn with_request_validator(
        mut self,
        validator: impl ReturnCreateRequestValidator + 'static,
    ) -> Self {
        self.extensions.request_validators.push(Box::new(validator));
        self
    }

    pub fn with_return_expander(mut self, expander: impl ReturnExpander + 'static) -> Self {
        self.extensions.return_expanders.push(Box::new(expander));
        self
    }

    pub fn with_collection_expander(
        mut self,
        expander: impl ReturnCollectionExpander + 'static,
    ) -> Self {
        self.extensions.collection_expanders.push(Box::new(expander));
        self
    }

    pub fn build(self) -> ReturnModule {
        let config = Arc::new(self.config);
        let Extensions {
            pre_create_hooks,
            request_validators,
            return_expanders,
            collection_expanders,
        } = self.extensions;

        let evaluator = ReturnabilityEvaluator::new(config.clone());
        let reader = Arc::new(ReturnReader::new(
            self.repository.clone(),
            self.order_items.clone(),
            return_expanders,
            collection_expanders,
        ));
        let validator = ReturnValidator::new(evaluator.clone(), self.stores, request_validators);
        let triggerer = OmsEventTriggerer::new(config.clone(), self.oms);
        let writer = ReturnWriter::new(
            config,
            self.repository.clone(),
            reader.clone(),
            validator,
            triggerer,
            pre_create_hooks,
        );

        ReturnModule {
            writer,
            reader,
            returnable_items: ReturnableItemReader::new(self.order_items, evaluator.clone()),
            reasons: ReturnReasonReader::new(self.repository),
            evaluator,
            remuneration_calculator: RemunerationTotalCalculator::new(),
            total_calculator: ReturnTotalCalculator::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use returnflow_core::{Money, OrderItemId, StoreName};

    use crate::model::{OrderItemRef, ReturnItem};
    use crate::ports::Store;
    use crate::response::{Message, glossary};
    use crate::testing::{FakeOms, FakeOrderItems, FakeRepository, FakeStores, order_item};

    fn builder(repository: Arc<FakeRepository>) -> ReturnModuleBuilder {
        let order_items = FakeOrderItems::new(vec![
            order_item(1, "DE", "shipped"),
            order_item(2, "DE", "shipped"),
        ]);
        ReturnModule::builder(
            ReturnsConfig::default(),
            repository,
            Arc::new(order_items),
            Arc::new(FakeStores::default().with(Store::new(StoreName::new("DE")))),
            Arc::new(FakeOms::succeeding()),
        )
    }

    fn request(ids: &[i64]) -> ReturnCreateRequest {
        ReturnCreateRequest::new(
            StoreName::new("DE"),
            ids.iter()
                .map(|id| ReturnItem::for_order_item(OrderItemRef::by_id(OrderItemId::new(*id))))
                .collect(),
        )
    }

    #[test]
    fn created_return_reads_back_identically() {
        let module = builder(Arc::new(FakeRepository::default())).build();

        let created = module.create_return(request(&[1, 2])).unwrap().into_return().unwrap();
        let reference = created.reference.clone().unwrap();
        let read = module
            .get_return(&ReturnFilter::by_reference(reference))
            .unwrap()
            .into_return()
            .unwrap();

        assert_eq!(read, created);
        assert_eq!(module.calculate_return_totals(&read), read.totals.unwrap());
    }

    #[test]
    fn registered_validators_can_reject_requests() {
        let repository = Arc::new(FakeRepository::default());
        let module = builder(repository.clone())
            .with_request_validator(|_: &ReturnCreateRequest, items: &[OrderItem]| {
                if items.len() > 1 {
                    vec![Message::new("return.limit_exceeded")]
                } else {
                    Vec::new()
                }
            })
            .build();

        let response = module.create_return(request(&[1, 2])).unwrap();
        assert!(response.has_message("return.limit_exceeded"));
        assert!(repository.returns().is_empty());

        assert!(module.create_return(request(&[1])).unwrap().is_successful());
    }

    #[test]
    fn expanders_apply_to_every_read() {
        let module = builder(Arc::new(FakeRepository::default()))
            .with_return_expander(|mut r: Return| {
                r.items.retain(|i| i.order_item.is_some());
                r
            })
            .with_collection_expander(|mut c: ReturnCollection| {
                c.returns.reverse();
                c
            })
            .build();

        module.create_return(request(&[1])).unwrap();
        module.create_return(request(&[2])).unwrap();

        let collection = module.get_return_collection(&ReturnFilter::default()).unwrap();
        let references: Vec<_> = collection
            .returns
            .iter()
            .filter_map(|r| r.reference.as_deref())
            .collect();
        assert_eq!(references, vec!["DE-R1", "DE-R2"]);
    }

    #[test]
    fn facade_exposes_calculations_and_counts() {
        let module = builder(Arc::new(FakeRepository::default())).build();

        let mut calculable = CalculableObject::new(vec![order_item(1, "DE", "shipped")]);
        module.calculate_remuneration_total(&mut calculable);
        assert_eq!(calculable.totals.remuneration_total, Money::from_minor(100));

        let items = module
            .expand_order_items_with_is_returnable_by_item_state(vec![order_item(2, "DE", "new")])
            .unwrap();
        assert!(!items[0].is_returnable);

        let customer = CustomerReference::new("DE--42");
        module
            .create_return(request(&[1]).for_customer(customer.clone()))
            .unwrap();
        assert_eq!(module.count_customer_returns(&customer).unwrap(), 1);
        assert!(!module.get_return(&ReturnFilter::by_reference("DE-R9")).unwrap().is_successful());
        assert!(
            module
                .get_return(&ReturnFilter::by_reference("DE-R9"))
                .unwrap()
                .has_message(glossary::RETURN_NOT_EXISTS)
        );
    }
}
