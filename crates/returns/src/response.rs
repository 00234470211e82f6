//! Business outcomes: localized messages, responses and collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use returnflow_core::ValueObject;

use crate::model::Return;

/// Glossary keys of every business message this crate emits.
pub mod glossary {
    pub const RETURN_NOT_EXISTS: &str = "return.validation.error.not_exists";
    pub const REQUIRED_ITEM_FIELDS: &str =
        "return.create_return.validation.required_item_fields_error";
    pub const ITEMS_EMPTY: &str = "return.create_return.validation.error.items_empty";
    pub const ITEMS_NOT_RETURNABLE: &str = "return.create_return.validation.error.items";
    pub const ITEM_NOT_FOUND: &str = "return.create_return.validation.error.item_not_found";
    pub const DUPLICATE_ITEM: &str = "return.create_return.validation.error.duplicate_item";
    pub const STORE_NOT_FOUND: &str = "return.create_return.validation.error.store";
    pub const DIFFERENT_STORE: &str = "return.create_return.validation.error.different_store";

    pub const PARAM_HANDLE: &str = "%handle%";
    pub const PARAM_STORE: &str = "%store%";
}

/// Localized business message: a glossary key plus placeholder values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub value: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Message {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

impl ValueObject for Message {}

/// Terminal outcome of a return operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum ReturnResponse {
    Success(Return),
    Failure(Vec<Message>),
}

impl ReturnResponse {
    pub fn failure(message: Message) -> Self {
        Self::Failure(vec![message])
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn messages(&self) -> &[Message] {
        match self {
            Self::Success(_) => &[],
            Self::Failure(messages) => messages,
        }
    }

    pub fn sales_return(&self) -> Option<&Return> {
        match self {
            Self::Success(ret) => Some(ret),
            Self::Failure(_) => None,
        }
    }

    pub fn into_return(self) -> Option<Return> {
        match self {
            Self::Success(ret) => Some(ret),
            Self::Failure(_) => None,
        }
    }

    /// `true` when any failure message carries the given glossary key.
    pub fn has_message(&self, glossary_key: &str) -> bool {
        self.messages().iter().any(|m| m.value == glossary_key)
    }
}

/// Zero or more expanded returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCollection {
    pub returns: Vec<Return>,
}

impl ReturnCollection {
    pub fn new(returns: Vec<Return>) -> Self {
        Self { returns }
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

/// Aggregated outcome of request validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    messages: Vec<Message>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn is_successful(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
