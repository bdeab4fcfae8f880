//! DynamoDB document store.
//!
//! Collection `c` is stored in table `<database>-<c>`, keyed by the string
//! attribute `id`. Documents are converted with `serde_dynamo`.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, from_items, to_item};
use serde_json::Value;
use tracing::debug;

use super::{DocumentFilter, DocumentStore, FilterClause};
use crate::error::StoreError;

type Item = HashMap<String, AttributeValue>;

/// DynamoDB-backed implementation of [`DocumentStore`].
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    database: String,
}

impl DynamoStore {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    fn table(&self, collection: &str) -> String {
        format!("{}-{}", self.database, collection)
    }
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Value>, StoreError> {
        let table = self.table(collection);
        let expression = match ScanExpression::build(filter) {
            Some(expression) => expression,
            // an any-of clause without values can never match
            None => return Ok(Vec::new()),
        };

        let mut items: Vec<Item> = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&table)
                .set_exclusive_start_key(start_key.take());
            if !expression.is_empty() {
                request = request
                    .filter_expression(&expression.text)
                    .set_expression_attribute_names(Some(expression.names.clone()))
                    .set_expression_attribute_values(Some(expression.values.clone()));
            }

            let output = request.send().await.map_err(store_error)?;
            if let Some(page) = output.items {
                items.extend(page);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(table = %table, count = items.len(), "Scanned documents");
        from_items(items).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(self.table(collection))
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(store_error)?;

        match output.item {
            Some(item) => from_item(item)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let item = document_item(id, document)?;
        self.client
            .put_item()
            .table_name(self.table(collection))
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<bool, StoreError> {
        let item = document_item(id, document)?;
        let result = self
            .client
            .put_item()
            .table_name(self.table(collection))
            .set_item(Some(item))
            .condition_expression("attribute_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(store_error(err)),
        }
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let output = self
            .client
            .delete_item()
            .table_name(self.table(collection))
            .key("id", AttributeValue::S(id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(store_error)?;

        Ok(output.attributes.is_some_and(|old| !old.is_empty()))
    }

    async fn check(&self, collection: &str) -> Result<(), StoreError> {
        self.client
            .describe_table()
            .table_name(self.table(collection))
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

fn document_item(id: &str, document: Value) -> Result<Item, StoreError> {
    let mut item: Item = to_item(document).map_err(|e| StoreError::Serialization(e.to_string()))?;
    item.insert("id".to_string(), AttributeValue::S(id.to_string()));
    Ok(item)
}

/// Dispatch and timeout failures mean the store was never reached.
fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StoreError::Connection(message)
        }
        _ => StoreError::Operation(message),
    }
}

// =============================================================================
// Scan Filter Expressions
// =============================================================================

/// A `Scan` filter expression with its placeholder maps.
#[derive(Debug, Default)]
struct ScanExpression {
    text: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl ScanExpression {
    /// Translate a filter. Returns `None` when the filter cannot match anything.
    fn build(filter: &DocumentFilter) -> Option<Self> {
        let mut expression = ScanExpression::default();
        let mut terms = Vec::with_capacity(filter.clauses().len());

        for (i, clause) in filter.clauses().iter().enumerate() {
            let name = format!("#f{}", i);
            expression
                .names
                .insert(name.clone(), clause.field().to_string());

            match clause {
                FilterClause::AnyOf { values, .. } => {
                    if values.is_empty() {
                        return None;
                    }
                    let alternatives: Vec<String> = values
                        .iter()
                        .enumerate()
                        .map(|(j, value)| {
                            let placeholder = format!(":v{}_{}", i, j);
                            expression
                                .values
                                .insert(placeholder.clone(), AttributeValue::S(value.clone()));
                            format!("contains({}, {})", name, placeholder)
                        })
                        .collect();
                    terms.push(format!("({})", alternatives.join(" OR ")));
                }
                FilterClause::Equals { value, .. } => {
                    let placeholder = format!(":v{}", i);
                    expression
                        .values
                        .insert(placeholder.clone(), AttributeValue::S(value.clone()));
                    terms.push(format!("{} = {}", name, placeholder));
                }
            }
        }

        expression.text = terms.join(" AND ");
        Some(expression)
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Create a DynamoDB client with optional custom endpoint and region.
///
/// A custom endpoint is used for DynamoDB Local and similar emulators.
pub async fn create_dynamodb_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;
    Client::new(&sdk_config)
}
