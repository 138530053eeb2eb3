// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_graphql::dynamic::Schema;
use async_graphql::Request;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::cache::ResultCache;
use crate::db::sql::{BindArgument, Statement};
use crate::db::{Executor, Row, StorageError};
use crate::graphql::{build_contract_schema, GraphQLSharedData};
use crate::schema::{Contract, ContractProvider};

const TEST_SCHEMA: &str = r#"
    type Post {
      id: Int
      title: String
      age: Int
      authorId: Int
      owner: Owner
    }

    type Owner {
      id: Int
      name: String
    }
"#;

/// Executor which records every statement and plays back canned responses.
struct TestExecutor {
    statements: Mutex<Vec<Statement>>,
    responses: Mutex<VecDeque<Vec<Row>>>,
    fallback: Vec<Row>,
}

impl TestExecutor {
    fn new(fallback: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            statements: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            fallback: rows(fallback),
        })
    }

    fn push_response(&self, rows_json: Vec<Value>) {
        self.responses.lock().unwrap().push_back(rows(rows_json));
    }

    fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for TestExecutor {
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        self.statements.lock().unwrap().push(statement.clone());

        match self.responses.lock().unwrap().pop_front() {
            Some(rows) => Ok(rows),
            None => Ok(self.fallback.clone()),
        }
    }
}

fn rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Object(map) => map,
            _ => panic!("expected row object"),
        })
        .collect()
}

fn test_schema(executor: &Arc<TestExecutor>, ttl: Duration) -> Schema {
    let contract = Arc::new(Contract::compile("acme", "1", TEST_SCHEMA).unwrap());
    let shared = GraphQLSharedData {
        executor: executor.clone() as Arc<dyn Executor>,
        cache: ResultCache::new(64, 64, ttl),
        provider: ContractProvider::new(std::env::temp_dir()),
    };

    build_contract_schema(&contract, &shared).unwrap()
}

async fn execute(schema: &Schema, query: &str) -> Value {
    let response = schema.execute(Request::new(query)).await;
    assert!(response.errors.is_empty(), "{:#?}", response.errors);
    response.data.into_json().unwrap()
}

#[tokio::test]
async fn collection_query_compiles_to_paged_select() {
    let executor = TestExecutor::new(vec![json!({ "id": 1, "title": "hello" })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(&schema, "{ posts(limit: 5, offset: 10) { id title } }").await;

    assert_eq!(data, json!({ "posts": [{ "id": 1, "title": "hello" }] }));

    let statements = executor.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].sql,
        r#"SELECT * FROM "acme"."post_1" LIMIT 5 OFFSET 10"#
    );
    assert!(statements[0].bindings.is_empty());
}

#[tokio::test]
async fn collection_query_translates_filters_and_ordering() {
    let executor = TestExecutor::new(vec![]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    execute(
        &schema,
        r#"{ posts(orderBy: "age", orderDirection: "desc", where: { age_gt: 18, title: "bob" }) { id } }"#,
    )
    .await;

    let statements = executor.statements();
    assert_eq!(
        statements[0].sql,
        r#"SELECT * FROM "acme"."post_1" WHERE "age" > $1 AND "title" = $2 ORDER BY "age" DESC LIMIT 10 OFFSET 0"#
    );
    assert_eq!(
        statements[0].bindings,
        vec![
            BindArgument::Integer(18),
            BindArgument::String("bob".to_string())
        ]
    );
}

#[tokio::test]
async fn unknown_filter_fields_are_silently_ignored() {
    let executor = TestExecutor::new(vec![]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    // `authorId_in` is declared, a hand-written request smuggling an unknown key past
    // validation would simply be dropped; here we exercise the declared path plus an
    // equality key carrying a non-string value, which is ignored as well
    execute(
        &schema,
        r#"{ posts(where: { authorId_in: [1, 2], age: 5 }) { id } }"#,
    )
    .await;

    let statements = executor.statements();
    assert_eq!(
        statements[0].sql,
        r#"SELECT * FROM "acme"."post_1" WHERE "authorId" IN ($1, $2) LIMIT 10 OFFSET 0"#
    );
}

#[tokio::test]
async fn unknown_order_field_is_a_client_error() {
    let executor = TestExecutor::new(vec![]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let response = schema
        .execute(Request::new(r#"{ posts(orderBy: "nope") { id } }"#))
        .await;

    assert!(!response.errors.is_empty());
    assert!(executor.statements().is_empty());
}

#[tokio::test]
async fn negative_pagination_is_a_client_error() {
    let executor = TestExecutor::new(vec![]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let response = schema
        .execute(Request::new("{ posts(limit: -1) { id } }"))
        .await;

    assert!(!response.errors.is_empty());
    assert!(executor.statements().is_empty());
}

#[tokio::test]
async fn collection_cache_round_trip() {
    let executor = TestExecutor::new(vec![json!({ "id": 1 })]);
    let schema = test_schema(&executor, Duration::from_millis(50));

    // Two identical queries within the TTL issue exactly one storage call
    execute(&schema, "{ posts { id } }").await;
    execute(&schema, "{ posts { id } }").await;
    assert_eq!(executor.statements().len(), 1);

    // A distinct query misses
    execute(&schema, "{ posts(limit: 3) { id } }").await;
    assert_eq!(executor.statements().len(), 2);

    // After expiry the original query hits storage again
    tokio::time::sleep(Duration::from_millis(80)).await;
    execute(&schema, "{ posts { id } }").await;
    assert_eq!(executor.statements().len(), 3);
}

#[tokio::test]
async fn single_lookup_by_primary_key() {
    let executor = TestExecutor::new(vec![json!({ "id": 7, "title": "hello" })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(&schema, "{ post(id: 7) { title } }").await;
    assert_eq!(data, json!({ "post": { "title": "hello" } }));

    let statements = executor.statements();
    assert_eq!(
        statements[0].sql,
        r#"SELECT * FROM "acme"."post_1" WHERE "id" = $1 LIMIT 1"#
    );
    assert_eq!(statements[0].bindings, vec![BindArgument::Integer(7)]);

    // Found rows are cached under the single-lookup key
    execute(&schema, "{ post(id: 7) { title } }").await;
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn absent_single_lookup_is_not_cached() {
    let executor = TestExecutor::new(vec![]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(&schema, "{ post(id: 7) { title } }").await;
    assert_eq!(data, json!({ "post": null }));

    execute(&schema, "{ post(id: 7) { title } }").await;
    assert_eq!(executor.statements().len(), 2);
}

#[tokio::test]
async fn count_query() {
    let executor = TestExecutor::new(vec![json!({ "count": 42 })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(&schema, "{ postCount }").await;
    assert_eq!(data, json!({ "postCount": 42 }));

    let statements = executor.statements();
    assert_eq!(
        statements[0].sql,
        r#"SELECT COUNT(*) AS "count" FROM "acme"."post_1""#
    );

    // Second count is served from the cache
    execute(&schema, "{ postCount }").await;
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn field_lookup_validates_column_name() {
    let executor = TestExecutor::new(vec![json!({ "id": 1, "title": "hello" })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(
        &schema,
        r#"{ postBy(field: "title", value: "hello") { id } }"#,
    )
    .await;
    assert_eq!(data, json!({ "postBy": { "id": 1 } }));

    let statements = executor.statements();
    assert_eq!(
        statements[0].sql,
        r#"SELECT * FROM "acme"."post_1" WHERE "title" = $1 LIMIT 1"#
    );

    // An undeclared column never reaches the SQL layer
    let response = schema
        .execute(Request::new(
            r#"{ postBy(field: "nope", value: "x") { id } }"#,
        ))
        .await;
    assert!(!response.errors.is_empty());
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn relation_field_resolves_via_foreign_key() {
    let executor = TestExecutor::new(vec![]);
    executor.push_response(vec![json!({ "id": 1, "ownerId": 7 })]);
    executor.push_response(vec![json!({ "id": 7, "name": "alice" })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(&schema, "{ posts { id owner { name } } }").await;
    assert_eq!(
        data,
        json!({ "posts": [{ "id": 1, "owner": { "name": "alice" } }] })
    );

    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1].sql,
        r#"SELECT * FROM "acme"."owner_1" WHERE "id" = $1 LIMIT 1"#
    );
    assert_eq!(statements[1].bindings, vec![BindArgument::Integer(7)]);
}

#[tokio::test]
async fn relation_field_falls_back_through_key_variants() {
    let executor = TestExecutor::new(vec![]);
    executor.push_response(vec![json!({ "id": 1, "owner_id": "abc" })]);
    executor.push_response(vec![json!({ "id": 9, "name": "bob" })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    execute(&schema, "{ posts { owner { name } } }").await;

    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1].bindings,
        vec![BindArgument::String("abc".to_string())]
    );
}

#[tokio::test]
async fn relation_field_without_key_resolves_to_absent() {
    let executor = TestExecutor::new(vec![]);
    executor.push_response(vec![json!({ "id": 1 })]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let data = execute(&schema, "{ posts { id owner { name } } }").await;
    assert_eq!(data, json!({ "posts": [{ "id": 1, "owner": null }] }));

    // No lookup was issued for the missing key
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn undeclared_operations_are_rejected() {
    let executor = TestExecutor::new(vec![]);
    let schema = test_schema(&executor, Duration::from_secs(60));

    let response = schema.execute(Request::new("{ nopes { id } }")).await;

    assert!(!response.errors.is_empty());
    assert!(executor.statements().is_empty());
}
