use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, trace};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, QueryResult};
use serde_json::Value;

use super::StorageDriver;
use crate::error::{StatError, StatResult};
use crate::relation::{
    RelationAccessor, RelationEntityDefinition, DELTA_COLUMN, NODE_TITLE_COLUMN,
};
use crate::row::{AttributeRow, NodeRow, Related};

/// Ids bound into one `IN (...)` list. Well under the bind-parameter limit of
/// every supported backend.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// [`StorageDriver`] over a sea-orm connection pool
#[derive(Debug, Clone)]
pub struct SeaOrmDriver {
    conn: DatabaseConnection,
    batch_size: usize,
}

impl SeaOrmDriver {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Bind at most `batch_size` ids per statement
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.conn
    }

    async fn query_all(&self, operation: &str, select: &SelectStatement) -> StatResult<Vec<QueryResult>> {
        let statement = self.conn.get_database_backend().build(select);
        trace!("{}: {}", operation, statement);
        self.conn
            .query_all(statement)
            .await
            .map_err(|err| StatError::storage(operation, err))
    }

    async fn fetch_nodes(&self, definition: &RelationEntityDefinition) -> StatResult<Vec<NodeRow>> {
        let mut select = Query::select();
        select
            .columns([
                Alias::new(definition.id_column),
                Alias::new(definition.filter.column),
                Alias::new(NODE_TITLE_COLUMN),
            ])
            .from(Alias::new(definition.table))
            .and_where(
                Expr::col(Alias::new(definition.filter.column))
                    .eq(definition.filter.value.as_str()),
            )
            .order_by(Alias::new(definition.id_column), Order::Asc);

        let operation = format!("fetch {}", definition.entity_type);
        let results = match &definition.ids {
            None => self.query_all(&operation, &select).await?,
            Some(ids) => {
                let mut results = Vec::new();
                for batch in ids.chunks(self.batch_size) {
                    let mut batch_select = select.clone();
                    batch_select.and_where(
                        Expr::col(Alias::new(definition.id_column)).is_in(batch.iter().copied()),
                    );
                    results.extend(self.query_all(&operation, &batch_select).await?);
                }
                results
            }
        };

        let mut rows = results
            .iter()
            .map(|result| {
                let id = decode_id(result, definition.id_column)
                    .map_err(|err| StatError::storage(operation.as_str(), err))?;
                let entity_type: String = result
                    .try_get("", definition.filter.column)
                    .map_err(|err| StatError::storage(operation.as_str(), err))?;
                let title: Option<String> = result
                    .try_get("", NODE_TITLE_COLUMN)
                    .map_err(|err| StatError::storage(operation.as_str(), err))?;
                Ok(NodeRow::new(id, entity_type, title))
            })
            .collect::<StatResult<Vec<NodeRow>>>()?;
        // batches may repeat an id and each batch is only sorted within itself
        rows.sort_by_key(|row| row.id);
        rows.dedup_by_key(|row| row.id);
        Ok(rows)
    }

    /// Load one relation for all `owners`, grouped by owner id in delta order
    async fn fetch_relation(
        &self,
        accessor: &RelationAccessor,
        owners: &[i64],
    ) -> StatResult<HashMap<i64, Vec<AttributeRow>>> {
        let operation = format!("fetch relation {}", accessor.name);
        let mut grouped: HashMap<i64, Vec<AttributeRow>> = HashMap::new();

        for batch in owners.chunks(self.batch_size) {
            let mut select = Query::select();
            select
                .columns([
                    Alias::new(accessor.join_column),
                    Alias::new(DELTA_COLUMN),
                    Alias::new(accessor.column.as_str()),
                ])
                .from(Alias::new(accessor.table.as_str()))
                .and_where(Expr::col(Alias::new(accessor.join_column)).is_in(batch.iter().copied()))
                .order_by(Alias::new(accessor.join_column), Order::Asc)
                .order_by(Alias::new(DELTA_COLUMN), Order::Asc);

            for result in &self.query_all(&operation, &select).await? {
                let owner = decode_id(result, accessor.join_column)
                    .map_err(|err| StatError::storage(operation.as_str(), err))?;
                let mut row = AttributeRow::new();
                row.insert(accessor.join_column.to_string(), Value::from(owner));
                row.insert(DELTA_COLUMN.to_string(), decode_value(result, DELTA_COLUMN));
                row.insert(accessor.column.clone(), decode_value(result, &accessor.column));
                grouped.entry(owner).or_default().push(row);
            }
        }
        Ok(grouped)
    }
}

#[async_trait]
impl StorageDriver for SeaOrmDriver {
    async fn fetch(&self, definition: &RelationEntityDefinition) -> StatResult<Vec<NodeRow>> {
        let mut rows = self.fetch_nodes(definition).await?;
        debug!(
            "fetched {} {} node(s), joining {:?}",
            rows.len(),
            definition.entity_type,
            definition.relation_names()
        );
        if rows.is_empty() {
            return Ok(rows);
        }

        let owners: Vec<i64> = rows.iter().map(|row| row.id).collect();
        for accessor in &definition.relations {
            let mut grouped = self.fetch_relation(accessor, &owners).await?;
            for row in rows.iter_mut() {
                let sub_rows = grouped.remove(&row.id).unwrap_or_default();
                row.insert_relation(
                    accessor.name.clone(),
                    Related::collect(accessor.cardinality, sub_rows),
                );
            }
        }
        Ok(rows)
    }
}

/// Node ids are `int` on Drupal's Postgres/MySQL schemas and `INTEGER` on SQLite
fn decode_id(result: &QueryResult, column: &str) -> Result<i64, DbErr> {
    result
        .try_get::<i64>("", column)
        .or_else(|_| result.try_get::<i32>("", column).map(i64::from))
        .or_else(|_| result.try_get::<u32>("", column).map(i64::from))
}

macro_rules! decode_as {
    ($result:expr, $column:expr, $($ty:ty),+) => {
        $(
            if let Ok(value) = $result.try_get::<$ty>("", $column) {
                return Value::from(value);
            }
        )+
    };
}

/// Decode a column of unknown type. sqlx checks column types strictly, so
/// every width is tried: integers, floats, decimal, bool, then text. NULL
/// fails every attempt and decodes to `null`.
fn decode_value(result: &QueryResult, column: &str) -> Value {
    decode_as!(result, column, i64, i32, i16, i8, u32, u64, f64, f32);
    if let Ok(value) = result.try_get::<Decimal>("", column) {
        return value.to_f64().map(Value::from).unwrap_or(Value::Null);
    }
    decode_as!(result, column, bool, String);
    Value::Null
}
