//! Read access to the audit trail.
//!
//! # Responsibility
//! - Expose lookup and filtered listing over transaction and operation
//!   rows, pass-through to storage.
//!
//! # Invariants
//! - Readers never mutate the trail.
//! - `Operation.args` round-trips verbatim through JSON.

use crate::error::{RegistryError, RegistryResult};
use crate::model::audit::{OpType, Operation, Transaction};
use crate::model::EntityKind;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TRANSACTION_SELECT_SQL: &str = "SELECT
    tuid,
    name,
    created_at,
    closed_at,
    is_closed,
    authored_by
FROM transactions";

const OPERATION_SELECT_SQL: &str = "SELECT
    ouid,
    tuid,
    op_type,
    entity_type,
    target,
    timestamp,
    args
FROM operations";

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub tuid: Option<String>,
    pub name: Option<String>,
    pub is_closed: Option<bool>,
    pub authored_by: Option<String>,
    /// Transactions created at or after this epoch ms value.
    pub from_date: Option<i64>,
    /// Transactions created at or before this epoch ms value.
    pub to_date: Option<i64>,
}

/// Filter options for listing operations.
#[derive(Debug, Clone, Default)]
pub struct OperationQuery {
    pub ouid: Option<String>,
    pub tuid: Option<String>,
    pub op_type: Option<OpType>,
    pub entity_type: Option<EntityKind>,
    pub target: Option<String>,
    /// Operations recorded at or after this epoch ms value.
    pub from_date: Option<i64>,
    /// Operations recorded at or before this epoch ms value.
    pub to_date: Option<i64>,
}

/// Loads one transaction by token.
pub fn get_transaction(conn: &Connection, tuid: &str) -> RegistryResult<Option<Transaction>> {
    let mut stmt = conn.prepare(&format!("{TRANSACTION_SELECT_SQL} WHERE tuid = ?1;"))?;
    let mut rows = stmt.query(params![tuid])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_transaction_row(row)?));
    }
    Ok(None)
}

/// Lists transactions matching the filter, oldest first.
pub fn list_transactions(
    conn: &Connection,
    query: &TransactionQuery,
) -> RegistryResult<Vec<Transaction>> {
    let mut sql = format!("{TRANSACTION_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(tuid) = &query.tuid {
        sql.push_str(" AND tuid = ?");
        bind_values.push(Value::Text(tuid.clone()));
    }
    if let Some(name) = &query.name {
        sql.push_str(" AND name = ?");
        bind_values.push(Value::Text(name.clone()));
    }
    if let Some(is_closed) = query.is_closed {
        sql.push_str(" AND is_closed = ?");
        bind_values.push(Value::Integer(is_closed.into()));
    }
    if let Some(authored_by) = &query.authored_by {
        sql.push_str(" AND authored_by = ?");
        bind_values.push(Value::Text(authored_by.clone()));
    }
    if let Some(from_date) = query.from_date {
        sql.push_str(" AND created_at >= ?");
        bind_values.push(Value::Integer(from_date));
    }
    if let Some(to_date) = query.to_date {
        sql.push_str(" AND created_at <= ?");
        bind_values.push(Value::Integer(to_date));
    }

    sql.push_str(" ORDER BY created_at ASC, tuid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut transactions = Vec::new();
    while let Some(row) = rows.next()? {
        transactions.push(parse_transaction_row(row)?);
    }
    Ok(transactions)
}

/// Lists operations matching the filter, oldest first.
pub fn list_operations(
    conn: &Connection,
    query: &OperationQuery,
) -> RegistryResult<Vec<Operation>> {
    let mut sql = format!("{OPERATION_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(ouid) = &query.ouid {
        sql.push_str(" AND ouid = ?");
        bind_values.push(Value::Text(ouid.clone()));
    }
    if let Some(tuid) = &query.tuid {
        sql.push_str(" AND tuid = ?");
        bind_values.push(Value::Text(tuid.clone()));
    }
    if let Some(op_type) = query.op_type {
        sql.push_str(" AND op_type = ?");
        bind_values.push(Value::Text(op_type.tag().to_string()));
    }
    if let Some(entity_type) = query.entity_type {
        sql.push_str(" AND entity_type = ?");
        bind_values.push(Value::Text(entity_type.tag().to_string()));
    }
    if let Some(target) = &query.target {
        sql.push_str(" AND target = ?");
        bind_values.push(Value::Text(target.clone()));
    }
    if let Some(from_date) = query.from_date {
        sql.push_str(" AND timestamp >= ?");
        bind_values.push(Value::Integer(from_date));
    }
    if let Some(to_date) = query.to_date {
        sql.push_str(" AND timestamp <= ?");
        bind_values.push(Value::Integer(to_date));
    }

    sql.push_str(" ORDER BY timestamp ASC, ouid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut operations = Vec::new();
    while let Some(row) = rows.next()? {
        operations.push(parse_operation_row(row)?);
    }
    Ok(operations)
}

/// Lists the operations owned by one transaction, oldest first.
pub fn operations_of(conn: &Connection, tuid: &str) -> RegistryResult<Vec<Operation>> {
    list_operations(
        conn,
        &OperationQuery {
            tuid: Some(tuid.to_string()),
            ..OperationQuery::default()
        },
    )
}

fn parse_transaction_row(row: &Row<'_>) -> RegistryResult<Transaction> {
    let is_closed = match row.get::<_, i64>("is_closed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RegistryError::InvalidData(format!(
                "invalid is_closed value `{other}` in transactions.is_closed"
            )));
        }
    };

    Ok(Transaction {
        tuid: row.get("tuid")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        closed_at: row.get("closed_at")?,
        is_closed,
        authored_by: row.get("authored_by")?,
    })
}

fn parse_operation_row(row: &Row<'_>) -> RegistryResult<Operation> {
    let op_type_text: String = row.get("op_type")?;
    let op_type = OpType::parse_tag(&op_type_text).ok_or_else(|| {
        RegistryError::InvalidData(format!(
            "invalid operation type `{op_type_text}` in operations.op_type"
        ))
    })?;

    let entity_type_text: String = row.get("entity_type")?;
    let entity_type = EntityKind::parse_tag(&entity_type_text).ok_or_else(|| {
        RegistryError::InvalidData(format!(
            "invalid entity type `{entity_type_text}` in operations.entity_type"
        ))
    })?;

    let args_text: String = row.get("args")?;
    let args = serde_json::from_str(&args_text).map_err(|err| {
        RegistryError::InvalidData(format!("invalid args payload in operations.args: {err}"))
    })?;

    Ok(Operation {
        ouid: row.get("ouid")?,
        tuid: row.get("tuid")?,
        op_type,
        entity_type,
        target: row.get("target")?,
        timestamp: row.get("timestamp")?,
        args,
    })
}
