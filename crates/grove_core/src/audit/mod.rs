//! Transaction log: the caller-owned unit-of-work recorder.
//!
//! # Responsibility
//! - Record one transaction row per unit of work and one operation row
//!   per atomic mutation inside it.
//! - Scope entity mutations and audit rows to a single storage
//!   transaction, committed or discarded exactly once by the owner.
//!
//! # Invariants
//! - A dropped or abandoned log leaves zero rows: the audit trail is a
//!   subset, never a superset, of successful mutations.
//! - `close` consumes the handle; nothing can be logged to a closed
//!   transaction.

use crate::error::RegistryResult;
use crate::model::audit::{OpType, Operation, Transaction};
use crate::model::EntityKind;
use log::info;
use rusqlite::{params, Connection, TransactionBehavior};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

mod reader;

pub use reader::{
    get_transaction, list_operations, list_transactions, operations_of, OperationQuery,
    TransactionQuery,
};

/// Open unit of work accumulating operations for one transaction.
///
/// Owns an IMMEDIATE storage transaction: repositories reached through
/// [`TransactionsLog::store`] read and write inside the same scope as
/// the audit rows, so a failure anywhere discards both together.
pub struct TransactionsLog<'conn> {
    tx: rusqlite::Transaction<'conn>,
    trx: Transaction,
}

impl<'conn> TransactionsLog<'conn> {
    /// Opens a named transaction on behalf of `authored_by`.
    ///
    /// Acquires the write lock up front so concurrent units of work are
    /// serialized by the store.
    pub fn open(
        conn: &'conn Connection,
        name: &str,
        authored_by: Option<&str>,
    ) -> RegistryResult<Self> {
        let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

        let trx = Transaction {
            tuid: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            created_at: now_epoch_ms(),
            closed_at: None,
            is_closed: false,
            authored_by: authored_by.map(str::to_string),
        };

        tx.execute(
            "INSERT INTO transactions (tuid, name, created_at, is_closed, authored_by)
             VALUES (?1, ?2, ?3, 0, ?4);",
            params![trx.tuid, trx.name, trx.created_at, trx.authored_by],
        )?;

        info!(
            "event=trx_open module=audit status=ok name={} tuid={}",
            trx.name, trx.tuid
        );

        Ok(Self { tx, trx })
    }

    /// The storage scope of this unit of work.
    ///
    /// Repositories constructed over this connection observe and join
    /// the open transaction.
    pub fn store(&self) -> &Connection {
        &self.tx
    }

    /// The transaction record as opened. `is_closed` stays false until
    /// [`TransactionsLog::close`] returns the committed record.
    pub fn transaction(&self) -> &Transaction {
        &self.trx
    }

    /// Records one operation owned by the open transaction.
    pub fn log_operation(
        &self,
        op_type: OpType,
        entity_type: EntityKind,
        target: &str,
        args: serde_json::Value,
    ) -> RegistryResult<Operation> {
        let operation = Operation {
            ouid: Uuid::new_v4().simple().to_string(),
            tuid: self.trx.tuid.clone(),
            op_type,
            entity_type,
            target: target.to_string(),
            timestamp: now_epoch_ms(),
            args,
        };

        self.tx.execute(
            "INSERT INTO operations (ouid, tuid, op_type, entity_type, target, timestamp, args)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                operation.ouid,
                operation.tuid,
                operation.op_type.tag(),
                operation.entity_type.tag(),
                operation.target,
                operation.timestamp,
                operation.args.to_string(),
            ],
        )?;

        Ok(operation)
    }

    /// Closes the unit of work: marks the transaction closed and commits
    /// it together with all accumulated operations and entity writes.
    pub fn close(self) -> RegistryResult<Transaction> {
        let Self { tx, mut trx } = self;

        trx.closed_at = Some(now_epoch_ms());
        trx.is_closed = true;

        tx.execute(
            "UPDATE transactions
             SET is_closed = 1, closed_at = ?1
             WHERE tuid = ?2;",
            params![trx.closed_at, trx.tuid],
        )?;
        tx.commit()?;

        info!(
            "event=trx_close module=audit status=ok name={} tuid={}",
            trx.name, trx.tuid
        );

        Ok(trx)
    }

    /// Abandons the unit of work, discarding every buffered row.
    ///
    /// Dropping the log without closing has the same effect; this form
    /// surfaces rollback errors.
    pub fn abandon(self) -> RegistryResult<()> {
        let tuid = self.trx.tuid.clone();
        self.tx.rollback()?;
        info!("event=trx_abandon module=audit status=ok tuid={tuid}");
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
