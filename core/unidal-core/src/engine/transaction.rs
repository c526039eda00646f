//! Transaction — 하나의 풀 커넥션에 걸친 다중 연산 스코프
//!
//! 가드는 커넥션 하나를 빌려 `begin`한 상태로 들고 있습니다.
//! `commit(self)` / `rollback(self)`이 스코프를 끝내고, 끝내지 않은
//! 가드가 드롭되면 롤백됩니다. 어느 경로로 나가든 커넥션은 가드의
//! 드롭과 함께 풀로 반납됩니다.

use crate::collection::RowCollection;
use crate::driver::FindOptions;
use crate::engine::Database;
use crate::error::DalResult;
use crate::pool::PooledConnection;
use crate::row::{Record, Row};
use serde_json::Value;
use tracing::warn;

/// One in-flight transaction over a pooled connection.
pub struct Transaction {
    conn: PooledConnection,
    finished: bool,
}

impl Database {
    /// 트랜잭션 시작 — 커넥션을 하나 빌려 `begin`한 가드를 돌려줍니다.
    pub fn transaction(&self) -> DalResult<Transaction> {
        let mut conn = self.connection()?;
        conn.begin()?;
        Ok(Transaction {
            conn,
            finished: false,
        })
    }

    /// 클로저 스코프 트랜잭션: `Ok`면 커밋, `Err`면 롤백.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&mut Transaction) -> DalResult<T>,
    ) -> DalResult<T> {
        let mut tx = self.transaction()?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                // The caller's failure is the one worth reporting.
                if let Err(rb) = tx.rollback() {
                    warn!(error = %rb, "rollback after scope failure also failed");
                }
                Err(err)
            }
        }
    }
}

impl Transaction {
    // ════════════════════════════════════════════
    // Operations on the transaction's connection
    // ════════════════════════════════════════════

    pub fn find(
        &mut self,
        target: &str,
        conditions: &Record,
        opts: &FindOptions,
    ) -> DalResult<RowCollection> {
        self.conn.find(target, conditions, opts)
    }

    pub fn findone(&mut self, target: &str, conditions: &Record) -> DalResult<Option<Row>> {
        let mut found = self
            .conn
            .find(target, conditions, &FindOptions::new().with_fetch_all(true))?;
        let rows = found.all()?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows[0].clone())),
            _ => Err(crate::error::DalError::MultipleRecordsFound {
                target: target.to_string(),
            }),
        }
    }

    pub fn insert(&mut self, target: &str, records: &[Record]) -> DalResult<u64> {
        self.conn.insert(target, records)
    }

    pub fn update(&mut self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64> {
        self.conn.update(target, records, keyflds)
    }

    pub fn upsert(
        &mut self,
        target: &str,
        records: &[Record],
        keyflds: &[&str],
    ) -> DalResult<(u64, u64)> {
        self.conn.upsert(target, records, keyflds)
    }

    pub fn delete(&mut self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64> {
        self.conn.delete(target, records, keyflds)
    }

    pub fn count(&mut self, target: &str, conditions: &Record) -> DalResult<u64> {
        self.conn.count(target, conditions)
    }

    pub fn exists(&mut self, target: &str, id: Option<&Value>) -> DalResult<bool> {
        self.conn.exists(target, id)
    }

    pub fn execute(&mut self, stmt: &str, params: &Record, commit: bool) -> DalResult<RowCollection> {
        self.conn.execute(stmt, params, commit)
    }

    // ════════════════════════════════════════════
    // Commit / Rollback
    // ════════════════════════════════════════════

    /// 커밋하고 스코프를 끝냅니다. 커넥션은 드롭 시 풀로 반납됩니다.
    pub fn commit(mut self) -> DalResult<()> {
        self.conn.commit()?;
        self.finished = true;
        Ok(())
    }

    /// 롤백하고 스코프를 끝냅니다.
    pub fn rollback(mut self) -> DalResult<()> {
        self.conn.rollback()?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        // An unfinished scope (early return, panic, plain drop) rolls back.
        if !self.finished {
            if let Err(err) = self.conn.rollback() {
                warn!(error = %err, "implicit rollback failed");
            }
        }
    }
}
