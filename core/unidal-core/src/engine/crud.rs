//! Database CRUD operations — the one-shot facade methods.
//!
//! 각 메서드는 전제 조건을 검증한 뒤(커넥션 획득 전에), 풀에서
//! 커넥션을 빌려 계약 연산에 위임하고, 모든 종료 경로에서 반납합니다.

use crate::collection::RowCollection;
use crate::driver::FindOptions;
use crate::engine::Database;
use crate::error::{DalError, DalResult};
use crate::row::{Record, Row};
use serde_json::Value;

/// `keyflds` must identify a logical record; an empty set matches
/// everything and is a caller error, raised before any I/O.
fn require_keyflds(op: &str, keyflds: &[&str]) -> DalResult<()> {
    if keyflds.is_empty() {
        return Err(DalError::Precondition(format!(
            "{op} requires at least one key field"
        )));
    }
    Ok(())
}

impl Database {
    // ════════════════════════════════════════════
    // Read operations
    // ════════════════════════════════════════════

    /// 조건에 맞는 단 하나의 행, 없으면 `None`.
    ///
    /// 둘 이상이 맞으면 [`DalError::MultipleRecordsFound`] — 조용히
    /// 하나를 고르지 않습니다.
    pub fn findone(&self, target: &str, conditions: &Record) -> DalResult<Option<Row>> {
        let mut conn = self.connection()?;
        let mut found = conn.find(target, conditions, &FindOptions::new().with_fetch_all(true))?;
        let rows = found.all()?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows[0].clone())),
            _ => Err(DalError::MultipleRecordsFound {
                target: target.to_string(),
            }),
        }
    }

    /// 조건에 맞는 행들의 [`RowCollection`].
    ///
    /// `opts.fetch_all`이 아니면 지연 평가 — 소비될 때 당겨옵니다.
    pub fn findmany(
        &self,
        target: &str,
        conditions: &Record,
        opts: &FindOptions,
    ) -> DalResult<RowCollection> {
        let mut conn = self.connection()?;
        conn.find(target, conditions, opts)
    }

    pub fn count(&self, target: &str, conditions: &Record) -> DalResult<u64> {
        let mut conn = self.connection()?;
        conn.count(target, conditions)
    }

    pub fn exists(&self, target: &str, id: Option<&Value>) -> DalResult<bool> {
        let mut conn = self.connection()?;
        conn.exists(target, id)
    }

    /// Raw backend statement, for whatever the adapter passes through.
    pub fn execute(&self, stmt: &str, params: &Record, commit: bool) -> DalResult<RowCollection> {
        let mut conn = self.connection()?;
        conn.execute(stmt, params, commit)
    }

    // ════════════════════════════════════════════
    // Write operations
    // ════════════════════════════════════════════

    pub fn insertone(&self, target: &str, record: &Record) -> DalResult<u64> {
        self.insertmany(target, std::slice::from_ref(record))
    }

    /// 배치 삽입; 쓰인 행 수를 돌려줍니다. 빈 배치는 `Ok(0)`.
    pub fn insertmany(&self, target: &str, records: &[Record]) -> DalResult<u64> {
        let mut conn = self.connection()?;
        conn.insert(target, records)
    }

    pub fn updateone(&self, target: &str, record: &Record, keyflds: &[&str]) -> DalResult<u64> {
        self.updatemany(target, std::slice::from_ref(record), keyflds)
    }

    pub fn updatemany(&self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64> {
        require_keyflds("update", keyflds)?;
        let mut conn = self.connection()?;
        conn.update(target, records, keyflds)
    }

    pub fn upsertone(&self, target: &str, record: &Record, keyflds: &[&str]) -> DalResult<(u64, u64)> {
        self.upsertmany(target, std::slice::from_ref(record), keyflds)
    }

    /// 배치 upsert; `(updated, inserted)`를 돌려줍니다.
    /// 단일 합계가 필요하면 두 값을 더하십시오.
    pub fn upsertmany(
        &self,
        target: &str,
        records: &[Record],
        keyflds: &[&str],
    ) -> DalResult<(u64, u64)> {
        require_keyflds("upsert", keyflds)?;
        let mut conn = self.connection()?;
        conn.upsert(target, records, keyflds)
    }

    pub fn deleteone(&self, target: &str, record: &Record, keyflds: &[&str]) -> DalResult<u64> {
        self.deletemany(target, std::slice::from_ref(record), keyflds)
    }

    /// 키 술어에 맞는 행 제거; 0건 일치는 `Ok(0)`이지 실패가 아닙니다.
    pub fn deletemany(&self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64> {
        require_keyflds("delete", keyflds)?;
        let mut conn = self.connection()?;
        conn.delete(target, records, keyflds)
    }
}
