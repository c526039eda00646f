//! 백엔드 계약 — 모든 어댑터가 구현하는 다형적 Connection 인터페이스
//!
//! Facade와 upsert 분류기는 이 트레이트에만 의존합니다.
//! 구체 어댑터 타입에는 절대 의존하지 않습니다 (Dependency Inversion).
//! 새 백엔드는 [`Driver`]/[`Connection`]을 구현하는 것으로 추가됩니다.

pub mod memory;

use crate::collection::RowCollection;
use crate::error::{DalError, DalResult};
use crate::row::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-operation options.
///
/// `page`/`page_size`는 검색 인덱스류 백엔드의 페이지네이션으로,
/// `from = page * page_size`, `size = page_size`로 질의에 내장됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindOptions {
    /// Drain the result before returning it.
    pub fetch_all: bool,
    /// Zero-based page number; `None` disables pagination.
    pub page: Option<u64>,
    /// Rows per page.
    pub page_size: u64,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            fetch_all: false,
            page: None,
            page_size: 10,
        }
    }
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_all(mut self, fetch_all: bool) -> Self {
        self.fetch_all = fetch_all;
        self
    }

    pub fn with_page(mut self, page: u64, page_size: u64) -> Self {
        self.page = Some(page);
        self.page_size = page_size;
        self
    }
}

/// One open backend session.
///
/// # Contract
///
/// - `close` is idempotent; no operation may be issued after it
///   ([`DalError::ConnectionClosed`]).
/// - `insert` with an empty batch is `Ok(0)`.
/// - `delete` matching zero rows is `Ok(0)`, never an error.
/// - Read operations return a [`RowCollection`] whose source owns its
///   cursor, so the collection outlives the pooled connection.
/// - Backend failures are wrapped with operation context
///   ([`DalError::Driver`]), never silently swallowed.
pub trait Connection: Send {
    /// Run a raw backend statement with named parameters.
    fn execute(&mut self, stmt: &str, params: &Record, commit: bool) -> DalResult<RowCollection>;

    /// Equality-condition query against a target.
    fn find(
        &mut self,
        target: &str,
        conditions: &Record,
        opts: &FindOptions,
    ) -> DalResult<RowCollection>;

    /// Write a batch; returns the count of rows written.
    fn insert(&mut self, target: &str, records: &[Record]) -> DalResult<u64>;

    /// Merge each record into the rows matching its key predicate;
    /// returns the count of rows affected.
    fn update(&mut self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64>;

    /// Remove the rows matching each record's key predicate.
    fn delete(&mut self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64>;

    /// Count rows matching the equality conditions.
    fn count(&mut self, target: &str, conditions: &Record) -> DalResult<u64>;

    /// Whether the target exists (`id` absent) or holds the given id.
    fn exists(&mut self, target: &str, id: Option<&Value>) -> DalResult<bool>;

    fn begin(&mut self) -> DalResult<()>;
    fn commit(&mut self) -> DalResult<()>;
    fn rollback(&mut self) -> DalResult<()>;

    /// Release any open cursor and the backing session. Idempotent.
    fn close(&mut self) -> DalResult<()>;

    fn is_open(&self) -> bool;

    /// Upsert — 배치의 각 레코드를 update 또는 insert로 분류해 실행.
    ///
    /// 기본 구현이 분류기(fallback) 전략입니다:
    ///
    /// 1. 레코드마다 `keyflds`에 대한 동등 조건의 논리곱으로 키 술어를 만든다.
    /// 2. `count`로 존재 여부를 확인한다 — 0이면 insert, 아니면 update.
    /// 3. 원래 순서를 보존한 채 배치를 둘로 나눈다.
    /// 4. `update`를 먼저, `insert`를 그다음 실행한다.
    /// 5. `(updated, inserted)`를 돌려준다.
    ///
    /// 존재 확인과 쓰기 사이에는 행 잠금이 없습니다. 같은 키를 노리는
    /// 동시 작성자 아래에서는 둘 다 "없음"을 관측해 중복 insert를
    /// 시도하거나, update로 분류된 행이 그 사이 지워질 수 있습니다 —
    /// check-then-act 설계가 받아들인 경쟁입니다. 네이티브 원자적
    /// upsert를 가진 백엔드는 이 메서드를 오버라이드해 경쟁을 완전히
    /// 피할 수 있으며, 입출력 계약은 그대로 유지해야 합니다.
    fn upsert(
        &mut self,
        target: &str,
        records: &[Record],
        keyflds: &[&str],
    ) -> DalResult<(u64, u64)> {
        if records.is_empty() {
            return Ok((0, 0));
        }
        let mut updates: Vec<Record> = Vec::new();
        let mut inserts: Vec<Record> = Vec::new();
        for record in records {
            let predicate = key_predicate(record, keyflds)?;
            if self.count(target, &predicate)? == 0 {
                inserts.push(record.clone());
            } else {
                updates.push(record.clone());
            }
        }
        tracing::debug!(
            dst = target,
            updates = updates.len(),
            inserts = inserts.len(),
            "upsert batch classified"
        );
        let updated = if updates.is_empty() {
            0
        } else {
            self.update(target, &updates, keyflds)?
        };
        let inserted = if inserts.is_empty() {
            0
        } else {
            self.insert(target, &inserts)?
        };
        Ok((updated, inserted))
    }
}

/// Backend adapter factory — one per scheme.
pub trait Driver: Send + Sync {
    /// Open a new raw connection; the pool calls this lazily.
    fn connect(&self) -> DalResult<Box<dyn Connection>>;

    /// Table/collection/index names known to the backend.
    fn table_names(&self) -> DalResult<Vec<String>>;

    /// The connection-string scheme this driver answers to.
    fn scheme(&self) -> &'static str;
}

/// Equality predicate identifying "the same logical record": the
/// conjunction over `keyflds` of `field == record[field]`.
///
/// A record missing one of its key fields cannot be classified or
/// matched — that is a caller error, raised before any write.
pub(crate) fn key_predicate(record: &Record, keyflds: &[&str]) -> DalResult<Record> {
    let mut predicate = Record::new();
    for fld in keyflds {
        let value = record.get(*fld).ok_or_else(|| {
            DalError::Precondition(format!("record is missing key field '{fld}'"))
        })?;
        predicate.insert((*fld).to_string(), value.clone());
    }
    Ok(predicate)
}
