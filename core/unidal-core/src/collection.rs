//! RowCollection — 커서를 감싸는 지연 평가·캐시·재생 가능한 행 시퀀스
//!
//! 백엔드의 pull 기반 커서를, 여러 번 소비하고 임의 접근할 수 있는
//! 시퀀스로 제공합니다. 요청이 없는 한 전체를 즉시 구체화하지 않습니다.
//!
//! 소진(exhaustion)은 에러가 아니라 평범한 `None` 분기입니다 —
//! [`RowSource::fetch_next`]가 `Ok(None)`을 돌려주면 끝난 것입니다.
//!
//! Invariant: 캐시는 언제나 전체 결과 집합의 prefix입니다. `pending`이
//! `false`가 된 순간 캐시가 전체 결과이며, 이후의 모든 소비는 소스를
//! 건드리지 않고 캐시를 재생합니다.

use crate::error::DalResult;
use crate::row::{Record, Row};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Pull-based cursor over backend result rows.
///
/// # Contract
///
/// - `fetch_next`: next value row, or `Ok(None)` once exhausted — an
///   exhausted source stays exhausted.
/// - `close`: releases the underlying cursor; called by the collection
///   on exhaustion, on explicit close, and on drop.
///
/// Sources own their cursor (`'static`), so a collection stays valid
/// after the pooled connection that produced it returns to the pool.
pub trait RowSource: Send {
    fn fetch_next(&mut self) -> DalResult<Option<Vec<Value>>>;

    fn close(&mut self) -> DalResult<()> {
        Ok(())
    }
}

/// A source over already-materialized value rows.
pub struct VecSource {
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl VecSource {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for VecSource {
    fn fetch_next(&mut self) -> DalResult<Option<Vec<Value>>> {
        Ok(self.rows.next())
    }
}

/// A lazy, memoizing sequence of [`Row`]s over a [`RowSource`].
///
/// 단일 소비자 전용입니다. 전진하는 모든 연산이 `&mut self`를 받으므로
/// 두 스레드가 같은 인스턴스를 동시에 소비하는 상황은 타입 수준에서
/// 표현되지 않습니다. 서로 다른 커넥션 위의 독립적인 컬렉션들은 완전히
/// 독립적입니다.
pub struct RowCollection {
    keys: Arc<[String]>,
    source: Option<Box<dyn RowSource>>,
    cache: Vec<Row>,
    pending: bool,
}

impl RowCollection {
    /// Wrap a live cursor. Nothing is fetched until the first consumption.
    pub fn new(keys: Vec<String>, source: Box<dyn RowSource>) -> Self {
        Self {
            keys: keys.into(),
            source: Some(source),
            cache: Vec::new(),
            pending: true,
        }
    }

    /// A collection over rows already fetched — used for slices.
    pub(crate) fn from_cached(keys: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self {
            keys,
            source: None,
            cache: rows,
            pending: false,
        }
    }

    /// 결과 집합의 필드 이름 (모든 행이 공유)
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// True while the source may still yield unfetched rows.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Count of rows *currently cached* — not the eventual total.
    /// Call [`all`](Self::all) first when the true total is needed.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// 소스를 한 행 전진시키고 캐시에 추가해 돌려줍니다.
    ///
    /// 소진되면 `Ok(None)` — 이때 `pending`이 영구히 `false`가 되고
    /// 커서가 해제됩니다. 이후의 모든 호출은 같은 방식으로 `Ok(None)`을
    /// 돌려주며 소스를 되살리지 않습니다.
    pub fn next_row(&mut self) -> DalResult<Option<Row>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        match source.fetch_next() {
            Ok(Some(values)) => {
                let row = Row::new(Arc::clone(&self.keys), values)?;
                self.cache.push(row.clone());
                Ok(Some(row))
            }
            Ok(None) => {
                self.finish()?;
                Ok(None)
            }
            Err(err) => {
                // A failed cursor is not retried; release it.
                let _ = self.finish();
                Err(err)
            }
        }
    }

    /// Row at position `index`, pulling from the source as needed.
    pub fn get(&mut self, index: usize) -> DalResult<Row> {
        while self.cache.len() <= index && self.pending {
            if self.next_row()?.is_none() {
                break;
            }
        }
        match self.cache.get(index) {
            Some(row) => Ok(row.clone()),
            None => Err(crate::error::DalError::OutOfRange {
                index,
                len: self.cache.len(),
            }),
        }
    }

    /// `[start, end)` 구간에 대한 새 컬렉션 뷰 (키 공유).
    ///
    /// `end`까지 캐시를 채우고(또는 소진될 때까지), 캐시 범위로 잘라냅니다.
    pub fn slice(&mut self, start: usize, end: usize) -> DalResult<RowCollection> {
        while self.cache.len() < end && self.pending {
            if self.next_row()?.is_none() {
                break;
            }
        }
        let end = end.min(self.cache.len());
        let start = start.min(end);
        Ok(RowCollection::from_cached(
            Arc::clone(&self.keys),
            self.cache[start..end].to_vec(),
        ))
    }

    /// 남은 행을 모두 끌어와 전체 결과를 돌려줍니다.
    ///
    /// 멱등: 두 번째 호출은 추가 fetch 없이 캐시를 그대로 돌려줍니다.
    pub fn all(&mut self) -> DalResult<&[Row]> {
        while self.pending {
            if self.next_row()?.is_none() {
                break;
            }
        }
        Ok(&self.cache)
    }

    /// Like [`all`](Self::all), but as name → value mappings.
    pub fn all_mappings(&mut self) -> DalResult<Vec<Record>> {
        self.all()?;
        self.cache.iter().map(Row::to_mapping).collect()
    }

    /// Iterate the rows: cached entries replay without touching the
    /// source, then new rows are pulled beyond the cache frontier.
    /// Restartable — a second `iter()` replays from the start.
    pub fn iter(&mut self) -> RowIter<'_> {
        RowIter { coll: self, pos: 0 }
    }

    /// Release the underlying cursor early. The collection then behaves
    /// as exhausted at the current cache frontier.
    pub fn close(&mut self) -> DalResult<()> {
        self.finish()
    }

    fn finish(&mut self) -> DalResult<()> {
        self.pending = false;
        if let Some(mut source) = self.source.take() {
            source.close()?;
        }
        Ok(())
    }
}

/// Single-pass iterator handle over a [`RowCollection`].
pub struct RowIter<'a> {
    coll: &'a mut RowCollection,
    pos: usize,
}

impl Iterator for RowIter<'_> {
    type Item = DalResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.coll.cache.len() {
            let row = self.coll.cache[self.pos].clone();
            self.pos += 1;
            return Some(Ok(row));
        }
        match self.coll.next_row() {
            Ok(Some(row)) => {
                self.pos += 1;
                Some(Ok(row))
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl fmt::Debug for RowCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCollection")
            .field("keys", &self.keys)
            .field("cached", &self.cache.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl Drop for RowCollection {
    fn drop(&mut self) {
        if let Some(mut source) = self.source.take() {
            let _ = source.close();
        }
    }
}
