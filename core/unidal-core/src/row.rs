//! Row — 질의 결과의 한 행(row/document)에 대한 불변 뷰
//!
//! 필드 이름 시퀀스와 값 시퀀스가 나란히 놓인 값 타입입니다.
//! 이름 조회는 명시적 메서드로만 제공됩니다 — 런타임 리플렉션 없음.
//! 중복된 필드 이름에 대한 이름 조회는 조용한 first-match가 아니라
//! [`DalError::AmbiguousField`]로 실패합니다.

use crate::error::{DalError, DalResult};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A named-field record, as passed to the write operations: field → value.
pub type Record = serde_json::Map<String, Value>;

/// Build a [`Record`] from JSON-object syntax.
///
/// ```rust
/// use unidal_core::record;
///
/// let rec = record!({"id": 1, "txt": "a"});
/// assert_eq!(rec["id"], 1);
/// ```
///
/// # Panics
///
/// Panics if the literal is not a JSON object.
#[macro_export]
macro_rules! record {
    ($($json:tt)+) => {
        match $crate::serde_json::json!($($json)+) {
            $crate::serde_json::Value::Object(map) => map,
            _ => panic!("record! requires a JSON object literal"),
        }
    };
}

/// One row from a query result.
///
/// 행은 생성 이후 불변이며, 키 시퀀스는 같은 결과 집합의 모든 행이
/// 공유합니다. `clone()`은 값 시퀀스도 공유하므로 저렴합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    keys: Arc<[String]>,
    values: Arc<[Value]>,
}

impl Row {
    /// Create a row over a shared key sequence.
    ///
    /// Fails with [`DalError::RowShape`] when the two sequences differ
    /// in length. Duplicate key names are permitted at construction
    /// (SQL joins produce them); every by-name operation fails on them.
    pub fn new(keys: Arc<[String]>, values: Vec<Value>) -> DalResult<Self> {
        if keys.len() != values.len() {
            return Err(DalError::RowShape {
                keys: keys.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            keys,
            values: values.into(),
        })
    }

    /// 필드 이름 목록
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 값 목록 (키와 같은 순서)
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of a field name among the keys.
    ///
    /// Fails with [`DalError::MissingField`] when absent and
    /// [`DalError::AmbiguousField`] when the name occurs more than once.
    pub fn index_of(&self, name: &str) -> DalResult<usize> {
        let mut found = None;
        for (i, key) in self.keys.iter().enumerate() {
            if key == name {
                if found.is_some() {
                    return Err(DalError::AmbiguousField(name.to_string()));
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| DalError::MissingField(name.to_string()))
    }

    /// 이름으로 값 조회
    pub fn get(&self, name: &str) -> DalResult<&Value> {
        let i = self.index_of(name)?;
        Ok(&self.values[i])
    }

    /// 위치로 값 조회
    pub fn get_index(&self, index: usize) -> DalResult<&Value> {
        self.values.get(index).ok_or(DalError::OutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Lookup that never fails: any lookup failure yields the default.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.get(name).unwrap_or(default)
    }

    /// 행을 이름 → 값 매핑으로 변환
    ///
    /// 이름 조회와 동일한 정책을 따릅니다: 중복된 필드 이름이 있으면
    /// last-write-wins로 덮어쓰지 않고 [`DalError::AmbiguousField`]로
    /// 실패합니다.
    pub fn to_mapping(&self) -> DalResult<Record> {
        let mut map = Record::new();
        for (key, value) in self.keys.iter().zip(self.values.iter()) {
            if map.contains_key(key) {
                return Err(DalError::AmbiguousField(key.clone()));
            }
            map.insert(key.clone(), value.clone());
        }
        Ok(map)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Row")?;
        for (key, value) in self.keys.iter().zip(self.values.iter()) {
            write!(f, " {key}={value}")?;
        }
        write!(f, ">")
    }
}
