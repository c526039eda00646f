//! # UniDAL — Polymorphic Data-Access Layer
//!
//! UniDAL은 이기종 백엔드(관계형, 도큐먼트, 검색 인덱스) 위에 하나의
//! CRUD 계약을 제공하는 데이터 접근 계층입니다. 핵심은 두 가지입니다:
//! 커서 기반 소비와 전체 구체화를 하나로 묶는 지연·메모이즈 행 컬렉션,
//! 그리고 존재 술어로 배치를 update/insert로 분류해 일관되게 실행하는
//! upsert 알고리즘.
//!
//! ## 주요 구성
//!
//! - **Row / RowCollection** — 불변 행 뷰와, 커서를 감싸는 재생 가능한
//!   지연 시퀀스
//! - **Connection 계약** — 모든 백엔드 어댑터가 구현하는 다형적
//!   인터페이스 (`find`/`insert`/`update`/`upsert`/`delete`/`execute`)
//! - **Upsert 분류기** — 네이티브 원자적 upsert가 없는 백엔드를 위한
//!   classify-then-write 폴백 전략
//! - **Pool / Database facade** — 바운디드 커넥션 풀과 스코프 획득,
//!   원샷·트랜잭션 실행
//!
//! ## 빠른 시작
//!
//! ```rust
//! use unidal_core::{Database, record};
//!
//! # fn main() -> unidal_core::DalResult<()> {
//! let db = Database::open("memory://localhost/appdb")?;
//!
//! db.insertmany("users", &[
//!     record!({"id": 1, "name": "Alice"}),
//!     record!({"id": 2, "name": "Bob"}),
//! ])?;
//!
//! let row = db.findone("users", &record!({"id": 1}))?.unwrap();
//! assert_eq!(row.get("name")?.as_str(), Some("Alice"));
//!
//! let (updated, inserted) = db.upsertmany("users", &[
//!     record!({"id": 1, "name": "Alice Liddell"}),
//!     record!({"id": 3, "name": "Carol"}),
//! ], &["id"])?;
//! assert_eq!((updated, inserted), (1, 1));
//! assert_eq!(db.count("users", &Default::default())?, 3);
//!
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### 트랜잭션
//!
//! ```rust
//! use unidal_core::{Database, record};
//!
//! # fn main() -> unidal_core::DalResult<()> {
//! let db = Database::open("memory://localhost/appdb")?;
//!
//! db.with_transaction(|tx| {
//!     tx.insert("events", &[record!({"id": 1, "kind": "start"})])?;
//!     tx.insert("events", &[record!({"id": 2, "kind": "stop"})])
//! })?;
//!
//! assert_eq!(db.count("events", &Default::default())?, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## 백엔드 어댑터
//!
//! 내장 어댑터는 `memory` 하나입니다. 네트워크 백엔드는 [`Driver`]와
//! [`Connection`]을 구현하는 별도 크레이트로 제공되며,
//! [`Database::with_driver`]로 꽂습니다. Facade와 분류기는 그 계약에만
//! 의존합니다.

pub mod collection;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod pool;
pub mod row;

// Logging utilities
pub mod logging;

// `record!` expands through this path.
pub use serde_json;

// Re-export commonly used types
pub use collection::{RowCollection, RowSource, VecSource};
pub use config::DbConfig;
pub use driver::{Connection, Driver, FindOptions};
pub use engine::{Database, Transaction};
pub use error::{DalError, DalResult};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use row::{Record, Row};
