//! Database struct definition — the facade over driver, pool and config.

use crate::config::DbConfig;
use crate::driver::Driver;
use crate::driver::memory::MemoryDriver;
use crate::error::{DalError, DalResult};
use crate::pool::{ConnectionPool, PoolConfig, PooledConnection};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, instrument};

/// UniDAL 데이터베이스 facade
///
/// 연결 문자열의 scheme으로 백엔드 어댑터를 고르고, 바운디드 풀에서
/// 커넥션을 빌려 CRUD 계약을 실행합니다. 모든 연산은 스코프 획득을
/// 사용합니다 — 어떤 종료 경로에서도 커넥션은 풀로 반납됩니다.
///
/// # 예제
///
/// ```rust
/// use unidal_core::{Database, record};
///
/// # fn main() -> unidal_core::DalResult<()> {
/// let db = Database::open("memory://localhost/appdb")?;
/// db.insertone("users", &record!({"id": 1, "name": "Alice"}))?;
/// assert_eq!(db.count("users", &Default::default())?, 1);
/// db.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Database {
    config: DbConfig,
    driver: Arc<dyn Driver>,
    pool: Arc<ConnectionPool>,
    open: AtomicBool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// 연결 문자열로 데이터베이스를 엽니다.
    ///
    /// 내장 scheme은 `memory`뿐입니다. 네트워크 백엔드 어댑터는
    /// [`Database::with_driver`]로 꽂습니다.
    ///
    /// Pool props understood in the query section: `pool_size`
    /// (default 5), `connect_timeout` in seconds (default 10).
    #[instrument(skip(url))]
    pub fn open(url: &str) -> DalResult<Self> {
        let config = DbConfig::parse(url)?;
        let driver: Arc<dyn Driver> = match config.scheme.as_str() {
            "memory" => Arc::new(MemoryDriver::new()),
            other => return Err(DalError::UnsupportedScheme(other.to_string())),
        };
        Self::with_driver(config, driver)
    }

    /// 외부 백엔드 어댑터로 데이터베이스를 엽니다.
    pub fn with_driver(config: DbConfig, driver: Arc<dyn Driver>) -> DalResult<Self> {
        if config.scheme != driver.scheme() {
            return Err(DalError::UnsupportedScheme(format!(
                "url scheme '{}' does not match driver '{}'",
                config.scheme,
                driver.scheme()
            )));
        }
        let mut pool_config = PoolConfig::default();
        if let Some(size) = config.prop_parse::<usize>("pool_size")? {
            pool_config.capacity = size;
        }
        if let Some(secs) = config.prop_parse::<u64>("connect_timeout")? {
            pool_config.acquire_timeout = Duration::from_secs(secs);
        }
        info!(
            scheme = config.scheme,
            host = config.host,
            database = config.database,
            capacity = pool_config.capacity,
            "opening database"
        );
        let pool = Arc::new(ConnectionPool::new(Arc::clone(&driver), pool_config));
        Ok(Self {
            config,
            driver,
            pool,
            open: AtomicBool::new(true),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// 백엔드가 알고 있는 테이블/컬렉션/인덱스 이름 목록
    pub fn table_names(&self) -> DalResult<Vec<String>> {
        self.ensure_open()?;
        self.driver.table_names()
    }

    /// 데이터베이스를 닫습니다: 풀을 비우고 모든 유휴 커넥션을 닫습니다.
    /// 멱등 — 이후의 모든 연산은 [`DalError::DatabaseClosed`]로 실패합니다.
    pub fn close(&self) -> DalResult<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            info!(scheme = self.config.scheme, "closing database");
            self.pool.dispose()?;
        }
        Ok(())
    }

    pub(crate) fn connection(&self) -> DalResult<PooledConnection> {
        self.ensure_open()?;
        self.pool.acquire()
    }

    fn ensure_open(&self) -> DalResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DalError::DatabaseClosed)
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_scheme() {
        let db = Database::open("memory://localhost/test").unwrap();
        assert!(db.is_open());
        assert_eq!(db.config().scheme, "memory");
        assert_eq!(db.pool().capacity(), 5);
    }

    #[test]
    fn unsupported_scheme_fails() {
        assert!(matches!(
            Database::open("oracle://h/d"),
            Err(DalError::UnsupportedScheme(s)) if s == "oracle"
        ));
    }

    #[test]
    fn pool_props_from_url() {
        let db = Database::open("memory://h/d?pool_size=2&connect_timeout=1").unwrap();
        assert_eq!(db.pool().capacity(), 2);
    }

    #[test]
    fn mismatched_driver_scheme_fails() {
        let config = DbConfig::parse("mysql://h/d").unwrap();
        let err = Database::with_driver(config, Arc::new(MemoryDriver::new())).unwrap_err();
        assert!(matches!(err, DalError::UnsupportedScheme(_)));
    }

    #[test]
    fn close_is_idempotent_and_fails_later_ops() {
        let db = Database::open("memory://h/d").unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(!db.is_open());
        assert!(matches!(
            db.table_names().unwrap_err(),
            DalError::DatabaseClosed
        ));
    }
}
