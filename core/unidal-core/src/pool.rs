//! Bounded connection pool.
//!
//! 커넥션은 풀이 [`Driver`]를 통해 지연 생성하며, 반납되면 파괴되지 않고
//! 풀로 돌아갑니다. 풀이 가득 차면 `acquire`는 슬롯이 비워질 때까지
//! 블로킹하고, 타임아웃을 넘기면 [`DalError::AcquireTimeout`]으로
//! 실패합니다 — 부분적으로 선점한 슬롯은 그 경로에서도 해제됩니다.
//!
//! 획득은 항상 [`PooledConnection`] 가드를 통해 이루어집니다. 가드가
//! 스코프를 벗어나는 모든 경로(정상 반환, 조기 반환, 실패)에서 커넥션이
//! 풀로 반납됩니다 — GC 타이밍에 기대지 않습니다.

use crate::driver::{Connection, Driver};
use crate::error::{DalError, DalResult};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Pool sizing and acquisition limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of live connections.
    pub capacity: usize,
    /// Default timeout for [`ConnectionPool::acquire`].
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

struct PoolState {
    idle: Vec<Box<dyn Connection>>,
    /// Live connections: idle + handed out.
    total: usize,
    disposed: bool,
}

/// Bounded pool of backend connections.
pub struct ConnectionPool {
    driver: Arc<dyn Driver>,
    state: Mutex<PoolState>,
    available: Condvar,
    config: PoolConfig,
}

impl ConnectionPool {
    pub fn new(driver: Arc<dyn Driver>, config: PoolConfig) -> Self {
        Self {
            driver,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                total: 0,
                disposed: false,
            }),
            available: Condvar::new(),
            config,
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Connections currently handed out.
    pub fn in_use(&self) -> usize {
        let state = self.state.lock();
        state.total - state.idle.len()
    }

    /// 기본 타임아웃으로 커넥션을 획득합니다.
    pub fn acquire(self: &Arc<Self>) -> DalResult<PooledConnection> {
        self.acquire_timeout(self.config.acquire_timeout)
    }

    /// 커넥션 획득: 유휴 커넥션 재사용 → 빈 슬롯에 새로 연결 →
    /// 반납 대기, 순서로 시도합니다.
    pub fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> DalResult<PooledConnection> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.disposed {
                return Err(DalError::DatabaseClosed);
            }
            if let Some(conn) = state.idle.pop() {
                return Ok(self.guard(conn));
            }
            if state.total < self.config.capacity {
                // Claim the slot, then connect outside the lock.
                state.total += 1;
                drop(state);
                match self.driver.connect() {
                    Ok(conn) => {
                        debug!(scheme = self.driver.scheme(), "pool opened a connection");
                        return Ok(self.guard(conn));
                    }
                    Err(err) => {
                        // Give the claimed slot back before failing.
                        self.state.lock().total -= 1;
                        self.available.notify_one();
                        return Err(err);
                    }
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero()
                || self
                    .available
                    .wait_for(&mut state, remaining)
                    .timed_out()
            {
                // Last non-blocking look before giving up.
                if state.disposed {
                    return Err(DalError::DatabaseClosed);
                }
                if let Some(conn) = state.idle.pop() {
                    return Ok(self.guard(conn));
                }
                return Err(DalError::AcquireTimeout {
                    waited_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    fn guard(self: &Arc<Self>, conn: Box<dyn Connection>) -> PooledConnection {
        PooledConnection {
            pool: Arc::clone(self),
            conn: Some(conn),
        }
    }

    fn release(&self, mut conn: Box<dyn Connection>) {
        let mut state = self.state.lock();
        if state.disposed || !conn.is_open() {
            // Retire the slot instead of pooling a dead connection.
            state.total -= 1;
            drop(state);
            if let Err(err) = conn.close() {
                warn!(error = %err, "closing retired connection failed");
            }
        } else {
            state.idle.push(conn);
            drop(state);
        }
        self.available.notify_one();
    }

    /// 풀 해체: 유휴 커넥션을 모두 닫고, 이후의 획득을 거부합니다.
    /// 대출 중인 커넥션은 반납되는 시점에 닫힙니다. 멱등.
    pub fn dispose(&self) -> DalResult<()> {
        let drained = {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            state.total -= state.idle.len();
            std::mem::take(&mut state.idle)
        };
        for mut conn in drained {
            if let Err(err) = conn.close() {
                warn!(error = %err, "closing pooled connection failed during dispose");
            }
        }
        self.available.notify_all();
        Ok(())
    }
}

/// RAII guard over an acquired connection.
///
/// Derefs to [`Connection`]; returns the connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<ConnectionPool>,
    conn: Option<Box<dyn Connection>>,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn_present", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_deref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_deref_mut()
            .expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
