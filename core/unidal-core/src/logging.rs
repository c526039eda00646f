//! Tracing subscriber 초기화 헬퍼 (`logging` feature)
//!
//! 라이브러리 자체는 `tracing` 이벤트만 발행합니다. 구독자 설정은
//! 보통 호스트 애플리케이션의 몫이지만, 짧은 도구나 테스트에서 쓸 수
//! 있는 기본 구성을 여기서 제공합니다. feature가 꺼져 있으면 모두
//! no-op입니다.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// `RUST_LOG`가 없을 때 적용되는 기본 필터: 자기 크레이트만 info.
#[cfg(feature = "logging")]
const DEFAULT_FILTER: &str = "unidal_core=info";

/// 기본 구성으로 전역 구독자를 설치합니다.
///
/// `RUST_LOG` 환경 변수가 있으면 그 필터를 따르고, 없으면
/// `unidal_core=info`만 출력합니다.
///
/// ```rust
/// unidal_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_filter(DEFAULT_FILTER)
}

/// 명시적 필터 지시어로 전역 구독자를 설치합니다.
///
/// `directives`는 `EnvFilter` 문법 전체를 받습니다 — 단순 레벨
/// (`"debug"`)도, 타깃별 지시어(`"unidal_core::pool=trace"`)도
/// 가능합니다.
#[cfg(feature = "logging")]
pub fn init_with_filter(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    fmt().compact().with_env_filter(filter).init();
}

/// 테스트용 구독자: 캡처되는 writer로 debug 레벨을 출력합니다.
/// 이미 구독자가 설치돼 있으면 조용히 물러납니다.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .compact()
        .with_env_filter(EnvFilter::new("unidal_core=debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_filter(_directives: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
