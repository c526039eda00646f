// CRUD Integration Tests
//
// 종단 간 통합 테스트: Database facade → Pool → memory 어댑터 경로로
// 전체 CRUD 계약을 검증합니다. 단위 테스트가 각 컴포넌트를 고립해서
// 다루는 것과 달리, 여기서는 URL open부터 close까지 실제 사용 흐름을
// 그대로 따라갑니다.

use unidal_core::error::{DalError, DalResult};
use unidal_core::record;
use unidal_core::row::Record;
use unidal_core::{Database, FindOptions};

use serde_json::Value;

// ─── Helpers ────────────────────────────────────────────

fn open_db() -> DalResult<Database> {
    // 각 Database는 자신만의 memory 스토어를 가지므로 테스트끼리
    // 간섭하지 않습니다.
    Database::open("memory://localhost/appdb")
}

fn seed_users(db: &Database, n: i64) -> DalResult<u64> {
    let records: Vec<Record> = (1..=n)
        .map(|i| record!({"id": i, "name": format!("user-{i}")}))
        .collect();
    db.insertmany("users", &records)
}

// ═══════════════════════════════════════════════════════════
// 기본 CRUD 흐름
// ═══════════════════════════════════════════════════════════

/// 테스트 1: insert → findone → upsert → count 전체 흐름
#[test]
fn test_full_crud_scenario() -> DalResult<()> {
    let db = open_db()?;

    let created = db.insertmany(
        "users",
        &[
            record!({"id": 1, "txt": "a"}),
            record!({"id": 2, "txt": "b"}),
        ],
    )?;
    assert_eq!(created, 2);

    let row = db.findone("users", &record!({"id": 1}))?;
    let row = row.ok_or_else(|| DalError::NotFound {
        target: "users".into(),
    })?;
    assert_eq!(row.get("txt")?.as_str(), Some("a"));

    // id=2는 갱신, id=3은 삽입으로 분류되어야 함
    let (updated, inserted) = db.upsertmany(
        "users",
        &[
            record!({"id": 2, "txt": "b2"}),
            record!({"id": 3, "txt": "c"}),
        ],
        &["id"],
    )?;
    assert_eq!((updated, inserted), (1, 1));
    assert_eq!(db.count("users", &Record::new())?, 3);

    let row = db.findone("users", &record!({"id": 2}))?.unwrap();
    assert_eq!(row.get_or("txt", &Value::Null), &Value::from("b2"));

    db.close()?;
    println!("✅ test_full_crud_scenario");
    Ok(())
}

/// 테스트 2: update는 일치 행에 필드를 병합하고 영향 수를 돌려줌
#[test]
fn test_update_merges_and_counts() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 3)?;

    let affected = db.updateone("users", &record!({"id": 2, "role": "admin"}), &["id"])?;
    assert_eq!(affected, 1);

    // 병합이므로 기존 name 필드는 남아 있어야 함
    let row = db.findone("users", &record!({"id": 2}))?.unwrap();
    assert_eq!(row.get("name")?.as_str(), Some("user-2"));
    assert_eq!(row.get("role")?.as_str(), Some("admin"));

    // 일치 없음 → 0, 에러 아님
    let affected = db.updateone("users", &record!({"id": 99, "role": "x"}), &["id"])?;
    assert_eq!(affected, 0);
    Ok(())
}

/// 테스트 3: delete는 일치 0건이어도 Ok(0)
#[test]
fn test_delete_semantics() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 3)?;

    assert_eq!(db.deleteone("users", &record!({"id": 2}), &["id"])?, 1);
    assert_eq!(db.count("users", &Record::new())?, 2);

    assert_eq!(db.deleteone("users", &record!({"id": 2}), &["id"])?, 0);
    assert_eq!(db.deleteone("ghosts", &record!({"id": 1}), &["id"])?, 0);
    Ok(())
}

/// 테스트 4: 중복 id 삽입은 건너뛰고 실제 생성 수만 돌려줌
#[test]
fn test_insert_conflict_is_skipped() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 2)?;

    let created = db.insertmany(
        "users",
        &[
            record!({"id": 2, "name": "dup"}),
            record!({"id": 3, "name": "user-3"}),
        ],
    )?;
    assert_eq!(created, 1, "중복 1건은 건너뛰어야 함");
    assert_eq!(db.count("users", &Record::new())?, 3);

    // 기존 행은 그대로
    let row = db.findone("users", &record!({"id": 2}))?.unwrap();
    assert_eq!(row.get("name")?.as_str(), Some("user-2"));
    Ok(())
}

/// 테스트 5: findone은 다건 일치를 에러로 보고
#[test]
fn test_findone_rejects_multiple_matches() -> DalResult<()> {
    let db = open_db()?;
    db.insertmany(
        "logs",
        &[
            record!({"id": 1, "kind": "warn"}),
            record!({"id": 2, "kind": "warn"}),
        ],
    )?;

    let err = db.findone("logs", &record!({"kind": "warn"})).unwrap_err();
    assert!(matches!(err, DalError::MultipleRecordsFound { .. }));

    // 0건 일치는 에러가 아니라 None
    assert!(db.findone("logs", &record!({"kind": "fatal"}))?.is_none());
    Ok(())
}

/// 테스트 6: 빈 keyflds는 쓰기 연산 전에 거부됨
#[test]
fn test_empty_keyflds_rejected() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 1)?;

    for err in [
        db.updateone("users", &record!({"id": 1}), &[]).unwrap_err(),
        db.upsertone("users", &record!({"id": 1}), &[]).unwrap_err(),
        db.deleteone("users", &record!({"id": 1}), &[]).unwrap_err(),
    ] {
        assert!(matches!(err, DalError::Precondition(_)));
    }
    // 아무것도 손대지 않았어야 함
    assert_eq!(db.count("users", &Record::new())?, 1);
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// 컬렉션 소비와 페이지네이션
// ═══════════════════════════════════════════════════════════

/// 테스트 7: findmany는 지연 컬렉션을 돌려주고, 소비 방식이 결과를 바꾸지 않음
#[test]
fn test_lazy_collection_through_facade() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 5)?;

    let mut rows = db.findmany("users", &Record::new(), &FindOptions::new())?;
    assert!(rows.pending(), "소비 전에는 커서가 남아 있어야 함");

    let first = rows.next_row()?.unwrap();
    assert_eq!(first.get("id")?, &Value::from(1));

    // all()은 이미 소비한 행을 다시 당기지 않고 캐시에서 재생
    let all = rows.all()?;
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].get("id")?, &Value::from(1));
    assert!(!rows.pending());

    // fetch_all이면 반환 시점에 이미 구체화됨
    let rows = db.findmany(
        "users",
        &Record::new(),
        &FindOptions::new().with_fetch_all(true),
    )?;
    assert!(!rows.pending());
    assert_eq!(rows.len(), 5);
    Ok(())
}

/// 테스트 8: page/page_size 페이지네이션 (from = page * size)
#[test]
fn test_pagination() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 25)?;

    let page = |n: u64| -> DalResult<Vec<i64>> {
        let mut rows = db.findmany(
            "users",
            &Record::new(),
            &FindOptions::new().with_page(n, 10),
        )?;
        let ids = rows
            .all()?
            .iter()
            .map(|r| r.get("id").map(|v| v.as_i64().unwrap_or(-1)))
            .collect::<DalResult<Vec<_>>>()?;
        Ok(ids)
    };

    assert_eq!(page(0)?, (1..=10).collect::<Vec<_>>());
    assert_eq!(page(1)?, (11..=20).collect::<Vec<_>>());
    assert_eq!(page(2)?, (21..=25).collect::<Vec<_>>());
    assert!(page(3)?.is_empty());
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// 스키마 조회와 세션 수명
// ═══════════════════════════════════════════════════════════

/// 테스트 9: table_names는 데이터가 닿은 타깃을 정렬해서 돌려줌
#[test]
fn test_table_names() -> DalResult<()> {
    let db = open_db()?;
    assert!(db.table_names()?.is_empty());

    db.insertone("zebra", &record!({"id": 1}))?;
    db.insertone("alpha", &record!({"id": 1}))?;
    assert_eq!(db.table_names()?, vec!["alpha", "zebra"]);
    Ok(())
}

/// 테스트 10: exists — 타깃 존재와 id 존재
#[test]
fn test_exists() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 2)?;

    assert!(db.exists("users", None)?);
    assert!(!db.exists("ghosts", None)?);
    assert!(db.exists("users", Some(&Value::from(2)))?);
    assert!(!db.exists("users", Some(&Value::from(9)))?);
    Ok(())
}

/// 테스트 11: close 이후의 연산은 DatabaseClosed, close는 멱등
#[test]
fn test_close_is_terminal_and_idempotent() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 1)?;

    db.close()?;
    db.close()?;

    let err = db.count("users", &Record::new()).unwrap_err();
    assert!(matches!(
        err,
        DalError::DatabaseClosed | DalError::ConnectionClosed
    ));
    Ok(())
}

/// 테스트 12: pool_size/connect_timeout URL 속성이 풀 구성에 반영됨
#[test]
fn test_pool_props_from_url() -> DalResult<()> {
    let db = Database::open("memory://localhost/appdb?pool_size=2&connect_timeout=1")?;
    assert_eq!(db.pool().capacity(), 2);

    // 기본값은 5
    let db2 = open_db()?;
    assert_eq!(db2.pool().capacity(), 5);
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// 트랜잭션
// ═══════════════════════════════════════════════════════════

/// 테스트 13: with_transaction — Ok면 커밋, Err면 롤백
#[test]
fn test_with_transaction_commit_and_rollback() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 1)?;

    db.with_transaction(|tx| {
        tx.insert("users", &[record!({"id": 2, "name": "user-2"})])?;
        tx.update("users", &[record!({"id": 1, "name": "renamed"})], &["id"])
    })?;
    assert_eq!(db.count("users", &Record::new())?, 2);
    let row = db.findone("users", &record!({"id": 1}))?.unwrap();
    assert_eq!(row.get("name")?.as_str(), Some("renamed"));

    // 실패하는 클로저: 변경은 되돌려지고 원래 에러가 그대로 전달됨
    let err = db
        .with_transaction(|tx| {
            tx.insert("users", &[record!({"id": 3, "name": "user-3"})])?;
            Err::<u64, _>(DalError::Precondition("boom".into()))
        })
        .unwrap_err();
    assert!(matches!(err, DalError::Precondition(_)));
    assert_eq!(db.count("users", &Record::new())?, 2);
    Ok(())
}

/// 테스트 14: 명시적 Transaction — rollback과 암묵적 drop-rollback
#[test]
fn test_explicit_transaction_rollback() -> DalResult<()> {
    let db = open_db()?;
    seed_users(&db, 1)?;

    let mut tx = db.transaction()?;
    tx.insert("users", &[record!({"id": 2, "name": "user-2"})])?;
    assert_eq!(tx.count("users", &Record::new())?, 2, "트랜잭션 안에서는 보여야 함");
    tx.rollback()?;
    assert_eq!(db.count("users", &Record::new())?, 1);

    // drop은 암묵적 rollback
    {
        let mut tx = db.transaction()?;
        tx.delete("users", &[record!({"id": 1})], &["id"])?;
    }
    assert_eq!(db.count("users", &Record::new())?, 1);
    Ok(())
}

/// 테스트 15: 트랜잭션 커밋 후 같은 풀 커넥션으로 후속 연산 가능
#[test]
fn test_transaction_then_oneshot_on_small_pool() -> DalResult<()> {
    // 풀 용량 1: 트랜잭션이 커넥션을 돌려주지 않으면 이후 연산이 타임아웃
    let db = Database::open("memory://localhost/appdb?pool_size=1&connect_timeout=1")?;

    let mut tx = db.transaction()?;
    tx.insert("jobs", &[record!({"id": 1, "state": "queued"})])?;
    tx.commit()?;

    assert_eq!(db.count("jobs", &Record::new())?, 1);
    Ok(())
}
