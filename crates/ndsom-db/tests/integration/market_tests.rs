use chrono::{DateTime, Duration, TimeZone, Utc};
use ndsom_core::models::RawRecord;
use ndsom_core::{AppError, MarketCalendar, UpsertService};
use ndsom_db::MarketRepository;

use crate::integration::common::setup_test_db;

fn raw(security: &str, trades: &str, ltp: &str) -> RawRecord {
    [
        ("Security Description", security),
        ("Trades", trades),
        ("TTA", "25.5"),
        ("Open", "100.1"),
        ("High", "100.4"),
        ("Low", "99.8"),
        ("LTP", ltp),
        ("LTY", "7.12"),
    ]
    .into_iter()
    .collect()
}

/// 10:00 IST on a trading day.
fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 4, 4, 30, 0).unwrap()
}

fn service(repo: &MarketRepository) -> UpsertService<MarketRepository> {
    UpsertService::new(repo.clone(), MarketCalendar::ist())
}

#[tokio::test]
async fn first_scrape_of_day_inserts_rows() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);

    let summary = service(&repo)
        .upsert_at(
            &[raw("7.26% GS 2033", "120", "100.2"), raw("7.18% GS 2037", "45", "99.9")],
            morning(),
        )
        .await
        .unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.updated, 0);

    let history = repo.history("7.26% GS 2033").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].trades, 120);
    assert_eq!(history[0].ltp, 100.2);
    assert_eq!(history[0].timestamp, morning());
}

#[tokio::test]
async fn rerun_with_identical_data_changes_nothing() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);
    let svc = service(&repo);
    let batch = [raw("A", "1", "100.2"), raw("B", "2", "101.5")];

    svc.upsert_at(&batch, morning()).await.unwrap();
    let summary = svc
        .upsert_at(&batch, morning() + Duration::hours(3))
        .await
        .unwrap();

    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 2);
    let history = repo.history("A").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].timestamp, morning());
}

#[tokio::test]
async fn same_day_change_overwrites_row() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);
    let svc = service(&repo);

    svc.upsert_at(&[raw("A", "1", "100.2")], morning()).await.unwrap();
    let first_id = repo.history("A").await.unwrap()[0].id;

    let later = morning() + Duration::hours(4);
    let summary = svc.upsert_at(&[raw("A", "9", "100.7")], later).await.unwrap();

    assert_eq!(summary.updated, 1);
    let history = repo.history("A").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, first_id);
    assert_eq!(history[0].trades, 9);
    assert_eq!(history[0].ltp, 100.7);
    assert_eq!(history[0].timestamp, later);
}

#[tokio::test]
async fn next_day_appends_row() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);
    let svc = service(&repo);

    svc.upsert_at(&[raw("A", "1", "100.2")], morning()).await.unwrap();
    let tomorrow = morning() + Duration::days(1);
    let summary = svc.upsert_at(&[raw("A", "1", "100.2")], tomorrow).await.unwrap();

    assert_eq!(summary.inserted, 1);
    let history = repo.history("A").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].timestamp, morning());
    assert_eq!(history[1].timestamp, tomorrow);
}

#[tokio::test]
async fn failed_batch_rolls_back_updates() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool.clone());
    let svc = service(&repo);

    svc.upsert_at(&[raw("A", "1", "100.2")], morning()).await.unwrap();

    // Make the insert of one row fail after the update of another has run.
    sqlx::query(
        "CREATE FUNCTION reject_boom() RETURNS trigger AS $$ \
         BEGIN \
           IF NEW.security_desc = 'BOOM' THEN RAISE EXCEPTION 'rejected %', NEW.security_desc; END IF; \
           RETURN NEW; \
         END $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON regular_market \
         FOR EACH ROW EXECUTE FUNCTION reject_boom()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = svc
        .upsert_at(
            &[raw("A", "50", "101.0"), raw("BOOM", "1", "100.0")],
            morning() + Duration::hours(1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PersistenceError(_)), "{err:?}");
    let history = repo.history("A").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].trades, 1);
    assert_eq!(history[0].timestamp, morning());
    assert!(repo.history("BOOM").await.unwrap().is_empty());
}

#[tokio::test]
async fn overlong_security_is_skipped_and_rest_committed() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);

    let too_long = "X".repeat(300);
    let summary = service(&repo)
        .upsert_at(&[raw("A", "5", "100.2"), raw(&too_long, "1", "100.0")], morning())
        .await
        .unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(repo.security_descriptions().await.unwrap(), vec!["A"]);
}

#[tokio::test]
async fn security_descriptions_are_distinct_and_sorted() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);
    let svc = service(&repo);

    svc.upsert_at(&[raw("B", "1", "100.0"), raw("A", "1", "100.0")], morning())
        .await
        .unwrap();
    svc.upsert_at(&[raw("B", "2", "100.0")], morning() + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(repo.security_descriptions().await.unwrap(), vec!["A", "B"]);
}

#[tokio::test]
async fn unknown_security_has_empty_history() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);

    assert!(repo.history("nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn health_check_succeeds() {
    let (pool, _container) = setup_test_db().await;
    let repo = MarketRepository::new(pool);

    repo.health_check().await.unwrap();
}
