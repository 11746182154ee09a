//! Repository tests against a real PostgreSQL database.
//!
//! `#[sqlx::test]` creates a fresh database per test and applies the crate's
//! migrations. `DATABASE_URL` must point at a PostgreSQL server.

use serde_json::json;
use sigflow_core::record::{AnalysisRecord, NewAnalysisRecord, RecordKind};
use sigflow_db::repositories::AnalysisRepo;
use sigflow_db::{AnalysisStore, PgAnalysisStore};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn insert_fft_returns_increasing_ids(pool: PgPool) {
    let first = AnalysisRepo::insert_fft(&pool, 44100.0, &json!([1, 2, 3]))
        .await
        .unwrap();
    let second = AnalysisRepo::insert_fft(&pool, 8000.0, &json!([4]))
        .await
        .unwrap();
    assert!(second > first, "ids must increase: {first} then {second}");
}

#[sqlx::test(migrations = "./migrations")]
async fn latest_analysis_is_highest_id(pool: PgPool) {
    AnalysisRepo::insert_analysis(&pool, &json!({"run": 1}))
        .await
        .unwrap();
    let last = AnalysisRepo::insert_analysis(&pool, &json!({"run": 2}))
        .await
        .unwrap();

    let row = AnalysisRepo::find_latest_analysis(&pool)
        .await
        .unwrap()
        .expect("a row");
    assert_eq!(row.id, last);
    assert_eq!(row.analysis_data, json!({"run": 2}));
}

#[sqlx::test(migrations = "./migrations")]
async fn latest_on_empty_table_is_none(pool: PgPool) {
    assert!(AnalysisRepo::find_latest_analysis(&pool)
        .await
        .unwrap()
        .is_none());
    assert!(AnalysisRepo::find_latest_fft(&pool).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn store_round_trips_fft_record(pool: PgPool) {
    let store = PgAnalysisStore::new(pool);
    store.health_check().await.unwrap();

    let id = store
        .insert(&NewAnalysisRecord::Fft {
            sampling_frequency: 22050.0,
            fft_data: json!([[0.0, 1.0]]),
        })
        .await
        .unwrap();

    let latest = store.fetch_latest(RecordKind::Fft).await.unwrap();
    assert_eq!(
        latest,
        Some(AnalysisRecord::Fft {
            id,
            sampling_frequency: 22050.0,
            fft_data: json!([[0.0, 1.0]]),
        })
    );
    assert_eq!(store.fetch_latest(RecordKind::Simple).await.unwrap(), None);
}
