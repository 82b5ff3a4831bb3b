mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::database::{motif_values, open_file_db, seed_motifs, setup_test_db, teardown_test_db};
use motif_reducer::adapters::sqlite::{SqliteIterationLedger, SqliteMotifStore};
use motif_reducer::domain::models::{RoundPhase, StopReason, TerminalStatus};
use motif_reducer::domain::ports::IterationLedger;
use motif_reducer::services::{
    ConvergenceEngine, EngineConfig, RecordingObserver, RunController, SampleLoader,
};
use sqlx::SqlitePool;

const PI_DIGITS: &str = "3.14159265358979323846264338327950288419716939937510\
58209749445923078164062862089986280348253421170679\
82148086513282306647093844609550582231725359408128";

fn controller(pool: &SqlitePool, config: EngineConfig) -> RunController<SqliteMotifStore, SqliteIterationLedger> {
    let engine = ConvergenceEngine::new(
        Arc::new(SqliteMotifStore::new(pool.clone())),
        Arc::new(SqliteIterationLedger::new(pool.clone())),
        config,
    );
    RunController::new(engine, Duration::from_millis(10))
}

async fn distinct_values(pool: &SqlitePool) -> (i64, i64) {
    sqlx::query_as("SELECT COUNT(DISTINCT value), COUNT(*) FROM motifs")
        .fetch_one(pool)
        .await
        .expect("failed to count motifs")
}

#[tokio::test]
async fn test_loaded_pi_sample_converges_to_distinct_values() {
    let pool = setup_test_db().await;
    let store = Arc::new(SqliteMotifStore::new(pool.clone()));
    let loader = SampleLoader::new(Arc::clone(&store), 2, 16).unwrap();
    let report = loader.load_digits(PI_DIGITS).await.unwrap();
    assert_eq!(report.motifs, 75);
    assert_eq!(report.discarded_tail, 0);

    let controller = controller(&pool, EngineConfig::default());
    let observer = Arc::new(RecordingObserver::accepting());
    let outcome = controller.start_run(false, observer.clone()).wait().await;

    assert_eq!(outcome.status, TerminalStatus::Finished);
    assert_eq!(outcome.summary.unwrap().stop_reason, StopReason::Converged);
    assert_eq!(observer.terminals().len(), 1);

    let (distinct, total) = distinct_values(&pool).await;
    assert_eq!(distinct, total);
    assert_eq!(total, 75);

    let rounds = controller.engine().ledger().list().await.unwrap();
    assert!(rounds.len() >= 2);
    assert_eq!(rounds[0].remaining_rate, Some(100.0));
    assert!(rounds.iter().all(|r| r.phase == RoundPhase::Complete));
    assert!(rounds.last().unwrap().is_fixed_point());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_resume_after_reopening_database_matches_uninterrupted_run() {
    let sample = [7, 7, 7, 8, 9, 7, 12, 9, 3, 3];

    let reference_pool = setup_test_db().await;
    seed_motifs(&reference_pool, &sample).await;
    let outcome = controller(&reference_pool, EngineConfig::default())
        .start_run(false, Arc::new(RecordingObserver::accepting()))
        .wait()
        .await;
    assert_eq!(outcome.status, TerminalStatus::Finished);
    let expected_values = motif_values(&reference_pool).await;
    let expected_rounds = SqliteIterationLedger::new(reference_pool.clone()).list().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let pool = open_file_db(dir.path()).await;
    seed_motifs(&pool, &sample).await;
    let single_round = EngineConfig {
        single_round: true,
        ..EngineConfig::default()
    };
    let outcome = controller(&pool, single_round)
        .start_run(false, Arc::new(RecordingObserver::accepting()))
        .wait()
        .await;
    assert_eq!(outcome.summary.unwrap().stop_reason, StopReason::SingleRound);
    teardown_test_db(pool).await;

    let pool = open_file_db(dir.path()).await;
    let outcome = controller(&pool, EngineConfig::default())
        .start_run(false, Arc::new(RecordingObserver::accepting()))
        .wait()
        .await;
    assert_eq!(outcome.status, TerminalStatus::Finished);

    assert_eq!(motif_values(&pool).await, expected_values);
    let rounds = SqliteIterationLedger::new(pool.clone()).list().await.unwrap();
    assert_eq!(rounds.len(), expected_rounds.len());
    for (resumed, expected) in rounds.iter().zip(&expected_rounds) {
        assert_eq!(resumed.stats(), expected.stats());
        assert_eq!(resumed.remaining_rate, expected.remaining_rate);
        assert_eq!(resumed.repeating_rate, expected.repeating_rate);
    }

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_cancel_between_phases_then_resume_on_disk() {
    let sample = [5, 5, 6, 6, 6, 1];
    let dir = tempfile::tempdir().unwrap();
    let pool = open_file_db(dir.path()).await;
    seed_motifs(&pool, &sample).await;

    let engine = ConvergenceEngine::new(
        Arc::new(SqliteMotifStore::new(pool.clone())),
        Arc::new(SqliteIterationLedger::new(pool.clone())),
        EngineConfig::default(),
    );
    let control = motif_reducer::services::RunControl::new(Duration::from_millis(10));
    let observer = RecordingObserver::accepting().cancelling_after(RoundPhase::Measuring, control.clone());
    assert!(engine.run(&control, &observer).await.is_err());

    let pending = SqliteIterationLedger::new(pool.clone()).last_record().await.unwrap().unwrap();
    assert_eq!(pending.phase, RoundPhase::Rewriting);
    assert_eq!(pending.unique_repeating_count, Some(2));
    assert_eq!(motif_values(&pool).await, sample.to_vec());
    teardown_test_db(pool).await;

    let pool = open_file_db(dir.path()).await;
    let outcome = controller(&pool, EngineConfig::default())
        .start_run(false, Arc::new(RecordingObserver::accepting()))
        .wait()
        .await;
    assert_eq!(outcome.status, TerminalStatus::Finished);

    let first = SqliteIterationLedger::new(pool.clone()).get(0).await.unwrap().unwrap();
    assert_eq!(first.unique_repeating_count, Some(2));
    assert_eq!(first.all_repeating_count, Some(5));
    assert_eq!(first.max_occurrences, Some(3));
    assert_eq!(first.phase, RoundPhase::Complete);

    teardown_test_db(pool).await;
}
