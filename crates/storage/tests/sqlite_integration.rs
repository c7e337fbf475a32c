use chrono::NaiveDate;
use storage::repository::{SessionRepository, StorageError};
use storage::sqlite::SqliteRepository;
use study_core::model::{NewSession, SessionId};
use study_core::schedule::{IntervalPolicy, SpacingSchedule};
use study_core::time::fixed_today;

fn new_session(topic: &str, studied: NaiveDate) -> NewSession {
    let dates = SpacingSchedule::dense().review_dates(studied).unwrap();
    NewSession::new(topic, studied, dates).unwrap()
}

async fn repo(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_persists_sessions_in_order() {
    let repo = repo("memdb_roundtrip").await;

    let first = repo
        .append(new_session("Ownership", fixed_today()))
        .await
        .unwrap();
    let second = repo
        .append(new_session("Lifetimes", fixed_today().succ_opt().unwrap()))
        .await
        .unwrap();
    assert!(second.id() > first.id());

    let all = repo.load_all().await.unwrap();
    assert_eq!(all, vec![first.clone(), second]);
    assert_eq!(all[0].review_count(), 27);

    let fetched = repo.get(first.id()).await.unwrap().unwrap();
    assert_eq!(fetched, first);
}

#[tokio::test]
async fn sqlite_increment_updates_only_target() {
    let repo = repo("memdb_increment").await;
    let a = repo.append(new_session("A", fixed_today())).await.unwrap();
    let b = repo.append(new_session("B", fixed_today())).await.unwrap();

    for _ in 0..3 {
        repo.increment_completion(a.id()).await.unwrap();
    }

    assert_eq!(repo.get(a.id()).await.unwrap().unwrap().completed_reviews(), 3);
    assert_eq!(repo.get(b.id()).await.unwrap().unwrap().completed_reviews(), 0);

    let err = repo
        .increment_completion(SessionId::new(10_000))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_empty_store_and_repeat_migrations() {
    let repo = repo("memdb_empty").await;
    repo.migrate().await.expect("second migrate is a no-op");

    assert!(repo.load_all().await.unwrap().is_empty());
    assert!(repo.get(SessionId::new(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_file_store_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("study.sqlite3").display());

    let stored = {
        let repo = SqliteRepository::connect(&url).await.unwrap();
        repo.migrate().await.unwrap();
        let stored = repo.append(new_session("Traits", fixed_today())).await.unwrap();
        repo.increment_completion(stored.id()).await.unwrap();
        repo.pool().close().await;
        stored
    };

    let repo = SqliteRepository::connect(&url).await.unwrap();
    repo.migrate().await.unwrap();
    let all = repo.load_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id(), stored.id());
    assert_eq!(all[0].review_dates(), stored.review_dates());
    assert_eq!(all[0].completed_reviews(), 1);
}

#[tokio::test]
async fn sqlite_append_rejects_a_different_review_count() {
    let repo = repo("memdb_layout").await;
    repo.append(new_session("Dense", fixed_today())).await.unwrap();

    let studied = fixed_today();
    let sparse = NewSession::new(
        "Sparse",
        studied,
        SpacingSchedule::sparse().review_dates(studied).unwrap(),
    )
    .unwrap();
    let err = repo.append(sparse).await.unwrap_err();

    assert!(matches!(err, StorageError::Schema(_)));
    assert_eq!(repo.load_all().await.unwrap().len(), 1);
}
