use quiz_core::model::DatasetId;
use quiz_core::time::fixed_now;
use storage::repository::{ClientStateRepository, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrip_active_dataset() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_client_state?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.active_dataset().await.unwrap(), None);

    let id = DatasetId::parse("AI_prob.db").unwrap();
    repo.save_active_dataset(&id, fixed_now()).await.unwrap();
    assert_eq!(repo.active_dataset().await.unwrap(), Some(id));

    let other = DatasetId::parse("Python_prob.db").unwrap();
    repo.save_active_dataset(&other, fixed_now()).await.unwrap();
    assert_eq!(repo.active_dataset().await.unwrap(), Some(other));

    repo.clear_active_dataset().await.unwrap();
    assert_eq!(repo.active_dataset().await.unwrap(), None);
}

#[tokio::test]
async fn selection_survives_reconnect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("client.sqlite3");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let id = DatasetId::parse("setB.db").unwrap();

    {
        let storage = Storage::sqlite(&url).await.expect("open");
        storage
            .client_state
            .save_active_dataset(&id, fixed_now())
            .await
            .unwrap();
    }

    let reopened = Storage::sqlite(&url).await.expect("reopen");
    let restored = reopened.client_state.active_dataset().await.unwrap();
    assert_eq!(restored, Some(id));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}
