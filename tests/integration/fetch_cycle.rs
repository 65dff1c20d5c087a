//! End-to-end fetch-and-store cycles
//!
//! A mock bike-sharing API feeds the collector, which saves into a real
//! backend; the stored snapshots are then read back with `list()`.

use bikeshare_collector::actors::collector::{CollectorHandle, run_once};
use bikeshare_collector::storage::StationStore;
use bikeshare_collector::storage::file::FileStore;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use wiremock::MockServer;

use crate::helpers::*;

#[tokio::test]
async fn test_cycle_into_file_backend() {
    let server = MockServer::start().await;
    let trento = mount_city(&server, "trento", 6).await;
    let rovereto = mount_city(&server, "rovereto", 3).await;

    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("stations.json");

    let report = run_once(
        create_fetcher(vec![trento, rovereto]),
        Box::new(FileStore::new(&path).unwrap()),
    )
    .await
    .unwrap();
    assert_eq!(report.stations, 9);

    let stored = FileStore::new(&path).unwrap().list().await.unwrap();
    assert_eq!(stored.len(), 9);
    assert_eq!(stored.iter().filter(|s| s.city == "trento").count(), 6);
    assert_eq!(stored.iter().filter(|s| s.city == "rovereto").count(), 3);
    assert!(stored.iter().all(|s| s.retrieved_at == report.retrieved_at));
}

#[cfg(feature = "storage-sqlite")]
#[tokio::test]
async fn test_repeated_cycles_into_sqlite_backend() {
    use bikeshare_collector::storage::sqlite::SqliteStore;

    let server = MockServer::start().await;
    let trento = mount_city(&server, "trento", 4).await;

    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("stations.db");

    // Long interval: only the initial tick and explicit polls run
    let (handle, task) = CollectorHandle::spawn_with_task(
        create_fetcher(vec![trento]),
        Box::new(SqliteStore::new(&db_path).unwrap()),
        3600,
    );

    handle.poll_now().await.unwrap();
    handle.poll_now().await.unwrap();

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    let stored = SqliteStore::new(&db_path).unwrap().list().await.unwrap();
    assert_eq!(stored.len() % 4, 0, "batches are stored whole");
    assert!(stored.len() >= 8);
    assert_eq!(stored[0].station_id, "00");
    assert_eq!(stored[3].station_id, "03");
}

#[tokio::test]
async fn test_cycle_stores_parsed_fields() {
    let server = MockServer::start().await;
    let trento = mount_city(&server, "trento", 1).await;

    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("stations.json");

    run_once(
        create_fetcher(vec![trento]),
        Box::new(FileStore::new(&path).unwrap()),
    )
    .await
    .unwrap();

    let stored = FileStore::new(&path).unwrap().list().await.unwrap();
    let station = &stored[0];
    assert_eq!(station.station_id, "00");
    assert_eq!(station.name, "Station 0");
    assert_eq!(station.total_docks, 10);
    assert_eq!(station.available_bikes, 0);
    assert_eq!(station.available_docks, 10);
    assert_eq!(station.latitude, 46.0679);
    assert_eq!(station.longitude, 11.1211);
    assert_eq!(station.last_update, None);
}
