use courier_tracking::ingest_coordinator::IngestCoordinator;

pub struct AppState {
    pub coordinator: IngestCoordinator,
}
