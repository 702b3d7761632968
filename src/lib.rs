pub mod modules;
mod schema;
pub mod shared;

use anyhow::Context;
use modules::{
    jobs::{register_jobs, JobDependencies},
    media::{HttpVisionClient, ImageRepository, ImageRepositoryImpl, MediaService, VisionClient},
    scheduler::{Scheduler, SchedulerConfig},
    storage::{HttpObjectStore, ObjectStore, UploadPool},
};
use shared::{utils::init_logger, AppConfig, Database};
use std::sync::Arc;

/// Process entry: wire the services, register the periodic jobs and run
/// until ctrl-c, then stop every job before returning.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let database = Arc::new(Database::new(&config.database_url).context("Failed to open database")?);
    database
        .run_migrations()
        .context("Failed to run database migrations")?;
    let pool = database.pool_status();
    log::info!(
        "Database pool ready: {}/{} connections ({} idle)",
        pool.connections,
        pool.max_size,
        pool.idle_connections
    );

    let image_repository: Arc<dyn ImageRepository> =
        Arc::new(ImageRepositoryImpl::new(Arc::clone(&database)));
    let vision_client: Arc<dyn VisionClient> = Arc::new(
        HttpVisionClient::new(&config.vision_endpoint).context("Failed to create vision client")?,
    );
    let media_service = Arc::new(MediaService::new(image_repository, vision_client));

    let object_store: Arc<dyn ObjectStore> = Arc::new(
        HttpObjectStore::new(&config.storage).context("Failed to create object store client")?,
    );
    let upload_pool = Arc::new(
        UploadPool::new(object_store, config.storage.upload_concurrency)
            .with_key_prefix(config.storage.key_prefix.clone()),
    );

    let scheduler = Scheduler::with_config(SchedulerConfig {
        run_timeout: config.jobs.run_timeout,
    });
    register_jobs(
        &scheduler,
        JobDependencies {
            media_service,
            upload_pool,
        },
        &config.jobs,
    )
    .await
    .context("Failed to register periodic jobs")?;

    log::info!(
        "media-pipeline started with {} jobs, waiting for ctrl-c",
        scheduler.task_names().await.len()
    );

    let signal = tokio::signal::ctrl_c().await;
    if let Err(e) = &signal {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }

    log::info!("Shutting down scheduler");
    scheduler.shutdown().await;
    log::info!("All jobs stopped");

    signal.context("Shutdown signal listener failed")
}
