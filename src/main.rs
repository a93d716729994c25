use anyhow::Context;
use bookshelf_app::modules;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.storage.backend,
        table = %settings.storage.table,
        bucket = %settings.storage.bucket,
        "bookshelf bootstrap starting"
    );

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings).await;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!("bookshelf bootstrap complete");
    let served = bookshelf_http::serve(&registry, &settings).await;

    registry.stop_modules().await?;
    served
}
