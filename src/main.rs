use std::sync::Arc;

use anyhow::Context;

use biblio_authz::TokenAuthenticator;
use biblio_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load biblio settings")?;
    biblio_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "biblio bootstrap starting"
    );

    let pool = biblio_db::connect(&settings.database).await?;
    let auth = Arc::new(TokenAuthenticator::from_settings(&settings.auth));

    let mut registry = ModuleRegistry::new();
    biblio_app::modules::register_all(&mut registry, &pool, &auth);

    biblio_db::run_migrations(&pool, &registry).await?;
    registry
        .init_all(&InitCtx {
            settings: &settings,
        })
        .await?;

    tracing::info!("biblio bootstrap complete");

    biblio_http::start_server(&registry, &settings).await
}
