use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Forward-only SQL migration contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Core trait every biblio module implements.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module; routes are mounted under `/{name}`.
    fn name(&self) -> &'static str;

    /// Initialize the module after migrations have been applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Axum router for this module's routes.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Migrations contributed by this module, executed in the order returned.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }
}
