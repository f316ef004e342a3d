pub mod books;

use std::sync::Arc;

use biblio_authz::TokenAuthenticator;
use biblio_db::Db;
use biblio_kernel::ModuleRegistry;

/// Register every application module with the registry.
pub fn register_all(registry: &mut ModuleRegistry, pool: &Db, auth: &Arc<TokenAuthenticator>) {
    registry.register(Arc::new(books::BooksModule::new(pool.clone(), auth.clone())));
}
