pub mod models;
pub mod query;
pub mod resource;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;

use biblio_authz::{require_scope, TokenAuthenticator};
use biblio_db::Db;
use biblio_http::{
    error::AppError,
    extract::{Authenticated, Payload},
    pagination::{Page, PageLinks},
};
use biblio_kernel::{InitCtx, Migration, Module};

use models::{validate_create, validate_update, BookPayload};
use query::ListParams;
use resource::BookResource;
use store::{BookStore, SqliteBookStore, TypeLookup};

/// Scope required to create books; update and delete only need a valid token.
pub const SCOPE_CREATE_BOOKS: &str = "create-books";

#[derive(Clone)]
pub struct BooksState {
    store: Arc<dyn BookStore>,
    types: Arc<dyn TypeLookup>,
    auth: Arc<TokenAuthenticator>,
}

/// Books module: CRUD over the `books` table with a `types` lookup.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(pool: Db, auth: Arc<TokenAuthenticator>) -> Self {
        let store = Arc::new(SqliteBookStore::new(pool));
        Self {
            state: BooksState {
                store: store.clone(),
                types: store,
                auth,
            },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route(
                "/{id}",
                get(show_book).patch(update_book).delete(delete_book),
            )
            .layer(Extension(self.state.auth.clone()))
            .with_state(self.state.clone())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_schema",
                up: r#"
                CREATE TABLE IF NOT EXISTS types (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS books (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    type_id INTEGER NOT NULL REFERENCES types (id),
                    name TEXT NOT NULL,
                    writer TEXT NOT NULL,
                    publishdate TEXT,
                    summary TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );
                CREATE INDEX IF NOT EXISTS books_type_id ON books (type_id);
                "#,
            },
            Migration {
                id: "002_seed_types",
                up: "INSERT INTO types (name) VALUES \
                     ('Fiction'), ('Non-fiction'), ('Fantasy'), ('Science'), ('History');",
            },
        ]
    }
}

#[derive(Debug, Serialize)]
struct ListEnvelope {
    data: Page<BookResource>,
}

/// GET / — list books with optional filter/sort mini-languages and paging.
async fn list_books(
    State(state): State<BooksState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListParams>,
) -> Result<Json<ListEnvelope>, AppError> {
    let list_query = query::parse(&params)?;

    let (rows, total) = state.store.fetch_page(&list_query).await?;
    let books = rows
        .into_iter()
        .map(BookResource::project)
        .collect::<Result<Vec<_>, _>>()?;

    let echoed: Vec<(String, String)> = raw_query
        .as_deref()
        .and_then(|raw| serde_urlencoded::from_str(raw).ok())
        .unwrap_or_default();
    let links = PageLinks::new("/books").params(echoed);

    let page = Page::new(books, list_query.page, list_query.limit, total, &links);
    Ok(Json(ListEnvelope { data: page }))
}

/// POST / — create a book. Requires the `create-books` scope.
async fn create_book(
    State(state): State<BooksState>,
    Authenticated(caller): Authenticated,
    Payload(payload): Payload<BookPayload>,
) -> Result<(StatusCode, Json<BookResource>), AppError> {
    require_scope(&caller, SCOPE_CREATE_BOOKS)?;

    let book = validate_create(payload, state.types.as_ref()).await?;
    let row = state.store.insert(&book).await?;

    tracing::info!(book = row.id, subject = %caller.subject, "book created");
    Ok((StatusCode::CREATED, Json(BookResource::project(row)?)))
}

/// GET /{id} — fetch a single book.
async fn show_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<BookResource>, AppError> {
    let row = state
        .store
        .fetch_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))?;

    Ok(Json(BookResource::project(row)?))
}

/// PATCH /{id} — partial update; `type_id` stays required.
async fn update_book(
    State(state): State<BooksState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i64>,
    Payload(payload): Payload<BookPayload>,
) -> Result<Json<BookResource>, AppError> {
    // Unknown id is 404 before any validation detail leaks.
    if !state.store.exists(id).await? {
        return Err(AppError::not_found(format!("book {id} not found")));
    }

    let patch = validate_update(payload, state.types.as_ref()).await?;
    let row = state
        .store
        .update(id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))?;

    tracing::info!(book = id, subject = %caller.subject, "book updated");
    Ok(Json(BookResource::project(row)?))
}

/// DELETE /{id} — hard delete.
async fn delete_book(
    State(state): State<BooksState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete(id).await? {
        return Err(AppError::not_found(format!("book {id} not found")));
    }

    tracing::info!(book = id, subject = %caller.subject, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}
