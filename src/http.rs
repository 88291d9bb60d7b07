use crate::repository::{AuthorRepository, BookRepository};
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod handler;

#[derive(Debug)]
pub struct AppState<AR, BR> {
    pub author_repo: Arc<AR>,
    pub book_repo: Arc<BR>,
}

impl<AR, BR> AppState<AR, BR> {
    pub fn new(author_repo: AR, book_repo: BR) -> Self {
        Self {
            author_repo: Arc::new(author_repo),
            book_repo: Arc::new(book_repo),
        }
    }
}

impl<AR, BR> Clone for AppState<AR, BR> {
    fn clone(&self) -> Self {
        Self {
            author_repo: Arc::clone(&self.author_repo),
            book_repo: Arc::clone(&self.book_repo),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<AR: AuthorRepository, BR: BookRepository>(
        state: AppState<AR, BR>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

/// Builds the full application router; split out so handler tests can drive
/// it without binding a socket.
pub fn router<AR: AuthorRepository, BR: BookRepository>(state: AppState<AR, BR>) -> Router {
    Router::new()
        .nest("/v1alpha1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<AR: AuthorRepository, BR: BookRepository>() -> Router<AppState<AR, BR>> {
    Router::new()
        .route(
            "/author",
            post(handler::add_author::<AR, BR>)
                .put(handler::update_author::<AR, BR>)
                .get(handler::author_by_name::<AR, BR>),
        )
        .route("/authors", get(handler::all_authors::<AR, BR>))
        .route(
            "/authors/{id}",
            get(handler::author_by_id::<AR, BR>).delete(handler::delete_author::<AR, BR>),
        )
        .route(
            "/book",
            post(handler::add_book::<AR, BR>).put(handler::update_book::<AR, BR>),
        )
        .route("/books", get(handler::books_by_author::<AR, BR>))
        .route(
            "/books/{id}",
            get(handler::book_by_id::<AR, BR>).delete(handler::delete_book::<AR, BR>),
        )
}
