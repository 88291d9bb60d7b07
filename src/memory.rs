use crate::model::{
    Author, AuthorName, Book, BookTitle, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteAuthorError, DeleteBookError, FindAuthorError, FindBookError,
    ListAuthorsError, ListBooksError, UpdateAuthorError, UpdateAuthorRequest, UpdateBookError,
    UpdateBookRequest,
};
use crate::repository::{AuthorRepository, BookRepository};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process backend with the same semantics as [`crate::postgres::Postgres`],
/// including the referential-integrity guards. Each operation holds the table
/// lock for its whole duration, so it is atomic the way a single SQL
/// statement is.
///
/// Used as the repository double in handler tests; no database required.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    authors: HashMap<Uuid, AuthorRow>,
    books: HashMap<Uuid, BookRow>,
}

#[derive(Debug, Clone)]
struct AuthorRow {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Clone)]
struct BookRow {
    author_id: Uuid,
    title: String,
    publish_date: NaiveDate,
}

impl InMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn book_count(&self, author_id: Uuid) -> i64 {
        let count = self
            .books
            .values()
            .filter(|b| b.author_id == author_id)
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }

    fn author(&self, id: Uuid, row: &AuthorRow) -> Author {
        Author::new(
            id,
            AuthorName::new_unchecked(&row.first_name),
            AuthorName::new_unchecked(&row.last_name),
            self.book_count(id),
        )
    }
}

#[async_trait]
impl AuthorRepository for InMemory {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Uuid, CreateAuthorError> {
        let id = Uuid::new_v4();
        let mut tables = self.tables.write().await;
        tables.authors.insert(
            id,
            AuthorRow {
                first_name: req.first_name().to_string(),
                last_name: req.last_name().to_string(),
            },
        );
        Ok(id)
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<(), UpdateAuthorError> {
        let mut tables = self.tables.write().await;
        match tables.authors.get_mut(&req.id()) {
            Some(row) => {
                row.first_name = req.first_name().to_string();
                row.last_name = req.last_name().to_string();
                Ok(())
            }
            None => Err(UpdateAuthorError::NotFound { id: req.id() }),
        }
    }

    async fn author_by_id(&self, id: Uuid) -> Result<Author, FindAuthorError> {
        let tables = self.tables.read().await;
        tables
            .authors
            .get(&id)
            .map(|row| tables.author(id, row))
            .ok_or(FindAuthorError::NotFound { id })
    }

    async fn author_by_name(
        &self,
        first_name: &AuthorName,
        last_name: &AuthorName,
    ) -> Result<Author, FindAuthorError> {
        let tables = self.tables.read().await;
        tables
            .authors
            .iter()
            .filter(|(_, row)| {
                row.first_name == first_name.as_str() && row.last_name == last_name.as_str()
            })
            .min_by_key(|(id, _)| **id)
            .map(|(id, row)| tables.author(*id, row))
            .ok_or_else(|| FindAuthorError::NameNotFound {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
    }

    async fn all_authors(&self) -> Result<Vec<Author>, ListAuthorsError> {
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .iter()
            .map(|(id, row)| tables.author(*id, row))
            .collect())
    }

    async fn delete_author(&self, id: Uuid) -> Result<(), DeleteAuthorError> {
        let mut tables = self.tables.write().await;
        if !tables.authors.contains_key(&id) {
            return Err(DeleteAuthorError::NotFound { id });
        }
        if tables.book_count(id) > 0 {
            return Err(DeleteAuthorError::HasBooks { id });
        }
        tables.authors.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BookRepository for InMemory {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Uuid, CreateBookError> {
        let mut tables = self.tables.write().await;
        if !tables.authors.contains_key(&req.author_id()) {
            return Err(CreateBookError::AuthorMissing {
                author_id: req.author_id(),
            });
        }
        let id = Uuid::new_v4();
        tables.books.insert(
            id,
            BookRow {
                author_id: req.author_id(),
                title: req.title().to_string(),
                publish_date: req.publish_date(),
            },
        );
        Ok(id)
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<(), UpdateBookError> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&req.id()) {
            return Err(UpdateBookError::NotFound { id: req.id() });
        }
        if !tables.authors.contains_key(&req.author_id()) {
            return Err(UpdateBookError::AuthorMissing {
                author_id: req.author_id(),
            });
        }
        if let Some(row) = tables.books.get_mut(&req.id()) {
            row.author_id = req.author_id();
            row.title = req.title().to_string();
            row.publish_date = req.publish_date();
        }
        Ok(())
    }

    async fn book_by_id(&self, id: Uuid) -> Result<Book, FindBookError> {
        let tables = self.tables.read().await;
        tables
            .books
            .get(&id)
            .map(|row| {
                Book::new(
                    id,
                    row.author_id,
                    BookTitle::new_unchecked(&row.title),
                    row.publish_date,
                )
            })
            .ok_or(FindBookError::NotFound { id })
    }

    async fn books_by_author(&self, author_id: Uuid) -> Result<Vec<Book>, ListBooksError> {
        let tables = self.tables.read().await;
        Ok(tables
            .books
            .iter()
            .filter(|(_, row)| row.author_id == author_id)
            .map(|(id, row)| {
                Book::new(
                    *id,
                    row.author_id,
                    BookTitle::new_unchecked(&row.title),
                    row.publish_date,
                )
            })
            .collect())
    }

    async fn delete_book(&self, id: Uuid) -> Result<(), DeleteBookError> {
        let mut tables = self.tables.write().await;
        match tables.books.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DeleteBookError::NotFound { id }),
        }
    }
}
