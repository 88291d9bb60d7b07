use crate::model::{
    Author, AuthorName, Book, BookTitle, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteAuthorError, DeleteBookError, FindAuthorError, FindBookError,
    ListAuthorsError, ListBooksError, UpdateAuthorError, UpdateAuthorRequest, UpdateBookError,
    UpdateBookRequest,
};
use crate::repository::{AuthorRepository, BookRepository};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!();

// The schema has no foreign key from books.author_id to authors.id; the
// writes below are what keeps the reference valid, and they all serialize on
// the referenced author row's lock. Book insert and update are single guarded
// statements whose `FOR UPDATE` subquery locks the author row, so the
// existence check and the write cannot be observed as separate steps. The
// author delete cannot be a single statement: under READ COMMITTED a
// `NOT EXISTS (... FOR UPDATE)` scan runs against the statement's snapshot,
// an uncommitted concurrent book insert is invisible to it and leaves no row
// to lock-and-recheck, and blocking on the author row alone does not force a
// re-evaluation. `delete_author` therefore locks the author row first and
// only then looks at books, inside one short transaction.

const GET_AUTHOR_BY_ID: &str = "
SELECT
  a.id, a.first_name, a.last_name,
  (SELECT COUNT(*) FROM books AS b WHERE b.author_id = a.id) AS book_count
FROM
  authors AS a
WHERE
  a.id = $1
";

const GET_AUTHOR_BY_NAME: &str = "
SELECT
  a.id, a.first_name, a.last_name,
  (SELECT COUNT(*) FROM books AS b WHERE b.author_id = a.id) AS book_count
FROM
  authors AS a
WHERE
  a.first_name = $1 AND a.last_name = $2
ORDER BY
  a.id
LIMIT 1
";

const GET_ALL_AUTHORS: &str = "
SELECT
  a.id, a.first_name, a.last_name, COALESCE(b.book_count, 0) AS book_count
FROM
  authors AS a
LEFT JOIN (
  SELECT author_id, COUNT(*) AS book_count FROM books GROUP BY author_id
) AS b
ON
  a.id = b.author_id
";

const INSERT_BOOK: &str = "
INSERT INTO
  books (id, author_id, title, publish_date)
SELECT
  $1, $2, $3, $4
WHERE
  EXISTS (
    SELECT 1 FROM authors AS a WHERE a.id = $2 FOR UPDATE
  )
";

const UPDATE_BOOK: &str = "
UPDATE
  books
SET
  author_id = $2,
  title = $3,
  publish_date = $4
WHERE
  id = $1 AND
  EXISTS (
    SELECT 1 FROM authors AS a WHERE a.id = $2 FOR UPDATE
  )
";

#[derive(Debug, Clone)]
pub struct Postgres {
    pool: PgPool,
}

impl Postgres {
    /// Connects to the database at `url` and applies pending migrations.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let opts = PgConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database url {url}"))?;
        let pool = PgPool::connect_with(opts)
            .await
            .with_context(|| format!("Failed to connect to database at {url}"))?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    /// Wraps an already-established pool; used by tests that manage their
    /// own database lifecycle.
    #[must_use]
    pub const fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn book_exists(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for Author {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let first_name: String = row.try_get("first_name")?;
        let last_name: String = row.try_get("last_name")?;
        let book_count = row.try_get("book_count")?;

        Ok(Self::new(
            id,
            AuthorName::new_unchecked(&first_name),
            AuthorName::new_unchecked(&last_name),
            book_count,
        ))
    }
}

impl<'r> FromRow<'r, PgRow> for Book {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let author_id = row.try_get("author_id")?;
        let title: String = row.try_get("title")?;
        let publish_date = row.try_get("publish_date")?;

        Ok(Self::new(
            id,
            author_id,
            BookTitle::new_unchecked(&title),
            publish_date,
        ))
    }
}

#[async_trait]
impl AuthorRepository for Postgres {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Uuid, CreateAuthorError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO authors (id, first_name, last_name) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(req.first_name().as_str())
            .bind(req.last_name().as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create author named "{} {}""#,
                    req.first_name(),
                    req.last_name()
                ));
                CreateAuthorError(err)
            })?;

        Ok(id)
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<(), UpdateAuthorError> {
        let result =
            sqlx::query("UPDATE authors SET first_name = $2, last_name = $3 WHERE id = $1")
                .bind(req.id())
                .bind(req.first_name().as_str())
                .bind(req.last_name().as_str())
                .execute(&self.pool)
                .await
                .map_err(|err| {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to update author with id "{}""#, req.id()));
                    UpdateAuthorError::Other(err)
                })?;

        if result.rows_affected() == 0 {
            return Err(UpdateAuthorError::NotFound { id: req.id() });
        }

        Ok(())
    }

    async fn author_by_id(&self, id: Uuid) -> Result<Author, FindAuthorError> {
        let author = sqlx::query_as(GET_AUTHOR_BY_ID)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NotFound { id }
                } else {
                    let err =
                        anyhow!(err).context(format!(r#"Failed to retrieve author with id "{id}""#));
                    FindAuthorError::Other(err)
                }
            })?;

        Ok(author)
    }

    async fn author_by_name(
        &self,
        first_name: &AuthorName,
        last_name: &AuthorName,
    ) -> Result<Author, FindAuthorError> {
        let author = sqlx::query_as(GET_AUTHOR_BY_NAME)
            .bind(first_name.as_str())
            .bind(last_name.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NameNotFound {
                        first_name: first_name.to_string(),
                        last_name: last_name.to_string(),
                    }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to retrieve author named "{first_name} {last_name}""#
                    ));
                    FindAuthorError::Other(err)
                }
            })?;

        Ok(author)
    }

    async fn all_authors(&self) -> Result<Vec<Author>, ListAuthorsError> {
        let authors = sqlx::query_as(GET_ALL_AUTHORS)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context("Failed to retrieve all authors");
                ListAuthorsError(err)
            })?;

        Ok(authors)
    }

    async fn delete_author(&self, id: Uuid) -> Result<(), DeleteAuthorError> {
        let wrap = |err: sqlx::Error| {
            DeleteAuthorError::Other(
                anyhow!(err).context(format!(r#"Failed to delete author with id "{id}""#)),
            )
        };

        let mut tx = self.pool.begin().await.map_err(wrap)?;

        // Lock the author row before looking at books. The book-insert and
        // book-update guards lock the same row, so any in-flight write
        // referencing this author commits or fails before the EXISTS check
        // below runs, and the check sees its row.
        let locked: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM authors WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(wrap)?;
        if locked.is_none() {
            return Err(DeleteAuthorError::NotFound { id });
        }

        let has_books: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE author_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(wrap)?;
        if has_books {
            return Err(DeleteAuthorError::HasBooks { id });
        }

        sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;

        tx.commit().await.map_err(wrap)?;

        Ok(())
    }
}

#[async_trait]
impl BookRepository for Postgres {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Uuid, CreateBookError> {
        let id = Uuid::new_v4();
        let result = sqlx::query(INSERT_BOOK)
            .bind(id)
            .bind(req.author_id())
            .bind(req.title().as_str())
            .bind(req.publish_date())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to create book titled "{}""#, req.title()));
                CreateBookError::Other(err)
            })?;

        if result.rows_affected() == 0 {
            return Err(CreateBookError::AuthorMissing {
                author_id: req.author_id(),
            });
        }

        Ok(id)
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<(), UpdateBookError> {
        let result = sqlx::query(UPDATE_BOOK)
            .bind(req.id())
            .bind(req.author_id())
            .bind(req.title().as_str())
            .bind(req.publish_date())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let err =
                    anyhow!(err).context(format!(r#"Failed to update book with id "{}""#, req.id()));
                UpdateBookError::Other(err)
            })?;

        if result.rows_affected() == 0 {
            let exists = self.book_exists(req.id()).await.map_err(|err| {
                let err =
                    anyhow!(err).context(format!(r#"Failed to update book with id "{}""#, req.id()));
                UpdateBookError::Other(err)
            })?;
            if exists {
                return Err(UpdateBookError::AuthorMissing {
                    author_id: req.author_id(),
                });
            }
            return Err(UpdateBookError::NotFound { id: req.id() });
        }

        Ok(())
    }

    async fn book_by_id(&self, id: Uuid) -> Result<Book, FindBookError> {
        let book =
            sqlx::query_as("SELECT id, author_id, title, publish_date FROM books WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|err| {
                    if matches!(err, sqlx::Error::RowNotFound) {
                        FindBookError::NotFound { id }
                    } else {
                        let err = anyhow!(err)
                            .context(format!(r#"Failed to retrieve book with id "{id}""#));
                        FindBookError::Other(err)
                    }
                })?;

        Ok(book)
    }

    async fn books_by_author(&self, author_id: Uuid) -> Result<Vec<Book>, ListBooksError> {
        let books = sqlx::query_as(
            "SELECT id, author_id, title, publish_date FROM books WHERE author_id = $1",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err).context(format!(
                r#"Failed to retrieve books for author with id "{author_id}""#
            ));
            ListBooksError(err)
        })?;

        Ok(books)
    }

    async fn delete_book(&self, id: Uuid) -> Result<(), DeleteBookError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context(format!(r#"Failed to delete book with id "{id}""#));
                DeleteBookError::Other(err)
            })?;

        if result.rows_affected() == 0 {
            return Err(DeleteBookError::NotFound { id });
        }

        Ok(())
    }
}
