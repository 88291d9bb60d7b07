use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, AuthorNameEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(AuthorNameEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Author name cannot be empty")]
pub struct AuthorNameEmptyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTitle(String);

impl BookTitle {
    pub fn new(raw: &str) -> Result<Self, BookTitleEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(BookTitleEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Book title cannot be empty")]
pub struct BookTitleEmptyError;

/// An author row together with the live count of books referencing it.
///
/// `book_count` is derived at read time, never stored, so it cannot drift
/// from the books table.
#[derive(Debug, Clone)]
pub struct Author {
    id: Uuid,
    first_name: AuthorName,
    last_name: AuthorName,
    book_count: i64,
}

impl Author {
    #[must_use]
    pub const fn new(
        id: Uuid,
        first_name: AuthorName,
        last_name: AuthorName,
        book_count: i64,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            book_count,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn first_name(&self) -> &AuthorName {
        &self.first_name
    }

    #[must_use]
    pub const fn last_name(&self) -> &AuthorName {
        &self.last_name
    }

    #[must_use]
    pub const fn book_count(&self) -> i64 {
        self.book_count
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    id: Uuid,
    author_id: Uuid,
    title: BookTitle,
    publish_date: NaiveDate,
}

impl Book {
    #[must_use]
    pub const fn new(id: Uuid, author_id: Uuid, title: BookTitle, publish_date: NaiveDate) -> Self {
        Self {
            id,
            author_id,
            title,
            publish_date,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn author_id(&self) -> Uuid {
        self.author_id
    }

    #[must_use]
    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    #[must_use]
    pub const fn publish_date(&self) -> NaiveDate {
        self.publish_date
    }
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    first_name: AuthorName,
    last_name: AuthorName,
}

impl CreateAuthorRequest {
    #[must_use]
    pub const fn new(first_name: AuthorName, last_name: AuthorName) -> Self {
        Self {
            first_name,
            last_name,
        }
    }

    #[must_use]
    pub const fn first_name(&self) -> &AuthorName {
        &self.first_name
    }

    #[must_use]
    pub const fn last_name(&self) -> &AuthorName {
        &self.last_name
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct CreateAuthorError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: Uuid,
    first_name: AuthorName,
    last_name: AuthorName,
}

impl UpdateAuthorRequest {
    #[must_use]
    pub const fn new(id: Uuid, first_name: AuthorName, last_name: AuthorName) -> Self {
        Self {
            id,
            first_name,
            last_name,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn first_name(&self) -> &AuthorName {
        &self.first_name
    }

    #[must_use]
    pub const fn last_name(&self) -> &AuthorName {
        &self.last_name
    }
}

#[derive(Error, Debug)]
pub enum UpdateAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: Uuid },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: Uuid },
    #[error("Author named \"{first_name} {last_name}\" does not exist")]
    NameNotFound {
        first_name: String,
        last_name: String,
    },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ListAuthorsError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
pub enum DeleteAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: Uuid },
    #[error("Author with id \"{id}\" still has books")]
    HasBooks { id: Uuid },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct CreateBookRequest {
    title: BookTitle,
    author_id: Uuid,
    publish_date: NaiveDate,
}

impl CreateBookRequest {
    #[must_use]
    pub const fn new(title: BookTitle, author_id: Uuid, publish_date: NaiveDate) -> Self {
        Self {
            title,
            author_id,
            publish_date,
        }
    }

    #[must_use]
    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    #[must_use]
    pub const fn author_id(&self) -> Uuid {
        self.author_id
    }

    #[must_use]
    pub const fn publish_date(&self) -> NaiveDate {
        self.publish_date
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Author with id \"{author_id}\" does not exist")]
    AuthorMissing { author_id: Uuid },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct UpdateBookRequest {
    id: Uuid,
    title: BookTitle,
    author_id: Uuid,
    publish_date: NaiveDate,
}

impl UpdateBookRequest {
    #[must_use]
    pub const fn new(
        id: Uuid,
        title: BookTitle,
        author_id: Uuid,
        publish_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            title,
            author_id,
            publish_date,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    #[must_use]
    pub const fn author_id(&self) -> Uuid {
        self.author_id
    }

    #[must_use]
    pub const fn publish_date(&self) -> NaiveDate {
        self.publish_date
    }
}

#[derive(Error, Debug)]
pub enum UpdateBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: Uuid },
    #[error("Author with id \"{author_id}\" does not exist")]
    AuthorMissing { author_id: Uuid },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum FindBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: Uuid },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ListBooksError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: Uuid },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_name_trims_whitespace() {
        let name = AuthorName::new("  Ada ").unwrap();
        assert_eq!(name.as_str(), "Ada");
    }

    #[test]
    fn author_name_rejects_empty() {
        assert!(AuthorName::new("").is_err());
        assert!(AuthorName::new("   ").is_err());
    }

    #[test]
    fn book_title_trims_whitespace() {
        let title = BookTitle::new(" Sketch of the Analytical Engine ").unwrap();
        assert_eq!(title.as_str(), "Sketch of the Analytical Engine");
    }

    #[test]
    fn book_title_rejects_empty() {
        assert!(BookTitle::new("\t\n").is_err());
    }
}
