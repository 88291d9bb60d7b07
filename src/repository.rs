use crate::model::{
    Author, AuthorName, Book, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteAuthorError, DeleteBookError, FindAuthorError, FindBookError,
    ListAuthorsError, ListBooksError, UpdateAuthorError, UpdateAuthorRequest, UpdateBookError,
    UpdateBookRequest,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Read/write access to author records.
///
/// Ids are generated by the repository at insert time and are immutable.
#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Uuid, CreateAuthorError>;

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<(), UpdateAuthorError>;

    async fn author_by_id(&self, id: Uuid) -> Result<Author, FindAuthorError>;

    /// Names are not unique; when several authors share a name the one with
    /// the lowest id wins.
    async fn author_by_name(
        &self,
        first_name: &AuthorName,
        last_name: &AuthorName,
    ) -> Result<Author, FindAuthorError>;

    /// Returns every author, including those with zero books (whose
    /// `book_count` is 0), via a single aggregated query.
    async fn all_authors(&self) -> Result<Vec<Author>, ListAuthorsError>;

    /// Removes the author only if no book references it at the time of the
    /// delete. The check and the delete serialize against concurrent book
    /// writes on the author row's lock, so no interleaving can orphan a book.
    async fn delete_author(&self, id: Uuid) -> Result<(), DeleteAuthorError>;
}

/// Read/write access to book records.
///
/// Every write is guarded by the existence of the referenced author, so no
/// book can ever point at an author row that is gone.
#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Uuid, CreateBookError>;

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<(), UpdateBookError>;

    async fn book_by_id(&self, id: Uuid) -> Result<Book, FindBookError>;

    /// Empty list, not an error, when the author has no books or does not
    /// exist.
    async fn books_by_author(&self, author_id: Uuid) -> Result<Vec<Book>, ListBooksError>;

    async fn delete_book(&self, id: Uuid) -> Result<(), DeleteBookError>;
}
