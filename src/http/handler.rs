use crate::http::AppState;
use crate::model::{
    Author, AuthorName, AuthorNameEmptyError, Book, BookTitle, BookTitleEmptyError,
    CreateAuthorError, CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteBookError, FindAuthorError, FindBookError, ListAuthorsError, ListBooksError,
    UpdateAuthorError, UpdateAuthorRequest, UpdateBookError, UpdateBookRequest,
};
use crate::repository::{AuthorRepository, BookRepository};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<ApiResponse<T>>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(ApiResponse::new(status, data)))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    status_code: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    const fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ApiResponse::new(status, msg))).into_response()
    }
}

/// Logs the cause and hides it from the response body.
fn internal(cause: anyhow::Error) -> ApiError {
    tracing::error!("{cause:#}");
    ApiError::InternalServerError("Internal server error".to_string())
}

impl From<AuthorNameEmptyError> for ApiError {
    fn from(err: AuthorNameEmptyError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<BookTitleEmptyError> for ApiError {
    fn from(err: BookTitleEmptyError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        internal(err.0)
    }
}

impl From<UpdateAuthorError> for ApiError {
    fn from(err: UpdateAuthorError) -> Self {
        match err {
            UpdateAuthorError::NotFound { .. } => Self::NotFound(err.to_string()),
            UpdateAuthorError::Other(cause) => internal(cause),
        }
    }
}

impl From<FindAuthorError> for ApiError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { .. } | FindAuthorError::NameNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            FindAuthorError::Other(cause) => internal(cause),
        }
    }
}

impl From<ListAuthorsError> for ApiError {
    fn from(err: ListAuthorsError) -> Self {
        internal(err.0)
    }
}

impl From<DeleteAuthorError> for ApiError {
    fn from(err: DeleteAuthorError) -> Self {
        match err {
            DeleteAuthorError::NotFound { .. } => Self::NotFound(err.to_string()),
            DeleteAuthorError::HasBooks { .. } => Self::Conflict(err.to_string()),
            DeleteAuthorError::Other(cause) => internal(cause),
        }
    }
}

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::AuthorMissing { .. } => Self::Conflict(err.to_string()),
            CreateBookError::Other(cause) => internal(cause),
        }
    }
}

impl From<UpdateBookError> for ApiError {
    fn from(err: UpdateBookError) -> Self {
        match err {
            UpdateBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            UpdateBookError::AuthorMissing { .. } => Self::Conflict(err.to_string()),
            UpdateBookError::Other(cause) => internal(cause),
        }
    }
}

impl From<FindBookError> for ApiError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            FindBookError::Other(cause) => internal(cause),
        }
    }
}

impl From<ListBooksError> for ApiError {
    fn from(err: ListBooksError) -> Self {
        internal(err.0)
    }
}

impl From<DeleteBookError> for ApiError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            DeleteBookError::Other(cause) => internal(cause),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddAuthorHttpRequest {
    first_name: String,
    last_name: String,
}

impl TryFrom<AddAuthorHttpRequest> for CreateAuthorRequest {
    type Error = AuthorNameEmptyError;

    fn try_from(value: AddAuthorHttpRequest) -> Result<Self, Self::Error> {
        let first_name = AuthorName::new(&value.first_name)?;
        let last_name = AuthorName::new(&value.last_name)?;
        Ok(Self::new(first_name, last_name))
    }
}

#[derive(Debug, Serialize)]
pub struct AddAuthorHttpResponse {
    author_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAuthorHttpRequest {
    author_id: Uuid,
    first_name: String,
    last_name: String,
}

impl TryFrom<UpdateAuthorHttpRequest> for UpdateAuthorRequest {
    type Error = AuthorNameEmptyError;

    fn try_from(value: UpdateAuthorHttpRequest) -> Result<Self, Self::Error> {
        let first_name = AuthorName::new(&value.first_name)?;
        let last_name = AuthorName::new(&value.last_name)?;
        Ok(Self::new(value.author_id, first_name, last_name))
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorHttpResponse {
    author_id: Uuid,
    first_name: String,
    last_name: String,
    book_count: i64,
}

impl From<Author> for AuthorHttpResponse {
    fn from(value: Author) -> Self {
        Self {
            author_id: value.id(),
            first_name: value.first_name().to_string(),
            last_name: value.last_name().to_string(),
            book_count: value.book_count(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorByNameParams {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddBookHttpRequest {
    title: String,
    author_id: Uuid,
    publish_date: NaiveDate,
}

impl TryFrom<AddBookHttpRequest> for CreateBookRequest {
    type Error = BookTitleEmptyError;

    fn try_from(value: AddBookHttpRequest) -> Result<Self, Self::Error> {
        let title = BookTitle::new(&value.title)?;
        Ok(Self::new(title, value.author_id, value.publish_date))
    }
}

#[derive(Debug, Serialize)]
pub struct AddBookHttpResponse {
    book_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookHttpRequest {
    book_id: Uuid,
    title: String,
    author_id: Uuid,
    publish_date: NaiveDate,
}

impl TryFrom<UpdateBookHttpRequest> for UpdateBookRequest {
    type Error = BookTitleEmptyError;

    fn try_from(value: UpdateBookHttpRequest) -> Result<Self, Self::Error> {
        let title = BookTitle::new(&value.title)?;
        Ok(Self::new(
            value.book_id,
            title,
            value.author_id,
            value.publish_date,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct BookHttpResponse {
    book_id: Uuid,
    author_id: Uuid,
    title: String,
    publish_date: NaiveDate,
}

impl From<Book> for BookHttpResponse {
    fn from(value: Book) -> Self {
        Self {
            book_id: value.id(),
            author_id: value.author_id(),
            title: value.title().to_string(),
            publish_date: value.publish_date(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BooksByAuthorParams {
    author_id: Uuid,
}

pub async fn add_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Json(body): Json<AddAuthorHttpRequest>,
) -> Result<ApiSuccess<AddAuthorHttpResponse>, ApiError> {
    let req = body.try_into()?;
    let author_id = state.author_repo.create_author(&req).await?;
    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        AddAuthorHttpResponse { author_id },
    ))
}

pub async fn update_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Json(body): Json<UpdateAuthorHttpRequest>,
) -> Result<ApiSuccess<()>, ApiError> {
    let req = body.try_into()?;
    state.author_repo.update_author(&req).await?;
    Ok(ApiSuccess::new(StatusCode::OK, ()))
}

pub async fn author_by_id<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<Uuid>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let author = state.author_repo.author_by_id(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn author_by_name<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Query(params): Query<AuthorByNameParams>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let first_name = AuthorName::new(&params.first_name)?;
    let last_name = AuthorName::new(&params.last_name)?;
    let author = state
        .author_repo
        .author_by_name(&first_name, &last_name)
        .await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn all_authors<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    let authors = state.author_repo.all_authors().await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        authors.into_iter().map(Into::into).collect(),
    ))
}

pub async fn delete_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<Uuid>,
) -> Result<ApiSuccess<()>, ApiError> {
    state.author_repo.delete_author(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, ()))
}

pub async fn add_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Json(body): Json<AddBookHttpRequest>,
) -> Result<ApiSuccess<AddBookHttpResponse>, ApiError> {
    let req = body.try_into()?;
    let book_id = state.book_repo.create_book(&req).await?;
    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        AddBookHttpResponse { book_id },
    ))
}

pub async fn update_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Json(body): Json<UpdateBookHttpRequest>,
) -> Result<ApiSuccess<()>, ApiError> {
    let req = body.try_into()?;
    state.book_repo.update_book(&req).await?;
    Ok(ApiSuccess::new(StatusCode::OK, ()))
}

pub async fn book_by_id<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<Uuid>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let book = state.book_repo.book_by_id(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn books_by_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Query(params): Query<BooksByAuthorParams>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError> {
    let books = state.book_repo.books_by_author(params.author_id).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        books.into_iter().map(Into::into).collect(),
    ))
}

pub async fn delete_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    Path(id): Path<Uuid>,
) -> Result<ApiSuccess<()>, ApiError> {
    state.book_repo.delete_book(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, ()))
}
