use crate::body::read_json;
use crate::errors::{AppError, AppResult};
use crate::models::{self, NewTodo, Todo, INVALID_DATA, MISSING_TITLE};
use crate::request_log::RequestLog;
use crate::store::TodoStore;
use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

const COLLECTION: &str = "todos";

const OUTSIDE_COLLECTION: &str = "Todos Not found!";
const ENDPOINT_NOT_FOUND: &str = "Error: Endpoint not found";
const GET_NOT_FOUND: &str = "Todo not found!";
const TODO_NOT_FOUND: &str = "Todo not found";
const READ_FAILED: &str = "Error: Failed to read todos";
const WRITE_FAILED: &str = "Error: Failed to write todos";
const UPDATE_FAILED: &str = "Error: Failed to update todos";
const DELETE_FAILED: &str = "Error: Failed to delete todo";

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<TodoStore>,
    pub request_log: RequestLog,
}

/// One operation per `(method, path shape)`. `None` ids come from segments with no
/// leading integer and never match an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    OutsideCollection,
    List,
    Get(Option<i64>),
    Create,
    Update(Option<i64>),
    Delete(Option<i64>),
    Unmatched,
}

impl Route {
    pub fn parse(method: &Method, path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        if segments.first() != Some(&COLLECTION) {
            return Self::OutsideCollection;
        }

        match (method, segments.as_slice()) {
            (&Method::GET, [_]) => Self::List,
            (&Method::POST, [_]) => Self::Create,
            (&Method::GET, [_, id]) => Self::Get(parse_leading_int(id)),
            (&Method::PUT, [_, id]) => Self::Update(parse_leading_int(id)),
            (&Method::DELETE, [_, id]) => Self::Delete(parse_leading_int(id)),
            _ => Self::Unmatched,
        }
    }
}

/// Reads an optional sign followed by the longest run of ASCII digits; trailing text is ignored.
pub fn parse_leading_int(segment: &str) -> Option<i64> {
    let trimmed = segment.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Single entry point for every request the service receives.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let raw_path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |path| path.as_str().to_string());
    state.request_log.record(method.as_str(), &raw_path);

    let route = Route::parse(&method, uri.path());
    if route == Route::OutsideCollection {
        return AppError::NotFound(OUTSIDE_COLLECTION.to_string()).into_response();
    }

    let _serialized = state.store.begin_request().await;
    let todos = match state.store.load_all().await {
        Ok(todos) => todos,
        Err(error) => {
            tracing::error!(error = %error, "failed to load todos");
            return AppError::Storage(READ_FAILED.to_string()).into_response();
        }
    };

    let body = request.into_body();
    let result = match route {
        Route::List => Ok(list(todos, &uri)),
        Route::Get(id) => get_one(&todos, id),
        Route::Create => create(&state.store, todos, body).await,
        Route::Update(id) => update(&state.store, todos, id, body).await,
        Route::Delete(id) => delete(&state.store, todos, id).await,
        Route::OutsideCollection | Route::Unmatched => {
            Err(AppError::NotFound(ENDPOINT_NOT_FOUND.to_string()))
        }
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

fn list(todos: Vec<Todo>, uri: &Uri) -> Response {
    // First occurrence wins when the parameter is repeated.
    let completed = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(pairs)| pairs.into_iter().find(|(key, _)| key == "completed"))
        .map(|(_, value)| value);
    Json(models::filter_completed(todos, completed.as_deref())).into_response()
}

fn get_one(todos: &[Todo], id: Option<i64>) -> AppResult<Response> {
    let todo = id
        .and_then(|id| todos.iter().find(|todo| todo.id == id))
        .ok_or_else(|| AppError::NotFound(GET_NOT_FOUND.to_string()))?;
    Ok(Json(todo).into_response())
}

async fn create(store: &TodoStore, mut todos: Vec<Todo>, body: Body) -> AppResult<Response> {
    let payload = read_json(body).await.map_err(|error| {
        tracing::debug!(error = %error, "rejected create body");
        AppError::InvalidInput(MISSING_TITLE.to_string())
    })?;
    let todo = NewTodo::from_body(&payload)?.into_todo(&todos)?;

    todos.push(todo.clone());
    persist(store, &todos, WRITE_FAILED).await?;
    tracing::info!(id = todo.id, "created todo");
    Ok(Json(todo).into_response())
}

async fn update(
    store: &TodoStore,
    mut todos: Vec<Todo>,
    id: Option<i64>,
    body: Body,
) -> AppResult<Response> {
    let index = id
        .and_then(|id| models::find_index(&todos, id))
        .ok_or_else(|| AppError::NotFound(TODO_NOT_FOUND.to_string()))?;

    let payload = read_json(body).await.map_err(|error| {
        tracing::debug!(error = %error, "rejected update body");
        AppError::InvalidInput(INVALID_DATA.to_string())
    })?;
    let patch = models::update_patch(&payload)?;
    let updated = todos[index].merged(patch)?;

    let previous_id = todos[index].id;
    if updated.id != previous_id {
        let duplicate = todos
            .iter()
            .enumerate()
            .any(|(position, todo)| position != index && todo.id == updated.id);
        tracing::warn!(from = previous_id, to = updated.id, duplicate, "update changed todo id");
    }

    todos[index] = updated.clone();
    persist(store, &todos, UPDATE_FAILED).await?;
    tracing::info!(id = updated.id, "updated todo");
    Ok(Json(updated).into_response())
}

async fn delete(store: &TodoStore, mut todos: Vec<Todo>, id: Option<i64>) -> AppResult<Response> {
    let index = id
        .and_then(|id| models::find_index(&todos, id))
        .ok_or_else(|| AppError::NotFound(TODO_NOT_FOUND.to_string()))?;

    let removed = todos.remove(index);
    persist(store, &todos, DELETE_FAILED).await?;
    tracing::info!(id = removed.id, "deleted todo");
    Ok(Json(removed).into_response())
}

async fn persist(store: &TodoStore, todos: &[Todo], failure: &str) -> AppResult<()> {
    store.save_all(todos).await.map_err(|error| {
        tracing::error!(error = %error, "failed to persist todos");
        AppError::Storage(failure.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_leading_int, persist, Route, DELETE_FAILED, UPDATE_FAILED, WRITE_FAILED};
    use crate::models::Todo;
    use crate::store::TodoStore;
    use axum::http::{Method, StatusCode};

    #[test]
    fn routes_follow_method_and_segment_count() {
        assert_eq!(Route::parse(&Method::GET, "/todos"), Route::List);
        assert_eq!(Route::parse(&Method::GET, "/todos/"), Route::List);
        assert_eq!(Route::parse(&Method::POST, "/todos"), Route::Create);
        assert_eq!(Route::parse(&Method::GET, "/todos/4"), Route::Get(Some(4)));
        assert_eq!(Route::parse(&Method::PUT, "/todos/4"), Route::Update(Some(4)));
        assert_eq!(Route::parse(&Method::DELETE, "/todos/4"), Route::Delete(Some(4)));
    }

    #[test]
    fn unknown_shapes_are_unmatched_or_outside() {
        assert_eq!(Route::parse(&Method::GET, "/"), Route::OutsideCollection);
        assert_eq!(Route::parse(&Method::GET, "/users"), Route::OutsideCollection);
        assert_eq!(Route::parse(&Method::GET, "/todosx"), Route::OutsideCollection);
        assert_eq!(Route::parse(&Method::PATCH, "/todos/1"), Route::Unmatched);
        assert_eq!(Route::parse(&Method::POST, "/todos/1"), Route::Unmatched);
        assert_eq!(Route::parse(&Method::DELETE, "/todos"), Route::Unmatched);
        assert_eq!(Route::parse(&Method::GET, "/todos/1/extra"), Route::Unmatched);
    }

    #[test]
    fn ids_use_leading_integer() {
        assert_eq!(parse_leading_int("12"), Some(12));
        assert_eq!(parse_leading_int("12abc"), Some(12));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), None);
        assert_eq!(Route::parse(&Method::GET, "/todos/abc"), Route::Get(None));
    }

    #[tokio::test]
    async fn write_failures_map_to_operation_messages() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Writing over a directory fails regardless of the caller's privileges.
        let store = TodoStore::new(dir.path());
        let todos = vec![Todo::new(1, "a", false)];

        for message in [WRITE_FAILED, UPDATE_FAILED, DELETE_FAILED] {
            let err = persist(&store, &todos, message).await.expect_err("write over directory");
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.to_string(), message);
        }
    }
}
