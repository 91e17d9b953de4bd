use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MISSING_TITLE: &str = "Error: Invalid or missing title";
pub const DUPLICATE_ID: &str = "ID already exists";
pub const INVALID_ID: &str = "Error: Invalid id";
pub const INVALID_DATA: &str = "Error: Invalid data";
pub const IDS_EXHAUSTED: &str = "Error: No ids available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    /// Fields written by an update that are not part of the core shape.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Todo {
    pub fn new(id: i64, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id,
            title: title.into(),
            completed,
            extra: Map::new(),
        }
    }

    /// Shallow merge: every key in `patch` overwrites the stored value, `id` included.
    pub fn merged(&self, patch: &Map<String, Value>) -> AppResult<Todo> {
        let Ok(Value::Object(mut object)) = serde_json::to_value(self) else {
            return Err(AppError::InvalidInput(INVALID_DATA.to_string()));
        };
        for (key, value) in patch {
            object.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(object))
            .map_err(|_| AppError::InvalidInput(INVALID_DATA.to_string()))
    }
}

/// Validated create payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub id: Option<i64>,
    pub title: String,
    pub completed: bool,
}

impl NewTodo {
    pub fn from_body(body: &Value) -> AppResult<Self> {
        let title = match body.get("title") {
            Some(Value::String(title)) if !title.is_empty() => title.clone(),
            _ => return Err(AppError::InvalidInput(MISSING_TITLE.to_string())),
        };

        let id = match body.get("id") {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_i64() {
                Some(id) if id > 0 => Some(id),
                _ => return Err(AppError::InvalidInput(INVALID_ID.to_string())),
            },
        };

        Ok(Self {
            id,
            title,
            completed: matches!(body.get("completed"), Some(Value::Bool(true))),
        })
    }

    pub fn into_todo(self, todos: &[Todo]) -> AppResult<Todo> {
        let id = match self.id {
            Some(id) if find_index(todos, id).is_some() => {
                return Err(AppError::InvalidInput(DUPLICATE_ID.to_string()));
            }
            Some(id) => id,
            None => next_id(todos)
                .ok_or_else(|| AppError::Storage(IDS_EXHAUSTED.to_string()))?,
        };
        Ok(Todo::new(id, self.title, self.completed))
    }
}

/// Accepts an update body only if it carries a truthy `title` or a boolean `completed`.
pub fn update_patch(body: &Value) -> AppResult<&Map<String, Value>> {
    let Value::Object(patch) = body else {
        return Err(AppError::InvalidInput(INVALID_DATA.to_string()));
    };
    let has_title = patch.get("title").is_some_and(is_truthy);
    let has_completed = matches!(patch.get("completed"), Some(Value::Bool(_)));
    if !has_title && !has_completed {
        return Err(AppError::InvalidInput(INVALID_DATA.to_string()));
    }
    Ok(patch)
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `None` once the largest stored id is `i64::MAX`.
pub fn next_id(todos: &[Todo]) -> Option<i64> {
    match todos.iter().map(|todo| todo.id).max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

pub fn find_index(todos: &[Todo], id: i64) -> Option<usize> {
    todos.iter().position(|todo| todo.id == id)
}

/// `Some("true")` keeps completed items, any other value keeps open ones.
pub fn filter_completed(todos: Vec<Todo>, completed: Option<&str>) -> Vec<Todo> {
    match completed {
        None => todos,
        Some(raw) => {
            let wanted = raw == "true";
            todos.into_iter().filter(|todo| todo.completed == wanted).collect()
        }
    }
}
