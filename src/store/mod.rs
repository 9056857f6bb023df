//! Persistence contract for the entity documents.
//!
//! Every entity is stored as a JSON document keyed by `(collection, id)` and
//! carries a `version` counter. `save` only succeeds when the caller saw the
//! latest version, so two requests racing on the same class, payment or
//! contract cannot both win: the second gets [`AppError::StaleWrite`].

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Attendance, Class, Contract, Evaluation, Lesson, Payment, Plan, Student, Teacher, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Students,
    Teachers,
    Classes,
    Lessons,
    Attendance,
    Evaluations,
    Payments,
    Plans,
    Contracts,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Students => "students",
            Collection::Teachers => "teachers",
            Collection::Classes => "classes",
            Collection::Lessons => "lessons",
            Collection::Attendance => "attendance",
            Collection::Evaluations => "evaluations",
            Collection::Payments => "payments",
            Collection::Plans => "plans",
            Collection::Contracts => "contracts",
        }
    }
}

/// A value that must be unique across one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub field: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Untyped document handed to a [`DocumentStore`]. `expected_version` is
/// the version the caller loaded, `0` for a document never saved.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub collection: Collection,
    pub id: Uuid,
    pub expected_version: i64,
    pub body: Value,
    pub unique_keys: Vec<UniqueKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// Dotted path into the document, e.g. `"period.year"`.
    pub path: String,
    pub descending: bool,
}

/// Containment filter with the semantics of Postgres `jsonb @>`, an optional
/// sort and optional pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Value,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::all()
    }
}

impl Query {
    pub fn all() -> Self {
        Self {
            filter: Value::Object(Map::new()),
            sort: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn filter(filter: Value) -> Self {
        Self {
            filter,
            ..Self::all()
        }
    }

    pub fn sort_by(mut self, path: impl Into<String>, descending: bool) -> Self {
        self.sort = Some(Sort {
            path: path.into(),
            descending,
        });
        self
    }

    pub fn paginate(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        contains(document, &self.filter)
    }
}

/// `jsonb @>`: objects match key by key, arrays match when every filter
/// element is contained in some document element, scalars by equality.
pub fn contains(document: &Value, filter: &Value) -> bool {
    match (document, filter) {
        (Value::Object(doc), Value::Object(wanted)) => wanted
            .iter()
            .all(|(key, value)| doc.get(key).is_some_and(|actual| contains(actual, value))),
        (Value::Array(doc), Value::Array(wanted)) => wanted
            .iter()
            .all(|value| doc.iter().any(|actual| contains(actual, value))),
        (Value::Array(doc), scalar) if !scalar.is_object() => doc.iter().any(|actual| actual == scalar),
        (actual, wanted) => actual == wanted,
    }
}

pub fn value_at<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Ordering used for sorted queries: missing and null values first, then
/// booleans, numbers and strings compared naturally.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>>;

    async fn find(&self, collection: Collection, query: &Query) -> AppResult<Vec<Value>>;

    /// Conditional upsert. Returns the new version.
    async fn save(&self, document: RawDocument) -> AppResult<i64>;

    /// Returns false when nothing was stored under `id`.
    async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool>;
}

/// Typed view of an entity stored in a [`DocumentStore`].
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);

    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}

macro_rules! impl_document {
    ($ty:ty, $collection:ident, $entity:literal) => {
        impl_document!($ty, $collection, $entity, |_doc| Vec::new());
    };
    ($ty:ty, $collection:ident, $entity:literal, |$doc:ident| $keys:expr) => {
        impl Document for $ty {
            const COLLECTION: Collection = Collection::$collection;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.id
            }

            fn version(&self) -> i64 {
                self.version
            }

            fn set_version(&mut self, version: i64) {
                self.version = version;
            }

            fn unique_keys(&self) -> Vec<UniqueKey> {
                let $doc = self;
                $keys
            }
        }
    };
}

impl_document!(User, Users, "User", |user| vec![UniqueKey::new("email", user.email.clone())]);
impl_document!(Student, Students, "Student", |student| {
    student.cpf.iter().map(|cpf| UniqueKey::new("cpf", cpf.clone())).collect()
});
impl_document!(Teacher, Teachers, "Teacher", |teacher| vec![UniqueKey::new("cpf", teacher.cpf.clone())]);
impl_document!(Class, Classes, "Class");
impl_document!(Lesson, Lessons, "Lesson");
impl_document!(Attendance, Attendance, "Attendance", |record| {
    vec![UniqueKey::new(
        "student_lesson",
        format!("{}:{}", record.student_id, record.lesson_id),
    )]
});
impl_document!(Evaluation, Evaluations, "Evaluation");
impl_document!(Payment, Payments, "Payment");
impl_document!(Plan, Plans, "Plan");
impl_document!(Contract, Contracts, "Contract", |contract| {
    vec![UniqueKey::new("number", contract.number.clone())]
});

pub async fn load<T: Document>(store: &dyn DocumentStore, id: Uuid) -> AppResult<T> {
    let body = store
        .get(T::COLLECTION, id)
        .await?
        .ok_or(AppError::NotFound { entity: T::ENTITY, id })?;
    Ok(serde_json::from_value(body)?)
}

pub async fn find_all<T: Document>(store: &dyn DocumentStore, query: &Query) -> AppResult<Vec<T>> {
    store
        .find(T::COLLECTION, query)
        .await?
        .into_iter()
        .map(|body| serde_json::from_value(body).map_err(AppError::from))
        .collect()
}

/// Saves `document` and updates its version in place.
pub async fn persist<T: Document>(store: &dyn DocumentStore, document: &mut T) -> AppResult<()> {
    let raw = RawDocument {
        collection: T::COLLECTION,
        id: document.id(),
        expected_version: document.version(),
        body: serde_json::to_value(&*document)?,
        unique_keys: document.unique_keys(),
    };
    let version = store.save(raw).await.map_err(|e| match e {
        AppError::StaleWrite { id, .. } => AppError::StaleWrite { entity: T::ENTITY, id },
        other => other,
    })?;
    document.set_version(version);
    Ok(())
}

pub async fn remove<T: Document>(store: &dyn DocumentStore, id: Uuid) -> AppResult<()> {
    if store.delete(T::COLLECTION, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound { entity: T::ENTITY, id })
    }
}
