//! # Store Module
//!
//! Persistence for collected lobby servers.
//!
//! ## Layers
//!
//! - **`Collection`**: a document collection with insert-many, filtered
//!   delete, counting, fetch by id and a small aggregation pipeline
//!   (match, group, sort, skip, limit).
//! - **`MemoryCollection`**: in-process collection evaluating the pipeline itself.
//! - **`ClickHouseCollection`**: table backed collection in ClickHouse.
//! - **`SnapshotStore`**: snapshot semantics on top of any collection; latest
//!   snapshot pagination with deduplication by row id, and expiry.

mod clickhouse_collection;
mod filter;
mod memory;
mod pipeline;
mod snapshot;

pub use clickhouse_collection::ClickHouseCollection;
pub use filter::{
    Filter,
    Predicate,
};
pub use memory::MemoryCollection;
pub use pipeline::{
    Group,
    GroupOrder,
    Pipeline,
};
pub use snapshot::{
    Page,
    PageRequest,
    SnapshotStore,
    DEFAULT_PAGE_SIZE,
    DEFAULT_SORT,
    INDEXED_FIELDS,
};

use crate::model::{
    DocId,
    Document,
    LobbyServer,
};
use futures::future::BoxFuture;
use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    AsRefStr,
    Display,
    EnumIter,
};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("clickhouse: {0}")]
    ClickHouse(#[from] ::clickhouse::error::Error),
    #[error("invalid table name {0:?}")]
    TableName(String),
}

/// Document fields that can be filtered, grouped or indexed.
#[derive(Debug, Clone, Copy, AsRefStr, Display, EnumIter, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    RowId,
    Name,
    Address,
    Region,
    Continent,
    Area,
    PlatformName,
    GameMode,
    Intent,
    TagNames,
    PvpEnabled,
    HasPassword,
    ModEnabled,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Bool,
    List,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::TagNames => FieldKind::List,
            Field::PvpEnabled | Field::HasPassword | Field::ModEnabled => FieldKind::Bool,
            Field::CreatedAt => FieldKind::Int,
            _ => FieldKind::Str,
        }
    }
}

/// A scalar or list value stored in a document field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Borrowed view of a field inside a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Bool(bool),
    Int(i64),
    Str(&'a str),
    List(&'a [String]),
}

impl FieldRef<'_> {
    pub fn to_value(self) -> Value {
        match self {
            FieldRef::Bool(v) => Value::Bool(v),
            FieldRef::Int(v) => Value::Int(v),
            FieldRef::Str(v) => Value::Str(v.to_string()),
            FieldRef::List(v) => Value::List(v.to_vec()),
        }
    }
}

impl LobbyServer {
    pub fn field(&self, field: Field) -> FieldRef<'_> {
        match field {
            Field::RowId => FieldRef::Str(&self.row_id),
            Field::Name => FieldRef::Str(&self.name),
            Field::Address => FieldRef::Str(&self.address),
            Field::Region => FieldRef::Str(&self.region),
            Field::Continent => FieldRef::Str(&self.continent),
            Field::Area => FieldRef::Str(&self.area),
            Field::PlatformName => FieldRef::Str(&self.platform_name),
            Field::GameMode => FieldRef::Str(&self.game_mode),
            Field::Intent => FieldRef::Str(&self.intent),
            Field::TagNames => FieldRef::List(&self.tag_names),
            Field::PvpEnabled => FieldRef::Bool(self.pvp_enabled),
            Field::HasPassword => FieldRef::Bool(self.has_password),
            Field::ModEnabled => FieldRef::Bool(self.mod_enabled),
            Field::CreatedAt => FieldRef::Int(self.created_at),
        }
    }
}

/// A collection of lobby server documents.
///
/// Implementations must be safe to share between tasks; independent inserts
/// may run concurrently.
pub trait Collection: Send + Sync {
    /// Creates secondary indexes. Repeating the call with the same fields is a no-op.
    fn create_indexes<'a>(&'a self, fields: &'a [Field]) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Appends documents, assigning increasing ids in the given order.
    fn insert_many(&self, servers: Vec<LobbyServer>) -> BoxFuture<'_, Result<u64, StoreError>>;

    fn aggregate(&self, pipeline: Pipeline) -> BoxFuture<'_, Result<Vec<Group>, StoreError>>;

    fn count(&self, filter: Filter) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Documents with the given ids, in no particular order.
    fn find_by_ids(&self, ids: Vec<DocId>) -> BoxFuture<'_, Result<Vec<Document>, StoreError>>;

    fn delete_many(&self, filter: Filter) -> BoxFuture<'_, Result<u64, StoreError>>;
}
