use super::{
    Collection,
    Field,
    Filter,
    Group,
    Pipeline,
    StoreError,
    Value,
};
use crate::model::{
    DocId,
    Document,
    LobbyServer,
};
use futures::future::BoxFuture;
use std::collections::{
    BTreeSet,
    HashSet,
};
use tokio::sync::RwLock;

/// Document collection kept in process memory.
///
/// Documents are held in insertion order, so the first document of a group
/// is also the one with the smallest id.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: DocId,
    documents: Vec<Document>,
    indexes: BTreeSet<Field>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn indexes(&self) -> Vec<Field> {
        self.inner.read().await.indexes.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Collection for MemoryCollection {
    fn create_indexes<'a>(&'a self, fields: &'a [Field]) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            inner.indexes.extend(fields.iter().copied());
            Ok(())
        })
    }

    fn insert_many(&self, servers: Vec<LobbyServer>) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            let inserted = servers.len() as u64;
            for server in servers {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.documents.push(Document { id, server });
            }
            Ok(inserted)
        })
    }

    fn aggregate(&self, pipeline: Pipeline) -> BoxFuture<'_, Result<Vec<Group>, StoreError>> {
        Box::pin(async move {
            let filter = pipeline.filter.compile()?;
            let inner = self.inner.read().await;

            let mut groups: Vec<Group> = Vec::new();
            let mut seen: HashSet<Value> = HashSet::new();
            for document in inner.documents.iter().filter(|d| filter.matches(&d.server)) {
                let key = document.server.field(pipeline.group_by).to_value();
                if seen.insert(key.clone()) {
                    groups.push(Group {
                        key,
                        first_id: document.id,
                    });
                }
            }

            Ok(pipeline.finish(groups))
        })
    }

    fn count(&self, filter: Filter) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let filter = filter.compile()?;
            let inner = self.inner.read().await;
            Ok(inner.documents.iter().filter(|d| filter.matches(&d.server)).count() as u64)
        })
    }

    fn find_by_ids(&self, ids: Vec<DocId>) -> BoxFuture<'_, Result<Vec<Document>, StoreError>> {
        Box::pin(async move {
            let wanted: HashSet<DocId> = ids.into_iter().collect();
            let inner = self.inner.read().await;
            Ok(inner
                .documents
                .iter()
                .filter(|d| wanted.contains(&d.id))
                .cloned()
                .collect())
        })
    }

    fn delete_many(&self, filter: Filter) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let filter = filter.compile()?;
            let mut inner = self.inner.write().await;
            let before = inner.documents.len();
            inner.documents.retain(|d| !filter.matches(&d.server));
            Ok((before - inner.documents.len()) as u64)
        })
    }
}
