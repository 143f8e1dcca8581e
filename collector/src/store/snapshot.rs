use super::{
    Collection,
    Field,
    Filter,
    GroupOrder,
    Pipeline,
    StoreError,
    Value,
};
use crate::model::{
    DocId,
    LobbyServer,
    PageResult,
};
use chrono::{
    DateTime,
    Utc,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_SORT: &str = "name";

/// Fields the collection keeps secondary indexes on.
pub const INDEXED_FIELDS: [Field; 8] = [
    Field::Name,
    Field::Area,
    Field::PlatformName,
    Field::TagNames,
    Field::CreatedAt,
    Field::RowId,
    Field::GameMode,
    Field::Intent,
];

/// Page parameters as received; non-positive values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: String,
}

/// Normalised page parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub size: u64,
    pub sort: String,
}

impl PageRequest {
    pub fn new(page: i64, size: i64, sort: impl Into<String>) -> Self {
        Self {
            page,
            size,
            sort: sort.into(),
        }
    }

    pub fn normalize(&self) -> Page {
        Page {
            page: if self.page <= 0 { 1 } else { self.page as u64 },
            size: if self.size <= 0 {
                DEFAULT_PAGE_SIZE
            } else {
                self.size as u64
            },
            sort: if self.sort.is_empty() {
                DEFAULT_SORT.to_string()
            } else {
                self.sort.clone()
            },
        }
    }
}

impl Page {
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

/// Snapshot view over a collection of lobby servers.
///
/// Every collection run is written with one shared `created_at`; reads only
/// ever see the newest of those snapshots, one document per row id.
#[derive(Clone)]
pub struct SnapshotStore {
    collection: Arc<dyn Collection>,
}

impl SnapshotStore {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self { collection }
    }

    /// Wraps the collection and makes sure its indexes exist.
    pub async fn open(collection: Arc<dyn Collection>) -> Result<Self, StoreError> {
        let store = Self::new(collection);
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        debug!(fields = ?INDEXED_FIELDS, "creating indexes");
        self.collection.create_indexes(&INDEXED_FIELDS).await
    }

    pub async fn insert_many(&self, servers: Vec<LobbyServer>) -> Result<u64, StoreError> {
        if servers.is_empty() {
            return Ok(0);
        }
        self.collection.insert_many(servers).await
    }

    /// Timestamp of the newest snapshot, `None` when the store is empty.
    pub async fn latest_snapshot(&self) -> Result<Option<i64>, StoreError> {
        let pipeline = Pipeline::group_by(Field::CreatedAt)
            .sort(GroupOrder::KeyDescending)
            .limit(1);

        let latest = self.collection.aggregate(pipeline).await?.into_iter().next();
        Ok(latest.and_then(|group| match group.key {
            Value::Int(ts) => Some(ts),
            _ => None,
        }))
    }

    /// One page of the newest snapshot.
    ///
    /// `total` counts every listing of the snapshot, duplicates included,
    /// while `list` holds one document per row id in insertion order.
    #[instrument(level = "debug", skip(self, filter))]
    pub async fn find_page(&self, request: PageRequest, filter: Filter) -> Result<PageResult<LobbyServer>, StoreError> {
        let page = request.normalize();

        let Some(snapshot) = self.latest_snapshot().await? else {
            debug!("store is empty");
            return Ok(PageResult::default());
        };

        let total = self
            .collection
            .count(Filter::new().eq(Field::CreatedAt, snapshot))
            .await?;

        let pipeline = Pipeline::group_by(Field::RowId)
            .matching(filter.set_eq(Field::CreatedAt, snapshot))
            .sort(GroupOrder::FirstInserted)
            .skip(page.offset())
            .limit(page.size);
        let ids: Vec<DocId> = self
            .collection
            .aggregate(pipeline)
            .await?
            .into_iter()
            .map(|group| group.first_id)
            .collect();

        let mut documents: HashMap<DocId, LobbyServer> = self
            .collection
            .find_by_ids(ids.clone())
            .await?
            .into_iter()
            .map(|document| (document.id, document.server))
            .collect();
        let list = ids.iter().filter_map(|id| documents.remove(id)).collect();

        debug!(snapshot, total, page = page.page, size = page.size, "served page");
        Ok(PageResult { total, list })
    }

    /// Deletes every document created at or before `now - ttl`, returning the
    /// number deleted and the number left.
    pub async fn remove_expired(&self, ttl: Duration) -> Result<(u64, u64), StoreError> {
        self.remove_expired_at(ttl, Utc::now()).await
    }

    pub async fn remove_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> Result<(u64, u64), StoreError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let threshold = now.timestamp_millis().saturating_sub(ttl_ms);

        let deleted = self
            .collection
            .delete_many(Filter::new().lte(Field::CreatedAt, threshold))
            .await?;
        let remaining = self.collection.count(Filter::new()).await?;

        info!(deleted, remaining, threshold, "removed expired servers");
        Ok((deleted, remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCollection;
    use pretty_assertions::assert_eq;

    fn server(row_id: &str, name: &str, created_at: i64) -> LobbyServer {
        LobbyServer {
            row_id: row_id.to_string(),
            name: name.to_string(),
            area: "US".to_string(),
            created_at,
            ..LobbyServer::default()
        }
    }

    async fn store_with(servers: Vec<LobbyServer>) -> SnapshotStore {
        let store = SnapshotStore::open(Arc::new(MemoryCollection::new())).await.unwrap();
        store.insert_many(servers).await.unwrap();
        store
    }

    fn row_ids(page: &PageResult<LobbyServer>) -> Vec<&str> {
        page.list.iter().map(|s| s.row_id.as_str()).collect()
    }

    #[test]
    fn page_defaults() {
        let page = PageRequest::new(0, -3, "").normalize();
        assert_eq!(
            page,
            Page {
                page: 1,
                size: DEFAULT_PAGE_SIZE,
                sort: "name".to_string()
            }
        );
        assert_eq!(page.offset(), 0);
        assert_eq!(PageRequest::new(3, 20, "area").normalize().offset(), 40);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_page() {
        let store = store_with(vec![]).await;
        let page = store.find_page(PageRequest::default(), Filter::new()).await.unwrap();
        assert_eq!(page, PageResult::default());
        assert_eq!(store.latest_snapshot().await.unwrap(), None);
    }

    #[tokio::test]
    async fn only_latest_snapshot_is_visible() {
        let store = store_with(vec![
            server("old", "Old", 100),
            server("new-1", "New 1", 200),
            server("new-2", "New 2", 200),
        ])
        .await;

        let page = store.find_page(PageRequest::default(), Filter::new()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(row_ids(&page), ["new-1", "new-2"]);
    }

    #[tokio::test]
    async fn caller_timestamp_cannot_select_an_older_snapshot() {
        let store = store_with(vec![server("old", "Old", 100), server("new", "New", 200)]).await;
        let page = store
            .find_page(PageRequest::default(), Filter::new().eq(Field::CreatedAt, 100_i64))
            .await
            .unwrap();
        assert_eq!(row_ids(&page), ["new"]);
    }

    #[tokio::test]
    async fn duplicates_collapse_to_earliest_insert() {
        let mut first = server("42", "First listing", 500);
        first.region = "us-east-1".to_string();
        let mut second = server("42", "Second listing", 500);
        second.region = "eu-central-1".to_string();
        let store = store_with(vec![first, server("7", "Other", 500), second]).await;

        for _ in 0..3 {
            let page = store.find_page(PageRequest::default(), Filter::new()).await.unwrap();
            // total counts raw listings, duplicates included
            assert_eq!(page.total, 3);
            assert_eq!(row_ids(&page), ["42", "7"]);
            assert_eq!(page.list[0].region, "us-east-1");
        }
    }

    #[tokio::test]
    async fn pages_reconstruct_the_deduplicated_set() {
        let mut servers = Vec::new();
        for i in 0..23 {
            servers.push(server(&format!("row-{i}"), "Camp", 1_000));
            if i % 4 == 0 {
                servers.push(server(&format!("row-{i}"), "Camp duplicate", 1_000));
            }
        }
        let store = store_with(servers).await;

        let mut seen = Vec::new();
        for page in 1..=5 {
            let result = store
                .find_page(PageRequest::new(page, 5, "name"), Filter::new())
                .await
                .unwrap();
            seen.extend(result.list.into_iter().map(|s| s.row_id));
        }

        let expected = (0..23).map(|i| format!("row-{i}")).collect::<Vec<_>>();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let store = store_with(vec![server("a", "A", 1)]).await;
        let page = store
            .find_page(PageRequest::new(3, 10, ""), Filter::new())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.list.is_empty());
    }

    #[tokio::test]
    async fn filters_apply_to_latest_snapshot_only() {
        let mut pvp_us = server("1", "Arena", 10);
        pvp_us.pvp_enabled = true;
        let mut pvp_de = server("2", "Arena DE", 10);
        pvp_de.pvp_enabled = true;
        pvp_de.area = "DE".to_string();
        let coop_us = server("3", "Camp", 10);
        let mut stale = server("4", "Old arena", 5);
        stale.pvp_enabled = true;
        let store = store_with(vec![stale, pvp_us, pvp_de, coop_us]).await;

        let filter = Filter::new().eq(Field::Area, "US").eq(Field::PvpEnabled, true);
        let page = store.find_page(PageRequest::default(), filter).await.unwrap();
        assert_eq!(row_ids(&page), ["1"]);
        // total ignores the caller's predicates
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn expiry_boundary_is_inclusive() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let ttl = Duration::from_secs(60);
        let edge = now.timestamp_millis() - 60_000;

        let store = store_with(vec![
            server("before", "Before", edge - 1),
            server("at", "At", edge),
            server("after", "After", edge + 1),
        ])
        .await;

        let (deleted, remaining) = store.remove_expired_at(ttl, now).await.unwrap();
        assert_eq!((deleted, remaining), (2, 1));

        let page = store.find_page(PageRequest::default(), Filter::new()).await.unwrap();
        assert_eq!(row_ids(&page), ["after"]);
    }

    #[tokio::test]
    async fn empty_insert_is_a_no_op() {
        let store = store_with(vec![]).await;
        assert_eq!(store.insert_many(vec![]).await.unwrap(), 0);
    }
}
