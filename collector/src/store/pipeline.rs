use super::{
    Field,
    Filter,
    Value,
};
use crate::model::DocId;

/// `match -> group -> sort -> skip -> limit` over a collection.
///
/// Grouping keeps the id of the first inserted document of every group.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub filter: Filter,
    pub group_by: Field,
    pub order: GroupOrder,
    pub skip: u64,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    /// Largest group key first.
    KeyDescending,
    /// Group whose first document was inserted earliest first.
    FirstInserted,
}

/// One output row of the group stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: Value,
    pub first_id: DocId,
}

impl Pipeline {
    pub fn group_by(field: Field) -> Self {
        Self {
            filter: Filter::default(),
            group_by: field,
            order: GroupOrder::FirstInserted,
            skip: 0,
            limit: None,
        }
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies sort, skip and limit to already grouped rows.
    pub(crate) fn finish(&self, mut groups: Vec<Group>) -> Vec<Group> {
        match self.order {
            GroupOrder::KeyDescending => groups.sort_by(|a, b| b.key.cmp(&a.key)),
            GroupOrder::FirstInserted => groups.sort_by_key(|g| g.first_id),
        }

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        groups.into_iter().skip(skip).take(limit).collect()
    }
}
