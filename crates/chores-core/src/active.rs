//! The in-memory active set.
//!
//! Parent/child links are kept consistent on every insert and removal: a
//! parent's `children` only ever lists chores that are in this set.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::model::{Chore, ChoreId, ChoreRecord, Phase};

/// Active chores keyed by id, iterated in id (creation) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    chores: BTreeMap<ChoreId, Chore>,
}

impl ActiveSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set from store records and link parents to children.
    ///
    /// A record whose parent is not active keeps its `parent_id`; it simply
    /// does not appear in any `children` list. When an id appears twice the
    /// later line wins.
    #[must_use]
    pub fn from_records(records: Vec<ChoreRecord>) -> Self {
        let mut chores = BTreeMap::new();
        for record in records {
            let id = record.id;
            if chores.insert(id, Chore::from_record(record)).is_some() {
                warn!(chore = %id, "duplicate chore id in active store, keeping the later record");
            }
        }
        let mut set = Self { chores };
        set.link_children();
        set
    }

    fn link_children(&mut self) {
        let links: Vec<(ChoreId, ChoreId)> = self
            .chores
            .values()
            .filter_map(|c| c.parent_id().map(|parent| (parent, c.id())))
            .filter(|(parent, child)| parent != child)
            .collect();
        for (parent, child) in links {
            if let Some(p) = self.chores.get_mut(&parent) {
                p.add_child(child);
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: ChoreId) -> Option<&Chore> {
        self.chores.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ChoreId) -> Option<&mut Chore> {
        self.chores.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ChoreId) -> bool {
        self.chores.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chore> {
        self.chores.values()
    }

    /// Insert a chore, registering it with its parent if the parent is active.
    pub fn insert(&mut self, chore: Chore) {
        let (id, parent) = (chore.id(), chore.parent_id());
        self.chores.insert(id, chore);
        if let Some(p) = parent.filter(|p| *p != id).and_then(|p| self.chores.get_mut(&p)) {
            p.add_child(id);
        }
    }

    /// Remove a chore and unregister it from its parent.
    ///
    /// Returns the removed chore, or `None` if it was not active.
    pub fn remove(&mut self, id: ChoreId) -> Option<Chore> {
        let removed = self.chores.remove(&id)?;
        if let Some(p) = removed.parent_id().and_then(|p| self.chores.get_mut(&p)) {
            p.remove_child(id);
        }
        Some(removed)
    }

    /// Active children of `id` that have not reached the terminal phase.
    #[must_use]
    pub fn pending_children(&self, id: ChoreId) -> Vec<ChoreId> {
        self.get(id)
            .map(|c| {
                c.children()
                    .iter()
                    .copied()
                    .filter(|child| self.get(*child).is_some_and(|c| !c.is_complete()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `id` may leave its current phase. Chores without children are
    /// always allowed.
    #[must_use]
    pub fn can_advance(&self, id: ChoreId) -> bool {
        self.pending_children(id).is_empty()
    }

    /// `id` plus every descendant, deepest first. Each chore appears once,
    /// even when hand-edited parent links form a cycle.
    #[must_use]
    pub fn subtree_post_order(&self, id: ChoreId) -> Vec<ChoreId> {
        let mut out = Vec::new();
        let mut visited = BTreeSet::new();
        self.collect_post_order(id, &mut visited, &mut out);
        out
    }

    fn collect_post_order(&self, id: ChoreId, visited: &mut BTreeSet<ChoreId>, out: &mut Vec<ChoreId>) {
        if !visited.insert(id) {
            return;
        }
        let Some(chore) = self.get(id) else {
            return;
        };
        for child in chore.children() {
            self.collect_post_order(*child, visited, out);
        }
        out.push(id);
    }

    #[must_use]
    pub fn find_by_phase(&self, phase: Phase) -> Vec<&Chore> {
        self.iter().filter(|c| c.phase() == phase).collect()
    }

    #[must_use]
    pub fn records(&self) -> Vec<ChoreRecord> {
        self.iter().map(Chore::to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, phase: Phase, parent: Option<u64>) -> ChoreRecord {
        ChoreRecord {
            id: ChoreId::new(id),
            name: format!("c{id}"),
            description: String::new(),
            phase,
            successor_id: None,
            progress_info: None,
            review_info: None,
            parent_id: parent.map(ChoreId::new),
        }
    }

    #[test]
    fn load_links_children_to_parents() {
        let set = ActiveSet::from_records(vec![
            record(3, Phase::Design, Some(1)),
            record(1, Phase::Design, None),
            record(2, Phase::Design, Some(1)),
            record(4, Phase::Design, Some(99)),
        ]);
        let parent = set.get(ChoreId::new(1)).unwrap();
        assert_eq!(parent.children(), &[ChoreId::new(2), ChoreId::new(3)]);
        assert_eq!(
            set.get(ChoreId::new(4)).unwrap().parent_id(),
            Some(ChoreId::new(99))
        );
    }

    #[test]
    fn gate_blocks_until_children_terminal() {
        let mut set = ActiveSet::from_records(vec![
            record(1, Phase::Design, None),
            record(2, Phase::Design, Some(1)),
        ]);
        assert_eq!(set.pending_children(ChoreId::new(1)), vec![ChoreId::new(2)]);
        assert!(!set.can_advance(ChoreId::new(1)));

        set.get_mut(ChoreId::new(2)).unwrap().set_phase(Phase::WorkDone);
        assert!(set.can_advance(ChoreId::new(1)));
    }

    #[test]
    fn remove_prunes_parent_children() {
        let mut set = ActiveSet::from_records(vec![
            record(1, Phase::Plan, None),
            record(2, Phase::Design, Some(1)),
        ]);
        assert!(set.remove(ChoreId::new(2)).is_some());
        assert!(set.get(ChoreId::new(1)).unwrap().children().is_empty());
        assert!(set.can_advance(ChoreId::new(1)));
        assert!(set.remove(ChoreId::new(2)).is_none());
    }

    #[test]
    fn subtree_lists_descendants_before_ancestors() {
        let set = ActiveSet::from_records(vec![
            record(1, Phase::Design, None),
            record(2, Phase::Design, Some(1)),
            record(3, Phase::Design, Some(2)),
            record(4, Phase::Design, Some(1)),
        ]);
        assert_eq!(
            set.subtree_post_order(ChoreId::new(1)),
            vec![
                ChoreId::new(3),
                ChoreId::new(2),
                ChoreId::new(4),
                ChoreId::new(1)
            ]
        );
    }

    #[test]
    fn self_parent_is_not_its_own_child() {
        let set = ActiveSet::from_records(vec![record(1, Phase::Design, Some(1))]);
        let id = ChoreId::new(1);
        assert!(set.get(id).unwrap().children().is_empty());
        assert!(set.pending_children(id).is_empty());
        assert_eq!(set.subtree_post_order(id), vec![id]);

        let mut set = ActiveSet::new();
        set.insert(Chore::from_record(record(2, Phase::Design, Some(2))));
        assert!(set.can_advance(ChoreId::new(2)));
    }

    #[test]
    fn parent_cycle_terminates() {
        let set = ActiveSet::from_records(vec![
            record(1, Phase::Design, Some(2)),
            record(2, Phase::Design, Some(1)),
            record(3, Phase::Design, Some(2)),
        ]);
        assert_eq!(
            set.subtree_post_order(ChoreId::new(1)),
            vec![ChoreId::new(3), ChoreId::new(2), ChoreId::new(1)]
        );
        assert_eq!(set.subtree_post_order(ChoreId::new(2)).len(), 3);
    }

    #[test]
    fn duplicate_ids_keep_the_later_record() {
        let mut first = record(5, Phase::Design, None);
        first.name = "first".to_string();
        let mut second = record(5, Phase::Plan, None);
        second.name = "second".to_string();
        let set = ActiveSet::from_records(vec![first, second]);
        assert_eq!(set.len(), 1);
        let kept = set.get(ChoreId::new(5)).unwrap();
        assert_eq!(kept.name, "second");
        assert_eq!(kept.phase(), Phase::Plan);
    }
}
