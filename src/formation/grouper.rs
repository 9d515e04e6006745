use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::error::FormationError;
use super::types::{FormationGroup, JumpRecord};

pub const DEFAULT_TOLERANCE_S: i64 = 20;

/// Union-find over record indices with path compression and union by rank.
#[derive(Debug, Default)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn add(&mut self) -> usize {
        let idx = self.parent.len();
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    fn root(&self, mut x: usize) -> usize {
        while self.parent[x] != x {
            x = self.parent[x];
        }
        x
    }

    fn find(&mut self, x: usize) -> usize {
        let root = self.root(x);
        let mut cursor = x;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    /// Links two roots and returns the surviving one.
    fn link(&mut self, a: usize, b: usize) -> usize {
        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => {
                self.parent[a] = b;
                b
            }
            std::cmp::Ordering::Greater => {
                self.parent[b] = a;
                a
            }
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
                a
            }
        }
    }
}

/// Incremental clustering of jumps by start time. Inserting a record that
/// bridges two existing groups merges them.
#[derive(Debug)]
pub struct FormationGrouper {
    tolerance: Duration,
    records: Vec<JumpRecord>,
    index: HashMap<Uuid, usize>,
    by_time: BTreeMap<DateTime<Utc>, Vec<usize>>,
    sets: DisjointSet,
    /// Earliest inserted record of each set, valid at roots.
    first: Vec<usize>,
    /// Base record of each set, valid at roots.
    base: Vec<usize>,
}

impl Default for FormationGrouper {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TOLERANCE_S))
    }
}

impl FormationGrouper {
    pub fn new(tolerance: Duration) -> Self {
        Self {
            tolerance: tolerance.abs(),
            records: Vec::new(),
            index: HashMap::new(),
            by_time: BTreeMap::new(),
            sets: DisjointSet::default(),
            first: Vec::new(),
            base: Vec::new(),
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a record and merges every group it comes within tolerance of.
    /// Returns `false` when the id was already known.
    pub fn insert(&mut self, record: JumpRecord) -> bool {
        if self.index.contains_key(&record.id) {
            return false;
        }

        let idx = self.sets.add();
        self.records.push(record);
        self.first.push(idx);
        self.base.push(idx);
        self.index.insert(record.id, idx);

        let lower = record
            .start_time
            .checked_sub_signed(self.tolerance)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let upper = record
            .start_time
            .checked_add_signed(self.tolerance)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let neighbours: Vec<usize> = self
            .by_time
            .range(lower..=upper)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();

        for other in neighbours {
            self.union(idx, other);
        }
        self.by_time.entry(record.start_time).or_default().push(idx);
        true
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.sets.find(a), self.sets.find(b));
        if ra == rb {
            return;
        }
        // The set whose first record arrived earlier keeps its base
        let keep = if self.first[ra] <= self.first[rb] { ra } else { rb };
        let (first, base) = (self.first[keep], self.base[keep]);
        let root = self.sets.link(ra, rb);
        self.first[root] = first;
        self.base[root] = base;
        log::debug!(
            "Merged formation of {} into {}",
            self.records[b].id,
            self.records[a].id
        );
    }

    fn idx_of(&self, id: &Uuid) -> Result<usize, FormationError> {
        self.index
            .get(id)
            .copied()
            .ok_or(FormationError::UnknownRecord(*id))
    }

    pub fn base_of(&self, member: &Uuid) -> Option<Uuid> {
        let idx = self.index.get(member)?;
        let root = self.sets.root(*idx);
        Some(self.records[self.base[root]].id)
    }

    /// Reassigns the base of `member`'s group.
    pub fn set_base(&mut self, member: &Uuid, base: &Uuid) -> Result<(), FormationError> {
        let member_idx = self.idx_of(member)?;
        let base_idx = self.idx_of(base)?;
        let root = self.sets.find(member_idx);
        if self.sets.find(base_idx) != root {
            return Err(FormationError::NotAMember {
                member: *member,
                base: *base,
            });
        }
        self.base[root] = base_idx;
        Ok(())
    }

    /// Current groups, ordered by earliest start time.
    pub fn groups(&self) -> Vec<FormationGroup> {
        let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for idx in 0..self.records.len() {
            buckets.entry(self.sets.root(idx)).or_default().push(idx);
        }

        let mut groups: Vec<(usize, FormationGroup)> = buckets
            .into_iter()
            .map(|(root, mut members)| {
                members.sort_by_key(|&i| (self.records[i].start_time, i));
                let group = FormationGroup {
                    members: members.iter().map(|&i| self.records[i].id).collect(),
                    base: self.records[self.base[root]].id,
                    start_time: self.records[members[0]].start_time,
                };
                (self.first[root], group)
            })
            .collect();
        groups.sort_by_key(|(first, group)| (group.start_time, *first));
        groups.into_iter().map(|(_, group)| group).collect()
    }
}

/// Groups records whose start times chain together within `tolerance`.
pub fn group_by_proximity(records: &[JumpRecord], tolerance: Duration) -> Vec<FormationGroup> {
    let mut grouper = FormationGrouper::new(tolerance);
    for record in records {
        grouper.insert(*record);
    }
    grouper.groups()
}
