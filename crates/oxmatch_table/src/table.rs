//! # Flow match table
//!
//! Entries are `(match, priority, payload)` triples, unique on `(match, priority)`.
//! They are grouped into one bucket per priority, buckets ordered from the highest
//! priority down, each bucket keeping its entries in insertion order.
//!
//! ```text
//!   priority 300 | m1 -> d1, m4 -> d4
//!   priority 100 | m2 -> d2
//!   priority   0 | m3 -> d3
//! ```
//!
//! * Strict operations hash the match inside one bucket.
//! * [lookup](MatchTable::lookup) walks the buckets top-down and returns the first
//!   entry whose match covers the query. Among equal-priority candidates the one
//!   inserted first wins.
//! * [map](MatchTable::map) visits the entries a wildcard query covers, i.e. the
//!   entries that are equal to or more specific than the query.
use std::{cmp::Reverse, collections::BTreeMap, fmt::Debug, mem};

use fxhash::FxBuildHasher;
use indexmap::{map::Entry, IndexMap};
use tracing::{trace, warn};

use oxmatch_core::r#match::Match;

use crate::{TableConfig, TableError, TableResult};

type Bucket<D> = IndexMap<Match, D, FxBuildHasher>;

/// Single-table flow classifier. `D` is the opaque per-entry payload.
pub struct MatchTable<D> {
    buckets: BTreeMap<Reverse<u16>, Bucket<D>>,
    len: usize,
    config: TableConfig,
}

impl<D> Default for MatchTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Debug> Debug for MatchTable<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(m, p, d)| (p, m, d)))
            .finish()
    }
}

impl<D> MatchTable<D> {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        MatchTable {
            buckets: BTreeMap::new(),
            len: 0,
            config,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Installs a new entry. Fails without touching the table if `(m, priority)`
    /// is already present or the table is full.
    pub fn insert(&mut self, m: Match, priority: u16, payload: D) -> TableResult<()> {
        if self.lookup_strict(&m, priority).is_some() {
            warn!(priority, entry = %m, "refusing duplicate flow entry");
            return Err(TableError::DuplicateEntry { priority });
        }
        if let Some(max_entries) = self.config.max_entries {
            if self.len >= max_entries {
                warn!(priority, max_entries, "flow table full");
                return Err(TableError::TableFull { max_entries });
            }
        }
        trace!(priority, entry = %m, "insert flow entry");
        let cap = self.config.bucket_capacity;
        let bucket = self
            .buckets
            .entry(Reverse(priority))
            .or_insert_with(|| IndexMap::with_capacity_and_hasher(cap, FxBuildHasher::default()));
        match bucket.entry(m) {
            Entry::Occupied(_) => Err(TableError::DuplicateEntry { priority }),
            Entry::Vacant(v) => {
                v.insert(payload);
                self.len += 1;
                Ok(())
            }
        }
    }

    /// Payload of the entry whose match and priority are both exactly equal.
    pub fn lookup_strict(&self, m: &Match, priority: u16) -> Option<&D> {
        self.buckets.get(&Reverse(priority))?.get(m)
    }

    pub fn lookup_strict_mut(&mut self, m: &Match, priority: u16) -> Option<&mut D> {
        self.buckets.get_mut(&Reverse(priority))?.get_mut(m)
    }

    /// Payload of the highest-priority entry whose match covers `query`.
    ///
    /// `None` is a table miss.
    pub fn lookup(&self, query: &Match) -> Option<&D> {
        self.lookup_entry(query).map(|(_, _, d)| d)
    }

    /// Like [lookup](Self::lookup), returning the whole winning entry.
    pub fn lookup_entry(&self, query: &Match) -> Option<(&Match, u16, &D)> {
        self.buckets.iter().find_map(|(Reverse(priority), bucket)| {
            bucket
                .iter()
                .find(|(m, _)| m.covers(query))
                .map(|(m, d)| (m, *priority, d))
        })
    }

    /// Replaces the payload of an existing entry, returning the old one.
    pub fn update(&mut self, m: &Match, priority: u16, payload: D) -> TableResult<D> {
        match self.lookup_strict_mut(m, priority) {
            Some(slot) => {
                trace!(priority, entry = %m, "update flow entry");
                Ok(mem::replace(slot, payload))
            }
            None => Err(TableError::EntryNotFound { priority }),
        }
    }

    /// Removes the entry with exactly this match and priority.
    pub fn delete_strict(&mut self, m: &Match, priority: u16) -> Option<D> {
        let bucket = self.buckets.get_mut(&Reverse(priority))?;
        let payload = bucket.shift_remove(m)?;
        if bucket.is_empty() {
            self.buckets.remove(&Reverse(priority));
        }
        self.len -= 1;
        trace!(priority, entry = %m, "delete flow entry");
        Some(payload)
    }

    /// Removes every entry `query` covers, any priority. Returns them highest
    /// priority first.
    pub fn delete_matching(&mut self, query: &Match) -> Vec<(Match, u16, D)> {
        let mut removed = Vec::new();
        for (Reverse(priority), bucket) in self.buckets.iter_mut() {
            if !bucket.keys().any(|m| query.covers(m)) {
                continue;
            }
            for (m, d) in mem::take(bucket) {
                if query.covers(&m) {
                    removed.push((m, *priority, d));
                } else {
                    bucket.insert(m, d);
                }
            }
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        self.len -= removed.len();
        if !removed.is_empty() {
            trace!(query = %query, count = removed.len(), "delete flow entries");
        }
        removed
    }

    /// Whether an entry of the same priority could match a packet `m` matches.
    pub fn overlaps(&self, m: &Match, priority: u16) -> bool {
        self.buckets
            .get(&Reverse(priority))
            .is_some_and(|bucket| bucket.keys().any(|other| other.overlaps(m)))
    }

    /// Entries from the highest priority down, insertion order within a priority.
    pub fn iter(&self) -> impl Iterator<Item = (&Match, u16, &D)> + '_ {
        self.buckets.iter().flat_map(|(Reverse(priority), bucket)| {
            bucket.iter().map(move |(m, d)| (m, *priority, d))
        })
    }

    /// Visits every entry exactly once.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Match, u16, &D),
    {
        self.iter().for_each(|(m, p, d)| visit(m, p, d));
    }

    /// Visits every entry `query` covers: entries that constrain at least what the
    /// query constrains, to the same values.
    pub fn map<F>(&self, query: &Match, mut visit: F)
    where
        F: FnMut(&Match, u16, &D),
    {
        self.iter()
            .filter(|(m, _, _)| query.covers(m))
            .for_each(|(m, p, d)| visit(m, p, d));
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    /// Tears the table down, handing each remaining entry to `release`.
    pub fn finalize<F>(self, mut release: F)
    where
        F: FnMut(Match, u16, D),
    {
        for (Reverse(priority), bucket) in self.buckets {
            for (m, d) in bucket {
                release(m, priority, d);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use oxmatch_core::r#match::field::OxmField;
    use oxmatch_oxm::parse_match;
    use tracing_test::traced_test;

    use super::*;

    fn m(s: &str) -> Match {
        parse_match(s).unwrap()
    }

    fn packet() -> Match {
        m("in_port=3,eth_type=0x0800,ip_proto=6,ipv4_src=10.1.1.1,ipv4_dst=192.168.7.9,tcp_src=40000,tcp_dst=443")
    }

    #[test]
    fn test_miss_on_empty_table() {
        let table = MatchTable::<u32>::new();
        assert!(table.lookup(&packet()).is_none());
        assert!(table.lookup(&Match::new()).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_strict_identity() {
        let mut table = MatchTable::new();
        let rule = m("eth_type=0x0800,ipv4_dst=192.168.7.0/24");
        table.insert(rule.clone(), 10, "p").unwrap();
        assert_eq!(table.lookup_strict(&rule, 10), Some(&"p"));
        assert_eq!(table.lookup_strict(&rule, 11), None);
        assert_eq!(
            table.lookup_strict(&m("eth_type=0x0800,ipv4_dst=192.168.0.0/16"), 10),
            None
        );
    }

    #[test]
    #[traced_test]
    fn test_no_duplicate_insert() {
        let mut table = MatchTable::new();
        let rule = m("tcp_dst=22");
        table.insert(rule.clone(), 10, "p1").unwrap();
        assert_eq!(
            table.insert(rule.clone(), 10, "p2"),
            Err(TableError::DuplicateEntry { priority: 10 })
        );
        assert_eq!(table.lookup_strict(&rule, 10), Some(&"p1"));
        assert_eq!(table.len(), 1);
        assert!(logs_contain("refusing duplicate flow entry"));
    }

    #[test]
    fn test_update_preserves_identity() {
        let mut table = MatchTable::new();
        let rule = m("tcp_dst=22");
        table.insert(rule.clone(), 10, "p1").unwrap();
        assert_eq!(table.update(&rule, 10, "p2"), Ok("p1"));
        assert_eq!(table.lookup_strict(&rule, 10), Some(&"p2"));
        assert_eq!(
            table.update(&rule, 20, "p3"),
            Err(TableError::EntryNotFound { priority: 20 })
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let mut table = MatchTable::new();
        let rule = m("tcp_dst=22");
        table.insert(rule.clone(), 10, "low").unwrap();
        table.insert(rule.clone(), 20, "high").unwrap();
        assert_eq!(table.delete_strict(&rule, 10), Some("low"));
        assert_eq!(table.delete_strict(&rule, 10), None);
        assert_eq!(table.lookup_strict(&rule, 20), Some(&"high"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_priority_ordering() {
        let mut table = MatchTable::new();
        table.insert(m("eth_type=0x0800"), 10, 10).unwrap();
        table
            .insert(m("ipv4_dst=192.168.0.0/16"), 20, 20)
            .unwrap();
        table.insert(Match::new(), 0, 0).unwrap();
        assert_eq!(table.lookup(&packet()), Some(&20));

        let (entry, priority, _) = table.lookup_entry(&packet()).unwrap();
        assert_eq!(priority, 20);
        assert!(entry.is_set(OxmField::Ipv4Dst));

        // table-miss entry catches the rest
        assert_eq!(table.lookup(&m("eth_type=0x86dd")), Some(&0));
    }

    #[test]
    fn test_lookup_is_superset_test() {
        let mut table = MatchTable::new();
        table.insert(m("tcp_dst=443,ipv4_dst=192.168.7.9"), 5, "exact").unwrap();
        table.insert(m("tcp_dst=80"), 5, "web").unwrap();
        table.insert(m("tcp_dst=443,in_port=4"), 5, "port4").unwrap();
        assert_eq!(table.lookup(&packet()), Some(&"exact"));
        // the query lacks a field the entry constrains
        assert_eq!(table.lookup(&m("tcp_dst=443")), None);
    }

    #[test]
    fn test_equal_priority_tie_goes_to_first_inserted() {
        let mut table = MatchTable::new();
        table.insert(m("tcp_dst=443"), 7, "first").unwrap();
        table.insert(m("ipv4_src=10.0.0.0/8"), 7, "second").unwrap();
        assert_eq!(table.lookup(&packet()), Some(&"first"));

        table.delete_strict(&m("tcp_dst=443"), 7);
        table.insert(m("tcp_dst=443"), 7, "third").unwrap();
        assert_eq!(table.lookup(&packet()), Some(&"second"));
    }

    #[test]
    fn test_map_visits_more_specific_entries() {
        let mut table = MatchTable::new();
        table.insert(m("tcp_dst=22"), 1, 'a').unwrap();
        table.insert(m("tcp_dst=22,ipv4_src=10.0.0.1"), 2, 'b').unwrap();
        table.insert(m("tcp_dst=23"), 3, 'c').unwrap();
        table.insert(m("ipv4_src=10.0.0.1"), 4, 'd').unwrap();

        let mut seen = Vec::new();
        table.map(&m("tcp_dst=22"), |_, p, d| seen.push((p, *d)));
        assert_eq!(seen, vec![(2, 'b'), (1, 'a')]);

        let mut all = 0;
        table.map(&Match::new(), |_, _, _| all += 1);
        assert_eq!(all, 4);
    }

    #[test]
    fn test_for_each_visits_all_once() {
        let mut table = MatchTable::new();
        for port in 0..50u32 {
            let mut rule = Match::new();
            rule.set(OxmField::InPort, port);
            table.insert(rule, (port % 5) as u16, port).unwrap();
        }
        let mut seen = vec![false; 50];
        table.for_each(|_, _, port| {
            assert!(!seen[*port as usize]);
            seen[*port as usize] = true;
        });
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn test_delete_matching() {
        let mut table = MatchTable::new();
        table.insert(m("tcp_dst=22"), 1, 'a').unwrap();
        table.insert(m("tcp_dst=22,in_port=1"), 1, 'b').unwrap();
        table.insert(m("tcp_dst=80"), 1, 'c').unwrap();
        table.insert(m("tcp_dst=22,in_port=2"), 9, 'd').unwrap();

        let removed: Vec<_> = table
            .delete_matching(&m("tcp_dst=22"))
            .into_iter()
            .map(|(_, p, d)| (p, d))
            .collect();
        assert_eq!(removed, vec![(9, 'd'), (1, 'a'), (1, 'b')]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup_strict(&m("tcp_dst=80"), 1), Some(&'c'));
    }

    #[test]
    fn test_overlap_check() {
        let mut table = MatchTable::new();
        table.insert(m("ipv4_dst=10.0.0.0/8"), 5, ()).unwrap();
        assert!(table.overlaps(&m("tcp_dst=80"), 5));
        assert!(!table.overlaps(&m("ipv4_dst=11.0.0.0/8"), 5));
        assert!(!table.overlaps(&m("tcp_dst=80"), 6));
    }

    #[test]
    #[traced_test]
    fn test_table_full() {
        let mut table = MatchTable::with_config(TableConfig::default().max_entries(2));
        table.insert(m("tcp_dst=1"), 0, ()).unwrap();
        table.insert(m("tcp_dst=2"), 0, ()).unwrap();
        assert_eq!(
            table.insert(m("tcp_dst=3"), 0, ()),
            Err(TableError::TableFull { max_entries: 2 })
        );
        assert!(logs_contain("flow table full"));
        table.delete_strict(&m("tcp_dst=1"), 0).unwrap();
        table.insert(m("tcp_dst=3"), 0, ()).unwrap();
    }

    #[test]
    fn test_finalize_releases_everything() {
        let mut table = MatchTable::new();
        table.insert(m("tcp_dst=1"), 3, String::from("x")).unwrap();
        table.insert(m("tcp_dst=2"), 1, String::from("y")).unwrap();
        table.insert(m("tcp_dst=3"), 3, String::from("z")).unwrap();
        let mut released = Vec::new();
        table.finalize(|_, p, d| released.push((p, d)));
        assert_eq!(
            released,
            vec![(3, "x".to_string()), (3, "z".to_string()), (1, "y".to_string())]
        );
    }
}
