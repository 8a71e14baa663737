use rand::{rngs::StdRng, Rng, SeedableRng};

use oxmatch::prelude::*;

/// Small value space so rules collide, overlap and shadow each other.
fn random_rule(rng: &mut StdRng) -> Match {
    let mut m = Match::new();
    if rng.gen_bool(0.5) {
        m.set(OxmField::InPort, rng.gen_range(1u32..4));
    }
    if rng.gen_bool(0.6) {
        m.set(OxmField::EthType, 0x0800u16);
        if rng.gen_bool(0.7) {
            let prefix = rng.gen_range(0u32..=32);
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            let addr = 0x0a00_0000 | rng.gen_range(0u32..4) << 8 | rng.gen_range(0u32..4);
            m.set_masked(OxmField::Ipv4Dst, addr, mask).unwrap();
        }
        if rng.gen_bool(0.3) {
            m.set(OxmField::IpProto, 6u8)
                .set(OxmField::TcpDst, rng.gen_range(20u16..24));
        }
    }
    m
}

fn random_packet(rng: &mut StdRng) -> Match {
    let mut m = Match::new();
    m.set(OxmField::InPort, rng.gen_range(1u32..4))
        .set(OxmField::EthType, 0x0800u16)
        .set(
            OxmField::Ipv4Dst,
            0x0a00_0000 | rng.gen_range(0u32..4) << 8 | rng.gen_range(0u32..4),
        )
        .set(OxmField::IpProto, 6u8)
        .set(OxmField::TcpDst, rng.gen_range(20u16..24));
    m
}

struct Model {
    entries: Vec<(Match, u16, usize)>,
}

impl Model {
    fn lookup(&self, query: &Match) -> Option<usize> {
        let mut best: Option<&(Match, u16, usize)> = None;
        for e in &self.entries {
            if e.0.covers(query) && best.map_or(true, |b| e.1 > b.1) {
                best = Some(e);
            }
        }
        best.map(|e| e.2)
    }
}

#[test]
fn lookup_agrees_with_linear_scan() {
    let mut rng = StdRng::seed_from_u64(0x0f_20);
    let mut table = MatchTable::new();
    let mut model = Model { entries: vec![] };

    for id in 0..300usize {
        let rule = random_rule(&mut rng);
        let priority = rng.gen_range(0u16..8);
        let dup = model
            .entries
            .iter()
            .any(|(m, p, _)| *m == rule && *p == priority);
        match table.insert(rule.clone(), priority, id) {
            Ok(()) => {
                assert!(!dup);
                model.entries.push((rule, priority, id));
            }
            Err(e) => {
                assert!(dup);
                assert_eq!(e, TableError::DuplicateEntry { priority });
            }
        }
    }
    assert_eq!(table.len(), model.entries.len());

    for _ in 0..500 {
        let pkt = random_packet(&mut rng);
        assert_eq!(table.lookup(&pkt).copied(), model.lookup(&pkt), "{}", pkt);
    }

    // strict lookup finds each entry by identity, and only by identity
    for (m, p, id) in &model.entries {
        assert_eq!(table.lookup_strict(m, *p), Some(id));
        if !model.entries.iter().any(|(m2, p2, _)| m2 == m && *p2 == p + 100) {
            assert_eq!(table.lookup_strict(m, p + 100), None);
        }
    }

    // delete half, lookups still agree
    let victims: Vec<_> = model.entries.iter().step_by(2).cloned().collect();
    for (m, p, id) in &victims {
        assert_eq!(table.delete_strict(m, *p), Some(*id));
        assert_eq!(table.delete_strict(m, *p), None);
    }
    model.entries.retain(|e| !victims.contains(e));
    assert_eq!(table.len(), model.entries.len());
    for _ in 0..500 {
        let pkt = random_packet(&mut rng);
        assert_eq!(table.lookup(&pkt).copied(), model.lookup(&pkt), "{}", pkt);
    }
}

#[test]
fn iteration_is_priority_ordered_and_complete() {
    let mut rng = StdRng::seed_from_u64(0x0f_21);
    let mut table = MatchTable::new();
    let mut inserted = 0usize;
    for id in 0..200usize {
        if table
            .insert(random_rule(&mut rng), rng.gen_range(0u16..16), id)
            .is_ok()
        {
            inserted += 1;
        }
    }

    let mut seen = Vec::new();
    table.for_each(|_, p, id| seen.push((p, *id)));
    assert_eq!(seen.len(), inserted);
    // priorities never increase; insertion order within a priority
    for w in seen.windows(2) {
        assert!(w[0].0 > w[1].0 || (w[0].0 == w[1].0 && w[0].1 < w[1].1));
    }

    let mut released = 0;
    table.finalize(|_, _, _| released += 1);
    assert_eq!(released, inserted);
}

#[test]
fn map_and_delete_matching_select_the_same_entries() {
    let mut table = MatchTable::new();
    let rules = [
        ("in_port=1", 10),
        ("in_port=1,eth_type=0x0800", 20),
        ("in_port=1,eth_type=0x0800,ipv4_dst=10.0.0.0/8", 30),
        ("in_port=2,eth_type=0x0800", 20),
        ("eth_type=0x0800", 5),
        ("*", 0),
    ];
    for (i, (text, prio)) in rules.iter().enumerate() {
        table.insert(parse_match(text).unwrap(), *prio, i).unwrap();
    }

    let query = parse_match("in_port=1").unwrap();
    let mut mapped = Vec::new();
    table.map(&query, |_, _, id| mapped.push(*id));
    assert_eq!(mapped, vec![2, 1, 0]);

    let mut all = Vec::new();
    table.map(&Match::new(), |_, _, id| all.push(*id));
    assert_eq!(all.len(), rules.len());

    let removed: Vec<_> = table
        .delete_matching(&query)
        .into_iter()
        .map(|(_, _, id)| id)
        .collect();
    assert_eq!(removed, mapped);
    assert_eq!(table.len(), 3);
    let pkt = parse_match("in_port=1,eth_type=0x0800,ipv4_dst=10.1.2.3").unwrap();
    assert_eq!(table.lookup(&pkt), Some(&4));
}

#[test]
fn update_and_empty_table() {
    let mut table: MatchTable<&str> = MatchTable::new();
    let any = Match::new();
    assert_eq!(table.lookup(&any), None);
    assert_eq!(
        table.update(&any, 0, "x"),
        Err(TableError::EntryNotFound { priority: 0 })
    );
    assert!(table.is_empty());

    let rule = parse_match("vlan_vid=0x1000/0x1000").unwrap();
    table.insert(rule.clone(), 7, "tagged").unwrap();
    assert_eq!(table.update(&rule, 7, "any-vlan"), Ok("tagged"));
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.lookup(&parse_match("vlan_vid=0x1005").unwrap()),
        Some(&"any-vlan")
    );
    assert_eq!(table.lookup(&parse_match("vlan_vid=0x0005").unwrap()), None);
}
