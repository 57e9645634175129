//! # Property-Based Tests
//!
//! Determinism and bound invariants of the analysis engine, checked over
//! random networks with proptest.

use krystal_core::primitives::{MAX_NETWORK_DEPTH, MIN_RELATIONSHIP_STRENGTH};
use krystal_core::{
    Entity, EntityId, EntityKind, NetworkSnapshot, PowerMapper, Relationship, export_canonical,
    import_canonical,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

const KINDS: [&str; 5] = ["corporation", "government", "person", "organization", "media"];

fn entities(count: u64) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            Entity::new(
                i,
                format!("Entity {}", i),
                EntityKind::from(KINDS[(i % 5) as usize]),
            )
        })
        .collect()
}

fn relationships(pairs: &[(u64, u64, f64)]) -> Vec<Relationship> {
    pairs
        .iter()
        .map(|&(a, b, s)| Relationship::new(a, b, "link", s))
        .collect()
}

fn network_strategy() -> impl Strategy<Value = (u64, Vec<(u64, u64, f64)>)> {
    (2u64..15).prop_flat_map(|n| {
        (
            Just(n),
            vec((0..n + 2, 0..n + 2, 0.0f64..1.0), 0..40),
        )
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The same input always produces the same analysis.
    #[test]
    fn analysis_is_deterministic((n, pairs) in network_strategy()) {
        let ents = entities(n);
        let rels = relationships(&pairs);

        let mut first = PowerMapper::default();
        let mut second = PowerMapper::default();
        let a = first.analyze_network(&ents, &rels).expect("analyze");
        let b = second.analyze_network(&ents, &rels).expect("analyze");

        prop_assert_eq!(a, b);
    }

    /// Every influence score lies in [0, 100].
    #[test]
    fn influence_scores_bounded((n, pairs) in network_strategy()) {
        let mut mapper = PowerMapper::default();
        let analysis = mapper
            .analyze_network(&entities(n), &relationships(&pairs))
            .expect("analyze");

        for ranking in &analysis.influence_rankings {
            prop_assert!(ranking.influence_score >= 0.0);
            prop_assert!(ranking.influence_score <= 100.0);
        }
        for community in &analysis.communities.communities {
            prop_assert!(community.influence_score >= 0.0);
            prop_assert!(community.influence_score <= 100.0);
        }
    }

    /// Weak or dangling relationships never become edges.
    #[test]
    fn filtered_relationships_never_become_edges((n, pairs) in network_strategy()) {
        let mut mapper = PowerMapper::default();
        mapper
            .load_network(&entities(n), &relationships(&pairs))
            .expect("load");
        let graph = mapper.graph();

        for (a, b, rel) in graph.edges() {
            prop_assert!(rel.strength() >= MIN_RELATIONSHIP_STRENGTH);
            prop_assert!(graph.contains(a) && graph.contains(b));
            prop_assert_ne!(a, b);
        }
    }

    /// Paths are simple, bounded, and run from `a` to `b`.
    #[test]
    fn connection_paths_well_formed(
        (n, pairs) in network_strategy(),
        from in 0u64..15,
        to in 0u64..15,
        max_paths in 0usize..10,
    ) {
        let mut mapper = PowerMapper::default();
        mapper
            .load_network(&entities(n), &relationships(&pairs))
            .expect("load");
        let (a, b) = (EntityId::from(from), EntityId::from(to));
        let paths = mapper.find_connection_paths(&a, &b, max_paths);

        prop_assert!(paths.len() <= max_paths);
        for path in &paths {
            prop_assert!(path.len() >= 2);
            prop_assert!(path.len() - 1 <= MAX_NETWORK_DEPTH);
            prop_assert_eq!(path.first().and_then(|e| e.id.as_ref()), Some(&a));
            prop_assert_eq!(path.last().and_then(|e| e.id.as_ref()), Some(&b));

            let unique: BTreeSet<_> = path.iter().filter_map(|e| e.id.clone()).collect();
            prop_assert_eq!(unique.len(), path.len());

            for step in path.windows(2) {
                let (x, y) = (step[0].id.as_ref(), step[1].id.as_ref());
                if let (Some(x), Some(y)) = (x, y) {
                    prop_assert!(mapper.graph().edge(x, y).is_some());
                }
            }
        }
    }

    /// Community members partition the entities that have relationships.
    #[test]
    fn communities_partition_entities((n, pairs) in network_strategy()) {
        let mut mapper = PowerMapper::default();
        let analysis = mapper
            .analyze_network(&entities(n), &relationships(&pairs))
            .expect("analyze");

        if analysis.communities.community_count > 0 {
            let mut seen = BTreeSet::new();
            for community in &analysis.communities.communities {
                prop_assert_eq!(community.size, community.entities.len());
                for entity in &community.entities {
                    prop_assert!(seen.insert(entity.id.clone()));
                }
            }
            prop_assert_eq!(seen.len(), mapper.graph().node_count());
        }
    }

    /// Canonical export then import gives back the same records.
    #[test]
    fn canonical_roundtrip((n, pairs) in network_strategy()) {
        let snapshot = NetworkSnapshot::new(entities(n), relationships(&pairs));
        let bytes = export_canonical(&snapshot).expect("export");
        let imported = import_canonical(&bytes).expect("import");

        prop_assert_eq!(imported.relationships, snapshot.relationships);
        prop_assert_eq!(imported.entities.len(), snapshot.entities.len());
    }
}
