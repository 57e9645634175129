//! # Analysis Tier Tests (A0-A3)
//!
//! ## Tiers
//! - A0: Record Integrity
//! - A1: Network Construction
//! - A2: Whole-Network Analysis
//! - A3: Queries and Persistence

use krystal_core::{
    Entity, EntityId, EntityKind, KrystalError, NetworkSnapshot, PowerMapper, Relationship,
    create_sample_network, sample_entities, sample_relationships,
};

// =============================================================================
// TIER A0: RECORD INTEGRITY
// =============================================================================

mod a0_record_integrity {
    use super::*;

    /// A0.1: Records decode from the JSON shape data sources produce.
    #[test]
    fn records_decode_from_json() {
        let entities: Vec<Entity> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "Tech Giant Inc", "type": "corporation", "sector": "technology"},
                {"name": "Unnamed Lobby Group", "type": "Organization"}
            ]"#,
        )
        .expect("entities");
        let rel: Relationship = serde_json::from_str(
            r#"{"source": 1, "target": "unnamedlobbygroup", "type": "lobbying", "strength": 0.8}"#,
        )
        .expect("relationship");

        assert_eq!(entities[0].kind, EntityKind::Corporation);
        assert_eq!(entities[1].kind, EntityKind::Organization);
        assert!(entities[1].id.is_none());
        assert_eq!(rel.target, EntityId::from("unnamedlobbygroup"));
    }

    /// A0.2: A relationship without endpoints is rejected at decode time.
    #[test]
    fn relationship_requires_endpoints() {
        let result: Result<Relationship, _> = serde_json::from_str(r#"{"source": 1}"#);
        assert!(result.is_err());
    }
}

// =============================================================================
// TIER A1: NETWORK CONSTRUCTION
// =============================================================================

mod a1_network_construction {
    use super::*;

    /// A1.1: Derived ids connect relationships to unnamed entities.
    #[test]
    fn derived_ids_are_addressable() {
        let entities = vec![
            Entity::new(1, "Tech Giant Inc", EntityKind::Corporation),
            Entity {
                name: "Unnamed Lobby Group".to_string(),
                kind: EntityKind::Organization,
                ..Entity::default()
            },
        ];
        let rels = vec![Relationship::new(1, "unnamedlobbygroup", "lobbying", 0.8)];

        let mut mapper = PowerMapper::default();
        let report = mapper.load_network(&entities, &rels).expect("load");
        assert_eq!(report.relationships_added, 1);
    }

    /// A1.2: Summary counts describe the input, not the graph.
    #[test]
    fn summary_counts_input_records() {
        let mut rels = sample_relationships();
        rels.push(Relationship::new(1, 99, "dangling", 0.9));
        rels.push(Relationship::new(1, 4, "weak", 0.01));

        let mut mapper = PowerMapper::default();
        let analysis = mapper
            .analyze_network(&sample_entities(), &rels)
            .expect("analyze");

        assert_eq!(analysis.summary.relationship_count, 7);
        assert_eq!(mapper.graph().edge_count(), 5);
        assert_eq!(mapper.last_ingest().skipped(), 2);
    }

    /// A1.3: Batches above the entity limit fail as a whole.
    #[test]
    fn oversized_batch_rejected() {
        let entities: Vec<Entity> = (0..1001)
            .map(|i| Entity::new(i, format!("E{}", i), EntityKind::Person))
            .collect();
        let mut mapper = PowerMapper::default();
        let result = mapper.analyze_network(&entities, &[]);
        assert!(matches!(result, Err(KrystalError::LimitExceeded(_))));
        assert!(mapper.graph().is_empty());
    }
}

// =============================================================================
// TIER A2: WHOLE-NETWORK ANALYSIS
// =============================================================================

mod a2_analysis {
    use super::*;
    use krystal_core::Diameter;

    /// A2.1: The demonstration network is one 5-cycle.
    #[test]
    fn sample_network_shape() {
        let mut mapper = create_sample_network().expect("sample");
        let analysis = mapper.analysis().clone();

        assert_eq!(analysis.summary.entity_count, 5);
        assert_eq!(analysis.summary.relationship_count, 5);
        assert_eq!(analysis.summary.connected_components, 1);
        assert!((analysis.summary.network_density - 0.5).abs() < 1e-12);

        let structure = analysis.structural_analysis.expect("structure");
        assert_eq!(structure.diameter, Diameter::Hops(2));
        assert!((structure.average_degree - 2.0).abs() < 1e-12);
        assert_eq!(structure.average_clustering, 0.0);
        assert_eq!(structure.assortativity, None);
    }

    /// A2.2: Government carries the highest authority weight on a uniform cycle.
    #[test]
    fn sample_rankings_follow_type_multipliers() {
        let mut mapper = create_sample_network().expect("sample");
        let rankings = &mapper.analysis().influence_rankings;

        assert_eq!(rankings[0].entity.name, "Government Agency");
        let last = rankings.last().expect("non-empty");
        assert_eq!(last.entity.kind, EntityKind::Organization);
    }

    /// A2.3: Every centrality measure covers every entity.
    #[test]
    fn centrality_covers_all_entities() {
        let mut mapper = create_sample_network().expect("sample");
        let centrality = &mapper.analysis().centrality;

        assert_eq!(centrality.degree.len(), 5);
        assert_eq!(centrality.betweenness.len(), 5);
        assert_eq!(centrality.eigenvector.len(), 5);
        assert_eq!(centrality.closeness.len(), 5);
        // uniform cycle: every eigenvector entry is 1/sqrt(5)
        for score in centrality.eigenvector.values() {
            assert!((score - 1.0 / 5f64.sqrt()).abs() < 1e-6);
        }
    }

    /// A2.4: An empty network yields the insufficient-data finding only.
    #[test]
    fn empty_network_analysis() {
        let mut mapper = PowerMapper::default();
        let analysis = mapper.analyze_network(&[], &[]).expect("analyze");

        assert!(analysis.centrality.is_empty());
        assert_eq!(analysis.communities.community_count, 0);
        assert!(analysis.structural_analysis.is_none());
        assert_eq!(
            analysis.key_findings,
            vec!["Insufficient data for detailed analysis".to_string()]
        );
    }

    /// A2.5: Analysis JSON uses the documented field names.
    #[test]
    fn analysis_json_shape() {
        let mut mapper = create_sample_network().expect("sample");
        let json = serde_json::to_value(mapper.analysis()).expect("json");

        assert!(json["summary"]["network_density"].is_number());
        assert!(json["centrality"]["degree_centrality"].is_object());
        assert!(json["communities"]["communities"].is_array());
        assert!(json["influence_rankings"][0]["influence_score"].is_number());
        assert_eq!(json["structural_analysis"]["diameter"], 2);
        assert!(json["key_findings"].is_array());
    }
}

// =============================================================================
// TIER A3: QUERIES AND PERSISTENCE
// =============================================================================

mod a3_queries {
    use super::*;
    use krystal_core::{NetworkBackend, export_canonical, import_canonical};

    /// A3.1: Reloading a persisted snapshot reproduces the analysis.
    #[test]
    fn persisted_network_reanalyses_identically() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut mapper = create_sample_network().expect("sample");
        let original = mapper.analysis().clone();

        let mut backend = NetworkBackend::redb(temp.path().join("net.redb")).expect("open");
        backend.save(&mapper.snapshot()).expect("save");

        let snapshot = backend.load().expect("load");
        let mut reloaded = PowerMapper::default();
        let analysis = reloaded
            .analyze_network(&snapshot.entities, &snapshot.relationships)
            .expect("analyze");

        assert_eq!(analysis, original);
    }

    /// A3.2: Canonical bytes survive a file round trip.
    #[test]
    fn canonical_file_roundtrip() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("net.kryx");
        let snapshot = NetworkSnapshot::new(sample_entities(), sample_relationships());

        std::fs::write(&path, export_canonical(&snapshot).expect("export")).expect("write");
        let bytes = std::fs::read(&path).expect("read");
        assert_eq!(import_canonical(&bytes).expect("import"), snapshot);
    }

    /// A3.3: Neighbour and path queries agree with each other.
    #[test]
    fn neighbours_are_one_hop_paths() {
        let mapper = create_sample_network().expect("sample");
        let start = EntityId::from(3);

        for neighbor in mapper.get_entity_neighbors(&start, None) {
            let id = neighbor.entity.id.clone().expect("id");
            let paths = mapper.find_connection_paths(&start, &id, 5);
            assert!(paths.iter().any(|p| p.len() == 2));
        }
    }
}
