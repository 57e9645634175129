//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Context;
use crate::api::{self, AppState};
use crate::investigate::investigate;
use crate::sources::DataSources;
use krystal_core::{
    EntityId, KrystalError, NetworkAnalysis, NetworkBackend, NetworkExport, NetworkSnapshot,
    PowerMapper, canonical_checksum, canonical_crypto_hash, export_canonical, import_canonical,
    primitives::{MAX_ENTITIES_PER_QUERY, MAX_PATHS_LIMIT},
    sample_entities, sample_relationships, verify_canonical,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a JSON network document (100 MB).
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum size of an import file (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Rows shown in human-readable rankings.
const TOP_N: usize = 10;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), KrystalError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| KrystalError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(KrystalError::LimitExceeded(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path: it must exist and be a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, KrystalError> {
    let canonical = path.canonicalize().map_err(|e| {
        KrystalError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(KrystalError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, KrystalError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        KrystalError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(KrystalError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| KrystalError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: Context<'_>, host: &str, port: u16) -> Result<(), KrystalError> {
    let backend = open_backend(ctx)?;
    let mapper = load_mapper(ctx, &backend)?;
    let sources = DataSources::from_config(&ctx.config.sources);

    println!("Krystal Power Mapping Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend.name());
    println!("  Database: {:?}", ctx.database);
    println!("  Entities: {}", mapper.graph().node_count());
    println!();
    println!("Endpoints:");
    println!("  GET  /health          - Health check");
    println!("  GET  /status          - Network status");
    println!("  POST /network         - Load and analyse a network");
    println!("  GET  /analysis        - Full analysis");
    println!("  GET  /influence/{{id}}  - Influence score");
    println!("  POST /paths           - Connection paths");
    println!("  POST /neighbors       - Entity neighbours");
    println!("  GET  /export          - Export network");
    println!("  GET  /hash            - BLAKE3 hash");
    println!("  POST /investigate     - Investigate a news query");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(mapper, sources).with_backend(backend);
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show network status.
pub fn cmd_status(ctx: Context<'_>) -> Result<(), KrystalError> {
    let backend = open_backend(ctx)?;
    let mapper = load_mapper(ctx, &backend)?;
    let graph = mapper.graph();
    let components = graph.connected_components().len();
    let (stored_entities, stored_relationships) = backend.counts()?;

    if ctx.json_mode {
        let output = serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "backend": backend.name(),
            "stored_entities": stored_entities,
            "stored_relationships": stored_relationships,
            "entity_count": graph.node_count(),
            "relationship_count": mapper.relationships().len(),
            "edge_count": graph.edge_count(),
            "network_density": graph.density(),
            "connected_components": components,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Krystal Network Status");
    println!("======================");
    println!("Database: {:?}", ctx.database);
    println!("Backend:  {}", backend.name());
    println!(
        "Stored:   {} entities, {} relationships",
        stored_entities, stored_relationships
    );
    println!();
    println!("Entities:      {}", graph.node_count());
    println!("Relationships: {}", mapper.relationships().len());
    println!("Edges:         {}", graph.edge_count());
    println!("Density:       {:.4}", graph.density());
    println!("Components:    {}", components);

    Ok(())
}

// =============================================================================
// LOAD / ANALYZE COMMANDS
// =============================================================================

/// Replace the stored network with a JSON document, or add it with `append`.
pub fn cmd_load(ctx: Context<'_>, file: &Path, append: bool) -> Result<(), KrystalError> {
    tracing::info!(append, "Loading network from {:?}", file);

    let snapshot = read_network_document(file)?;
    let mut backend = open_backend(ctx)?;
    let mut mapper = PowerMapper::new(ctx.config.analysis_config());
    let report = mapper.load_network(&snapshot.entities, &snapshot.relationships)?;
    if append {
        backend.append(&mapper.snapshot())?;
    } else {
        backend.save(&mapper.snapshot())?;
    }
    let (stored_entities, stored_relationships) = backend.counts()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "appended": append,
            "ingest": report,
            "stored_entities": stored_entities,
            "stored_relationships": stored_relationships,
        }));
        return Ok(());
    }

    if append {
        println!(
            "Appended {} entities and {} relationships",
            snapshot.entities.len(),
            snapshot.relationships.len()
        );
    } else {
        println!(
            "Loaded {} entities and {} relationships",
            report.entities_added, report.relationships_added
        );
        if report.skipped() > 0 {
            println!("Skipped {} relationships", report.skipped());
        }
    }
    println!(
        "Stored network: {} entities, {} relationships",
        stored_entities, stored_relationships
    );
    Ok(())
}

/// Analyse the stored network, or a JSON file without storing it.
pub fn cmd_analyze(ctx: Context<'_>, file: Option<&Path>) -> Result<(), KrystalError> {
    let mut mapper = match file {
        Some(path) => {
            let snapshot = read_network_document(path)?;
            let mut mapper = PowerMapper::new(ctx.config.analysis_config());
            mapper.load_network(&snapshot.entities, &snapshot.relationships)?;
            mapper
        }
        None => {
            let backend = open_backend(ctx)?;
            load_mapper(ctx, &backend)?
        }
    };

    let analysis = mapper.analysis();
    if ctx.json_mode {
        print_json(analysis);
    } else {
        print_analysis(analysis);
    }
    Ok(())
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Influence score of one entity.
pub fn cmd_influence(ctx: Context<'_>, entity: &str) -> Result<(), KrystalError> {
    let backend = open_backend(ctx)?;
    let mapper = load_mapper(ctx, &backend)?;
    let id = EntityId::new(entity);
    let found = mapper.graph().contains(&id);
    let score = mapper.calculate_influence(&id);

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "entity_id": id,
            "found": found,
            "influence_score": score,
        }));
    } else if found {
        println!("Influence of {}: {:.2}", id, score);
    } else {
        println!("Entity {} not found", id);
    }
    Ok(())
}

/// Connection paths between two entities.
pub fn cmd_paths(ctx: Context<'_>, from: &str, to: &str, max: usize) -> Result<(), KrystalError> {
    if max > MAX_PATHS_LIMIT {
        return Err(KrystalError::LimitExceeded(format!(
            "max {} exceeds maximum {}",
            max, MAX_PATHS_LIMIT
        )));
    }

    let backend = open_backend(ctx)?;
    let mapper = load_mapper(ctx, &backend)?;
    let paths = mapper.find_connection_paths(&EntityId::new(from), &EntityId::new(to), max);

    if ctx.json_mode {
        print_json(&paths);
        return Ok(());
    }

    if paths.is_empty() {
        println!("No path found from {} to {}", from, to);
        return Ok(());
    }
    println!("Connection paths {} -> {}:", from, to);
    for (i, path) in paths.iter().enumerate() {
        let names: Vec<String> = path.iter().map(|e| e.display_name()).collect();
        println!("  {}. {}", i + 1, names.join(" -> "));
    }
    Ok(())
}

/// Neighbours of an entity.
pub fn cmd_neighbors(
    ctx: Context<'_>,
    entity: &str,
    relationship_type: Option<&str>,
) -> Result<(), KrystalError> {
    let backend = open_backend(ctx)?;
    let mapper = load_mapper(ctx, &backend)?;
    let id = EntityId::new(entity);
    let neighbors = mapper.get_entity_neighbors(&id, relationship_type);

    if ctx.json_mode {
        print_json(&neighbors);
        return Ok(());
    }

    if !mapper.graph().contains(&id) {
        println!("Entity {} not found", id);
        return Ok(());
    }
    println!("Neighbours of {} ({}):", id, neighbors.len());
    for neighbor in &neighbors {
        println!(
            "  {} [{}] via {} (strength {:.2})",
            neighbor.entity.display_name(),
            neighbor.entity.kind,
            neighbor.relationship.kind.as_deref().unwrap_or("unknown"),
            neighbor.relationship.strength()
        );
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Export the network.
pub fn cmd_export(ctx: Context<'_>, output: &Path, format: &str) -> Result<(), KrystalError> {
    let validated_output = validate_output_path(output)?;

    let backend = open_backend(ctx)?;
    let mapper = load_mapper(ctx, &backend)?;

    let data = match format {
        "canonical" => {
            let snapshot = mapper.snapshot();
            let data = export_canonical(&snapshot)?;
            println!("Checksum: {}", canonical_checksum(&snapshot)?);
            data
        }
        other => mapper
            .export_network_data(other, &chrono::Utc::now().to_rfc3339())?
            .into_bytes(),
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| KrystalError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Import a network from a canonical or JSON file, replacing the stored one.
///
/// A file starting with `{` is read as a JSON export; anything else must be
/// a valid canonical file.
pub fn cmd_import(ctx: Context<'_>, input: &Path) -> Result<(), KrystalError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| KrystalError::IoError(format!("Read file: {}", e)))?;

    let is_json = data
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');

    let snapshot = if is_json {
        let text = std::str::from_utf8(&data)
            .map_err(|e| KrystalError::DeserializationError(e.to_string()))?;
        NetworkExport::from_json(text)?.into_snapshot()
    } else {
        import_canonical(&data)?
    };

    let mut backend = open_backend(ctx)?;
    backend.save(&snapshot)?;

    if !is_json && !verify_canonical(&backend.load()?, &data)? {
        return Err(KrystalError::IoError(
            "Stored network does not match the imported file".to_string(),
        ));
    }

    println!(
        "Imported network: {} entities, {} relationships",
        snapshot.entities.len(),
        snapshot.relationships.len()
    );
    Ok(())
}

// =============================================================================
// INIT / SAMPLE COMMANDS
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(ctx: Context<'_>, force: bool) -> Result<(), KrystalError> {
    if ctx.database.exists() && !force {
        return Err(KrystalError::IoError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    let mut backend = open_backend(ctx)?;
    backend.clear()?;
    backend.save(&NetworkSnapshot::default())?;
    println!(
        "Initialized new {} database at {:?}",
        backend.name(),
        ctx.database
    );
    Ok(())
}

/// Store the built-in sample network and print its analysis.
pub fn cmd_sample(ctx: Context<'_>) -> Result<(), KrystalError> {
    let mut mapper = PowerMapper::new(ctx.config.analysis_config());
    mapper.load_network(&sample_entities(), &sample_relationships())?;
    let mut backend = open_backend(ctx)?;
    backend.save(&mapper.snapshot())?;

    let analysis = mapper.analysis();
    if ctx.json_mode {
        print_json(analysis);
    } else {
        print_analysis(analysis);
    }
    Ok(())
}

// =============================================================================
// DATA SOURCE COMMANDS
// =============================================================================

/// Search LittleSis for entities.
pub async fn cmd_search(
    ctx: Context<'_>,
    query: &str,
    page: u32,
    per_page: u32,
) -> Result<(), KrystalError> {
    let sources = DataSources::from_config(&ctx.config.sources);
    let entities = sources
        .littlesis
        .search_entities(query, page, per_page)
        .await;

    if ctx.json_mode {
        print_json(&entities);
        return Ok(());
    }

    if !sources.littlesis.is_api_available() {
        println!("(LittleSis API key not configured, showing sample data)");
    }
    println!("Entities matching '{}' ({}):", query, entities.len());
    for entity in &entities {
        let id = entity.id.as_ref().map(EntityId::as_str).unwrap_or("-");
        println!("  [{}] {} ({})", id, entity.display_name(), entity.kind);
    }
    Ok(())
}

/// Search news articles.
pub async fn cmd_news(
    ctx: Context<'_>,
    query: &str,
    max: usize,
    language: &str,
) -> Result<(), KrystalError> {
    let sources = DataSources::from_config(&ctx.config.sources);
    let articles = sources.news.search_news(query, max, language).await;

    if ctx.json_mode {
        print_json(&articles);
        return Ok(());
    }

    if !sources.news.is_api_available() {
        println!("(News API key not configured, showing sample data)");
    }
    for article in &articles {
        println!("{}", article.title);
        println!("  {} | {}", article.source, article.published_at);
        if !article.url.is_empty() {
            println!("  {}", article.url);
        }
        if !article.entities.is_empty() {
            println!("  Mentions: {}", article.entities.join(", "));
        }
    }
    Ok(())
}

/// Show trending news topics.
pub async fn cmd_trending(ctx: Context<'_>, category: &str) -> Result<(), KrystalError> {
    let sources = DataSources::from_config(&ctx.config.sources);
    let topics = sources.news.get_trending_topics(category).await;

    if ctx.json_mode {
        print_json(&topics);
        return Ok(());
    }

    println!("Trending in {}:", category);
    for topic in &topics {
        match (&topic.volume, &topic.sentiment) {
            (Some(volume), Some(sentiment)) => {
                println!("  {} (volume {}, {})", topic.title, volume, sentiment)
            }
            _ => println!("  {}", topic.title),
        }
    }
    Ok(())
}

/// Funding of a candidate or totals of an organization.
pub async fn cmd_funding(
    ctx: Context<'_>,
    candidate: Option<&str>,
    organization: Option<&str>,
    cycle: &str,
) -> Result<(), KrystalError> {
    let sources = DataSources::from_config(&ctx.config.sources);
    let client = &sources.opensecrets;

    if let Some(org_id) = organization {
        let summary = client
            .get_organization_summary(org_id)
            .await
            .ok_or_else(|| KrystalError::EntityNotFound(EntityId::new(org_id)))?;
        if ctx.json_mode {
            print_json(&summary);
        } else {
            println!("{} ({})", summary.name, summary.org_id);
            println!("  Lobbying:      ${}", summary.total_lobbying);
            println!("  Contributions: ${}", summary.total_contributions);
        }
        return Ok(());
    }

    let candidate_id = candidate.ok_or_else(|| {
        KrystalError::InvalidEntity("either --candidate or --organization is required".to_string())
    })?;
    let funding = client
        .get_candidate_funding(candidate_id, cycle)
        .await
        .ok_or_else(|| KrystalError::EntityNotFound(EntityId::new(candidate_id)))?;

    if ctx.json_mode {
        print_json(&funding);
        return Ok(());
    }
    println!(
        "Candidate {} ({} cycle): ${} raised",
        funding.candidate_id, funding.cycle, funding.total_raised
    );
    for contributor in &funding.top_contributors {
        println!("  {:<40} ${}", contributor.name, contributor.amount);
    }
    Ok(())
}

/// Build a network from a news query and store it.
pub async fn cmd_investigate(ctx: Context<'_>, query: &str) -> Result<(), KrystalError> {
    let sources = DataSources::from_config(&ctx.config.sources);
    let mut backend = open_backend(ctx)?;
    let mut mapper = PowerMapper::new(ctx.config.analysis_config());

    let result = investigate(&sources, &mut mapper, query).await?;
    backend.save(&mapper.snapshot())?;

    if ctx.json_mode {
        print_json(&result);
        return Ok(());
    }

    println!("Investigation: {}", result.query);
    println!("Lead article: {}", result.article.title);
    if !result.article.url.is_empty() {
        println!("  {}", result.article.url);
    }
    println!();
    print_analysis(&result.analysis);
    Ok(())
}

// =============================================================================
// HASH / CONFIG COMMANDS
// =============================================================================

/// Compute the BLAKE3 hash of the canonical export.
pub fn cmd_hash(ctx: Context<'_>) -> Result<(), KrystalError> {
    let backend = open_backend(ctx)?;
    let snapshot = load_mapper(ctx, &backend)?.snapshot();
    let hash = canonical_crypto_hash(&snapshot)?;
    let checksum = canonical_checksum(&snapshot)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "hash": hash,
            "algorithm": "blake3",
            "checksum": checksum,
            "entity_count": snapshot.entities.len(),
            "relationship_count": snapshot.relationships.len(),
        }));
        return Ok(());
    }

    println!("BLAKE3:   {}", hash);
    println!("Checksum: {}", checksum);
    Ok(())
}

// =============================================================================
// MAINTENANCE COMMANDS
// =============================================================================

/// Compact the database.
pub fn cmd_compact(ctx: Context<'_>) -> Result<(), KrystalError> {
    let mut backend = open_backend(ctx)?;
    let compacted = backend.compact()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "backend": backend.name(),
            "compacted": compacted,
        }));
    } else if compacted {
        println!("Compacted {} database at {:?}", backend.name(), ctx.database);
    } else {
        println!("Nothing to compact in {} database", backend.name());
    }
    Ok(())
}

/// Print the effective configuration with keys masked.
///
/// Always JSON: the configuration is a nested document either way.
pub fn cmd_config(ctx: Context<'_>) -> Result<(), KrystalError> {
    print_json(&ctx.config.masked());
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured storage backend.
pub fn open_backend(ctx: Context<'_>) -> Result<NetworkBackend, KrystalError> {
    match ctx.backend {
        "redb" => NetworkBackend::redb(ctx.database),
        "file" => Ok(NetworkBackend::file(ctx.database)),
        other => Err(KrystalError::UnsupportedFormat(format!(
            "backend '{}'. Use: redb, file",
            other
        ))),
    }
}

/// Build a mapper holding the persisted network.
pub fn load_mapper(
    ctx: Context<'_>,
    backend: &NetworkBackend,
) -> Result<PowerMapper, KrystalError> {
    let snapshot = backend.load()?;
    let mut mapper = PowerMapper::new(ctx.config.analysis_config());
    if !snapshot.is_empty() {
        mapper.load_network(&snapshot.entities, &snapshot.relationships)?;
    }
    Ok(mapper)
}

/// Read a JSON network document from disk.
fn read_network_document(path: &Path) -> Result<NetworkSnapshot, KrystalError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, MAX_INPUT_FILE_SIZE)?;

    let text = std::fs::read_to_string(&validated_path)
        .map_err(|e| KrystalError::IoError(format!("Read file: {}", e)))?;
    let snapshot = NetworkExport::from_json(&text)?.into_snapshot();

    if snapshot.entities.len() > MAX_ENTITIES_PER_QUERY {
        return Err(KrystalError::LimitExceeded(format!(
            "Entity count {} exceeds maximum {}",
            snapshot.entities.len(),
            MAX_ENTITIES_PER_QUERY
        )));
    }
    Ok(snapshot)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_analysis(analysis: &NetworkAnalysis) {
    let summary = &analysis.summary;
    println!("Network Analysis");
    println!("================");
    println!("Entities:      {}", summary.entity_count);
    println!("Relationships: {}", summary.relationship_count);
    println!("Density:       {:.4}", summary.network_density);
    println!("Components:    {}", summary.connected_components);
    println!(
        "Communities:   {} (modularity {:.3})",
        analysis.communities.community_count, analysis.communities.modularity
    );

    if !analysis.influence_rankings.is_empty() {
        println!();
        println!("Most influential:");
        for (rank, entry) in analysis.influence_rankings.iter().take(TOP_N).enumerate() {
            println!(
                "  {:>2}. {:<40} {:>6.2}",
                rank + 1,
                entry.entity.display_name(),
                entry.influence_score
            );
        }
    }

    if !analysis.key_findings.is_empty() {
        println!();
        println!("Key findings:");
        for finding in &analysis.key_findings {
            println!("  - {}", finding);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
