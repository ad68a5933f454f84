//! Strata Runtime
//!
//! Boots the identity layer and the asset database from a settings file.
//! Usage: `strata [settings.json]`

use anyhow::{Context, Result};
use strata_asset::{AssetDatabase, AssetTypeRegistry, SourceRoot};
use strata_core::{Scene, UuidRegistry};
use strata_services::Settings;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Strata v{}", strata_core::VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path).with_context(|| format!("loading settings from {path}"))?,
        None => Settings::default(),
    };

    let mut scene = Scene::new(settings.pool, UuidRegistry::new(settings.uuid));
    let world = scene.create_object("World")?;
    tracing::info!("Scene ready, root object {}", world.uuid());

    let mut assets = AssetDatabase::new(
        settings.assets.clone(),
        AssetTypeRegistry::with_builtin(),
        UuidRegistry::new(settings.uuid),
    );
    let kinds = assets.configured_kinds();
    if kinds.is_empty() {
        tracing::warn!("No asset sources configured");
    }

    let report = assets.build_vfs(&kinds).context("building asset sources")?;
    tracing::info!("Found {} assets", report.added);

    for kind in kinds {
        let imported = assets.import_pending(kind)?;
        let source = assets.source(kind);
        let database = source.table(SourceRoot::Database).map_or(0, |table| table.len());
        tracing::info!(
            "{}: {} assets ({} in database root), {} imported",
            kind.name(),
            source.len(),
            database,
            imported
        );
    }

    tracing::info!("Runtime initialized successfully");
    Ok(())
}
