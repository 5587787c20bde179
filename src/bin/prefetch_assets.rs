use std::path::PathBuf;

use anyhow::{Context, Result};

use cmk_tipping::asset_cache::{self, AssetCache, CacheStore, HttpAssetFetcher, PRECACHE_ASSETS};
use cmk_tipping::config::ClientConfig;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = ClientConfig::from_env();

    let db_path = parse_db_path_arg()
        .or_else(asset_cache::default_db_path)
        .context("unable to resolve sqlite path")?;

    let store = CacheStore::open(&db_path)?;
    let fetcher = HttpAssetFetcher::new(&config.base_url, config.http_timeout)?;
    let mut cache = AssetCache::new(store, fetcher);

    let stored = cache
        .install()
        .with_context(|| format!("precache from {}", config.base_url))?;
    let removed = cache.activate()?;

    println!("Asset prefetch complete");
    println!("DB: {}", db_path.display());
    println!("Cache: {}", cache.name());
    println!("Assets stored: {stored}/{}", PRECACHE_ASSETS.len());
    if !removed.is_empty() {
        println!("Old caches removed: {}", removed.join(", "));
    }

    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
