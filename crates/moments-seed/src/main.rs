//! Fills a database with random moments around a centre point for local
//! testing. One RNG, seeded once from `MOMENTS_SEED`, drives every draw so a
//! given seed always produces the same data set.

mod generate;

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use moments_db::Database;
use moments_types::models::Location;

use crate::generate::Generator;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moments=info".into()),
        )
        .init();

    let db_path: PathBuf = var_or("MOMENTS_DB_PATH", "moments.db").into();
    let media_dir = var_or("MOMENTS_MEDIA_DIR", "./media");
    let count: usize = var_or("MOMENTS_SEED_COUNT", "50")
        .parse()
        .context("MOMENTS_SEED_COUNT must be a number")?;
    let seed: u64 = var_or("MOMENTS_SEED", "42")
        .parse()
        .context("MOMENTS_SEED must be a number")?;
    let center = parse_center(
        &var_or("MOMENTS_SEED_LAT", "43.0"),
        &var_or("MOMENTS_SEED_LON", "-87.9"),
    )?;

    let db = Database::open(&db_path)?;
    let mut generator = Generator::new(StdRng::seed_from_u64(seed), media_dir, center, Utc::now());
    let ids = generator.fill(&db, count)?;

    info!("Seeded {} moments into {}", ids.len(), db_path.display());
    Ok(())
}

fn parse_center(lat: &str, lon: &str) -> anyhow::Result<Location> {
    let lat: f64 = lat.parse().context("MOMENTS_SEED_LAT must be a number")?;
    let lon: f64 = lon.parse().context("MOMENTS_SEED_LON must be a number")?;
    Ok(Location::new(lat, lon)?)
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_errors_name_the_variable() {
        let err = parse_center("north", "-87.9").unwrap_err();
        assert!(err.to_string().contains("MOMENTS_SEED_LAT"));

        let err = parse_center("43.0", "").unwrap_err();
        assert!(err.to_string().contains("MOMENTS_SEED_LON"));

        let center = parse_center("43.0", "-87.9").unwrap();
        assert_eq!(center.latitude(), 43.0);
        assert!(parse_center("43.0", "91.0").is_err());
    }
}
