//! Startup guest list import.
//!
//! Reads a YAML file of guests and creates them through the directory, so
//! every seeded guest gets a derived, unique slug exactly as if an
//! administrator had added it. Seeding only runs against an empty directory.
use crate::directory::{DirectoryError, GuestDirectory, NewGuest};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    guests: Vec<SeedGuest>,
}

#[derive(Debug, Deserialize)]
struct SeedGuest {
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    plus_one: bool,
}

/// Load `path` into `directory`. Returns how many guests were created.
pub async fn seed_from_file(directory: &GuestDirectory, path: &Path) -> Result<usize> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read seed file {}", path.display()))?;
    seed_from_yaml(directory, &contents)
        .await
        .with_context(|| format!("seed guests from {}", path.display()))
}

pub async fn seed_from_yaml(directory: &GuestDirectory, contents: &str) -> Result<usize> {
    let seed: SeedFile = serde_yaml::from_str(contents).context("parse seed yaml")?;
    if !directory.list_guests().await?.is_empty() {
        tracing::info!("guest directory already populated; skipping seed");
        return Ok(0);
    }
    let mut created = 0;
    for guest in seed.guests {
        let name = guest.name.clone();
        let result = directory
            .create_guest(NewGuest {
                name: guest.name,
                email: guest.email,
                plus_one: guest.plus_one,
            })
            .await;
        match result {
            Ok(_) => created += 1,
            Err(
                err @ (DirectoryError::SlugTaken(_)
                | DirectoryError::Slug(_)
                | DirectoryError::Validation(_)),
            ) => {
                tracing::warn!(name = %name, error = %err, "skipping seed guest");
            }
            Err(err) => return Err(err.into()),
        }
    }
    tracing::info!(created, "seeded guest directory");
    Ok(created)
}
