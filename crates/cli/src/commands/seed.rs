//! Seed users and products from a YAML file.
//!
//! Records go through the same services as the HTTP API, so they are
//! validated the same way. Entries whose username or product name already
//! exists are skipped, which makes re-running a seed file harmless.
//!
//! ```yaml
//! users:
//!   - username: alice
//!     name: Alice
//!     email: alice@example.com
//!     role: buyer
//! products:
//!   - productName: Pedigree
//!     category: Pet Food
//!     price: 4.99
//!     ownerUsername: sam
//! ```

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{info, warn};

use trinity_api::config::{ApiConfig, StorageConfig};
use trinity_api::db::Stores;
use trinity_api::services::{
    NewProductInput, NewUserInput, ProductError, ProductService, UserError, UserService,
};

use super::CommandError;

/// Backend selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeedBackend {
    Json,
    Postgres,
}

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<NewUserInput>,
    #[serde(default)]
    pub products: Vec<NewProductInput>,
}

/// Counts reported after seeding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub users_skipped: usize,
    pub products_created: usize,
    pub products_skipped: usize,
}

/// Seed the configured store, or the backend chosen on the command line.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the store cannot
/// be opened, or a record fails validation.
pub async fn run(
    file: &Path,
    backend: Option<SeedBackend>,
    data_dir: Option<PathBuf>,
) -> Result<(), CommandError> {
    let configured = ApiConfig::from_env()?.storage;
    let storage = resolve_storage(configured, backend, data_dir, |key| {
        std::env::var(key).ok()
    })?;
    if matches!(storage, StorageConfig::Memory) {
        warn!("Seeding the memory backend; nothing will outlive this process");
    }

    info!(path = %file.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(file).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(
        users = seed.users.len(),
        products = seed.products.len(),
        "Parsed seed file"
    );

    let stores = Stores::connect(&storage).await?;
    let summary = seed_stores(&stores, seed).await?;

    info!("Seeding complete!");
    info!("  Users created: {}", summary.users_created);
    info!("  Users skipped (already exist): {}", summary.users_skipped);
    info!("  Products created: {}", summary.products_created);
    info!(
        "  Products skipped (already exist): {}",
        summary.products_skipped
    );
    Ok(())
}

/// Apply command-line overrides to the configured storage.
fn resolve_storage(
    configured: StorageConfig,
    backend: Option<SeedBackend>,
    data_dir: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<StorageConfig, CommandError> {
    match (backend, data_dir) {
        (Some(SeedBackend::Postgres), _) => match configured {
            StorageConfig::Postgres { .. } => Ok(configured),
            _ => lookup("TRINITY_DATABASE_URL")
                .or_else(|| lookup("DATABASE_URL"))
                .map(|url| StorageConfig::Postgres {
                    database_url: SecretString::from(url),
                })
                .ok_or(CommandError::MissingEnvVar("TRINITY_DATABASE_URL")),
        },
        (Some(SeedBackend::Json), None) => match configured {
            StorageConfig::Json { .. } => Ok(configured),
            _ => Ok(StorageConfig::Json {
                data_dir: PathBuf::from("data"),
            }),
        },
        (Some(SeedBackend::Json) | None, Some(data_dir)) => Ok(StorageConfig::Json { data_dir }),
        (None, None) => Ok(configured),
    }
}

/// Create every user, then every product, skipping existing ones.
///
/// # Errors
///
/// Returns the first error other than a name conflict.
pub async fn seed_stores(stores: &Stores, seed: SeedFile) -> Result<SeedSummary, CommandError> {
    let users = UserService::new(
        stores.users.as_ref(),
        stores.products.as_ref(),
        stores.carts.as_ref(),
    );
    let products = ProductService::new(stores.products.as_ref(), stores.users.as_ref());
    let mut summary = SeedSummary::default();

    for input in seed.users {
        let username = input.username.clone().unwrap_or_default();
        match users.create(input).await {
            Ok(_) => summary.users_created += 1,
            Err(UserError::Conflict(_)) => {
                warn!(%username, "user already exists, skipping");
                summary.users_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for input in seed.products {
        let name = input.product_name.clone().unwrap_or_default();
        match products.create(input).await {
            Ok(_) => summary.products_created += 1,
            Err(ProductError::Conflict(_)) => {
                warn!(product = %name, "product already exists, skipping");
                summary.products_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use trinity_api::db::MemoryStore;

    use super::*;

    const SEED: &str = r"
users:
  - username: alice
    name: Alice
    email: alice@example.com
    role: buyer
  - username: sam
    name: Sam
    email: sam@example.com
    role: seller
products:
  - productName: Pedigree
    category: Pet Food
    price: 4.99
    ownerUsername: sam
";

    #[tokio::test]
    async fn test_seed_is_rerunnable() {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::memory(Arc::new(MemoryStore::open(dir.path()).await.unwrap()));

        let first = seed_stores(&stores, serde_yaml::from_str(SEED).unwrap())
            .await
            .unwrap();
        assert_eq!(
            first,
            SeedSummary {
                users_created: 2,
                users_skipped: 0,
                products_created: 1,
                products_skipped: 0,
            }
        );

        let second = seed_stores(&stores, serde_yaml::from_str(SEED).unwrap())
            .await
            .unwrap();
        assert_eq!(second.users_skipped, 2);
        assert_eq!(second.products_skipped, 1);

        let reopened = MemoryStore::open(dir.path()).await.unwrap();
        let reopened = Stores::memory(Arc::new(reopened));
        assert_eq!(reopened.users.list_users().await.unwrap().len(), 2);
        assert_eq!(reopened.products.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_rejects_invalid_record() {
        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let seed: SeedFile = serde_yaml::from_str(
            "users:\n  - username: bob\n    name: Bob\n    email: bob@example.com\n    role: admin\n",
        )
        .unwrap();

        let err = seed_stores(&stores, seed).await.unwrap_err();
        assert!(matches!(err, CommandError::User(UserError::Invalid(_))));
    }

    #[test]
    fn test_resolve_storage() {
        let no_env = |_: &str| -> Option<String> { None };

        let storage = resolve_storage(StorageConfig::Memory, None, None, no_env).unwrap();
        assert!(matches!(storage, StorageConfig::Memory));

        let storage = resolve_storage(
            StorageConfig::Memory,
            None,
            Some(PathBuf::from("fixtures")),
            no_env,
        )
        .unwrap();
        assert!(
            matches!(storage, StorageConfig::Json { ref data_dir } if data_dir == &PathBuf::from("fixtures"))
        );

        let storage =
            resolve_storage(StorageConfig::Memory, Some(SeedBackend::Json), None, no_env).unwrap();
        assert!(matches!(storage, StorageConfig::Json { .. }));

        let err = resolve_storage(StorageConfig::Memory, Some(SeedBackend::Postgres), None, no_env)
            .unwrap_err();
        assert!(matches!(err, CommandError::MissingEnvVar(_)));

        let storage = resolve_storage(
            StorageConfig::Memory,
            Some(SeedBackend::Postgres),
            None,
            |key: &str| (key == "DATABASE_URL").then(|| "postgres://localhost/trinity".to_owned()),
        )
        .unwrap();
        assert!(matches!(storage, StorageConfig::Postgres { .. }));
    }

    #[test]
    fn test_empty_seed_file() {
        let seed: SeedFile = serde_yaml::from_str("{}").unwrap();
        assert!(seed.users.is_empty());
        assert!(seed.products.is_empty());
    }
}
