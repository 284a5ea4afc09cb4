//! Operator CLI: the only place master keys are ever issued.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use judge_core::domain::{NewApiKey, MAX_KEY_NAME_LEN};
use judge_core::port::token_provider::RandomTokenProvider;
use judge_core::port::{ApiKeyStore, TokenProvider};
use judge_infra_sqlite::{create_pool, run_migrations, PoolSettings, SqliteApiKeyStore};

#[derive(Parser)]
#[command(name = "judge-cli")]
#[command(about = "Judge coordinator operator CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Database the coordinator runs against
    #[arg(long, env = "DATABASE_URI")]
    database_uri: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a new api key and print it
    ApiKey {
        /// Key name (16 characters or less)
        #[arg(long)]
        name: Option<String>,

        /// Grant the jury capability
        #[arg(long)]
        jury: bool,

        /// Grant the reader capability
        #[arg(long)]
        reader: bool,

        /// Grant the master capability
        #[arg(long)]
        master: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::ApiKey {
            name,
            jury,
            reader,
            master,
        } => {
            if let Some(name) = &name {
                if name.len() > MAX_KEY_NAME_LEN {
                    bail!("Name must be 16 characters or less");
                }
            }

            let pool = create_pool(&cli.database_uri, &PoolSettings::default())
                .await
                .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
            run_migrations(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

            let store = SqliteApiKeyStore::new(pool);
            let tokens = RandomTokenProvider;

            let key = store
                .insert(NewApiKey {
                    name,
                    key: tokens.api_key(),
                    perm_jury: jury,
                    perm_reader: reader,
                    perm_master: master,
                })
                .await
                .map_err(|e| anyhow::anyhow!("Key insert failed: {}", e))?;

            println!("{}", key.key);
        }
    }

    Ok(())
}
