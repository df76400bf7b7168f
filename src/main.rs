//! Advisory Vault - CLI
//!
//! Command-line interface for the credential vault and advisory delivery.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;

use advisory_vault::store::{FsBlobStore, FsKvStore, MemoryKeyDirectory, RecordingSink};
use advisory_vault::{
    logging, Account, AdvisoryDocument, AdvisoryReader, AppConfig, ConfidentialPublisher,
    ContractEntry, KeyPairManager, PublicationRecord, SealedEnvelope, Vault, VaultSession,
};

#[derive(Parser)]
#[command(name = "advisory-vault")]
#[command(author = "ALFA SYSTEM")]
#[command(version = advisory_vault::VERSION)]
#[command(about = "Advisory Vault - confidential security advisories and a local credential vault")]
struct Cli {
    /// Config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PasswordArg {
    /// Vault password (prompted when omitted)
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an RSA-3072 key pair as PEM files
    Keygen {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Set the first vault password
    Init {
        #[command(flatten)]
        password: PasswordArg,
    },

    /// Check the vault password
    Unlock {
        #[command(flatten)]
        password: PasswordArg,
    },

    /// Manage stored accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Manage followed contracts
    Contract {
        #[command(subcommand)]
        action: ContractAction,
    },

    /// Seal a document for a recipient and store the ciphertext
    Seal {
        /// Document to seal
        input: PathBuf,

        /// Recipient public key (PEM)
        #[arg(short, long)]
        recipient: PathBuf,

        /// Write the publication record here instead of stdout
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Fetch and open a sealed document
    Open {
        /// Publication record (JSON)
        record: PathBuf,

        /// Private key (PEM)
        #[arg(long, conflicts_with = "contract")]
        private_key: Option<PathBuf>,

        /// Use the key pair stored with this confidential contract
        #[arg(long)]
        contract: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        password: PasswordArg,
    },

    /// Print per-product status for an advisory document
    Advisory {
        /// CSAF JSON document
        path: PathBuf,

        /// Only this product id
        #[arg(long)]
        product: Option<String>,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    Add {
        #[arg(long)]
        label: String,
        #[arg(long)]
        address: String,
        /// Private key (prompted when omitted)
        #[arg(long)]
        private_key: Option<String>,
        #[command(flatten)]
        password: PasswordArg,
    },
    List {
        #[command(flatten)]
        password: PasswordArg,
    },
}

#[derive(Subcommand)]
enum ContractAction {
    Add {
        #[arg(long)]
        address: String,
        #[arg(long)]
        name: String,
        /// Generate and store a recipient key pair for this contract
        #[arg(long)]
        confidential: bool,
        #[command(flatten)]
        password: PasswordArg,
    },
    List {
        #[command(flatten)]
        password: PasswordArg,
    },
    Remove {
        address: String,
        #[command(flatten)]
        password: PasswordArg,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    // Logging is best-effort for the CLI
    let _ = logging::init(&config.log);

    match cli.command {
        Commands::Keygen { out } => {
            println!("🔑 Generating RSA-3072 key pair...");
            let pair = KeyPairManager::generate_key_pair_async().await?;

            std::fs::create_dir_all(&out)?;
            let public_path = out.join("public.pem");
            let private_path = out.join("private.pem");
            std::fs::write(&public_path, KeyPairManager::export_public_key_pem(&pair.public_key)?)?;
            std::fs::write(
                &private_path,
                KeyPairManager::export_private_key_pem(&pair.private_key)?.as_bytes(),
            )?;

            println!("✅ Public key:  {}", public_path.display());
            println!("✅ Private key: {}", private_path.display());
        }

        Commands::Init { password } => {
            let vault = open_vault(&config);
            let password = read_password(password, true)?;
            println!("🔐 Initializing vault...");
            vault.initialize_async(password).await?;
            println!("✅ Vault created at: {}", config.vault_dir().display());
        }

        Commands::Unlock { password } => {
            let session = unlock(&config, password).await?;
            println!("✅ Vault unlocked!");
            println!("   Accounts:  {}", session.accounts()?.len());
            println!("   Contracts: {}", session.contracts()?.len());
        }

        Commands::Account { action } => match action {
            AccountAction::Add {
                label,
                address,
                private_key,
                password,
            } => {
                let session = unlock(&config, password).await?;
                let private_key = match private_key {
                    Some(key) => key,
                    None => rpassword::prompt_password("Account private key: ")?,
                };
                session.add_account(Account {
                    label,
                    address: address.clone(),
                    private_key,
                })?;
                println!("✅ Account {} stored", address);
            }
            AccountAction::List { password } => {
                let session = unlock(&config, password).await?;
                let accounts = session.accounts()?;
                if accounts.is_empty() {
                    println!("📭 No accounts in vault");
                } else {
                    println!("👛 Accounts ({}):", accounts.len());
                    println!("{:-<60}", "");
                    for account in &accounts {
                        println!("{:<20} {}", account.label, account.address);
                    }
                }
            }
        },

        Commands::Contract { action } => match action {
            ContractAction::Add {
                address,
                name,
                confidential,
                password,
            } => {
                let session = unlock(&config, password).await?;
                let entry = if confidential {
                    println!("🔑 Generating recipient key pair...");
                    let pair = KeyPairManager::generate_key_pair_async().await?;
                    println!("{}", KeyPairManager::export_public_key_pem(&pair.public_key)?);
                    ContractEntry::confidential(&address, name, &pair)?
                } else {
                    ContractEntry::public(&address, name)
                };
                session.add_contract(entry)?;
                println!("✅ Contract {} stored", address);
            }
            ContractAction::List { password } => {
                let session = unlock(&config, password).await?;
                let contracts = session.contracts()?;
                if contracts.is_empty() {
                    println!("📭 No contracts in vault");
                } else {
                    println!("📜 Contracts ({}):", contracts.len());
                    println!("{:-<60}", "");
                    for contract in &contracts {
                        let lock = if contract.is_confidential() { "🔒" } else { "  " };
                        println!(
                            "{} {:<44} {} ({})",
                            lock,
                            contract.address,
                            contract.name,
                            contract.added_at.format("%Y-%m-%d")
                        );
                    }
                }
            }
            ContractAction::Remove { address, password } => {
                let session = unlock(&config, password).await?;
                if session.remove_contract(&address)? {
                    println!("🗑️ Contract {} removed", address);
                } else {
                    bail!("no contract with address {}", address);
                }
            }
        },

        Commands::Seal {
            input,
            recipient,
            record,
        } => {
            let pem = std::fs::read_to_string(&recipient)
                .with_context(|| format!("reading {}", recipient.display()))?;
            let public_key = KeyPairManager::import_public_key_pem(&pem)?;
            let document = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            // The recipient key comes from a file, the record goes to stdout
            let directory = Arc::new(MemoryKeyDirectory::new());
            directory.register("recipient", KeyPairManager::export_public_key(&public_key)?);
            let sink = Arc::new(RecordingSink::new());
            let publisher = ConfidentialPublisher::new(
                Arc::new(FsBlobStore::new(config.blob_dir())),
                directory,
                sink.clone(),
            );

            println!("🔐 Sealing {}...", input.display());
            let envelope = publisher.publish_confidential("recipient", document).await?;
            let json = serde_json::to_string_pretty(&envelope.to_record())?;

            match record {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("✅ Record written to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Open {
            record,
            private_key,
            contract,
            output,
            password,
        } => {
            let raw = std::fs::read_to_string(&record)
                .with_context(|| format!("reading {}", record.display()))?;
            let record: PublicationRecord = serde_json::from_str(&raw)?;
            let envelope = SealedEnvelope::from_record(&record)?;

            let key = match (private_key, contract) {
                (Some(path), _) => {
                    let pem = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    KeyPairManager::import_private_key_pem(&pem)?
                }
                (None, Some(address)) => {
                    let session = unlock(&config, password).await?;
                    let entry = session
                        .find_contract(&address)?
                        .with_context(|| format!("no contract with address {}", address))?;
                    let stored = entry
                        .key_pair
                        .with_context(|| format!("contract {} is not confidential", address))?;
                    stored.to_key_pair()?.private_key
                }
                (None, None) => bail!("pass --private-key or --contract"),
            };

            let reader = AdvisoryReader::new(Arc::new(FsBlobStore::new(config.blob_dir())));
            let plaintext = reader.fetch_confidential(&envelope, &key).await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, plaintext.as_slice())?;
                    println!("✅ Verified document written to: {}", path.display());
                }
                None => println!("{}", String::from_utf8_lossy(&plaintext)),
            }
        }

        Commands::Advisory { path, product } => {
            let bytes =
                std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let doc = AdvisoryDocument::parse(&bytes)?;
            print_advisory(&doc, product.as_deref());
        }
    }

    Ok(())
}

fn open_vault(config: &AppConfig) -> Vault<FsKvStore> {
    Vault::new(FsKvStore::new(config.vault_dir()))
}

async fn unlock(config: &AppConfig, password: PasswordArg) -> Result<VaultSession<FsKvStore>> {
    let vault = open_vault(config);
    let password = read_password(password, false)?;
    Ok(vault.unlock_async(password).await?)
}

fn read_password(arg: PasswordArg, confirm: bool) -> Result<SecretString> {
    if let Some(password) = arg.password {
        return non_empty(password);
    }

    let first = rpassword::prompt_password("Vault password: ")?;
    if confirm {
        let second = rpassword::prompt_password("Repeat password: ")?;
        if first != second {
            bail!("passwords do not match");
        }
    }
    non_empty(first)
}

fn non_empty(password: String) -> Result<SecretString> {
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(SecretString::from(password))
}

fn print_advisory(doc: &AdvisoryDocument, only: Option<&str>) {
    println!("📄 {}", doc.title());
    println!("   Severity: {}", doc.severity());
    println!("   {}", doc.description());
    println!("{:-<80}", "");

    let records = match only {
        Some(id) => doc.get_product_information(id),
        None => doc.get_all_product_information(),
    };

    if records.is_empty() {
        println!("📭 No product status entries");
        return;
    }

    for info in &records {
        let score = info
            .cvss_score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<28} {:<16} {:<20} {:<5} {}",
            info.full_name, info.vulnerability_id, info.status, score, info.identifier
        );
        for remediation in &info.remediations {
            match &remediation.url {
                Some(url) => println!("   ↳ {} ({})", remediation.details, url),
                None => println!("   ↳ {}", remediation.details),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_password_flag_rejected() {
        let arg = PasswordArg {
            password: Some(String::new()),
        };
        let err = read_password(arg, true).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_password_flag_used_as_given() {
        let arg = PasswordArg {
            password: Some("hunter2".into()),
        };
        let password = read_password(arg, false).unwrap();
        assert_eq!(password.expose_secret(), "hunter2");
    }
}
