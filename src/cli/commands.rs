//! CLI commands and argument parsing

use crate::auth::AuthProviderFactory;
use crate::certificate::{csr_to_pem, CertificateOperations};
use crate::client::{Attributes, KeyVaultClient};
use crate::config::{init_default_config, Config};
use crate::error::{KeyVaultClientError, Result};
use crate::identifier::{
    parse_certificate_identifier, parse_certificate_operation_identifier, parse_issuer_identifier,
    parse_key_identifier, parse_secret_identifier, ObjectIdentifier,
};
use crate::key::KeyOperations;
use crate::secret::{SecretOperations, SecretSetParameters};
use crate::utils::format::{OutputFormat, TableFormatter};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

#[derive(Parser)]
#[command(name = "kvc")]
#[command(about = "Command-line client for the Azure Key Vault REST API")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Vault base URL, e.g. https://myvault.vault.azure.net
    #[arg(long, global = true, env = "KVC_VAULT_URL")]
    pub vault: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Credential type to use (default, clientsecret, static)
    #[arg(long, global = true, value_name = "TYPE")]
    pub credential_type: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the signing request of a pending certificate
    Csr {
        /// Certificate name
        name: String,
        /// Wrap the request in PEM armor
        #[arg(long)]
        pem: bool,
    },
    /// Secret commands
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
    /// Key commands
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Certificate commands
    #[command(alias = "cert")]
    Certificate {
        #[command(subcommand)]
        command: CertificateCommands,
    },
    /// Certificate issuer commands
    Issuer {
        #[command(subcommand)]
        command: IssuerCommands,
    },
    /// Identifier utilities (no network access)
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },
    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Get a secret value
    Get {
        name: String,
        #[arg(long, default_value = "")]
        version: String,
    },
    /// Set a secret value
    Set {
        name: String,
        value: String,
        #[arg(long)]
        content_type: Option<String>,
        /// Create the secret disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List secrets (alias: ls)
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        max_results: Option<u32>,
    },
    /// Delete a secret (alias: rm)
    #[command(alias = "rm")]
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Show a key's public parameters
    Get {
        name: String,
        #[arg(long, default_value = "")]
        version: String,
    },
    /// List keys (alias: ls)
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        max_results: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum CertificateCommands {
    /// Show a certificate
    Get {
        name: String,
        #[arg(long, default_value = "")]
        version: String,
    },
    /// List certificates (alias: ls)
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        max_results: Option<u32>,
    },
    /// Show the pending operation of a certificate
    Operation { name: String },
    /// Request cancellation of a pending operation
    Cancel { name: String },
}

#[derive(Subcommand)]
pub enum IssuerCommands {
    /// Show an issuer
    Get { name: String },
    /// List issuers (alias: ls)
    #[command(alias = "ls")]
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum IdentifierKind {
    Key,
    Secret,
    Certificate,
    Operation,
    Issuer,
}

#[derive(Subcommand)]
pub enum IdCommands {
    /// Split an identifier into vault, name and version
    Parse {
        identifier: String,
        #[arg(long, value_enum)]
        kind: IdentifierKind,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default configuration file
    Init,
}

#[derive(Tabled, Serialize)]
struct ItemRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Identifier")]
    id: String,
}

impl ItemRow {
    fn new(id: &ObjectIdentifier, attributes: &Attributes) -> Self {
        Self {
            name: id.name.clone(),
            enabled: attributes
                .enabled
                .map(|e| (if e { "yes" } else { "no" }).to_string())
                .unwrap_or_default(),
            updated: format_time(attributes.updated),
            id: id.identifier.clone(),
        }
    }
}

#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn field(field: &str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field: field.to_string(),
        value: value.into(),
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

impl Cli {
    pub async fn execute(self, mut config: Config) -> Result<()> {
        if let Some(credential_type) = &self.credential_type {
            config.credential_type = credential_type.clone();
        }
        let formatter = TableFormatter::new(self.format, config.no_color);

        match self.command {
            Commands::Config { command } => {
                execute_config_command(command, &config, &formatter).await
            }
            Commands::Id { command } => execute_id_command(command, &formatter),
            command => {
                config.validate()?;
                let vault = config.resolve_vault_url(self.vault)?;
                let client = create_client(&config)?;
                info!(vault = %vault, "Using vault");

                match command {
                    Commands::Csr { name, pem } => {
                        let csr = client
                            .get_pending_certificate_signing_request(&vault, &name)
                            .await?;
                        if pem {
                            print!("{}", csr_to_pem(&csr));
                        } else {
                            println!("{}", csr);
                        }
                        Ok(())
                    }
                    Commands::Secret { command } => {
                        execute_secret_command(command, &client, &vault, &formatter).await
                    }
                    Commands::Key { command } => {
                        execute_key_command(command, &client, &vault, &formatter).await
                    }
                    Commands::Certificate { command } => {
                        execute_certificate_command(command, &client, &vault, &formatter).await
                    }
                    Commands::Issuer { command } => {
                        execute_issuer_command(command, &client, &vault, &formatter).await
                    }
                    Commands::Config { .. } | Commands::Id { .. } => Ok(()),
                }
            }
        }
    }
}

fn create_client(config: &Config) -> Result<KeyVaultClient> {
    let provider =
        AuthProviderFactory::create_provider(&config.credential_type, &config.auth_settings())?;
    KeyVaultClient::new(provider, config.client_options())
}

fn print_rows<T: Tabled + Serialize>(formatter: &TableFormatter, rows: &[T]) -> Result<()> {
    println!("{}", formatter.format_table(rows)?);
    Ok(())
}

async fn execute_secret_command(
    command: SecretCommands,
    client: &KeyVaultClient,
    vault: &str,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        SecretCommands::Get { name, version } => {
            let secret = client.get_secret(vault, &name, &version).await?;
            println!("{}", secret.value.unwrap_or_default());
        }
        SecretCommands::Set {
            name,
            value,
            content_type,
            disabled,
        } => {
            let parameters = SecretSetParameters {
                value,
                content_type,
                secret_attributes: disabled.then(|| Attributes::enabled(false)),
                ..Default::default()
            };
            let secret = client.set_secret(vault, &name, &parameters).await?;
            println!("{}", secret.id.unwrap_or_default());
        }
        SecretCommands::List { max_results } => {
            let items = client.get_secrets(vault, max_results).await?;
            let rows = items
                .iter()
                .map(|item| -> Result<ItemRow> {
                    Ok(ItemRow::new(&parse_secret_identifier(&item.id)?, &item.attributes))
                })
                .collect::<Result<Vec<_>>>()?;
            print_rows(formatter, &rows)?;
        }
        SecretCommands::Delete { name } => {
            let deleted = client.delete_secret(vault, &name).await?;
            println!(
                "Deleted '{}'; scheduled purge: {}",
                name,
                format_time(deleted.scheduled_purge_date)
            );
        }
    }
    Ok(())
}

async fn execute_key_command(
    command: KeyCommands,
    client: &KeyVaultClient,
    vault: &str,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        KeyCommands::Get { name, version } => {
            let bundle = client.get_key(vault, &name, &version).await?;
            let mut rows = vec![
                field("kid", bundle.key.kid.clone().unwrap_or_default()),
                field(
                    "kty",
                    bundle.key.kty.map(|k| k.as_str().to_string()).unwrap_or_default(),
                ),
                field("key_ops", bundle.key.key_ops.join(",")),
                field("updated", format_time(bundle.attributes.updated)),
            ];
            if let Some(bits) = bundle.key.rsa_key_size()? {
                rows.push(field("key_size", bits.to_string()));
            }
            print_rows(formatter, &rows)?;
        }
        KeyCommands::List { max_results } => {
            let items = client.get_keys(vault, max_results).await?;
            let rows = items
                .iter()
                .map(|item| -> Result<ItemRow> {
                    Ok(ItemRow::new(&parse_key_identifier(&item.kid)?, &item.attributes))
                })
                .collect::<Result<Vec<_>>>()?;
            print_rows(formatter, &rows)?;
        }
    }
    Ok(())
}

async fn execute_certificate_command(
    command: CertificateCommands,
    client: &KeyVaultClient,
    vault: &str,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        CertificateCommands::Get { name, version } => {
            let bundle = client.get_certificate(vault, &name, &version).await?;
            let subject = bundle
                .policy
                .as_ref()
                .and_then(|p| p.x509_certificate_properties.as_ref())
                .and_then(|x| x.subject.clone())
                .unwrap_or_default();
            let rows = vec![
                field("id", bundle.id.clone().unwrap_or_default()),
                field("subject", subject),
                field("thumbprint", bundle.x5t.clone().unwrap_or_default()),
                field("expires", format_time(bundle.attributes.expires)),
                field("kid", bundle.kid.clone().unwrap_or_default()),
                field("sid", bundle.sid.clone().unwrap_or_default()),
            ];
            print_rows(formatter, &rows)?;
        }
        CertificateCommands::List { max_results } => {
            let items = client.get_certificates(vault, max_results).await?;
            let rows = items
                .iter()
                .map(|item| -> Result<ItemRow> {
                    let id = parse_certificate_identifier(&item.id)?;
                    Ok(ItemRow::new(&id, &item.attributes))
                })
                .collect::<Result<Vec<_>>>()?;
            print_rows(formatter, &rows)?;
        }
        CertificateCommands::Operation { name } => {
            let operation = client.get_certificate_operation(vault, &name).await?;
            print_operation(formatter, &operation)?;
        }
        CertificateCommands::Cancel { name } => {
            let operation = client.update_certificate_operation(vault, &name, true).await?;
            print_operation(formatter, &operation)?;
        }
    }
    Ok(())
}

fn print_operation(
    formatter: &TableFormatter,
    operation: &crate::certificate::CertificateOperation,
) -> Result<()> {
    let rows = vec![
        field("id", operation.id.clone().unwrap_or_default()),
        field("status", operation.status.clone().unwrap_or_default()),
        field("details", operation.status_details.clone().unwrap_or_default()),
        field(
            "issuer",
            operation
                .issuer_parameters
                .as_ref()
                .and_then(|i| i.name.clone())
                .unwrap_or_default(),
        ),
        field("cancellation_requested", operation.cancellation_requested.to_string()),
        field(
            "error",
            operation
                .error
                .as_ref()
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_default(),
        ),
    ];
    print_rows(formatter, &rows)
}

async fn execute_issuer_command(
    command: IssuerCommands,
    client: &KeyVaultClient,
    vault: &str,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        IssuerCommands::Get { name } => {
            let issuer = client.get_certificate_issuer(vault, &name).await?;
            let rows = vec![
                field("id", issuer.id.clone().unwrap_or_default()),
                field("provider", issuer.provider.clone().unwrap_or_default()),
                field(
                    "account_id",
                    issuer
                        .credentials
                        .as_ref()
                        .and_then(|c| c.account_id.clone())
                        .unwrap_or_default(),
                ),
            ];
            print_rows(formatter, &rows)?;
        }
        IssuerCommands::List => {
            let issuers = client.get_certificate_issuers(vault, None).await?;
            let rows: Vec<FieldRow> = issuers
                .iter()
                .map(|i| field(&i.name(), i.provider.clone().unwrap_or_default()))
                .collect();
            print_rows(formatter, &rows)?;
        }
    }
    Ok(())
}

fn execute_id_command(command: IdCommands, formatter: &TableFormatter) -> Result<()> {
    match command {
        IdCommands::Parse { identifier, kind } => {
            let parsed = match kind {
                IdentifierKind::Key => parse_key_identifier(&identifier)?,
                IdentifierKind::Secret => parse_secret_identifier(&identifier)?,
                IdentifierKind::Certificate => parse_certificate_identifier(&identifier)?,
                IdentifierKind::Operation => parse_certificate_operation_identifier(&identifier)?,
                IdentifierKind::Issuer => parse_issuer_identifier(&identifier)?,
            };
            let rows = vec![
                field("vault", parsed.vault.clone()),
                field("collection", parsed.collection.to_string()),
                field("name", parsed.name.clone()),
                field("version", parsed.version.clone().unwrap_or_default()),
                field("base_identifier", parsed.base_identifier.clone()),
            ];
            print_rows(formatter, &rows)
        }
    }
}

async fn execute_config_command(
    command: ConfigCommands,
    config: &Config,
    formatter: &TableFormatter,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let rows = vec![
                field("vault_url", config.vault_url.clone()),
                field("api_version", config.api_version.clone()),
                field("credential_type", config.credential_type.clone()),
                field("tenant_id", config.tenant_id.clone()),
                field("client_id", config.client_id.clone()),
                field("max_retries", config.max_retries.to_string()),
                field("request_timeout_secs", config.request_timeout_secs.to_string()),
                field(
                    "verify_challenge_resource",
                    config.verify_challenge_resource.to_string(),
                ),
            ];
            print_rows(formatter, &rows)
        }
        ConfigCommands::Init => {
            let path = init_default_config().await?;
            println!("Configuration file: {}", path.display());
            Ok(())
        }
    }
}

/// Map a CLI-level failure onto a process exit code
pub fn exit_code(error: &KeyVaultClientError) -> i32 {
    match error {
        KeyVaultClientError::NotFound { .. } => 3,
        KeyVaultClientError::AuthenticationError(_) => 4,
        KeyVaultClientError::ConfigError(_) | KeyVaultClientError::InvalidArgument(_) => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_csr_command() {
        let cli = Cli::try_parse_from([
            "kvc",
            "--vault",
            "https://v.vault.azure.net",
            "csr",
            "web",
            "--pem",
        ])
        .unwrap();
        assert_eq!(cli.vault.as_deref(), Some("https://v.vault.azure.net"));
        assert!(matches!(cli.command, Commands::Csr { ref name, pem: true } if name == "web"));
    }

    #[test]
    fn test_cli_parses_id_parse() {
        let cli = Cli::try_parse_from([
            "kvc",
            "id",
            "parse",
            "https://v.vault.azure.net/keys/k/1",
            "--kind",
            "key",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Id {
                command: IdCommands::Parse {
                    kind: IdentifierKind::Key,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&KeyVaultClientError::config("x")), 2);
        assert_eq!(
            exit_code(&KeyVaultClientError::NotFound {
                url: String::new(),
                message: String::new()
            }),
            3
        );
        assert_eq!(exit_code(&KeyVaultClientError::unknown("x")), 1);
    }
}
