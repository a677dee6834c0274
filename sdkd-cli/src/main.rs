//! SDKD Command Line Interface
//!
//! Offline developer tools: secret sharing, mnemonic conversion, address
//! derivation, SigV4 signing and transaction signing. Nothing here talks to
//! the network.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sdkd_aws::{AwsSigner, SignableRequest, SigningConfig};
use sdkd_core::{entropy_to_mnemonic, private_key_from_mnemonic, PrivateKey};
use sdkd_multisig::{SecretSharing, Share, DEFAULT_BITS};
use sdkd_wallet::tx::{self, ChainData, TxDraft};
use sdkd_wallet::units::from_wei;
use sdkd_wallet::{EtherUnit, SdkConfig};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sdkd")]
#[command(about = "SDKD wallet SDK developer tools")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a hex secret into shares
    Split {
        /// Secret as hex
        secret: String,
        /// Number of shares to produce
        #[arg(short = 'n', long, default_value = "2")]
        shares: u32,
        /// Shares needed to recombine
        #[arg(short, long, default_value = "2")]
        threshold: u32,
        /// Field bit width
        #[arg(short, long, default_value_t = DEFAULT_BITS)]
        bits: u32,
    },
    /// Recombine shares into the secret
    Combine {
        /// Shares in wire form
        #[arg(required = true)]
        shares: Vec<String>,
    },
    /// Convert between private keys and recovery phrases
    Mnemonic {
        #[command(subcommand)]
        action: MnemonicAction,
    },
    /// Show the address and public key for a private key
    Address {
        /// Private key hex; prompted for when omitted
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Produce AWS Signature V4 headers for a request
    Sigv4 {
        /// Request URL
        url: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Request body
        #[arg(short, long)]
        body: Option<String>,
        /// Extra header as `name: value`
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        #[arg(long)]
        access_key_id: String,
        /// Secret access key; prompted for when omitted
        #[arg(long)]
        secret_access_key: Option<String>,
        #[arg(long)]
        session_token: Option<String>,
        #[arg(long, default_value = "eu-west-1")]
        region: String,
        #[arg(long, default_value = "execute-api")]
        service: String,
    },
    /// Sign a transaction offline
    SignTx {
        /// Recipient, or 0xCONTRACT for contract creation
        #[arg(long)]
        to: String,
        /// Amount in `unit`
        #[arg(long)]
        value: String,
        #[arg(long, default_value = "wei")]
        unit: EtherUnit,
        #[arg(long, default_value_t = tx::DEFAULT_GAS_LIMIT)]
        gas_limit: u64,
        /// Gas price in wei
        #[arg(long)]
        gas_price: u128,
        #[arg(long)]
        nonce: u128,
        /// Call data hex
        #[arg(long, default_value = "")]
        data: String,
        /// EIP-155 chain id
        #[arg(long)]
        chain_id: Option<u64>,
        /// Private key hex; prompted for when omitted
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Manage the SDK configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum MnemonicAction {
    /// Private key to 24 words
    Encode {
        #[arg(short, long)]
        key: Option<String>,
    },
    /// 24 words to private key
    Decode {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration
    Init {
        /// API key issued for the app
        api_key: String,
        /// Output path; defaults to the user config directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print and validate a configuration
    Show {
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "sdkd={log_level},sdkd_core={log_level},sdkd_multisig={log_level},sdkd_aws={log_level},sdkd_wallet={log_level}"
        ))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Split {
            secret,
            shares,
            threshold,
            bits,
        } => {
            let engine = SecretSharing::new(bits)?;
            for share in engine.share(&secret, shares, threshold)? {
                println!("{share}");
            }
        }

        Commands::Combine { shares } => {
            let shares = shares
                .iter()
                .map(|s| s.parse::<Share>())
                .collect::<Result<Vec<_>, _>>()?;
            let secret = SecretSharing::combine(&shares)?;
            println!("{}", secret.as_str());
        }

        Commands::Mnemonic { action } => match action {
            MnemonicAction::Encode { key } => {
                let key = read_key(key)?;
                let phrase = entropy_to_mnemonic(key.as_bytes())?;
                println!("{}", phrase.expose_secret());
            }
            MnemonicAction::Decode { words } => {
                let phrase = SecretString::new(words.join(" "));
                let key = private_key_from_mnemonic(&phrase)?;
                println!("Private key: 0x{}", key.to_hex().expose_secret());
                println!("Address: {}", key.address()?.to_checksum_string());
            }
        },

        Commands::Address { key } => {
            let key = read_key(key)?;
            let address = key.address()?;
            println!("Address: {address}");
            println!("Checksum address: {}", address.to_checksum_string());
            println!("Public key: {}", key.public_key()?);
        }

        Commands::Sigv4 {
            url,
            method,
            body,
            headers,
            access_key_id,
            secret_access_key,
            session_token,
            region,
            service,
        } => {
            let secret = match secret_access_key {
                Some(secret) => SecretString::new(secret),
                None => SecretString::new(rpassword::prompt_password("Secret access key: ")?),
            };
            let mut config = SigningConfig::new(access_key_id, secret)
                .with_region(region)
                .with_service(service);
            if let Some(token) = session_token {
                config = config.with_session_token(SecretString::new(token));
            }

            let mut request = SignableRequest::new(method, url);
            for header in &headers {
                let (name, value) = parse_header(header)?;
                request = request.with_header(name, value);
            }
            if let Some(body) = body {
                request = request.with_body(body);
            }

            let signed = AwsSigner::new(config)?.sign(&request, chrono::Utc::now())?;
            for (name, value) in signed.to_pairs() {
                println!("{name}: {value}");
            }
        }

        Commands::SignTx {
            to,
            value,
            unit,
            gas_limit,
            gas_price,
            nonce,
            data,
            chain_id,
            key,
        } => {
            let mut draft = TxDraft::transfer(to, value)
                .with_unit(unit)
                .with_gas_limit(gas_limit)
                .with_data(data);
            tx::validate(&mut draft).map_err(|kind| anyhow!("invalid transaction: {kind}"))?;

            // Offline: the caller is responsible for the balance
            let chain = ChainData {
                nonce,
                gas_price,
                balance: u128::MAX,
            };
            let assembled = tx::assemble(&draft, &chain, chain_id)?;
            let key = read_key(key)?;
            let signed = tx::sign(&assembled, &key)?;

            tracing::debug!(v = signed.v, "signed transaction");
            println!("Raw: {}", signed.raw_hex());
            println!("Hash: {}", signed.hash());
            println!("From: {}", key.address()?.to_checksum_string());
            if let Some(cost) = signed.tx.max_cost() {
                println!("Max cost: {} ether", from_wei(cost, EtherUnit::Ether));
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { api_key, output } => {
                let path = output.unwrap_or_else(SdkConfig::default_config_path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let config = SdkConfig::new(api_key);
                config.validate().map_err(|e| anyhow!(e))?;
                config.save_to_file(&path)?;
                println!("Configuration saved to {}", path.display());
            }
            ConfigAction::Show { path } => {
                let path = path.unwrap_or_else(SdkConfig::default_config_path);
                let config = SdkConfig::load_from_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                println!("Backend: {}", config.backend_host);
                println!("Node: {}", config.eth_node_host);
                match config.chain_id {
                    Some(id) => println!("Chain id: {id}"),
                    None => println!("Chain id: none (legacy signatures)"),
                }
                println!("Recovery sender: {}", config.recovery_sender);
                println!("SES region: {}", config.ses_region);
                if let Some(endpoint) = &config.ses_endpoint {
                    println!("SES endpoint: {endpoint}");
                }
                match config.api_client_id() {
                    Ok(id) => println!("API client id: {id}"),
                    Err(e) => println!("API client id: unavailable ({e})"),
                }
                if let Err(e) = config.validate() {
                    println!("Invalid configuration: {e}");
                }
            }
        },
    }

    Ok(())
}

fn read_key(key: Option<String>) -> Result<PrivateKey> {
    let raw = match key {
        Some(key) => SecretString::new(key),
        None => SecretString::new(rpassword::prompt_password("Private key (hex): ")?),
    };
    PrivateKey::from_hex(raw.expose_secret()).context("Invalid private key")
}

fn parse_header(header: &str) -> Result<(&str, &str)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| anyhow!("header must look like `name: value`, got {header:?}"))?;
    Ok((name.trim(), value.trim()))
}
