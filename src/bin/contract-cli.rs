//! # contract-cli.rs
//!
//! Ein Kommandozeilen-Tool für Betrieb und Diagnose der Vertragsplattform.
//!
//! ## Befehle:
//! - `init`: Legt Datenverzeichnis, Konfiguration und CA-Schlüssel an.
//! - `register`: Registriert eine Identität und gibt den privaten Schlüssel aus.
//! - `upload`: Lädt ein Dokument als Vertrag hoch.
//! - `show`: Zeigt einen Vertrag aus Sicht eines Akteurs.
//! - `verify-chain`: Prüft die Log-Kette eines Vertrags.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use std::fs;
use std::path::{Path, PathBuf};

use contract_lib::{
    audit_log, contract_manager, crypto_utils, identity_manager, load_config,
    services::certificate::CertificateAuthority,
    storage::file_storage::FileStorage,
    NewContractData,
};

/// Das Haupt-Struct für das CLI-Tool, das von `clap` geparst wird.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Das Datenverzeichnis (Verträge, Identitäten, Logs, Blobs).
    #[arg(short, long, default_value = "target/contract-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Definiert die verfügbaren Unterbefehle.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Legt Datenverzeichnis, Konfiguration und CA-Schlüssel an.
    Init,

    /// Registriert eine neue Identität für eine E-Mail-Adresse.
    Register {
        /// Die E-Mail-Adresse der Identität.
        #[arg(short, long)]
        email: String,
    },

    /// Lädt ein Dokument als Vertrag hoch.
    Upload {
        /// Die User-ID des Uploaders (did:key).
        #[arg(long)]
        uploader_id: String,

        /// Die E-Mail-Adresse des Empfängers.
        #[arg(long)]
        recipient_email: String,

        /// Der Anzeigetitel des Vertrags.
        #[arg(short, long)]
        title: String,

        /// Pfad zur hochzuladenden Datei.
        file: PathBuf,
    },

    /// Zeigt einen Vertrag aus Sicht eines Akteurs.
    Show {
        /// Die Vertrags-ID.
        #[arg(long)]
        contract_id: String,

        /// Die User-ID des Akteurs.
        #[arg(long)]
        user_id: String,
    },

    /// Prüft die Hash-Kette des Audit-Logs eines Vertrags.
    VerifyChain {
        /// Die Vertrags-ID.
        #[arg(long)]
        contract_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init(&cli.data_dir),
        Commands::Register { email } => register(&cli.data_dir, &email),
        Commands::Upload {
            uploader_id,
            recipient_email,
            title,
            file,
        } => upload(&cli.data_dir, &uploader_id, &recipient_email, &title, &file),
        Commands::Show {
            contract_id,
            user_id,
        } => show(&cli.data_dir, &contract_id, &user_id),
        Commands::VerifyChain { contract_id } => verify_chain(&cli.data_dir, &contract_id),
    }
}

fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

fn ca_key_path(data_dir: &Path) -> PathBuf {
    data_dir.join("ca.key")
}

/// Logik für den `init`-Befehl.
fn init(data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Konnte das Verzeichnis {} nicht erstellen", data_dir.display()))?;

    let config_file = config_path(data_dir);
    if config_file.exists() {
        anyhow::bail!("{} existiert bereits.", config_file.display());
    }

    // 1. Zufälligen E-Mail-Schlüssel erzeugen und Konfiguration schreiben
    let email_key = bs58::encode(crypto_utils::generate_symmetric_key()).into_string();
    let config_toml = format!(
        "contract_validity_days = 30\ncertificate_validity_days = 365\nmax_file_size_bytes = 20971520\nallowed_extensions = [\".pdf\", \".docx\", \".txt\"]\nemail_key = \"{}\"\n",
        email_key
    );
    fs::write(&config_file, &config_toml)
        .with_context(|| format!("Konnte {} nicht schreiben", config_file.display()))?;

    // 2. CA-Schlüssel erzeugen und speichern
    let (_, ca_key) = crypto_utils::generate_ed25519_keypair();
    fs::write(ca_key_path(data_dir), ca_key.to_bytes())
        .context("Konnte den CA-Schlüssel nicht schreiben")?;

    let ca = CertificateAuthority::new(ca_key);
    println!("✅ Initialisiert.");
    println!("   - Konfiguration: {}", config_file.display());
    println!("   - CA-ID: {}", ca.ca_id());
    Ok(())
}

/// Lädt Konfiguration, CA und Speicher aus dem Datenverzeichnis.
fn open_environment(
    data_dir: &Path,
) -> Result<(FileStorage, CertificateAuthority, contract_lib::CoreConfig)> {
    let config_toml = fs::read_to_string(config_path(data_dir))
        .with_context(|| format!("Konnte {} nicht laden (init ausführen?)", config_path(data_dir).display()))?;
    let config = load_config(&config_toml)?;

    let key_bytes: [u8; 32] = fs::read(ca_key_path(data_dir))
        .context("Konnte den CA-Schlüssel nicht laden (init ausführen?)")?
        .try_into()
        .map_err(|_| anyhow::anyhow!("CA-Schlüsseldatei hat eine ungültige Länge"))?;
    let ca = CertificateAuthority::new(SigningKey::from_bytes(&key_bytes));

    let storage = FileStorage::new(data_dir)?;
    Ok((storage, ca, config))
}

/// Logik für den `register`-Befehl.
fn register(data_dir: &Path, email: &str) -> Result<()> {
    let (mut storage, ca, config) = open_environment(data_dir)?;

    let issued = identity_manager::register(&mut storage, &ca, &config, email)?;
    println!("✅ Identität registriert.");
    println!("   - User-ID: {}", issued.record.user_id);
    println!("   - Zertifikat-Seriennummer: {}", issued.record.certificate.payload.serial);
    println!("   - Privater Schlüssel (einmalige Ausgabe!): {}", issued.private_key);
    Ok(())
}

/// Logik für den `upload`-Befehl.
fn upload(
    data_dir: &Path,
    uploader_id: &str,
    recipient_email: &str,
    title: &str,
    file: &Path,
) -> Result<()> {
    let (mut storage, _, config) = open_environment(data_dir)?;

    let file_data = fs::read(file)
        .with_context(|| format!("Konnte {} nicht lesen", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Ungültiger Dateiname"))?
        .to_string();

    let receipt = contract_manager::upload(
        &mut storage,
        &config,
        NewContractData {
            title: title.to_string(),
            file_name,
            file_data,
            uploader_id: uploader_id.to_string(),
            recipient_email: recipient_email.to_string(),
        },
    )?;

    println!("✅ Vertrag hochgeladen.");
    println!("   - Vertrags-ID: {}", receipt.contract.contract_id);
    println!("   - QR-Token: {}", receipt.qr_token);
    println!("   - Datei-Hash: {}", receipt.contract.security.file_hash);
    if !receipt.log.is_written() {
        eprintln!("⚠️  Der upload-Log-Eintrag konnte nicht geschrieben werden.");
    }
    Ok(())
}

/// Logik für den `show`-Befehl.
fn show(data_dir: &Path, contract_id: &str, user_id: &str) -> Result<()> {
    let (mut storage, _, _) = open_environment(data_dir)?;

    let contract = contract_manager::get_for_user(&mut storage, contract_id, user_id)?;
    println!("Vertrag {}", contract.contract_id);
    println!("   - Titel: {}", contract.title);
    println!("   - Status: {:?}", contract.status);
    println!("   - Hochgeladen: {}", contract.created_at);
    println!("   - Läuft ab: {}", contract.expiration_date);
    println!("   - Empfangen: {}", contract.received);
    println!("   - Elektronisch signiert: {}", contract.signature.signed);
    Ok(())
}

/// Logik für den `verify-chain`-Befehl.
fn verify_chain(data_dir: &Path, contract_id: &str) -> Result<()> {
    let (storage, _, _) = open_environment(data_dir)?;

    let entries = audit_log::verify_chain(&storage, contract_id)?;
    println!("✅ Log-Kette intakt ({} Einträge).", entries);
    Ok(())
}
