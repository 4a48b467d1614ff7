//! Hush CLI
//!
//! A terminal front-end over `hush-core`:
//!
//! 1. **Keys**: generate or rotate the identity key pair, check when it is due
//!    for rotation, and repair a damaged key record.
//!
//! 2. **Trust**: show fingerprints, compare two fingerprints, and record that
//!    a contact's key was checked.
//!
//! 3. **Messages**: encrypt text (and optionally an image) to a user whose key
//!    is in the local directory, and decrypt what was received.
//!
//! 4. **Backups**: export the key pair sealed under a password, as a file or
//!    as text to paste, and import it again.
//!
//! Everything lives under one data directory. Several local users can share
//! it, which is also what makes the local key directory work.

mod commands;
mod store;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hush_core::{ErrorContext, HushConfig, LocalDirectory, SanitizedError, Session, SessionDeps};

use store::FileStore;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hush", version, about = "End-to-end encryption keys for private messaging")]
struct Cli {
    /// Directory holding keys, the local key directory and trust records
    #[arg(long, global = true, env = "HUSH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Local user to act as
    #[arg(short, long, global = true, default_value = "me", env = "HUSH_USER")]
    user: String,

    /// JSON config file (defaults to config.json in the data directory)
    #[arg(long, global = true, env = "HUSH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new key pair, replacing the current one
    Keygen {
        /// Days until the new pair is due for rotation
        #[arg(long)]
        interval: Option<u32>,
    },

    /// Show the current key pair and its rotation status
    Status,

    /// Show your fingerprint, or a contact's
    Fingerprint {
        /// Contact whose current key to fingerprint
        #[arg(long)]
        contact: Option<String>,
    },

    /// Compare two fingerprints, ignoring grouping and case
    Compare { a: String, b: String },

    /// Record that a contact's current key was checked
    Verify {
        contact: String,

        /// Fingerprint the contact read out; without it the key is marked
        /// verified as is
        fingerprint: Option<String>,
    },

    /// Encrypt a message and print the outbound package
    Encrypt {
        /// Recipient user id
        #[arg(long)]
        to: String,

        /// Image file to attach
        #[arg(long)]
        image: Option<PathBuf>,

        /// Minutes until the message expires
        #[arg(long)]
        expires: Option<u32>,

        message: String,
    },

    /// Decrypt a package read from a file or stdin
    Decrypt {
        /// File holding the package (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Where to write an attached image
        #[arg(long)]
        image_out: Option<PathBuf>,
    },

    /// Export or import an encrypted key backup
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Recover a key record that failed to load
    Repair,
}

#[derive(Subcommand, Debug)]
enum BackupAction {
    /// Seal the key pair under a password
    Export {
        /// Output file (defaults to a dated name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the backup text instead of writing a file
        #[arg(long)]
        print: bool,

        #[arg(long, env = "HUSH_BACKUP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Restore a key pair from a backup file or pasted text
    Import {
        /// Backup file (reads pasted text from stdin if omitted)
        file: Option<PathBuf>,

        #[arg(long, env = "HUSH_BACKUP_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A core failure after sanitizing
#[derive(Debug)]
pub struct Classified(pub SanitizedError);

impl fmt::Display for Classified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for Classified {}

/// Attach the sanitizer's classification to a core result
pub trait Classify<T> {
    fn classify(self, context: ErrorContext) -> color_eyre::Result<T>;
}

impl<T> Classify<T> for hush_core::Result<T> {
    fn classify(self, context: ErrorContext) -> color_eyre::Result<T> {
        self.map_err(|e| color_eyre::Report::new(Classified(hush_core::classify(&e, context))))
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(report) => match report.downcast_ref::<Classified>() {
            Some(Classified(sanitized)) => {
                eprintln!("error: {}", sanitized);
                eprintln!("  {}", sanitized.user_action);
                std::process::exit(1);
            }
            None => Err(report),
        },
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hush=info,hush_core=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> color_eyre::Result<()> {
    // Pure fingerprint comparison needs no keys or storage
    if let Command::Compare { a, b } = &cli.command {
        return commands::compare(a, b);
    }

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("hush")))
        .unwrap_or_else(|| PathBuf::from(".hush"));
    let store = Arc::new(FileStore::open(&data_dir).classify(ErrorContext::Storage)?);
    tracing::debug!(data_dir = %store.root().display(), user = %cli.user, "Opened data directory");

    let config = load_config(cli.config.as_ref(), &data_dir)?;
    let deps = SessionDeps {
        crypto: Arc::new(hush_core::NativeCrypto),
        store: store.clone(),
        directory: Arc::new(LocalDirectory::new(store)),
        transport: Arc::new(commands::StdoutTransport),
        image_codec: None,
    };
    let session = Session::login(cli.user.clone(), deps, config).classify(ErrorContext::Storage)?;

    let result = match cli.command {
        Command::Keygen { interval } => commands::keygen(&session, interval).await,
        Command::Status => commands::status(&session),
        Command::Fingerprint { contact } => commands::fingerprint(&session, contact.as_deref()).await,
        Command::Compare { .. } => Ok(()),
        Command::Verify {
            contact,
            fingerprint,
        } => commands::verify(&session, &contact, fingerprint.as_deref()).await,
        Command::Encrypt {
            to,
            image,
            expires,
            message,
        } => commands::encrypt(&session, &to, &message, image.as_deref(), expires).await,
        Command::Decrypt { input, image_out } => {
            commands::decrypt(&session, input.as_deref(), image_out.as_deref()).await
        }
        Command::Backup { action } => match action {
            BackupAction::Export {
                out,
                print,
                password,
            } => commands::backup_export(&session, out, print, &password).await,
            BackupAction::Import { file, password } => {
                commands::backup_import(&session, file.as_deref(), &password).await
            }
        },
        Command::Repair => commands::repair(&session).await,
    };

    session.logout();
    result
}

fn load_config(explicit: Option<&PathBuf>, data_dir: &std::path::Path) -> color_eyre::Result<HushConfig> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => {
            let default = data_dir.join("config.json");
            if !default.exists() {
                return Ok(HushConfig::default());
            }
            default
        }
    };
    let text = std::fs::read_to_string(&path)?;
    let config = HushConfig::from_json_str(&text)
        .map_err(|e| color_eyre::eyre::eyre!("invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_encrypt() {
        let cli = Cli::try_parse_from([
            "hush", "--user", "alice", "encrypt", "--to", "bob", "--expires", "5", "hello",
        ])
        .unwrap();
        assert_eq!(cli.user, "alice");
        match cli.command {
            Command::Encrypt {
                to,
                expires,
                message,
                image,
            } => {
                assert_eq!(to, "bob");
                assert_eq!(expires, Some(5));
                assert_eq!(message, "hello");
                assert!(image.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_backup_import_from_stdin() {
        let cli =
            Cli::try_parse_from(["hush", "backup", "import", "--password", "pw-long-enough"]).unwrap();
        match cli.command {
            Command::Backup {
                action: BackupAction::Import { file, password },
            } => {
                assert!(file.is_none());
                assert_eq!(password, "pw-long-enough");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config, HushConfig::default());
    }

    #[test]
    fn test_config_rejects_weak_modulus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"modulusBits": 1024}"#).unwrap();
        assert!(load_config(None, dir.path()).is_err());
    }
}
