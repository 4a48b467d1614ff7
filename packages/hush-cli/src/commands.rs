//! Subcommand handlers.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use color_eyre::eyre::{bail, eyre, WrapErr};
use hush_core::identity::{BackupBlob, FingerprintService};
use hush_core::{
    Error, ErrorContext, MessagePackage, MessageTransport, OutboundMessage, Session,
    VerificationStatus,
};

use crate::Classify;

/// Prints outbound packages as JSON on stdout
pub struct StdoutTransport;

#[async_trait]
impl MessageTransport for StdoutTransport {
    async fn send(&self, message: &OutboundMessage) -> hush_core::Result<()> {
        let json = serde_json::to_string_pretty(message)?;
        println!("{}", json);
        Ok(())
    }
}

// ── Keys ──────────────────────────────────────────────────────────────────────

pub async fn keygen(session: &Session, interval: Option<u32>) -> color_eyre::Result<()> {
    let interval = interval.unwrap_or(session.config().rotation_interval_days);
    let key_pair = session
        .rotate_keys(interval)
        .await
        .classify(ErrorContext::KeyGeneration)?;
    let fingerprint = session
        .own_fingerprint()
        .await
        .classify(ErrorContext::Fingerprint)?;

    println!("user:        {}", session.user_id());
    println!("key id:      {}", key_pair.key_id());
    println!("expires:     {}", key_pair.expires_at().format("%Y-%m-%d %H:%M UTC"));
    println!("fingerprint: {}", fingerprint.hex);
    println!("             {}", fingerprint.numeric);
    Ok(())
}

pub fn status(session: &Session) -> color_eyre::Result<()> {
    let Some(key_pair) = session.key_pair() else {
        println!("{} has no key pair; run `hush keygen`", session.user_id());
        return Ok(());
    };
    let status = session
        .rotation_status()
        .classify(ErrorContext::KeyVerification)?;

    println!("user:      {}", session.user_id());
    println!("key id:    {}", key_pair.key_id());
    println!("created:   {}", key_pair.created_at().format("%Y-%m-%d %H:%M UTC"));
    println!("expires:   {}", key_pair.expires_at().format("%Y-%m-%d %H:%M UTC"));
    println!("remaining: {} day(s)", status.days_remaining);
    if status.needs_rotation {
        println!("state:     expired, run `hush keygen` to rotate");
    } else if status.warning_period {
        println!("state:     expiring soon, consider rotating");
    } else {
        println!("state:     ok");
    }
    Ok(())
}

pub async fn repair(session: &Session) -> color_eyre::Result<()> {
    let key_pair = session
        .repair_stored_keys()
        .await
        .classify(ErrorContext::KeyVerification)?;
    println!("repaired key pair {}", key_pair.key_id());
    Ok(())
}

// ── Trust ─────────────────────────────────────────────────────────────────────

pub async fn fingerprint(session: &Session, contact: Option<&str>) -> color_eyre::Result<()> {
    match contact {
        None => {
            let fingerprint = session
                .own_fingerprint()
                .await
                .classify(ErrorContext::Fingerprint)?;
            println!("{}", fingerprint.hex);
            println!("{}", fingerprint.numeric);
        }
        Some(contact) => {
            let (info, fingerprint) = session
                .contact_fingerprint(contact)
                .await
                .classify(ErrorContext::Fingerprint)?;
            let status = session
                .contact_status(contact)
                .await
                .classify(ErrorContext::Directory)?;
            println!("contact: {} (key {})", contact, info.key_id);
            println!("status:  {}", status);
            println!("{}", fingerprint.hex);
            println!("{}", fingerprint.numeric);
        }
    }
    Ok(())
}

pub fn compare(a: &str, b: &str) -> color_eyre::Result<()> {
    if FingerprintService::compare(a, b) {
        println!("match");
        Ok(())
    } else {
        bail!("fingerprints do not match")
    }
}

pub async fn verify(
    session: &Session,
    contact: &str,
    entered: Option<&str>,
) -> color_eyre::Result<()> {
    let status = match entered {
        Some(entered) => session
            .compare_contact_fingerprint(contact, entered)
            .await
            .classify(ErrorContext::Fingerprint)?,
        None => {
            session
                .mark_contact_verified(contact)
                .await
                .classify(ErrorContext::Fingerprint)?;
            VerificationStatus::Verified
        }
    };

    println!("{}: {}", contact, status);
    if status == VerificationStatus::Mismatch {
        bail!("the fingerprint does not match {}'s current key", contact);
    }
    Ok(())
}

// ── Messages ──────────────────────────────────────────────────────────────────

pub async fn encrypt(
    session: &Session,
    recipient: &str,
    message: &str,
    image: Option<&Path>,
    expires_in_minutes: Option<u32>,
) -> color_eyre::Result<()> {
    let image = image.map(image_data_url).transpose()?;
    session
        .send_message(recipient, message, image.as_deref(), expires_in_minutes)
        .await
        .classify(ErrorContext::Encryption)?;
    Ok(())
}

pub async fn decrypt(
    session: &Session,
    input: Option<&Path>,
    image_out: Option<&Path>,
) -> color_eyre::Result<()> {
    let text = read_input(input)?;
    let package = parse_package(&text)?;
    let message = session
        .open_message(&package)
        .await
        .classify(ErrorContext::Decryption)?;

    println!("{}", message.content);
    if let Some(minutes) = message.expires_in_minutes {
        eprintln!("(expires {} minute(s) after delivery)", minutes);
    }
    match (message.image.as_deref(), image_out) {
        (Some(image), Some(path)) => {
            let bytes = decode_data_url(image)?;
            std::fs::write(path, bytes)
                .wrap_err_with(|| format!("writing image to {}", path.display()))?;
            eprintln!("image written to {}", path.display());
        }
        (Some(_), None) => eprintln!("(message has an image; pass --image-out to save it)"),
        _ => {}
    }
    Ok(())
}

fn parse_package(text: &str) -> color_eyre::Result<MessagePackage> {
    if let Ok(outbound) = serde_json::from_str::<OutboundMessage>(text) {
        return Ok(outbound.package());
    }
    serde_json::from_str::<MessagePackage>(text)
        .map_err(|_| eyre!("input is neither an outbound message nor a message package"))
}

fn image_data_url(path: &Path) -> color_eyre::Result<String> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("reading image {}", path.display()))?;
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => bail!("unsupported image type: {}", path.display()),
    };
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn decode_data_url(url: &str) -> color_eyre::Result<Vec<u8>> {
    let (_, data) = url
        .split_once("base64,")
        .ok_or_else(|| eyre!("attached image is not a base64 data URL"))?;
    STANDARD
        .decode(data.trim())
        .map_err(|e| eyre!("attached image is not valid base64: {}", e))
}

// ── Backups ───────────────────────────────────────────────────────────────────

pub async fn backup_export(
    session: &Session,
    out: Option<PathBuf>,
    print: bool,
    password: &str,
) -> color_eyre::Result<()> {
    let blob = session
        .create_backup(password)
        .await
        .classify(ErrorContext::BackupCreate)?;
    let text = blob
        .to_export_text()
        .classify(ErrorContext::BackupCreate)?;

    if print {
        println!("{}", text);
        return Ok(());
    }

    let path = out.unwrap_or_else(|| PathBuf::from(blob.file_name()));
    std::fs::write(&path, text).wrap_err_with(|| format!("writing {}", path.display()))?;
    println!("backup written to {}", path.display());
    Ok(())
}

pub async fn backup_import(
    session: &Session,
    file: Option<&Path>,
    password: &str,
) -> color_eyre::Result<()> {
    let text = read_input(file)?;
    // Reject text that is not a backup before spending time on the KDF
    BackupBlob::parse(&text).classify(ErrorContext::BackupRestore)?;

    let key_pair = session
        .restore_backup(&text, password)
        .await
        .map_err(|e| match e {
            Error::KeyVerificationFailed(_) => Error::BackupRestoreFailed,
            other => other,
        })
        .classify(ErrorContext::BackupRestore)?;
    println!("restored key pair {}", key_pair.key_id());
    Ok(())
}

fn read_input(path: Option<&Path>) -> color_eyre::Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .wrap_err("reading stdin")?;
            Ok(text)
        }
    }
}
