//! Chiffrement des secrets stockés dans la configuration
//!
//! Le code d'accès aux webservices Smartschool donne un accès complet à
//! l'administration de l'école. Il peut donc être stocké chiffré dans
//! `config.yaml` sous la forme `encrypted:BASE64`.
//!
//! La clé AES-256 est dérivée de l'identifiant de la machine : un fichier
//! de configuration chiffré n'est lisible que sur la machine qui l'a produit.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use sha2::{Digest, Sha256};

/// Préfixe des valeurs chiffrées
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const KEY_SALT: &[u8] = b"smartschool-config-encryption-v1";
const NONCE_SALT: &[u8] = b"smartschool-nonce-v1";
const NONCE_LEN: usize = 12;

/// Lit l'identifiant stable de la machine
///
/// - Linux : `/etc/machine-id` puis `/var/lib/dbus/machine-id`
/// - macOS : `IOPlatformUUID` via `ioreg`
/// - Windows : `wmic csproduct get UUID`
fn machine_id() -> Result<String> {
    #[cfg(target_os = "linux")]
    {
        for candidate in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = std::fs::read_to_string(candidate) {
                let id = id.trim();
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
        Err(anyhow!("No machine id found in /etc/machine-id or /var/lib/dbus/machine-id"))
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // "IOPlatformUUID" = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"
        stdout
            .lines()
            .find(|line| line.contains("IOPlatformUUID"))
            .and_then(|line| line.split('"').nth(3))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("ioreg did not report an IOPlatformUUID"))
    }

    #[cfg(target_os = "windows")]
    {
        let output = std::process::Command::new("wmic")
            .args(["csproduct", "get", "UUID"])
            .output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        stdout
            .lines()
            .nth(1)
            .map(|line| line.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("wmic did not report a product UUID"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(anyhow!("Cannot derive the access code key on this platform"))
    }
}

fn cipher() -> Result<Aes256Gcm> {
    let mut hasher = Sha256::new();
    hasher.update(machine_id()?.as_bytes());
    hasher.update(KEY_SALT);
    let key = hasher.finalize();

    Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Cannot build the access code cipher: {}", e))
}

/// Chiffre un secret avec la clé de la machine
///
/// Le nonce est dérivé du secret : chiffrer deux fois la même valeur donne
/// la même chaîne, ce qui évite de réécrire le fichier de configuration
/// quand rien n'a changé.
///
/// Format produit : `encrypted:` + base64(nonce ‖ ciphertext)
pub fn encrypt_secret(secret: &str) -> Result<String> {
    let cipher = cipher()?;

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(NONCE_SALT);
    let digest = hasher.finalize();
    let nonce_bytes = &digest[..NONCE_LEN];

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce_bytes), secret.as_bytes())
        .map_err(|e| anyhow!("Cannot encrypt the access code: {}", e))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        ENCRYPTED_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&combined)
    ))
}

/// Déchiffre une valeur `encrypted:...`
pub fn decrypt_secret(encrypted: &str) -> Result<String> {
    let encoded = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Value does not start with `encrypted:`"))?;

    let combined = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| anyhow!("Encrypted access code is not valid base64: {}", e))?;

    if combined.len() < NONCE_LEN {
        return Err(anyhow!("Encrypted access code is truncated"));
    }
    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);

    let plaintext = cipher()?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Cannot decrypt the access code, was it encrypted on another machine? ({})", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Decrypted access code is not UTF-8: {}", e))
}

/// Indique si une valeur est au format chiffré
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Retourne le secret en clair, qu'il soit stocké chiffré ou non
pub fn get_secret(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_secret(value)
    } else {
        Ok(value.to_string())
    }
}
