//! Encrypt a certificate record for the `encryptedData` intake.
//!
//! Reads a JSON object from the file given as the first argument, or from stdin,
//! and prints `{"encryptedData": "..."}` under the configured cipher.

use std::io::Read;

use certifica::cipher::PayloadCipher;
use certifica::config::CipherSettings;
use serde_json::{json, Value};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let settings = CipherSettings::from_lookup(|key| std::env::var(key).ok())?;

    let raw = match std::env::args().nth(1) {
        Some(path) if path != "-" => std::fs::read_to_string(&path)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let record: Value = serde_json::from_str(&raw)?;
    if !record.is_object() {
        return Err("certificate record must be a JSON object".into());
    }

    let cipher = PayloadCipher::new(&settings.passphrase, &settings.iv_seed, settings.profile)?;
    let body = json!({ "encryptedData": cipher.encrypt_json(&record)? });
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
