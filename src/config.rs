use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::cipher::CipherProfile;
use crate::pdf::Layout;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CERTIFICATES_DIR: &str = "public/certificates";
const DEFAULT_ISSUER: &str = "CSG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Passphrase, IV seed and profile for the payload cipher.
#[derive(Clone)]
pub struct CipherSettings {
    pub passphrase: String,
    pub iv_seed: String,
    pub profile: CipherProfile,
}

impl fmt::Debug for CipherSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSettings")
            .field("passphrase", &"<redacted>")
            .field("iv_seed", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

impl CipherSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let passphrase = required(&lookup, "AES_ENCRYPTION_KEY")?;
        let iv_seed = required(&lookup, "AES_IV")?;
        let profile = match lookup("AES_PROFILE") {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse::<CipherProfile>().map_err(|e| ConfigError::Invalid {
                    key: "AES_PROFILE",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?
            }
            _ => CipherProfile::default(),
        };

        Ok(Self {
            passphrase,
            iv_seed,
            profile,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub certificates_dir: PathBuf,
    pub layout: Layout,
    pub issuer: String,
    pub cipher: CipherSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cipher = CipherSettings::from_lookup(&lookup)?;

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let certificates_dir = base_dir.join(
            lookup("CERTIFICATES_DIR").unwrap_or_else(|| DEFAULT_CERTIFICATES_DIR.to_string()),
        );

        let layout = match lookup("CERTIFICATE_BACKGROUND") {
            Some(path) if !path.trim().is_empty() => Layout::ImageBackground {
                asset_path: base_dir.join(path.trim()),
            },
            _ => Layout::Plain,
        };

        let issuer = lookup("CERTIFICATE_ISSUER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let unprintable = crate::pdf::fonts::unprintable_chars(&issuer);
        if !unprintable.is_empty() {
            return Err(ConfigError::Invalid {
                key: "CERTIFICATE_ISSUER",
                value: issuer,
                reason: format!(
                    "the certificate font cannot print {}",
                    unprintable.into_iter().collect::<String>()
                ),
            });
        }

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ConfigError::Invalid {
                    key: "PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            certificates_dir,
            layout,
            issuer,
            cipher,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}
