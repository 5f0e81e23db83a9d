use crate::cipher::{CipherError, PayloadCipher};
use crate::config::Config;
use crate::pdf::CertificateRenderer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cipher: PayloadCipher,
    pub renderer: CertificateRenderer,
}

impl AppState {
    /// Derive the cipher key once and wire the renderer to the configured output.
    pub fn new(config: Arc<Config>) -> Result<Self, CipherError> {
        let cipher = PayloadCipher::new(
            &config.cipher.passphrase,
            &config.cipher.iv_seed,
            config.cipher.profile,
        )?;
        let renderer = CertificateRenderer::new(
            config.certificates_dir.clone(),
            config.layout.clone(),
            config.issuer.clone(),
        );

        Ok(Self {
            config,
            cipher,
            renderer,
        })
    }
}
