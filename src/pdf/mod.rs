// Certificate PDF generation
// Layout and serialisation run on the blocking pool; `render` resolves after the
// file has been fsynced and renamed into place.
pub mod fonts;
pub mod layout;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::certificate::Certificate;
use crate::storage;

pub use layout::{format_long_date, DocumentInfo, PagePlan};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not write certificate: {0}")]
    Io(#[from] std::io::Error),

    #[error("background image not found: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("background image could not be decoded: {0}")]
    Image(String),

    #[error("text contains characters the certificate font cannot print: {0}")]
    UnsupportedText(String),

    #[error("PDF serialisation failed: {0}")]
    Pdf(String),

    #[error("render task failed: {0}")]
    Task(String),
}

/// Page design used for every certificate of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Layout {
    /// A4 portrait with a border and a signature line.
    #[default]
    Plain,
    /// A4 landscape over a full-page background image.
    ImageBackground { asset_path: PathBuf },
}

/// A certificate that is completely on disk.
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: usize,
}

impl RenderedCertificate {
    pub fn url(&self) -> String {
        storage::certificate_url(&self.file_name)
    }
}

#[derive(Debug, Clone)]
pub struct CertificateRenderer {
    output_dir: PathBuf,
    layout: Layout,
    issuer: String,
}

impl CertificateRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, layout: Layout, issuer: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            layout,
            issuer: issuer.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build the PDF in memory without touching the output directory.
    pub fn render_to_bytes(&self, certificate: &Certificate) -> Result<Vec<u8>, RenderError> {
        let plan = layout::compose(certificate, &self.layout, &self.issuer);
        let info = DocumentInfo::for_certificate(certificate, &self.issuer);
        layout::draw(&plan, &info)
    }

    /// Render `certificate` to `<output_dir>/<id>.pdf`.
    #[instrument(skip(self, certificate), fields(certificate_id = %certificate.id))]
    pub async fn render(&self, certificate: &Certificate) -> Result<RenderedCertificate, RenderError> {
        let renderer = self.clone();
        let owned = certificate.clone();
        let file_name = certificate.id.file_name();
        let target = file_name.clone();

        let written = tokio::task::spawn_blocking(move || -> Result<(PathBuf, usize), RenderError> {
            let pdf = renderer.render_to_bytes(&owned)?;
            let path = storage::write_atomic(&renderer.output_dir, &target, &pdf)?;
            Ok((path, pdf.len()))
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?;

        let (path, bytes) = written.map_err(|e| {
            error!("Certificate render failed: {}", e);
            e
        })?;

        info!(
            "Certificate {} written to {} ({} bytes)",
            certificate.id,
            path.display(),
            bytes
        );

        Ok(RenderedCertificate {
            path,
            file_name,
            bytes,
        })
    }
}
