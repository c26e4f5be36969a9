//! Ticket artifact issuance: payload, QR render, store, public URL.

use crate::artifact::file::ArtifactStore;
use crate::artifact::payload::{CheckInPayload, PayloadSigner};
use crate::domain::TicketForm;
use crate::TicketgateError;
use qrcode::render::svg;
use qrcode::QrCode;
use std::sync::Arc;
use std::time::Duration;

/// Storage attempts per artifact before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Render `content` as a standalone SVG QR code.
pub fn render_qr_svg(content: &str) -> Result<String, TicketgateError> {
    let code = QrCode::new(content.as_bytes())
        .map_err(|e| TicketgateError::ArtifactGeneration(format!("QR encode failed: {}", e)))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#FFFFFF"))
        .build())
}

/// Produces the scannable check-in artifact for a ticket form.
pub struct TicketArtifactIssuer {
    signer: PayloadSigner,
    store: Arc<dyn ArtifactStore>,
    public_base_url: String,
    max_attempts: u32,
    backoff: Duration,
}

impl TicketArtifactIssuer {
    /// Create an issuer writing to `store` and linking under `public_base_url`.
    pub fn new(
        signer: PayloadSigner,
        store: Arc<dyn ArtifactStore>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override the storage retry policy.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Artifact file name for a ticket form.
    pub fn file_name(form: &TicketForm) -> String {
        format!("{}.svg", form.id)
    }

    /// Public URL the stored artifact resolves at.
    pub fn artifact_url(&self, form: &TicketForm) -> String {
        format!("{}/artifacts/{}", self.public_base_url, Self::file_name(form))
    }

    /// Issue the artifact for `form` and return its URL.
    ///
    /// Re-issuing overwrites the previous file; the content is deterministic
    /// for a given form, so the URL is stable.
    ///
    /// # Errors
    /// * `ArtifactGeneration` - payload could not be encoded or rendered
    /// * `ArtifactIO` - storage failed on every attempt
    pub async fn issue(&self, form: &TicketForm) -> Result<String, TicketgateError> {
        let content = self.signer.encode(&CheckInPayload {
            transaction_id: form.transaction_id,
            ticket_form_id: form.id,
        })?;
        let svg = render_qr_svg(&content)?;
        let file_name = Self::file_name(form);

        let mut attempt = 1;
        loop {
            match self.store.put(&file_name, svg.as_bytes()).await {
                Ok(()) => break,
                Err(TicketgateError::ArtifactIO(reason)) if attempt < self.max_attempts => {
                    tracing::warn!(
                        ticket_form_id = %form.id,
                        attempt,
                        %reason,
                        "artifact write failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let url = self.artifact_url(form);
        tracing::info!(ticket_form_id = %form.id, %url, "artifact issued");
        Ok(url)
    }
}
