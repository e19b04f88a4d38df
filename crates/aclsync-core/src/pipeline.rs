//! End-to-end flows: fetch → unpack → verify, and sign → pack → store.
//!
//! Every stage completes before the next starts; a bundle that fails to
//! unpack or verify never reaches the caller.

use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::auth::{KeyStore, Signer};
use crate::bundle::{
    acl_entry_name, Bundle, BundleError, Format, UnpackLimits, UnpackOptions, SIGNATURE_ROLE,
};
use crate::config::Settings;
use crate::error::Result;
use crate::report::{Report, ReportTemplate};
use crate::transport::{Locator, Transport};

/// Whether fetched bundles must carry a valid signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verification {
    #[default]
    Required,
    Disabled,
}

impl Verification {
    pub fn from_no_verify(no_verify: bool) -> Self {
        if no_verify {
            Self::Disabled
        } else {
            Self::Required
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    transport: Transport,
    keys: KeyStore,
    limits: UnpackLimits,
}

impl Pipeline {
    pub fn new(transport: Transport, keys: KeyStore) -> Self {
        Self {
            transport,
            keys,
            limits: UnpackLimits::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = Transport::new(&settings.transport_config())?;
        Ok(Self::new(transport, settings.key_store()).with_limits(settings.unpack_limits()))
    }

    pub fn with_limits(mut self, limits: UnpackLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Download the bundle at `uri`, unpack it and check its signature.
    pub async fn fetch(&self, uri: &str, verification: Verification) -> Result<Bundle> {
        let locator = Locator::parse(uri)?;
        let format = Format::for_uri(uri);
        let bytes = self.transport.fetch_locator(&locator).await?;
        self.open(&bytes, format, verification)
    }

    /// Unpack and verify archive bytes already in memory.
    pub fn open(&self, bytes: &[u8], format: Format, verification: Verification) -> Result<Bundle> {
        let require_signature = verification == Verification::Required;
        let options = UnpackOptions::new(require_signature).with_limits(self.limits);
        let bundle = Bundle::unpack(bytes, format, &options)?;
        info!(
            payload = %bundle.payload_name,
            identity = %bundle.identity,
            bytes = bundle.payload.len(),
            "extracted"
        );

        if verification == Verification::Disabled {
            warn!(identity = %bundle.identity, "signature verification disabled");
            return Ok(bundle);
        }
        let signature = bundle
            .signature
            .as_deref()
            .ok_or_else(|| BundleError::missing(SIGNATURE_ROLE))?;
        self.keys.verify(&bundle.identity, &bundle.payload, signature)?;
        info!(identity = %bundle.identity, "verified");
        Ok(bundle)
    }

    /// Sign `payload`, pack it as `<name>.acl` and store it at `uri`.
    pub async fn store_acl(
        &self,
        uri: &str,
        name: &str,
        payload: Vec<u8>,
        signer: &Signer,
    ) -> Result<()> {
        let locator = Locator::parse(uri)?;
        let bundle = sign_bundle(acl_entry_name(name), payload, signer)?;
        self.upload(&locator, Format::for_uri(uri), &bundle).await
    }

    /// Render a diff report, sign it and store it at `uri`.
    pub async fn publish_report(
        &self,
        uri: &str,
        template: &ReportTemplate,
        diff: &str,
        signer: &Signer,
    ) -> Result<Report> {
        let locator = Locator::parse(uri)?;
        let report = Report::render(template, diff, Utc::now());
        let bundle = sign_bundle(report.name.clone(), report.text.clone().into_bytes(), signer)?;
        self.upload(&locator, Format::for_uri(uri), &bundle).await?;
        Ok(report)
    }

    async fn upload(&self, locator: &Locator, format: Format, bundle: &Bundle) -> Result<()> {
        let bytes = bundle.pack(format)?;
        self.transport.store_locator(locator, Bytes::from(bytes)).await?;
        Ok(())
    }
}

fn sign_bundle(name: String, payload: Vec<u8>, signer: &Signer) -> Result<Bundle> {
    let signature = signer.sign(&payload)?;
    info!(
        identity = %signer.identity(),
        payload = %name,
        sha256 = %hex::encode(Sha256::digest(&payload)),
        "signed"
    );
    Ok(Bundle::new(name, payload, signer.identity().clone()).with_signature(signature))
}
