//! Signed ACL bundle codec.
//!
//! A bundle is a small archive carrying one payload (the ACL text, or a
//! diff report), an optional detached signature and the signer identity.
//! Two container formats are supported:
//!
//! - `tar.gz`: the identity is the owner name of the payload entry.
//! - `zip`: the identity is the per-file comment of the payload entry.
//!
//! On unpack the payload is whichever regular entry ends in `.acl` and the
//! signature is the entry named exactly `signature`. Any other regular
//! entries are kept as extras.

mod error;
mod limits;
mod targz;
mod zipfile;

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::debug;

pub use error::{BundleError, BundleResult};
pub use limits::{UnpackLimits, UnpackLimitsOverrides};

use limits::EntryBudget;

/// Role name of the payload entry, as reported in structural errors.
pub const ACL_ROLE: &str = "ACL";
/// Role name (and entry name) of the detached signature.
pub const SIGNATURE_ROLE: &str = "signature";
/// Entry name suffix that marks the payload entry on unpack.
pub const ACL_SUFFIX: &str = ".acl";

/// File permission bits written for every archive entry.
pub(crate) const ENTRY_MODE: u32 = 0o660;

/// Maximum identity length. Matches the tar owner-name field minus its NUL.
pub const MAX_IDENTITY_LEN: usize = 31;

/// Entry name for an ACL payload: `name` with `.acl` appended when missing.
pub fn acl_entry_name(name: &str) -> String {
    if name.ends_with(ACL_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{ACL_SUFFIX}")
    }
}

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    TarGz,
    Zip,
}

impl Format {
    /// Picks the container format for a bundle location: `.zip` selects zip,
    /// anything else is tar.gz.
    pub fn for_uri(uri: &str) -> Self {
        if uri.ends_with(".zip") {
            Self::Zip
        } else {
            Self::TarGz
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Name of the signer, used to pick the public key `<identity>.pub`.
///
/// [`Identity::new`] and `FromStr` validate. Values read off an archive are
/// kept verbatim so they can be reported; they are checked with
/// [`Identity::is_valid`] when a key is looked up (`KeyStore::public_key`,
/// `load_public_key`), and an invalid one fails there with `NoPublicKey`
/// before any path is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Validated identity.
    pub fn new(value: impl Into<String>) -> BundleResult<Self> {
        let identity = Self(value.into());
        identity.check()?;
        Ok(identity)
    }

    /// Identity exactly as found in an archive.
    pub(crate) fn from_wire(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the identity can safely name a key file.
    pub fn is_valid(&self) -> bool {
        self.problem().is_none()
    }

    pub(crate) fn check(&self) -> BundleResult<()> {
        match self.problem() {
            None => Ok(()),
            Some(problem) => Err(BundleError::pack(format!(
                "invalid identity '{}': {problem}",
                self.0
            ))),
        }
    }

    fn problem(&self) -> Option<&'static str> {
        let s = self.0.as_str();
        if s.is_empty() {
            Some("empty")
        } else if s.len() > MAX_IDENTITY_LEN {
            Some("longer than 31 bytes")
        } else if s.contains(['/', '\\', '\0']) || s.contains("..") {
            Some("contains a path separator or '..'")
        } else {
            None
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Decoded contents of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Name of the payload entry (`<name>.acl` for ACLs, `<name>.rpt` for reports).
    pub payload_name: String,
    pub payload: Vec<u8>,
    /// Detached RSA signature over `payload`.
    pub signature: Option<Vec<u8>>,
    pub identity: Identity,
    /// Regular entries that are neither payload nor signature.
    pub extras: BTreeMap<String, Vec<u8>>,
}

/// Options controlling [`Bundle::unpack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackOptions {
    /// Fail with `MissingEntry` when the signature entry is absent.
    pub require_signature: bool,
    pub limits: UnpackLimits,
}

impl UnpackOptions {
    pub fn new(require_signature: bool) -> Self {
        Self {
            require_signature,
            limits: UnpackLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: UnpackLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl Bundle {
    pub fn new(payload_name: impl Into<String>, payload: Vec<u8>, identity: Identity) -> Self {
        Self {
            payload_name: payload_name.into(),
            payload,
            signature: None,
            identity,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.extras.insert(name.into(), data);
        self
    }

    /// Encode the bundle in the given container format.
    pub fn pack(&self, format: Format) -> BundleResult<Vec<u8>> {
        self.pack_at(format, Utc::now())
    }

    /// Encode with an explicit timestamp (used for entry mtimes and the gzip name).
    pub fn pack_at(&self, format: Format, now: DateTime<Utc>) -> BundleResult<Vec<u8>> {
        self.check_packable()?;
        let bytes = match format {
            Format::TarGz => targz::pack(self, now)?,
            Format::Zip => zipfile::pack(self)?,
        };
        debug!(
            format = %format,
            payload = %self.payload_name,
            identity = %self.identity,
            bytes = bytes.len(),
            "packed bundle"
        );
        Ok(bytes)
    }

    /// Decode a bundle from archive bytes.
    pub fn unpack(bytes: &[u8], format: Format, options: &UnpackOptions) -> BundleResult<Self> {
        options.limits.check_archive(bytes.len())?;
        let bundle = match format {
            Format::TarGz => targz::unpack(bytes, options)?,
            Format::Zip => zipfile::unpack(bytes, options)?,
        };
        debug!(
            format = %format,
            payload = %bundle.payload_name,
            identity = %bundle.identity,
            signed = bundle.signature.is_some(),
            extras = bundle.extras.len(),
            "unpacked bundle"
        );
        Ok(bundle)
    }

    /// Entries in archive order: payload, signature, extras.
    pub(crate) fn entries(&self) -> Vec<(&str, &[u8])> {
        let mut entries = vec![(self.payload_name.as_str(), self.payload.as_slice())];
        if let Some(signature) = &self.signature {
            entries.push((SIGNATURE_ROLE, signature.as_slice()));
        }
        entries.extend(self.extras.iter().map(|(k, v)| (k.as_str(), v.as_slice())));
        entries
    }

    fn check_packable(&self) -> BundleResult<()> {
        self.identity.check()?;
        if self.payload_name.is_empty() || self.payload_name == SIGNATURE_ROLE {
            return Err(BundleError::pack(format!(
                "invalid payload entry name '{}'",
                self.payload_name
            )));
        }
        for name in self.extras.keys() {
            if name == SIGNATURE_ROLE || name.ends_with(ACL_SUFFIX) || *name == self.payload_name {
                return Err(BundleError::pack(format!(
                    "extra entry '{name}' collides with a reserved entry"
                )));
            }
        }
        Ok(())
    }
}

/// What an archive entry is, judged by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Payload,
    Signature,
    Extra,
}

impl Role {
    fn of(name: &str) -> Self {
        if name == SIGNATURE_ROLE {
            Self::Signature
        } else if name.ends_with(ACL_SUFFIX) {
            Self::Payload
        } else {
            Self::Extra
        }
    }
}

/// Collects regular entries during unpack and resolves roles at the end.
struct EntryCollector {
    budget: EntryBudget,
    limits: UnpackLimits,
    seen: usize,
    payloads: Vec<(String, Vec<u8>, Option<String>)>,
    signatures: Vec<Vec<u8>>,
    extras: BTreeMap<String, Vec<u8>>,
    duplicate_extra: Option<String>,
}

impl EntryCollector {
    fn new(limits: UnpackLimits) -> Self {
        Self {
            budget: EntryBudget::new(limits),
            limits,
            seen: 0,
            payloads: Vec::new(),
            signatures: Vec::new(),
            extras: BTreeMap::new(),
            duplicate_extra: None,
        }
    }

    /// Count an entry (regular or not) against the entry limit.
    fn count(&mut self) -> BundleResult<()> {
        self.seen += 1;
        self.limits.check_entry_count(self.seen)
    }

    /// Check name and declared size before the body is read.
    fn admit(&mut self, name: &str, declared: u64) -> BundleResult<()> {
        self.limits.check_name(name)?;
        self.budget.reserve(declared)
    }

    /// Read an admitted entry body and charge its real size to the budget.
    fn read_body<R: Read>(&mut self, reader: R, format: Format) -> BundleResult<Vec<u8>> {
        let data = self
            .budget
            .read_entry(reader)
            .map_err(|e| BundleError::archive(format, e))?;
        self.budget.consume(data.len() as u64)?;
        Ok(data)
    }

    fn push(&mut self, name: String, owner: Option<String>, data: Vec<u8>) {
        match Role::of(&name) {
            Role::Payload => self.payloads.push((name, data, owner)),
            Role::Signature => self.signatures.push(data),
            Role::Extra => {
                if self.extras.contains_key(&name) {
                    if self.duplicate_extra.is_none() {
                        self.duplicate_extra = Some(name);
                    }
                } else {
                    self.extras.insert(name, data);
                }
            }
        }
    }

    fn finish(mut self, require_signature: bool) -> BundleResult<Bundle> {
        if self.payloads.len() > 1 {
            return Err(BundleError::duplicate(ACL_ROLE));
        }
        if self.signatures.len() > 1 {
            return Err(BundleError::duplicate(SIGNATURE_ROLE));
        }
        if let Some(name) = self.duplicate_extra {
            return Err(BundleError::duplicate(name));
        }
        let Some((payload_name, payload, owner)) = self.payloads.pop() else {
            return Err(BundleError::missing(ACL_ROLE));
        };
        let signature = self.signatures.pop();
        if require_signature && signature.is_none() {
            return Err(BundleError::missing(SIGNATURE_ROLE));
        }
        Ok(Bundle {
            payload_name,
            payload,
            signature,
            identity: Identity::from_wire(owner.unwrap_or_default()),
            extras: self.extras,
        })
    }
}
