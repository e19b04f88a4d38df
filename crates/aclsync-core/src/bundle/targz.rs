//! tar.gz container: identity travels as the payload entry's owner name.

use std::io::Write;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use tar::{Archive, Builder, EntryType, Header};
use tracing::debug;

use super::error::{BundleError, BundleResult};
use super::{Bundle, EntryCollector, Format, UnpackOptions, ENTRY_MODE};

/// Owner and group name for entries that are not the payload.
const DEFAULT_OWNER: &str = "aclsync";

pub(super) fn pack(bundle: &Bundle, now: DateTime<Utc>) -> BundleResult<Vec<u8>> {
    let mtime = u64::try_from(now.timestamp()).unwrap_or(0);
    let encoder = GzBuilder::new()
        .filename(format!("aclsync-{}.tar.gz", now.format("%Y-%m-%dT%H%M%S")))
        .mtime(u32::try_from(mtime).unwrap_or(0))
        .write(Vec::new(), Compression::default());
    let mut tar = Builder::new(encoder);

    for (name, data) in bundle.entries() {
        let owner = if name == bundle.payload_name {
            bundle.identity.as_str()
        } else {
            DEFAULT_OWNER
        };
        append(&mut tar, name, data, owner, mtime)?;
    }

    let mut encoder = tar.into_inner()?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}

fn append<W: Write>(
    tar: &mut Builder<W>,
    name: &str,
    data: &[u8],
    owner: &str,
    mtime: u64,
) -> BundleResult<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(ENTRY_MODE);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(mtime);
    header
        .set_username(owner)
        .map_err(|e| BundleError::pack(format!("owner name '{owner}': {e}")))?;
    header
        .set_groupname(DEFAULT_OWNER)
        .map_err(|e| BundleError::pack(format!("group name: {e}")))?;
    // names past 100 bytes go out as a GNU long-name record
    tar.append_data(&mut header, name, data)
        .map_err(|e| BundleError::pack(format!("entry name '{name}': {e}")))
}

pub(super) fn unpack(bytes: &[u8], options: &UnpackOptions) -> BundleResult<Bundle> {
    let invalid = |e: std::io::Error| BundleError::archive(Format::TarGz, e);

    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut collector = EntryCollector::new(options.limits);

    for entry in archive.entries().map_err(invalid)? {
        let mut entry = entry.map_err(invalid)?;
        collector.count()?;

        let header = entry.header();
        let kind = header.entry_type();
        let declared = header.size().map_err(invalid)?;
        let owner = header.username().ok().flatten().map(str::to_owned);
        let name = entry.path().map_err(invalid)?.to_string_lossy().into_owned();

        if !kind.is_file() {
            debug!(entry = %name, kind = ?kind, "skipping non-regular tar entry");
            continue;
        }

        collector.admit(&name, declared)?;
        let data = collector.read_body(&mut entry, Format::TarGz)?;
        collector.push(name, owner, data);
    }

    collector.finish(options.require_signature)
}
