//! zip container: identity travels as the payload entry's file comment.

use std::io::{Cursor, Write};

use ::zip::result::ZipError;
use ::zip::write::FullFileOptions;
use ::zip::{ZipArchive, ZipWriter};
use tracing::debug;

use super::error::{BundleError, BundleResult};
use super::{Bundle, EntryCollector, Format, UnpackOptions, ENTRY_MODE};

fn invalid(e: impl std::fmt::Display) -> BundleError {
    BundleError::archive(Format::Zip, e)
}

pub(super) fn pack(bundle: &Bundle) -> BundleResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, data) in bundle.entries() {
        let mut options = FullFileOptions::default().unix_permissions(ENTRY_MODE);
        if name == bundle.payload_name {
            options = options.with_file_comment(bundle.identity.as_str());
        }
        zip.start_file(name, options).map_err(pack_error)?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish().map_err(pack_error)?;
    Ok(cursor.into_inner())
}

fn pack_error(e: ZipError) -> BundleError {
    match e {
        ZipError::Io(e) => BundleError::Io(e),
        other => BundleError::pack(other.to_string()),
    }
}

pub(super) fn unpack(bytes: &[u8], options: &UnpackOptions) -> BundleResult<Bundle> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(invalid)?;
    options.limits.check_entry_count(archive.len())?;

    let mut collector = EntryCollector::new(options.limits);
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(invalid)?;
        collector.count()?;

        let name = file.name().to_string();
        if !file.is_file() {
            debug!(entry = %name, "skipping non-regular zip entry");
            continue;
        }

        let comment = file.comment().to_string();
        collector.admit(&name, file.size())?;
        let data = collector.read_body(&mut file, Format::Zip)?;
        collector.push(name, Some(comment), data);
    }

    collector.finish(options.require_signature)
}

#[cfg(test)]
mod tests {
    use ::zip::write::SimpleFileOptions;
    use ::zip::CompressionMethod;

    use super::*;
    use crate::bundle::{Identity, UnpackLimits};

    const LOCAL_HEADER: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
    const CENTRAL_HEADER: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];

    /// Overwrite the uncompressed size of every local and central header.
    fn understate_sizes(bytes: &mut [u8], size: u32) {
        let mut i = 0;
        while i + 4 <= bytes.len() {
            let offset = if bytes[i..i + 4] == LOCAL_HEADER {
                Some(22)
            } else if bytes[i..i + 4] == CENTRAL_HEADER {
                Some(24)
            } else {
                None
            };
            if let Some(offset) = offset {
                bytes[i + offset..i + offset + 4].copy_from_slice(&size.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn test_pack_puts_identity_in_payload_comment() {
        let bundle = Bundle::new(
            "svc-a.acl",
            b"1,Alice,101\n".to_vec(),
            Identity::new("svc-a").unwrap(),
        )
        .with_signature(vec![7; 16]);
        let bytes = pack(&bundle).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let payload = archive.by_name("svc-a.acl").unwrap();
        assert_eq!(payload.comment(), "svc-a");
        assert_eq!(payload.unix_mode().map(|m| m & 0o777), Some(0o660));
        drop(payload);
        let signature = archive.by_name("signature").unwrap();
        assert_eq!(signature.comment(), "");
    }

    #[test]
    fn test_unpack_foreign_zip_with_directory_and_extra() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.add_directory("nested/", SimpleFileOptions::default()).unwrap();
        zip.start_file(
            "site.acl",
            FullFileOptions::default().with_file_comment("svc-c"),
        )
        .unwrap();
        zip.write_all(b"2,Carol,9\n").unwrap();
        zip.start_file("README", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"hello").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let bundle = unpack(&bytes, &UnpackOptions::new(false)).unwrap();
        assert_eq!(bundle.identity.as_str(), "svc-c");
        assert_eq!(bundle.payload, b"2,Carol,9\n");
        assert!(bundle.signature.is_none());
        assert_eq!(bundle.extras.get("README").map(Vec::as_slice), Some(&b"hello"[..]));
    }

    #[test]
    fn test_total_limit_counts_bytes_read_not_declared() {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for name in ["x.acl", "e1", "e2"] {
            zip.start_file(name, stored).unwrap();
            zip.write_all(&[b'a'; 100]).unwrap();
        }
        let mut bytes = zip.finish().unwrap().into_inner();
        understate_sizes(&mut bytes, 1);

        let options = UnpackOptions::new(false).with_limits(UnpackLimits {
            max_entry_bytes: 100,
            max_total_bytes: 150,
            ..Default::default()
        });
        let err = unpack(&bytes, &options).unwrap_err();
        assert!(matches!(
            err,
            BundleError::LimitExceeded {
                limit: "total uncompressed size",
                ..
            }
        ));
    }

    #[test]
    fn test_unpack_truncated_zip() {
        let bundle = Bundle::new("a.acl", b"x".to_vec(), Identity::new("svc").unwrap());
        let bytes = pack(&bundle).unwrap();
        let err = unpack(&bytes[..bytes.len() / 2], &UnpackOptions::new(false)).unwrap_err();
        assert!(matches!(err, BundleError::Archive { format: Format::Zip, .. }));
    }
}
