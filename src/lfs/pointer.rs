//! Parsing helpers for `.lfsconfig` files and LFS pointer files, plus the
//! content-addressed object URL layout.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::LfsError;

static LFS_ENDPOINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url = "(?P<endpoint>[^"]+)""#).unwrap());

static POINTER_OID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"oid sha256:(?P<oid>[0-9a-fA-F]{4,})").unwrap());

/// Extract the configured LFS endpoint from `.lfsconfig` contents.
pub fn parse_lfs_endpoint(config: &str) -> Result<String, LfsError> {
    LFS_ENDPOINT_RE
        .captures(config)
        .and_then(|caps| caps.name("endpoint"))
        .map(|m| m.as_str().trim().to_string())
        .ok_or(LfsError::MissingEndpoint)
}

/// Extract the SHA-256 object id from a pointer file.
pub fn parse_pointer_oid(pointer: &str) -> Result<String, LfsError> {
    POINTER_OID_RE
        .captures(pointer)
        .and_then(|caps| caps.name("oid"))
        .map(|m| m.as_str().to_ascii_lowercase())
        .ok_or(LfsError::MissingOid)
}

/// Build `<endpoint without api/lfs/>/objects/<oid[0:2]>/<oid[2:4]>/<oid>`.
pub fn object_url(endpoint: &str, oid: &str) -> Result<Url, LfsError> {
    if oid.len() < 4 || !oid.is_ascii() {
        return Err(LfsError::MissingOid);
    }

    let base = endpoint.replacen("api/lfs/", "", 1);
    let base = base.trim_end_matches('/');
    let raw = format!("{base}/objects/{}/{}/{oid}", &oid[0..2], &oid[2..4]);

    Url::parse(&raw).map_err(|err| LfsError::InvalidObjectUrl(format!("{raw}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OID: &str = "abc123def4567890abc123def4567890abc123def4567890abc123def4567890";

    #[test]
    fn reads_endpoint_from_lfsconfig() {
        let config = "[lfs]\n\turl = \"https://host/api/lfs/storage\"\n";
        assert_eq!(
            parse_lfs_endpoint(config).unwrap(),
            "https://host/api/lfs/storage"
        );
    }

    #[test]
    fn missing_endpoint_is_reported() {
        assert!(matches!(
            parse_lfs_endpoint("[core]\n\tbare = false\n"),
            Err(LfsError::MissingEndpoint)
        ));
    }

    #[test]
    fn reads_oid_from_pointer() {
        let pointer = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{OID}\nsize 12345\n"
        );
        assert_eq!(parse_pointer_oid(&pointer).unwrap(), OID);
    }

    #[test]
    fn non_pointer_body_is_reported() {
        assert!(matches!(
            parse_pointer_oid("\u{89}PNG binary data"),
            Err(LfsError::MissingOid)
        ));
    }

    #[test]
    fn builds_content_addressed_object_url() {
        let url = object_url("https://host/api/lfs/storage", OID).unwrap();
        assert_eq!(
            url.as_str(),
            format!("https://host/storage/objects/ab/c1/{OID}")
        );
    }

    #[test]
    fn endpoint_without_api_segment_is_kept() {
        let url = object_url("https://lfs.example.com/repo/", "abcd").unwrap();
        assert_eq!(url.as_str(), "https://lfs.example.com/repo/objects/ab/cd/abcd");
    }
}
