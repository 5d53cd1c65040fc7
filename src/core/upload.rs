//! Request body resolution from host upload data.

use bytes::Bytes;

use super::session::{BlobStore, StoreError};
use super::types::UploadPart;

/// Resolve the body of an intercepted request.
///
/// Only the first upload part is considered. Blob references are fetched
/// from the blob service; with no blob service attached they resolve to no
/// body.
pub async fn resolve_upload_body(
    parts: &[UploadPart],
    blobs: Option<&dyn BlobStore>,
) -> Result<Option<Bytes>, StoreError> {
    match parts.first() {
        Some(UploadPart::Blob(identifier)) => match blobs {
            Some(store) => Ok(Some(store.fetch(identifier).await?)),
            None => {
                log::debug!("upload references blob {identifier} but no blob store is attached");
                Ok(None)
            }
        },
        Some(UploadPart::Bytes(bytes)) => Ok(Some(bytes.clone())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::MemoryBlobStore;

    #[tokio::test]
    async fn blob_reference_is_fetched() {
        let blobs = MemoryBlobStore::new();
        blobs.insert("uuid-1", Bytes::from_static(b"form=1"));
        let parts = vec![UploadPart::Blob("uuid-1".into())];

        let body = resolve_upload_body(&parts, Some(&blobs)).await.unwrap();
        assert_eq!(body, Some(Bytes::from_static(b"form=1")));
    }

    #[tokio::test]
    async fn literal_bytes_are_used_directly() {
        let parts = vec![
            UploadPart::Bytes(Bytes::from_static(b"first")),
            UploadPart::Bytes(Bytes::from_static(b"second")),
        ];
        let body = resolve_upload_body(&parts, None).await.unwrap();
        assert_eq!(body, Some(Bytes::from_static(b"first")));
    }

    #[tokio::test]
    async fn no_parts_means_no_body() {
        assert_eq!(resolve_upload_body(&[], None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_blob_fails() {
        let blobs = MemoryBlobStore::new();
        let parts = vec![UploadPart::Blob("missing".into())];
        assert!(resolve_upload_body(&parts, Some(&blobs)).await.is_err());
    }
}
