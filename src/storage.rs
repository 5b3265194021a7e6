use std::sync::Arc;

use bytes::Bytes;
use url::Url;
use zarrs::{
    filesystem::FilesystemStore,
    storage::{
        MaybeBytes, MaybeBytesIterator, ReadableStorage, ReadableStorageTraits, StorageError,
        StoreKey,
        byte_range::{ByteRange, ByteRangeIterator},
    },
};

use crate::s3::{S3Client, join_key, parse_s3_uri};

/// Read-only store over objects below an HTTP(S) base URL.
///
/// Public S3 buckets are read through their HTTPS endpoint.
/// Only whole objects are fetched.
pub struct HttpStore {
    agent: ureq::Agent,
    base: Url,
}

impl HttpStore {
    pub fn new(agent: ureq::Agent, base: Url) -> Self {
        Self { agent, base }
    }

    /// Store rooted at an `s3://bucket/prefix` URI.
    pub fn from_s3_uri(client: &S3Client, uri: &str) -> crate::Result<Self> {
        let (bucket, prefix) = parse_s3_uri(uri)?;
        let base = client.object_url(&bucket, &prefix)?;
        Ok(Self::new(client.agent().clone(), base))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn key_url(&self, key: &StoreKey) -> Result<Url, StorageError> {
        join_key(self.base.clone(), key.as_str()).map_err(to_storage_error)
    }
}

fn to_storage_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::from(std::io::Error::other(e.to_string()))
}

fn is_not_found(e: &ureq::Error) -> bool {
    // S3 answers 403 rather than 404 for missing keys in buckets which deny listing.
    matches!(e, ureq::Error::StatusCode(404 | 403))
}

impl ReadableStorageTraits for HttpStore {
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let url = self.key_url(key)?;
        let response = match self.agent.head(url.as_str()).call() {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(to_storage_error(e)),
        };
        let length = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| to_storage_error(format!("no content length for {}", key.as_str())))?;
        Ok(Some(length))
    }

    fn supports_get_partial(&self) -> bool {
        false
    }

    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let url = self.key_url(key)?;
        log::trace!("GET {url}");
        let mut response = match self.agent.get(url.as_str()).call() {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => {
                log::trace!("{url} not found");
                return Ok(None);
            }
            Err(e) => return Err(to_storage_error(e)),
        };
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(to_storage_error)?;
        Ok(Some(Bytes::from(body)))
    }

    fn get_partial_many<'a>(
        &'a self,
        _key: &StoreKey,
        _byte_ranges: ByteRangeIterator<'a>,
    ) -> Result<MaybeBytesIterator<'a>, StorageError> {
        Err(StorageError::Unsupported(
            "get_partial_many not supported".into(),
        ))
    }

    fn get_partial(
        &self,
        _key: &StoreKey,
        _byte_range: ByteRange,
    ) -> Result<MaybeBytes, StorageError> {
        Err(StorageError::Unsupported(
            "get_partial not supported".into(),
        ))
    }
}

/// Open a read-only store for a Zarr hierarchy.
///
/// `s3://` URIs are read anonymously, `http(s)://` URLs directly, anything else from the filesystem.
pub fn open_store(uri: &str) -> crate::Result<ReadableStorage> {
    if uri.starts_with("s3://") {
        log::debug!("opening S3 store at {uri}");
        let client = S3Client::default();
        return Ok(Arc::new(HttpStore::from_s3_uri(&client, uri)?));
    }
    if uri.starts_with("http://") || uri.starts_with("https://") {
        log::debug!("opening HTTP store at {uri}");
        let base = Url::parse(uri).map_err(|e| crate::Error::invalid_uri(e.to_string(), uri))?;
        let agent = S3Client::default().agent().clone();
        return Ok(Arc::new(HttpStore::new(agent, base)));
    }
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    log::debug!("opening filesystem store at {path}");
    let store = FilesystemStore::new(path).map_err(crate::Error::wrap)?;
    Ok(Arc::new(store))
}
