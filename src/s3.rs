//! Anonymous reads of JSON and other objects from S3.
use std::{path::Path, time::Duration};

use bytes::Bytes;
use url::Url;

/// Region used when none is configured; most open neuroscience data lives here.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Connection settings for [S3Client].
#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    pub region: String,
    /// Alternative endpoint (e.g. a local S3-compatible server), addressed path-style.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl S3Config {
    /// Defaults, overridden by `AWS_REGION`/`AWS_DEFAULT_REGION` and `AWS_ENDPOINT_URL`.
    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Some(region) = ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
        {
            out.region = region;
        }
        out.endpoint = std::env::var("AWS_ENDPOINT_URL")
            .ok()
            .filter(|v| !v.is_empty());
        out
    }
}

/// Unsigned S3 client for public buckets.
#[derive(Clone)]
pub struct S3Client {
    config: S3Config,
    agent: ureq::Agent,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for S3Client {
    fn default() -> Self {
        Self::new(S3Config::from_env())
    }
}

impl S3Client {
    pub fn new(config: S3Config) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(config.timeout)
            .build()
            .into();
        Self { config, agent }
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    pub(crate) fn agent(&self) -> &ureq::Agent {
        &self.agent
    }

    /// URL of the bucket root, ending in `/`.
    pub fn bucket_url(&self, bucket: &str) -> crate::Result<Url> {
        let s = match &self.config.endpoint {
            Some(endpoint) => format!("{}/{bucket}/", endpoint.trim_end_matches('/')),
            None => format!("https://{bucket}.s3.{}.amazonaws.com/", self.config.region),
        };
        Url::parse(&s).map_err(|e| crate::Error::invalid_uri(e.to_string(), s))
    }

    /// URL of an object.
    pub fn object_url(&self, bucket: &str, key: &str) -> crate::Result<Url> {
        join_key(self.bucket_url(bucket)?, key)
    }

    /// Fetch the bytes of an object.
    pub fn get_object(&self, bucket: &str, key: &str) -> crate::Result<Bytes> {
        let url = self.object_url(bucket, key)?;
        log::debug!("fetching s3://{bucket}/{key} from {url}");
        let mut response = self.agent.get(url.as_str()).call()?;
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()?;
        Ok(Bytes::from(body))
    }
}

/// Append a `/`-separated key to a base URL ending in `/`.
pub(crate) fn join_key(mut base: Url, key: &str) -> crate::Result<Url> {
    let base_str = base.to_string();
    {
        let mut segments = base
            .path_segments_mut()
            .map_err(|_| crate::Error::invalid_uri("URL cannot be a base", base_str))?;
        segments.pop_if_empty();
        segments.extend(key.split('/').filter(|s| !s.is_empty()));
    }
    Ok(base)
}

/// Split an S3 URI into bucket and key.
pub fn parse_s3_uri(s3_uri: &str) -> crate::Result<(String, String)> {
    let Some(rest) = s3_uri.strip_prefix("s3://") else {
        return Err(crate::Error::invalid_uri("Not a valid S3 URI", s3_uri));
    };
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(crate::Error::invalid_uri("S3 URI has no bucket", s3_uri));
    }
    Ok((bucket.to_string(), key.trim_start_matches('/').to_string()))
}

/// Read a JSON object from S3, using a default client if none is given.
pub fn get_s3_json(
    bucket: &str,
    key: &str,
    s3_client: Option<&S3Client>,
) -> crate::Result<serde_json::Value> {
    let owned;
    let client = match s3_client {
        Some(c) => c,
        None => {
            owned = S3Client::default();
            &owned
        }
    };
    let body = client.get_object(bucket, key)?;
    Ok(serde_json::from_slice(&body)?)
}

pub fn get_s3_json_uri(uri: &str, s3_client: Option<&S3Client>) -> crate::Result<serde_json::Value> {
    let (bucket, key) = parse_s3_uri(uri)?;
    get_s3_json(&bucket, &key, s3_client)
}

/// Read a JSON metadata document from an S3 URI or a local path.
pub fn read_metadata_json(location: &str) -> crate::Result<serde_json::Value> {
    if location.starts_with("s3://") {
        get_s3_json_uri(location, None)
    } else {
        let f = std::fs::File::open(Path::new(location))?;
        Ok(serde_json::from_reader(std::io::BufReader::new(f))?)
    }
}
