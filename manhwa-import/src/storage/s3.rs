//! S3-compatible object store client
//!
//! Talks to a MinIO (or any S3-compatible) endpoint over plain HTTP
//! with AWS Signature Version 4 request signing. Only the handful of
//! operations the import pipeline needs are implemented; listings use
//! ListObjectsV2 with continuation-token pagination.

use super::{ObjectInfo, ObjectStore, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use sha2::{Digest, Sha256};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default timeout for object store requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// SigV4 constant for an empty request body
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL, e.g. `http://localhost:9000`
    pub endpoint: String,
    /// Bucket holding generated and imported assets
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// SigV4 region; MinIO accepts any, default `us-east-1`
    pub region: String,
    /// Endpoint advertised in public asset URLs, when different from
    /// the internal one (e.g. behind a reverse proxy)
    pub public_endpoint: Option<String>,
}

/// S3-compatible object store gateway
pub struct S3ObjectStore {
    http_client: Client,
    config: S3Config,
    /// `host[:port]` part of the endpoint, used for signing
    host: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        let host = config
            .endpoint
            .trim_end_matches('/')
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .to_string();
        if host.is_empty() {
            return Err(StorageError::InvalidResponse(format!(
                "Invalid object store endpoint: {}",
                config.endpoint
            )));
        }

        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Unavailable(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            host,
        })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    /// Sign and send one request. `query` must be the raw (unencoded)
    /// key/value pairs; `body` is empty for GET/HEAD/DELETE.
    async fn send(
        &self,
        method: Method,
        key_path: &str,
        query: &[(String, String)],
        body: Vec<u8>,
        content_type: Option<&str>,
        extra_headers: &[(String, String)],
    ) -> Result<reqwest::Response, StorageError> {
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let payload_hash = if body.is_empty() {
            EMPTY_PAYLOAD_SHA256.to_string()
        } else {
            hex::encode(Sha256::digest(&body))
        };

        // Canonical URI: /bucket/key with every segment encoded,
        // slashes preserved
        let canonical_uri = format!(
            "/{}/{}",
            uri_encode(&self.config.bucket, false),
            uri_encode(key_path, false)
        );
        let canonical_uri = canonical_uri.trim_end_matches('/').to_string();
        let canonical_uri = if canonical_uri.is_empty() {
            "/".to_string()
        } else {
            canonical_uri
        };

        let mut encoded_query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
            .collect();
        encoded_query.sort();
        let canonical_query = encoded_query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        // Headers participating in the signature, sorted by name
        let mut signed: Vec<(String, String)> = vec![
            ("host".to_string(), self.host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ct) = content_type {
            signed.push(("content-type".to_string(), ct.to_string()));
        }
        for (name, value) in extra_headers {
            signed.push((name.to_lowercase(), value.clone()));
        }
        signed.sort();

        let canonical_headers: String = signed
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect();
        let signed_header_names = signed
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri,
            canonical_query,
            canonical_headers,
            signed_header_names,
            payload_hash
        );

        let scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = hex::encode(self.signing_key(&date_stamp, &string_to_sign));
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.config.access_key, scope, signed_header_names, signature
        );

        let mut url = format!("{}{}", self.endpoint(), canonical_uri);
        if !canonical_query.is_empty() {
            url.push('?');
            url.push_str(&canonical_query);
        }

        let mut request = self
            .http_client
            .request(method, &url)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("authorization", &authorization);
        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        for (name, value) in extra_headers {
            request = request.header(name, value);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                StorageError::Unavailable(e.to_string())
            } else {
                StorageError::InvalidResponse(e.to_string())
            }
        })
    }

    /// Derive the SigV4 signing key and sign the string
    fn signing_key(&self, date_stamp: &str, string_to_sign: &str) -> Vec<u8> {
        fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
            let mut mac =
                HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }

        let secret = format!("AWS4{}", self.config.secret_key);
        let date_key = hmac(secret.as_bytes(), date_stamp.as_bytes());
        let region_key = hmac(&date_key, self.config.region.as_bytes());
        let service_key = hmac(&region_key, b"s3");
        let signing_key = hmac(&service_key, b"aws4_request");
        hmac(&signing_key, string_to_sign.as_bytes())
    }

    fn per_object_error(key: &str, status: StatusCode, body: String) -> StorageError {
        if status == StatusCode::NOT_FOUND {
            StorageError::NotFound(key.to_string())
        } else if status.is_server_error() {
            StorageError::Unavailable(format!("{}: {}", status, body))
        } else {
            StorageError::Rejected {
                key: key.to_string(),
                message: format!("{}: {}", status, body),
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("prefix".to_string(), prefix.to_string()),
            ];
            if !recursive {
                query.push(("delimiter".to_string(), "/".to_string()));
            }
            if let Some(token) = &continuation {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let response = self
                .send(Method::GET, "", &query, Vec::new(), None, &[])
                .await?;
            let status = response.status();
            let body = response.text().await.map_err(|e| {
                StorageError::InvalidResponse(format!("Listing body read failed: {}", e))
            })?;
            if !status.is_success() {
                return Err(Self::per_object_error(prefix, status, body));
            }

            let page = ListPage::parse(&body)?;
            objects.extend(page.objects);
            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .send(Method::GET, key, &[], Vec::new(), None, &[])
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::per_object_error(key, status, body));
        }
        let bytes = response.bytes().await.map_err(|e| {
            StorageError::InvalidResponse(format!("Object body read failed: {}", e))
        })?;
        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .send(Method::PUT, key, &[], data, Some(content_type), &[])
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::per_object_error(key, status, body));
        }
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StorageError> {
        let copy_source = format!(
            "/{}/{}",
            uri_encode(&self.config.bucket, false),
            uri_encode(src_key, false)
        );
        let headers = [("x-amz-copy-source".to_string(), copy_source)];
        let response = self
            .send(Method::PUT, dst_key, &[], Vec::new(), None, &headers)
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Self::per_object_error(src_key, status, body));
        }
        // S3 reports copy failures inside a 200 response body
        if body.contains("<Error>") {
            return Err(StorageError::Rejected {
                key: src_key.to_string(),
                message: format!("Copy failed: {}", body),
            });
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .send(Method::DELETE, key, &[], Vec::new(), None, &[])
            .await?;
        let status = response.status();
        // 204 on success; deleting a missing key also succeeds
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::per_object_error(key, status, body));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let response = self
            .send(Method::HEAD, key, &[], Vec::new(), None, &[])
            .await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(Self::per_object_error(key, s, String::new())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        let base = self
            .config
            .public_endpoint
            .as_deref()
            .unwrap_or_else(|| self.endpoint());
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            self.config.bucket,
            key
        )
    }
}

/// One page of a ListObjectsV2 response
#[derive(Debug, Default)]
struct ListPage {
    objects: Vec<ObjectInfo>,
    next_continuation: Option<String>,
}

impl ListPage {
    /// Extract `<Contents>` entries and the continuation token from a
    /// ListObjectsV2 XML body. The response schema is flat enough that
    /// a tag scanner suffices; keys are XML-unescaped.
    fn parse(xml: &str) -> Result<Self, StorageError> {
        if !xml.contains("<ListBucketResult") {
            return Err(StorageError::InvalidResponse(
                "Listing response is not a ListBucketResult".to_string(),
            ));
        }

        let mut page = ListPage::default();
        let mut rest = xml;
        while let Some(block) = tag_block(rest, "Contents") {
            let key = tag_block(block.inner, "Key")
                .map(|b| xml_unescape(b.inner))
                .ok_or_else(|| {
                    StorageError::InvalidResponse("Contents entry without Key".to_string())
                })?;
            let size = tag_block(block.inner, "Size")
                .and_then(|b| b.inner.trim().parse().ok())
                .unwrap_or(0);
            page.objects.push(ObjectInfo { key, size });
            rest = block.after;
        }

        if tag_block(xml, "IsTruncated").map(|b| b.inner.trim() == "true") == Some(true) {
            page.next_continuation = tag_block(xml, "NextContinuationToken")
                .map(|b| xml_unescape(b.inner));
        }

        Ok(page)
    }
}

struct TagBlock<'a> {
    inner: &'a str,
    after: &'a str,
}

/// Find the first `<tag>...</tag>` span in `source`
fn tag_block<'a>(source: &'a str, tag: &str) -> Option<TagBlock<'a>> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = source.find(&open)? + open.len();
    let end = start + source[start..].find(&close)?;
    Some(TagBlock {
        inner: &source[start..end],
        after: &source[end + close.len()..],
    })
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// AWS-style percent encoding: unreserved characters pass through,
/// everything else becomes `%XX`. Path encoding keeps `/` literal.
fn uri_encode(value: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
