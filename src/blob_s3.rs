//! Amazon S3 blob store.
//!
//! Reads and writes objects with the S3 REST API and AWS Signature V4
//! authentication. Custom endpoints (MinIO, LocalStack, Supabase storage's
//! S3 gateway) are addressed path-style; AWS itself virtual-host style.
//!
//! Uses only pure-Rust dependencies (`hmac`, `sha2`) for signing.
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! backend = "s3"
//! bucket = "uploads"
//! region = "eu-west-3"
//! prefix = "documents"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! # Environment Variables
//!
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_SESSION_TOKEN` (optional, temporary credentials)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::traits::BlobStore;

type HmacSha256 = Hmac<Sha256>;

pub struct S3BlobStore {
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    prefix: String,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl S3BlobStore {
    pub fn from_config(storage: &StorageConfig) -> Result<Self> {
        let bucket = storage
            .bucket
            .clone()
            .filter(|b| !b.is_empty())
            .context("storage.bucket must be set for the s3 backend")?;
        Ok(Self {
            bucket,
            region: storage.region.clone(),
            endpoint_url: storage.endpoint_url.clone(),
            prefix: storage.prefix.trim_matches('/').to_string(),
            creds: AwsCredentials::from_env()?,
            client: reqwest::Client::new(),
        })
    }

    fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    /// Scheme + host, and the canonical URI of `object_key`.
    fn locate(&self, object_key: &str) -> (String, String, String) {
        let encoded_key = object_key
            .split('/')
            .map(uri_encode)
            .collect::<Vec<_>>()
            .join("/");
        match &self.endpoint_url {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                let (scheme, host) = match endpoint.split_once("://") {
                    Some((scheme, host)) => (scheme.to_string(), host.to_string()),
                    None => ("https".to_string(), endpoint.to_string()),
                };
                let uri = format!("/{}/{}", uri_encode(&self.bucket), encoded_key);
                (scheme, host, uri)
            }
            None => (
                "https".to_string(),
                format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
                format!("/{}", encoded_key),
            ),
        }
    }

    async fn send(&self, method: Method, key: &str, body: Vec<u8>) -> Result<reqwest::Response> {
        let object_key = self.object_key(key);
        let (scheme, host, canonical_uri) = self.locate(&object_key);
        let payload_hash = hex_sha256(&body);
        let signed = sign_request(
            &self.creds,
            &self.region,
            method.as_str(),
            &host,
            &canonical_uri,
            &payload_hash,
            Utc::now(),
        );

        let url = format!("{}://{}{}", scheme, host, canonical_uri);
        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &signed.amz_date);
        if let Some(ref token) = self.creds.session_token {
            req = req.header("x-amz-security-token", token);
        }
        if !body.is_empty() {
            req = req.body(body);
        }

        req.send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "S3 request for s3://{}/{} failed: {}",
                    self.bucket,
                    object_key,
                    e
                )
            })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn name(&self) -> &str {
        "s3"
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self.send(Method::GET, key, Vec::new()).await?;
        if !resp.status().is_success() {
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", resp.status(), key);
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let resp = self.send(Method::PUT, key, bytes.to_vec()).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "S3 PutObject failed (HTTP {}) for key '{}': {}",
                status,
                key,
                body.chars().take(500).collect::<String>()
            );
        }
        Ok(())
    }
}

// ============ AWS Credentials ============

struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

// ============ AWS SigV4 ============

struct SignedRequest {
    authorization: String,
    amz_date: String,
}

/// Sign a query-less request for the `s3` service.
fn sign_request(
    creds: &AwsCredentials,
    region: &str,
    method: &str,
    host: &str,
    canonical_uri: &str,
    payload_hash: &str,
    now: DateTime<Utc>,
) -> SignedRequest {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

    let mut headers = vec![
        ("host".to_string(), host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        method, canonical_uri, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&creds.secret_access_key, &date_stamp, region, "s3");
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    SignedRequest {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            creds.access_key_id, credential_scope, signed_headers, signature
        ),
        amz_date,
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 encoding; only `A-Z a-z 0-9 - _ . ~` pass through.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store(endpoint_url: Option<&str>, prefix: &str) -> S3BlobStore {
        S3BlobStore {
            bucket: "uploads".into(),
            region: "eu-west-3".into(),
            endpoint_url: endpoint_url.map(str::to_string),
            prefix: prefix.into(),
            creds: AwsCredentials {
                access_key_id: "AKIDEXAMPLE".into(),
                secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
                session_token: None,
            },
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn signing_key_matches_aws_reference() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn keys_are_encoded_per_segment() {
        assert_eq!(uri_encode("Mon offre (v2).pdf"), "Mon%20offre%20%28v2%29.pdf");
        let s = store(None, "documents");
        let (scheme, host, uri) = s.locate(&s.object_key("owner 1/a.pdf"));
        assert_eq!(scheme, "https");
        assert_eq!(host, "uploads.s3.eu-west-3.amazonaws.com");
        assert_eq!(uri, "/documents/owner%201/a.pdf");
    }

    #[test]
    fn custom_endpoint_is_path_style() {
        let s = store(Some("http://localhost:9000/"), "");
        let (scheme, host, uri) = s.locate(&s.object_key("/o/b.docx"));
        assert_eq!((scheme.as_str(), host.as_str()), ("http", "localhost:9000"));
        assert_eq!(uri, "/uploads/o/b.docx");
    }

    #[test]
    fn authorization_header_shape() {
        let s = store(None, "");
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let signed = sign_request(
            &s.creds,
            "eu-west-3",
            "GET",
            "uploads.s3.eu-west-3.amazonaws.com",
            "/a.pdf",
            &hex_sha256(b""),
            now,
        );
        assert_eq!(signed.amz_date, "20260301T120000Z");
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20260301/eu-west-3/s3/aws4_request, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature="
        ));
        let signature = signed.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
    }
}
