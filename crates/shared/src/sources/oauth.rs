//! OAuth 1.0a request signing (HMAC-SHA1) for the X API user context.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

use crate::config::TwitterCredentials;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 encoding: everything except `A-Z a-z 0-9 - . _ ~`
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Build the `Authorization` header value for a request with a fresh nonce and timestamp.
pub fn authorization_header(credentials: &TwitterCredentials, method: &str, url: &Url) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    signed_header(credentials, method, url, &nonce, Utc::now().timestamp())
}

fn signed_header(
    credentials: &TwitterCredentials,
    method: &str,
    url: &Url,
    nonce: &str,
    timestamp: i64,
) -> String {
    let timestamp = timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", credentials.api_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let base = signature_base_string(method, url, &oauth_params);
    let signature = sign(&base, &credentials.api_secret, &credentials.access_secret);

    let mut header_params = oauth_params.to_vec();
    header_params.push(("oauth_signature", signature.as_str()));
    header_params.sort();

    let fields: Vec<String> = header_params
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
        .collect();

    format!("OAuth {}", fields.join(", "))
}

fn signature_base_string(method: &str, url: &Url, oauth_params: &[(&str, &str)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (encode(&key), encode(&value)))
        .chain(
            oauth_params
                .iter()
                .map(|(key, value)| (encode(key), encode(value))),
        )
        .collect();
    params.sort();

    let param_string = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url.as_str()),
        encode(&param_string)
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}
