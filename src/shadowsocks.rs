//! Shadowsocks link decoder and outbound builder
//!
//! Link format: `ss://<method>:<password>@<host>:<port>[?<query>][#<remark>]`
//!
//! **userinfo**: Plain `method:password`, taken verbatim. The password is never
//! URL-decoded or base64-decoded, so `p%40ss` stays `p%40ss`. A base64-encoded
//! `method:password` (SIP002) is also accepted when the user-info has no `:`.
//!
//! **query**: `host`, `mode`, `mux`, `path`, `plugin`, `obfs`, `obfs-host` are kept as
//! opaque strings; `type`/`security` attach a [`TransportDescriptor`].
//!
//! ## Parsing rules
//!
//! 1. Prefix `ss://` is case-insensitive. `#ss#&1@` is rewritten to `@` first.
//! 2. A body without `@` that is base64 of `method:password@host:port` is expanded.
//! 3. Host and port come from the generic URI parser, applied to the text after the
//!    user-info so that reserved characters in the password cannot break it.
//! 4. The text between `://` and the first `@` is split on its first `:` and always
//!    overrides what the generic parser extracted.
//! 5. `rc4` becomes `rc4-md5`; an empty or unsupported method becomes `aes-256-gcm`.

use crate::constants::{OUTBOUND_TAG, SS_MALFORMED_DELIMITER, cipher, error_msg, scheme};
use crate::error::{ProtocolError, Result};
use crate::outbound::{OutboundAdapter, OutboundCodec, OutboundConfig};
use crate::query::Query;
use crate::transport::TransportDescriptor;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Canonical Shadowsocks parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShadowsocksParams {
    /// Server address
    pub address: String,
    /// Server port (0 when the link has none)
    pub port: u16,
    /// Cipher method, always a member of the supported set
    pub method: String,
    /// Password, exactly as it appeared in the link
    pub password: String,
    /// `host` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `mode` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// `mux` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<String>,
    /// `path` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// `plugin` query parameter (`name;opt=value;...`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// `obfs` query parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    /// `obfs-host` query parameter
    #[serde(rename = "obfs-host", skip_serializing_if = "Option::is_none")]
    pub obfs_host: Option<String>,
    /// Remark from the fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// Stream transport, present when the link sets `type` or `security`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportDescriptor>,
}

/// Shadowsocks outbound adapter
pub type ShadowsocksOut = OutboundAdapter<ShadowsocksParams>;

/// `settings` of a Shadowsocks outbound
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShadowsocksSettings {
    /// Server list (always exactly one entry)
    pub servers: Vec<ShadowsocksServer>,
}

/// One Shadowsocks server entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShadowsocksServer {
    /// Server address
    pub address: String,
    /// Server port
    pub port: u16,
    /// Cipher method
    pub method: String,
    /// Password
    pub password: String,
    /// SIP003 plugin name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// SIP003 plugin options (`k=v;k=v`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<String>,
}

/// Decode an `ss://` link.
///
/// # Errors
///
/// Returns `InvalidFormat` for a wrong scheme and `UrlParseError`/`InvalidField`
/// when the host part is not a valid URI authority.
///
/// # Example
///
/// ```rust
/// use vpn_link_outbound::shadowsocks;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ss = shadowsocks::decode("ss://aes-256-gcm:p%40ss@example.com:8388")?;
/// assert_eq!(ss.method, "aes-256-gcm");
/// assert_eq!(ss.password, "p%40ss");
/// assert_eq!(ss.port, 8388);
/// # Ok(())
/// # }
/// ```
pub fn decode(link: &str) -> Result<ShadowsocksParams> {
    let link = link.trim();
    let body = crate::strip_scheme(link, scheme::SHADOWSOCKS).ok_or_else(|| {
        ProtocolError::InvalidFormat(format!(
            "{} {}",
            error_msg::MUST_START_WITH,
            scheme::SHADOWSOCKS
        ))
    })?;
    let body = body.replace(SS_MALFORMED_DELIMITER, "@");
    let body = expand_legacy_body(&body).unwrap_or(body);

    // The '@' closing the user-info must come before the query.
    let authority_end = body.find('?').unwrap_or(body.len());
    let (user_info, server) = match body[..authority_end].find('@') {
        Some(at) => (Some(&body[..at]), &body[at + 1..]),
        None => (None, body.as_str()),
    };

    let url = Url::parse(&format!("{}{}", scheme::SHADOWSOCKS, server))?;

    let (mut method, mut password) = generic_user_info(&body);
    if let Some(user_info) = user_info {
        if let Some((m, p)) = user_info.split_once(':') {
            method = m.to_string();
            password = p.to_string();
        } else if let Some((m, p)) = decode_base64(user_info)
            .as_deref()
            .and_then(|decoded| decoded.split_once(':'))
        {
            method = m.to_string();
            password = p.to_string();
        }
    }

    let query = Query::from_url(&url);
    let transport = query
        .has_any(&["type", "security"])
        .then(|| TransportDescriptor::from_query(&query));

    Ok(ShadowsocksParams {
        address: crate::host_string(&url),
        port: url.port().unwrap_or(0),
        method: normalize_method(&method),
        password,
        host: query.owned("host"),
        mode: query.owned("mode"),
        mux: query.owned("mux"),
        path: query.owned("path"),
        plugin: query.owned("plugin"),
        obfs: query.owned("obfs"),
        obfs_host: query.owned("obfs-host"),
        remark: crate::decode_remark(&url),
        transport,
    })
}

/// User-info as the generic URI parser sees it; empty when it cannot parse the link.
fn generic_user_info(body: &str) -> (String, String) {
    let Ok(url) = Url::parse(&format!("{}{}", scheme::SHADOWSOCKS, body)) else {
        return (String::new(), String::new());
    };
    let username = urlencoding::decode(url.username())
        .map(|name| name.into_owned())
        .unwrap_or_default();
    (username, url.password().unwrap_or_default().to_string())
}

fn normalize_method(method: &str) -> String {
    let (alias, canonical) = cipher::RC4_ALIAS;
    let method = if method == alias { canonical } else { method };
    if cipher::is_supported(method) {
        method.to_string()
    } else {
        debug!(method, "unsupported shadowsocks method, using default");
        cipher::DEFAULT_METHOD.to_string()
    }
}

/// `ss://base64(method:password@host:port)[?query][#remark]`
fn expand_legacy_body(body: &str) -> Option<String> {
    let end = body.find(|c| c == '?' || c == '#').unwrap_or(body.len());
    let (encoded, rest) = body.split_at(end);
    if encoded.is_empty() || encoded.contains('@') {
        return None;
    }
    let decoded = decode_base64(encoded)?;
    decoded.contains('@').then(|| format!("{decoded}{rest}"))
}

fn decode_base64(text: &str) -> Option<String> {
    let text = urlencoding::decode(text).ok()?;
    let trimmed = text.trim_end_matches('=');
    [&STANDARD_NO_PAD, &URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(trimmed).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

impl ShadowsocksParams {
    /// Plugin name and SIP003 option string assembled from the plugin fields.
    ///
    /// Without a plugin name, a bare `obfs` selects `obfs-local` and a
    /// `websocket`/`quic` mode selects `v2ray-plugin`. When no name can be
    /// inferred the options are still emitted, unless the link carries a stream
    /// transport that owns `host`/`path`.
    fn plugin_options(&self) -> (Option<String>, Option<String>) {
        let mut parts = self.plugin.as_deref().unwrap_or_default().split(';');
        let name = parts
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| self.obfs.as_ref().map(|_| "obfs-local".to_string()))
            .or_else(|| {
                self.mode
                    .as_deref()
                    .filter(|mode| matches!(*mode, "websocket" | "quic"))
                    .map(|_| "v2ray-plugin".to_string())
            });
        if name.is_none() && self.transport.is_some() {
            return (None, None);
        }

        let mut opts: Vec<String> = parts
            .filter(|opt| !opt.is_empty())
            .map(str::to_string)
            .collect();
        let extra = [
            ("obfs", &self.obfs),
            ("obfs-host", &self.obfs_host),
            ("mode", &self.mode),
            ("host", &self.host),
            ("path", &self.path),
            ("mux", &self.mux),
        ];
        for (key, value) in extra {
            let Some(value) = value else { continue };
            if opts.iter().any(|opt| opt.split('=').next() == Some(key)) {
                continue;
            }
            opts.push(format!("{key}={value}"));
        }

        let opts = (!opts.is_empty()).then(|| opts.join(";"));
        (name, opts)
    }
}

impl OutboundCodec for ShadowsocksParams {
    const SCHEME: &'static str = scheme::SHADOWSOCKS;

    type Settings = ShadowsocksSettings;

    fn decode(raw_uri: &str) -> Result<Self> {
        decode(raw_uri)
    }

    fn build(&self) -> Option<OutboundConfig<ShadowsocksSettings>> {
        if self.address.is_empty()
            || self.port == 0
            || self.method.is_empty()
            || self.password.is_empty()
        {
            return None;
        }

        let (plugin, plugin_opts) = self.plugin_options();
        Some(OutboundConfig {
            protocol: "shadowsocks",
            tag: OUTBOUND_TAG.to_string(),
            settings: ShadowsocksSettings {
                servers: vec![ShadowsocksServer {
                    address: self.address.clone(),
                    port: self.port,
                    method: self.method.clone(),
                    password: self.password.clone(),
                    plugin,
                    plugin_opts,
                }],
            },
            stream_settings: self
                .transport
                .as_ref()
                .map(TransportDescriptor::stream_settings),
        })
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn port(&self) -> u16 {
        self.port
    }
}
