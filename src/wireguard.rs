//! WireGuard link decoder and outbound builder
//!
//! Two link dialects are accepted after the `wireguard://` or `wg://` prefix (or
//! with no prefix at all):
//!
//! - **JSON**: `wireguard://{"PrivateKey":"...","Address":"...","Port":2087,...}`.
//!   Field names are those of [`WireguardParams`], matched ignoring ASCII case;
//!   snake_case aliases also work. `MTU` and `KeepAlive` are read leniently:
//!   negative or non-numeric values become `0`.
//! - **Query**: `wg://<host>:<port>?privateKey=&publicKey=&presharedKey=&ip=&mtu=&keepalive=&reserved=&...`
//!
//! The first non-whitespace character after the prefix decides: `{` means JSON.
//!
//! ## Query rules
//!
//! 1. Port must be an integer; otherwise `InvalidField`.
//! 2. `endpoint` defaults to `host:port`.
//! 3. Key material arrives form-decoded, so a `+` sent unencoded shows up as a
//!    space; spaces in `privateKey`, `publicKey` and `presharedKey` are turned back
//!    into `+`.
//! 4. `ip` holds one or two addresses; an address containing `:` is IPv6.
//! 5. `reserved` elements that fail to parse become `0`.
//! 6. A [`TransportDescriptor`] is attached only if `type`, `security` or `host` is set.

use crate::constants::wireguard as defaults;
use crate::constants::{OUTBOUND_TAG, error_msg, scheme};
use crate::error::{ProtocolError, Result};
use crate::outbound::{OutboundAdapter, OutboundCodec, OutboundConfig};
use crate::query::Query;
use crate::transport::TransportDescriptor;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use url::Url;

/// Canonical WireGuard parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WireguardParams {
    /// Interface private key
    #[serde(rename = "PrivateKey", alias = "privateKey", alias = "private_key")]
    pub private_key: String,
    /// Peer public key
    #[serde(rename = "PublicKey", alias = "publicKey", alias = "public_key")]
    pub public_key: String,
    /// Optional pre-shared key (empty when unset)
    #[serde(
        rename = "PresharedKey",
        alias = "presharedKey",
        alias = "preshared_key"
    )]
    pub preshared_key: String,
    /// Interface IPv4 address
    #[serde(rename = "AddrV4", alias = "addr_v4")]
    pub addr_v4: String,
    /// Interface IPv6 address
    #[serde(rename = "AddrV6", alias = "addr_v6")]
    pub addr_v6: String,
    /// DNS server
    #[serde(rename = "DNS", alias = "dns")]
    pub dns: String,
    /// Allowed IPs of the peer
    #[serde(rename = "AllowedIPs", alias = "allowed_ips")]
    pub allowed_ips: Option<Vec<String>>,
    /// Peer endpoint (`host:port`)
    #[serde(rename = "Endpoint", alias = "endpoint")]
    pub endpoint: String,
    /// Client identifier
    #[serde(rename = "ClientID", alias = "client_id")]
    pub client_id: String,
    /// MTU, 0 when unset
    #[serde(rename = "MTU", alias = "mtu", deserialize_with = "lenient_json_number")]
    pub mtu: u32,
    /// Persistent keepalive in seconds, 0 disables it
    #[serde(
        rename = "KeepAlive",
        alias = "keepalive",
        deserialize_with = "lenient_json_number"
    )]
    pub keepalive: u32,
    /// UDP flag
    #[serde(rename = "UDP", alias = "udp")]
    pub udp: bool,
    /// Reserved bytes
    #[serde(rename = "Reserved", alias = "reserved")]
    pub reserved: Option<Vec<i32>>,
    /// Server address
    #[serde(rename = "Address", alias = "address")]
    pub address: String,
    /// Server port
    #[serde(rename = "Port", alias = "port")]
    pub port: u16,
    /// Interface name
    #[serde(rename = "DeviceName", alias = "device_name")]
    pub device_name: String,
    /// Stream transport
    #[serde(skip)]
    pub transport: Option<TransportDescriptor>,
}

/// WireGuard outbound adapter
pub type WireguardOut = OutboundAdapter<WireguardParams>;

/// `settings` of a WireGuard outbound
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WireguardSettings {
    /// Interface private key
    pub secret_key: String,
    /// MTU
    pub mtu: u32,
    /// Worker count
    pub workers: u32,
    /// Domain resolution strategy
    pub domain_strategy: &'static str,
    /// Kernel tunnel toggle
    pub no_kernel_tun: bool,
    /// Interface addresses, IPv4 first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
    /// Peers (always exactly one entry)
    pub peers: Vec<WireguardPeer>,
    /// Reserved bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved: Option<Vec<i32>>,
}

/// One WireGuard peer
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WireguardPeer {
    /// Peer public key
    pub public_key: String,
    /// Pre-shared key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_shared_key: Option<String>,
    /// Endpoint
    pub endpoint: String,
    /// Keepalive in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive: Option<u32>,
    /// Allowed IPs
    #[serde(rename = "allowedIPs", skip_serializing_if = "Option::is_none")]
    pub allowed_ips: Option<Vec<String>>,
}

/// Decode a `wireguard://` / `wg://` link or a raw JSON object.
///
/// # Errors
///
/// Returns `JsonParseError` for a malformed JSON body, `InvalidField` when the
/// port is missing or not an integer, and `UrlParseError` for other URI errors.
///
/// # Example
///
/// ```rust
/// use vpn_link_outbound::wireguard;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let wg = wireguard::decode("wg://1.2.3.4:51820?privateKey=abc&ip=fd00::2,10.0.0.2")?;
/// assert_eq!(wg.endpoint, "1.2.3.4:51820");
/// assert_eq!(wg.address_list(), vec!["10.0.0.2", "fd00::2"]);
/// # Ok(())
/// # }
/// ```
pub fn decode(link: &str) -> Result<WireguardParams> {
    let link = link.trim();
    let body = crate::strip_scheme(link, scheme::WIREGUARD)
        .or_else(|| crate::strip_scheme(link, scheme::WIREGUARD_SHORT))
        .unwrap_or(link)
        .trim_start();

    if body.starts_with('{') {
        decode_json(body)
    } else {
        decode_query(body)
    }
}

/// Canonical spellings of the JSON-form keys.
const JSON_FIELDS: &[&str] = &[
    "PrivateKey",
    "PublicKey",
    "PresharedKey",
    "AddrV4",
    "AddrV6",
    "DNS",
    "AllowedIPs",
    "Endpoint",
    "ClientID",
    "MTU",
    "KeepAlive",
    "UDP",
    "Reserved",
    "Address",
    "Port",
    "DeviceName",
];

fn canonical_keys(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| {
            let key = JSON_FIELDS
                .iter()
                .find(|field| field.eq_ignore_ascii_case(&key))
                .map_or(key, |field| field.to_string());
            (key, value)
        })
        .collect()
}

fn lenient_json_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .and_then(|number| u32::try_from(number).ok())
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn decode_json(body: &str) -> Result<WireguardParams> {
    let object: Map<String, Value> = serde_json::from_str(body)?;
    let object = Value::Object(canonical_keys(object));
    let mut params: WireguardParams = serde_json::from_value(object)?;
    if params.endpoint.is_empty() && !params.address.is_empty() && params.port != 0 {
        params.endpoint = join_host_port(&params.address, params.port);
    }
    Ok(params)
}

fn decode_query(body: &str) -> Result<WireguardParams> {
    let url = Url::parse(&format!("{}{}", scheme::WIREGUARD_SHORT, body))?;
    let port = url
        .port()
        .ok_or_else(|| ProtocolError::InvalidField(error_msg::INVALID_PORT.to_string()))?;
    let address = crate::host_string(&url);
    let query = Query::from_url(&url);

    let mut params = WireguardParams {
        endpoint: query
            .owned("endpoint")
            .unwrap_or_else(|| join_host_port(&address, port)),
        private_key: restore_plus(query.get("privateKey")),
        public_key: restore_plus(query.get("publicKey")),
        preshared_key: restore_plus(query.get("presharedKey")),
        mtu: lenient(query.get("mtu")),
        keepalive: lenient(query.get("keepalive")),
        client_id: query.owned("client_id").unwrap_or_default(),
        udp: query.get("udp") == Some("1"),
        reserved: query.get("reserved").map(parse_reserved),
        device_name: query.owned("ifp").unwrap_or_default(),
        address,
        port,
        ..WireguardParams::default()
    };

    for ip in query.get("ip").unwrap_or_default().split(',') {
        let ip = ip.trim();
        if ip.is_empty() {
            continue;
        }
        if ip.contains(':') {
            params.addr_v6 = ip.to_string();
        } else {
            params.addr_v4 = ip.to_string();
        }
    }

    if query.has_any(&["type", "security", "host"]) {
        params.transport = Some(TransportDescriptor::from_query(&query));
    }

    Ok(params)
}

fn restore_plus(key: Option<&str>) -> String {
    key.unwrap_or_default().replace(' ', "+")
}

fn lenient<T: FromStr + Default>(value: Option<&str>) -> T {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or_default()
}

fn parse_reserved(value: &str) -> Vec<i32> {
    value
        .split(',')
        .map(|item| item.trim().parse().unwrap_or(0))
        .collect()
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

impl WireguardParams {
    /// Interface addresses, IPv4 before IPv6, skipping unset ones.
    pub fn address_list(&self) -> Vec<String> {
        [&self.addr_v4, &self.addr_v6]
            .into_iter()
            .filter(|addr| !addr.is_empty())
            .cloned()
            .collect()
    }
}

impl OutboundCodec for WireguardParams {
    const SCHEME: &'static str = scheme::WIREGUARD;

    type Settings = WireguardSettings;

    fn decode(raw_uri: &str) -> Result<Self> {
        decode(raw_uri)
    }

    fn build(&self) -> Option<OutboundConfig<WireguardSettings>> {
        if self.address.is_empty() || self.port == 0 || self.private_key.is_empty() {
            return None;
        }

        let peer = WireguardPeer {
            public_key: self.public_key.clone(),
            pre_shared_key: Some(self.preshared_key.clone()).filter(|key| !key.is_empty()),
            endpoint: self.endpoint.clone(),
            persistent_keepalive: Some(self.keepalive).filter(|secs| *secs > 0),
            allowed_ips: self.allowed_ips.clone().filter(|ips| !ips.is_empty()),
        };

        Some(OutboundConfig {
            protocol: "wireguard",
            tag: OUTBOUND_TAG.to_string(),
            settings: WireguardSettings {
                secret_key: self.private_key.clone(),
                mtu: if self.mtu > 0 {
                    self.mtu
                } else {
                    defaults::DEFAULT_MTU
                },
                workers: defaults::WORKERS,
                domain_strategy: defaults::DOMAIN_STRATEGY,
                no_kernel_tun: defaults::NO_KERNEL_TUN,
                address: self.address_list(),
                peers: vec![peer],
                reserved: self.reserved.clone().filter(|bytes| !bytes.is_empty()),
            },
            stream_settings: None,
        })
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn port(&self) -> u16 {
        self.port
    }
}
