//! # VPN Link Outbound
//!
//! Translates proxy subscription links into the outbound configuration JSON of an
//! Xray-compatible proxy core. Only formats are translated; nothing here touches
//! the network.
//!
//! ## Pipeline
//!
//! 1. **Decode**: a protocol decoder turns the raw link into canonical parameters
//!    ([`ShadowsocksParams`], [`WireguardParams`]), tolerating the non-standard
//!    encodings seen in the wild.
//! 2. **Build**: [`OutboundCodec::build`] maps the parameters to a typed outbound
//!    document, applying protocol defaults and omission rules. Incomplete
//!    parameters produce no document.
//! 3. **Render**: the document is serialized once with `serde_json`.
//!
//! [`Outbound`] wraps the three steps behind one object-safe surface
//! (`parse`, `addr`, `port`, `scheme`, `raw_uri`, `rendered_config`).
//!
//! ## Supported Protocols
//!
//! - **[Shadowsocks](shadowsocks)** (`ss://`): plain or SIP002 user-info, plugin passthrough
//! - **[WireGuard](wireguard)** (`wireguard://`, `wg://`): query form and JSON form
//!
//! ## Link rules (unified)
//!
//! - **Scheme prefix**: Case-insensitive.
//! - **Query string**: Parsed as `application/x-www-form-urlencoded`; names are
//!   case-sensitive; an empty value counts as absent.
//! - **Errors**: wrong scheme → `InvalidFormat`; bad port → `InvalidField`;
//!   bad JSON → `JsonParseError`. Missing data for rendering is not an error:
//!   `rendered_config()` returns `""`.
//!
//! ## Example
//!
//! ```rust
//! use vpn_link_outbound::{Outbound, WireguardOut};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut out = WireguardOut::new();
//! out.parse("wg://162.159.192.1:2408?privateKey=aGVsbG8=&publicKey=d29ybGQ=&ip=172.16.0.2")?;
//!
//! let json: serde_json::Value = serde_json::from_str(out.rendered_config())?;
//! assert_eq!(json["settings"]["secretKey"], "aGVsbG8=");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod constants;
mod error;
pub mod outbound;
mod query;
pub mod shadowsocks;
pub mod transport;
pub mod wireguard;


pub use error::{ProtocolError, Result};
pub use outbound::{Outbound, OutboundAdapter, OutboundCodec, OutboundConfig, render};
pub use shadowsocks::{ShadowsocksOut, ShadowsocksParams};
pub use transport::{StreamSettings, TransportDescriptor};
pub use wireguard::{WireguardOut, WireguardParams};

/// Strip `scheme` from the front of `link`, ignoring ASCII case.
fn strip_scheme<'a>(link: &'a str, scheme: &str) -> Option<&'a str> {
    link.get(..scheme.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
        .map(|_| &link[scheme.len()..])
}

/// Host of `url` without IPv6 brackets, `""` when absent.
fn host_string(url: &url::Url) -> String {
    match url.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

/// URL-decoded fragment, `None` when absent or empty.
fn decode_remark(url: &url::Url) -> Option<String> {
    let fragment = url.fragment().filter(|fragment| !fragment.is_empty())?;
    Some(
        urlencoding::decode(fragment)
            .map(|remark| remark.into_owned())
            .unwrap_or_else(|_| fragment.to_string()),
    )
}
