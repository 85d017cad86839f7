//! Stream transport descriptor shared by protocols that can run over TLS,
//! Reality, WebSocket, gRPC and friends.
//!
//! ## Query keys
//!
//! `type` (network), `security`, `path`, `host`, `serviceName`, `mode` (gRPC multi
//! mode), `sni`, `alpn` (comma separated), `fp`, `sid`, `spx`, `pbk`,
//! `packetEncoding`, `headerType`.
//!
//! Every field is optional; `None` means not configured.

use crate::query::Query;
use serde::{Deserialize, Serialize};

/// Stream-layer parameters decoded from a link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransportDescriptor {
    /// Network type (tcp, ws, grpc, httpupgrade, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Security mode (tls, reality, none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// Path (ws/httpupgrade)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Host header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// gRPC service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_service_name: Option<String>,
    /// gRPC multiplexing mode (`gun` or `multi`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_multi_mode: Option<String>,
    /// TLS server name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// TLS ALPN, comma separated as it appears in the link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn: Option<String>,
    /// TLS fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Reality short ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_short_id: Option<String>,
    /// Reality spider-x
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_spider_x: Option<String>,
    /// Reality public key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_public_key: Option<String>,
    /// Packet encoding (xudp, packetaddr)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_encoding: Option<String>,
    /// TCP header obfuscation type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_header_type: Option<String>,
}

impl TransportDescriptor {
    pub(crate) fn from_query(query: &Query) -> Self {
        TransportDescriptor {
            network: query.owned("type"),
            security: query.owned("security"),
            path: query.owned("path"),
            host: query.owned("host"),
            grpc_service_name: query.owned("serviceName"),
            grpc_multi_mode: query.owned("mode"),
            server_name: query.owned("sni"),
            alpn: query.owned("alpn"),
            fingerprint: query.owned("fp"),
            reality_short_id: query.owned("sid"),
            reality_spider_x: query.owned("spx"),
            reality_public_key: query.owned("pbk"),
            packet_encoding: query.owned("packetEncoding"),
            tcp_header_type: query.owned("headerType"),
        }
    }

    /// Map the descriptor to the proxy core's `streamSettings` object.
    ///
    /// The network defaults to `tcp`. Only the settings block matching the
    /// network and the security mode is filled in.
    pub fn stream_settings(&self) -> StreamSettings {
        let network = self.network.as_deref().unwrap_or("tcp");
        let mut settings = StreamSettings {
            network: network.to_string(),
            security: self.security.clone(),
            ..StreamSettings::default()
        };

        match self.security.as_deref() {
            Some("tls") => {
                settings.tls_settings = Some(TlsSettings {
                    server_name: self.server_name.clone(),
                    alpn: self.alpn.as_deref().map(split_list),
                    fingerprint: self.fingerprint.clone(),
                });
            }
            Some("reality") => {
                settings.reality_settings = Some(RealitySettings {
                    server_name: self.server_name.clone(),
                    fingerprint: self.fingerprint.clone(),
                    short_id: self.reality_short_id.clone(),
                    spider_x: self.reality_spider_x.clone(),
                    public_key: self.reality_public_key.clone(),
                });
            }
            _ => {}
        }

        match network {
            "ws" | "websocket" => {
                settings.network = "ws".to_string();
                settings.ws_settings = Some(WsSettings {
                    path: self.path.clone(),
                    headers: self.host.clone().map(|host| HostHeader { host }),
                });
            }
            "grpc" => {
                settings.grpc_settings = Some(GrpcSettings {
                    service_name: self.grpc_service_name.clone(),
                    multi_mode: self.grpc_multi_mode.as_deref() == Some("multi"),
                });
            }
            "httpupgrade" => {
                settings.httpupgrade_settings = Some(HttpUpgradeSettings {
                    path: self.path.clone(),
                    host: self.host.clone(),
                });
            }
            "tcp" | "raw" => {
                settings.tcp_settings = self
                    .tcp_header_type
                    .as_deref()
                    .filter(|kind| *kind != "none")
                    .map(|kind| TcpSettings {
                        header: TcpHeader {
                            kind: kind.to_string(),
                            request: self.host.as_deref().map(|host| TcpRequest {
                                headers: TcpRequestHeaders {
                                    host: split_list(host),
                                },
                            }),
                        },
                    });
            }
            _ => {}
        }

        settings
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `streamSettings` of an outbound.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettings {
    /// Network
    pub network: String,
    /// Security mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// TLS settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_settings: Option<TlsSettings>,
    /// Reality settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_settings: Option<RealitySettings>,
    /// WebSocket settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_settings: Option<WsSettings>,
    /// gRPC settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_settings: Option<GrpcSettings>,
    /// HTTPUpgrade settings
    #[serde(
        rename = "httpupgradeSettings",
        skip_serializing_if = "Option::is_none"
    )]
    pub httpupgrade_settings: Option<HttpUpgradeSettings>,
    /// TCP settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_settings: Option<TcpSettings>,
}

/// `tlsSettings`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSettings {
    /// SNI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// ALPN list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    /// uTLS fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// `realitySettings`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RealitySettings {
    /// SNI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// uTLS fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Short ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    /// Spider-x
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
    /// Server public key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// `wsSettings`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WsSettings {
    /// Path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Request headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HostHeader>,
}

/// Single `Host` request header.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HostHeader {
    /// Host
    #[serde(rename = "Host")]
    pub host: String,
}

/// `grpcSettings`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcSettings {
    /// Service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Multi mode
    pub multi_mode: bool,
}

/// `httpupgradeSettings`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HttpUpgradeSettings {
    /// Path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// `tcpSettings`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TcpSettings {
    /// Header obfuscation
    pub header: TcpHeader,
}

/// `tcpSettings.header`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TcpHeader {
    /// Header type (`http`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Request template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<TcpRequest>,
}

/// `tcpSettings.header.request`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TcpRequest {
    /// Request headers
    pub headers: TcpRequestHeaders,
}

/// `tcpSettings.header.request.headers`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TcpRequestHeaders {
    /// Host values
    #[serde(rename = "Host")]
    pub host: Vec<String>,
}
