//! Uniform outbound surface over every supported protocol.
//!
//! A protocol plugs in by implementing [`OutboundCodec`] (decoder + builder).
//! [`OutboundAdapter`] wraps a codec and exposes it through the object-safe
//! [`Outbound`] trait, so callers can keep a `Vec<Box<dyn Outbound>>` and treat all
//! protocols the same way.

use crate::error::Result;
use crate::transport::StreamSettings;
use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;
use tracing::{debug, warn};

/// Outbound document in the proxy core's format.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundConfig<S> {
    /// Protocol name (`shadowsocks`, `wireguard`)
    pub protocol: &'static str,
    /// Outbound tag
    pub tag: String,
    /// Protocol settings
    pub settings: S,
    /// Stream transport settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettings>,
}

/// Decoder and builder pair for one protocol.
pub trait OutboundCodec: Sized {
    /// Scheme prefix this codec handles (e.g. `ss://`).
    const SCHEME: &'static str;

    /// Protocol-specific `settings` object.
    type Settings: Serialize;

    /// Decode a raw link into canonical parameters.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the link is structurally invalid.
    fn decode(raw_uri: &str) -> Result<Self>;

    /// Build the outbound document, or `None` if a required field is missing.
    fn build(&self) -> Option<OutboundConfig<Self::Settings>>;

    /// Server address.
    fn address(&self) -> &str;

    /// Server port.
    fn port(&self) -> u16;
}

/// Capability set shared by every protocol adapter.
pub trait Outbound {
    /// Decode `raw_uri`, replacing any previous state.
    ///
    /// On failure the adapter is left empty: `addr()` is `""`, `port()` is `0` and
    /// `rendered_config()` is `""`.
    ///
    /// # Errors
    ///
    /// Returns the decoder's `ProtocolError`.
    fn parse(&mut self, raw_uri: &str) -> Result<()>;

    /// Server address, `""` when nothing was decoded.
    fn addr(&self) -> &str;

    /// Server port, `0` when nothing was decoded.
    fn port(&self) -> u16;

    /// Scheme prefix of the protocol.
    fn scheme(&self) -> &'static str;

    /// Link given to the last `parse` call.
    fn raw_uri(&self) -> &str;

    /// Rendered outbound JSON, `""` when no config can be produced.
    ///
    /// The first non-empty render is cached for the lifetime of the parse.
    fn rendered_config(&self) -> &str;
}

/// [`Outbound`] implementation backed by an [`OutboundCodec`].
///
/// The render cache is a `OnceCell`, so an adapter is `!Sync`; share it across
/// threads only behind the caller's own synchronization.
pub struct OutboundAdapter<C> {
    raw_uri: String,
    params: Option<C>,
    rendered: OnceCell<String>,
}

impl<C> Default for OutboundAdapter<C> {
    fn default() -> Self {
        OutboundAdapter {
            raw_uri: String::new(),
            params: None,
            rendered: OnceCell::new(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for OutboundAdapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundAdapter")
            .field("raw_uri", &self.raw_uri)
            .field("params", &self.params)
            .field("rendered", &self.rendered.get().is_some())
            .finish()
    }
}

impl<C: OutboundCodec> OutboundAdapter<C> {
    /// Create an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded parameters, if the last parse succeeded.
    pub fn params(&self) -> Option<&C> {
        self.params.as_ref()
    }
}

/// Build and serialize the outbound document for `params`.
///
/// Returns an empty string when the parameters are incomplete; callers must not
/// treat that as JSON.
pub fn render<C: OutboundCodec>(params: &C) -> String {
    let Some(config) = params.build() else {
        debug!(scheme = C::SCHEME, "no outbound config producible");
        return String::new();
    };
    match serde_json::to_string_pretty(&config) {
        Ok(json) => json,
        Err(err) => {
            warn!(scheme = C::SCHEME, error = %err, "failed to serialize outbound");
            String::new()
        }
    }
}

impl<C: OutboundCodec> Outbound for OutboundAdapter<C> {
    fn parse(&mut self, raw_uri: &str) -> Result<()> {
        self.raw_uri = raw_uri.to_string();
        self.rendered = OnceCell::new();
        match C::decode(raw_uri) {
            Ok(params) => {
                self.params = Some(params);
                Ok(())
            }
            Err(err) => {
                warn!(scheme = C::SCHEME, error = %err, "failed to decode link");
                self.params = None;
                Err(err)
            }
        }
    }

    fn addr(&self) -> &str {
        self.params.as_ref().map_or("", C::address)
    }

    fn port(&self) -> u16 {
        self.params.as_ref().map_or(0, C::port)
    }

    fn scheme(&self) -> &'static str {
        C::SCHEME
    }

    fn raw_uri(&self) -> &str {
        &self.raw_uri
    }

    fn rendered_config(&self) -> &str {
        if self.rendered.get().is_none() {
            let json = self.params.as_ref().map(render).unwrap_or_default();
            if !json.is_empty() {
                let _ = self.rendered.set(json);
            }
        }
        self.rendered.get().map_or("", String::as_str)
    }
}
