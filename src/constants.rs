//! Shared constants: scheme prefixes, error message fragments, outbound defaults
//! and the supported Shadowsocks cipher table.

/// Link scheme prefixes (lowercase, with `://`).
pub mod scheme {
    /// Shadowsocks: `ss://`
    pub const SHADOWSOCKS: &str = "ss://";
    /// WireGuard: `wireguard://`
    pub const WIREGUARD: &str = "wireguard://";
    /// WireGuard short form: `wg://`
    pub const WIREGUARD_SHORT: &str = "wg://";
}

/// Common error message fragments for link parsing.
pub mod error_msg {
    /// Invalid or missing port value.
    pub const INVALID_PORT: &str = "Invalid port";
    /// Link must start with scheme (placeholder: use with format!).
    pub const MUST_START_WITH: &str = "Link must start with";
}

/// Tag given to every rendered outbound.
pub const OUTBOUND_TAG: &str = "PROXY_OUT";

/// Shadowsocks cipher handling.
pub mod cipher {
    /// Used when the link carries no method or one outside [`SUPPORTED`].
    pub const DEFAULT_METHOD: &str = "aes-256-gcm";

    /// Legacy alias and the method it stands for.
    pub const RC4_ALIAS: (&str, &str) = ("rc4", "rc4-md5");

    /// Methods accepted by the proxy core.
    pub const SUPPORTED: &[&str] = &[
        "2022-blake3-aes-128-gcm",
        "2022-blake3-aes-256-gcm",
        "2022-blake3-chacha20-poly1305",
        "none",
        "aes-128-gcm",
        "aes-192-gcm",
        "aes-256-gcm",
        "chacha20-ietf-poly1305",
        "xchacha20-ietf-poly1305",
        "aes-128-ctr",
        "aes-192-ctr",
        "aes-256-ctr",
        "aes-128-cfb",
        "aes-192-cfb",
        "aes-256-cfb",
        "rc4-md5",
        "chacha20-ietf",
        "xchacha20",
    ];

    /// Whether `method` is in [`SUPPORTED`].
    pub fn is_supported(method: &str) -> bool {
        SUPPORTED.contains(&method)
    }
}

/// Fixed WireGuard outbound settings that are not taken from the link.
pub mod wireguard {
    /// MTU used when the link gives none (or zero).
    pub const DEFAULT_MTU: u32 = 1420;
    /// Worker count.
    pub const WORKERS: u32 = 2;
    /// Domain resolution strategy.
    pub const DOMAIN_STRATEGY: &str = "ForceIPv6v4";
    /// Kernel tunnel is never requested.
    pub const NO_KERNEL_TUN: bool = false;
}

/// Malformed user-info delimiter emitted by some producers, rewritten to `@`.
pub const SS_MALFORMED_DELIMITER: &str = "#ss#&1@";
