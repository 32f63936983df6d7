// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for traffic simulation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Peer addresses for the generated IPs, as the server would see them.
pub fn generate_peers(count: usize) -> Vec<SocketAddr> {
    generate_ips(count)
        .into_iter()
        .enumerate()
        .map(|(i, ip)| SocketAddr::new(ip, 40000 + (i % 20000) as u16))
        .collect()
}

/// REST routes a frontend typically requests.
pub fn generate_api_paths() -> Vec<&'static str> {
    vec![
        "/wp-json/wp/v2/posts",
        "/wp-json/wp/v2/pages",
        "/wp-json/headless/v1/site-info",
        "/wp-json/headless/v1/menus/primary",
        "/wp-json/headless/v1/search?query=hello",
    ]
}

/// Origins for CORS tests.
pub fn generate_origins() -> Vec<&'static str> {
    vec![
        "https://app.example.com",
        "https://staging.example.com",
        "http://localhost:3000",
        "https://evil.example.net",
        "null",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_peers_match_ips() {
        let peers = generate_peers(3);
        assert_eq!(peers[2].ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
    }
}
