use url::Url;

use crate::error::{AppError, Result};

/// Return the `host[:port]` part of a URL, dropping scheme and path.
///
/// The port is kept only when it differs from the scheme default.
pub fn extract_host(raw_url: &str) -> Result<String> {
    let url = parse_url(raw_url)?;
    let host = url.host_str().ok_or_else(|| AppError::Parse {
        url: raw_url.to_string(),
        reason: "URL has no host".to_string(),
    })?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Split `host[:port]`, falling back to `default_port` when none is given.
///
/// Bracketed IPv6 literals are unwrapped; a bare IPv6 literal is treated as a
/// host without a port.
pub fn split_host_port(hostport: &str, default_port: u16) -> Result<(String, u16)> {
    let invalid = |reason: &str| AppError::Parse {
        url: hostport.to_string(),
        reason: reason.to_string(),
    };

    if let Some(rest) = hostport.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
        return match tail.strip_prefix(':') {
            Some(port) => {
                let port = parse_port(port).ok_or_else(|| invalid("invalid port"))?;
                Ok((host.to_string(), port))
            }
            None if tail.is_empty() => Ok((host.to_string(), default_port)),
            None => Err(invalid("unexpected text after IPv6 literal")),
        };
    }

    match hostport.split_once(':') {
        Some((host, port)) if !port.contains(':') => {
            let port = parse_port(port).ok_or_else(|| invalid("invalid port"))?;
            Ok((host.to_string(), port))
        }
        _ => Ok((hostport.to_string(), default_port)),
    }
}

/// Resolve the host and effective port of a URL.
pub fn host_and_port(raw_url: &str, fallback_port: u16) -> Result<(String, u16)> {
    let url = parse_url(raw_url)?;
    let default_port = url.port_or_known_default().unwrap_or(fallback_port);
    let hostport = extract_host(raw_url)?;
    split_host_port(&hostport, default_port)
}

/// Whether the URL uses plain `http`.
pub fn is_plain_http(raw_url: &str) -> bool {
    Url::parse(raw_url)
        .map(|u| u.scheme() == "http")
        .unwrap_or(false)
}

/// Whether the host of `raw_url` is one of `domains` or a subdomain of one.
pub fn host_matches_domain(raw_url: &str, domains: &[String]) -> bool {
    let host = match Url::parse(raw_url) {
        Ok(url) => match url.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        },
        Err(_) => return false,
    };

    domains.iter().any(|domain| {
        let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

fn parse_url(raw_url: &str) -> Result<Url> {
    Url::parse(raw_url).map_err(|e| AppError::Parse {
        url: raw_url.to_string(),
        reason: e.to_string(),
    })
}

fn parse_port(port: &str) -> Option<u16> {
    port.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host_drops_scheme_and_path() {
        assert_eq!(
            extract_host("https://foo.example.com/path").unwrap(),
            "foo.example.com"
        );
        assert_eq!(
            extract_host("https://foo.example.com:8443/a/b?c=d").unwrap(),
            "foo.example.com:8443"
        );
        assert_eq!(
            extract_host("https://mingle-sso.inforcloudsuite.com:443/ACME/as/").unwrap(),
            "mingle-sso.inforcloudsuite.com"
        );
    }

    #[test]
    fn test_extract_host_rejects_garbage() {
        assert!(matches!(
            extract_host("not a url"),
            Err(AppError::Parse { .. })
        ));
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("host.example.com", 443).unwrap(),
            ("host.example.com".to_string(), 443)
        );
        assert_eq!(
            split_host_port("host.example.com:8443", 443).unwrap(),
            ("host.example.com".to_string(), 8443)
        );
        assert_eq!(
            split_host_port("[::1]:9000", 443).unwrap(),
            ("::1".to_string(), 9000)
        );
        assert_eq!(split_host_port("[::1]", 443).unwrap(), ("::1".to_string(), 443));
        assert!(split_host_port("host:notaport", 443).is_err());
    }

    #[test]
    fn test_host_and_port_uses_scheme_default() {
        assert_eq!(
            host_and_port("http://127.0.0.1/", 443).unwrap(),
            ("127.0.0.1".to_string(), 80)
        );
        assert_eq!(
            host_and_port("https://gw.example.com", 443).unwrap(),
            ("gw.example.com".to_string(), 443)
        );
        assert_eq!(
            host_and_port("http://127.0.0.1:5000/x", 443).unwrap(),
            ("127.0.0.1".to_string(), 5000)
        );
    }

    #[test]
    fn test_host_matches_domain() {
        let domains = vec!["inforcloudsuite.com".to_string()];
        assert!(host_matches_domain(
            "https://mingle-ionapi.inforcloudsuite.com",
            &domains
        ));
        assert!(host_matches_domain("https://inforcloudsuite.com/x", &domains));
        assert!(!host_matches_domain(
            "https://inforcloudsuite.com.evil.net",
            &domains
        ));
        assert!(!host_matches_domain("https://ionapi.example.com", &domains));
        assert!(!host_matches_domain("garbage", &domains));
    }

    #[test]
    fn test_is_plain_http() {
        assert!(is_plain_http("http://127.0.0.1:8080"));
        assert!(!is_plain_http("https://gw.example.com"));
    }
}
