use std::fmt;

/// Proxy protocols the fetcher knows how to route through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyScheme {
    Http,
    Https,
    Socks5,
}

impl ProxyScheme {
    fn as_str(self) -> &'static str {
        match self {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Socks5 => "socks5",
        }
    }
}

/// A proxy address parsed once at configuration time.
///
/// Accepted input forms: `host:port`, `scheme://host:port`, and IPv6
/// literals in brackets (`[2001:db8::1]:7010`, with or without a scheme).
/// A bare `host:port` defaults to HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAddress {
    pub scheme: ProxyScheme,
    pub host: String,
    pub port: u16,
}

impl ProxyAddress {
    pub fn parse(raw: &str) -> Result<Self, ProxyParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProxyParseError::Empty);
        }

        let (scheme, rest) = match trimmed.split_once("://") {
            Some(("http", rest)) => (ProxyScheme::Http, rest),
            Some(("https", rest)) => (ProxyScheme::Https, rest),
            Some(("socks5", rest)) | Some(("socks5h", rest)) | Some(("socks", rest)) => {
                (ProxyScheme::Socks5, rest)
            }
            Some((other, _)) => {
                return Err(ProxyParseError::UnsupportedScheme(other.to_string()));
            }
            None => (ProxyScheme::Http, trimmed),
        };

        let (host, port) = split_host_port(rest)?;
        Ok(Self {
            scheme,
            host,
            port,
        })
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

fn split_host_port(rest: &str) -> Result<(String, u16), ProxyParseError> {
    let (host, port_text) = if let Some(stripped) = rest.strip_prefix('[') {
        // IPv6 literal; the brackets stay part of the rendered host.
        let end = stripped
            .find(']')
            .ok_or_else(|| ProxyParseError::Malformed(rest.to_string()))?;
        let tail = &stripped[end + 1..];
        let port_text = tail
            .strip_prefix(':')
            .ok_or_else(|| ProxyParseError::MissingPort(rest.to_string()))?;
        (format!("[{}]", &stripped[..end]), port_text)
    } else {
        let (host, port_text) = rest
            .rsplit_once(':')
            .ok_or_else(|| ProxyParseError::MissingPort(rest.to_string()))?;
        if host.is_empty() {
            return Err(ProxyParseError::Malformed(rest.to_string()));
        }
        (host.to_string(), port_text)
    };

    let port = port_text
        .parse::<u16>()
        .map_err(|_| ProxyParseError::InvalidPort(port_text.to_string()))?;
    Ok((host, port))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyParseError {
    Empty,
    UnsupportedScheme(String),
    MissingPort(String),
    InvalidPort(String),
    Malformed(String),
}

impl fmt::Display for ProxyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyParseError::Empty => write!(f, "proxy address is empty"),
            ProxyParseError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported proxy scheme {scheme}")
            }
            ProxyParseError::MissingPort(rest) => write!(f, "proxy address {rest} has no port"),
            ProxyParseError::InvalidPort(port) => write!(f, "invalid proxy port {port}"),
            ProxyParseError::Malformed(rest) => write!(f, "malformed proxy address {rest}"),
        }
    }
}

impl std::error::Error for ProxyParseError {}
