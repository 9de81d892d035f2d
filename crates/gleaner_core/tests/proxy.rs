use gleaner_core::{ProxyAddress, ProxyParseError, ProxyScheme};

#[test]
fn bare_host_port_defaults_to_http() {
    let proxy = ProxyAddress::parse("127.0.0.1:8080").unwrap();
    assert_eq!(proxy.scheme, ProxyScheme::Http);
    assert_eq!(proxy.host, "127.0.0.1");
    assert_eq!(proxy.port, 8080);
    assert_eq!(proxy.to_string(), "http://127.0.0.1:8080");
}

#[test]
fn scheme_qualified_addresses_keep_their_scheme() {
    let proxy = ProxyAddress::parse("https://proxy.example.com:3128").unwrap();
    assert_eq!(proxy.scheme, ProxyScheme::Https);
    assert_eq!(proxy.host, "proxy.example.com");

    let socks = ProxyAddress::parse("socks5://10.0.0.1:1080").unwrap();
    assert_eq!(socks.scheme, ProxyScheme::Socks5);
    assert_eq!(socks.to_string(), "socks5://10.0.0.1:1080");
}

#[test]
fn bare_socks_label_maps_to_socks5() {
    let socks = ProxyAddress::parse("socks://10.0.0.1:1080").unwrap();
    assert_eq!(socks.scheme, ProxyScheme::Socks5);
}

#[test]
fn ipv6_literals_keep_brackets() {
    let proxy = ProxyAddress::parse("[240e:74c:110:a01::2000]:7010").unwrap();
    assert_eq!(proxy.scheme, ProxyScheme::Http);
    assert_eq!(proxy.host, "[240e:74c:110:a01::2000]");
    assert_eq!(proxy.port, 7010);
    assert_eq!(proxy.to_string(), "http://[240e:74c:110:a01::2000]:7010");

    let qualified = ProxyAddress::parse("http://[2001:db8::1]:8080").unwrap();
    assert_eq!(qualified.host, "[2001:db8::1]");
}

#[test]
fn rejects_malformed_addresses() {
    assert_eq!(ProxyAddress::parse("  "), Err(ProxyParseError::Empty));
    assert!(matches!(
        ProxyAddress::parse("ftp://proxy.example.com:21"),
        Err(ProxyParseError::UnsupportedScheme(_))
    ));
    assert!(matches!(
        ProxyAddress::parse("proxy.example.com"),
        Err(ProxyParseError::MissingPort(_))
    ));
    assert!(matches!(
        ProxyAddress::parse("proxy.example.com:notaport"),
        Err(ProxyParseError::InvalidPort(_))
    ));
    assert!(matches!(
        ProxyAddress::parse("[2001:db8::1:8080"),
        Err(ProxyParseError::Malformed(_))
    ));
}
