use axum::http::HeaderMap;
use std::net::IpAddr;

/// Client IP from `x-forwarded-for` (first hop), then `x-real-ip`, then the socket
/// address, then loopback.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|hv| hv.to_str().ok())
        .and_then(|h| h.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|hv| hv.to_str().ok())
            .and_then(|h| h.trim().parse::<IpAddr>().ok())
    };
    forwarded.or_else(real_ip).or(fallback).unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let expected: IpAddr = "203.0.113.7".parse().unwrap();
        assert_eq!(extract_ip_from_headers(&headers, None), expected);
    }

    #[test]
    fn test_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let expected: IpAddr = "198.51.100.2".parse().unwrap();
        assert_eq!(extract_ip_from_headers(&headers, None), expected);

        let empty = HeaderMap::new();
        let socket: IpAddr = "192.0.2.5".parse().unwrap();
        assert_eq!(extract_ip_from_headers(&empty, Some(socket)), socket);
        assert_eq!(extract_ip_from_headers(&empty, None), IpAddr::from([127, 0, 0, 1]));
    }
}
