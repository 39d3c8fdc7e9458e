use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{info, warn};

/// Parse a header string in format "Name: Value" and add it to the HeaderMap
fn parse_and_add_header(headers: &mut HeaderMap, header_str: &str) {
    let Some((name, value)) = header_str.split_once(':') else {
        warn!("Invalid header format: '{header_str}'. Expected 'Name: Value'");
        return;
    };
    let (name, value) = (name.trim(), value.trim());

    let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
        warn!("Invalid header name: '{name}'");
        return;
    };
    let Ok(header_value) = HeaderValue::from_str(value) else {
        warn!("Invalid header value: '{value}'");
        return;
    };

    info!("Adding header: {name}: {value}");
    headers.insert(header_name, header_value);
}

/// Parse a collection of header strings and return a HeaderMap
pub fn parse_headers(header_strings: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for header_str in header_strings {
        parse_and_add_header(&mut headers, header_str);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&[
            "Referer: https://example.com/a:b".to_string(),
            "X-Token:abc".to_string(),
            "no colon here".to_string(),
            "bad name: x".to_string(),
        ]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("referer").unwrap(), "https://example.com/a:b");
        assert_eq!(headers.get("x-token").unwrap(), "abc");
    }
}
