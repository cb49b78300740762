//! Wire-level HTTP types: status codes, header maps and header-key normalization

use std::fmt;

#[inline(always)]
pub(crate) fn slice_to_usize(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: usize = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as usize)?;
    }

    Some(result)
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($( $name:ident = ($num:literal, $str:literal); )+) => {
        /// Standard HTTP status codes with their reason phrases.
        ///
        /// Responses carry a plain `u16` status, so codes outside this table
        /// are still valid; they are simply written with an empty reason phrase.
        /// See [IANA](https://www.iana.org/assignments/http-status-codes/).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $name = $num,
        )+ }

        impl StatusCode {
            /// Looks up a known status code.
            #[inline]
            pub const fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $( $num => Some(StatusCode::$name), )+
                    _ => None,
                }
            }

            /// Returns the reason phrase, e.g. `"Not Found"` for `404`.
            #[inline]
            pub const fn reason(self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }
        }
    }
}

set_status_codes! {
    Continue = (100, "Continue");
    SwitchingProtocols = (101, "Switching Protocols");
    Processing = (102, "Processing");
    EarlyHints = (103, "Early Hints");

    Ok = (200, "OK");
    Created = (201, "Created");
    Accepted = (202, "Accepted");
    NonAuthoritativeInformation = (203, "Non-Authoritative Information");
    NoContent = (204, "No Content");
    ResetContent = (205, "Reset Content");
    PartialContent = (206, "Partial Content");
    MultiStatus = (207, "Multi-Status");
    AlreadyReported = (208, "Already Reported");
    ImUsed = (226, "IM Used");

    MultipleChoices = (300, "Multiple Choices");
    MovedPermanently = (301, "Moved Permanently");
    Found = (302, "Found");
    SeeOther = (303, "See Other");
    NotModified = (304, "Not Modified");
    UseProxy = (305, "Use Proxy");
    TemporaryRedirect = (307, "Temporary Redirect");
    PermanentRedirect = (308, "Permanent Redirect");

    BadRequest = (400, "Bad Request");
    Unauthorized = (401, "Unauthorized");
    PaymentRequired = (402, "Payment Required");
    Forbidden = (403, "Forbidden");
    NotFound = (404, "Not Found");
    MethodNotAllowed = (405, "Method Not Allowed");
    NotAcceptable = (406, "Not Acceptable");
    ProxyAuthenticationRequired = (407, "Proxy Authentication Required");
    RequestTimeout = (408, "Request Timeout");
    Conflict = (409, "Conflict");
    Gone = (410, "Gone");
    LengthRequired = (411, "Length Required");
    PreconditionFailed = (412, "Precondition Failed");
    PayloadTooLarge = (413, "Payload Too Large");
    UriTooLong = (414, "URI Too Long");
    UnsupportedMediaType = (415, "Unsupported Media Type");
    RangeNotSatisfiable = (416, "Range Not Satisfiable");
    ExpectationFailed = (417, "Expectation Failed");
    ImaTeapot = (418, "I'm a teapot");
    MisdirectedRequest = (421, "Misdirected Request");
    UnprocessableEntity = (422, "Unprocessable Entity");
    Locked = (423, "Locked");
    FailedDependency = (424, "Failed Dependency");
    TooEarly = (425, "Too Early");
    UpgradeRequired = (426, "Upgrade Required");
    PreconditionRequired = (428, "Precondition Required");
    TooManyRequests = (429, "Too Many Requests");
    RequestHeaderFieldsTooLarge = (431, "Request Header Fields Too Large");
    UnavailableForLegalReasons = (451, "Unavailable For Legal Reasons");

    InternalServerError = (500, "Internal Server Error");
    NotImplemented = (501, "Not Implemented");
    BadGateway = (502, "Bad Gateway");
    ServiceUnavailable = (503, "Service Unavailable");
    GatewayTimeout = (504, "Gateway Timeout");
    HttpVersionNotSupported = (505, "HTTP Version Not Supported");
    VariantAlsoNegotiates = (506, "Variant Also Negotiates");
    InsufficientStorage = (507, "Insufficient Storage");
    LoopDetected = (508, "Loop Detected");
    NotExtended = (510, "Not Extended");
    NetworkAuthenticationRequired = (511, "Network Authentication Required");
}

impl StatusCode {
    #[inline(always)]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<StatusCode> for u16 {
    #[inline]
    fn from(code: StatusCode) -> Self {
        code.as_u16()
    }
}

/// Reason phrase for `code`, or `""` when the code is not in the table.
#[inline]
pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code).map_or("", StatusCode::reason)
}

// SCHEME

/// URL scheme the request is considered to have arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Values of the `HTTPS` request header that switch the scheme to `https`.
    /// Matching is exact and case-sensitive.
    pub const HTTPS_ON: [&'static str; 3] = ["yes", "on", "1"];

    #[inline]
    pub(crate) fn from_https_flag(value: Option<&str>) -> Self {
        match value {
            Some(value) if Self::HTTPS_ON.contains(&value) => Scheme::Https,
            _ => Scheme::Http,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// HEADER KEY

/// Normalized keys that are stored without the `HTTP_` prefix.
pub const UNPREFIXED_KEYS: [&str; 3] = ["CONTENT_TYPE", "CONTENT_LENGTH", "SERVER_NAME"];

/// Normalizes a raw request header name into its environment key.
///
/// The name is uppercased and `-` becomes `_`. Keys listed in
/// [`UNPREFIXED_KEYS`] are kept as they are, every other key gets `HTTP_`.
///
/// ```
/// use singleshot::header_key;
///
/// assert_eq!(header_key("Content-Type"), "CONTENT_TYPE");
/// assert_eq!(header_key("x-foo"), "HTTP_X_FOO");
/// ```
pub fn header_key(raw: &str) -> String {
    let key: String = raw
        .chars()
        .map(|c| match c {
            '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    if UNPREFIXED_KEYS.contains(&key.as_str()) {
        key
    } else {
        format!("HTTP_{key}")
    }
}

// HEADER MAP

/// Ordered string map used for request environments and response headers.
///
/// Lookups are exact (case-sensitive) and linear. Iteration follows insertion order;
/// [`insert`](HeaderMap::insert) on an existing key replaces the value in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    headers: Vec<Header>,
}

impl HeaderMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            headers: Vec::with_capacity(capacity),
        }
    }

    /// Sets `name` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self.headers.iter_mut().find(|h| h.name == name) {
            Some(header) => Some(std::mem::replace(&mut header.value, value)),
            None => {
                self.headers.push(Header { name, value });
                None
            }
        }
    }

    /// Appends `value` as an additional line of `name`.
    ///
    /// Multiple lines are joined with `\n`, which the response writer expands
    /// back into one header line each.
    pub fn append(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        let name = name.into();

        match self.headers.iter_mut().find(|h| h.name == name) {
            Some(header) => {
                header.value.push('\n');
                header.value.push_str(value.as_ref());
            }
            None => self.headers.push(Header {
                name,
                value: value.as_ref().to_owned(),
            }),
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    #[inline]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

// HEADER

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Header {
    name: String,
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_usize() {
        #[rustfmt::skip]
        let cases = [
            ("0",     Some(0)),
            ("12",    Some(12)),
            ("00017", Some(17)),

            ("",      None),
            ("-1",    None),
            ("12a",   None),
            (" 12",   None),
            ("1.5",   None),
            ("999999999999999999999999", None),
        ];

        for (value, expected) in cases {
            assert_eq!(slice_to_usize(value.as_bytes()), expected, "{value:?}");
        }
    }

    #[test]
    fn reason_phrases() {
        #[rustfmt::skip]
        let cases = [
            (200, "OK"),
            (201, "Created"),
            (204, "No Content"),
            (302, "Found"),
            (404, "Not Found"),
            (500, "Internal Server Error"),

            (0,   ""),
            (299, ""),
            (999, ""),
        ];

        for (code, reason) in cases {
            assert_eq!(reason_phrase(code), reason);
        }

        assert_eq!(StatusCode::NotFound.as_u16(), 404);
        assert_eq!(StatusCode::from_u16(418), Some(StatusCode::ImaTeapot));
    }

    #[test]
    fn header_keys() {
        #[rustfmt::skip]
        let cases = [
            ("Content-Type",   "CONTENT_TYPE"),
            ("content-length", "CONTENT_LENGTH"),
            ("Server-Name",    "SERVER_NAME"),
            ("SERVER_NAME",    "SERVER_NAME"),

            ("X-Foo",          "HTTP_X_FOO"),
            ("Host",           "HTTP_HOST"),
            ("HTTPS",          "HTTP_HTTPS"),
            ("User-Agent",     "HTTP_USER_AGENT"),
            ("Content-MD5",    "HTTP_CONTENT_MD5"),
        ];

        for (raw, key) in cases {
            assert_eq!(header_key(raw), key);
        }
    }

    #[test]
    fn https_flag() {
        #[rustfmt::skip]
        let cases = [
            (Some("on"),  Scheme::Https),
            (Some("yes"), Scheme::Https),
            (Some("1"),   Scheme::Https),

            (Some("off"), Scheme::Http),
            (Some("ON"),  Scheme::Http),
            (Some("true"), Scheme::Http),
            (Some(""),    Scheme::Http),
            (None,        Scheme::Http),
        ];

        for (value, scheme) in cases {
            assert_eq!(Scheme::from_https_flag(value), scheme);
        }
    }

    #[test]
    fn header_map_order_and_overwrite() {
        let mut map = HeaderMap::new();

        assert_eq!(map.insert("B", "1"), None);
        assert_eq!(map.insert("A", "2"), None);
        assert_eq!(map.insert("B", "3"), Some("1".to_string()));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("B"), Some("3"));
        assert_eq!(map.get("b"), None);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("B", "3"), ("A", "2")]);
    }

    #[test]
    fn header_map_append() {
        let mut map: HeaderMap = [("Content-Type", "text/plain")].into_iter().collect();

        map.append("Set-Cookie", "a=1");
        map.append("Set-Cookie", "b=2");

        assert_eq!(map.get("Set-Cookie"), Some("a=1\nb=2"));
        assert_eq!(
            map.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["Content-Type", "Set-Cookie"]
        );
    }
}
