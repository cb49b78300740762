//! HTTP/1.1 response representation and serialization.

use crate::http::types::{reason_phrase, HeaderMap, StatusCode};
use std::{fmt, io::Write};

/// Lazy, finite sequence of body chunks.
pub type ResponseBody = Box<dyn Iterator<Item = Vec<u8>>>;

/// What a [`Handler`](crate::Handler) hands back: status, headers and body.
///
/// Headers are written in insertion order. A header value containing `\n`
/// is written as several header lines that share the same name, which is how
/// multiple `Set-Cookie` headers are expressed.
///
/// Nothing is added on the way out: no `Content-Length`, no `Date`, no
/// chunked framing. The handler is responsible for a body that matches the
/// headers it sets.
///
/// # Examples
/// ```
/// use singleshot::{Response, StatusCode};
///
/// let resp = Response::from(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .header("Set-Cookie", "a=1")
///     .header("Set-Cookie", "b=2")
///     .body(["Hello", " world"]);
///
/// assert_eq!(resp.status(), 200);
/// assert_eq!(resp.headers().get("Set-Cookie"), Some("a=1\nb=2"));
/// ```
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: ResponseBody,
}

impl Response {
    /// Response with `status`, no headers and an empty body.
    #[inline]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Box::new(std::iter::empty()),
        }
    }

    /// Builds a response from its three parts.
    pub fn from_parts<B>(status: u16, headers: HeaderMap, body: B) -> Self
    where
        B: IntoIterator + 'static,
        B::Item: Into<Vec<u8>>,
    {
        Self::new(status).with_headers(headers).body(body)
    }

    /// Adds a header. Calling it again with the same name adds another line.
    #[inline]
    pub fn header(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces all headers.
    #[inline]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body. Chunks are produced lazily while the response is written.
    #[inline]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: IntoIterator + 'static,
        B::Item: Into<Vec<u8>>,
    {
        self.body = Box::new(body.into_iter().map(Into::into));
        self
    }

    #[inline(always)]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[inline(always)]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn into_parts(self) -> (u16, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

impl From<StatusCode> for Response {
    #[inline]
    fn from(status: StatusCode) -> Self {
        Self::new(status.as_u16())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Writes one complete HTTP/1.1 response to `output`.
///
/// ```text
/// HTTP/1.1 [CODE] SP [REASON] CRLF
/// [NAME]: SP [LINE] CRLF          (one per line of each header value)
/// CRLF
/// [BODY CHUNKS]
/// ```
///
/// An unknown `status` gets an empty reason phrase. A header whose value is
/// empty produces no line. Body chunks are written verbatim, in order.
pub fn write_response<W, B>(
    output: &mut W,
    status: u16,
    headers: &HeaderMap,
    body: B,
) -> std::io::Result<()>
where
    W: Write + ?Sized,
    B: IntoIterator,
    B::Item: AsRef<[u8]>,
{
    let mut head = Vec::with_capacity(128);

    write!(head, "HTTP/1.1 {status} {}\r\n", reason_phrase(status))?;
    for (name, value) in headers.iter() {
        for line in value.lines() {
            write!(head, "{name}: {line}\r\n")?;
        }
    }
    head.extend_from_slice(b"\r\n");

    output.write_all(&head)?;

    for chunk in body {
        output.write_all(chunk.as_ref())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn render(status: u16, headers: &[(&str, &str)], body: &[&str]) -> String {
        let headers: HeaderMap = headers.iter().copied().collect();
        let mut out = Vec::new();

        write_response(&mut out, status, &headers, body).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn status_line() {
        #[rustfmt::skip]
        let cases = [
            (200, "HTTP/1.1 200 OK\r\n"),
            (201, "HTTP/1.1 201 Created\r\n"),
            (404, "HTTP/1.1 404 Not Found\r\n"),
            (503, "HTTP/1.1 503 Service Unavailable\r\n"),
            (299, "HTTP/1.1 299 \r\n"),
            (999, "HTTP/1.1 999 \r\n"),
        ];

        for (status, line) in cases {
            let out = render(status, &[], &[]);

            assert!(out.starts_with(&format!("HTTP/1.1 {status}")));
            assert_eq!(out, format!("{line}\r\n"));
        }
    }

    #[test]
    fn simple_response() {
        let out = render(200, &[("Content-Type", "text/plain")], &[]);
        assert_eq!(out, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n");
    }

    #[test]
    fn multi_line_headers() {
        #[rustfmt::skip]
        let cases = [
            ("a\nb",       vec!["Set-Cookie: a", "Set-Cookie: b"]),
            ("a\nb\nc",    vec!["Set-Cookie: a", "Set-Cookie: b", "Set-Cookie: c"]),
            ("a\n\nb",     vec!["Set-Cookie: a", "Set-Cookie: ", "Set-Cookie: b"]),
            ("a\n",        vec!["Set-Cookie: a"]),
            ("",           vec![]),
        ];

        for (value, lines) in cases {
            let out = render(200, &[("Set-Cookie", value)], &[]);

            let mut expected = String::from("HTTP/1.1 200 OK\r\n");
            for line in lines {
                expected.push_str(line);
                expected.push_str("\r\n");
            }
            expected.push_str("\r\n");

            assert_eq!(out, expected, "{value:?}");
        }
    }

    #[test]
    fn header_order_is_kept() {
        let out = render(
            302,
            &[("Location", "/next"), ("Content-Type", "text/html"), ("X-A", "1")],
            &[],
        );

        assert_eq!(
            out,
            "HTTP/1.1 302 Found\r\nLocation: /next\r\nContent-Type: text/html\r\nX-A: 1\r\n\r\n"
        );
    }

    #[test]
    fn body_chunks_verbatim() {
        let out = render(
            200,
            &[("Content-Length", "13")],
            &["Hello", ", ", "", "world!\r\n"],
        );

        assert_eq!(
            out,
            "HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, world!\r\n"
        );
    }

    #[test]
    fn lazy_body() {
        let resp = Response::new(200).body((1..=3).map(|i| format!("chunk{i};")));
        let (status, headers, body) = resp.into_parts();

        let mut out = Vec::new();
        write_response(&mut out, status, &headers, body).unwrap();

        assert_eq!(out, b"HTTP/1.1 200 OK\r\n\r\nchunk1;chunk2;chunk3;");
    }

    #[test]
    fn builder() {
        let resp = Response::from(StatusCode::NotFound)
            .header("Content-Type", "text/plain")
            .header("Set-Cookie", "a")
            .header("Set-Cookie", "b");

        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers().get("Set-Cookie"), Some("a\nb"));
        assert!(format!("{resp:?}").starts_with("Response { status: 404, headers: "));
    }

    #[test]
    fn write_failure() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_response(&mut Broken, 200, &HeaderMap::new(), [b"x"]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
