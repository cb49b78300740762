use crate::{
    errors::{Error, Result},
    http::types::{self, header_key, HeaderMap, Scheme},
    limits::ReqLimits,
};
use memchr::memmem;
use std::{
    borrow::Cow,
    io::{self, Cursor, Read, Write},
};
use tracing::{debug, trace};
use url::Url;

const CRLF: &str = "\r\n";
const HEAD_END: &[u8] = b"\r\n\r\n";

/// Interface version advertised to handlers alongside the environment.
pub const ENV_VERSION: [u16; 2] = [1, 3];

/// A single parsed HTTP request, together with its environment.
///
/// # Input data requirements
///
/// #### General designations
/// - `SP`: one or more ASCII whitespace characters
/// - `CRLF`: `"\r\n"`, the only accepted line terminator
///
/// ## First line
///
/// ```text
/// [METHOD] SP [PATH] SP [VERSION] CRLF
/// ```
///
/// Method and path are required; a missing version is stored as an empty
/// string and anything after the third token is ignored. The method is kept
/// as sent (no case folding, no validation against a method list).
///
/// ## Headers
///
/// ```text
/// [NAME]: SP [VALUE] CRLF
/// ```
///
/// Names are normalized with [`header_key`] (`X-Foo` becomes `HTTP_X_FOO`,
/// `Content-Type` becomes `CONTENT_TYPE`). A repeated name keeps the last
/// value. Lines without `": "` are skipped.
///
/// ## End of head
///
/// The head ends at the first `CRLF CRLF`. If the stream ends before one is
/// seen, whatever was read is taken as the head.
///
/// ## Body
///
/// See [`BodyPolicy`](crate::limits::BodyPolicy) for which requests honour
/// `Content-Length`. The body never includes bytes beyond that length.
///
/// # Environment
///
/// [`env`](Request::env) holds every normalized header plus:
///
/// | Key              | Value                                             |
/// |------------------|---------------------------------------------------|
/// | `REQUEST_METHOD` | method token                                      |
/// | `SCRIPT_NAME`    | always `""`                                       |
/// | `PATH_INFO`      | canonical path of the request URI                 |
/// | `QUERY_STRING`   | query as sent, without `?`, `""` when absent      |
/// | `SERVER_NAME`    | host of the request URI                           |
/// | `SERVER_PORT`    | explicit port, or the scheme's default            |
///
/// `PATH_INFO` is canonicalized: dot segments are resolved, so `/a/../b`
/// becomes `/b`. [`raw_path`](Request::raw_path) keeps the target as sent.
///
/// The remaining protocol metadata is exposed through methods:
/// [`env_version`](Request::env_version), [`scheme`](Request::scheme),
/// [`body`](Request::body), [`errors`](Request::errors) and the three
/// concurrency flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    path: String,
    version: String,

    scheme: Scheme,
    host: String,
    port: String,
    query: String,

    env: HeaderMap,
    body: Body,
    errors: ErrorStream,
}

// Public API
impl Request {
    /// Method token exactly as it appeared on the request line.
    #[inline(always)]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target as sent, including any query string.
    #[inline(always)]
    pub fn raw_path(&self) -> &str {
        &self.path
    }

    /// Canonical path of the request URI (same as `PATH_INFO`).
    #[inline]
    pub fn path(&self) -> &str {
        self.env.get("PATH_INFO").unwrap_or_default()
    }

    /// Version token from the request line, e.g. `HTTP/1.1`. Empty if absent.
    #[inline(always)]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline(always)]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[inline(always)]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline(always)]
    pub fn port(&self) -> &str {
        &self.port
    }

    #[inline(always)]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The full environment: normalized headers plus the fixed keys.
    #[inline(always)]
    pub const fn env(&self) -> &HeaderMap {
        &self.env
    }

    /// Looks up an environment key, e.g. `"PATH_INFO"` or `"HTTP_X_FOO"`.
    #[inline]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key)
    }

    /// Looks up a request header by its wire name (`"X-Foo"`, `"content-type"`).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.env.get(&header_key(name))
    }

    /// Interface version, see [`ENV_VERSION`].
    #[inline(always)]
    pub const fn env_version(&self) -> [u16; 2] {
        ENV_VERSION
    }

    /// The request body; reads yield only the bytes of this request.
    #[inline(always)]
    pub fn body(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Error output channel for the handler (standard error).
    #[inline(always)]
    pub fn errors(&mut self) -> &mut ErrorStream {
        &mut self.errors
    }

    /// Always `false`: no other request is handled concurrently.
    #[inline(always)]
    pub const fn multithread(&self) -> bool {
        false
    }

    /// Always `false`: no sibling process serves the same application.
    #[inline(always)]
    pub const fn multiprocess(&self) -> bool {
        false
    }

    /// Always `true`: this is the only request of the process lifetime.
    #[inline(always)]
    pub const fn run_once(&self) -> bool {
        true
    }

    /// Consumes the request and returns its body.
    #[inline]
    pub fn into_body(self) -> Body {
        self.body
    }
}

/// Reads and parses exactly one request from `input`.
///
/// Blocks until the head delimiter or end-of-input is seen, then reads the
/// body according to `limits.body_policy`. Bytes of `input` past the body
/// are left unread, except those drained together with the head.
///
/// # Errors
///
/// - [`Error::Io`] when reading fails
/// - [`Error::InvalidEncoding`] when the request line or a header name is not UTF-8
/// - [`Error::MalformedRequestLine`] when method or path is missing
/// - [`Error::InvalidContentLength`] when a consulted `Content-Length` is not a number
/// - [`Error::InvalidUri`] when scheme, host and path do not form a URI
pub fn read_request<R: Read>(input: &mut R, limits: &ReqLimits) -> Result<Request> {
    let (head, extra) = drain(input, limits.read_size())?;

    let decoded = decode_head(&head)?;
    let head: &str = &decoded;
    let (heading, raw_headers) = head.split_once(CRLF).unwrap_or((head, ""));

    let (method, path, version) = parse_request_line(heading)?;
    let env = parse_headers(raw_headers);

    let body = read_body(input, &method, &env, extra, limits)?;

    Request::assemble(method, path, version, env, body, limits)
}

// Parse head

/// The request line and header names must be UTF-8. Header values may carry
/// any bytes (`obs-text`); invalid sequences become `U+FFFD`.
fn decode_head(head: &[u8]) -> Result<Cow<'_, str>> {
    if let Ok(head) = simdutf8::basic::from_utf8(head) {
        return Ok(Cow::Borrowed(head));
    }

    let (heading, mut rest) = split_line(head);
    let mut decoded = String::with_capacity(head.len());
    decoded.push_str(strict_utf8(heading)?);

    while let Some(remaining) = rest {
        let (line, next) = split_line(remaining);
        decoded.push_str(CRLF);

        match memmem::find(line, b": ") {
            Some(pos) => {
                decoded.push_str(strict_utf8(&line[..pos])?);
                decoded.push_str(&String::from_utf8_lossy(&line[pos..]));
            }
            None => decoded.push_str(&String::from_utf8_lossy(line)),
        }
        rest = next;
    }

    debug!("header values are not UTF-8, decoded lossily");
    Ok(Cow::Owned(decoded))
}

#[inline]
fn split_line(bytes: &[u8]) -> (&[u8], Option<&[u8]>) {
    match memmem::find(bytes, CRLF.as_bytes()) {
        Some(pos) => (&bytes[..pos], Some(&bytes[pos + CRLF.len()..])),
        None => (bytes, None),
    }
}

#[inline]
fn strict_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::InvalidEncoding)
}

#[inline]
fn parse_request_line(heading: &str) -> Result<(String, String, String)> {
    let mut tokens = heading.split_whitespace();

    let (Some(method), Some(path)) = (tokens.next(), tokens.next()) else {
        return Err(Error::MalformedRequestLine(heading.to_owned()));
    };
    let version = tokens.next().unwrap_or_default();

    debug!(method, path, version, "parsed request line");
    Ok((method.to_owned(), path.to_owned(), version.to_owned()))
}

#[inline]
fn parse_headers(raw_headers: &str) -> HeaderMap {
    let mut env = HeaderMap::with_capacity(16);

    for line in raw_headers.split(CRLF).filter(|line| !line.is_empty()) {
        match line.split_once(": ") {
            Some((name, value)) => {
                env.insert(header_key(name), value);
            }
            None => debug!(line, "skipping header line without \": \""),
        }
    }

    env
}

// Body
#[inline]
fn read_body<R: Read>(
    input: &mut R,
    method: &str,
    env: &HeaderMap,
    mut extra: Vec<u8>,
    limits: &ReqLimits,
) -> Result<Body> {
    if !limits.body_policy.reads_content_length(method) {
        debug!(buffered = extra.len(), "body limited to bytes drained with the head");
        return Ok(Body::new(extra));
    }

    let Some(raw) = env.get("CONTENT_LENGTH") else {
        return Ok(Body::new(extra));
    };
    let length = types::slice_to_usize(raw.trim().as_bytes())
        .ok_or_else(|| Error::InvalidContentLength(raw.to_owned()))?;

    if extra.len() >= length {
        extra.truncate(length);
    } else {
        let missing = (length - extra.len()) as u64;
        let read = input.by_ref().take(missing).read_to_end(&mut extra)?;

        if (read as u64) < missing {
            debug!(expected = length, available = extra.len(), "input ended inside the body");
        }
    }

    debug!(length = extra.len(), "body framed by Content-Length");
    Ok(Body::new(extra))
}

// Environment
impl Request {
    fn assemble(
        method: String,
        path: String,
        version: String,
        mut env: HeaderMap,
        body: Body,
        limits: &ReqLimits,
    ) -> Result<Request> {
        let scheme = Scheme::from_https_flag(env.get("HTTP_HTTPS"));
        let host = env
            .get("SERVER_NAME")
            .or_else(|| env.get("HTTP_HOST"))
            .unwrap_or(limits.fallback_server_name.as_str());

        let raw_uri = format!("{scheme}://{host}{path}");
        let uri = Url::parse(&raw_uri).map_err(|source| Error::InvalidUri {
            uri: raw_uri.clone(),
            source,
        })?;

        let host = uri.host_str().unwrap_or_default().to_owned();
        let port = uri
            .port_or_known_default()
            .map(|port| port.to_string())
            .unwrap_or_default();
        let query = raw_query(&path).to_owned();

        env.insert("REQUEST_METHOD", method.as_str());
        env.insert("SCRIPT_NAME", "");
        env.insert("PATH_INFO", uri.path());
        env.insert("QUERY_STRING", query.as_str());
        env.insert("SERVER_NAME", host.as_str());
        env.insert("SERVER_PORT", port.as_str());

        Ok(Request {
            method,
            path,
            version,
            scheme,
            host,
            port,
            query,
            env,
            body,
            errors: ErrorStream,
        })
    }
}

/// Query of a request target as sent: after the first `?`, up to any `#`.
#[inline]
fn raw_query(target: &str) -> &str {
    let target = target.split_once('#').map_or(target, |(before, _)| before);
    target.split_once('?').map_or("", |(_, query)| query)
}

//

/// Reads from `input` in `chunk_size` pieces until the head delimiter or
/// end-of-input, returning `(head, extra)`.
///
/// `head` excludes the delimiter; `extra` holds the bytes read after it.
pub(crate) fn drain<R: Read>(input: &mut R, chunk_size: usize) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let finder = memmem::Finder::new(HEAD_END);
    let mut buffer = Vec::with_capacity(chunk_size);
    let mut chunk = vec![0; chunk_size];

    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => {
                debug!(len = buffer.len(), "input ended before the head delimiter");
                return Ok((buffer, Vec::new()));
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        trace!(n, "read chunk");

        // The delimiter may straddle the previous chunk and this one.
        let search_from = buffer.len().saturating_sub(HEAD_END.len() - 1);
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(pos) = finder.find(&buffer[search_from..]) {
            let end_head = search_from + pos;
            let extra = buffer.split_off(end_head + HEAD_END.len());
            buffer.truncate(end_head);

            return Ok((buffer, extra));
        }
    }
}

// BODY

/// An already-delimited request body.
///
/// Implements [`Read`]; it never touches the input stream again, so reading
/// it to the end cannot block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    inner: Cursor<Vec<u8>>,
}

impl Body {
    #[inline]
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Body {
            inner: Cursor::new(bytes),
        }
    }

    /// All body bytes, independent of how much has been read.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Moves the read position back to the start.
    #[inline]
    pub fn rewind(&mut self) {
        self.inner.set_position(0);
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for Body {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

// ERRORS

/// Error output handed to the handler; writes go to standard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorStream;

impl Write for ErrorStream {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
