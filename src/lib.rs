//! singleshot - Serve exactly one HTTP/1.1 request over a pair of byte streams
//!
//! A single-shot bridge reads one request from an input stream, hands it to an
//! application [`Handler`], writes the response to an output stream and closes
//! it. It is meant for processes launched once per connection by an
//! inetd-style supervisor, where standard input and standard output are the
//! client socket.
//!
//! # Request model
//!
//! - **Head**: read in fixed-size chunks until `\r\n\r\n`, then validated as UTF-8
//! - **Environment**: headers become CGI-style keys (`User-Agent` is `HTTP_USER_AGENT`)
//! - **URI**: rebuilt from scheme, host and path, so `SERVER_NAME`, `SERVER_PORT`
//!   and `QUERY_STRING` are always present
//! - **Body**: bytes buffered with the head plus `Content-Length` more, depending
//!   on the [`BodyPolicy`](limits::BodyPolicy)
//!
//! # Response model
//!
//! - Status line with the standard reason phrase
//! - Headers in insertion order, one line per `\n`-separated value
//! - Body chunks written verbatim, with no framing added
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use singleshot::{Request, Response, SingleShot, StatusCode};
//!
//! fn main() {
//!     SingleShot::builder()
//!         .handler(|req: Request| {
//!             let body = format!("Hello, {}!\n", req.query());
//!
//!             Ok::<_, std::io::Error>(
//!                 Response::from(StatusCode::Ok)
//!                     .header("Content-Type", "text/plain")
//!                     .header("Content-Length", body.len().to_string())
//!                     .body([body]),
//!             )
//!         })
//!         .build()
//!         .run_and_exit()
//! }
//! ```
//! Custom streams and configuration:
//! ```
//! use singleshot::{limits::{BodyPolicy, ReqLimits}, Request, Response, SingleShot};
//!
//! let input = b"PUT /notes/1 HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
//! let mut output = Vec::new();
//!
//! SingleShot::builder()
//!     .handler(|mut req: Request| {
//!         let stored = req.body().len();
//!         Ok::<_, std::io::Error>(Response::new(201).body([format!("stored {stored}")]))
//!     })
//!     .input(input.as_slice())
//!     .output(&mut output)
//!     .request_limits(ReqLimits {
//!         body_policy: BodyPolicy::ContentLength,
//!         ..ReqLimits::default()
//!     })
//!     .build()
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(output, b"HTTP/1.1 201 Created\r\n\r\nstored 5");
//! ```

pub(crate) mod http {
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    errors::{BoxError, Error, Result},
    http::{
        request::{read_request, Body, ErrorStream, Request, ENV_VERSION},
        response::{write_response, Response, ResponseBody},
        types::{header_key, reason_phrase, HeaderMap, Scheme, StatusCode, UNPREFIXED_KEYS},
    },
    server::server_impl::{Handler, SingleShot, SingleShotBuilder},
};
