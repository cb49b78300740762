//! Request reading configuration
//!
//! There is a single configuration struct, [`ReqLimits`], handed to the
//! [`SingleShotBuilder`](crate::SingleShotBuilder). Every field has a default
//! that reproduces the classic single-shot behaviour, so most callers never
//! touch it.
//!
//! # Examples
//!
//! ```no_run
//! use singleshot::{limits::{BodyPolicy, ReqLimits}, Request, Response, SingleShot};
//!
//! SingleShot::builder()
//!     .handler(|_: Request| Ok::<_, std::io::Error>(Response::new(204)))
//!     .request_limits(ReqLimits {
//!         chunk_size: 4096,
//!         body_policy: BodyPolicy::ContentLength,
//!         ..ReqLimits::default()
//!     })
//!     .build()
//!     .run_and_exit();
//! ```

/// Controls how the request head and body are pulled off the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqLimits {
    /// Size of each read while looking for the end of the head (default: `1024`).
    ///
    /// Bytes read past the `\r\n\r\n` delimiter are not lost: they become the
    /// start of the body. A value of `0` is treated as `1`.
    pub chunk_size: usize,

    /// Which requests may pull additional body bytes off the stream
    /// (default: [`BodyPolicy::Verbatim`]).
    pub body_policy: BodyPolicy,

    /// Host used to build the request URI when the request carries neither a
    /// `Server-Name` nor a `Host` header (default: `"localhost"`).
    pub fallback_server_name: String,
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            body_policy: BodyPolicy::Verbatim,
            fallback_server_name: String::from("localhost"),
        }
    }
}

impl ReqLimits {
    #[inline(always)]
    pub(crate) fn read_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

/// How the body length is decided once the head has been drained.
///
/// | Policy          | `POST` / `PUT`                 | Other methods                     |
/// |-----------------|--------------------------------|-----------------------------------|
/// | `Verbatim`      | only bytes already buffered    | buffered bytes + `Content-Length` |
/// | `ContentLength` | buffered bytes + `Content-Length` | buffered bytes + `Content-Length` |
///
/// `Verbatim` keeps the historic behaviour, where exactly the methods that
/// usually carry a body never read past the first drain. Switch to
/// `ContentLength` to have every method honour `Content-Length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyPolicy {
    /// `POST` and `PUT` bodies are capped at the bytes captured with the head.
    #[default]
    Verbatim,
    /// Every method reads up to `Content-Length` bytes.
    ContentLength,
}

impl BodyPolicy {
    /// Returns `true` when `Content-Length` should drive the body read for `method`.
    #[inline]
    pub fn reads_content_length(self, method: &str) -> bool {
        match self {
            BodyPolicy::ContentLength => true,
            BodyPolicy::Verbatim => {
                !(method.eq_ignore_ascii_case("POST") || method.eq_ignore_ascii_case("PUT"))
            }
        }
    }
}
