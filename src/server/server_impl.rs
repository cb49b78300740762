use crate::{
    errors::{BoxError, Result},
    http::{request::Request, response::Response},
    limits::ReqLimits,
    server::connection::Connection,
};
use std::{
    io::{self, Read, Stdin, Stdout, Write},
    process,
};
use tracing::{error, info_span};

/// The application invoked for the one request of a process.
///
/// A handler is consumed by the call: a single-shot process never serves a
/// second request, so there is nothing to keep it alive for.
///
/// Any `FnOnce(Request) -> Result<Response, E>` closure is a handler, as long as
/// `E` converts into a [`BoxError`].
///
/// # Examples
///
/// Closure handler
/// ```
/// use singleshot::{Request, Response, StatusCode};
///
/// let handler = |req: Request| {
///     let greeting = format!("Hello from {}!", req.host());
///     Ok::<_, std::io::Error>(
///         Response::from(StatusCode::Ok)
///             .header("Content-Type", "text/plain")
///             .body([greeting]),
///     )
/// };
/// # let _ = handler;
/// ```
/// Struct handler
/// ```
/// use singleshot::{BoxError, Handler, Request, Response, StatusCode};
///
/// struct Router {
///     api_prefix: String,
/// }
///
/// impl Handler for Router {
///     fn handle(self, req: Request) -> Result<Response, BoxError> {
///         if req.path().starts_with(&self.api_prefix) {
///             Ok(Response::from(StatusCode::Ok).body(["{}"]))
///         } else {
///             Ok(Response::from(StatusCode::NotFound))
///         }
///     }
/// }
/// ```
pub trait Handler {
    /// Turns the request into a response.
    ///
    /// # Errors
    ///
    /// An `Err` aborts the run without writing anything: the output is
    /// closed and [`SingleShot::run`] returns
    /// [`Error::Handler`](crate::Error::Handler). Handlers that want the
    /// client to see an error page should return a `5xx` response instead.
    fn handle(self, request: Request) -> Result<Response, BoxError>;
}

impl<F, E> Handler for F
where
    F: FnOnce(Request) -> Result<Response, E>,
    E: Into<BoxError>,
{
    #[inline]
    fn handle(self, request: Request) -> Result<Response, BoxError> {
        self(request).map_err(Into::into)
    }
}

/// Runs exactly one HTTP/1.1 exchange over a pair of byte streams.
///
/// The request is read from the input, passed to the [`Handler`], and the
/// response is written to the output, which is then closed. By default the
/// streams are the process's standard input and output, which is what an
/// inetd-style launcher connects to the client socket.
///
/// # Examples
///
/// ```no_run
/// use singleshot::{Request, Response, SingleShot};
///
/// fn main() {
///     SingleShot::builder()
///         .handler(|req: Request| {
///             Ok::<_, std::io::Error>(
///                 Response::new(200)
///                     .header("Content-Type", "text/plain")
///                     .body([format!("You asked for {}\n", req.path())]),
///             )
///         })
///         .build()
///         .run_and_exit()
/// }
/// ```
pub struct SingleShot<H, R = Stdin, W = Stdout>
where
    H: Handler,
    R: Read,
    W: Write,
{
    handler: H,
    input: R,
    output: W,
    request_limits: ReqLimits,
}

impl SingleShot<fn(Request) -> Result<Response, BoxError>> {
    /// Creates a builder wired to standard input and standard output.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use singleshot::{Request, Response, SingleShot};
    ///
    /// let shot = SingleShot::builder()
    ///     .handler(|_: Request| Ok::<_, std::io::Error>(Response::new(204)))
    ///     .build();
    /// ```
    #[inline]
    pub fn builder() -> SingleShotBuilder<(), Stdin, Stdout> {
        SingleShotBuilder {
            handler: (),
            input: io::stdin(),
            output: io::stdout(),
            request_limits: None,
        }
    }
}

impl<H, R, W> SingleShot<H, R, W>
where
    H: Handler,
    R: Read,
    W: Write,
{
    /// Reads the request, calls the handler and writes the response.
    ///
    /// The output is closed exactly once whatever happens: after the
    /// response on success, before returning on any error, and during
    /// unwinding if the handler panics.
    ///
    /// Closing means flushing and dropping the output. Dropping a
    /// [`Stdout`] handle does not close file descriptor 1, so with the
    /// default output the peer only sees end-of-stream when the process
    /// exits. Use [`run_and_exit`](Self::run_and_exit), or pass an owned
    /// stream to [`output`](SingleShotBuilder::output), to release the
    /// client as soon as the response is written.
    ///
    /// # Errors
    ///
    /// Every variant of [`Error`](crate::Error). Nothing is written to the
    /// output when the request cannot be read or the handler fails.
    pub fn run(self) -> Result<()> {
        let span = info_span!("singleshot", chunk_size = self.request_limits.chunk_size);
        let _enter = span.enter();

        Connection::new(self.input, self.output).run(self.handler, &self.request_limits)
    }

    /// Like [`run`](Self::run), then terminates the process.
    ///
    /// Exits with status `0` on success and `1` on failure, after logging the
    /// error. The output has already been closed by then.
    pub fn run_and_exit(self) -> ! {
        match self.run() {
            Ok(()) => process::exit(0),
            Err(err) => {
                error!(code = err.code(), error = %err, "request failed");
                process::exit(1)
            }
        }
    }
}

/// Builder for configuring and creating [`SingleShot`] instances.
///
/// Input and output default to standard input and standard output. They
/// are resolved when [`SingleShot::builder`] is called, not when the request
/// is read.
pub struct SingleShotBuilder<H, R = Stdin, W = Stdout> {
    handler: H,
    input: R,
    output: W,
    request_limits: Option<ReqLimits>,
}

impl<H, R, W> SingleShotBuilder<H, R, W> {
    /// Sets the request handler.
    ///
    /// **This is a required component.** [`build`](Self::build) is only
    /// available once a handler has been set.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use singleshot::{BoxError, Handler, Request, Response, SingleShot};
    ///
    /// struct NoContent;
    ///
    /// impl Handler for NoContent {
    ///     fn handle(self, _: Request) -> Result<Response, BoxError> {
    ///         Ok(Response::new(204))
    ///     }
    /// }
    ///
    /// let shot = SingleShot::builder().handler(NoContent).build();
    /// ```
    #[inline(always)]
    pub fn handler<NewH: Handler>(self, handler: NewH) -> SingleShotBuilder<NewH, R, W> {
        SingleShotBuilder {
            handler,
            input: self.input,
            output: self.output,
            request_limits: self.request_limits,
        }
    }

    /// Replaces the stream the request is read from.
    ///
    /// # Examples
    ///
    /// ```
    /// use singleshot::{Request, Response, SingleShot};
    ///
    /// let mut output = Vec::new();
    ///
    /// SingleShot::builder()
    ///     .handler(|_: Request| Ok::<_, std::io::Error>(Response::new(204)))
    ///     .input(b"GET / HTTP/1.1\r\n\r\n".as_slice())
    ///     .output(&mut output)
    ///     .build()
    ///     .run()
    ///     .unwrap();
    ///
    /// assert_eq!(output, b"HTTP/1.1 204 No Content\r\n\r\n");
    /// ```
    #[inline(always)]
    pub fn input<NewR: Read>(self, input: NewR) -> SingleShotBuilder<H, NewR, W> {
        SingleShotBuilder {
            handler: self.handler,
            input,
            output: self.output,
            request_limits: self.request_limits,
        }
    }

    /// Replaces the stream the response is written to.
    #[inline(always)]
    pub fn output<NewW: Write>(self, output: NewW) -> SingleShotBuilder<H, R, NewW> {
        SingleShotBuilder {
            handler: self.handler,
            input: self.input,
            output,
            request_limits: self.request_limits,
        }
    }

    /// Configures how the request is read.
    ///
    /// See [`ReqLimits`] for the available settings.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }
}

impl<H, R, W> SingleShotBuilder<H, R, W>
where
    H: Handler,
    R: Read,
    W: Write,
{
    /// Constructs the [`SingleShot`].
    #[inline]
    pub fn build(self) -> SingleShot<H, R, W> {
        SingleShot {
            handler: self.handler,
            input: self.input,
            output: self.output,
            request_limits: self.request_limits.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::Error,
        http::request::tests::Parts,
        limits::BodyPolicy,
        server::connection::tests::{Log, Recorder},
    };
    use std::{cell::RefCell, convert::Infallible, rc::Rc};

    fn run<H: Handler>(input: &[u8], limits: ReqLimits, handler: H) -> (Result<()>, Vec<u8>) {
        let mut output = Vec::new();
        let result = SingleShot::builder()
            .handler(handler)
            .input(input)
            .output(&mut output)
            .request_limits(limits)
            .build()
            .run();

        (result, output)
    }

    fn text(body: String) -> Result<Response, Infallible> {
        Ok(Response::new(200)
            .header("Content-Type", "text/plain")
            .header("Content-Length", body.len().to_string())
            .body([body]))
    }

    #[test]
    fn end_to_end() {
        let (result, output) = run(
            b"GET / HTTP/1.1\r\nServer-Name: localhost\r\n\r\n",
            ReqLimits::default(),
            |_: Request| Ok::<_, Infallible>(Response::new(200).header("Content-Type", "text/plain")),
        );

        result.unwrap();
        assert_eq!(output, b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n");
    }

    #[test]
    fn once_closure_handler() {
        let greeting = String::from("hello");
        let (result, output) = run(
            b"GET / HTTP/1.1\r\n\r\n",
            ReqLimits::default(),
            move |_: Request| text(greeting),
        );

        result.unwrap();
        assert!(output.ends_with(b"\r\n\r\nhello"));
    }

    #[test]
    fn query_parameters() {
        let (result, output) = run(
            b"GET /hello?name=ferris&lang=rust HTTP/1.1\r\nHost: example.org\r\n\r\n",
            ReqLimits::default(),
            |req: Request| {
                let mut body = String::new();
                for pair in req.query().split('&') {
                    if let Some((key, value)) = pair.split_once('=') {
                        body.push_str(&format!("{key}={value};"));
                    }
                }
                text(body)
            },
        );

        result.unwrap();
        assert_eq!(
            output,
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 22\r\n\r\nname=ferris;lang=rust;"
                .as_slice()
        );
    }

    #[test]
    fn body_policies() {
        let input = b"POST /upload HTTP/1.1\r\nContent-Length: 10\r\n\r\n0123456789";

        #[rustfmt::skip]
        let cases = [
            (BodyPolicy::Verbatim,      vec![&input[..50], &input[50..]], "01234"),
            (BodyPolicy::ContentLength, vec![&input[..50], &input[50..]], "0123456789"),
            (BodyPolicy::Verbatim,      vec![&input[..]],                 "0123456789"),
        ];

        for (body_policy, parts, expected) in cases {
            let mut output = Vec::new();
            let limits = ReqLimits {
                chunk_size: 64,
                body_policy,
                ..ReqLimits::default()
            };

            SingleShot::builder()
                .handler(|mut req: Request| {
                    text(String::from_utf8_lossy(req.body().as_bytes()).into_owned())
                })
                .input(Parts::from_slices(&parts))
                .output(&mut output)
                .request_limits(limits)
                .build()
                .run()
                .unwrap();

            assert!(
                output.ends_with(format!("\r\n\r\n{expected}").as_bytes()),
                "{body_policy:?}: {:?}",
                String::from_utf8_lossy(&output)
            );
        }
    }

    #[test]
    fn run_errors() {
        let ok = |_: Request| Ok::<_, Infallible>(Response::new(200));

        let (result, output) = run(b"NONSENSE\r\n\r\n", ReqLimits::default(), ok);
        assert_eq!(result.unwrap_err().code(), "MALFORMED_REQUEST_LINE");
        assert!(output.is_empty());

        let (result, output) = run(
            b"GET / HTTP/1.1\r\nContent-Length: ten\r\n\r\n",
            ReqLimits::default(),
            ok,
        );
        assert_eq!(result.unwrap_err().code(), "INVALID_CONTENT_LENGTH");
        assert!(output.is_empty());

        let (result, output) = run(
            b"GET / HTTP/1.1\r\n\r\n",
            ReqLimits::default(),
            |_: Request| Err::<Response, _>(io::Error::other("no backend")),
        );
        assert!(matches!(result, Err(Error::Handler(_))));
        assert!(output.is_empty());
    }

    #[test]
    fn output_closed_once() {
        let log = Rc::new(RefCell::new(Log::default()));

        SingleShot::builder()
            .handler(|_: Request| Ok::<_, Infallible>(Response::new(204)))
            .input(b"DELETE /item/7 HTTP/1.1\r\n\r\n".as_slice())
            .output(Recorder(log.clone()))
            .build()
            .run()
            .unwrap();

        let log = log.borrow();
        assert_eq!(log.bytes, b"HTTP/1.1 204 No Content\r\n\r\n");
        assert_eq!((log.flushes, log.drops), (1, 1));
    }

    #[test]
    fn truncated_input_does_not_hang() {
        let (result, output) = run(
            b"GET /partial HTTP/1.1\r\nHost: a",
            ReqLimits::default(),
            |req: Request| text(req.path().to_owned()),
        );

        result.unwrap();
        assert!(output.ends_with(b"\r\n\r\n/partial"));
    }
}
