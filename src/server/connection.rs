use crate::{
    errors::{Error, Result},
    http::{request::read_request, response::write_response},
    limits::ReqLimits,
    server::server_impl::Handler,
};
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// The one exchange a single-shot process performs.
///
/// Owns both streams for its whole lifetime. The output is closed exactly
/// once: by [`run`](Connection::run) on every return path, or by `Drop` if the
/// handler panics.
pub(crate) struct Connection<R: Read, W: Write> {
    input: R,
    output: Closing<W>,
}

impl<R: Read, W: Write> Connection<R, W> {
    #[inline]
    pub(crate) fn new(input: R, output: W) -> Self {
        Self {
            input,
            output: Closing::new(output),
        }
    }

    pub(crate) fn run<H: Handler>(mut self, handler: H, limits: &ReqLimits) -> Result<()> {
        let result = self.exchange(handler, limits);
        let closed = self.output.close();

        match (result, closed) {
            (Ok(()), closed) => closed.map_err(Error::from),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "closing output failed");
                Err(err)
            }
        }
    }

    #[inline]
    fn exchange<H: Handler>(&mut self, handler: H, limits: &ReqLimits) -> Result<()> {
        let request = read_request(&mut self.input, limits)?;

        let response = handler.handle(request).map_err(|err| {
            warn!(error = %err, "handler failed");
            Error::Handler(err)
        })?;

        let (status, headers, body) = response.into_parts();
        debug!(status, headers = headers.len(), "writing response");

        write_response(&mut self.output, status, &headers, body)?;
        Ok(())
    }
}

/// Output stream that is flushed and dropped at most once.
pub(crate) struct Closing<W: Write> {
    inner: Option<W>,
}

impl<W: Write> Closing<W> {
    #[inline]
    pub(crate) fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    /// Flushes and drops the stream. Later calls do nothing.
    pub(crate) fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut inner) => inner.flush(),
            None => Ok(()),
        }
    }

    #[inline]
    fn get_mut(&mut self) -> io::Result<&mut W> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "output already closed"))
    }
}

impl<W: Write> Write for Closing<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.get_mut()?.write(buf)
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.get_mut()?.write_all(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.get_mut()?.flush()
    }
}

impl<W: Write> Drop for Closing<W> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "closing output failed");
        }
    }
}
