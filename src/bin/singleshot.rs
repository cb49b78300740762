//! inetd-style echo service.
//!
//! Answers the request on stdin with a plain-text dump of its environment
//! followed by the request body. Logs go to stderr; stdout carries the
//! response.

use clap::Parser;
use singleshot::{
    limits::{BodyPolicy, ReqLimits},
    BoxError, Request, Response, SingleShot, StatusCode,
};
use std::fmt::Write as _;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "singleshot")]
#[command(about = "Answer one HTTP/1.1 request from stdin with an echo of it", long_about = None)]
struct Args {
    /// Read size used while looking for the end of the request head
    #[arg(long, env = "SINGLESHOT_CHUNK_SIZE", default_value_t = 1024)]
    chunk_size: usize,

    /// Read POST and PUT bodies up to Content-Length instead of only the
    /// bytes that arrived with the head
    #[arg(long, env = "SINGLESHOT_CONTENT_LENGTH_BODIES")]
    content_length_bodies: bool,

    /// Host used when the request names none
    #[arg(long, env = "SINGLESHOT_SERVER_NAME", default_value = "localhost")]
    server_name: String,
}

impl Args {
    fn request_limits(&self) -> ReqLimits {
        ReqLimits {
            chunk_size: self.chunk_size,
            body_policy: match self.content_length_bodies {
                true => BodyPolicy::ContentLength,
                false => BodyPolicy::Verbatim,
            },
            fallback_server_name: self.server_name.clone(),
        }
    }
}

fn echo(req: Request) -> Result<Response, BoxError> {
    let mut dump = String::new();

    writeln!(dump, "{} {} {}", req.method(), req.raw_path(), req.version())?;
    for (key, value) in req.env().iter() {
        writeln!(dump, "{key}={value}")?;
    }
    writeln!(dump)?;

    let body = req.into_body().into_bytes();
    let length = dump.len() + body.len();

    Ok(Response::from(StatusCode::Ok)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", length.to_string())
        .body([dump.into_bytes(), body]))
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?args, "starting");

    SingleShot::builder()
        .handler(echo)
        .request_limits(args.request_limits())
        .build()
        .run_and_exit()
}
