//! Output destinations.
//!
//! Every render writes into a [`Sink`]. A plain byte stream only receives the
//! body; a sink that can also carry a response head (headers and status)
//! exposes it through [`Sink::response_head`], and the renderer then sets
//! `Content-Type` and the status before writing the body.
//!
//! [`ResponseRecorder`] is the in-memory header-capable sink. It converts into
//! an [`http::Response`] for handing to a server framework.
//!
//! ```rust
//! use http::StatusCode;
//! use layout_render::{Render, Options, ResponseRecorder};
//!
//! let render = Render::new(Options::new());
//! let mut rec = ResponseRecorder::new();
//! render.text(&mut rec, StatusCode::OK, "pong").unwrap();
//!
//! assert_eq!(rec.status(), StatusCode::OK);
//! assert_eq!(rec.body_str(), "pong");
//! assert_eq!(rec.headers()["content-type"], "text/plain; charset=UTF-8");
//! ```

use std::io;

use http::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, Response, StatusCode};

/// Header and status side of a response.
pub trait ResponseHead {
    /// Mutable access to the headers still to be sent.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line. Only the first call has an effect.
    fn write_status(&mut self, status: StatusCode);
}

/// A byte destination that may also carry a response head.
pub trait Sink: io::Write {
    /// The response head, when this sink has one.
    fn response_head(&mut self) -> Option<&mut dyn ResponseHead> {
        None
    }
}

impl Sink for Vec<u8> {}

impl Sink for io::Cursor<Vec<u8>> {}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn response_head(&mut self) -> Option<&mut dyn ResponseHead> {
        (**self).response_head()
    }
}

/// In-memory response with head and body.
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    wrote_status: bool,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            wrote_status: false,
        }
    }
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded status. `200 OK` until one is written.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether a status has been written.
    pub fn wrote_status(&self) -> bool {
        self.wrote_status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts the recording into an [`http::Response`].
    pub fn into_response(self) -> Response<Vec<u8>> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseHead for ResponseRecorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if !self.wrote_status {
            self.status = status;
            self.wrote_status = true;
        }
    }
}

impl io::Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A body without an explicit status implies 200.
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for ResponseRecorder {
    fn response_head(&mut self) -> Option<&mut dyn ResponseHead> {
        Some(self)
    }
}

/// Writes a plain-text 500 response carrying `message`.
///
/// Plain byte sinks only receive the message.
pub fn write_http_error(sink: &mut dyn Sink, message: &str) -> io::Result<()> {
    if let Some(head) = sink.response_head() {
        let headers = head.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        head.write_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
    sink.write_all(message.as_bytes())?;
    sink.write_all(b"\n")
}
