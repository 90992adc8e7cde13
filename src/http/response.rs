//! Canned response document.
//!
//! # Responsibilities
//! - Hold the fixed HTML body served to every client
//! - Frame it with a status line and the minimal headers
//!
//! # Design Decisions
//! - Headers are separated by bare `\n`, matching what existing clients
//!   of this endpoint already receive
//! - The document is rebuilt for every response; it is small and constant

/// HTML served for every request.
pub const HTML_BODY: &str = "<!DOCTYPE html><html lang=\"en\"><body><h1> HOME </h1>\
<p> Hello from your Server :) </p></body></html>";

/// Status line sent ahead of the headers.
pub const STATUS_LINE: &str = "HTTP/1.1 200 OK";

/// Content type of [`HTML_BODY`].
pub const CONTENT_TYPE: &str = "text/html";

/// Build the full response: status line, headers, blank line, body.
pub fn build_response() -> String {
    format!(
        "{STATUS_LINE}\nContent-Type: {CONTENT_TYPE}\nContent-Length: {}\n\n{HTML_BODY}",
        HTML_BODY.len()
    )
}
