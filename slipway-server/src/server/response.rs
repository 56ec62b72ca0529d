//! HTTP-like response formatting
//!
//! Responses look like HTTP/1.1 but carry only the three headers a
//! webhook sender or a browser needs. The body is always a minimal HTML
//! document.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
}

impl Status {
    fn line(self) -> &'static str {
        match self {
            Status::Ok => "200 OK",
            Status::BadRequest => "400 Bad Request",
        }
    }
}

/// Wraps a message in a minimal HTML document.
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>{body}</body>\n</html>\n"
    )
}

/// Full wire response: status line, content headers, blank line, body.
pub fn envelope(status: Status, html: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        status.line(),
        html.len(),
        html
    )
}

/// Renders a titled message as a complete response.
pub fn respond(status: Status, title: &str, message: &str) -> String {
    envelope(status, &html_page(title, message))
}
