//! Just enough HTTP/1.1 for the control plane: one request per connection,
//! request line plus body, `Content-Length` honoured when present.

use std::fmt::Write as _;

use taktvakt_detection::DirectoryEntry;

pub const MAX_REQUEST_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: String,
}

/// Outcome of inspecting the bytes read so far.
#[derive(Debug, PartialEq, Eq)]
pub enum Parse {
    Complete(Request),
    Incomplete,
    Invalid,
}

pub fn parse_request(raw: &[u8]) -> Parse {
    let Some(header_end) = find(raw, b"\r\n\r\n") else {
        return if raw.len() >= MAX_REQUEST_LEN {
            Parse::Invalid
        } else {
            Parse::Incomplete
        };
    };
    let Ok(head) = std::str::from_utf8(&raw[..header_end]) else {
        return Parse::Invalid;
    };
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let (Some(method), Some(path)) = (request_line.next(), request_line.next()) else {
        return Parse::Invalid;
    };

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok());

    let body = &raw[header_end + 4..];
    if let Some(expected) = content_length {
        if body.len() < expected && raw.len() < MAX_REQUEST_LEN {
            return Parse::Incomplete;
        }
    }
    let body = match content_length {
        Some(expected) => &body[..expected.min(body.len())],
        None => body,
    };

    Parse::Complete(Request {
        method: match method {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_owned()),
        },
        path: path.to_owned(),
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// `(slot, key, value)` for every slot whose `name%d` and `interest%d`
/// fields are both present in a form body.
pub fn parse_form(body: &str, capacity: usize) -> Vec<(usize, String, String)> {
    let mut names = vec![None; capacity];
    let mut interests = vec![None; capacity];

    for pair in body.trim().split('&') {
        let Some((field, value)) = pair.split_once('=') else {
            continue;
        };
        let (target, index) = if let Some(index) = field.strip_prefix("name") {
            (&mut names, index)
        } else if let Some(index) = field.strip_prefix("interest") {
            (&mut interests, index)
        } else {
            continue;
        };
        if let Some(slot) = index.parse::<usize>().ok().and_then(|i| target.get_mut(i)) {
            *slot = Some(decode_form_value(value));
        }
    }

    names
        .into_iter()
        .zip(interests)
        .enumerate()
        .filter_map(|(slot, pair)| match pair {
            (Some(name), Some(interest)) => Some((slot, name, interest)),
            _ => None,
        })
        .collect()
}

/// `application/x-www-form-urlencoded` value decoding.
fn decode_form_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    (Some(high), Some(low)) => {
                        out.push(high << 4 | low);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// The directory as an editable HTML form, one row per slot.
pub fn render_directory(entries: &[DirectoryEntry]) -> String {
    let mut rows = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            rows,
            "<tr><td><input name=\"name{i}\" value=\"{}\"></td>\
             <td><input name=\"interest{i}\" value=\"{}\"></td></tr>",
            escape_html(&entry.key),
            escape_html(&entry.value)
        );
    }
    format!(
        "<html><body><h2>Server Database</h2>\
         <form method=\"POST\">\
         <table border=1><tr><th>Name</th><th>Interest</th></tr>\
         {rows}</table><br><input type=\"submit\"></form></body></html>"
    )
}

pub fn ok(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

pub fn see_other(location: &str) -> String {
    format!("HTTP/1.1 303 See Other\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
}

pub fn bad_request() -> String {
    "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_owned()
}

pub fn internal_error() -> String {
    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        .to_owned()
}
