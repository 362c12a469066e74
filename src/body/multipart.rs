//! `multipart/form-data` decoding.
//!
//! Works on raw bytes end to end so binary file content is never transcoded.
//! Only field values are converted to text, lossily.

use std::collections::HashMap;

use bytes::Bytes;

use super::FileAttachment;
use crate::http::request::Params;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Fields and attachments decoded from one multipart payload.
#[derive(Debug, Default)]
pub struct Multipart {
    pub fields: Params,
    pub files: HashMap<String, FileAttachment>,
}

/// Extract the boundary from a `Content-Type` value.
///
/// Takes everything after a literal `boundary=` up to the next `;`. Quoted
/// boundaries are not unquoted.
pub fn boundary(content_type: &str) -> Option<&str> {
    let start = content_type.find("boundary=")? + "boundary=".len();
    let rest = &content_type[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    let boundary = rest[..end].trim();
    (!boundary.is_empty()).then_some(boundary)
}

/// Decode a multipart payload. Malformed parts are dropped.
pub fn parse(payload: &Bytes, boundary: &str) -> Multipart {
    let mut delimiter = Vec::with_capacity(boundary.len() + 2);
    delimiter.extend_from_slice(b"--");
    delimiter.extend_from_slice(boundary.as_bytes());

    let mut multipart = Multipart::default();

    for (start, end) in split(payload, &delimiter) {
        let mut part = payload.slice(start..end);

        if part.starts_with(CRLF) {
            part = part.slice(CRLF.len()..);
        }
        if part.is_empty() || is_terminal(&part) {
            continue;
        }

        match decode_part(&part) {
            Some(Part::Field { name, value }) => {
                multipart.fields.insert(name, value);
            }
            Some(Part::File { name, attachment }) => {
                multipart.files.insert(name, attachment);
            }
            None => {
                tracing::debug!(part_len = part.len(), "Dropping malformed multipart part");
            }
        }
    }

    multipart
}

/// The `--` that closes the last delimiter, with or without its CRLF.
fn is_terminal(part: &[u8]) -> bool {
    part == b"--" || part == b"--\r\n"
}

enum Part {
    Field { name: String, value: String },
    File { name: String, attachment: FileAttachment },
}

fn decode_part(part: &Bytes) -> Option<Part> {
    let separator = find(part, HEADER_END, 0)?;
    let head = String::from_utf8_lossy(&part[..separator]);
    let mut data = part.slice(separator + HEADER_END.len()..);
    if data.ends_with(CRLF) {
        data = data.slice(..data.len() - CRLF.len());
    }

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for (param, param_value) in disposition_params(value) {
                match param.to_ascii_lowercase().as_str() {
                    "name" => name = Some(param_value),
                    "filename" => filename = Some(param_value),
                    _ => {}
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name?;
    match filename {
        Some(filename) => Some(Part::File {
            name,
            attachment: FileAttachment {
                filename,
                content_type: content_type.unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string()),
                data,
            },
        }),
        None => Some(Part::Field {
            name,
            value: String::from_utf8_lossy(&data).into_owned(),
        }),
    }
}

/// `form-data; name="a"; filename="x.txt"` → `[("name", "a"), ("filename", "x.txt")]`
///
/// A `;` inside a quoted value does not end the parameter.
fn disposition_params(value: &str) -> Vec<(&str, String)> {
    split_unquoted(value, ';')
        .into_iter()
        .filter_map(|param| {
            let (key, raw) = param.split_once('=')?;
            let raw = raw.trim();
            let unquoted = raw
                .strip_prefix('"')
                .and_then(|r| r.strip_suffix('"'))
                .unwrap_or(raw);
            Some((key.trim(), unquoted.to_string()))
        })
        .collect()
}

fn split_unquoted(value: &str, delimiter: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => {
                pieces.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&value[start..]);
    pieces
}

/// Byte ranges between occurrences of `delimiter`.
fn split(haystack: &[u8], delimiter: &[u8]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    while let Some(pos) = find(haystack, delimiter, start) {
        ranges.push((start, pos));
        start = pos + delimiter.len();
    }
    ranges.push((start, haystack.len()));
    ranges
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(parts: &[&[u8]]) -> Bytes {
        Bytes::from(parts.concat())
    }

    #[test]
    fn test_boundary_extraction() {
        assert_eq!(boundary("multipart/form-data; boundary=X"), Some("X"));
        assert_eq!(
            boundary("multipart/form-data; boundary=----abc; charset=utf-8"),
            Some("----abc")
        );
        assert_eq!(boundary("multipart/form-data"), None);
        assert_eq!(boundary("multipart/form-data; boundary="), None);
    }

    #[test]
    fn test_field_and_file() {
        let body = payload(&[
            b"--X\r\n",
            b"Content-Disposition: form-data; name=\"a\"\r\n\r\n",
            b"1\r\n",
            b"--X\r\n",
            b"Content-Disposition: form-data; name=\"f\"; filename=\"x.txt\"\r\n\r\n",
            b"hi\r\n",
            b"--X--\r\n",
        ]);

        let decoded = parse(&body, "X");
        assert_eq!(decoded.fields.len(), 1);
        assert_eq!(decoded.fields.get("a").map(String::as_str), Some("1"));

        let file = decoded.files.get("f").unwrap();
        assert_eq!(file.filename, "x.txt");
        assert_eq!(file.content_type, "application/octet-stream");
        assert_eq!(file.data.as_ref(), b"hi");
    }

    #[test]
    fn test_file_content_type_and_binary_data() {
        let binary: &[u8] = &[0x00, 0xff, 0xfe, 0x0d, 0x0a, 0xc3, 0x28, 0x80];
        let body = payload(&[
            b"--b0und\r\n",
            b"Content-Disposition: form-data; name=\"img\"; filename=\"p.bin\"\r\n",
            b"Content-Type: image/png\r\n\r\n",
            binary,
            b"\r\n--b0und--\r\n",
        ]);

        let decoded = parse(&body, "b0und");
        let file = decoded.files.get("img").unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.data.as_ref(), binary);
    }

    #[test]
    fn test_non_ascii_field_value() {
        let body = payload(&[
            b"--X\r\n",
            "Content-Disposition: form-data; name=\"greeting\"\r\n\r\nhéllo wörld\r\n".as_bytes(),
            b"--X--",
        ]);
        let decoded = parse(&body, "X");
        assert_eq!(decoded.fields.get("greeting").map(String::as_str), Some("héllo wörld"));
    }

    #[test]
    fn test_malformed_parts_dropped() {
        let body = payload(&[
            b"--X\r\n",
            b"Content-Disposition: form-data; name=\"noseparator\"\r\nvalue\r\n",
            b"--X\r\n",
            b"Content-Disposition: form-data\r\n\r\nnameless\r\n",
            b"--X\r\n",
            b"Content-Disposition: form-data; name=\"ok\"\r\n\r\nyes\r\n",
            b"--X--\r\n",
        ]);
        let decoded = parse(&body, "X");
        assert_eq!(decoded.fields.len(), 1);
        assert_eq!(decoded.fields.get("ok").map(String::as_str), Some("yes"));
        assert!(decoded.files.is_empty());
    }

    #[test]
    fn test_filename_does_not_shadow_name() {
        let body = payload(&[
            b"--X\r\n",
            b"content-disposition: form-data; filename=\"doc.pdf\"; name=\"upload\"\r\n\r\n",
            b"%PDF\r\n",
            b"--X--\r\n",
        ]);
        let decoded = parse(&body, "X");
        let file = decoded.files.get("upload").unwrap();
        assert_eq!(file.filename, "doc.pdf");
        assert_eq!(file.data.as_ref(), b"%PDF");
    }

    #[test]
    fn test_quoted_filename_with_semicolon() {
        let body = payload(&[
            b"--X\r\n",
            b"Content-Disposition: form-data; name=\"f\"; filename=\"a;b.txt\"\r\n\r\n",
            b"hi\r\n",
            b"--X--\r\n",
        ]);
        let decoded = parse(&body, "X");
        let file = decoded.files.get("f").unwrap();
        assert_eq!(file.filename, "a;b.txt");
        assert_eq!(file.data.as_ref(), b"hi");
    }

    #[test]
    fn test_disposition_params_respect_quotes() {
        let params = disposition_params(r#" form-data; name="a;b"; filename="x \"y\"; z.txt""#);
        assert_eq!(
            params,
            vec![("name", "a;b".to_string()), ("filename", r#"x \"y\"; z.txt"#.to_string())]
        );
    }

    #[test]
    fn test_only_terminal_marker_is_skipped() {
        let body = payload(&[
            b"--X--x-note: 1\r\n",
            b"Content-Disposition: form-data; name=\"w\"\r\n\r\nv\r\n",
            b"--X--\r\n",
        ]);
        let decoded = parse(&body, "X");
        assert_eq!(decoded.fields.get("w").map(String::as_str), Some("v"));
        assert!(is_terminal(b"--"));
        assert!(is_terminal(b"--\r\n"));
        assert!(!is_terminal(b"--x-note: 1\r\n"));
    }

    #[test]
    fn test_duplicate_field_last_wins() {
        let body = payload(&[
            b"--X\r\nContent-Disposition: form-data; name=\"k\"\r\n\r\nfirst\r\n",
            b"--X\r\nContent-Disposition: form-data; name=\"k\"\r\n\r\nsecond\r\n",
            b"--X--\r\n",
        ]);
        let decoded = parse(&body, "X");
        assert_eq!(decoded.fields.get("k").map(String::as_str), Some("second"));
    }

    #[test]
    fn test_empty_payload() {
        let decoded = parse(&Bytes::new(), "X");
        assert!(decoded.fields.is_empty());
        assert!(decoded.files.is_empty());
    }
}
