//! Quoted-printable body encoding (RFC 2045, section 6.7).

use std::fmt::Write as _;

/// Longest encoded line, soft-break `=` included.
const MAX_LINE_LEN: usize = 76;

/// Encodes `text` as quoted-printable.
///
/// Hard line breaks become CRLF and long lines are folded with soft breaks.
/// Tabs and spaces are only escaped where they would otherwise end a line.
#[must_use]
pub fn to_quoted_printable(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    let mut encoded = String::with_capacity(unix.len());
    for (index, line) in unix.split('\n').enumerate() {
        if index > 0 {
            encoded.push_str("\r\n");
        }
        encode_line(line.as_bytes(), &mut encoded);
    }
    encoded
}

fn encode_line(line: &[u8], encoded: &mut String) {
    let mut column = 0;
    let mut bytes = line.iter().peekable();
    while let Some(&byte) = bytes.next() {
        let is_last = bytes.peek().is_none();
        let literal = match byte {
            b'=' => false,
            b'!'..=b'~' => true,
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };
        // Keep one column free for the soft break unless this byte ends the
        // line.
        let limit = if is_last { MAX_LINE_LEN } else { MAX_LINE_LEN - 1 };
        if column + width > limit {
            encoded.push_str("=\r\n");
            column = 0;
        }
        if literal {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "={byte:02X}");
        }
        column += width;
    }
}
