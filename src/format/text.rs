//! Human-readable patch renderings
//!
//! ```text
//! % --- old.bin (1200 bytes)
//! % +++ new.bin (1210 bytes)
//! @ -[0] => +[0] 600 bytes
//!  ...copied bytes...
//! +inserted bytes
//! ```
//!
//! These are display-only; nothing parses them back.

use super::{FormatStrategy, Labels, PatchHeader};
use crate::diff::CopySpan;
use std::io::{self, Write};

/// How bytes are rendered in text output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    /// Non-printable bytes become `.`
    Filtered,
    /// Non-printable bytes and backslashes become `\ooo` octal escapes
    Quoted,
}

impl TextStyle {
    /// Append the rendering of `data` to `out`
    pub fn render(self, data: &[u8], out: &mut Vec<u8>) {
        for &b in data {
            let printable = b == b' ' || b.is_ascii_graphic();
            match self {
                Self::Filtered if printable => out.push(b),
                Self::Filtered => out.push(b'.'),
                Self::Quoted if printable && b != b'\\' => out.push(b),
                Self::Quoted => out.extend_from_slice(&[
                    b'\\',
                    b'0' + (b >> 6),
                    b'0' + ((b >> 3) & 7),
                    b'0' + (b & 7),
                ]),
            }
        }
    }
}

/// Text encoder writing to any [`Write`]
pub struct TextFormat<W: Write> {
    inner: W,
    style: TextStyle,
    old_label: String,
    new_label: String,
    line: Vec<u8>,
}

impl<W: Write> TextFormat<W> {
    /// Wrap a writer; `labels` name the inputs in the header
    pub fn new(inner: W, style: TextStyle, labels: Labels<'_>) -> Self {
        Self {
            inner,
            style,
            old_label: labels.old.to_string(),
            new_label: labels.new.to_string(),
            line: Vec::new(),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn emit_line(&mut self) -> io::Result<()> {
        self.line.push(b'\n');
        self.inner.write_all(&self.line)?;
        self.line.clear();
        Ok(())
    }
}

impl<W: Write> FormatStrategy for TextFormat<W> {
    fn write_header(&mut self, header: &PatchHeader) -> io::Result<()> {
        writeln!(
            self.inner,
            "% --- {} ({} bytes)",
            self.old_label, header.source_len
        )?;
        writeln!(
            self.inner,
            "% +++ {} ({} bytes)",
            self.new_label, header.dest_len
        )
    }

    fn write_insert(&mut self, data: &[u8]) -> io::Result<()> {
        self.line.push(b'+');
        self.style.render(data, &mut self.line);
        self.emit_line()
    }

    fn write_copy(&mut self, span: &CopySpan, data: &[u8]) -> io::Result<()> {
        writeln!(
            self.inner,
            "@ -[{}] => +[{}] {} bytes",
            span.source_offset, span.dest_offset, span.length
        )?;
        self.line.push(b' ');
        self.style.render(data, &mut self.line);
        self.emit_line()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    fn render(style: TextStyle, data: &[u8]) -> String {
        let mut out = Vec::new();
        style.render(data, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_filtered_rendering() {
        assert_eq!(render(TextStyle::Filtered, b"ab c~"), "ab c~");
        assert_eq!(render(TextStyle::Filtered, b"a\nb\x00\x7f\xff"), "a.b...");
        assert_eq!(render(TextStyle::Filtered, b"C:\\dir"), "C:\\dir");
    }

    #[test]
    fn test_quoted_rendering() {
        assert_eq!(render(TextStyle::Quoted, b"plain text"), "plain text");
        assert_eq!(render(TextStyle::Quoted, b"a\nb"), "a\\012b");
        assert_eq!(render(TextStyle::Quoted, b"\x00\xff"), "\\000\\377");
        assert_eq!(render(TextStyle::Quoted, b"C:\\dir"), "C:\\134dir");
        assert_eq!(render(TextStyle::Quoted, b"\x7f"), "\\177");
    }

    #[test]
    fn test_quoted_patch_layout() {
        let mut out = Vec::new();
        let labels = Labels {
            old: "a.bin",
            new: "b.bin",
        };
        let mut format = TextFormat::new(&mut out, TextStyle::Quoted, labels);
        format.write_header(&PatchHeader::new(100, 12)).unwrap();
        let copied = b"hello\tworld";
        let span = CopySpan {
            source_offset: 40,
            dest_offset: 0,
            length: copied.len(),
            fingerprint: checksum(copied),
        };
        format.write_copy(&span, copied).unwrap();
        format.write_insert(b"!").unwrap();
        format.finish().unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "% --- a.bin (100 bytes)\n\
             % +++ b.bin (12 bytes)\n\
             @ -[40] => +[0] 11 bytes\n \
             hello\\011world\n\
             +!\n"
        );
    }

    #[test]
    fn test_filtered_insert_line() {
        let mut out = Vec::new();
        let mut format = TextFormat::new(&mut out, TextStyle::Filtered, Labels::default());
        format.write_insert(b"x\ty").unwrap();
        assert_eq!(out, b"+x.y\n");
    }
}
