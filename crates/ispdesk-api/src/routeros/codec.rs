// ── RouterOS sentence framing ──
//
// The API speaks in sentences: a run of length-prefixed words closed
// by a zero-length word. Lengths use a variable 1-5 byte prefix whose
// leading bits announce how many bytes follow.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

/// Upper bound on a buffered sentence. Guards against a peer that never
/// sends the terminating empty word.
const MAX_SENTENCE_BYTES: usize = 16 * 1024 * 1024;

/// One API sentence: a command or reply word followed by attribute words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<String>,
}

impl Sentence {
    /// Start a command sentence such as `/system/identity/print`.
    pub fn command(path: impl Into<String>) -> Self {
        Self {
            words: vec![path.into()],
        }
    }

    /// Append an `=key=value` attribute word.
    pub fn attr(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.words.push(format!("={key}={}", value.as_ref()));
        self
    }

    /// Append a `?key=value` query word (used with `print`).
    pub fn query(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.words.push(format!("?{key}={}", value.as_ref()));
        self
    }

    /// Append a raw word verbatim.
    pub fn word(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    pub fn from_words(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }

    /// The leading word (command path or reply type).
    pub fn head(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }
}

// ── Length prefix ───────────────────────────────────────────────────

/// Write the variable-length prefix for a word of `len` bytes.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub(crate) fn put_length(dst: &mut BytesMut, len: usize) {
    let len = len as u32;
    if len < 0x80 {
        dst.put_u8(len as u8);
    } else if len < 0x4000 {
        dst.put_u16(len as u16 | 0x8000);
    } else if len < 0x20_0000 {
        let v = len | 0xC0_0000;
        dst.put_u8((v >> 16) as u8);
        dst.put_u16(v as u16);
    } else if len < 0x1000_0000 {
        dst.put_u32(len | 0xE000_0000);
    } else {
        dst.put_u8(0xF0);
        dst.put_u32(len);
    }
}

/// Read a length prefix from `buf` without consuming it.
///
/// Returns `(prefix_bytes, word_len)`, or `None` if more input is needed.
pub(crate) fn peek_length(buf: &[u8]) -> Result<Option<(usize, usize)>, Error> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };

    let (prefix, mut len) = if first & 0x80 == 0x00 {
        (1, u32::from(first))
    } else if first & 0xC0 == 0x80 {
        (2, u32::from(first & 0x3F))
    } else if first & 0xE0 == 0xC0 {
        (3, u32::from(first & 0x1F))
    } else if first & 0xF0 == 0xE0 {
        (4, u32::from(first & 0x0F))
    } else if first == 0xF0 {
        (5, 0)
    } else {
        return Err(Error::Protocol(format!(
            "reserved control byte 0x{first:02X} in length prefix"
        )));
    };

    if buf.len() < prefix {
        return Ok(None);
    }
    for byte in &buf[1..prefix] {
        len = (len << 8) | u32::from(*byte);
    }

    let len = usize::try_from(len)
        .map_err(|_| Error::Protocol(format!("word length {len} exceeds address space")))?;
    Ok(Some((prefix, len)))
}

// ── Codec ───────────────────────────────────────────────────────────

/// `tokio_util` codec turning a byte stream into [`Sentence`]s and back.
#[derive(Debug, Default, Clone, Copy)]
pub struct SentenceCodec;

impl Decoder for SentenceCodec {
    type Item = Sentence;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Sentence>, Error> {
        // Walk the buffer without consuming until a full sentence is present.
        let mut cursor = 0usize;
        let mut spans = Vec::new();

        loop {
            let Some((prefix, len)) = peek_length(&src[cursor..])? else {
                return Self::need_more(src);
            };
            let start = cursor + prefix;
            let end = start + len;
            if src.len() < end {
                return Self::need_more(src);
            }
            cursor = end;
            if len == 0 {
                break;
            }
            spans.push((start, end));
        }

        let words = spans
            .iter()
            .map(|&(start, end)| String::from_utf8_lossy(&src[start..end]).into_owned())
            .collect();
        src.advance(cursor);

        Ok(Some(Sentence { words }))
    }
}

impl SentenceCodec {
    fn need_more(src: &BytesMut) -> Result<Option<Sentence>, Error> {
        if src.len() > MAX_SENTENCE_BYTES {
            return Err(Error::Protocol(format!(
                "sentence exceeds {MAX_SENTENCE_BYTES} bytes without terminator"
            )));
        }
        Ok(None)
    }
}

impl Encoder<Sentence> for SentenceCodec {
    type Error = Error;

    fn encode(&mut self, item: Sentence, dst: &mut BytesMut) -> Result<(), Error> {
        for word in item.words.iter().filter(|w| !w.is_empty()) {
            put_length(dst, word.len());
            dst.put_slice(word.as_bytes());
        }
        put_length(dst, 0);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prefix_of(len: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_length(&mut buf, len);
        buf.to_vec()
    }

    #[test]
    fn length_prefix_boundaries() {
        assert_eq!(prefix_of(0x7F), vec![0x7F]);
        assert_eq!(prefix_of(0x80), vec![0x80, 0x80]);
        assert_eq!(prefix_of(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(prefix_of(0x4000), vec![0xC0, 0x40, 0x00]);
        assert_eq!(prefix_of(0x20_0000), vec![0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(prefix_of(0x1000_0000), vec![0xF0, 0x10, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn peek_reads_back_each_prefix_width() {
        for len in [0, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, 0x1000_0000] {
            let encoded = prefix_of(len);
            let (prefix, decoded) = peek_length(&encoded).unwrap().unwrap();
            assert_eq!(prefix, encoded.len());
            assert_eq!(decoded, len);
        }
    }

    #[test]
    fn reserved_control_byte_is_rejected() {
        assert!(matches!(peek_length(&[0xF8]), Err(Error::Protocol(_))));
    }

    #[test]
    fn decode_waits_for_terminator() {
        let mut codec = SentenceCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(Sentence::command("!done").attr("ret", "abc"), &mut buf)
            .unwrap();

        let full = buf.split();
        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full[full.len() - 1..]);
        let sentence = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(
            sentence.into_words(),
            vec!["!done".to_owned(), "=ret=abc".to_owned()]
        );
        assert!(partial.is_empty());
    }

    #[test]
    fn decode_leaves_following_sentence_buffered() {
        let mut codec = SentenceCodec;
        let mut buf = BytesMut::new();
        codec.encode(Sentence::command("!re").attr("name", "a"), &mut buf).unwrap();
        codec.encode(Sentence::command("!done"), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.head(), Some("!re"));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.head(), Some("!done"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn long_words_use_wide_prefix() {
        let mut codec = SentenceCodec;
        let mut buf = BytesMut::new();
        let comment = "x".repeat(300);
        codec
            .encode(Sentence::command("/ip/firewall/filter/set").attr("comment", &comment), &mut buf)
            .unwrap();
        let sentence = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(sentence.words()[1], format!("=comment={comment}"));
    }
}
