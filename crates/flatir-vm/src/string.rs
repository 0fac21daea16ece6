//! Ruby strings and their encodings
//!
//! Encodings are looked up by name in a process-wide table that is built
//! once on first use. Lookup is case-insensitive and understands the common
//! aliases (`BINARY`, `ASCII`, `CP65001`, ...).

use std::fmt;
use std::sync::LazyLock;

use flatir_format::CodeRange;
use rustc_hash::FxHashMap;

use crate::error::{VmError, VmResult};

/// How the bytes of an encoding are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Opaque bytes
    Binary,
    /// 7-bit only
    Ascii,
    /// One byte per character, ASCII in the low half
    SingleByte,
    Utf8,
    /// Two-byte units
    Utf16,
    /// ASCII-compatible multibyte encodings we do not validate
    Multibyte,
}

/// A character encoding known to the runtime
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    name: &'static str,
    layout: Layout,
}

const ENCODINGS: &[(Encoding, &[&str])] = &[
    (
        Encoding::new("ASCII-8BIT", Layout::Binary),
        &["BINARY"],
    ),
    (
        Encoding::new("US-ASCII", Layout::Ascii),
        &["ASCII", "ANSI_X3.4-1968", "646"],
    ),
    (Encoding::new("UTF-8", Layout::Utf8), &["CP65001"]),
    (Encoding::new("ISO-8859-1", Layout::SingleByte), &["ISO8859-1"]),
    (
        Encoding::new("Windows-1252", Layout::SingleByte),
        &["CP1252"],
    ),
    (Encoding::new("UTF-16LE", Layout::Utf16), &[]),
    (Encoding::new("UTF-16BE", Layout::Utf16), &["UCS-2BE"]),
    (
        Encoding::new("Shift_JIS", Layout::Multibyte),
        &["SJIS"],
    ),
    (Encoding::new("EUC-JP", Layout::Multibyte), &["eucJP"]),
];

/// Name (upper-cased) → encoding, aliases included
static ENCODING_INDEX: LazyLock<FxHashMap<String, Encoding>> = LazyLock::new(|| {
    let mut index = FxHashMap::default();
    for (encoding, aliases) in ENCODINGS {
        index.insert(encoding.name.to_ascii_uppercase(), *encoding);
        for alias in *aliases {
            index.insert(alias.to_ascii_uppercase(), *encoding);
        }
    }
    index
});

impl Encoding {
    const fn new(name: &'static str, layout: Layout) -> Self {
        Self { name, layout }
    }

    /// `ASCII-8BIT`
    pub const BINARY: Self = Self::new("ASCII-8BIT", Layout::Binary);
    /// `US-ASCII`
    pub const US_ASCII: Self = Self::new("US-ASCII", Layout::Ascii);
    /// `UTF-8`
    pub const UTF_8: Self = Self::new("UTF-8", Layout::Utf8);

    /// Look up an encoding by name or alias
    pub fn find(name: &str) -> VmResult<Self> {
        ENCODING_INDEX
            .get(&name.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| VmError::UnknownEncoding(name.to_string()))
    }

    /// Canonical name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether ASCII bytes mean ASCII characters in this encoding
    pub fn is_ascii_compatible(&self) -> bool {
        self.layout != Layout::Utf16
    }

    /// Classify `bytes` in this encoding
    pub fn scan(&self, bytes: &[u8]) -> CodeRange {
        if self.is_ascii_compatible() && bytes.is_ascii() {
            return CodeRange::SevenBit;
        }
        match self.layout {
            Layout::Utf8 => CodeRange::of_utf8(bytes),
            Layout::Ascii => CodeRange::Broken,
            Layout::Utf16 if bytes.len() % 2 != 0 => CodeRange::Broken,
            Layout::Binary | Layout::SingleByte | Layout::Utf16 | Layout::Multibyte => {
                CodeRange::Valid
            }
        }
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<Encoding:{}>", self.name)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A Ruby string: bytes tagged with an encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubyString {
    bytes: Vec<u8>,
    encoding: Encoding,
    coderange: CodeRange,
    frozen: bool,
}

impl RubyString {
    /// Create a mutable string, scanning its code range
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: Encoding) -> Self {
        let bytes = bytes.into();
        Self {
            coderange: encoding.scan(&bytes),
            bytes,
            encoding,
            frozen: false,
        }
    }

    /// Create a frozen string from a stored literal
    ///
    /// An `Unknown` code range is computed here; any other is trusted.
    pub fn literal(bytes: &[u8], encoding: Encoding, coderange: CodeRange) -> Self {
        let coderange = match coderange {
            CodeRange::Unknown => encoding.scan(bytes),
            known => known,
        };
        Self {
            bytes: bytes.to_vec(),
            encoding,
            coderange,
            frozen: true,
        }
    }

    /// Create a mutable UTF-8 string
    pub fn utf8(s: &str) -> Self {
        Self::new(s.as_bytes(), Encoding::UTF_8)
    }

    /// Raw bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoding
    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Code range
    #[inline]
    pub fn coderange(&self) -> CodeRange {
        self.coderange
    }

    /// Check if frozen
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze in place
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The text if the bytes are valid UTF-8
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    fn is_ascii_only(&self) -> bool {
        self.coderange == CodeRange::SevenBit && self.encoding.is_ascii_compatible()
    }

    /// Encoding the concatenation of `self` and `other` would carry
    pub fn compatible_encoding(&self, other: &RubyString) -> VmResult<Encoding> {
        if self.encoding == other.encoding {
            return Ok(self.encoding);
        }
        if other.is_empty() || other.is_ascii_only() {
            return Ok(self.encoding);
        }
        if self.is_empty() || self.is_ascii_only() {
            return Ok(other.encoding);
        }
        Err(VmError::EncodingCompatibility(
            self.encoding.name(),
            other.encoding.name(),
        ))
    }

    /// `String#==`: same bytes in comparable encodings
    pub fn ruby_eq(&self, other: &RubyString) -> bool {
        self.bytes == other.bytes
            && (self.encoding == other.encoding || (self.is_ascii_only() && other.is_ascii_only()))
    }

    /// `String#+`: a new, unfrozen string
    pub fn concat(&self, other: &RubyString) -> VmResult<RubyString> {
        let encoding = self.compatible_encoding(other)?;
        let mut bytes = Vec::with_capacity(self.len() + other.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(&other.bytes);
        Ok(RubyString::new(bytes, encoding))
    }

    /// `String#<<`: append in place
    pub fn append(&mut self, other: &RubyString) -> VmResult<()> {
        if self.frozen {
            return Err(VmError::Frozen(format!("String: {}", self.inspect())));
        }
        let encoding = self.compatible_encoding(other)?;
        self.bytes.extend_from_slice(&other.bytes);
        self.encoding = encoding;
        self.coderange = encoding.scan(&self.bytes);
        Ok(())
    }

    /// Ruby `inspect` rendering, e.g. `"a\nb"`
    pub fn inspect(&self) -> String {
        let mut out = String::with_capacity(self.len() + 2);
        out.push('"');
        match self.to_str() {
            Some(text) if self.encoding != Encoding::BINARY || text.is_ascii() => {
                for c in text.chars() {
                    push_escaped(&mut out, c);
                }
            }
            _ => {
                for &b in &self.bytes {
                    if b.is_ascii() {
                        push_escaped(&mut out, b as char);
                    } else {
                        out.push_str(&format!("\\x{b:02X}"));
                    }
                }
            }
        }
        out.push('"');
        out
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\u{1b}' => out.push_str("\\e"),
        c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
        c => out.push(c),
    }
}

impl fmt::Display for RubyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
