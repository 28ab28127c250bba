//! Decodes the raw bytes of `tiny-text`/`text` fields under the
//! archive's declared encoding (`Header::encoding`).
//!
//! The declared encoding is almost always `UTF-8` in practice, but the
//! format reads it rather than assuming it, so a handful of other
//! `Encoding`-recognized labels are honored too.

use encoding_rs::Encoding;

use crate::error::SlobError;

/// A resolved text codec, bound once per archive at header-parse time.
#[derive(Clone)]
pub(crate) struct TextCodec {
    encoding: &'static Encoding,
}

impl TextCodec {
    /// Resolves `label` (e.g. `"UTF-8"`, `"ISO-8859-1"`) to a codec.
    ///
    /// Unrecognized labels fall back to UTF-8, since the encoding is
    /// almost always UTF-8 in practice anyway.
    pub(crate) fn for_label(label: &str) -> Self {
        let encoding = Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::UTF_8);
        Self { encoding }
    }

    /// Decodes `raw` under this codec. Malformed sequences are reported
    /// rather than replaced, since a silently-substituted key would
    /// corrupt the collation order the ref-list relies on.
    pub(crate) fn decode(&self, raw: &[u8]) -> Result<String, SlobError> {
        let (decoded, _, had_errors) = self.encoding.decode(raw);
        if had_errors {
            return Err(SlobError::Encoding(format!(
                "invalid {} sequence",
                self.encoding.name()
            )));
        }
        Ok(decoded.into_owned())
    }
}
