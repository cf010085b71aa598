//! Tallybook CSV codec
//!
//! Converts between CSV text and ordered column → value [`Record`]s.
//!
//! # Dialect
//!
//! The dialect is fixed:
//! - `,` delimiter, `\n` row separator, no trailing newline on encode
//! - the first line is always the header
//! - values containing `,` or `"` are wrapped in `"` with inner quotes doubled
//! - fields are trimmed of surrounding whitespace on decode
//! - no embedded newlines inside fields
//!
//! Two decoders are available through [`QuoteMode`]. `Rfc4180` (the default)
//! understands `""` inside a quoted field and therefore round-trips everything
//! the encoder produces. `LegacyToggle` reproduces older documents' reader,
//! which only flips an in-quotes flag and drops every `"` it sees.

mod decode;
mod encode;
mod record;

pub use decode::{decode, decode_line, decode_line_with, decode_with, QuoteMode};
pub use encode::{encode, escape_field};
pub use record::Record;
