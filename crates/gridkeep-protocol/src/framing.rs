//! Terminator bytes shared by every stream channel.
//!
//! A sender appends [`PRIMARY`] to every JSON document it writes. A
//! receiver is expected to accept either [`PRIMARY`] or [`ALTERNATE`] as a
//! message boundary (nothing in this codebase ever emits [`ALTERNATE`],
//! but replaying an old log or talking to a foreign client that does must
//! still work).

/// The terminator every gridkeep sender appends after a JSON document.
pub const PRIMARY: &str = "END_OF_MESSAGE";

/// A second terminator accepted (but never emitted) for compatibility.
pub const ALTERNATE: &str = "ALT_TERMINATION";

/// All terminators a receiver should recognize, primary first.
pub const ALL: [&str; 2] = [PRIMARY, ALTERNATE];

/// Returns the terminator-stripped prefix of `buf` if it ends with any
/// recognized terminator, else `None`.
pub fn strip_terminator(buf: &[u8]) -> Option<&[u8]> {
    for term in ALL {
        let term = term.as_bytes();
        if buf.len() >= term.len() && &buf[buf.len() - term.len()..] == term {
            return Some(&buf[..buf.len() - term.len()]);
        }
    }
    None
}
