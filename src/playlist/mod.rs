//! M3U playlist rewriting
//!
//! Incoming playlists are scanned line by line. Every entry whose URL the
//! gateway can serve becomes a service, and the entry is re-emitted with a
//! proxied URL pointing back at the gateway. Everything else passes through.
//!
//! ```text
//! #EXTINF:-1 group-title="News",CNN        #EXTINF:-1 group-title="News",CNN
//! rtp://239.1.1.1:5000               =>    http://10.0.0.2:5140/News%2FCNN
//! ```

pub mod attributes;
pub mod buffer;
pub mod classify;
pub mod parser;

pub use attributes::ExtinfEntry;
pub use buffer::{MAX_PLAYLIST_SIZE, TransformedPlaylist};
pub use classify::{MediaScheme, build_service_url, extract_dynamic_params, is_url_recognizable};
pub use parser::{ParseSummary, PlaylistRewriter};

/// Longest input line kept; the rest of an overlong line is discarded
pub const MAX_LINE_LENGTH: usize = 4095;

/// Longest service name, including any group prefix
pub const MAX_SERVICE_NAME_LENGTH: usize = 255;

/// Longest attribute URL or generated proxy URL
pub const MAX_URL_LENGTH: usize = 2047;

/// ASCII whitespace as the playlist format understands it (includes vertical tab)
pub(crate) fn is_c_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

/// Cut `s` to at most `max` bytes without splitting a UTF-8 sequence
pub(crate) fn truncate_to_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        assert_eq!(truncate_to_char_boundary("abcdef", 3), "abc");
        assert_eq!(truncate_to_char_boundary("ab", 3), "ab");
        // '综' is three bytes
        assert_eq!(truncate_to_char_boundary("a综合", 2), "a");
        assert_eq!(truncate_to_char_boundary("a综合", 4), "a综");
    }
}
