//! Accumulation buffer for the transformed playlist
//!
//! One buffer collects the output of every parse pass until a configuration
//! reload clears it. Content from inline sources always sits in front of the
//! `inline_end` marker, so an external refresh can drop everything after it.

use tracing::error;

use crate::errors::PlaylistError;

/// Capacity allocated on first write
pub const INITIAL_CAPACITY: usize = 4096;

/// Hard upper bound on the buffer capacity (10 MiB)
pub const MAX_PLAYLIST_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct TransformedPlaylist {
    content: Option<String>,
    capacity: usize,
    inline_end: usize,
    header_emitted: bool,
}

impl TransformedPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, doubling the capacity as needed, never past [`MAX_PLAYLIST_SIZE`]
    ///
    /// On failure nothing is appended and earlier content is left intact.
    pub fn append(&mut self, text: &str) -> Result<(), PlaylistError> {
        let content = self.content.get_or_insert_with(|| {
            self.capacity = INITIAL_CAPACITY;
            String::with_capacity(INITIAL_CAPACITY)
        });

        // content is capped one byte below the capacity limit
        let required = content.len() + text.len() + 1;
        if required > MAX_PLAYLIST_SIZE {
            error!("Transformed playlist too large ({} bytes needed)", required);
            return Err(PlaylistError::CapacityExceeded {
                requested: required,
                limit: MAX_PLAYLIST_SIZE,
            });
        }
        while required > self.capacity {
            self.capacity = (self.capacity * 2).min(MAX_PLAYLIST_SIZE);
        }

        content.reserve(self.capacity.saturating_sub(content.len()));
        content.push_str(text);
        Ok(())
    }

    /// Append a line followed by '\n'
    pub fn append_line(&mut self, line: &str) -> Result<(), PlaylistError> {
        self.append(line)?;
        self.append("\n")
    }

    /// Current playlist text, or `None` when nothing has been written
    pub fn get_current(&self) -> Option<&str> {
        self.content.as_deref().filter(|content| !content.is_empty())
    }

    /// Number of bytes written
    pub fn len(&self) -> usize {
        self.content.as_ref().map_or(0, String::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical capacity; 0 until the first write
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn inline_end(&self) -> usize {
        self.inline_end
    }

    pub fn header_emitted(&self) -> bool {
        self.header_emitted
    }

    pub(crate) fn set_header_emitted(&mut self) {
        self.header_emitted = true;
    }

    /// Record the current length as the end of inline content
    pub(crate) fn mark_inline_end(&mut self) {
        self.inline_end = self.len();
    }

    /// Drop all content and markers (configuration reload)
    pub fn reset_all(&mut self) {
        self.content = None;
        self.capacity = 0;
        self.inline_end = 0;
        self.header_emitted = false;
    }

    /// Drop content written after the last inline pass (external refresh)
    ///
    /// Without any inline content the header is forgotten too, so the next
    /// external pass writes its own.
    pub fn reset_external(&mut self) {
        let inline_end = self.inline_end;
        if let Some(content) = self.content.as_mut() {
            if inline_end < content.len() {
                content.truncate(inline_end);
            }
        }

        if self.inline_end == 0 {
            self.header_emitted = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_allocation_and_growth() {
        let mut buffer = TransformedPlaylist::new();
        assert_eq!(buffer.capacity(), 0);
        assert_eq!(buffer.get_current(), None);

        buffer.append("#EXTM3U\n").unwrap();
        assert_eq!(buffer.capacity(), INITIAL_CAPACITY);
        assert_eq!(buffer.get_current(), Some("#EXTM3U\n"));

        buffer.append(&"x".repeat(INITIAL_CAPACITY)).unwrap();
        assert_eq!(buffer.capacity(), INITIAL_CAPACITY * 2);
        assert_eq!(buffer.len(), 8 + INITIAL_CAPACITY);
    }

    #[test]
    fn test_capacity_cap() {
        let mut buffer = TransformedPlaylist::new();
        let chunk = "y".repeat(1024 * 1024);
        for _ in 0..9 {
            buffer.append(&chunk).unwrap();
        }
        let before = buffer.len();

        // the tenth MiB would leave no room below the cap
        let err = buffer.append(&chunk).unwrap_err();
        assert!(matches!(err, PlaylistError::CapacityExceeded { limit, .. } if limit == MAX_PLAYLIST_SIZE));
        assert_eq!(buffer.len(), before);

        buffer.append(&"z".repeat(1024 * 1024 - 1)).unwrap();
        assert_eq!(buffer.len(), MAX_PLAYLIST_SIZE - 1);
        assert!(buffer.append("!").is_err());
    }

    #[test]
    fn test_reset_external_truncates_to_inline_end() {
        let mut buffer = TransformedPlaylist::new();
        buffer.append_line("#EXTM3U").unwrap();
        buffer.set_header_emitted();
        buffer.append_line("inline").unwrap();
        buffer.mark_inline_end();
        let inline_end = buffer.inline_end();

        buffer.append_line("external").unwrap();
        buffer.reset_external();

        assert_eq!(buffer.len(), inline_end);
        assert_eq!(buffer.get_current(), Some("#EXTM3U\ninline\n"));
        assert!(buffer.header_emitted());
    }

    #[test]
    fn test_reset_external_without_inline_clears_header() {
        let mut buffer = TransformedPlaylist::new();
        buffer.append_line("#EXTM3U").unwrap();
        buffer.set_header_emitted();
        buffer.append_line("external").unwrap();

        buffer.reset_external();
        assert_eq!(buffer.get_current(), None);
        assert!(!buffer.header_emitted());
    }

    #[test]
    fn test_reset_all() {
        let mut buffer = TransformedPlaylist::new();
        buffer.append_line("#EXTM3U").unwrap();
        buffer.set_header_emitted();
        buffer.mark_inline_end();

        buffer.reset_all();
        assert_eq!(buffer.get_current(), None);
        assert_eq!(buffer.inline_end(), 0);
        assert_eq!(buffer.capacity(), 0);
        assert!(!buffer.header_emitted());
    }
}
