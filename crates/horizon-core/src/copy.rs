//! "Copied" feedback state
//!
//! At most one item is marked as copied at a time. A mark expires after
//! [`COPY_FLASH`]; a newer mark replaces the old one immediately. Each mark
//! carries a [`CopyToken`] so a delayed clear scheduled for an old mark can
//! never wipe out a newer one.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::clipboard::ClipboardWriter;

/// How long a copy mark stays visible.
pub const COPY_FLASH: Duration = Duration::from_millis(2000);

/// What was copied: a whole message, or one code block inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyId {
    Message(usize),
    /// `block` counts code blocks only, in reply order.
    CodeBlock { message: usize, block: usize },
}

/// Identifies one `mark_copied` call. Later calls get larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CopyToken(u64);

#[derive(Debug, Clone, Copy)]
struct CopyMark {
    id: CopyId,
    expires_at: Instant,
    token: CopyToken,
}

#[derive(Debug)]
pub struct CopyTracker {
    mark: Option<CopyMark>,
    next_token: u64,
    flash: Duration,
}

impl Default for CopyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyTracker {
    pub fn new() -> Self {
        Self::with_flash(COPY_FLASH)
    }

    pub fn with_flash(flash: Duration) -> Self {
        Self {
            mark: None,
            next_token: 0,
            flash,
        }
    }

    pub fn flash(&self) -> Duration {
        self.flash
    }

    pub fn mark_copied(&mut self, id: CopyId) -> CopyToken {
        self.mark_copied_at(id, Instant::now())
    }

    pub fn mark_copied_at(&mut self, id: CopyId, now: Instant) -> CopyToken {
        self.next_token += 1;
        let token = CopyToken(self.next_token);
        self.mark = Some(CopyMark {
            id,
            expires_at: now + self.flash,
            token,
        });
        token
    }

    pub fn is_copied(&self, id: CopyId) -> bool {
        self.is_copied_at(id, Instant::now())
    }

    pub fn is_copied_at(&self, id: CopyId, now: Instant) -> bool {
        self.mark
            .is_some_and(|mark| mark.id == id && now < mark.expires_at)
    }

    /// The marked item, ignoring expiry.
    pub fn current(&self) -> Option<CopyId> {
        self.mark.map(|mark| mark.id)
    }

    /// Clear the mark if `token` still identifies it. Returns whether it did.
    pub fn expire(&mut self, token: CopyToken) -> bool {
        match self.mark {
            Some(mark) if mark.token == token => {
                self.mark = None;
                true
            }
            _ => false,
        }
    }

    /// Drop a mark whose time is up. Returns whether anything was cleared.
    pub fn sweep_at(&mut self, now: Instant) -> bool {
        match self.mark {
            Some(mark) if now >= mark.expires_at => {
                self.mark = None;
                true
            }
            _ => false,
        }
    }

    pub fn sweep(&mut self) -> bool {
        self.sweep_at(Instant::now())
    }

    /// Write `text` to the clipboard and mark `id` on success. On failure the
    /// current mark is left alone and `None` is returned.
    pub fn copy(
        &mut self,
        clipboard: &mut dyn ClipboardWriter,
        id: CopyId,
        text: &str,
    ) -> Option<CopyToken> {
        match clipboard.write_text(text) {
            Ok(()) => {
                debug!(?id, chars = text.chars().count(), "copied to clipboard");
                Some(self.mark_copied(id))
            }
            Err(e) => {
                warn!(?id, error = %e, "copy failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardError;

    #[derive(Default)]
    struct Recorder {
        written: Vec<String>,
        deny: bool,
    }

    impl ClipboardWriter for Recorder {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.deny {
                return Err(ClipboardError::WriteFailed("denied".to_string()));
            }
            self.written.push(text.to_string());
            Ok(())
        }
    }

    const MSG: CopyId = CopyId::Message(2);
    const CODE: CopyId = CopyId::CodeBlock { message: 2, block: 0 };

    #[test]
    fn test_mark_is_visible_until_flash_ends() {
        let mut tracker = CopyTracker::new();
        let start = Instant::now();
        tracker.mark_copied_at(MSG, start);

        assert!(tracker.is_copied_at(MSG, start));
        assert!(tracker.is_copied_at(MSG, start + Duration::from_millis(1999)));
        assert!(!tracker.is_copied_at(MSG, start + COPY_FLASH));
        assert!(!tracker.is_copied_at(CODE, start));
    }

    #[test]
    fn test_new_mark_replaces_old() {
        let mut tracker = CopyTracker::new();
        let start = Instant::now();
        tracker.mark_copied_at(MSG, start);
        tracker.mark_copied_at(CODE, start + Duration::from_millis(500));

        let now = start + Duration::from_millis(600);
        assert!(!tracker.is_copied_at(MSG, now));
        assert!(tracker.is_copied_at(CODE, now));
        // The new mark runs its own full flash
        assert!(tracker.is_copied_at(CODE, start + Duration::from_millis(2400)));
    }

    #[test]
    fn test_stale_expire_keeps_newer_mark() {
        let mut tracker = CopyTracker::new();
        let old = tracker.mark_copied(MSG);
        let new = tracker.mark_copied(CODE);
        assert!(new > old);

        assert!(!tracker.expire(old));
        assert_eq!(tracker.current(), Some(CODE));

        assert!(tracker.expire(new));
        assert_eq!(tracker.current(), None);
        assert!(!tracker.is_copied(CODE));
    }

    #[test]
    fn test_sweep_clears_only_expired() {
        let mut tracker = CopyTracker::new();
        let start = Instant::now();
        tracker.mark_copied_at(MSG, start);

        assert!(!tracker.sweep_at(start + Duration::from_millis(100)));
        assert_eq!(tracker.current(), Some(MSG));
        assert!(tracker.sweep_at(start + COPY_FLASH));
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn test_copy_marks_after_write() {
        let mut tracker = CopyTracker::new();
        let mut clipboard = Recorder::default();

        let token = tracker.copy(&mut clipboard, CODE, "fn main() {}\n");
        assert!(token.is_some());
        assert_eq!(clipboard.written, vec!["fn main() {}\n".to_string()]);
        assert!(tracker.is_copied(CODE));
    }

    #[test]
    fn test_failed_copy_leaves_mark_alone() {
        let mut tracker = CopyTracker::new();
        let mut clipboard = Recorder::default();
        tracker.copy(&mut clipboard, MSG, "hello");

        clipboard.deny = true;
        assert!(tracker.copy(&mut clipboard, CODE, "code").is_none());
        assert!(tracker.is_copied(MSG));
        assert!(!tracker.is_copied(CODE));
    }

    #[test]
    fn test_failed_copy_with_no_mark() {
        let mut tracker = CopyTracker::new();
        let mut clipboard = Recorder { deny: true, ..Recorder::default() };
        assert!(tracker.copy(&mut clipboard, MSG, "hello").is_none());
        assert_eq!(tracker.current(), None);
    }
}
