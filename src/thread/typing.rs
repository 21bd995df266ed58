//! Typing-indicator lifecycle.
//!
//! Focusing or typing into the composer turns the indicator on; blurring,
//! sending, or [`TYPING_IDLE_MS`] of inactivity turns it off. The idle window
//! is enforced by a local timer, not by server push. Emissions are
//! best-effort sends, never queued or retried.

/// Idle window after the last keystroke before typing auto-clears.
pub const TYPING_IDLE_MS: u32 = 3_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypingEvent {
    Focus,
    Keystroke,
    Blur,
    MessageSent,
    IdleExpired,
}

/// Small state machine deciding which typing signal (if any) to send for a
/// composer event. The caller owns the idle timer and feeds `IdleExpired`.
#[derive(Debug, Default)]
pub struct TypingState {
    is_typing: bool,
}

impl TypingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// Returns `Some(flag)` when a `typing` frame should go out, `None` when
    /// the event changes nothing.
    pub fn on_event(&mut self, event: TypingEvent) -> Option<bool> {
        match event {
            TypingEvent::Focus | TypingEvent::Keystroke => {
                if self.is_typing {
                    None
                } else {
                    self.is_typing = true;
                    Some(true)
                }
            }
            TypingEvent::Blur | TypingEvent::MessageSent | TypingEvent::IdleExpired => {
                if self.is_typing {
                    self.is_typing = false;
                    Some(false)
                } else {
                    None
                }
            }
        }
    }

    /// Whether this event should (re)arm the idle timer.
    pub fn arms_idle_timer(event: TypingEvent) -> bool {
        matches!(event, TypingEvent::Focus | TypingEvent::Keystroke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_auto_clears_on_idle_expiry() {
        let mut state = TypingState::new();
        assert_eq!(state.on_event(TypingEvent::Keystroke), Some(true));
        // No further keystrokes; the idle timer fires after 3s.
        assert_eq!(state.on_event(TypingEvent::IdleExpired), Some(false));
        assert!(!state.is_typing());
    }

    #[test]
    fn repeated_keystrokes_emit_once_per_burst() {
        let mut state = TypingState::new();
        assert_eq!(state.on_event(TypingEvent::Focus), Some(true));
        assert_eq!(state.on_event(TypingEvent::Keystroke), None);
        assert_eq!(state.on_event(TypingEvent::Keystroke), None);
        assert_eq!(state.on_event(TypingEvent::Blur), Some(false));
        // A new burst emits again.
        assert_eq!(state.on_event(TypingEvent::Keystroke), Some(true));
    }

    #[test]
    fn clearing_when_not_typing_is_silent() {
        let mut state = TypingState::new();
        assert_eq!(state.on_event(TypingEvent::Blur), None);
        assert_eq!(state.on_event(TypingEvent::IdleExpired), None);
        assert_eq!(state.on_event(TypingEvent::MessageSent), None);
    }

    #[test]
    fn sending_a_message_clears_typing() {
        let mut state = TypingState::new();
        state.on_event(TypingEvent::Keystroke);
        assert_eq!(state.on_event(TypingEvent::MessageSent), Some(false));
    }

    #[test]
    fn only_focus_and_keystroke_arm_the_timer() {
        assert!(TypingState::arms_idle_timer(TypingEvent::Focus));
        assert!(TypingState::arms_idle_timer(TypingEvent::Keystroke));
        assert!(!TypingState::arms_idle_timer(TypingEvent::Blur));
        assert!(!TypingState::arms_idle_timer(TypingEvent::IdleExpired));
    }
}
