//! User-facing prompts.
//!
//! Confirmation before a delete and alerts for validation or submission
//! failures are blocking, as the user must acknowledge them. Front ends
//! implement [`UserPrompt`]; the synchronizer only calls it.

/// Blocking confirm/alert surface.
pub trait UserPrompt: Send + Sync {
    /// Asks a yes/no question. Returns true to proceed.
    fn confirm(&self, message: &str) -> bool;

    /// Shows a message the user must acknowledge.
    fn alert(&self, message: &str);
}

/// A scripted prompt for testing.
pub mod mock {
    use super::UserPrompt;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Answers every confirmation with a fixed reply and records alerts.
    #[derive(Debug)]
    pub struct ScriptedPrompt {
        confirm_reply: AtomicBool,
        confirms: AtomicUsize,
        alerts: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        /// A prompt that confirms everything.
        pub fn accepting() -> Self {
            Self::new(true)
        }

        /// A prompt that declines every confirmation.
        pub fn declining() -> Self {
            Self::new(false)
        }

        fn new(reply: bool) -> Self {
            Self {
                confirm_reply: AtomicBool::new(reply),
                confirms: AtomicUsize::new(0),
                alerts: Mutex::new(Vec::new()),
            }
        }

        /// Changes the reply to future confirmations.
        pub fn set_confirm_reply(&self, reply: bool) {
            self.confirm_reply.store(reply, Ordering::SeqCst);
        }

        /// Number of confirmations asked so far.
        pub fn confirm_count(&self) -> usize {
            self.confirms.load(Ordering::SeqCst)
        }

        /// Alerts shown so far, oldest first.
        pub fn alerts(&self) -> Vec<String> {
            self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl UserPrompt for ScriptedPrompt {
        fn confirm(&self, _message: &str) -> bool {
            self.confirms.fetch_add(1, Ordering::SeqCst);
            self.confirm_reply.load(Ordering::SeqCst)
        }

        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap_or_else(|e| e.into_inner()).push(message.to_string());
        }
    }
}
