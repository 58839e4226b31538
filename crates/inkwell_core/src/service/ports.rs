//! UI-facing ports used by the chapter workflow.
//!
//! The shell decides how prompts and notices are rendered; the workflow only
//! needs a yes/no answer and somewhere to put messages.

/// Irreversible action awaiting user confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

impl ConfirmPrompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Asks the user to confirm an irreversible action.
pub trait Confirm {
    /// Returns `true` only on explicit consent.
    fn confirm(&mut self, prompt: &ConfirmPrompt) -> bool;
}

/// Renders user-visible outcome messages.
pub trait Notify {
    fn success(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// Confirms every prompt; used for non-interactive runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _prompt: &ConfirmPrompt) -> bool {
        true
    }
}

impl<T: Confirm + ?Sized> Confirm for &mut T {
    fn confirm(&mut self, prompt: &ConfirmPrompt) -> bool {
        (**self).confirm(prompt)
    }
}

impl<T: Notify + ?Sized> Notify for &mut T {
    fn success(&mut self, message: &str) {
        (**self).success(message);
    }

    fn warning(&mut self, message: &str) {
        (**self).warning(message);
    }

    fn error(&mut self, message: &str) {
        (**self).error(message);
    }
}
