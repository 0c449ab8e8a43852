/// Capabilities of the surrounding host that the page scripts used directly.
pub trait Host: Send + Sync {
    /// Asks the user to confirm; `false` aborts the action.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Host for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
