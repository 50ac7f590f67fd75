//! Terminal confirmation prompts

use dialoguer::Confirm;
use farmlink_core::Confirmer;
use tracing::warn;

/// Confirmation gate backed by an interactive terminal prompt.
///
/// A failed prompt (e.g. no TTY) counts as a decline rather than an error,
/// so piped invocations skip gated actions instead of aborting the batch.
pub struct PromptConfirmer;

impl Confirmer for PromptConfirmer {
    fn confirm(&mut self, prompt: &str, default_yes: bool) -> bool {
        match Confirm::new()
            .with_prompt(prompt)
            .default(default_yes)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("prompt failed, declining: {e}");
                false
            }
        }
    }
}
