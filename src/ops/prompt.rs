use anyhow::Result;
use dialoguer::Confirm;
use dialoguer::Input;
use dialoguer::Password;
use dialoguer::Select;
#[cfg(test)]
use mockall::automock;

/// Answer to "nothing changed after refreshing submodules".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmoduleChoice {
    Retry,
    Skip,
}

// -----------------------------------------------------------------------------
// PromptOps trait

/// Questions put to the operator running the release
#[cfg_attr(test, automock)]
pub trait PromptOps {
    /// Ask a yes/no question
    fn confirm(&self, prompt: &str) -> Result<bool>;

    fn retry_or_skip(&self, prompt: &str) -> Result<SubmoduleChoice>;

    /// Block until the operator presses Enter
    fn pause(&self, prompt: &str) -> Result<()>;

    /// Read a secret without echoing it
    fn secret(&self, prompt: &str) -> Result<String>;
}

// -----------------------------------------------------------------------------
// RealPrompt

/// Real implementation that asks on the terminal
pub struct RealPrompt;

impl PromptOps for RealPrompt {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?)
    }

    fn retry_or_skip(&self, prompt: &str) -> Result<SubmoduleChoice> {
        let selection = Select::new()
            .with_prompt(prompt)
            .items(&["Retry updating the submodules", "Skip this repository"])
            .default(0)
            .interact()?;
        Ok(if selection == 0 {
            SubmoduleChoice::Retry
        } else {
            SubmoduleChoice::Skip
        })
    }

    fn pause(&self, prompt: &str) -> Result<()> {
        let _: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(())
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }
}
