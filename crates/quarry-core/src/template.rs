//! Expansion of string-valued parameter defaults.
//!
//! A default such as `client_env(HOME)` or `client_shell(hostname)` is a
//! template that the client resolves before sending parameters to the
//! server. The server-side forms `env(..)` and `shell(..)` are resolved by
//! the server and pass through the client untouched.
//!
//! A template only has to start with the form: the argument runs up to the
//! last closing parenthesis and anything after it is ignored.

use std::process::Command;

/// Controls which template forms are expanded.
///
/// When a form is disabled its text is kept literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Allow environment variable lookups.
    pub getenv: bool,
    /// Allow running shell commands.
    pub getshell: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self::client(true, true)
    }
}

impl TemplateOptions {
    /// Client-side expansion with the given toggles.
    #[must_use]
    pub const fn client(getenv: bool, getshell: bool) -> Self {
        Self { getenv, getshell }
    }

    /// Expands `template` using the process environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_core::TemplateOptions;
    ///
    /// let opts = TemplateOptions::client(false, false);
    /// assert_eq!(opts.expand("client_env(HOME)"), "client_env(HOME)");
    /// assert_eq!(opts.expand("plain"), "plain");
    /// ```
    #[must_use]
    pub fn expand(&self, template: &str) -> String {
        self.expand_with(template, |key| std::env::var(key).ok())
    }

    /// Expands `template`, resolving variables through `lookup`.
    ///
    /// Missing variables and failing commands expand to an empty string.
    pub fn expand_with<F>(&self, template: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.getenv {
            if let Some(key) = call_argument(template, "client_env") {
                return lookup(key).unwrap_or_default();
            }
        }
        if self.getshell {
            if let Some(command) = call_argument(template, "client_shell") {
                return run_shell(command);
            }
        }
        template.to_string()
    }
}

/// Returns the argument of `name(arg)` if `text` starts with that shape.
fn call_argument<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(name)?.strip_prefix('(')?;
    rest.rfind(')').map(|end| &rest[..end])
}

fn run_shell(command: &str) -> String {
    let argv = match shell_words::split(command) {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) => return String::new(),
        Err(e) => {
            tracing::warn!(command, error = %e, "Unparseable shell default");
            return String::new();
        }
    };

    match Command::new(&argv[0]).args(&argv[1..]).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string(),
        Ok(output) => {
            tracing::warn!(command, status = %output.status, "Shell default exited with failure");
            String::new()
        }
        Err(e) => {
            tracing::warn!(command, error = %e, "Shell default could not be run");
            String::new()
        }
    }
}
