//! Invocation assembly for the copy and registry export tools.
//!
//! # Design
//! - Arguments keep their raw value for process creation and a rendered,
//!   quoted form for logs and dry-run output.
//! - Exclusion switches are only emitted when their set is non-empty.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use profsync_config::CopySettings;

/// One argument of an external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    /// Switch or token rendered as-is.
    Plain(String),
    /// Path or key rendered inside double quotes.
    Quoted(String),
    /// Pre-assembled command line handed to a shell unmodified.
    Verbatim(String),
}

impl CommandArg {
    /// Raw value passed to the process.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Plain(value) | Self::Quoted(value) | Self::Verbatim(value) => value,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Plain(value) => value.clone(),
            Self::Quoted(value) => quote(value),
            Self::Verbatim(value) => format!("\"{value}\""),
        }
    }
}

/// Program plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<CommandArg>,
}

impl Invocation {
    /// Invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a plain token.
    #[must_use]
    pub fn plain(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg::Plain(value.into()));
        self
    }

    /// Append a value that is always shown quoted.
    #[must_use]
    pub fn quoted(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg::Quoted(value.into()));
        self
    }

    /// Append a pre-assembled command line.
    #[must_use]
    pub fn verbatim(mut self, value: impl Into<String>) -> Self {
        self.args.push(CommandArg::Verbatim(value.into()));
        self
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in order.
    #[must_use]
    pub fn args(&self) -> &[CommandArg] {
        &self.args
    }
}

impl Display for Invocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if self.program.contains(['\\', '/', ' ']) {
            formatter.write_str(&quote(&self.program))?;
        } else {
            formatter.write_str(&self.program)?;
        }
        for arg in &self.args {
            write!(formatter, " {}", arg.render())?;
        }
        Ok(())
    }
}

/// Copy switches and exclusion sets applied to one copy task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    flags: Vec<String>,
    exclude_dirs: Vec<String>,
    exclude_files: Vec<String>,
}

impl CopyOptions {
    /// Options carrying `flags` and no exclusions.
    #[must_use]
    pub const fn new(flags: Vec<String>) -> Self {
        Self {
            flags,
            exclude_dirs: Vec::new(),
            exclude_files: Vec::new(),
        }
    }

    /// Global switches from configuration; exclusions are added per stage.
    #[must_use]
    pub fn from_settings(settings: &CopySettings) -> Self {
        Self::new(settings.options.clone())
    }

    /// Add directory exclusions.
    #[must_use]
    pub fn with_exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Add file exclusions.
    #[must_use]
    pub fn with_exclude_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Switches passed to every invocation.
    #[must_use]
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Directory exclusion set.
    #[must_use]
    pub fn exclude_dirs(&self) -> &[String] {
        &self.exclude_dirs
    }

    /// File exclusion set.
    #[must_use]
    pub fn exclude_files(&self) -> &[String] {
        &self.exclude_files
    }
}

/// `<tool> "<source>" "<destination>" <flags...> [/XD "<dir>"...] [/XF "<file>"...]`.
#[must_use]
pub fn copy_invocation(
    tool: &str,
    source: &Path,
    destination: &Path,
    options: &CopyOptions,
) -> Invocation {
    let mut invocation = Invocation::new(tool)
        .quoted(source.display().to_string())
        .quoted(destination.display().to_string());
    for flag in &options.flags {
        invocation = invocation.plain(flag.clone());
    }
    if !options.exclude_dirs.is_empty() {
        invocation = invocation.plain("/XD");
        for dir in &options.exclude_dirs {
            invocation = invocation.quoted(dir.clone());
        }
    }
    if !options.exclude_files.is_empty() {
        invocation = invocation.plain("/XF");
        for file in &options.exclude_files {
            invocation = invocation.quoted(file.clone());
        }
    }
    invocation
}

/// `<tool> export "<key>" "<output>" /y`.
#[must_use]
pub fn registry_invocation(tool: &str, key: &str, output: &Path) -> Invocation {
    Invocation::new(tool)
        .plain("export")
        .quoted(key)
        .quoted(output.display().to_string())
        .plain("/y")
}

// A trailing backslash would escape the closing quote, so it is doubled.
fn quote(value: &str) -> String {
    let trailing = value.len() - value.trim_end_matches('\\').len();
    format!("\"{value}{}\"", "\\".repeat(trailing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn copy_invocation_quotes_paths_and_appends_exclusions() {
        let options = CopyOptions::new(vec!["/S".into(), "/Z".into()])
            .with_exclude_dirs(["AppData"])
            .with_exclude_files(["NTUSER.DAT", "UsrClass.dat"]);
        let invocation = copy_invocation(
            "robocopy",
            Path::new(r"\\WS-042\C$\Users\jdoe"),
            Path::new(r"D:\Backup\j doe"),
            &options,
        );
        assert_eq!(
            invocation.to_string(),
            r#"robocopy "\\WS-042\C$\Users\jdoe" "D:\Backup\j doe" /S /Z /XD "AppData" /XF "NTUSER.DAT" "UsrClass.dat""#
        );
        assert_eq!(invocation.args()[1].value(), r"D:\Backup\j doe");
    }

    #[test]
    fn empty_exclusion_sets_emit_no_switches() {
        let invocation = copy_invocation(
            "robocopy",
            Path::new("src"),
            Path::new("dst"),
            &CopyOptions::new(vec!["/S".into()]),
        );
        assert_eq!(invocation.to_string(), r#"robocopy "src" "dst" /S"#);
        assert!(
            !invocation
                .args()
                .iter()
                .any(|arg| matches!(arg.value(), "/XD" | "/XF"))
        );
    }

    #[test]
    fn registry_invocation_matches_export_syntax() {
        let output = PathBuf::from("out").join("CURRENT_USER_Network.reg");
        let invocation = registry_invocation("reg", r"HKEY_CURRENT_USER\Network", &output);
        assert_eq!(
            invocation.to_string(),
            format!(
                r#"reg export "HKEY_CURRENT_USER\Network" "{}" /y"#,
                output.display()
            )
        );
    }

    #[test]
    fn program_paths_and_trailing_separators_are_quoted_safely() {
        let invocation = Invocation::new(r"C:\Tools\PsExec.exe")
            .plain("-i")
            .quoted(r"C:\")
            .verbatim(r#"reg export "HKCU\Printers" "a.reg" /y"#);
        assert_eq!(
            invocation.to_string(),
            r#""C:\Tools\PsExec.exe" -i "C:\\" "reg export "HKCU\Printers" "a.reg" /y""#
        );
    }
}
