//! Macro-project bridge.
//!
//! Macro modules live inside a binary part that text tools cannot diff.
//! A host application can export them as plain source files into a
//! `vbaProject/` folder next to the extracted parts, and import them back
//! into a freshly packed archive. This module only knows how to invoke such
//! a bridge; the bridge itself is an external command.

use std::path::Path;
use std::process::Command;

use crate::config::MacrosConfig;
use crate::error::OoxmlError;

/// Export and import of an archive's macro project.
///
/// Both methods return `Ok(true)` if the step ran and succeeded, `Ok(false)`
/// if there was nothing to do, and an error if the bridge could not run.
pub trait MacroProject {
    /// Export the macro modules of `archive` into `dir`.
    ///
    /// # Errors
    /// [`OoxmlError::ExternalStepFailure`] if the bridge cannot be started.
    fn export(&self, archive: &Path, dir: &Path) -> Result<bool, OoxmlError>;

    /// Import the modules found in `dir` into `archive`.
    ///
    /// # Errors
    /// [`OoxmlError::ExternalStepFailure`] if the bridge cannot be started.
    fn import(&self, archive: &Path, dir: &Path) -> Result<bool, OoxmlError>;
}

/// No bridge configured: both steps are no-ops.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMacroProject;

impl MacroProject for NoMacroProject {
    fn export(&self, _archive: &Path, _dir: &Path) -> Result<bool, OoxmlError> {
        Ok(false)
    }

    fn import(&self, _archive: &Path, _dir: &Path) -> Result<bool, OoxmlError> {
        Ok(false)
    }
}

/// Bridge implemented by external commands.
///
/// Each command is an argv prefix; the archive path and the folder path are
/// appended as the last two arguments. Exit status zero means success.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandMacroProject {
    export_command: Vec<String>,
    import_command: Vec<String>,
}

impl CommandMacroProject {
    /// Build from the `[macros]` section of the configuration.
    #[must_use]
    pub fn from_config(config: &MacrosConfig) -> Self {
        Self {
            export_command: config.export_command.clone(),
            import_command: config.import_command.clone(),
        }
    }

    fn run(
        step: &'static str,
        argv: &[String],
        archive: &Path,
        dir: &Path,
    ) -> Result<bool, OoxmlError> {
        let Some((program, args)) = argv.split_first() else {
            return Ok(false);
        };
        tracing::debug!(step, program = %program, archive = %archive.display(), "running macro bridge");
        let status = Command::new(program)
            .args(args)
            .arg(archive)
            .arg(dir)
            .status()
            .map_err(|e| OoxmlError::ExternalStepFailure {
                step,
                detail: format!("could not run '{program}': {e}"),
            })?;
        if !status.success() {
            tracing::debug!(step, %status, "macro bridge reported nothing to do");
        }
        Ok(status.success())
    }
}

impl MacroProject for CommandMacroProject {
    fn export(&self, archive: &Path, dir: &Path) -> Result<bool, OoxmlError> {
        Self::run("export", &self.export_command, archive, dir)
    }

    fn import(&self, archive: &Path, dir: &Path) -> Result<bool, OoxmlError> {
        if !dir.is_dir() {
            return Ok(false);
        }
        Self::run("import", &self.import_command, archive, dir)
    }
}
