//! External regridding step.
//!
//! Source fields that are not already on the reference grid are handed to an
//! external tool (wgrib2, cdo, a site script) through a command template. The
//! template is split on whitespace and these placeholders are substituted per
//! argument:
//!
//! - `{input}`: the source file
//! - `{output}`: where the tool must write the raw little-endian f32 grid
//! - `{grid}`: the target grid as `lon0:nx:dx lat0:ny:dy`; a bare `{grid}`
//!   argument expands to two arguments
//!
//! The output lives in a scratch directory that is removed when the
//! [`RegridWorkspace`] is dropped.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use climdiv_common::GridSpec;
use tempfile::TempDir;
use tracing::{debug, info};

const OUTPUT_FILE: &str = "regridded.bin";

/// A parsed regrid command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegridCommand {
    program: String,
    args: Vec<String>,
}

impl RegridCommand {
    pub fn parse(template: &str) -> Result<Self> {
        let mut tokens = template.split_whitespace().map(str::to_string);
        let program = match tokens.next() {
            Some(p) => p,
            None => bail!("regrid command template is empty"),
        };
        let args: Vec<String> = tokens.collect();

        if !args.iter().any(|a| a.contains("{output}")) {
            bail!("regrid command template must reference {{output}}: '{}'", template);
        }

        Ok(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute placeholders for one invocation.
    pub fn render(&self, input: &Path, output: &Path, grid: &GridSpec) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let descriptor = grid.descriptor();

        let mut rendered = Vec::with_capacity(self.args.len() + 1);
        for arg in &self.args {
            if arg == "{grid}" {
                rendered.extend(descriptor.split_whitespace().map(str::to_string));
                continue;
            }
            rendered.push(
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{grid}", &descriptor),
            );
        }
        rendered
    }
}

/// Scratch directory holding the regridded field for one run.
pub struct RegridWorkspace {
    dir: TempDir,
}

impl RegridWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("climdiv-regrid-")
            .tempdir()
            .context("Failed to create regrid scratch directory")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run `command` on `source` and return the path of the regridded field.
    pub fn regrid(&self, command: &RegridCommand, source: &Path, grid: &GridSpec) -> Result<PathBuf> {
        if !source.exists() {
            bail!("Source file not found: {}", source.display());
        }

        let output = self.dir.path().join(OUTPUT_FILE);
        let args = command.render(source, &output, grid);
        debug!(program = %command.program, args = ?args, "Running regrid command");

        let result = Command::new(&command.program)
            .args(&args)
            .current_dir(self.dir.path())
            .output()
            .with_context(|| format!("Failed to run regrid command '{}'", command.program))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!(
                "Regrid command '{}' failed ({}): {}",
                command.program,
                result.status,
                stderr.trim()
            );
        }

        if !output.exists() {
            bail!(
                "Regrid command '{}' exited successfully but wrote no output at {}",
                command.program,
                output.display()
            );
        }

        info!(
            source = %source.display(),
            grid = %grid.descriptor(),
            "Regridded source field"
        );
        Ok(output)
    }
}
