//! Active version declaration in the controller build file.
//!
//! The controller file is opaque text except for one line that declares the
//! active version. Three declaration styles are recognized:
//!
//! | Style    | Line                                              | Located by          |
//! |----------|---------------------------------------------------|---------------------|
//! | `legacy` | `stonecutter.current('1.19')`                     | fixed line index    |
//! | `groovy` | `stonecutter.active "1.19" /* [SC] DO NOT EDIT */` | trailing marker     |
//! | `kotlin` | `stonecutter active "1.19" /* [SC] DO NOT EDIT */` | trailing marker     |
//!
//! Rewrites replace that single line, keep every other byte (line endings
//! included) and land through a temp file renamed over the original, so a
//! crash leaves either the old or the new file. There is no cross-process
//! locking: callers must not edit the file concurrently with a switch.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::descriptor::validate_identifier;
use crate::error::{ChiselError, ChiselResult};

/// Trailing marker of generated controller headers.
pub const HEADER_MARKER: &str = "/* [SC] DO NOT EDIT */";

/// Zero-based line of the legacy declaration.
pub const DEFAULT_DECLARATION_LINE: usize = 5;

/// Highest accepted legacy declaration line.
pub const MAX_DECLARATION_LINE: usize = 1024;

static LEGACY_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*stonecutter\.current\(\s*'([^']*)'\s*\)\s*;?\s*$").expect("valid regex")
});

static MARKED_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*stonecutter\s*\.?\s*active\s*\(?\s*"([^"]*)""#).expect("valid regex")
});

/// How the active version is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationStyle {
    #[default]
    Legacy,
    Groovy,
    Kotlin,
}

impl DeclarationStyle {
    /// Render the declaration line for `identifier`.
    pub fn render(self, identifier: &str) -> String {
        match self {
            Self::Legacy => format!("stonecutter.current('{}')", identifier),
            Self::Groovy => format!("stonecutter.active \"{}\" {}", identifier, HEADER_MARKER),
            Self::Kotlin => format!("stonecutter active \"{}\" {}", identifier, HEADER_MARKER),
        }
    }

    /// Extract the identifier from a declaration line.
    pub fn extract(self, line: &str) -> Option<&str> {
        let regex = match self {
            Self::Legacy => &*LEGACY_DECLARATION,
            Self::Groovy | Self::Kotlin => &*MARKED_DECLARATION,
        };
        regex
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    fn uses_marker(self) -> bool {
        !matches!(self, Self::Legacy)
    }
}

/// Declaration style and, for the legacy style, its line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Declaration {
    pub style: DeclarationStyle,

    /// Zero-based line index. Ignored by marker styles.
    pub line: usize,
}

impl Default for Declaration {
    fn default() -> Self {
        Self {
            style: DeclarationStyle::Legacy,
            line: DEFAULT_DECLARATION_LINE,
        }
    }
}

impl Declaration {
    pub fn legacy(line: usize) -> Self {
        Self {
            style: DeclarationStyle::Legacy,
            line,
        }
    }

    pub fn marked(style: DeclarationStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }
}

/// Rewrites the active declaration of one controller file.
#[derive(Debug, Clone)]
pub struct ActiveVersionSwitch {
    path: PathBuf,
    declaration: Declaration,
}

impl ActiveVersionSwitch {
    pub fn new(path: impl Into<PathBuf>, declaration: Declaration) -> Self {
        Self {
            path: path.into(),
            declaration,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// Declare `identifier` as the active version.
    pub fn apply(&self, identifier: &str) -> ChiselResult<()> {
        validate_identifier(identifier)?;

        let content = self.read()?;
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let index = self.locate(&lines)?;
        let patched = patch_line(&lines, index, &self.declaration.style.render(identifier))
            .ok_or_else(|| self.mismatch(format!("line {} is out of range", index + 1)))?;

        write_atomic(&self.path, &patched)?;
        debug!(
            path = %self.path.display(),
            line = index + 1,
            identifier,
            "rewrote active declaration"
        );
        Ok(())
    }

    /// The identifier currently declared active.
    pub fn read_active(&self) -> ChiselResult<String> {
        let content = self.read()?;
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let index = self.locate(&lines)?;
        let (body, _) = split_terminator(lines[index]);

        self.declaration
            .style
            .extract(body)
            .map(str::to_string)
            .ok_or_else(|| {
                self.mismatch(format!(
                    "line {} does not declare an active version: '{}'",
                    index + 1,
                    body.trim()
                ))
            })
    }

    /// Write a new controller file declaring `identifier`. Fails if the file exists.
    pub fn create(&self, identifier: &str) -> ChiselResult<()> {
        validate_identifier(identifier)?;
        if self.declaration.line > MAX_DECLARATION_LINE {
            return Err(self.mismatch(format!(
                "declaration line {} exceeds the maximum of {}",
                self.declaration.line + 1,
                MAX_DECLARATION_LINE + 1
            )));
        }

        let content = render_header(&self.declaration, identifier);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| ChiselError::io(&self.path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ChiselError::io(&self.path, e))?;

        debug!(path = %self.path.display(), identifier, "created controller file");
        Ok(())
    }

    fn read(&self) -> ChiselResult<String> {
        fs::read_to_string(&self.path).map_err(|e| ChiselError::io(&self.path, e))
    }

    fn locate(&self, lines: &[&str]) -> ChiselResult<usize> {
        if lines.is_empty() {
            return Err(self.mismatch("file is empty".to_string()));
        }

        if self.declaration.style.uses_marker() {
            return lines
                .iter()
                .position(|l| split_terminator(l).0.trim_end().ends_with(HEADER_MARKER))
                .ok_or_else(|| {
                    self.mismatch(format!(
                        "no line ends with '{}'; add `{}` or delete the file to regenerate it",
                        HEADER_MARKER,
                        self.declaration.style.render("<version>")
                    ))
                });
        }

        let index = self.declaration.line;
        if index >= lines.len() {
            return Err(self.mismatch(format!(
                "expected the active declaration on line {}, but the file has {} lines",
                index + 1,
                lines.len()
            )));
        }
        Ok(index)
    }

    fn mismatch(&self, reason: String) -> ChiselError {
        ChiselError::StructuralMismatch {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Split a line into its body and its terminator (`\n`, `\r\n` or nothing).
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Join `lines` with line `index` replaced by `replacement`, keeping the
/// original terminator. `None` when `index` is out of range.
fn patch_line(lines: &[&str], index: usize, replacement: &str) -> Option<String> {
    let (_, terminator) = split_terminator(lines.get(index)?);

    let mut patched = String::with_capacity(lines.iter().map(|l| l.len()).sum::<usize>());
    for (i, line) in lines.iter().enumerate() {
        if i == index {
            patched.push_str(replacement);
            patched.push_str(terminator);
        } else {
            patched.push_str(line);
        }
    }
    Some(patched)
}

fn write_atomic(path: &Path, content: &str) -> ChiselResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ChiselError::io(path, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| ChiselError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ChiselError::io(path, e))?;

    // The temp file is created 0600; keep the original mode
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| ChiselError::io(path, e))?;
    }

    temp.persist(path)
        .map_err(|e| ChiselError::io(path, e.error))?;
    Ok(())
}

fn render_header(declaration: &Declaration, identifier: &str) -> String {
    let line = declaration.style.render(identifier);
    let lines: Vec<String> = match declaration.style {
        DeclarationStyle::Legacy => {
            let mut lines: Vec<String> = [
                "plugins {",
                "    id 'io.shcm.shsupercm.fabric.stonecutter'",
                "}",
            ]
            .iter()
            .map(|l| l.to_string())
            .collect();
            while lines.len() < declaration.line {
                lines.push(String::new());
            }
            lines.insert(declaration.line, line);
            lines
        }
        DeclarationStyle::Groovy => vec![
            "plugins.apply \"dev.kikugie.stonecutter\"".to_string(),
            line,
            String::new(),
            "stonecutter.registerChiseled tasks.register(\"chiseledBuild\", stonecutter.chiseled) {"
                .to_string(),
            "    setGroup \"project\"".to_string(),
            "    ofTask \"build\"".to_string(),
            "}".to_string(),
        ],
        DeclarationStyle::Kotlin => vec![
            "plugins {".to_string(),
            "    id(\"dev.kikugie.stonecutter\")".to_string(),
            "}".to_string(),
            line,
            String::new(),
            "stonecutter registerChiseled tasks.register(\"chiseledBuild\", stonecutter.chiseled) {"
                .to_string(),
            "    group = \"project\"".to_string(),
            "    ofTask(\"build\")".to_string(),
            "}".to_string(),
        ],
    };

    let mut content = lines.join("\n");
    content.push('\n');
    content
}
