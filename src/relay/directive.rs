use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

use log::debug;

use crate::relay::ConfigError;

/// Environment variable designating the parameter directory
pub const PARAMS_DIR_VAR: &str = "EW_PARAMS";

/// Nested `@file` includes deeper than this are refused
const MAX_INCLUDE_DEPTH: usize = 8;

/// One `Key arg1 arg2 ...` configuration line
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Directive keyword
    pub key: String,
    /// Arguments, quotes removed
    pub args: Vec<String>,
    /// Origin file
    pub file: String,
    /// 1-based line number in origin file
    pub line: usize,
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.key)
    }
}

impl Directive {
    /// Argument at this position
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }
}

enum Line {
    Include(String),
    Entry(Directive),
}

/// Splits one line into tokens. Double quotes group whitespace separated words.
fn tokenize(content: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in content.chars() {
        match c {
            '"' => {
                if quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            },
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_line(content: &str, file: &str, line: usize) -> Option<Line> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    if let Some(include) = trimmed.strip_prefix('@') {
        return Some(Line::Include(include.trim().to_string()));
    }

    let mut tokens = tokenize(trimmed).into_iter();
    let key = tokens.next()?;

    Some(Line::Entry(Directive {
        key,
        args: tokens.collect(),
        file: file.to_string(),
        line,
    }))
}

/// [DirectiveReader] reads configuration files from one parameter directory.
#[derive(Debug, Clone)]
pub struct DirectiveReader {
    root: PathBuf,
}

impl DirectiveReader {
    /// Reader rooted at this directory
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Reader rooted at the directory designated by `EW_PARAMS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let root = std::env::var_os(PARAMS_DIR_VAR).ok_or(ConfigError::MissingParamsDir)?;
        if root.is_empty() {
            return Err(ConfigError::EmptyParamsDir);
        }

        let root = PathBuf::from(root);
        if !root.is_dir() {
            return Err(ConfigError::ParamsDirNotFound(root.display().to_string()));
        }

        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parses configuration text that does not include other files
    pub fn parse_str(text: &str, origin: &str) -> Result<Vec<Directive>, ConfigError> {
        let mut directives = Vec::new();
        for (index, content) in text.lines().enumerate() {
            match parse_line(content, origin, index + 1) {
                Some(Line::Entry(directive)) => directives.push(directive),
                Some(Line::Include(file)) => {
                    return Err(ConfigError::UnresolvedInclude(file));
                },
                None => {},
            }
        }
        Ok(directives)
    }

    /// Reads this file and every file it includes, depth first,
    /// in order of appearance.
    pub fn read(&self, file: &str) -> Result<Vec<Directive>, ConfigError> {
        let mut directives = Vec::new();
        self.read_nested(file, 0, &mut directives)?;
        Ok(directives)
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read_nested(
        &self,
        file: &str,
        depth: usize,
        directives: &mut Vec<Directive>,
    ) -> Result<(), ConfigError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(ConfigError::IncludeDepth(file.to_string()));
        }

        let path = self.resolve(file);
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Open {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!("reading {}", path.display());

        for (index, content) in text.lines().enumerate() {
            match parse_line(content, file, index + 1) {
                Some(Line::Entry(directive)) => directives.push(directive),
                Some(Line::Include(nested)) => self.read_nested(&nested, depth + 1, directives)?,
                None => {},
            }
        }
        Ok(())
    }
}
