//! CMake list editing.
//!
//! The file is tokenized into command invocations (`name(args...)`) with the
//! byte span of every argument. Edits splice new text at argument
//! boundaries, so comments, formatting and everything outside the edited
//! command survive untouched.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::{indentation_at, read, write, Applied, PatchError};

/// One argument of a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Source text, including quotes or brackets
    pub raw: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// Parenthesis nesting depth; 1 for direct arguments
    pub depth: usize,
}

impl Argument {
    /// The argument with surrounding quotes or brackets removed.
    pub fn value(&self) -> &str {
        let raw = self.raw.as_str();
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            return &raw[1..raw.len() - 1];
        }
        if let Some(level) = bracket_level(raw.as_bytes(), 0) {
            let open = level + 2;
            if raw.len() >= open * 2 {
                return &raw[open..raw.len() - open];
            }
        }
        raw
    }
}

/// A command invocation such as `list(APPEND foo_sources a.cc)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    /// Byte offset of the command name
    pub start: usize,
    /// Byte offset of the opening parenthesis
    pub open: usize,
    /// Byte offset of the closing parenthesis
    pub close: usize,
    pub args: Vec<Argument>,
}

impl Command {
    /// Arguments directly inside the command's parentheses.
    pub fn top_level_args(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter().filter(|a| a.depth == 1)
    }
}

/// Matches a single argument value.
#[derive(Debug, Clone)]
pub enum ArgMatch {
    Exact(String),
    Pattern(Regex),
}

impl ArgMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        ArgMatch::Exact(value.into())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            ArgMatch::Exact(expected) => expected == value,
            ArgMatch::Pattern(re) => re.is_match(value),
        }
    }
}

impl fmt::Display for ArgMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgMatch::Exact(s) => f.write_str(s),
            ArgMatch::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Picks the command an edit applies to: the first invocation of `name`
/// whose leading arguments match `leading` in order.
#[derive(Debug, Clone)]
pub struct CommandSelector {
    name: String,
    leading: Vec<ArgMatch>,
}

impl CommandSelector {
    pub fn new(name: impl Into<String>) -> Self {
        CommandSelector {
            name: name.into(),
            leading: Vec::new(),
        }
    }

    /// Require the next leading argument to match.
    pub fn arg(mut self, m: ArgMatch) -> Self {
        self.leading.push(m);
        self
    }

    fn matches(&self, cmd: &Command) -> bool {
        if !cmd.name.eq_ignore_ascii_case(&self.name) {
            return false;
        }
        let mut args = cmd.top_level_args();
        self.leading
            .iter()
            .all(|m| args.next().is_some_and(|a| m.matches(a.value())))
    }
}

impl fmt::Display for CommandSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}(", self.name)?;
        for (i, m) in self.leading.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", m)?;
        }
        f.write_str(" ...)` command")
    }
}

/// Where a new argument goes within the selected command.
#[derive(Debug, Clone)]
pub enum InsertAt {
    /// After the last argument.
    End,
    /// Before the first non-leading argument matching; at the end if none
    /// does. Used to keep values out of a trailing `DESTINATION` clause.
    Before(ArgMatch),
}

/// A parsed CMake file open for editing.
#[derive(Debug, Clone)]
pub struct CMakeFile {
    path: PathBuf,
    text: String,
    commands: Vec<Command>,
    dirty: bool,
}

impl CMakeFile {
    /// Read and parse a file.
    pub fn open(path: &Path) -> Result<Self, PatchError> {
        let text = read(path)?;
        Self::from_text(path, text)
    }

    /// Parse `text` as the contents of `path`.
    pub fn from_text(path: &Path, text: impl Into<String>) -> Result<Self, PatchError> {
        let text = text.into();
        let commands = parse(&text).map_err(|e| e.into_patch_error(path, &text))?;
        Ok(CMakeFile {
            path: path.to_path_buf(),
            text,
            commands,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The first command the selector picks.
    pub fn find(&self, selector: &CommandSelector) -> Option<&Command> {
        self.commands.iter().find(|c| selector.matches(c))
    }

    /// Append `value` as an argument of the selected command unless it is
    /// already one.
    pub fn append_value(
        &mut self,
        selector: &CommandSelector,
        value: &str,
        at: &InsertAt,
    ) -> Result<Applied, PatchError> {
        let cmd = self
            .find(selector)
            .ok_or_else(|| PatchError::AnchorNotFound {
                path: self.path.clone(),
                anchor: selector.to_string(),
            })?;

        let top: Vec<&Argument> = cmd.top_level_args().collect();
        let skip = selector.leading.len().min(top.len());
        let (leading, values) = top.split_at(skip);

        let anchor = match at {
            InsertAt::Before(m) => values.iter().position(|a| m.matches(a.value())),
            InsertAt::End => None,
        };

        // Only entries ahead of the anchor count; the clause after it (a
        // destination path, say) is not part of the list.
        let entries = &values[..anchor.unwrap_or(values.len())];
        if entries.iter().any(|a| a.value() == value) {
            return Ok(Applied::AlreadyPresent);
        }

        let (offset, insertion) = match anchor {
            Some(i) => {
                let a = values[i];
                let prev_end = if i > 0 {
                    values[i - 1].end
                } else {
                    leading.last().map_or(cmd.open + 1, |l| l.end)
                };
                let sep = self.separator(prev_end, a.start, a.start);
                (a.start, format!("{}{}", value, sep))
            }
            None => match (values.last(), leading.last()) {
                (Some(last), _) => {
                    let prev_end = if values.len() > 1 {
                        values[values.len() - 2].end
                    } else {
                        leading.last().map_or(cmd.open + 1, |l| l.end)
                    };
                    let sep = self.separator(prev_end, last.start, last.start);
                    // A line comment after the last value stays on its line.
                    let offset = if sep == " " {
                        last.end
                    } else {
                        self.end_of_trailing_comment(last.end, cmd.close)
                    };
                    (offset, format!("{}{}", sep, value))
                }
                (None, Some(last_leading)) => {
                    // First value of an empty list: one per line if the
                    // closing parenthesis sits on its own line.
                    let sep = if self.text[last_leading.end..cmd.close].contains('\n') {
                        format!("{}{}    ", self.newline(), indentation_at(&self.text, cmd.start))
                    } else {
                        " ".to_string()
                    };
                    (last_leading.end, format!("{}{}", sep, value))
                }
                (None, None) => (cmd.open + 1, value.to_string()),
            },
        };

        self.splice(offset, &insertion)?;
        Ok(Applied::Inserted)
    }

    /// Whether a `file(GLOB ...)` pattern in this file already matches
    /// `file_name`.
    pub fn glob_matches(&self, file_name: &str) -> bool {
        self.commands
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case("file"))
            .any(|c| {
                let mut args = c.top_level_args().map(Argument::value);
                if !matches!(args.next(), Some("GLOB" | "GLOB_RECURSE")) {
                    return false;
                }
                // Output variable
                args.next();
                let mut patterns = Vec::new();
                while let Some(arg) = args.next() {
                    match arg {
                        "RELATIVE" | "LIST_DIRECTORIES" => {
                            args.next();
                        }
                        "CONFIGURE_DEPENDS" | "FOLLOW_SYMLINKS" => {}
                        pattern => patterns.push(pattern),
                    }
                }
                patterns.into_iter().any(|p| {
                    let base = p.rsplit('/').next().unwrap_or(p);
                    glob::Pattern::new(base).is_ok_and(|pat| pat.matches(file_name))
                })
            })
    }

    /// Append a statement on its own line at the end of the file unless an
    /// identical line exists.
    pub fn append_line(&mut self, line: &str) -> Result<Applied, PatchError> {
        let line = line.trim();
        if self.text.lines().any(|l| l.trim() == line) {
            return Ok(Applied::AlreadyPresent);
        }
        let newline = self.newline();
        let mut insertion = String::new();
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            insertion.push_str(newline);
        }
        insertion.push_str(line);
        insertion.push_str(newline);
        let end = self.text.len();
        self.splice(end, &insertion)?;
        Ok(Applied::Inserted)
    }

    /// Write the file back if it was edited.
    pub fn save(&self) -> Result<(), PatchError> {
        if self.dirty {
            write(&self.path, &self.text)?;
        }
        Ok(())
    }

    fn separator(&self, prev_end: usize, gap_end: usize, indent_at: usize) -> String {
        if self.text[prev_end..gap_end].contains('\n') {
            format!("{}{}", self.newline(), indentation_at(&self.text, indent_at))
        } else {
            " ".to_string()
        }
    }

    /// Line ending used by the file, judged by its first line break.
    fn newline(&self) -> &'static str {
        match self.text.find('\n') {
            Some(i) if self.text[..i].ends_with('\r') => "\r\n",
            _ => "\n",
        }
    }

    /// Offset of the line break ending a `# comment` that follows `offset`
    /// on the same line, or `offset` itself when there is none.
    fn end_of_trailing_comment(&self, offset: usize, close: usize) -> usize {
        let rest = &self.text[offset..close];
        let line = rest.find('\n').map_or(rest, |i| &rest[..i]);
        let trimmed = line.trim_start_matches([' ', '\t']);
        if line.len() == rest.len() || !trimmed.starts_with('#') || trimmed.starts_with("#[") {
            return offset;
        }
        offset + line.trim_end_matches('\r').len()
    }

    fn splice(&mut self, offset: usize, insertion: &str) -> Result<(), PatchError> {
        self.text.insert_str(offset, insertion);
        self.commands = parse(&self.text).map_err(|e| e.into_patch_error(&self.path, &self.text))?;
        self.dirty = true;
        Ok(())
    }
}

#[derive(Debug)]
struct ParseFailure {
    offset: usize,
    message: String,
}

impl ParseFailure {
    fn into_patch_error(self, path: &Path, text: &str) -> PatchError {
        let line = text[..self.offset.min(text.len())].matches('\n').count() + 1;
        PatchError::Parse {
            path: path.to_path_buf(),
            line,
            message: self.message,
        }
    }
}

/// Number of `=` in a bracket opener `[==[` at `pos`, if there is one.
fn bracket_level(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'[') {
        return None;
    }
    let mut i = pos + 1;
    while bytes.get(i) == Some(&b'=') {
        i += 1;
    }
    (bytes.get(i) == Some(&b'[')).then_some(i - pos - 1)
}

/// Offset one past the bracket closer matching an opener of `level` that
/// ends before `from`.
fn bracket_end(text: &str, from: usize, level: usize) -> Option<usize> {
    let closer = format!("]{}]", "=".repeat(level));
    text[from..].find(&closer).map(|i| from + i + closer.len())
}

/// Skip a comment starting at `pos` (which holds `#`), returning the offset
/// after it.
fn skip_comment(text: &str, pos: usize) -> Result<usize, ParseFailure> {
    let bytes = text.as_bytes();
    if let Some(level) = bracket_level(bytes, pos + 1) {
        return bracket_end(text, pos + level + 3, level).ok_or(ParseFailure {
            offset: pos,
            message: "unterminated bracket comment".into(),
        });
    }
    Ok(text[pos..].find('\n').map_or(text.len(), |i| pos + i))
}

fn parse(text: &str) -> Result<Vec<Command>, ParseFailure> {
    let bytes = text.as_bytes();
    let mut commands = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
        } else if c == b'#' {
            pos = skip_comment(text, pos)?;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let name = &text[start..pos];
            while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t') {
                pos += 1;
            }
            if bytes.get(pos) != Some(&b'(') {
                return Err(ParseFailure {
                    offset: start,
                    message: format!("expected `(` after `{}`", name),
                });
            }
            let open = pos;
            let (args, close) = parse_args(text, open)?;
            commands.push(Command {
                name: name.to_string(),
                start,
                open,
                close,
                args,
            });
            pos = close + 1;
        } else {
            // Stray characters between commands are left alone.
            pos += 1;
        }
    }

    Ok(commands)
}

fn parse_args(text: &str, open: usize) -> Result<(Vec<Argument>, usize), ParseFailure> {
    let bytes = text.as_bytes();
    let mut args = Vec::new();
    let mut depth = 1;
    let mut pos = open + 1;

    let unterminated = || ParseFailure {
        offset: open,
        message: "unterminated command invocation".into(),
    };

    loop {
        let Some(&c) = bytes.get(pos) else {
            return Err(unterminated());
        };
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'#' => pos = skip_comment(text, pos)?,
            b'(' => {
                depth += 1;
                pos += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((args, pos));
                }
                pos += 1;
            }
            b'"' => {
                let start = pos;
                pos += 1;
                loop {
                    match bytes.get(pos) {
                        None => {
                            return Err(ParseFailure {
                                offset: start,
                                message: "unterminated quoted argument".into(),
                            })
                        }
                        Some(b'\\') => pos += 2,
                        Some(b'"') => {
                            pos += 1;
                            break;
                        }
                        Some(_) => pos += 1,
                    }
                }
                args.push(argument(text, start, pos, depth));
            }
            b'[' if bracket_level(bytes, pos).is_some() => {
                let start = pos;
                let level = bracket_level(bytes, pos).unwrap_or(0);
                pos = bracket_end(text, pos + level + 2, level).ok_or(ParseFailure {
                    offset: start,
                    message: "unterminated bracket argument".into(),
                })?;
                args.push(argument(text, start, pos, depth));
            }
            _ => {
                let start = pos;
                while let Some(&b) = bytes.get(pos) {
                    match b {
                        b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' => break,
                        b'\\' => pos += 2,
                        _ => pos += 1,
                    }
                }
                pos = pos.min(bytes.len());
                args.push(argument(text, start, pos, depth));
            }
        }
    }
}

fn argument(text: &str, start: usize, end: usize, depth: usize) -> Argument {
    let end = end.min(text.len());
    Argument {
        raw: text[start..end].to_string(),
        start,
        end,
        depth,
    }
}
