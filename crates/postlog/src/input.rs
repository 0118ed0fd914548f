//! Input sources: files and stdin.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// One log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Standard input.
    Stdin,
    /// A file on disk.
    File(PathBuf),
}

impl Input {
    /// Maps a command-line argument to a source; `-` is stdin.
    #[must_use]
    pub fn from_arg(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            Self::Stdin
        } else {
            Self::File(path.to_path_buf())
        }
    }

    /// Opens the source for buffered reading.
    pub fn open(&self) -> Result<Box<dyn BufRead>> {
        match self {
            Self::Stdin => Ok(Box::new(io::stdin().lock())),
            Self::File(path) => {
                let file =
                    File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_dash_is_stdin() {
        assert_eq!(Input::from_arg(Path::new("-")), Input::Stdin);
        assert_eq!(
            Input::from_arg(Path::new("./-")),
            Input::File(PathBuf::from("./-"))
        );
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Oct 10 04:02:08 mail postfix/qmgr[1]: ABC: removed").unwrap();
        let input = Input::from_arg(file.path());
        let lines = input
            .open()
            .unwrap()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(lines, vec!["Oct 10 04:02:08 mail postfix/qmgr[1]: ABC: removed"]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let input = Input::File(PathBuf::from("/nonexistent/maillog"));
        let err = input.open().err().unwrap();
        assert!(err.to_string().contains("/nonexistent/maillog"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Input::Stdin.to_string(), "<stdin>");
        assert_eq!(Input::File(PathBuf::from("maillog")).to_string(), "maillog");
    }
}
