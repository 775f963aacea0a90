//! Source selection and document loading.

use crate::document::StructuralDocument;
use crate::srcml::StructuralParser;
use glob::MatchOptions;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Source argument meaning "read file paths from stdin".
pub const STDIN_SOURCE: &str = "-";

/// Expands source arguments into the files to check.
#[derive(Debug, Clone, Copy)]
pub struct FileWalker {
    options: MatchOptions,
}

impl Default for FileWalker {
    fn default() -> Self {
        Self {
            options: MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: true,
            },
        }
    }
}

impl FileWalker {
    /// Creates a walker. `**` does not descend into hidden directories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands sources, reading paths from the process stdin when the only
    /// source is `-`.
    #[must_use]
    pub fn expand(&self, sources: &[String]) -> Vec<PathBuf> {
        self.expand_with(sources, io::stdin().lock())
    }

    /// Expands sources, reading paths from `stdin` when the only source is
    /// `-`.
    ///
    /// Glob sources keep their match order; directories are skipped.
    pub fn expand_with<R: BufRead>(&self, sources: &[String], stdin: R) -> Vec<PathBuf> {
        if let [only] = sources {
            if only == STDIN_SOURCE {
                return stdin
                    .lines()
                    .map_while(Result::ok)
                    .map(|line| line.trim_end().to_string())
                    .filter(|line| !line.is_empty())
                    .map(PathBuf::from)
                    .filter(|path| !path.is_dir())
                    .collect();
            }
        }

        let mut files = Vec::new();
        for source in sources {
            let before = files.len();
            self.expand_glob(source, &mut files);
            if files.len() == before {
                warn!("No files matched: {}", source);
            }
        }
        files
    }

    fn expand_glob(&self, pattern: &str, out: &mut Vec<PathBuf>) {
        let paths = match glob::glob_with(pattern, self.options) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Invalid source pattern {}: {}", pattern, e);
                return;
            }
        };
        for entry in paths {
            match entry {
                Ok(path) if path.is_dir() => debug!("Skipping directory: {}", path.display()),
                Ok(path) => out.push(path),
                Err(e) => warn!("Could not read {}: {}", e.path().display(), e.error()),
            }
        }
    }
}

/// Reads a source file into a document, asking `parser` for a tree.
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_document(
    path: &Path,
    parser: Option<&dyn StructuralParser>,
) -> io::Result<StructuralDocument> {
    let bytes = std::fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    let tree = parser.and_then(|p| p.parse(path));
    if tree.is_none() {
        debug!("No structural tree for {}", path.display());
    }
    Ok(StructuralDocument::new(
        path.to_string_lossy(),
        &source,
        tree,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TreeNode;
    use std::fs;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("src/a.c"), "int a;\n").unwrap();
        fs::write(dir.path().join("src/nested/b.c"), "int b;\n").unwrap();
        fs::write(dir.path().join("src/notes.txt"), "x\n").unwrap();
        fs::write(dir.path().join(".hidden/c.c"), "int c;\n").unwrap();
        dir
    }

    fn pattern(dir: &Path, rest: &str) -> String {
        format!("{}/{rest}", dir.display())
    }

    #[test]
    fn recursive_glob_skips_hidden_and_directories() {
        let dir = setup();
        let files = FileWalker::new().expand_with(&[pattern(dir.path(), "**/*.c")], io::empty());
        let mut names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [PathBuf::from("src/a.c"), PathBuf::from("src/nested/b.c")]
        );

        let all = FileWalker::new().expand_with(&[pattern(dir.path(), "src/*")], io::empty());
        assert!(all.iter().all(|p| p.is_file()));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn stdin_lists_files() {
        let dir = setup();
        let input = format!(
            "{}\n\n{}  \n{}\n",
            dir.path().join("src/a.c").display(),
            dir.path().join("src/notes.txt").display(),
            dir.path().join("src").display()
        );
        let files = FileWalker::new().expand_with(&["-".to_string()], input.as_bytes());
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("notes.txt"));
    }

    #[test]
    fn unmatched_patterns_yield_nothing() {
        let dir = setup();
        let files = FileWalker::new().expand_with(
            &[pattern(dir.path(), "*.rs"), "[".to_string()],
            io::empty(),
        );
        assert!(files.is_empty());
    }

    struct FixedTree;

    impl StructuralParser for FixedTree {
        fn parse(&self, _path: &Path) -> Option<TreeNode> {
            Some(TreeNode::new("", "unit"))
        }
    }

    #[test]
    fn reads_documents_with_and_without_tree() {
        let dir = setup();
        let path = dir.path().join("src/a.c");
        let doc = read_document(&path, Some(&FixedTree)).unwrap();
        assert_eq!(doc.lines(), ["int a;\n"]);
        assert!(doc.tree().is_some());
        assert!(read_document(&path, None).unwrap().tree().is_none());
        assert!(read_document(&dir.path().join("missing.c"), None).is_err());
    }
}
