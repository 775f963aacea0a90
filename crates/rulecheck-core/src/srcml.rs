//! The srcML collaborator: runs the `srcml` binary and reads its XML.

use crate::document::TreeNode;
use crate::types::Position;
use miette::Diagnostic;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Namespace of srcML source elements, rendered without a prefix.
pub const SRC_NAMESPACE: &str = "http://www.srcML.org/srcML/src";

/// Namespace of srcML position attributes.
pub const POSITION_NAMESPACE: &str = "http://www.srcML.org/srcML/position";

const DEFAULT_ARGS: [&str; 2] = ["--position", "--cpp-markup-if0"];

const DEFAULT_EXTENSIONS: [(&str, &str); 20] = [
    (".c", "C"),
    (".h", "C"),
    (".i", "C"),
    (".cpp", "C++"),
    (".CPP", "C++"),
    (".cp", "C++"),
    (".hpp", "C++"),
    (".cxx", "C++"),
    (".hxx", "C++"),
    (".cc", "C++"),
    (".hh", "C++"),
    (".c++", "C++"),
    (".h++", "C++"),
    (".C", "C++"),
    (".H", "C++"),
    (".tcc", "C++"),
    (".ii", "C++"),
    (".java", "Java"),
    (".aj", "Java"),
    (".cs", "C#"),
];

/// Produces a structural tree for a source file.
pub trait StructuralParser {
    /// Parses `path`, or returns `None` when no tree can be produced.
    fn parse(&self, path: &Path) -> Option<TreeNode>;
}

/// Setup errors for the srcML collaborator.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum SrcmlError {
    /// No `srcml` binary was found.
    #[error("Could not locate srcml binary!")]
    #[diagnostic(
        code(rulecheck::srcml::not_found),
        help("install srcml or pass its directory with --srcml; searched: {searched}")
    )]
    NotFound {
        /// Where the binary was looked for.
        searched: String,
    },

    /// An extension mapping is not of the form `EXT=LANGUAGE`.
    #[error("Bad --register-ext option: {0}")]
    #[diagnostic(
        code(rulecheck::srcml::bad_extension),
        help("use EXT=LANGUAGE, for example --register-ext tpp=C++")
    )]
    BadExtMapping(String),
}

/// Runs `srcml` on source files.
#[derive(Debug, Clone)]
pub struct Srcml {
    binary: PathBuf,
    args: Vec<String>,
    tab_size: Option<usize>,
    extensions: BTreeMap<String, String>,
}

impl Srcml {
    /// Creates a runner for a known binary with the default arguments and
    /// extension table.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: DEFAULT_ARGS.iter().map(ToString::to_string).collect(),
            tab_size: None,
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|(ext, lang)| ((*ext).to_string(), (*lang).to_string()))
                .collect(),
        }
    }

    /// Finds `srcml` in `search_dir`, or on `PATH` when no directory is given.
    ///
    /// # Errors
    ///
    /// Returns [`SrcmlError::NotFound`] if no binary is found.
    pub fn locate(search_dir: Option<&Path>) -> Result<Self, SrcmlError> {
        let dirs: Vec<PathBuf> = match search_dir {
            Some(dir) => vec![dir.to_path_buf()],
            None => std::env::var_os("PATH")
                .map(|path| std::env::split_paths(&path).collect())
                .unwrap_or_default(),
        };
        let found = dirs.iter().find_map(|dir| {
            binary_names()
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        });
        match found {
            Some(binary) => {
                debug!("srcml binary located at: {}", binary.display());
                Ok(Self::new(binary))
            }
            None => Err(SrcmlError::NotFound {
                searched: search_dir.map_or_else(
                    || "system path".to_string(),
                    |dir| dir.display().to_string(),
                ),
            }),
        }
    }

    /// Replaces the arguments passed before `--tabs` and `--language`,
    /// including the default `--position --cpp-markup-if0`.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Passes `--tabs=N` to srcml.
    #[must_use]
    pub fn with_tabs(mut self, tab_size: usize) -> Self {
        self.tab_size = (tab_size > 0).then_some(tab_size);
        self
    }

    /// Path of the binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Maps a file extension (with or without the leading dot) to a language.
    pub fn add_ext_mapping(&mut self, ext: &str, language: impl Into<String>) {
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        self.extensions.insert(ext, language.into());
    }

    /// Adds a mapping given as `EXT=LANGUAGE`.
    ///
    /// # Errors
    ///
    /// Returns [`SrcmlError::BadExtMapping`] if the text is not exactly one
    /// extension and one language separated by `=`.
    pub fn register_ext(&mut self, mapping: &str) -> Result<(), SrcmlError> {
        let parts: Vec<&str> = mapping.split('=').collect();
        match parts.as_slice() {
            [ext, language] if !ext.is_empty() && !language.is_empty() => {
                self.add_ext_mapping(ext, *language);
                Ok(())
            }
            _ => Err(SrcmlError::BadExtMapping(mapping.to_string())),
        }
    }

    /// Extension to language table.
    #[must_use]
    pub fn ext_mappings(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }

    /// Language srcml is told to use for a file, if its extension is known.
    #[must_use]
    pub fn language_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?;
        self.extensions.get(&format!(".{ext}")).map(String::as_str)
    }

    /// Arguments for one invocation, or `None` for unknown extensions.
    #[must_use]
    pub fn command_args(&self, path: &Path) -> Option<Vec<OsString>> {
        let language = self.language_for(path)?;
        let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        if let Some(tabs) = self.tab_size {
            args.push(format!("--tabs={tabs}").into());
        }
        args.push("--language".into());
        args.push(language.into());
        args.push(path.as_os_str().to_os_string());
        Some(args)
    }

    /// Runs srcml and returns its XML output.
    ///
    /// Returns `None`, with a warning, if the file has no known language or
    /// srcml fails.
    #[must_use]
    pub fn run(&self, path: &Path) -> Option<String> {
        let Some(args) = self.command_args(path) else {
            debug!("No srcml language for {}", path.display());
            return None;
        };
        debug!("Calling srcml: {} {:?}", self.binary.display(), args);

        let output = match Command::new(&self.binary).args(&args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("error calling srcml: {e}");
                return None;
            }
        };
        if !output.status.success() || !output.stderr.is_empty() {
            warn!(
                "error calling srcml, return code: {} stderr: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "none".to_string(), |c| c.to_string()),
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl StructuralParser for Srcml {
    fn parse(&self, path: &Path) -> Option<TreeNode> {
        let xml = self.run(path)?;
        match parse_tree(&xml) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!("Could not read srcml output for {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn binary_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["srcml.exe", "srcml"]
    } else {
        &["srcml"]
    }
}

/// Converts srcML XML into a [`TreeNode`] tree.
///
/// Markup lines are counted from the line after the XML declaration, which is
/// how they line up with the source for srcml output.
///
/// # Errors
///
/// Returns an error if the text is not well-formed XML.
pub fn parse_tree(xml: &str) -> Result<TreeNode, roxmltree::Error> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(convert(&doc, doc.root_element()).0)
}

/// Converts one element, returning it with the number of newlines in its
/// text content.
fn convert(doc: &roxmltree::Document<'_>, element: roxmltree::Node<'_, '_>) -> (TreeNode, i64) {
    let mut node = TreeNode::new(
        element_prefix(element, element.tag_name().namespace()),
        element.tag_name().name(),
    );

    for attr in element.attributes() {
        let key = match attr.namespace() {
            Some(POSITION_NAMESPACE) => format!("pos:{}", attr.name()),
            Some(ns) => match element.lookup_prefix(ns) {
                Some(prefix) => format!("{prefix}:{}", attr.name()),
                None => attr.name().to_string(),
            },
            None => attr.name().to_string(),
        };
        node.attributes.insert(key, attr.value().to_string());
    }
    node.start = node.attribute("pos:start").and_then(parse_position);
    node.end = node.attribute("pos:end").and_then(parse_position);

    let mut newlines = 0i64;
    for child in element.children() {
        if child.is_element() {
            let (converted, inner) = convert(doc, child);
            newlines += inner;
            node.children.push(converted);
        } else if let Some(text) = child.text().filter(|_| child.is_text()) {
            newlines += count_newlines(text);
            match node.children.last_mut() {
                Some(last) => last.tail.push_str(text),
                None => node.text.push_str(text),
            }
        }
    }

    let row = i64::from(doc.text_pos_at(element.range().start).row);
    node.markup_start = row - 1;
    node.markup_end = node.markup_start + newlines;
    (node, newlines)
}

fn element_prefix(element: roxmltree::Node<'_, '_>, namespace: Option<&str>) -> String {
    match namespace {
        None | Some(SRC_NAMESPACE) => String::new(),
        Some(ns) => element.lookup_prefix(ns).unwrap_or_default().to_string(),
    }
}

fn count_newlines(text: &str) -> i64 {
    i64::try_from(text.matches('\n').count()).unwrap_or(i64::MAX)
}

/// Parses a `line:column` position attribute.
fn parse_position(value: &str) -> Option<Position> {
    let (line, column) = value.split_once(':')?;
    Some(Position::new(line.trim().parse().ok()?, column.trim().parse().ok()?))
}
