//! Resolution of command-line input arguments.
//!
//! A `summarize` argument can be direct text, `-` for stdin, a file, a
//! directory, or a glob pattern. [`resolve_input`] decides which, in this
//! order:
//!
//! 1. `-` reads standard input.
//! 2. An existing file is used as-is; an existing directory is scanned
//!    recursively (skipping `.git`, `target`, and `node_modules`). Paths
//!    may contain spaces.
//! 3. An argument without whitespace containing `*`, `?`, `[`, or `{` is
//!    expanded as a glob.
//! 4. An argument without whitespace that looks like a path but does not
//!    exist is an error.
//! 5. Anything else is text.
//!
//! Directory scans and glob expansion keep only files whose extension is in
//! [`TEXT_EXTENSIONS`], and return paths sorted for deterministic ordering.

use globset::GlobBuilder;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::models::{Document, Origin};

/// Extensions eligible for directory scans and glob expansion.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mdx", "txt", "text", "rst", "adoc", "org", "tex", "csv", "tsv", "json",
    "yaml", "yml", "toml", "xml", "html", "htm", "log", "ini", "cfg", "conf", "rs", "py", "js",
    "ts", "go", "java", "c", "h", "cpp", "hpp", "rb", "sh",
];

/// Directory names never descended into below the walk root.
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

/// Errors raised while resolving or reading an input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("{0} is a directory, expected a file")]
    IsDirectory(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InputError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => InputError::PermissionDenied(path.to_path_buf()),
            _ => InputError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// What an input argument turned out to be.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Direct text or stdin, already read.
    Text(Document),
    /// A single existing file.
    File(PathBuf),
    /// Files from a directory scan or glob expansion. May be empty.
    Files(Vec<PathBuf>),
}

/// Resolve `arg`, reading stdin when it is `-`.
pub fn resolve_input(arg: &str) -> Result<ResolvedInput, InputError> {
    resolve_input_from(arg, &mut io::stdin().lock())
}

/// Resolve `arg`, reading `stdin` when it is `-`.
pub fn resolve_input_from(arg: &str, stdin: &mut dyn Read) -> Result<ResolvedInput, InputError> {
    if arg == "-" {
        let mut content = String::new();
        stdin
            .read_to_string(&mut content)
            .map_err(|source| InputError::Io {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        return Ok(ResolvedInput::Text(Document::new(content, Origin::Stdin)));
    }

    if arg.is_empty() {
        return Ok(ResolvedInput::Text(Document::new(arg, Origin::Text)));
    }

    let path = Path::new(arg);
    if path.is_file() {
        return Ok(ResolvedInput::File(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(ResolvedInput::Files(scan_directory(path)?));
    }

    if !arg.chars().any(char::is_whitespace) {
        if is_glob(arg) {
            return Ok(ResolvedInput::Files(expand_glob(arg)?));
        }
        if looks_like_path(arg) {
            return Err(InputError::NotFound(path.to_path_buf()));
        }
    }

    Ok(ResolvedInput::Text(Document::new(arg, Origin::Text)))
}

/// Read a whole file as UTF-8 text.
pub fn read_text_file(path: &Path) -> Result<String, InputError> {
    if path.is_dir() {
        return Err(InputError::IsDirectory(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| InputError::from_io(path, e))
}

/// Check that `path` names an existing regular file.
pub fn require_file(path: &Path) -> Result<(), InputError> {
    let meta = std::fs::metadata(path).map_err(|e| InputError::from_io(path, e))?;
    if meta.is_dir() {
        return Err(InputError::IsDirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Whether `path` has an allow-listed text extension.
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Recursively list text files under `root`, sorted by path.
pub fn scan_directory(root: &Path) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_skipped_dir(e)) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_text_file(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Expand a glob pattern into matching text files, sorted by path.
///
/// The walk starts at the longest leading run of path components without
/// glob metacharacters. `*` and `?` do not match `/`; use `**` to descend.
/// Without `**` the walk goes no deeper than the pattern has components.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, InputError> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| InputError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let base = literal_base(pattern);
    let walk_root = if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base.clone()
    };
    if !walk_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(&walk_root);
    if let Some(depth) = glob_depth(pattern, &base) {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| !is_skipped_dir(e)) {
        let entry = entry.map_err(|e| walk_error(&walk_root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        // Without a literal base the walk starts at "."; match on the path
        // the user would have typed.
        let path = if base.as_os_str().is_empty() {
            entry.path().strip_prefix(".").unwrap_or(entry.path())
        } else {
            entry.path()
        };
        if matcher.is_match(path) && is_text_file(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn is_glob(arg: &str) -> bool {
    arg.contains(['*', '?', '[', '{'])
}

fn looks_like_path(arg: &str) -> bool {
    arg.contains('/') || arg.contains('\\') || is_text_file(Path::new(arg))
}

/// Leading components of `pattern` that contain no glob metacharacters.
fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) if part.to_str().is_some_and(is_glob) => break,
            other => base.push(other.as_os_str()),
        }
    }
    base
}

/// How many levels below `base` a pattern can reach, or `None` when it has
/// `**` or a brace group (which may hold separators).
fn glob_depth(pattern: &str, base: &Path) -> Option<usize> {
    if pattern.contains("**") || pattern.contains('{') {
        return None;
    }
    let total = Path::new(pattern).components().count();
    let literal = base.components().count();
    Some(total.saturating_sub(literal).max(1))
}

/// Skipped directories are pruned below the root, so their contents are
/// never read.
fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn walk_error(root: &Path, e: walkdir::Error) -> InputError {
    let path = e.path().unwrap_or(root).to_path_buf();
    match e.into_io_error() {
        Some(source) => InputError::from_io(&path, source),
        None => InputError::Io {
            path,
            source: io::Error::other("filesystem loop detected"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "content").unwrap();
        path
    }

    #[test]
    fn test_is_text_file() {
        assert!(is_text_file(Path::new("notes.md")));
        assert!(is_text_file(Path::new("README.MD")));
        assert!(is_text_file(Path::new("src/lib.rs")));
        assert!(!is_text_file(Path::new("diagram.png")));
        assert!(!is_text_file(Path::new("Makefile")));
    }

    #[test]
    fn test_directory_scan_filters_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.md");
        touch(tmp.path(), "b.md");
        touch(tmp.path(), "sub/c.md");
        touch(tmp.path(), "one.png");
        touch(tmp.path(), "sub/two.png");

        let files = scan_directory(tmp.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|p| p.extension().unwrap() == "md"));
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_directory_scan_skips_vcs_and_build_dirs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "keep.md");
        touch(tmp.path(), ".git/HEAD.txt");
        touch(tmp.path(), "target/debug/out.txt");
        touch(tmp.path(), "node_modules/pkg/README.md");

        let files = scan_directory(tmp.path()).unwrap();
        assert_eq!(files, vec![tmp.path().join("keep.md")]);
    }

    #[test]
    fn test_resolve_directory() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.md");
        touch(tmp.path(), "b.png");

        let arg = tmp.path().to_str().unwrap();
        match resolve_input_from(arg, &mut io::empty()).unwrap() {
            ResolvedInput::Files(files) => assert_eq!(files, vec![tmp.path().join("a.md")]),
            other => panic!("expected files, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_file() {
        let tmp = TempDir::new().unwrap();
        let path = touch(tmp.path(), "image.png");
        // An explicitly named file is used regardless of extension.
        match resolve_input_from(path.to_str().unwrap(), &mut io::empty()).unwrap() {
            ResolvedInput::File(p) => assert_eq!(p, path),
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[test]
    fn test_glob_expansion() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.md");
        touch(tmp.path(), "b.txt");
        touch(tmp.path(), "nested/c.md");

        let pattern = format!("{}/*.md", tmp.path().display());
        assert_eq!(expand_glob(&pattern).unwrap(), vec![tmp.path().join("a.md")]);

        let pattern = format!("{}/**/*.md", tmp.path().display());
        assert_eq!(
            expand_glob(&pattern).unwrap(),
            vec![tmp.path().join("a.md"), tmp.path().join("nested/c.md")]
        );
    }

    #[test]
    fn test_glob_matching_nothing_is_empty() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.md");
        let pattern = format!("{}/*.rst", tmp.path().display());
        match resolve_input_from(&pattern, &mut io::empty()).unwrap() {
            ResolvedInput::Files(files) => assert!(files.is_empty()),
            other => panic!("expected files, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_glob() {
        let err = expand_glob("notes/[.md").unwrap_err();
        assert!(matches!(err, InputError::InvalidGlob { .. }));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.md");
        let err = resolve_input_from(missing.to_str().unwrap(), &mut io::empty()).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
        assert!(err.to_string().contains("does not exist"));

        let err = resolve_input_from("draft.md", &mut io::empty()).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn test_plain_text_input() {
        let arg = "Rust is a systems language. It has no garbage collector.";
        match resolve_input_from(arg, &mut io::empty()).unwrap() {
            ResolvedInput::Text(doc) => {
                assert_eq!(doc.content, arg);
                assert_eq!(doc.origin, Origin::Text);
            }
            other => panic!("expected text, got {:?}", other),
        }
        // A single word that is not a path is text too.
        assert!(matches!(
            resolve_input_from("hello", &mut io::empty()).unwrap(),
            ResolvedInput::Text(_)
        ));
    }

    #[test]
    fn test_stdin_input() {
        let mut stdin = io::Cursor::new("from a pipe");
        match resolve_input_from("-", &mut stdin).unwrap() {
            ResolvedInput::Text(doc) => {
                assert_eq!(doc.content, "from a pipe");
                assert_eq!(doc.origin, Origin::Stdin);
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_read_and_require_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(read_text_file(tmp.path()), Err(InputError::IsDirectory(_))));
        assert!(matches!(require_file(tmp.path()), Err(InputError::IsDirectory(_))));
        assert!(matches!(
            require_file(&tmp.path().join("nope.md")),
            Err(InputError::NotFound(_))
        ));

        let path = touch(tmp.path(), "ok.md");
        assert_eq!(read_text_file(&path).unwrap(), "content");
        assert!(require_file(&path).is_ok());
    }

    #[test]
    fn test_resolve_file_with_spaces_in_name() {
        let tmp = TempDir::new().unwrap();
        let path = touch(tmp.path(), "My Notes.md");
        match resolve_input_from(path.to_str().unwrap(), &mut io::empty()).unwrap() {
            ResolvedInput::File(p) => assert_eq!(p, path),
            other => panic!("expected file, got {:?}", other),
        }

        touch(tmp.path(), "Meeting Minutes/jan.md");
        let dir = tmp.path().join("Meeting Minutes");
        match resolve_input_from(dir.to_str().unwrap(), &mut io::empty()).unwrap() {
            ResolvedInput::Files(files) => assert_eq!(files, vec![dir.join("jan.md")]),
            other => panic!("expected files, got {:?}", other),
        }
    }

    #[test]
    fn test_skipped_dirs_are_pruned() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "keep.md");
        touch(tmp.path(), "node_modules/pkg/README.md");
        touch(tmp.path(), "docs/target/notes.md");

        let walked: Vec<PathBuf> = WalkDir::new(tmp.path())
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e))
            .map(|e| e.unwrap().into_path())
            .collect();
        assert!(walked.iter().all(|p| !p.ends_with("node_modules")));
        assert!(walked.iter().all(|p| !p.ends_with("docs/target")));
        assert!(walked.contains(&tmp.path().join("docs")));

        let pattern = format!("{}/**/*.md", tmp.path().display());
        assert_eq!(expand_glob(&pattern).unwrap(), vec![tmp.path().join("keep.md")]);

        // A skipped name is still scanned when it is the root itself.
        let files = scan_directory(&tmp.path().join("node_modules")).unwrap();
        assert_eq!(files, vec![tmp.path().join("node_modules/pkg/README.md")]);
    }

    #[test]
    fn test_glob_depth() {
        assert_eq!(glob_depth("*.md", &literal_base("*.md")), Some(1));
        assert_eq!(glob_depth("docs/*.md", &literal_base("docs/*.md")), Some(1));
        assert_eq!(glob_depth("docs/*/a.md", &literal_base("docs/*/a.md")), Some(2));
        assert_eq!(glob_depth("docs/**/*.md", &literal_base("docs/**/*.md")), None);
        assert_eq!(glob_depth("{a,b}/*.md", &literal_base("{a,b}/*.md")), None);
    }

    #[test]
    fn test_literal_base() {
        assert_eq!(literal_base("docs/**/*.md"), PathBuf::from("docs"));
        assert_eq!(literal_base("*.md"), PathBuf::new());
        assert_eq!(literal_base("/tmp/x/a?.md"), PathBuf::from("/tmp/x"));
    }
}
