//! Test utilities and mocks for sitterpack unit tests.
//!
//! [`MockHost`] is an in-memory [`Host`]: files live in a map and commands
//! are answered from a list of expectations. Expectations can write files
//! as a side effect, which is how a mocked `tree-sitter build` produces its
//! artifact.
//!
//! # Example
//!
//! ```rust,ignore
//! use sitterpack::test_support::{CommandExpectation, MockHost, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let host = MockHost::new("/project");
//!     host.add_file("g/tree-sitter.json", tree_sitter_json("g"));
//!     host.expect(CommandExpectation::exact(
//!         "tree-sitter --version",
//!         MockProcessOutput::success("tree-sitter 0.22.6"),
//!     ));
//! }
//! ```

pub mod fixtures;

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};

use crate::host::{Host, OpenFile};
use crate::util::fs::absolutize;
use crate::util::process::{ProcessBuilder, ProcessOutput, ProcessStatus};

pub use fixtures::*;

/// Mock filesystem for testing without real I/O.
///
/// Paths are stored absolute.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        MockFileSystem::default()
    }

    /// Add a file with the given content, creating parent directories.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path, content.into());
    }

    /// Add a directory and all its parents.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    pub fn read(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    pub fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    pub fn remove_file(&mut self, path: &Path) -> bool {
        self.files.remove(path).is_some()
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }
}

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn to_output(&self) -> ProcessOutput {
        ProcessOutput {
            success: self.status == 0,
            code: Some(self.status),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands.
///
/// Commands are matched against [`ProcessBuilder::display_command`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
    /// Files written when the command runs.
    pub creates: Vec<(PathBuf, Vec<u8>)>,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
            creates: Vec::new(),
        }
    }

    pub fn exact(cmd: &str, output: MockProcessOutput) -> Self {
        Self::new(CommandPattern::Exact(cmd.to_string()), output)
    }

    pub fn starts_with(prefix: &str, output: MockProcessOutput) -> Self {
        Self::new(CommandPattern::StartsWith(prefix.to_string()), output)
    }

    pub fn contains(substring: &str, output: MockProcessOutput) -> Self {
        Self::new(CommandPattern::Contains(substring.to_string()), output)
    }

    pub fn any(output: MockProcessOutput) -> Self {
        Self::new(CommandPattern::Any, output)
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Write `content` to `path` whenever the command runs.
    pub fn creates(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.creates.push((path.into(), content.into()));
        self
    }

    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// A command the mock host was asked to run.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: String,
    pub process: ProcessBuilder,
}

#[derive(Debug, Default)]
struct MockState {
    fs: MockFileSystem,
    expectations: Vec<CommandExpectation>,
    interactive_expectations: Vec<CommandExpectation>,
    calls: Vec<RecordedCall>,
    interactive_calls: Vec<RecordedCall>,
    create_dir_error: Option<io::ErrorKind>,
    env: BTreeMap<String, String>,
}

/// In-memory [`Host`].
#[derive(Debug)]
pub struct MockHost {
    root: PathBuf,
    state: Mutex<MockState>,
}

impl MockHost {
    /// Create an empty host rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut state = MockState::default();
        state.fs.add_dir(&root);
        MockHost {
            root,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a file; relative paths are taken from the root.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = self.resolve(path.as_ref());
        self.state().fs.add_file(path, content);
    }

    /// Add a directory; relative paths are taken from the root.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.resolve(path.as_ref());
        self.state().fs.add_dir(path);
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let path = self.resolve(path.as_ref());
        self.state().fs.remove_file(&path)
    }

    /// Contents of a file, if present.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = self.resolve(path.as_ref());
        self.state().fs.read(&path).map(<[u8]>::to_vec)
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.state().fs.files()
    }

    /// Set an environment variable seen through [`Host::env_var`].
    pub fn set_env(&self, name: &str, value: &str) {
        self.state().env.insert(name.to_string(), value.to_string());
    }

    /// Make every `create_dir_all` fail with `kind`.
    pub fn fail_create_dir(&self, kind: io::ErrorKind) {
        self.state().create_dir_error = Some(kind);
    }

    /// Answer captured executions matching `expectation`.
    pub fn expect(&self, expectation: CommandExpectation) {
        self.state().expectations.push(expectation);
    }

    /// Answer interactive executions matching `expectation`.
    pub fn expect_interactive(&self, expectation: CommandExpectation) {
        self.state().interactive_expectations.push(expectation);
    }

    /// Captured executions so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Interactive executions so far.
    pub fn interactive_calls(&self) -> Vec<RecordedCall> {
        self.state().interactive_calls.clone()
    }

    /// Number of captured executions whose command contains `needle`.
    pub fn count_calls(&self, needle: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.command.contains(needle))
            .count()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.interactive_calls.clear();
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        let state = self.state();
        let all = state
            .expectations
            .iter()
            .chain(state.interactive_expectations.iter());
        for (i, exp) in all.enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} ({:?}) was used {} times, expected {}",
                        i,
                        exp.pattern,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }

    fn run(&self, cmd: &ProcessBuilder, interactive: bool) -> Result<ProcessOutput> {
        let command = cmd.display_command();
        let mut state = self.state();
        let MockState {
            fs,
            expectations,
            interactive_expectations,
            calls,
            interactive_calls,
            ..
        } = &mut *state;

        let (expectations, calls) = if interactive {
            (interactive_expectations, interactive_calls)
        } else {
            (expectations, calls)
        };

        calls.push(RecordedCall {
            command: command.clone(),
            process: cmd.clone(),
        });

        let Some(exp) = expectations
            .iter_mut()
            .find(|e| e.available() && e.pattern.matches(&command))
        else {
            bail!("unexpected command: {}", command);
        };

        exp.used += 1;
        for (path, content) in &exp.creates {
            fs.add_file(absolutize(&self.root, path), content.clone());
        }
        Ok(exp.output.to_output())
    }
}

impl Host for MockHost {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        let path = self.resolve(path);
        self.state().fs.exists(&path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.resolve(path);
        self.state().fs.is_file(&path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path);
        let mut state = self.state();
        if let Some(kind) = state.create_dir_error {
            return Err(io::Error::new(kind, format!("mock failure for {}", path.display())));
        }
        if state.fs.is_file(&path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "file exists"));
        }
        state.fs.add_dir(path);
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = self.resolve(path);
        self.state()
            .fs
            .read(&path)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn open(&self, path: &Path) -> io::Result<OpenFile> {
        let bytes = self.read(path)?;
        let len = bytes.len() as u64;
        Ok(OpenFile {
            reader: Box::new(Cursor::new(bytes)),
            len,
        })
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.state().env.get(name).cloned()
    }

    fn execute(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        self.run(cmd, false)
    }

    fn execute_interactive(&self, cmd: &ProcessBuilder) -> Result<ProcessStatus> {
        let output = self.run(cmd, true)?;
        Ok(ProcessStatus {
            success: output.success,
            code: output.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_relative_to_root() {
        let host = MockHost::new("/project");
        host.add_file("g/tree-sitter.json", "{}");

        assert!(host.is_file(Path::new("/project/g/tree-sitter.json")));
        assert!(host.is_file(Path::new("g/tree-sitter.json")));
        assert!(host.exists(Path::new("/project/g")));
        assert!(!host.is_file(Path::new("/project/g")));
        assert_eq!(host.read_to_string(Path::new("g/tree-sitter.json")).unwrap(), "{}");
        assert_eq!(
            host.read(Path::new("missing")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_expectations_and_side_effects() {
        let host = MockHost::new("/project");
        host.expect(
            CommandExpectation::starts_with("tree-sitter build", MockProcessOutput::success(""))
                .times(1)
                .creates("out.wasm", b"\0asm".to_vec()),
        );

        let cmd = ProcessBuilder::new("tree-sitter").args(["build", "--wasm"]);
        assert!(host.execute(&cmd).unwrap().success);
        assert_eq!(host.file("out.wasm").unwrap(), b"\0asm");
        host.verify().unwrap();

        // Exhausted expectation behaves like a missing program.
        assert!(host.execute(&cmd).is_err());
        assert_eq!(host.calls().len(), 2);
        assert_eq!(host.count_calls("build"), 2);
    }

    #[test]
    fn test_interactive_calls_are_separate() {
        let host = MockHost::new("/project");
        host.expect_interactive(CommandExpectation::any(MockProcessOutput::failure(2, "")));

        let status = host
            .execute_interactive(&ProcessBuilder::new("tree-sitter").arg("init"))
            .unwrap();
        assert!(!status.success);
        assert_eq!(status.code, Some(2));
        assert!(host.calls().is_empty());
        assert_eq!(host.interactive_calls().len(), 1);
    }

    #[test]
    fn test_verify_reports_unused() {
        let host = MockHost::new("/project");
        host.expect(CommandExpectation::any(MockProcessOutput::default()).times(1));
        assert!(host.verify().is_err());
    }

    #[test]
    fn test_command_patterns() {
        assert!(CommandPattern::Exact("a b".into()).matches("a b"));
        assert!(!CommandPattern::Exact("a b".into()).matches("a b c"));
        assert!(CommandPattern::StartsWith("a".into()).matches("a b"));
        assert!(CommandPattern::Contains("--wasm".into()).matches("ts build --wasm x"));
        assert!(CommandPattern::Regex(r"^emcc .*SIDE_MODULE=1".into()).matches("emcc -s SIDE_MODULE=1"));
        assert!(CommandPattern::Any.matches(""));
    }
}
