use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;
use tokio::process::Command;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::systems::System;

/// Most matches grep reports before stopping
const GREP_MAX_HITS: usize = 50;

/// File and shell tools operating relative to a root directory
pub struct DeveloperSystem {
    tools: Vec<Tool>,
    root: PathBuf,
}

impl Default for DeveloperSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DeveloperSystem {
    /// Tools rooted at the process working directory
    pub fn new() -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_root(root)
    }

    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        let read_tool = Tool::new(
            "read",
            "Read file with line numbers (file path, not directory)",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "offset": {"type": "integer"},
                    "limit": {"type": "integer"}
                },
                "required": ["path"]
            }),
        );

        let write_tool = Tool::new(
            "write",
            "Write content to file",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["path", "content"]
            }),
        );

        let edit_tool = Tool::new(
            "edit",
            "Replace old with new in file (old must be unique unless all=true)",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "old": {"type": "string"},
                    "new": {"type": "string"},
                    "all": {"type": "boolean"}
                },
                "required": ["path", "old", "new"]
            }),
        );

        let glob_tool = Tool::new(
            "glob",
            "Find files by pattern, sorted by mtime",
            json!({
                "type": "object",
                "properties": {
                    "pat": {"type": "string"},
                    "path": {"type": "string"}
                },
                "required": ["pat"]
            }),
        );

        let grep_tool = Tool::new(
            "grep",
            "Search files for regex pattern",
            json!({
                "type": "object",
                "properties": {
                    "pat": {"type": "string"},
                    "path": {"type": "string"}
                },
                "required": ["pat"]
            }),
        );

        let bash_tool = Tool::new(
            "bash",
            "Run shell command",
            json!({
                "type": "object",
                "properties": {
                    "cmd": {"type": "string"}
                },
                "required": ["cmd"]
            }),
        );

        Self {
            tools: vec![read_tool, write_tool, edit_tool, glob_tool, grep_tool, bash_tool],
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Helper method to resolve a path relative to the root
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read(&self, params: &Value) -> AgentResult<String> {
        let path = string_param(params, "path")?;
        let offset = params.get("offset").and_then(Value::as_i64).unwrap_or(0).max(0) as usize;
        let limit = params
            .get("limit")
            .and_then(Value::as_i64)
            .filter(|limit| *limit >= 0)
            .map(|limit| limit as usize);

        let bytes = fs::read(self.resolve_path(path))
            .map_err(|_| AgentError::ExecutionError(format!("could not open {path}")))?;
        let text = String::from_utf8_lossy(&bytes);

        Ok(text
            .lines()
            .enumerate()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(index, line)| format!("{:4}| {}\n", index + 1, line))
            .collect())
    }

    fn write(&self, params: &Value) -> AgentResult<String> {
        let path = string_param(params, "path")?;
        let content = params.get("content").and_then(Value::as_str).unwrap_or_default();

        fs::write(self.resolve_path(path), content).map_err(|_| {
            AgentError::ExecutionError(format!("could not open {path} for writing"))
        })?;
        Ok("ok".to_string())
    }

    fn edit(&self, params: &Value) -> AgentResult<String> {
        let path = string_param(params, "path")?;
        let old = string_param(params, "old")?;
        let new = params.get("new").and_then(Value::as_str).unwrap_or_default();
        let all = params.get("all").and_then(Value::as_bool).unwrap_or(false);

        if old.is_empty() {
            return Err(AgentError::InvalidParameters("'old' must not be empty".into()));
        }

        let resolved = self.resolve_path(path);
        let text = fs::read_to_string(&resolved)
            .map_err(|_| AgentError::ExecutionError(format!("could not open {path}")))?;

        let count = text.matches(old).count();
        if count == 0 {
            return Err(AgentError::ExecutionError("old_string not found".into()));
        }
        if count > 1 && !all {
            return Err(AgentError::ExecutionError(format!(
                "old_string appears {count} times, must be unique (use all=true)"
            )));
        }

        let updated = if all {
            text.replace(old, new)
        } else {
            text.replacen(old, new, 1)
        };
        fs::write(&resolved, updated).map_err(|_| {
            AgentError::ExecutionError(format!("could not open {path} for writing"))
        })?;
        Ok("ok".to_string())
    }

    fn glob(&self, params: &Value) -> AgentResult<String> {
        let pat = string_param(params, "pat")?;
        let base = search_base(params);
        let pattern = Regex::new(&glob_to_regex(pat))
            .map_err(|_| AgentError::ExecutionError("invalid glob pattern".into()))?;

        let start = self.resolve_path(base);
        if !start.exists() {
            return Ok("none".to_string());
        }

        let mut matched: Vec<(SystemTime, PathBuf)> = Vec::new();
        walk_files(&start, &mut |file| {
            let relative = file.strip_prefix(&start).unwrap_or(file);
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let shown = shown_path(base, relative);

            if pattern.is_match(&relative_str)
                || pattern.is_match(&file_name)
                || (pat.contains('/') && pattern.is_match(&shown.to_string_lossy()))
            {
                let modified = fs::metadata(file)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                matched.push((modified, shown));
            }
            true
        });

        if matched.is_empty() {
            return Ok("none".to_string());
        }
        matched.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(matched
            .iter()
            .map(|(_, path)| path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn grep(&self, params: &Value) -> AgentResult<String> {
        let pat = string_param(params, "pat")?;
        let base = search_base(params);
        let pattern = Regex::new(pat)
            .map_err(|_| AgentError::ExecutionError("invalid regex pattern".into()))?;

        let start = self.resolve_path(base);
        if !start.exists() {
            return Ok("none".to_string());
        }

        let mut hits = Vec::new();
        walk_files(&start, &mut |file| {
            let Ok(bytes) = fs::read(file) else {
                return true;
            };
            let shown = shown_path(base, file.strip_prefix(&start).unwrap_or(file));
            for (index, line) in String::from_utf8_lossy(&bytes).lines().enumerate() {
                if pattern.is_match(line) {
                    hits.push(format!("{}:{}:{}", shown.display(), index + 1, line));
                    if hits.len() >= GREP_MAX_HITS {
                        return false;
                    }
                }
            }
            true
        });

        if hits.is_empty() {
            return Ok("none".to_string());
        }
        Ok(hits.join("\n"))
    }

    async fn bash(&self, params: &Value) -> AgentResult<String> {
        let cmd = string_param(params, "cmd")?;

        // stderr is folded into stdout by the shell so the model sees them interleaved
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("{cmd} 2>&1"))
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("failed to run command: {e}")))?;

        let mut result = String::from_utf8_lossy(&output.stdout).into_owned();
        if result.is_empty() {
            return Ok("(empty)".to_string());
        }
        let trimmed = result.trim_end_matches(['\n', '\r']).len();
        result.truncate(trimmed);
        Ok(result)
    }
}

#[async_trait]
impl System for DeveloperSystem {
    fn name(&self) -> &str {
        "DeveloperSystem"
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        let params = &tool_call.arguments;
        match tool_call.name.as_str() {
            "read" => self.read(params),
            "write" => self.write(params),
            "edit" => self.edit(params),
            "glob" => self.glob(params),
            "grep" => self.grep(params),
            "bash" => self.bash(params).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}

fn string_param<'a>(params: &'a Value, name: &str) -> AgentResult<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidParameters(format!("missing '{name}' parameter")))
}

/// The directory a search starts from, `.` when absent or empty
fn search_base(params: &Value) -> &str {
    params
        .get("path")
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
        .unwrap_or(".")
}

/// How a found file is reported: under the search base exactly as the caller wrote it
fn shown_path(base: &str, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        PathBuf::from(base)
    } else {
        Path::new(base).join(relative)
    }
}

/// Convert a shell-style glob into an anchored regex. `**` crosses directories,
/// `*` stays within one path segment.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                regex.push_str(".*");
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push('.'),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    regex
}

/// Visit every regular file under `dir` in name order. Unreadable entries are
/// skipped. The visitor returns false to stop the walk.
fn walk_files(dir: &Path, visit: &mut dyn FnMut(&Path) -> bool) -> bool {
    if dir.is_file() {
        return visit(dir);
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return true;
    };
    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let keep_going = if file_type.is_dir() {
            walk_files(&path, visit)
        } else if path.is_file() {
            visit(&path)
        } else {
            true
        };
        if !keep_going {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn setup() -> Result<(TempDir, DeveloperSystem)> {
        let dir = tempfile::tempdir()?;
        let system = DeveloperSystem::with_root(dir.path());
        Ok((dir, system))
    }

    async fn call(system: &DeveloperSystem, name: &str, args: Value) -> AgentResult<String> {
        system.call(ToolCall::new(name, args)).await
    }

    #[test]
    fn test_tool_schemas() {
        let system = DeveloperSystem::with_root(".");
        let names: Vec<&str> = system.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["read", "write", "edit", "glob", "grep", "bash"]);
        assert_eq!(system.tools()[2].input_schema["required"], json!(["path", "old", "new"]));
    }

    #[test]
    fn test_glob_to_regex() {
        assert_eq!(glob_to_regex("*.rs"), "^[^/]*\\.rs$");
        assert_eq!(glob_to_regex("src/**"), "^src/.*$");
        assert_eq!(glob_to_regex("a?c"), "^a.c$");
        assert!(Regex::new(&glob_to_regex("file(1)+.txt")).is_ok());
    }

    #[tokio::test]
    async fn test_write_then_read_with_offset() -> Result<()> {
        let (_dir, system) = setup()?;
        let written = call(&system, "write", json!({"path": "a.txt", "content": "one\ntwo\nthree\n"})).await?;
        assert_eq!(written, "ok");

        let all = call(&system, "read", json!({"path": "a.txt"})).await?;
        assert_eq!(all, "   1| one\n   2| two\n   3| three\n");

        let window = call(&system, "read", json!({"path": "a.txt", "offset": 1, "limit": 1})).await?;
        assert_eq!(window, "   2| two\n");

        let past_end = call(&system, "read", json!({"path": "a.txt", "offset": 10})).await?;
        assert_eq!(past_end, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_missing_file() -> Result<()> {
        let (_dir, system) = setup()?;
        let error = call(&system, "read", json!({"path": "nope.txt"})).await.unwrap_err();
        assert_eq!(format!("error: {error}"), "error: could not open nope.txt");

        let error = call(&system, "read", json!({})).await.unwrap_err();
        assert!(matches!(error, AgentError::InvalidParameters(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_uniqueness() -> Result<()> {
        let (dir, system) = setup()?;
        fs::write(dir.path().join("f.txt"), "foo bar foo")?;

        let error = call(&system, "edit", json!({"path": "f.txt", "old": "foo", "new": "baz"}))
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "old_string appears 2 times, must be unique (use all=true)"
        );

        let error = call(&system, "edit", json!({"path": "f.txt", "old": "qux", "new": "x"}))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "old_string not found");

        call(&system, "edit", json!({"path": "f.txt", "old": "bar", "new": "BAR"})).await?;
        assert_eq!(fs::read_to_string(dir.path().join("f.txt"))?, "foo BAR foo");

        call(&system, "edit", json!({"path": "f.txt", "old": "foo", "new": "x", "all": true})).await?;
        assert_eq!(fs::read_to_string(dir.path().join("f.txt"))?, "x BAR x");
        Ok(())
    }

    #[tokio::test]
    async fn test_glob_matches_names_and_paths() -> Result<()> {
        let (dir, system) = setup()?;
        fs::create_dir_all(dir.path().join("src/nested"))?;
        fs::write(dir.path().join("src/lib.rs"), "")?;
        fs::write(dir.path().join("src/nested/mod.rs"), "")?;
        fs::write(dir.path().join("README.md"), "")?;

        let found = call(&system, "glob", json!({"pat": "*.rs"})).await?;
        let mut lines: Vec<&str> = found.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["./src/lib.rs", "./src/nested/mod.rs"]);

        let found = call(&system, "glob", json!({"pat": "src/*.rs"})).await?;
        assert_eq!(found, "./src/lib.rs");

        let found = call(&system, "glob", json!({"pat": "*.py"})).await?;
        assert_eq!(found, "none");

        let found = call(&system, "glob", json!({"pat": "*", "path": "missing"})).await?;
        assert_eq!(found, "none");
        Ok(())
    }

    #[tokio::test]
    async fn test_grep() -> Result<()> {
        let (dir, system) = setup()?;
        fs::create_dir_all(dir.path().join("src"))?;
        fs::write(dir.path().join("src/a.rs"), "fn main() {}\nlet x = 1;\nfn helper() {}\n")?;

        let found = call(&system, "grep", json!({"pat": "^fn ", "path": "src"})).await?;
        assert_eq!(found, "src/a.rs:1:fn main() {}\nsrc/a.rs:3:fn helper() {}");

        let found = call(&system, "grep", json!({"pat": "absent"})).await?;
        assert_eq!(found, "none");

        let error = call(&system, "grep", json!({"pat": "("})).await.unwrap_err();
        assert_eq!(format!("error: {error}"), "error: invalid regex pattern");
        Ok(())
    }

    #[tokio::test]
    async fn test_grep_caps_hits() -> Result<()> {
        let (dir, system) = setup()?;
        let content: String = (0..80).map(|i| format!("match {i}\n")).collect();
        fs::write(dir.path().join("many.txt"), content)?;

        let found = call(&system, "grep", json!({"pat": "match"})).await?;
        assert_eq!(found.lines().count(), GREP_MAX_HITS);
        Ok(())
    }

    #[tokio::test]
    async fn test_bash() -> Result<()> {
        let (_dir, system) = setup()?;
        let output = call(&system, "bash", json!({"cmd": "echo hello; echo oops >&2"})).await?;
        assert_eq!(output, "hello\noops");

        let output = call(&system, "bash", json!({"cmd": "true"})).await?;
        assert_eq!(output, "(empty)");

        call(&system, "write", json!({"path": "x.txt", "content": "hi"})).await?;
        let output = call(&system, "bash", json!({"cmd": "cat x.txt"})).await?;
        assert_eq!(output, "hi");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let system = DeveloperSystem::with_root(".");
        let error = call(&system, "fetch_url", json!({})).await.unwrap_err();
        assert!(matches!(error, AgentError::ToolNotFound(name) if name == "fetch_url"));
    }
}
