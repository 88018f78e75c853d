// Command-line helpers for spawning external MCP servers

use std::env;
use std::path::{Path, PathBuf};

/// Split a configured command into program and arguments
pub fn split_command_line(command_line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Locate `program` the way a shell would, checking each `PATH` entry
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .flat_map(|dir| {
            let plain = dir.join(program);
            let windows = dir.join(format!("{}.cmd", program));
            [plain, windows]
        })
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_line() {
        let (program, args) =
            split_command_line("npx -y  @modelcontextprotocol/server-filesystem@2025.8.18").unwrap();
        assert_eq!(program, "npx");
        assert_eq!(args, vec!["-y", "@modelcontextprotocol/server-filesystem@2025.8.18"]);
        assert!(split_command_line("   ").is_none());
    }

    #[test]
    fn test_find_executable() {
        assert!(find_executable("definitely-not-a-real-binary-7f3a").is_none());
        #[cfg(unix)]
        assert!(find_executable("sh").is_some());
    }
}
