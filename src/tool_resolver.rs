//! # Tool Path Resolver
//!
//! Trova i tool esterni del codec in diversi ambienti:
//! - directory indicata da `SVG_OPTIMIZER_TOOLS_DIR`
//! - directory `tools/` accanto all'eseguibile
//! - PATH di sistema

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing to a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "SVG_OPTIMIZER_TOOLS_DIR";

/// Tool path resolver for bundled and system tools
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPathResolver {
    pub fn new() -> Self {
        Self {
            tools_dir: Self::detect_bundled_tools_dir(),
        }
    }

    /// Resolver with an explicit tools directory
    pub fn with_tools_dir(tools_dir: Option<PathBuf>) -> Self {
        Self { tools_dir }
    }

    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        if let Ok(tools_dir) = env::var(TOOLS_DIR_ENV) {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking {}: {:?}", TOOLS_DIR_ENV, tools_path);
            if tools_path.is_dir() {
                return Some(tools_path);
            }
        }

        let exe_path = env::current_exe().ok()?;
        let tools_path = exe_path.parent()?.join("tools");
        debug!("Checking tools next to executable: {:?}", tools_path);
        tools_path.is_dir().then_some(tools_path)
    }

    /// Resolve the path to a specific tool, bundled tools first
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = Self::bundled_tool_path(tools_dir, tool_name);
            if bundled_path.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
        }

        let system_path = Self::find_in_system_path(tool_name);
        match system_path {
            Some(ref path) => debug!("Using system tool: {} -> {:?}", tool_name, path),
            None => debug!("Tool not found: {}", tool_name),
        }
        system_path
    }

    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> PathBuf {
        let extension = if cfg!(windows) && !tool_name.ends_with(".exe") { ".exe" } else { "" };
        tools_dir.join(format!("{}{}", tool_name, extension))
    }

    fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
        let extension = if cfg!(windows) && !tool_name.ends_with(".exe") { ".exe" } else { "" };
        let tool_with_ext = format!("{}{}", tool_name, extension);

        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }
}
