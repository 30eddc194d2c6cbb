use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::diagnostics::Diagnostic;

/// Derives the statement namespace of `type_name` declared in `dir`.
///
/// `package main` yields `main.<Type>`. Any other package yields the module
/// path from the nearest `go.mod`, followed by the package directory relative
/// to the module root, dot separated.
pub fn autocomplete(dir: &Path, package: &str, type_name: &str) -> Result<String> {
    if package == "main" {
        return Ok(format!("main.{type_name}"));
    }

    let dir = dir
        .canonicalize()
        .with_context(|| format!("resolve package dir: {}", dir.display()))?;
    let (root, module) = find_module(&dir)?;
    let rel = dir.strip_prefix(&root).unwrap_or(Path::new(""));

    let mut segments: Vec<String> = module
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    for comp in rel.components() {
        if let Component::Normal(seg) = comp {
            segments.push(seg.to_string_lossy().into_owned());
        }
    }
    segments.push(type_name.to_string());
    Ok(segments.join("."))
}

/// Nearest directory at or above `dir` holding a `go.mod`, with its module path.
pub fn find_module(dir: &Path) -> Result<(PathBuf, String)> {
    for candidate in dir.ancestors() {
        let go_mod = candidate.join("go.mod");
        if !go_mod.is_file() {
            continue;
        }
        let src = std::fs::read_to_string(&go_mod)
            .with_context(|| format!("read {}", go_mod.display()))?;
        let module = module_path(&src).ok_or_else(|| {
            Diagnostic::config(format!("{}: missing module directive", go_mod.display()))
        })?;
        tracing::debug!(go_mod = %go_mod.display(), module = %module, "found module");
        return Ok((candidate.to_path_buf(), module));
    }
    Err(Diagnostic::config(format!(
        "go.mod not found above {}; pass --namespace explicitly",
        dir.display()
    ))
    .into())
}

fn module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}
