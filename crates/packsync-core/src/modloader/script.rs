//! Launch-file patches applied after an installer run.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::version_at_least;
use crate::checksum::HashAlgorithm;
use crate::manifest::FileEntry;

pub const JVM_ARGS_FILE: &str = "user_jvm_args.txt";

const MOJANG_OBJECTS: &str = "https://launcher.mojang.com/v1/objects";
const PATCH_DIR: &str = ".patches";
const NO_LOOKUPS: &str = "-Dlog4j2.formatMsgNoLookups=true";

/// Run script generated by Forge/NeoForge installers on this platform.
pub fn run_script_path(dir: &Path) -> PathBuf {
    if cfg!(windows) {
        dir.join("run.bat")
    } else {
        dir.join("run.sh")
    }
}

/// Append `-Xmx<recommended>M` (and `extra`, if any) to the JVM args file when
/// it has no `-Xmx` line yet. Returns whether the file was changed; a missing
/// file or an unknown recommendation (0) leaves things alone.
pub fn ensure_xmx(args_file: &Path, recommended_mb: u32, extra: Option<&str>) -> Result<bool> {
    if recommended_mb == 0 || !args_file.is_file() {
        return Ok(false);
    }
    let mut text =
        fs::read_to_string(args_file).with_context(|| format!("read {}", args_file.display()))?;
    if text.lines().any(|l| l.trim_start().starts_with("-Xmx")) {
        return Ok(false);
    }
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&format!("-Xmx{}M\n", recommended_mb));
    if let Some(extra) = extra.filter(|e| !e.is_empty()) {
        text.push_str(extra);
        text.push('\n');
    }
    fs::write(args_file, text).with_context(|| format!("write {}", args_file.display()))?;
    tracing::debug!("added -Xmx{}M to {}", recommended_mb, args_file.display());
    Ok(true)
}

/// Apply `edit` to every `java ...` command line of a run script. `edit`
/// returns `None` to leave a line alone. Returns whether the file changed.
fn rewrite_java_lines(script: &Path, mut edit: impl FnMut(&str) -> Option<String>) -> Result<bool> {
    if !script.is_file() {
        return Ok(false);
    }
    let text = fs::read_to_string(script).with_context(|| format!("read {}", script.display()))?;
    let mut changed = false;
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let is_java_line = line.starts_with("java") && line.len() > "java".len();
            match is_java_line.then(|| edit(line)).flatten() {
                Some(new) => {
                    changed = true;
                    new
                }
                None => line.to_string(),
            }
        })
        .collect();

    if changed {
        let mut out = lines.join("\n");
        out.push('\n');
        fs::write(script, out).with_context(|| format!("write {}", script.display()))?;
    }
    Ok(changed)
}

/// Add `nogui` to the `java ...` line of a run script so the server starts
/// headless. `.bat` scripts pass arguments through `%*`, shell scripts through `"$@"`.
pub fn add_nogui(script: &Path) -> Result<bool> {
    let is_bat = script
        .extension()
        .map(|e| e.eq_ignore_ascii_case("bat") || e.eq_ignore_ascii_case("cmd"))
        .unwrap_or(false);
    let (placeholder, replacement) = if is_bat {
        ("%*", "nogui %*")
    } else {
        ("\"$@\"", "nogui \"$@\"")
    };
    let changed = rewrite_java_lines(script, |line| {
        if line.contains("nogui") {
            None
        } else if line.contains(placeholder) {
            Some(line.replacen(placeholder, replacement, 1))
        } else {
            Some(format!("{} nogui", line))
        }
    })?;
    if changed {
        tracing::debug!("added nogui to {}", script.display());
    }
    Ok(changed)
}

/// Point the run script's `java` command at a bundled runtime.
pub fn use_java(script: &Path, java: &Path) -> Result<bool> {
    let changed = rewrite_java_lines(script, |line| {
        line.strip_prefix("java ")
            .map(|rest| format!("\"{}\" {}", java.display(), rest))
    })?;
    if changed {
        tracing::debug!("{} now launches {}", script.display(), java.display());
    }
    Ok(changed)
}

/// Write `start.sh` / `start.bat` launching `jar` headless with `jvm_args`.
pub fn write_start_script(
    dir: &Path,
    java: &Path,
    jvm_args: &[String],
    jar: &str,
) -> Result<PathBuf> {
    let args = jvm_args.iter().filter(|a| !a.is_empty()).cloned().collect::<Vec<_>>().join(" ");
    let command = if args.is_empty() {
        format!("\"{}\" -jar {} nogui", java.display(), jar)
    } else {
        format!("\"{}\" {} -jar {} nogui", java.display(), args, jar)
    };
    let path = if cfg!(windows) {
        let path = dir.join("start.bat");
        fs::write(&path, format!("{}\r\n", command))
            .with_context(|| format!("write {}", path.display()))?;
        path
    } else {
        let path = dir.join("start.sh");
        fs::write(&path, format!("#!/usr/bin/env sh\n{}\n", command))
            .with_context(|| format!("write {}", path.display()))?;
        make_executable(&path)?;
        path
    };
    tracing::info!("wrote start script {}", path.display());
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Log4Shell mitigation for a game version: a JVM flag and, for 1.7 to 1.16.5,
/// a patched log4j config to download into `.patches/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log4jFix {
    pub jvm_flag: Option<String>,
    pub patch: Option<FileEntry>,
}

pub fn log4j_mitigation(mc_version: &str) -> Log4jFix {
    let in_range =
        |lo: &str, hi: &str| version_at_least(mc_version, lo) && version_at_least(hi, mc_version);
    let patched = |name: &str, sha1: &str| {
        let entry = FileEntry::new(name, PATCH_DIR, format!("{}/{}/{}", MOJANG_OBJECTS, sha1, name))
            .with_hash(HashAlgorithm::Sha1, sha1);
        Log4jFix {
            jvm_flag: Some(format!("-Dlog4j.configurationFile={}/{}", PATCH_DIR, name)),
            patch: Some(entry),
        }
    };

    if version_at_least(mc_version, "1.17") {
        Log4jFix {
            jvm_flag: Some(NO_LOOKUPS.to_string()),
            patch: None,
        }
    } else if in_range("1.12", "1.16.5") {
        patched("log4j2_112-116.xml", "02937d122c86ce73319ef9975b58896fc1b491d1")
    } else if in_range("1.7", "1.11.2") {
        patched("log4j2_17-111.xml", "4bb89a97a66f350bc9f73b3ca8509632682aea2e")
    } else {
        Log4jFix::default()
    }
}
