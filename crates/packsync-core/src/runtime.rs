//! Bundled Java runtime: resolve an Eclipse Temurin JRE for the pack's Java
//! target, then unpack it under `<install_dir>/jre/<version>`.
//!
//! The archive itself is an ordinary [`FileEntry`] (sha256 from Adoptium), so
//! it is fetched by the coordinator together with the pack files.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::checksum::HashAlgorithm;
use crate::http::HttpClient;
use crate::manifest::FileEntry;

pub const ADOPTIUM_API: &str = "https://api.adoptium.net";
pub const RUNTIME_DIR: &str = "jre";

/// Adoptium `os` and `architecture` query values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaPlatform {
    pub os: &'static str,
    pub arch: &'static str,
}

/// Major version of a Java version string: `17.0.9+9` is 17, `1.8.0_392` is 8.
fn java_major(version: &str) -> Option<u64> {
    let mut parts = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>().ok());
    match parts.next()?? {
        1 => parts.next()?,
        major => Some(major),
    }
}

/// Map a Rust target (`std::env::consts` names) onto Adoptium's platform names.
pub fn platform_for(
    os: &str,
    arch: &str,
    java_version: &str,
    alpine: bool,
) -> Result<JavaPlatform> {
    let unsupported = || anyhow::anyhow!("no Java runtime build for {}/{}", os, arch);
    let platform = match os {
        "linux" => JavaPlatform {
            os: if alpine { "alpine-linux" } else { "linux" },
            arch: match arch {
                "x86_64" => "x64",
                "x86" => "x86",
                "aarch64" => "aarch64",
                "arm" => "arm",
                _ => return Err(unsupported()),
            },
        },
        "windows" => JavaPlatform {
            os: "windows",
            arch: match arch {
                "x86_64" | "aarch64" => "x64",
                "x86" | "arm" => "x86",
                _ => return Err(unsupported()),
            },
        },
        "macos" => JavaPlatform {
            os: "mac",
            arch: match arch {
                // Temurin has no Apple Silicon builds before Java 11.
                "aarch64" if java_major(java_version).is_some_and(|m| m < 11) => "x64",
                "aarch64" => "aarch64",
                "x86_64" => "x64",
                "x86" => "x86",
                _ => return Err(unsupported()),
            },
        },
        _ => return Err(unsupported()),
    };
    Ok(platform)
}

fn current_platform(java_version: &str) -> Result<JavaPlatform> {
    let alpine = Path::new("/etc/alpine-release").exists();
    platform_for(std::env::consts::OS, std::env::consts::ARCH, java_version, alpine)
}

/// Release query for one exact Java version.
pub fn assets_url(api: &str, java_version: &str, platform: JavaPlatform) -> Result<String> {
    let base = format!("{}/v3/assets/version/{}", api.trim_end_matches('/'), java_version);
    let mut url = url::Url::parse(&base).with_context(|| format!("invalid Adoptium URL {}", base))?;
    url.query_pairs_mut()
        .append_pair("architecture", platform.arch)
        .append_pair("heap_size", "normal")
        .append_pair("image_type", "jre")
        .append_pair("os", platform.os)
        .append_pair("page", "0")
        .append_pair("page_size", "10")
        .append_pair("project", "jdk")
        .append_pair("release_type", "ga")
        .append_pair("semver", "false")
        .append_pair("sort_method", "DEFAULT")
        .append_pair("sort_order", "DESC")
        .append_pair("vendor", "eclipse");
    Ok(url.into())
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    binaries: Vec<Binary>,
}

#[derive(Debug, Deserialize)]
struct Binary {
    package: Package,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    link: String,
    #[serde(default)]
    checksum: String,
}

/// Download entry for the newest matching build in an Adoptium assets reply.
pub fn parse_assets(body: &[u8]) -> Result<FileEntry> {
    let releases: Vec<Release> = serde_json::from_slice(body).context("decode Adoptium assets")?;
    let package = releases
        .into_iter()
        .flat_map(|r| r.binaries)
        .map(|b| b.package)
        .next()
        .context("no Java runtime build matches this platform")?;
    let name = if package.name.ends_with(".zip") {
        "jre.zip"
    } else if package.name.ends_with(".tar.gz") {
        "jre.tar.gz"
    } else {
        anyhow::bail!("unsupported runtime archive {}", package.name);
    };
    Ok(FileEntry::new(name, "", package.link).with_hash(HashAlgorithm::Sha256, package.checksum))
}

/// Resolve the runtime archive for `java_version` on this machine.
pub fn runtime_download(http: &HttpClient, api: &str, java_version: &str) -> Result<FileEntry> {
    let url = assets_url(api, java_version, current_platform(java_version)?)?;
    let entry = parse_assets(&http.get_bytes(&url)?)?;
    tracing::debug!(java = java_version, url = %entry.primary_url, "java runtime resolved");
    Ok(entry)
}

/// `jre/<version>/.../java` relative to the install dir, for the given OS.
pub fn java_relative_path_for(os: &str, java_version: &str) -> PathBuf {
    let home = Path::new(RUNTIME_DIR).join(java_version);
    match os {
        "windows" => home.join("bin").join("java.exe"),
        "macos" => home.join("Contents").join("Home").join("bin").join("java"),
        _ => home.join("bin").join("java"),
    }
}

pub fn java_relative_path(java_version: &str) -> PathBuf {
    java_relative_path_for(std::env::consts::OS, java_version)
}

/// Path without its top-level directory; `None` for the directory itself.
fn strip_top(path: &Path) -> Option<PathBuf> {
    let mut parts = path.components().filter(|c| !matches!(c, Component::CurDir));
    parts.next()?;
    let rest: PathBuf = parts.collect();
    (!rest.as_os_str().is_empty()).then_some(rest)
}

fn is_contained(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Unpack `archive` into `dest`, dropping the archive's top-level directory,
/// then delete the archive. Any earlier contents of `dest` are replaced.
pub fn extract_runtime(archive: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest).with_context(|| format!("clear {}", dest.display()))?;
    }
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;

    let name = archive.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(".zip") {
        extract_zip(archive, dest)?;
    } else if name.ends_with(".tar.gz") {
        extract_tar_gz(archive, dest)?;
    } else {
        anyhow::bail!("unsupported runtime archive {}", archive.display());
    }

    if let Err(e) = fs::remove_file(archive) {
        tracing::warn!("could not remove {}: {}", archive.display(), e);
    }
    tracing::info!("java runtime unpacked into {}", dest.display());
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut zip =
        zip::ZipArchive::new(file).with_context(|| format!("read zip {}", archive.display()))?;
    for i in 0..zip.len() {
        let mut item = zip.by_index(i)?;
        let Some(inner) = item.enclosed_name().as_deref().and_then(strip_top) else {
            continue;
        };
        let out = dest.join(inner);
        if item.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut target = File::create(&out).with_context(|| format!("create {}", out.display()))?;
        io::copy(&mut item, &mut target)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = item.unix_mode() {
                fs::set_permissions(&out, fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    for item in tar.entries().with_context(|| format!("read {}", archive.display()))? {
        let mut item = item?;
        let path = item.path()?.into_owned();
        let Some(inner) = strip_top(&path) else {
            continue;
        };
        if !is_contained(&inner) {
            anyhow::bail!("runtime archive entry escapes its directory: {}", path.display());
        }
        let out = dest.join(inner);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        item.unpack(&out).with_context(|| format!("unpack {}", out.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[test]
    fn major_versions() {
        assert_eq!(java_major("17.0.9+9"), Some(17));
        assert_eq!(java_major("21"), Some(21));
        assert_eq!(java_major("1.8.0_392"), Some(8));
        assert_eq!(java_major("8.0.392+8"), Some(8));
        assert_eq!(java_major(""), None);
    }

    #[test]
    fn platform_names() {
        assert_eq!(
            platform_for("linux", "x86_64", "17.0.9+9", false).unwrap(),
            JavaPlatform { os: "linux", arch: "x64" }
        );
        assert_eq!(platform_for("linux", "aarch64", "17", true).unwrap().os, "alpine-linux");
        assert_eq!(platform_for("windows", "aarch64", "17", false).unwrap().arch, "x64");
        assert_eq!(platform_for("macos", "aarch64", "8.0.392+8", false).unwrap().arch, "x64");
        assert_eq!(platform_for("macos", "aarch64", "17.0.9+9", false).unwrap().arch, "aarch64");
        assert!(platform_for("freebsd", "x86_64", "17", false).is_err());
        assert!(platform_for("linux", "riscv64", "17", false).is_err());
    }

    #[test]
    fn assets_query() {
        let url = assets_url(
            "https://api.adoptium.net/",
            "17.0.9+9",
            JavaPlatform { os: "linux", arch: "x64" },
        )
        .unwrap();
        assert!(url.starts_with("https://api.adoptium.net/v3/assets/version/17.0.9+9?architecture=x64&"));
        assert!(url.contains("&image_type=jre&os=linux&"));
        assert!(url.ends_with("&vendor=eclipse"));
    }

    #[test]
    fn assets_reply_becomes_sha256_entry() {
        let body = br#"[{
            "release_name": "jdk-17.0.9+9",
            "binaries": [{
                "architecture": "x64",
                "os": "linux",
                "package": {
                    "name": "OpenJDK17U-jre_x64_linux_hotspot_17.0.9_9.tar.gz",
                    "link": "https://github.com/adoptium/temurin17-binaries/releases/download/x.tar.gz",
                    "checksum": "C37F729200B572884B8F8E157852C739BE728D61D9A1DA0F920104876D324733"
                }
            }]
        }]"#;
        let e = parse_assets(body).unwrap();
        assert_eq!(e.name, "jre.tar.gz");
        assert_eq!(e.relative_path, "");
        assert_eq!(e.algorithm().unwrap(), Some(HashAlgorithm::Sha256));
        assert!(e.primary_url.ends_with("/x.tar.gz"));
    }

    #[test]
    fn empty_assets_reply_is_an_error() {
        assert!(parse_assets(b"[]").is_err());
        assert!(parse_assets(br#"[{"binaries": [{"package": {"name": "x.msi", "link": "u"}}]}]"#).is_err());
    }

    #[test]
    fn java_path_layout() {
        assert_eq!(java_relative_path_for("linux", "17.0.9+9"), PathBuf::from("jre/17.0.9+9/bin/java"));
        assert_eq!(java_relative_path_for("windows", "17"), Path::new("jre/17/bin").join("java.exe"));
        assert_eq!(
            java_relative_path_for("macos", "17"),
            PathBuf::from("jre/17/Contents/Home/bin/java")
        );
    }

    #[test]
    fn strip_top_drops_first_directory() {
        assert_eq!(strip_top(Path::new("jdk-17-jre/bin/java")), Some(PathBuf::from("bin/java")));
        assert_eq!(strip_top(Path::new("./jdk-17-jre/lib")), Some(PathBuf::from("lib")));
        assert_eq!(strip_top(Path::new("jdk-17-jre/")), None);
    }

    #[test]
    fn unpacks_tar_gz_without_top_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("jre.tar.gz");
        {
            let gz = flate2::write::GzEncoder::new(File::create(&archive).unwrap(), flate2::Compression::fast());
            let mut builder = tar::Builder::new(gz);
            let body = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, "jdk-17.0.9+9-jre/bin/java", &body[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }
        let dest = dir.path().join("jre/17.0.9+9");

        extract_runtime(&archive, &dest).unwrap();

        assert_eq!(fs::read(dest.join("bin/java")).unwrap(), b"#!/bin/sh\n");
        assert!(!archive.exists());
    }

    #[test]
    fn unpacks_zip_without_top_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("jre.zip");
        {
            let mut w = zip::ZipWriter::new(File::create(&archive).unwrap());
            w.add_directory("jdk-17-jre/", SimpleFileOptions::default()).unwrap();
            w.start_file("jdk-17-jre/bin/java.exe", SimpleFileOptions::default()).unwrap();
            w.write_all(b"MZ").unwrap();
            w.finish().unwrap();
        }
        let dest = dir.path().join("jre/17");
        fs::create_dir_all(dest.join("stale")).unwrap();

        extract_runtime(&archive, &dest).unwrap();

        assert_eq!(fs::read(dest.join("bin/java.exe")).unwrap(), b"MZ");
        assert!(!dest.join("stale").exists());
        assert!(!archive.exists());
    }
}
