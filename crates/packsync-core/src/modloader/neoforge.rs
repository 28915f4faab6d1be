//! NeoForge. Builds for 1.20.1 were published as `net.neoforged:forge`; from
//! 1.20.2 on the artifact is `net.neoforged:neoforge`.

use anyhow::Result;

use super::script::{ensure_xmx, run_script_path, JVM_ARGS_FILE};
use super::{
    artifact_path, patch_run_script, remove_installer, run_installer, version_at_least,
    InstallContext, LoaderEndpoints,
};
use crate::manifest::FileEntry;

const SPLIT_MC_VERSION: &str = "1.20.2";

pub(super) fn installer(endpoints: &LoaderEndpoints, mc_version: &str, version: &str) -> FileEntry {
    let maven = endpoints.neoforge_maven.trim_end_matches('/');
    let (name, url) = if version_at_least(mc_version, SPLIT_MC_VERSION) {
        let name = format!("neoforge-{}-installer.jar", version);
        let url = format!("{}/releases/net/neoforged/neoforge/{}/{}", maven, version, name);
        (name, url)
    } else {
        let name = format!("forge-{}-{}-installer.jar", mc_version, version);
        let url =
            format!("{}/releases/net/neoforged/forge/{}-{}/{}", maven, mc_version, version, name);
        (name, url)
    };
    FileEntry::new(name, "", url)
}

pub(super) fn install(ctx: &InstallContext<'_>, artifacts: &[FileEntry]) -> Result<()> {
    let (path, name) = artifact_path(ctx, artifacts, "-installer.jar")?;
    run_installer(ctx, "neoforge", &name, &["--installServer"])?;
    remove_installer(&path);

    ensure_xmx(&ctx.install_dir.join(JVM_ARGS_FILE), ctx.memory.recommended, None)?;
    patch_run_script(ctx, &run_script_path(ctx.install_dir))?;
    Ok(())
}
