use std::path::Path;

use anyhow::Context;
use dotinterop::{builder::Builder, metadata::catalog::MetadataCatalog};

/// Load a builder configuration, applying the command-line metadata override.
pub fn load_builder(config: &Path, winmd: Option<&Path>) -> anyhow::Result<Builder> {
    let builder = Builder::from_file(config)
        .with_context(|| format!("failed to load configuration: {}", config.display()))?;

    Ok(match winmd {
        Some(path) => builder.with_win_md(path),
        None => builder,
    })
}

/// Decode a WinMD image.
pub fn load_catalog(path: &Path) -> anyhow::Result<MetadataCatalog> {
    MetadataCatalog::from_file(path)
        .with_context(|| format!("failed to load metadata: {}", path.display()))
}

/// Decode the image a builder points at.
pub fn load_builder_catalog(builder: &Builder) -> anyhow::Result<MetadataCatalog> {
    let path = builder.win_md_path()?;
    builder
        .load_catalog()
        .with_context(|| format!("failed to load metadata: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    #[test]
    fn winmd_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("win32.json");
        std::fs::write(
            &config,
            r#"{ "WinMdPath": "meta/Windows.Win32.winmd", "TypeInputs": [ { "Name": "HWND" } ] }"#,
        )
        .unwrap();

        let configured = load_builder(&config, None).unwrap();
        assert_eq!(
            configured.win_md_path().unwrap(),
            dir.path().join("meta/Windows.Win32.winmd")
        );

        let overridden = load_builder(&config, Some(Path::new("other.winmd"))).unwrap();
        assert_eq!(
            overridden.win_md_path().unwrap(),
            PathBuf::from("other.winmd")
        );
    }

    #[test]
    fn missing_configuration_names_the_file() {
        let err = load_builder(Path::new("does/not/exist.json"), None).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.json"));
    }

    #[test]
    fn missing_winmd_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("empty.json");
        std::fs::write(&config, "{}").unwrap();

        let builder = load_builder(&config, None).unwrap();
        assert!(load_builder_catalog(&builder).is_err());
    }
}
