//! Pass model directory loading.
//!
//! A model is a directory laid out like an unsigned bundle:
//!
//! ```text
//! Flowers.pass/
//!   pass.json
//!   icon.png
//!   logo@2x.png
//!   fr.lproj/
//!     pass.strings
//!     logo.png
//! ```

use pkpass::pass::{ImageKey, ImageSet, Localizations, PassDescriptor};
use pkpass::{Error, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug)]
pub struct PassModel {
    pub descriptor: PassDescriptor,
    pub images: ImageSet,
    pub localizations: Localizations,
}

/// Load a model directory. Image and strings files are registered by path
/// and read when the bundle is assembled.
pub fn load_model(dir: &Path) -> Result<PassModel> {
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "Pass model is not a directory: {}",
            dir.display()
        )));
    }

    let pass_json = dir.join("pass.json");
    let data = fs::read(&pass_json).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", pass_json.display(), e),
        ))
    })?;
    let descriptor = PassDescriptor::from_json(&data)?;

    let mut images = ImageSet::new();
    let mut localizations = Localizations::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Io(std::io::Error::other(format!("Failed to walk {}: {}", dir.display(), e)))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|_| Error::Config(format!("Unexpected path {}", entry.path().display())))?;
        let archive_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if archive_path == "pass.json" {
            continue;
        }

        if ImageKey::parse_archive_path(&archive_path).is_some() {
            images.insert_path(&archive_path, entry.path().to_path_buf())?;
        } else if let Some(lang) = archive_path
            .strip_suffix(".lproj/pass.strings")
            .filter(|lang| !lang.contains('/'))
        {
            localizations.insert_file(lang, entry.path().to_path_buf())?;
        } else {
            tracing::warn!(path = %archive_path, "ignoring file in pass model");
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        images = images.len(),
        languages = localizations.languages().count(),
        "loaded pass model"
    );

    Ok(PassModel {
        descriptor,
        images,
        localizations,
    })
}
