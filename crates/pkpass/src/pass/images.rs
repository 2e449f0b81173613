//! Pass images and their archive paths.

use super::{lproj_dir, validate_language};
use crate::manifest::ResourceSource;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Image slots recognized by Wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageType {
    Icon,
    Logo,
    Background,
    Footer,
    Strip,
    Thumbnail,
}

impl ImageType {
    pub const ALL: [ImageType; 6] = [
        ImageType::Icon,
        ImageType::Logo,
        ImageType::Background,
        ImageType::Footer,
        ImageType::Strip,
        ImageType::Thumbnail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Icon => "icon",
            ImageType::Logo => "logo",
            ImageType::Background => "background",
            ImageType::Footer => "footer",
            ImageType::Strip => "strip",
            ImageType::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ImageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown image type '{}'", s)))
    }
}

/// Image scale factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Density {
    #[default]
    X1,
    X2,
    X3,
}

impl Density {
    /// File name suffix before `.png`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Density::X1 => "",
            Density::X2 => "@2x",
            Density::X3 => "@3x",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(Density::X1),
            "@2x" => Some(Density::X2),
            "@3x" => Some(Density::X3),
            _ => None,
        }
    }
}

/// Identifies one image variant.
///
/// Ordering is language (unlocalized first), then type, then density, which
/// is also the order images enter the manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey {
    pub lang: Option<String>,
    pub image_type: ImageType,
    pub density: Density,
}

impl ImageKey {
    pub fn new(image_type: ImageType, density: Density) -> Self {
        Self {
            lang: None,
            image_type,
            density,
        }
    }

    pub fn localized(lang: impl Into<String>, image_type: ImageType, density: Density) -> Self {
        Self {
            lang: Some(lang.into()),
            image_type,
            density,
        }
    }

    /// `{type}{suffix}.png`, prefixed with `{lang}.lproj/` when localized.
    pub fn archive_path(&self) -> String {
        let file = format!("{}{}.png", self.image_type, self.density.suffix());
        match &self.lang {
            Some(lang) => format!("{}/{}", lproj_dir(lang), file),
            None => file,
        }
    }

    /// Inverse of [`archive_path`](Self::archive_path).
    ///
    /// Returns `None` for anything that is not a recognized image path.
    pub fn parse_archive_path(path: &str) -> Option<Self> {
        let (lang, file) = match path.split_once('/') {
            Some((dir, file)) => {
                let lang = dir.strip_suffix(".lproj")?;
                validate_language(lang).ok()?;
                (Some(lang.to_string()), file)
            }
            None => (None, path),
        };

        let stem = file.strip_suffix(".png")?;
        let (name, suffix) = match stem.find('@') {
            Some(at) => stem.split_at(at),
            None => (stem, ""),
        };

        Some(Self {
            lang,
            image_type: name.parse().ok()?,
            density: Density::from_suffix(suffix)?,
        })
    }
}

/// Image variants of a pass, keyed by [`ImageKey`].
///
/// Sources are resolved lazily: file sources are only read when the bundle
/// is assembled.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: BTreeMap<ImageKey, ResourceSource>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an unlocalized image, replacing any previous source.
    pub fn insert(
        &mut self,
        image_type: ImageType,
        density: Density,
        source: impl Into<ResourceSource>,
    ) -> &mut Self {
        self.images
            .insert(ImageKey::new(image_type, density), source.into());
        self
    }

    /// Set an image under `{lang}.lproj/`.
    pub fn insert_localized(
        &mut self,
        lang: &str,
        image_type: ImageType,
        density: Density,
        source: impl Into<ResourceSource>,
    ) -> Result<&mut Self> {
        validate_language(lang)?;
        self.images
            .insert(ImageKey::localized(lang, image_type, density), source.into());
        Ok(self)
    }

    /// Set an image from its archive path, e.g. `en.lproj/logo@2x.png`.
    pub fn insert_path(&mut self, path: &str, source: impl Into<ResourceSource>) -> Result<&mut Self> {
        let key = ImageKey::parse_archive_path(path)
            .ok_or_else(|| Error::Validation(format!("'{}' is not a pass image path", path)))?;
        self.images.insert(key, source.into());
        Ok(self)
    }

    pub fn get(&self, key: &ImageKey) -> Option<&ResourceSource> {
        self.images.get(key)
    }

    pub fn remove(&mut self, key: &ImageKey) -> Option<ResourceSource> {
        self.images.remove(key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Require an `icon` and a `logo` variant.
    ///
    /// Any density and any language satisfies the requirement.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = [ImageType::Icon, ImageType::Logo]
            .into_iter()
            .filter(|required| !self.images.keys().any(|k| k.image_type == *required))
            .map(|t| format!("{}.png", t))
            .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing required images: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// `(archive path, source)` for every variant, in key order.
    pub fn resources(&self) -> impl Iterator<Item = (String, &ResourceSource)> {
        self.images.iter().map(|(k, s)| (k.archive_path(), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_archive_paths() {
        assert_eq!(ImageKey::new(ImageType::Icon, Density::X1).archive_path(), "icon.png");
        assert_eq!(ImageKey::new(ImageType::Strip, Density::X3).archive_path(), "strip@3x.png");
        assert_eq!(
            ImageKey::localized("zh-Hans", ImageType::Logo, Density::X2).archive_path(),
            "zh-Hans.lproj/logo@2x.png"
        );
    }

    #[test]
    fn test_parse_archive_path() {
        for path in ["icon.png", "thumbnail@2x.png", "en.lproj/background@3x.png"] {
            let key = ImageKey::parse_archive_path(path).unwrap();
            assert_eq!(key.archive_path(), path);
        }

        assert!(ImageKey::parse_archive_path("pass.json").is_none());
        assert!(ImageKey::parse_archive_path("banner.png").is_none());
        assert!(ImageKey::parse_archive_path("icon@4x.png").is_none());
        assert!(ImageKey::parse_archive_path("en/icon.png").is_none());
        assert!(ImageKey::parse_archive_path("en.lproj/pass.strings").is_none());
    }

    #[test]
    fn test_image_type_from_str() {
        assert_eq!("footer".parse::<ImageType>().unwrap(), ImageType::Footer);
        assert!("Footer".parse::<ImageType>().is_err());
    }

    #[test]
    fn test_validate_requires_icon_and_logo() {
        let mut images = ImageSet::new();
        let err = images.validate().unwrap_err().to_string();
        assert!(err.contains("icon.png") && err.contains("logo.png"));

        images.insert(ImageType::Icon, Density::X1, b"icon".as_slice());
        let err = images.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("logo.png") && !msg.contains("icon.png")));

        images
            .insert_localized("fr", ImageType::Logo, Density::X2, b"logo".as_slice())
            .unwrap();
        assert!(images.validate().is_ok());
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut images = ImageSet::new();
        images.insert(ImageType::Icon, Density::X1, PathBuf::from("a.png"));
        images.insert(ImageType::Icon, Density::X1, PathBuf::from("b.png"));

        assert_eq!(images.len(), 1);
        assert_eq!(
            images.get(&ImageKey::new(ImageType::Icon, Density::X1)),
            Some(&ResourceSource::File(PathBuf::from("b.png")))
        );
    }

    #[test]
    fn test_resources_order() {
        let mut images = ImageSet::new();
        images
            .insert_localized("de", ImageType::Logo, Density::X1, b"1".as_slice())
            .unwrap();
        images.insert(ImageType::Logo, Density::X2, b"2".as_slice());
        images.insert(ImageType::Icon, Density::X1, b"3".as_slice());
        images.insert_path("logo.png", b"4".as_slice()).unwrap();

        let paths: Vec<String> = images.resources().map(|(p, _)| p).collect();
        assert_eq!(paths, ["icon.png", "logo.png", "logo@2x.png", "de.lproj/logo.png"]);
    }

    #[test]
    fn test_insert_localized_rejects_bad_language() {
        let mut images = ImageSet::new();
        assert!(images
            .insert_localized("../x", ImageType::Icon, Density::X1, b"".as_slice())
            .is_err());
        assert!(images.insert_path("hero.png", b"".as_slice()).is_err());
    }
}
