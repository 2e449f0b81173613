//! Pass content: the `pass.json` descriptor, images and localizations.
//!
//! These types validate their own invariants and resolve to archive
//! paths; hashing and packaging happen in [`crate::assembler`].
//!
//! | Type | Archive paths |
//! |------|---------------|
//! | [`PassDescriptor`] | `pass.json` |
//! | [`ImageSet`] | `{type}[@2x\|@3x].png`, `{lang}.lproj/{type}[@2x\|@3x].png` |
//! | [`Localizations`] | `{lang}.lproj/pass.strings` |

pub mod descriptor;
pub mod images;
pub mod localization;

pub use descriptor::PassDescriptor;
pub use images::{Density, ImageKey, ImageSet, ImageType};
pub use localization::Localizations;

use crate::{Error, Result};

/// Check that `lang` can be used as a `{lang}.lproj` directory name.
pub(crate) fn validate_language(lang: &str) -> Result<()> {
    let valid = !lang.is_empty()
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(Error::Validation(format!("Invalid language code: '{}'", lang)));
    }
    Ok(())
}

/// Directory prefix for localized resources.
pub(crate) fn lproj_dir(lang: &str) -> String {
    format!("{}.lproj", lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_language() {
        assert!(validate_language("en").is_ok());
        assert!(validate_language("zh-Hans").is_ok());
        assert!(validate_language("pt_BR").is_ok());
        assert!(validate_language("").is_err());
        assert!(validate_language("../en").is_err());
        assert!(validate_language("en/fr").is_err());
    }
}
