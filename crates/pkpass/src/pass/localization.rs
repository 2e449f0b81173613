//! Localized `pass.strings` files.
//!
//! A language either holds a string table rendered by this module or a
//! prepared `pass.strings` file bundled as-is.

use super::{lproj_dir, validate_language};
use crate::manifest::ResourceSource;
use crate::Result;
use std::collections::BTreeMap;

/// File name inside each `.lproj` directory.
pub const STRINGS_FILE_NAME: &str = "pass.strings";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Strings {
    Table(BTreeMap<String, String>),
    File(ResourceSource),
}

/// Localizations keyed by language code.
#[derive(Debug, Clone, Default)]
pub struct Localizations {
    languages: BTreeMap<String, Strings>,
}

impl Localizations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one translated string.
    ///
    /// Replaces a prepared file previously registered for `lang`.
    pub fn set_string(
        &mut self,
        lang: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self> {
        validate_language(lang)?;

        let strings = self
            .languages
            .entry(lang.to_string())
            .or_insert_with(|| Strings::Table(BTreeMap::new()));
        if let Strings::File(_) = strings {
            *strings = Strings::Table(BTreeMap::new());
        }
        if let Strings::Table(table) = strings {
            table.insert(key.into(), value.into());
        }
        Ok(self)
    }

    /// Merge a string table into `lang`.
    pub fn insert_table<I, K, V>(&mut self, lang: &str, table: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in table {
            self.set_string(lang, key, value)?;
        }
        Ok(self)
    }

    /// Bundle a prepared `pass.strings` file for `lang` byte-for-byte.
    pub fn insert_file(&mut self, lang: &str, source: impl Into<ResourceSource>) -> Result<&mut Self> {
        validate_language(lang)?;
        self.languages
            .insert(lang.to_string(), Strings::File(source.into()));
        Ok(self)
    }

    /// Look up a string set through [`set_string`](Self::set_string).
    pub fn get(&self, lang: &str, key: &str) -> Option<&str> {
        match self.languages.get(lang)? {
            Strings::Table(table) => table.get(key).map(String::as_str),
            Strings::File(_) => None,
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// `({lang}.lproj/pass.strings, source)` for every language.
    ///
    /// Tables are rendered to UTF-16LE here; files stay unread.
    pub fn resources(&self) -> impl Iterator<Item = (String, ResourceSource)> + '_ {
        self.languages.iter().map(|(lang, strings)| {
            let path = format!("{}/{}", lproj_dir(lang), STRINGS_FILE_NAME);
            let source = match strings {
                Strings::Table(table) => ResourceSource::Bytes(encode_utf16le(&render_table(table))),
                Strings::File(source) => source.clone(),
            };
            (path, source)
        })
    }
}

/// Render a table as `"key" = "value";` lines.
pub fn render_table(table: &BTreeMap<String, String>) -> String {
    table
        .iter()
        .map(|(key, value)| format!("\"{}\" = \"{}\";\n", escape(key), escape(value)))
        .collect()
}

/// UTF-16LE without a byte order mark.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_utf16le(bytes: &[u8]) -> String {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units).unwrap()
    }

    #[test]
    fn test_encode_utf16le() {
        assert_eq!(encode_utf16le("Hé"), vec![0x48, 0x00, 0xe9, 0x00]);
        assert_eq!(encode_utf16le(""), Vec::<u8>::new());
    }

    #[test]
    fn test_render_escapes() {
        let mut table = BTreeMap::new();
        table.insert("title".to_string(), "Say \"hi\"\n\\ok".to_string());
        assert_eq!(render_table(&table), "\"title\" = \"Say \\\"hi\\\"\\n\\\\ok\";\n");
    }

    #[test]
    fn test_resources_paths_and_encoding() {
        let mut loc = Localizations::new();
        loc.set_string("fr", "discount", "20% de réduction").unwrap();
        loc.insert_table("de", [("discount", "20% Rabatt"), ("event", "Rosen")])
            .unwrap();

        let resources: Vec<(String, ResourceSource)> = loc.resources().collect();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].0, "de.lproj/pass.strings");
        assert_eq!(resources[1].0, "fr.lproj/pass.strings");

        match &resources[1].1 {
            ResourceSource::Bytes(bytes) => {
                assert_eq!(decode_utf16le(bytes), "\"discount\" = \"20% de réduction\";\n");
            }
            other => panic!("expected rendered bytes, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_file_passes_through() {
        let mut loc = Localizations::new();
        loc.insert_file("ja", b"\xff\xfeprepared".as_slice()).unwrap();

        let (path, source) = loc.resources().next().unwrap();
        assert_eq!(path, "ja.lproj/pass.strings");
        assert_eq!(source, ResourceSource::Bytes(b"\xff\xfeprepared".to_vec()));
        assert_eq!(loc.get("ja", "anything"), None);
    }

    #[test]
    fn test_set_string_replaces_file() {
        let mut loc = Localizations::new();
        loc.insert_file("en", b"old".as_slice()).unwrap();
        loc.set_string("en", "k", "v").unwrap();

        assert_eq!(loc.get("en", "k"), Some("v"));
        assert_eq!(loc.languages().collect::<Vec<_>>(), ["en"]);
    }

    #[test]
    fn test_rejects_bad_language() {
        let mut loc = Localizations::new();
        assert!(loc.set_string("en/..", "k", "v").is_err());
        assert!(loc.insert_file("", b"".as_slice()).is_err());
        assert!(loc.is_empty());
    }
}
