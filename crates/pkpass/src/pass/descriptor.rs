//! The `pass.json` descriptor
//!
//! Top-level keys that need validation are typed fields with checked
//! setters. Everything else (pass style dictionaries, barcodes, locations,
//! user info) passes through untouched as JSON.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

/// Value written as `formatVersion`.
pub const FORMAT_VERSION: u64 = 1;

/// Minimum length of `authenticationToken`.
pub const MIN_AUTHENTICATION_TOKEN_LEN: usize = 16;

/// Keys owned by typed fields; they never appear in the passthrough map.
const TYPED_KEYS: &[&str] = &[
    "formatVersion",
    "description",
    "organizationName",
    "passTypeIdentifier",
    "serialNumber",
    "teamIdentifier",
    "webServiceURL",
    "authenticationToken",
    "backgroundColor",
    "foregroundColor",
    "labelColor",
    "relevantDate",
    "expirationDate",
];

/// Contents of `pass.json`.
///
/// # Examples
///
/// ```
/// use pkpass::pass::PassDescriptor;
/// use serde_json::json;
///
/// let mut pass = PassDescriptor::new(
///     "pass.com.example.passbook",
///     "MXL",
///     "123456",
///     "Acme flowers",
///     "20% of black roses",
/// );
/// pass.set_background_color("#3c414b")?;
/// pass.insert("coupon", json!({ "primaryFields": [] }))?;
/// pass.validate()?;
///
/// let json: serde_json::Value = serde_json::from_slice(&pass.to_json()?)?;
/// assert_eq!(json["formatVersion"], 1);
/// assert_eq!(json["backgroundColor"], "rgb(60, 65, 75)");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_type_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_identifier: Option<String>,

    #[serde(default, rename = "webServiceURL", skip_serializing_if = "Option::is_none")]
    web_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authentication_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    foreground_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    relevant_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration_date: Option<String>,

    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl PassDescriptor {
    /// Create a descriptor with every required field set.
    pub fn new(
        pass_type_identifier: impl Into<String>,
        team_identifier: impl Into<String>,
        serial_number: impl Into<String>,
        organization_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            pass_type_identifier: Some(pass_type_identifier.into()),
            team_identifier: Some(team_identifier.into()),
            serial_number: Some(serial_number.into()),
            organization_name: Some(organization_name.into()),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Parse a descriptor from `pass.json` bytes.
    ///
    /// A `formatVersion` other than 1 is rejected. The result is not
    /// validated; call [`validate`](Self::validate) before bundling.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let mut descriptor: Self = serde_json::from_slice(data)?;

        if let Some(version) = descriptor.fields.remove("formatVersion") {
            check_format_version(&version)?;
        }

        Ok(descriptor)
    }

    /// Serialize to the exact bytes stored as `pass.json`.
    ///
    /// `formatVersion: 1` is always the first key.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut root = Map::new();
        root.insert("formatVersion".to_string(), Value::from(FORMAT_VERSION));

        if let Value::Object(body) = serde_json::to_value(self)? {
            root.extend(body.into_iter().filter(|(key, _)| key != "formatVersion"));
        }

        Ok(serde_json::to_vec(&Value::Object(root))?)
    }

    /// Check required fields and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming every missing required field, or
    /// describing the first broken rule among web service, colors and dates.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("description", &self.description),
            ("organizationName", &self.organization_name),
            ("passTypeIdentifier", &self.pass_type_identifier),
            ("serialNumber", &self.serial_number),
            ("teamIdentifier", &self.team_identifier),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        // Deserializing with serde directly leaves formatVersion in the passthrough map
        if let Some(version) = self.fields.get("formatVersion") {
            check_format_version(version)?;
        }

        match (&self.web_service_url, &self.authentication_token) {
            (Some(url), Some(token)) => check_web_service(url, token)?,
            (Some(_), None) => {
                return Err(Error::Validation(
                    "webServiceURL requires authenticationToken".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Validation(
                    "authenticationToken requires webServiceURL".into(),
                ))
            }
            (None, None) => {}
        }

        for (name, color) in [
            ("backgroundColor", &self.background_color),
            ("foregroundColor", &self.foreground_color),
            ("labelColor", &self.label_color),
        ] {
            if let Some(color) = color {
                parse_color(color).map_err(|e| Error::Validation(format!("{}: {}", name, e)))?;
            }
        }

        for (name, date) in [
            ("relevantDate", &self.relevant_date),
            ("expirationDate", &self.expiration_date),
        ] {
            if let Some(date) = date {
                DateTime::parse_from_rfc3339(date).map_err(|e| {
                    Error::Validation(format!("{}: '{}' is not a W3C date: {}", name, date, e))
                })?;
            }
        }

        Ok(())
    }

    /// Set `webServiceURL` and `authenticationToken` together.
    pub fn set_web_service(&mut self, url: impl Into<String>, token: impl Into<String>) -> Result<&mut Self> {
        let url = url.into();
        let token = token.into();
        check_web_service(&url, &token)?;
        self.web_service_url = Some(url);
        self.authentication_token = Some(token);
        Ok(self)
    }

    /// Remove `webServiceURL` and `authenticationToken`.
    pub fn clear_web_service(&mut self) -> &mut Self {
        self.web_service_url = None;
        self.authentication_token = None;
        self
    }

    pub fn web_service_url(&self) -> Option<&str> {
        self.web_service_url.as_deref()
    }

    pub fn authentication_token(&self) -> Option<&str> {
        self.authentication_token.as_deref()
    }

    /// Set `backgroundColor` from `rgb(r, g, b)`, `#rrggbb` or `#rgb`.
    pub fn set_background_color(&mut self, color: &str) -> Result<&mut Self> {
        self.background_color = Some(normalize_color(color)?);
        Ok(self)
    }

    /// Set `foregroundColor` from `rgb(r, g, b)`, `#rrggbb` or `#rgb`.
    pub fn set_foreground_color(&mut self, color: &str) -> Result<&mut Self> {
        self.foreground_color = Some(normalize_color(color)?);
        Ok(self)
    }

    /// Set `labelColor` from `rgb(r, g, b)`, `#rrggbb` or `#rgb`.
    pub fn set_label_color(&mut self, color: &str) -> Result<&mut Self> {
        self.label_color = Some(normalize_color(color)?);
        Ok(self)
    }

    pub fn background_color(&self) -> Option<&str> {
        self.background_color.as_deref()
    }

    pub fn foreground_color(&self) -> Option<&str> {
        self.foreground_color.as_deref()
    }

    pub fn label_color(&self) -> Option<&str> {
        self.label_color.as_deref()
    }

    /// Set `relevantDate` as a W3C (RFC 3339) timestamp.
    pub fn set_relevant_date<Tz>(&mut self, date: &DateTime<Tz>) -> &mut Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.relevant_date = Some(date.to_rfc3339_opts(SecondsFormat::Secs, true));
        self
    }

    /// Set `expirationDate` as a W3C (RFC 3339) timestamp.
    pub fn set_expiration_date<Tz>(&mut self, date: &DateTime<Tz>) -> &mut Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.expiration_date = Some(date.to_rfc3339_opts(SecondsFormat::Secs, true));
        self
    }

    pub fn relevant_date(&self) -> Option<&str> {
        self.relevant_date.as_deref()
    }

    pub fn expiration_date(&self) -> Option<&str> {
        self.expiration_date.as_deref()
    }

    /// Set a passthrough top-level key such as `barcodes` or `eventTicket`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for keys that have a typed setter.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<&mut Self> {
        let key = key.into();
        if TYPED_KEYS.contains(&key.as_str()) {
            return Err(Error::Validation(format!(
                "'{}' must be set through its typed field or setter",
                key
            )));
        }
        self.fields.insert(key, value);
        Ok(self)
    }

    /// Get a passthrough top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Remove a passthrough top-level key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Passthrough keys in insertion order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn check_format_version(version: &Value) -> Result<()> {
    if version.as_u64() != Some(FORMAT_VERSION) {
        return Err(Error::Validation(format!(
            "Unsupported formatVersion {}, expected {}",
            version, FORMAT_VERSION
        )));
    }
    Ok(())
}

fn check_web_service(url: &str, token: &str) -> Result<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(Error::Validation(format!(
            "webServiceURL must be an http(s) URL, got '{}'",
            url
        )));
    }
    if token.chars().count() < MIN_AUTHENTICATION_TOKEN_LEN {
        return Err(Error::Validation(format!(
            "authenticationToken must be at least {} characters",
            MIN_AUTHENTICATION_TOKEN_LEN
        )));
    }
    Ok(())
}

fn normalize_color(color: &str) -> Result<String> {
    let (r, g, b) = parse_color(color).map_err(Error::Validation)?;
    Ok(format!("rgb({}, {}, {})", r, g, b))
}

/// Parse `rgb(r, g, b)`, `#rrggbb` or `#rgb`.
fn parse_color(color: &str) -> std::result::Result<(u8, u8, u8), String> {
    let color = color.trim();
    let invalid = || format!("'{}' is not a valid color", color);

    if let Some(hex) = color.strip_prefix('#') {
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        let bytes = hex::decode(&expanded).map_err(|_| invalid())?;
        return Ok((bytes[0], bytes[1], bytes[2]));
    }

    let inner = color
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;

    let channels: Vec<u8> = inner
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid())?;

    match channels.as_slice() {
        [r, g, b] => Ok((*r, *g, *b)),
        _ => Err(invalid()),
    }
}
