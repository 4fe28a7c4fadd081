//! Station name types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder shown when the backend omits a Chinese station name.
pub const UNKNOWN_CN: &str = "未知";

/// Placeholder shown when the backend omits every station name.
pub const UNKNOWN_EN: &str = "Unknown";

/// A bilingual station name.
///
/// Both parts are stored trimmed. Either may be empty; the display methods
/// apply the fallbacks so callers never render a blank label.
///
/// # Examples
///
/// ```
/// use metro_server::domain::StationName;
///
/// let name = StationName::new("人民广场", "People's Square");
/// assert_eq!(name.display_cn(), "人民广场");
/// assert_eq!(name.display_en(), "People's Square");
///
/// // English falls back to Chinese
/// let name = StationName::new("徐家汇", "");
/// assert_eq!(name.display_en(), "徐家汇");
///
/// // Nothing at all
/// let name = StationName::new("", "");
/// assert_eq!(name.display_cn(), "未知");
/// assert_eq!(name.display_en(), "Unknown");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StationName {
    cn: String,
    en: String,
}

impl StationName {
    /// Create a station name from its Chinese and English parts.
    pub fn new(cn: impl AsRef<str>, en: impl AsRef<str>) -> Self {
        Self {
            cn: cn.as_ref().trim().to_string(),
            en: en.as_ref().trim().to_string(),
        }
    }

    /// Create a station name from optional parts.
    pub fn from_parts(cn: Option<&str>, en: Option<&str>) -> Self {
        Self::new(cn.unwrap_or_default(), en.unwrap_or_default())
    }

    /// The raw Chinese name (may be empty).
    pub fn cn(&self) -> &str {
        &self.cn
    }

    /// The raw English name (may be empty).
    pub fn en(&self) -> &str {
        &self.en
    }

    /// Whether neither part carries a name.
    pub fn is_empty(&self) -> bool {
        self.cn.is_empty() && self.en.is_empty()
    }

    /// Chinese name for display, falling back to English, then `未知`.
    pub fn display_cn(&self) -> &str {
        if !self.cn.is_empty() {
            &self.cn
        } else if !self.en.is_empty() {
            &self.en
        } else {
            UNKNOWN_CN
        }
    }

    /// English name for display, falling back to Chinese, then `Unknown`.
    pub fn display_en(&self) -> &str {
        if !self.en.is_empty() {
            &self.en
        } else if !self.cn.is_empty() {
            &self.cn
        } else {
            UNKNOWN_EN
        }
    }

    /// Key used to group records that refer to the same physical station.
    ///
    /// The Chinese name wins; English is used only when Chinese is absent.
    /// Returns `None` for a nameless record.
    pub fn grouping_key(&self) -> Option<String> {
        if !self.cn.is_empty() {
            Some(self.cn.clone())
        } else if !self.en.is_empty() {
            Some(self.en.to_lowercase())
        } else {
            None
        }
    }
}

impl fmt::Debug for StationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationName({}/{})", self.cn, self.en)
    }
}

impl fmt::Display for StationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_cn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_parts() {
        let name = StationName::new("  陆家嘴 ", " Lujiazui ");
        assert_eq!(name.cn(), "陆家嘴");
        assert_eq!(name.en(), "Lujiazui");
    }

    #[test]
    fn chinese_falls_back_to_english() {
        let name = StationName::new("", "Lujiazui");
        assert_eq!(name.display_cn(), "Lujiazui");
        assert_eq!(name.display_en(), "Lujiazui");
    }

    #[test]
    fn from_missing_parts() {
        let name = StationName::from_parts(None, None);
        assert!(name.is_empty());
        assert_eq!(name.to_string(), UNKNOWN_CN);
        assert_eq!(name.display_en(), UNKNOWN_EN);
    }

    #[test]
    fn grouping_key_prefers_chinese() {
        assert_eq!(
            StationName::new("人民广场", "People's Square").grouping_key(),
            Some("人民广场".to_string())
        );
        assert_eq!(
            StationName::new("", "People's Square").grouping_key(),
            Some("people's square".to_string())
        );
        assert_eq!(StationName::new(" ", "").grouping_key(), None);
    }

    #[test]
    fn debug() {
        let name = StationName::new("静安寺", "Jing'an Temple");
        assert_eq!(format!("{:?}", name), "StationName(静安寺/Jing'an Temple)");
    }
}
