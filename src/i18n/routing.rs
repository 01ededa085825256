//! Group → target-language routing table.

use crate::i18n::{normalize_code, LanguageCode};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;

/// Default route: every message is offered in these languages (minus its own).
pub const DEFAULT_ROUTE: [LanguageCode; 4] = [
    LanguageCode::Ja,
    LanguageCode::Ko,
    LanguageCode::ZhTw,
    LanguageCode::En,
];

/// Maps a group id to the ordered list of languages its messages are
/// translated into. Groups without an entry use the default route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    default_route: Vec<LanguageCode>,
    group_routes: HashMap<String, Vec<LanguageCode>>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE.to_vec())
    }
}

impl RoutingTable {
    pub fn new(default_route: Vec<LanguageCode>) -> Self {
        Self {
            default_route,
            group_routes: HashMap::new(),
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>, route: Vec<LanguageCode>) -> Self {
        self.group_routes.insert(group_id.into(), route);
        self
    }

    /// Build a table from the `DEFAULT_TARGET_LANGUAGES` / `GROUP_LANGUAGE_ROUTES`
    /// formats: `"ja,ko,zh-TW,en"` and `"groupA=ja,en,fr,zh-TW;groupB=ko,en"`.
    pub fn parse(default_route: &str, group_routes: &str) -> Result<Self> {
        let mut table = Self::new(
            parse_language_list(default_route).context("Invalid default target languages")?,
        );

        for entry in group_routes.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (group_id, languages) = entry
                .split_once('=')
                .with_context(|| format!("Invalid group route '{}'. Expected GROUP=lang,lang", entry))?;
            let group_id = group_id.trim();
            if group_id.is_empty() {
                bail!("Group route '{}' has an empty group id", entry);
            }
            let route = parse_language_list(languages)
                .with_context(|| format!("Invalid languages for group '{}'", group_id))?;
            table.group_routes.insert(group_id.to_string(), route);
        }

        Ok(table)
    }

    /// Every language configured for the group, source included.
    pub fn route(&self, group_id: &str) -> &[LanguageCode] {
        self.group_routes
            .get(group_id)
            .unwrap_or(&self.default_route)
    }

    /// Languages a message from `group_id` written in `source` is translated into.
    pub fn targets(&self, group_id: &str, source: LanguageCode) -> Vec<LanguageCode> {
        self.route(group_id)
            .iter()
            .copied()
            .filter(|lang| *lang != source)
            .collect()
    }
}

/// Parse a comma separated list of language tags, de-duplicated in order.
fn parse_language_list(raw: &str) -> Result<Vec<LanguageCode>> {
    let mut languages = Vec::new();

    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let lang = normalize_code(tag);
        if !lang.is_known() {
            bail!("Unsupported language code: '{}'", tag);
        }
        if !languages.contains(&lang) {
            languages.push(lang);
        }
    }

    if languages.is_empty() {
        bail!("Language list is empty");
    }

    Ok(languages)
}
