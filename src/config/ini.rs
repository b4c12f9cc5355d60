//! File form of the configuration: `[section]` headers and `key = value` lines

use crate::error::{ConfigError, Result};
use std::fmt::Write as _;

/// One `[name]` block with its entries in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(candidate, _)| candidate == key) {
            entry.1 = value.to_owned();
        } else {
            self.entries.push((key.to_owned(), value.to_owned()));
        }
    }
}

/// Ordered collection of sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file text
    ///
    /// Lines starting with `#` or `;` are comments, `:` is accepted as a
    /// delimiter, indented lines continue the previous value and keys are
    /// lower-cased.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the line for malformed headers,
    /// entries outside a section and duplicate sections or keys.
    pub fn parse(content: &str) -> Result<Self> {
        let mut document = Self::new();
        let mut last_key: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let number = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if raw.starts_with([' ', '\t']) {
                if let (Some(key), Some(section)) = (last_key.as_ref(), document.sections.last_mut())
                {
                    if let Some(entry) = section.entries.iter_mut().find(|(k, _)| k == key) {
                        entry.1.push('\n');
                        entry.1.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| {
                    ConfigError::configuration(format!(
                        "Malformed section header at line {number}: '{trimmed}'"
                    ))
                })?;
                let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
                if document.has_section(&name) {
                    return Err(ConfigError::configuration(format!(
                        "Section '[{name}]' is declared more than once (line {number})"
                    )));
                }
                document.sections.push(IniSection::new(&name));
                last_key = None;
                continue;
            }

            let (key, value) = trimmed
                .split_once(['=', ':'])
                .ok_or_else(|| {
                    ConfigError::configuration(format!(
                        "Expected 'key = value' at line {number}: '{trimmed}'"
                    ))
                })?;
            let key = key.trim().to_lowercase();
            let section = document.sections.last_mut().ok_or_else(|| {
                ConfigError::configuration(format!(
                    "Parameter '{key}' at line {number} is outside of any section"
                ))
            })?;
            if section.get(&key).is_some() {
                return Err(ConfigError::configuration(format!(
                    "Parameter '{key}' is declared more than once in section '[{}]' (line {number})",
                    section.name
                )));
            }
            section.entries.push((key.clone(), value.trim().to_owned()));
            last_key = Some(key);
        }

        Ok(document)
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    #[must_use]
    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    /// Add an empty section unless it already exists
    pub fn add_section(&mut self, name: &str) {
        if !self.has_section(name) {
            self.sections.push(IniSection::new(name));
        }
    }

    /// Set a value, creating the section when needed
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.add_section(section);
        if let Some(found) = self.sections.iter_mut().find(|s| s.name == section) {
            found.set(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|found| found.get(key))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|section| section.entries.is_empty())
    }

    /// Render the document; sections without entries are skipped
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in self.sections.iter().filter(|s| !s.entries.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in &section.entries {
                let _ = writeln!(out, "{key} = {}", value.replace('\n', "\n    "));
            }
        }
        out
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_entries() {
        let document = IniDocument::parse(
            "# leading comment\n\
             [global]\n\
             cluster_template = custom\n\
             ; another comment\n\
             Update_Check: false\n\
             \n\
             [cluster   custom]\n\
             key_name = mykey\n",
        )
        .unwrap();

        assert_eq!(document.get("global", "cluster_template"), Some("custom"));
        assert_eq!(document.get("global", "update_check"), Some("false"));
        assert_eq!(document.get("cluster custom", "key_name"), Some("mykey"));
        assert!(!document.has_section("cluster default"));
    }

    #[test]
    fn continuation_lines_extend_values() {
        let document =
            IniDocument::parse("[cluster default]\nextra_json = {\n    \"a\": 1}\n").unwrap();
        assert_eq!(
            document.get("cluster default", "extra_json"),
            Some("{\n\"a\": 1}")
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(IniDocument::parse("key = value\n").is_err());
        assert!(IniDocument::parse("[global\n").is_err());
        assert!(IniDocument::parse("[global]\njust text\n").is_err());
        assert!(IniDocument::parse("[global]\n[global]\n").is_err());

        let err = IniDocument::parse("[aws]\na = 1\nA = 2\n").unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn renders_only_populated_sections() {
        let mut document = IniDocument::new();
        document.add_section("aws");
        document.set("cluster default", "key_name", "mykey");
        document.set("cluster default", "key_name", "other");
        document.set("vpc default", "vpc_id", "vpc-12345678");

        assert_eq!(
            document.render(),
            "[cluster default]\nkey_name = other\n\n[vpc default]\nvpc_id = vpc-12345678\n"
        );
        assert!(IniDocument::new().is_empty());
    }
}
