// src/build/header.rs

//! Module dependency header.
//!
//! Every processed script starts with a block comment that names the module
//! and lists what it depends on:
//!
//! ```text
//! /**
//!  * @module li.components.userBadge
//!  * @requires li.services.users, li.filters.dates
//!  * @requires ngSanitize
//!  * @external ngSanitize
//!  */
//! ```
//!
//! Only a block comment at the very top of the file (leading whitespace
//! aside) counts. Anything later in the file is ignored.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(module|requires|external)\s+([^\r\n*@]+)").expect("valid tag regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleHeader {
    pub module: Option<String>,
    /// Direct dependencies in declaration order, without duplicates.
    pub requires: Vec<String>,
    /// Dependencies this module marks as provided from outside the plugin.
    pub externals: Vec<String>,
}

impl ModuleHeader {
    /// Parse the header block of `source`. Files without one yield an empty
    /// header.
    pub fn parse(source: &str) -> Self {
        let mut header = ModuleHeader::default();
        let Some(block) = leading_block_comment(source) else {
            return header;
        };

        for cap in TAG_RE.captures_iter(block) {
            let value = cap[2].trim();
            match &cap[1] {
                "module" => {
                    if header.module.is_none() {
                        header.module = value.split_whitespace().next().map(str::to_string);
                    }
                }
                "requires" => push_names(&mut header.requires, value),
                "external" => push_names(&mut header.externals, value),
                _ => {}
            }
        }

        header
    }

    /// Render a header block for a generated module.
    pub fn render(&self) -> String {
        let mut out = String::from("/**\n");
        if let Some(module) = &self.module {
            out.push_str(&format!(" * @module {module}\n"));
        }
        if !self.requires.is_empty() {
            out.push_str(&format!(" * @requires {}\n", self.requires.join(", ")));
        }
        if !self.externals.is_empty() {
            out.push_str(&format!(" * @external {}\n", self.externals.join(", ")));
        }
        out.push_str(" */\n");
        out
    }
}

fn push_names(into: &mut Vec<String>, value: &str) {
    for name in value.split([',', ' ', '\t']).map(str::trim) {
        if !name.is_empty() && !into.iter().any(|n| n == name) {
            into.push(name.to_string());
        }
    }
}

fn leading_block_comment(source: &str) -> Option<&str> {
    let trimmed = source.trim_start_matches('\u{feff}').trim_start();
    let body = trimmed.strip_prefix("/*")?;
    let end = body.find("*/")?;
    Some(&body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_requires_and_externals() {
        let src = "/**\n * @module li.badge\n * @requires li.users, li.dates\n * @requires ngSanitize li.users\n * @external ngSanitize\n */\nangular.module('li.badge', []);\n";
        let header = ModuleHeader::parse(src);

        assert_eq!(header.module.as_deref(), Some("li.badge"));
        assert_eq!(header.requires, vec!["li.users", "li.dates", "ngSanitize"]);
        assert_eq!(header.externals, vec!["ngSanitize"]);
    }

    #[test]
    fn header_must_be_at_top() {
        let src = "var x = 1;\n/** @requires late */\n";
        assert_eq!(ModuleHeader::parse(src), ModuleHeader::default());
    }

    #[test]
    fn tags_after_header_are_ignored() {
        let src = "/* @requires a */\n/* @requires b */\n";
        assert_eq!(ModuleHeader::parse(src).requires, vec!["a"]);
    }

    #[test]
    fn rendered_header_parses_back() {
        let header = ModuleHeader {
            module: Some("tpl.a".into()),
            requires: vec!["b".into()],
            externals: vec![],
        };
        assert_eq!(ModuleHeader::parse(&header.render()), header);
    }
}
