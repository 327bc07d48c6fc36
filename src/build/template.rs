// src/build/template.rs

//! HTML template compilation.
//!
//! A template `components/badge/badge.tpl.html` becomes a module that
//! registers the markup in the runtime template cache under its relative
//! path:
//!
//! ```text
//! /**
//!  * @module components.badge.badge.tpl
//!  */
//! angular.module('li.templates').run(['$templateCache', function ($templateCache) {
//!   $templateCache.put('components/badge/badge.tpl.html', '<div>{{ name }}</div>\n');
//! }]);
//! ```
//!
//! Interpolations (`{{ ... }}`) are checked for balance; everything else is
//! carried over verbatim.

use crate::build::header::ModuleHeader;

/// Runtime module that owns the template cache.
pub const TEMPLATE_CACHE_MODULE: &str = "li.templates";

/// File suffix identifying templates.
pub const TEMPLATE_SUFFIX: &str = ".tpl.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub line: usize,
    pub message: String,
}

pub fn is_template(rel_path: &str) -> bool {
    rel_path.ends_with(TEMPLATE_SUFFIX)
}

/// Output file name for a template: `a/b.tpl.html` -> `a/b.tpl.js`.
pub fn output_rel_path(rel_path: &str) -> String {
    match rel_path.strip_suffix(".html") {
        Some(stem) => format!("{stem}.js"),
        None => format!("{rel_path}.js"),
    }
}

/// Deterministic module name for a source path relative to the source root.
///
/// `components/badge/badge.js` -> `components.badge.badge`,
/// `components/badge/badge.tpl.html` -> `components.badge.badge.tpl`.
pub fn module_name_for(rel_path: &str) -> String {
    let stem = rel_path
        .strip_suffix(".html")
        .or_else(|| rel_path.strip_suffix(".js"))
        .unwrap_or(rel_path);
    stem.trim_start_matches("./")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Compile one template into its cache-registration module.
pub fn compile_template(rel_path: &str, source: &str) -> Result<String, TemplateError> {
    check_interpolations(source)?;

    let header = ModuleHeader {
        module: Some(module_name_for(rel_path)),
        requires: Vec::new(),
        externals: Vec::new(),
    };

    let mut out = header.render();
    out.push_str(&format!(
        "angular.module('{TEMPLATE_CACHE_MODULE}').run(['$templateCache', function ($templateCache) {{\n"
    ));
    out.push_str(&format!(
        "  $templateCache.put('{}', '{}');\n",
        escape_js(rel_path),
        escape_js(source)
    ));
    out.push_str("}]);\n");
    Ok(out)
}

fn check_interpolations(source: &str) -> Result<(), TemplateError> {
    let mut open: Option<(usize, usize)> = None; // (line, byte offset after "{{")
    let mut line = 1;
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => line += 1,
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                if let Some((opened, _)) = open {
                    return Err(TemplateError {
                        line,
                        message: format!(
                            "'{{{{' inside an interpolation opened at line {opened}"
                        ),
                    });
                }
                open = Some((line, i + 2));
                i += 1;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => match open.take() {
                Some((_, start)) => {
                    if source[start..i].trim().is_empty() {
                        return Err(TemplateError {
                            line,
                            message: "empty interpolation '{{ }}'".to_string(),
                        });
                    }
                    i += 1;
                }
                None => {
                    return Err(TemplateError {
                        line,
                        message: "'}}' without a matching '{{'".to_string(),
                    });
                }
            },
            _ => {}
        }
        i += 1;
    }

    if let Some((opened, _)) = open {
        return Err(TemplateError {
            line: opened,
            message: "unclosed '{{' interpolation".to_string(),
        });
    }
    Ok(())
}

/// Escape text for a single-quoted JavaScript string literal.
fn escape_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_names_follow_relative_path() {
        assert_eq!(module_name_for("components/badge/badge.js"), "components.badge.badge");
        assert_eq!(
            module_name_for("components/badge/badge.tpl.html"),
            "components.badge.badge.tpl"
        );
        assert_eq!(output_rel_path("a/b.tpl.html"), "a/b.tpl.js");
    }

    #[test]
    fn compiles_into_template_cache_module() {
        let out = compile_template("a/b.tpl.html", "<p class='x'>{{ name }}</p>\n").unwrap();

        assert!(out.starts_with("/**\n * @module a.b.tpl\n */\n"));
        assert!(out.contains("$templateCache.put('a/b.tpl.html', '<p class=\\'x\\'>{{ name }}</p>\\n');"));
        assert_eq!(ModuleHeader::parse(&out).module.as_deref(), Some("a.b.tpl"));
    }

    #[test]
    fn compilation_is_deterministic() {
        let src = "<div>{{ a }}</div>";
        assert_eq!(
            compile_template("x.tpl.html", src).unwrap(),
            compile_template("x.tpl.html", src).unwrap()
        );
    }

    #[test]
    fn unclosed_interpolation_reports_opening_line() {
        let err = compile_template("x.tpl.html", "<div>\n  {{ name\n</div>\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn stray_closer_reports_its_line() {
        let err = compile_template("x.tpl.html", "<a>\n</a>\n}}\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn nested_and_empty_interpolations_fail() {
        assert!(compile_template("x.tpl.html", "{{ a {{ b }} }}").is_err());
        assert!(compile_template("x.tpl.html", "{{   }}").is_err());
    }
}
