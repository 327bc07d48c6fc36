// src/build/sourcemap.rs

//! Version 3 source maps.
//!
//! Processed scripts are carried over line for line, so their map is the
//! identity mapping. Bundles concatenate many sources and get an index map
//! with one section per source.

use serde::Serialize;

#[derive(Debug, Serialize)]
struct SourceMap<'a> {
    version: u8,
    file: &'a str,
    sources: Vec<&'a str>,
    names: Vec<&'a str>,
    mappings: String,
}

#[derive(Debug, Serialize)]
struct IndexMap<'a> {
    version: u8,
    file: &'a str,
    sections: Vec<Section<'a>>,
}

#[derive(Debug, Serialize)]
struct Section<'a> {
    offset: Offset,
    map: SourceMap<'a>,
}

#[derive(Debug, Serialize)]
struct Offset {
    line: usize,
    column: usize,
}

/// One source placed in a generated file starting at `line` (0-based).
#[derive(Debug, Clone)]
pub struct MappedSource {
    pub source: String,
    pub line: usize,
    pub line_count: usize,
}

/// Map each generated line to the same line of `source`, column 0.
pub fn identity_map(file: &str, source: &str, line_count: usize) -> serde_json::Result<String> {
    serde_json::to_string(&SourceMap {
        version: 3,
        file,
        sources: vec![source],
        names: Vec::new(),
        mappings: identity_mappings(line_count),
    })
}

/// Index map whose sections place each source at its offset.
pub fn index_map(file: &str, sources: &[MappedSource]) -> serde_json::Result<String> {
    let sections = sources
        .iter()
        .map(|s| Section {
            offset: Offset {
                line: s.line,
                column: 0,
            },
            map: SourceMap {
                version: 3,
                file,
                sources: vec![s.source.as_str()],
                names: Vec::new(),
                mappings: identity_mappings(s.line_count),
            },
        })
        .collect();

    serde_json::to_string(&IndexMap {
        version: 3,
        file,
        sections,
    })
}

/// `AAAA;AACA;AACA;...`: first segment points at line 0, every following
/// one advances the source line by one.
fn identity_mappings(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 5);
    for i in 0..line_count {
        if i > 0 {
            out.push(';');
            out.push_str("AACA");
        } else {
            out.push_str("AAAA");
        }
    }
    out
}

/// Line count as seen by a source-map consumer.
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.lines().count()
    }
}

/// The comment appended to a generated file pointing at its map.
pub fn map_reference(map_file_name: &str) -> String {
    format!("//# sourceMappingURL={map_file_name}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_map_has_one_segment_per_line() {
        let map = identity_map("a.js", "src/a.js", 3).unwrap();
        let v: serde_json::Value = serde_json::from_str(&map).unwrap();

        assert_eq!(v["version"], 3);
        assert_eq!(v["sources"][0], "src/a.js");
        assert_eq!(v["mappings"], "AAAA;AACA;AACA");
    }

    #[test]
    fn index_map_places_sections_at_offsets() {
        let map = index_map(
            "bundle.js",
            &[
                MappedSource {
                    source: "a.js".into(),
                    line: 2,
                    line_count: 1,
                },
                MappedSource {
                    source: "b.js".into(),
                    line: 6,
                    line_count: 2,
                },
            ],
        )
        .unwrap();
        let v: serde_json::Value = serde_json::from_str(&map).unwrap();

        assert_eq!(v["sections"][1]["offset"]["line"], 6);
        assert_eq!(v["sections"][1]["map"]["mappings"], "AAAA;AACA");
    }

    #[test]
    fn counts_lines_without_trailing_newline_artifacts() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a\nb\n"), 2);
        assert_eq!(count_lines("a\nb"), 2);
    }
}
