//! BibTeX file reading and writing.
//!
//! Uses the `biblatex` crate for parsing (LaTeX accent decoding, structured
//! field access) and flattens every entry into a plain field map, which is the
//! only shape the validation engine cares about. Real .bib files often carry
//! minor syntax errors, so a failed whole-file parse falls back to splitting
//! on `@` entry markers and parsing each entry independently.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BibtexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no BibTeX entries found")]
    NoEntries,
}

/// One bibliographic record: a citation key, an entry type, and a bag of
/// lowercase field names mapped to their flattened string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub entry_type: String,
    pub fields: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into().to_lowercase(),
            fields: BTreeMap::new(),
        }
    }

    /// Field lookup by lowercase name. Empty values read as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into().to_lowercase(), value.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn doi(&self) -> Option<&str> {
        self.get("doi")
    }

    pub fn url(&self) -> Option<&str> {
        self.get("url")
    }

    /// Publication venue: `booktitle` takes precedence over `journal`.
    pub fn venue(&self) -> Option<&str> {
        self.get("booktitle").or_else(|| self.get("journal"))
    }
}

/// Load entries from a BibTeX file.
pub fn load_entries(path: &Path) -> Result<Vec<Entry>, BibtexError> {
    let content = std::fs::read_to_string(path)?;
    parse_entries(&content)
}

/// Parse .bib content from a string.
pub fn parse_entries(content: &str) -> Result<Vec<Entry>, BibtexError> {
    // Whole-file parse first (fast path)
    if let Ok(bibliography) = biblatex::Bibliography::parse(content) {
        let entries: Vec<Entry> = bibliography.iter().map(convert_entry).collect();
        if !entries.is_empty() {
            return Ok(entries);
        }
    }

    parse_entries_individually(content)
}

/// Split content at `@` entry markers and parse each chunk independently,
/// recovering whatever parses from files the whole-file parser rejects.
fn parse_entries_individually(content: &str) -> Result<Vec<Entry>, BibtexError> {
    static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^@[a-zA-Z]").unwrap());

    let positions: Vec<usize> = ENTRY_RE.find_iter(content).map(|m| m.start()).collect();
    if positions.is_empty() {
        return Err(BibtexError::NoEntries);
    }

    let mut entries = Vec::new();
    for i in 0..positions.len() {
        let start = positions[i];
        let end = if i + 1 < positions.len() {
            positions[i + 1]
        } else {
            content.len()
        };
        if let Ok(bib) = biblatex::Bibliography::parse(&content[start..end]) {
            entries.extend(bib.iter().map(convert_entry));
        }
    }

    if entries.is_empty() {
        return Err(BibtexError::NoEntries);
    }
    Ok(entries)
}

/// Flatten a parsed biblatex entry into our field-map shape.
fn convert_entry(entry: &biblatex::Entry) -> Entry {
    let mut out = Entry::new(entry.key.clone(), entry.entry_type.to_string());

    for (name, chunks) in &entry.fields {
        let value = chunks_to_string(chunks);
        if !value.is_empty() {
            out.fields.insert(name.to_lowercase(), value);
        }
    }

    // biblatex parses `author` into Person records; prefer the structured
    // form so "Last, First" fields come back as "First Last and ..."
    if let Ok(persons) = entry.author() {
        let authors: Vec<String> = persons
            .iter()
            .filter(|p| !p.name.is_empty() || !p.given_name.is_empty())
            .map(format_person)
            .collect();
        if !authors.is_empty() {
            out.fields.insert("author".into(), authors.join(" and "));
        }
    }

    out
}

/// Convert biblatex chunks to a plain string.
fn chunks_to_string(chunks: &[biblatex::Spanned<biblatex::Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            biblatex::Chunk::Normal(s) => s.as_str(),
            biblatex::Chunk::Verbatim(s) => s.as_str(),
            biblatex::Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Format a biblatex Person as "Given Prefix Family Suffix" (western order).
fn format_person(p: &biblatex::Person) -> String {
    let mut parts = Vec::new();
    if !p.given_name.is_empty() {
        parts.push(p.given_name.as_str());
    }
    if !p.prefix.is_empty() {
        parts.push(p.prefix.as_str());
    }
    if !p.name.is_empty() {
        parts.push(p.name.as_str());
    }
    if !p.suffix.is_empty() {
        parts.push(p.suffix.as_str());
    }
    parts.join(" ")
}

/// Write entries to a BibTeX file.
pub fn write_entries(path: &Path, entries: &[Entry]) -> Result<(), BibtexError> {
    let mut file = std::fs::File::create(path)?;
    for entry in entries {
        write_entry(&mut file, entry)?;
    }
    Ok(())
}

fn write_entry(w: &mut impl Write, entry: &Entry) -> std::io::Result<()> {
    writeln!(w, "@{}{{{},", entry.entry_type, entry.key)?;
    for (name, value) in &entry.fields {
        writeln!(w, "  {} = {{{}}},", name, value)?;
    }
    writeln!(w, "}}")?;
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_entry() {
        let bib = r#"
@article{doe2023,
  title = {A Very Important Research Paper Title},
  author = {Doe, John and Smith, Jane},
  journal = {Journal of Testing},
  year = {2023},
  doi = {10.1234/test.2023}
}
"#;
        let entries = parse_entries(bib).unwrap();
        assert_eq!(entries.len(), 1);

        let e = &entries[0];
        assert_eq!(e.key, "doe2023");
        assert_eq!(e.entry_type, "article");
        assert_eq!(e.title(), Some("A Very Important Research Paper Title"));
        assert_eq!(e.get("author"), Some("John Doe and Jane Smith"));
        assert_eq!(e.doi(), Some("10.1234/test.2023"));
        assert_eq!(e.get("year"), Some("2023"));
    }

    #[test]
    fn venue_prefers_booktitle() {
        let bib = r#"
@inproceedings{a,
  title = {Paper With Enough Words In Title},
  booktitle = {Some Conference},
  journal = {Should Not Win},
  year = {2020}
}
"#;
        let entries = parse_entries(bib).unwrap();
        assert_eq!(entries[0].venue(), Some("Some Conference"));
    }

    #[test]
    fn venue_falls_back_to_journal() {
        let bib = r#"
@article{a,
  title = {Paper With Enough Words In Title},
  journal = {Some Journal},
  year = {2020}
}
"#;
        let entries = parse_entries(bib).unwrap();
        assert_eq!(entries[0].venue(), Some("Some Journal"));
    }

    #[test]
    fn accents_decoded() {
        let bib = r#"
@inproceedings{jegou2020,
  title = {Radioactive data tracing through training},
  author = {J{\'e}gou, Herv{\'e}},
  year = {2020}
}
"#;
        let entries = parse_entries(bib).unwrap();
        let author = entries[0].get("author").unwrap();
        assert!(author.contains("gou"), "author: {}", author);
    }

    #[test]
    fn recovers_from_broken_sibling_entry() {
        // The first entry is malformed; the second should still parse.
        let bib = r#"
@article{broken,
  title = {Unclosed brace here

@article{good2021,
  title = {A Perfectly Fine Entry Title},
  author = {Doe, John},
  year = {2021}
}
"#;
        let entries = parse_entries(bib).unwrap();
        assert!(entries.iter().any(|e| e.key == "good2021"));
    }

    #[test]
    fn no_entries_is_error() {
        assert!(matches!(
            parse_entries("not a bib file"),
            Err(BibtexError::NoEntries)
        ));
    }

    #[test]
    fn write_then_reparse() {
        let mut e = Entry::new("key1", "article");
        e.set("title", "Some Title For The Writer Test");
        e.set("author", "John Doe");
        e.set("year", "2022");

        let mut buf = Vec::new();
        write_entry(&mut buf, &e).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("@article{key1,"));

        let reparsed = parse_entries(&text).unwrap();
        assert_eq!(reparsed[0].title(), Some("Some Title For The Writer Test"));
        assert_eq!(reparsed[0].get("year"), Some("2022"));
    }

    #[test]
    fn empty_field_reads_as_absent() {
        let mut e = Entry::new("k", "misc");
        e.set("note", "");
        assert_eq!(e.get("note"), None);
    }
}
