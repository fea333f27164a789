use crate::error::{ExtractError, Result};
use crate::grammar::Grammar;
use std::path::Path;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCapture, QueryCursor};

/// The three structural queries every plugin runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Routes,
    Calls,
    Imports,
}

impl QueryKind {
    pub const ALL: [QueryKind; 3] = [QueryKind::Routes, QueryKind::Calls, QueryKind::Imports];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::Routes => "routes",
            QueryKind::Calls => "calls",
            QueryKind::Imports => "imports",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.scm", self.as_str())
    }
}

/// Query text compiled into the binary, used when no override file exists
#[derive(Debug, Clone, Copy)]
pub struct BuiltinQueries {
    pub routes: &'static str,
    pub calls: &'static str,
    pub imports: &'static str,
}

impl BuiltinQueries {
    fn get(&self, kind: QueryKind) -> &'static str {
        match kind {
            QueryKind::Routes => self.routes,
            QueryKind::Calls => self.calls,
            QueryKind::Imports => self.imports,
        }
    }
}

/// Compiled route/call/import queries for one grammar
pub struct QuerySet {
    routes: Query,
    calls: Query,
    imports: Query,
}

impl QuerySet {
    /// Compile the queries for `plugin`.
    ///
    /// For each kind, `<query_dir>/<plugin>/<kind>.scm` wins when it exists
    /// and compiles; otherwise the built-in text is used.
    pub fn load(
        grammar: Grammar,
        plugin: &str,
        query_dir: Option<&Path>,
        builtins: &BuiltinQueries,
    ) -> Result<Self> {
        let load = |kind| load_query(grammar, plugin, kind, query_dir, builtins.get(kind));
        Ok(Self {
            routes: load(QueryKind::Routes)?,
            calls: load(QueryKind::Calls)?,
            imports: load(QueryKind::Imports)?,
        })
    }

    pub fn get(&self, kind: QueryKind) -> &Query {
        match kind {
            QueryKind::Routes => &self.routes,
            QueryKind::Calls => &self.calls,
            QueryKind::Imports => &self.imports,
        }
    }
}

fn load_query(
    grammar: Grammar,
    plugin: &str,
    kind: QueryKind,
    query_dir: Option<&Path>,
    builtin: &str,
) -> Result<Query> {
    let language = grammar.language();

    if let Some(dir) = query_dir {
        let path = dir.join(plugin).join(kind.file_name());
        match std::fs::read_to_string(&path) {
            Ok(text) => match Query::new(&language, &text) {
                Ok(query) => {
                    log::debug!("Loaded {} query from {}", kind.as_str(), path.display());
                    return Ok(query);
                }
                Err(e) => log::warn!(
                    "Query {} does not compile ({}), using built-in",
                    path.display(),
                    e
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot read {}: {}, using built-in", path.display(), e),
        }
    }

    Query::new(&language, builtin)
        .map_err(|e| ExtractError::query(format!("{plugin}/{}", kind.as_str()), e.to_string()))
}

/// Named captures of one query match
pub struct Captures<'a, 'tree> {
    names: &'a [&'a str],
    captures: &'a [QueryCapture<'tree>],
    source: &'a str,
}

impl<'a, 'tree> Captures<'a, 'tree> {
    pub fn node(&self, name: &str) -> Option<Node<'tree>> {
        self.captures
            .iter()
            .find(|capture| self.names.get(capture.index as usize) == Some(&name))
            .map(|capture| capture.node)
    }

    pub fn text(&self, name: &str) -> Option<&'a str> {
        self.node(name)
            .and_then(|node| node.utf8_text(self.source.as_bytes()).ok())
    }

    /// 1-based line of the capture
    pub fn line(&self, name: &str) -> Option<u32> {
        self.node(name).map(line_of)
    }

    pub fn source(&self) -> &'a str {
        self.source
    }
}

/// Run `query` over the tree rooted at `root`, calling `visit` once per match
pub fn for_each_match<'tree, F>(query: &Query, root: Node<'tree>, source: &str, mut visit: F)
where
    F: FnMut(&Captures<'_, 'tree>),
{
    let mut cursor = QueryCursor::new();
    let names = query.capture_names();
    let mut matches = cursor.matches(query, root, source.as_bytes());
    while let Some(m) = matches.next() {
        visit(&Captures {
            names,
            captures: m.captures,
            source,
        });
    }
}

pub fn line_of(node: Node<'_>) -> u32 {
    u32::try_from(node.start_position().row)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    node.utf8_text(source.as_bytes()).ok()
}

const STRING_PREFIX_CHARS: &[char] = &['r', 'R', 'b', 'B', 'u', 'U', 'f', 'F'];
const QUOTES: &[&str] = &["\"\"\"", "'''", "\"", "'", "`"];

/// Strip the delimiters from a string literal as it appears in source.
///
/// Handles single, double, triple and backtick quotes plus Python prefixes
/// such as `r"..."` or `f'...'`. Text that is not a quoted literal is
/// returned trimmed but otherwise unchanged.
pub fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    let body = match trimmed.find(['"', '\'', '`']) {
        Some(idx) if idx <= 2 && trimmed[..idx].chars().all(|c| STRING_PREFIX_CHARS.contains(&c)) => {
            &trimmed[idx..]
        }
        _ => trimmed,
    };

    for quote in QUOTES {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    trimmed
}
