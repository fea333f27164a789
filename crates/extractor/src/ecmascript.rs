use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::grammar::Grammar;
use crate::plugin::{read_source, service_root, url_host, LanguagePlugin};
use crate::pool::ParserPool;
use crate::query::{for_each_match, node_text, strip_quotes, BuiltinQueries, QueryKind, QuerySet};
use archmap_manifest::{Edge, EdgeType, Endpoint, HttpMethod, ParseResult, Service};
use std::path::Path;
use std::sync::Arc;
use tree_sitter::Node;

const BUILTIN_QUERIES: BuiltinQueries = BuiltinQueries {
    routes: include_str!("../queries/javascript/routes.scm"),
    calls: include_str!("../queries/javascript/calls.scm"),
    imports: include_str!("../queries/javascript/imports.scm"),
};

const JAVASCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];
const TYPESCRIPT_EXTENSIONS: &[&str] = &["ts", "mts", "cts"];

/// Express-style routes, fetch/axios-style calls, `import` and `require`.
///
/// One instance per grammar; the JavaScript and TypeScript plugins share
/// their query text.
pub struct EcmaScriptPlugin {
    name: &'static str,
    grammar: Grammar,
    extensions: &'static [&'static str],
    pool: Arc<ParserPool>,
    queries: QuerySet,
    http_clients: Vec<String>,
    http_call_confidence: f64,
}

impl EcmaScriptPlugin {
    pub const VERSION: &'static str = "1.0.0";

    pub fn javascript(pool: Arc<ParserPool>, config: &ExtractorConfig) -> Result<Self> {
        Self::build("javascript", Grammar::JavaScript, JAVASCRIPT_EXTENSIONS, pool, config)
    }

    pub fn typescript(pool: Arc<ParserPool>, config: &ExtractorConfig) -> Result<Self> {
        Self::build("typescript", Grammar::TypeScript, TYPESCRIPT_EXTENSIONS, pool, config)
    }

    fn build(
        name: &'static str,
        grammar: Grammar,
        extensions: &'static [&'static str],
        pool: Arc<ParserPool>,
        config: &ExtractorConfig,
    ) -> Result<Self> {
        let queries = QuerySet::load(grammar, name, config.query_dir.as_deref(), &BUILTIN_QUERIES)?;
        Ok(Self {
            name,
            grammar,
            extensions,
            pool,
            queries,
            http_clients: config.javascript_http_clients.clone(),
            http_call_confidence: config.http_call_confidence,
        })
    }

    fn is_client(&self, ident: &str) -> bool {
        self.http_clients.iter().any(|client| client == ident)
    }

    fn extract_routes(&self, root: Node<'_>, source: &str, service: &str, result: &mut ParseResult) {
        for_each_match(self.queries.get(QueryKind::Routes), root, source, |m| {
            let (Some(object), Some(verb), Some(path), Some(args)) = (
                m.text("route.object"),
                m.text("route.decorator"),
                m.text("route.path"),
                m.node("route.args"),
            ) else {
                return;
            };
            if self.is_client(object) {
                return;
            }
            let path = strip_quotes(path);
            if !path.starts_with('/') {
                return;
            }
            let Some(handler) = route_handler(args, source) else {
                return;
            };

            let mut endpoint = Endpoint::new(service, path, HttpMethod::from_name(verb))
                .at(result.file.clone(), m.line("route.site").unwrap_or(1));
            endpoint.handler = handler;
            result.endpoints.push(endpoint);
        });
    }

    fn extract_calls(&self, root: Node<'_>, source: &str, service: &str, result: &mut ParseResult) {
        for_each_match(self.queries.get(QueryKind::Calls), root, source, |m| {
            let (Some(lib), Some(url)) = (m.text("http.client.lib"), m.text("http.client.url"))
            else {
                return;
            };
            if !self.is_client(lib) {
                return;
            }
            let url = strip_quotes(url);
            if url.is_empty() {
                return;
            }

            let mut edge = Edge::new(service, url_host(url).unwrap_or(url), EdgeType::HttpCall)
                .with_endpoint(url)
                .at(result.file.clone(), m.line("http.client.lib").unwrap_or(1))
                .with_confidence(self.http_call_confidence);
            edge.method = m.text("http.client.method").map(str::to_string);
            result.edges.push(edge);
        });
    }

    fn extract_imports(&self, root: Node<'_>, source: &str, result: &mut ParseResult) {
        for_each_match(self.queries.get(QueryKind::Imports), root, source, |m| {
            if let Some(module) = m.text("import.module") {
                result.imports.push(strip_quotes(module).to_string());
            }
        });
    }
}

/// The last argument of a route registration, when it looks like a handler.
///
/// Outer `None` means the call is not a route; inner `None` is an inline
/// anonymous handler.
fn route_handler(args: Node<'_>, source: &str) -> Option<Option<String>> {
    let mut cursor = args.walk();
    let values: Vec<Node<'_>> = args
        .named_children(&mut cursor)
        .filter(|arg| arg.kind() != "comment")
        .collect();
    if values.len() < 2 {
        return None;
    }
    let last = *values.last()?;
    match last.kind() {
        "identifier" | "member_expression" => {
            Some(node_text(last, source).map(str::to_string))
        }
        "function_expression" | "function" => Some(
            last.child_by_field_name("name")
                .and_then(|name| node_text(name, source))
                .map(str::to_string),
        ),
        "arrow_function" => Some(None),
        _ => None,
    }
}

impl LanguagePlugin for EcmaScriptPlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> &str {
        Self::VERSION
    }

    fn extensions(&self) -> &[&'static str] {
        self.extensions
    }

    fn parse_file(&self, path: &Path, service_name: &str) -> Result<ParseResult> {
        if service_name.is_empty() {
            return Err(ExtractError::InvalidArgument(format!(
                "empty service name for {}",
                path.display()
            )));
        }

        let source = read_source(path)?;
        let tree = {
            let mut parser = self.pool.acquire(self.grammar)?;
            parser
                .parse(&source, None)
                .ok_or_else(|| ExtractError::ParseFailed(path.to_path_buf()))?
        };
        let root = tree.root_node();

        let file = path.to_string_lossy().into_owned();
        let mut result = ParseResult::new(file.clone(), self.name);
        result.syntax_errors = root.has_error();
        if result.syntax_errors {
            log::warn!("Syntax errors in {}, extracting from partial tree", path.display());
        }
        result.service =
            Some(Service::new(service_name, self.name, service_root(path)).with_file(file));

        self.extract_routes(root, &source, service_name, &mut result);
        self.extract_calls(root, &source, service_name, &mut result);
        self.extract_imports(root, &source, &mut result);

        log::debug!(
            "Parsed {}: {} endpoints, {} edges, {} imports",
            path.display(),
            result.endpoints.len(),
            result.edges.len(),
            result.imports.len()
        );
        Ok(result)
    }
}
