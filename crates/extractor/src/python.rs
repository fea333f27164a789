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
    routes: include_str!("../queries/python/routes.scm"),
    calls: include_str!("../queries/python/calls.scm"),
    imports: include_str!("../queries/python/imports.scm"),
};

const EXTENSIONS: &[&str] = &["py", "pyi"];

/// Flask/FastAPI-style routes, `requests`/`httpx` calls and imports
pub struct PythonPlugin {
    pool: Arc<ParserPool>,
    queries: QuerySet,
    http_clients: Vec<String>,
    http_call_confidence: f64,
}

impl PythonPlugin {
    pub const NAME: &'static str = "python";
    pub const VERSION: &'static str = "1.0.0";

    pub fn new(pool: Arc<ParserPool>, config: &ExtractorConfig) -> Result<Self> {
        let queries = QuerySet::load(
            Grammar::Python,
            Self::NAME,
            config.query_dir.as_deref(),
            &BUILTIN_QUERIES,
        )?;
        Ok(Self {
            pool,
            queries,
            http_clients: config.python_http_clients.clone(),
            http_call_confidence: config.http_call_confidence,
        })
    }

    fn extract_routes(&self, root: Node<'_>, source: &str, service: &str, result: &mut ParseResult) {
        for_each_match(self.queries.get(QueryKind::Routes), root, source, |m| {
            let (Some(path), Some(handler), Some(decorator)) = (
                m.text("route.path"),
                m.text("route.handler"),
                m.text("route.decorator"),
            ) else {
                return;
            };
            let method = route_method(decorator, m.node("route.args"), source);
            let line = m
                .line("route.site")
                .or_else(|| m.line("route.handler"))
                .unwrap_or(1);

            let endpoint = Endpoint::new(service, strip_quotes(path), method)
                .with_handler(handler)
                .at(result.file.clone(), line);
            log::debug!(
                "Found endpoint {} {} -> {}()",
                endpoint.method,
                endpoint.path,
                handler
            );
            result.endpoints.push(endpoint);
        });
    }

    fn extract_calls(&self, root: Node<'_>, source: &str, service: &str, result: &mut ParseResult) {
        for_each_match(self.queries.get(QueryKind::Calls), root, source, |m| {
            let (Some(lib), Some(method), Some(url)) = (
                m.text("http.client.lib"),
                m.text("http.client.method"),
                m.text("http.client.url"),
            ) else {
                return;
            };
            if !self.http_clients.iter().any(|client| client == lib) {
                return;
            }
            let url = strip_quotes(url);
            if url.is_empty() {
                return;
            }

            let line = m.line("http.client.lib").unwrap_or(1);
            log::debug!("Found HTTP call {lib}.{method}({url})");
            result.edges.push(
                Edge::new(service, url_host(url).unwrap_or(url), EdgeType::HttpCall)
                    .with_method(method)
                    .with_endpoint(url)
                    .at(result.file.clone(), line)
                    .with_confidence(self.http_call_confidence),
            );
        });
    }

    fn extract_imports(&self, root: Node<'_>, source: &str, result: &mut ParseResult) {
        for_each_match(self.queries.get(QueryKind::Imports), root, source, |m| {
            if let Some(module) = m.text("import.module").or_else(|| m.text("import.from.module")) {
                result.imports.push(module.to_string());
            }
        });
    }
}

/// Method for a route decorator: the verb itself for `@app.get(...)`, else
/// the first recognized entry of `methods=[...]`, else GET.
fn route_method(decorator: &str, args: Option<Node<'_>>, source: &str) -> HttpMethod {
    let verb = HttpMethod::from_name(decorator);
    if verb != HttpMethod::Unknown {
        return verb;
    }
    args.and_then(|args| methods_keyword(args, source))
        .unwrap_or(HttpMethod::Get)
}

fn methods_keyword(args: Node<'_>, source: &str) -> Option<HttpMethod> {
    let mut cursor = args.walk();
    let keyword = args.named_children(&mut cursor).find(|child| {
        child.kind() == "keyword_argument"
            && child
                .child_by_field_name("name")
                .and_then(|name| node_text(name, source))
                == Some("methods")
    })?;

    let value = keyword.child_by_field_name("value")?;
    let known = |node: Node<'_>| {
        node_text(node, source)
            .map(|text| HttpMethod::from_name(strip_quotes(text)))
            .filter(|method| *method != HttpMethod::Unknown)
    };
    if value.kind() == "string" {
        return known(value);
    }
    let mut cursor = value.walk();
    let method = value
        .named_children(&mut cursor)
        .filter(|item| item.kind() == "string")
        .find_map(known);
    method
}

impl LanguagePlugin for PythonPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn version(&self) -> &str {
        Self::VERSION
    }

    fn extensions(&self) -> &[&'static str] {
        EXTENSIONS
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
            let mut parser = self.pool.acquire(Grammar::Python)?;
            parser
                .parse(&source, None)
                .ok_or_else(|| ExtractError::ParseFailed(path.to_path_buf()))?
        };
        let root = tree.root_node();

        let file = path.to_string_lossy().into_owned();
        let mut result = ParseResult::new(file.clone(), Self::NAME);
        result.syntax_errors = root.has_error();
        if result.syntax_errors {
            log::warn!("Syntax errors in {}, extracting from partial tree", path.display());
        }
        result.service =
            Some(Service::new(service_name, Self::NAME, service_root(path)).with_file(file));

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
