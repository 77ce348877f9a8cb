//! Route and mount registrations recognized in call expressions.

use tree_sitter::Node;

use super::facts::{HandlerArg, RouteRecord, Span};
use crate::endpoint::{EndpointDescriptor, HttpMethod};
use crate::parser::text::{literal_value, named_children, node_text, string_value, unwrap_expression};
use crate::parser::SyntaxKind;

/// Callee member property and arguments of `receiver.method(...)`.
fn member_call<'t>(call: Node<'t>, source: &str) -> Option<(String, Vec<Node<'t>>)> {
    let callee = unwrap_expression(call.child_by_field_name("function")?);
    if SyntaxKind::of(&callee) != SyntaxKind::MemberExpression {
        return None;
    }
    let property = callee.child_by_field_name("property")?;
    if SyntaxKind::of(&property) != SyntaxKind::PropertyIdentifier {
        return None;
    }
    let args = named_children(call.child_by_field_name("arguments")?);
    Some((node_text(property, source).to_string(), args))
}

/// `x.get('/path', ...handlers)` and the other HTTP verbs.
///
/// The URL may be a string or template literal; an empty URL is not a route.
pub fn route_from_call(call: Node, source: &str) -> Option<RouteRecord> {
    let (property, args) = member_call(call, source)?;
    let method = HttpMethod::from_router_method(&property)?;
    if args.len() < 2 {
        return None;
    }

    let url = literal_value(args[0], source)?;
    if url.is_empty() {
        return None;
    }

    Some(RouteRecord {
        endpoint: EndpointDescriptor::new(method, url),
        handler_args: args[1..].iter().map(|a| handler_arg(*a, source)).collect(),
        span: Span::from_node(call),
    })
}

/// `x.use('/prefix', router)`: returns the prefix and the router's local name.
pub fn mount_from_call(call: Node, source: &str) -> Option<(String, String)> {
    let (property, args) = member_call(call, source)?;
    if property != "use" || args.len() < 2 {
        return None;
    }
    let prefix = string_value(args[0], source)?;
    let router = unwrap_expression(args[1]);
    if SyntaxKind::of(&router) != SyntaxKind::Identifier {
        return None;
    }
    Some((prefix, node_text(router, source).to_string()))
}

fn handler_arg(arg: Node, source: &str) -> HandlerArg {
    let arg = unwrap_expression(arg);
    match SyntaxKind::of(&arg) {
        kind if kind.is_function() => HandlerArg::Inline(Span::from_node(arg)),
        SyntaxKind::Identifier => HandlerArg::Identifier(node_text(arg, source).to_string()),
        SyntaxKind::MemberExpression => {
            let object = arg.child_by_field_name("object").map(unwrap_expression);
            let property = arg.child_by_field_name("property");
            match (object, property) {
                (Some(o), Some(p))
                    if SyntaxKind::of(&o) == SyntaxKind::Identifier
                        && SyntaxKind::of(&p) == SyntaxKind::PropertyIdentifier =>
                {
                    HandlerArg::Member {
                        object: node_text(o, source).to_string(),
                        property: node_text(p, source).to_string(),
                    }
                }
                _ => HandlerArg::Other,
            }
        }
        SyntaxKind::CallExpression => match wrapped_function(arg) {
            Some(inner) => HandlerArg::Inline(Span::from_node(inner)),
            None => HandlerArg::Other,
        },
        _ => HandlerArg::Other,
    }
}

/// The function passed as last argument to a plain wrapper call such as
/// `asyncHandler(async (req, res) => ...)`.
///
/// Only identifier callees count; `items.map(fn)` is not a wrapper.
pub fn wrapped_function(call: Node) -> Option<Node> {
    if SyntaxKind::of(&call) != SyntaxKind::CallExpression {
        return None;
    }
    let callee = call.child_by_field_name("function")?;
    if SyntaxKind::of(&callee) != SyntaxKind::Identifier {
        return None;
    }
    let last = named_children(call.child_by_field_name("arguments")?)
        .into_iter()
        .last()
        .map(unwrap_expression)?;
    SyntaxKind::of(&last).is_function().then_some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, walk, ParsedFile, Walk};
    use std::path::Path;

    fn calls(source: &str) -> (ParsedFile, Vec<(usize, usize)>) {
        let parsed = parse_source(Path::new("r.js"), source.to_string()).unwrap();
        let mut spans = Vec::new();
        walk(parsed.root(), &mut |node: Node, kind: SyntaxKind| {
            if kind == SyntaxKind::CallExpression {
                spans.push((node.start_byte(), node.end_byte()));
            }
            Walk::Continue
        });
        (parsed, spans)
    }

    fn routes(source: &str) -> Vec<RouteRecord> {
        let (parsed, spans) = calls(source);
        spans
            .into_iter()
            .filter_map(|(s, e)| {
                let node = parsed.root().descendant_for_byte_range(s, e)?;
                route_from_call(node, &parsed.source)
            })
            .collect()
    }

    #[test]
    fn test_route_with_inline_handler() {
        let found = routes("router.post('/users/:id', auth, (req, res) => res.json({}));");
        assert_eq!(found.len(), 1);
        let route = &found[0];
        assert_eq!(route.endpoint.method, HttpMethod::Post);
        assert_eq!(route.endpoint.url, "/users/:id");
        assert_eq!(route.handler_args.len(), 2);
        assert_eq!(route.handler_args[0], HandlerArg::Identifier("auth".to_string()));
        assert!(matches!(route.handler_args[1], HandlerArg::Inline(_)));
    }

    #[test]
    fn test_template_url_and_member_handler() {
        let found = routes("app.get(`${API}/items`, controller.list);");
        assert_eq!(found[0].endpoint.url, "${...}/items");
        assert_eq!(
            found[0].handler_args[0],
            HandlerArg::Member {
                object: "controller".to_string(),
                property: "list".to_string()
            }
        );
    }

    #[test]
    fn test_non_routes_ignored() {
        assert!(routes("app.get('env');").is_empty());
        assert!(routes("app.get('', handler);").is_empty());
        assert!(routes("app.fetch('/x', handler);").is_empty());
        assert!(routes("get('/x', handler);").is_empty());
        assert!(routes("app.get(path, handler);").is_empty());
    }

    #[test]
    fn test_wrapped_handler_is_inline() {
        let found = routes("router.put('/x', asyncHandler(async (req, res) => {}));");
        assert!(matches!(found[0].handler_args[0], HandlerArg::Inline(_)));
        let found = routes("router.put('/x', items.map((i) => i));");
        assert_eq!(found[0].handler_args[0], HandlerArg::Other);
    }

    #[test]
    fn test_mounts() {
        let (parsed, spans) = calls(
            "app.use('/api/users', usersRouter); app.use(cors()); app.use('/x', require('./x'));",
        );
        let mounts: Vec<(String, String)> = spans
            .into_iter()
            .filter_map(|(s, e)| {
                let node = parsed.root().descendant_for_byte_range(s, e)?;
                mount_from_call(node, &parsed.source)
            })
            .collect();
        assert_eq!(mounts, vec![("/api/users".to_string(), "usersRouter".to_string())]);
    }
}
