//! Request-shape inference over a handler function.
//!
//! The handler's first parameter is the request. Reads of `req.params`,
//! `req.query`, `req.body` and `req.headers` (through property access,
//! string subscripts, destructuring, or aliases such as
//! `const { body } = req`) record typed fields. A field that reaches
//! `parseInt`/`parseFloat`/`Number`, unary `+`/`-` or arithmetic is upgraded
//! from `string` to `number` once the whole body has been seen.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::endpoint::{EndpointDescriptor, FieldType, ParamType};
use crate::parser::text::{
    first_named, named_children, node_text, pattern_entries, string_value, unwrap_expression,
};
use crate::parser::{walk, SyntaxKind, Visitor, Walk};

/// Callees whose first argument is coerced to a number.
const NUMERIC_COERCIONS: &[&str] = &["parseInt", "parseFloat", "Number"];

/// Request accessor methods that read one header.
const HEADER_ACCESSORS: &[&str] = &["get", "header"];

/// Fields inferred from one handler body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerFacts {
    pub params: Vec<ParamType>,
    pub query: Vec<ParamType>,
    pub body: Vec<ParamType>,
    pub headers: Vec<String>,
}

impl HandlerFacts {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.query.is_empty() && self.body.is_empty() && self.headers.is_empty()
    }

    /// Merge into an endpoint. Existing URL params keep their place and only
    /// change type when a non-string type was inferred.
    pub fn apply_to(&self, endpoint: &mut EndpointDescriptor) {
        for param in &self.params {
            match endpoint.param_types.iter_mut().find(|p| p.name == param.name) {
                Some(existing) => {
                    if param.field_type != FieldType::String {
                        existing.field_type = param.field_type;
                    }
                }
                None => endpoint.param_types.push(param.clone()),
            }
        }
        merge_absent(&mut endpoint.query_param_types, &self.query);
        merge_absent(&mut endpoint.body_param_types, &self.body);
        for header in &self.headers {
            endpoint.add_header(header);
        }
        endpoint.refresh_data_type();
    }
}

fn merge_absent(into: &mut Vec<ParamType>, from: &[ParamType]) {
    for param in from {
        if !into.iter().any(|p| p.name == param.name) {
            into.push(param.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Bucket {
    Params,
    Query,
    Body,
    Headers,
}

impl Bucket {
    fn from_property(name: &str) -> Option<Self> {
        match name {
            "params" => Some(Bucket::Params),
            "query" => Some(Bucket::Query),
            "body" => Some(Bucket::Body),
            "headers" => Some(Bucket::Headers),
            _ => None,
        }
    }

    fn required(&self) -> bool {
        !matches!(self, Bucket::Query)
    }
}

/// Infer request fields from `function`'s body.
///
/// Functions without parameters yield no facts.
pub fn infer_handler(function: Node, source: &str) -> HandlerFacts {
    let Some((request_name, aliases)) = request_binding(function, source) else {
        return HandlerFacts::default();
    };
    let Some(body) = function.child_by_field_name("body") else {
        return HandlerFacts::default();
    };

    let mut inference = Inference {
        source,
        request_name,
        aliases,
        locals: HashMap::new(),
        facts: HandlerFacts::default(),
        numeric_fields: Vec::new(),
        numeric_locals: Vec::new(),
    };
    walk(body, &mut inference);
    inference.finish()
}

/// The request parameter: its name, or the buckets it destructures.
fn request_binding(function: Node, source: &str) -> Option<(Option<String>, HashMap<String, Bucket>)> {
    let mut param = match function.child_by_field_name("parameter") {
        Some(single) => single,
        None => first_named(function.child_by_field_name("parameters")?)?,
    };
    loop {
        param = match SyntaxKind::of(&param) {
            SyntaxKind::RequiredParameter | SyntaxKind::OptionalParameter => {
                param.child_by_field_name("pattern")?
            }
            SyntaxKind::AssignmentPattern => param.child_by_field_name("left")?,
            _ => break,
        };
    }

    match SyntaxKind::of(&param) {
        SyntaxKind::Identifier => Some((Some(node_text(param, source).to_string()), HashMap::new())),
        SyntaxKind::ObjectPattern => {
            let aliases = pattern_entries(param, source)
                .into_iter()
                .filter_map(|e| Bucket::from_property(&e.key).map(|b| (e.local, b)))
                .collect();
            Some((None, aliases))
        }
        _ => None,
    }
}

struct Inference<'s> {
    source: &'s str,
    request_name: Option<String>,
    /// Local names bound directly to a bucket, e.g. `body` in `const { body } = req`.
    aliases: HashMap<String, Bucket>,
    /// Locals destructured out of a bucket, with the field they hold.
    locals: HashMap<String, (Bucket, String)>,
    facts: HandlerFacts,
    numeric_fields: Vec<(Bucket, String)>,
    numeric_locals: Vec<String>,
}

impl<'s> Inference<'s> {
    fn is_request(&self, node: Node) -> bool {
        let node = unwrap_expression(node);
        SyntaxKind::of(&node) == SyntaxKind::Identifier
            && self.request_name.as_deref() == Some(node_text(node, self.source))
    }

    fn bucket_of(&self, node: Node, kind: SyntaxKind) -> Option<Bucket> {
        match kind {
            SyntaxKind::MemberExpression => {
                if !self.is_request(node.child_by_field_name("object")?) {
                    return None;
                }
                let property = node.child_by_field_name("property")?;
                Bucket::from_property(node_text(property, self.source))
            }
            SyntaxKind::Identifier => self.aliases.get(node_text(node, self.source)).copied(),
            _ => None,
        }
    }

    /// A nested function whose parameters rebind the request or an alias.
    fn shadows_request(&self, function: Node) -> bool {
        parameter_names(function, self.source).iter().any(|name| {
            self.request_name.as_deref() == Some(name.as_str()) || self.aliases.contains_key(name)
        })
    }

    /// `const { body, query: q } = req`
    fn destructure_request(&mut self, declarator: Node) {
        let (Some(name), Some(value)) = (
            declarator.child_by_field_name("name"),
            declarator.child_by_field_name("value"),
        ) else {
            return;
        };
        if SyntaxKind::of(&name) != SyntaxKind::ObjectPattern || !self.is_request(value) {
            return;
        }
        for entry in pattern_entries(name, self.source) {
            if let Some(bucket) = Bucket::from_property(&entry.key) {
                self.aliases.insert(entry.local, bucket);
            }
        }
    }

    /// `req.get('x-api-key')` and `req.header('authorization')`.
    fn header_call(&mut self, call: Node) {
        let Some(callee) = call.child_by_field_name("function").map(unwrap_expression) else {
            return;
        };
        if SyntaxKind::of(&callee) != SyntaxKind::MemberExpression {
            return;
        }
        let (Some(object), Some(property)) = (
            callee.child_by_field_name("object"),
            callee.child_by_field_name("property"),
        ) else {
            return;
        };
        if !self.is_request(object) || !HEADER_ACCESSORS.contains(&node_text(property, self.source)) {
            return;
        }
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        if arguments.named_child_count() != 1 {
            return;
        }
        if let Some(name) = arguments.named_child(0).and_then(|a| string_value(a, self.source)) {
            self.add_header(name);
        }
    }

    fn add_header(&mut self, name: String) {
        if !self.facts.headers.contains(&name) {
            self.facts.headers.push(name);
        }
    }

    /// A node that evaluates to a whole bucket; the parent decides which field
    /// is read.
    fn bucket_access(&mut self, node: Node, bucket: Bucket) {
        let (accessed, parent) = skip_wrappers(node);
        let Some(parent) = parent else {
            return;
        };

        match SyntaxKind::of(&parent) {
            SyntaxKind::MemberExpression if parent.child_by_field_name("object") == Some(accessed) => {
                if let Some(property) = parent.child_by_field_name("property") {
                    let name = node_text(property, self.source).to_string();
                    self.record(bucket, name, FieldType::String, Some(parent));
                }
            }
            SyntaxKind::SubscriptExpression if parent.child_by_field_name("object") == Some(accessed) => {
                if let Some(key) = parent
                    .child_by_field_name("index")
                    .and_then(|i| string_value(i, self.source))
                {
                    self.record(bucket, key, FieldType::String, Some(parent));
                }
            }
            SyntaxKind::VariableDeclarator if parent.child_by_field_name("value") == Some(accessed) => {
                let Some(name) = parent.child_by_field_name("name") else {
                    return;
                };
                match SyntaxKind::of(&name) {
                    SyntaxKind::ObjectPattern => {
                        for entry in pattern_entries(name, self.source) {
                            let field_type = entry
                                .default
                                .map(literal_type)
                                .unwrap_or(FieldType::String);
                            self.record(bucket, entry.key.clone(), field_type, None);
                            self.locals.insert(entry.local, (bucket, entry.key));
                        }
                    }
                    SyntaxKind::Identifier if bucket != Bucket::Headers => {
                        let name = node_text(name, self.source).to_string();
                        self.record(bucket, name, FieldType::Object, None);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn record(&mut self, bucket: Bucket, name: String, field_type: FieldType, access: Option<Node>) {
        if access.is_some_and(|a| is_numeric_context(a, self.source)) {
            self.numeric_fields.push((bucket, name.clone()));
        }

        let list = match bucket {
            Bucket::Headers => {
                self.add_header(name);
                return;
            }
            Bucket::Params => &mut self.facts.params,
            Bucket::Query => &mut self.facts.query,
            Bucket::Body => &mut self.facts.body,
        };
        match list.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                if bucket == Bucket::Params && field_type != FieldType::String {
                    existing.field_type = field_type;
                }
            }
            None => list.push(ParamType::new(name, field_type, bucket.required())),
        }
    }

    fn finish(mut self) -> HandlerFacts {
        let from_locals: Vec<(Bucket, String)> = self
            .numeric_locals
            .iter()
            .filter_map(|name| self.locals.get(name).cloned())
            .collect();

        for (bucket, name) in self.numeric_fields.iter().chain(from_locals.iter()) {
            let list = match bucket {
                Bucket::Params => &mut self.facts.params,
                Bucket::Query => &mut self.facts.query,
                Bucket::Body => &mut self.facts.body,
                Bucket::Headers => continue,
            };
            if let Some(field) = list.iter_mut().find(|p| &p.name == name) {
                if field.field_type == FieldType::String {
                    field.field_type = FieldType::Number;
                }
            }
        }
        self.facts
    }
}

impl<'tree, 's> Visitor<'tree> for Inference<'s> {
    fn enter(&mut self, node: Node<'tree>, kind: SyntaxKind) -> Walk {
        if kind.is_function() && self.shadows_request(node) {
            return Walk::SkipChildren;
        }
        match kind {
            SyntaxKind::VariableDeclarator => self.destructure_request(node),
            SyntaxKind::CallExpression => self.header_call(node),
            _ => {}
        }

        if let Some(bucket) = self.bucket_of(node, kind) {
            self.bucket_access(node, bucket);
        } else if kind == SyntaxKind::Identifier {
            let name = node_text(node, self.source);
            if self.locals.contains_key(name) && is_numeric_context(node, self.source) {
                self.numeric_locals.push(name.to_string());
            }
        }
        Walk::Continue
    }
}

/// Names bound by a function's parameter list.
fn parameter_names(function: Node, source: &str) -> Vec<String> {
    let params: Vec<Node> = match function.child_by_field_name("parameter") {
        Some(single) => vec![single],
        None => match function.child_by_field_name("parameters") {
            Some(list) => named_children(list),
            None => Vec::new(),
        },
    };

    let mut names = Vec::new();
    for mut param in params {
        loop {
            let next = match SyntaxKind::of(&param) {
                SyntaxKind::RequiredParameter | SyntaxKind::OptionalParameter => {
                    param.child_by_field_name("pattern")
                }
                SyntaxKind::AssignmentPattern => param.child_by_field_name("left"),
                _ => break,
            };
            match next {
                Some(inner) => param = inner,
                None => break,
            }
        }
        match SyntaxKind::of(&param) {
            SyntaxKind::Identifier => names.push(node_text(param, source).to_string()),
            SyntaxKind::ObjectPattern => {
                names.extend(pattern_entries(param, source).into_iter().map(|e| e.local));
            }
            _ => {}
        }
    }
    names
}

/// Climb past parentheses and type assertions around `node`.
fn skip_wrappers(node: Node) -> (Node, Option<Node>) {
    let mut child = node;
    let mut parent = node.parent();
    while let Some(p) = parent {
        if !SyntaxKind::of(&p).is_transparent() {
            break;
        }
        child = p;
        parent = p.parent();
    }
    (child, parent)
}

/// Whether the value of `node` is used as a number.
fn is_numeric_context(node: Node, source: &str) -> bool {
    let (child, parent) = skip_wrappers(node);
    let Some(parent) = parent else {
        return false;
    };

    match SyntaxKind::of(&parent) {
        SyntaxKind::Arguments => {
            if first_named(parent) != Some(child) {
                return false;
            }
            let Some(callee) = parent
                .parent()
                .and_then(|call| call.child_by_field_name("function"))
            else {
                return false;
            };
            is_numeric_coercion(unwrap_expression(callee), source)
        }
        SyntaxKind::UnaryExpression => parent
            .child_by_field_name("operator")
            .is_some_and(|op| matches!(op.kind(), "+" | "-")),
        SyntaxKind::BinaryExpression => {
            let Some(operator) = parent.child_by_field_name("operator") else {
                return false;
            };
            match operator.kind() {
                "-" | "*" | "/" | "%" | "**" => true,
                "+" => {
                    let other = if parent.child_by_field_name("left") == Some(child) {
                        parent.child_by_field_name("right")
                    } else {
                        parent.child_by_field_name("left")
                    };
                    other
                        .map(unwrap_expression)
                        .is_some_and(|o| SyntaxKind::of(&o) == SyntaxKind::Number)
                }
                _ => false,
            }
        }
        _ => false,
    }
}

/// `parseInt`, `parseFloat`, `Number`, `Number.parseInt`, `Number.parseFloat`.
fn is_numeric_coercion(callee: Node, source: &str) -> bool {
    match SyntaxKind::of(&callee) {
        SyntaxKind::Identifier => NUMERIC_COERCIONS.contains(&node_text(callee, source)),
        SyntaxKind::MemberExpression => {
            let object = callee.child_by_field_name("object");
            let property = callee.child_by_field_name("property");
            object.is_some_and(|o| node_text(o, source) == "Number")
                && property.is_some_and(|p| matches!(node_text(p, source), "parseInt" | "parseFloat"))
        }
        _ => false,
    }
}

/// Type suggested by a default value.
fn literal_type(node: Node) -> FieldType {
    let node = unwrap_expression(node);
    match SyntaxKind::of(&node) {
        SyntaxKind::Number => FieldType::Number,
        SyntaxKind::True | SyntaxKind::False => FieldType::Boolean,
        SyntaxKind::Array => FieldType::Array,
        SyntaxKind::Object => FieldType::Object,
        SyntaxKind::UnaryExpression => match node.child_by_field_name("argument") {
            Some(arg) if SyntaxKind::of(&arg) == SyntaxKind::Number => FieldType::Number,
            _ => FieldType::String,
        },
        _ => FieldType::String,
    }
}
