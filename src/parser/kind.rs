//! Node kinds the analyzers care about.
//!
//! Every other grammar kind maps to [`SyntaxKind::Other`], so visitors match
//! on a closed enum instead of comparing strings.

use phf::phf_map;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Program,
    ImportStatement,
    ImportClause,
    NamedImports,
    ImportSpecifier,
    NamespaceImport,
    ExportStatement,
    ExportClause,
    ExportSpecifier,
    LexicalDeclaration,
    VariableDeclaration,
    VariableDeclarator,
    FunctionDeclaration,
    GeneratorFunctionDeclaration,
    FunctionExpression,
    GeneratorFunction,
    ArrowFunction,
    MethodDefinition,
    FormalParameters,
    RequiredParameter,
    OptionalParameter,
    AssignmentPattern,
    ObjectPattern,
    PairPattern,
    ShorthandPropertyIdentifierPattern,
    ObjectAssignmentPattern,
    RestPattern,
    Object,
    Pair,
    ShorthandPropertyIdentifier,
    CallExpression,
    Arguments,
    MemberExpression,
    SubscriptExpression,
    AssignmentExpression,
    BinaryExpression,
    UnaryExpression,
    ParenthesizedExpression,
    AsExpression,
    NonNullExpression,
    SatisfiesExpression,
    AwaitExpression,
    Identifier,
    PropertyIdentifier,
    String,
    TemplateString,
    TemplateSubstitution,
    Number,
    True,
    False,
    Array,
    StatementBlock,
    ExpressionStatement,
    Comment,
    Other,
}

static KINDS: phf::Map<&'static str, SyntaxKind> = phf_map! {
    "program" => SyntaxKind::Program,
    "import_statement" => SyntaxKind::ImportStatement,
    "import_clause" => SyntaxKind::ImportClause,
    "named_imports" => SyntaxKind::NamedImports,
    "import_specifier" => SyntaxKind::ImportSpecifier,
    "namespace_import" => SyntaxKind::NamespaceImport,
    "export_statement" => SyntaxKind::ExportStatement,
    "export_clause" => SyntaxKind::ExportClause,
    "export_specifier" => SyntaxKind::ExportSpecifier,
    "lexical_declaration" => SyntaxKind::LexicalDeclaration,
    "variable_declaration" => SyntaxKind::VariableDeclaration,
    "variable_declarator" => SyntaxKind::VariableDeclarator,
    "function_declaration" => SyntaxKind::FunctionDeclaration,
    "generator_function_declaration" => SyntaxKind::GeneratorFunctionDeclaration,
    "function_expression" => SyntaxKind::FunctionExpression,
    // older grammars name anonymous function expressions `function`
    "function" => SyntaxKind::FunctionExpression,
    "generator_function" => SyntaxKind::GeneratorFunction,
    "arrow_function" => SyntaxKind::ArrowFunction,
    "method_definition" => SyntaxKind::MethodDefinition,
    "formal_parameters" => SyntaxKind::FormalParameters,
    "required_parameter" => SyntaxKind::RequiredParameter,
    "optional_parameter" => SyntaxKind::OptionalParameter,
    "assignment_pattern" => SyntaxKind::AssignmentPattern,
    "object_pattern" => SyntaxKind::ObjectPattern,
    "pair_pattern" => SyntaxKind::PairPattern,
    "shorthand_property_identifier_pattern" => SyntaxKind::ShorthandPropertyIdentifierPattern,
    "object_assignment_pattern" => SyntaxKind::ObjectAssignmentPattern,
    "rest_pattern" => SyntaxKind::RestPattern,
    "object" => SyntaxKind::Object,
    "pair" => SyntaxKind::Pair,
    "shorthand_property_identifier" => SyntaxKind::ShorthandPropertyIdentifier,
    "call_expression" => SyntaxKind::CallExpression,
    "arguments" => SyntaxKind::Arguments,
    "member_expression" => SyntaxKind::MemberExpression,
    "subscript_expression" => SyntaxKind::SubscriptExpression,
    "assignment_expression" => SyntaxKind::AssignmentExpression,
    "binary_expression" => SyntaxKind::BinaryExpression,
    "unary_expression" => SyntaxKind::UnaryExpression,
    "parenthesized_expression" => SyntaxKind::ParenthesizedExpression,
    "as_expression" => SyntaxKind::AsExpression,
    "non_null_expression" => SyntaxKind::NonNullExpression,
    "satisfies_expression" => SyntaxKind::SatisfiesExpression,
    "await_expression" => SyntaxKind::AwaitExpression,
    "identifier" => SyntaxKind::Identifier,
    "property_identifier" => SyntaxKind::PropertyIdentifier,
    "string" => SyntaxKind::String,
    "template_string" => SyntaxKind::TemplateString,
    "template_substitution" => SyntaxKind::TemplateSubstitution,
    "number" => SyntaxKind::Number,
    "true" => SyntaxKind::True,
    "false" => SyntaxKind::False,
    "array" => SyntaxKind::Array,
    "statement_block" => SyntaxKind::StatementBlock,
    "expression_statement" => SyntaxKind::ExpressionStatement,
    "comment" => SyntaxKind::Comment,
};

impl SyntaxKind {
    pub fn from_kind(kind: &str) -> Self {
        KINDS.get(kind).copied().unwrap_or(SyntaxKind::Other)
    }

    /// Classify a node. Anonymous tokens (punctuation, keywords) are `Other`.
    pub fn of(node: &Node) -> Self {
        if !node.is_named() {
            return SyntaxKind::Other;
        }
        Self::from_kind(node.kind())
    }

    /// Nodes that introduce a callable body.
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            SyntaxKind::FunctionDeclaration
                | SyntaxKind::GeneratorFunctionDeclaration
                | SyntaxKind::FunctionExpression
                | SyntaxKind::GeneratorFunction
                | SyntaxKind::ArrowFunction
                | SyntaxKind::MethodDefinition
        )
    }

    /// Expression wrappers that do not change the wrapped value.
    pub fn is_transparent(&self) -> bool {
        matches!(
            self,
            SyntaxKind::ParenthesizedExpression
                | SyntaxKind::AsExpression
                | SyntaxKind::NonNullExpression
                | SyntaxKind::SatisfiesExpression
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(SyntaxKind::from_kind("call_expression"), SyntaxKind::CallExpression);
        assert_eq!(SyntaxKind::from_kind("function"), SyntaxKind::FunctionExpression);
        assert_eq!(SyntaxKind::from_kind("jsx_element"), SyntaxKind::Other);
    }

    #[test]
    fn test_classes() {
        assert!(SyntaxKind::ArrowFunction.is_function());
        assert!(SyntaxKind::MethodDefinition.is_function());
        assert!(!SyntaxKind::CallExpression.is_function());
        assert!(SyntaxKind::AsExpression.is_transparent());
        assert!(!SyntaxKind::AwaitExpression.is_transparent());
    }
}
