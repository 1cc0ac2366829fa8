//! Recursive-descent parser: turns one source file's token stream into a
//! `ClassTable` (symbol tables plus each subroutine's statement AST).

pub mod ast;
mod error;
mod parser;
pub mod symbol;

pub use error::ParseError;
pub use parser::Parser;
pub use symbol::{ClassId, ClassList, ClassTable, FunctionKind, FunctionTable, VariableKind, VariableSymbol};

/// Parses one source file into a `ClassTable`, ready to be pushed into a
/// shared `ClassList` once every input file has been parsed.
pub fn parse_class(source: &str) -> Result<ClassTable, ParseError> {
    Parser::new(source).parse_class()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_class() {
        let class = parse_class("class Main { }").unwrap();
        assert_eq!(class.name, "Main");
        assert!(class.variables.is_empty());
        assert!(class.functions.is_empty());
    }

    #[test]
    fn parses_fields_and_statics() {
        let class = parse_class("class Point { field int x, y; static int count; }").unwrap();
        assert_eq!(class.variables.len(), 3);
        assert_eq!(class.variables[0].name, "x");
        assert_eq!(class.variables[2].kind, symbol::VariableKind::Static);
    }

    #[test]
    fn parses_method_with_body() {
        let class = parse_class(
            "class Point { field int x; method int getX() { return x; } }",
        )
        .unwrap();
        let function = &class.functions[0];
        assert_eq!(function.kind, symbol::FunctionKind::Method);
        assert_eq!(function.statements.len(), 1);
    }

    #[test]
    fn var_declarations_do_not_become_statements() {
        let class = parse_class(
            "class Main { function void run() { var int i; let i = 0; return; } }",
        )
        .unwrap();
        let function = &class.functions[0];
        assert_eq!(function.locals.len(), 1);
        assert_eq!(function.statements.len(), 2);
    }

    #[test]
    fn if_else_parses_both_branches() {
        let class = parse_class(
            "class Main { function void run() { if (true) { let x = 1; } else { let x = 2; } return; } }",
        )
        .unwrap();
        match &class.functions[0].statements[0] {
            ast::Statement::If(if_stmt) => {
                assert_eq!(if_stmt.then_branch.len(), 1);
                assert_eq!(if_stmt.else_branch.len(), 1);
            }
            _ => panic!("expected if statement"),
        }
    }

    #[test]
    fn expression_is_left_to_right_no_precedence() {
        let class = parse_class(
            "class Main { function int run() { return 1 + 2 * 3; } }",
        )
        .unwrap();
        match &class.functions[0].statements[0] {
            ast::Statement::Return { value: Some(expr), .. } => {
                assert_eq!(expr.terms.len(), 3);
                assert_eq!(expr.operators, vec![b'+', b'*']);
            }
            _ => panic!("expected return statement"),
        }
    }

    #[test]
    fn syntax_error_reports_expected_and_got() {
        let err = parse_class("class Main { int x; }").unwrap_err();
        match err {
            ParseError::Unexpected { expected, .. } => {
                assert_eq!(expected, "Class variable or subroutine");
            }
            _ => panic!("expected syntax error"),
        }
    }

    #[test]
    fn method_call_with_qualifier_splits_name() {
        let class = parse_class(
            "class Main { function void run() { do Output.println(); return; } }",
        )
        .unwrap();
        match &class.functions[0].statements[0] {
            ast::Statement::Do(call) => {
                assert_eq!(call.qualifier.as_deref(), Some("Output"));
                assert_eq!(call.name, "println");
            }
            _ => panic!("expected do statement"),
        }
    }
}
