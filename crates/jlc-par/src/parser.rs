use jlc_lex::{Lexer, Token, TokenKind};

use crate::ast::{
    Expression, IfStatement, KeywordConstant, LetStatement, Statement, SubroutineCall, Term,
    UnaryOp, WhileStatement,
};
use crate::error::ParseError;
use crate::symbol::{ClassTable, FunctionKind, FunctionTable, VariableKind, VariableSymbol};

const PRIMITIVE_TYPES: &[&str] = &["int", "char", "boolean"];

/// Recursive-descent parser over one source file's token stream. Builds the
/// class's `ClassTable` (including its `FunctionTable`s and `VariableSymbol`s)
/// directly as it descends, and produces the AST for each subroutine body.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(source),
        }
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        Ok(self.lexer.next()?)
    }

    fn peek(&mut self) -> Result<Token, ParseError> {
        Ok(self.lexer.peek()?.clone())
    }

    fn expect_punctuator(&mut self, c: char, expected: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if !token.is_punctuator(c) {
            return Err(ParseError::unexpected(expected, &token));
        }
        Ok(token)
    }

    fn expect_operator(&mut self, c: char, expected: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if !token.is_operator(c) {
            return Err(ParseError::unexpected(expected, &token));
        }
        Ok(token)
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::unexpected(expected, &token));
        }
        Ok(token)
    }

    fn expect_keyword(&mut self, word: &str, expected: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if !token.is_keyword(word) {
            return Err(ParseError::unexpected(expected, &token));
        }
        Ok(token)
    }

    pub fn parse_class(&mut self) -> Result<ClassTable, ParseError> {
        self.expect_keyword("class", "Keyword \"class\"")?;
        let name_token = self.expect_identifier("Identifier")?;
        let mut class = ClassTable::new(name_token.text.clone(), name_token.line);
        self.expect_punctuator('{', "'{'")?;

        loop {
            let token = self.peek()?;
            if token.is_punctuator('}') {
                self.next()?;
                break;
            } else if token.is_keyword("field") || token.is_keyword("static") {
                self.parse_class_var_declaration(&mut class)?;
            } else if token.is_keyword("constructor")
                || token.is_keyword("function")
                || token.is_keyword("method")
            {
                break;
            } else {
                return Err(ParseError::unexpected("Class variable or subroutine", &token));
            }
        }

        loop {
            let token = self.peek()?;
            if token.is_punctuator('}') {
                self.next()?;
                break;
            } else if token.is_keyword("constructor")
                || token.is_keyword("function")
                || token.is_keyword("method")
            {
                let function = self.parse_subroutine_declaration()?;
                class.functions.push(function);
            } else {
                return Err(ParseError::unexpected("Class variable or subroutine", &token));
            }
        }

        let terminator = self.next()?;
        if terminator.kind != TokenKind::Terminator {
            return Err(ParseError::unexpected("Terminator", &terminator));
        }

        Ok(class)
    }

    fn parse_type(&mut self) -> Result<String, ParseError> {
        let token = self.peek()?;
        if token.kind != TokenKind::Identifier && !PRIMITIVE_TYPES.iter().any(|t| token.is_keyword(t)) {
            return Err(ParseError::unexpected("Identifier or variable type", &token));
        }
        let token = self.next()?;
        Ok(token.text)
    }

    fn parse_class_var_declaration(&mut self, class: &mut ClassTable) -> Result<(), ParseError> {
        let kind_token = self.next()?;
        let kind = if kind_token.is_keyword("field") {
            VariableKind::Field
        } else if kind_token.is_keyword("static") {
            VariableKind::Static
        } else {
            return Err(ParseError::unexpected("Keyword \"field\" or \"static\"", &kind_token));
        };

        let type_name = self.parse_type()?;
        let name_token = self.expect_identifier("Identifier")?;
        class.variables.push(VariableSymbol::new(
            name_token.text.clone(),
            type_name.clone(),
            kind,
            name_token.line,
        ));

        loop {
            let token = self.next()?;
            if token.is_punctuator(',') {
                let name_token = self.expect_identifier("Identifier")?;
                class.variables.push(VariableSymbol::new(
                    name_token.text.clone(),
                    type_name.clone(),
                    kind,
                    name_token.line,
                ));
            } else if token.is_punctuator(';') {
                break;
            } else {
                return Err(ParseError::unexpected("',' or ';'", &token));
            }
        }

        Ok(())
    }

    fn parse_subroutine_declaration(&mut self) -> Result<FunctionTable, ParseError> {
        let kind_token = self.next()?;
        let kind = if kind_token.is_keyword("constructor") {
            FunctionKind::Constructor
        } else if kind_token.is_keyword("function") {
            FunctionKind::Function
        } else if kind_token.is_keyword("method") {
            FunctionKind::Method
        } else {
            return Err(ParseError::unexpected(
                "Keyword \"constructor\", \"function\", or \"method\"",
                &kind_token,
            ));
        };

        let peeked = self.peek()?;
        let (return_type, return_line) = if peeked.is_keyword("void") {
            let void_token = self.next()?;
            (void_token.text, void_token.line)
        } else {
            let line = peeked.line;
            (self.parse_type()?, line)
        };
        let mut function = FunctionTable::new(String::new(), kind, return_line);
        function.return_type = return_type;

        let name_token = self.expect_identifier("Identifier")?;
        function.name = name_token.text.clone();

        self.expect_punctuator('(', "'('")?;
        self.parse_param_list(&mut function)?;
        self.expect_punctuator(')', "')'")?;
        self.parse_subroutine_body(&mut function)?;

        Ok(function)
    }

    fn parse_param_list(&mut self, function: &mut FunctionTable) -> Result<(), ParseError> {
        let token = self.peek()?;
        if token.is_punctuator(')') {
            return Ok(());
        }

        loop {
            let type_name = self.parse_type()?;
            let name_token = self.expect_identifier("Identifier")?;
            let mut argument = VariableSymbol::new(name_token.text.clone(), type_name, VariableKind::Local, name_token.line);
            argument.is_argument = true;
            argument.initialised = true;
            function.arguments.push(argument);

            let token = self.peek()?;
            if token.is_punctuator(')') {
                return Ok(());
            } else if token.is_punctuator(',') {
                self.next()?;
            } else {
                return Err(ParseError::unexpected("')' or ','", &token));
            }
        }
    }

    fn parse_subroutine_body(&mut self, function: &mut FunctionTable) -> Result<(), ParseError> {
        self.expect_punctuator('{', "'{'")?;

        loop {
            let token = self.peek()?;
            if token.is_punctuator('}') {
                self.next()?;
                break;
            } else if token.is_keyword("var") {
                self.parse_var_declaration(function)?;
            } else {
                let statement = self.parse_statement()?;
                function.statements.push(statement);
            }
        }

        Ok(())
    }

    fn parse_var_declaration(&mut self, function: &mut FunctionTable) -> Result<(), ParseError> {
        self.next()?;
        let type_name = self.parse_type()?;
        let name_token = self.expect_identifier("Identifier")?;
        function
            .locals
            .push(VariableSymbol::new(name_token.text.clone(), type_name.clone(), VariableKind::Local, name_token.line));

        loop {
            let token = self.next()?;
            if token.is_punctuator(',') {
                let name_token = self.expect_identifier("Identifier")?;
                function.locals.push(VariableSymbol::new(
                    name_token.text.clone(),
                    type_name.clone(),
                    VariableKind::Local,
                    name_token.line,
                ));
            } else if token.is_punctuator(';') {
                break;
            } else {
                return Err(ParseError::unexpected("',' or ';'", &token));
            }
        }

        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.peek()?;
        if token.kind != TokenKind::Keyword {
            return Err(ParseError::unexpected("Statement or '}'", &token));
        }
        if token.is_keyword("let") {
            self.parse_let_statement()
        } else if token.is_keyword("if") {
            self.parse_if_statement()
        } else if token.is_keyword("while") {
            self.parse_while_statement()
        } else if token.is_keyword("do") {
            self.parse_do_statement()
        } else if token.is_keyword("return") {
            self.parse_return_statement()
        } else {
            Err(ParseError::unexpected("Statement or '}'", &token))
        }
    }

    fn parse_let_statement(&mut self) -> Result<Statement, ParseError> {
        self.next()?;
        let target_token = self.expect_identifier("Identifier")?;
        let line = target_token.line;

        let token = self.next()?;
        let index = if token.is_punctuator('[') {
            let expr = self.parse_expression()?;
            self.expect_punctuator(']', "']'")?;
            self.expect_operator('=', "'='")?;
            Some(expr)
        } else if token.is_operator('=') {
            None
        } else {
            return Err(ParseError::unexpected("'[' or '='", &token));
        };

        let value = self.parse_expression()?;
        self.expect_punctuator(';', "';'")?;

        Ok(Statement::Let(LetStatement {
            target: target_token.text,
            index,
            value,
            line,
        }))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_punctuator('{', "'{'")?;
        let mut statements = Vec::new();
        loop {
            let token = self.peek()?;
            if token.is_punctuator('}') {
                self.next()?;
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        let if_token = self.next()?;
        self.expect_punctuator('(', "'('")?;
        let condition = self.parse_expression()?;
        self.expect_punctuator(')', "')'")?;
        let then_branch = self.parse_block()?;

        let mut else_branch = Vec::new();
        if self.peek()?.is_keyword("else") {
            self.next()?;
            else_branch = self.parse_block()?;
        }

        Ok(Statement::If(IfStatement {
            condition,
            then_branch,
            else_branch,
            line: if_token.line,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        let while_token = self.next()?;
        self.expect_punctuator('(', "'('")?;
        let condition = self.parse_expression()?;
        self.expect_punctuator(')', "')'")?;
        let body = self.parse_block()?;

        Ok(Statement::While(WhileStatement {
            condition,
            body,
            line: while_token.line,
        }))
    }

    fn parse_do_statement(&mut self) -> Result<Statement, ParseError> {
        self.next()?;
        let call = self.parse_subroutine_call()?;
        self.expect_punctuator(';', "';'")?;
        Ok(Statement::Do(call))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        let return_token = self.next()?;
        let token = self.peek()?;
        let value = if token.is_punctuator(';') {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punctuator(';', "';'")?;
        Ok(Statement::Return {
            value,
            line: return_token.line,
        })
    }

    fn parse_subroutine_call(&mut self) -> Result<SubroutineCall, ParseError> {
        let name_token = self.expect_identifier("Identifier")?;
        let mut qualifier = None;
        let mut name = name_token.text;
        let line = name_token.line;

        let mut token = self.next()?;
        if token.is_punctuator('.') {
            let method_token = self.expect_identifier("Identifier")?;
            qualifier = Some(name);
            name = method_token.text;
            token = self.next()?;
        }

        if !token.is_punctuator('(') {
            return Err(ParseError::unexpected("'(' or '.'", &token));
        }
        let arguments = self.parse_expression_list()?;
        self.expect_punctuator(')', "')'")?;

        Ok(SubroutineCall {
            qualifier,
            name,
            arguments,
            line,
        })
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        let token = self.peek()?;
        if token.is_punctuator(')') {
            return Ok(Vec::new());
        }

        let mut expressions = vec![self.parse_expression()?];
        loop {
            let token = self.peek()?;
            if token.is_punctuator(',') {
                self.next()?;
                expressions.push(self.parse_expression()?);
            } else if token.is_punctuator(')') {
                break;
            } else {
                return Err(ParseError::unexpected("',' or ')'", &token));
            }
        }
        Ok(expressions)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut terms = vec![self.parse_term()?];
        let mut operators = Vec::new();

        loop {
            let token = self.peek()?;
            if token.kind != TokenKind::Operator {
                break;
            }
            self.next()?;
            operators.push(token.byte);
            terms.push(self.parse_term()?);
        }

        Ok(Expression { terms, operators })
    }

    fn parse_term(&mut self) -> Result<Term, ParseError> {
        let token = self.next()?;

        match token.kind {
            TokenKind::Integer => {
                let value: i32 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::unexpected("Integer", &token))?;
                Ok(Term::IntegerConstant(value))
            }
            TokenKind::String => {
                let text = token.text.trim_matches('"').to_string();
                Ok(Term::StringConstant(text))
            }
            TokenKind::Keyword if token.is_keyword("true") => Ok(Term::KeywordConstant(KeywordConstant::True)),
            TokenKind::Keyword if token.is_keyword("false") => Ok(Term::KeywordConstant(KeywordConstant::False)),
            TokenKind::Keyword if token.is_keyword("null") => Ok(Term::KeywordConstant(KeywordConstant::Null)),
            TokenKind::Keyword if token.is_keyword("this") => Ok(Term::KeywordConstant(KeywordConstant::This)),
            TokenKind::Keyword => Err(ParseError::unexpected(
                "Keyword \"true\", \"false\", \"null\", or \"this\"",
                &token,
            )),
            TokenKind::Identifier => self.parse_identifier_term(token),
            TokenKind::Punctuator if token.is_punctuator('(') => {
                let expr = self.parse_expression()?;
                self.expect_punctuator(')', "')'")?;
                Ok(Term::Parenthesised(Box::new(expr)))
            }
            TokenKind::Operator if token.is_operator('-') => {
                let operand = self.parse_term()?;
                Ok(Term::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Operator if token.is_operator('~') => {
                let operand = self.parse_term()?;
                Ok(Term::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => Err(ParseError::unexpected(
                "String, integer, identifier, \"true\", \"false\", \"null\", \"this\", or '('",
                &token,
            )),
        }
    }

    fn parse_identifier_term(&mut self, name_token: Token) -> Result<Term, ParseError> {
        let name = name_token.text;
        let line = name_token.line;
        let peeked = self.peek()?;

        if peeked.is_punctuator('[') {
            self.next()?;
            let index = self.parse_expression()?;
            self.expect_punctuator(']', "']'")?;
            return Ok(Term::ArrayRef {
                name,
                index: Box::new(index),
            });
        }

        if peeked.is_punctuator('.') {
            self.next()?;
            let method_token = self.expect_identifier("Identifier")?;
            self.expect_punctuator('(', "'('")?;
            let arguments = self.parse_expression_list()?;
            self.expect_punctuator(')', "')'")?;
            return Ok(Term::Call(SubroutineCall {
                qualifier: Some(name),
                name: method_token.text,
                arguments,
                line,
            }));
        }

        if peeked.is_punctuator('(') {
            self.next()?;
            let arguments = self.parse_expression_list()?;
            self.expect_punctuator(')', "')'")?;
            return Ok(Term::Call(SubroutineCall {
                qualifier: None,
                name,
                arguments,
                line,
            }));
        }

        Ok(Term::VariableRef(name))
    }
}
