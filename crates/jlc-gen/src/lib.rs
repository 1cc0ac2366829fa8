//! Code generator: walks one class's AST and symbol tables, resolving
//! identifiers against function/class scope, and emits VM assembly text.
//! Also performs the lightweight type checking that produces non-fatal
//! warnings (§ see the driver's diagnostic stream).

mod error;
mod segment;

pub use error::GenError;
pub use segment::Segment;

use jlc_par::ast::{
    Expression, IfStatement, KeywordConstant, LetStatement, Statement, SubroutineCall, Term, UnaryOp,
    WhileStatement,
};
use jlc_par::symbol::{FunctionKind, VariableKind};
use jlc_par::{ClassId, ClassList, ClassTable, FunctionTable, VariableSymbol};
use jlc_util::Diagnostics;

/// Generates the `.vm` text for one class. Warnings raised along the way are
/// appended to `diagnostics`; the returned string is the full file body.
pub fn generate_class(
    classes: &ClassList,
    class_id: ClassId,
    diagnostics: &mut Diagnostics,
) -> Result<String, GenError> {
    let class = classes.get(class_id);
    let mut generator = Generator {
        classes,
        class,
        diagnostics,
        label_id: 0,
        lines: Vec::new(),
    };

    if !class.name.starts_with(|c: char| c.is_ascii_uppercase()) {
        generator.warn(class.line, "Class name should start with a capital letter");
    }

    for function in &class.functions {
        generator.generate_function(function)?;
    }

    let mut text = generator.lines.join("\n");
    text.push('\n');
    Ok(text)
}

struct Generator<'a> {
    classes: &'a ClassList,
    class: &'a ClassTable,
    diagnostics: &'a mut Diagnostics,
    label_id: u32,
    lines: Vec<String>,
}

enum ResolvedVariable<'a> {
    Local(&'a VariableSymbol),
    Argument(&'a VariableSymbol, i32),
    Class(&'a VariableSymbol),
}

impl<'a> Generator<'a> {
    fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn fresh_label_id(&mut self) -> u32 {
        let id = self.label_id;
        self.label_id += 1;
        id
    }

    fn error(&self, line: u32, message: impl Into<String>) -> GenError {
        GenError::new(&self.class.name, line, message)
    }

    fn warn(&mut self, line: u32, message: impl Into<String>) {
        let class_name = self.class.name.clone();
        self.diagnostics.warn(class_name, line, message);
    }

    fn generate_function(&mut self, function: &FunctionTable) -> Result<(), GenError> {
        if !function.name.starts_with(|c: char| c.is_ascii_lowercase()) {
            self.warn(function.line, "Function name should start with a lowercase letter");
        }

        let n_locals = function.locals.len();
        self.emit(format!("function {}.{} {}", self.class.name, function.name, n_locals));

        match function.kind {
            FunctionKind::Constructor => {
                self.emit(format!("push constant {}", self.class.field_count));
                self.emit("call Memory.alloc 1");
                self.emit("pop pointer 0");
            }
            FunctionKind::Method => {
                self.emit("push argument 0");
                self.emit("pop pointer 0");
            }
            FunctionKind::Function => {}
        }

        self.generate_statements(function, &function.statements)?;

        if function.return_type != "void" && !statements_guarantee_return(&function.statements) {
            self.warn(function.line, "Function is not guaranteed to return a value on every path");
        }

        Ok(())
    }

    fn generate_statements(&mut self, function: &FunctionTable, statements: &[Statement]) -> Result<(), GenError> {
        let mut returned = false;
        for (i, statement) in statements.iter().enumerate() {
            if returned && i > 0 {
                self.warn(statement.line(), "Unreachable code detected");
            }
            self.generate_statement(function, statement)?;
            if statement_guarantees_return(statement) {
                returned = true;
            }
        }
        Ok(())
    }

    fn generate_statement(&mut self, function: &FunctionTable, statement: &Statement) -> Result<(), GenError> {
        match statement {
            Statement::Let(s) => self.generate_let(function, s),
            Statement::If(s) => self.generate_if(function, s),
            Statement::While(s) => self.generate_while(function, s),
            Statement::Do(call) => {
                self.generate_call(function, call)?;
                self.emit("pop temp 0");
                Ok(())
            }
            Statement::Return { value, line } => self.generate_return(function, value.as_ref(), *line),
        }
    }

    fn generate_let(&mut self, function: &FunctionTable, statement: &LetStatement) -> Result<(), GenError> {
        let line = statement.line;
        let resolved = self.resolve_variable(function, &statement.target).ok_or_else(|| {
            self.error(line, format!("Variable \"{}\" is not declared", statement.target))
        })?;
        let target_type = resolved_variable(&resolved).type_name.clone();
        let (segment, offset) = segment_and_offset(&resolved);

        match &statement.index {
            None => {
                let value_type = self.infer_type(function, &statement.value.terms[0]);
                if value_type != target_type {
                    self.warn(
                        line,
                        format!(
                            "Expression type \"{value_type}\" does not match the type \"{target_type}\" of variable \"{}\"",
                            statement.target
                        ),
                    );
                }
                self.generate_expression(function, &statement.value, line)?;
                self.emit(format!("pop {segment} {offset}"));
            }
            Some(index_expr) => {
                if target_type != "Array" {
                    self.warn(
                        line,
                        format!("Attempt to dereference non-array variable \"{}\" as an array", statement.target),
                    );
                }
                let index_type = self.infer_type(function, &index_expr.terms[0]);
                if index_type != "int" {
                    self.warn(line, "Array index is not of integer type");
                }
                self.generate_expression(function, &statement.value, line)?;
                self.emit(format!("push {segment} {offset}"));
                self.generate_expression(function, index_expr, line)?;
                self.emit("add");
                self.emit("pop pointer 1");
                self.emit("pop that 0");
            }
        }
        Ok(())
    }

    fn generate_if(&mut self, function: &FunctionTable, statement: &IfStatement) -> Result<(), GenError> {
        let id = self.fresh_label_id();
        self.generate_expression(function, &statement.condition, statement.line)?;
        self.emit(format!("if-goto IF_{id}"));
        self.generate_statements(function, &statement.else_branch)?;
        self.emit(format!("goto ENDIF_{id}"));
        self.emit(format!("label IF_{id}"));
        self.generate_statements(function, &statement.then_branch)?;
        self.emit(format!("label ENDIF_{id}"));
        Ok(())
    }

    fn generate_while(&mut self, function: &FunctionTable, statement: &WhileStatement) -> Result<(), GenError> {
        let id = self.fresh_label_id();
        self.emit(format!("label WHILE_{id}"));
        self.generate_expression(function, &statement.condition, statement.line)?;
        self.emit("not");
        self.emit(format!("if-goto END_WHILE_{id}"));
        self.generate_statements(function, &statement.body)?;
        self.emit(format!("goto WHILE_{id}"));
        self.emit(format!("label END_WHILE_{id}"));
        Ok(())
    }

    fn generate_return(
        &mut self,
        function: &FunctionTable,
        value: Option<&Expression>,
        line: u32,
    ) -> Result<(), GenError> {
        if function.return_type == "void" {
            if value.is_some() {
                self.warn(line, "Void function returns a value");
            }
            self.emit("push constant 0");
        } else {
            match value {
                Some(expr) => {
                    let value_type = self.infer_type(function, &expr.terms[0]);
                    if value_type != function.return_type {
                        self.warn(
                            line,
                            format!(
                                "Type of returned expression \"{value_type}\" does not match the return type \"{}\" of the function",
                                function.return_type
                            ),
                        );
                    }
                    self.generate_expression(function, expr, line)?;
                }
                None => {
                    self.warn(line, "Non-void function must return a value");
                    self.emit("push constant 0");
                }
            }
        }
        self.emit("return");
        Ok(())
    }

    fn generate_expression(&mut self, function: &FunctionTable, expr: &Expression, line: u32) -> Result<(), GenError> {
        self.generate_term(function, &expr.terms[0], line)?;
        let first_type = self.infer_type(function, &expr.terms[0]);
        for (operator, term) in expr.operators.iter().zip(expr.terms.iter().skip(1)) {
            let term_type = self.infer_type(function, term);
            if term_type != first_type {
                self.warn(line, "Term in expression has a type inconsistent with the rest of the expression");
            }
            self.generate_term(function, term, line)?;
            self.emit_operator(*operator);
        }
        Ok(())
    }

    fn emit_operator(&mut self, operator: u8) {
        match operator {
            b'+' => self.emit("add"),
            b'-' => self.emit("sub"),
            b'*' => self.emit("call Math.multiply 2"),
            b'/' => self.emit("call Math.divide 2"),
            b'&' => self.emit("and"),
            b'|' => self.emit("or"),
            b'<' => self.emit("lt"),
            b'>' => self.emit("gt"),
            b'=' => self.emit("eq"),
            _ => unreachable!("lexer only ever produces operators from the fixed operator set"),
        }
    }

    fn generate_term(&mut self, function: &FunctionTable, term: &Term, line: u32) -> Result<(), GenError> {
        match term {
            Term::IntegerConstant(value) => {
                self.emit(format!("push constant {value}"));
                Ok(())
            }
            Term::StringConstant(text) => {
                self.emit(format!("push constant {}", text.chars().count()));
                self.emit("call String.new 1");
                for c in text.chars() {
                    self.emit(format!("push constant {}", c as u32));
                    self.emit("call String.appendChar 2");
                }
                Ok(())
            }
            Term::KeywordConstant(KeywordConstant::True) => {
                self.emit("push constant 1");
                self.emit("neg");
                Ok(())
            }
            Term::KeywordConstant(KeywordConstant::False) | Term::KeywordConstant(KeywordConstant::Null) => {
                self.emit("push constant 0");
                Ok(())
            }
            Term::KeywordConstant(KeywordConstant::This) => {
                self.emit("push pointer 0");
                Ok(())
            }
            Term::VariableRef(name) => self.generate_variable_ref(function, name, line),
            Term::ArrayRef { name, index } => {
                let resolved = self
                    .resolve_variable(function, name)
                    .ok_or_else(|| self.error(line, format!("Variable \"{name}\" is not declared")))?;
                if resolved_variable(&resolved).type_name != "Array" {
                    self.warn(line, format!("Attempt to dereference non-array variable \"{name}\" as an array"));
                }
                let index_type = self.infer_type(function, &index.terms[0]);
                if index_type != "int" {
                    self.warn(line, "Array index is not of integer type");
                }
                let (segment, offset) = segment_and_offset(&resolved);
                self.emit(format!("push {segment} {offset}"));
                self.generate_expression(function, index, line)?;
                self.emit("add");
                self.emit("pop pointer 1");
                self.emit("push that 0");
                Ok(())
            }
            Term::Parenthesised(expr) => self.generate_expression(function, expr, line),
            Term::Unary { op, operand } => {
                let operand_type = self.infer_type(function, operand);
                if operand_type != "int" && operand_type != "boolean" {
                    self.warn(line, "Unary term is not a boolean or integer type");
                }
                self.generate_term(function, operand, line)?;
                match op {
                    UnaryOp::Negate => self.emit("neg"),
                    UnaryOp::Not => self.emit("not"),
                }
                Ok(())
            }
            Term::Call(call) => self.generate_call(function, call),
        }
    }

    fn generate_variable_ref(&mut self, function: &FunctionTable, name: &str, line: u32) -> Result<(), GenError> {
        let resolved = self
            .resolve_variable(function, name)
            .ok_or_else(|| self.error(line, format!("Variable \"{name}\" is not declared")))?;
        if !resolved_variable(&resolved).initialised {
            self.warn(line, format!("Variable \"{name}\" used before being initialised"));
        }
        let (segment, offset) = segment_and_offset(&resolved);
        self.emit(format!("push {segment} {offset}"));
        Ok(())
    }

    fn resolve_variable(&self, function: &FunctionTable, name: &str) -> Option<ResolvedVariable<'a>> {
        if let Some(local) = function.locals.iter().find(|v| v.name == name) {
            return Some(ResolvedVariable::Local(local));
        }
        if let Some((i, argument)) = function.arguments.iter().enumerate().find(|(_, v)| v.name == name) {
            let offset = if function.kind == FunctionKind::Method { i as i32 + 1 } else { i as i32 };
            return Some(ResolvedVariable::Argument(argument, offset));
        }
        if let Some(class_var) = self.class.find_variable(name) {
            return Some(ResolvedVariable::Class(class_var));
        }
        None
    }

    /// Implicit-receiver, qualified-by-class, and qualified-by-variable call
    /// forms all funnel through here.
    fn generate_call(&mut self, function: &FunctionTable, call: &SubroutineCall) -> Result<(), GenError> {
        match &call.qualifier {
            None => self.generate_implicit_call(function, call),
            Some(qualifier) => {
                if let Some(target_class_id) = self.classes.find_by_name(qualifier) {
                    self.generate_static_call(function, call, target_class_id)
                } else {
                    self.generate_method_call_on_variable(function, call, qualifier)
                }
            }
        }
    }

    fn generate_implicit_call(&mut self, function: &FunctionTable, call: &SubroutineCall) -> Result<(), GenError> {
        let target = self
            .class
            .find_function(&call.name)
            .ok_or_else(|| self.error(call.line, format!("Function \"{}\" is not declared", call.name)))?;

        if target.kind == FunctionKind::Method {
            self.emit("push pointer 0");
        }

        self.generate_arguments(function, call, target)?;
        self.emit(format!(
            "call {}.{} {}",
            self.class.name,
            call.name,
            target.total_argument_count()
        ));
        Ok(())
    }

    fn generate_static_call(
        &mut self,
        function: &FunctionTable,
        call: &SubroutineCall,
        target_class_id: ClassId,
    ) -> Result<(), GenError> {
        let target_class = self.classes.get(target_class_id);
        let target = target_class
            .find_function(&call.name)
            .ok_or_else(|| self.error(call.line, format!("Function \"{}\" is not declared", call.name)))?;

        self.generate_arguments(function, call, target)?;
        self.emit(format!(
            "call {}.{} {}",
            target_class.name,
            call.name,
            target.total_argument_count()
        ));
        Ok(())
    }

    fn generate_method_call_on_variable(
        &mut self,
        function: &FunctionTable,
        call: &SubroutineCall,
        variable_name: &str,
    ) -> Result<(), GenError> {
        let resolved = self
            .resolve_variable(function, variable_name)
            .ok_or_else(|| self.error(call.line, format!("Variable \"{variable_name}\" is not declared")))?;
        let (segment, offset) = segment_and_offset(&resolved);
        let type_class_id = resolved_variable(&resolved).type_class.ok_or_else(|| {
            self.error(call.line, format!("\"{variable_name}\" is not an object type"))
        })?;

        let target_class = self.classes.get(type_class_id);
        let target = target_class
            .find_function(&call.name)
            .ok_or_else(|| self.error(call.line, format!("Function \"{}\" is not declared", call.name)))?;

        self.emit(format!("push {segment} {offset}"));
        self.generate_arguments(function, call, target)?;
        self.emit(format!(
            "call {}.{} {}",
            target_class.name,
            call.name,
            target.total_argument_count()
        ));
        Ok(())
    }

    fn generate_arguments(
        &mut self,
        function: &FunctionTable,
        call: &SubroutineCall,
        target: &FunctionTable,
    ) -> Result<(), GenError> {
        let declared_count = target.arguments.len();
        for (i, arg_expr) in call.arguments.iter().enumerate() {
            self.generate_expression(function, arg_expr, call.line)?;
            if let Some(declared) = target.arguments.get(i) {
                let arg_type = self.infer_type(function, &arg_expr.terms[0]);
                if arg_type != declared.type_name {
                    self.warn(
                        call.line,
                        format!(
                            "Argument {} to \"{}\" has type \"{arg_type}\" but \"{}\" was expected",
                            i + 1,
                            call.name,
                            declared.type_name
                        ),
                    );
                }
            }
        }
        if call.arguments.len() != declared_count {
            self.warn(
                call.line,
                format!(
                    "\"{}\" expects {declared_count} argument(s) but {} were given",
                    call.name,
                    call.arguments.len()
                ),
            );
        }
        Ok(())
    }

    /// Type of the first term of an expression, matching the source's
    /// "first term wins" inference rule used only for diagnostic warnings.
    fn infer_type(&self, function: &FunctionTable, term: &Term) -> String {
        match term {
            Term::IntegerConstant(_) => "int".to_string(),
            Term::StringConstant(_) => "String".to_string(),
            Term::KeywordConstant(KeywordConstant::True) | Term::KeywordConstant(KeywordConstant::False) => {
                "boolean".to_string()
            }
            Term::KeywordConstant(KeywordConstant::Null) => "int".to_string(),
            Term::KeywordConstant(KeywordConstant::This) => self.class.name.clone(),
            Term::VariableRef(name) => self
                .resolve_variable(function, name)
                .map(|r| resolved_variable(&r).type_name.clone())
                .unwrap_or_else(|| "int".to_string()),
            Term::ArrayRef { .. } => "int".to_string(),
            Term::Parenthesised(expr) => self.infer_type(function, &expr.terms[0]),
            Term::Unary { operand, .. } => self.infer_type(function, operand),
            Term::Call(call) => self.call_return_type(call),
        }
    }

    fn call_return_type(&self, call: &SubroutineCall) -> String {
        let target = match &call.qualifier {
            None => self.class.find_function(&call.name),
            Some(qualifier) => {
                if let Some(class_id) = self.classes.find_by_name(qualifier) {
                    self.classes.get(class_id).find_function(&call.name)
                } else {
                    None
                }
            }
        };
        target.map(|f| f.return_type.clone()).unwrap_or_else(|| "int".to_string())
    }
}

fn resolved_variable<'a>(resolved: &ResolvedVariable<'a>) -> &'a VariableSymbol {
    match resolved {
        ResolvedVariable::Local(v) => v,
        ResolvedVariable::Argument(v, _) => v,
        ResolvedVariable::Class(v) => v,
    }
}

fn segment_and_offset(resolved: &ResolvedVariable<'_>) -> (Segment, i32) {
    match resolved {
        ResolvedVariable::Local(v) => (Segment::Local, v.offset),
        ResolvedVariable::Argument(_, offset) => (Segment::Argument, *offset),
        ResolvedVariable::Class(v) => {
            let segment = if v.kind == VariableKind::Static { Segment::Static } else { Segment::This };
            (segment, v.offset)
        }
    }
}

fn statements_guarantee_return(statements: &[Statement]) -> bool {
    statements.iter().any(statement_guarantees_return)
}

fn statement_guarantees_return(statement: &Statement) -> bool {
    match statement {
        Statement::Return { .. } => true,
        Statement::If(s) => {
            !s.else_branch.is_empty()
                && s.then_branch.iter().any(statement_guarantees_return)
                && s.else_branch.iter().any(statement_guarantees_return)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jlc_par::parse_class;
    use jlc_sem::finalise;

    fn generate(source: &str) -> (String, Diagnostics) {
        let mut classes = ClassList::new();
        classes.push(parse_class(source).unwrap());
        finalise(&mut classes).unwrap();
        let mut diagnostics = Diagnostics::new();
        let text = generate_class(&classes, ClassId(0), &mut diagnostics).unwrap();
        (text, diagnostics)
    }

    #[test]
    fn function_returning_constant() {
        let (vm, _) = generate("class A { function int seven() { return 7; } }");
        assert_eq!(vm, "function A.seven 0\npush constant 7\nreturn\n");
    }

    #[test]
    fn void_function_pushes_zero() {
        let (vm, _) = generate("class A { function void noop() { return; } }");
        assert_eq!(vm, "function A.noop 0\npush constant 0\nreturn\n");
    }

    #[test]
    fn constructor_prologue_and_field_store() {
        let (vm, _) = generate("class A { field int x; constructor A new() { let x = 3; return this; } }");
        assert_eq!(
            vm,
            "function A.new 0\npush constant 1\ncall Memory.alloc 1\npop pointer 0\npush constant 3\npop this 0\npush pointer 0\nreturn\n"
        );
    }

    #[test]
    fn method_prologue_and_argument_offset() {
        let (vm, _) = generate("class A { method int f(int a) { return a + 1; } }");
        assert_eq!(
            vm,
            "function A.f 0\npush argument 0\npop pointer 0\npush argument 1\npush constant 1\nadd\nreturn\n"
        );
    }

    #[test]
    fn if_else_emits_else_branch_before_then_branch() {
        let (vm, _) = generate(
            "class A { function void g() { var int x; if (1) { let x = 0; } else { let x = 1; } return; } }",
        );
        let else_pos = vm.find("pop local 0\ngoto ENDIF_0").unwrap();
        let then_label_pos = vm.find("label IF_0").unwrap();
        assert!(else_pos < then_label_pos);
        assert!(vm.contains("label ENDIF_0"));
    }

    #[test]
    fn while_loop_shape() {
        let (vm, _) = generate("class A { function void h() { while (0) { } return; } }");
        assert_eq!(
            vm,
            "function A.h 0\nlabel WHILE_0\npush constant 0\nnot\nif-goto END_WHILE_0\ngoto WHILE_0\nlabel END_WHILE_0\npush constant 0\nreturn\n"
        );
    }

    #[test]
    fn expression_lowering_is_interleaved_left_to_right() {
        let (vm, _) = generate("class A { function int run() { return 1 + 2 * 3; } }");
        assert_eq!(
            vm,
            "function A.run 0\npush constant 1\npush constant 2\ncall Math.multiply 2\nadd\npush constant 3\ncall Math.multiply 2\nadd\nreturn\n"
        );
    }

    #[test]
    fn string_literal_emits_one_append_char_per_character() {
        let (vm, _) = generate("class A { function void p() { do p(\"ab\"); return; } }");
        let appends = vm.matches("call String.appendChar 2").count();
        assert_eq!(appends, 2);
    }

    #[test]
    fn unreachable_statement_after_return_warns() {
        let (_, diagnostics) = generate(
            "class A { function void run() { var int x; return; let x = 1; } }",
        );
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn lowercase_class_name_warns() {
        let mut classes = ClassList::new();
        classes.push(parse_class("class lowercase { function void run() { return; } }").unwrap());
        finalise(&mut classes).unwrap();
        let mut diagnostics = Diagnostics::new();
        generate_class(&classes, ClassId(0), &mut diagnostics).unwrap();
        assert!(diagnostics.iter().any(|d| d.message.contains("Class name")));
    }

    #[test]
    fn uppercase_function_name_warns() {
        let (_, diagnostics) = generate("class A { function void Run() { return; } }");
        assert!(diagnostics.iter().any(|d| d.message.contains("Function name")));
    }

    #[test]
    fn let_type_mismatch_warns() {
        let (_, diagnostics) =
            generate("class A { function void run() { var boolean x; let x = 1; return; } }");
        assert!(diagnostics.iter().any(|d| d.message.contains("does not match")));
    }

    #[test]
    fn missing_return_on_non_void_function_warns() {
        let (_, diagnostics) = generate("class A { function int run() { var int x; let x = 1; } }");
        assert!(diagnostics.iter().any(|d| d.message.contains("not guaranteed to return")));
    }

    #[test]
    fn array_index_must_be_integer() {
        let (_, diagnostics) = generate(
            "class A { function void run() { var Array a; var boolean b; let a[b] = 1; return; } }",
        );
        assert!(diagnostics.iter().any(|d| d.message.contains("Array index")));
    }
}
