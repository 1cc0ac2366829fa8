//! Symbol finaliser: runs once every input file has been parsed, so the
//! class list is complete and forward references across files resolve.
//! Assigns storage offsets, resolves declared type names to class
//! references, and checks name uniqueness.

mod error;

pub use error::SemError;

use jlc_par::symbol::Construction;
use jlc_par::{ClassId, ClassList, FunctionKind};
use rustc_hash::FxHashSet;

const PRIMITIVES: &[&str] = &["int", "char", "boolean"];

/// Finalises every class in `classes` in place. Cross-class type references
/// resolve against `classes`' own name index, built as each class was parsed.
pub fn finalise(classes: &mut ClassList) -> Result<(), SemError> {
    for i in 0..classes.classes.len() {
        finalise_class(classes, i)?;
    }

    Ok(())
}

fn resolve_type(type_name: &str, classes: &ClassList) -> Option<(Construction, Option<ClassId>)> {
    if PRIMITIVES.contains(&type_name) {
        return Some((Construction::Primitive, None));
    }
    if type_name == "Array" {
        return Some((Construction::Array, None));
    }
    classes.find_by_name(type_name).map(|id| (Construction::Structure, Some(id)))
}

fn finalise_class(classes: &mut ClassList, index: usize) -> Result<(), SemError> {
    let class_name = classes.classes[index].name.clone();

    let mut field_offset = 0;
    let mut static_offset = 0;
    let var_count = classes.classes[index].variables.len();

    for j in 0..var_count {
        let (type_name, kind, line) = {
            let v = &classes.classes[index].variables[j];
            (v.type_name.clone(), v.kind, v.line)
        };

        let (construction, type_class) = resolve_type(&type_name, classes).ok_or_else(|| {
            SemError::new(&class_name, line, "Function type does not exist")
        })?;

        let v = &mut classes.classes[index].variables[j];
        v.construction = Some(construction);
        v.type_class = type_class;
        v.offset = match kind {
            jlc_par::VariableKind::Field => {
                let offset = field_offset;
                field_offset += 1;
                offset
            }
            jlc_par::VariableKind::Static => {
                let offset = static_offset;
                static_offset += 1;
                offset
            }
            jlc_par::VariableKind::Local => offset_local_unreachable(),
        };
    }

    classes.classes[index].field_count = field_offset;
    classes.classes[index].static_count = static_offset;

    check_unique(
        classes.classes[index].variables.iter().map(|v| (v.name.as_str(), v.line)),
        &class_name,
    )?;

    let fn_count = classes.classes[index].functions.len();
    for k in 0..fn_count {
        finalise_function(classes, index, k, &class_name)?;
    }

    Ok(())
}

fn offset_local_unreachable() -> i32 {
    unreachable!("class-level variables are never VariableKind::Local")
}

fn finalise_function(
    classes: &mut ClassList,
    class_index: usize,
    fn_index: usize,
    class_name: &str,
) -> Result<(), SemError> {
    let (return_type, kind, fn_line) = {
        let f = &classes.classes[class_index].functions[fn_index];
        (f.return_type.clone(), f.kind, f.line)
    };

    if return_type != "void" {
        let (_, type_class) = resolve_type(&return_type, classes)
            .ok_or_else(|| SemError::new(class_name, fn_line, "Function type does not exist"))?;
        classes.classes[class_index].functions[fn_index].return_type_class = type_class;
    }

    let start_offset = if kind == FunctionKind::Method { 1 } else { 0 };
    let arg_count = classes.classes[class_index].functions[fn_index].arguments.len();
    for a in 0..arg_count {
        let type_name = classes.classes[class_index].functions[fn_index].arguments[a].type_name.clone();
        let line = classes.classes[class_index].functions[fn_index].arguments[a].line;
        let (construction, type_class) = resolve_type(&type_name, classes)
            .ok_or_else(|| SemError::new(class_name, line, "Function type does not exist"))?;

        let arg = &mut classes.classes[class_index].functions[fn_index].arguments[a];
        arg.construction = Some(construction);
        arg.type_class = type_class;
        arg.offset = start_offset + a as i32;
        arg.is_argument = true;
        arg.initialised = true;
    }

    let local_count = classes.classes[class_index].functions[fn_index].locals.len();
    for l in 0..local_count {
        let type_name = classes.classes[class_index].functions[fn_index].locals[l].type_name.clone();
        let line = classes.classes[class_index].functions[fn_index].locals[l].line;
        let (construction, type_class) = resolve_type(&type_name, classes)
            .ok_or_else(|| SemError::new(class_name, line, "Function type does not exist"))?;

        let local = &mut classes.classes[class_index].functions[fn_index].locals[l];
        local.construction = Some(construction);
        local.type_class = type_class;
        local.offset = l as i32;
    }

    let function = &classes.classes[class_index].functions[fn_index];
    let mut names: Vec<(&str, u32)> = function.arguments.iter().map(|v| (v.name.as_str(), v.line)).collect();
    names.extend(function.locals.iter().map(|v| (v.name.as_str(), v.line)));
    check_unique(names.into_iter(), class_name)?;

    Ok(())
}

fn check_unique<'a>(names: impl Iterator<Item = (&'a str, u32)>, class_name: &str) -> Result<(), SemError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for (name, line) in names {
        if !seen.insert(name) {
            return Err(SemError::new(
                class_name,
                line,
                format!("Duplicate declaration of \"{name}\""),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jlc_par::parse_class;

    fn finalise_source(source: &str) -> Result<ClassList, SemError> {
        let mut classes = ClassList::new();
        classes.push(parse_class(source).unwrap());
        finalise(&mut classes)?;
        Ok(classes)
    }

    #[test]
    fn assigns_field_and_static_offsets_in_declaration_order() {
        let classes = finalise_source("class Point { field int x; static int count; field int y; }").unwrap();
        let class = &classes.classes[0];
        assert_eq!(class.variables[0].offset, 0);
        assert_eq!(class.variables[2].offset, 1);
        assert_eq!(class.variables[1].offset, 0);
        assert_eq!(class.field_count, 2);
        assert_eq!(class.static_count, 1);
    }

    #[test]
    fn method_arguments_start_at_offset_one() {
        let classes = finalise_source(
            "class Point { method int add(int a, int b) { return a + b; } }",
        )
        .unwrap();
        let function = &classes.classes[0].functions[0];
        assert_eq!(function.arguments[0].offset, 1);
        assert_eq!(function.arguments[1].offset, 2);
    }

    #[test]
    fn function_arguments_start_at_offset_zero() {
        let classes = finalise_source(
            "class Math { function int add(int a, int b) { return a + b; } }",
        )
        .unwrap();
        let function = &classes.classes[0].functions[0];
        assert_eq!(function.arguments[0].offset, 0);
        assert_eq!(function.arguments[1].offset, 1);
    }

    #[test]
    fn unknown_type_is_fatal() {
        let err = finalise_source("class Main { field Widget w; }").unwrap_err();
        assert!(err.message.contains("does not exist"));
        assert_eq!(err.class_name, "Main");
    }

    #[test]
    fn resolves_cross_class_field_type() {
        let mut classes = ClassList::new();
        classes.push(parse_class("class Point { field int x; }").unwrap());
        classes.push(parse_class("class Line { field Point a; }").unwrap());
        finalise(&mut classes).unwrap();
        let field = &classes.classes[1].variables[0];
        assert_eq!(field.construction, Some(Construction::Structure));
        assert_eq!(field.type_class, Some(ClassId(0)));
    }

    #[test]
    fn duplicate_argument_name_is_fatal() {
        let err = finalise_source(
            "class Main { function void run(int a, int a) { return; } }",
        )
        .unwrap_err();
        assert!(err.message.contains("Duplicate"));
    }

    #[test]
    fn local_shadowing_argument_is_fatal() {
        let err = finalise_source(
            "class Main { function void run(int a) { var int a; return; } }",
        )
        .unwrap_err();
        assert!(err.message.contains("Duplicate"));
    }
}
