use crate::ast::Statement;
use indexmap::IndexMap;

/// Index of a class within the `ClassList` it was parsed into. Stands in for
/// the source's raw `classSymbolTable *` cross-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Field,
    Static,
}

/// Resolved storage shape of a variable's declared type. `None` until
/// finalisation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    Primitive,
    Array,
    Structure,
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub type_name: String,
    pub kind: VariableKind,
    pub is_argument: bool,
    pub initialised: bool,
    pub offset: i32,
    pub line: u32,
    pub construction: Option<Construction>,
    pub type_class: Option<ClassId>,
}

impl VariableSymbol {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, kind: VariableKind, line: u32) -> Self {
        VariableSymbol {
            name: name.into(),
            type_name: type_name.into(),
            kind,
            is_argument: false,
            initialised: false,
            offset: 0,
            line,
            construction: None,
            type_class: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Constructor,
    Method,
    Function,
}

#[derive(Debug, Clone)]
pub struct FunctionTable {
    pub name: String,
    pub return_type: String,
    pub kind: FunctionKind,
    pub arguments: Vec<VariableSymbol>,
    pub locals: Vec<VariableSymbol>,
    pub statements: Vec<Statement>,
    pub line: u32,
    pub return_type_class: Option<ClassId>,
}

impl FunctionTable {
    pub fn new(name: impl Into<String>, kind: FunctionKind, line: u32) -> Self {
        FunctionTable {
            name: name.into(),
            return_type: String::new(),
            kind,
            arguments: Vec::new(),
            locals: Vec::new(),
            statements: Vec::new(),
            line,
            return_type_class: None,
        }
    }

    /// Total argument slots the VM call site must supply: user-declared
    /// arguments, plus one reserved slot for `this` when this is a method.
    pub fn total_argument_count(&self) -> usize {
        self.arguments.len() + if self.kind == FunctionKind::Method { 1 } else { 0 }
    }
}

#[derive(Debug, Clone)]
pub struct ClassTable {
    pub name: String,
    pub variables: Vec<VariableSymbol>,
    pub functions: Vec<FunctionTable>,
    pub static_count: i32,
    pub field_count: i32,
    pub line: u32,
}

impl ClassTable {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        ClassTable {
            name: name.into(),
            variables: Vec::new(),
            functions: Vec::new(),
            static_count: 0,
            field_count: 0,
            line,
        }
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionTable> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableSymbol> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// All classes parsed so far, in declaration order across every input file.
/// `by_name` mirrors `classes` as an insertion-ordered index so cross-file
/// type and call resolution doesn't rescan the whole list per lookup.
#[derive(Debug, Clone, Default)]
pub struct ClassList {
    pub classes: Vec<ClassTable>,
    by_name: IndexMap<String, ClassId>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, class: ClassTable) -> ClassId {
        let id = ClassId(self.classes.len());
        self.by_name.insert(class.name.clone(), id);
        self.classes.push(class);
        id
    }

    pub fn find_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ClassId) -> &ClassTable {
        &self.classes[id.0]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut ClassTable {
        &mut self.classes[id.0]
    }
}
