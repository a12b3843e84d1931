//! Language-neutral entity model
//!
//! Loaders parse source trees into one shared set of entity structs:
//! projects own flat arenas of files, classes, functions and statement
//! blocks, referenced by index ids. The arena layout breaks the reference
//! cycles of the underlying structure (files know their project, classes
//! their file, invocations their targets) and makes a finished project a
//! plain `Sync` value that comparison workers can share without locks.
//!
//! A project is built in two stages: loaders push raw entities, then
//! [`Project::resolve`] runs a single derivation pass that fixes type
//! identities, user-type constituents and per-function reachable blocks.
//! After `resolve` the project is read-only.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::types::{CompareConfig, Language};

/// Index of a [`SourceFile`] in its project arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub usize);

/// Index of a [`Class`] in its project arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub usize);

/// Index of a [`Function`] in its project arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

/// Index of a [`Block`] in its project arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// A modifier tag on a class, function or variable ("public", "static", …).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier(pub String);

/// A resolved reference to a data type.
///
/// `user_defined` and `compatible_format` are fixed by the resolution pass
/// and stable for the project's lifetime; the constituent list of a
/// user-defined type lives in the project's user-type table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRef {
    /// Type identifier as written in source; empty for void/unknown.
    pub name: String,
    /// Package or module the type was declared in; empty when unknown.
    pub module: String,
    /// Canonical primitive/collection family, when the name has one.
    pub compatible_format: Option<String>,
    /// Whether the type is declared inside the compared project.
    pub user_defined: bool,
}

impl TypeRef {
    /// The empty reference used for void returns and unresolvable names.
    pub fn none() -> Self {
        Self::default()
    }

    /// Key into the project's user-type table.
    pub fn key(&self) -> (String, String) {
        (self.module.clone(), self.name.clone())
    }
}

/// A declared variable: a class field or a local.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    /// Raw type identifier; resolved into `ty` by the resolution pass.
    pub type_name: String,
    pub ty: TypeRef,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    pub ty: TypeRef,
}

/// An invocation site inside a statement block.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Receiver identifier, when the call had one (`x.foo()`).
    pub qualifier: Option<String>,
    /// Called function or method name.
    pub name: String,
}

/// A statement-level fragment of a function body (or, for dynamic
/// languages, of a file or class body), summarised as a histogram of
/// syntax-tree node kinds.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    /// node kind → number of occurrences in the fragment.
    pub histogram: BTreeMap<String, u32>,
    /// Calls made from this fragment, used to derive reachable blocks.
    pub invocations: Vec<Invocation>,
    /// Locals declared in this fragment, `(name, type name)`, used to
    /// resolve qualified invocations.
    pub locals: Vec<(String, String)>,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            histogram: BTreeMap::new(),
            invocations: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// Bump the histogram count for a node kind.
    pub fn record_kind(&mut self, kind: &str) {
        match self.histogram.entry(kind.to_string()) {
            Entry::Occupied(mut e) => *e.get_mut() += 1,
            Entry::Vacant(e) => {
                e.insert(1);
            }
        }
    }
}

/// Function signature; the variant follows the language's typing discipline.
#[derive(Debug, Clone)]
pub enum Signature {
    /// Declared return and parameter types (Java).
    Typed {
        return_type_name: String,
        return_type: TypeRef,
        parameters: Vec<Parameter>,
    },
    /// Parameter arities and variadic flags (Python).
    Dynamic {
        args: u32,
        positional_only: u32,
        keyword_only: u32,
        has_vararg: bool,
        has_kwarg: bool,
    },
}

/// A method or free function.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub signature: Signature,
    /// Own body, in source order.
    pub blocks: Vec<BlockId>,
    /// Own body plus the bodies of same-project functions invoked from it,
    /// direct self-recursion excluded. Populated by the resolution pass.
    pub all_blocks: Vec<BlockId>,
    /// Enclosing class, when the function is a method.
    pub class: Option<ClassId>,
    pub file: FileId,
}

/// A class declaration.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub fields: Vec<Variable>,
    pub methods: Vec<FunctionId>,
    pub file: FileId,
}

/// An import declaration of a source file.
#[derive(Debug, Clone)]
pub struct Import {
    /// Imported package/module path.
    pub module: String,
    /// Imported member names; empty for whole-module imports.
    pub names: Vec<String>,
    /// True for wildcard imports (`import java.util.*`).
    pub wildcard: bool,
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    /// Java package or dotted Python module path relative to the project.
    pub module: String,
    pub classes: Vec<ClassId>,
    /// Top-level functions (dynamic languages).
    pub functions: Vec<FunctionId>,
    /// Top-level statements as blocks (dynamic languages).
    pub top_blocks: Vec<BlockId>,
    pub imports: Vec<Import>,
}

impl SourceFile {
    /// File name without its extension.
    pub fn stem(&self) -> &str {
        self.name.rsplit_once('.').map_or(&*self.name, |(s, _)| s)
    }
}

/// A whole submission or template project.
#[derive(Debug)]
pub struct Project {
    pub name: String,
    pub language: Language,
    pub is_template: bool,
    pub path: PathBuf,
    files: Vec<SourceFile>,
    classes: Vec<Class>,
    functions: Vec<Function>,
    blocks: Vec<Block>,
    /// `(module, name)` of each project-declared type → its flattened list
    /// of non-user-defined constituent types.
    user_types: BTreeMap<(String, String), Vec<TypeRef>>,
}

impl Project {
    pub fn new(name: impl Into<String>, language: Language, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            language,
            is_template: false,
            path,
            files: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            blocks: Vec::new(),
            user_types: BTreeMap::new(),
        }
    }

    // Arena builders, used by the loaders.

    pub fn add_file(&mut self, file: SourceFile) -> FileId {
        self.files.push(file);
        FileId(self.files.len() - 1)
    }

    pub fn add_class(&mut self, class: Class) -> ClassId {
        let id = ClassId(self.classes.len());
        let file = class.file;
        self.classes.push(class);
        self.files[file.0].classes.push(id);
        id
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len());
        match function.class {
            Some(class) => self.classes[class.0].methods.push(id),
            None => self.files[function.file.0].functions.push(id),
        }
        self.functions.push(function);
        id
    }

    pub fn add_block(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);
        BlockId(self.blocks.len() - 1)
    }

    pub fn add_top_block(&mut self, file: FileId, block: Block) -> BlockId {
        let id = self.add_block(block);
        self.files[file.0].top_blocks.push(id);
        id
    }

    // Read access.

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        (0..self.files.len()).map(FileId).collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Constituent primitive types of a user-defined type, when known.
    pub fn type_constituents(&self, ty: &TypeRef) -> &[TypeRef] {
        self.user_types
            .get(&(ty.module.clone(), ty.name.clone()))
            .map_or(&[], Vec::as_slice)
    }

    /// Find the class declaring `name`. A unique name match wins outright;
    /// ambiguous names fall back to the declaring module.
    pub fn find_class(&self, module: &str, name: &str) -> Option<ClassId> {
        let matches: Vec<usize> = self
            .classes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == name)
            .map(|(i, _)| i)
            .collect();
        match matches.len() {
            0 => None,
            1 => Some(ClassId(matches[0])),
            _ => matches
                .into_iter()
                .find(|&i| self.files[self.classes[i].file.0].module == module)
                .map(ClassId),
        }
    }

    /// Find a file by its dotted module identifier. Accepts both full paths
    /// and trailing fragments (`utils` matches `pkg.utils`).
    pub fn find_module(&self, identifier: &str) -> Option<FileId> {
        let full: Vec<usize> = (0..self.files.len())
            .filter(|&i| self.files[i].module == identifier)
            .collect();
        if full.len() == 1 {
            return Some(FileId(full[0]));
        }
        let suffix = format!(".{identifier}");
        let partial: Vec<usize> = (0..self.files.len())
            .filter(|&i| {
                self.files[i].module.ends_with(&suffix) || self.files[i].stem() == identifier
            })
            .collect();
        if partial.len() == 1 {
            return Some(FileId(partial[0]));
        }
        None
    }

    /// Whether `(module, name)` names a type declared in this project.
    pub fn is_user_type(&self, module: &str, name: &str) -> bool {
        self.user_types
            .contains_key(&(module.to_string(), name.to_string()))
    }

    /// Resolve a raw type identifier as seen from `file` into a [`TypeRef`].
    ///
    /// Resolution order mirrors the language's scoping rules: same module
    /// first, then explicit imports, then wildcard imports, finally an
    /// unqualified external type.
    pub fn resolve_type(&self, file: FileId, name: &str, config: &CompareConfig) -> TypeRef {
        let mut ty = self.type_identity(file, name);
        if !ty.name.is_empty() {
            ty.compatible_format = config.type_normalisation.get(name).cloned();
        }
        ty
    }

    /// Resolution without canonicalisation; used internally where only the
    /// identity of the type matters.
    fn type_identity(&self, file: FileId, name: &str) -> TypeRef {
        if name.is_empty() {
            return TypeRef::none();
        }
        let source = &self.files[file.0];
        if self.is_user_type(&source.module, name) {
            return TypeRef {
                name: name.to_string(),
                module: source.module.clone(),
                compatible_format: None,
                user_defined: true,
            };
        }
        for import in &source.imports {
            if import.wildcard {
                continue;
            }
            if import.names.iter().any(|n| n == name) {
                let user = self.is_user_type(&import.module, name);
                return TypeRef {
                    name: name.to_string(),
                    module: import.module.clone(),
                    compatible_format: None,
                    user_defined: user,
                };
            }
        }
        for import in &source.imports {
            if import.wildcard && self.is_user_type(&import.module, name) {
                return TypeRef {
                    name: name.to_string(),
                    module: import.module.clone(),
                    compatible_format: None,
                    user_defined: true,
                };
            }
        }
        TypeRef {
            name: name.to_string(),
            module: String::new(),
            compatible_format: None,
            user_defined: false,
        }
    }

    /// Derivation pass, run once after all files are loaded.
    ///
    /// Registers user-defined types, resolves every stored type name into a
    /// [`TypeRef`], flattens user-type constituents, and links invocations
    /// into each function's reachable block list.
    pub fn resolve(&mut self, config: &CompareConfig) {
        self.register_user_types();
        self.resolve_type_refs(config);
        self.flatten_user_types();
        self.link_invocations();
    }

    /// Every class declaration names a user-defined type.
    fn register_user_types(&mut self) {
        for class in &self.classes {
            let module = self.files[class.file.0].module.clone();
            self.user_types
                .entry((module, class.name.clone()))
                .or_default();
        }
    }

    /// Stamp resolved `TypeRef`s onto fields, parameters and return types.
    fn resolve_type_refs(&mut self, config: &CompareConfig) {
        for i in 0..self.classes.len() {
            let file = self.classes[i].file;
            for j in 0..self.classes[i].fields.len() {
                let name = self.classes[i].fields[j].type_name.clone();
                let ty = self.resolve_type(file, &name, config);
                self.classes[i].fields[j].ty = ty;
            }
        }
        for i in 0..self.functions.len() {
            let file = self.functions[i].file;
            if let Signature::Typed {
                return_type_name,
                parameters,
                ..
            } = &self.functions[i].signature
            {
                let ret_name = return_type_name.clone();
                let param_names: Vec<String> =
                    parameters.iter().map(|p| p.type_name.clone()).collect();
                let ret = self.resolve_type(file, &ret_name, config);
                let param_types: Vec<TypeRef> = param_names
                    .iter()
                    .map(|n| self.resolve_type(file, n, config))
                    .collect();
                if let Signature::Typed {
                    return_type,
                    parameters,
                    ..
                } = &mut self.functions[i].signature
                {
                    *return_type = ret;
                    for (param, ty) in parameters.iter_mut().zip(param_types) {
                        param.ty = ty;
                    }
                }
            }
        }
    }

    /// Flatten each user type into its non-user-defined constituents,
    /// following user-typed fields transitively. A visited set terminates
    /// mutually recursive type shapes.
    fn flatten_user_types(&mut self) {
        let keys: Vec<(String, String)> = self.user_types.keys().cloned().collect();
        for key in keys {
            let mut visited = HashSet::new();
            let mut constituents = Vec::new();
            self.collect_constituents(&key.0, &key.1, &mut visited, &mut constituents);
            self.user_types.insert(key, constituents);
        }
    }

    fn collect_constituents(
        &self,
        module: &str,
        name: &str,
        visited: &mut HashSet<(String, String)>,
        out: &mut Vec<TypeRef>,
    ) {
        if !visited.insert((module.to_string(), name.to_string())) {
            return;
        }
        let Some(class) = self.find_class(module, name) else {
            return;
        };
        for field in &self.classes[class.0].fields {
            if field.ty.user_defined {
                self.collect_constituents(&field.ty.module, &field.ty.name, visited, out);
            } else {
                out.push(field.ty.clone());
            }
        }
    }

    /// Compute `all_blocks` for every function: its own blocks followed by
    /// the own blocks of every distinct same-project function its body
    /// invokes, excluding itself.
    fn link_invocations(&mut self) {
        let mut resolved: Vec<Vec<BlockId>> = Vec::with_capacity(self.functions.len());
        for i in 0..self.functions.len() {
            let id = FunctionId(i);
            let mut all = self.functions[i].blocks.clone();
            let mut seen: HashSet<usize> = HashSet::new();
            for &block in &self.functions[i].blocks {
                for invocation in &self.blocks[block.0].invocations {
                    let Some(target) = self.resolve_invocation(id, invocation) else {
                        continue;
                    };
                    if target == id || !seen.insert(target.0) {
                        continue;
                    }
                    all.extend(self.functions[target.0].blocks.iter().copied());
                }
            }
            resolved.push(all);
        }
        for (function, all) in self.functions.iter_mut().zip(resolved) {
            function.all_blocks = all;
        }
    }

    /// Resolve one invocation site to a project function, when possible.
    fn resolve_invocation(&self, from: FunctionId, invocation: &Invocation) -> Option<FunctionId> {
        match self.language {
            Language::Java => self.resolve_java_invocation(from, invocation),
            Language::Python => self.resolve_python_invocation(from, invocation),
        }
    }

    /// Unqualified calls bind to a unique same-class method; qualified calls
    /// go through the receiver's declared type when it is user-defined.
    fn resolve_java_invocation(
        &self,
        from: FunctionId,
        invocation: &Invocation,
    ) -> Option<FunctionId> {
        let function = &self.functions[from.0];
        let class = function.class?;
        match &invocation.qualifier {
            None => self.unique_method(class, &invocation.name),
            Some(qualifier) => {
                let type_name = self
                    .local_type_of(from, qualifier)
                    .or_else(|| self.field_type_of(class, qualifier))?;
                let ty = self.type_identity(function.file, &type_name);
                if !ty.user_defined {
                    return None;
                }
                let target_class = self.find_class(&ty.module, &ty.name)?;
                self.unique_method(target_class, &invocation.name)
            }
        }
    }

    /// Unqualified calls bind to file-level functions or imported ones;
    /// qualified calls to imported modules; the last resort scans class
    /// methods in the file.
    fn resolve_python_invocation(
        &self,
        from: FunctionId,
        invocation: &Invocation,
    ) -> Option<FunctionId> {
        let file = self.functions[from.0].file;
        let source = &self.files[file.0];
        match &invocation.qualifier {
            None => {
                if let Some(found) = self.file_function(file, &invocation.name) {
                    return Some(found);
                }
                for import in &source.imports {
                    if import.names.iter().any(|n| n == &invocation.name) {
                        let module = self.find_module(&import.module)?;
                        return self.file_function(module, &invocation.name);
                    }
                }
                self.method_in_file(file, &invocation.name)
            }
            Some(qualifier) => {
                for import in &source.imports {
                    if &import.module == qualifier
                        || import.module.ends_with(&format!(".{qualifier}"))
                    {
                        let module = self.find_module(qualifier)?;
                        return self.file_function(module, &invocation.name);
                    }
                }
                self.method_in_file(file, &invocation.name)
            }
        }
    }

    /// The class method with this name, provided it is unambiguous.
    fn unique_method(&self, class: ClassId, name: &str) -> Option<FunctionId> {
        let matches: Vec<FunctionId> = self.classes[class.0]
            .methods
            .iter()
            .copied()
            .filter(|&m| self.functions[m.0].name == name)
            .collect();
        (matches.len() == 1).then(|| matches[0])
    }

    /// Last file-level function with this name, if any.
    fn file_function(&self, file: FileId, name: &str) -> Option<FunctionId> {
        self.files[file.0]
            .functions
            .iter()
            .copied()
            .filter(|&f| self.functions[f.0].name == name)
            .last()
    }

    /// Last method with this name across the file's classes, if any.
    fn method_in_file(&self, file: FileId, name: &str) -> Option<FunctionId> {
        self.files[file.0]
            .classes
            .iter()
            .flat_map(|&c| self.classes[c.0].methods.iter().copied())
            .filter(|&m| self.functions[m.0].name == name)
            .last()
    }

    /// Type name of the last local with this name declared in the
    /// function's body.
    fn local_type_of(&self, function: FunctionId, name: &str) -> Option<String> {
        self.functions[function.0]
            .blocks
            .iter()
            .flat_map(|&b| self.blocks[b.0].locals.iter())
            .filter(|(local, _)| local == name)
            .map(|(_, ty)| ty.clone())
            .last()
    }

    /// Type name of the last class field with this name.
    fn field_type_of(&self, class: ClassId, name: &str) -> Option<String> {
        self.classes[class.0]
            .fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.type_name.clone())
            .last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompareConfig;

    /// A minimal Java-shaped project: one file, one class, two methods
    /// where `caller` invokes `callee`.
    fn make_linked_project() -> Project {
        let mut project = Project::new("demo", Language::Java, PathBuf::from("demo"));
        let file = project.add_file(SourceFile {
            name: "Demo.java".into(),
            path: PathBuf::from("Demo.java"),
            module: "demo".into(),
            classes: vec![],
            functions: vec![],
            top_blocks: vec![],
            imports: vec![],
        });
        let class = project.add_class(Class {
            name: "Demo".into(),
            modifiers: vec![Modifier("public".into())],
            fields: vec![],
            methods: vec![],
            file,
        });

        let mut callee_block = Block::new("Statement 1");
        callee_block.record_kind("return_statement");
        let callee_block = project.add_block(callee_block);
        project.add_function(Function {
            name: "callee".into(),
            modifiers: vec![],
            signature: Signature::Typed {
                return_type_name: "int".into(),
                return_type: TypeRef::none(),
                parameters: vec![],
            },
            blocks: vec![callee_block],
            all_blocks: vec![],
            class: Some(class),
            file,
        });

        let mut caller_block = Block::new("Statement 2");
        caller_block.record_kind("expression_statement");
        caller_block.invocations.push(Invocation {
            qualifier: None,
            name: "callee".into(),
        });
        let caller_block = project.add_block(caller_block);
        project.add_function(Function {
            name: "caller".into(),
            modifiers: vec![],
            signature: Signature::Typed {
                return_type_name: String::new(),
                return_type: TypeRef::none(),
                parameters: vec![],
            },
            blocks: vec![caller_block],
            all_blocks: vec![],
            class: Some(class),
            file,
        });
        project
    }

    #[test]
    fn test_all_blocks_includes_invoked_bodies() {
        let mut project = make_linked_project();
        project.resolve(&CompareConfig::default());

        let caller = FunctionId(1);
        assert_eq!(project.function(caller).all_blocks.len(), 2);
        let callee = FunctionId(0);
        assert_eq!(project.function(callee).all_blocks.len(), 1);
    }

    #[test]
    fn test_self_recursion_is_excluded() {
        let mut project = Project::new("demo", Language::Java, PathBuf::from("demo"));
        let file = project.add_file(SourceFile {
            name: "Demo.java".into(),
            path: PathBuf::from("Demo.java"),
            module: "demo".into(),
            classes: vec![],
            functions: vec![],
            top_blocks: vec![],
            imports: vec![],
        });
        let class = project.add_class(Class {
            name: "Demo".into(),
            modifiers: vec![],
            fields: vec![],
            methods: vec![],
            file,
        });
        let mut block = Block::new("Statement 1");
        block.invocations.push(Invocation {
            qualifier: None,
            name: "again".into(),
        });
        let block = project.add_block(block);
        project.add_function(Function {
            name: "again".into(),
            modifiers: vec![],
            signature: Signature::Typed {
                return_type_name: String::new(),
                return_type: TypeRef::none(),
                parameters: vec![],
            },
            blocks: vec![block],
            all_blocks: vec![],
            class: Some(class),
            file,
        });
        project.resolve(&CompareConfig::default());

        assert_eq!(project.function(FunctionId(0)).all_blocks.len(), 1);
    }

    #[test]
    fn test_user_type_registration_and_resolution() {
        let mut project = make_linked_project();
        project.resolve(&CompareConfig::default());

        assert!(project.is_user_type("demo", "Demo"));
        let config = CompareConfig::default();
        let file = FileId(0);
        let own = project.resolve_type(file, "Demo", &config);
        assert!(own.user_defined);
        let external = project.resolve_type(file, "String", &config);
        assert!(!external.user_defined);
        assert_eq!(
            external.compatible_format, None,
            "String has no canonical family of its own"
        );
        let int = project.resolve_type(file, "int", &config);
        assert_eq!(int.compatible_format.as_deref(), Some("Double"));
    }

    #[test]
    fn test_constituents_flatten_through_user_types() {
        let mut project = Project::new("demo", Language::Java, PathBuf::from("demo"));
        let file = project.add_file(SourceFile {
            name: "A.java".into(),
            path: PathBuf::from("A.java"),
            module: "demo".into(),
            classes: vec![],
            functions: vec![],
            top_blocks: vec![],
            imports: vec![],
        });
        let a = Class {
            name: "A".into(),
            modifiers: vec![],
            fields: vec![Variable {
                name: "b".into(),
                modifiers: vec![],
                type_name: "B".into(),
                ty: TypeRef::none(),
            }],
            methods: vec![],
            file,
        };
        let b = Class {
            name: "B".into(),
            modifiers: vec![],
            fields: vec![
                Variable {
                    name: "count".into(),
                    modifiers: vec![],
                    type_name: "int".into(),
                    ty: TypeRef::none(),
                },
                Variable {
                    name: "label".into(),
                    modifiers: vec![],
                    type_name: "String".into(),
                    ty: TypeRef::none(),
                },
            ],
            methods: vec![],
            file,
        };
        project.add_class(a);
        project.add_class(b);
        project.resolve(&CompareConfig::default());

        let config = CompareConfig::default();
        let a_ty = project.resolve_type(file, "A", &config);
        let constituents = project.type_constituents(&a_ty);
        let names: Vec<&str> = constituents.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["int", "String"]);
    }

    #[test]
    fn test_find_module_accepts_fragments() {
        let mut project = Project::new("demo", Language::Python, PathBuf::from("demo"));
        project.add_file(SourceFile {
            name: "utils.py".into(),
            path: PathBuf::from("pkg/utils.py"),
            module: "pkg.utils".into(),
            classes: vec![],
            functions: vec![],
            top_blocks: vec![],
            imports: vec![],
        });
        assert!(project.find_module("pkg.utils").is_some());
        assert!(project.find_module("utils").is_some());
        assert!(project.find_module("missing").is_none());
    }
}
