//! Java loader
//!
//! Parses `.java` sources with tree-sitter and populates the entity model:
//! package and imports per file, classes with fields and modifiers, methods
//! with typed signatures, and per-statement blocks carrying node-kind
//! histograms, invocation sites and local declarations.

use anyhow::{anyhow, Context, Result};
use log::warn;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

use crate::model::{
    Block, Class, ClassId, FileId, Function, Import, Invocation, Parameter, Project, Signature,
    SourceFile, TypeRef, Variable,
};
use crate::types::Language;

/// Load a Java project from the given source files.
///
/// Files that fail to parse are skipped with a warning; the project loads
/// from whatever remains. The caller is expected to run
/// [`Project::resolve`] afterwards.
pub fn load(name: &str, root: &Path, sources: &[PathBuf]) -> Result<Project> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
    parser
        .set_language(&language)
        .context("failed to initialise the Java grammar")?;

    let mut project = Project::new(name, Language::Java, root.to_path_buf());
    for path in sources {
        if let Err(err) = load_file(&mut project, &mut parser, path) {
            warn!("skipping {}: {err}", path.display());
        }
    }
    Ok(project)
}

fn load_file(project: &mut Project, parser: &mut Parser, path: &Path) -> Result<()> {
    let source = std::fs::read_to_string(path)?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| anyhow!("parser returned no tree"))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(anyhow!("syntax errors in compilation unit"));
    }
    let src = source.as_bytes();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = project.add_file(SourceFile {
        name: file_name,
        path: path.to_path_buf(),
        module: package_of(root, src),
        classes: Vec::new(),
        functions: Vec::new(),
        top_blocks: Vec::new(),
        imports: imports_of(root, src),
    });

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if matches!(
            child.kind(),
            "class_declaration" | "interface_declaration" | "enum_declaration"
        ) {
            load_class(project, file, child, src);
        }
    }
    Ok(())
}

/// Package declaration text, or empty for the default package.
fn package_of(root: Node, src: &[u8]) -> String {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "package_declaration" {
            let mut inner = child.walk();
            for part in child.named_children(&mut inner) {
                if matches!(part.kind(), "scoped_identifier" | "identifier") {
                    return text_of(part, src);
                }
            }
        }
    }
    String::new()
}

fn imports_of(root: Node, src: &[u8]) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "import_declaration" {
            continue;
        }
        let mut path = String::new();
        let mut wildcard = false;
        let mut inner = child.walk();
        for part in child.children(&mut inner) {
            match part.kind() {
                "scoped_identifier" | "identifier" => path = text_of(part, src),
                "asterisk" => wildcard = true,
                _ => {}
            }
        }
        if path.is_empty() {
            continue;
        }
        if wildcard {
            imports.push(Import {
                module: path,
                names: Vec::new(),
                wildcard: true,
            });
        } else {
            let (module, name) = path
                .rsplit_once('.')
                .map_or((String::new(), path.clone()), |(m, n)| {
                    (m.to_string(), n.to_string())
                });
            imports.push(Import {
                module,
                names: vec![name],
                wildcard: false,
            });
        }
    }
    imports
}

fn load_class(project: &mut Project, file: FileId, node: Node, src: &[u8]) {
    let name = node
        .child_by_field_name("name")
        .map(|n| text_of(n, src))
        .unwrap_or_default();
    let body = node.child_by_field_name("body");

    // Fields first: the class entity is inserted complete, then methods
    // attach to it by id.
    let mut fields = Vec::new();
    if let Some(body) = body {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() == "field_declaration" {
                fields.extend(fields_of(member, src));
            }
        }
    }
    let class = project.add_class(Class {
        name,
        modifiers: modifiers_of(node, src),
        fields,
        methods: Vec::new(),
        file,
    });

    if let Some(body) = body {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() == "method_declaration" {
                load_method(project, file, class, member, src);
            }
        }
    }
}

/// One `field_declaration` can declare several variables; each declarator
/// becomes its own entity sharing the declaration's type and modifiers.
fn fields_of(node: Node, src: &[u8]) -> Vec<Variable> {
    let modifiers = modifiers_of(node, src);
    let type_name = node
        .child_by_field_name("type")
        .map(|t| type_name_of(t, src))
        .unwrap_or_default();
    let mut variables = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        let name = declarator
            .child_by_field_name("name")
            .map(|n| text_of(n, src))
            .unwrap_or_default();
        variables.push(Variable {
            name,
            modifiers: modifiers.clone(),
            type_name: type_name.clone(),
            ty: TypeRef::none(),
        });
    }
    variables
}

fn load_method(project: &mut Project, file: FileId, class: ClassId, node: Node, src: &[u8]) {
    let name = node
        .child_by_field_name("name")
        .map(|n| text_of(n, src))
        .unwrap_or_default();
    let return_type_name = node
        .child_by_field_name("type")
        .filter(|t| t.kind() != "void_type")
        .map(|t| type_name_of(t, src))
        .unwrap_or_default();
    let parameters = node
        .child_by_field_name("parameters")
        .map(|p| parameters_of(p, src))
        .unwrap_or_default();

    let mut blocks = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for statement in body.named_children(&mut cursor) {
            if statement.kind() == "comment" {
                continue;
            }
            let block = statement_block(statement, src);
            blocks.push(project.add_block(block));
        }
    }

    project.add_function(Function {
        name,
        modifiers: modifiers_of(node, src),
        signature: Signature::Typed {
            return_type_name,
            return_type: TypeRef::none(),
            parameters,
        },
        blocks,
        all_blocks: Vec::new(),
        class: Some(class),
        file,
    });
}

fn parameters_of(node: Node, src: &[u8]) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if !matches!(child.kind(), "formal_parameter" | "spread_parameter") {
            continue;
        }
        let type_name = child
            .child_by_field_name("type")
            .map(|t| type_name_of(t, src))
            .unwrap_or_default();
        let name = child
            .child_by_field_name("name")
            .map(|n| text_of(n, src))
            .or_else(|| last_identifier(child, src))
            .unwrap_or_default();
        parameters.push(Parameter {
            name,
            type_name,
            ty: TypeRef::none(),
        });
    }
    parameters
}

/// Turn one statement into a [`Block`]: histogram over every named node in
/// the subtree, plus the invocation sites and local declarations needed by
/// the resolution pass.
fn statement_block(statement: Node, src: &[u8]) -> Block {
    let mut block = Block::new(format!("Statement {}", statement.start_position().row + 1));
    collect_histogram(statement, &mut block);
    collect_invocations(statement, src, &mut block);
    collect_locals(statement, src, &mut block);
    block
}

fn collect_histogram(node: Node, block: &mut Block) {
    if node.is_named() {
        block.record_kind(node.kind());
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_histogram(child, block);
        }
    }
}

fn collect_invocations(node: Node, src: &[u8], block: &mut Block) {
    if node.kind() == "method_invocation" {
        let qualifier = node
            .child_by_field_name("object")
            .filter(|o| o.kind() == "identifier")
            .map(|o| text_of(o, src));
        if let Some(name) = node.child_by_field_name("name").map(|n| text_of(n, src)) {
            block.invocations.push(Invocation { qualifier, name });
        }
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_invocations(child, src, block);
        }
    }
}

fn collect_locals(node: Node, src: &[u8], block: &mut Block) {
    if node.kind() == "local_variable_declaration" {
        let type_name = node
            .child_by_field_name("type")
            .map(|t| type_name_of(t, src))
            .unwrap_or_default();
        let mut cursor = node.walk();
        for declarator in node.children_by_field_name("declarator", &mut cursor) {
            if let Some(name) = declarator
                .child_by_field_name("name")
                .map(|n| text_of(n, src))
            {
                block.locals.push((name, type_name.clone()));
            }
        }
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_locals(child, src, block);
        }
    }
}

/// Modifier keywords of a declaration; annotations are not modifiers.
fn modifiers_of(node: Node, src: &[u8]) -> Vec<crate::model::Modifier> {
    let mut modifiers = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "modifiers" {
            continue;
        }
        let mut inner = child.walk();
        for keyword in child.children(&mut inner) {
            if keyword.kind().ends_with("annotation") {
                continue;
            }
            modifiers.push(crate::model::Modifier(text_of(keyword, src)));
        }
    }
    modifiers
}

/// Base name of a type node: generics and array dimensions are stripped so
/// `ArrayList<String>` and `int[]` resolve as `ArrayList` and `int`.
fn type_name_of(node: Node, src: &[u8]) -> String {
    match node.kind() {
        "generic_type" => {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
                .map(|c| type_name_of(c, src));
            found.unwrap_or_else(|| text_of(node, src))
        }
        "array_type" => node
            .child_by_field_name("element")
            .map(|e| type_name_of(e, src))
            .unwrap_or_else(|| text_of(node, src)),
        "scoped_type_identifier" => text_of(node, src)
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => text_of(node, src),
    }
}

fn last_identifier(node: Node, src: &[u8]) -> Option<String> {
    let mut found = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "identifier" {
            found = Some(text_of(child, src));
        }
    }
    found
}

fn text_of(node: Node, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompareConfig;
    use std::fs;

    const COUNTER: &str = r#"
package app;

import java.util.ArrayList;

public class Counter {
    private int total;
    private String label;

    public int increment(int amount) {
        total = total + amount;
        return total;
    }

    public void reset() {
        int zero = 0;
        total = zero;
        increment(zero);
    }
}
"#;

    fn load_source(source: &str) -> Project {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Counter.java");
        fs::write(&path, source).unwrap();
        let mut project = load("demo", dir.path(), &[path]).unwrap();
        project.resolve(&CompareConfig::default());
        project
    }

    #[test]
    fn test_loads_package_class_and_members() {
        let project = load_source(COUNTER);

        assert_eq!(project.file_count(), 1);
        let file = project.file(FileId(0));
        assert_eq!(file.module, "app");
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].names, vec!["ArrayList".to_string()]);

        assert_eq!(project.class_count(), 1);
        let class = project.class(ClassId(0));
        assert_eq!(class.name, "Counter");
        assert_eq!(class.fields.len(), 2);
        assert_eq!(class.fields[0].type_name, "int");
        assert_eq!(class.methods.len(), 2);
    }

    #[test]
    fn test_method_signatures_are_typed() {
        let project = load_source(COUNTER);

        let increment = project.function(crate::model::FunctionId(0));
        assert_eq!(increment.name, "increment");
        let Signature::Typed {
            return_type_name,
            parameters,
            ..
        } = &increment.signature
        else {
            panic!("expected a typed signature");
        };
        assert_eq!(return_type_name, "int");
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].type_name, "int");

        let reset = project.function(crate::model::FunctionId(1));
        let Signature::Typed {
            return_type_name, ..
        } = &reset.signature
        else {
            panic!("expected a typed signature");
        };
        assert_eq!(return_type_name, "", "void maps to the empty type");
    }

    #[test]
    fn test_blocks_carry_histograms_and_invocations() {
        let project = load_source(COUNTER);

        let reset = project.function(crate::model::FunctionId(1));
        assert_eq!(reset.blocks.len(), 3);

        // `increment(zero)` makes reset's reachable blocks longer than its
        // own body.
        assert!(reset.all_blocks.len() > reset.blocks.len());

        let first = project.block(reset.blocks[0]);
        assert!(first.histogram.contains_key("local_variable_declaration"));
        assert_eq!(first.locals, vec![("zero".to_string(), "int".to_string())]);
    }

    #[test]
    fn test_unparseable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Good.java");
        fs::write(&good, "package app;\npublic class Good {}\n").unwrap();
        let bad = dir.path().join("Bad.java");
        fs::write(&bad, "public class {{{{").unwrap();

        let project = load("demo", dir.path(), &[good, bad]).unwrap();
        assert_eq!(project.file_count(), 1);
    }
}
