//! Python loader
//!
//! Parses `.py` sources with tree-sitter. Python files contribute top-level
//! functions, classes with methods, and loose top-level statements as
//! blocks; signatures are compared by arity, so the loader records the
//! positional/keyword parameter counts and variadic flags instead of types.

use anyhow::{anyhow, Context, Result};
use log::warn;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

use crate::model::{
    Block, Class, ClassId, FileId, Function, Import, Invocation, Project, Signature, SourceFile,
};
use crate::types::Language;

/// Load a Python project from the given source files. Unparseable files are
/// skipped with a warning.
pub fn load(name: &str, root: &Path, sources: &[PathBuf]) -> Result<Project> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    parser
        .set_language(&language)
        .context("failed to initialise the Python grammar")?;

    let mut project = Project::new(name, Language::Python, root.to_path_buf());
    for path in sources {
        if let Err(err) = load_file(&mut project, &mut parser, path, root) {
            warn!("skipping {}: {err}", path.display());
        }
    }
    Ok(project)
}

fn load_file(project: &mut Project, parser: &mut Parser, path: &Path, root: &Path) -> Result<()> {
    let source = std::fs::read_to_string(path)?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| anyhow!("parser returned no tree"))?;
    let module_node = tree.root_node();
    if module_node.has_error() {
        return Err(anyhow!("syntax errors in module"));
    }
    let src = source.as_bytes();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = project.add_file(SourceFile {
        name: file_name,
        path: path.to_path_buf(),
        module: module_path(path, root),
        classes: Vec::new(),
        functions: Vec::new(),
        top_blocks: Vec::new(),
        imports: imports_of(module_node, src),
    });

    let mut cursor = module_node.walk();
    for statement in module_node.named_children(&mut cursor) {
        let unwrapped = unwrap_decorated(statement);
        match unwrapped.kind() {
            "function_definition" => {
                load_function(project, file, None, unwrapped, src);
            }
            "class_definition" => {
                load_class(project, file, unwrapped, src);
            }
            "comment" => {}
            _ => {
                let block = statement_block(statement, src);
                project.add_top_block(file, block);
            }
        }
    }
    Ok(())
}

/// Dotted module path of a file relative to the project root
/// (`pkg/sub/mod.py` → `pkg.sub.mod`).
fn module_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }
    parts.join(".")
}

fn imports_of(module: Node, src: &[u8]) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut cursor = module.walk();
    for statement in module.named_children(&mut cursor) {
        match statement.kind() {
            "import_statement" => {
                let mut inner = statement.walk();
                for child in statement.named_children(&mut inner) {
                    match child.kind() {
                        "dotted_name" => imports.push(Import {
                            module: text_of(child, src),
                            names: Vec::new(),
                            wildcard: false,
                        }),
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                imports.push(Import {
                                    module: text_of(name, src),
                                    names: Vec::new(),
                                    wildcard: false,
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let module_name = statement
                    .child_by_field_name("module_name")
                    .map(|m| text_of(m, src))
                    .unwrap_or_default();
                let mut names = Vec::new();
                let mut wildcard = false;
                let mut inner = statement.walk();
                for child in statement.named_children(&mut inner) {
                    match child.kind() {
                        "wildcard_import" => wildcard = true,
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                names.push(text_of(name, src));
                            }
                        }
                        "dotted_name" if text_of(child, src) != module_name => {
                            names.push(text_of(child, src));
                        }
                        _ => {}
                    }
                }
                imports.push(Import {
                    module: module_name,
                    names,
                    wildcard,
                });
            }
            _ => {}
        }
    }
    imports
}

/// Peel a `decorated_definition` down to the definition it wraps.
fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

fn load_class(project: &mut Project, file: FileId, node: Node, src: &[u8]) {
    let name = node
        .child_by_field_name("name")
        .map(|n| text_of(n, src))
        .unwrap_or_default();
    let class = project.add_class(Class {
        name,
        modifiers: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        file,
    });
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for statement in body.named_children(&mut cursor) {
        let unwrapped = unwrap_decorated(statement);
        if unwrapped.kind() == "function_definition" {
            load_function(project, file, Some(class), unwrapped, src);
        }
    }
}

fn load_function(
    project: &mut Project,
    file: FileId,
    class: Option<ClassId>,
    node: Node,
    src: &[u8],
) {
    let name = node
        .child_by_field_name("name")
        .map(|n| text_of(n, src))
        .unwrap_or_default();
    let signature = node
        .child_by_field_name("parameters")
        .map_or_else(empty_signature, signature_of);

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
        modifiers: Vec::new(),
        signature,
        blocks,
        all_blocks: Vec::new(),
        class,
        file,
    });
}

fn empty_signature() -> Signature {
    Signature::Dynamic {
        args: 0,
        positional_only: 0,
        keyword_only: 0,
        has_vararg: false,
        has_kwarg: false,
    }
}

/// Bucket the parameter list into ordinary, positional-only and
/// keyword-only counts, tracking `*args`/`**kwargs` presence.
fn signature_of(parameters: Node) -> Signature {
    let mut args = 0u32;
    let mut positional_only = 0u32;
    let mut keyword_only = 0u32;
    let mut has_vararg = false;
    let mut has_kwarg = false;
    let mut keyword_section = false;

    let mut cursor = parameters.walk();
    for child in parameters.named_children(&mut cursor) {
        match child.kind() {
            "identifier" | "typed_parameter" | "default_parameter" | "typed_default_parameter"
            | "tuple_pattern" => {
                if keyword_section {
                    keyword_only += 1;
                } else {
                    args += 1;
                }
            }
            "list_splat_pattern" => {
                has_vararg = true;
                keyword_section = true;
            }
            "keyword_separator" => keyword_section = true,
            "positional_separator" => {
                // Everything seen so far was positional-only.
                positional_only += args;
                args = 0;
            }
            "dictionary_splat_pattern" => has_kwarg = true,
            _ => {}
        }
    }

    Signature::Dynamic {
        args,
        positional_only,
        keyword_only,
        has_vararg,
        has_kwarg,
    }
}

/// Turn one statement into a [`Block`]: node-kind histogram plus the call
/// sites used to link reachable blocks.
fn statement_block(statement: Node, src: &[u8]) -> Block {
    let mut block = Block::new(format!("Statement {}", statement.start_position().row + 1));
    collect_histogram(statement, &mut block);
    collect_calls(statement, src, &mut block);
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

fn collect_calls(node: Node, src: &[u8], block: &mut Block) {
    if node.kind() == "call" {
        if let Some(function) = node.child_by_field_name("function") {
            match function.kind() {
                "identifier" => block.invocations.push(Invocation {
                    qualifier: None,
                    name: text_of(function, src),
                }),
                "attribute" => {
                    let qualifier = function
                        .child_by_field_name("object")
                        .filter(|o| o.kind() == "identifier")
                        .map(|o| text_of(o, src));
                    if let Some(name) = function
                        .child_by_field_name("attribute")
                        .map(|a| text_of(a, src))
                    {
                        block.invocations.push(Invocation { qualifier, name });
                    }
                }
                _ => {}
            }
        }
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_calls(child, src, block);
        }
    }
}

fn text_of(node: Node, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionId;
    use crate::types::CompareConfig;
    use std::fs;

    const TOOLBOX: &str = r#"
import os
from helpers import shared

def helper(a, b):
    return a + b

def main(*values, **options):
    total = helper(1, 2)
    print(total)

class Runner:
    def run(self, count):
        for i in range(count):
            helper(i, i)
"#;

    fn load_source(source: &str, file_name: &str) -> Project {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        fs::write(&path, source).unwrap();
        let mut project = load("demo", dir.path(), &[path]).unwrap();
        project.resolve(&CompareConfig::default());
        project
    }

    #[test]
    fn test_loads_functions_classes_and_imports() {
        let project = load_source(TOOLBOX, "toolbox.py");

        let file = project.file(FileId(0));
        assert_eq!(file.module, "toolbox");
        assert_eq!(file.functions.len(), 2);
        assert_eq!(file.classes.len(), 1);
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].module, "helpers");
        assert_eq!(file.imports[1].names, vec!["shared".to_string()]);
        // The two imports land in the top-level statement blocks.
        assert_eq!(file.top_blocks.len(), 2);
    }

    #[test]
    fn test_dynamic_signatures_count_arity() {
        let project = load_source(TOOLBOX, "toolbox.py");

        let helper = project.function(FunctionId(0));
        let Signature::Dynamic {
            args,
            has_vararg,
            has_kwarg,
            ..
        } = helper.signature
        else {
            panic!("expected a dynamic signature");
        };
        assert_eq!(args, 2);
        assert!(!has_vararg);
        assert!(!has_kwarg);

        let main = project.function(FunctionId(1));
        let Signature::Dynamic {
            args,
            has_vararg,
            has_kwarg,
            ..
        } = main.signature
        else {
            panic!("expected a dynamic signature");
        };
        assert_eq!(args, 0);
        assert!(has_vararg);
        assert!(has_kwarg);
    }

    #[test]
    fn test_positional_and_keyword_sections() {
        let source = "def f(a, b, /, c, *, d, e):\n    pass\n";
        let project = load_source(source, "sections.py");

        let f = project.function(FunctionId(0));
        let Signature::Dynamic {
            args,
            positional_only,
            keyword_only,
            ..
        } = f.signature
        else {
            panic!("expected a dynamic signature");
        };
        assert_eq!(positional_only, 2);
        assert_eq!(args, 1);
        assert_eq!(keyword_only, 2);
    }

    #[test]
    fn test_calls_link_reachable_blocks() {
        let project = load_source(TOOLBOX, "toolbox.py");

        // `main` calls `helper`, so its reachable blocks include helper's
        // body on top of its own two statements.
        let main = project.function(FunctionId(1));
        assert_eq!(main.blocks.len(), 2);
        assert_eq!(main.all_blocks.len(), 3);

        // The method `run` reaches `helper` through the file scope.
        let run = project.function(FunctionId(2));
        assert_eq!(run.blocks.len(), 1);
        assert_eq!(run.all_blocks.len(), 2);
    }

    #[test]
    fn test_histograms_cover_nested_nodes() {
        let project = load_source(TOOLBOX, "toolbox.py");

        let main = project.function(FunctionId(1));
        let first = project.block(main.blocks[0]);
        assert!(first.histogram.contains_key("call"));
        assert!(first.histogram.contains_key("assignment"));
    }
}
