//! Class template registry

use std::sync::Arc;

use dil_parser::{ClassDecl, Expr};
use indexmap::IndexMap;

use crate::error::{EvalError, EvalResult};
use crate::value::TypeTag;

/// One declared field of a class template
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    /// Evaluated anew for every instance
    pub default: Expr,
    pub declared_type: Option<TypeTag>,
    pub overwritable: bool,
}

/// An immutable, named field schema
#[derive(Debug, Clone)]
pub struct ClassTemplate {
    pub name: Arc<str>,
    pub fields: Vec<FieldDef>,
}

impl ClassTemplate {
    /// Build a template from its declaration, rejecting repeated field names
    pub fn from_decl(decl: &ClassDecl) -> EvalResult<Self> {
        let mut fields: Vec<FieldDef> = Vec::with_capacity(decl.fields.len());

        for field in &decl.fields {
            if fields.iter().any(|f| f.name == field.name.node) {
                return Err(EvalError::DuplicateField {
                    class: decl.name.node.clone(),
                    field: field.name.node.clone(),
                });
            }
            fields.push(FieldDef {
                name: field.name.node.clone(),
                default: field.default.clone(),
                declared_type: field.ty.as_ref().map(|t| t.node),
                overwritable: field.overwrite,
            });
        }

        Ok(Self {
            name: decl.name.node.as_str().into(),
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Table of class templates, in definition order
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, Arc<ClassTemplate>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. A name can be registered only once.
    pub fn define(&mut self, template: ClassTemplate) -> EvalResult<Arc<ClassTemplate>> {
        if self.classes.contains_key(template.name.as_ref()) {
            return Err(EvalError::DuplicateClass(template.name.to_string()));
        }
        let template = Arc::new(template);
        self.classes
            .insert(template.name.to_string(), Arc::clone(&template));
        Ok(template)
    }

    pub fn lookup(&self, name: &str) -> EvalResult<Arc<ClassTemplate>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedClass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class names in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dil_parser::{parse_program, StmtKind};

    fn decl(source: &str) -> ClassDecl {
        let program = parse_program(source).expect("Failed to parse");
        match program.statements.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Class(decl)) => decl,
            other => panic!("expected class declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_from_decl_keeps_field_order_and_flags() {
        let template = ClassTemplate::from_decl(&decl(
            r#"class Book: Title: "x"; Year: 1900 as int; Status: "p" $overwrite$; class:end;"#,
        ))
        .unwrap();

        let names: Vec<_> = template.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Title", "Year", "Status"]);
        assert_eq!(template.field("Year").unwrap().declared_type, Some(TypeTag::Int));
        assert!(template.field("Status").unwrap().overwritable);
        assert!(template.field("Isbn").is_none());
    }

    #[test]
    fn test_duplicate_field() {
        let err = ClassTemplate::from_decl(&decl("class A: x: 1; x: 2; class:end;")).unwrap_err();
        assert_eq!(
            err,
            EvalError::DuplicateField {
                class: "A".to_string(),
                field: "x".to_string()
            }
        );
    }

    #[test]
    fn test_define_and_lookup() {
        let mut registry = ClassRegistry::new();
        registry
            .define(ClassTemplate::from_decl(&decl("class A: class:end;")).unwrap())
            .unwrap();
        registry
            .define(ClassTemplate::from_decl(&decl("class B: class:end;")).unwrap())
            .unwrap();

        assert!(registry.contains("A"));
        assert_eq!(registry.lookup("B").unwrap().name.as_ref(), "B");
        assert_eq!(registry.names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(
            registry.lookup("C").unwrap_err(),
            EvalError::UndefinedClass("C".to_string())
        );
    }

    #[test]
    fn test_duplicate_class() {
        let mut registry = ClassRegistry::new();
        let template = ClassTemplate::from_decl(&decl("class A: class:end;")).unwrap();
        registry.define(template.clone()).unwrap();
        assert_eq!(
            registry.define(template).unwrap_err(),
            EvalError::DuplicateClass("A".to_string())
        );
        assert_eq!(registry.len(), 1);
    }
}
