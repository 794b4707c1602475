//! Per-unit compiler state.
//!
//! A [`Context`] is created once per translation unit and threaded by
//! reference through classification and translation. Embedding tools can
//! pre-register names before compiling, so a unit can call into code that was
//! compiled separately and still have those calls suspend.

use crate::hints::Hints;
use crate::tables;
use std::collections::{BTreeMap, BTreeSet};

/// Shape of an ours class, used to decide who owns the constructor shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ClassInfo {
    pub bases: Vec<String>,
    pub has_init: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    functions: BTreeSet<String>,
    classes: BTreeSet<String>,
    methods: BTreeSet<String>,
    /// Bound name -> qualified module path (`font` -> `tkinter.font`).
    imports: BTreeMap<String, String>,
    files: Vec<String>,
    known_modules: BTreeSet<String>,
    helpers: BTreeSet<&'static str>,

    function_signatures: BTreeMap<String, Vec<String>>,
    /// `None` once two classes define the same method with different parameters.
    method_signatures: BTreeMap<String, Option<Vec<String>>>,
    class_info: BTreeMap<String, ClassInfo>,
    class_signatures: BTreeMap<String, Vec<String>>,

    hints: Option<Hints>,

    /// Set while the statements being translated form a class body.
    pub in_class_body: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function(&mut self, name: impl Into<String>) {
        self.functions.insert(name.into());
    }

    pub fn register_class(&mut self, name: impl Into<String>) {
        self.classes.insert(name.into());
    }

    pub fn register_method(&mut self, name: impl Into<String>) {
        self.methods.insert(name.into());
    }

    /// Record an import binding. `bound` is the local name, `qualified` the module path.
    pub fn register_import(&mut self, bound: impl Into<String>, qualified: impl Into<String>) {
        self.imports.insert(bound.into(), qualified.into());
    }

    /// Treat `module` as a configured shim in addition to the built-in list.
    pub fn add_known_module(&mut self, module: impl Into<String>) {
        self.known_modules.insert(module.into());
    }

    /// Record a resource filename; repeated names are kept once.
    pub fn add_file(&mut self, name: &str) {
        if !self.files.iter().any(|f| f == name) {
            self.files.push(name.to_string());
        }
    }

    pub fn set_hints(&mut self, hints: Option<Hints>) {
        self.hints = hints;
    }

    pub fn is_our_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn is_our_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    pub fn is_our_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    /// Qualified module path for an import binding.
    pub fn import_path(&self, bound: &str) -> Option<&str> {
        self.imports.get(bound).map(String::as_str)
    }

    pub fn is_known_module(&self, module: &str) -> bool {
        tables::is_known_module(module) || self.known_modules.contains(module)
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    /// Local names bound by imports, sorted.
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.keys().map(String::as_str)
    }

    /// Literal resource names passed to `open`, in first-seen order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Runtime helpers referenced by emitted code, sorted.
    pub fn helpers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.helpers.iter().copied()
    }

    pub fn hints(&self) -> Option<&Hints> {
        self.hints.as_ref()
    }

    pub(crate) fn use_helper(&mut self, name: &'static str) -> &'static str {
        self.helpers.insert(name);
        name
    }

    pub(crate) fn set_function_signature(&mut self, name: &str, params: Vec<String>) {
        self.function_signatures.insert(name.to_string(), params);
    }

    pub(crate) fn set_method_signature(&mut self, name: &str, params: Vec<String>) {
        match self.method_signatures.get(name) {
            None => {
                self.method_signatures
                    .insert(name.to_string(), Some(params));
            }
            Some(Some(existing)) if *existing != params => {
                self.method_signatures.insert(name.to_string(), None);
            }
            Some(_) => {}
        }
    }

    pub(crate) fn set_class_info(&mut self, name: &str, info: ClassInfo, init_params: Option<Vec<String>>) {
        self.class_info.insert(name.to_string(), info);
        if let Some(params) = init_params {
            self.class_signatures.insert(name.to_string(), params);
        }
    }

    pub(crate) fn function_signature(&self, name: &str) -> Option<&[String]> {
        self.function_signatures.get(name).map(Vec::as_slice)
    }

    pub(crate) fn method_signature(&self, name: &str) -> Option<&[String]> {
        self.method_signatures
            .get(name)
            .and_then(|sig| sig.as_deref())
    }

    /// Constructor parameters, taken from the nearest class in the chain with `__init__`.
    pub(crate) fn class_signature(&self, name: &str) -> Option<&[String]> {
        let mut current = name;
        for _ in 0..=self.class_info.len() {
            if let Some(params) = self.class_signatures.get(current) {
                return Some(params);
            }
            current = self
                .class_info
                .get(current)?
                .bases
                .iter()
                .find(|b| self.classes.contains(*b))
                .map(String::as_str)?;
        }
        None
    }

    /// Whether an ours ancestor of `name` already installs the constructor shell.
    pub(crate) fn inherits_initializer(&self, name: &str) -> bool {
        let mut pending: Vec<&str> = match self.class_info.get(name) {
            Some(info) => info.bases.iter().map(String::as_str).collect(),
            None => return false,
        };
        let mut seen = BTreeSet::new();
        while let Some(base) = pending.pop() {
            if !seen.insert(base) {
                continue;
            }
            if let Some(info) = self.class_info.get(base) {
                if info.has_init {
                    return true;
                }
                pending.extend(info.bases.iter().map(String::as_str));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_keep_first_seen_order() {
        let mut ctx = Context::new();
        ctx.add_file("b.html");
        ctx.add_file("a.css");
        ctx.add_file("b.html");
        assert_eq!(ctx.files(), ["b.html", "a.css"]);
    }

    #[test]
    fn test_conflicting_method_signatures_are_dropped() {
        let mut ctx = Context::new();
        ctx.set_method_signature("paint", vec!["canvas".into()]);
        ctx.set_method_signature("paint", vec!["canvas".into()]);
        assert_eq!(ctx.method_signature("paint"), Some(&["canvas".to_string()][..]));

        ctx.set_method_signature("paint", vec!["display_list".into()]);
        assert_eq!(ctx.method_signature("paint"), None);
    }

    #[test]
    fn test_initializer_inheritance() {
        let mut ctx = Context::new();
        for name in ["Node", "Text", "Element"] {
            ctx.register_class(name);
        }
        ctx.set_class_info(
            "Node",
            ClassInfo {
                bases: vec![],
                has_init: true,
            },
            Some(vec!["parent".into()]),
        );
        ctx.set_class_info(
            "Text",
            ClassInfo {
                bases: vec!["Node".into()],
                has_init: false,
            },
            None,
        );
        ctx.set_class_info(
            "Element",
            ClassInfo {
                bases: vec!["Text".into()],
                has_init: true,
            },
            Some(vec!["tag".into(), "parent".into()]),
        );

        assert!(!ctx.inherits_initializer("Node"));
        assert!(ctx.inherits_initializer("Text"));
        assert!(ctx.inherits_initializer("Element"));
        assert_eq!(ctx.class_signature("Text"), Some(&["parent".to_string()][..]));
    }

    #[test]
    fn test_helpers_are_sorted() {
        let mut ctx = Context::new();
        ctx.use_helper("truthy");
        ctx.use_helper("comparator");
        ctx.use_helper("truthy");
        assert_eq!(ctx.helpers().collect::<Vec<_>>(), vec!["comparator", "truthy"]);
    }
}
