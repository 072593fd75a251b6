//! Reduces a decision routine for one concrete environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::CxxLanguageFeature;
use crate::ir::{Constant, Expression, FindModule, FunctionTable, Global, ModuleArchive};
use crate::ir::functions::ExternalFunction;

/// A constraint on the consuming target's C++ compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum CompilerRequirement {
    Features(Vec<CxxLanguageFeature>),
    MinimumStandard(u32),
}

/// An archive picked for the environment, with its paths resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedArchive {
    pub remote: Url,
    pub sha256: String,
    pub size: u64,
    pub include: Option<PathBuf>,
    pub libs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Array(Vec<Value>),
    Feature(CxxLanguageFeature),
    Requirement(CompilerRequirement),
    Archive(SelectedArchive),
    Module {
        archive: SelectedArchive,
        dependencies: Vec<Coordinate>,
    },
    Multi(Vec<Value>),
    Nop,
}

impl Value {
    pub fn as_str(&self, function: ExternalFunction) -> Result<&str, String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(format!("{} expected a string but got {}", function, other)),
        }
    }

    pub fn as_int(&self, function: ExternalFunction) -> Result<i64, String> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("{} expected an integer but got '{}'", function, s)),
            other => Err(format!("{} expected an integer but got {}", function, other)),
        }
    }

    pub fn as_bool(&self, function: ExternalFunction) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(format!("{} expected a boolean but got {}", function, other)),
        }
    }

    /// Equality the way a build script sees it: by text.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (a, b) if a == b => true,
            (a, b) => a.to_string() == b.to_string(),
        }
    }

    /// Every archive selected anywhere in this value.
    pub fn archives(&self) -> Vec<&SelectedArchive> {
        let mut found = Vec::new();
        self.collect_archives(&mut found);
        found
    }

    fn collect_archives<'a>(&'a self, found: &mut Vec<&'a SelectedArchive>) {
        match self {
            Value::Archive(archive) | Value::Module { archive, .. } => found.push(archive),
            Value::Multi(values) => values.iter().for_each(|v| v.collect_archives(found)),
            _ => {}
        }
    }

    /// Every compiler requirement in this value.
    pub fn requirements(&self) -> Vec<&CompilerRequirement> {
        match self {
            Value::Requirement(requirement) => vec![requirement],
            Value::Multi(values) => values.iter().flat_map(Value::requirements).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", items.join(";"))
            }
            Value::Feature(feature) => f.write_str(feature.as_str()),
            Value::Requirement(CompilerRequirement::Features(features)) => {
                let names: Vec<&str> = features.iter().map(|x| x.as_str()).collect();
                write!(f, "requires {}", names.join(" "))
            }
            Value::Requirement(CompilerRequirement::MinimumStandard(standard)) => {
                write!(f, "requires C++{}", standard)
            }
            Value::Archive(archive) | Value::Module { archive, .. } => {
                write!(f, "{}", archive.remote)
            }
            Value::Multi(values) => write!(f, "{} values", values.len()),
            Value::Nop => f.write_str("nop"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InterpretError {
    #[error("Abort: {0}")]
    Abort(String),

    #[error("global `{0}` has no value")]
    UnboundGlobal(Global),

    #[error("`{0}` is not bound in this scope")]
    UnboundReference(String),

    #[error("{0}")]
    Builtin(String),

    #[error("no decision routine for `{0}`")]
    UnknownCoordinate(Coordinate),

    #[error("archive path could not be built: {0}")]
    BadArchive(String),
}

/// Lexical bindings, innermost last.
#[derive(Debug, Default)]
pub struct Bindings {
    frames: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn push(&mut self, name: &str, value: Value) {
        self.frames.push((name.to_string(), value));
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }
}

/// An environment to evaluate decision routines in.
#[derive(Debug, Clone)]
pub struct Interpreter {
    globals: BTreeMap<Global, Value>,
    supports_compiler_features: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        let mut globals = BTreeMap::new();
        globals.insert(Global::NoneRuntime, Value::Str("none".to_string()));
        Interpreter {
            globals,
            supports_compiler_features: true,
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, global: Global, value: Value) -> Self {
        self.globals.insert(global, value);
        self
    }

    pub fn with_str(self, global: Global, value: &str) -> Self {
        self.with(global, Value::Str(value.to_string()))
    }

    pub fn supports_compiler_features(mut self, supported: bool) -> Self {
        self.supports_compiler_features = supported;
        self
    }

    /// Evaluate one coordinate's decision routine.
    pub fn find_module(
        &self,
        table: &FunctionTable,
        coordinate: &Coordinate,
    ) -> Result<Value, InterpretError> {
        let find = table
            .find_functions
            .get(coordinate)
            .ok_or_else(|| InterpretError::UnknownCoordinate(coordinate.clone()))?;
        self.evaluate_find(find)
    }

    pub fn evaluate_find(&self, find: &FindModule) -> Result<Value, InterpretError> {
        self.evaluate(&find.body, &mut Bindings::new())
    }

    pub fn evaluate(
        &self,
        expression: &Expression,
        bindings: &mut Bindings,
    ) -> Result<Value, InterpretError> {
        match expression {
            Expression::Constant(constant) => Ok(match constant {
                Constant::Str(s) => Value::Str(s.clone()),
                Constant::Int(n) => Value::Int(*n),
                Constant::Bool(b) => Value::Bool(*b),
                Constant::Feature(feature) => Value::Feature(*feature),
            }),
            Expression::Parameter(global) => self
                .globals
                .get(global)
                .cloned()
                .ok_or(InterpretError::UnboundGlobal(*global)),
            Expression::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.evaluate(item, bindings))
                    .collect::<Result<_, _>>()?,
            )),
            Expression::AssignmentReference(name) => bindings
                .lookup(name)
                .cloned()
                .ok_or_else(|| InterpretError::UnboundReference(name.clone())),
            Expression::Invoke { function, args } => {
                if *function == ExternalFunction::SupportsCompilerFeatures {
                    return Ok(Value::Bool(self.supports_compiler_features));
                }
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg, bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                function.apply(&values).map_err(InterpretError::Builtin)
            }
            Expression::IfSwitch(switch) => {
                for (condition, branch) in switch.conditions.iter().zip(&switch.branches) {
                    let taken = match self.evaluate(condition, bindings)? {
                        Value::Bool(taken) => taken,
                        other => {
                            return Err(InterpretError::Builtin(format!(
                                "condition evaluated to {}",
                                other
                            )))
                        }
                    };
                    if taken {
                        return self.evaluate(branch, bindings);
                    }
                }
                self.evaluate(&switch.otherwise, bindings)
            }
            Expression::Abort(abort) => {
                let parameters = abort
                    .parameters
                    .iter()
                    .map(|p| self.evaluate(p, bindings).map(|v| v.to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                Err(InterpretError::Abort(abort.render(&parameters)))
            }
            Expression::AssignmentBlock(block) => {
                let depth = bindings.depth();
                for assignment in &block.assignments {
                    let value = self.evaluate(&assignment.value, bindings);
                    let value = match value {
                        Ok(value) => value,
                        Err(e) => {
                            bindings.truncate(depth);
                            return Err(e);
                        }
                    };
                    bindings.push(&assignment.name, value);
                }
                let result = self.evaluate(&block.body, bindings);
                bindings.truncate(depth);
                result
            }
            Expression::ModuleArchive(archive) => {
                Ok(Value::Archive(self.select_archive(archive, bindings)?))
            }
            Expression::Module(module) => Ok(Value::Module {
                archive: self.select_archive(&module.archive, bindings)?,
                dependencies: module.dependencies.iter().cloned().collect(),
            }),
            Expression::Multi(statements) => Ok(Value::Multi(
                statements
                    .iter()
                    .map(|s| self.evaluate(s, bindings))
                    .collect::<Result<_, _>>()?,
            )),
            Expression::Nop => Ok(Value::Nop),
        }
    }

    pub fn select_archive(
        &self,
        archive: &ModuleArchive,
        bindings: &mut Bindings,
    ) -> Result<SelectedArchive, InterpretError> {
        let include = match &archive.include {
            Some(include) => Some(self.evaluate_path(include, bindings)?),
            None => None,
        };
        let libs = archive
            .libs
            .iter()
            .map(|lib| self.evaluate_path(lib, bindings))
            .collect::<Result<_, _>>()?;
        Ok(SelectedArchive {
            remote: archive.remote.clone(),
            sha256: archive.sha256.clone(),
            size: archive.size,
            include,
            libs,
        })
    }

    fn evaluate_path(
        &self,
        expression: &Expression,
        bindings: &mut Bindings,
    ) -> Result<PathBuf, InterpretError> {
        match self.evaluate(expression, bindings)? {
            Value::Str(path) => Ok(PathBuf::from(path)),
            other => Err(InterpretError::BadArchive(other.to_string())),
        }
    }
}
