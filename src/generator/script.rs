//! Shared traversal for script generators.
//!
//! A generator walks a decision routine exactly the way the interpreter
//! does, but prints instead of reducing. The walk lives here; a [`Dialect`]
//! supplies only the syntax for values, conditions, assignments and the
//! leaf statements. Keeping the walk in one place is what makes the CMake
//! and ndk-build outputs pick the same archive for the same environment.

use std::collections::BTreeSet;

use thiserror::Error;
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::CxxLanguageFeature;
use crate::ir::{Constant, Expression, ExternalFunction, FindModule, Global, IfSwitch, ModuleArchive};
use crate::util::diagnostic::Diagnostic;

#[derive(Debug, Error, PartialEq)]
pub enum GenerateError {
    #[error("{dialect} cannot express `{function}`")]
    Unsupported {
        dialect: &'static str,
        function: ExternalFunction,
    },

    #[error("{dialect} cannot use {what} as a statement")]
    NotAStatement { dialect: &'static str, what: String },

    #[error("{dialect} cannot use {what} as a value")]
    NotAValue { dialect: &'static str, what: String },

    #[error("{dialect} cannot use {what} as a condition")]
    NotACondition { dialect: &'static str, what: String },
}

impl GenerateError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string())
            .with_context("the decision routine uses a construct this build system has no syntax for")
    }
}

/// An archive whose path expressions are already rendered in the dialect.
#[derive(Debug, Clone)]
pub struct RenderedArchive<'a> {
    pub remote: &'a Url,
    pub file: &'a str,
    pub sha256: &'a str,
    pub size: u64,
    pub include: Option<String>,
    pub libs: Vec<String>,
}

/// Indented text buffer.
#[derive(Debug, Default)]
pub struct ScriptWriter {
    text: String,
    indent: usize,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.text.push_str("  ");
            }
            self.text.push_str(line);
        }
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.indent
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Syntax of one build system.
///
/// Values are rendered as fragments that can be embedded in a larger
/// string; conditions as whatever the dialect's `if` takes.
pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Target systems this build system can be configured for, if fixed.
    /// Cases for other systems are left out of the output.
    fn target_systems(&self) -> Option<&'static [&'static str]> {
        None
    }

    fn global(&self, global: Global) -> String;
    fn reference(&self, name: &str) -> String;
    fn literal(&self, text: &str) -> String;
    fn boolean(&self, value: bool) -> String;
    fn list(&self, items: Vec<String>) -> String;
    fn join(&self, segments: Vec<String>) -> String;

    fn equals(&self, left: &str, right: &str) -> String;
    fn at_least(&self, value: &str, minimum: i64) -> String;
    fn starts_with(&self, value: &str, prefix: &str) -> String;
    fn or(&self, left: &str, right: &str) -> String;
    fn not(&self, operand: &str) -> String;
    fn only_element(&self, list: &str, element: &str) -> String;
    fn supports_compiler_features(&self) -> String;

    fn begin_if(&self, condition: &str) -> String;
    fn else_if(&self, condition: &str) -> String;
    fn begin_else(&self) -> String;
    fn end_if(&self) -> String;

    fn assign(&self, out: &mut ScriptWriter, name: &str, value: &str);

    fn assign_file_name(&self, out: &mut ScriptWriter, name: &str, path: &str)
        -> Result<(), GenerateError>;

    fn assign_last_index_of(
        &self,
        out: &mut ScriptWriter,
        name: &str,
        text: &str,
        needle: &str,
    ) -> Result<(), GenerateError>;

    fn assign_substring(
        &self,
        out: &mut ScriptWriter,
        name: &str,
        text: &str,
        begin: &str,
        end: &str,
    ) -> Result<(), GenerateError>;

    /// Stop configuration with an already substituted message.
    fn abort(&self, out: &mut ScriptWriter, message: &str);

    fn module(
        &self,
        out: &mut ScriptWriter,
        find: &FindModule,
        archive: &RenderedArchive<'_>,
        dependencies: &BTreeSet<Coordinate>,
    );

    fn requires_features(
        &self,
        out: &mut ScriptWriter,
        find: &FindModule,
        features: &[CxxLanguageFeature],
    );

    fn requires_standard(&self, out: &mut ScriptWriter, find: &FindModule, standard: i64);

    /// Open the routine for one coordinate. Leaves the writer indented for
    /// the body.
    fn begin_routine(&self, out: &mut ScriptWriter, find: &FindModule);

    fn end_routine(&self, out: &mut ScriptWriter, find: &FindModule);
}

/// Print one decision routine in `dialect`.
pub fn write_routine<D: Dialect + ?Sized>(
    dialect: &D,
    out: &mut ScriptWriter,
    find: &FindModule,
) -> Result<(), GenerateError> {
    let walker = Walker { dialect, find };
    dialect.begin_routine(out, find);
    walker.statement(out, &find.body)?;
    dialect.end_routine(out, find);
    Ok(())
}

struct Walker<'a, D: ?Sized> {
    dialect: &'a D,
    find: &'a FindModule,
}

impl<D: Dialect + ?Sized> Walker<'_, D> {
    fn statement(&self, out: &mut ScriptWriter, expression: &Expression) -> Result<(), GenerateError> {
        let dialect = self.dialect;
        match expression {
            Expression::AssignmentBlock(block) => {
                for assignment in &block.assignments {
                    self.assignment(out, &assignment.name, &assignment.value)?;
                }
                self.statement(out, &block.body)
            }
            Expression::IfSwitch(switch) => self.if_switch(out, switch),
            Expression::Multi(statements) => statements
                .iter()
                .try_for_each(|statement| self.statement(out, statement)),
            Expression::Abort(abort) => {
                let parameters = abort
                    .parameters
                    .iter()
                    .map(|p| self.value(p))
                    .collect::<Result<Vec<_>, _>>()?;
                dialect.abort(out, &abort.render(&parameters));
                Ok(())
            }
            Expression::Module(module) => {
                let archive = self.render_archive(&module.archive)?;
                dialect.module(out, self.find, &archive, &module.dependencies);
                Ok(())
            }
            Expression::ModuleArchive(archive) => {
                let archive = self.render_archive(archive)?;
                dialect.module(out, self.find, &archive, &BTreeSet::new());
                Ok(())
            }
            Expression::Invoke {
                function: ExternalFunction::RequiresCompilerFeatures,
                args,
            } => {
                let features = match args.as_slice() {
                    [Expression::Array(items)] => items
                        .iter()
                        .map(|item| match item {
                            Expression::Constant(Constant::Feature(feature)) => Ok(*feature),
                            other => Err(self.not_a_value(other)),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => return Err(self.not_a_statement(expression)),
                };
                dialect.requires_features(out, self.find, &features);
                Ok(())
            }
            Expression::Invoke {
                function: ExternalFunction::RequireMinimumCxxCompilerStandard,
                args,
            } => match args.as_slice() {
                [Expression::Constant(Constant::Int(standard))] => {
                    dialect.requires_standard(out, self.find, *standard);
                    Ok(())
                }
                _ => Err(self.not_a_statement(expression)),
            },
            Expression::Nop => Ok(()),
            other => Err(self.not_a_statement(other)),
        }
    }

    fn if_switch(&self, out: &mut ScriptWriter, switch: &IfSwitch) -> Result<(), GenerateError> {
        let dialect = self.dialect;
        let cases: Vec<(&Expression, &Expression)> = switch
            .conditions
            .iter()
            .zip(&switch.branches)
            .filter(|(condition, _)| self.reachable(condition))
            .collect();
        if cases.is_empty() {
            return self.statement(out, &switch.otherwise);
        }

        for (i, (condition, branch)) in cases.iter().enumerate() {
            let condition = self.condition(condition)?;
            if i == 0 {
                out.line(dialect.begin_if(&condition));
            } else {
                out.line(dialect.else_if(&condition));
            }
            out.indent();
            self.statement(out, branch)?;
            out.dedent();
        }
        if !matches!(*switch.otherwise, Expression::Nop) {
            out.line(dialect.begin_else());
            out.indent();
            self.statement(out, &switch.otherwise)?;
            out.dedent();
        }
        out.line(dialect.end_if());
        Ok(())
    }

    /// False for a target-system case the build system can never take.
    fn reachable(&self, condition: &Expression) -> bool {
        let Some(systems) = self.dialect.target_systems() else {
            return true;
        };
        match condition {
            Expression::Invoke {
                function: ExternalFunction::StringEquals,
                args,
            } => match args.as_slice() {
                [Expression::Parameter(Global::TargetSystem), Expression::Constant(Constant::Str(system))] => {
                    systems.contains(&system.as_str())
                }
                _ => true,
            },
            _ => true,
        }
    }

    fn assignment(&self, out: &mut ScriptWriter, name: &str, value: &Expression) -> Result<(), GenerateError> {
        let dialect = self.dialect;
        if let Expression::Invoke { function, args } = value {
            match (function, args.as_slice()) {
                (ExternalFunction::FileGetName, [path]) => {
                    return dialect.assign_file_name(out, name, &self.value(path)?);
                }
                (ExternalFunction::StringLastIndexOf, [text, needle]) => {
                    return dialect.assign_last_index_of(out, name, &self.value(text)?, &self.value(needle)?);
                }
                (ExternalFunction::StringSubstring, [text, begin, end]) => {
                    return dialect.assign_substring(
                        out,
                        name,
                        &self.value(text)?,
                        &self.value(begin)?,
                        &self.value(end)?,
                    );
                }
                _ => {}
            }
        }
        dialect.assign(out, name, &self.value(value)?);
        Ok(())
    }

    fn value(&self, expression: &Expression) -> Result<String, GenerateError> {
        let dialect = self.dialect;
        match expression {
            Expression::Constant(Constant::Str(text)) => Ok(dialect.literal(text)),
            Expression::Constant(Constant::Int(n)) => Ok(n.to_string()),
            Expression::Constant(Constant::Bool(b)) => Ok(dialect.boolean(*b)),
            Expression::Constant(Constant::Feature(feature)) => Ok(feature.as_str().to_string()),
            Expression::Parameter(global) => Ok(dialect.global(*global)),
            Expression::AssignmentReference(name) => Ok(dialect.reference(name)),
            Expression::Array(items) => Ok(dialect.list(
                items
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<_, _>>()?,
            )),
            Expression::Invoke {
                function: ExternalFunction::FileJoinSegments,
                args,
            } => Ok(dialect.join(
                args.iter()
                    .map(|arg| self.value(arg))
                    .collect::<Result<_, _>>()?,
            )),
            other => Err(self.not_a_value(other)),
        }
    }

    fn condition(&self, expression: &Expression) -> Result<String, GenerateError> {
        let dialect = self.dialect;
        let Expression::Invoke { function, args } = expression else {
            return match expression {
                Expression::Constant(Constant::Bool(b)) => Ok(dialect.boolean(*b)),
                other => Err(self.not_a_condition(other)),
            };
        };
        match (function, args.as_slice()) {
            (ExternalFunction::StringEquals, [left, right]) => {
                Ok(dialect.equals(&self.value(left)?, &self.value(right)?))
            }
            (ExternalFunction::IntegerGte, [value, Expression::Constant(Constant::Int(minimum))]) => {
                Ok(dialect.at_least(&self.value(value)?, *minimum))
            }
            (ExternalFunction::StringStartsWith, [value, Expression::Constant(Constant::Str(prefix))]) => {
                Ok(dialect.starts_with(&self.value(value)?, prefix))
            }
            (ExternalFunction::Or, [left, right]) => {
                Ok(dialect.or(&self.condition(left)?, &self.condition(right)?))
            }
            (ExternalFunction::Not, [operand]) => Ok(dialect.not(&self.condition(operand)?)),
            (ExternalFunction::ArrayHasOnlyElement, [list, element]) => {
                Ok(dialect.only_element(&self.value(list)?, &self.value(element)?))
            }
            (ExternalFunction::SupportsCompilerFeatures, []) => Ok(dialect.supports_compiler_features()),
            _ => Err(self.not_a_condition(expression)),
        }
    }

    fn render_archive<'a>(&self, archive: &'a ModuleArchive) -> Result<RenderedArchive<'a>, GenerateError> {
        let include = match &archive.include {
            Some(include) => Some(self.value(include)?),
            None => None,
        };
        let libs = archive
            .libs
            .iter()
            .map(|lib| self.value(lib))
            .collect::<Result<_, _>>()?;
        Ok(RenderedArchive {
            remote: &archive.remote,
            file: &archive.file,
            sha256: &archive.sha256,
            size: archive.size,
            include,
            libs,
        })
    }

    fn not_a_statement(&self, expression: &Expression) -> GenerateError {
        GenerateError::NotAStatement {
            dialect: self.dialect.name(),
            what: describe(expression),
        }
    }

    fn not_a_value(&self, expression: &Expression) -> GenerateError {
        GenerateError::NotAValue {
            dialect: self.dialect.name(),
            what: describe(expression),
        }
    }

    fn not_a_condition(&self, expression: &Expression) -> GenerateError {
        GenerateError::NotACondition {
            dialect: self.dialect.name(),
            what: describe(expression),
        }
    }
}

fn describe(expression: &Expression) -> String {
    match expression {
        Expression::Constant(_) => "a constant".to_string(),
        Expression::Parameter(global) => format!("global `{}`", global),
        Expression::Array(_) => "an array".to_string(),
        Expression::AssignmentReference(name) => format!("reference `{}`", name),
        Expression::Invoke { function, .. } => format!("a call to `{}`", function),
        Expression::IfSwitch(_) => "a switch".to_string(),
        Expression::Abort(_) => "an abort".to_string(),
        Expression::AssignmentBlock(_) => "an assignment block".to_string(),
        Expression::ModuleArchive(_) | Expression::Module(_) => "a module".to_string(),
        Expression::Multi(_) => "a statement list".to_string(),
        Expression::Nop => "nothing".to_string(),
    }
}

/// `add_cdep_{artifact}_dependency`.
pub fn add_dependency_function_name(coordinate: &Coordinate) -> String {
    format!("add_cdep_{}_dependency", coordinate.artifact_identifier())
}
