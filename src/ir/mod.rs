//! The expression tree that decides which archive a build uses.
//!
//! For every resolved coordinate the builder produces one [`FindModule`]: a
//! pure routine over the [`Global`] inputs that ends in exactly one module
//! (or a set of modules for header archives) or an [`Abort`]. The tree is
//! built once and never rewritten. The interpreter reduces it for a concrete
//! environment and each generator prints it in its own syntax.

pub mod builder;
pub mod check;
pub mod functions;
pub mod globals;
pub mod integrity;
pub mod interpreter;

pub use builder::{BuildError, FunctionTableBuilder};
pub use functions::ExternalFunction;
pub use globals::Global;
pub use interpreter::{Interpreter, InterpretError, Value};

use std::collections::{BTreeMap, BTreeSet};

use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::CxxLanguageFeature;

/// A literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Str(String),
    Int(i64),
    Bool(bool),
    Feature(CxxLanguageFeature),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Constant),
    Parameter(Global),
    Array(Vec<Expression>),
    /// A name bound by an enclosing [`AssignmentBlock`].
    AssignmentReference(String),
    Invoke {
        function: ExternalFunction,
        args: Vec<Expression>,
    },
    IfSwitch(IfSwitch),
    Abort(Abort),
    AssignmentBlock(AssignmentBlock),
    ModuleArchive(ModuleArchive),
    Module(Module),
    Multi(Vec<Expression>),
    Nop,
}

/// `name = value`, visible to the body of the enclosing block.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Expression,
}

/// Bindings evaluated in order, then the body.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentBlock {
    pub assignments: Vec<Assignment>,
    pub body: Box<Expression>,
}

/// First condition that holds selects its branch; otherwise the else branch.
#[derive(Debug, Clone, PartialEq)]
pub struct IfSwitch {
    pub conditions: Vec<Expression>,
    pub branches: Vec<Expression>,
    pub otherwise: Box<Expression>,
}

/// Stop with a message. Each `{}` in the message is replaced by the
/// corresponding parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Abort {
    pub message: String,
    pub parameters: Vec<Expression>,
}

impl Abort {
    /// Fill the placeholders with already rendered parameters.
    pub fn render(&self, parameters: &[String]) -> String {
        let mut rendered = String::with_capacity(self.message.len());
        let mut pieces = self.message.split("{}");
        if let Some(first) = pieces.next() {
            rendered.push_str(first);
        }
        for (i, piece) in pieces.enumerate() {
            match parameters.get(i) {
                Some(value) => rendered.push_str(value),
                None => rendered.push_str("{}"),
            }
            rendered.push_str(piece);
        }
        rendered
    }
}

/// One downloadable archive and what to take from it once unpacked.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleArchive {
    /// Absolute URL of the archive.
    pub remote: Url,
    /// File name as written in the manifest.
    pub file: String,
    pub sha256: String,
    pub size: u64,
    /// Evaluates to the include folder.
    pub include: Option<Box<Expression>>,
    /// Each evaluates to a library path.
    pub libs: Vec<Expression>,
    pub requires: Vec<CxxLanguageFeature>,
}

/// An archive plus the coordinates that must be added alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub archive: ModuleArchive,
    pub dependencies: BTreeSet<Coordinate>,
}

/// The decision routine for one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct FindModule {
    pub coordinate: Coordinate,
    /// The header archive file and include folder, when the manifest has one.
    pub header_archive: Option<(String, String)>,
    pub body: Expression,
}

/// Every decision routine of a build, in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionTable {
    pub find_functions: BTreeMap<Coordinate, FindModule>,
    /// Coordinates with dependencies before dependants.
    pub order: Vec<Coordinate>,
    /// Example source per coordinate, for generators that emit samples.
    pub examples: BTreeMap<Coordinate, String>,
}

impl FunctionTable {
    /// Decision routines in dependency order.
    pub fn ordered(&self) -> impl Iterator<Item = &FindModule> {
        self.order.iter().filter_map(|c| self.find_functions.get(c))
    }
}

/// Shorthand constructors used by the builder and tests.
pub mod build {
    use super::*;

    pub fn string(value: impl Into<String>) -> Expression {
        Expression::Constant(Constant::Str(value.into()))
    }

    pub fn int(value: i64) -> Expression {
        Expression::Constant(Constant::Int(value))
    }

    pub fn boolean(value: bool) -> Expression {
        Expression::Constant(Constant::Bool(value))
    }

    pub fn param(global: Global) -> Expression {
        Expression::Parameter(global)
    }

    pub fn reference(name: impl Into<String>) -> Expression {
        Expression::AssignmentReference(name.into())
    }

    pub fn assign(name: impl Into<String>, value: Expression) -> Assignment {
        Assignment {
            name: name.into(),
            value,
        }
    }

    pub fn block(assignments: Vec<Assignment>, body: Expression) -> Expression {
        Expression::AssignmentBlock(AssignmentBlock {
            assignments,
            body: Box::new(body),
        })
    }

    pub fn invoke(function: ExternalFunction, args: Vec<Expression>) -> Expression {
        Expression::Invoke { function, args }
    }

    pub fn eq(left: Expression, right: Expression) -> Expression {
        invoke(ExternalFunction::StringEquals, vec![left, right])
    }

    pub fn gte(left: Expression, right: i64) -> Expression {
        invoke(ExternalFunction::IntegerGte, vec![left, int(right)])
    }

    pub fn or(left: Expression, right: Expression) -> Expression {
        invoke(ExternalFunction::Or, vec![left, right])
    }

    pub fn starts_with(text: Expression, prefix: &str) -> Expression {
        invoke(ExternalFunction::StringStartsWith, vec![text, string(prefix)])
    }

    pub fn join(segments: Vec<Expression>) -> Expression {
        invoke(ExternalFunction::FileJoinSegments, segments)
    }

    pub fn if_switch(
        conditions: Vec<Expression>,
        branches: Vec<Expression>,
        otherwise: Expression,
    ) -> Expression {
        Expression::IfSwitch(IfSwitch {
            conditions,
            branches,
            otherwise: Box::new(otherwise),
        })
    }

    pub fn abort(message: impl Into<String>, parameters: Vec<Expression>) -> Expression {
        Expression::Abort(Abort {
            message: message.into(),
            parameters,
        })
    }

    pub fn multi(statements: Vec<Expression>) -> Expression {
        Expression::Multi(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_render() {
        let abort = Abort {
            message: "Android ABI {} is not supported for platform {}".into(),
            parameters: vec![],
        };
        assert_eq!(
            abort.render(&["mips".into(), "21".into()]),
            "Android ABI mips is not supported for platform 21"
        );
        assert_eq!(abort.render(&[]), "Android ABI {} is not supported for platform {}");
    }
}
