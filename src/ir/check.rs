//! Checks over a finished [`FunctionTable`].

use std::collections::{BTreeMap, BTreeSet};

use crate::core::coordinate::Coordinate;
use crate::ir::builder::{module_dependencies, BuildError};
use crate::ir::{Expression, FunctionTable, ModuleArchive};
use crate::util::error_scope::ErrorScope;

/// Call `f` on `expression` and every expression below it, parents first.
pub fn visit<'a>(expression: &'a Expression, f: &mut dyn FnMut(&'a Expression)) {
    f(expression);
    match expression {
        Expression::Array(items) | Expression::Multi(items) => {
            items.iter().for_each(|item| visit(item, f));
        }
        Expression::Invoke { args, .. } => args.iter().for_each(|arg| visit(arg, f)),
        Expression::IfSwitch(switch) => {
            switch.conditions.iter().for_each(|c| visit(c, f));
            switch.branches.iter().for_each(|b| visit(b, f));
            visit(&switch.otherwise, f);
        }
        Expression::Abort(abort) => abort.parameters.iter().for_each(|p| visit(p, f)),
        Expression::AssignmentBlock(block) => {
            block.assignments.iter().for_each(|a| visit(&a.value, f));
            visit(&block.body, f);
        }
        Expression::ModuleArchive(archive) => visit_archive(archive, f),
        Expression::Module(module) => visit_archive(&module.archive, f),
        Expression::Constant(_)
        | Expression::Parameter(_)
        | Expression::AssignmentReference(_)
        | Expression::Nop => {}
    }
}

fn visit_archive<'a>(archive: &'a ModuleArchive, f: &mut dyn FnMut(&'a Expression)) {
    if let Some(include) = &archive.include {
        visit(include, f);
    }
    archive.libs.iter().for_each(|lib| visit(lib, f));
}

/// Every archive reachable in `expression`, across all branches.
pub fn archives(expression: &Expression) -> Vec<&ModuleArchive> {
    let mut found = Vec::new();
    visit(expression, &mut |e| match e {
        Expression::ModuleArchive(archive) => found.push(archive),
        Expression::Module(module) => found.push(&module.archive),
        _ => {}
    });
    found
}

/// Every assignment reference must be bound by an enclosing block, every
/// builtin must be called with its arity, and every switch condition must
/// have a branch.
pub fn check_references(table: &FunctionTable) -> Result<(), BuildError> {
    for (coordinate, find) in &table.find_functions {
        let mut bound = Vec::new();
        check_scoped(coordinate, &find.body, &mut bound)?;
    }
    Ok(())
}

fn check_scoped<'a>(
    coordinate: &Coordinate,
    expression: &'a Expression,
    bound: &mut Vec<&'a str>,
) -> Result<(), BuildError> {
    match expression {
        Expression::AssignmentReference(name) => {
            if !bound.iter().any(|b| b == name) {
                return Err(BuildError::UnboundReference {
                    coordinate: coordinate.clone(),
                    name: name.clone(),
                });
            }
            Ok(())
        }
        Expression::AssignmentBlock(block) => {
            let depth = bound.len();
            for assignment in &block.assignments {
                check_scoped(coordinate, &assignment.value, bound)?;
                bound.push(&assignment.name);
            }
            let result = check_scoped(coordinate, &block.body, bound);
            bound.truncate(depth);
            result
        }
        Expression::Invoke { function, args } => {
            if let Some(arity) = function.arity() {
                if args.len() != arity {
                    return Err(BuildError::Arity {
                        coordinate: coordinate.clone(),
                        function: *function,
                        actual: args.len(),
                    });
                }
            }
            args.iter()
                .try_for_each(|arg| check_scoped(coordinate, arg, bound))
        }
        Expression::Array(items) | Expression::Multi(items) => items
            .iter()
            .try_for_each(|item| check_scoped(coordinate, item, bound)),
        Expression::IfSwitch(switch) => {
            if switch.conditions.len() != switch.branches.len() {
                return Err(BuildError::UnpairedSwitch {
                    coordinate: coordinate.clone(),
                    conditions: switch.conditions.len(),
                    branches: switch.branches.len(),
                });
            }
            for e in switch.conditions.iter().chain(&switch.branches) {
                check_scoped(coordinate, e, bound)?;
            }
            check_scoped(coordinate, &switch.otherwise, bound)
        }
        Expression::Abort(abort) => abort
            .parameters
            .iter()
            .try_for_each(|p| check_scoped(coordinate, p, bound)),
        Expression::ModuleArchive(archive) => check_archive(coordinate, archive, bound),
        Expression::Module(module) => check_archive(coordinate, &module.archive, bound),
        Expression::Constant(_) | Expression::Parameter(_) | Expression::Nop => Ok(()),
    }
}

fn check_archive<'a>(
    coordinate: &Coordinate,
    archive: &'a ModuleArchive,
    bound: &mut Vec<&'a str>,
) -> Result<(), BuildError> {
    if let Some(include) = &archive.include {
        check_scoped(coordinate, include, bound)?;
    }
    archive
        .libs
        .iter()
        .try_for_each(|lib| check_scoped(coordinate, lib, bound))
}

/// Every dependency must have a routine, and a dependant must not ship an
/// archive its dependency already ships.
pub fn check_consistency(table: &FunctionTable, errors: &mut ErrorScope) {
    let archives_by_coordinate: BTreeMap<&Coordinate, Vec<&ModuleArchive>> = table
        .find_functions
        .iter()
        .map(|(coordinate, find)| (coordinate, archives(&find.body)))
        .collect();

    for (dependant, find) in &table.find_functions {
        let own: BTreeSet<&str> = archives_by_coordinate
            .get(dependant)
            .into_iter()
            .flatten()
            .map(|a| a.sha256.as_str())
            .collect();
        for dependee in module_dependencies(&find.body) {
            let Some(dependee_archives) = archives_by_coordinate.get(&dependee) else {
                errors.fail(format!(
                    "Reference {} was not found, needed by {}",
                    dependee, dependant
                ));
                continue;
            };
            for archive in dependee_archives {
                if own.contains(archive.sha256.as_str()) {
                    let digest: String = archive.sha256.chars().take(7).collect();
                    errors.fail(format!(
                        "Package '{}' depends on '{}' but both packages contain a file '{}' with the same SHA256. The file should only be in the lowest level package '{}' (sha256:{})",
                        dependant, dependee, archive.file, dependee, digest
                    ));
                }
            }
        }
    }
}
