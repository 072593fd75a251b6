//! Verifies that every file a routine can name exists on disk.
//!
//! Runs after archives are downloaded and unpacked. Every branch of every
//! switch is visited, not only the one a particular environment would take,
//! so a package that is missing a library for an ABI nobody builds today is
//! still caught.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use url::Url;

use crate::ir::interpreter::{Bindings, Interpreter, SelectedArchive};
use crate::ir::{Expression, FunctionTable, Global, ModuleArchive};
use crate::util::error_scope::ErrorScope;

/// Check every include folder and library of `table` under `exploded_root`.
pub fn check_local_file_system_integrity(
    table: &FunctionTable,
    exploded_root: &Path,
    errors: &mut ErrorScope,
) {
    let interpreter =
        Interpreter::new().with_str(Global::ExplodedRoot, &exploded_root.to_string_lossy());
    let mut checked = HashSet::new();
    for find in table.ordered() {
        let mut walker = Walker {
            interpreter: &interpreter,
            bindings: Bindings::new(),
            checked: &mut checked,
            errors,
        };
        walker.walk(&find.body);
    }
}

struct Walker<'a> {
    interpreter: &'a Interpreter,
    bindings: Bindings,
    /// Paths already checked, per archive. Several branches (the Android
    /// `none` runtime and `c++`, for example) can select the same archive.
    checked: &'a mut HashSet<(Url, PathBuf)>,
    errors: &'a mut ErrorScope,
}

impl Walker<'_> {
    fn walk(&mut self, expression: &Expression) {
        match expression {
            Expression::AssignmentBlock(block) => {
                let depth = self.bindings.depth();
                for assignment in &block.assignments {
                    // Bindings over environment globals cannot be evaluated
                    // here; paths never depend on them.
                    if let Ok(value) = self.interpreter.evaluate(&assignment.value, &mut self.bindings) {
                        self.bindings.push(&assignment.name, value);
                    }
                }
                self.walk(&block.body);
                self.bindings.truncate(depth);
            }
            Expression::IfSwitch(switch) => {
                switch.branches.iter().for_each(|branch| self.walk(branch));
                self.walk(&switch.otherwise);
            }
            Expression::Multi(statements) => statements.iter().for_each(|s| self.walk(s)),
            Expression::ModuleArchive(archive) => self.check_archive(archive),
            Expression::Module(module) => self.check_archive(&module.archive),
            _ => {}
        }
    }

    fn check_archive(&mut self, archive: &ModuleArchive) {
        match self.interpreter.select_archive(archive, &mut self.bindings) {
            Ok(selected) => self.check_selected(&selected),
            Err(e) => self
                .errors
                .fail(format!("Could not compute paths for '{}': {}", archive.remote, e)),
        }
    }

    /// Whether `path` of `archive` still needs checking. Marks it checked.
    fn first_visit(&mut self, archive: &SelectedArchive, path: &Path) -> bool {
        self.checked.insert((archive.remote.clone(), path.to_path_buf()))
    }

    fn check_selected(&mut self, archive: &SelectedArchive) {
        if let Some(include) = &archive.include {
            if self.first_visit(archive, include) && self.check_parent(archive, include) {
                self.errors.require(include.is_dir(), || {
                    format!(
                        "Downloaded '{}' did not contain include folder '{}' at its root.\nLocal path: {}\n If you own this package you can add \"include:\" to the archive entry in cdep-manifest.yml to indicate that there is no include folder.",
                        archive.remote,
                        file_name(include),
                        include.display()
                    )
                });
            }
        }
        for lib in &archive.libs {
            if !self.first_visit(archive, lib) || !self.check_parent(archive, lib) {
                continue;
            }
            self.errors.require(lib.is_file(), || {
                let folder = lib.parent().map(file_name).unwrap_or_default();
                format!(
                    "Downloaded '{}' did not contain library '{}/{}' at its root.\nLocal path: {}",
                    archive.remote,
                    folder,
                    file_name(lib),
                    lib.display()
                )
            });
        }
    }

    /// Whether the folder holding `path` exists. A missing folder is
    /// reported once.
    fn check_parent(&mut self, archive: &SelectedArchive, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return true;
        };
        if parent.is_dir() {
            return true;
        }
        if self.first_visit(archive, parent) {
            self.errors.fail(format!(
                "Expected '{}' folder to be created but it wasn't.",
                parent.display()
            ));
        }
        false
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
