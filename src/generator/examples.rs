//! CMake example projects.
//!
//! For every coordinate whose manifest carries an `example`, writes a small
//! project that builds the example source as a shared library linked
//! against the package. A root `CMakeLists.txt` adds them all.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::core::coordinate::Coordinate;
use crate::generator::cmake::CONFIG_FILE_NAME;
use crate::generator::script::add_dependency_function_name;
use crate::generator::GeneratorEnvironment;
use crate::ir::FunctionTable;
use crate::util::fs::{to_script_path, write_string};

const CMAKE_MINIMUM: &str = "cmake_minimum_required(VERSION 3.0.2)";

/// Write every example project. Returns the files written.
pub fn write(table: &FunctionTable, env: &GeneratorEnvironment) -> Result<Vec<PathBuf>> {
    let root = env.examples_folder.join("cmake");
    let config = env.modules_folder.join(CONFIG_FILE_NAME);
    let mut written = Vec::new();
    let mut root_lists = format!("{}\n", CMAKE_MINIMUM);

    for (coordinate, source) in &table.examples {
        let folder = example_folder(&root, coordinate);
        let artifact = coordinate.artifact_identifier();
        let source_name = format!("{}.cpp", artifact);

        let source_path = folder.join(&source_name);
        info!("Generating {}", source_path.display());
        write_file(&source_path, source)?;
        written.push(source_path);

        let lists_path = folder.join("CMakeLists.txt");
        info!("Generating {}", lists_path.display());
        write_file(&lists_path, &project_lists(coordinate, &source_name, &config))?;
        written.push(lists_path);

        root_lists.push_str(&format!("add_subdirectory(\"{}\")\n", to_script_path(&folder)));
    }

    let root_path = root.join("CMakeLists.txt");
    info!("Generating {}", root_path.display());
    write_file(&root_path, &root_lists)?;
    written.push(root_path);
    Ok(written)
}

fn example_folder(root: &Path, coordinate: &Coordinate) -> PathBuf {
    root.join(&coordinate.group_id)
        .join(&coordinate.artifact_id)
        .join(coordinate.version.as_str())
}

fn project_lists(coordinate: &Coordinate, source_name: &str, config: &Path) -> String {
    let artifact = coordinate.artifact_identifier();
    format!(
        "{minimum}\nproject({artifact}_example_project)\ninclude(\"{config}\")\nadd_library({artifact}_target SHARED {source})\n{add}({artifact}_target)\n",
        minimum = CMAKE_MINIMUM,
        artifact = artifact,
        config = to_script_path(config),
        source = source_name,
        add = add_dependency_function_name(coordinate),
    )
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    write_string(path, text).with_context(|| format!("failed to write {}", path.display()))
}
