//! CMake generator.
//!
//! Writes `cdep-dependencies-config.cmake` with one
//! `add_cdep_{artifact}_dependency(target)` function per coordinate and an
//! `add_all_cdep_dependencies(target)` that calls them in dependency order.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::CxxLanguageFeature;
use crate::generator::script::{
    add_dependency_function_name, write_routine, Dialect, GenerateError, RenderedArchive, ScriptWriter,
};
use crate::generator::GeneratorEnvironment;
use crate::ir::{FindModule, FunctionTable, Global};
use crate::util::fs::write_string;

pub const CONFIG_FILE_NAME: &str = "cdep-dependencies-config.cmake";

const LIBRARY_FUNCTIONS: &str = r#"
function(cdep_require_minimum_cxx_compiler_standard target standard)
  get_target_property(cdep_current_standard ${target} CXX_STANDARD)
  if(NOT cdep_current_standard OR cdep_current_standard LESS ${standard})
    set_target_properties(${target} PROPERTIES CXX_STANDARD ${standard} CXX_STANDARD_REQUIRED ON)
  endif()
endfunction(cdep_require_minimum_cxx_compiler_standard)
"#;

/// Render and write the config file. Returns its path.
pub fn write(table: &FunctionTable, env: &GeneratorEnvironment) -> Result<PathBuf> {
    let path = env.modules_folder.join(CONFIG_FILE_NAME);
    let text = render(table, env).map_err(|e| anyhow::anyhow!(e.to_diagnostic().format()))?;
    info!("Generating {}", path.display());
    write_string(&path, &text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn render(table: &FunctionTable, env: &GeneratorEnvironment) -> Result<String, GenerateError> {
    let dialect = CMake { env };
    let mut out = ScriptWriter::new();
    out.line("# GENERATED FILE. DO NOT EDIT.");
    for line in LIBRARY_FUNCTIONS.lines() {
        out.line(line);
    }
    for find in table.ordered() {
        write_routine(&dialect, &mut out, find)?;
    }

    out.blank();
    out.line("function(add_all_cdep_dependencies target)");
    out.indent();
    for find in table.ordered() {
        out.line(format!("{}(${{target}})", add_dependency_function_name(&find.coordinate)));
    }
    out.dedent();
    out.line("endfunction(add_all_cdep_dependencies)");
    Ok(out.into_string())
}

struct CMake<'a> {
    env: &'a GeneratorEnvironment,
}

impl CMake<'_> {
    fn coordinate_variable(coordinate: &Coordinate) -> String {
        format!("{}_CDEP_COORDINATE", upper_identifier(coordinate))
    }
}

impl Dialect for CMake<'_> {
    fn name(&self) -> &'static str {
        "CMake"
    }

    fn global(&self, global: Global) -> String {
        match global {
            Global::TargetSystem => "${CMAKE_SYSTEM_NAME}".to_string(),
            Global::TargetPlatform => "${CMAKE_SYSTEM_VERSION}".to_string(),
            Global::CxxCompilerStandard => "${CMAKE_CXX_STANDARD}".to_string(),
            Global::NoneRuntime => "none".to_string(),
            other => format!("${{{}}}", other.name()),
        }
    }

    fn reference(&self, name: &str) -> String {
        format!("${{{}}}", name)
    }

    fn literal(&self, text: &str) -> String {
        quote_escape(text)
    }

    fn boolean(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn list(&self, items: Vec<String>) -> String {
        items.join(";")
    }

    fn join(&self, segments: Vec<String>) -> String {
        segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn equals(&self, left: &str, right: &str) -> String {
        format!("\"{}\" STREQUAL \"{}\"", left, right)
    }

    fn at_least(&self, value: &str, minimum: i64) -> String {
        format!("\"{}\" GREATER {}", value, minimum - 1)
    }

    fn starts_with(&self, value: &str, prefix: &str) -> String {
        format!("\"{}\" MATCHES \"^{}\"", value, regex_escape(prefix))
    }

    fn or(&self, left: &str, right: &str) -> String {
        format!("({}) OR ({})", left, right)
    }

    fn not(&self, operand: &str) -> String {
        format!("NOT ({})", operand)
    }

    fn only_element(&self, list: &str, element: &str) -> String {
        self.equals(list, element)
    }

    fn supports_compiler_features(&self) -> String {
        "cdep_supports_compiler_features".to_string()
    }

    fn begin_if(&self, condition: &str) -> String {
        format!("if({})", condition)
    }

    fn else_if(&self, condition: &str) -> String {
        format!("elseif({})", condition)
    }

    fn begin_else(&self) -> String {
        "else()".to_string()
    }

    fn end_if(&self) -> String {
        "endif()".to_string()
    }

    fn assign(&self, out: &mut ScriptWriter, name: &str, value: &str) {
        out.line(format!("set({} \"{}\")", name, value));
    }

    fn assign_file_name(&self, out: &mut ScriptWriter, name: &str, path: &str) -> Result<(), GenerateError> {
        out.line(format!("get_filename_component({} \"{}\" NAME)", name, path));
        Ok(())
    }

    fn assign_last_index_of(
        &self,
        out: &mut ScriptWriter,
        name: &str,
        text: &str,
        needle: &str,
    ) -> Result<(), GenerateError> {
        out.line(format!("string(FIND \"{}\" \"{}\" {} REVERSE)", text, needle, name));
        Ok(())
    }

    fn assign_substring(
        &self,
        out: &mut ScriptWriter,
        name: &str,
        text: &str,
        begin: &str,
        end: &str,
    ) -> Result<(), GenerateError> {
        // string(SUBSTRING) takes a length; -1 means the rest of the text.
        let length = format!("{}_length", name);
        out.line(format!("math(EXPR {} \"{} - {}\")", length, end, begin));
        out.line(format!("if({} LESS 0)", length));
        out.indent();
        out.line(format!("set({} -1)", length));
        out.dedent();
        out.line("endif()");
        out.line(format!("string(SUBSTRING \"{}\" {} ${{{}}} {})", text, begin, length, name));
        Ok(())
    }

    fn abort(&self, out: &mut ScriptWriter, message: &str) {
        out.line(format!("message(FATAL_ERROR \"{}\")", message.replace('"', "\\\"")));
    }

    fn module(
        &self,
        out: &mut ScriptWriter,
        find: &FindModule,
        archive: &RenderedArchive<'_>,
        dependencies: &BTreeSet<Coordinate>,
    ) {
        for dependency in dependencies {
            out.line(format!("{}(${{target}})", add_dependency_function_name(dependency)));
        }
        let coordinate = find.coordinate.to_string();
        let size = archive.size.to_string();
        let command: Vec<String> = self
            .env
            .callback(&["fetch-archive", &coordinate, archive.remote.as_str(), &size, archive.sha256])
            .into_iter()
            .map(|arg| format!("\"{}\"", quote_escape(&arg)))
            .collect();
        out.line(format!("execute_process(COMMAND {})", command.join(" ")));
        if let Some(include) = &archive.include {
            out.line(format!("target_include_directories(${{target}} PRIVATE \"{}\")", include));
        }
        for lib in &archive.libs {
            out.line(format!("target_link_libraries(${{target}} \"{}\")", lib));
        }
    }

    fn requires_features(&self, out: &mut ScriptWriter, _find: &FindModule, features: &[CxxLanguageFeature]) {
        let names: Vec<&str> = features.iter().map(|f| f.as_str()).collect();
        out.line(format!("target_compile_features(${{target}} PRIVATE {})", names.join(" ")));
    }

    fn requires_standard(&self, out: &mut ScriptWriter, _find: &FindModule, standard: i64) {
        out.line(format!(
            "cdep_require_minimum_cxx_compiler_standard(${{target}} {})",
            standard
        ));
    }

    fn begin_routine(&self, out: &mut ScriptWriter, find: &FindModule) {
        let coordinate = &find.coordinate;
        let variable = Self::coordinate_variable(coordinate);
        out.blank();
        out.line("###");
        out.line(format!("### Add dependency for CDep module: {}", coordinate));
        out.line("###");
        out.line(format!("if({})", variable));
        out.line(format!(
            "  message(FATAL_ERROR \"CDep module '${{{}}}' was already defined\")",
            variable
        ));
        out.line(format!("endif({})", variable));
        out.line(format!("set({} \"{}\")", variable, coordinate));
        if let Some((file, include)) = &find.header_archive {
            out.line(format!(
                "set({}_ROOT \"{}/{}/{}/{}/{}/{}\")",
                upper_identifier(coordinate),
                self.env.exploded_root(),
                coordinate.group_id,
                coordinate.artifact_id,
                coordinate.version,
                file,
                include
            ));
        }

        let function = add_dependency_function_name(coordinate);
        out.line(format!("function({} target)", function));
        out.indent();
        out.line("# Choose between Android NDK Toolchain and CMake Android Toolchain");
        out.line("set(cdep_supports_compiler_features TRUE)");
        out.line("if(DEFINED CMAKE_ANDROID_STL_TYPE)");
        out.line("  set(cdep_determined_android_runtime ${CMAKE_ANDROID_STL_TYPE})");
        out.line("  set(cdep_determined_android_abi ${CMAKE_ANDROID_ARCH_ABI})");
        out.line("else()");
        out.line("  set(cdep_determined_android_runtime ${ANDROID_STL})");
        out.line("  set(cdep_determined_android_abi ${ANDROID_ABI})");
        out.line("  set(cdep_supports_compiler_features FALSE)");
        out.line("endif()");
        out.blank();
        out.line(format!("set({} \"{}\")", Global::ExplodedRoot.name(), self.env.exploded_root()));
    }

    fn end_routine(&self, out: &mut ScriptWriter, find: &FindModule) {
        out.dedent();
        out.line(format!("endfunction({})", add_dependency_function_name(&find.coordinate)));
    }
}

fn upper_identifier(coordinate: &Coordinate) -> String {
    coordinate.artifact_identifier().to_uppercase()
}

fn quote_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn regex_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if ".+*?[]^$()|\\".contains(c) {
            escaped.push_str("\\\\");
        }
        escaped.push(c);
    }
    escaped
}
