//! ndk-build generator.
//!
//! Writes `ndk-build/cdep-dependencies.mk`. Each coordinate becomes a
//! `define add_cdep_{artifact}_dependency` block that is `$(eval)`ed in
//! dependency order, so a routine can read the variables its dependencies
//! set. Inside a define every reference is written `$$(...)` to survive
//! `$(call)` and expand at `$(eval)` time.
//!
//! A consuming `Android.mk` includes the file and then uses
//! `$(cdep_all_modules)` and `$(cdep_all_includes)`.

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
use crate::ir::{ExternalFunction, FindModule, FunctionTable, Global};
use crate::util::fs::write_string;

pub const DEPENDENCIES_FILE_NAME: &str = "cdep-dependencies.mk";

/// Render and write the makefile fragment. Returns its path.
pub fn write(table: &FunctionTable, env: &GeneratorEnvironment) -> Result<PathBuf> {
    let path = env.modules_folder.join("ndk-build").join(DEPENDENCIES_FILE_NAME);
    let text = render(table, env).map_err(|e| anyhow::anyhow!(e.to_diagnostic().format()))?;
    info!("Generating {}", path.display());
    write_string(&path, &text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn render(table: &FunctionTable, env: &GeneratorEnvironment) -> Result<String, GenerateError> {
    let dialect = NdkBuild { env };
    let mut out = ScriptWriter::new();
    out.line("# GENERATED FILE. DO NOT EDIT.");
    out.line(format!("{} := {}", Global::ExplodedRoot.name(), env.exploded_root()));
    out.line(format!("{} := Android", Global::TargetSystem.name()));
    out.line(format!(
        "{} = $(patsubst android-%,%,$(TARGET_PLATFORM))",
        Global::TargetPlatform.name()
    ));
    out.line(format!("{} = $(TARGET_ARCH_ABI)", Global::AndroidAbi.name()));
    out.line(format!(
        "{} = $(if $(APP_STL),$(APP_STL),none)",
        Global::AndroidRuntime.name()
    ));
    out.line("cdep_all_modules :=");
    out.line("cdep_all_includes :=");

    for find in table.ordered() {
        write_routine(&dialect, &mut out, find)?;
    }

    out.blank();
    for find in table.ordered() {
        out.line(format!(
            "$(eval $(call {}))",
            add_dependency_function_name(&find.coordinate)
        ));
    }
    Ok(out.into_string())
}

struct NdkBuild<'a> {
    env: &'a GeneratorEnvironment,
}

/// `cdep_{artifact}_{suffix}`, one of the per-coordinate variables a
/// routine sets: `includes`, `modules` or `cppflags`.
pub(crate) fn variable(coordinate: &Coordinate, suffix: &str) -> String {
    format!("cdep_{}_{}", coordinate.artifact_identifier(), suffix)
}

fn module_name(coordinate: &Coordinate) -> String {
    format!("cdep_{}", coordinate.artifact_identifier())
}

/// A reference that expands at `$(eval)` time.
fn deferred(name: &str) -> String {
    format!("$$({})", name)
}

impl Dialect for NdkBuild<'_> {
    fn name(&self) -> &'static str {
        "ndk-build"
    }

    fn target_systems(&self) -> Option<&'static [&'static str]> {
        Some(&["Android"])
    }

    fn global(&self, global: Global) -> String {
        match global {
            Global::NoneRuntime => "none".to_string(),
            other => deferred(other.name()),
        }
    }

    fn reference(&self, name: &str) -> String {
        deferred(name)
    }

    fn literal(&self, text: &str) -> String {
        text.replace('$', "$$$$")
    }

    fn boolean(&self, value: bool) -> String {
        if value { "true" } else { "" }.to_string()
    }

    fn list(&self, items: Vec<String>) -> String {
        items.join(" ")
    }

    fn join(&self, segments: Vec<String>) -> String {
        segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn equals(&self, left: &str, right: &str) -> String {
        // findstring finds nothing in an empty string, so two empty sides
        // need their own case.
        format!(
            "$$(if $$(strip {0}{1}),$$(and $$(findstring {0},{1}),$$(findstring {1},{0})),true)",
            left, right
        )
    }

    fn at_least(&self, value: &str, minimum: i64) -> String {
        format!("$$(shell test \"{}\" -ge {} 2>/dev/null && echo true)", value, minimum)
    }

    fn starts_with(&self, value: &str, prefix: &str) -> String {
        format!("$$(filter {}%,{})", prefix, value)
    }

    fn or(&self, left: &str, right: &str) -> String {
        format!("$$(or {},{})", left, right)
    }

    fn not(&self, operand: &str) -> String {
        format!("$$(if {},,true)", operand)
    }

    fn only_element(&self, list: &str, element: &str) -> String {
        format!(
            "$$(and $$(filter {1},{0}),$$(if $$(word 2,{0}),,true))",
            list, element
        )
    }

    fn supports_compiler_features(&self) -> String {
        String::new()
    }

    fn begin_if(&self, condition: &str) -> String {
        format!("ifneq ({},)", condition)
    }

    fn else_if(&self, condition: &str) -> String {
        format!("else ifneq ({},)", condition)
    }

    fn begin_else(&self) -> String {
        "else".to_string()
    }

    fn end_if(&self) -> String {
        "endif".to_string()
    }

    fn assign(&self, out: &mut ScriptWriter, name: &str, value: &str) {
        out.line(format!("{} := {}", name, value));
    }

    fn assign_file_name(&self, out: &mut ScriptWriter, name: &str, path: &str) -> Result<(), GenerateError> {
        out.line(format!("{} := $$(notdir {})", name, path));
        Ok(())
    }

    fn assign_last_index_of(
        &self,
        _out: &mut ScriptWriter,
        _name: &str,
        _text: &str,
        _needle: &str,
    ) -> Result<(), GenerateError> {
        Err(GenerateError::Unsupported {
            dialect: self.name(),
            function: ExternalFunction::StringLastIndexOf,
        })
    }

    fn assign_substring(
        &self,
        _out: &mut ScriptWriter,
        _name: &str,
        _text: &str,
        _begin: &str,
        _end: &str,
    ) -> Result<(), GenerateError> {
        Err(GenerateError::Unsupported {
            dialect: self.name(),
            function: ExternalFunction::StringSubstring,
        })
    }

    fn abort(&self, out: &mut ScriptWriter, message: &str) {
        out.line(format!("$$(error {})", message));
    }

    fn module(
        &self,
        out: &mut ScriptWriter,
        find: &FindModule,
        archive: &RenderedArchive<'_>,
        dependencies: &BTreeSet<Coordinate>,
    ) {
        let coordinate = &find.coordinate;
        let size = archive.size.to_string();
        let text = coordinate.to_string();
        let command: Vec<String> = self
            .env
            .callback(&["fetch-archive", &text, archive.remote.as_str(), &size, archive.sha256])
            .into_iter()
            .map(|arg| format!("\"{}\"", arg))
            .collect();
        out.line(format!(
            "{} := $$(shell {})",
            variable(coordinate, "fetch"),
            command.join(" ")
        ));

        let includes = variable(coordinate, "includes");
        if let Some(include) = &archive.include {
            out.line(format!("{} += {}", includes, include));
            out.line(format!("cdep_all_includes += {}", include));
        }

        let modules = variable(coordinate, "modules");
        for (i, lib) in archive.libs.iter().enumerate() {
            let name = match i {
                0 => module_name(coordinate),
                n => format!("{}_{}", module_name(coordinate), n),
            };
            out.line("include $$(CLEAR_VARS)");
            out.line(format!("LOCAL_MODULE := {}", name));
            out.line(format!("LOCAL_SRC_FILES := {}", lib));
            out.line(format!("LOCAL_EXPORT_C_INCLUDES := {}", deferred(&includes)));
            for dependency in dependencies {
                out.line(format!(
                    "LOCAL_EXPORT_C_INCLUDES += {}",
                    deferred(&variable(dependency, "includes"))
                ));
            }
            out.line(format!(
                "LOCAL_EXPORT_CPPFLAGS := {}",
                deferred(&variable(coordinate, "cppflags"))
            ));
            if !dependencies.is_empty() {
                let libraries: Vec<String> = dependencies
                    .iter()
                    .map(|d| deferred(&variable(d, "modules")))
                    .collect();
                out.line(format!("LOCAL_STATIC_LIBRARIES := {}", libraries.join(" ")));
            }
            out.line("include $$(PREBUILT_STATIC_LIBRARY)");
            out.line(format!("{} += {}", modules, name));
            out.line(format!("cdep_all_modules += {}", name));
        }
    }

    fn requires_features(&self, _out: &mut ScriptWriter, _find: &FindModule, _features: &[CxxLanguageFeature]) {
        // ndk-build has no feature-level compiler requirements; the standard
        // fallback is always taken.
    }

    fn requires_standard(&self, out: &mut ScriptWriter, find: &FindModule, standard: i64) {
        out.line(format!(
            "{} += -std=c++{}",
            variable(&find.coordinate, "cppflags"),
            standard
        ));
    }

    fn begin_routine(&self, out: &mut ScriptWriter, find: &FindModule) {
        let coordinate = &find.coordinate;
        out.blank();
        out.line(format!("# {}", coordinate));
        out.line(format!("define {}", add_dependency_function_name(coordinate)));
        out.indent();
        for suffix in ["includes", "modules", "cppflags"] {
            out.line(format!("{} :=", variable(coordinate, suffix)));
        }
    }

    fn end_routine(&self, out: &mut ScriptWriter, _find: &FindModule) {
        out.dedent();
        out.line("endef");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;
    use crate::ir::interpreter::{Interpreter, Value};
    use crate::ir::FunctionTableBuilder;
    use crate::resolver::{FetchedManifest, ResolvedManifest};
    use crate::test_support::fixtures;
    use crate::test_support::scripts::{
        android_cases, assert_agrees, expected_outcome, find_tool, script_outcome, BuildEnvironment, Case,
        EXPLODED_ROOT,
    };
    use crate::util::error_scope::ErrorScope;
    use std::fs;
    use std::path::Path;
    use std::process::{Command, Output};
    use tempfile::TempDir;

    fn env() -> GeneratorEnvironment {
        GeneratorEnvironment::new(Path::new("/work"), Path::new("/exploded"), Path::new("/bin/cdep"))
    }

    fn table_of(manifests: Vec<ResolvedManifest>) -> FunctionTable {
        let mut builder = FunctionTableBuilder::new();
        for resolved in manifests {
            builder.add_manifest(resolved);
        }
        builder.build(&mut ErrorScope::new()).unwrap()
    }

    fn table(yamls: &[&str]) -> FunctionTable {
        table_of(yamls.iter().map(|y| fixtures::resolved_from_yaml(y)).collect())
    }

    fn fetched_after<'a>(text: &'a str, marker: &str) -> &'a str {
        text.lines()
            .skip_while(|line| !line.contains(marker))
            .find(|line| line.contains("fetch-archive"))
            .unwrap()
    }

    fn assert_matches_interpreter(table: &FunctionTable) {
        let text = render(table, &env()).unwrap();
        let coordinate = Coordinate::new("com.example", "lib", "1.0.0");
        for abi in ["armeabi-v7a", "arm64-v8a"] {
            let value = Interpreter::new()
                .with_str(Global::TargetSystem, "Android")
                .with(Global::TargetPlatform, Value::Int(21))
                .with_str(Global::AndroidAbi, abi)
                .with_str(Global::AndroidRuntime, "c++_shared")
                .with_str(Global::ExplodedRoot, "/exploded")
                .find_module(table, &coordinate)
                .unwrap();
            let url = value.archives()[0].remote.to_string();
            let marker = format!("$$(findstring $$(cdep_determined_android_abi),{})", abi);
            assert!(fetched_after(&text, &marker).contains(&url), "{} -> {}", abi, url);
        }
    }

    #[test]
    fn test_selects_same_archive_as_interpreter() {
        assert_matches_interpreter(&table(&[fixtures::ANDROID_MANIFEST]));
    }

    #[test]
    fn test_selection_ignores_declaration_order() {
        let mut manifest = Manifest::from_yaml_str(fixtures::ANDROID_MANIFEST).unwrap();
        if let Some(android) = &mut manifest.android {
            android.archives.reverse();
        }
        let resolved = ResolvedManifest::new(
            fixtures::repository_url(&manifest.coordinate),
            FetchedManifest {
                manifest,
                sha256: "reversed".to_string(),
            },
        );
        assert_matches_interpreter(&table_of(vec![resolved]));
    }

    #[test]
    fn test_file_shape() {
        let text = render(&table(&[fixtures::ANDROID_MANIFEST]), &env()).unwrap();
        assert!(text.starts_with("# GENERATED FILE. DO NOT EDIT.\ncdep_exploded_root := /exploded\n"));
        assert!(text.contains("define add_cdep_lib_dependency\n"));
        assert!(text.contains("\nendef\n"));
        assert!(text.ends_with("$(eval $(call add_cdep_lib_dependency))\n"));
        assert!(text.contains("LOCAL_MODULE := cdep_lib\n"));
        assert!(text.contains(
            "LOCAL_SRC_FILES := $$(exploded_archive_folder)/lib-arm64-v8a.zip/lib/arm64-v8a/liblib.a"
        ));
    }

    #[test]
    fn test_other_systems_are_pruned() {
        let text = render(&table(&[fixtures::IOS_MANIFEST]), &env()).unwrap();
        assert!(!text.contains("osx_sysroot_sdk_name"));
        assert!(text.contains("$$(error Target platform $$(build_system_target_system) is not supported by com.example:ios:1.0.0. Supported: Darwin)"));
    }

    #[test]
    fn test_header_requirements_fall_back_to_standard() {
        let text = render(&table(&[fixtures::HEADER_ONLY_MANIFEST]), &env()).unwrap();
        assert!(text.contains("cdep_headers_cppflags += -std=c++14"));
        assert!(text.contains("cdep_headers_includes += $$(exploded_archive_folder)/headers.zip/include"));
        assert!(!text.contains("PREBUILT_STATIC_LIBRARY"));
    }

    #[test]
    fn test_dependant_links_dependency_modules() {
        let app = fixtures::manifest_yaml("com.example:app:1.0.0", &["com.example:base:1.0.0"]);
        let base = fixtures::manifest_yaml("com.example:base:1.0.0", &[]);
        let mut yaml = fixtures::ANDROID_MANIFEST.replace("artifactId: lib", "artifactId: app");
        yaml.push_str(&app[app.find("dependencies:").unwrap()..app.find("linux:").unwrap()]);
        let base = base.replace(
            "linux:\n  archives:\n    - file: base.tar.gz",
            "android:\n  archives:\n    - file: base.zip\n      abi: x86",
        );
        let text = render(&table(&[&yaml, &base]), &env()).unwrap();
        assert!(text.contains("LOCAL_STATIC_LIBRARIES := $$(cdep_base_modules)"));
        let base_eval = text.find("$(eval $(call add_cdep_base_dependency))").unwrap();
        let app_eval = text.find("$(eval $(call add_cdep_app_dependency))").unwrap();
        assert!(base_eval < app_eval);
    }

    /// Include the fragment from a makefile that plays the part of
    /// ndk-build, then print what the routines added.
    fn run_make(make: &Path, dir: &Path, fragment: &Path, case: &Case) -> Output {
        let BuildEnvironment::Android {
            platform,
            abi,
            runtime,
        } = &case.env
        else {
            panic!("{} is not an Android build", case.name);
        };
        let stl = if *runtime == "none" { "" } else { *runtime };
        let empty = dir.join("empty.mk");
        fs::write(&empty, "").unwrap();
        let driver = dir.join("driver.mk");
        fs::write(
            &driver,
            format!(
                "CLEAR_VARS := {empty}\n\
                 PREBUILT_STATIC_LIBRARY := {empty}\n\
                 TARGET_PLATFORM := android-{platform}\n\
                 TARGET_ARCH_ABI := {abi}\n\
                 APP_STL := {stl}\n\
                 include {fragment}\n\
                 $(info cdep-selected: $(cdep_all_includes))\n\
                 all: ;\n",
                empty = empty.display(),
                fragment = fragment.display(),
            ),
        )
        .unwrap();
        Command::new(make)
            .arg("-s")
            .arg("-f")
            .arg(&driver)
            .current_dir(dir)
            .output()
            .unwrap()
    }

    #[test]
    fn test_make_agrees_with_interpreter() {
        let Some(make) = find_tool("make") else {
            return;
        };
        for case in android_cases() {
            let tmp = TempDir::new().unwrap();
            let table = case.table();
            let env = GeneratorEnvironment::new(tmp.path(), Path::new(EXPLODED_ROOT), Path::new("true"));
            let fragment = write(&table, &env).unwrap();

            let output = run_make(&make, tmp.path(), &fragment, &case);
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            assert_agrees(
                case.name,
                &expected_outcome(&table, &case.env),
                &script_outcome(&table, &output, &stdout),
            );
        }
    }

    #[test]
    fn test_empty_operands_compare_equal() {
        let dialect = NdkBuild { env: &env() };
        assert_eq!(
            dialect.equals("$$(x)", ""),
            "$$(if $$(strip $$(x)),$$(and $$(findstring $$(x),),$$(findstring ,$$(x))),true)"
        );

        let Some(make) = find_tool("make") else {
            return;
        };
        let tmp = TempDir::new().unwrap();
        let cases = [
            ("", "", "true"),
            ("a", "a", "a"),
            ("a", "", ""),
            ("", "a", ""),
            ("c++_shared", "c++_static", ""),
            ("arm64", "arm64-v8a", ""),
        ];
        let mut makefile = String::from("define check\n");
        for (i, (left, right, _)) in cases.iter().enumerate() {
            makefile.push_str(&format!("result_{} := {}\n", i, dialect.equals(left, right)));
        }
        makefile.push_str("endef\n$(eval $(check))\n");
        for i in 0..cases.len() {
            makefile.push_str(&format!("$(info result_{0}=[$(result_{0})])\n", i));
        }
        makefile.push_str("all: ;\n");
        let path = tmp.path().join("equals.mk");
        fs::write(&path, makefile).unwrap();

        let output = Command::new(make).arg("-s").arg("-f").arg(&path).output().unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        for (i, (left, right, expected)) in cases.iter().enumerate() {
            let line = format!("result_{}=[{}]", i, expected);
            assert!(stdout.contains(&line), "'{}' = '{}' printed {}", left, right, stdout);
        }
    }
}
