//! ndk-build example projects.
//!
//! The ndk-build counterpart of the CMake examples: each example source
//! becomes a shared library module linked against its package, and a root
//! `jni/` folder ties them to the generated `cdep-dependencies.mk`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::core::coordinate::Coordinate;
use crate::generator::ndk_build::{variable, DEPENDENCIES_FILE_NAME};
use crate::generator::GeneratorEnvironment;
use crate::ir::FunctionTable;
use crate::util::fs::{to_script_path, write_string};

const APPLICATION_MK: &str = "APP_ABI := x86_64 x86 armeabi-v7a arm64-v8a
APP_PLATFORM := android-21
APP_STL := c++_static
APP_CPPFLAGS := -frtti -fexceptions
";

/// Write every example project plus the root `jni/Android.mk` and
/// `jni/Application.mk`. Returns the files written.
pub fn write(table: &FunctionTable, env: &GeneratorEnvironment) -> Result<Vec<PathBuf>> {
    let root = env.examples_folder.join("ndk-build");
    let fragment = env.modules_folder.join("ndk-build").join(DEPENDENCIES_FILE_NAME);
    let mut written = Vec::new();
    let mut root_mk = format!("include {}\n", to_script_path(&fragment));

    // Dependency order, so a dependant's module follows the ones it links.
    for coordinate in &table.order {
        let Some(source) = table.examples.get(coordinate) else {
            continue;
        };
        let folder = root
            .join(&coordinate.group_id)
            .join(&coordinate.artifact_id)
            .join(coordinate.version.as_str());
        let source_name = format!("{}.cpp", coordinate.artifact_identifier());

        let source_path = folder.join(&source_name);
        info!("Generating {}", source_path.display());
        write_file(&source_path, source)?;
        written.push(source_path);

        let android_mk = folder.join("Android.mk");
        info!("Generating {}", android_mk.display());
        write_file(&android_mk, &module_mk(coordinate, &source_name))?;
        root_mk.push_str(&format!("include {}\n", to_script_path(&android_mk)));
        written.push(android_mk);
    }

    let jni = root.join("jni");
    let root_path = jni.join("Android.mk");
    info!("Generating {}", root_path.display());
    write_file(&root_path, &root_mk)?;
    written.push(root_path);

    let application_path = jni.join("Application.mk");
    info!("Generating {}", application_path.display());
    write_file(&application_path, APPLICATION_MK)?;
    written.push(application_path);
    Ok(written)
}

fn module_mk(coordinate: &Coordinate, source_name: &str) -> String {
    let artifact = coordinate.artifact_identifier();
    let mut mk = String::new();
    mk.push_str("LOCAL_PATH := $(call my-dir)\n");
    mk.push_str("include $(CLEAR_VARS)\n");
    mk.push_str(&format!("LOCAL_MODULE := hello-{}\n", artifact));
    mk.push_str(&format!("LOCAL_SRC_FILES += {}\n", source_name));
    // Header-only packages have no prebuilt module to export their includes.
    mk.push_str(&format!("LOCAL_C_INCLUDES += $({})\n", variable(coordinate, "includes")));
    mk.push_str(&format!("LOCAL_CPPFLAGS += $({})\n", variable(coordinate, "cppflags")));
    mk.push_str(&format!("LOCAL_STATIC_LIBRARIES += $({})\n", variable(coordinate, "modules")));
    mk.push_str("LOCAL_LDLIBS += -llog -ldl -lz -lm -latomic -lGLESv1_CM -lGLESv2 -landroid\n");
    mk.push_str("include $(BUILD_SHARED_LIBRARY)\n");
    mk
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    write_string(path, text).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionTableBuilder;
    use crate::test_support::fixtures;
    use crate::util::error_scope::ErrorScope;
    use std::fs;
    use tempfile::TempDir;

    fn with_example(yaml: &str) -> String {
        format!("{}example: |\n  #include <lib.h>\n  void test() {{}}\n", yaml)
    }

    fn table(yamls: &[&str]) -> FunctionTable {
        let mut builder = FunctionTableBuilder::new();
        for yaml in yamls {
            builder.add_manifest(fixtures::resolved_from_yaml(yaml));
        }
        builder.build(&mut ErrorScope::new()).unwrap()
    }

    #[test]
    fn test_writes_module_per_example() {
        let tmp = TempDir::new().unwrap();
        let env = GeneratorEnvironment::new(tmp.path(), &tmp.path().join("exploded"), Path::new("cdep"));
        let written = write(&table(&[&with_example(fixtures::ANDROID_MANIFEST)]), &env).unwrap();
        assert_eq!(written.len(), 4);

        let folder = tmp.path().join(".cdep/examples/ndk-build/com.example/lib/1.0.0");
        assert_eq!(
            fs::read_to_string(folder.join("lib.cpp")).unwrap(),
            "#include <lib.h>\nvoid test() {}\n"
        );
        let mk = fs::read_to_string(folder.join("Android.mk")).unwrap();
        assert!(mk.starts_with("LOCAL_PATH := $(call my-dir)\ninclude $(CLEAR_VARS)\n"));
        assert!(mk.contains("LOCAL_MODULE := hello-lib\n"));
        assert!(mk.contains("LOCAL_SRC_FILES += lib.cpp\n"));
        assert!(mk.contains("LOCAL_STATIC_LIBRARIES += $(cdep_lib_modules)\n"));
        assert!(mk.ends_with("include $(BUILD_SHARED_LIBRARY)\n"));

        let jni = tmp.path().join(".cdep/examples/ndk-build/jni");
        let root = fs::read_to_string(jni.join("Android.mk")).unwrap();
        let mut lines = root.lines();
        assert!(lines.next().unwrap().ends_with(".cdep/modules/ndk-build/cdep-dependencies.mk"));
        assert!(lines.next().unwrap().ends_with("com.example/lib/1.0.0/Android.mk"));
        let application = fs::read_to_string(jni.join("Application.mk")).unwrap();
        assert!(application.contains("APP_STL := c++_static\n"));
    }

    #[test]
    fn test_root_includes_examples_in_dependency_order() {
        let app = fixtures::manifest_yaml("com.example:app:1.0.0", &["com.example:base:1.0.0"]);
        let base = fixtures::manifest_yaml("com.example:base:1.0.0", &[]);
        let tmp = TempDir::new().unwrap();
        let env = GeneratorEnvironment::new(tmp.path(), tmp.path(), Path::new("cdep"));
        write(&table(&[&with_example(&app), &with_example(&base)]), &env).unwrap();

        let root = fs::read_to_string(tmp.path().join(".cdep/examples/ndk-build/jni/Android.mk")).unwrap();
        let base_at = root.find("com.example/base/1.0.0/Android.mk").unwrap();
        let app_at = root.find("com.example/app/1.0.0/Android.mk").unwrap();
        assert!(base_at < app_at);
    }

    #[test]
    fn test_header_only_example_sees_includes() {
        let tmp = TempDir::new().unwrap();
        let env = GeneratorEnvironment::new(tmp.path(), tmp.path(), Path::new("cdep"));
        write(&table(&[&with_example(fixtures::HEADER_ONLY_MANIFEST)]), &env).unwrap();
        let mk = fs::read_to_string(
            tmp.path()
                .join(".cdep/examples/ndk-build/com.example/headers/1.0.0/Android.mk"),
        )
        .unwrap();
        assert!(mk.contains("LOCAL_C_INCLUDES += $(cdep_headers_includes)\n"));
        assert!(mk.contains("LOCAL_CPPFLAGS += $(cdep_headers_cppflags)\n"));
    }

    #[test]
    fn test_no_examples_writes_only_jni() {
        let tmp = TempDir::new().unwrap();
        let env = GeneratorEnvironment::new(tmp.path(), tmp.path(), Path::new("cdep"));
        let written = write(&table(&[fixtures::ANDROID_MANIFEST]), &env).unwrap();
        assert_eq!(written.len(), 2);
    }
}
