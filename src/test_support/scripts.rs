//! Running generated build scripts against the interpreter.
//!
//! A case names a build environment; the interpreter says which archives
//! that environment selects or which abort it hits, and the dialect tests
//! run the generated script under the real build tool and compare.

use std::path::PathBuf;
use std::process::Output;

use crate::ir::check::archives;
use crate::ir::interpreter::{Interpreter, InterpretError, Value};
use crate::ir::{FunctionTable, FunctionTableBuilder, Global};
use crate::test_support::fixtures;
use crate::util::error_scope::ErrorScope;

/// Where generated scripts expect archives to be unpacked.
pub const EXPLODED_ROOT: &str = "/exploded";

/// The inputs a build system hands a decision routine.
#[derive(Debug, Clone)]
pub enum BuildEnvironment {
    Android {
        platform: i64,
        abi: &'static str,
        /// `none` for no C++ runtime.
        runtime: &'static str,
    },
    Darwin {
        sysroot: &'static str,
        architecture: &'static str,
    },
}

impl BuildEnvironment {
    pub fn interpreter(&self) -> Interpreter {
        let interpreter = Interpreter::new().with_str(Global::ExplodedRoot, EXPLODED_ROOT);
        match self {
            BuildEnvironment::Android {
                platform,
                abi,
                runtime,
            } => interpreter
                .with_str(Global::TargetSystem, "Android")
                .with(Global::TargetPlatform, Value::Int(*platform))
                .with_str(Global::AndroidAbi, abi)
                .with_str(Global::AndroidRuntime, runtime),
            BuildEnvironment::Darwin {
                sysroot,
                architecture,
            } => interpreter
                .with_str(Global::TargetSystem, "Darwin")
                .with_str(Global::OsxSysroot, sysroot)
                .with(
                    Global::OsxArchitectures,
                    Value::Array(vec![Value::Str(architecture.to_string())]),
                ),
        }
    }
}

/// One build of one package.
#[derive(Debug, Clone)]
pub struct Case {
    pub name: &'static str,
    pub manifest: &'static str,
    pub env: BuildEnvironment,
}

impl Case {
    pub fn table(&self) -> FunctionTable {
        let mut builder = FunctionTableBuilder::new();
        builder.add_manifest(fixtures::resolved_from_yaml(self.manifest));
        builder.build(&mut ErrorScope::new()).unwrap()
    }
}

fn android(
    name: &'static str,
    manifest: &'static str,
    platform: i64,
    abi: &'static str,
    runtime: &'static str,
) -> Case {
    Case {
        name,
        manifest,
        env: BuildEnvironment::Android {
            platform,
            abi,
            runtime,
        },
    }
}

/// Android builds covering every kind of switch the builder emits.
pub fn android_cases() -> Vec<Case> {
    vec![
        android("abi", fixtures::ANDROID_MANIFEST, 21, "arm64-v8a", "c++_shared"),
        android("other abi", fixtures::ANDROID_MANIFEST, 24, "armeabi-v7a", "c++_static"),
        android("no runtime", fixtures::ANDROID_MANIFEST, 24, "armeabi-v7a", "none"),
        android("unsupported abi", fixtures::ANDROID_MANIFEST, 24, "x86", "c++_shared"),
        android("unsupported runtime", fixtures::ANDROID_MANIFEST, 21, "arm64-v8a", "gnustl_static"),
        android("platform too low", fixtures::ANDROID_PLATFORMS_MANIFEST, 19, "x86", "c++_shared"),
        android("newest platform", fixtures::ANDROID_PLATFORMS_MANIFEST, 28, "x86", "c++_shared"),
        android("between platforms", fixtures::ANDROID_PLATFORMS_MANIFEST, 22, "x86", "c++_shared"),
        android("exact platform", fixtures::ANDROID_PLATFORMS_MANIFEST, 24, "x86", "none"),
        android("header only", fixtures::HEADER_ONLY_MANIFEST, 21, "arm64-v8a", "c++_shared"),
    ]
}

/// Darwin builds, decided by sysroot name and architecture.
pub fn darwin_cases() -> Vec<Case> {
    let darwin = |name, manifest, sysroot, architecture| Case {
        name,
        manifest,
        env: BuildEnvironment::Darwin {
            sysroot,
            architecture,
        },
    };
    let ios = fixtures::IOS_MANIFEST;
    vec![
        darwin("device", ios, "/sdks/iPhoneOS10.2.sdk", "arm64"),
        darwin("simulator", ios, "/sdks/iPhoneSimulator10.2.sdk", "x86_64"),
        darwin("sdk by prefix", ios, "/sdks/iPhoneOS11.0.sdk", "arm64"),
        darwin("unsupported architecture", ios, "/sdks/iPhoneOS10.2.sdk", "armv7"),
        darwin("header only", fixtures::HEADER_ONLY_MANIFEST, "/sdks/iPhoneOS10.2.sdk", "arm64"),
    ]
}

/// What a build ends up with.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Archive file names, in routine order.
    Selected(Vec<String>),
    /// The abort message.
    Aborted(String),
}

/// The outcome the interpreter computes for `env`.
pub fn expected_outcome(table: &FunctionTable, env: &BuildEnvironment) -> Outcome {
    let interpreter = env.interpreter();
    let mut selected = Vec::new();
    for find in table.ordered() {
        match interpreter.evaluate_find(find) {
            Ok(value) => selected.extend(value.archives().iter().map(|a| file_name(&a.remote))),
            Err(InterpretError::Abort(message)) => return Outcome::Aborted(message),
            Err(other) => panic!("{} did not evaluate: {}", find.coordinate, other),
        }
    }
    Outcome::Selected(selected)
}

/// Every archive file name any routine of `table` can select.
pub fn all_archive_files(table: &FunctionTable) -> Vec<String> {
    let mut files: Vec<String> = table
        .ordered()
        .flat_map(|find| archives(&find.body))
        .map(|archive| archive.file.clone())
        .collect();
    files.sort();
    files.dedup();
    files
}

/// The outcome a script run reported. `selected_lines` holds the include
/// folders the script added; an archive counts as selected when one of
/// them lies inside its unpack folder.
pub fn script_outcome(table: &FunctionTable, output: &Output, selected_lines: &str) -> Outcome {
    if !output.status.success() {
        return Outcome::Aborted(squash(&String::from_utf8_lossy(&output.stderr)));
    }
    let selected = all_archive_files(table)
        .into_iter()
        .filter(|file| selected_lines.contains(&format!("/{}/", file)))
        .collect();
    Outcome::Selected(selected)
}

/// Assert a script run agrees with the interpreter. Abort messages are
/// compared with whitespace collapsed, since build tools reflow them.
pub fn assert_agrees(case: &str, expected: &Outcome, actual: &Outcome) {
    match (expected, actual) {
        (Outcome::Aborted(message), Outcome::Aborted(stderr)) => assert!(
            stderr.contains(&squash(message)),
            "{}: expected abort '{}', script said '{}'",
            case,
            message,
            stderr
        ),
        (Outcome::Selected(want), Outcome::Selected(got)) => {
            let mut want = want.clone();
            want.sort();
            assert_eq!(&want, got, "{}: selected archives differ", case);
        }
        _ => panic!("{}: interpreter gave {:?}, script gave {:?}", case, expected, actual),
    }
}

/// `text` with every run of whitespace replaced by one space.
pub fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The build tool named `tool`, if installed.
pub fn find_tool(tool: &str) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => Some(path),
        Err(_) => {
            eprintln!("{} is not installed; not running generated scripts", tool);
            None
        }
    }
}

fn file_name(url: &url::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .to_string()
}
