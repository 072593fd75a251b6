//! Structural sanity checks for manifests.
//!
//! Problems are reported into an [`ErrorScope`] so that linting a manifest
//! shows everything wrong with it at once.

use std::collections::HashMap;

use crate::core::coordinate::check_version;
use crate::core::manifest::{Manifest, KNOWN_ANDROID_ABIS, KNOWN_ANDROID_RUNTIMES};
use crate::util::error_scope::ErrorScope;

/// Check a manifest, reporting every problem into `errors`.
///
/// `source` names the manifest in messages (URL or path).
pub fn check_manifest_sanity(manifest: &Manifest, source: &str, errors: &mut ErrorScope) {
    check_coordinate(manifest, source, errors);
    check_dependencies(manifest, errors);
    check_archives(manifest, source, errors);
    check_android(manifest, errors);
    check_ios(manifest, errors);
    check_linux(manifest, errors);
}

fn check_coordinate(manifest: &Manifest, source: &str, errors: &mut ErrorScope) {
    let coordinate = &manifest.coordinate;
    errors.require(!coordinate.group_id.is_empty(), || {
        format!("Manifest '{}' was missing coordinate.groupId", source)
    });
    errors.require(!coordinate.artifact_id.is_empty(), || {
        format!("Manifest '{}' was missing coordinate.artifactId", source)
    });
    if coordinate.version.is_empty() {
        errors.fail(format!("Manifest '{}' was missing coordinate.version", source));
    } else if let Err(problem) = check_version(&coordinate.version) {
        errors.fail(format!("Package '{}' has malformed version: {}", coordinate, problem));
    }
}

fn check_dependencies(manifest: &Manifest, errors: &mut ErrorScope) {
    for dependency in &manifest.dependencies {
        errors.require(!dependency.compile.is_empty(), || {
            format!(
                "Package '{}' contains dependency with no 'compile' key",
                manifest.coordinate
            )
        });
        errors.require(!dependency.sha256.is_empty(), || {
            format!(
                "Package '{}' dependency '{}' has no 'sha256' key",
                manifest.coordinate, dependency.compile
            )
        });
    }
}

fn check_archives(manifest: &Manifest, source: &str, errors: &mut ErrorScope) {
    let coordinate = &manifest.coordinate;
    let archives = manifest.archives();
    errors.require(!archives.is_empty(), || {
        format!("Package '{}' ({}) does not contain any files", coordinate, source)
    });

    let mut seen: HashMap<String, &str> = HashMap::new();
    for archive in &archives {
        if archive.file.is_empty() {
            errors.fail(format!("Package '{}' has an archive with no 'file'", coordinate));
            continue;
        }
        let key = archive.file.to_lowercase();
        if let Some(previous) = seen.insert(key, archive.file) {
            errors.fail(format!(
                "Package '{}' contains multiple references to the same archive file '{}'",
                coordinate, previous
            ));
        }
        errors.require(!archive.sha256.is_empty(), || {
            format!(
                "Package '{}' has missing sha256 for archive '{}'",
                coordinate, archive.file
            )
        });
        errors.require(archive.size != 0, || {
            format!(
                "Package '{}' has missing or zero size for archive '{}'",
                coordinate, archive.file
            )
        });
    }

    if let Some(headers) = manifest.header_archive() {
        errors.require(!headers.include.is_empty(), || {
            format!(
                "Package '{}' has missing include for header archive '{}'",
                coordinate, headers.file
            )
        });
    }
}

fn check_android(manifest: &Manifest, errors: &mut ErrorScope) {
    let coordinate = &manifest.coordinate;
    let mut distinguishers: HashMap<String, &str> = HashMap::new();
    for archive in manifest.android_archives() {
        errors.require(
            archive.abi.is_empty() || KNOWN_ANDROID_ABIS.contains(&archive.abi.as_str()),
            || {
                format!(
                    "Package '{}' has unknown Android ABI '{}'",
                    coordinate, archive.abi
                )
            },
        );
        errors.require(
            archive.runtime.is_empty()
                || KNOWN_ANDROID_RUNTIMES.contains(&archive.runtime.as_str()),
            || {
                format!(
                    "Package '{}' has unexpected Android runtime '{}'. Allowed: {}",
                    coordinate,
                    archive.runtime,
                    KNOWN_ANDROID_RUNTIMES.join(", ")
                )
            },
        );
        errors.require(
            archive.platform.is_empty() || archive.platform.parse::<u32>().is_ok(),
            || {
                format!(
                    "Package '{}' has non-numeric Android platform '{}'",
                    coordinate, archive.platform
                )
            },
        );
        for lib in &archive.libs {
            errors.require(lib.ends_with(".a"), || {
                format!(
                    "Package '{}' has non-static android libs '{}'",
                    coordinate, lib
                )
            });
        }
        let key = format!("{}-{}-{}", archive.abi, archive.platform, archive.runtime);
        if let Some(previous) = distinguishers.insert(key.clone(), &archive.file) {
            errors.fail(format!(
                "Package '{}' has multiple android archives '{}' and '{}' with the same abi-platform-runtime '{}'",
                coordinate, previous, archive.file, key
            ));
        }
    }
}

fn check_ios(manifest: &Manifest, errors: &mut ErrorScope) {
    let coordinate = &manifest.coordinate;
    for archive in manifest.ios_archives() {
        errors.require(!archive.sdk.is_empty(), || {
            format!(
                "Package '{}' has missing ios.archive.sdk for '{}'",
                coordinate, archive.file
            )
        });
        errors.require(archive.platform.is_some(), || {
            format!(
                "Package '{}' has missing ios.archive.platform for '{}'",
                coordinate, archive.file
            )
        });
        for lib in &archive.libs {
            errors.require(lib.ends_with(".a"), || {
                format!("Package '{}' has non-static iOS libs '{}'", coordinate, lib)
            });
        }
    }
}

fn check_linux(manifest: &Manifest, errors: &mut ErrorScope) {
    let count = manifest.linux_archives().len();
    errors.require(count <= 1, || {
        format!(
            "Package '{}' has multiple linux archives ({}). Only one is allowed.",
            manifest.coordinate, count
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> Vec<String> {
        let manifest = Manifest::from_yaml_str(text).unwrap();
        let mut errors = ErrorScope::new();
        check_manifest_sanity(&manifest, "test.yml", &mut errors);
        errors
            .into_diagnostics()
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    const GOOD: &str = r#"
coordinate: { groupId: com.example, artifactId: lib, version: 1.0.0 }
android:
  archives:
    - { file: a.zip, sha256: aa, size: 1, abi: x86, runtime: c++, platform: 21, include: include, libs: [liba.a] }
    - { file: b.zip, sha256: bb, size: 1, abi: arm64-v8a, runtime: c++, platform: 21, include: include, libs: [liba.a] }
"#;

    #[test]
    fn test_good_manifest_is_clean() {
        assert!(check(GOOD).is_empty(), "{:?}", check(GOOD));
    }

    #[test]
    fn test_missing_coordinate_fields() {
        let problems = check("linux:\n  archives:\n    - { file: a.zip, sha256: aa, size: 1 }\n");
        assert!(problems.iter().any(|p| p.contains("groupId")));
        assert!(problems.iter().any(|p| p.contains("artifactId")));
        assert!(problems.iter().any(|p| p.contains("coordinate.version")));
    }

    #[test]
    fn test_no_files() {
        let problems = check("coordinate: { groupId: g, artifactId: a, version: 1.0.0 }\n");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("does not contain any files"));
    }

    #[test]
    fn test_duplicate_file_names_ignore_case() {
        let problems = check(
            r#"
coordinate: { groupId: g, artifactId: a, version: 1.0.0 }
android:
  archives:
    - { file: A.zip, sha256: aa, size: 1, abi: x86 }
    - { file: a.ZIP, sha256: bb, size: 1, abi: x86_64 }
"#,
        );
        assert!(problems.iter().any(|p| p.contains("same archive file")));
    }

    #[test]
    fn test_android_field_checks() {
        let problems = check(
            r#"
coordinate: { groupId: g, artifactId: a, version: 1.0.0 }
android:
  archives:
    - { file: a.zip, sha256: aa, size: 1, abi: sparc, runtime: libc++, libs: [liba.so] }
    - { file: b.zip, sha256: bb, size: 0, abi: x86 }
    - { file: c.zip, sha256: cc, size: 1, abi: x86 }
"#,
        );
        assert!(problems.iter().any(|p| p.contains("unknown Android ABI 'sparc'")));
        assert!(problems.iter().any(|p| p.contains("runtime 'libc++'")));
        assert!(problems.iter().any(|p| p.contains("non-static android libs")));
        assert!(problems.iter().any(|p| p.contains("zero size")));
        assert!(problems.iter().any(|p| p.contains("same abi-platform-runtime")));
    }

    #[test]
    fn test_ios_and_linux_checks() {
        let problems = check(
            r#"
coordinate: { groupId: g, artifactId: a, version: 1.0.0 }
iOS:
  archives:
    - { file: i.zip, sha256: aa, size: 1, architecture: arm64 }
linux:
  archives:
    - { file: l1.zip, sha256: bb, size: 1 }
    - { file: l2.zip, sha256: cc, size: 1 }
"#,
        );
        assert!(problems.iter().any(|p| p.contains("ios.archive.sdk")));
        assert!(problems.iter().any(|p| p.contains("ios.archive.platform")));
        assert!(problems.iter().any(|p| p.contains("multiple linux archives")));
    }

    #[test]
    fn test_malformed_version() {
        let problems = check(
            "coordinate: { groupId: g, artifactId: a, version: '1.0' }\nlinux:\n  archives:\n    - { file: l.zip, sha256: aa, size: 1 }\n",
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("malformed version"));
    }
}
