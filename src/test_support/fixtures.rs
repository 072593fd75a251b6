//! Manifests and resolved manifests shared by tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::dependency::HardNameDependency;
use crate::core::manifest::{Linux, LinuxArchive, Manifest};
use crate::resolver::{FetchedManifest, ResolvedManifest};
use crate::util::hash::{sha256_bytes, sha256_str};

/// Two ABIs, one runtime, one platform.
pub const ANDROID_MANIFEST: &str = r#"coordinate:
  groupId: com.example
  artifactId: lib
  version: 1.0.0
android:
  archives:
    - file: lib-armeabi-v7a.zip
      sha256: 1c2a8e4ab1aa3c5bb4b4e1e1d8c7bcfd0a7d4d3ba0ab2f3b0e1f14c9a2b8c301
      size: 2048
      runtime: c++
      platform: 21
      abi: armeabi-v7a
      include: include
      libs: [liblib.a]
    - file: lib-arm64-v8a.zip
      sha256: 9f8e7d6c5b4a39281706f5e4d3c2b1a09f8e7d6c5b4a39281706f5e4d3c2b1a0
      size: 4096
      runtime: c++
      platform: 21
      abi: arm64-v8a
      include: include
      libs: [liblib.a]
"#;

/// One ABI built against two API levels.
pub const ANDROID_PLATFORMS_MANIFEST: &str = r#"coordinate:
  groupId: com.example
  artifactId: platforms
  version: 1.0.0
android:
  archives:
    - file: lib-21.zip
      sha256: 2121212121212121212121212121212121212121212121212121212121212121
      size: 100
      runtime: c++
      platform: 21
      abi: x86
      include: include
      libs: [libplatforms.a]
    - file: lib-24.zip
      sha256: 2424242424242424242424242424242424242424242424242424242424242424
      size: 100
      runtime: c++
      platform: 24
      abi: x86
      include: include
      libs: [libplatforms.a]
"#;

/// A simulator and a device build.
pub const IOS_MANIFEST: &str = r#"coordinate:
  groupId: com.example
  artifactId: ios
  version: 1.0.0
iOS:
  archives:
    - file: lib-sim.zip
      sha256: 5151515151515151515151515151515151515151515151515151515151515151
      size: 300
      platform: iPhoneSimulator
      architecture: x86_64
      sdk: "10.2"
      include: include
      libs: [libios.a]
    - file: lib-os.zip
      sha256: 0505050505050505050505050505050505050505050505050505050505050505
      size: 300
      platform: iPhoneOS
      architecture: arm64
      sdk: "10.2"
      include: include
      libs: [libios.a]
"#;

/// Headers only, needing C++14.
pub const HEADER_ONLY_MANIFEST: &str = r#"coordinate:
  groupId: com.example
  artifactId: headers
  version: 1.0.0
interfaces:
  headers:
    file: headers.zip
    sha256: 4848484848484848484848484848484848484848484848484848484848484848
    size: 512
    include: include
    requires: [cxx_auto_type, cxx_generic_lambdas]
"#;

/// Where the repository layout would serve a manifest for `coordinate`.
pub fn repository_url(coordinate: &Coordinate) -> Url {
    let text = format!(
        "https://repo.example.com/cdep/{}/{}/{}/cdep-manifest.yml",
        coordinate.group_id.replace('.', "/"),
        coordinate.artifact_id,
        coordinate.version
    );
    Url::parse(&text).unwrap()
}

/// Parse `yaml` and place it at its repository URL.
pub fn resolved_from_yaml(yaml: &str) -> ResolvedManifest {
    let manifest = Manifest::from_yaml_str(yaml).unwrap();
    ResolvedManifest::new(
        repository_url(&manifest.coordinate),
        FetchedManifest {
            manifest,
            sha256: sha256_str(yaml),
        },
    )
}

/// A Linux-only manifest for `coordinate` with `(compile, sha256)`
/// dependencies.
pub fn resolved_manifest(coordinate: &str, dependencies: &[(&str, &str)]) -> ResolvedManifest {
    let parsed = Coordinate::try_parse(coordinate).unwrap();
    let manifest = Manifest {
        coordinate: parsed.clone(),
        dependencies: dependencies
            .iter()
            .map(|(compile, sha256)| HardNameDependency::new(*compile, *sha256))
            .collect(),
        linux: Some(Linux {
            archives: vec![LinuxArchive {
                file: format!("{}.tar.gz", parsed.artifact_id),
                sha256: sha256_str(coordinate),
                size: 64,
                include: "include".to_string(),
                libs: vec![format!("lib{}.a", parsed.artifact_id)],
            }],
        }),
        ..Manifest::default()
    };
    ResolvedManifest::new(
        repository_url(&parsed),
        FetchedManifest {
            manifest,
            sha256: sha256_str(&format!("manifest {}", coordinate)),
        },
    )
}

/// Manifest text for `coordinate` with unpinned dependencies.
pub fn manifest_yaml(coordinate: &str, dependencies: &[&str]) -> String {
    let parsed = Coordinate::try_parse(coordinate).unwrap();
    let mut yaml = format!(
        "coordinate:\n  groupId: {}\n  artifactId: {}\n  version: {}\n",
        parsed.group_id, parsed.artifact_id, parsed.version
    );
    if !dependencies.is_empty() {
        yaml.push_str("dependencies:\n");
        for dependency in dependencies {
            yaml.push_str(&format!("  - compile: {}\n", dependency));
        }
    }
    yaml.push_str(&format!(
        "linux:\n  archives:\n    - file: {}.tar.gz\n      sha256: {}\n      size: 64\n      include: include\n      libs: [lib{}.a]\n",
        parsed.artifact_id,
        sha256_str(coordinate),
        parsed.artifact_id
    ));
    yaml
}

/// Write a one-ABI Android package for `com.example:lib:1.0.0` into `dir`:
/// `lib-arm64-v8a.zip` and a `cdep-manifest.yml` that describes it.
/// Returns the manifest path.
pub fn write_local_package(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let archive = dir.join("lib-arm64-v8a.zip");
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    zip.add_directory("include/", options).unwrap();
    zip.start_file("include/lib.h", options).unwrap();
    zip.write_all(b"int lib();\n").unwrap();
    zip.start_file("lib/arm64-v8a/liblib.a", options).unwrap();
    zip.write_all(b"!<arch>\n").unwrap();
    zip.finish().unwrap();

    let bytes = std::fs::read(&archive).unwrap();
    let manifest = format!(
        "coordinate:\n  groupId: com.example\n  artifactId: lib\n  version: 1.0.0\nandroid:\n  archives:\n    - file: lib-arm64-v8a.zip\n      sha256: {}\n      size: {}\n      runtime: c++\n      platform: 21\n      abi: arm64-v8a\n      include: include\n      libs: [liblib.a]\n",
        sha256_bytes(&bytes),
        bytes.len()
    );
    let path = dir.join("cdep-manifest.yml");
    std::fs::write(&path, manifest).unwrap();
    path
}

/// Write `cdep.yml` into `working_folder` depending on each of `dependencies`.
pub fn write_project(working_folder: &Path, builders: &str, dependencies: &[&str]) {
    std::fs::create_dir_all(working_folder).unwrap();
    let mut yaml = format!("builders: [{}]\n", builders);
    if !dependencies.is_empty() {
        yaml.push_str("dependencies:\n");
        for dependency in dependencies {
            yaml.push_str(&format!("  - compile: {}\n", dependency));
        }
    }
    std::fs::write(working_folder.join("cdep.yml"), yaml).unwrap();
}
