//! Builds a [`FunctionTable`] from resolved manifests.
//!
//! Variant order is deterministic: platforms are tested Android, Darwin,
//! Linux; Android runtimes and ABIs in the order the manifest declares them;
//! Android API levels from highest to lowest.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::manifest::{AndroidArchive, CxxLanguageFeature, IosArchitecture, IosArchive};
use crate::ir::build::*;
use crate::ir::{check, Expression, ExternalFunction, FindModule, FunctionTable, Global, Module, ModuleArchive};
use crate::resolver::{ResolutionScope, ResolvedManifest};
use crate::util::diagnostic::Diagnostic;
use crate::util::error_scope::ErrorScope;

const EXPLODED_ARCHIVE_FOLDER: &str = "exploded_archive_folder";
const COMBINED_PLATFORM_AND_SDK: &str = "combined_platform_and_sdk";

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("dependency cycle involving `{coordinate}`")]
    Cycle { coordinate: Coordinate },

    #[error("`{name}` is referenced in the routine for `{coordinate}` but never bound")]
    UnboundReference { coordinate: Coordinate, name: String },

    #[error("{function} called with {actual} argument(s) in the routine for `{coordinate}`")]
    Arity {
        coordinate: Coordinate,
        function: ExternalFunction,
        actual: usize,
    },

    #[error("switch with {conditions} condition(s) and {branches} branch(es) in the routine for `{coordinate}`")]
    UnpairedSwitch {
        coordinate: Coordinate,
        conditions: usize,
        branches: usize,
    },
}

impl BuildError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::Cycle { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Check the dependencies of the manifests involved"),
            BuildError::UnboundReference { .. }
            | BuildError::Arity { .. }
            | BuildError::UnpairedSwitch { .. } => {
                Diagnostic::error(self.to_string())
                    .with_context("this is an internal invariant violation")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FunctionTableBuilder {
    manifests: BTreeMap<Coordinate, ResolvedManifest>,
}

impl FunctionTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder holding the active manifest of every resolved key.
    pub fn from_scope(scope: &ResolutionScope) -> Self {
        let mut builder = Self::new();
        for resolved in scope.active_manifests() {
            builder.add_manifest(resolved.clone());
        }
        builder
    }

    pub fn add_manifest(&mut self, resolved: ResolvedManifest) {
        self.manifests.insert(resolved.coordinate().clone(), resolved);
    }

    /// Build one routine per manifest, then check the table.
    ///
    /// Unbound references and dependency cycles are returned as errors.
    /// Manifest problems found while building go to `errors`.
    pub fn build(&self, errors: &mut ErrorScope) -> Result<FunctionTable, BuildError> {
        let mut table = FunctionTable::default();
        for (coordinate, resolved) in &self.manifests {
            let dependencies = self.unified_dependencies(resolved, errors);
            let mut child = errors.child(format!("building routine for {}", coordinate));
            let find = ModuleBuilder {
                resolved,
                dependencies,
            }
            .build(&mut child);
            errors.merge(child);
            table.find_functions.insert(coordinate.clone(), find);

            if let Some(example) = resolved.manifest.example_source() {
                table.examples.insert(coordinate.clone(), example.to_string());
            }
        }
        table.order = dependency_order(&table)?;

        check::check_references(&table)?;
        check::check_consistency(&table, errors);
        Ok(table)
    }

    /// The manifest's dependencies, each replaced by the version present in
    /// this table.
    fn unified_dependencies(
        &self,
        resolved: &ResolvedManifest,
        errors: &mut ErrorScope,
    ) -> BTreeSet<Coordinate> {
        let mut dependencies = BTreeSet::new();
        for hardname in &resolved.manifest.dependencies {
            let Some(coordinate) = Coordinate::try_parse(&hardname.compile) else {
                errors.fail(format!(
                    "Could not parse main manifest coordinate [{}]",
                    hardname.compile
                ));
                continue;
            };
            let key = coordinate.versionless_key();
            let unified = self
                .manifests
                .keys()
                .find(|c| c.versionless_key() == key)
                .cloned()
                .unwrap_or(coordinate);
            dependencies.insert(unified);
        }
        dependencies
    }
}

/// Dependencies before dependants.
fn dependency_order(table: &FunctionTable) -> Result<Vec<Coordinate>, BuildError> {
    let mut graph: DiGraph<Coordinate, ()> = DiGraph::new();
    let mut nodes: BTreeMap<&Coordinate, NodeIndex> = BTreeMap::new();
    for coordinate in table.find_functions.keys() {
        nodes.insert(coordinate, graph.add_node(coordinate.clone()));
    }
    for (coordinate, find) in &table.find_functions {
        for dependency in module_dependencies(&find.body) {
            if let Some(&from) = nodes.get(&dependency) {
                graph.update_edge(from, nodes[coordinate], ());
            }
        }
    }
    let sorted = toposort(&graph, None).map_err(|cycle| BuildError::Cycle {
        coordinate: graph[cycle.node_id()].clone(),
    })?;
    Ok(sorted.into_iter().map(|node| graph[node].clone()).collect())
}

/// Every dependency named by a module anywhere in `expression`.
pub fn module_dependencies(expression: &Expression) -> BTreeSet<Coordinate> {
    let mut found = BTreeSet::new();
    check::visit(expression, &mut |e| {
        if let Expression::Module(module) = e {
            found.extend(module.dependencies.iter().cloned());
        }
    });
    found
}

struct ModuleBuilder<'a> {
    resolved: &'a ResolvedManifest,
    dependencies: BTreeSet<Coordinate>,
}

impl ModuleBuilder<'_> {
    fn coordinate(&self) -> &Coordinate {
        self.resolved.coordinate()
    }

    fn build(&self, errors: &mut ErrorScope) -> FindModule {
        let manifest = &self.resolved.manifest;
        let coordinate = self.coordinate();

        let mut supported: Vec<&str> = Vec::new();
        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        let mut case = |system: &'static str, branch: Expression| {
            supported.push(system);
            conditions.push(eq(param(Global::TargetSystem), string(system)));
            branches.push(branch);
        };

        if manifest.is_header_only() {
            if manifest.header_archive().is_some() {
                for system in ["Android", "Darwin", "Linux"] {
                    case(system, Expression::Nop);
                }
            }
        } else {
            if !manifest.android_archives().is_empty() {
                case("Android", self.android_runtime_switch(errors));
            }
            if !manifest.ios_archives().is_empty() {
                case("Darwin", self.darwin_case(errors));
            }
            if let Some(linux) = manifest.linux_archives().first() {
                case(
                    "Linux",
                    self.archive(&linux.file, &linux.sha256, linux.size, &linux.include, &linux.libs, &[]),
                );
            }
        }

        let otherwise = if supported.is_empty() {
            abort(format!("Module '{}' doesn't support any platforms.", coordinate), vec![])
        } else {
            abort(
                format!(
                    "Target platform {{}} is not supported by {}. Supported: {}",
                    coordinate,
                    supported.join(" ")
                ),
                vec![param(Global::TargetSystem)],
            )
        };
        let mut body = if_switch(conditions, branches, otherwise);

        let mut header_archive = None;
        if let Some(headers) = manifest.header_archive() {
            let module = self.archive(
                &headers.file,
                &headers.sha256,
                headers.size,
                &headers.include,
                &[],
                &headers.requires,
            );
            body = multi(vec![module, body]);
            if !headers.file.is_empty() {
                header_archive = Some((headers.file.clone(), headers.include.clone()));
            }
        }

        let group = assign("coordinate_group_id", string(&coordinate.group_id));
        let artifact = assign("coordinate_artifact_id", string(&coordinate.artifact_id));
        let version = assign("coordinate_version", string(coordinate.version.as_str()));
        let tail = assign(
            "exploded_archive_tail",
            join(vec![
                reference(&group.name),
                reference(&artifact.name),
                reference(&version.name),
            ]),
        );
        let folder = assign(
            EXPLODED_ARCHIVE_FOLDER,
            join(vec![param(Global::ExplodedRoot), reference(&tail.name)]),
        );

        FindModule {
            coordinate: coordinate.clone(),
            header_archive,
            body: block(vec![group, artifact, version, tail, folder], body),
        }
    }

    /// A module for one archive, or an abort when the archive is malformed.
    fn archive(
        &self,
        file: &str,
        sha256: &str,
        size: u64,
        include: &str,
        libs: &[String],
        requires: &[CxxLanguageFeature],
    ) -> Expression {
        if file.is_empty() || sha256.is_empty() || size == 0 {
            return abort(format!("Archive in {} was malformed", self.resolved.remote), vec![]);
        }
        let remote = match archive_url(&self.resolved.remote, file) {
            Ok(remote) => remote,
            Err(e) => {
                return abort(
                    format!("Archive file {} could not be converted to URL: {}", file, e),
                    vec![],
                )
            }
        };
        let folder = || reference(EXPLODED_ARCHIVE_FOLDER);
        let include = (!include.is_empty())
            .then(|| Box::new(join(vec![folder(), string(file), string(include)])));
        let libs = libs
            .iter()
            .map(|lib| join(vec![folder(), string(file), string("lib"), string(lib)]))
            .collect();

        let module = Expression::Module(Module {
            archive: ModuleArchive {
                remote,
                file: file.to_string(),
                sha256: sha256.to_string(),
                size,
                include,
                libs,
                requires: requires.to_vec(),
            },
            dependencies: self.dependencies.clone(),
        });
        if requires.is_empty() {
            return module;
        }
        multi(vec![compiler_requirement(requires), module])
    }

    fn android_runtime_switch(&self, errors: &mut ErrorScope) -> Expression {
        let coordinate = self.coordinate();
        let mut by_runtime: Vec<(&str, Vec<&AndroidArchive>)> = Vec::new();
        for archive in self.resolved.manifest.android_archives() {
            match by_runtime.iter_mut().find(|(rt, _)| *rt == archive.runtime) {
                Some((_, group)) => group.push(archive),
                None => by_runtime.push((archive.runtime.as_str(), vec![archive])),
            }
        }

        if by_runtime.iter().any(|(rt, _)| rt.is_empty()) {
            if by_runtime.len() != 1 {
                errors.fail(format!(
                    "Runtime is on some android archives but not others in module '{}'",
                    coordinate
                ));
                return abort(
                    format!("Module '{}' has inconsistent Android runtimes", coordinate),
                    vec![],
                );
            }
            return self.android_platform_switch(&by_runtime[0].1);
        }

        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        for (runtime, group) in &by_runtime {
            let runtime_is = |suffix: &str| {
                eq(param(Global::AndroidRuntime), string(format!("{}_{}", runtime, suffix)))
            };
            conditions.push(or(runtime_is("shared"), runtime_is("static")));
            branches.push(self.android_platform_switch(group));
        }

        let substitute = ["c++", "gnustl"]
            .iter()
            .find_map(|wanted| by_runtime.iter().find(|(rt, _)| rt == wanted));
        conditions.push(eq(param(Global::AndroidRuntime), param(Global::NoneRuntime)));
        branches.push(match substitute {
            Some((_, group)) => self.android_platform_switch(group),
            None => abort(
                format!(
                    "No suitable runtime found to substitute for '{{}}' in module {}",
                    coordinate
                ),
                vec![param(Global::NoneRuntime)],
            ),
        });

        let runtimes: Vec<&str> = by_runtime.iter().map(|(rt, _)| *rt).collect();
        if_switch(
            conditions,
            branches,
            abort(
                format!(
                    "Android runtime '{{}}' is not supported by {}. Supported: {}",
                    coordinate,
                    runtimes.join(" ")
                ),
                vec![param(Global::AndroidRuntime)],
            ),
        )
    }

    fn android_platform_switch(&self, archives: &[&AndroidArchive]) -> Expression {
        let coordinate = self.coordinate();
        if archives.len() == 1 && archives[0].platform.is_empty() {
            return self.android_abi_switch(archives);
        }

        let mut by_platform: BTreeMap<i64, Vec<&AndroidArchive>> = BTreeMap::new();
        for archive in archives {
            let platform = if archive.platform.is_empty() {
                0
            } else {
                match archive.platform.parse::<i64>() {
                    Ok(platform) => platform,
                    Err(_) => {
                        return abort(
                            format!(
                                "Android platform string in {} manifest could not be converted to an integer",
                                coordinate
                            ),
                            vec![],
                        )
                    }
                }
            };
            by_platform.entry(platform).or_default().push(*archive);
        }

        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        for (platform, group) in by_platform.iter().rev() {
            conditions.push(gte(param(Global::TargetPlatform), *platform));
            branches.push(self.android_abi_switch(group));
        }
        if_switch(
            conditions,
            branches,
            abort(
                format!("Android API level {{}} is not supported by {}", coordinate),
                vec![param(Global::TargetPlatform)],
            ),
        )
    }

    fn android_abi_switch(&self, archives: &[&AndroidArchive]) -> Expression {
        let mut by_abi: Vec<(&str, &AndroidArchive)> = Vec::new();
        for archive in archives {
            if !by_abi.iter().any(|(abi, _)| *abi == archive.abi) {
                by_abi.push((archive.abi.as_str(), *archive));
            }
        }

        if let [("", archive)] = by_abi.as_slice() {
            return self.archive(&archive.file, &archive.sha256, archive.size, &archive.include, &[], &[]);
        }

        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        for (abi, archive) in &by_abi {
            let libs: Vec<String> = archive
                .libs
                .iter()
                .map(|lib| if abi.is_empty() { lib.clone() } else { format!("{}/{}", abi, lib) })
                .collect();
            conditions.push(eq(param(Global::AndroidAbi), string(*abi)));
            branches.push(self.archive(
                &archive.file,
                &archive.sha256,
                archive.size,
                &archive.include,
                &libs,
                &[],
            ));
        }

        let supported: Vec<&str> = by_abi.iter().map(|(abi, _)| *abi).collect();
        if_switch(
            conditions,
            branches,
            abort(
                format!(
                    "Android ABI {{}} is not supported by {} for platform {{}}. Supported: {}",
                    self.coordinate(),
                    supported.join(" ")
                ),
                vec![param(Global::AndroidAbi), param(Global::TargetPlatform)],
            ),
        )
    }

    fn darwin_case(&self, errors: &mut ErrorScope) -> Expression {
        let sdk_name = assign(
            "osx_sysroot_sdk_name",
            invoke(ExternalFunction::FileGetName, vec![param(Global::OsxSysroot)]),
        );
        let last_dot = assign(
            "last_dot_position",
            invoke(
                ExternalFunction::StringLastIndexOf,
                vec![reference(&sdk_name.name), string(".")],
            ),
        );
        let combined = assign(
            COMBINED_PLATFORM_AND_SDK,
            invoke(
                ExternalFunction::StringSubstring,
                vec![reference(&sdk_name.name), int(0), reference(&last_dot.name)],
            ),
        );
        block(
            vec![sdk_name, last_dot, combined],
            self.darwin_architecture_switch(errors),
        )
    }

    fn darwin_architecture_switch(&self, errors: &mut ErrorScope) -> Expression {
        let archives = self.resolved.manifest.ios_archives();
        let mut by_architecture: Vec<(Option<IosArchitecture>, Vec<&IosArchive>)> = Vec::new();
        for archive in archives {
            match by_architecture
                .iter_mut()
                .find(|(arch, _)| *arch == archive.architecture)
            {
                Some((_, group)) => group.push(archive),
                None => by_architecture.push((archive.architecture, vec![archive])),
            }
        }

        if let [(_, group)] = by_architecture.as_slice() {
            return self.darwin_sdk_switch(group, None, errors);
        }

        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        let mut supported = Vec::new();
        for (architecture, group) in &by_architecture {
            match architecture {
                Some(architecture) => {
                    conditions.push(invoke(
                        ExternalFunction::ArrayHasOnlyElement,
                        vec![param(Global::OsxArchitectures), string(architecture.as_str())],
                    ));
                    supported.push(architecture.as_str());
                }
                None => {
                    errors.fail("iOS architecture in manifest was unknown or missing");
                    conditions.push(boolean(false));
                }
            }
            branches.push(self.darwin_sdk_switch(group, *architecture, errors));
        }
        if_switch(
            conditions,
            branches,
            abort(
                format!(
                    "OSX architecture {{}} is not supported by {}. Supported: {}",
                    self.coordinate(),
                    supported.join(" ")
                ),
                vec![param(Global::OsxArchitectures)],
            ),
        )
    }

    fn darwin_sdk_switch(
        &self,
        archives: &[&IosArchive],
        architecture: Option<IosArchitecture>,
        errors: &mut ErrorScope,
    ) -> Expression {
        let build = |archive: &IosArchive| {
            self.archive(&archive.file, &archive.sha256, archive.size, &archive.include, &archive.libs, &[])
        };
        if self.resolved.manifest.ios_archives().len() == 1 {
            return build(archives[0]);
        }

        let combined = || reference(COMBINED_PLATFORM_AND_SDK);
        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        let mut supported = Vec::new();
        for archive in archives {
            let platform = archive.platform.map(|p| p.as_str()).unwrap_or_default();
            let platform_sdk = format!("{}{}", platform, archive.sdk);
            conditions.push(eq(combined(), string(&platform_sdk)));
            branches.push(build(*archive));
            supported.push(platform_sdk);
        }
        for archive in archives {
            let Some(platform) = archive.platform else {
                errors.fail(
                    "iOS platform was missing in some packages and present in others. It needs to be consistent",
                );
                continue;
            };
            conditions.push(starts_with(combined(), platform.as_str()));
            branches.push(build(*archive));
        }

        let message = match architecture {
            None => format!(
                "OSX SDK {{}} is not supported by {}. Supported: {}",
                self.coordinate(),
                supported.join(" ")
            ),
            Some(architecture) => format!(
                "OSX SDK {{}} is not supported by {} and architecture {}. Supported: {}",
                self.coordinate(),
                architecture.as_str(),
                supported.join(" ")
            ),
        };
        if_switch(conditions, branches, abort(message, vec![combined()]))
    }
}

/// `IfSwitch([supportsCompilerFeatures()], [requiresCompilerFeatures(..)],
/// requireMinimumCxxCompilerStandard(..))` for a feature list.
pub fn compiler_requirement(requires: &[CxxLanguageFeature]) -> Expression {
    let features = requires
        .iter()
        .map(|f| Expression::Constant(crate::ir::Constant::Feature(*f)))
        .collect();
    let minimum = requires.iter().map(|f| f.standard()).max().unwrap_or(0);
    if_switch(
        vec![invoke(ExternalFunction::SupportsCompilerFeatures, vec![])],
        vec![invoke(
            ExternalFunction::RequiresCompilerFeatures,
            vec![Expression::Array(features)],
        )],
        invoke(
            ExternalFunction::RequireMinimumCxxCompilerStandard,
            vec![int(minimum as i64)],
        ),
    )
}

/// The archive's URL, relative to the manifest it was declared in.
pub fn archive_url(manifest_url: &Url, file: &str) -> Result<Url, url::ParseError> {
    manifest_url.join(file)
}
