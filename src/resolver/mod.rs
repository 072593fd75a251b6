//! Dependency resolution.
//!
//! Soft names are turned into manifests by a chain of [`CoordinateResolver`]s.
//! [`Resolver::resolve_all`] runs the chain to a fixed point over a
//! [`ResolutionScope`], so every name reachable from the roots ends either
//! resolved or unresolvable.

pub mod errors;
pub mod provider;
pub mod scope;
pub mod strategies;

pub use errors::{ResolveError, Unresolvable};
pub use provider::{FetchedManifest, ManifestProvider, ResolvedManifest};
pub use scope::ResolutionScope;
pub use strategies::{default_resolvers, CoordinateResolver};

use std::collections::BTreeMap;

use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::dependency::SoftNameDependency;
use crate::core::sanity::check_manifest_sanity;
use crate::util::diagnostic::AmbiguousResolutionError;
use crate::util::error_scope::ErrorScope;
use crate::util::hash::same_digest;

/// Name given to hashes recorded by a previous run.
pub const LOCKED_HASHES_SOURCE: &str = "cdep.sha256";

pub struct Resolver<'a> {
    provider: &'a mut dyn ManifestProvider,
    resolvers: Vec<Box<dyn CoordinateResolver>>,
    locked: BTreeMap<Coordinate, String>,
}

impl<'a> Resolver<'a> {
    /// A resolver using the default chain plus the given repositories.
    pub fn new(provider: &'a mut dyn ManifestProvider, repositories: Vec<Url>) -> Self {
        Self::with_resolvers(provider, default_resolvers(repositories))
    }

    pub fn with_resolvers(
        provider: &'a mut dyn ManifestProvider,
        resolvers: Vec<Box<dyn CoordinateResolver>>,
    ) -> Self {
        Resolver {
            provider,
            resolvers,
            locked: BTreeMap::new(),
        }
    }

    /// Hashes a resolved manifest must match, keyed by coordinate.
    pub fn with_locked_hashes(mut self, locked: BTreeMap<Coordinate, String>) -> Self {
        self.locked = locked;
        self
    }

    /// Resolve a single name without following its dependencies.
    ///
    /// Every resolver is tried. More than one match is an error. The
    /// accepted manifest is sanity checked into `errors`.
    pub fn resolve_any(
        &mut self,
        dependency: &SoftNameDependency,
        errors: &mut ErrorScope,
    ) -> Result<Option<ResolvedManifest>, ResolveError> {
        let mut found: Option<(&'static str, ResolvedManifest)> = None;
        for resolver in &self.resolvers {
            let Some(attempt) = resolver.resolve(&mut *self.provider, dependency)? else {
                continue;
            };
            if let Some((previous, _)) = &found {
                return Err(AmbiguousResolutionError {
                    name: dependency.compile.clone(),
                    resolvers: vec![*previous, resolver.name()],
                }
                .into());
            }
            tracing::debug!("{} matched {}", resolver.name(), dependency);
            found = Some((resolver.name(), attempt));
        }

        let Some((_, resolved)) = found else {
            return Ok(None);
        };
        if resolved.coordinate().is_blank() {
            return Err(ResolveError::MissingCoordinate {
                source_name: resolved.remote.to_string(),
            });
        }
        let mut child = errors.child(format!("checking {}", resolved.remote));
        check_manifest_sanity(&resolved.manifest, resolved.remote.as_str(), &mut child);
        errors.merge(child);
        Ok(Some(resolved))
    }

    /// Resolve everything reachable from the scope's frontier.
    ///
    /// Only fatal problems are returned as errors. Names that could not be
    /// resolved are left in the scope for the caller to report together.
    pub fn resolve_all(
        &mut self,
        scope: &mut ResolutionScope,
        errors: &mut ErrorScope,
    ) -> Result<(), ResolveError> {
        while !scope.is_resolution_complete() {
            for softname in scope.unresolved_references() {
                if !scope.is_pending(softname.name()) {
                    continue;
                }
                tracing::info!("Resolving {}", softname);
                match self.resolve_any(&softname, errors)? {
                    None => {
                        let reason = classify(softname.name());
                        tracing::debug!("{} is unresolvable ({})", softname, reason);
                        scope.record_unresolvable(&softname, reason);
                    }
                    Some(resolved) => {
                        self.check_locked(&resolved)?;
                        if scope.is_resolved(&resolved.coordinate().to_string()) {
                            scope.record_alias(&softname);
                            continue;
                        }
                        scope.record_resolved(&softname, resolved)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Build a scope from `roots` and resolve it.
    pub fn resolve_roots(
        &mut self,
        roots: &[SoftNameDependency],
        errors: &mut ErrorScope,
    ) -> Result<ResolutionScope, ResolveError> {
        let mut scope = ResolutionScope::with_roots(roots);
        self.resolve_all(&mut scope, errors)?;
        Ok(scope)
    }

    fn check_locked(&self, resolved: &ResolvedManifest) -> Result<(), ResolveError> {
        match self.locked.get(resolved.coordinate()) {
            Some(expected) if !same_digest(expected, &resolved.sha256) => {
                Err(ResolveError::HashMismatch {
                    coordinate: resolved.coordinate().to_string(),
                    expected: expected.clone(),
                    actual: resolved.sha256.clone(),
                    pinned_by: LOCKED_HASHES_SOURCE.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Why a name that no resolver accepted is unresolvable.
pub fn classify(name: &str) -> Unresolvable {
    if strategies::looks_resolvable(name) {
        Unresolvable::DidntExist
    } else {
        Unresolvable::Unparseable
    }
}
