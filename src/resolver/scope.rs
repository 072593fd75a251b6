//! The state of one resolution run.
//!
//! A scope starts with a frontier of root soft names. Each name ends either
//! resolved (a manifest was accepted for it) or unresolvable (with a reason),
//! and resolving a manifest grows the frontier with its own dependencies.
//!
//! Every version seen for a versionless key is kept. The highest one is the
//! active manifest for the key, and the others are recorded as losers of it.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::coordinate::{Coordinate, Version};
use crate::core::dependency::SoftNameDependency;
use crate::resolver::errors::{ResolveError, Unresolvable};
use crate::resolver::provider::ResolvedManifest;
use crate::util::error_scope::ErrorScope;
use crate::util::hash::same_digest;

/// A hash a dependant pinned for one of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub sha256: String,
    pub pinned_by: Coordinate,
}

#[derive(Debug, Default)]
pub struct ResolutionScope {
    /// dependant -> dependees
    forward_edges: BTreeMap<Coordinate, BTreeSet<Coordinate>>,
    /// dependee -> dependants
    backward_edges: BTreeMap<Coordinate, BTreeSet<Coordinate>>,
    winners_to_losers: BTreeMap<Coordinate, BTreeSet<Coordinate>>,
    losers_to_winners: BTreeMap<Coordinate, Coordinate>,
    unresolved: BTreeMap<String, SoftNameDependency>,
    /// Names that reached a terminal state, successfully or not.
    resolved: BTreeSet<String>,
    unresolvable: BTreeMap<String, Unresolvable>,
    /// versionless key -> every version seen
    versions: BTreeMap<String, BTreeMap<Version, ResolvedManifest>>,
    pins: BTreeMap<Coordinate, Pin>,
}

impl ResolutionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope seeded with the top-level dependencies of a project.
    pub fn with_roots<'a>(roots: impl IntoIterator<Item = &'a SoftNameDependency>) -> Self {
        let mut scope = Self::new();
        for root in roots {
            scope.add_unresolved(root.clone());
        }
        scope
    }

    /// Queue a name unless it already reached a terminal state.
    pub fn add_unresolved(&mut self, softname: SoftNameDependency) {
        if !self.resolved.contains(softname.name()) {
            self.unresolved.insert(softname.compile.clone(), softname);
        }
    }

    pub fn is_resolution_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.unresolved.contains_key(name)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains(name)
    }

    /// A snapshot of the frontier.
    pub fn unresolved_references(&self) -> Vec<SoftNameDependency> {
        self.unresolved.values().cloned().collect()
    }

    /// Record that `softname` resolved to `resolved`, and queue its
    /// dependencies.
    pub fn record_resolved(
        &mut self,
        softname: &SoftNameDependency,
        resolved: ResolvedManifest,
    ) -> Result<(), ResolveError> {
        let coordinate = resolved.coordinate().clone();
        let key = coordinate.to_string();
        if self.resolved.contains(&key) {
            return Err(ResolveError::AlreadyResolved { coordinate: key });
        }

        self.check_pin(&coordinate, &resolved.sha256)?;

        let dependencies = resolved.manifest.dependencies.clone();
        self.unify(resolved);
        self.resolved.insert(key.clone());
        self.resolved.insert(softname.compile.clone());
        self.unresolved.remove(&key);
        self.unresolved.remove(softname.name());

        for hardname in dependencies {
            let Some(dependee) = Coordinate::try_parse(&hardname.compile) else {
                self.unresolved.remove(&hardname.compile);
                self.resolved.insert(hardname.compile.clone());
                self.unresolvable
                    .insert(hardname.compile.clone(), Unresolvable::Unparseable);
                continue;
            };
            if !hardname.sha256.is_empty() {
                self.add_pin(&dependee, &hardname.sha256, &coordinate)?;
            }
            self.forward_edges
                .entry(coordinate.clone())
                .or_default()
                .insert(dependee.clone());
            self.backward_edges
                .entry(dependee.clone())
                .or_default()
                .insert(coordinate.clone());
            self.add_unresolved(SoftNameDependency::new(dependee.to_string()));
        }
        Ok(())
    }

    /// Mark a soft name terminal because it named a coordinate that was
    /// already resolved through another name.
    pub fn record_alias(&mut self, softname: &SoftNameDependency) {
        self.unresolved.remove(softname.name());
        self.resolved.insert(softname.compile.clone());
    }

    pub fn record_unresolvable(&mut self, softname: &SoftNameDependency, reason: Unresolvable) {
        self.unresolved.remove(softname.name());
        self.resolved.insert(softname.compile.clone());
        self.unresolvable.insert(softname.compile.clone(), reason);
    }

    fn unify(&mut self, resolved: ResolvedManifest) {
        let coordinate = resolved.coordinate().clone();
        let key = coordinate.versionless_key();
        let seen = self.versions.entry(key).or_default();
        seen.insert(coordinate.version.clone(), resolved);
        if seen.len() < 2 {
            return;
        }

        let all: Vec<Coordinate> = seen.values().map(|m| m.coordinate().clone()).collect();
        let Some((winner, losers)) = all.split_last() else {
            return;
        };
        for previous in &all {
            self.winners_to_losers.remove(previous);
        }
        self.losers_to_winners.remove(winner);
        let losers: BTreeSet<Coordinate> = losers.iter().cloned().collect();
        for loser in &losers {
            self.losers_to_winners.insert(loser.clone(), winner.clone());
        }
        tracing::debug!("unified {} over {} other version(s)", winner, losers.len());
        self.winners_to_losers.insert(winner.clone(), losers);
    }

    fn add_pin(
        &mut self,
        dependee: &Coordinate,
        sha256: &str,
        pinned_by: &Coordinate,
    ) -> Result<(), ResolveError> {
        if let Some(existing) = self.pins.get(dependee) {
            if !same_digest(&existing.sha256, sha256) {
                return Err(ResolveError::HashMismatch {
                    coordinate: dependee.to_string(),
                    expected: existing.sha256.clone(),
                    actual: sha256.to_string(),
                    pinned_by: format!("{} and {}", existing.pinned_by, pinned_by),
                });
            }
            return Ok(());
        }
        self.pins.insert(
            dependee.clone(),
            Pin {
                sha256: sha256.to_string(),
                pinned_by: pinned_by.clone(),
            },
        );
        // The dependee may have been accepted before this pin was seen.
        if let Some(manifest) = self.manifest_for(dependee) {
            let actual = manifest.sha256.clone();
            self.check_pin(dependee, &actual)?;
        }
        Ok(())
    }

    fn check_pin(&self, coordinate: &Coordinate, actual: &str) -> Result<(), ResolveError> {
        match self.pins.get(coordinate) {
            Some(pin) if !same_digest(&pin.sha256, actual) => Err(ResolveError::HashMismatch {
                coordinate: coordinate.to_string(),
                expected: pin.sha256.clone(),
                actual: actual.to_string(),
                pinned_by: pin.pinned_by.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// The manifest accepted for this exact coordinate, winner or not.
    pub fn manifest_for(&self, coordinate: &Coordinate) -> Option<&ResolvedManifest> {
        self.versions
            .get(&coordinate.versionless_key())
            .and_then(|seen| seen.get(&coordinate.version))
    }

    /// The active manifest for a versionless key.
    pub fn resolution(&self, versionless_key: &str) -> Option<&ResolvedManifest> {
        self.versions
            .get(versionless_key)
            .and_then(|seen| seen.values().next_back())
    }

    /// Versionless keys with an active manifest.
    pub fn resolutions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Active manifests in key order.
    pub fn active_manifests(&self) -> impl Iterator<Item = &ResolvedManifest> {
        self.versions.values().filter_map(|seen| seen.values().next_back())
    }

    /// The coordinate that stands in for `coordinate` after unification.
    pub fn unified(&self, coordinate: &Coordinate) -> Option<&Coordinate> {
        self.resolution(&coordinate.versionless_key())
            .map(ResolvedManifest::coordinate)
    }

    pub fn unification_winners(&self) -> impl Iterator<Item = &Coordinate> {
        self.winners_to_losers.keys()
    }

    pub fn unification_losers(&self) -> impl Iterator<Item = &Coordinate> {
        self.losers_to_winners.keys()
    }

    pub fn losers_of(&self, winner: &Coordinate) -> Option<&BTreeSet<Coordinate>> {
        self.winners_to_losers.get(winner)
    }

    pub fn winner_of(&self, loser: &Coordinate) -> Option<&Coordinate> {
        self.losers_to_winners.get(loser)
    }

    pub fn dependencies_of(&self, dependant: &Coordinate) -> impl Iterator<Item = &Coordinate> {
        self.forward_edges.get(dependant).into_iter().flatten()
    }

    pub fn dependants_of(&self, dependee: &Coordinate) -> impl Iterator<Item = &Coordinate> {
        self.backward_edges.get(dependee).into_iter().flatten()
    }

    pub fn unresolvable(&self) -> &BTreeMap<String, Unresolvable> {
        &self.unresolvable
    }

    pub fn unresolvable_reason(&self, name: &str) -> Option<Unresolvable> {
        self.unresolvable.get(name).copied()
    }

    /// Every unresolvable name, aggregated into one error.
    pub fn unresolved_error(&self) -> Option<ResolveError> {
        if self.unresolvable.is_empty() {
            return None;
        }
        Some(ResolveError::Unresolved {
            entries: self
                .unresolvable
                .iter()
                .map(|(name, reason)| (name.clone(), *reason))
                .collect(),
        })
    }

    /// Report unresolvable names into `errors`, one diagnostic each.
    pub fn report_unresolvable(&self, errors: &mut ErrorScope) {
        for (name, reason) in &self.unresolvable {
            errors.fail(crate::resolver::errors::unresolvable_message(name, *reason));
        }
    }
}
