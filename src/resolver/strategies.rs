//! Naming grammars that turn a soft name into a manifest.
//!
//! Each resolver recognizes one grammar. On input it does not recognize it
//! returns `Ok(None)`. When it recognizes the input, fetches a manifest, and
//! the manifest disagrees with the name, it fails with
//! [`ResolveError::ManifestMismatch`].

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::dependency::SoftNameDependency;
use crate::core::manifest::Manifest;
use crate::resolver::errors::ResolveError;
use crate::resolver::provider::{FetchedManifest, ManifestProvider, ResolvedManifest};
use crate::util::hash::sha256_str;

static RELEASE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://([^/]+)/([^/]+)/([^/]+)/releases/download/([^/]+)/cdep-manifest(.*)\.yml$")
        .expect("release url pattern is valid")
});

static GITHUB_RELEASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^com\.github\.([^.:]+):([^:]+):([^:]+)$").expect("github pattern is valid")
});

static GITHUB_MULTIPACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^com\.github\.([^.:]+)\.([^:]+):([^:]+):([^:]+)$")
        .expect("github multipackage pattern is valid")
});

/// One naming grammar.
pub trait CoordinateResolver {
    /// Short name used in ambiguity reports.
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        provider: &mut dyn ManifestProvider,
        dependency: &SoftNameDependency,
    ) -> Result<Option<ResolvedManifest>, ResolveError>;
}

/// The default chain, in evaluation order.
pub fn default_resolvers(repositories: Vec<Url>) -> Vec<Box<dyn CoordinateResolver>> {
    let mut chain: Vec<Box<dyn CoordinateResolver>> = vec![
        Box::new(ReleaseUrlResolver),
        Box::new(GithubReleasesResolver),
        Box::new(GithubMultipackageResolver),
    ];
    if !repositories.is_empty() {
        chain.push(Box::new(RepositoryResolver::new(repositories)));
    }
    chain.push(Box::new(LocalFilePathResolver));
    chain
}

/// `https://{host}/{user}/{project}/releases/download/{tag}/cdep-manifest{-sub}.yml`
///
/// A plain tag is the version and `project` the artifact, grouped as
/// reversed host plus user (`github.com/jomof` is `com.github.jomof`). A tag
/// of the form `artifact@version` is a multi-package release and groups as
/// `...{user}.{project}`.
pub struct ReleaseUrlResolver;

impl CoordinateResolver for ReleaseUrlResolver {
    fn name(&self) -> &'static str {
        "release-url"
    }

    fn resolve(
        &self,
        provider: &mut dyn ManifestProvider,
        dependency: &SoftNameDependency,
    ) -> Result<Option<ResolvedManifest>, ResolveError> {
        let text = dependency.name();
        let Some(caps) = RELEASE_URL.captures(text) else {
            return Ok(None);
        };

        let mut group_id: Vec<&str> = caps[1].split('.').rev().collect();
        group_id.push(&caps[2]);
        let project = &caps[3];
        let tag = &caps[4];
        let (mut artifact_id, version) = match tag.split_once('@') {
            Some((artifact, version)) => {
                group_id.push(project);
                (artifact.to_string(), version.to_string())
            }
            None => (project.to_string(), tag.to_string()),
        };
        let group_id = group_id.join(".");

        let sub_artifact = &caps[5];
        if !sub_artifact.is_empty() {
            let Some(sub) = sub_artifact.strip_prefix('-') else {
                return Err(ResolveError::MalformedManifest {
                    source_name: text.to_string(),
                    message: format!("url is incorrectly formed at '{}'", sub_artifact),
                });
            };
            artifact_id = format!("{}/{}", artifact_id, sub);
        }

        let provisional = Coordinate::new(group_id, artifact_id, version);
        let url = parse_url(text)?;
        let fetch_url = escape_github_special_characters(&url);
        let Some(fetched) = provider
            .try_get_manifest(&provisional, &fetch_url)
            .map_err(|e| ResolveError::provider(text, e))?
        else {
            return Ok(None);
        };

        check_agreement(&provisional, &fetched.manifest.coordinate, text)?;
        Ok(Some(ResolvedManifest::new(fetch_url, fetched)))
    }
}

/// `com.github.{user}:{artifact}[/sub]:{version}`
pub struct GithubReleasesResolver;

impl CoordinateResolver for GithubReleasesResolver {
    fn name(&self) -> &'static str {
        "github-releases"
    }

    fn resolve(
        &self,
        provider: &mut dyn ManifestProvider,
        dependency: &SoftNameDependency,
    ) -> Result<Option<ResolvedManifest>, ResolveError> {
        let Some(caps) = GITHUB_RELEASES.captures(dependency.name()) else {
            return Ok(None);
        };
        let (artifact, sub) = split_sub_artifact(&caps[2]);
        let url = format!(
            "https://github.com/{}/{}/releases/download/{}/cdep-manifest{}.yml",
            &caps[1], artifact, &caps[3], sub
        );
        ReleaseUrlResolver.resolve(provider, &SoftNameDependency::new(url))
    }
}

/// `com.github.{user}.{project}:{artifact}[/sub]:{version}`
pub struct GithubMultipackageResolver;

impl CoordinateResolver for GithubMultipackageResolver {
    fn name(&self) -> &'static str {
        "github-multipackage"
    }

    fn resolve(
        &self,
        provider: &mut dyn ManifestProvider,
        dependency: &SoftNameDependency,
    ) -> Result<Option<ResolvedManifest>, ResolveError> {
        let Some(caps) = GITHUB_MULTIPACKAGE.captures(dependency.name()) else {
            return Ok(None);
        };
        let (artifact, sub) = split_sub_artifact(&caps[3]);
        let url = format!(
            "https://github.com/{}/{}/releases/download/{}@{}/cdep-manifest{}.yml",
            &caps[1], &caps[2], artifact, &caps[4], sub
        );
        ReleaseUrlResolver.resolve(provider, &SoftNameDependency::new(url))
    }
}

/// `group:artifact:version` looked up in configured repositories, laid out as
/// `{base}/{group as path}/{artifact}/{version}/cdep-manifest.yml`.
/// Repositories are tried in order and the first hit wins.
pub struct RepositoryResolver {
    repositories: Vec<Url>,
}

impl RepositoryResolver {
    pub fn new(repositories: Vec<Url>) -> Self {
        RepositoryResolver { repositories }
    }

    /// The manifest URL for `coordinate` under `base`.
    pub fn manifest_url(base: &Url, coordinate: &Coordinate) -> Result<Url, url::ParseError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!(
            "{}/{}/{}/cdep-manifest.yml",
            coordinate.group_id.replace('.', "/"),
            coordinate.artifact_id,
            coordinate.version
        ))
    }
}

impl CoordinateResolver for RepositoryResolver {
    fn name(&self) -> &'static str {
        "repository"
    }

    fn resolve(
        &self,
        provider: &mut dyn ManifestProvider,
        dependency: &SoftNameDependency,
    ) -> Result<Option<ResolvedManifest>, ResolveError> {
        let Some(coordinate) = Coordinate::try_parse(dependency.name()) else {
            return Ok(None);
        };
        for base in &self.repositories {
            let url = Self::manifest_url(base, &coordinate).map_err(|e| {
                ResolveError::provider(dependency.name(), anyhow::anyhow!("bad repository url: {}", e))
            })?;
            tracing::debug!("looking for {} at {}", coordinate, url);
            let fetched = provider
                .try_get_manifest(&coordinate, &url)
                .map_err(|e| ResolveError::provider(dependency.name(), e))?;
            if let Some(fetched) = fetched {
                if fetched.manifest.coordinate != coordinate {
                    return Err(ResolveError::ManifestMismatch {
                        field: "coordinate",
                        manifest_value: fetched.manifest.coordinate.to_string(),
                        url_value: coordinate.to_string(),
                        url: url.to_string(),
                    });
                }
                return Ok(Some(ResolvedManifest::new(url, fetched)));
            }
        }
        Ok(None)
    }
}

/// A path to a manifest file on disk.
pub struct LocalFilePathResolver;

impl CoordinateResolver for LocalFilePathResolver {
    fn name(&self) -> &'static str {
        "local-file"
    }

    fn resolve(
        &self,
        _provider: &mut dyn ManifestProvider,
        dependency: &SoftNameDependency,
    ) -> Result<Option<ResolvedManifest>, ResolveError> {
        let path = Path::new(dependency.name());
        if !path.is_file() {
            return Ok(None);
        }
        let canonical = path
            .canonicalize()
            .map_err(|e| ResolveError::provider(dependency.name(), e.into()))?;
        let text = crate::util::fs::read_to_string(&canonical)
            .map_err(|e| ResolveError::provider(dependency.name(), e))?;
        let manifest = parse_manifest(&text, dependency.name())?;
        let url = Url::from_file_path(&canonical).map_err(|()| {
            ResolveError::provider(
                dependency.name(),
                anyhow::anyhow!("cannot express {} as a file url", canonical.display()),
            )
        })?;
        Ok(Some(ResolvedManifest::new(
            url,
            FetchedManifest {
                manifest,
                sha256: sha256_str(&text),
            },
        )))
    }
}

/// Parse manifest text, mapping failures onto [`ResolveError`].
pub fn parse_manifest(text: &str, source_name: &str) -> Result<Manifest, ResolveError> {
    Manifest::from_yaml_str(text).map_err(|e| ResolveError::MalformedManifest {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

fn split_sub_artifact(artifact: &str) -> (&str, String) {
    match artifact.split_once('/') {
        Some((artifact, sub)) => (artifact, format!("-{}", sub)),
        None => (artifact, String::new()),
    }
}

fn parse_url(text: &str) -> Result<Url, ResolveError> {
    Url::parse(text).map_err(|e| ResolveError::MalformedManifest {
        source_name: text.to_string(),
        message: e.to_string(),
    })
}

/// GitHub serves release assets whose tag contains `@` only when it is
/// percent-encoded.
fn escape_github_special_characters(url: &Url) -> Url {
    let mut escaped = url.clone();
    let path = url.path().replace('@', "%40");
    escaped.set_path(&path);
    escaped
}

fn check_agreement(
    expected: &Coordinate,
    actual: &Coordinate,
    url: &str,
) -> Result<(), ResolveError> {
    if expected.group_id != actual.group_id {
        return Err(ResolveError::ManifestMismatch {
            field: "groupId",
            manifest_value: actual.group_id.clone(),
            url_value: expected.group_id.clone(),
            url: url.to_string(),
        });
    }
    if !expected.artifact_id.starts_with(&actual.artifact_id) {
        return Err(ResolveError::ManifestMismatch {
            field: "artifactId",
            manifest_value: actual.artifact_id.clone(),
            url_value: expected.artifact_id.clone(),
            url: url.to_string(),
        });
    }
    if expected.version != actual.version {
        return Err(ResolveError::ManifestMismatch {
            field: "version",
            manifest_value: actual.version.to_string(),
            url_value: expected.version.to_string(),
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Whether `name` has the shape of something a resolver could have handled.
/// Used to tell `DIDNT_EXIST` apart from `UNPARSEABLE`.
pub fn looks_resolvable(name: &str) -> bool {
    if Coordinate::try_parse(name).is_some() {
        return true;
    }
    if let Ok(url) = Url::parse(name) {
        if matches!(url.scheme(), "http" | "https" | "file") {
            return true;
        }
    }
    let path = Path::new(name);
    path.components().count() > 1
        || name.ends_with(".yml")
        || name.ends_with(".yaml")
        || path.is_absolute()
}
