//! Build-time Configurator
//!
//! Injects deployment endpoints and keys into the frontend sources before
//! the bundle is built. Each target file is patched by text substitution:
//! assignments of string literals to known field names get their literal
//! replaced with the value of an environment variable.
//!
//! The built-in manifest covers the endpoint configuration module and the
//! database client module; a TOML manifest can replace it:
//!
//! ```toml
//! [[targets]]
//! path = "src/config/endpoints.ts"
//!
//! [[targets.bindings]]
//! field = "apiUrl"
//! var = "API_URL"
//! kind = "url"
//!
//! [[targets.replacements]]
//! from = "http://localhost:3000"
//! to = "${API_URL}"
//! ```

pub mod patch;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a variable's value is checked before injection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Text,
    /// Absolute http(s) URL
    Url,
}

/// Field in a target file fed from an environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub field: String,
    pub var: String,
    #[serde(default)]
    pub kind: ValueKind,
}

impl Binding {
    pub fn new(field: &str, var: &str, kind: ValueKind) -> Self {
        Self {
            field: field.to_string(),
            var: var.to_string(),
            kind,
        }
    }
}

/// Plain text replacement; `to` may reference variables as `${NAME}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// A file to patch, relative to the project root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchTarget {
    pub path: PathBuf,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

/// The set of targets to patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub targets: Vec<PatchTarget>,
}

impl Default for Manifest {
    fn default() -> Self {
        use ValueKind::{Text, Url};

        Self {
            targets: vec![
                PatchTarget {
                    path: PathBuf::from("src/config/endpoints.ts"),
                    bindings: vec![
                        Binding::new("domain", "PRODUCTION_DOMAIN", Text),
                        Binding::new("apiUrl", "API_URL", Url),
                        Binding::new("evolutionApiUrl", "EVOLUTION_API_URL", Url),
                        Binding::new("evolutionApiKey", "EVOLUTION_API_KEY", Text),
                        Binding::new("instanceName", "EVOLUTION_INSTANCE_NAME", Text),
                        Binding::new("evolutionWebhookUrl", "EVOLUTION_WEBHOOK_URL", Url),
                        Binding::new("n8nUrl", "N8N_URL", Url),
                        Binding::new("n8nApiKey", "N8N_API_KEY", Text),
                        Binding::new("n8nWebhookUrl", "N8N_WEBHOOK_URL", Url),
                    ],
                    replacements: Vec::new(),
                },
                PatchTarget {
                    path: PathBuf::from("src/integrations/supabase/client.ts"),
                    bindings: vec![
                        Binding::new("SUPABASE_URL", "SUPABASE_URL", Url),
                        Binding::new("SUPABASE_PUBLISHABLE_KEY", "SUPABASE_ANON_KEY", Text),
                    ],
                    replacements: Vec::new(),
                },
            ],
        }
    }
}

impl Manifest {
    pub fn from_toml(content: &str) -> Result<Self, ConfiguratorError> {
        toml::from_str(content).map_err(|e| ConfiguratorError::Manifest(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfiguratorError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfiguratorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Every variable the manifest reads, bindings and `${NAME}` references
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for target in &self.targets {
            vars.extend(target.bindings.iter().map(|b| b.var.clone()));
            for replacement in &target.replacements {
                vars.extend(placeholders(&replacement.to));
            }
        }
        vars
    }

    fn url_variables(&self) -> BTreeSet<&str> {
        self.targets
            .iter()
            .flat_map(|t| &t.bindings)
            .filter(|b| b.kind == ValueKind::Url)
            .map(|b| b.var.as_str())
            .collect()
    }
}

/// `${NAME}` references in a replacement template
fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                names.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Snapshot of the variables a run needs. Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
}

impl BuildEnv {
    /// Capture `names` through `lookup`
    pub fn from_lookup<'a, I, F>(names: I, lookup: F) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        F: Fn(&str) -> Option<String>,
    {
        let vars = names
            .into_iter()
            .filter_map(|name| {
                lookup(name)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (name.to_string(), v))
            })
            .collect();
        Self { vars }
    }

    /// Capture the manifest's variables from the process environment
    pub fn from_process(manifest: &Manifest) -> Self {
        let names = manifest.variables();
        Self::from_lookup(names.iter().map(String::as_str), |name| {
            std::env::var(name).ok()
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Expand `${NAME}` references; None if any is unset
    fn expand(&self, template: &str) -> Option<String> {
        let mut out = template.to_string();
        for name in placeholders(template) {
            let value = self.get(&name)?;
            out = out.replace(&format!("${{{}}}", name), value);
        }
        Some(out)
    }
}

/// Run options
#[derive(Debug, Clone)]
pub struct Options {
    /// Project root the target paths are relative to
    pub root: PathBuf,
    /// Fail when a variable is unset instead of skipping it
    pub strict: bool,
    /// Report without writing
    pub dry_run: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            strict: false,
            dry_run: false,
        }
    }
}

/// Outcome for one target file
#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub path: PathBuf,
    /// (field or replaced literal, occurrences rewritten)
    pub replacements: Vec<(String, usize)>,
    pub changed: bool,
    pub written: bool,
}

impl TargetReport {
    pub fn total(&self) -> usize {
        self.replacements.iter().map(|(_, n)| n).sum()
    }
}

/// Outcome of a configurator run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub targets: Vec<TargetReport>,
    /// Variables that were not set and therefore skipped
    pub skipped: Vec<String>,
    pub dry_run: bool,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for target in &self.targets {
            let state = match (target.changed, target.written) {
                (false, _) => "unchanged",
                (true, true) => "updated",
                (true, false) => "would update",
            };
            writeln!(
                f,
                "{}: {} ({} replacements)",
                target.path.display(),
                state,
                target.total()
            )?;
            for (field, count) in &target.replacements {
                writeln!(f, "  {:<28} {}", field, count)?;
            }
        }
        if !self.skipped.is_empty() {
            writeln!(f, "skipped (unset): {}", self.skipped.join(", "))?;
        }
        if self.dry_run {
            writeln!(f, "dry run: no files written")?;
        }
        Ok(())
    }
}

/// Patches the frontend sources from a manifest
#[derive(Debug, Clone, Default)]
pub struct Configurator {
    manifest: Manifest,
    options: Options,
}

impl Configurator {
    pub fn new(manifest: Manifest, options: Options) -> Self {
        Self { manifest, options }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Check variables: URL-typed values must be http(s) URLs, and in strict
    /// mode every variable must be set. Returns the unset variables.
    pub fn validate(&self, env: &BuildEnv) -> Result<Vec<String>, ConfiguratorError> {
        for var in self.manifest.url_variables() {
            if let Some(value) = env.get(var) {
                if !is_http_url(value) {
                    return Err(ConfiguratorError::InvalidUrl {
                        var: var.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        let missing: Vec<String> = self
            .manifest
            .variables()
            .into_iter()
            .filter(|var| env.get(var).is_none())
            .collect();

        if self.options.strict && !missing.is_empty() {
            return Err(ConfiguratorError::MissingVariables(missing));
        }
        for var in &missing {
            tracing::warn!(var = %var, "Variable not set, skipping");
        }
        Ok(missing)
    }

    /// Validate, then patch every target. Nothing is written unless all
    /// targets exist and all values are valid. Changed targets are first
    /// written to sibling temp files and only renamed into place once every
    /// temp file is on disk.
    pub fn run(&self, env: &BuildEnv) -> Result<Report, ConfiguratorError> {
        let skipped = self.validate(env)?;

        let mut staged = Vec::with_capacity(self.manifest.targets.len());
        for target in &self.manifest.targets {
            let path = self.options.root.join(&target.path);
            if !path.is_file() {
                return Err(ConfiguratorError::MissingTarget(path));
            }
            let original = std::fs::read_to_string(&path).map_err(|source| {
                ConfiguratorError::Io {
                    path: path.clone(),
                    source,
                }
            })?;

            let (patched, replacements) = apply(target, &original, env)?;
            staged.push((path, target.path.clone(), original != patched, patched, replacements));
        }

        let mut report = Report {
            targets: Vec::with_capacity(staged.len()),
            skipped,
            dry_run: self.options.dry_run,
        };

        let mut pending: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (path, relative, changed, patched, replacements) in staged {
            let written = changed && !self.options.dry_run;
            if written {
                let temp = temp_path(&path);
                if let Err(source) = std::fs::write(&temp, patched) {
                    discard(&pending);
                    return Err(ConfiguratorError::Io { path: temp, source });
                }
                pending.push((temp, path.clone()));
            } else {
                tracing::debug!(path = %path.display(), changed, "Not written");
            }

            report.targets.push(TargetReport {
                path: relative,
                replacements,
                changed,
                written,
            });
        }

        for (i, (temp, path)) in pending.iter().enumerate() {
            if let Err(source) = std::fs::rename(temp, path) {
                discard(&pending[i..]);
                return Err(ConfiguratorError::Io {
                    path: path.clone(),
                    source,
                });
            }
            tracing::info!(path = %path.display(), "Patched");
        }

        Ok(report)
    }
}

/// Sibling file a target is staged in before the rename
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.crmdesk-tmp", name))
}

fn discard(pending: &[(PathBuf, PathBuf)]) {
    for (temp, _) in pending {
        if let Err(e) = std::fs::remove_file(temp) {
            tracing::warn!(path = %temp.display(), error = %e, "Failed to remove staged file");
        }
    }
}

/// Apply a target's bindings and replacements to `source`
pub fn apply(
    target: &PatchTarget,
    source: &str,
    env: &BuildEnv,
) -> Result<(String, Vec<(String, usize)>), ConfiguratorError> {
    let mut text = source.to_string();
    let mut counts = Vec::new();

    for binding in &target.bindings {
        let Some(value) = env.get(&binding.var) else {
            continue;
        };
        let (next, n) = patch::rewrite_field(&text, &binding.field, value)?;
        if n == 0 {
            tracing::warn!(
                field = %binding.field,
                path = %target.path.display(),
                "Field not found in target"
            );
        }
        text = next;
        counts.push((binding.field.clone(), n));
    }

    for replacement in &target.replacements {
        let Some(to) = env.expand(&replacement.to) else {
            continue;
        };
        let (next, n) = patch::replace_literal(&text, &replacement.from, &to);
        text = next;
        counts.push((replacement.from.clone(), n));
    }

    Ok((text, counts))
}

fn is_http_url(value: &str) -> bool {
    match reqwest::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Configurator errors
#[derive(Debug, thiserror::Error)]
pub enum ConfiguratorError {
    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target file not found: {0:?}")]
    MissingTarget(PathBuf),

    #[error("{var} must be an absolute http(s) URL, got '{value}'")]
    InvalidUrl { var: String, value: String },

    #[error("Required variables not set: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Invalid field pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const ENDPOINTS: &str = r#"export const endpoints = {
  domain: "localhost",
  apiUrl: "http://localhost:3000",
  evolutionApiUrl: "http://localhost:8080",
  evolutionApiKey: "",
  instanceName: "crm-whatsapp",
  evolutionWebhookUrl: "",
  n8nUrl: "http://localhost:5678",
  n8nApiKey: "",
  n8nWebhookUrl: "http://localhost:5678/webhook",
};
"#;

    const CLIENT: &str = r#"import { createClient } from '@supabase/supabase-js';

const SUPABASE_URL = "https://placeholder.supabase.co";
const SUPABASE_PUBLISHABLE_KEY = "placeholder";

export const supabase = createClient(SUPABASE_URL, SUPABASE_PUBLISHABLE_KEY);
"#;

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/config")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/integrations/supabase")).unwrap();
        std::fs::write(dir.path().join("src/config/endpoints.ts"), ENDPOINTS).unwrap();
        std::fs::write(dir.path().join("src/integrations/supabase/client.ts"), CLIENT).unwrap();
        dir
    }

    fn env(pairs: &[(&str, &str)]) -> BuildEnv {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        let manifest = Manifest::default();
        let names = manifest.variables();
        BuildEnv::from_lookup(names.iter().map(String::as_str), |k| {
            map.get(k).map(|v| v.to_string())
        })
    }

    fn configurator(root: &Path, strict: bool, dry_run: bool) -> Configurator {
        Configurator::new(
            Manifest::default(),
            Options {
                root: root.to_path_buf(),
                strict,
                dry_run,
            },
        )
    }

    #[test]
    fn test_patches_both_targets() {
        let dir = project();
        let env = env(&[
            ("API_URL", "https://api.crm.example.com"),
            ("EVOLUTION_API_KEY", "gw-secret"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-key"),
        ]);

        let report = configurator(dir.path(), false, false).run(&env).unwrap();
        assert_eq!(report.targets.len(), 2);
        assert!(report.targets.iter().all(|t| t.written));
        assert!(report.skipped.contains(&"N8N_URL".to_string()));

        let endpoints = std::fs::read_to_string(dir.path().join("src/config/endpoints.ts")).unwrap();
        assert!(endpoints.contains(r#"apiUrl: "https://api.crm.example.com""#));
        assert!(endpoints.contains(r#"evolutionApiKey: "gw-secret""#));
        assert!(endpoints.contains(r#"n8nUrl: "http://localhost:5678""#));

        let client =
            std::fs::read_to_string(dir.path().join("src/integrations/supabase/client.ts")).unwrap();
        assert!(client.contains(r#"const SUPABASE_URL = "https://abc.supabase.co";"#));
        assert!(client.contains(r#"const SUPABASE_PUBLISHABLE_KEY = "anon-key";"#));
        assert!(client.contains("createClient(SUPABASE_URL, SUPABASE_PUBLISHABLE_KEY)"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = project();
        let env = env(&[("API_URL", "https://api.crm.example.com")]);

        let report = configurator(dir.path(), false, true).run(&env).unwrap();
        assert!(report.targets[0].changed);
        assert!(!report.targets[0].written);
        assert!(report.to_string().contains("would update"));

        let endpoints = std::fs::read_to_string(dir.path().join("src/config/endpoints.ts")).unwrap();
        assert_eq!(endpoints, ENDPOINTS);
    }

    #[test]
    fn test_unchanged_file_not_rewritten() {
        let dir = project();
        let env = env(&[("N8N_URL", "http://localhost:5678")]);

        let report = configurator(dir.path(), false, false).run(&env).unwrap();
        assert_eq!(report.targets[0].total(), 1);
        assert!(!report.targets[0].changed);
        assert!(!report.targets[0].written);
    }

    #[test]
    fn test_strict_requires_all_variables() {
        let dir = project();
        let env = env(&[("API_URL", "https://api.crm.example.com")]);

        let err = configurator(dir.path(), true, false).run(&env).unwrap_err();
        match err {
            ConfiguratorError::MissingVariables(vars) => assert!(vars.contains(&"SUPABASE_URL".to_string())),
            other => panic!("unexpected error {:?}", other),
        }

        // nothing touched
        let endpoints = std::fs::read_to_string(dir.path().join("src/config/endpoints.ts")).unwrap();
        assert_eq!(endpoints, ENDPOINTS);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let dir = project();
        let env = env(&[("EVOLUTION_API_URL", "gw.example.com:8080")]);

        let err = configurator(dir.path(), false, false).run(&env).unwrap_err();
        assert!(matches!(err, ConfiguratorError::InvalidUrl { ref var, .. } if var == "EVOLUTION_API_URL"));
    }

    #[test]
    fn test_missing_target_is_error() {
        let dir = project();
        std::fs::remove_file(dir.path().join("src/integrations/supabase/client.ts")).unwrap();

        let err = configurator(dir.path(), false, false)
            .run(&env(&[("API_URL", "https://a.example.com")]))
            .unwrap_err();
        assert!(matches!(err, ConfiguratorError::MissingTarget(_)));

        // the first target was not written either
        let endpoints = std::fs::read_to_string(dir.path().join("src/config/endpoints.ts")).unwrap();
        assert_eq!(endpoints, ENDPOINTS);
    }

    #[test]
    fn test_failed_staging_leaves_every_target_untouched() {
        let dir = project();
        let client = dir.path().join("src/integrations/supabase/client.ts");
        std::fs::create_dir(temp_path(&client)).unwrap();

        let err = configurator(dir.path(), false, false)
            .run(&env(&[
                ("API_URL", "https://a.example.com"),
                ("SUPABASE_URL", "https://abc.supabase.co"),
            ]))
            .unwrap_err();
        assert!(matches!(err, ConfiguratorError::Io { .. }));

        let endpoints_path = dir.path().join("src/config/endpoints.ts");
        assert_eq!(std::fs::read_to_string(&endpoints_path).unwrap(), ENDPOINTS);
        assert_eq!(std::fs::read_to_string(&client).unwrap(), CLIENT);
        assert!(!temp_path(&endpoints_path).exists());
    }

    #[test]
    fn test_manifest_with_replacements() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("app.js"),
            "fetch('http://localhost:3000/api/health'); const key = '';\n",
        )
        .unwrap();

        let manifest = Manifest::from_toml(
            r#"
[[targets]]
path = "app.js"

[[targets.bindings]]
field = "key"
var = "APP_KEY"

[[targets.replacements]]
from = "http://localhost:3000"
to = "${API_URL}"
"#,
        )
        .unwrap();
        assert_eq!(
            manifest.variables().into_iter().collect::<Vec<_>>(),
            vec!["API_URL".to_string(), "APP_KEY".to_string()]
        );

        let env = BuildEnv::from_lookup(["API_URL", "APP_KEY"], |k| match k {
            "API_URL" => Some("https://crm.example.com".to_string()),
            "APP_KEY" => Some("it's".to_string()),
            _ => None,
        });

        let report = Configurator::new(
            manifest,
            Options {
                root: dir.path().to_path_buf(),
                ..Options::default()
            },
        )
        .run(&env)
        .unwrap();
        assert_eq!(report.targets[0].total(), 2);

        let out = std::fs::read_to_string(dir.path().join("app.js")).unwrap();
        assert_eq!(
            out,
            "fetch('https://crm.example.com/api/health'); const key = 'it\\'s';\n"
        );
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let env = BuildEnv::from_lookup(["A", "B"], |k| match k {
            "A" => Some("  ".to_string()),
            _ => Some("b".to_string()),
        });
        assert!(env.get("A").is_none());
        assert_eq!(env.get("B"), Some("b"));
    }

    #[test]
    fn test_bad_manifest() {
        assert!(matches!(
            Manifest::from_toml("targets = 3"),
            Err(ConfiguratorError::Manifest(_))
        ));
    }
}
