use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const SOLVER_EXTENSION: &str = "solve";

const ADD_SOLVER: &str = "depth 1\npattern add\ninput z\ncase i2 i4\ncase i3 i6\n";

const GRAVITY_SOLVER: &str = "
# G((m1 * m2) / (r ^ 2))

depth 4

precision D1E2

constant D6.67408E-11 # Gravitational constant
constant D2E0

pattern mul
pattern div
pattern exp

input m1
input m2
input d

# Earth mass, moon mass, distance, newtons
case D5.972E24 D7.34767309E22 D3.8E8 D2.028121E20";

/// A named solver specification. The body is passed to the controller
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSpec {
    pub name: String,
    pub text: String,
}

impl SolverSpec {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read solver directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("failed to read solver file {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no solver named '{name}' in catalog")]
    NotFound { name: String },
}

/// Static, ordered list of solver specs, unique by name. Supplied when the
/// console starts and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverCatalog {
    specs: Vec<SolverSpec>,
}

impl SolverCatalog {
    /// Keeps the first spec for each name; later duplicates are dropped.
    pub fn from_specs(specs: impl IntoIterator<Item = SolverSpec>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for spec in specs {
            if !seen.insert(spec.name.clone()) {
                warn!(event = "solver_duplicate_name", name = %spec.name);
                continue;
            }
            unique.push(spec);
        }
        Self { specs: unique }
    }

    pub fn builtin() -> Self {
        Self::from_specs([
            SolverSpec::new("add", ADD_SOLVER),
            SolverSpec::new("gravity", GRAVITY_SOLVER),
        ])
    }

    /// Loads every `*.solve` file in `dir`, named by file stem and ordered by
    /// name.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let entries = fs::read_dir(dir).map_err(|source| CatalogError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(SOLVER_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            files.push((name.to_string(), path));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut specs = Vec::with_capacity(files.len());
        for (name, path) in files {
            let text = fs::read_to_string(&path)
                .map_err(|source| CatalogError::ReadFile { path, source })?;
            specs.push(SolverSpec { name, text });
        }
        Ok(Self::from_specs(specs))
    }

    pub fn get(&self, name: &str) -> Option<&SolverSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn first(&self) -> Option<&SolverSpec> {
        self.specs.first()
    }

    pub fn specs(&self) -> &[SolverSpec] {
        &self.specs
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Catalog plus the solver text currently staged for the next `reset`.
#[derive(Debug, Clone)]
pub struct SolverSelector {
    catalog: SolverCatalog,
    staged_text: String,
    selected: Option<String>,
    edited: bool,
}

impl SolverSelector {
    pub fn new(catalog: SolverCatalog) -> Self {
        let (selected, staged_text) = match catalog.first() {
            Some(spec) => (Some(spec.name.clone()), spec.text.clone()),
            None => (None, String::new()),
        };
        Self {
            catalog,
            staged_text,
            selected,
            edited: false,
        }
    }

    /// Stages the text of the catalog entry named exactly `name`. On a miss the
    /// staged text is left alone.
    pub fn select_by_name(&mut self, name: &str) -> Result<&SolverSpec, SelectError> {
        let Some(spec) = self.catalog.get(name) else {
            return Err(SelectError::NotFound {
                name: name.to_string(),
            });
        };
        self.staged_text = spec.text.clone();
        self.selected = Some(spec.name.clone());
        self.edited = false;
        Ok(spec)
    }

    pub fn edit_staged_text(&mut self, text: impl Into<String>) {
        self.staged_text = text.into();
        self.edited = true;
    }

    pub fn staged_text(&self) -> &str {
        &self.staged_text
    }

    /// Name of the catalog entry last selected, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Whether the staged text was edited by hand since the last selection.
    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn catalog(&self) -> &SolverCatalog {
        &self.catalog
    }
}

/// Read-only digest of solver text, for preview next to the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverSummary {
    pub depth: Option<u32>,
    pub precision: Option<String>,
    pub patterns: Vec<String>,
    pub inputs: Vec<String>,
    pub constants: usize,
    pub cases: usize,
    pub unrecognized: usize,
}

impl SolverSummary {
    pub fn parse(text: &str) -> Self {
        let mut summary = SolverSummary::default();
        for raw in text.lines() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let (keyword, rest) = match line.split_once(char::is_whitespace) {
                Some((keyword, rest)) => (keyword, rest.trim()),
                None => (line, ""),
            };
            match keyword {
                "depth" => match rest.parse::<u32>() {
                    Ok(depth) => summary.depth = Some(depth),
                    Err(_) => summary.unrecognized += 1,
                },
                "precision" if !rest.is_empty() => summary.precision = Some(rest.to_string()),
                "pattern" if !rest.is_empty() => summary.patterns.push(rest.to_string()),
                "input" if !rest.is_empty() => summary.inputs.push(rest.to_string()),
                "constant" if !rest.is_empty() => summary.constants += 1,
                "case" if !rest.is_empty() => summary.cases += 1,
                _ => summary.unrecognized += 1,
            }
        }
        summary
    }

    /// Number of units the controller will enumerate: one per arrangement of
    /// patterns across the search depth.
    pub fn unit_count(&self) -> Option<u64> {
        let depth = self.depth?;
        Some((self.patterns.len() as u64).saturating_pow(depth))
    }
}
