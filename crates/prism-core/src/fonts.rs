//! Process-wide font registry.
//!
//! Built once at start-up from `[fonts]` and shared read-only by every
//! request. Requests name fonts by alias (`Roboto-Bold`); the registry maps
//! the alias to the face's real family name and weight so the text layer can
//! select it. A listed face that cannot be loaded is a start-up error, never
//! a per-request surprise.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use usvg::fontdb::{Database, Source};

use crate::config::Config;
use crate::error::FontError;

/// Family and weight a font name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFace {
    pub family: String,
    pub weight: u16,
}

impl ResolvedFace {
    fn regular(family: &str) -> Self {
        Self {
            family: family.to_string(),
            weight: 400,
        }
    }
}

/// Read-only font lookup shared across requests.
pub struct FontRegistry {
    db: Arc<Database>,
    aliases: HashMap<String, ResolvedFace>,
    default_alias: String,
}

impl FontRegistry {
    /// Load every configured face from the font directory.
    ///
    /// With `require_all`, any missing or unusable file aborts start-up;
    /// otherwise the face is skipped with a warning.
    pub fn load(config: &Config) -> Result<Self, FontError> {
        let fonts = &config.fonts;
        let dir = config.font_dir();
        let mut db = Database::new();
        if fonts.load_system_fonts {
            db.load_system_fonts();
        }

        let mut aliases = HashMap::new();
        for face in &fonts.faces {
            let path = dir.join(&face.file);
            match Self::load_face(&mut db, &face.alias, &path) {
                Ok(resolved) => {
                    tracing::debug!(
                        "Font '{}' -> {} ({})",
                        face.alias,
                        resolved.family,
                        resolved.weight
                    );
                    aliases.insert(face.alias.clone(), resolved);
                }
                Err(e) if fonts.require_all => return Err(e),
                Err(e) => tracing::warn!("Skipping font: {e}"),
            }
        }

        tracing::info!(
            "Font registry ready: {} alias(es), {} face(s)",
            aliases.len(),
            db.len()
        );

        Ok(Self {
            db: Arc::new(db),
            aliases,
            default_alias: config.defaults.font_family.clone(),
        })
    }

    /// A registry with no faces. Text still lays out, but draws no glyphs.
    pub fn empty(default_alias: &str) -> Self {
        Self {
            db: Arc::new(Database::new()),
            aliases: HashMap::new(),
            default_alias: default_alias.to_string(),
        }
    }

    fn load_face(db: &mut Database, alias: &str, path: &Path) -> Result<ResolvedFace, FontError> {
        if !path.is_file() {
            return Err(FontError::Missing {
                alias: alias.to_string(),
                path: path.to_path_buf(),
            });
        }
        let data = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let ids = db.load_font_source(Source::Binary(Arc::new(data)));
        let face = ids
            .first()
            .and_then(|id| db.face(*id))
            .and_then(|info| {
                let (family, _) = info.families.first()?;
                Some(ResolvedFace {
                    family: family.clone(),
                    weight: info.weight.0,
                })
            });

        face.ok_or_else(|| FontError::Unusable {
            alias: alias.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Resolve a requested font name.
    ///
    /// Aliases win; otherwise a loaded family of that name is used as-is.
    /// Unknown names fall back to the default alias.
    pub fn resolve(&self, name: &str) -> ResolvedFace {
        if let Some(face) = self.aliases.get(name) {
            return face.clone();
        }
        if self.has_family(name) {
            return ResolvedFace::regular(name);
        }
        if let Some(face) = self.aliases.get(&self.default_alias) {
            tracing::warn!("Unknown font '{name}', using '{}'", self.default_alias);
            return face.clone();
        }
        ResolvedFace::regular(name)
    }

    fn has_family(&self, name: &str) -> bool {
        self.db.faces().any(|face| {
            face.families
                .iter()
                .any(|(family, _)| family.eq_ignore_ascii_case(name))
        })
    }

    /// Shared handle to the underlying database for text layout.
    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    /// Registered aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of loaded faces.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("aliases", &self.aliases)
            .field("faces", &self.db.len())
            .finish()
    }
}
