//! descriptor.rs — Descripteur de fichier et politique de chemin de sortie.
//!
//! Le harnais présente chaque fichier apparié sous forme de descripteur ; le
//! préprocesseur le mute en place : `path` reçoit le chemin de sortie dès le
//! début de la passe, les champs map sont renseignés si l'incrustation a
//! lieu. `original_path` est l'identité d'entrée et n'est jamais touché.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::sourcemap::SourceMap;

/// Politique de réécriture du chemin de sortie, partageable entre passes.
pub type TransformPathFn = Arc<dyn Fn(&Utf8Path) -> Utf8PathBuf + Send + Sync>;

/// Un fichier en cours de transformation, vu du harnais.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Chemin d'origine du fichier apparié. Jamais muté.
    pub original_path: Utf8PathBuf,
    /// Chemin de sortie, posé par la politique de transformation.
    pub path: Utf8PathBuf,
    /// Chemin de la map intermédiaire (renseigné si `sourceMap` est actif).
    pub source_map_path: Option<Utf8PathBuf>,
    /// Map réécrite, gardée pour introspection côté harnais.
    pub source_map: Option<SourceMap>,
}

impl FileDescriptor {
    /// Descripteur neuf : `path` démarre sur le chemin d'origine, la
    /// politique de transformation le remplacera en début de passe.
    pub fn new(original: impl Into<Utf8PathBuf>) -> Self {
        let original_path = original.into();
        Self {
            path: original_path.clone(),
            original_path,
            source_map_path: None,
            source_map: None,
        }
    }
}

/// Politique par défaut : remplace un suffixe final `.ts` (sensible à la
/// casse) par `.js` ; tout autre chemin est rendu tel quel.
pub fn default_transform_path(path: &Utf8Path) -> Utf8PathBuf {
    match path.as_str().strip_suffix(".ts") {
        Some(stem) => Utf8PathBuf::from(format!("{stem}.js")),
        None => path.to_path_buf(),
    }
}

/// La politique par défaut sous forme partageable.
pub(crate) fn default_policy() -> TransformPathFn {
    Arc::new(default_transform_path)
}

/* ─────────────────────────── Tests ─────────────────────────── */
