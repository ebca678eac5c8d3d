//! error.rs — Erreurs du préprocesseur.
//!
//! Un seul enum pour tout le crate : chaque variante nomme l'opération qui a
//! échoué (lancement du compilateur, lecture d'artefact, source map…) et le
//! chemin concerné quand il y en a un. Les diagnostics de compilation n'en
//! font PAS partie : ils remontent par le canal dédié et ne terminent jamais
//! une passe.

use std::io;
use std::time::Duration;

use camino::Utf8PathBuf;

/// Erreur d'une passe de préprocession.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Le binaire compilateur n'a pas pu être lancé.
    #[error("lancement de `{bin}` impossible : {source}")]
    Spawn {
        bin: String,
        #[source]
        source: io::Error,
    },

    /// Le compilateur n'a pas rendu la main dans le délai imparti.
    #[error("`{bin}` n'a pas terminé en {limit:?}, processus tué")]
    Timeout { bin: String, limit: Duration },

    /// Lecture d'un artefact intermédiaire (sortie compilée ou map).
    #[error("lecture de {path} : {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// Suppression d'un artefact intermédiaire.
    #[error("suppression de {path} : {source}")]
    Remove {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// `sourceMap` actif mais aucun chemin de map posé sur le descripteur.
    #[error("aucun chemin de source map sur le descripteur")]
    MapPathMissing,

    /// La map émise par le compilateur n'est pas du JSON exploitable.
    #[error("source map {path} : JSON invalide : {source}")]
    MapParse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Sérialisation de la map réécrite (ne devrait jamais arriver).
    #[error("sérialisation de la source map : {source}")]
    MapSerialize {
        #[source]
        source: serde_json::Error,
    },
}

/* ─────────────────────────── Tests ─────────────────────────── */
