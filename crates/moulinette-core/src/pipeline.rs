//! pipeline.rs — La passe de transformation, fichier par fichier.
//!
//! Séquence : dériver le chemin de l'artefact intermédiaire, invoquer le
//! compilateur sur le fichier D'ORIGINE, lire la sortie UTF-8, la supprimer
//! aussitôt, puis — si `sourceMap` — incruster la map réécrite et recoller
//! le commentaire de mapping. Chaque échec est terminal pour ce fichier et
//! remonte par `Err` ; les diagnostics compilateur, eux, sont loggés en
//! erreur et ne bloquent jamais la lecture de la sortie.
//!
//! Une passe réussie ne laisse aucun artefact derrière elle. Sur échec en
//! cours de route, les artefacts déjà écrits peuvent rester : le contrat de
//! propreté ne vaut que pour le chemin succès.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::compiler::Compiler;
use crate::descriptor::FileDescriptor;
use crate::error::Error;
use crate::options::TscOptions;
use crate::sourcemap;

const LOG_TARGET: &str = "moulinette::pipeline";

/// Suffixe des artefacts intermédiaires. Distinct de `.js` pour qu'une
/// sortie temporaire ne soit jamais confondue avec un vrai fichier projet.
pub const ARTIFACT_SUFFIX: &str = ".mln.js";

/// Chemin de sortie intermédiaire, dérivé déterministiquement du fichier
/// d'origine. Deux passes simultanées sur le MÊME fichier partageraient ce
/// chemin et se marcheraient dessus ; ce cas n'est pas supporté.
pub fn artifact_path(original: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{original}{ARTIFACT_SUFFIX}"))
}

/// Chemin de la map compagne d'une sortie intermédiaire.
pub fn map_path(out: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{out}.map"))
}

/// Compile un fichier à travers `compiler` et retourne le texte transformé.
/// Exactement une issue par appel : `Ok(texte)` ou `Err(raison)`.
///
/// `content` n'est pas ce que le compilateur lit — il travaille sur le
/// fichier d'origine. Le texte ne sert qu'à être embarqué dans la map.
pub fn compile_one(
    compiler: &dyn Compiler,
    file: &mut FileDescriptor,
    content: &str,
    opts: TscOptions,
) -> Result<String, Error> {
    let out = artifact_path(&file.original_path);
    let flags = opts.to_flags(&out);
    if opts.source_map {
        file.source_map_path = Some(map_path(&out));
    }

    compiler.compile(&file.original_path, &flags, &mut |d| {
        log::error!(target: LOG_TARGET, "{}", d.formatted());
    })?;

    let compiled = fs::read_to_string(&out).map_err(|source| Error::Read {
        path: out.clone(),
        source,
    })?;
    fs::remove_file(&out).map_err(|source| Error::Remove {
        path: out.clone(),
        source,
    })?;
    log::debug!(
        target: LOG_TARGET,
        "compilé \"{}\" ({} octets)",
        file.original_path,
        compiled.len()
    );

    if !opts.source_map {
        return Ok(compiled);
    }

    let uri = sourcemap::embed(content, file)?;
    if let Some(map_file) = &file.source_map_path {
        fs::remove_file(map_file).map_err(|source| Error::Remove {
            path: map_file.clone(),
            source,
        })?;
    }

    let stripped = sourcemap::strip_mapping_comment(&compiled);
    Ok(sourcemap::append_mapping_comment(&stripped, &uri))
}

/* ─────────────────────────── Tests ─────────────────────────── */
