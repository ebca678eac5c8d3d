//! sourcemap.rs — Source maps V3 : réécriture, data URI, chirurgie des
//! commentaires de mapping.
//!
//! La map émise par `tsc` référence le fichier intermédiaire ; on la réécrit
//! pour qu'elle se suffise à elle-même au débogage : la première source
//! redevient le nom de base du fichier d'origine et son texte intégral est
//! embarqué dans `sourcesContent`. Le tout part en
//! `data:application/json;charset=utf-8;base64,…` accroché en commentaire à
//! la fin du texte compilé.

use std::fs;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::descriptor::FileDescriptor;
use crate::error::Error;

/// Préfixe du data URI embarquant la map.
pub const DATA_URI_PREFIX: &str = "data:application/json;charset=utf-8;base64,";

/// Source map V3. Champs camelCase sur le fil ; champs inconnus tolérés en
/// lecture, champs vides omis en écriture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
}

impl SourceMap {
    /// Réécrit la map pour l'incrustation : la première source devient le
    /// nom de base du fichier d'origine, son texte intégral est embarqué, et
    /// `file` pointe sur le nom de base de la sortie transformée. Les
    /// `mappings` ne bougent pas.
    pub fn rewrite_for_embed(
        &mut self,
        original_path: &Utf8Path,
        content: &str,
        out_path: &Utf8Path,
    ) {
        let original = base_name(original_path);
        if self.sources.is_empty() {
            self.sources.push(original);
        } else {
            self.sources[0] = original;
        }
        self.sources_content = Some(vec![content.to_string()]);
        self.file = Some(base_name(out_path));
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|source| Error::MapSerialize { source })
    }

    /// Sérialise la map en data URI auto-portant.
    pub fn to_data_uri(&self) -> Result<String, Error> {
        Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(self.to_json()?)))
    }
}

/// Lit la map intermédiaire du descripteur, la réécrit, la range sur le
/// descripteur et retourne le data URI. Toute erreur de lecture ou de parse
/// est fatale pour la passe.
pub fn embed(content: &str, file: &mut FileDescriptor) -> Result<String, Error> {
    let map_path = file.source_map_path.clone().ok_or(Error::MapPathMissing)?;
    let text = fs::read_to_string(&map_path).map_err(|source| Error::Read {
        path: map_path.clone(),
        source,
    })?;
    let mut map: SourceMap = serde_json::from_str(&text).map_err(|source| Error::MapParse {
        path: map_path.clone(),
        source,
    })?;

    map.rewrite_for_embed(&file.original_path, content, &file.path);
    let uri = map.to_data_uri()?;
    file.source_map = Some(map);
    Ok(uri)
}

/// Retire du texte compilé la PREMIÈRE référence `//# sourceMappingURL=` qui
/// pointe vers un fichier `.js.map` (insensible à la casse, fin de ligne
/// optionnelle). Un data URI déjà incrusté n'est pas visé, les occurrences
/// suivantes non plus.
pub fn strip_mapping_comment(text: &str) -> String {
    const NEEDLE: &str = "//# sourcemappingurl=";
    const SUFFIX: &str = ".js.map";

    // minuscules ASCII : les longueurs d'octets restent alignées sur `text`
    let lower = text.to_ascii_lowercase();
    let Some(start) = lower.find(NEEDLE) else {
        return text.to_string();
    };

    // L'URL s'arrête à la fin de ligne et doit se terminer par `.js.map` ;
    // en cas d'occurrences multiples sur la ligne, la dernière fait foi.
    let rest = &lower[start..];
    let line_len = rest.find(['\r', '\n']).unwrap_or(rest.len());
    let line = &rest[..line_len];
    let rel = match line.rfind(SUFFIX) {
        Some(r) if r > NEEDLE.len() => r,
        _ => return text.to_string(),
    };

    let mut cut_end = start + rel + SUFFIX.len();
    let bytes = text.as_bytes();
    if cut_end < bytes.len() && bytes[cut_end] == b'\r' {
        cut_end += 1;
    }
    if cut_end < bytes.len() && bytes[cut_end] == b'\n' {
        cut_end += 1;
    }
    format!("{}{}", &text[..start], &text[cut_end..])
}

/// Accroche le commentaire de mapping final. Préfixe historique `//@`,
/// conservé pour les harnais et navigateurs qui s'y attendent encore.
pub fn append_mapping_comment(text: &str, uri: &str) -> String {
    format!("{text}\n//@ sourceMappingURL={uri}\n")
}

fn base_name(path: &Utf8Path) -> String {
    path.file_name().unwrap_or(path.as_str()).to_string()
}

/* ─────────────────────────── Tests ─────────────────────────── */
