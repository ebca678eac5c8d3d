//! options.rs — Options du préprocesseur et leur fusion en couches.
//!
//! Trois couches, de la plus faible à la plus forte :
//! défauts intégrés, puis bloc de configuration global, puis arguments
//! d'invocation. Chaque couche au-dessus des défauts est un [`OptionPatch`]
//! (tout en `Option`) appliqué clé par clé : la dernière couche qui définit
//! une clé a le dernier mot, les clés non définies laissent la valeur en
//! place.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Options effectives d'une passe de compilation.
///
/// Le gabarit est figé à la construction du préprocesseur puis cloné à
/// chaque passe ; rien ne le mute après coup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TscOptions {
    /// Sortie sans enrobage de module. Héritée du préprocesseur historique ;
    /// `tsc` n'a pas d'équivalent, l'option est acceptée mais n'émet aucun
    /// drapeau.
    pub bare: bool,
    /// Émettre une source map et l'incruster en data URI (`--sourceMap`).
    pub source_map: bool,
    /// Version de langage cible (`--target`).
    pub target: Option<String>,
    /// Format d'émission des modules (`--module`).
    pub module: Option<String>,
    /// Refuser les `any` implicites (`--noImplicitAny`).
    pub no_implicit_any: bool,
    /// Retirer les commentaires de la sortie (`--removeComments`).
    pub remove_comments: bool,
}

impl Default for TscOptions {
    fn default() -> Self {
        Self {
            bare: true,
            source_map: false,
            target: None,
            module: None,
            no_implicit_any: false,
            remove_comments: false,
        }
    }
}

/// Surcouche partielle d'options : seules les clés définies écrasent.
///
/// Sur le fil (TOML, JSON) les clés sont en camelCase, comme les options
/// `tsc` qu'elles reflètent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionPatch {
    pub bare: Option<bool>,
    pub source_map: Option<bool>,
    pub target: Option<String>,
    pub module: Option<String>,
    pub no_implicit_any: Option<bool>,
    pub remove_comments: Option<bool>,
}

impl TscOptions {
    /// Applique une surcouche : chaque clé définie du patch écrase la valeur
    /// courante, les autres restent intactes.
    pub fn apply(&mut self, patch: &OptionPatch) {
        if let Some(v) = patch.bare {
            self.bare = v;
        }
        if let Some(v) = patch.source_map {
            self.source_map = v;
        }
        if let Some(v) = &patch.target {
            self.target = Some(v.clone());
        }
        if let Some(v) = &patch.module {
            self.module = Some(v.clone());
        }
        if let Some(v) = patch.no_implicit_any {
            self.no_implicit_any = v;
        }
        if let Some(v) = patch.remove_comments {
            self.remove_comments = v;
        }
    }

    /// Fusion complète : défauts intégrés, puis `global`, puis `args`.
    pub fn merged(global: &OptionPatch, args: &OptionPatch) -> Self {
        let mut opts = Self::default();
        opts.apply(global);
        opts.apply(args);
        opts
    }

    /// Assemble la ligne de commande `tsc` pour une sortie forcée vers `out`.
    ///
    /// Chaque drapeau et chaque valeur forme son propre jeton d'argv ; une
    /// option absente n'émet rien du tout.
    pub fn to_flags(&self, out: &Utf8Path) -> Vec<String> {
        let mut flags = vec!["--outFile".to_string(), out.to_string()];
        if self.source_map {
            flags.push("--sourceMap".into());
        }
        if let Some(target) = &self.target {
            flags.push("--target".into());
            flags.push(target.clone());
        }
        if let Some(module) = &self.module {
            flags.push("--module".into());
            flags.push(module.clone());
        }
        if self.no_implicit_any {
            flags.push("--noImplicitAny".into());
        }
        if self.remove_comments {
            flags.push("--removeComments".into());
        }
        flags
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
