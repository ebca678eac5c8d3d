//! moulinette-core — Cœur du préprocesseur TypeScript pour harnais de test.
//!
//! Intercepte les fichiers `.ts` appariés par un harnais, les passe à la
//! moulinette `tsc`, et rend le JavaScript compilé — avec, au choix, la
//! source map réécrite et incrustée en data URI auto-portant.
//!
//! ## Modules
//! - [`options`]    : options reconnues et fusion en couches (défauts < global < args).
//! - [`descriptor`] : descripteur de fichier et politique de chemin de sortie.
//! - [`diag`]       : diagnostics `tsc` (parse des lignes, gravité).
//! - [`compiler`]   : collaboration [`Compiler`] et backend [`TscBin`].
//! - [`sourcemap`]  : modèle V3, réécriture, data URI, chirurgie des commentaires.
//! - [`pipeline`]   : la passe fichier par fichier, artefacts intermédiaires compris.
//! - [`plugin`]     : fabrique, contrat [`Preprocessor`], registre.
//! - [`error`]      : l'enum d'erreurs du crate.
//!
//! Aucun état partagé mutable entre passes : le gabarit d'options fusionné
//! est figé à la construction puis cloné par fichier. Deux passes
//! simultanées sur le même fichier d'origine ne sont pas supportées, les
//! chemins d'artefacts étant déterministes.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod compiler;
pub mod descriptor;
pub mod diag;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod sourcemap;

pub use compiler::{Compiler, CompilerConfig, TscBin};
pub use descriptor::{default_transform_path, FileDescriptor, TransformPathFn};
pub use diag::{Diagnostic, Severity};
pub use error::Error;
pub use options::{OptionPatch, TscOptions};
pub use plugin::{
    HarnessConfig, PluginArgs, Preprocessor, PreprocessorFactory, Registry, TscPreprocessor,
};
pub use sourcemap::SourceMap;

/// Version du crate, lisible depuis les outils.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bannière de version pour logs et CLI.
pub fn version() -> String {
    format!("moulinette-core {VERSION}")
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_banner_names_the_crate() {
        assert!(super::version().starts_with("moulinette-core "));
    }
}
