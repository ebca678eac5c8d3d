//! plugin.rs — Fabrique du préprocesseur et registre côté harnais.
//!
//! Le harnais construit le préprocesseur UNE fois par run à partir de sa
//! configuration globale et des arguments d'invocation, puis appelle
//! `process` pour chaque fichier apparié. La fusion des options suit
//! défauts < bloc global < arguments ; la politique de chemin suit
//! arguments > bloc global > défaut (remplacement du suffixe `.ts`).
//!
//! Contrat de complétion : exactement une issue par invocation. `process`
//! retourne un `Result` ; `process_with` transmet ce même résultat au
//! callback `done`, succès comme échec.

use std::collections::BTreeMap;
use std::fmt;

use crate::compiler::{Compiler, CompilerConfig, TscBin};
use crate::descriptor::{default_policy, FileDescriptor, TransformPathFn};
use crate::error::Error;
use crate::options::{OptionPatch, TscOptions};
use crate::pipeline;

const LOG_TARGET: &str = "moulinette::preprocessor";

/// Contrat côté harnais : un préprocesseur nommé, appelé une fois par
/// fichier apparié. Objet-sûr, pour vivre dans le [`Registry`].
pub trait Preprocessor: Send + Sync {
    /// Nom sous lequel le préprocesseur est enregistré.
    fn name(&self) -> &str;

    /// Transforme `content` et mute le descripteur en place (chemin de
    /// sortie, champs map).
    fn process(&self, content: &str, file: &mut FileDescriptor) -> Result<String, Error>;
}

/// Arguments d'invocation du plugin (la couche la plus forte).
#[derive(Clone, Default)]
pub struct PluginArgs {
    pub options: OptionPatch,
    pub transform_path: Option<TransformPathFn>,
}

impl fmt::Debug for PluginArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginArgs")
            .field("options", &self.options)
            .field("transform_path", &self.transform_path.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Bloc de configuration global du harnais.
#[derive(Clone, Default)]
pub struct HarnessConfig {
    pub options: OptionPatch,
    pub transform_path: Option<TransformPathFn>,
    pub compiler: CompilerConfig,
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("options", &self.options)
            .field("transform_path", &self.transform_path.as_ref().map(|_| "<fn>"))
            .field("compiler", &self.compiler)
            .finish()
    }
}

/// Le préprocesseur TypeScript : options fusionnées figées pour le run,
/// politique de chemin résolue, backend compilateur injectable.
pub struct TscPreprocessor {
    options: TscOptions,
    transform_path: TransformPathFn,
    compiler: Box<dyn Compiler + Send + Sync>,
}

impl TscPreprocessor {
    /// Fabrique standard : backend `tsc` construit depuis `config.compiler`.
    pub fn new(args: PluginArgs, config: &HarnessConfig) -> Self {
        let compiler = Box::new(TscBin::new(&config.compiler));
        Self::with_compiler(args, config, compiler)
    }

    /// Variante à backend injecté (tests, harnais embarquant son
    /// compilateur).
    pub fn with_compiler(
        args: PluginArgs,
        config: &HarnessConfig,
        compiler: Box<dyn Compiler + Send + Sync>,
    ) -> Self {
        let options = TscOptions::merged(&config.options, &args.options);
        let transform_path = args
            .transform_path
            .or_else(|| config.transform_path.clone())
            .unwrap_or_else(default_policy);
        Self {
            options,
            transform_path,
            compiler,
        }
    }

    /// Options effectives après fusion. Figées : chaque passe en reçoit un
    /// clone, rien ne les mute après construction.
    pub fn options(&self) -> &TscOptions {
        &self.options
    }

    /// Variante callback du contrat : `done` est invoqué exactement une
    /// fois, avec le succès ou l'échec de la passe.
    pub fn process_with<F>(&self, content: &str, file: &mut FileDescriptor, done: F)
    where
        F: FnOnce(Result<String, Error>),
    {
        done(self.process(content, file));
    }
}

impl Preprocessor for TscPreprocessor {
    fn name(&self) -> &str {
        "typescript"
    }

    fn process(&self, content: &str, file: &mut FileDescriptor) -> Result<String, Error> {
        log::debug!(target: LOG_TARGET, "préprocession de \"{}\"", file.original_path);
        file.path = (self.transform_path)(&file.original_path);

        // Copie par passe : le gabarit fusionné reste intact pour les
        // fichiers suivants.
        let opts = self.options.clone();

        pipeline::compile_one(self.compiler.as_ref(), file, content, opts).map_err(|e| {
            log::error!(target: LOG_TARGET, "{e}\n  at {}", file.original_path);
            e
        })
    }
}

/* ─────────────────────────── Registre ─────────────────────────── */

/// Fabrique enregistrable : construit un préprocesseur depuis les arguments
/// d'invocation et la configuration globale du harnais.
pub type PreprocessorFactory = fn(PluginArgs, &HarnessConfig) -> Box<dyn Preprocessor>;

/// Registre nom → fabrique. `BTreeMap` pour un ordre d'énumération stable.
pub struct Registry {
    entries: BTreeMap<String, PreprocessorFactory>,
}

impl Registry {
    /// Registre vide.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registre garni des préprocesseurs embarqués (`typescript`).
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("typescript", |args, config| {
            Box::new(TscPreprocessor::new(args, config))
        });
        reg
    }

    pub fn register(&mut self, name: impl Into<String>, factory: PreprocessorFactory) {
        self.entries.insert(name.into(), factory);
    }

    /// Construit le préprocesseur `name`, ou `None` s'il est inconnu.
    pub fn create(
        &self,
        name: &str,
        args: PluginArgs,
        config: &HarnessConfig,
    ) -> Option<Box<dyn Preprocessor>> {
        self.entries.get(name).map(|factory| factory(args, config))
    }

    /// Noms enregistrés, triés.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
