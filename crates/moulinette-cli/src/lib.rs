//! moulinette-cli — passer des fichiers TypeScript à la moulinette depuis le
//! shell.
//!
//! Sous-commandes :
//! - `process` : compile des fichiers `.ts` (source maps incrustées au choix)
//! - `options` : affiche les options effectives après fusion
//!
//! La configuration globale vient d'un `moulinette.toml` optionnel (tables
//! `[options]` et `[compiler]`) ; les drapeaux de la ligne de commande
//! jouent le rôle des arguments d'invocation et ont le dernier mot.

use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use moulinette_core::{
    CompilerConfig, FileDescriptor, HarnessConfig, OptionPatch, PluginArgs, Preprocessor,
    TscPreprocessor,
};

/* ─────────────────────────── CLI ─────────────────────────── */

#[derive(Parser, Debug)]
#[command(
    name = "moulinette",
    version,
    about = "Préprocesseur TypeScript pour harnais de test"
)]
struct Cli {
    /// Fichier de configuration globale
    #[arg(long, global = true, default_value = "moulinette.toml")]
    config: Utf8PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile des fichiers .ts et écrit le résultat transformé
    Process {
        /// Fichiers source à transformer
        #[arg(required = true)]
        files: Vec<Utf8PathBuf>,

        #[command(flatten)]
        flags: CompileFlags,

        /// Écrit les sorties dans ce dossier (défaut : à côté des sources)
        #[arg(long)]
        out_dir: Option<Utf8PathBuf>,

        /// Écrit les sorties sur stdout au lieu du disque
        #[arg(long)]
        stdout: bool,
    },
    /// Affiche les options effectives après fusion (défauts < fichier < drapeaux)
    Options {
        #[command(flatten)]
        flags: CompileFlags,
    },
}

/// Drapeaux partagés. Chacun ne surcharge la configuration que s'il est
/// effectivement fourni.
#[derive(Args, Debug, Default, Clone)]
struct CompileFlags {
    /// Émettre et incruster la source map
    #[arg(long)]
    source_map: bool,

    /// Version de langage cible (ex. ES2020)
    #[arg(long)]
    target: Option<String>,

    /// Format des modules (ex. commonjs, amd, system)
    #[arg(long)]
    module: Option<String>,

    /// Refuser les `any` implicites
    #[arg(long)]
    no_implicit_any: bool,

    /// Retirer les commentaires de la sortie
    #[arg(long)]
    remove_comments: bool,

    /// Binaire tsc à invoquer (sinon $MOULINETTE_TSC, sinon le PATH)
    #[arg(long)]
    tsc: Option<String>,

    /// Délai maximal par invocation (ex. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
}

impl CompileFlags {
    /// Un drapeau booléen absent ne vaut pas « false » : il ne surcharge
    /// rien du tout.
    fn to_patch(&self) -> OptionPatch {
        OptionPatch {
            bare: None,
            source_map: self.source_map.then_some(true),
            target: self.target.clone(),
            module: self.module.clone(),
            no_implicit_any: self.no_implicit_any.then_some(true),
            remove_comments: self.remove_comments.then_some(true),
        }
    }
}

/* ─────────────────────────── Configuration ─────────────────────────── */

/// `moulinette.toml` — configuration globale optionnelle.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    options: OptionPatch,
    compiler: CompilerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompilerSection {
    /// Binaire tsc
    tsc: Option<String>,
    /// Délai maximal, syntaxe humantime ("30s", "2m"…)
    timeout: Option<String>,
}

/// Charge le fichier de configuration s'il existe ; absent = config vide.
fn load_config(path: &Utf8Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let text = fs::read_to_string(path).with_context(|| format!("lecture de {path}"))?;
    toml::from_str(&text).with_context(|| format!("TOML invalide dans {path}"))
}

/// Assemble la configuration harnais et les arguments d'invocation depuis
/// le fichier et les drapeaux.
fn assemble(config_path: &Utf8Path, flags: &CompileFlags) -> Result<(HarnessConfig, PluginArgs)> {
    let file = load_config(config_path)?;

    let timeout = match (flags.timeout, &file.compiler.timeout) {
        (Some(t), _) => Some(t),
        (None, Some(text)) => Some(
            humantime::parse_duration(text)
                .with_context(|| format!("durée invalide dans {config_path} : {text:?}"))?,
        ),
        (None, None) => None,
    };

    // Résolution du binaire : drapeau > fichier > $MOULINETTE_TSC > PATH.
    let mut compiler = CompilerConfig::default();
    if let Some(bin) = file.compiler.tsc {
        compiler.tsc_bin = Some(bin);
    }
    if let Some(bin) = flags.tsc.clone() {
        compiler.tsc_bin = Some(bin);
    }
    compiler.timeout = timeout;

    let config = HarnessConfig {
        options: file.options,
        transform_path: None,
        compiler,
    };
    let args = PluginArgs {
        options: flags.to_patch(),
        transform_path: None,
    };
    Ok((config, args))
}

/* ─────────────────────────── Commandes ─────────────────────────── */

/// Point d'entrée du binaire (appelé par `src/main.rs`).
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Process {
            files,
            flags,
            out_dir,
            stdout,
        } => cmd_process(&cli.config, &files, &flags, out_dir.as_deref(), stdout),
        Cmd::Options { flags } => cmd_options(&cli.config, &flags),
    }
}

fn cmd_process(
    config_path: &Utf8Path,
    files: &[Utf8PathBuf],
    flags: &CompileFlags,
    out_dir: Option<&Utf8Path>,
    to_stdout: bool,
) -> Result<()> {
    let (config, args) = assemble(config_path, flags)?;
    let pp = TscPreprocessor::new(args, &config);

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir).with_context(|| format!("création de {dir}"))?;
    }

    let mut failed = 0usize;
    for src in files {
        let content = match fs::read_to_string(src) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("✖ {src} : lecture impossible : {e}");
                failed += 1;
                continue;
            }
        };

        let mut fd = FileDescriptor::new(src.clone());
        match pp.process(&content, &mut fd) {
            Ok(output) if to_stdout => print!("{output}"),
            Ok(output) => {
                let dest = destination(&fd, out_dir);
                match fs::write(&dest, &output) {
                    Ok(()) => eprintln!("✅ {src} → {dest}"),
                    Err(e) => {
                        eprintln!("✖ {src} : écriture de {dest} : {e}");
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                eprintln!("✖ {src} : {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} fichier(s) en échec");
    }
    Ok(())
}

/// Destination d'écriture : dossier imposé (nom de base conservé) ou chemin
/// transformé du descripteur.
fn destination(fd: &FileDescriptor, out_dir: Option<&Utf8Path>) -> Utf8PathBuf {
    match out_dir {
        Some(dir) => dir.join(fd.path.file_name().unwrap_or(fd.path.as_str())),
        None => fd.path.clone(),
    }
}

fn cmd_options(config_path: &Utf8Path, flags: &CompileFlags) -> Result<()> {
    let (config, args) = assemble(config_path, flags)?;
    let pp = TscPreprocessor::new(args, &config);
    let opts = pp.options();

    println!("{}", serde_json::to_string_pretty(opts)?);
    let preview = opts.to_flags(Utf8Path::new("<fichier>.mln.js"));
    eprintln!("drapeaux tsc : {}", preview.join(" "));
    Ok(())
}

/* ─────────────────────────── Tests ─────────────────────────── */
