//! compiler.rs — Invocation du compilateur TypeScript externe.
//!
//! Le pipeline ne voit que le trait [`Compiler`], ce qui permet de brancher
//! un faux compilateur dans les tests. L'implémentation réelle, [`TscBin`],
//! lance le binaire `tsc` (configuration explicite, sinon `$MOULINETTE_TSC`,
//! sinon le `tsc` du PATH), capture sa sortie et remonte chaque diagnostic
//! reconnu via le callback.
//!
//! Un diagnostic ne fait pas échouer l'appel : `tsc` sort avec un code non
//! nul sur simple erreur de typage tout en ayant émis le JavaScript. L'échec
//! ne vient que d'un lancement impossible ou d'un délai dépassé.

use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;

use crate::diag::Diagnostic;
use crate::error::Error;

const LOG_TARGET: &str = "moulinette::tsc";

/// Pas d'attente entre deux sondages du processus enfant.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Collaboration compilateur.
///
/// Compile `source` avec `flags` ; chaque diagnostic remonte par `on_diag`.
/// Les artefacts sont écrits sur disque par effet de bord (le chemin de
/// sortie est forcé par les flags), jamais retournés.
pub trait Compiler {
    fn compile(
        &self,
        source: &Utf8Path,
        flags: &[String],
        on_diag: &mut dyn FnMut(Diagnostic),
    ) -> Result<(), Error>;
}

/// Configuration du backend `tsc`.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Binaire à invoquer. Si absent : `$MOULINETTE_TSC`, sinon `tsc`.
    pub tsc_bin: Option<String>,
    /// Délai maximal d'une invocation ; `None` = pas de limite.
    pub timeout: Option<Duration>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            tsc_bin: std::env::var("MOULINETTE_TSC").ok(),
            timeout: None,
        }
    }
}

/// Le backend réel : un processus `tsc` par compilation.
#[derive(Debug, Clone)]
pub struct TscBin {
    bin: String,
    timeout: Option<Duration>,
}

impl TscBin {
    pub fn new(cfg: &CompilerConfig) -> Self {
        Self {
            bin: cfg.tsc_bin.as_deref().unwrap_or("tsc").to_string(),
            timeout: cfg.timeout,
        }
    }

    /// Nom du binaire effectivement invoqué.
    pub fn bin(&self) -> &str {
        &self.bin
    }

    fn spawn_err(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            bin: self.bin.clone(),
            source,
        }
    }

    fn run(&self, mut cmd: Command) -> Result<Output, Error> {
        cmd.stdin(Stdio::null());
        match self.timeout {
            None => cmd.output().map_err(|e| self.spawn_err(e)),
            Some(limit) => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                let child = cmd.spawn().map_err(|e| self.spawn_err(e))?;
                self.wait_with_deadline(child, limit)
            }
        }
    }

    /// Attend la fin du processus en sondant `try_wait`, et le tue une fois
    /// le délai écoulé. Les deux sorties sont drainées par des threads pour
    /// que l'enfant ne bloque jamais sur un tube plein.
    fn wait_with_deadline(&self, mut child: Child, limit: Duration) -> Result<Output, Error> {
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let deadline = Instant::now() + limit;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        // Pas de join ici : un petit-fils peut garder les
                        // tubes ouverts, les threads de drainage finiront
                        // d'eux-mêmes à l'EOF.
                        log::warn!(
                            target: LOG_TARGET,
                            "`{}` tué après {limit:?}",
                            self.bin
                        );
                        return Err(Error::Timeout {
                            bin: self.bin.clone(),
                            limit,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.spawn_err(e));
                }
            }
        };

        Ok(Output {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }
}

/// Draine un tube enfant jusqu'à EOF dans un thread dédié.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_end(&mut buf);
        }
        buf
    })
}

impl Compiler for TscBin {
    fn compile(
        &self,
        source: &Utf8Path,
        flags: &[String],
        on_diag: &mut dyn FnMut(Diagnostic),
    ) -> Result<(), Error> {
        log::debug!(
            target: LOG_TARGET,
            "exécution de `{}` sur {source} ({} jetons)",
            self.bin,
            flags.len()
        );

        let mut cmd = Command::new(&self.bin);
        cmd.args(flags).arg(source.as_str());
        let output = self.run(cmd)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            if let Some(d) = Diagnostic::parse_line(line) {
                on_diag(d);
            }
        }

        // Code de sortie non nul = diagnostics, pas un échec de passe : la
        // sortie JavaScript a pu être émise quand même.
        if !output.status.success() {
            log::debug!(
                target: LOG_TARGET,
                "`{}` terminé avec {}",
                self.bin,
                output.status
            );
        }
        Ok(())
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(bin: Option<&str>) -> CompilerConfig {
        CompilerConfig {
            tsc_bin: bin.map(str::to_string),
            timeout: None,
        }
    }

    #[test]
    fn explicit_binary_wins() {
        let tsc = TscBin::new(&cfg(Some("/opt/node/bin/tsc")));
        assert_eq!(tsc.bin(), "/opt/node/bin/tsc");
    }

    #[test]
    fn path_lookup_is_the_fallback() {
        let tsc = TscBin::new(&cfg(None));
        assert_eq!(tsc.bin(), "tsc");
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let tsc = TscBin::new(&cfg(Some("/nonexistent/moulinette-tsc")));
        let err = tsc
            .compile(Utf8Path::new("a.ts"), &["--outFile".into(), "a.mln.js".into()], &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }), "{err}");
    }
}
