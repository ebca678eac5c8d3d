//! Tests d'intégration du pipeline avec un compilateur factice qui écrit de
//! vrais artefacts sur disque, sans dépendre d'un `tsc` installé.

use std::fs;
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use moulinette_core::sourcemap::DATA_URI_PREFIX;
use moulinette_core::{
    pipeline, Compiler, Diagnostic, Error, FileDescriptor, HarnessConfig, OptionPatch, PluginArgs,
    Preprocessor, Registry, Severity, SourceMap, TscOptions, TscPreprocessor,
};

/// Compilateur factice : écrit `output` au chemin `--outFile`, la map à côté
/// si `--sourceMap` est demandé, et remonte ses diagnostics. Il mémorise la
/// dernière ligne de commande reçue.
struct FakeTsc {
    output: Option<String>,
    map: Option<String>,
    diagnostics: Vec<Diagnostic>,
    seen: Mutex<Vec<String>>,
}

impl FakeTsc {
    fn emitting(output: &str) -> Self {
        Self {
            output: Some(output.to_string()),
            map: None,
            diagnostics: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn with_map(output: &str, map: &str) -> Self {
        Self {
            map: Some(map.to_string()),
            ..Self::emitting(output)
        }
    }

    fn broken() -> Self {
        Self {
            output: None,
            map: None,
            diagnostics: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn diagnosing(output: &str, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            ..Self::emitting(output)
        }
    }
}

impl Compiler for FakeTsc {
    fn compile(
        &self,
        source: &Utf8Path,
        flags: &[String],
        on_diag: &mut dyn FnMut(Diagnostic),
    ) -> Result<(), Error> {
        let mut seen = self.seen.lock().unwrap();
        *seen = flags.to_vec();
        seen.push(source.to_string());

        let out = flag_value(flags, "--outFile").expect("--outFile est toujours forcé");
        if let Some(text) = &self.output {
            fs::write(&out, text).unwrap();
        }
        if flags.iter().any(|f| f == "--sourceMap") {
            if let Some(map) = &self.map {
                fs::write(format!("{out}.map"), map).unwrap();
            }
        }
        for d in &self.diagnostics {
            on_diag(d.clone());
        }
        Ok(())
    }
}

fn flag_value(flags: &[String], key: &str) -> Option<String> {
    flags
        .iter()
        .position(|f| f == key)
        .and_then(|i| flags.get(i + 1))
        .cloned()
}

fn workdir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

fn ts_file(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn preprocessor(compiler: FakeTsc, global: OptionPatch, args: OptionPatch) -> TscPreprocessor {
    let config = HarnessConfig {
        options: global,
        ..HarnessConfig::default()
    };
    let args = PluginArgs {
        options: args,
        transform_path: None,
    };
    TscPreprocessor::with_compiler(args, &config, Box::new(compiler))
}

fn entries(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn pass_returns_the_compiled_text_and_sets_the_output_path() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x: number = 1;");

    let pp = preprocessor(
        FakeTsc::emitting("var x = 1;\n"),
        OptionPatch::default(),
        OptionPatch::default(),
    );
    let mut fd = FileDescriptor::new(src);
    let out = pp.process("let x: number = 1;", &mut fd).unwrap();

    assert_eq!(out, "var x = 1;\n");
    assert_eq!(fd.path, dir.join("a.js"));
    assert!(fd.source_map_path.is_none());
    assert!(fd.source_map.is_none());
    assert_eq!(entries(&dir), vec!["a.ts"]);
}

#[test]
fn the_compiler_reads_the_original_file_with_separate_tokens() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    let tsc = FakeTsc::emitting("var x = 1;\n");
    let mut opts = TscOptions::default();
    opts.apply(&OptionPatch {
        target: Some("ES2020".into()),
        ..OptionPatch::default()
    });
    let mut fd = FileDescriptor::new(src.clone());
    pipeline::compile_one(&tsc, &mut fd, "let x = 1;", opts).unwrap();

    let seen = tsc.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "--outFile".to_string(),
            format!("{src}.mln.js"),
            "--target".to_string(),
            "ES2020".to_string(),
            src.to_string(),
        ]
    );
}

#[test]
fn compiler_diagnostics_do_not_abort_the_pass() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "bad.ts", "let x: number = 'oops';");

    let diag = Diagnostic {
        file: Some("bad.ts".into()),
        line: Some(1),
        col: Some(5),
        code: Some("TS2322".into()),
        severity: Severity::Error,
        message: "Type 'string' is not assignable to type 'number'.".into(),
    };
    let pp = preprocessor(
        FakeTsc::diagnosing("var x = 'oops';\n", vec![diag]),
        OptionPatch::default(),
        OptionPatch::default(),
    );

    let mut fd = FileDescriptor::new(src);
    let out = pp.process("let x: number = 'oops';", &mut fd).unwrap();
    assert_eq!(out, "var x = 'oops';\n");
}

#[test]
fn missing_compiler_output_fails_the_pass() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    let pp = preprocessor(
        FakeTsc::broken(),
        OptionPatch::default(),
        OptionPatch::default(),
    );
    let mut fd = FileDescriptor::new(src);
    let err = pp.process("let x = 1;", &mut fd).unwrap_err();

    match err {
        Error::Read { path, .. } => assert!(path.as_str().ends_with("a.ts.mln.js"), "{path}"),
        other => panic!("attendu Error::Read, obtenu {other}"),
    }
}

#[test]
fn source_map_is_embedded_rewritten_and_cleaned_up() {
    let (_guard, dir) = workdir();
    let content = "let x: number = 1;";
    let src = ts_file(&dir, "a.ts", content);

    let compiled = "var x = 1;\n//# sourceMappingURL=a.ts.mln.js.map\n";
    let map = r#"{"version":3,"file":"a.ts.mln.js","sourceRoot":"","sources":["a.ts"],"names":[],"mappings":"AAAA,IAAI"}"#;
    let args = OptionPatch {
        source_map: Some(true),
        ..OptionPatch::default()
    };
    let pp = preprocessor(FakeTsc::with_map(compiled, map), OptionPatch::default(), args);

    let mut fd = FileDescriptor::new(src.clone());
    let out = pp.process(content, &mut fd).unwrap();

    // L'ancienne référence fichier est partie, le data URI est accroché.
    assert!(!out.contains("//#"), "{out}");
    assert_eq!(out.matches("sourceMappingURL").count(), 1);
    assert!(out.starts_with("var x = 1;\n"));

    let uri = out
        .lines()
        .find_map(|l| l.strip_prefix("//@ sourceMappingURL="))
        .expect("commentaire de mapping absent");
    let b64 = uri.strip_prefix(DATA_URI_PREFIX).expect("préfixe data URI");
    let decoded = STANDARD.decode(b64).unwrap();
    let embedded: SourceMap = serde_json::from_slice(&decoded).unwrap();

    assert_eq!(embedded.version, 3);
    assert_eq!(embedded.sources, vec!["a.ts"]);
    assert_eq!(
        embedded.sources_content.as_deref(),
        Some(&[content.to_string()][..])
    );
    assert_eq!(embedded.file.as_deref(), Some("a.js"));
    assert_eq!(embedded.mappings, "AAAA,IAAI");

    // Le descripteur garde la map réécrite et le chemin intermédiaire.
    assert_eq!(fd.source_map_path, Some(Utf8PathBuf::from(format!("{src}.mln.js.map"))));
    assert_eq!(fd.source_map.as_ref(), Some(&embedded));

    // Plus aucun artefact : seul le source reste.
    assert_eq!(entries(&dir), vec!["a.ts"]);
}

#[test]
fn requested_map_must_exist() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    let args = OptionPatch {
        source_map: Some(true),
        ..OptionPatch::default()
    };
    // Sortie écrite, mais pas de map.
    let pp = preprocessor(
        FakeTsc::emitting("var x = 1;\n"),
        OptionPatch::default(),
        args,
    );
    let mut fd = FileDescriptor::new(src);
    let err = pp.process("let x = 1;", &mut fd).unwrap_err();

    match err {
        Error::Read { path, .. } => assert!(path.as_str().ends_with(".mln.js.map"), "{path}"),
        other => panic!("attendu Error::Read, obtenu {other}"),
    }
}

#[test]
fn an_unreadable_map_is_a_parse_error() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    let args = OptionPatch {
        source_map: Some(true),
        ..OptionPatch::default()
    };
    let pp = preprocessor(
        FakeTsc::with_map("var x = 1;\n", "pas du json"),
        OptionPatch::default(),
        args,
    );
    let mut fd = FileDescriptor::new(src);
    let err = pp.process("let x = 1;", &mut fd).unwrap_err();
    assert!(matches!(err, Error::MapParse { .. }), "{err}");
}

#[test]
fn untouched_text_when_no_map_is_requested() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    // Sans `sourceMap`, la référence fichier laissée par le compilateur
    // reste en place : aucune chirurgie de commentaire.
    let compiled = "var x = 1;\n//# sourceMappingURL=a.ts.mln.js.map\n";
    let pp = preprocessor(
        FakeTsc::emitting(compiled),
        OptionPatch::default(),
        OptionPatch::default(),
    );
    let mut fd = FileDescriptor::new(src);
    let out = pp.process("let x = 1;", &mut fd).unwrap();
    assert_eq!(out, compiled);
}

#[test]
fn process_with_fires_exactly_once_on_success() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    let pp = preprocessor(
        FakeTsc::emitting("var x = 1;\n"),
        OptionPatch::default(),
        OptionPatch::default(),
    );
    let mut fd = FileDescriptor::new(src);
    let mut calls = 0;
    pp.process_with("let x = 1;", &mut fd, |res| {
        calls += 1;
        assert_eq!(res.unwrap(), "var x = 1;\n");
    });
    assert_eq!(calls, 1);
}

#[test]
fn global_options_survive_empty_invocation_args() {
    // {bare:true} en défaut, {bare:false} au bloc global, rien en args :
    // la valeur effective est false.
    let pp = preprocessor(
        FakeTsc::broken(),
        OptionPatch {
            bare: Some(false),
            ..OptionPatch::default()
        },
        OptionPatch::default(),
    );
    assert!(!pp.options().bare);
}

#[test]
fn a_registry_built_preprocessor_runs_the_same_pipeline() {
    let (_guard, dir) = workdir();
    let src = ts_file(&dir, "a.ts", "let x = 1;");

    // Le vrai backend `tsc` est inutilisable ici ; on vérifie que la
    // fabrique enregistrée produit bien un préprocesseur nommé, et que la
    // passe échoue proprement en lancement si le binaire n'existe pas.
    let config = HarnessConfig {
        compiler: moulinette_core::CompilerConfig {
            tsc_bin: Some("/nonexistent/moulinette-tsc".into()),
            timeout: None,
        },
        ..HarnessConfig::default()
    };
    let pp = Registry::with_defaults()
        .create("typescript", PluginArgs::default(), &config)
        .unwrap();
    assert_eq!(pp.name(), "typescript");

    let mut fd = FileDescriptor::new(src);
    let err = pp.process("let x = 1;", &mut fd).unwrap_err();
    assert!(matches!(err, Error::Spawn { .. }), "{err}");
    assert_eq!(fd.path, dir.join("a.js"));
}
