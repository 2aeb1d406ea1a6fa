//! Buildfile interpreter (§4.4).
//!
//! A buildfile is UTF-8 text: blank lines and `#`-comment lines are
//! skipped, `$NAME`/`${NAME}` substitution against a `--build-arg` map
//! runs before tokenization, and the first whitespace-separated, upper-
//! cased token names the instruction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use servin_shared::{ContainerId, ServinError, ServinResult};

use crate::images::{ImageDefaults, ImageRecord, ImageStore, Layer, NONE_TAG};

/// One parsed, substituted, tokenized buildfile line.
#[derive(Debug, Clone)]
struct Instruction {
    name: String,
    args: Vec<String>,
}

fn substitute(line: &str, build_args: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                out.push_str(build_args.get(&name).map(String::as_str).unwrap_or(""));
            }
            Some(c0) if c0.is_alphabetic() || *c0 == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(build_args.get(&name).map(String::as_str).unwrap_or(""));
            }
            _ => out.push('$'),
        }
    }
    out
}

fn parse_lines(source: &str, build_args: &HashMap<String, String>) -> Vec<(usize, Instruction)> {
    let mut out = Vec::new();
    for (lineno, raw) in source.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let substituted = substitute(trimmed, build_args);
        let mut tokens = substituted.split_whitespace();
        let Some(name) = tokens.next() else { continue };
        out.push((
            lineno + 1,
            Instruction {
                name: name.to_ascii_uppercase(),
                args: tokens.map(str::to_string).collect(),
            },
        ));
    }
    out
}

/// A build in progress: the accumulating config and layer list for the
/// image under construction, plus the context it's building from.
struct BuildState {
    config: ImageDefaults,
    layers: Vec<Layer>,
    labels: HashMap<String, String>,
    from_seen: bool,
}

/// `CMD`/`ENTRYPOINT` accept either shell form (`CMD /bin/app arg`) or
/// the bracketed exec form (`CMD ["/bin/app", "arg"]`); the latter
/// tokenizes as a single whitespace-free token upstream, so it's
/// unpacked here rather than in `parse_lines`.
fn parse_exec_form(args: &[String]) -> Vec<String> {
    let joined = args.join(" ");
    let trimmed = joined.trim();
    let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return args.to_vec();
    };
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn kv_pairs(args: &[String]) -> ServinResult<Vec<(String, String)>> {
    // `ENV k v` (single pair) or `ENV k=v [k=v ...]` (one or more pairs).
    if args.len() == 2 && !args[0].contains('=') {
        return Ok(vec![(args[0].clone(), args[1].clone())]);
    }
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        let (k, v) = arg
            .split_once('=')
            .ok_or_else(|| ServinError::Validation(format!("expected KEY=VALUE, got: {arg}")))?;
        out.push((k.to_string(), v.to_string()));
    }
    Ok(out)
}

/// Execute a buildfile against a build context directory, producing a
/// new [`ImageRecord`] committed to `store`.
pub fn build(
    store: &ImageStore,
    source: &str,
    context_dir: &Path,
    build_args: &HashMap<String, String>,
    tag: Option<&str>,
) -> ServinResult<ImageRecord> {
    let instructions = parse_lines(source, build_args);
    let mut state = BuildState {
        config: ImageDefaults::default(),
        layers: Vec::new(),
        labels: HashMap::new(),
        from_seen: false,
    };

    // FROM must be the first instruction (§4.4); a misplaced or absent
    // FROM warns and synthesizes scratch rather than failing the build.
    if !matches!(instructions.first(), Some((_, i)) if i.name == "FROM") {
        if instructions.iter().any(|(_, i)| i.name == "FROM") {
            tracing::warn!("FROM is not the first instruction; synthesizing scratch");
        }
        state.layers.push(Layer::Scratch);
        state.from_seen = true;
    }

    for (lineno, instr) in &instructions {
        run_instruction(store, &mut state, instr, context_dir).map_err(|e| {
            ServinError::Validation(format!("buildfile line {lineno}: {e}"))
        })?;
    }

    let id = ContainerId::new();
    let mut record = ImageRecord::untagged(id, state.config);
    record.layers = state.layers;
    record.labels = state.labels;
    record.tag = tag.map(str::to_string).unwrap_or_else(|| NONE_TAG.to_string());
    record
        .build_metadata
        .insert("context".into(), context_dir.display().to_string());
    record
        .build_metadata
        .insert("built_at".into(), record.created_at.to_rfc3339());

    store.save(record.clone())?;
    Ok(record)
}

fn run_instruction(
    store: &ImageStore,
    state: &mut BuildState,
    instr: &Instruction,
    context_dir: &Path,
) -> ServinResult<()> {
    match instr.name.as_str() {
        "FROM" => {
            // A FROM that isn't the file's first instruction already had
            // scratch synthesized ahead of the loop; warn and skip here
            // rather than erroring or overriding that decision.
            if state.from_seen {
                tracing::warn!("ignoring FROM: already synthesized scratch for a misplaced or repeated FROM");
                return Ok(());
            }
            let reference = instr
                .args
                .first()
                .ok_or_else(|| ServinError::Validation("FROM requires an image reference".into()))?;
            if reference == "scratch" {
                state.layers.push(Layer::Scratch);
            } else {
                let base = store.get(reference)?;
                state.layers.extend(base.layers);
                state.config = base.config;
            }
            state.from_seen = true;
        }
        "RUN" => {
            if instr.args.is_empty() {
                return Err(ServinError::Validation("RUN requires a command".into()));
            }
            // Metadata-only: the command is recorded, not executed (§9 open note).
            state.layers.push(Layer::Run {
                command: instr.args.clone(),
            });
        }
        "COPY" | "ADD" => {
            if instr.args.len() < 2 {
                return Err(ServinError::Validation(format!(
                    "{} requires at least one source and a destination",
                    instr.name
                )));
            }
            let (sources, dest) = instr.args.split_at(instr.args.len() - 1);
            for src in sources {
                if !context_dir.join(src).exists() {
                    return Err(ServinError::Validation(format!(
                        "{} source not found in build context: {src}",
                        instr.name
                    )));
                }
            }
            state.layers.push(Layer::Copy {
                sources: sources.to_vec(),
                dest: dest[0].clone(),
            });
        }
        "WORKDIR" => {
            let dir = instr
                .args
                .first()
                .ok_or_else(|| ServinError::Validation("WORKDIR requires a path".into()))?;
            state.config.working_dir = dir.clone();
        }
        "ENV" => {
            for (k, v) in kv_pairs(&instr.args)? {
                state.config.env.retain(|e| !e.starts_with(&format!("{k}=")));
                state.config.env.push(format!("{k}={v}"));
            }
        }
        "EXPOSE" => {
            for port in &instr.args {
                state.config.exposed_ports.push(port.clone());
            }
        }
        "CMD" => {
            state.config.cmd = parse_exec_form(&instr.args);
        }
        "ENTRYPOINT" => {
            state.config.entrypoint = parse_exec_form(&instr.args);
        }
        "LABEL" => {
            for (k, v) in kv_pairs(&instr.args)? {
                state.labels.insert(k, v);
            }
        }
        "USER" => {
            let user = instr
                .args
                .first()
                .ok_or_else(|| ServinError::Validation("USER requires a user".into()))?;
            state.config.user = Some(user.clone());
        }
        "VOLUME" => {
            // No dedicated config field (§4.4 table); recorded for inspection.
            if let Some(value) = instr.args.first() {
                state.labels.insert("servin.volume".to_string(), value.clone());
            }
        }
        other => {
            tracing::warn!(instruction = other, "unknown buildfile instruction, skipping");
        }
    }
    Ok(())
}

#[allow(dead_code)]
fn context_path(context_dir: &Path, rel: &str) -> PathBuf {
    context_dir.join(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn empty_store() -> ImageStore {
        let dir = tempdir().unwrap();
        ImageStore::open(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn s1_buildfile_minimal_image() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let source = "FROM scratch\nENV APP=hello\nCMD [\"/bin/app\"]\n";
        let record = build(&store, source, context.path(), &HashMap::new(), Some("hello:latest")).unwrap();

        assert_eq!(record.config.env, vec!["APP=hello".to_string()]);
        assert_eq!(record.config.cmd, vec!["/bin/app".to_string()]);
        assert_eq!(record.tag, "hello:latest");
        assert!(matches!(record.layers.as_slice(), [Layer::Scratch]));
    }

    #[test]
    fn cmd_shell_form_is_kept_verbatim() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record =
            build(&store, "FROM scratch\nCMD /bin/app --flag\n", context.path(), &HashMap::new(), None).unwrap();
        assert_eq!(record.config.cmd, vec!["/bin/app".to_string(), "--flag".to_string()]);
    }

    #[test]
    fn entrypoint_exec_form_with_multiple_args() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record = build(
            &store,
            "FROM scratch\nENTRYPOINT [\"/bin/app\", \"serve\", \"--port\", \"8080\"]\n",
            context.path(),
            &HashMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(
            record.config.entrypoint,
            vec!["/bin/app".to_string(), "serve".to_string(), "--port".to_string(), "8080".to_string()]
        );
    }

    #[test]
    fn entrypoint_and_cmd_are_independent_fields() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record = build(
            &store,
            "FROM scratch\nENTRYPOINT [\"/bin/app\"]\nCMD [\"--flag\"]\n",
            context.path(),
            &HashMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(record.config.entrypoint, vec!["/bin/app".to_string()]);
        assert_eq!(record.config.cmd, vec!["--flag".to_string()]);
    }

    #[test]
    fn user_instruction_sets_config_user() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record =
            build(&store, "FROM scratch\nUSER nobody\n", context.path(), &HashMap::new(), None).unwrap();
        assert_eq!(record.config.user, Some("nobody".to_string()));
        assert!(!record.labels.contains_key("servin.user"));
    }

    #[test]
    fn missing_from_synthesizes_scratch() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record = build(&store, "ENV X=1\n", context.path(), &HashMap::new(), None).unwrap();
        assert!(matches!(record.layers.as_slice(), [Layer::Scratch]));
        assert_eq!(record.tag, NONE_TAG);
    }

    #[test]
    fn from_not_first_synthesizes_scratch_instead() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record =
            build(&store, "ENV X=1\nFROM scratch\n", context.path(), &HashMap::new(), None).unwrap();
        assert!(matches!(record.layers.as_slice(), [Layer::Scratch]));
        assert_eq!(record.config.env, vec!["X=1".to_string()]);
    }

    #[test]
    fn unknown_instruction_warns_and_skips() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let record = build(&store, "FROM scratch\nFROBNICATE x\n", context.path(), &HashMap::new(), None).unwrap();
        assert_eq!(record.layers.len(), 1);
    }

    #[test]
    fn copy_missing_source_aborts_build() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let err = build(&store, "FROM scratch\nCOPY missing.txt /app/\n", context.path(), &HashMap::new(), None);
        assert!(err.is_err());
    }

    #[test]
    fn build_arg_substitution() {
        let store = empty_store();
        let context = tempdir().unwrap();
        let mut args = HashMap::new();
        args.insert("VERSION".to_string(), "1.2.3".to_string());
        let record = build(&store, "FROM scratch\nENV V=${VERSION}\n", context.path(), &args, None).unwrap();
        assert_eq!(record.config.env, vec!["V=1.2.3".to_string()]);
    }
}
