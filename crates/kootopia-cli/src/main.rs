use anyhow::{Context, Result, bail};
use kootopia_config::{Config, load_syntax_rules_with_fallback, syntax_rules::TEMPLATE};
use kootopia_engine::{
    CompileUpdate, EditorWorkspace, FileKind, FileStore, Persistence, TcpTransport, TokenRules,
    TransportSettings, WorkspaceSettings, highlight_syntax,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{env, process};

type Workspace = EditorWorkspace<FileStore, TcpTransport>;

const USAGE: &str = "\
Usage: kootopia [--files <dir>] <command>

Commands:
  compile <file>                         Compile on the build server and show flagged lines
  replace <file> <find> <with> [--all]   Find and replace, then save
  highlight <file>                       List keyword, comment and string tokens
  stats <file>                           Character, word and line counts
  new-config <name>                      Create a tokenizer rules file from the template
  list [configs]                         List source files, or rules files";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Compile {
        file: String,
    },
    Replace {
        file: String,
        find: String,
        replacement: String,
        all: bool,
    },
    Highlight {
        file: String,
    },
    Stats {
        file: String,
    },
    NewConfig {
        name: String,
    },
    List {
        kind: FileKind,
    },
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    files: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut files = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--files" {
            let dir = iter.next().context("--files needs a directory")?;
            files = Some(PathBuf::from(dir));
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        ["compile", file] => Command::Compile {
            file: file.to_string(),
        },
        ["replace", file, find, replacement, flags @ ..] => {
            let all = match flags {
                [] => false,
                ["--all"] => true,
                _ => bail!("unexpected arguments: {}", flags.join(" ")),
            };
            Command::Replace {
                file: file.to_string(),
                find: find.to_string(),
                replacement: replacement.to_string(),
                all,
            }
        }
        ["highlight", file] => Command::Highlight {
            file: file.to_string(),
        },
        ["stats", file] => Command::Stats {
            file: file.to_string(),
        },
        ["new-config", name] => Command::NewConfig {
            name: name.to_string(),
        },
        ["list"] => Command::List {
            kind: FileKind::Source,
        },
        ["list", "configs"] => Command::List {
            kind: FileKind::Config,
        },
        _ => bail!("unrecognised command"),
    };

    Ok(Args { files, command })
}

/// Settings file, with the files directory overridden from the command line
fn resolve_config(files: Option<PathBuf>) -> Result<Config> {
    let loaded = Config::load()?;
    match (files, loaded) {
        (Some(files), Some(mut config)) => {
            config.files_path = files;
            Ok(config)
        }
        (Some(files), None) => Ok(Config::with_files_path(files)),
        (None, Some(config)) => {
            log::info!("Using files path from config: {}", config.files_path.display());
            Ok(config)
        }
        (None, None) => bail!(
            "no files directory given and no config file at {}",
            Config::config_path().display()
        ),
    }
}

fn open_workspace(config: &Config) -> Result<Workspace> {
    let store = FileStore::open(&config.files_path)
        .with_context(|| format!("opening {}", config.files_path.display()))?;
    let transport = TcpTransport::new(TransportSettings {
        address: config.server_address.clone(),
        connect_timeout: config.connect_timeout(),
        read_timeout: config.read_timeout(),
        write_timeout: config.write_timeout(),
    });
    let settings = WorkspaceSettings {
        autosave: config.autosave,
        quiet_period: config.debounce(),
        default_extension: config.default_extension.clone(),
    };
    Ok(EditorWorkspace::new(store, transport, settings))
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(args.files)?;
    let mut workspace = open_workspace(&config)?;

    match args.command {
        Command::Compile { file } => compile(&mut workspace, &config, &file),
        Command::Replace {
            file,
            find,
            replacement,
            all,
        } => {
            workspace.open(&file)?;
            if !workspace.replace(&find, &replacement, all, Instant::now()) {
                bail!("'{find}' not found in {file}");
            }
            workspace.save()?;
            let doc = workspace.session().current();
            let selection = doc.selection();
            println!(
                "Replaced in {file}; last replacement at bytes {}..{}",
                selection.start, selection.end
            );
            Ok(())
        }
        Command::Highlight { file } => highlight(&mut workspace, &config, &file),
        Command::Stats { file } => {
            workspace.open(&file)?;
            let doc = workspace.session().current();
            println!("Characters: {}", doc.char_count());
            println!("Words: {}", doc.word_count());
            println!("Lines: {}", doc.line_count());
            Ok(())
        }
        Command::NewConfig { name } => {
            if workspace.store().list(FileKind::Config)?.contains(&name) {
                bail!("{name} already exists");
            }
            workspace.create_config(&name, TEMPLATE)?;
            workspace.switch_to_source()?;
            println!("Created {}", config.configs_dir().join(&name).display());
            Ok(())
        }
        Command::List { kind } => {
            for name in workspace.store().list(kind)? {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn compile(workspace: &mut Workspace, config: &Config, file: &str) -> Result<()> {
    workspace.open(file)?;
    workspace.compile()?;
    println!("{}", workspace.compile_status());

    // Allow for the connect and both I/O bounds before giving up locally
    let limit = config.connect_timeout() + config.write_timeout() + config.read_timeout();
    let updates = workspace.wait_compile(limit + Duration::from_secs(1));
    if !updates
        .iter()
        .any(|u| matches!(u, CompileUpdate::Succeeded { .. } | CompileUpdate::Failed { .. }))
    {
        bail!("no result from the build server");
    }

    println!("{}", workspace.compile_status());
    let annotated = workspace.session().annotated();
    if annotated.flagged_lines().next().is_some() {
        println!();
        for line in &annotated.lines {
            let marker = if line.flagged { ">>" } else { "  " };
            println!("{marker} {:>4} | {}", line.index + 1, line.text);
        }
    }
    Ok(())
}

fn highlight(workspace: &mut Workspace, config: &Config, file: &str) -> Result<()> {
    workspace.open(file)?;
    let rules_file = workspace.file().rules_file();
    let result = load_syntax_rules_with_fallback(&config.configs_dir(), rules_file);
    if let Some(message) = result.message() {
        eprintln!("{message}");
    }
    let rules = result.rules();

    let text = workspace.session().current().text();
    let spans = highlight_syntax(
        &text,
        TokenRules {
            keywords: &rules.keywords,
            comments: &rules.comments,
            strings: &rules.strings,
        },
    );
    for span in spans {
        println!(
            "{:>6}..{:<6} {:?} {}",
            span.range.start,
            span.range.end,
            span.kind,
            &text[span.range.clone()]
        );
    }
    Ok(())
}

fn main() {
    // Info unless RUST_LOG says otherwise
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_compile_with_files_dir() {
        let parsed = parse_args(&args(&["--files", "/tmp/code", "compile", "a.py"])).unwrap();

        assert_eq!(
            parsed,
            Args {
                files: Some(PathBuf::from("/tmp/code")),
                command: Command::Compile {
                    file: "a.py".to_string()
                },
            }
        );
    }

    #[test]
    fn test_parse_replace_all() {
        let parsed = parse_args(&args(&["replace", "a.kt", "foo", "bar", "--all"])).unwrap();

        assert_eq!(
            parsed.command,
            Command::Replace {
                file: "a.kt".to_string(),
                find: "foo".to_string(),
                replacement: "bar".to_string(),
                all: true,
            }
        );
    }

    #[test]
    fn test_parse_list_configs() {
        let parsed = parse_args(&args(&["list", "configs"])).unwrap();
        assert_eq!(
            parsed.command,
            Command::List {
                kind: FileKind::Config
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["replace", "a.kt", "x", "y", "--some"])).is_err());
        assert!(parse_args(&args(&["--files"])).is_err());
    }
}
