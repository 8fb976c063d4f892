use crate::config::{Config, load_config};
use crate::document::{decode_share_param, export_json, load_share_link, parse_diagram, share_url};
use crate::model::Diagram;
use crate::scene::{RenderMode, SceneRenderer};
use crate::svg::{render_svg, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{LevelFilter, debug, info};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "swimlane", version, about = "Swim-lane diagram renderer and share-link tool")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (JSON or JSON5): theme, layout and editor settings
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a diagram file to SVG
    Render {
        /// Diagram JSON, or '-' for stdin
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
        /// Output file. Defaults to stdout.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Validate a diagram and write it back in canonical form
    Export {
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Build a share link for a diagram
    Share {
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
        /// Page the link points at
        #[arg(long = "base", default_value = "https://localhost/")]
        base: String,
    },
    /// Turn a share link (or its bare `data` value) back into diagram JSON
    Decode {
        link: String,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Print the decoded payload without validating it
        #[arg(long = "raw")]
        raw: bool,
    },
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);
    debug!(args:?; "parsed arguments");

    let config = load_config(args.config.as_deref())?;
    match &args.command {
        Command::Render { input, output } => {
            let diagram = read_diagram(input.as_deref(), &config)?;
            let svg = render_diagram_svg(&diagram, &config);
            write_output_svg(&svg, output.as_deref())?;
        }
        Command::Export { input, output } => {
            let diagram = read_diagram(input.as_deref(), &config)?;
            let json = export_json(&diagram, &config.layout)?;
            write_text(&json, output.as_deref())?;
        }
        Command::Share { input, base } => {
            let diagram = read_diagram(input.as_deref(), &config)?;
            let url = share_url(base, &diagram, &config.layout)?;
            info!(chars = url.len(); "share link built");
            println!("{url}");
        }
        Command::Decode { link, output, raw } => {
            let json = if *raw {
                let param = if link.contains("data=") {
                    crate::document::share_param_from_url(link)?
                } else {
                    link.clone()
                };
                decode_share_param(&param)?
            } else {
                let diagram = load_share_link(link, &config.theme)?;
                export_json(&diagram, &config.layout)?
            };
            write_text(&json, output.as_deref())?;
        }
    }
    Ok(())
}

fn init_logger(level: &str) {
    let log_level = LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {level}. Using 'warn' instead.");
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
}

/// Lays out and renders `diagram` with a throwaway renderer.
pub fn render_diagram_svg(diagram: &Diagram, config: &Config) -> String {
    let mut renderer =
        SceneRenderer::new(config.theme.clone(), config.layout.clone(), &config.editor);
    renderer.render(diagram, RenderMode::ForceFull);
    render_svg(renderer.scene(), &config.theme, &config.layout)
}

fn read_diagram(path: Option<&Path>, config: &Config) -> Result<Diagram> {
    let input = read_input(path)?;
    let diagram = parse_diagram(&input, &config.theme).with_context(|| match path {
        Some(path) => format!("failed to load {}", path.display()),
        None => "failed to load diagram from stdin".to_string(),
    })?;
    Ok(diagram)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_share_subcommand() {
        let args = Args::try_parse_from([
            "swimlane",
            "share",
            "-i",
            "diagram.json",
            "--base",
            "https://example.test/app",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Share { input, base } => {
                assert_eq!(input, Some(PathBuf::from("diagram.json")));
                assert_eq!(base, "https://example.test/app");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn renders_svg_for_a_parsed_diagram() {
        let config = Config::default();
        let json = r#"{"title":"T","lanes":[{"id":"l1","name":"Lane","nodes":[{"id":"n1","text":"Go","type":"start","position":{"x":150}}]}]}"#;
        let diagram = parse_diagram(json, &config.theme).unwrap();
        let svg = render_diagram_svg(&diagram, &config);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Go"));
    }
}
