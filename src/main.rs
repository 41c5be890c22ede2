//! Collage CLI
//!
//! Usage:
//!   collage [OPTIONS] <SCENE>
//!
//! Options:
//!   -s, --script <FILE>     Gesture script (reads from stdin if not provided)
//!       --settings <FILE>   Settings file (TOML format)
//!   -f, --format <FORMAT>   Output format: json or svg
//!   -d, --debug             Log at debug level
//!   -g, --grammar           Show script grammar reference
//!   -h, --help              Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use collage_layout::{parse, ReplayError, Scene, Session, Settings};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Final store, server call log and notices
    Json,
    /// Snapshot of the active view
    Svg,
}

#[derive(Parser)]
#[command(name = "collage")]
#[command(about = "Replay pointer gestures against an event collage scene")]
struct Cli {
    /// Scene file (TOML format)
    scene: Option<PathBuf>,

    /// Gesture script (reads from stdin if not provided)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Settings file (TOML format)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long)]
    debug: bool,

    /// Show script grammar reference
    #[arg(short, long)]
    grammar: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    if cli.grammar {
        print_grammar();
        return;
    }

    let Some(scene_path) = &cli.scene else {
        print_intro();
        return;
    };

    init_tracing(cli.debug);

    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path).unwrap_or_else(|e| {
            fail(format!("loading settings '{}': {}", path.display(), e))
        }),
        None => Settings::default(),
    };

    let scene = Scene::from_file(scene_path)
        .unwrap_or_else(|e| fail(format!("loading scene '{}': {}", scene_path.display(), e)));

    let (source, filename) = match &cli.script {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => fail(format!("reading script '{}': {}", path.display(), e)),
        },
        None if io::stdin().is_terminal() => (String::new(), "<empty>".to_string()),
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                fail(format!("reading from stdin: {}", e));
            }
            (buffer, "<stdin>".to_string())
        }
    };

    let script = match parse(&source) {
        Ok(script) => script,
        Err(errors) => {
            for error in &errors {
                eprint!("{}", error.format(&source, &filename));
            }
            fail(ReplayError::Parse(errors));
        }
    };

    let mut session = Session::new(&scene, &settings).unwrap_or_else(|e| fail(e));
    if let Err(e) = session.run(&script) {
        fail(ReplayError::Step(e));
    }

    for notice in session.notices() {
        eprintln!("alert: {}", notice);
    }
    for rejected in session.rejected() {
        eprintln!("ignored: {}", rejected);
    }

    let output = match cli.format {
        Format::Json => session.to_json().unwrap_or_else(|e| fail(e)),
        Format::Svg => session.to_svg().unwrap_or_else(|e| fail(e)),
    };
    println!("{}", output);
}

fn print_intro() {
    println!(
        r#"Collage - replay pointer gestures against an event collage scene

USAGE:
    collage [OPTIONS] <SCENE>
    echo 'press 10 10 on background  move 60 40  frame  release' | collage scene.toml

OPTIONS:
    -s, --script <FILE>   Gesture script (default: stdin)
    --settings <FILE>     Tunables (TOML file)
    -f, --format <FMT>    json (default) or svg
    -d, --debug           Log every gesture transition
    -g, --grammar         Show script grammar reference
    -h, --help            Print help

Run --grammar for the script syntax."#
    );
}

fn print_grammar() {
    println!(
        r#"COLLAGE GESTURE SCRIPTS
=======================

Statements run in order. Coordinates are screen pixels; ids are server ids.

VIEWS
-----
view dashboard                  Drive the analytics dashboard
view group <id>                 Drive a group's canvas
resize <w> <h>                  Resize the active view

POINTER
-------
press <x> <y> [button <n>] on <target>
    targets: item <id> | node <id> | template "<name>" | control | background
move <x> <y>                    Pointer moved (applied on the next frame)
frame [<count>]                 Run animation frames
release                         Drop the current gesture
wheel <x> <y> <delta>           Wheel zoom at the cursor (negative zooms in)

CANVAS VIEW
-----------
zoom (in|out) at <x> <y>        One zoom step at a screen point
pan <dx> <dy>                   Pan by a screen delta
fit node <id> [padding <p>]     Animate onto a node and its items
reset zoom                      Animate back to the view before fitting
tick <ms>                       Advance animations
scroll <offset>                 Apply parallax for a page scroll offset
add event on node <id> ["<title>"]
                                New card on a node, in its next orbit slot
add node at <x> <y> ["<label>"] New node under a screen point
remove node <id>                Delete a node and every card on it

SERVER
------
remove item <id>                Delete an item
fail next [<status>]            Make the next server call fail (default 500)
sync                            Deliver queued server calls

Comments start with // and run to the end of the line."#
    );
}
