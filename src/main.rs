//! epubcfi command line tool
//!
//! Parses CFIs, resolves them against package and content documents on disk,
//! and generates them for elements and character positions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epubcfi::{
    complete_cfi, package_component, parse, resolve_package, CfiGenerator, CfiInterpreter,
    DocumentTree, ElisionRules, Location, NodeKind, Resolution, SpineReference, XmlTree,
};

#[derive(Parser)]
#[command(name = "epubcfi", version, about = "Parse, resolve and generate EPUB CFIs")]
struct Cli {
    /// Class of marker elements to skip; adds to EPUBCFI_ELIDED_CLASSES
    #[arg(long = "elide-class", global = true)]
    elide_class: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the structure of a CFI as JSON
    Parse { cfi: String },

    /// Resolve a CFI against a package document and its content document
    Resolve {
        #[arg(long)]
        package: PathBuf,
        #[arg(long)]
        content: PathBuf,
        cfi: String,
    },

    /// Generate the CFI of an element, or of a character in its first text child
    Generate {
        #[arg(long)]
        package: PathBuf,
        /// Spine idref of the content document
        #[arg(long)]
        idref: String,
        #[arg(long)]
        content: PathBuf,
        /// Id of the target element
        #[arg(long)]
        target_id: String,
        #[arg(long)]
        offset: Option<i64>,
    },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Target {
    Element {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Character {
        node_kind: NodeKind,
        offset: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Gap {
        parent: String,
        index: u32,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum Resolved {
    Location(Target),
    Range { start: Target, end: Target },
}

#[derive(Serialize)]
struct ResolveOutput {
    spine: SpineReference,
    target: Resolved,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epubcfi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut rules = ElisionRules::from_env();
    for class in cli.elide_class {
        rules.add_class(class);
    }
    if !rules.is_empty() {
        tracing::info!(?rules, "Using elision rules");
    }

    match cli.command {
        Command::Parse { cfi } => {
            let parsed = parse(&cfi)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Resolve {
            package,
            content,
            cfi,
        } => {
            let cfi = parse(&cfi)?;

            let package_text = read(&package)?;
            let package_doc = XmlTree::parse_document(&package_text)?;
            let spine = resolve_package(&XmlTree::new(&package_doc), &cfi)?;

            let content_text = read(&content)?;
            let content_doc = XmlTree::parse_document(&content_text)?;
            let tree = XmlTree::new(&content_doc);
            let target = match CfiInterpreter::with_elision(&tree, &rules).resolve(&cfi)? {
                Resolution::Location(location) => Resolved::Location(describe(&tree, location)),
                Resolution::Range(range) => Resolved::Range {
                    start: describe(&tree, range.start),
                    end: describe(&tree, range.end),
                },
            };

            let output = ResolveOutput { spine, target };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Generate {
            package,
            idref,
            content,
            target_id,
            offset,
        } => {
            let package_text = read(&package)?;
            let package_doc = XmlTree::parse_document(&package_text)?;
            let package_path = package_component(Some(&XmlTree::new(&package_doc)), Some(&idref))?;

            let content_text = read(&content)?;
            let content_doc = XmlTree::parse_document(&content_text)?;
            let tree = XmlTree::new(&content_doc);
            let generator = CfiGenerator::with_elision(&tree, &rules);
            let target = tree
                .element_by_id(&target_id)
                .with_context(|| format!("No element with id '{}' in {}", target_id, content.display()))?;

            let content_path = match offset {
                Some(offset) => {
                    let text = tree
                        .children(target)
                        .into_iter()
                        .find(|node| tree.kind(*node) == NodeKind::Text)
                        .with_context(|| format!("Element '{}' has no text child", target_id))?;
                    generator.character_offset_component(text, offset)?
                }
                None => generator.element_component(target)?,
            };

            println!("{}", complete_cfi(package_path, content_path));
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn describe<'a, 'input: 'a>(
    tree: &XmlTree<'a, 'input>,
    location: Location<roxmltree::Node<'a, 'input>>,
) -> Target {
    match location {
        Location::Element(node) => Target::Element {
            name: node.tag_name().name().to_string(),
            id: tree.attribute(node, "id").map(str::to_string),
        },
        Location::Character { node, offset } => Target::Character {
            node_kind: tree.kind(node),
            offset,
            text: node.text().map(str::to_string),
        },
        Location::Gap { parent, index } => Target::Gap {
            parent: parent.tag_name().name().to_string(),
            index,
        },
    }
}
