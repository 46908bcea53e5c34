// src/bin/inspect.rs
// ============================================================================
// MODULE INSPECTOR - Muestra el árbol de módulos de un checkpoint
// ============================================================================
//
// Uso: helios-inspect ./Llama-3-8B --depth 4 --collapse
//
// Sirve para escribir a mano un interface JSON: las rutas que se ven aquí
// son las que acepta el resolver.
//
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;

use helios_adapt::{module::ModuleHandle, safetensor::SafetensorIndex};

#[derive(Parser)]
#[command(name = "helios-inspect")]
#[command(about = "Print the module tree of a safetensors checkpoint")]
struct Args {
    /// Model directory or single .safetensors file
    model: PathBuf,

    /// Maximum depth to print
    #[arg(short, long, default_value = "6")]
    depth: usize,

    /// Fold numbered layers into a single entry
    #[arg(long)]
    collapse: bool,

    /// Show parameter dtype and shape
    #[arg(long)]
    params: bool,
}

struct Printer {
    max_depth: usize,
    collapse: bool,
    params: bool,
    numeric: Regex,
}

impl Printer {
    fn print(&self, handle: &ModuleHandle, name: &str, depth: usize) {
        let indent = "  ".repeat(depth);
        let children = handle.children();
        println!(
            "{}{} ({}){}",
            indent,
            name,
            handle.type_name(),
            if children.is_empty() { String::new() } else { format!(" [{}]", children.len()) }
        );

        if self.params {
            for param in handle.module().parameters() {
                println!("{}  · {} {} {:?}", indent, param.name, param.dtype, param.shape);
            }
        }

        if depth + 1 > self.max_depth {
            return;
        }

        let numbered = children
            .iter()
            .filter(|c| self.numeric.is_match(last_segment(c.path())))
            .count();

        if self.collapse && numbered > 1 && numbered == children.len() {
            let label = format!("{{0..{}}}", numbered - 1);
            self.print(&children[0], &label, depth + 1);
            return;
        }

        for child in &children {
            self.print(child, last_segment(child.path()), depth + 1);
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let index = if args.model.is_file() {
        SafetensorIndex::from_file(&args.model)
    } else {
        SafetensorIndex::from_folder(&args.model)
    }
    .with_context(|| format!("Failed to open {}", args.model.display()))?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  MODULE TREE: {}", args.model.display());
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Shards:  {}", index.shards().len());
    println!("  Tensors: {}", index.len());
    println!();

    let printer = Printer {
        max_depth: args.depth,
        collapse: args.collapse,
        params: args.params,
        numeric: Regex::new(r"^\d+$")?,
    };

    let root = ModuleHandle::root(index.module_tree());
    printer.print(&root, "(root)", 0);

    Ok(())
}
