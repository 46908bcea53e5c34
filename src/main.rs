// src/main.rs
// ============================================================================
// HELIOS-ADAPT CLI
// ============================================================================
//
// Uso simple (preset detectado desde config.json):
//   helios-adapt ./Qwen2-7B --methods lora,reft
//
// Interfaz declarada a mano:
//   helios-adapt ./my-model --interface my_interface.json --plan
//
// Exportar el preset para editarlo:
//   helios-adapt ./Llama-3-8B --dump-interface llama.json
//
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use helios_adapt::{
    interface::{AdaptedModel, AdapterInterface, AdapterMethod, InterfaceConfig, MethodSet, RoleMap},
    mapping::{create_preset, load_config, preset_for, InterfacePreset},
    plan::{InjectionPlan, PlanOptions, Projection},
    safetensor::SafetensorIndex,
};

#[derive(Parser, Debug)]
#[command(name = "helios-adapt")]
#[command(about = "Resolve an adapter interface against a safetensors checkpoint")]
#[command(version = "0.1.0")]
struct Args {
    /// Model directory (config.json + *.safetensors) or a single .safetensors file
    #[arg(value_name = "MODEL")]
    model: PathBuf,

    /// Interface JSON (overrides the built-in preset)
    #[arg(short, long)]
    interface: Option<PathBuf>,

    /// Force a built-in preset (llama, qwen2, mistral, gemma, gemma2, phi, phi3, clip)
    #[arg(long)]
    arch: Option<String>,

    /// Adapter methods, comma separated (lora, reft, bottleneck, prompt_tuning)
    #[arg(short, long)]
    methods: Option<String>,

    /// LoRA attention matrices, comma separated (q, k, v, o)
    #[arg(long)]
    attn_matrices: Option<String>,

    /// LoRA on the intermediate FFN projection
    #[arg(long)]
    intermediate: bool,

    /// LoRA on the output FFN projection
    #[arg(long)]
    output_proj: bool,

    /// Restrict per-layer sites to these layer indices, comma separated
    #[arg(long)]
    layers: Option<String>,

    /// Print the injection plan
    #[arg(long)]
    plan: bool,

    /// Emit a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Write the interface in use as JSON
    #[arg(long, value_name = "FILE")]
    dump_interface: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let start = Instant::now();

    // ══════════════════════════════════════════════════════════════════════
    // INTERFAZ
    // ══════════════════════════════════════════════════════════════════════

    let methods_override = args
        .methods
        .as_deref()
        .map(MethodSet::parse_list)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let (source, role_map, methods, mut plan_options, expected_layers) =
        match &args.interface {
            Some(path) => {
                let cfg = InterfaceConfig::load(path)?;
                let role_map = cfg.role_map()?;
                let methods = methods_override.unwrap_or_else(|| cfg.adapter_methods.clone());
                let options = cfg.plan.clone().unwrap_or_default();
                (path.display().to_string(), role_map, methods, options, None)
            }
            None => {
                let preset = select_preset(&args)?;
                let role_map = preset.role_map()?;
                let methods =
                    methods_override.unwrap_or_else(|| MethodSet::new([AdapterMethod::Lora]));
                (
                    format!("preset:{}", preset.name()),
                    role_map,
                    methods,
                    PlanOptions::default(),
                    preset.num_layers(),
                )
            }
        };

    if let Some(path) = &args.dump_interface {
        let cfg = InterfaceConfig::from_role_map(&role_map, methods.clone());
        let json = serde_json::to_string_pretty(&cfg)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        if !args.json {
            println!("[INFO] Interface written to {}", path.display());
        }
    }

    report_missing_roles(&role_map, &methods);
    let interface = Arc::new(AdapterInterface::construct(role_map, methods.clone())?);

    // ══════════════════════════════════════════════════════════════════════
    // CHECKPOINT
    // ══════════════════════════════════════════════════════════════════════

    let index = open_index(&args.model)?;
    let adapted = AdaptedModel::new(index.module_tree(), Arc::clone(&interface));
    let resolved = adapted
        .resolved()
        .with_context(|| format!("Interface {} does not match {}", source, args.model.display()))?;

    if let Some(expected) = expected_layers {
        if expected != resolved.num_layers() {
            log::warn!(
                "config.json declares {} layers but the checkpoint has {}",
                expected,
                resolved.num_layers()
            );
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // PLAN
    // ══════════════════════════════════════════════════════════════════════

    apply_plan_flags(&args, &mut plan_options)?;
    let plan = if args.plan {
        Some(InjectionPlan::build(resolved, &methods, &plan_options)?)
    } else {
        None
    };

    // ══════════════════════════════════════════════════════════════════════
    // SALIDA
    // ══════════════════════════════════════════════════════════════════════

    if args.json {
        let report = serde_json::json!({
            "generator": "helios-adapt 0.1.0",
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "model": args.model.display().to_string(),
            "interface": source,
            "shards": index.shards().len(),
            "tensors": index.len(),
            "resolved": resolved.summary(),
            "plan": plan.as_ref().map(InjectionPlan::to_json),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!("  HELIOS ADAPT v0.1.0 - Adapter Interface Resolver");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Model:       {}", args.model.display());
    println!("  Interface:   {}", source);
    println!("  Methods:     {}", methods);
    println!("  Fingerprint: {:016x}", resolved.fingerprint());
    println!("═══════════════════════════════════════════════════════════════");

    println!("\n[CHECKPOINT] {} tensors in {} shard(s)", index.len(), index.shards().len());
    println!("\n[RESOLVED]");
    println!("  Base:        {}", display_path(resolved.base().path()));
    println!("  Embeddings:  {} ({})", resolved.embeddings().path(), resolved.embeddings().type_name());
    println!("  Layers:      {} × {}", resolved.layer_collection().path(), resolved.num_layers());

    if let Some(layer0) = resolved.layers().first() {
        println!("\n[LAYER 0]");
        for (role, handle) in layer0.roles() {
            println!("  {:<24} {} ({})", role.key(), handle.path(), handle.type_name());
        }
        if layer0.has_cross_attention() {
            println!("  (cross-attention projections resolved)");
        }
    }

    if let Some(plan) = &plan {
        println!("\n[PLAN] {} sites", plan.len());
        for site in plan.sites() {
            let layer = site.layer.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<14} {:<28} L{:<4} {}{}",
                site.method,
                site.kind,
                layer,
                site.handle.path(),
                if site.cross { " [cross]" } else { "" }
            );
        }
    }

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  RESOLUTION COMPLETE ({:.2}s)", start.elapsed().as_secs_f64());
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}

fn select_preset(args: &Args) -> Result<Box<dyn InterfacePreset>> {
    let config_dir = if args.model.is_dir() {
        args.model.clone()
    } else {
        args.model
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    match &args.arch {
        Some(arch) => {
            let config = load_config(&config_dir).unwrap_or_else(|_| serde_json::json!({}));
            preset_for(&arch.to_lowercase(), &config)
                .ok_or_else(|| anyhow::anyhow!("Unknown preset '{}'", arch))
        }
        None => {
            let config = load_config(&config_dir)?;
            Ok(create_preset(&config))
        }
    }
}

fn open_index(model: &Path) -> Result<SafetensorIndex> {
    if model.is_file() {
        SafetensorIndex::from_file(model)
    } else {
        SafetensorIndex::from_folder(model)
    }
    .with_context(|| format!("Failed to open model {}", model.display()))
}

/// Lista todos los roles que faltan antes de que construct() falle en el primero
fn report_missing_roles(role_map: &RoleMap, methods: &MethodSet) {
    let missing = role_map.missing_roles(methods);
    if missing.is_empty() {
        return;
    }
    eprintln!("[ERROR] Role map cannot serve {}:", methods);
    for (role, declared_absent) in &missing {
        let why = if *declared_absent { "declared absent" } else { "not configured" };
        eprintln!("    - {} ({})", role, why);
    }
}

fn apply_plan_flags(args: &Args, options: &mut PlanOptions) -> Result<()> {
    if let Some(list) = &args.attn_matrices {
        options.attn_matrices = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<Projection>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if args.intermediate {
        options.intermediate_lora = true;
    }
    if args.output_proj {
        options.output_lora = true;
    }
    if let Some(list) = &args.layers {
        let layers = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid layer list '{}'", list))?;
        options.layers = Some(layers);
    }
    Ok(())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}
