// main.rs - CLI entry point

use chrono::Local;
use std::path::PathBuf;
use std::time::Instant;

use chewbbaca::cli::args::{
    ExtractCgmlstArgs, JoinProfilesArgs, RemoveGenesArgs, SchemaEvaluatorArgs,
};
use chewbbaca::cli::{
    resolve_cpu_cores, validate_allele_call, validate_create_schema, validate_prep_schema, Args,
    Command, Config,
};
use chewbbaca::core::constants::{AUTHORS, CGMLST_THRESHOLDS, CONTACTS, DOCUMENTATION, REPOSITORY};
use chewbbaca::core::{allele_call, cgmlst, create_schema, evaluate, prep_schema, profiles};
use chewbbaca::core::{CgmlstParams, EvaluateParams};
use chewbbaca::data::loaders::read_id_list;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!("🧬 chewBBACA version: {}", chewbbaca::VERSION);
    println!("   Authors: {}", AUTHORS);
    println!("   Github: {}", REPOSITORY);
    println!("   Documentation: {}", DOCUMENTATION);
    println!("   Contacts: {}", CONTACTS);
}

fn run_main() -> Result<(), String> {
    let args: Args = argh::from_env();

    if args.version {
        println!("chewBBACA version: {}", chewbbaca::VERSION);
        return Ok(());
    }
    let mut command = args
        .command
        .ok_or("No subcommand given. Use --help to list the available subcommands")?;

    if let Command::GenerateConfig(_) = command {
        println!("{}", Config::generate_sample());
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    if let Some(config_path) = &args.config {
        command.with_config_file(config_path)?;
    }

    print_banner();

    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = resolve_cpu_cores(command.cpu_cores(), available);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
    println!("🧵 CPU cores: {}", threads);

    let started = Local::now();
    let timer = Instant::now();
    println!("\n🚀 {} started at: {}", command.name(), started.format("%Y-%m-%dT%H:%M:%S"));
    log::info!("Command line: {}", std::env::args().collect::<Vec<_>>().join(" "));

    dispatch(&command)?;

    let elapsed = timer.elapsed().as_secs();
    println!(
        "\n⏱️  Finished at: {}\n   Elapsed time: {:02}h{:02}m{:02}s",
        Local::now().format("%Y-%m-%dT%H:%M:%S"),
        elapsed / 3600,
        (elapsed % 3600) / 60,
        elapsed % 60
    );
    Ok(())
}

fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::CreateSchema(args) => {
            let params = validate_create_schema(args)?;
            create_schema::run(&params)?;
        }
        Command::AlleleCall(args) => {
            let params = validate_allele_call(args)?;
            allele_call::run(&params)?;
        }
        Command::ExtractCgMLST(args) => run_extract_cgmlst(args)?,
        Command::RemoveGenes(args) => run_remove_genes(args)?,
        Command::JoinProfiles(args) => run_join_profiles(args)?,
        Command::PrepExternalSchema(args) => {
            let params = validate_prep_schema(args)?;
            prep_schema::run(&params)?;
        }
        Command::SchemaEvaluator(args) => run_schema_evaluator(args)?,
        Command::GenerateConfig(_) => {}
    }
    Ok(())
}

fn run_extract_cgmlst(args: &ExtractCgmlstArgs) -> Result<(), String> {
    let thresholds = if args.threshold.is_empty() {
        CGMLST_THRESHOLDS.to_vec()
    } else {
        args.threshold.clone()
    };
    let params = CgmlstParams {
        input_file: PathBuf::from(&args.input_file),
        output_directory: PathBuf::from(&args.output_directory),
        genes_to_remove: args.genes2remove.as_ref().map(PathBuf::from),
        genomes_to_remove: args.genomes2remove.as_ref().map(PathBuf::from),
        thresholds,
        step: args.step,
    };
    cgmlst::run(&params)?;
    Ok(())
}

fn run_remove_genes(args: &RemoveGenesArgs) -> Result<(), String> {
    profiles::remove_genes(
        &PathBuf::from(&args.input_file),
        &PathBuf::from(&args.genes_list),
        &PathBuf::from(&args.output_file),
        args.inverse,
    )?;
    Ok(())
}

fn run_join_profiles(args: &JoinProfilesArgs) -> Result<(), String> {
    let paths: Vec<PathBuf> = args.profiles.iter().map(PathBuf::from).collect();
    profiles::join_profiles(&paths, &PathBuf::from(&args.output_file), args.common)?;
    Ok(())
}

fn run_schema_evaluator(args: &SchemaEvaluatorArgs) -> Result<(), String> {
    let loci = match &args.genes_list {
        Some(path) => {
            let mut loci: Vec<String> = read_id_list(&PathBuf::from(path))?
                .into_iter()
                .map(|l| l.trim_end_matches(".fasta").to_string())
                .collect();
            loci.sort();
            Some(loci)
        }
        None => None,
    };
    let params = EvaluateParams {
        schema_directory: PathBuf::from(&args.schema_directory),
        output_directory: PathBuf::from(&args.output_directory),
        translation_table: args.translation_table,
        minimum_length: args.minimum_length,
        size_threshold: args.size_threshold,
        loci,
    };
    evaluate::run(&params)?;
    Ok(())
}
