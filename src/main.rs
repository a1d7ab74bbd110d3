use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use carcall::datagen::{split_train_test, TrainingDataGenerator};
use carcall::eval::driver::evaluate_results_file;
use carcall::eval::parse::{DecodeArgs, LegacyPyArgs, StrictJsonArgs};
use carcall::registry::car_functions;
use carcall::utils::write_json_pretty;

#[derive(Parser)]
#[command(name = "carcall", about = "Synthesize and score car voice-command function calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a stored results file and write the metrics next to it
    Evaluate {
        #[arg(long, default_value = "./data/sample_predicted_outputs.json")]
        result_file: String,
        /// Decode the arguments field as strict JSON instead of the legacy
        /// Python-dict encoding
        #[arg(long)]
        strict_args: bool,
    },
    /// Generate templated training triples in the chat wire format
    Generate {
        /// Samples per function
        #[arg(long, default_value_t = 10)]
        n: usize,
        /// Probability that a sample's command mentions optional parameters
        #[arg(long, default_value_t = 0.5)]
        opt_prob: f64,
        /// Also emit possibly-incorrect negatives for functions with
        /// required parameters
        #[arg(long)]
        include_incomplete: bool,
        /// Embed each function's schema in the system turn
        #[arg(long)]
        prompt_insertion: bool,
        /// Fraction of samples routed to the train split
        #[arg(long, default_value_t = 0.8)]
        train_fraction: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "./data/car_finetuning")]
        output_prefix: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Evaluate {
            result_file,
            strict_args,
        } => {
            let decoder: Box<dyn DecodeArgs> = if strict_args {
                Box::new(StrictJsonArgs)
            } else {
                Box::new(LegacyPyArgs)
            };
            let metrics_path = evaluate_results_file(&result_file, car_functions(), decoder)
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("evaluating {}", result_file))?;
            println!("Wrote evaluation metrics to {}", metrics_path);
        }
        Commands::Generate {
            n,
            opt_prob,
            include_incomplete,
            prompt_insertion,
            train_fraction,
            seed,
            output_prefix,
        } => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut generator =
                TrainingDataGenerator::new(car_functions(), StdRng::seed_from_u64(seed ^ 1))
                    .with_opt_prob(opt_prob)
                    .with_prompt_insertion(prompt_insertion);

            let mut samples = generator.generate(n);
            if include_incomplete {
                samples.extend(generator.generate_possibly_incorrect(n));
            }
            info!("generated {} training samples", samples.len());

            let (train, test) = split_train_test(samples, train_fraction, &mut rng);
            let train_path = format!("{}-train.json", output_prefix);
            let test_path = format!("{}-test.json", output_prefix);
            write_json_pretty(&train_path, &serde_json::to_value(&train)?)
                .map_err(|e| anyhow!(e))?;
            write_json_pretty(&test_path, &serde_json::to_value(&test)?)
                .map_err(|e| anyhow!(e))?;
            println!(
                "Wrote {} train and {} test samples to {} / {}",
                train.len(),
                test.len(),
                train_path,
                test_path
            );
        }
    }
    Ok(())
}
