use cand_triage_rust::{cli, config, error, review, stats};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Review { directory, output, extension, strict, rate, viewer, fresh } => {
            let mut opts = review::ReviewOptions::from_config(directory, &config);
            if let Some(output) = output {
                opts.output = output;
            }
            if let Some(extension) = extension {
                opts.extension = extension;
            }
            if strict {
                opts.policy = cand_triage_rust::catalog::ParsePolicy::Strict;
            }
            if let Some(rate) = rate {
                opts.rate = rate;
            }
            opts.viewer = viewer;
            opts.fresh = fresh;
            opts.verbose = cli.verbose;

            review::run_review(opts).await?;
        }

        Commands::Stats { directory, output, extension } => {
            let output = output.unwrap_or_else(|| config.output_file.clone());
            let extension = extension.unwrap_or_else(|| config.extension.clone());
            stats::run_stats(&directory, &output, &extension)?;
        }

        Commands::Config { set_extension, set_rate, set_skip_step, set_parse_policy, show } => {
            let mut config = config;
            let mut changed = false;

            if let Some(extension) = set_extension {
                config.extension = extension;
                changed = true;
            }
            if let Some(rate) = set_rate {
                if !(cand_triage_rust::ticker::MIN_RATE..=cand_triage_rust::ticker::MAX_RATE).contains(&rate) {
                    return Err(error::TriageError::Input(format!(
                        "レートは{}〜{}で指定してください（{}）",
                        cand_triage_rust::ticker::MIN_RATE,
                        cand_triage_rust::ticker::MAX_RATE,
                        rate
                    )));
                }
                config.auto_advance_rate = rate;
                changed = true;
            }
            if let Some(step) = set_skip_step {
                config.skip_step = step;
                changed = true;
            }
            if let Some(policy) = set_parse_policy {
                config.parse_policy = policy.into();
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  拡張子: {}", config.extension);
                println!("  分類ファイル名: {}", config.output_file);
                println!("  自動送りレート: {}/秒", config.auto_advance_rate);
                println!("  スキップ歩幅: {}", config.skip_step);
                println!("  解析ポリシー: {:?}", config.parse_policy);
            }
        }
    }

    Ok(())
}
