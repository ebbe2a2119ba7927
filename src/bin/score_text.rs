use anyhow::Context;
use humanize_ai_lib::services::detection::{local_scores, score_text, ClassifierGateway};
use humanize_ai_lib::services::rewrite::transform_candidate;
use humanize_ai_lib::services::ProviderClient;
use humanize_ai_lib::{build_gateway, load_config};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    file: String,
    word_count: usize,
    heuristic_probability: f64,
    ai_probability: f64,
    human_score: u8,
    readability_score: u8,
    style_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    rewritten: Option<RewriteReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RewriteReport {
    text: String,
    heuristic_probability: f64,
    human_score: u8,
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin score_text -- <path.txt> [--offline] [--rewrite] [--seed <n>] [--out <json_path>]\n\nNotes:\n  - Oracles are used when HF_API_KEY / GROQ_API_KEY are configured, unless --offline is given.\n  - `--rewrite` runs the local jitter + phrase-table stages (no generator call) and rescores.\n  - `--seed` makes the jitter reproducible."
        );
        return Ok(());
    }

    let path = args[1].clone();
    let offline = has_flag(&args, "--offline");
    let rewrite = has_flag(&args, "--rewrite");
    let seed: Option<u64> = parse_arg_value(&args, "--seed").and_then(|s| s.parse().ok());
    let out_path = parse_arg_value(&args, "--out");

    let text = std::fs::read_to_string(&path).with_context(|| format!("read file failed: {}", path))?;

    let gateway = if offline {
        ClassifierGateway::offline()
    } else {
        let config = load_config();
        let client = Arc::new(ProviderClient::with_urls(
            config.provider_url("groq"),
            config.provider_url("huggingface"),
        ));
        build_gateway(&config, &client)
    };

    println!("File: {}", path);
    println!("Chars: {}", text.chars().count());
    println!("Preview: {}", preview(&text, 120));

    let scored = score_text(&text, &gateway).await;

    let rewritten = if rewrite {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let transformed = transform_candidate(&text, &mut rng);
        let local = local_scores(&transformed);
        Some(RewriteReport {
            text: transformed,
            heuristic_probability: local.heuristic_probability,
            human_score: local.human_score,
        })
    } else {
        None
    };

    let report = Report {
        file: path,
        word_count: scored.local.word_count,
        heuristic_probability: scored.local.heuristic_probability,
        ai_probability: scored.ai_probability,
        human_score: scored.local.human_score,
        readability_score: scored.local.readability_score,
        style_score: scored.local.style_score,
        rewritten,
    };

    let json = serde_json::to_string_pretty(&report)?;
    match out_path {
        Some(out) => {
            std::fs::write(&out, &json).with_context(|| format!("write output failed: {}", out))?;
            println!("Wrote: {}", out);
        }
        None => println!("{}", json),
    }

    Ok(())
}
