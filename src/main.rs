use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use scoreline::config::{Backend, Config};
use scoreline::predict::{DistributionSource, MatchPrediction, Prediction};
use scoreline::result_parse::parse_results;
use scoreline::{CsvStore, Engine, MatchStore, SqliteStore};

const USAGE: &str = "\
usage: scoreline [--data PATH] <command>

commands:
  add <result>...          record results like \"Porto 2-1 Milano\" (use - to read stdin)
  predict <team_a> <team_b> [--json]
  stats                    totals over the recorded history
  profiles                 recency-weighted profile of every team";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = Config::from_env();
    if let Some(path) = parse_data_arg(&args) {
        config = config.with_data_path(path);
    }
    let json = args.iter().any(|a| a == "--json");
    let positional = positional_args(&args);

    let Some((command, rest)) = positional.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let mut engine = open_engine(&config)?;
    match command.as_str() {
        "add" => cmd_add(&mut engine, rest),
        "predict" => cmd_predict(&engine, rest, json),
        "stats" => cmd_stats(&engine),
        "profiles" => cmd_profiles(&engine),
        "help" | "-h" | "--help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => Err(anyhow!("unknown command {other:?}\n\n{USAGE}")),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,scoreline=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_engine(config: &Config) -> Result<Engine<Box<dyn MatchStore>>> {
    let store: Box<dyn MatchStore> = match config.backend {
        Backend::Csv => Box::new(
            CsvStore::open(&config.data_path)
                .with_context(|| format!("open csv log {}", config.data_path.display()))?,
        ),
        Backend::Sqlite => Box::new(
            SqliteStore::open(&config.data_path)
                .with_context(|| format!("open sqlite log {}", config.data_path.display()))?,
        ),
    };
    let mut engine = Engine::new(store).with_params(config.params);
    if let Some(path) = &config.profile_cache {
        engine = engine.with_profile_cache(path.clone());
    }
    Ok(engine)
}

fn cmd_add(engine: &mut Engine<Box<dyn MatchStore>>, rest: &[String]) -> Result<()> {
    let text = if rest.is_empty() || rest == ["-"] {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read results from stdin")?;
        buf
    } else {
        rest.join("\n")
    };

    let batch = parse_results(&text);
    for (line, err) in &batch.skipped {
        println!("skipped: {line} ({err})");
    }
    let recorded = engine.record_results(&batch.results)?;
    for r in &recorded {
        println!("added: {} {}-{} {}", r.team_a, r.goals_a, r.goals_b, r.team_b);
    }
    println!("{} added, {} skipped", recorded.len(), batch.skipped.len());
    Ok(())
}

fn cmd_predict(engine: &Engine<Box<dyn MatchStore>>, rest: &[String], json: bool) -> Result<()> {
    let [team_a, team_b] = rest else {
        return Err(anyhow!("predict takes exactly two team names\n\n{USAGE}"));
    };
    let prediction = engine.predict(team_a, team_b)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&prediction).context("serialize prediction")?
        );
        return Ok(());
    }

    match &prediction {
        Prediction::Ok(p) => print_prediction(p),
        Prediction::InsufficientData {
            available,
            required,
            repetitive_matchup,
        } => {
            println!(
                "Insufficient data: {available} matches involve {team_a} or {team_b}, need {required}"
            );
            if *repetitive_matchup {
                println!("Note: this matchup has been played repeatedly in recent entries");
            }
        }
    }
    Ok(())
}

fn print_prediction(p: &MatchPrediction) {
    println!(
        "{} {} - {} {}",
        p.team_a, p.expected_score.goals_a, p.expected_score.goals_b, p.team_b
    );
    match p.winner_name() {
        Some(name) => println!("Winner: {name}"),
        None => println!("Winner: draw"),
    }
    let source = match p.source {
        DistributionSource::HeadToHead => "head-to-head history",
        DistributionSource::Synthetic => "no head-to-head, estimated",
    };
    println!("Top scores ({source}):");
    for s in &p.top_scores {
        println!("  {:>5}  {:5.1}%", s.score.to_string(), s.probability * 100.0);
    }
    println!("Confidence: {:.2}", p.confidence);
    println!(
        "Samples: {} ({} {} / {} {})",
        p.samples, p.team_a, p.profile_a.sample_size, p.team_b, p.profile_b.sample_size
    );
    if p.repetitive_matchup {
        println!("Note: this matchup has been played repeatedly in recent entries");
    }
}

fn cmd_stats(engine: &Engine<Box<dyn MatchStore>>) -> Result<()> {
    let s = engine.summary()?;
    println!("Matches: {}", s.total_matches);
    println!("Goals per match: {:.2} (variance {:.2})", s.mean_goals, s.goals_variance);
    println!("Side A / side B: {:.2} / {:.2}", s.mean_goals_a, s.mean_goals_b);
    println!("Draws: {:.1}%", s.draw_rate * 100.0);
    Ok(())
}

fn cmd_profiles(engine: &Engine<Box<dyn MatchStore>>) -> Result<()> {
    let profiles = engine.profiles_at(Utc::now())?;
    if profiles.is_empty() {
        println!("No matches recorded");
        return Ok(());
    }
    println!("{:<24} {:>7} {:>9} {:>7}", "team", "scored", "conceded", "played");
    for (team, p) in &profiles {
        println!(
            "{:<24} {:>7.2} {:>9.2} {:>7}",
            team, p.avg_scored, p.avg_conceded, p.sample_size
        );
    }
    Ok(())
}

fn parse_data_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--data=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--data"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--data" {
            skip_next = true;
            continue;
        }
        if arg == "--json" || arg.starts_with("--data=") {
            continue;
        }
        out.push(arg.clone());
    }
    out
}
