//! compensation-engine CLI
//!
//! Inspect a member network from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Stats for one member
//! compensation-engine stats --input network.json --member M-ROOT
//!
//! # Accrue and show bonuses for a period
//! compensation-engine bonuses --input network.json --member M-ROOT --format json
//!
//! # Print the rank ladder
//! compensation-engine ranks
//!
//! # Check tree integrity
//! compensation-engine validate --input network.json
//!
//! # Generate a random network for testing
//! compensation-engine generate --members 25 --output network.json
//! ```

use compensation_engine::core::member::{Leg, Member, MemberId};
use compensation_engine::core::rank::RankTable;
use compensation_engine::engine::compensation::CompensationEngine;
use compensation_engine::simulation::network_gen::{generate_random_network, NetworkConfig};
use compensation_engine::tree::placement::PlacementTree;
use rust_decimal::Decimal;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"compensation-engine — binary-tree MLM compensation calculator

USAGE:
    compensation-engine <COMMAND> [OPTIONS]

COMMANDS:
    stats       Show leg volumes, rank progress and earnings for a member
    bonuses     Accrue a period's bonuses for a member and show the ledger
    ranks       Print the rank ladder
    validate    Check a network file for integrity violations
    generate    Generate a random member network (for testing)
    help        Show this message

OPTIONS (stats, bonuses):
    --input <FILE>      Path to JSON network file
    --member <ID>       Member id to inspect
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (validate):
    --input <FILE>      Path to JSON network file

OPTIONS (generate):
    --members <N>       Number of members including the root (default: 15)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    compensation-engine stats --input network.json --member M-ROOT
    compensation-engine bonuses --input network.json --member M-ROOT --format json
    compensation-engine validate --input network.json
    compensation-engine generate --members 25 --output network.json"#
    );
}

/// JSON schema for input members.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberInput {
    id: String,
    name: String,
    #[serde(default = "default_rank")]
    rank: u8,
    #[serde(default)]
    personal_volume: Option<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    position: Option<Leg>,
    #[serde(default)]
    sponsor: Option<String>,
    #[serde(default)]
    direct_recruit: bool,
}

fn default_rank() -> u8 {
    1
}

#[derive(serde::Deserialize)]
struct NetworkFile {
    members: Vec<MemberInput>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberOutput {
    id: String,
    name: String,
    rank: u8,
    personal_volume: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Leg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sponsor: Option<String>,
    direct_recruit: bool,
}

#[derive(serde::Serialize)]
struct NetworkOutput {
    members: Vec<MemberOutput>,
}

fn load_network(path: &str) -> PlacementTree {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: NetworkFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "members": [
    {{ "id": "M-ROOT", "name": "You", "rank": 5, "personalVolume": "1200.00" }},
    {{ "id": "M-0001", "name": "Alice", "parent": "M-ROOT", "position": "left",
      "sponsor": "M-ROOT", "directRecruit": true }}
  ]
}}"#
        );
        process::exit(1);
    });

    let mut members = Vec::with_capacity(file.members.len());
    for input in file.members {
        let volume: Decimal = match input.personal_volume {
            Some(v) => v.parse().unwrap_or_else(|e| {
                eprintln!("Invalid personalVolume '{}' for {}: {}", v, input.id, e);
                process::exit(1);
            }),
            None => Decimal::ZERO,
        };
        let mut member = Member::new(input.id.as_str(), input.name)
            .with_rank(input.rank)
            .with_personal_volume(volume);
        if let Some(parent) = input.parent {
            let position = input.position.unwrap_or_else(|| {
                eprintln!("Member {} has a parent but no position", input.id);
                process::exit(1);
            });
            member = member.with_parent(MemberId::new(parent), position);
        }
        if let Some(sponsor) = input.sponsor {
            member = member.with_sponsor(MemberId::new(sponsor));
        }
        if input.direct_recruit {
            member = member.as_direct_recruit();
        }
        members.push(member);
    }

    PlacementTree::from_members(members).unwrap_or_else(|e| {
        eprintln!("Network integrity error: {}", e);
        process::exit(1);
    })
}

/// Parse the shared --input/--member/--format options.
fn parse_inspect_args(args: &[String]) -> (String, MemberId, String) {
    let mut input_path = None;
    let mut member = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--member" => {
                i += 1;
                member = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--member requires a member id");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });
    let member = member.map(MemberId::new).unwrap_or_else(|| {
        eprintln!("Error: --member <ID> is required");
        process::exit(1);
    });
    (path, member, format)
}

fn cmd_stats(args: &[String]) {
    let (path, member, format) = parse_inspect_args(args);
    let tree = load_network(&path);
    let engine = CompensationEngine::new(RankTable::standard(), tree);

    let stats = engine.stats(&member).unwrap_or_else(|| {
        eprintln!("No member '{}' in {}", member, path);
        process::exit(1);
    });

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap());
    } else {
        println!("{}", stats);
        println!(
            "Rank name:      {} ({})",
            engine.rank_name(i64::from(stats.rank_id)),
            engine.rank_color(i64::from(stats.rank_id))
        );
        if let Some(bonus) = engine.calculate_pay_leg_bonus(&member) {
            println!("Pay-leg bonus due: {}", bonus.round_dp(2));
        }
    }
}

fn cmd_bonuses(args: &[String]) {
    let (path, member, format) = parse_inspect_args(args);
    let tree = load_network(&path);
    let mut engine = CompensationEngine::new(RankTable::standard(), tree);

    if engine.member(&member).is_none() {
        eprintln!("No member '{}' in {}", member, path);
        process::exit(1);
    }

    engine.close_period(&member).unwrap_or_else(|e| {
        eprintln!("Error accruing bonuses: {}", e);
        process::exit(1);
    });

    let entries = engine.ledger().entries_for(&member);
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries).unwrap());
    } else if entries.is_empty() {
        println!("No bonuses accrued for {} this period.", member);
    } else {
        println!("=== Bonuses: {} ===", member);
        for entry in &entries {
            println!("  {:<12} {:>12}  {}", format!("{:?}", entry.kind()), entry.amount(), entry.description());
        }
        println!("  Total: {}", engine.ledger().grand_total_for(&member));
    }
}

fn cmd_ranks() {
    let table = RankTable::standard();
    println!(
        "{:<3} {:<12} {:<8} {:>12} {:>12} {:>10} {:>6}",
        "ID", "NAME", "COLOR", "GV (2-LEG)", "GV (4-LEG)", "PAYOUT", "RATE"
    );
    for rank in table.iter() {
        println!(
            "{:<3} {:<12} {:<8} {:>12} {:>12} {:>10} {:>6}",
            rank.id,
            rank.name,
            rank.color,
            rank.group_volume_qualified_2,
            rank.group_volume_qualified_4,
            rank.one_time_payout,
            rank.pay_leg_rate,
        );
    }
}

fn cmd_validate(args: &[String]) {
    let mut input_path = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }
    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    // load_network validates on construction and exits on violation.
    let tree = load_network(&path);
    println!(
        "OK: {} members, root {}",
        tree.len(),
        tree.root().map(|r| r.id().as_str()).unwrap_or("?")
    );
}

fn cmd_generate(args: &[String]) {
    let mut member_count = 15usize;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                member_count = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--members requires a number");
                    process::exit(1);
                });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = NetworkConfig {
        member_count: member_count.max(1),
        ..Default::default()
    };
    let tree = generate_random_network(&config);

    let output = NetworkOutput {
        members: tree
            .members()
            .iter()
            .map(|m| MemberOutput {
                id: m.id().to_string(),
                name: m.name().to_string(),
                rank: m.rank_id(),
                personal_volume: m.personal_volume().to_string(),
                parent: m.parent().map(|p| p.to_string()),
                position: m.parent().map(|_| m.position()),
                sponsor: m.sponsor().map(|s| s.to_string()),
                direct_recruit: m.is_direct_recruit(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&output).unwrap();

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Generated {} members → {}", tree.len(), path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "stats" => cmd_stats(rest),
        "bonuses" => cmd_bonuses(rest),
        "ranks" => cmd_ranks(),
        "validate" => cmd_validate(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
