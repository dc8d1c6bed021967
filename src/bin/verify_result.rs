// Standalone verifier for a saved TransGate result.
//
// Usage: verify-result <result.json> --schema <schema-id> [--chain evm|solana|ton]
//
// Checks, in order:
//   1. Public field commitment
//   2. Allocator signature over the task assignment
//   3. Validator signature over the result
//
// Every identity comes from the result file. The validator must be the one the
// trusted allocator assigned; on TON that includes its `validator_pubkey`.
// A chain with no trusted allocator configured is INVALID.
// Exit code: 0 = VALID, 1 = INVALID or error.

use std::process;
use transgate_connect::codec::ChainType;
use transgate_connect::commitment::commit;
use transgate_connect::config;
use transgate_connect::schema::VerifiedResult;
use transgate_connect::verify::{verify_allocation, verify_result, AllocatorSet};

// ── Constants ─────────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

struct Args {
    path: String,
    schema_id: String,
    chain: ChainType,
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} <result.json> --schema <schema-id> [--chain evm|solana|ton]",
        program
    );
    process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("verify-result");
    let mut path = None;
    let mut schema_id = None;
    let mut chain = ChainType::Evm;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "-h" | "--help" => usage(program),
            "--schema" => schema_id = rest.next().cloned(),
            "--chain" => match rest.next().map(|s| s.parse::<ChainType>()) {
                Some(Ok(c)) => chain = c,
                Some(Err(e)) => {
                    eprintln!("{RED}ERROR:{RESET} {}", e);
                    process::exit(1);
                }
                None => usage(program),
            },
            other if path.is_none() && !other.starts_with("--") => path = Some(other.to_string()),
            _ => usage(program),
        }
    }

    match (path, schema_id) {
        (Some(path), Some(schema_id)) => Args {
            path,
            schema_id,
            chain,
        },
        _ => usage(program),
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    dotenvy::dotenv().ok();
    let args = parse_args();

    let raw = match std::fs::read_to_string(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{RED}ERROR:{RESET} Could not read {}: {}", args.path, e);
            process::exit(1);
        }
    };
    let result: VerifiedResult = match serde_json::from_str(&raw) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{RED}ERROR:{RESET} Not a verified result: {}", e);
            process::exit(1);
        }
    };

    println!("\nVerifying TransGate result");
    println!("  Task      : {}", result.task_id);
    println!("  Schema    : {}", args.schema_id);
    println!("  Chain     : {}", args.chain);
    println!("  Validator : {}", result.validator_address);
    if let Some(key) = &result.validator_pubkey {
        println!("  Key       : {}", key);
    }
    if let Some(recipient) = &result.recipient {
        println!("  Recipient : {}", recipient);
    }
    println!();

    let allocators = config::allocators();
    let mut all_ok = true;
    all_ok &= check_commitment(&result);
    all_ok &= check_allocation(&result, &allocators, args.chain, &args.schema_id);
    all_ok &= check_validator(&result, args.chain, &args.schema_id);

    println!();
    if all_ok {
        println!("{GREEN}RESULT VALID{RESET}  task {}", result.task_id);
        process::exit(0);
    } else {
        println!("{RED}RESULT INVALID{RESET}  one or more checks failed.");
        process::exit(1);
    }
}

// ── Check 1: Commitment ───────────────────────────────────────────────────────

fn check_commitment(result: &VerifiedResult) -> bool {
    let computed = commit(&result.public_fields);
    if computed.eq_ignore_ascii_case(&result.public_fields_commitment) {
        println!(
            "{GREEN}✓  Commitment matches{RESET} ({} public fields)",
            result.public_fields.len()
        );
        true
    } else {
        println!(
            "{RED}✗  Commitment{RESET}  declared {}, computed {}",
            result.public_fields_commitment, computed
        );
        false
    }
}

// ── Check 2: Allocator signature ──────────────────────────────────────────────

fn check_allocation(result: &VerifiedResult, allocators: &AllocatorSet, chain: ChainType, schema_id: &str) -> bool {
    if allocators.for_chain(chain).is_none() {
        println!("{RED}✗  Allocator{RESET}  no trusted allocator configured for {}", chain);
        return false;
    }
    if verify_allocation(
        allocators,
        chain,
        &result.allocation_fields(schema_id),
        &result.allocator_signature,
    ) {
        println!("{GREEN}✓  Allocator signature valid{RESET}");
        true
    } else {
        println!("{RED}✗  Allocator signature INVALID{RESET}  validator was not assigned by the trusted allocator");
        false
    }
}

// ── Check 3: Validator signature ──────────────────────────────────────────────

fn check_validator(result: &VerifiedResult, chain: ChainType, schema_id: &str) -> bool {
    let Some(signer) = result.result_signer(chain) else {
        println!("{RED}✗  Validator signature{RESET}  result carries no validator_pubkey for {}", chain);
        return false;
    };
    if verify_result(chain, schema_id, result, signer) {
        println!("{GREEN}✓  Validator signature valid{RESET} ({})", chain);
        true
    } else {
        println!("{RED}✗  Validator signature INVALID{RESET}  result was not signed by {}", signer);
        false
    }
}
