use anyhow::Context;
use clap::Parser;
use spendpath::{analyze_script, decode_bytes, RuleSet, ScriptAsm, ScriptVersion};

/// Symbolic spending-condition analyzer for Bitcoin-style scripts.
///
/// Enumerates every reachable execution path of the given script and prints
/// the conditions a spender must satisfy, as a disjunction with one conjunct
/// list per path.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Hex-encoded script to analyze.
    script: String,

    /// Script execution context.
    #[arg(long, value_enum, default_value = "legacy")]
    script_version: ScriptVersionArg,

    /// Rule set assumed to be enforced.
    #[arg(long, value_enum, default_value = "all")]
    rules: RuleSetArg,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ScriptVersionArg {
    /// Bare scripts and BIP16 P2SH redeem scripts.
    Legacy,
    /// Witness v0 (P2WSH).
    SegwitV0,
    /// Witness v1 tapscript.
    SegwitV1,
}

impl From<ScriptVersionArg> for ScriptVersion {
    fn from(arg: ScriptVersionArg) -> Self {
        match arg {
            ScriptVersionArg::Legacy => Self::Legacy,
            ScriptVersionArg::SegwitV0 => Self::SegwitV0,
            ScriptVersionArg::SegwitV1 => Self::SegwitV1,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum RuleSetArg {
    /// Consensus plus standardness rules.
    All,
    /// Consensus rules only.
    ConsensusOnly,
}

impl From<RuleSetArg> for RuleSet {
    fn from(arg: RuleSetArg) -> Self {
        match arg {
            RuleSetArg::All => Self::All,
            RuleSetArg::ConsensusOnly => Self::ConsensusOnly,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        script,
        script_version,
        rules,
    } = Cli::parse();

    let bytes = hex::decode(script.trim()).context("script is not valid hex")?;
    let items = decode_bytes(&bytes).context("script does not decode")?;

    println!("script: {}", ScriptAsm(&items));

    let analysis = analyze_script(&items, script_version.into(), rules.into());

    let mut report = String::new();
    analysis
        .write_report(&mut report)
        .expect("writing to a String cannot fail");
    print!("{report}");

    Ok(())
}
