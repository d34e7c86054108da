use clap::Parser;
use formwright_runner::{build_oracle, OracleProvider, Params, Plan, Runner};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "formwright")]
#[command(about = "Fill job-application forms from a YAML plan")]
#[command(version)]
struct Cli {
    /// Plan file to run
    plan: PathBuf,

    /// Run in headless mode (overrides plan)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate plan without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Skip the oracle and take local defaults for every decision
    #[arg(long)]
    offline: bool,

    /// Stop at the first failed field
    #[arg(long)]
    stop_on_error: bool,

    /// Save a screenshot of the filled form
    #[arg(long, value_name = "PNG")]
    screenshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> formwright_runner::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = Params::from_args(&cli.params)?;
    let mut plan = Plan::load_with_params(&cli.plan, &params)?;

    if cli.check {
        println!("Plan valid: {}", plan.name);
        println!("  Target: {}", plan.target.url);
        if !plan.params.is_empty() {
            println!("  Parameters: {}", plan.params.len());
            let mut names: Vec<_> = plan.params.iter().collect();
            names.sort_by(|a, b| a.0.cmp(b.0));
            for (name, def) in names {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        println!("  Fields: {}", plan.fields.len());
        for field in &plan.fields {
            let frame = field
                .frame_id
                .as_deref()
                .map(|f| format!(" [frame {}]", f))
                .unwrap_or_default();
            println!("    - {:<9} {}{}", field.family(), field.field_id, frame);
        }
        return Ok(());
    }

    if cli.headless {
        plan.browser.headless = true;
    }
    if cli.offline {
        plan.oracle.provider = OracleProvider::Offline;
    }
    if cli.stop_on_error {
        plan.execution.executor.continue_on_error = false;
    }

    println!("Running: {}", plan.name);

    let mut runner = Runner::new(&plan.browser).await?;
    let result = runner.run(&plan, build_oracle(&plan.oracle)).await?;

    println!();
    if result.success {
        println!("✓ Success");
    } else {
        println!("✗ Failed");
    }
    println!("{}", result.summary);
    println!("  Duration: {}ms", result.duration_ms);

    if let Some(ref path) = cli.screenshot {
        runner.screenshot(path).await?;
        println!("  Screenshot: {}", path.display());
    }

    runner.close().await?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}
