use anyhow::{bail, Result};
use call_context::Context;
use clap::{Args, Subcommand};
use process_runner::background;

#[derive(Args)]
pub struct CiArgs {
    #[command(subcommand)]
    cmd: CiCommand,
}

#[derive(Subcommand)]
pub enum CiCommand {
    /// Run all CI checks
    All,
    /// Format check (read-only)
    #[command(name = "fmt-check")]
    FmtCheck,
    /// Clippy lints
    Clippy,
    /// Cargo deny check
    Deny,
    /// Run the workspace tests
    Tests,
}

pub async fn run(ctx: &Context, args: CiArgs) -> Result<()> {
    match args.cmd {
        CiCommand::All => run_all(ctx).await,
        CiCommand::FmtCheck => run_fmt(ctx).await,
        CiCommand::Clippy => run_clippy(ctx).await,
        CiCommand::Deny => run_deny(ctx).await,
        CiCommand::Tests => run_tests(ctx).await,
    }
}

async fn run_all(ctx: &Context) -> Result<()> {
    println!("Running all CI checks\n");

    println!("Checking code formatting...");
    run_fmt(ctx).await?;
    println!("Format check passed\n");

    println!("Running clippy lints...");
    run_clippy(ctx).await?;
    println!("Clippy check passed\n");

    if cargo_deny_available(ctx).await {
        println!("Running cargo deny...");
        run_deny(ctx).await?;
        println!("Dependency check passed\n");
    }

    println!("Running tests...");
    run_tests(ctx).await?;
    println!("Tests passed\n");

    println!("All CI checks passed!");
    Ok(())
}

async fn run_fmt(ctx: &Context) -> Result<()> {
    if !run_cargo(ctx, &["fmt", "--all", "--", "--check"]).await {
        bail!("Format check failed. Run 'cargo fmt --all' to fix.");
    }
    Ok(())
}

async fn run_clippy(ctx: &Context) -> Result<()> {
    let args = [
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ];
    if !run_cargo(ctx, &args).await {
        bail!("Clippy check failed");
    }
    Ok(())
}

async fn run_deny(ctx: &Context) -> Result<()> {
    if !run_cargo(ctx, &["deny", "check"]).await {
        bail!("Cargo deny check failed");
    }
    Ok(())
}

async fn run_tests(ctx: &Context) -> Result<()> {
    if !run_cargo(ctx, &["test", "--workspace"]).await {
        bail!("Tests failed");
    }
    Ok(())
}

/// Run cargo with `args`, echoing its output; returns whether it succeeded
pub(crate) async fn run_cargo(ctx: &Context, args: &[&str]) -> bool {
    let mut argv = vec!["cargo"];
    argv.extend_from_slice(args);

    match background(ctx, &argv).await {
        Ok(stdout) => {
            if !stdout.is_empty() {
                println!("{stdout}");
            }
            true
        }
        Err(err) => {
            print!("{}", err.stdout);
            eprint!("{}", err.stderr);
            eprintln!("{err}");
            false
        }
    }
}

async fn cargo_deny_available(ctx: &Context) -> bool {
    background(ctx, &["cargo", "deny", "--version"]).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use process_runner::with_stub;

    #[test]
    fn test_all_runs_checks_in_order() {
        let (ctx, stub) = with_stub(&Context::background());

        futures::executor::block_on(run_all(&ctx)).unwrap();

        assert_eq!(
            stub.commands(),
            vec![
                "cargo fmt --all -- --check",
                "cargo clippy --workspace --all-targets -- -D warnings",
                "cargo deny --version",
                "cargo deny check",
                "cargo test --workspace",
            ]
        );
    }

    #[test]
    fn test_all_skips_deny_when_missing() {
        let (ctx, stub) = with_stub(&Context::background());
        stub.with_failure_for("cargo deny --version", "no such command: `deny`");

        futures::executor::block_on(run_all(&ctx)).unwrap();

        assert!(!stub.commands().contains(&"cargo deny check".to_string()));
        assert_eq!(stub.len(), 4);
    }

    #[test]
    fn test_all_stops_at_first_failure() {
        let (ctx, stub) = with_stub(&Context::background());
        stub.with_failure_for(
            "cargo clippy --workspace --all-targets -- -D warnings",
            "exit status 101",
        );

        let err = futures::executor::block_on(run_all(&ctx)).unwrap_err();

        assert_eq!(err.to_string(), "Clippy check failed");
        assert_eq!(stub.len(), 2);
    }
}
