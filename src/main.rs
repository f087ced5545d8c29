use anyhow::Result;

use tournament_ranking::cli::{Cli, Command};
use tournament_ranking::{
    build_config, handle_completions, handle_init, handle_player, handle_ratings, handle_result,
    handle_strategies, handle_system, handle_tournament, interpret,
};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let cli = interpret();
    execute_command(&cli)
}

fn execute_command(cli: &Cli) -> Result<()> {
    let config = build_config(cli);

    match &cli.command {
        Command::Init { reset } => handle_init(&config, *reset),
        Command::Player { action } => handle_player(&config, cli.json, action),
        Command::System { action } => handle_system(&config, cli.json, action),
        Command::Tournament { action } => handle_tournament(&config, cli.json, action),
        Command::Result { action } => handle_result(&config, cli.json, action),
        Command::Ratings { action } => handle_ratings(&config, cli.json, action),
        Command::Strategies => handle_strategies(cli.json),
        Command::Completions { shell } => handle_completions(*shell),
    }
}
