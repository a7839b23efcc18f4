mod alias;
mod cli;
mod command;
mod common;
mod config;
mod exec;
mod jobs;
mod pipe;
mod redirect;
mod sh;
mod signal;
mod usage;

use cli::*;
use config::Config;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("SMASH_LOG", "warn"))
        .format_timestamp(None)
        .init();

    let mut client = Cli::new(Config::from_env());
    client.go();
}
