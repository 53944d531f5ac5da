use autoqa::commands::command_argument_builder;
use autoqa::handlers::{handle_crawl, handle_extract_urls, handle_page, print_banner};
use colored::Colorize;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("page", primary_command)) => handle_page(primary_command).await,
        Some(("crawl", primary_command)) => handle_crawl(primary_command).await,
        Some(("extract-urls", primary_command)) => handle_extract_urls(primary_command).await,
        // No subcommand provided, just show the banner
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
